//! Date-range calculation and session-backed filter storage.
//!
//! [`daterange`] holds the pure calendar functions. [`filter::FilterSession`]
//! layers filter reads and writes on top of any [`session::SessionStore`].

pub mod config;
pub mod daterange;
pub mod error;
pub mod filter;
pub mod session;

pub use config::FilterConfig;
pub use daterange::{DateRange, MonthBucket};
pub use error::FilterError;
pub use filter::FilterSession;
pub use session::{MemorySessionStore, SessionStore};
