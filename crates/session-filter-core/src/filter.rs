use chrono::{Months, NaiveDate};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::FilterConfig;
use crate::daterange::{self, DateRange};
use crate::error::FilterError;
use crate::session::SessionStore;

/// Filter key holding the `{start, end}` date range.
pub const DATERANGE_KEY: &str = "daterange";

/// Reads and writes filters under the configured namespace of a session store.
///
/// The store is injected. A request handler typically wraps a `&mut`
/// borrow of its session for the duration of one request.
pub struct FilterSession<S> {
    store: S,
    config: FilterConfig,
}

impl<S: SessionStore> FilterSession<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, FilterConfig::default())
    }

    pub fn with_config(store: S, config: FilterConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn path(&self, key: &str) -> String {
        format!("{}.{}", self.config.namespace, key)
    }

    pub fn has_filter(&self, key: &str) -> bool {
        self.store.has(&self.path(key))
    }

    /// The stored value, or an empty array when the filter is not set.
    pub fn get_filter(&self, key: &str) -> Value {
        self.store
            .get(&self.path(key))
            .unwrap_or_else(|| Value::Array(Vec::new()))
    }

    pub fn set_filter(&mut self, key: &str, value: Value) {
        let path = self.path(key);
        debug!("setting filter {path}");
        self.store.set(&path, value);
    }

    pub fn clear_filter(&mut self, key: &str) -> Option<Value> {
        let path = self.path(key);
        self.store.forget(&path)
    }

    /// The stored value as a list of `IN` candidates.
    /// Arrays are returned as-is, scalars as a single element, `null` or unset as empty.
    pub fn filter_values(&self, key: &str) -> Vec<Value> {
        match self.get_filter(key) {
            Value::Array(values) => values,
            Value::Null => Vec::new(),
            scalar => vec![scalar],
        }
    }

    pub fn set_daterange(&mut self, start: NaiveDate, end: NaiveDate) {
        if start > end {
            warn!("storing reversed date range {start} to {end}");
        }
        self.set_filter(
            &format!("{DATERANGE_KEY}.start"),
            Value::String(start.format("%Y-%m-%d").to_string()),
        );
        self.set_filter(
            &format!("{DATERANGE_KEY}.end"),
            Value::String(end.format("%Y-%m-%d").to_string()),
        );
    }

    /// Stored range bounds, or `[today - lookback_months, today]` when none is stored.
    pub fn stored_bounds_on(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), FilterError> {
        if !self.has_filter(DATERANGE_KEY) {
            let start = today
                .checked_sub_months(Months::new(self.config.lookback_months))
                .ok_or_else(|| {
                    FilterError::InvalidArgument(format!(
                        "{} month(s) before {today} is out of range",
                        self.config.lookback_months
                    ))
                })?;
            debug!("no stored date range, defaulting to {start} to {today}");
            return Ok((start, today));
        }

        let start = self.stored_date(&format!("{DATERANGE_KEY}.start"))?;
        let end = self.stored_date(&format!("{DATERANGE_KEY}.end"))?;
        Ok((start, end))
    }

    fn stored_date(&self, key: &str) -> Result<NaiveDate, FilterError> {
        match self.store.get(&self.path(key)) {
            Some(Value::String(s)) => daterange::parse_date(&s),
            Some(other) => Err(FilterError::Parse {
                input: other.to_string(),
                reason: "expected a date string".into(),
            }),
            None => Err(FilterError::InvalidData(format!(
                "{} is not set",
                self.path(key)
            ))),
        }
    }

    /// The stored date range, optionally widened to whole Monday-Sunday weeks.
    pub fn stored_daterange(&self, full_weeks: bool) -> Result<DateRange, FilterError> {
        self.stored_daterange_on(daterange::today_in(self.config.timezone), full_weeks)
    }

    pub fn stored_daterange_on(
        &self,
        today: NaiveDate,
        full_weeks: bool,
    ) -> Result<DateRange, FilterError> {
        let (mut start, mut end) = self.stored_bounds_on(today)?;
        if full_weeks {
            (start, end) = daterange::full_weeks(start, end)?;
        }
        daterange::build_range_from_bounds(start, end)
    }

    /// The period immediately before the stored date range.
    pub fn previous_daterange(&self) -> Result<DateRange, FilterError> {
        self.previous_daterange_on(daterange::today_in(self.config.timezone))
    }

    pub fn previous_daterange_on(&self, today: NaiveDate) -> Result<DateRange, FilterError> {
        let current = self.stored_daterange_on(today, false)?;
        daterange::previous_range(&current)
    }
}
