use chrono::NaiveDate;
use serde_json::Value;
use session_filter_core::{FilterSession, SessionStore};
use tracing::debug;

use crate::error::QueryError;
use crate::query::WhereIn;

/// Adds a `column IN (...)` predicate for every `(filter_key, column)` pair
/// whose filter is set in the session. Unset filters are skipped.
pub fn apply_filters<S, Q>(
    filters: &FilterSession<S>,
    mut query: Q,
    keys: &[(&str, &str)],
) -> Result<Q, QueryError>
where
    S: SessionStore,
    Q: WhereIn,
{
    for (key, column) in keys {
        if !filters.has_filter(key) {
            continue;
        }
        let values = filters.filter_values(key);
        debug!("filter {key}: {column} IN {} value(s)", values.len());
        query.where_in(column, values)?;
    }
    Ok(query)
}

/// Restricts `column` to the dates of the stored (or default) date range.
pub fn apply_daterange<S, Q>(
    filters: &FilterSession<S>,
    mut query: Q,
    column: &str,
    today: NaiveDate,
) -> Result<Q, QueryError>
where
    S: SessionStore,
    Q: WhereIn,
{
    let range = filters.stored_daterange_on(today, false)?;
    debug!("daterange: {column} IN {} date(s)", range.len());
    let values = range
        .to_date_strings()
        .into_iter()
        .map(Value::String)
        .collect();
    query.where_in(column, values)?;
    Ok(query)
}
