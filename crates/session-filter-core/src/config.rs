use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::daterange::DEFAULT_DAY_COUNT;

/// Settings shared by the filter accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Top-level session key every filter lives under.
    pub namespace: String,
    /// Months looked back when no date range is stored.
    pub lookback_months: u32,
    /// Day count used when a range is requested without one.
    pub default_day_count: i64,
    /// Timezone that decides what "today" is.
    pub timezone: Tz,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            namespace: "search".to_string(),
            lookback_months: 1,
            default_day_count: DEFAULT_DAY_COUNT,
            timezone: Tz::UTC,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FilterConfig::default();
        assert_eq!(config.namespace, "search");
        assert_eq!(config.lookback_months, 1);
        assert_eq!(config.default_day_count, 7);
        assert_eq!(config.timezone, Tz::UTC);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: FilterConfig =
            serde_json::from_str(r#"{"namespace":"filters","timezone":"Europe/Amsterdam"}"#)
                .unwrap();
        assert_eq!(config.namespace, "filters");
        assert_eq!(config.timezone, chrono_tz::Europe::Amsterdam);
        assert_eq!(config.lookback_months, 1);
    }
}
