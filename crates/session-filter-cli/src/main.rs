use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use serde_json::Value;
use session_filter_core::daterange::{self, DateRange};
use session_filter_core::{FilterConfig, FilterSession, MemorySessionStore};
use session_filter_query::{SelectQuery, apply_daterange, apply_filters};
use tracing::{debug, info};

#[derive(Parser)]
#[command(
    name = "session-filter",
    about = "Build date ranges and inspect filters stored in a session snapshot"
)]
struct Cli {
    /// JSON session snapshot to read and update
    #[arg(long, default_value = "session.json")]
    session: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Session key that filters are stored under
    #[arg(long, default_value = "search")]
    namespace: String,

    /// Months to look back when no date range is stored
    #[arg(long, default_value_t = 1)]
    lookback_months: u32,

    /// IANA timezone that decides the current date
    #[arg(long, default_value = "UTC")]
    timezone: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the dates ending at an anchor date
    Range {
        /// Days to step back from the anchor (default 7)
        #[arg(long, allow_negative_numbers = true)]
        days: Option<i64>,

        /// Last date of the range (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        anchor: Option<NaiveDate>,
    },

    /// List every date between two bounds
    Between {
        #[arg(long)]
        start: NaiveDate,

        #[arg(long)]
        end: NaiveDate,
    },

    /// List the period before the given bounds (or the stored range)
    Previous {
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,

        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,
    },

    /// List the calendar months spanned by two dates
    Months {
        #[arg(long)]
        start: NaiveDate,

        #[arg(long)]
        end: NaiveDate,
    },

    /// Store a date range filter
    SetRange {
        #[arg(long)]
        start: NaiveDate,

        #[arg(long)]
        end: NaiveDate,
    },

    /// Show the stored date range (or the default lookback)
    Stored {
        /// Widen to whole Monday-Sunday weeks
        #[arg(long)]
        full_weeks: bool,
    },

    /// Store a filter value (JSON, or a plain string)
    Set { key: String, value: String },

    /// Print a stored filter value
    Get { key: String },

    /// Remove a stored filter
    Clear { key: String },

    /// Render a SELECT with the stored filters applied
    Query {
        /// Table to select from
        #[arg(long)]
        table: String,

        /// Filter to column mapping as key=column (repeatable)
        #[arg(short, long = "filter", value_parser = parse_mapping)]
        filters: Vec<(String, String)>,

        /// Restrict this column to the stored date range
        #[arg(long)]
        date_column: Option<String>,
    },
}

fn parse_mapping(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, column)) if !key.is_empty() && !column.is_empty() => {
            Ok((key.to_string(), column.to_string()))
        }
        _ => Err(format!("expected key=column, got '{arg}'")),
    }
}

fn range_lines(range: &DateRange) -> Vec<String> {
    range.to_date_strings()
}

fn cmd_range(config: &FilterConfig, days: Option<i64>, anchor: Option<NaiveDate>) -> Result<Vec<String>> {
    let days = days.unwrap_or(config.default_day_count);
    let anchor = anchor.unwrap_or_else(|| daterange::today_in(config.timezone));
    let range = daterange::build_range(days, anchor)
        .with_context(|| format!("failed to build {days}-day range ending {anchor}"))?;
    Ok(range_lines(&range))
}

fn cmd_previous(
    filters: &FilterSession<MemorySessionStore>,
    bounds: Option<(NaiveDate, NaiveDate)>,
) -> Result<Vec<String>> {
    let previous = match bounds {
        Some((start, end)) => {
            let current = daterange::build_range_from_bounds(start, end)?;
            daterange::previous_range(&current)
                .with_context(|| format!("no previous period for {start} to {end}"))?
        }
        None => filters
            .previous_daterange()
            .context("failed to compute previous period of stored range")?,
    };
    Ok(range_lines(&previous))
}

fn cmd_months(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    daterange::month_buckets(start, end)
        .iter()
        .map(|b| format!("{} {}", b.start, b.end))
        .collect()
}

fn cmd_get(filters: &FilterSession<MemorySessionStore>, key: &str) -> Result<Vec<String>> {
    let value = filters.get_filter(key);
    Ok(vec![serde_json::to_string_pretty(&value)?])
}

fn cmd_query(
    filters: &FilterSession<MemorySessionStore>,
    table: &str,
    mappings: &[(String, String)],
    date_column: Option<&str>,
) -> Result<Vec<String>> {
    let keys: Vec<(&str, &str)> = mappings
        .iter()
        .map(|(k, c)| (k.as_str(), c.as_str()))
        .collect();

    let query = SelectQuery::new(table)?;
    let mut query = apply_filters(filters, query, &keys).context("failed to apply filters")?;
    if let Some(column) = date_column {
        let today = daterange::today_in(filters.config().timezone);
        query = apply_daterange(filters, query, column, today)
            .context("failed to apply date range")?;
    }

    let params = serde_json::to_string(&query.params())?;
    Ok(vec![query.to_sql(), params])
}

fn run(cli: &Cli) -> Result<Vec<String>> {
    let timezone: Tz = cli
        .timezone
        .parse()
        .map_err(|e| anyhow::anyhow!("unknown timezone '{}': {e}", cli.timezone))?;
    let config = FilterConfig {
        namespace: cli.namespace.clone(),
        lookback_months: cli.lookback_months,
        timezone,
        ..FilterConfig::default()
    };

    let store = MemorySessionStore::load(&cli.session)
        .with_context(|| format!("failed to load session from {}", cli.session.display()))?;
    let mut filters = FilterSession::with_config(store, config);

    let (lines, modified) = match &cli.command {
        Commands::Range { days, anchor } => (cmd_range(filters.config(), *days, *anchor)?, false),
        Commands::Between { start, end } => {
            let range = daterange::build_range_from_bounds(*start, *end)?;
            (range_lines(&range), false)
        }
        Commands::Previous { start, end } => {
            (cmd_previous(&filters, start.zip(*end))?, false)
        }
        Commands::Months { start, end } => (cmd_months(*start, *end), false),
        Commands::SetRange { start, end } => {
            filters.set_daterange(*start, *end);
            info!("stored date range {start} to {end}");
            (Vec::new(), true)
        }
        Commands::Stored { full_weeks } => {
            let range = filters
                .stored_daterange(*full_weeks)
                .context("failed to read stored date range")?;
            (range_lines(&range), false)
        }
        Commands::Set { key, value } => {
            let parsed = serde_json::from_str(value).unwrap_or_else(|_| {
                debug!("value for {key} is not JSON, storing as string");
                Value::String(value.clone())
            });
            filters.set_filter(key, parsed);
            info!("stored filter {key}");
            (Vec::new(), true)
        }
        Commands::Get { key } => (cmd_get(&filters, key)?, false),
        Commands::Clear { key } => {
            let removed = filters.clear_filter(key).is_some();
            if removed {
                info!("cleared filter {key}");
            } else {
                info!("filter {key} was not set");
            }
            (Vec::new(), removed)
        }
        Commands::Query {
            table,
            filters: mappings,
            date_column,
        } => (
            cmd_query(&filters, table, mappings, date_column.as_deref())?,
            false,
        ),
    };

    if modified {
        filters
            .store()
            .save(&cli.session)
            .with_context(|| format!("failed to save session to {}", cli.session.display()))?;
    }

    Ok(lines)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    for line in run(&cli)? {
        println!("{line}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::Path;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn run_with(session: &Path, args: &[&str]) -> Result<Vec<String>> {
        let session = session.to_str().unwrap();
        let mut full = vec!["session-filter", "--session", session];
        full.extend_from_slice(args);
        run(&Cli::try_parse_from(full).unwrap())
    }

    #[test]
    fn parse_range_args() {
        let cli = Cli::try_parse_from([
            "session-filter",
            "range",
            "--days",
            "3",
            "--anchor",
            "2024-06-01",
        ])
        .unwrap();

        match cli.command {
            Commands::Range { days, anchor } => {
                assert_eq!(days, Some(3));
                assert_eq!(anchor, Some(date(2024, 6, 1)));
            }
            _ => panic!("expected Range command"),
        }
        assert_eq!(cli.session, PathBuf::from("session.json"));
        assert_eq!(cli.namespace, "search");
    }

    #[test]
    fn parse_negative_days() {
        let cli = Cli::try_parse_from(["session-filter", "range", "--days", "-2"]).unwrap();
        match cli.command {
            Commands::Range { days, .. } => assert_eq!(days, Some(-2)),
            _ => panic!("expected Range command"),
        }
    }

    #[test]
    fn parse_previous_requires_both_bounds() {
        let result = Cli::try_parse_from(["session-filter", "previous", "--start", "2024-01-01"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_query_mappings() {
        let cli = Cli::try_parse_from([
            "session-filter",
            "query",
            "--table",
            "orders",
            "-f",
            "status=orders.status",
            "--filter",
            "owner=owner_id",
        ])
        .unwrap();

        match cli.command {
            Commands::Query {
                table,
                filters,
                date_column,
            } => {
                assert_eq!(table, "orders");
                assert_eq!(
                    filters,
                    vec![
                        ("status".to_string(), "orders.status".to_string()),
                        ("owner".to_string(), "owner_id".to_string()),
                    ]
                );
                assert!(date_column.is_none());
            }
            _ => panic!("expected Query command"),
        }
    }

    #[test]
    fn parse_query_rejects_bad_mapping() {
        let result = Cli::try_parse_from(["session-filter", "query", "--table", "t", "-f", "status"]);
        assert!(result.is_err());
    }

    #[test]
    fn range_command_lists_dates() {
        let dir = tempfile::tempdir().unwrap();
        let lines = run_with(
            &dir.path().join("s.json"),
            &["range", "--days", "2", "--anchor", "2024-03-01"],
        )
        .unwrap();
        assert_eq!(lines, vec!["2024-02-28", "2024-02-29", "2024-03-01"]);
    }

    #[test]
    fn range_command_defaults_to_a_week() {
        let dir = tempfile::tempdir().unwrap();
        let lines = run_with(&dir.path().join("s.json"), &["range", "--anchor", "2024-06-01"]).unwrap();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines.first().unwrap(), "2024-05-25");
        assert_eq!(lines.last().unwrap(), "2024-06-01");
    }

    #[test]
    fn range_command_rejects_negative_days() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_with(
            &dir.path().join("s.json"),
            &["range", "--days", "-1", "--anchor", "2024-03-01"],
        );
        assert!(result.is_err());
    }

    #[test]
    fn months_command() {
        let dir = tempfile::tempdir().unwrap();
        let lines = run_with(
            &dir.path().join("s.json"),
            &["months", "--start", "2024-01-15", "--end", "2024-02-03"],
        )
        .unwrap();
        assert_eq!(
            lines,
            vec!["2024-01-01 2024-01-31", "2024-02-01 2024-02-29"]
        );
    }

    #[test]
    fn stored_range_round_trips_through_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("s.json");

        let lines = run_with(
            &session,
            &["set-range", "--start", "2024-03-08", "--end", "2024-03-14"],
        )
        .unwrap();
        assert!(lines.is_empty());
        assert!(session.exists());

        let stored = run_with(&session, &["stored"]).unwrap();
        assert_eq!(stored.len(), 7);
        assert_eq!(stored[0], "2024-03-08");

        let previous = run_with(&session, &["previous"]).unwrap();
        assert_eq!(previous.first().unwrap(), "2024-02-29");
        assert_eq!(previous.last().unwrap(), "2024-03-07");
    }

    #[test]
    fn set_get_clear_filter() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("s.json");

        run_with(&session, &["set", "status", r#"["open","pending"]"#]).unwrap();
        run_with(&session, &["set", "owner", "alice"]).unwrap();

        let got = run_with(&session, &["get", "owner"]).unwrap();
        assert_eq!(got, vec!["\"alice\""]);

        let sql = run_with(
            &session,
            &["query", "--table", "orders", "-f", "status=status", "-f", "owner=owner"],
        )
        .unwrap();
        assert_eq!(
            sql,
            vec![
                "SELECT * FROM orders WHERE status IN (?, ?) AND owner IN (?)".to_string(),
                r#"["open","pending","alice"]"#.to_string(),
            ]
        );

        run_with(&session, &["clear", "status"]).unwrap();
        let got = run_with(&session, &["get", "status"]).unwrap();
        assert_eq!(got, vec!["[]"]);
    }

    #[test]
    fn query_command_with_date_column() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("s.json");

        run_with(
            &session,
            &["set-range", "--start", "2024-02-28", "--end", "2024-03-01"],
        )
        .unwrap();
        run_with(&session, &["set", "status", r#"["open"]"#]).unwrap();

        let sql = run_with(
            &session,
            &[
                "query",
                "--table",
                "visits",
                "-f",
                "status=status",
                "--date-column",
                "visit_date",
            ],
        )
        .unwrap();
        assert_eq!(
            sql,
            vec![
                "SELECT * FROM visits WHERE status IN (?) AND visit_date IN (?, ?, ?)".to_string(),
                r#"["open","2024-02-28","2024-02-29","2024-03-01"]"#.to_string(),
            ]
        );
    }

    #[test]
    fn unknown_timezone_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_with(
            &dir.path().join("s.json"),
            &["--timezone", "Mars/Olympus", "stored"],
        );
        assert!(result.is_err());
    }
}
