use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

/// Wraps a cron-like string interpreted in UTC (spec §4.8). The `cron`
/// crate's six-field format (`sec min hour dom month dow`) is used; a
/// bare five-field crontab string is accepted by prefixing a `0` seconds
/// field, which is what operators typically write.
#[derive(Clone)]
pub struct CronSchedule {
    schedule: Schedule,
    raw: String,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid cron schedule `{raw}`: {source}")]
pub struct CronParseError {
    raw: String,
    #[source]
    source: cron::error::Error,
}

impl CronSchedule {
    pub fn parse(raw: &str) -> Result<Self, CronParseError> {
        let normalized = normalize(raw);
        let schedule = Schedule::from_str(&normalized)
            .map_err(|source| CronParseError { raw: raw.to_string(), source })?;
        Ok(Self { schedule, raw: raw.to_string() })
    }

    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

fn normalize(raw: &str) -> String {
    let field_count = raw.split_whitespace().count();
    if field_count == 5 {
        format!("0 {raw}")
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn five_field_crontab_string_is_accepted() {
        let schedule = CronSchedule::parse("*/5 * * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let next = schedule.next_after(after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 0, 5, 0).unwrap());
    }

    #[test]
    fn invalid_schedule_string_errors() {
        assert!(CronSchedule::parse("not a cron string").is_err());
    }
}
