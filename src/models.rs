use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use std::fmt::Write;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Up,
    Down,
}

/// Outcome of one reachability check, stamped when the check was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub timestamp: DateTime<Utc>,
    pub reachable: bool,
}

impl ProbeResult {
    #[cfg(test)]
    pub fn reachable(timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, reachable: true }
    }

    pub fn unreachable(timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, reachable: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    SessionStart { target: String, interval: Duration },
    DowntimeStart { at: DateTime<Utc> },
    DowntimeEnd { at: DateTime<Utc>, duration: TimeDelta },
    Exception { message: String },
    SessionStop,
}

impl LogEvent {
    /// Renders the event as the lines appended to the downtime log.
    pub fn lines(&self) -> Vec<String> {
        match self {
            LogEvent::SessionStart { target, interval } => vec![format!(
                "Starting script - target={} - interval={}",
                target,
                interval.as_secs_f64()
            )],
            LogEvent::DowntimeStart { at } => {
                vec![format!("Downtime start:    {}", format_timestamp(at))]
            }
            LogEvent::DowntimeEnd { at, duration } => vec![
                format!("Downtime end:      {}", format_timestamp(at)),
                format!("Downtime duration: {}", format_duration(*duration)),
            ],
            LogEvent::Exception { message } => vec![format!("Exception occured: {}", message)],
            LogEvent::SessionStop => vec!["Stopping script".into()],
        }
    }
}

/// How a monitoring session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    Cancelled,
    Faulted(anyhow::Error),
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `H:MM:SS[.ffffff]`, prefixed with `N day(s), ` past 24 hours.
pub fn format_duration(duration: TimeDelta) -> String {
    let total_us = duration.num_microseconds().unwrap_or(i64::MAX).max(0);
    let micros = total_us % 1_000_000;
    let total_secs = total_us / 1_000_000;
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    let mut out = String::new();
    if days > 0 {
        let _ = write!(out, "{} day{}, ", days, if days == 1 { "" } else { "s" });
    }
    let _ = write!(out, "{}:{:02}:{:02}", hours, minutes, seconds);
    if micros > 0 {
        let _ = write!(out, ".{:06}", micros);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, secs).unwrap()
    }

    #[test]
    fn test_session_start_line() {
        let event = LogEvent::SessionStart {
            target: "1.1.1.1".into(),
            interval: Duration::from_secs(10),
        };
        assert_eq!(event.lines(), vec!["Starting script - target=1.1.1.1 - interval=10"]);
    }

    #[test]
    fn test_downtime_lines() {
        let start = LogEvent::DowntimeStart { at: at(10) };
        assert_eq!(start.lines(), vec!["Downtime start:    2024-01-01T00:00:10.000000Z"]);

        let end = LogEvent::DowntimeEnd { at: at(30), duration: TimeDelta::seconds(20) };
        assert_eq!(
            end.lines(),
            vec![
                "Downtime end:      2024-01-01T00:00:30.000000Z",
                "Downtime duration: 0:00:20",
            ]
        );
    }

    #[test]
    fn test_exception_and_stop_lines() {
        let exc = LogEvent::Exception { message: "disk full".into() };
        assert_eq!(exc.lines(), vec!["Exception occured: disk full"]);
        assert_eq!(LogEvent::SessionStop.lines(), vec!["Stopping script"]);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(TimeDelta::zero()), "0:00:00");
        assert_eq!(format_duration(TimeDelta::seconds(30)), "0:00:30");
        assert_eq!(format_duration(TimeDelta::seconds(3_725)), "1:02:05");
        assert_eq!(format_duration(TimeDelta::milliseconds(1_500)), "0:00:01.500000");
        assert_eq!(format_duration(TimeDelta::seconds(86_400 + 7_384)), "1 day, 2:03:04");
        assert_eq!(format_duration(TimeDelta::days(3)), "3 days, 0:00:00");
        assert_eq!(format_duration(TimeDelta::seconds(-5)), "0:00:00");
    }
}
