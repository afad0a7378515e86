use chrono::{DateTime, TimeDelta, Utc};
use tracing::{info, warn};

use crate::models::{format_duration, LogEvent, ProbeResult, Status};

/// Up/down state machine fed with one probe result per tick.
///
/// The tracker is down exactly when an outage start is recorded, so the
/// status and the start instant can never disagree.
#[derive(Debug, Default)]
pub struct DowntimeTracker {
    downtime_start: Option<DateTime<Utc>>,
}

impl DowntimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Status {
        if self.downtime_start.is_some() {
            Status::Down
        } else {
            Status::Up
        }
    }

    pub fn downtime_start(&self) -> Option<DateTime<Utc>> {
        self.downtime_start
    }

    /// Applies one probe result and returns the transition event, if any.
    pub fn observe(&mut self, result: &ProbeResult) -> Option<LogEvent> {
        match (self.downtime_start, result.reachable) {
            (None, false) => {
                warn!("[CHANGE] Up -> Down at {}", result.timestamp);
                self.downtime_start = Some(result.timestamp);
                Some(LogEvent::DowntimeStart { at: result.timestamp })
            }
            (Some(start), true) => {
                let mut duration = result.timestamp - start;
                if duration < TimeDelta::zero() {
                    warn!(
                        "Clock moved backwards during outage ({} -> {}), recording zero duration",
                        start, result.timestamp
                    );
                    duration = TimeDelta::zero();
                }
                info!("[CHANGE] Down -> Up after {}", format_duration(duration));
                self.downtime_start = None;
                Some(LogEvent::DowntimeEnd { at: result.timestamp, duration })
            }
            _ => None,
        }
    }
}
