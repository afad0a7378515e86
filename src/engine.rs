use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::journal::EventSink;
use crate::models::{LogEvent, SessionOutcome};
use crate::prober::Prober;
use crate::tracker::DowntimeTracker;

/// One monitoring run, from `SessionStart` to `SessionStop`.
pub struct Session<P, S> {
    target: String,
    interval: Duration,
    prober: P,
    tracker: DowntimeTracker,
    log: S,
}

impl<P: Prober, S: EventSink> Session<P, S> {
    /// Records `SessionStart`. Nothing is probed until [`Session::run`].
    pub async fn start(target: String, interval: Duration, prober: P, mut log: S) -> Result<Self> {
        log.emit(&LogEvent::SessionStart { target: target.clone(), interval })
            .await
            .context("Failed to record session start")?;

        info!("Monitoring {} every {}s", target, interval.as_secs_f64());

        Ok(Self {
            target,
            interval,
            prober,
            tracker: DowntimeTracker::new(),
            log,
        })
    }

    /// Probes until `shutdown` resolves or a fault occurs. The log always
    /// ends with `SessionStop`, preceded by `Exception` on a fault.
    pub async fn run<F>(mut self, shutdown: F) -> SessionOutcome
    where
        F: Future<Output = ()>,
    {
        let result = self.watch(shutdown).await;
        self.close(result).await
    }

    async fn watch<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let result = tokio::select! {
                biased;
                _ = &mut shutdown => return Ok(()),
                result = self.prober.probe(&self.target) => result?,
            };
            if let Some(event) = self.tracker.observe(&result) {
                self.log.emit(&event).await?;
            }
            debug!(
                "Probe at {}: reachable={}, status={:?}",
                result.timestamp,
                result.reachable,
                self.tracker.status()
            );

            tokio::select! {
                biased;
                _ = &mut shutdown => return Ok(()),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    async fn close(mut self, result: Result<()>) -> SessionOutcome {
        if let Some(since) = self.tracker.downtime_start() {
            warn!("Stopping during an outage that began at {}; its end is not recorded", since);
        }

        let outcome = match result {
            Ok(()) => SessionOutcome::Cancelled,
            Err(e) => {
                error!("Session fault: {:#}", e);
                let event = LogEvent::Exception { message: format!("{:#}", e) };
                if let Err(log_err) = self.log.emit(&event).await {
                    error!("Failed to record exception: {:#}", anyhow::Error::from(log_err));
                }
                SessionOutcome::Faulted(e)
            }
        };

        match self.log.emit(&LogEvent::SessionStop).await {
            Ok(()) => outcome,
            Err(log_err) => {
                let log_err = anyhow::Error::from(log_err);
                error!("Failed to record session stop: {:#}", log_err);
                match outcome {
                    SessionOutcome::Cancelled => SessionOutcome::Faulted(log_err),
                    faulted => faulted,
                }
            }
        }
    }
}
