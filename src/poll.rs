use crate::api::SnapshotClient;
use crate::model::Snapshot;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use tracing::{debug, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum PollEvent {
    Snapshot(Snapshot),
    Failed {
        error: String,
        consecutive_failures: u32,
    },
}

/// Background polling task. Each fetch is chained from the completion of the
/// previous one, so a slow backend self-throttles and at most one request is
/// in flight. Failures reschedule too, with capped exponential backoff.
pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn spawn(
        client: SnapshotClient,
        interval: Duration,
        events: UnboundedSender<PollEvent>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut consecutive_failures = 0u32;

            loop {
                let event = match client.fetch_snapshot().await {
                    Ok(snapshot) => {
                        consecutive_failures = 0;
                        PollEvent::Snapshot(snapshot)
                    }
                    Err(error) => {
                        consecutive_failures = consecutive_failures.saturating_add(1);
                        warn!(consecutive_failures, "snapshot poll failed: {error:#}");
                        PollEvent::Failed {
                            error: format!("{error:#}"),
                            consecutive_failures,
                        }
                    }
                };

                if events.send(event).is_err() {
                    debug!("poll event channel closed, stopping poller");
                    break;
                }

                sleep(backoff_delay(interval, consecutive_failures)).await;
            }
        });

        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

fn backoff_delay(interval: Duration, consecutive_failures: u32) -> Duration {
    if consecutive_failures == 0 {
        return interval;
    }
    let exponent = consecutive_failures.saturating_sub(1).min(16);
    let scaled = interval.saturating_mul(2u32.saturating_pow(exponent));
    scaled.min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::backoff_delay;
    use tokio::time::Duration;

    #[test]
    fn healthy_polls_use_the_base_interval() {
        assert_eq!(
            backoff_delay(Duration::from_secs(1), 0),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn backoff_doubles_per_failure() {
        let interval = Duration::from_secs(1);
        assert_eq!(backoff_delay(interval, 1), Duration::from_secs(1));
        assert_eq!(backoff_delay(interval, 2), Duration::from_secs(2));
        assert_eq!(backoff_delay(interval, 3), Duration::from_secs(4));
        assert_eq!(backoff_delay(interval, 4), Duration::from_secs(8));
    }

    #[test]
    fn backoff_caps_at_the_upper_bound() {
        let interval = Duration::from_secs(1);
        assert_eq!(backoff_delay(interval, 10), Duration::from_secs(30));
        assert_eq!(backoff_delay(interval, u32::MAX), Duration::from_secs(30));
    }
}
