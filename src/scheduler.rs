//! Repeats the sync cycle on a fixed interval.
//!
//! Each cycle runs in its own task, so an error or a panic inside one cycle
//! is logged and the next cycle is scheduled as usual.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Duration,
    /// Upper bound of the random delay added to each interval.
    pub jitter: Duration,
}

impl Schedule {
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.interval;
        }
        let max_extra = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        let extra = rand::thread_rng().gen_range(0..=max_extra);
        self.interval + Duration::from_millis(extra)
    }
}

/// Run `cycle` until `shutdown` completes, sleeping `schedule` between runs.
///
/// Shutdown is only observed between cycles. Returns how many cycles ran.
pub async fn supervise<F, Fut, S>(schedule: Schedule, mut cycle: F, shutdown: S) -> usize
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut cycles = 0;

    loop {
        match tokio::spawn(cycle()).await {
            Ok(Ok(())) => info!("sync success"),
            Ok(Err(e)) => error!(error = %format!("{e:#}"), "sync error"),
            Err(e) => error!(error = %e, "sync cycle aborted"),
        }
        cycles += 1;

        let delay = schedule.next_delay();
        debug!(delay = %humantime::format_duration(delay), "next sync scheduled");

        tokio::select! {
            _ = &mut shutdown => {
                info!(cycles, "stopping sync loop");
                return cycles;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[test]
    fn test_delay_without_jitter_is_the_interval() {
        let schedule = Schedule {
            interval: Duration::from_secs(600),
            jitter: Duration::ZERO,
        };
        assert_eq!(schedule.next_delay(), Duration::from_secs(600));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let schedule = Schedule {
            interval: Duration::from_secs(600),
            jitter: Duration::from_secs(30),
        };
        for _ in 0..100 {
            let delay = schedule.next_delay();
            assert!(delay >= Duration::from_secs(600));
            assert!(delay <= Duration::from_secs(630));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_or_shift_the_loop() {
        let schedule = Schedule {
            interval: Duration::from_secs(600),
            jitter: Duration::ZERO,
        };
        let started = Instant::now();
        let runs: Arc<Mutex<Vec<Duration>>> = Arc::default();

        let cycle = {
            let runs = runs.clone();
            move || {
                let runs = runs.clone();
                async move {
                    let count = {
                        let mut runs = runs.lock().unwrap();
                        runs.push(started.elapsed());
                        runs.len()
                    };
                    match count {
                        1 => anyhow::bail!("calendar unavailable"),
                        2 => panic!("cycle blew up"),
                        _ => Ok(()),
                    }
                }
            }
        };

        let cycles = supervise(
            schedule,
            cycle,
            tokio::time::sleep(Duration::from_secs(1500)),
        )
        .await;

        assert_eq!(cycles, 3);
        assert_eq!(
            *runs.lock().unwrap(),
            vec![
                Duration::ZERO,
                Duration::from_secs(600),
                Duration::from_secs(1200),
            ]
        );
    }
}
