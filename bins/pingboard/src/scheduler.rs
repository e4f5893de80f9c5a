use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::interval;
use tracing::{debug, info, warn};

use pb_core::job::Outcome;
use pb_core::store::JobStore;

use crate::module::{Module, ModuleCtx};
use crate::prober::{Prober, SystemPing};

/// Background loop driving due ping jobs once per fixed tick.
pub struct Scheduler {
    tick_ms: u64,
    max_probes: usize,
}

impl Scheduler {
    pub fn new(tick_ms: u64, max_probes: usize) -> Self {
        Self { tick_ms, max_probes }
    }
}

impl Module for Scheduler {
    fn name(&self) -> &'static str {
        "scheduler"
    }

    fn spawn(self: Box<Self>, mut ctx: ModuleCtx) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move {
            let prober: Arc<dyn Prober> =
                Arc::new(SystemPing::new(Duration::from_millis(ctx.cfg.probe_timeout_ms)));
            let sem = Arc::new(Semaphore::new(self.max_probes));
            let mut tick = interval(Duration::from_millis(self.tick_ms));

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        run_due(&ctx.store, &prober, &sem, now_ms()).await;
                    }
                    changed = ctx.shutdown.changed() => {
                        if changed.is_ok() && *ctx.shutdown.borrow() {
                            info!("scheduler stopping");
                            break;
                        }
                    }
                }
            }
            Ok(())
        })
    }
}

/// One scheduler pass: snapshot the registry, probe every runnable target
/// off-lock, then feed the outcomes back.
///
/// The pass drains its probes before returning, so a target can never be
/// dispatched twice concurrently.
async fn run_due(store: &JobStore, prober: &Arc<dyn Prober>, sem: &Arc<Semaphore>, now: u64) {
    let snapshot = store.list();

    let mut probes = JoinSet::new();
    for (target, job) in snapshot {
        if !job.runnable(now) {
            continue;
        }
        // Saturated gate: leave the job for the next tick.
        let Ok(permit) = sem.clone().try_acquire_owned() else { continue };
        let prober = prober.clone();
        probes.spawn(async move {
            let outcome = prober.probe(&target).await;
            drop(permit);
            (target, outcome)
        });
    }

    while let Some(joined) = probes.join_next().await {
        let Ok((target, outcome)) = joined else {
            warn!("probe task died before reporting");
            continue;
        };
        match outcome {
            Outcome::Success => debug!("probe ok target={}", target),
            _ => info!("probe failed target={}", target),
        }
        store.record_result(&target, outcome, now);
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pb_core::job::{JobStatus, Mode};

    const T0: u64 = 1_700_000_000_000;

    struct Canned(Outcome);

    #[async_trait]
    impl Prober for Canned {
        async fn probe(&self, _target: &str) -> Outcome {
            self.0
        }
    }

    /// Succeeds everywhere except one target, where the task panics.
    struct Exploding(&'static str);

    #[async_trait]
    impl Prober for Exploding {
        async fn probe(&self, target: &str) -> Outcome {
            if target == self.0 {
                panic!("probe blew up");
            }
            Outcome::Success
        }
    }

    fn harness(outcome: Outcome) -> (JobStore, Arc<dyn Prober>, Arc<Semaphore>) {
        (
            JobStore::new(),
            Arc::new(Canned(outcome)),
            Arc::new(Semaphore::new(8)),
        )
    }

    #[tokio::test]
    async fn a_pass_probes_exactly_the_runnable_set() {
        let (store, prober, sem) = harness(Outcome::Success);
        store.upsert("10.0.0.1", Mode::Continuous, 1, None).unwrap();
        store.upsert("10.0.0.2", Mode::Continuous, 1, None).unwrap();
        store.stop("10.0.0.2").unwrap();

        run_due(&store, &prober, &sem, T0).await;

        let jobs = store.list();
        assert_eq!(jobs["10.0.0.1"].count, 1);
        assert_eq!(jobs["10.0.0.1"].last_result, Outcome::Success);
        assert_eq!(jobs["10.0.0.2"].count, 0);
        assert_eq!(jobs["10.0.0.2"].last_result, Outcome::Unknown);
    }

    #[tokio::test]
    async fn back_to_back_passes_respect_the_interval() {
        let (store, prober, sem) = harness(Outcome::Success);
        store.upsert("10.0.0.1", Mode::Continuous, 2, None).unwrap();

        run_due(&store, &prober, &sem, T0).await;
        run_due(&store, &prober, &sem, T0 + 500).await; // inside the interval
        assert_eq!(store.list()["10.0.0.1"].count, 1);

        run_due(&store, &prober, &sem, T0 + 2_500).await;
        assert_eq!(store.list()["10.0.0.1"].count, 2);
    }

    #[tokio::test]
    async fn custom_jobs_stop_at_quota_and_stay_there() {
        let (store, prober, sem) = harness(Outcome::Success);
        store.upsert("10.0.0.1", Mode::Custom, 2, Some(3)).unwrap();

        for i in 0..6 {
            run_due(&store, &prober, &sem, T0 + i * 2_500).await;
        }

        let job = &store.list()["10.0.0.1"];
        assert_eq!(job.count, 3);
        assert_eq!(job.status, JobStatus::Stopped);
        assert_eq!(job.last_result, Outcome::Success);
    }

    #[tokio::test]
    async fn single_jobs_probe_once_per_start() {
        let (store, prober, sem) = harness(Outcome::Success);
        store.upsert("10.0.0.1", Mode::Single, 1, None).unwrap();

        run_due(&store, &prober, &sem, T0).await;
        run_due(&store, &prober, &sem, T0 + 5_000).await;
        assert_eq!(store.list()["10.0.0.1"].count, 1);

        store.start("10.0.0.1").unwrap();
        run_due(&store, &prober, &sem, T0 + 10_000).await;
        let job = &store.list()["10.0.0.1"];
        assert_eq!(job.count, 1);
        assert_eq!(job.status, JobStatus::Stopped);
    }

    #[tokio::test]
    async fn failures_are_recorded_not_raised() {
        let (store, prober, sem) = harness(Outcome::Failure);
        store.upsert("10.0.0.1", Mode::Continuous, 1, None).unwrap();

        run_due(&store, &prober, &sem, T0).await;

        let job = &store.list()["10.0.0.1"];
        assert_eq!(job.count, 1);
        assert_eq!(job.last_result, Outcome::Failure);
        assert_eq!(job.status, JobStatus::Running);
    }

    #[tokio::test]
    async fn one_dying_probe_does_not_sink_the_pass() {
        let store = JobStore::new();
        let prober: Arc<dyn Prober> = Arc::new(Exploding("10.0.0.9"));
        let sem = Arc::new(Semaphore::new(8));
        store.upsert("10.0.0.1", Mode::Continuous, 1, None).unwrap();
        store.upsert("10.0.0.9", Mode::Continuous, 1, None).unwrap();

        run_due(&store, &prober, &sem, T0).await;

        let jobs = store.list();
        assert_eq!(jobs["10.0.0.1"].count, 1);
        assert_eq!(jobs["10.0.0.1"].last_result, Outcome::Success);
        assert_eq!(jobs["10.0.0.9"].count, 0);
    }
}
