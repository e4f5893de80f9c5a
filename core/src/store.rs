use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Local;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::job::{valid_target, JobStatus, Mode, Outcome, PingJob};

/// Cloneable handle to the in-memory job registry.
///
/// Every read and mutation goes through this type; the underlying map is
/// never handed out. Critical sections are pure bookkeeping, so request
/// handlers block for microseconds, never for a probe round trip.
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<Mutex<HashMap<String, PingJob>>>,
}

impl JobStore {
    /// Fresh store with no registered targets.
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, HashMap<String, PingJob>> {
        // A poisoned lock still guards a structurally valid map.
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Point-in-time copy of every job, safe to iterate without the lock.
    pub fn list(&self) -> HashMap<String, PingJob> {
        self.locked().clone()
    }

    /// Register or wholesale-replace the job for `target`.
    ///
    /// Replacing resets run state: the job comes back [`JobStatus::Running`]
    /// with `count = 0` and no probe history.
    pub fn upsert(
        &self,
        target: &str,
        mode: Mode,
        interval_s: u64,
        target_count: Option<u64>,
    ) -> Result<PingJob> {
        if !valid_target(target) {
            return Err(CoreError::Validation(format!("bad target {target:?}")));
        }
        if interval_s < 1 {
            return Err(CoreError::Validation("interval must be >= 1s".into()));
        }
        let target_count = target_count.unwrap_or(1);
        if target_count < 1 {
            return Err(CoreError::Validation("target_count must be >= 1".into()));
        }

        let job = PingJob {
            mode,
            interval_s,
            target_count,
            status: JobStatus::Running,
            last_probe_ms: 0,
            last_result: Outcome::Unknown,
            count: 0,
            last_update: stamp(),
        };
        self.locked().insert(target.to_string(), job.clone());
        Ok(job)
    }

    /// Drop `target` if registered. Unknown targets are a no-op.
    pub fn remove(&self, target: &str) {
        self.locked().remove(target);
    }

    /// Rearm `target` for a fresh run: counter cleared, probe history
    /// cleared, status back to [`JobStatus::Running`].
    pub fn start(&self, target: &str) -> Result<()> {
        let mut jobs = self.locked();
        let job = jobs
            .get_mut(target)
            .ok_or_else(|| CoreError::NotFound(target.to_string()))?;
        job.count = 0;
        job.last_probe_ms = 0;
        job.status = JobStatus::Running;
        job.last_update = stamp();
        Ok(())
    }

    /// Park `target`: the scheduler skips it until the next `start`.
    /// Counter and last result stay as they are.
    pub fn stop(&self, target: &str) -> Result<()> {
        let mut jobs = self.locked();
        let job = jobs
            .get_mut(target)
            .ok_or_else(|| CoreError::NotFound(target.to_string()))?;
        job.status = JobStatus::Stopped;
        job.last_update = stamp();
        Ok(())
    }

    /// Apply one finished probe. Called by the scheduler only.
    ///
    /// A result landing after the job was removed is dropped; a result
    /// landing after `stop` is still applied (last-writer semantics).
    pub fn record_result(&self, target: &str, outcome: Outcome, probed_ms: u64) {
        let mut jobs = self.locked();
        let Some(job) = jobs.get_mut(target) else {
            debug!("stray result for unregistered target {target}");
            return;
        };
        job.count += 1;
        job.last_result = outcome;
        job.last_probe_ms = probed_ms;
        job.last_update = stamp();
        if job.exhausted() {
            job.status = JobStatus::Stopped;
        }
    }
}

fn stamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
