use std::fmt;

use serde::{Deserialize, Serialize};

/// Repeat policy for a ping job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Probe forever, until explicitly stopped.
    Continuous,
    /// Probe a fixed number of times, then park the job.
    Custom,
    /// Probe exactly once, then park the job.
    Single,
}

/// Whether the scheduler may pick the job up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Eligible for scheduling.
    Running,
    /// Parked; retained, inspectable, restartable.
    Stopped,
}

/// Result of one probe attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Target answered.
    Success,
    /// DNS failure, timeout, unreachable, permission error: all land here.
    Failure,
    /// No probe has completed yet.
    Unknown,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Continuous => "continuous",
            Mode::Custom => "custom",
            Mode::Single => "single",
        })
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobStatus::Running => "running",
            JobStatus::Stopped => "stopped",
        })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Unknown => "unknown",
        })
    }
}

/// One monitored target with its repeat policy and run state.
///
/// Instances live inside the [`crate::store::JobStore`]; everything outside
/// the store only ever sees clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingJob {
    /// Repeat policy.
    pub mode: Mode,
    /// Minimum spacing between probes, seconds.
    pub interval_s: u64,
    /// Probes to run before auto-stop; meaningful for [`Mode::Custom`].
    pub target_count: u64,
    /// Scheduling eligibility.
    pub status: JobStatus,
    /// Unix time (ms) of the last completed probe; 0 means never probed.
    pub last_probe_ms: u64,
    /// Most recent probe outcome.
    pub last_result: Outcome,
    /// Probes executed since the job was last (re)started.
    pub count: u64,
    /// Wall-clock `HH:MM:SS` of the last mutation, display only.
    pub last_update: String,
}

impl PingJob {
    /// True once `interval_s` has fully elapsed since the last probe.
    /// A job that never probed is always due.
    pub fn due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_probe_ms) > self.interval_s.saturating_mul(1000)
    }

    /// Due-check combined with the per-mode completion guard; only jobs
    /// passing this are handed to the probe executor.
    pub fn runnable(&self, now_ms: u64) -> bool {
        if self.status != JobStatus::Running || !self.due(now_ms) {
            return false;
        }
        match self.mode {
            Mode::Continuous => true,
            Mode::Custom => self.count < self.target_count,
            Mode::Single => self.count < 1,
        }
    }

    /// True when a bounded mode has used up its probe quota.
    pub fn exhausted(&self) -> bool {
        match self.mode {
            Mode::Continuous => false,
            Mode::Custom => self.count >= self.target_count,
            Mode::Single => self.count >= 1,
        }
    }
}

/// Strict target grammar: an IPv4/IPv6 literal or an RFC-1123 hostname.
///
/// Targets end up as subprocess argv elements; nothing that could read as
/// shell syntax passes this check.
pub fn valid_target(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    if s.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }
    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}
