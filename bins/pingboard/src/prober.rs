use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use pb_core::job::{valid_target, Outcome};

/// One bounded reachability check against a single target.
///
/// Implementations treat the target as pure data and return within their
/// deadline; every failure mode collapses to [`Outcome::Failure`].
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &str) -> Outcome;
}

/// Probes with the system `ping` utility, one echo request per call.
pub struct SystemPing {
    deadline: Duration,
}

impl SystemPing {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }
}

#[async_trait]
impl Prober for SystemPing {
    async fn probe(&self, target: &str) -> Outcome {
        // The store validates on upsert; re-check here so the subprocess can
        // never see anything but a hostname or address.
        if !valid_target(target) {
            return Outcome::Failure;
        }

        let mut cmd = Command::new("ping");
        cmd.args(if cfg!(windows) { ["-n", "1"] } else { ["-c", "1"] })
            .arg(target)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match timeout(self.deadline, cmd.status()).await {
            Ok(Ok(status)) if status.success() => Outcome::Success,
            Ok(Ok(status)) => {
                debug!("ping exit target={} code={:?}", target, status.code());
                Outcome::Failure
            }
            Ok(Err(e)) => {
                debug!("ping spawn target={} err={}", target, e);
                Outcome::Failure
            }
            Err(_) => {
                debug!("ping timeout target={}", target);
                Outcome::Failure
            }
        }
    }
}
