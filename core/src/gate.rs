use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{CoreError, Result};

/// Coarse process-wide gate over the API surface.
///
/// One bucket for every caller and endpoint: a call is admitted only when at
/// least `window` has elapsed since the previously *admitted* call. Rejected
/// calls leave the bucket untouched.
#[derive(Clone)]
pub struct ApiGate {
    window: Duration,
    last: Arc<Mutex<Option<Instant>>>,
}

impl ApiGate {
    /// Gate admitting at most one call per `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Admit or reject the call happening now.
    pub fn check(&self) -> Result<()> {
        self.check_at(Instant::now())
    }

    fn check_at(&self, now: Instant) -> Result<()> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = *last {
            let elapsed = now.saturating_duration_since(prev);
            if elapsed < self.window {
                let wait = (self.window - elapsed).as_millis() as u64;
                return Err(CoreError::RateLimited(wait));
            }
        }
        *last = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calls_inside_the_window_are_rejected() {
        let gate = ApiGate::new(Duration::from_secs(1));
        let t0 = Instant::now();
        assert!(gate.check_at(t0).is_ok());
        assert!(matches!(
            gate.check_at(t0 + Duration::from_millis(400)),
            Err(CoreError::RateLimited(_))
        ));
    }

    #[test]
    fn calls_spaced_a_full_window_apart_both_pass() {
        let gate = ApiGate::new(Duration::from_secs(1));
        let t0 = Instant::now();
        assert!(gate.check_at(t0).is_ok());
        assert!(gate.check_at(t0 + Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn rejections_do_not_push_the_window_forward() {
        let gate = ApiGate::new(Duration::from_secs(1));
        let t0 = Instant::now();
        assert!(gate.check_at(t0).is_ok());
        assert!(gate.check_at(t0 + Duration::from_millis(900)).is_err());
        // still measured from t0, not from the rejected call
        assert!(gate.check_at(t0 + Duration::from_millis(1100)).is_ok());
    }
}
