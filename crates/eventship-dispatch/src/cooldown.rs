//! Cooldown timer: single-shot debounce window between send starts.
//!
//! The timer itself does not sleep. `arm` hands back an [`Arming`] that the
//! service turns into a tokio sleep; the sleep reports back with the arming's
//! generation and `expire` ignores generations that have been superseded.

use std::time::Duration;

pub use eventship_core::config::CooldownPolicy;

/// A countdown the caller must start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arming {
    pub generation: u64,
    pub after: Duration,
}

/// Single-shot cooldown state.
#[derive(Debug, Clone)]
pub struct CooldownTimer {
    duration: Duration,
    policy: CooldownPolicy,
    generation: u64,
    armed: bool,
}

impl CooldownTimer {
    pub fn new(duration: Duration, policy: CooldownPolicy) -> Self {
        Self {
            duration,
            policy,
            generation: 0,
            armed: false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn policy(&self) -> CooldownPolicy {
        self.policy
    }

    /// Generation of the most recent arming.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a window. Returns `None` when the policy keeps a running window.
    pub fn arm(&mut self) -> Option<Arming> {
        if self.armed && self.policy == CooldownPolicy::KeepExisting {
            return None;
        }
        self.generation += 1;
        self.armed = true;
        Some(Arming {
            generation: self.generation,
            after: self.duration,
        })
    }

    /// Handle a countdown finishing. Returns `false` for a stale generation,
    /// in which case the timer is unchanged.
    pub fn expire(&mut self, generation: u64) -> bool {
        if !self.armed || generation != self.generation {
            return false;
        }
        self.armed = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_and_expire() {
        let mut timer = CooldownTimer::new(Duration::from_secs(3), CooldownPolicy::Restart);
        assert!(!timer.is_armed());
        assert_eq!(timer.duration(), Duration::from_secs(3));
        assert_eq!(timer.policy(), CooldownPolicy::Restart);
        let arming = timer.arm().unwrap();
        assert_eq!(timer.generation(), arming.generation);
        assert_eq!(arming.after, Duration::from_secs(3));
        assert!(timer.is_armed());
        assert!(timer.expire(arming.generation));
        assert!(!timer.is_armed());
        // A second expiry for the same arming is a no-op
        assert!(!timer.expire(arming.generation));
    }

    #[test]
    fn test_restart_supersedes_running_window() {
        let mut timer = CooldownTimer::new(Duration::from_secs(3), CooldownPolicy::Restart);
        let first = timer.arm().unwrap();
        let second = timer.arm().unwrap();
        assert!(second.generation > first.generation);
        assert!(!timer.expire(first.generation));
        assert!(timer.is_armed());
        assert!(timer.expire(second.generation));
    }

    #[test]
    fn test_keep_existing_ignores_rearm() {
        let mut timer = CooldownTimer::new(Duration::from_secs(3), CooldownPolicy::KeepExisting);
        let first = timer.arm().unwrap();
        assert_eq!(timer.arm(), None);
        assert!(timer.expire(first.generation));
        // Re-arms normally once the window has closed
        assert!(timer.arm().is_some());
    }
}
