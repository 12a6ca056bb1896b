//! Retry policy for failed batches.
//!
//! The default is immediate and unbounded: a failed batch is re-sent at once,
//! with whatever arrived in the meantime merged in. Against a collector that
//! stays down this is a tight loop; `Exponential` is the hardened option.

use std::time::Duration;

use eventship_core::config::{RetryConfig, RetryStrategy};

/// Delay before re-sending a failed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    #[default]
    Immediate,
    /// `base * 2^(attempt - 1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl RetryPolicy {
    /// Delay before the retry that follows failed attempt number `attempt`
    /// (1 = the first send of the batch).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            RetryPolicy::Immediate => Duration::ZERO,
            RetryPolicy::Exponential { base, max } => {
                let shift = attempt.saturating_sub(1).min(31);
                base.checked_mul(1u32 << shift)
                    .map_or(max, |d| d.min(max))
            }
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        match config.strategy {
            RetryStrategy::Immediate => RetryPolicy::Immediate,
            RetryStrategy::Exponential => RetryPolicy::Exponential {
                base: Duration::from_millis(config.base_ms),
                max: Duration::from_millis(config.max_ms),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_never_waits() {
        let policy = RetryPolicy::Immediate;
        assert_eq!(policy.delay(1), Duration::ZERO);
        assert_eq!(policy.delay(1000), Duration::ZERO);
    }

    #[test]
    fn test_exponential_doubles_and_caps() {
        let policy = RetryPolicy::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_secs(1),
        };
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(4), Duration::from_millis(800));
        assert_eq!(policy.delay(5), Duration::from_secs(1));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_from_config() {
        assert_eq!(RetryPolicy::from(&RetryConfig::default()), RetryPolicy::Immediate);
        let config = RetryConfig {
            strategy: RetryStrategy::Exponential,
            base_ms: 250,
            max_ms: 4000,
        };
        assert_eq!(
            RetryPolicy::from(&config),
            RetryPolicy::Exponential {
                base: Duration::from_millis(250),
                max: Duration::from_secs(4),
            }
        );
    }
}
