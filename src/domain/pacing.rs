//! Request Pacing Policy
//!
//! Pure functions that turn (endpoint tier, attempt number) into a wait
//! duration. Callers decide how to sleep; nothing here touches a clock.

use std::time::Duration;

use super::endpoint::EndpointTier;

/// Upper bound on the backoff exponent
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Delay settings shared by the executor and the discovery pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    /// Fixed delay before the first attempt on a public endpoint
    pub request_delay: Duration,
    /// Base for exponential backoff between retries (`base * 2^attempt`)
    pub retry_base_delay: Duration,
    /// Pause between holder accounts when scanning over a public endpoint
    pub account_gap: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_millis(250),
            retry_base_delay: Duration::from_millis(100),
            account_gap: Duration::from_secs(3),
        }
    }
}

impl PacingConfig {
    /// No waiting at all (tests, local validators)
    pub fn none() -> Self {
        Self {
            request_delay: Duration::ZERO,
            retry_base_delay: Duration::ZERO,
            account_gap: Duration::ZERO,
        }
    }
}

/// Points in the discovery pipeline that get an explicit pause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Metadata,
    HolderAccounts,
    Signatures,
    Transaction,
    BetweenAccounts,
}

/// Wait before attempt `attempt` (0-based) of a single RPC call.
///
/// Attempt 0 gets the fixed request delay, which premium endpoints skip.
/// Later attempts back off exponentially on every tier.
pub fn wait_before(tier: EndpointTier, attempt: u32, config: &PacingConfig) -> Duration {
    if attempt == 0 {
        return match tier {
            EndpointTier::Public => config.request_delay,
            EndpointTier::Premium => Duration::ZERO,
        };
    }

    let factor = 1u32 << attempt.min(MAX_BACKOFF_EXPONENT);
    config.retry_base_delay.saturating_mul(factor)
}

/// Pause the pipeline takes before entering `stage`
pub fn stage_pause(tier: EndpointTier, stage: Stage, config: &PacingConfig) -> Duration {
    if tier.is_premium() {
        return Duration::ZERO;
    }

    match stage {
        Stage::Metadata | Stage::HolderAccounts => config.request_delay.saturating_mul(2),
        Stage::Signatures | Stage::Transaction => config.request_delay.saturating_mul(3),
        Stage::BetweenAccounts => config.account_gap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PacingConfig {
        PacingConfig {
            request_delay: Duration::from_millis(200),
            retry_base_delay: Duration::from_millis(100),
            account_gap: Duration::from_secs(3),
        }
    }

    #[test]
    fn test_first_attempt_uses_request_delay() {
        assert_eq!(
            wait_before(EndpointTier::Public, 0, &config()),
            Duration::from_millis(200)
        );
        assert_eq!(wait_before(EndpointTier::Premium, 0, &config()), Duration::ZERO);
    }

    #[test]
    fn test_exponential_backoff() {
        let c = config();
        assert_eq!(wait_before(EndpointTier::Public, 1, &c), Duration::from_millis(200));
        assert_eq!(wait_before(EndpointTier::Public, 2, &c), Duration::from_millis(400));
        assert_eq!(wait_before(EndpointTier::Premium, 3, &c), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_saturates() {
        let c = config();
        let huge = wait_before(EndpointTier::Public, 200, &c);
        assert_eq!(huge, Duration::from_millis(100) * (1 << 16));
    }

    #[test]
    fn test_stage_pauses() {
        let c = config();
        assert_eq!(
            stage_pause(EndpointTier::Public, Stage::HolderAccounts, &c),
            Duration::from_millis(400)
        );
        assert_eq!(
            stage_pause(EndpointTier::Public, Stage::Transaction, &c),
            Duration::from_millis(600)
        );
        assert_eq!(
            stage_pause(EndpointTier::Public, Stage::BetweenAccounts, &c),
            Duration::from_secs(3)
        );
        assert_eq!(
            stage_pause(EndpointTier::Premium, Stage::BetweenAccounts, &c),
            Duration::ZERO
        );
    }

    #[test]
    fn test_none_never_waits() {
        let c = PacingConfig::none();
        for attempt in 0..5 {
            assert_eq!(wait_before(EndpointTier::Public, attempt, &c), Duration::ZERO);
        }
    }
}
