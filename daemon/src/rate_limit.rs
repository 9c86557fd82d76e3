use governor::{clock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use std::num::NonZeroU32;

use crate::config::RateLimitConfig;

/// Token bucket guarding the control socket against command floods.
pub struct CommandRateLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, clock::DefaultClock>,
    enabled: bool,
}

impl CommandRateLimiter {
    /// Zero rates are raised to 1; config validation rejects them earlier.
    pub fn new(commands_per_second: u32, burst_capacity: u32, enabled: bool) -> Self {
        let quota = Quota::per_second(Self::non_zero(commands_per_second))
            .allow_burst(Self::non_zero(burst_capacity));

        Self {
            limiter: RateLimiter::direct(quota),
            enabled,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.commands_per_second,
            config.burst_capacity,
            config.enabled,
        )
    }

    /// Non-blocking: `false` means the command should be rejected.
    pub fn check(&self) -> bool {
        if !self.enabled {
            return true;
        }

        self.limiter.check().is_ok()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn non_zero(value: u32) -> NonZeroU32 {
        NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
    }
}
