//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Keystrokes accepted per connection per second
pub const KEYSTROKE_RATE_LIMIT: u32 = 30;

/// New telnet connections accepted per second, server-wide
pub const CONNECT_RATE_LIMIT: u32 = 20;

/// Per-connection keystroke limiter
#[derive(Clone)]
pub struct KeystrokeLimiter {
    limiter: Arc<Limiter>,
}

impl KeystrokeLimiter {
    pub fn new() -> Self {
        Self {
            limiter: create_limiter(KEYSTROKE_RATE_LIMIT),
        }
    }

    /// Returns true if the keystroke may be applied
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for KeystrokeLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keystroke_burst_is_capped() {
        let limiter = KeystrokeLimiter::new();
        let accepted = (0..200).filter(|_| limiter.check()).count();
        assert!(accepted >= 1);
        assert!(accepted <= KEYSTROKE_RATE_LIMIT as usize + 1);
    }
}
