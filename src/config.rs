//! Tunables shared by the client and server drivers.

use std::time::Duration;

/// How the client deadline reacts to incoming fragments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// The deadline is fixed when the request is sent.
    Fixed,
    /// Every newly accepted fragment pushes the deadline out by the request
    /// timeout.
    #[default]
    ResetOnProgress,
}

/// Timing and retry settings for a transfer session.
///
/// # Default Values
/// - `request_timeout`: 30 seconds
/// - `timeout_policy`: [`TimeoutPolicy::ResetOnProgress`]
/// - `reassembly_timeout`: 120 seconds
/// - `max_attempts`: 3
///
/// # Invariants
/// - `request_timeout` and `reassembly_timeout` are at least 1 millisecond
/// - `max_attempts` is at least 1
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Client deadline for one attempt.
    pub request_timeout: Duration,
    /// Whether progress extends the deadline.
    pub timeout_policy: TimeoutPolicy,
    /// Age after which an incomplete reassembly buffer is evicted.
    pub reassembly_timeout: Duration,
    /// Attempts allowed by the default retry policy, including the first.
    pub max_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            timeout_policy: TimeoutPolicy::default(),
            reassembly_timeout: Duration::from_secs(120),
            max_attempts: 3,
        }
    }
}

impl SessionConfig {
    /// Override the per-attempt request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the deadline policy.
    #[must_use]
    pub fn timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }

    /// Override the reassembly eviction age.
    #[must_use]
    pub fn reassembly_timeout(mut self, timeout: Duration) -> Self {
        self.reassembly_timeout = timeout;
        self
    }

    /// Override the number of attempts.
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Clamp values to their invariants.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use minihttp::config::SessionConfig;
    ///
    /// let cfg = SessionConfig::default()
    ///     .request_timeout(Duration::ZERO)
    ///     .max_attempts(0)
    ///     .normalized();
    /// assert_eq!(cfg.request_timeout, Duration::from_millis(1));
    /// assert_eq!(cfg.max_attempts, 1);
    /// ```
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.request_timeout = self.request_timeout.max(Duration::from_millis(1));
        self.reassembly_timeout = self.reassembly_timeout.max(Duration::from_millis(1));
        self.max_attempts = self.max_attempts.max(1);
        self
    }
}
