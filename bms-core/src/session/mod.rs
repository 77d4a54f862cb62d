//! Test-mode session gating privileged console commands.
//!
//! The session starts inactive. `teston` activates it, every accepted
//! command re-arms the timeout, and the session falls back to inactive on
//! `testoff` or once `timeout` has elapsed since the last arming.

use core::ops::Add;
use core::time::Duration;

/// Default window during which privileged commands stay available.
pub const DEFAULT_TEST_MODE_TIMEOUT: Duration = Duration::from_secs(30);

/// Session states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    Inactive,
    Active,
}

/// Result of an enable request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArmOutcome {
    /// The session transitioned from inactive to active.
    Enabled,
    /// The session was already active; only the timeout was re-armed.
    AlreadyEnabled,
}

/// Privileged-command authorisation window.
#[derive(Clone, Debug)]
pub struct TestModeSession<Instant> {
    state: SessionState,
    armed_at: Option<Instant>,
    timeout: Duration,
}

impl<Instant> TestModeSession<Instant>
where
    Instant: Copy + Ord + Add<Duration, Output = Instant>,
{
    /// Creates an inactive session with the provided timeout.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            state: SessionState::Inactive,
            armed_at: None,
            timeout,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Tick at which the timeout was last re-armed.
    #[must_use]
    pub fn armed_at(&self) -> Option<Instant> {
        self.armed_at
    }

    /// Activates the session (re-entrant) and re-arms the timeout.
    pub fn arm(&mut self, now: Instant) -> ArmOutcome {
        self.rearm(now);
        match self.state {
            SessionState::Active => ArmOutcome::AlreadyEnabled,
            SessionState::Inactive => {
                self.state = SessionState::Active;
                ArmOutcome::Enabled
            }
        }
    }

    /// Restarts the timeout window without changing the state.
    pub fn rearm(&mut self, now: Instant) {
        self.armed_at = Some(now);
    }

    /// Deactivates the session. Returns `true` if it was active.
    pub fn disarm(&mut self) -> bool {
        let was_active = self.is_active();
        self.state = SessionState::Inactive;
        was_active
    }

    /// Deactivates the session once the timeout has elapsed.
    ///
    /// Returns `true` exactly once per expiry.
    pub fn check_expired(&mut self, now: Instant) -> bool {
        if !self.is_active() {
            return false;
        }

        let expired = self
            .armed_at
            .is_none_or(|armed_at| now >= armed_at + self.timeout);
        if expired {
            self.state = SessionState::Inactive;
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    struct MockInstant(u64);

    impl Add<Duration> for MockInstant {
        type Output = Self;

        fn add(self, rhs: Duration) -> Self::Output {
            Self(self.0 + u64::try_from(rhs.as_millis()).unwrap())
        }
    }

    fn session() -> TestModeSession<MockInstant> {
        TestModeSession::new(Duration::from_millis(100))
    }

    #[test]
    fn starts_inactive() {
        let session = session();
        assert_eq!(session.state(), SessionState::Inactive);
        assert_eq!(session.armed_at(), None);
    }

    #[test]
    fn arm_is_reentrant_and_rearms() {
        let mut session = session();
        assert_eq!(session.arm(MockInstant(10)), ArmOutcome::Enabled);
        assert_eq!(session.arm(MockInstant(50)), ArmOutcome::AlreadyEnabled);
        assert!(session.is_active());
        assert_eq!(session.armed_at(), Some(MockInstant(50)));
    }

    #[test]
    fn expires_once_timeout_has_elapsed() {
        let mut session = session();
        session.arm(MockInstant(0));

        assert!(!session.check_expired(MockInstant(99)));
        assert!(session.is_active());

        assert!(session.check_expired(MockInstant(100)));
        assert!(!session.is_active());
        assert!(!session.check_expired(MockInstant(500)));
    }

    #[test]
    fn rearm_extends_the_window() {
        let mut session = session();
        session.arm(MockInstant(0));
        session.rearm(MockInstant(80));
        assert!(!session.check_expired(MockInstant(150)));
        assert!(session.check_expired(MockInstant(180)));
    }

    #[test]
    fn disarm_reports_previous_state() {
        let mut session = session();
        assert!(!session.disarm());
        session.arm(MockInstant(0));
        assert!(session.disarm());
        assert_eq!(session.state(), SessionState::Inactive);
    }
}
