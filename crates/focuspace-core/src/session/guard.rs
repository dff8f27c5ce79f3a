//! Confirmation prompts for destructive session actions.

use crate::storage::GuardConfig;

/// Something that can ask the user a yes/no question.
///
/// Closures of type `FnMut(&str) -> bool` implement it, which is what tests
/// use; the CLI prompts on stdin.
pub trait Confirm: Send {
    fn confirm(&mut self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool + Send,
{
    fn confirm(&mut self, message: &str) -> bool {
        self(message)
    }
}

/// Guards leaving a session and discarding progress on a preset change.
///
/// Nothing is asked while the session has not started: there is no
/// progress to lose.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    leave_message: String,
    duration_change_message: String,
}

impl NavigationGuard {
    pub fn new(leave_message: impl Into<String>, duration_change_message: impl Into<String>) -> Self {
        Self {
            leave_message: leave_message.into(),
            duration_change_message: duration_change_message.into(),
        }
    }

    pub fn leave_message(&self) -> &str {
        &self.leave_message
    }

    pub fn allow_leave(&self, has_started: bool, confirm: &mut dyn Confirm) -> bool {
        !has_started || confirm.confirm(&self.leave_message)
    }

    pub fn allow_duration_change(&self, has_started: bool, confirm: &mut dyn Confirm) -> bool {
        !has_started || confirm.confirm(&self.duration_change_message)
    }
}

impl From<&GuardConfig> for NavigationGuard {
    fn from(cfg: &GuardConfig) -> Self {
        Self::new(cfg.leave_message.clone(), cfg.duration_change_message.clone())
    }
}

impl Default for NavigationGuard {
    fn default() -> Self {
        Self::from(&GuardConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_prompt_before_start() {
        let guard = NavigationGuard::default();
        let mut asked = 0;
        let mut confirm = |_: &str| {
            asked += 1;
            false
        };
        assert!(guard.allow_leave(false, &mut confirm));
        assert!(guard.allow_duration_change(false, &mut confirm));
        assert_eq!(asked, 0);
    }

    #[test]
    fn started_session_asks_with_leave_message() {
        let guard = NavigationGuard::default();
        let mut seen = Vec::new();
        let mut confirm = |msg: &str| {
            seen.push(msg.to_string());
            false
        };
        assert!(!guard.allow_leave(true, &mut confirm));
        assert_eq!(
            seen,
            vec!["You might lose progress. Are you sure you want to leave this page?"]
        );
    }
}
