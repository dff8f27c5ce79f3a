use crate::timer::{format_clock, Phase};

pub const APP_TITLE: &str = "Focuspace";

/// Window title for the current session state.
///
/// `Focuspace` until the session has started, then `MM:SS | Focusing...`
/// or `MM:SS | Resting...`.
pub fn session_title(has_started: bool, phase: Phase, remaining_secs: u64) -> String {
    if !has_started {
        return APP_TITLE.to_string();
    }
    format!("{} | {}", format_clock(remaining_secs), phase.activity_label())
}
