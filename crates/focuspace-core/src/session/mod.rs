//! A focus session: timer, music and chime wired together, plus the
//! prompts and title that go with it.

mod guard;
mod orchestrator;
mod title;

pub use guard::{Confirm, NavigationGuard};
pub use orchestrator::{SelectOutcome, SessionOrchestrator, SessionParts, SessionView};
pub use title::{session_title, APP_TITLE};
