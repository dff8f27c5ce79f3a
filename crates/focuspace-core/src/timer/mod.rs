mod engine;
mod phase;
mod ticker;

pub use engine::{TickOutcome, TimerEngine, TimerState};
pub use phase::{format_clock, Phase};
pub use ticker::{
    ManualTicks, Subscription, SubscriptionId, TickGuard, TickSource, TokioTicks,
};
