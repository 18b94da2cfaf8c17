//! Pure transition rules for the sale lifecycle.
//!
//! UPCOMING -> ACTIVE once the start time is reached, ACTIVE -> ENDED once
//! the end time is reached or stock hits zero, ENDED is terminal. The same
//! decision table is mirrored inside the Redis scripts so that transitions
//! observed under concurrency agree with these rules.

use chrono::{DateTime, Utc};

use crate::domain::sale::SaleState;
use crate::domain::stock::Stock;
use crate::domain::time_range::TimeRange;

pub struct TransitionContext {
    pub now: DateTime<Utc>,
    pub time_range: TimeRange,
    pub stock: Stock,
}

pub fn can_transition(current: SaleState, target: SaleState, ctx: &TransitionContext) -> bool {
    next_state(current, ctx) == Some(target)
}

pub fn next_state(current: SaleState, ctx: &TransitionContext) -> Option<SaleState> {
    match current {
        SaleState::Upcoming if !ctx.time_range.is_before_start(ctx.now) => Some(SaleState::Active),
        SaleState::Active if ctx.time_range.is_past_end(ctx.now) || ctx.stock.is_zero() => {
            Some(SaleState::Ended)
        }
        _ => None,
    }
}
