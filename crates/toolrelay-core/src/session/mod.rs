//! Conversations and the turn loop
//!
//! A [`Conversation`] owns one history. [`TurnOrchestrator::run_turn`] takes
//! it by `&mut`, so a conversation has exactly one turn in flight while
//! independent conversations can share one registry.

mod conversation;
mod orchestrator;
mod state;

pub use conversation::{Conversation, HistoryError, HistoryResult};
pub use orchestrator::{TurnEnd, TurnError, TurnOrchestrator, TurnOutcome};
pub use state::TurnState;
