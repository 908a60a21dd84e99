//! Adapters wrapping the agent capability for the two pipeline roles.

pub mod developer;
pub mod reviewer;
