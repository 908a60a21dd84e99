//! Two-agent project builder.
//!
//! A run turns a named task template ("skill") plus a free-text request into
//! a generated project: a generation agent writes the code into a fresh
//! per-run directory, a review agent inspects it (and may repair critical
//! findings in place), and at most one fix round is sent back for critical
//! findings. Every run that gets past
//! preparation ends in a single [`core::types::DeliveryRecord`].
//!
//! - **[`core`]**: Pure logic (report parsing, fix policy, delivery records).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side effects (config, skill files, agent processes, run logs).
//! - **[`agents`]**: The generation and review adapters over [`io::agent::Agent`].
//! - **[`workflow`]**: The state machine sequencing them.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workflow;
