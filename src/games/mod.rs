//! Game models: turn a state plus the oracle's decision into weighted branches.

pub mod long_jump;
pub mod sprint;
