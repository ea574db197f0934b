//! Quiz core: answer normalization and matching, the per-question round
//! state machine, and the session score keeping around it.

pub mod aliases;
pub mod error;
pub mod game;
pub mod matcher;
pub mod normalize;
pub mod round;
pub mod session;
