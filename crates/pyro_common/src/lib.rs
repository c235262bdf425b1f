//! Shared foundational types used across the Pyro build tool.
//!
//! This crate provides the game title enumeration that drives flag file,
//! output layout and registry decisions, and the build timing accumulator.

#![warn(missing_docs)]

pub mod game;
pub mod timing;

pub use game::{GameType, ParseGameTypeError};
pub use timing::TimeElapsed;
