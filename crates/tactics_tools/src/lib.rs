//! # Tactics Development Tools
//!
//! Command-line tooling around the rules engine:
//! - Scenario loading and validation
//! - Headless auto-battles
//! - ASCII battle rendering

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ascii;
pub mod scenario;
pub mod simulate;
pub mod validate;
