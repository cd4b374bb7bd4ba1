//! # quakebook
//!
//! Command line front end for `quakebook-core`: configuration loading and
//! command implementations. The binary in `main.rs` only sets up logging.

pub mod cli;
pub mod config;
