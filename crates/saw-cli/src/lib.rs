//! Library surface of the `saw` command-line tool.
//!
//! The binary's argument parsing and command wiring live in `main.rs`;
//! the pieces here are shared with the integration tests.

pub mod ingest;
pub mod logging;
pub mod settings;
pub mod summary;
