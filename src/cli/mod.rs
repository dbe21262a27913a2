//! Command Line Interface (CLI) layer for garmentprep.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for directory and session
//! processing flows. It wires user-provided options to the underlying
//! library functionality exposed via `garmentprep::api`.
//!
//! If you are embedding garmentprep into another application, prefer using
//! the high-level `garmentprep::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
