//! External tool abstractions
//!
//! This module provides trait-based abstractions for the external programs
//! the procedures drive (apt-get, cmake, make, docker, ...), enabling testable
//! code through dependency injection and mock implementations.

pub mod command;
pub mod mocks;

pub use command::{
    CommandError, CommandExecutor, CommandOutput, Invocation, OutputMode, ProcessCommandExecutor,
    StdinPayload,
};
