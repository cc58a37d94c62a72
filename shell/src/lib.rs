//! duosh: a small interactive shell that runs a command, or a two-stage
//! pipeline, with optional `<`/`>` redirection and `&` background jobs.
//!
//! Each line goes through [`parser`], [`redirect`], [`eval`] and [`job`], in
//! that order.

pub mod builtin;
pub mod error;
pub mod eval;
pub mod global;
pub mod job;
pub mod logging;
pub mod parser;
pub mod redirect;
pub mod types;

pub use error::{Error, ParseError, Result};
