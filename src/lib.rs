//! compairr-rs library crate: exposes the sequence store, neighbor engine,
//! and subcommand implementations so both the `compairr` binary and the
//! crate's integration tests can drive them directly.

pub mod alphabet;
pub mod bloom;
pub mod cli;
pub mod commands;
pub mod common;
pub mod engine;
pub mod err;
pub mod hashindex;
pub mod output;
pub mod pool;
pub mod score;
pub mod store;
pub mod variants;
pub mod zobrist;
