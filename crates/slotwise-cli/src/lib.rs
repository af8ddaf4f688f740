//! Command-line front end for the slotwise engine.
//!
//! The binary builds an [`Engine`](slotwise_engine::Engine) over an
//! in-memory store, optionally seeded from a JSON fixture, and runs one
//! subcommand against it.

pub mod cli;
pub mod commands;
pub mod error;
