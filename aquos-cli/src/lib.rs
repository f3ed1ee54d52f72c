//! # aquos-cli: command-line remote for Sharp AQUOS TVs
//!
//! Connects once, sends one command (or a stream of them from the
//! interactive shell), prints each reply, and disconnects.

pub mod config;
pub mod output;
