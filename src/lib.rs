//! postwatch - adaptive forum post discovery
//!
//! Polls a forum for newly created posts by walking a frontier of candidate
//! ids, throttles itself against the upstream rate limiter, persists the
//! latest confirmed post id, and fans discovered posts out to registered
//! handlers through a bounded queue.

pub mod admin;
pub mod cli;
pub mod config;
pub mod cursor;
pub mod daemon;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod frontier;
pub mod handler;
pub mod parse;
pub mod rate;

pub use error::{Result, WatchError};
