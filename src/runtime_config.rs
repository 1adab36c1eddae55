//! # Runtime Configuration Module
//!
//! Environment-variable based tuning of the server runtime.
//!
//! ## Environment Variables
//!
//! - `GANTRY_WORKERS`: number of worker coroutines parsing and handling
//!   requests (default: 1)
//! - `GANTRY_MAX_HEADER_SIZE`: framing limit for a request's header block
//!   in bytes (default: 8 KiB); connections exceeding it are answered
//!   with 400 and closed
//! - `GANTRY_STACK_SIZE`: stack size for spawned coroutines in bytes
//!   (default: 0x10000)
//!
//! Each accepts decimal (`65536`) or hexadecimal (`0x10000`) values.
//! Programmatic setters on [`Server`](crate::Server) override the
//! environment.

use std::env;

pub const DEFAULT_WORKERS: usize = 1;
pub const DEFAULT_MAX_HEADER_SIZE: usize = 8 * 1024;
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Runtime configuration loaded at server construction.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Worker coroutines popping the ingress queue.
    pub workers: usize,
    /// Header block size limit enforced by the receiver stage.
    pub max_header_size: usize,
    /// Stack size for spawned coroutines in bytes.
    pub stack_size: usize,
}

impl RuntimeConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self {
            workers: parse_env("GANTRY_WORKERS").unwrap_or(DEFAULT_WORKERS).max(1),
            max_header_size: parse_env("GANTRY_MAX_HEADER_SIZE").unwrap_or(DEFAULT_MAX_HEADER_SIZE),
            stack_size: parse_env("GANTRY_STACK_SIZE").unwrap_or(DEFAULT_STACK_SIZE),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

fn parse_env(name: &str) -> Option<usize> {
    let value = env::var(name).ok()?;
    if let Some(hex) = value.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}
