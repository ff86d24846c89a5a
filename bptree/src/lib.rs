// Test code is allowed to use unwrap()/expect() for convenience.
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod shell;
pub mod storage;

mod scenario_tests;
