//! Test suites for the gateway daemon.

mod concurrency;
mod support;
