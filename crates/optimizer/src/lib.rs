//! Cloud optimizer daemon
//!
//! Runs fetch cycles on an interval and serves the resulting view, the
//! config and the health endpoints over HTTP.

pub mod api;
pub mod config;
