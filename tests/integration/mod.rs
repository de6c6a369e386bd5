//! Integration tests for varsnap
//!
//! These tests drive producers, consumers and the assertion adapter together
//! against in-memory and HTTP snap stores.

#[path = "../common/mod.rs"]
pub mod common;

pub mod dispatch_flow;
pub mod end_to_end;
pub mod http_store;
pub mod watch_loop;
