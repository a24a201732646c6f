//! Integration tests for rb-dbquery.
//!
//! These run end-to-end against temporary sqlite databases and registry
//! directories; no external server is required.
//!
//! Run with: `cargo test --test integration_tests`

mod integration;
