//! End-to-end tests for verify-gateway.
//!
//! Each test drives a real gateway instance over HTTP, backed by a
//! scratch SQLite key store and a wiremock verification backend.

mod gateway_tests;
mod harness;
