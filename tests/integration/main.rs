//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the index and drive complete
//! searches through a real worker pool.

mod cursor;
mod pool;
mod retry;
mod search;
mod support;
