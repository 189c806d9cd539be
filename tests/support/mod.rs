//! Helpers shared by the integration tests, reused from the library's test support.

#![allow(dead_code)]

#[path = "../../src/test_support/range_server.rs"]
pub mod range_server;
#[path = "../../src/test_support/socket_guard.rs"]
pub mod socket_guard;
#[path = "../../src/test_support/zip_fixture.rs"]
pub mod zip_fixture;
