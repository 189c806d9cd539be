//! Shared helpers for unit and integration tests.

pub mod range_server;
pub mod socket_guard;
pub mod zip_fixture;
