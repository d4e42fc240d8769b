//! Shared fixtures for relay integration tests

pub mod mock_server;
