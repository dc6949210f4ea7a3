//! Shared helpers for integration tests against a mock Rubble service

use rubble_client::{ClientConfig, RubbleClient};
use wiremock::MockServer;

pub const API_KEY: &str = "test-key";
pub const API_SECRET: &str = "test-secret";

pub fn service_path(endpoint: &str) -> String {
    format!("/rubble/service/{}", endpoint)
}

pub fn client_for(server: &MockServer) -> RubbleClient {
    let config = ClientConfig::new(server.uri(), API_KEY, API_SECRET);
    RubbleClient::new(config).expect("valid test config")
}
