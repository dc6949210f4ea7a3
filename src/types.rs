//! Response payloads shared by several endpoints

use serde::{Deserialize, Serialize};

/// Account information for the caller's credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInfo {
    /// Domain (account) the API key belongs to
    pub domain: String,
    /// The API key used for the request
    pub apikey: String,
}

/// `{"content": {...}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ContentResponse<T> {
    pub content: T,
}

/// `{"result": [...]}`
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub result: Vec<T>,
}

/// `{"pid": "<digits>"}`
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedResponse {
    pub pid: crate::process::Pid,
}

/// `{}`
#[derive(Debug, Deserialize)]
pub(crate) struct Empty {}
