//! HTTP client for the Rubble service API

use crate::channel::{AliasListOptions, ChannelAlias};
use crate::config::ClientConfig;
use crate::delivery::{CallOutput, DeliveryMode};
use crate::envelope::MessageEnvelope;
use crate::error::{Result, RubbleError};
use crate::process::{CreateProcess, Pid, Process, ProcessListOptions, ProcessSummary, UpdateProcess};
use crate::term;
use crate::types::*;
use reqwest::{header, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the Rubble service API
///
/// # Example
///
/// ```rust,no_run
/// use rubble_client::{ChannelAddress, ClientConfig, MessageEnvelope, RubbleClient, Term};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RubbleClient::new(ClientConfig::from_env()?)?;
///
/// let envelope = MessageEnvelope::to(ChannelAddress::alias("todo"), vec![Term::atom("ping")]);
/// let reply = client.call(&envelope).await?;
/// for term in reply.output {
///     println!("{}", term);
/// }
/// # Ok(())
/// # }
/// ```
pub struct RubbleClient {
    config: ClientConfig,
    client: Client,
}

impl RubbleClient {
    /// Create a new client
    ///
    /// Fails with `Config` when credentials are missing or the base URL is
    /// not http(s).
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = header::HeaderMap::new();
        let user_agent = header::HeaderValue::from_str(&config.user_agent)
            .map_err(|e| RubbleError::Config(format!("invalid user agent: {}", e)))?;
        headers.insert(header::USER_AGENT, user_agent);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self { config, client })
    }

    /// Configuration this client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ==================== Messaging ====================

    /// Deliver terms synchronously and return what the rules wrote to `default`
    ///
    /// A `deliver_at` on the envelope is ignored; calls are always immediate.
    pub async fn call(&self, envelope: &MessageEnvelope) -> Result<CallOutput> {
        if envelope.deliver_at_millis().is_some() {
            tracing::warn!(
                channel = %envelope.target(),
                "deliver_at ignored for call, delivering immediately"
            );
        }
        self.deliver(DeliveryMode::Call, envelope).await
    }

    /// Enqueue terms for asynchronous delivery
    ///
    /// `Ok(())` means the message was enqueued. A trapped target may still
    /// hold it and later drop it without notice.
    pub async fn send(&self, envelope: &MessageEnvelope) -> Result<()> {
        let _: Empty = self.deliver(DeliveryMode::Send, envelope).await?;
        Ok(())
    }

    async fn deliver<T: DeserializeOwned>(
        &self,
        mode: DeliveryMode,
        envelope: &MessageEnvelope,
    ) -> Result<T> {
        envelope.target().validate()?;
        let params = mode.query_params(envelope);
        let body = term::encode_structured(envelope.payload());

        tracing::debug!(
            operation = mode.endpoint(),
            channel = %envelope.target(),
            terms = envelope.payload().len(),
            "delivering message"
        );

        let response = self
            .request(Method::POST, mode.endpoint(), &params)
            .json(&body)
            .send()
            .await?;
        self.handle_response(response).await
    }

    // ==================== Process Registry ====================

    /// Fetch a process
    pub async fn get_process(&self, pid: Pid, prettyprint: bool) -> Result<Process> {
        let params = [
            ("pid", pid.to_string()),
            ("prettyprint", if prettyprint { "1" } else { "0" }.to_string()),
        ];
        tracing::debug!(%pid, "fetching process");

        let response = self.request(Method::GET, "process", &params).send().await?;
        let body: ContentResponse<Process> = self.handle_response(response).await?;
        Ok(body.content)
    }

    /// Create a process and return its server-assigned pid
    pub async fn create_process(&self, input: &CreateProcess) -> Result<Pid> {
        input.validate()?;
        tracing::debug!(rulesref = %input.rules_ref, "creating process");

        let response = self
            .request(Method::POST, "processcreate", &[])
            .json(&input.request())
            .send()
            .await?;
        let body: CreatedResponse = self.handle_response(response).await?;
        Ok(body.pid)
    }

    /// Replace a process's rules, facts and trapstate
    pub async fn update_process(&self, input: &UpdateProcess) -> Result<()> {
        input.validate()?;
        tracing::debug!(pid = %input.pid, "updating process");

        let response = self
            .request(Method::POST, "processupdate", &[])
            .json(&input.request())
            .send()
            .await?;
        let _: Empty = self.handle_response(response).await?;
        Ok(())
    }

    /// Delete a process
    ///
    /// Only the live state goes; the rules file stays where it is.
    pub async fn delete_process(&self, pid: Pid) -> Result<()> {
        tracing::debug!(%pid, "deleting process");

        let response = self
            .request(Method::DELETE, "process", &[("pid", pid.to_string())])
            .send()
            .await?;
        let _: Empty = self.handle_response(response).await?;
        Ok(())
    }

    /// List processes in the caller's domain
    pub async fn list_processes(&self, options: ProcessListOptions) -> Result<Vec<ProcessSummary>> {
        let response = self
            .request(Method::GET, "processlist", &options.query_params())
            .send()
            .await?;
        let body: ListResponse<ProcessSummary> = self.handle_response(response).await?;
        Ok(body.result)
    }

    // ==================== Channel Aliases ====================

    /// Create or repoint an alias; pid 0 deletes it
    pub async fn update_alias(&self, name: &str, pid: Pid) -> Result<()> {
        tracing::debug!(alias = name, %pid, "updating alias");

        let params = [("channel", name.to_string()), ("pid", pid.to_string())];
        let response = self
            .request(Method::POST, "chanupdate", &params)
            .send()
            .await?;
        let _: Empty = self.handle_response(response).await?;
        Ok(())
    }

    /// Remove an alias
    pub async fn delete_alias(&self, name: &str) -> Result<()> {
        self.update_alias(name, Pid::NONE).await
    }

    /// List aliases visible to the caller
    pub async fn list_aliases(&self, options: AliasListOptions) -> Result<Vec<ChannelAlias>> {
        let response = self
            .request(Method::GET, "chanlist", &options.query_params())
            .send()
            .await?;
        let body: ListResponse<ChannelAlias> = self.handle_response(response).await?;
        Ok(body.result)
    }

    // ==================== Account ====================

    /// Domain and API key of the configured credentials
    pub async fn domain_info(&self) -> Result<DomainInfo> {
        let response = self.request(Method::GET, "domaininfo", &[]).send().await?;
        self.handle_response(response).await
    }

    // ==================== Helpers ====================

    fn request(&self, method: Method, endpoint: &str, params: &[(&str, String)]) -> RequestBuilder {
        let mut url = self.config.endpoint(endpoint);

        if !params.is_empty() {
            let query: Vec<String> = params
                .iter()
                .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }

        self.client
            .request(method, &url)
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(RubbleError::Transport {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let text = response.text().await?;
        let body: serde_json::Value = if text.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(&text)?
        };

        if let Some(error) = body.get("error") {
            let message = match error {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            tracing::warn!(error = %message, "rubble service reported an error");
            return Err(RubbleError::Application(message));
        }

        serde_json::from_value(body).map_err(|e| RubbleError::InvalidResponse(e.to_string()))
    }
}
