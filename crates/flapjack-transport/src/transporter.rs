//! Request execution: one logical call, one or more HTTP attempts.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;

use flapjack_error::{Error, HostFailure, Result};

use crate::call::CallType;
use crate::config::Configuration;
use crate::host::{Host, HostRegistry, HostStats};
use crate::retry::{classify_response, Outcome, RetryStrategy};

/// Per-call overrides for the configured attempt timeouts.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Overrides the configured read timeout for this call.
    pub read_timeout: Option<Duration>,
    /// Overrides the configured write timeout for this call.
    pub write_timeout: Option<Duration>,
}

impl RequestOptions {
    /// Creates empty options (configured timeouts apply).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a read timeout for this call only.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Sets a write timeout for this call only.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }
}

/// Executes logical API calls against the configured hosts with retry,
/// failover, and health tracking.
///
/// Stateless per call: concurrent calls share only the host registry and
/// the pooled HTTP client. Within one call, hosts are tried strictly in
/// the order the retry strategy produced.
#[derive(Debug)]
pub struct Transporter {
    config: Configuration,
    headers: HeaderMap,
    client: Client,
    strategy: RetryStrategy,
}

impl Transporter {
    /// Builds a transporter from a validated configuration.
    pub fn new(config: Configuration) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(HostRegistry::new(
            config.hosts.clone(),
            config.host_down_cooldown,
        )?);
        let headers = build_headers(&config)?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build http client: {e}")))?;

        Ok(Self {
            config,
            headers,
            client,
            strategy: RetryStrategy::new(registry),
        })
    }

    /// The configuration this transporter was built from.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Per-host diagnostic counters and health state.
    pub async fn host_stats(&self) -> Vec<HostStats> {
        self.strategy.registry().stats().await
    }

    /// Executes one logical call and decodes the response body.
    ///
    /// A 2xx body that fails to decode into `T` surfaces as
    /// [`Error::RequestFailed`] with the raw body: a malformed response is
    /// a fatal condition, not a host problem.
    pub async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        call: CallType,
        options: &RequestOptions,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let (status, bytes) = self.request_raw(method, path, body, call, options).await?;
        serde_json::from_slice(&bytes).map_err(|_| Error::RequestFailed {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// Executes one logical call and returns the raw status and body.
    pub async fn request_raw<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        call: CallType,
        options: &RequestOptions,
    ) -> Result<(u16, Vec<u8>)>
    where
        B: Serialize + ?Sized,
    {
        let payload = match body {
            Some(body) => Some(serde_json::to_vec(body)?),
            None => None,
        };
        let timeout = self.attempt_timeout(call, options);

        let candidates = self.strategy.hosts_to_try(call).await?;
        let mut failures = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            tracing::debug!(host = %candidate.host.url, %method, path, "attempting request");
            match self
                .attempt(&candidate.host, method.clone(), path, payload.as_deref(), call, timeout)
                .await?
            {
                Outcome::Success { status, body } => {
                    self.strategy.mark_success(candidate.index).await;
                    return Ok((status, body));
                }
                Outcome::Retryable { reason } => {
                    tracing::warn!(
                        host = %candidate.host.url,
                        %reason,
                        "retryable failure, moving to next host"
                    );
                    self.strategy.mark_failure(candidate.index).await;
                    failures.push(HostFailure {
                        host: candidate.host.url.clone(),
                        reason,
                    });
                }
                Outcome::Fatal { status, body } => {
                    return Err(Error::RequestFailed { status, body });
                }
            }
        }

        Err(Error::AllHostsFailed(failures))
    }

    fn attempt_timeout(&self, call: CallType, options: &RequestOptions) -> Duration {
        if call.is_write() {
            options.write_timeout.unwrap_or(self.config.write_timeout)
        } else {
            options.read_timeout.unwrap_or(self.config.read_timeout)
        }
    }

    /// One HTTP attempt against one host, classified into an outcome.
    ///
    /// A connect-phase failure is always retryable. Any failure after the
    /// connect phase on a non-idempotent write — a send timeout, a stalled
    /// or truncated response body, a mid-request reset — is ambiguous: the
    /// server may have applied the request, so it short-circuits as
    /// [`Error::AmbiguousWrite`] instead of being fed back to the strategy.
    async fn attempt(
        &self,
        host: &Host,
        method: Method,
        path: &str,
        payload: Option<&[u8]>,
        call: CallType,
        timeout: Duration,
    ) -> Result<Outcome> {
        let ambiguous_on_write = call.is_write() && !is_idempotent(&method);
        let url = format!("{}{}", host.base_url(), path);

        let mut request = self
            .client
            .request(method, &url)
            .headers(self.headers.clone())
            .timeout(timeout);
        if let Some(payload) = payload {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(payload.to_vec());
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.bytes().await {
                    Ok(bytes) => Ok(classify_response(status, bytes.to_vec())),
                    // The server already answered with headers; a write was
                    // received and possibly applied.
                    Err(e) if ambiguous_on_write => Err(ambiguous_write(host, &e)),
                    Err(e) => Ok(Outcome::Retryable {
                        reason: format!("failed to read response body: {e}"),
                    }),
                }
            }
            Err(e) if e.is_connect() => Ok(Outcome::Retryable {
                reason: format!("connection error: {e}"),
            }),
            // Past the connect phase the request may have reached the server.
            Err(e) if ambiguous_on_write => Err(ambiguous_write(host, &e)),
            Err(e) if e.is_timeout() => Ok(Outcome::Retryable {
                reason: format!("timeout: {e}"),
            }),
            Err(e) => Ok(Outcome::Retryable {
                reason: format!("request error: {e}"),
            }),
        }
    }

}

fn ambiguous_write(host: &Host, cause: &reqwest::Error) -> Error {
    tracing::warn!(
        host = %host.url,
        %cause,
        "write failed after the connect phase, not retrying"
    );
    Error::AmbiguousWrite {
        host: host.url.clone(),
    }
}

/// PUT overwrites and DELETEs can safely be re-sent; POST/PATCH writes
/// with non-deterministic merges cannot.
fn is_idempotent(method: &Method) -> bool {
    *method == Method::GET
        || *method == Method::HEAD
        || *method == Method::PUT
        || *method == Method::DELETE
        || *method == Method::OPTIONS
}

fn build_headers(config: &Configuration) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("x-flapjack-application-id"),
        parse_header_value(&config.app_id)?,
    );
    headers.insert(
        HeaderName::from_static("x-flapjack-api-key"),
        parse_header_value(&config.api_key)?,
    );
    headers.insert(USER_AGENT, parse_header_value(&config.user_agent)?);
    for (name, value) in &config.default_headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Configuration(format!("invalid header name '{name}': {e}")))?;
        headers.insert(name, parse_header_value(value)?);
    }
    Ok(headers)
}

fn parse_header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::Configuration(format!("invalid header value: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_by_method() {
        assert!(is_idempotent(&Method::GET));
        assert!(is_idempotent(&Method::PUT));
        assert!(is_idempotent(&Method::DELETE));
        assert!(!is_idempotent(&Method::POST));
        assert!(!is_idempotent(&Method::PATCH));
    }

    #[test]
    fn headers_carry_credentials_and_user_agent() {
        let config = Configuration::new(
            "APP",
            "secret-key",
            vec![Host::read_write("app.flapjack.net")],
        )
        .with_default_header("x-forwarded-for", "10.0.0.1");

        let headers = build_headers(&config).unwrap();
        assert_eq!(headers["x-flapjack-application-id"], "APP");
        assert_eq!(headers["x-flapjack-api-key"], "secret-key");
        assert_eq!(headers["x-forwarded-for"], "10.0.0.1");
        assert!(headers[USER_AGENT]
            .to_str()
            .unwrap()
            .starts_with("Flapjack for Rust"));
    }

    #[test]
    fn invalid_default_header_rejected() {
        let config = Configuration::new("APP", "key", vec![Host::read_write("a.net")])
            .with_default_header("bad header name", "v");
        assert!(matches!(
            build_headers(&config).unwrap_err(),
            Error::Configuration(_)
        ));
    }

    #[test]
    fn write_calls_use_write_timeout() {
        let config = Configuration::new("APP", "key", vec![Host::read_write("a.net")])
            .with_read_timeout(Duration::from_secs(5))
            .with_write_timeout(Duration::from_secs(30));
        let transporter = Transporter::new(config).unwrap();

        let options = RequestOptions::new();
        assert_eq!(
            transporter.attempt_timeout(CallType::READ, &options),
            Duration::from_secs(5)
        );
        assert_eq!(
            transporter.attempt_timeout(CallType::WRITE, &options),
            Duration::from_secs(30)
        );

        let options = RequestOptions::new().with_write_timeout(Duration::from_secs(2));
        assert_eq!(
            transporter.attempt_timeout(CallType::WRITE, &options),
            Duration::from_secs(2)
        );
    }
}
