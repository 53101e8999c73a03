//! Client configuration consumed by the transport layer.

use std::collections::HashMap;
use std::time::Duration;

use url::Url;

use flapjack_error::{Error, Result};

use crate::host::Host;

/// Configuration for one client instance.
///
/// Carries the ordered host list, finished credential header values, the
/// composed user-agent string, and every timing knob the transport uses.
/// Built with `with_*` setters:
///
/// ```
/// use std::time::Duration;
/// use flapjack_transport::{CallType, Configuration, Host};
///
/// let config = Configuration::new(
///     "MY_APP",
///     "my-api-key",
///     vec![Host::read_write("my-app.flapjack.net")],
/// )
/// .with_connect_timeout(Duration::from_secs(1))
/// .with_task_poll_interval(Duration::from_millis(100));
/// # let _ = config;
/// ```
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Application identifier, sent as `X-Flapjack-Application-Id`.
    pub app_id: String,
    /// API key, sent as `X-Flapjack-API-Key`.
    pub api_key: String,
    /// Ordered candidate hosts.
    pub hosts: Vec<Host>,
    /// Extra headers merged into every request.
    pub default_headers: HashMap<String, String>,
    /// Finished user-agent value (composed by the caller).
    pub user_agent: String,
    /// Per-attempt connect timeout.
    pub connect_timeout: Duration,
    /// Per-attempt overall timeout for read calls.
    pub read_timeout: Duration,
    /// Per-attempt overall timeout for write calls.
    pub write_timeout: Duration,
    /// How long a host stays ineligible after a transient failure.
    pub host_down_cooldown: Duration,
    /// Fixed interval between task status polls.
    pub task_poll_interval: Duration,
    /// Wall-clock budget for waiting on one task.
    pub task_max_wait: Duration,
}

impl Configuration {
    /// Creates a configuration with default timing values.
    pub fn new(
        app_id: impl Into<String>,
        api_key: impl Into<String>,
        hosts: Vec<Host>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
            hosts,
            default_headers: HashMap::new(),
            user_agent: format!("Flapjack for Rust ({})", env!("CARGO_PKG_VERSION")),
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(30),
            host_down_cooldown: Duration::from_secs(300),
            task_poll_interval: Duration::from_millis(200),
            task_max_wait: Duration::from_secs(60),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Replaces the user-agent value.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the per-attempt connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-attempt overall timeout for read calls.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the per-attempt overall timeout for write calls.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Sets the host cooldown window.
    pub fn with_host_down_cooldown(mut self, cooldown: Duration) -> Self {
        self.host_down_cooldown = cooldown;
        self
    }

    /// Sets the interval between task status polls.
    pub fn with_task_poll_interval(mut self, interval: Duration) -> Self {
        self.task_poll_interval = interval;
        self
    }

    /// Sets the wall-clock budget for one task wait.
    pub fn with_task_max_wait(mut self, max_wait: Duration) -> Self {
        self.task_max_wait = max_wait;
        self
    }

    /// Validates credentials and host URLs.
    pub fn validate(&self) -> Result<()> {
        if self.app_id.is_empty() {
            return Err(Error::Configuration("application id is empty".to_string()));
        }
        if self.api_key.is_empty() {
            return Err(Error::Configuration("api key is empty".to_string()));
        }
        for host in &self.hosts {
            if host.scheme != "http" && host.scheme != "https" {
                return Err(Error::Configuration(format!(
                    "unsupported scheme '{}' for host {}",
                    host.scheme, host.url
                )));
            }
            Url::parse(&host.base_url())
                .map_err(|e| Error::Configuration(format!("invalid host {}: {e}", host.url)))?;
        }
        Ok(())
    }
}
