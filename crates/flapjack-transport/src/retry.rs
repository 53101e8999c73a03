//! Cross-host retry strategy: candidate ordering, outcome classification,
//! and health bookkeeping.

use std::sync::Arc;

use flapjack_error::{Error, Result};

use crate::call::CallType;
use crate::host::{Candidate, HostRegistry};

/// Result of a single HTTP attempt against one host.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// 2xx response with its raw body.
    Success { status: u16, body: Vec<u8> },
    /// The same request may succeed against another host.
    Retryable { reason: String },
    /// Retrying elsewhere will not help; surface immediately.
    Fatal { status: u16, body: String },
}

/// Classifies a completed HTTP response by status code.
///
/// 5xx and 429 (explicit rate-limit retry signal) are host problems;
/// everything else in the error range is a client mistake.
pub(crate) fn classify_response(status: u16, body: Vec<u8>) -> Outcome {
    match status {
        200..=299 => Outcome::Success { status, body },
        429 | 500..=599 => Outcome::Retryable {
            reason: format!("status {status}"),
        },
        _ => Outcome::Fatal {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        },
    }
}

/// Decides, for one logical call, which hosts to try in what order, and
/// records attempt outcomes back into the registry.
///
/// Holds no per-call state; many calls share one strategy over one registry.
#[derive(Debug, Clone)]
pub(crate) struct RetryStrategy {
    registry: Arc<HostRegistry>,
}

impl RetryStrategy {
    pub(crate) fn new(registry: Arc<HostRegistry>) -> Self {
        Self { registry }
    }

    pub(crate) fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    /// Ordered hosts to attempt for `call`.
    ///
    /// Down hosts are skipped, unless every candidate is down, in which
    /// case the full list is tried anyway: when health state is stale a
    /// degraded attempt beats a guaranteed failure.
    pub(crate) async fn hosts_to_try(&self, call: CallType) -> Result<Vec<Candidate>> {
        let candidates = self.registry.candidates(call).await;
        if candidates.is_empty() {
            return Err(Error::Configuration(format!(
                "no configured host accepts {call} calls"
            )));
        }

        let live: Vec<Candidate> = candidates.iter().filter(|c| !c.down).cloned().collect();
        if live.is_empty() {
            tracing::warn!(call = %call, "all hosts in cooldown, trying the full list");
            return Ok(candidates);
        }
        Ok(live)
    }

    pub(crate) async fn mark_success(&self, index: usize) {
        self.registry.mark_success(index).await;
    }

    pub(crate) async fn mark_failure(&self, index: usize) {
        self.registry.mark_failure(index).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Host;
    use std::time::Duration;

    fn strategy(hosts: Vec<Host>) -> RetryStrategy {
        let registry = HostRegistry::new(hosts, Duration::from_secs(300)).unwrap();
        RetryStrategy::new(Arc::new(registry))
    }

    #[test]
    fn status_classification() {
        assert!(matches!(
            classify_response(200, b"ok".to_vec()),
            Outcome::Success { status: 200, .. }
        ));
        assert!(matches!(
            classify_response(503, Vec::new()),
            Outcome::Retryable { .. }
        ));
        assert!(matches!(
            classify_response(429, Vec::new()),
            Outcome::Retryable { .. }
        ));
        assert!(matches!(
            classify_response(404, b"missing".to_vec()),
            Outcome::Fatal { status: 404, .. }
        ));
        assert!(matches!(
            classify_response(400, Vec::new()),
            Outcome::Fatal { status: 400, .. }
        ));
    }

    #[tokio::test]
    async fn down_hosts_are_skipped() {
        let strategy = strategy(vec![
            Host::read_write("a.flapjack.net").with_priority(1),
            Host::read_write("b.flapjack.net").with_priority(2),
            Host::read_write("c.flapjack.net").with_priority(3),
        ]);

        strategy.mark_failure(0).await;

        let hosts = strategy.hosts_to_try(CallType::READ).await.unwrap();
        let urls: Vec<_> = hosts.iter().map(|c| c.host.url.as_str()).collect();
        assert_eq!(urls, vec!["b.flapjack.net", "c.flapjack.net"]);
    }

    #[tokio::test]
    async fn all_down_falls_back_to_full_list() {
        let strategy = strategy(vec![
            Host::read_write("a.flapjack.net"),
            Host::read_write("b.flapjack.net"),
        ]);

        strategy.mark_failure(0).await;
        strategy.mark_failure(1).await;

        let hosts = strategy.hosts_to_try(CallType::READ).await.unwrap();
        assert_eq!(hosts.len(), 2, "stale health must not cause a total outage");
    }

    #[tokio::test]
    async fn unserved_call_type_is_a_configuration_error() {
        let registry = HostRegistry::new(
            vec![
                Host::new("https", "r.flapjack.net", CallType::READ),
                Host::new("https", "w.flapjack.net", CallType::WRITE),
            ],
            Duration::from_secs(300),
        )
        .unwrap();
        let strategy = RetryStrategy::new(Arc::new(registry));

        let err = strategy
            .hosts_to_try(CallType::READ | CallType::WRITE)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
