//! Candidate hosts and the health-tracking registry shared by all calls.

use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use flapjack_error::{Error, Result};

use crate::call::CallType;

/// One network endpoint capable of serving some subset of call types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// `"http"` or `"https"`.
    pub scheme: String,
    /// Network address, `host[:port]`.
    pub url: String,
    /// Which call types this host accepts.
    pub accept: CallType,
    /// Ordering hint among hosts with equal acceptance; lower is preferred.
    pub priority: u32,
}

impl Host {
    /// Creates a host with priority 0.
    pub fn new(scheme: impl Into<String>, url: impl Into<String>, accept: CallType) -> Self {
        Self {
            scheme: scheme.into(),
            url: url.into(),
            accept,
            priority: 0,
        }
    }

    /// Creates an https host accepting both read and write traffic.
    pub fn read_write(url: impl Into<String>) -> Self {
        Self::new("https", url, CallType::READ | CallType::WRITE)
    }

    /// Sets the priority (lower is preferred).
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Full base URL, e.g. `https://a.flapjack.net`.
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.url)
    }
}

/// Diagnostic snapshot of one host's registry state.
#[derive(Debug, Clone)]
pub struct HostStats {
    /// Host address.
    pub url: String,
    /// Configured priority.
    pub priority: u32,
    /// True while the host is inside its cooldown window.
    pub down: bool,
    /// Attempts routed to this host since construction.
    pub attempts: u64,
    /// Attempts that failed with a transient error.
    pub failures: u64,
}

#[derive(Debug)]
struct HostState {
    host: Host,
    down_until: Option<Instant>,
    attempts: u64,
    failures: u64,
}

impl HostState {
    fn is_down(&self, now: Instant) -> bool {
        matches!(self.down_until, Some(until) if now < until)
    }
}

/// A filtered candidate handed to the retry loop.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub(crate) index: usize,
    pub(crate) host: Host,
    pub(crate) down: bool,
}

/// Ordered, non-empty set of hosts with live health state.
///
/// Shared by every in-flight call; health mutations go through
/// [`mark_success`](HostRegistry::mark_success) /
/// [`mark_failure`](HostRegistry::mark_failure) behind an internal lock.
/// A host marked down stays ineligible until its cooldown passes, after
/// which it is retried optimistically; a subsequent success clears the
/// down state entirely.
#[derive(Debug)]
pub struct HostRegistry {
    cooldown: Duration,
    slots: RwLock<Vec<HostState>>,
}

impl HostRegistry {
    /// Builds a registry from the configured host list.
    ///
    /// Fails unless the list contains at least one host accepting read
    /// traffic and at least one accepting write traffic.
    pub fn new(hosts: Vec<Host>, cooldown: Duration) -> Result<Self> {
        if hosts.is_empty() {
            return Err(Error::Configuration("host list is empty".to_string()));
        }
        if !hosts.iter().any(|h| h.accept.contains(CallType::READ)) {
            return Err(Error::Configuration(
                "no configured host accepts read calls".to_string(),
            ));
        }
        if !hosts.iter().any(|h| h.accept.contains(CallType::WRITE)) {
            return Err(Error::Configuration(
                "no configured host accepts write calls".to_string(),
            ));
        }

        let slots = hosts
            .into_iter()
            .map(|host| HostState {
                host,
                down_until: None,
                attempts: 0,
                failures: 0,
            })
            .collect();

        Ok(Self {
            cooldown,
            slots: RwLock::new(slots),
        })
    }

    /// Hosts accepting `call`, ordered by priority then insertion order.
    pub async fn filter(&self, call: CallType) -> Vec<Host> {
        self.candidates(call)
            .await
            .into_iter()
            .map(|c| c.host)
            .collect()
    }

    /// Filtered candidates with their current health, for the retry loop.
    pub(crate) async fn candidates(&self, call: CallType) -> Vec<Candidate> {
        let now = Instant::now();
        let slots = self.slots.read().await;
        let mut out: Vec<Candidate> = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.host.accept.contains(call))
            .map(|(index, s)| Candidate {
                index,
                host: s.host.clone(),
                down: s.is_down(now),
            })
            .collect();
        // Stable sort keeps insertion order among equal priorities.
        out.sort_by_key(|c| c.host.priority);
        out
    }

    /// Records a successful attempt: clears any down state.
    pub async fn mark_success(&self, index: usize) {
        let mut slots = self.slots.write().await;
        if let Some(slot) = slots.get_mut(index) {
            slot.attempts += 1;
            slot.down_until = None;
        }
    }

    /// Records a transient failure: the host sits out one cooldown window.
    pub async fn mark_failure(&self, index: usize) {
        let mut slots = self.slots.write().await;
        if let Some(slot) = slots.get_mut(index) {
            slot.attempts += 1;
            slot.failures += 1;
            slot.down_until = Some(Instant::now() + self.cooldown);
            tracing::warn!(
                host = %slot.host.url,
                cooldown = ?self.cooldown,
                "host marked down after transient failure"
            );
        }
    }

    /// Per-host diagnostic counters.
    pub async fn stats(&self) -> Vec<HostStats> {
        let now = Instant::now();
        let slots = self.slots.read().await;
        slots
            .iter()
            .map(|s| HostStats {
                url: s.host.url.clone(),
                priority: s.host.priority,
                down: s.is_down(now),
                attempts: s.attempts,
                failures: s.failures,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(hosts: Vec<Host>) -> HostRegistry {
        HostRegistry::new(hosts, Duration::from_secs(300)).unwrap()
    }

    #[test]
    fn rejects_empty_host_list() {
        let err = HostRegistry::new(Vec::new(), Duration::from_secs(300)).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn rejects_list_without_write_host() {
        let hosts = vec![Host::new("https", "r1.flapjack.net", CallType::READ)];
        let err = HostRegistry::new(hosts, Duration::from_secs(300)).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn filter_returns_only_matching_call_types() {
        let reg = registry(vec![
            Host::new("https", "r.flapjack.net", CallType::READ),
            Host::new("https", "w.flapjack.net", CallType::WRITE),
            Host::read_write("rw.flapjack.net"),
        ]);

        let reads = reg.filter(CallType::READ).await;
        let urls: Vec<_> = reads.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["r.flapjack.net", "rw.flapjack.net"]);

        let writes = reg.filter(CallType::WRITE).await;
        let urls: Vec<_> = writes.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["w.flapjack.net", "rw.flapjack.net"]);
    }

    #[tokio::test]
    async fn filter_orders_by_priority_then_insertion() {
        let reg = registry(vec![
            Host::read_write("c.flapjack.net").with_priority(2),
            Host::read_write("a.flapjack.net").with_priority(1),
            Host::read_write("b.flapjack.net").with_priority(1),
        ]);

        let hosts = reg.filter(CallType::READ).await;
        let urls: Vec<_> = hosts.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["a.flapjack.net", "b.flapjack.net", "c.flapjack.net"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn down_host_becomes_eligible_after_cooldown() {
        let reg = HostRegistry::new(
            vec![
                Host::read_write("a.flapjack.net"),
                Host::read_write("b.flapjack.net"),
            ],
            Duration::from_secs(300),
        )
        .unwrap();

        reg.mark_failure(0).await;
        let candidates = reg.candidates(CallType::READ).await;
        assert!(candidates[0].down);
        assert!(!candidates[1].down);

        tokio::time::advance(Duration::from_secs(301)).await;
        let candidates = reg.candidates(CallType::READ).await;
        assert!(!candidates[0].down, "cooldown elapsed, eligible again");
    }

    #[tokio::test(start_paused = true)]
    async fn success_clears_down_state() {
        let reg = registry(vec![
            Host::read_write("a.flapjack.net"),
            Host::read_write("b.flapjack.net"),
        ]);

        reg.mark_failure(0).await;
        reg.mark_success(0).await;

        let candidates = reg.candidates(CallType::READ).await;
        assert!(!candidates[0].down);

        let stats = reg.stats().await;
        assert_eq!(stats[0].attempts, 2);
        assert_eq!(stats[0].failures, 1);
    }
}
