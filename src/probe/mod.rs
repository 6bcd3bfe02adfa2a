//! Concurrent protocol classification of published host ports.
//!
//! A container may publish many ports, and any of them may be slow, filtered or dead. The
//! [`PortClassifier`] probes every candidate port of a container concurrently, bounds each probe
//! with its own timeout and waits for all probes to settle. The wall-clock cost of classifying a
//! container is therefore close to that of its slowest single probe.
//!
//! How a single port is probed is delegated to a [`PortProber`]; [`NetworkProber`] is the
//! implementation that actually talks to the network.

mod error;
mod network;
mod tls;

pub use error::{Error, Result};
pub use network::NetworkProber;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use futures::StreamExt;

/// Header attached to every probe request.
///
/// Lets services, including this monitor's own HTTP surface, recognise and cheaply answer probes.
pub const PROBE_HEADER: &str = "x-harbor-lens-probe";

/// Default deadline for classifying a single port.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(4);

/// Default number of probes in flight per container.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Application protocol detected on a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Determines the protocol spoken on a single `host:port`.
///
/// Implementations return `None` for anything that is not positively identified, including
/// refused connections and protocol mismatches. They do not need to enforce a deadline;
/// [`PortClassifier`] bounds every probe.
pub trait PortProber: Send + Sync {
    fn probe(&self, host: &str, port: u16) -> impl Future<Output = Option<Protocol>> + Send;
}

/// Probes a set of ports concurrently and reports those that speak HTTP or HTTPS.
#[derive(Debug, Clone)]
pub struct PortClassifier<P> {
    prober: P,
    timeout: Duration,
    max_concurrency: usize,
}

impl<P: PortProber> PortClassifier<P> {
    pub fn new(prober: P) -> Self {
        Self {
            prober,
            timeout: DEFAULT_PROBE_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Sets the deadline for classifying a single port.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the number of probes in flight at once. Values below `1` are treated as `1`.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Classifies every port in `ports` on `host`.
    ///
    /// Ports are dispatched in ascending order. The returned map only contains ports with a
    /// detected protocol; ports that failed, were refused or timed out are omitted. An empty map
    /// is a valid result.
    pub async fn classify(&self, host: &str, ports: &BTreeSet<u16>) -> BTreeMap<u16, Protocol> {
        futures::stream::iter(ports.iter().copied())
            .map(|port| self.classify_port(host, port))
            .buffer_unordered(self.max_concurrency)
            .filter_map(|(port, protocol)| {
                futures::future::ready(protocol.map(|protocol| (port, protocol)))
            })
            .collect()
            .await
    }

    async fn classify_port(&self, host: &str, port: u16) -> (u16, Option<Protocol>) {
        match tokio::time::timeout(self.timeout, self.prober.probe(host, port)).await {
            Ok(Some(protocol)) => {
                log::debug!("{}:{} classified as {}", host, port, protocol);
                (port, Some(protocol))
            }
            Ok(None) => {
                log::debug!("{}:{} speaks no known protocol", host, port);
                (port, None)
            }
            Err(_) => {
                log::debug!(
                    "{}:{} not classified within {:?}",
                    host,
                    port,
                    self.timeout
                );
                (port, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::Instant;

    use super::*;

    #[derive(Debug, Clone, Copy)]
    enum Behaviour {
        Answer(Protocol, Duration),
        Refuse(Duration),
        Hang,
    }

    #[derive(Debug, Default)]
    struct ScriptedProber {
        behaviours: HashMap<u16, Behaviour>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedProber {
        fn new(behaviours: impl IntoIterator<Item = (u16, Behaviour)>) -> Self {
            Self {
                behaviours: behaviours.into_iter().collect(),
                ..Default::default()
            }
        }
    }

    impl PortProber for Arc<ScriptedProber> {
        async fn probe(&self, _host: &str, port: u16) -> Option<Protocol> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let outcome = match self.behaviours.get(&port).copied() {
                Some(Behaviour::Answer(protocol, delay)) => {
                    tokio::time::sleep(delay).await;
                    Some(protocol)
                }
                Some(Behaviour::Refuse(delay)) => {
                    tokio::time::sleep(delay).await;
                    None
                }
                Some(Behaviour::Hang) => std::future::pending().await,
                None => None,
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            outcome
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[tokio::test(start_paused = true)]
    async fn test_classify_mixed_ports_bounded_by_single_timeout() {
        let prober = Arc::new(ScriptedProber::new([
            (8443, Behaviour::Answer(Protocol::Https, Duration::from_millis(300))),
            (9443, Behaviour::Answer(Protocol::Https, Duration::from_millis(500))),
            (8080, Behaviour::Answer(Protocol::Http, Duration::from_millis(100))),
            (9000, Behaviour::Hang),
            (9100, Behaviour::Refuse(Duration::from_millis(10))),
        ]));
        let classifier = PortClassifier::new(Arc::clone(&prober)).with_timeout(TIMEOUT);
        let ports = BTreeSet::from([8080, 8443, 9000, 9100, 9443]);

        let started = Instant::now();
        let result = classifier.classify("localhost", &ports).await;
        let elapsed = started.elapsed();

        assert_eq!(
            result,
            BTreeMap::from([
                (8080, Protocol::Http),
                (8443, Protocol::Https),
                (9443, Protocol::Https),
            ])
        );
        assert_eq!(prober.calls.load(Ordering::SeqCst), 5);
        assert!(elapsed >= TIMEOUT);
        assert!(elapsed < TIMEOUT + Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_classify_runs_probes_concurrently() {
        let delay = Duration::from_millis(500);
        let prober = Arc::new(ScriptedProber::new(
            (8000..8010).map(|port| (port, Behaviour::Answer(Protocol::Http, delay))),
        ));
        let classifier = PortClassifier::new(Arc::clone(&prober)).with_timeout(TIMEOUT);
        let ports: BTreeSet<u16> = (8000..8010).collect();

        let started = Instant::now();
        let result = classifier.classify("localhost", &ports).await;

        assert_eq!(result.len(), 10);
        assert!(started.elapsed() < delay * 2);
        assert_eq!(prober.max_in_flight.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_classify_respects_concurrency_bound() {
        let delay = Duration::from_millis(100);
        let prober = Arc::new(ScriptedProber::new(
            (8000..8006).map(|port| (port, Behaviour::Answer(Protocol::Https, delay))),
        ));
        let classifier = PortClassifier::new(Arc::clone(&prober))
            .with_timeout(TIMEOUT)
            .with_max_concurrency(2);
        let ports: BTreeSet<u16> = (8000..8006).collect();

        let started = Instant::now();
        let result = classifier.classify("localhost", &ports).await;

        assert_eq!(result.len(), 6);
        assert_eq!(prober.max_in_flight.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= delay * 3);
    }

    #[tokio::test]
    async fn test_classify_no_ports() {
        let prober = Arc::new(ScriptedProber::default());
        let classifier = PortClassifier::new(Arc::clone(&prober));
        assert!(classifier.classify("localhost", &BTreeSet::new()).await.is_empty());
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_max_concurrency_floor() {
        let classifier =
            PortClassifier::new(Arc::new(ScriptedProber::default())).with_max_concurrency(0);
        assert_eq!(classifier.max_concurrency, 1);
    }

    #[test]
    fn test_protocol_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Protocol::Https).unwrap(), "\"https\"");
        assert_eq!(Protocol::Http.to_string(), "http");
    }
}
