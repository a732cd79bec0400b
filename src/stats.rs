//! Fire-and-forget statistics sink.
//!
//! The core treats this as a best-effort observer: emitting an event never
//! blocks or fails an announce. The concrete metrics backend (a Prometheus
//! exporter, a StatsD client, whatever) is out of scope here; only this
//! trait's contract matters.

/// Kinds of events the core emits. Observing them is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    NewTorrent,
    DeletedTorrent,
    NewSeed,
    NewLeech,
    DeletedSeed,
    DeletedLeech,
    Completed,
}

/// Sink for fire-and-forget stats events. Implementations must not panic and
/// should not perform blocking I/O on the calling path.
pub trait StatsSink: Send + Sync {
    fn record_event(&self, kind: StatKind);

    fn record_peer_event(&self, kind: StatKind, has_ipv6: bool);
}

/// Sink that logs events via `tracing` at debug level instead of dropping
/// them. Useful as a default when no metrics backend is wired up.
#[derive(Debug, Default)]
pub struct TracingStatsSink;

impl StatsSink for TracingStatsSink {
    fn record_event(&self, kind: StatKind) {
        tracing::debug!(?kind, "stats event");
    }

    fn record_peer_event(&self, kind: StatKind, has_ipv6: bool) {
        tracing::debug!(?kind, has_ipv6, "peer stats event");
    }
}

/// Sink that discards every event. Useful in tests that don't care about
/// stats at all.
#[derive(Debug, Default)]
pub struct NoopStatsSink;

impl StatsSink for NoopStatsSink {
    fn record_event(&self, _kind: StatKind) {}
    fn record_peer_event(&self, _kind: StatKind, _has_ipv6: bool) {}
}
