//! Private-tracker accounting sink.
//!
//! Persisting snatch/byte deltas is a storage concern; only the contract the
//! core depends on lives here.

use crate::announce::AnnounceDelta;
use crate::error::AnnounceResult;
use async_trait::async_trait;

/// Accounting sink consulted only in private mode, once per successful
/// announce, after swarm mutations have already been applied.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn record_announce(&self, delta: AnnounceDelta) -> AnnounceResult<()>;
}

/// Backend that discards every delta. Useful for open-mode deployments and
/// tests that don't exercise private-mode accounting.
#[derive(Debug, Default)]
pub struct NoopBackend;

#[async_trait]
impl Backend for NoopBackend {
    async fn record_announce(&self, _delta: AnnounceDelta) -> AnnounceResult<()> {
        Ok(())
    }
}
