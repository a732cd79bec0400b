//! Storage contracts: `Pool`, `Connection`, and an in-process reference
//! implementation.
//!
//! Implementing a real persistent storage engine is out of scope; what's
//! here is the contract the core depends on, plus a `DashMap`-backed driver
//! sufficient to exercise `HandleAnnounce` end to end in tests and
//! single-process deployments.

use crate::error::{AnnounceError, AnnounceResult};
use crate::peer::{Peer, PeerKey, Torrent, User};
use crate::protocol::{ClientId, InfoHash};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Storage interface for one announce's worth of mutations. Acquired from a
/// `Pool` under a scoped lifetime; the caller must guarantee release on
/// every exit path (the reference driver releases on `Drop`).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connection: Send {
    /// Validates a client id against the whitelist. Only consulted when
    /// `Config::client_whitelist_enabled` is set.
    async fn find_client(&self, client_id: &ClientId) -> AnnounceResult<()>;

    /// Resolves a user by passkey. Only consulted in private mode.
    async fn find_user(&self, passkey: &str) -> AnnounceResult<User>;

    /// Resolves a torrent by infohash. Returns
    /// `AnnounceError::TorrentDoesNotExist` if absent so callers can decide
    /// whether to auto-create it.
    async fn find_torrent(&self, infohash: &InfoHash) -> AnnounceResult<Arc<Torrent>>;

    /// Persists a freshly created torrent (open mode auto-creation only).
    async fn put_torrent(&self, torrent: Arc<Torrent>) -> AnnounceResult<()>;

    /// Updates the torrent's last-activity marker.
    async fn touch_torrent(&self, infohash: &InfoHash) -> AnnounceResult<()>;

    async fn put_seeder(&self, infohash: &InfoHash, peer: Peer) -> AnnounceResult<()>;

    async fn put_leecher(&self, infohash: &InfoHash, peer: Peer) -> AnnounceResult<()>;

    async fn delete_seeder(&self, infohash: &InfoHash, key: &PeerKey) -> AnnounceResult<()>;

    async fn delete_leecher(&self, infohash: &InfoHash, key: &PeerKey) -> AnnounceResult<()>;

    async fn increment_torrent_snatches(&self, infohash: &InfoHash) -> AnnounceResult<()>;

    /// Increments a user's snatch counter. Only called in private mode.
    async fn increment_user_snatches(&self, passkey: &str) -> AnnounceResult<()>;

    /// Purges a torrent with zero peers. Implementations must make this
    /// race-safe against a concurrent announce that just added a peer.
    async fn purge_inactive_torrent(&self, infohash: &InfoHash) -> AnnounceResult<()>;
}

/// Hands out scoped `Connection`s.
#[async_trait]
pub trait Pool: Send + Sync {
    async fn get(&self) -> AnnounceResult<Box<dyn Connection>>;
}

/// In-process reference storage driver backed by `DashMap`s. Sufficient to
/// run and test `HandleAnnounce`; not a substitute for a real persistent
/// storage engine.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    torrents: DashMap<InfoHash, Arc<Torrent>>,
    users: DashMap<String, User>,
    client_whitelist: parking_lot::RwLock<HashSet<String>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register_user(&self, user: User) {
        self.users.insert(user.passkey.clone(), user);
    }

    pub fn whitelist_client(&self, client_id: impl Into<String>) {
        self.client_whitelist.write().insert(client_id.into());
    }

    /// Looks up a torrent by infohash without going through a `Connection`.
    pub fn torrent(&self, infohash: &InfoHash) -> Option<Arc<Torrent>> {
        self.torrents.get(infohash).map(|t| Arc::clone(t.value()))
    }
}

/// `Pool` impl that hands out `InMemoryConnection`s sharing the same store.
pub struct InMemoryPool {
    store: Arc<InMemoryStore>,
}

impl InMemoryPool {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Pool for InMemoryPool {
    async fn get(&self) -> AnnounceResult<Box<dyn Connection>> {
        Ok(Box::new(InMemoryConnection {
            store: Arc::clone(&self.store),
        }))
    }
}

pub struct InMemoryConnection {
    store: Arc<InMemoryStore>,
}

#[async_trait]
impl Connection for InMemoryConnection {
    async fn find_client(&self, client_id: &ClientId) -> AnnounceResult<()> {
        if self.store.client_whitelist.read().contains(&client_id.0) {
            Ok(())
        } else {
            Err(AnnounceError::not_found(format!(
                "client {} is not whitelisted",
                client_id.0
            )))
        }
    }

    async fn find_user(&self, passkey: &str) -> AnnounceResult<User> {
        self.store
            .users
            .get(passkey)
            .map(|u| u.value().clone())
            .ok_or_else(|| AnnounceError::not_found("unknown passkey"))
    }

    async fn find_torrent(&self, infohash: &InfoHash) -> AnnounceResult<Arc<Torrent>> {
        self.store
            .torrents
            .get(infohash)
            .map(|t| Arc::clone(t.value()))
            .ok_or(AnnounceError::TorrentDoesNotExist)
    }

    async fn put_torrent(&self, torrent: Arc<Torrent>) -> AnnounceResult<()> {
        self.store.torrents.insert(torrent.infohash, torrent);
        Ok(())
    }

    async fn touch_torrent(&self, _infohash: &InfoHash) -> AnnounceResult<()> {
        // The reference driver doesn't track last-activity separately; a
        // persistent driver would bump a timestamp column here.
        Ok(())
    }

    async fn put_seeder(&self, infohash: &InfoHash, peer: Peer) -> AnnounceResult<()> {
        let torrent = self.find_torrent(infohash).await?;
        torrent.put_seeder(peer);
        Ok(())
    }

    async fn put_leecher(&self, infohash: &InfoHash, peer: Peer) -> AnnounceResult<()> {
        let torrent = self.find_torrent(infohash).await?;
        torrent.put_leecher(peer);
        Ok(())
    }

    async fn delete_seeder(&self, infohash: &InfoHash, key: &PeerKey) -> AnnounceResult<()> {
        let torrent = self.find_torrent(infohash).await?;
        torrent.remove_seeder(key);
        Ok(())
    }

    async fn delete_leecher(&self, infohash: &InfoHash, key: &PeerKey) -> AnnounceResult<()> {
        let torrent = self.find_torrent(infohash).await?;
        torrent.remove_leecher(key);
        Ok(())
    }

    async fn increment_torrent_snatches(&self, infohash: &InfoHash) -> AnnounceResult<()> {
        let torrent = self.find_torrent(infohash).await?;
        torrent.increment_snatches();
        Ok(())
    }

    async fn increment_user_snatches(&self, passkey: &str) -> AnnounceResult<()> {
        self.store
            .users
            .get_mut(passkey)
            .map(|mut u| u.snatches += 1)
            .ok_or_else(|| AnnounceError::not_found("unknown passkey"))
    }

    async fn purge_inactive_torrent(&self, infohash: &InfoHash) -> AnnounceResult<()> {
        // Race-safe: only remove if the entry is still empty at removal time.
        self.store
            .torrents
            .remove_if(infohash, |_, t| t.total_peer_count() == 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_connection_reports_whitelist_rejection() {
        let mut mock = MockConnection::new();
        mock.expect_find_client()
            .returning(|_| Err(AnnounceError::not_found("client not whitelisted")));

        let err = mock
            .find_client(&ClientId("qB".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AnnounceError::NotFound(_)));
    }

    #[tokio::test]
    async fn find_torrent_distinguishes_missing() {
        let store = InMemoryStore::new();
        let pool = InMemoryPool::new(store);
        let conn = pool.get().await.unwrap();
        let err = conn.find_torrent(&InfoHash::new([1u8; 20])).await.unwrap_err();
        assert!(matches!(err, AnnounceError::TorrentDoesNotExist));
    }

    #[tokio::test]
    async fn put_then_find_torrent_round_trips() {
        let store = InMemoryStore::new();
        let pool = InMemoryPool::new(store);
        let conn = pool.get().await.unwrap();
        let infohash = InfoHash::new([2u8; 20]);
        conn.put_torrent(Arc::new(Torrent::new(infohash))).await.unwrap();
        assert!(conn.find_torrent(&infohash).await.is_ok());
    }

    #[tokio::test]
    async fn purge_is_noop_when_not_empty() {
        let store = InMemoryStore::new();
        let pool = InMemoryPool::new(store);
        let conn = pool.get().await.unwrap();
        let infohash = InfoHash::new([3u8; 20]);
        let torrent = Arc::new(Torrent::new(infohash));
        conn.put_torrent(Arc::clone(&torrent)).await.unwrap();
        torrent.put_seeder(Peer::new(
            crate::protocol::PeerId::new([9u8; 20]),
            None,
            std::net::IpAddr::V4(std::net::Ipv4Addr::new(1, 2, 3, 4)),
            1,
            0,
            0,
            0,
        ));
        conn.purge_inactive_torrent(&infohash).await.unwrap();
        assert!(conn.find_torrent(&infohash).await.is_ok());
    }
}
