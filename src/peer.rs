//! Peer and torrent swarm data model.
//!
//! Pools are backed by `DashMap` so concurrent `HandleAnnounce` calls against
//! different torrents never contend, and calls against the same torrent only
//! serialize at the map-entry level rather than behind one global lock.

use crate::protocol::{InfoHash, PeerId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Composite key identifying a peer within one torrent on one address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerKey {
    pub peer_id: PeerId,
    pub is_ipv6: bool,
}

impl PeerKey {
    #[inline]
    pub fn new(peer_id: PeerId, is_ipv6: bool) -> Self {
        Self { peer_id, is_ipv6 }
    }
}

/// A peer's state within a single torrent's swarm.
///
/// A dual-stacked client is represented as two `Peer` records sharing
/// `peer_id` but keyed separately by `PeerKey` (one per address family).
#[derive(Debug, Clone)]
pub struct Peer {
    pub peer_id: PeerId,
    pub user_id: Option<Uuid>,
    pub ip: IpAddr,
    pub port: u16,
    pub uploaded: u64,
    pub downloaded: u64,
    pub left: u64,
    pub last_seen: DateTime<Utc>,
}

impl Peer {
    pub fn new(
        peer_id: PeerId,
        user_id: Option<Uuid>,
        ip: IpAddr,
        port: u16,
        uploaded: u64,
        downloaded: u64,
        left: u64,
    ) -> Self {
        Self {
            peer_id,
            user_id,
            ip,
            port,
            uploaded,
            downloaded,
            left,
            last_seen: Utc::now(),
        }
    }

    #[inline]
    pub fn key(&self) -> PeerKey {
        PeerKey::new(self.peer_id, self.ip.is_ipv6())
    }

    /// Left == 0 means the peer already has the full content.
    #[inline]
    pub fn is_seeding(&self) -> bool {
        self.left == 0
    }

    #[inline]
    pub fn has_ipv4(&self) -> bool {
        self.ip.is_ipv4()
    }

    #[inline]
    pub fn has_ipv6(&self) -> bool {
        self.ip.is_ipv6()
    }

    fn refresh(&mut self, uploaded: u64, downloaded: u64, left: u64) {
        self.uploaded = uploaded;
        self.downloaded = downloaded;
        self.left = left;
        self.last_seen = Utc::now();
    }
}

/// `peersEquivalent`: true when returning `candidate` to `announcer` would be
/// returning the announcer to itself, either literally (same peer id) or, in
/// private mode, one of the same user's other peers.
pub fn peers_equivalent(a: &Peer, b: &Peer) -> bool {
    a.peer_id == b.peer_id || (a.user_id.is_some() && a.user_id == b.user_id)
}

/// A registered user, looked up by passkey in private mode. Never created by
/// the core; only its snatch counter is mutated here, and only through the
/// storage `Connection`.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub passkey: String,
    pub snatches: u64,
}

/// All known peers for one infohash, split into seeder and leecher pools.
#[derive(Debug)]
pub struct Torrent {
    pub infohash: InfoHash,
    seeders: DashMap<PeerKey, Peer>,
    leechers: DashMap<PeerKey, Peer>,
    snatches: AtomicU64,
}

impl Torrent {
    pub fn new(infohash: InfoHash) -> Self {
        Self {
            infohash,
            seeders: DashMap::new(),
            leechers: DashMap::new(),
            snatches: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn contains_seeder(&self, key: &PeerKey) -> bool {
        self.seeders.contains_key(key)
    }

    #[inline]
    pub fn contains_leecher(&self, key: &PeerKey) -> bool {
        self.leechers.contains_key(key)
    }

    /// Re-puts (or inserts) `peer` in the seeder pool, refreshing counters
    /// if it was already there.
    pub fn put_seeder(&self, peer: Peer) {
        match self.seeders.get_mut(&peer.key()) {
            Some(mut existing) => existing.refresh(peer.uploaded, peer.downloaded, peer.left),
            None => {
                self.seeders.insert(peer.key(), peer);
            }
        }
    }

    /// Re-puts (or inserts) `peer` in the leecher pool, refreshing counters
    /// if it was already there.
    pub fn put_leecher(&self, peer: Peer) {
        match self.leechers.get_mut(&peer.key()) {
            Some(mut existing) => existing.refresh(peer.uploaded, peer.downloaded, peer.left),
            None => {
                self.leechers.insert(peer.key(), peer);
            }
        }
    }

    pub fn remove_seeder(&self, key: &PeerKey) -> Option<Peer> {
        self.seeders.remove(key).map(|(_, p)| p)
    }

    pub fn remove_leecher(&self, key: &PeerKey) -> Option<Peer> {
        self.leechers.remove(key).map(|(_, p)| p)
    }

    #[inline]
    pub fn seeder_count(&self) -> usize {
        self.seeders.len()
    }

    #[inline]
    pub fn leecher_count(&self) -> usize {
        self.leechers.len()
    }

    #[inline]
    pub fn total_peer_count(&self) -> usize {
        self.seeder_count() + self.leecher_count()
    }

    #[inline]
    pub fn snatches(&self) -> u64 {
        self.snatches.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn increment_snatches(&self) {
        self.snatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn seeders(&self) -> Vec<Peer> {
        self.seeders.iter().map(|e| e.value().clone()).collect()
    }

    pub fn leechers(&self) -> Vec<Peer> {
        self.leechers.iter().map(|e| e.value().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn peer(id: u8, left: u64) -> Peer {
        let mut bytes = [0u8; 20];
        bytes[0] = id;
        Peer::new(
            PeerId::new(bytes),
            None,
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, id)),
            6881,
            0,
            0,
            left,
        )
    }

    #[test]
    fn new_leecher_is_absent_from_seeders() {
        let t = Torrent::new(InfoHash::new([0u8; 20]));
        let p = peer(1, 100);
        t.put_leecher(p.clone());
        assert!(t.contains_leecher(&p.key()));
        assert!(!t.contains_seeder(&p.key()));
    }

    #[test]
    fn promoting_a_leecher_removes_it_from_the_leecher_pool() {
        let t = Torrent::new(InfoHash::new([0u8; 20]));
        let p = peer(1, 100);
        t.put_leecher(p.clone());
        t.remove_leecher(&p.key());
        t.put_seeder(p.clone());
        assert!(t.contains_seeder(&p.key()));
        assert!(!t.contains_leecher(&p.key()));
    }

    #[test]
    fn peers_equivalent_by_id() {
        let a = peer(1, 0);
        let b = peer(1, 0);
        assert!(peers_equivalent(&a, &b));
    }

    #[test]
    fn peers_equivalent_by_user_id() {
        let mut a = peer(1, 0);
        let mut b = peer(2, 0);
        let uid = Uuid::new_v4();
        a.user_id = Some(uid);
        b.user_id = Some(uid);
        assert!(peers_equivalent(&a, &b));
    }

    #[test]
    fn distinct_peers_not_equivalent() {
        let a = peer(1, 0);
        let b = peer(2, 0);
        assert!(!peers_equivalent(&a, &b));
    }
}
