//! The announce orchestrator: `HandleAnnounce` and its collaborators.
//!
//! This is the transport-agnostic core. A transport adapter decodes a client
//! request into an [`Announce`], builds a [`Writer`] to encode the result,
//! and calls [`AnnounceHandler::handle_announce`].

use crate::accounting::Backend;
use crate::config::Config;
use crate::error::{AnnounceError, AnnounceResult};
use crate::peer::{Peer, PeerKey, Torrent, User};
use crate::protocol::{AnnounceEvent, ClientId, CompactPeerV4, CompactPeerV6, InfoHash, PeerId};
use crate::stats::{StatKind, StatsSink};
use crate::storage::{Connection, Pool};
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// A decoded client announce request. Parsing this out of an HTTP query
/// string or a UDP datagram is a transport concern; the core only consumes
/// this shape.
#[derive(Debug, Clone)]
pub struct Announce {
    pub infohash: InfoHash,
    pub peer_id: PeerId,
    pub client_id: Option<ClientId>,
    pub passkey: Option<String>,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
    pub port: u16,
    pub uploaded: u64,
    pub downloaded: u64,
    pub left: u64,
    pub event: AnnounceEvent,
    pub numwant: usize,
    pub compact: bool,
}

/// Private-mode accounting record derived from one successful announce.
#[derive(Debug, Clone)]
pub struct AnnounceDelta {
    pub user_id: Option<Uuid>,
    pub infohash: InfoHash,
    pub uploaded: u64,
    pub downloaded: u64,
    pub event: AnnounceEvent,
    pub created: bool,
    pub snatched: bool,
}

/// The shaped response handed to the `Writer`.
#[derive(Debug, Clone, Default)]
pub struct AnnounceResponse {
    pub complete: u64,
    pub incomplete: u64,
    pub interval: i64,
    pub min_interval: i64,
    pub compact: bool,
    pub ipv4_peers: Vec<CompactPeerV4>,
    pub ipv6_peers: Vec<CompactPeerV6>,
}

/// Sink the orchestrator hands the shaped response to. Transport adapters
/// implement this to encode it over HTTP or UDP.
#[async_trait]
pub trait Writer: Send + Sync {
    async fn write_announce(&self, response: AnnounceResponse) -> AnnounceResult<()>;
}

/// The announcing client's identity and addresses, used only for
/// peer-equivalence and subnet-preference checks, never stored directly.
#[derive(Debug, Clone)]
struct Announcer {
    peer_id: PeerId,
    user_id: Option<Uuid>,
    ipv4: Option<Ipv4Addr>,
    ipv6: Option<Ipv6Addr>,
    is_seeding: bool,
}

impl Announcer {
    fn has_ipv6(&self) -> bool {
        self.ipv6.is_some()
    }

    /// `peersEquivalent`: true iff returning `candidate` to this announcer
    /// would return the announcer to itself, or (in private mode) one of the
    /// same user's other peers.
    fn equivalent(&self, candidate: &Peer) -> bool {
        candidate.peer_id == self.peer_id
            || (self.user_id.is_some() && self.user_id == candidate.user_id)
    }
}

fn ipv4_in_subnet(a: Ipv4Addr, b: Ipv4Addr, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    let mask: u32 = if prefix_len >= 32 {
        u32::MAX
    } else {
        !0u32 << (32 - prefix_len)
    };
    (u32::from(a) & mask) == (u32::from(b) & mask)
}

fn ipv6_in_subnet(a: Ipv6Addr, b: Ipv6Addr, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    let mask: u128 = if prefix_len >= 128 {
        u128::MAX
    } else {
        !0u128 << (128 - prefix_len)
    };
    (u128::from(a) & mask) == (u128::from(b) & mask)
}

/// Appends `candidate` to the right compact list for its family. Returns
/// whether the candidate was usable at all: a v6-only candidate when the
/// announcer has no v6 address of its own consumes no budget.
fn try_append(
    v4: &mut Vec<CompactPeerV4>,
    v6: &mut Vec<CompactPeerV6>,
    announcer_has_ipv6: bool,
    candidate: &Peer,
) -> bool {
    match candidate.ip {
        IpAddr::V6(ip6) if announcer_has_ipv6 => {
            v6.push(CompactPeerV6::new(ip6, candidate.port));
            true
        }
        IpAddr::V4(ip4) => {
            v4.push(CompactPeerV4::new(ip4, candidate.port));
            true
        }
        _ => false,
    }
}

/// Entry point. Holds the storage pool, the accounting backend, the stats
/// sink, and the runtime configuration the core consults.
pub struct AnnounceHandler {
    pool: Arc<dyn Pool>,
    backend: Arc<dyn Backend>,
    stats: Arc<dyn StatsSink>,
    config: Config,
}

impl AnnounceHandler {
    pub fn new(
        pool: Arc<dyn Pool>,
        backend: Arc<dyn Backend>,
        stats: Arc<dyn StatsSink>,
        config: Config,
    ) -> Self {
        Self {
            pool,
            backend,
            stats,
            config,
        }
    }

    /// `HandleAnnounce(Announce, Writer) -> ok | error`.
    #[instrument(skip(self, writer), fields(infohash = %announce.infohash, peer_id = %announce.peer_id))]
    pub async fn handle_announce(
        &self,
        announce: &Announce,
        writer: &dyn Writer,
    ) -> AnnounceResult<()> {
        let conn = self.pool.get().await?;

        if self.config.client_whitelist_enabled {
            let client_id = announce
                .client_id
                .as_ref()
                .ok_or_else(|| AnnounceError::bad_request("missing client id"))?;
            conn.find_client(client_id).await?;
        }

        let user = if self.config.private_enabled {
            let passkey = announce
                .passkey
                .as_deref()
                .ok_or_else(|| AnnounceError::bad_request("missing passkey"))?;
            Some(conn.find_user(passkey).await?)
        } else {
            None
        };

        let torrent = self.resolve_torrent(conn.as_ref(), announce).await?;

        if announce.ipv4.is_none() && announce.ipv6.is_none() {
            return Err(AnnounceError::bad_request(
                "announce carries neither an IPv4 nor an IPv6 address",
            ));
        }

        let user_id = user.as_ref().map(|u| u.id);
        let peer_v4 = announce.ipv4.map(|ip| {
            Peer::new(
                announce.peer_id,
                user_id,
                IpAddr::V4(ip),
                announce.port,
                announce.uploaded,
                announce.downloaded,
                announce.left,
            )
        });
        let peer_v6 = announce.ipv6.map(|ip| {
            Peer::new(
                announce.peer_id,
                user_id,
                IpAddr::V6(ip),
                announce.port,
                announce.uploaded,
                announce.downloaded,
                announce.left,
            )
        });

        // Swarm-update for every present family completes before any event
        // handling begins, so event handling observes post-update state.
        let mut created = false;
        if let Some(peer) = &peer_v4 {
            created |= self.update_swarm(conn.as_ref(), announce, peer, &torrent).await?;
        }
        if let Some(peer) = &peer_v6 {
            created |= self.update_swarm(conn.as_ref(), announce, peer, &torrent).await?;
        }

        let mut snatched = false;
        if let Some(peer) = &peer_v4 {
            snatched |= self
                .handle_event(conn.as_ref(), announce, peer, user.as_ref(), &torrent)
                .await?;
        }
        if let Some(peer) = &peer_v6 {
            snatched |= self
                .handle_event(conn.as_ref(), announce, peer, user.as_ref(), &torrent)
                .await?;
        }

        if self.config.private_enabled {
            let delta = AnnounceDelta {
                user_id,
                infohash: announce.infohash,
                uploaded: announce.uploaded,
                downloaded: announce.downloaded,
                event: announce.event,
                created,
                snatched,
            };
            self.backend.record_announce(delta).await?;
        } else if self.config.purge_inactive_torrents && torrent.total_peer_count() == 0 {
            conn.purge_inactive_torrent(&announce.infohash).await?;
            self.stats.record_event(StatKind::DeletedTorrent);
        }

        let announcer = Announcer {
            peer_id: announce.peer_id,
            user_id,
            ipv4: announce.ipv4,
            ipv6: announce.ipv6,
            is_seeding: announce.left == 0,
        };
        let response = self.build_response(announce, &announcer, &torrent);
        writer.write_announce(response).await
    }

    async fn resolve_torrent(
        &self,
        conn: &dyn Connection,
        announce: &Announce,
    ) -> AnnounceResult<Arc<Torrent>> {
        match conn.find_torrent(&announce.infohash).await {
            Ok(torrent) => Ok(torrent),
            Err(AnnounceError::TorrentDoesNotExist) => {
                if self.config.private_enabled {
                    return Err(AnnounceError::TorrentDoesNotExist);
                }
                let torrent = Arc::new(Torrent::new(announce.infohash));
                conn.put_torrent(Arc::clone(&torrent)).await?;
                self.stats.record_event(StatKind::NewTorrent);
                debug!(infohash = %announce.infohash, "auto-created torrent");
                Ok(torrent)
            }
            Err(e) => Err(e),
        }
    }

    /// `updateSwarm`: insert-or-refresh `peer` in the pool implied by its
    /// current membership (or, for a new peer, by `Left`).
    async fn update_swarm(
        &self,
        conn: &dyn Connection,
        announce: &Announce,
        peer: &Peer,
        torrent: &Torrent,
    ) -> AnnounceResult<bool> {
        conn.touch_torrent(&announce.infohash).await?;
        let key = peer.key();

        if torrent.contains_seeder(&key) {
            conn.put_seeder(&announce.infohash, peer.clone()).await?;
            return Ok(false);
        }
        if torrent.contains_leecher(&key) {
            conn.put_leecher(&announce.infohash, peer.clone()).await?;
            return Ok(false);
        }

        // Absent from both pools: a peer cannot "stop" or "complete" a swarm
        // it isn't part of.
        if !announce.event.is_empty() && !announce.event.is_started() {
            return Err(AnnounceError::bad_request(
                "non-started event from a peer absent from the swarm",
            ));
        }

        if peer.is_seeding() {
            conn.put_seeder(&announce.infohash, peer.clone()).await?;
            self.stats.record_peer_event(StatKind::NewSeed, key.is_ipv6);
        } else {
            conn.put_leecher(&announce.infohash, peer.clone()).await?;
            self.stats.record_peer_event(StatKind::NewLeech, key.is_ipv6);
        }
        Ok(true)
    }

    /// `handleEvent`: interprets `Announce.Event` against the peer's current
    /// pool membership. Returns whether this call counted as a snatch.
    async fn handle_event(
        &self,
        conn: &dyn Connection,
        announce: &Announce,
        peer: &Peer,
        user: Option<&User>,
        torrent: &Torrent,
    ) -> AnnounceResult<bool> {
        let key = peer.key();
        let infohash = &announce.infohash;

        if announce.event.is_stop_like() {
            if torrent.contains_seeder(&key) {
                conn.delete_seeder(infohash, &key).await?;
                self.stats.record_peer_event(StatKind::DeletedSeed, key.is_ipv6);
            } else if torrent.contains_leecher(&key) {
                conn.delete_leecher(infohash, &key).await?;
                self.stats.record_peer_event(StatKind::DeletedLeech, key.is_ipv6);
            }
            return Ok(false);
        }

        if announce.event.is_completed() {
            // A dual-stacked peer completing on both families in the same
            // request must only count once. `is_first_family` gates both
            // the counters and the returned snatched flag.
            let other_family = PeerKey::new(peer.peer_id, !key.is_ipv6);
            let is_first_family = !torrent.contains_seeder(&other_family);

            // Preserve the upstream quirk: the snatch counters are bumped
            // before the leecher-pool membership check, so they drift even
            // on a malformed "completed" from a non-leecher.
            if is_first_family {
                conn.increment_torrent_snatches(infohash).await?;
                if let Some(user) = user {
                    conn.increment_user_snatches(&user.passkey).await?;
                }
            }

            if !torrent.contains_leecher(&key) {
                return Err(AnnounceError::bad_request(
                    "completed event from a peer not in the leecher pool",
                ));
            }

            self.leecher_finished(conn, infohash, &key, peer).await?;

            return Ok(is_first_family);
        }

        // Empty event with Left == 0 on a current leecher: silent
        // completion. No counters move and `snatched` stays false, so
        // clients that skip the explicit "completed" event still converge.
        if announce.event.is_empty() && peer.is_seeding() && torrent.contains_leecher(&key) {
            self.leecher_finished(conn, infohash, &key, peer).await?;
        }

        Ok(false)
    }

    /// `leecherFinished`: delete from leecher storage, then insert into
    /// seeder storage. If the delete fails, no insertion is attempted, so
    /// the peer is never visible in both pools at the storage layer.
    async fn leecher_finished(
        &self,
        conn: &dyn Connection,
        infohash: &InfoHash,
        key: &PeerKey,
        peer: &Peer,
    ) -> AnnounceResult<()> {
        conn.delete_leecher(infohash, key).await?;
        conn.put_seeder(infohash, peer.clone()).await?;
        self.stats.record_peer_event(StatKind::Completed, key.is_ipv6);
        Ok(())
    }

    /// `newAnnounceResponse`.
    fn build_response(
        &self,
        announce: &Announce,
        announcer: &Announcer,
        torrent: &Torrent,
    ) -> AnnounceResponse {
        let complete = torrent.seeder_count() as u64;
        let incomplete = torrent.leecher_count() as u64;

        let (ipv4_peers, ipv6_peers) = if announce.numwant > 0 && !announce.event.is_stop_like() {
            self.get_peers(announcer, torrent, announce.numwant)
        } else {
            (Vec::new(), Vec::new())
        };

        AnnounceResponse {
            complete,
            incomplete,
            interval: self.config.announce_interval_secs,
            min_interval: self.config.min_announce_interval_secs,
            compact: announce.compact,
            ipv4_peers,
            ipv6_peers,
        }
    }

    /// `getPeers`: a seeding announcer only wants leechers; otherwise
    /// seeders are preferred and leechers fill the remaining budget.
    fn get_peers(
        &self,
        announcer: &Announcer,
        torrent: &Torrent,
        wanted: usize,
    ) -> (Vec<CompactPeerV4>, Vec<CompactPeerV6>) {
        let mut v4 = Vec::new();
        let mut v6 = Vec::new();

        if announcer.is_seeding {
            self.append_peers(&mut v4, &mut v6, announcer, &torrent.leechers(), wanted);
            return (v4, v6);
        }

        self.append_peers(&mut v4, &mut v6, announcer, &torrent.seeders(), wanted);
        let remaining = wanted.saturating_sub(v4.len() + v6.len());
        if remaining > 0 {
            self.append_peers(&mut v4, &mut v6, announcer, &torrent.leechers(), remaining);
        }
        (v4, v6)
    }

    /// `appendPeers`.
    fn append_peers(
        &self,
        v4: &mut Vec<CompactPeerV4>,
        v6: &mut Vec<CompactPeerV6>,
        announcer: &Announcer,
        pool: &[Peer],
        wanted: usize,
    ) {
        let mut budget = wanted;
        if budget == 0 {
            return;
        }

        if !self.config.preferred_subnet {
            for candidate in pool {
                if budget == 0 {
                    break;
                }
                if announcer.equivalent(candidate) {
                    continue;
                }
                if try_append(v4, v6, announcer.has_ipv6(), candidate) {
                    budget -= 1;
                }
            }
            return;
        }

        for prefer_in_subnet in [true, false] {
            if budget == 0 {
                break;
            }
            for candidate in pool {
                if budget == 0 {
                    break;
                }
                if announcer.equivalent(candidate) {
                    continue;
                }
                if self.in_preferred_subnet(announcer, candidate) != prefer_in_subnet {
                    continue;
                }
                if try_append(v4, v6, announcer.has_ipv6(), candidate) {
                    budget -= 1;
                }
            }
        }
    }

    fn in_preferred_subnet(&self, announcer: &Announcer, candidate: &Peer) -> bool {
        match candidate.ip {
            IpAddr::V4(c) => announcer
                .ipv4
                .is_some_and(|a| ipv4_in_subnet(a, c, self.config.preferred_ipv4_subnet)),
            IpAddr::V6(c) => announcer
                .ipv6
                .is_some_and(|a| ipv6_in_subnet(a, c, self.config.preferred_ipv6_subnet)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::NoopBackend;
    use crate::stats::NoopStatsSink;
    use crate::storage::{InMemoryPool, InMemoryStore};
    use std::sync::Mutex;

    fn handler(config: Config) -> (AnnounceHandler, Arc<InMemoryStore>) {
        let store = InMemoryStore::new();
        let pool: Arc<dyn Pool> = Arc::new(InMemoryPool::new(Arc::clone(&store)));
        let handler = AnnounceHandler::new(
            pool,
            Arc::new(NoopBackend),
            Arc::new(NoopStatsSink),
            config,
        );
        (handler, store)
    }

    #[derive(Default)]
    struct RecordingWriter {
        last: Mutex<Option<AnnounceResponse>>,
    }

    #[async_trait]
    impl Writer for RecordingWriter {
        async fn write_announce(&self, response: AnnounceResponse) -> AnnounceResult<()> {
            *self.last.lock().unwrap() = Some(response);
            Ok(())
        }
    }

    fn base_announce(infohash: [u8; 20], peer: u8, ip: [u8; 4], left: u64, event: AnnounceEvent) -> Announce {
        let mut peer_id = [0u8; 20];
        peer_id[0] = peer;
        Announce {
            infohash: InfoHash::new(infohash),
            peer_id: PeerId::new(peer_id),
            client_id: None,
            passkey: None,
            ipv4: Some(Ipv4Addr::from(ip)),
            ipv6: None,
            port: 6881,
            uploaded: 0,
            downloaded: 0,
            left,
            event,
            numwant: 50,
            compact: true,
        }
    }

    #[tokio::test]
    async fn open_mode_first_announce_creates_torrent() {
        let (handler, _store) = handler(Config::default());
        let writer = RecordingWriter::default();
        let announce = base_announce([1u8; 20], 1, [1, 2, 3, 4], 100, AnnounceEvent::Started);

        handler.handle_announce(&announce, &writer).await.unwrap();

        let response = writer.last.lock().unwrap().clone().unwrap();
        assert_eq!(response.complete, 0);
        assert_eq!(response.incomplete, 1);
        assert!(response.ipv4_peers.is_empty());
    }

    #[tokio::test]
    async fn leecher_completing_becomes_seeder_and_counts_one_snatch() {
        let (handler, store) = handler(Config::default());
        let writer = RecordingWriter::default();
        let start = base_announce([2u8; 20], 1, [1, 2, 3, 4], 100, AnnounceEvent::Started);
        handler.handle_announce(&start, &writer).await.unwrap();

        let complete = base_announce([2u8; 20], 1, [1, 2, 3, 4], 0, AnnounceEvent::Completed);
        handler.handle_announce(&complete, &writer).await.unwrap();

        let torrent = store.torrent(&InfoHash::new([2u8; 20])).unwrap();
        assert_eq!(torrent.snatches(), 1);
        assert_eq!(torrent.seeder_count(), 1);
        assert_eq!(torrent.leecher_count(), 0);

        let response = writer.last.lock().unwrap().clone().unwrap();
        assert_eq!(response.complete, 1);
        assert_eq!(response.incomplete, 0);
    }

    #[tokio::test]
    async fn stopped_from_absent_peer_is_bad_request() {
        let (handler, _store) = handler(Config::default());
        let writer = RecordingWriter::default();
        let announce = base_announce([3u8; 20], 9, [5, 6, 7, 8], 50, AnnounceEvent::Stopped);

        let err = handler.handle_announce(&announce, &writer).await.unwrap_err();
        assert!(matches!(err, AnnounceError::BadRequest(_)));
        assert!(writer.last.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn announcer_is_excluded_from_its_own_peer_list() {
        let (handler, _store) = handler(Config::default());
        let writer = RecordingWriter::default();

        let p1 = base_announce([4u8; 20], 1, [1, 1, 1, 1], 50, AnnounceEvent::Started);
        handler.handle_announce(&p1, &writer).await.unwrap();
        let p2 = base_announce([4u8; 20], 2, [2, 2, 2, 2], 50, AnnounceEvent::Started);
        handler.handle_announce(&p2, &writer).await.unwrap();

        let again = base_announce([4u8; 20], 1, [1, 1, 1, 1], 50, AnnounceEvent::Empty);
        handler.handle_announce(&again, &writer).await.unwrap();

        let response = writer.last.lock().unwrap().clone().unwrap();
        assert_eq!(response.incomplete, 2);
        assert_eq!(response.ipv4_peers.len(), 1);
        assert_eq!(response.ipv4_peers[0].ip, Ipv4Addr::new(2, 2, 2, 2));
    }

    #[tokio::test]
    async fn seeding_announcer_only_gets_leechers() {
        let (handler, _store) = handler(Config::default());
        let writer = RecordingWriter::default();

        let s1 = base_announce([5u8; 20], 1, [1, 1, 1, 1], 0, AnnounceEvent::Started);
        handler.handle_announce(&s1, &writer).await.unwrap();
        let s2 = base_announce([5u8; 20], 2, [2, 2, 2, 2], 0, AnnounceEvent::Started);
        handler.handle_announce(&s2, &writer).await.unwrap();
        let l1 = base_announce([5u8; 20], 3, [3, 3, 3, 3], 50, AnnounceEvent::Started);
        handler.handle_announce(&l1, &writer).await.unwrap();

        let again = base_announce([5u8; 20], 1, [1, 1, 1, 1], 0, AnnounceEvent::Empty);
        handler.handle_announce(&again, &writer).await.unwrap();

        let response = writer.last.lock().unwrap().clone().unwrap();
        assert_eq!(response.ipv4_peers.len(), 1);
        assert_eq!(response.ipv4_peers[0].ip, Ipv4Addr::new(3, 3, 3, 3));
    }

    #[tokio::test]
    async fn subnet_preference_fills_budget_from_in_subnet_peers_first() {
        let mut config = Config::default();
        config.preferred_subnet = true;
        config.preferred_ipv4_subnet = 24;
        let (handler, _store) = handler(config);
        let writer = RecordingWriter::default();

        let a = base_announce([6u8; 20], 1, [10, 0, 0, 5], 50, AnnounceEvent::Started);
        handler.handle_announce(&a, &writer).await.unwrap();
        let b = base_announce([6u8; 20], 2, [10, 0, 0, 9], 50, AnnounceEvent::Started);
        handler.handle_announce(&b, &writer).await.unwrap();
        let c = base_announce([6u8; 20], 3, [192, 168, 1, 1], 50, AnnounceEvent::Started);
        handler.handle_announce(&c, &writer).await.unwrap();

        let mut announcer = base_announce([6u8; 20], 4, [10, 0, 0, 2], 0, AnnounceEvent::Empty);
        announcer.numwant = 2;
        handler.handle_announce(&announcer, &writer).await.unwrap();

        let response = writer.last.lock().unwrap().clone().unwrap();
        let ips: Vec<_> = response.ipv4_peers.iter().map(|p| p.ip).collect();
        assert_eq!(ips.len(), 2);
        assert!(ips.contains(&Ipv4Addr::new(10, 0, 0, 5)));
        assert!(ips.contains(&Ipv4Addr::new(10, 0, 0, 9)));
    }

    #[tokio::test]
    async fn dual_stack_completion_counts_one_snatch() {
        let (handler, store) = handler(Config::default());
        let writer = RecordingWriter::default();
        let infohash = InfoHash::new([9u8; 20]);
        let peer_id = PeerId::new([1u8; 20]);

        let start = Announce {
            infohash,
            peer_id,
            client_id: None,
            passkey: None,
            ipv4: Some(Ipv4Addr::new(1, 2, 3, 4)),
            ipv6: Some(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)),
            port: 6881,
            uploaded: 0,
            downloaded: 0,
            left: 100,
            event: AnnounceEvent::Started,
            numwant: 0,
            compact: true,
        };
        handler.handle_announce(&start, &writer).await.unwrap();

        let mut complete = start.clone();
        complete.left = 0;
        complete.event = AnnounceEvent::Completed;
        handler.handle_announce(&complete, &writer).await.unwrap();

        let torrent = store.torrent(&infohash).unwrap();
        assert_eq!(torrent.snatches(), 1);
        assert_eq!(torrent.seeder_count(), 2);
        assert_eq!(torrent.leecher_count(), 0);
    }

    #[tokio::test]
    async fn budget_is_never_exceeded_for_random_numwant() {
        use fake::Fake;

        let (handler, _store) = handler(Config::default());
        let writer = RecordingWriter::default();

        for i in 1u8..=20 {
            let announce = base_announce([8u8; 20], i, [10, 0, 0, i], 50, AnnounceEvent::Started);
            handler.handle_announce(&announce, &writer).await.unwrap();
        }

        let wanted: usize = (1..15).fake();
        let mut query = base_announce([8u8; 20], 100, [10, 0, 1, 1], 50, AnnounceEvent::Empty);
        query.numwant = wanted;
        handler.handle_announce(&query, &writer).await.unwrap();

        let response = writer.last.lock().unwrap().clone().unwrap();
        assert!(response.ipv4_peers.len() + response.ipv6_peers.len() <= wanted);
    }

    #[tokio::test]
    async fn numwant_zero_yields_empty_peer_lists() {
        let (handler, _store) = handler(Config::default());
        let writer = RecordingWriter::default();

        let other = base_announce([7u8; 20], 1, [1, 1, 1, 1], 50, AnnounceEvent::Started);
        handler.handle_announce(&other, &writer).await.unwrap();

        let mut me = base_announce([7u8; 20], 2, [2, 2, 2, 2], 50, AnnounceEvent::Started);
        me.numwant = 0;
        handler.handle_announce(&me, &writer).await.unwrap();

        let response = writer.last.lock().unwrap().clone().unwrap();
        assert!(response.ipv4_peers.is_empty());
        assert!(response.ipv6_peers.is_empty());
    }
}
