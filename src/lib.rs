//! Transport-agnostic announce-handling engine for a BitTorrent tracker.
//!
//! This crate owns the hard part of a tracker: swarm bookkeeping, the
//! announce event state machine, and peer selection. It does not decode
//! requests off the wire, encode responses, persist anything durably, or
//! export metrics: those are the job of a transport adapter, a storage
//! driver, and a stats backend wired up against the traits in
//! [`storage`], [`accounting`], and [`stats`].

pub mod accounting;
pub mod announce;
pub mod config;
pub mod error;
pub mod peer;
pub mod protocol;
pub mod stats;
pub mod storage;

pub use announce::{Announce, AnnounceDelta, AnnounceHandler, AnnounceResponse, Writer};
pub use config::Config;
pub use error::{AnnounceError, AnnounceResult};
pub use peer::{Peer, PeerKey, Torrent, User};
pub use protocol::{AnnounceEvent, ClientId, CompactPeerV4, CompactPeerV6, InfoHash, PeerId};
pub use stats::{StatKind, StatsSink};
pub use storage::{Connection, InMemoryPool, InMemoryStore, Pool};
