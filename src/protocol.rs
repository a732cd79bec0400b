//! Identifiers and compact address types shared by the data model.
//!
//! Decoding these from the wire (query strings, UDP datagrams) is a transport
//! concern and lives outside this crate; what's here is the shape the core
//! itself reasons about.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// 20-byte SHA1 info hash identifying a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InfoHash(pub [u8; 20]);

impl InfoHash {
    #[inline]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parses an info hash from a 40-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, anyhow::Error> {
        if s.len() != 40 {
            anyhow::bail!("info hash must be 40 hex characters, got {}", s.len());
        }

        let mut bytes = [0u8; 20];
        for i in 0..20 {
            bytes[i] = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)?;
        }

        Ok(Self(bytes))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// 20-byte peer ID identifying a BitTorrent client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub [u8; 20]);

impl PeerId {
    #[inline]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Extracts the Azureus-style client identifier prefix, if present.
    pub fn client_prefix(&self) -> Option<&str> {
        if self.0[0] == b'-' && self.0[7] == b'-' {
            std::str::from_utf8(&self.0[1..7]).ok()
        } else {
            None
        }
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}

/// Opaque client identifier used for whitelist checks; the transport adapter
/// decides how to derive it (peer id prefix, user agent, dedicated header).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(pub String);

/// The announce event a client reports, normalized from the wire string.
/// "paused" is kept distinct from "stopped" here purely for fidelity to what
/// the client sent; the event state machine treats them identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceEvent {
    Started,
    Stopped,
    Paused,
    Completed,
    Empty,
}

impl AnnounceEvent {
    /// True for the events that, at the swarm level, mean "remove this peer".
    #[inline]
    pub fn is_stop_like(self) -> bool {
        matches!(self, Self::Stopped | Self::Paused)
    }

    #[inline]
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }

    #[inline]
    pub fn is_started(self) -> bool {
        matches!(self, Self::Started)
    }
}

impl fmt::Display for AnnounceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Empty => "",
        };
        write!(f, "{}", s)
    }
}

/// Compact peer format for IPv4 (6 bytes: 4 bytes IP + 2 bytes port).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactPeerV4 {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl CompactPeerV4 {
    #[inline]
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    #[inline]
    pub fn encode(&self) -> [u8; 6] {
        let mut bytes = [0u8; 6];
        bytes[0..4].copy_from_slice(&self.ip.octets());
        bytes[4..6].copy_from_slice(&self.port.to_be_bytes());
        bytes
    }
}

/// Compact peer format for IPv6 (18 bytes: 16 bytes IP + 2 bytes port).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactPeerV6 {
    pub ip: Ipv6Addr,
    pub port: u16,
}

impl CompactPeerV6 {
    #[inline]
    pub fn new(ip: Ipv6Addr, port: u16) -> Self {
        Self { ip, port }
    }

    #[inline]
    pub fn encode(&self) -> [u8; 18] {
        let mut bytes = [0u8; 18];
        bytes[0..16].copy_from_slice(&self.ip.octets());
        bytes[16..18].copy_from_slice(&self.port.to_be_bytes());
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_hash_hex_round_trip() {
        let hex = "0123456789abcdef0123456789abcdef01234567";
        let hash = InfoHash::from_hex(hex).unwrap();
        assert_eq!(hash.to_hex(), hex);
    }

    #[test]
    fn info_hash_rejects_wrong_length() {
        assert!(InfoHash::from_hex("abcd").is_err());
    }

    #[test]
    fn peer_id_client_prefix() {
        let id = PeerId::new(*b"-DE13A0-xxxxxxxxxxxx");
        assert_eq!(id.client_prefix(), Some("DE13A0"));

        let id = PeerId::new(*b"M4-4-0--xxxxxxxxxxxx");
        assert_eq!(id.client_prefix(), None);
    }

    #[test]
    fn stop_like_covers_paused_synonym() {
        assert!(AnnounceEvent::Stopped.is_stop_like());
        assert!(AnnounceEvent::Paused.is_stop_like());
        assert!(!AnnounceEvent::Completed.is_stop_like());
    }

    #[test]
    fn compact_peer_v4_encoding() {
        let p = CompactPeerV4::new(Ipv4Addr::new(192, 168, 1, 1), 6881);
        let encoded = p.encode();
        assert_eq!(&encoded[0..4], &[192, 168, 1, 1]);
        assert_eq!(u16::from_be_bytes([encoded[4], encoded[5]]), 6881);
    }

    #[test]
    fn compact_peer_v6_encoding() {
        let p = CompactPeerV6::new(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1), 6881);
        let encoded = p.encode();
        assert_eq!(u16::from_be_bytes([encoded[16], encoded[17]]), 6881);
    }
}
