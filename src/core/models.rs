use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthernetHeader {
    pub dst_mac: String,
    pub src_mac: String,
    pub ethertype: u16,
}

/// Fixed 20-byte IPv4 header. IHL is kept as read but never used to skip
/// options, so option-bearing packets are misaligned downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv4Header {
    pub version_ihl: u8,
    pub tos: u8,
    pub total_length: u16,
    pub identification: u16,
    pub flags_fragment: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportHeader {
    Tcp(TcpHeader),
    Udp(UdpHeader),
}

/// A fully decoded frame: every header up to the transport layer plus the
/// transport payload, borrowed from the captured bytes.
#[derive(Debug, Clone)]
pub struct Segment<'a> {
    pub eth: EthernetHeader,
    pub ip: Ipv4Header,
    pub transport: TransportHeader,
    pub payload: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArtifactKind {
    Http,
    Dns,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Http => f.write_str("HTTP"),
            ArtifactKind::Dns => f.write_str("DNS"),
        }
    }
}

/// Output of an extractor, before it gets a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub src_ip: Ipv4Addr,
    pub text: String,
    pub kind: ArtifactKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub timestamp: DateTime<Local>,
    pub src_ip: Ipv4Addr,
    pub text: String,
    pub kind: ArtifactKind,
}
