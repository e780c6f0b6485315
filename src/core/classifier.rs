use crate::core::models::{ArtifactKind, TransportHeader};

pub const HTTP_PORTS: [u16; 2] = [80, 443];
pub const DNS_PORT: u16 = 53;

/// Picks the extractor for a segment from its destination port.
///
/// Port 443 is routed to the HTTP heuristic as well; encrypted payloads
/// simply never match it.
pub fn classify(transport: &TransportHeader) -> Option<ArtifactKind> {
    match transport {
        TransportHeader::Tcp(tcp) if HTTP_PORTS.contains(&tcp.dst_port) => {
            Some(ArtifactKind::Http)
        }
        TransportHeader::Udp(udp) if udp.dst_port == DNS_PORT => Some(ArtifactKind::Dns),
        _ => None,
    }
}
