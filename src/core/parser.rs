use std::net::Ipv4Addr;

use crate::core::error::{DecodeError, Layer};
use crate::core::models::*;

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const IPV4_HEADER_LEN: usize = 20;
pub const TCP_HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;

/// Splits `len` header bytes off the front of `data`.
fn split_header(layer: Layer, data: &[u8], len: usize) -> Result<(&[u8], &[u8]), DecodeError> {
    if data.len() < len {
        return Err(DecodeError::FrameTooShort {
            layer,
            needed: len,
            got: data.len(),
        });
    }
    Ok(data.split_at(len))
}

fn format_mac(b: &[u8]) -> String {
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        b[0], b[1], b[2], b[3], b[4], b[5]
    )
}

pub fn parse_ethernet(raw: &[u8]) -> Result<(EthernetHeader, &[u8]), DecodeError> {
    let (hdr, rest) = split_header(Layer::Ethernet, raw, ETHERNET_HEADER_LEN)?;

    let eth = EthernetHeader {
        dst_mac: format_mac(&hdr[0..6]),
        src_mac: format_mac(&hdr[6..12]),
        ethertype: u16::from_be_bytes([hdr[12], hdr[13]]),
    };

    Ok((eth, rest))
}

/// Always consumes exactly 20 bytes, whatever the IHL says.
pub fn parse_ipv4(data: &[u8]) -> Result<(Ipv4Header, &[u8]), DecodeError> {
    let (hdr, rest) = split_header(Layer::Ipv4, data, IPV4_HEADER_LEN)?;

    let ip = Ipv4Header {
        version_ihl: hdr[0],
        tos: hdr[1],
        total_length: u16::from_be_bytes([hdr[2], hdr[3]]),
        identification: u16::from_be_bytes([hdr[4], hdr[5]]),
        flags_fragment: u16::from_be_bytes([hdr[6], hdr[7]]),
        ttl: hdr[8],
        protocol: hdr[9],
        checksum: u16::from_be_bytes([hdr[10], hdr[11]]),
        src_ip: Ipv4Addr::new(hdr[12], hdr[13], hdr[14], hdr[15]),
        dst_ip: Ipv4Addr::new(hdr[16], hdr[17], hdr[18], hdr[19]),
    };

    Ok((ip, rest))
}

/// Always consumes exactly 20 bytes; the data offset field is not read.
pub fn parse_tcp(data: &[u8]) -> Result<(TcpHeader, &[u8]), DecodeError> {
    let (hdr, rest) = split_header(Layer::Tcp, data, TCP_HEADER_LEN)?;

    let tcp = TcpHeader {
        src_port: u16::from_be_bytes([hdr[0], hdr[1]]),
        dst_port: u16::from_be_bytes([hdr[2], hdr[3]]),
    };

    Ok((tcp, rest))
}

pub fn parse_udp(data: &[u8]) -> Result<(UdpHeader, &[u8]), DecodeError> {
    let (hdr, rest) = split_header(Layer::Udp, data, UDP_HEADER_LEN)?;

    let udp = UdpHeader {
        src_port: u16::from_be_bytes([hdr[0], hdr[1]]),
        dst_port: u16::from_be_bytes([hdr[2], hdr[3]]),
    };

    Ok((udp, rest))
}

/// Runs the whole chain Ethernet -> IPv4 -> {TCP, UDP} over one frame.
///
/// Anything that is not IPv4 carrying TCP or UDP comes back as an error so the
/// caller can drop the frame; no partial result is ever returned.
pub fn decode_frame(raw: &[u8]) -> Result<Segment<'_>, DecodeError> {
    let (eth, rest) = parse_ethernet(raw)?;
    if eth.ethertype != ETHERTYPE_IPV4 {
        return Err(DecodeError::UnsupportedEtherType(eth.ethertype));
    }

    let (ip, rest) = parse_ipv4(rest)?;

    let (transport, payload) = match ip.protocol {
        IPPROTO_TCP => {
            let (tcp, payload) = parse_tcp(rest)?;
            (TransportHeader::Tcp(tcp), payload)
        }
        IPPROTO_UDP => {
            let (udp, payload) = parse_udp(rest)?;
            (TransportHeader::Udp(udp), payload)
        }
        other => return Err(DecodeError::UnsupportedProtocol(other)),
    };

    Ok(Segment {
        eth,
        ip,
        transport,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth_header(ethertype: u16) -> Vec<u8> {
        let mut f = vec![0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];
        f.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x5a]);
        f.extend_from_slice(&ethertype.to_be_bytes());
        f
    }

    fn ipv4_header(protocol: u8) -> Vec<u8> {
        vec![
            0x45, 0x00, 0x00, 0x3c, 0x1c, 0x46, 0x40, 0x00, 0x40, protocol, 0xb1, 0xe6, 192,
            168, 0, 10, 93, 184, 216, 34,
        ]
    }

    fn ports(src: u16, dst: u16, len: usize) -> Vec<u8> {
        let mut h = vec![0u8; len];
        h[0..2].copy_from_slice(&src.to_be_bytes());
        h[2..4].copy_from_slice(&dst.to_be_bytes());
        h
    }

    #[test]
    fn ethernet_header_is_decoded() {
        let mut frame = eth_header(0x0800);
        frame.extend_from_slice(b"rest");

        let (eth, rest) = parse_ethernet(&frame).unwrap();
        assert_eq!(eth.dst_mac, "aa:bb:cc:dd:ee:ff");
        assert_eq!(eth.src_mac, "00:11:22:33:44:5a");
        assert_eq!(eth.ethertype, ETHERTYPE_IPV4);
        assert_eq!(rest, b"rest");
    }

    #[test]
    fn short_ethernet_frame_is_rejected() {
        for len in 0..ETHERNET_HEADER_LEN {
            let frame = vec![0u8; len];
            assert_eq!(
                parse_ethernet(&frame).unwrap_err(),
                DecodeError::FrameTooShort {
                    layer: Layer::Ethernet,
                    needed: 14,
                    got: len
                }
            );
        }
    }

    #[test]
    fn ipv4_header_fields_are_big_endian() {
        let hdr = ipv4_header(IPPROTO_TCP);
        let (ip, rest) = parse_ipv4(&hdr).unwrap();
        assert_eq!(ip.version_ihl, 0x45);
        assert_eq!(ip.total_length, 60);
        assert_eq!(ip.identification, 0x1c46);
        assert_eq!(ip.flags_fragment, 0x4000);
        assert_eq!(ip.ttl, 64);
        assert_eq!(ip.checksum, 0xb1e6);
        assert_eq!(ip.src_ip.to_string(), "192.168.0.10");
        assert_eq!(ip.dst_ip.to_string(), "93.184.216.34");
        assert!(rest.is_empty());
    }

    #[test]
    fn ipv4_options_are_not_skipped() {
        // IHL = 6 announces four option bytes; they end up at the start of the TCP header.
        let mut data = ipv4_header(IPPROTO_TCP);
        data[0] = 0x46;
        data.extend_from_slice(&[1, 2, 3, 4]);

        let (_, rest) = parse_ipv4(&data).unwrap();
        assert_eq!(rest, &[1, 2, 3, 4]);
    }

    #[test]
    fn transport_headers_need_their_fixed_length() {
        assert!(matches!(
            parse_tcp(&[0u8; 19]),
            Err(DecodeError::FrameTooShort { layer: Layer::Tcp, .. })
        ));
        assert!(matches!(
            parse_udp(&[0u8; 7]),
            Err(DecodeError::FrameTooShort { layer: Layer::Udp, .. })
        ));
    }

    #[test]
    fn tcp_frame_decodes_to_segment() {
        let mut frame = eth_header(0x0800);
        frame.extend(ipv4_header(IPPROTO_TCP));
        frame.extend(ports(51000, 80, TCP_HEADER_LEN));
        frame.extend_from_slice(b"GET / HTTP/1.1\r\n");

        let seg = decode_frame(&frame).unwrap();
        assert_eq!(
            seg.transport,
            TransportHeader::Tcp(TcpHeader {
                src_port: 51000,
                dst_port: 80
            })
        );
        assert_eq!(seg.payload, b"GET / HTTP/1.1\r\n");
    }

    #[test]
    fn udp_frame_decodes_to_segment() {
        let mut frame = eth_header(0x0800);
        frame.extend(ipv4_header(IPPROTO_UDP));
        frame.extend(ports(5353, 53, UDP_HEADER_LEN));
        frame.extend_from_slice(&[9, 9]);

        let seg = decode_frame(&frame).unwrap();
        assert_eq!(
            seg.transport,
            TransportHeader::Udp(UdpHeader {
                src_port: 5353,
                dst_port: 53
            })
        );
        assert_eq!(seg.payload, &[9, 9]);
    }

    #[test]
    fn out_of_scope_frames_are_filtered() {
        let mut arp = eth_header(0x0806);
        arp.extend_from_slice(&[0u8; 28]);
        assert_eq!(
            decode_frame(&arp).unwrap_err(),
            DecodeError::UnsupportedEtherType(0x0806)
        );

        let mut icmp = eth_header(0x0800);
        icmp.extend(ipv4_header(1));
        icmp.extend_from_slice(&[0u8; 8]);
        assert_eq!(
            decode_frame(&icmp).unwrap_err(),
            DecodeError::UnsupportedProtocol(1)
        );
    }

    #[test]
    fn truncation_at_any_layer_is_reported() {
        let mut frame = eth_header(0x0800);
        frame.extend_from_slice(&ipv4_header(IPPROTO_TCP)[..12]);
        assert!(matches!(
            decode_frame(&frame),
            Err(DecodeError::FrameTooShort { layer: Layer::Ipv4, needed: 20, got: 12 })
        ));

        let mut frame = eth_header(0x0800);
        frame.extend(ipv4_header(IPPROTO_TCP));
        frame.extend_from_slice(&[0u8; 10]);
        assert!(matches!(
            decode_frame(&frame),
            Err(DecodeError::FrameTooShort { layer: Layer::Tcp, needed: 20, got: 10 })
        ));
    }
}
