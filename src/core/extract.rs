//! Application-layer heuristics run on transport payloads.
//!
//! Both extractors work on untrusted bytes: every index is bounds-checked and
//! a miss is an ordinary `None`, never a panic.

use crate::core::classifier::classify;
use crate::core::models::{ArtifactKind, Extraction, Segment};

const DNS_HEADER_LEN: usize = 12;
const DNS_MAX_LABEL_LEN: usize = 63;

/// Rebuilds `http://<host><path>` from a cleartext request.
///
/// Invalid UTF-8 is dropped rather than replaced. Both a `Host:` line and a
/// `GET` line must be present.
pub fn extract_http(payload: &[u8]) -> Option<String> {
    let text: String = payload.utf8_chunks().map(|chunk| chunk.valid()).collect();

    let mut host_line = None;
    let mut get_line = None;
    for line in text.lines() {
        if host_line.is_none() && line.starts_with("Host:") {
            host_line = Some(line);
        } else if get_line.is_none() && line.starts_with("GET") {
            get_line = Some(line);
        }
        if host_line.is_some() && get_line.is_some() {
            break;
        }
    }

    let (_, host) = host_line?.split_once(' ')?;
    let (_, target) = get_line?.split_once(' ')?;
    let path = target.split(' ').next()?;

    Some(format!("http://{host}{path}"))
}

/// Reads the first question name of a DNS query.
///
/// Assumes the fixed 12-byte header and no name compression; pointer bytes
/// (0xc0 and up) are rejected as over-long labels.
pub fn extract_dns(payload: &[u8]) -> Option<String> {
    let mut labels = Vec::new();
    let mut pos = DNS_HEADER_LEN;

    loop {
        let len = usize::from(*payload.get(pos)?);
        if len == 0 {
            break;
        }
        if len > DNS_MAX_LABEL_LEN {
            return None;
        }
        let label = payload.get(pos + 1..pos + 1 + len)?;
        labels.push(std::str::from_utf8(label).ok()?);
        pos += 1 + len;
    }

    if labels.is_empty() {
        return None;
    }
    Some(labels.join("."))
}

/// Routes a decoded segment to the matching extractor.
pub fn extract(segment: &Segment<'_>) -> Option<Extraction> {
    let kind = classify(&segment.transport)?;
    let text = match kind {
        ArtifactKind::Http => extract_http(segment.payload)?,
        ArtifactKind::Dns => extract_dns(segment.payload)?,
    };

    Some(Extraction {
        src_ip: segment.ip.src_ip,
        text,
        kind,
    })
}
