use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Ethernet,
    Ipv4,
    Tcp,
    Udp,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Ethernet => "ethernet",
            Layer::Ipv4 => "ipv4",
            Layer::Tcp => "tcp",
            Layer::Udp => "udp",
        };
        f.write_str(name)
    }
}

/// Why a frame was dropped by the decoder chain. Never fatal: the capture
/// loop logs it and moves on to the next frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{layer} header truncated: need {needed} bytes, got {got}")]
    FrameTooShort {
        layer: Layer,
        needed: usize,
        got: usize,
    },

    #[error("unsupported ethertype 0x{0:04x}")]
    UnsupportedEtherType(u16),

    #[error("unsupported ip protocol {0}")]
    UnsupportedProtocol(u8),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    /// Raw capture needs elevated privileges (root or CAP_NET_RAW).
    #[error("permission denied opening capture device: {0}")]
    PermissionDenied(String),

    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("unsupported link type {0}: only Ethernet captures can be decoded")]
    UnsupportedLinkType(i32),

    #[error("cannot open capture file {path}: {reason}")]
    File { path: PathBuf, reason: String },

    #[error("capture read failed: {0}")]
    Read(String),
}

impl CaptureError {
    /// Classifies a failure from opening a live handle.
    pub(crate) fn from_open(err: pcap::Error) -> Self {
        let msg = err.to_string();
        let lower = msg.to_lowercase();
        if lower.contains("permission") || lower.contains("not permitted") {
            CaptureError::PermissionDenied(msg)
        } else {
            CaptureError::DeviceUnavailable(msg)
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }
}
