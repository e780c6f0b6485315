use std::path::Path;

use log::{debug, info};
use pcap::{Activated, Active, Capture, Device, Error, Linktype, Offline};

use crate::core::error::CaptureError;

pub const SNAPLEN: i32 = 65536;

/// Read timeout on live handles. Only there so the loop can notice a shutdown
/// request while the wire is idle; timeouts are never surfaced.
const POLL_TIMEOUT_MS: i32 = 250;

/// Result of one read from a frame source.
#[derive(Debug, PartialEq, Eq)]
pub enum Poll<'a> {
    Frame(&'a [u8]),
    /// Nothing arrived yet; try again.
    Idle,
    /// The source has no more frames (end of a capture file).
    Exhausted,
}

pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Poll<'_>, CaptureError>;
}

pub fn list_devices() -> Vec<String> {
    Device::list()
        .unwrap_or_default()
        .into_iter()
        .map(|d| d.name)
        .collect()
}

pub struct PcapSource<T: Activated + ?Sized> {
    cap: Capture<T>,
    label: String,
}

impl<T: Activated + ?Sized> PcapSource<T> {
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// The decoder chain starts at an Ethernet header; cooked (SLL), raw-IP and
/// loopback captures have a different first layer and are refused up front.
pub fn ensure_ethernet(linktype: Linktype) -> Result<(), CaptureError> {
    if linktype == Linktype::ETHERNET {
        Ok(())
    } else {
        Err(CaptureError::UnsupportedLinkType(linktype.0))
    }
}

/// Opens a live handle on `interface`, or on the default device.
pub fn open_live(interface: Option<&str>) -> Result<PcapSource<Active>, CaptureError> {
    let device = match interface {
        Some(name) => Device::from(name),
        None => Device::lookup()
            .map_err(CaptureError::from_open)?
            .ok_or_else(|| CaptureError::DeviceUnavailable("no capture device found".into()))?,
    };
    let label = device.name.clone();

    let cap = Capture::from_device(device)
        .map_err(CaptureError::from_open)?
        .promisc(true)
        .snaplen(SNAPLEN)
        .timeout(POLL_TIMEOUT_MS)
        .open()
        .map_err(CaptureError::from_open)?;
    ensure_ethernet(cap.get_datalink())?;

    info!("live capture opened on {label}");
    Ok(PcapSource { cap, label })
}

/// Replays a pcap savefile.
pub fn open_offline(path: &Path) -> Result<PcapSource<Offline>, CaptureError> {
    let cap = Capture::from_file(path).map_err(|e| CaptureError::File {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    ensure_ethernet(cap.get_datalink())?;

    let label = path.display().to_string();
    info!("replaying capture file {label}");
    Ok(PcapSource { cap, label })
}

impl<T: Activated + ?Sized> FrameSource for PcapSource<T> {
    fn next_frame(&mut self) -> Result<Poll<'_>, CaptureError> {
        match self.cap.next_packet() {
            Ok(packet) => Ok(Poll::Frame(packet.data)),
            Err(Error::TimeoutExpired) => Ok(Poll::Idle),
            Err(Error::NoMorePackets) => Ok(Poll::Exhausted),
            Err(e) => {
                debug!("pcap read error: {e:?}");
                Err(CaptureError::Read(e.to_string()))
            }
        }
    }
}

/// In-memory source; yields the queued frames in order, then `Exhausted`.
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: std::collections::VecDeque<Vec<u8>>,
    current: Vec<u8>,
}

impl MemorySource {
    pub fn new<I>(frames: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self {
            frames: frames.into_iter().collect(),
            current: Vec::new(),
        }
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Poll<'_>, CaptureError> {
        match self.frames.pop_front() {
            Some(frame) => {
                self.current = frame;
                Ok(Poll::Frame(&self.current))
            }
            None => Ok(Poll::Exhausted),
        }
    }
}
