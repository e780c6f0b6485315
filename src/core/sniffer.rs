use log::{debug, info, trace, warn};

use crate::core::capture::{FrameSource, Poll};
use crate::core::error::{CaptureError, DecodeError};
use crate::core::extract::extract;
use crate::core::history::HistoryStore;
use crate::core::models::{Artifact, ArtifactKind};
use crate::core::parser::decode_frame;
use crate::core::shutdown::Shutdown;

/// What became of a single frame.
#[derive(Debug)]
pub enum FrameOutcome<'h> {
    Recorded(&'h Artifact),
    /// Decoded fine but nothing to extract (wrong port, encrypted, ...).
    Miss,
    Dropped(DecodeError),
}

/// Decodes one frame and, if an extractor matches, appends to `history`.
pub fn process_frame<'h>(history: &'h mut HistoryStore, frame: &[u8]) -> FrameOutcome<'h> {
    let segment = match decode_frame(frame) {
        Ok(segment) => segment,
        Err(e) => return FrameOutcome::Dropped(e),
    };

    match extract(&segment) {
        Some(extraction) => FrameOutcome::Recorded(history.record_extraction(extraction)),
        None => FrameOutcome::Miss,
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames: u64,
    pub dropped: u64,
    pub misses: u64,
    pub artifacts: u64,
}

#[derive(Debug)]
pub enum StopReason {
    Interrupted,
    Exhausted,
    ReadFailed(CaptureError),
}

/// Everything the flush needs once capture is over.
#[derive(Debug)]
pub struct Finished {
    pub history: HistoryStore,
    pub stats: CaptureStats,
    pub reason: StopReason,
}

pub struct Sniffer<S: FrameSource> {
    source: S,
    history: HistoryStore,
    stats: CaptureStats,
}

impl<S: FrameSource> Sniffer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            history: HistoryStore::new(),
            stats: CaptureStats::default(),
        }
    }

    /// Captures until a stop is requested or the source ends.
    ///
    /// Takes `self` by value: once this returns the loop cannot be resumed, and
    /// the history moves on to the report writer.
    pub fn run(mut self, shutdown: &Shutdown) -> Finished {
        let reason = loop {
            if shutdown.requested() {
                break StopReason::Interrupted;
            }

            match self.source.next_frame() {
                Ok(Poll::Frame(frame)) => {
                    self.stats.frames += 1;
                    match process_frame(&mut self.history, frame) {
                        FrameOutcome::Recorded(artifact) => {
                            self.stats.artifacts += 1;
                            debug!("{} artifact from frame #{}", artifact.kind, self.stats.frames);
                            println!("{} -> {}", artifact.src_ip, artifact.text);
                        }
                        FrameOutcome::Miss => self.stats.misses += 1,
                        FrameOutcome::Dropped(e) => {
                            self.stats.dropped += 1;
                            trace!("frame #{} dropped: {e}", self.stats.frames);
                        }
                    }
                }
                Ok(Poll::Idle) => continue,
                Ok(Poll::Exhausted) => break StopReason::Exhausted,
                Err(e) => {
                    warn!("capture stopped: {e}");
                    break StopReason::ReadFailed(e);
                }
            }
        };

        info!(
            "capture finished ({:?}): {} frames, {} dropped, {} without artifact, {} artifacts",
            reason, self.stats.frames, self.stats.dropped, self.stats.misses, self.stats.artifacts
        );
        info!(
            "history: {} {}, {} {}",
            self.history.count_of(ArtifactKind::Http),
            ArtifactKind::Http,
            self.history.count_of(ArtifactKind::Dns),
            ArtifactKind::Dns
        );

        Finished {
            history: self.history,
            stats: self.stats,
            reason,
        }
    }
}
