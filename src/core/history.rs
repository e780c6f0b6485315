use std::net::Ipv4Addr;

use chrono::Local;

use crate::core::models::{Artifact, ArtifactKind, Extraction};

/// Append-only log of extracted artifacts, in frame arrival order.
///
/// Owned by the capture loop while running, then handed to the report writer.
/// Unbounded: it lives as long as the capture session.
#[derive(Debug, Default, Clone)]
pub struct HistoryStore {
    entries: Vec<Artifact>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps the artifact with the current local time and appends it.
    pub fn record(&mut self, src_ip: Ipv4Addr, text: String, kind: ArtifactKind) -> &Artifact {
        self.push(Artifact {
            timestamp: Local::now(),
            src_ip,
            text,
            kind,
        })
    }

    pub fn record_extraction(&mut self, extraction: Extraction) -> &Artifact {
        self.record(extraction.src_ip, extraction.text, extraction.kind)
    }

    pub fn push(&mut self, artifact: Artifact) -> &Artifact {
        self.entries.push(artifact);
        &self.entries[self.entries.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Artifact> {
        self.entries.iter()
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.entries
    }

    pub fn count_of(&self, kind: ArtifactKind) -> usize {
        self.entries.iter().filter(|a| a.kind == kind).count()
    }
}

impl<'a> IntoIterator for &'a HistoryStore {
    type Item = &'a Artifact;
    type IntoIter = std::slice::Iter<'a, Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
