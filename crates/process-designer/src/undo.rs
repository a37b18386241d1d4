//! Undo/redo history
//!
//! The session records the whole graph after every committed edit. Each
//! record is the zstd-compressed JSON of the graph, so a long editing
//! session costs little memory and restoring never depends on replaying
//! edits.

use std::collections::VecDeque;

use crate::error::{DesignerError, Result};
use crate::types::ProcessGraph;

const COMPRESSION_LEVEL: i32 = 3;

/// One compressed graph state
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot(Vec<u8>);

impl Snapshot {
    fn capture(graph: &ProcessGraph) -> Result<Self> {
        let json = serde_json::to_vec(graph)?;
        zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)
            .map(Snapshot)
            .map_err(|e| DesignerError::Compression(e.to_string()))
    }

    fn restore(&self) -> Result<ProcessGraph> {
        let json = zstd::decode_all(self.0.as_slice())
            .map_err(|e| DesignerError::Compression(e.to_string()))?;
        Ok(serde_json::from_slice(&json)?)
    }
}

/// Bounded undo/redo history of graph snapshots
///
/// `present` is the state the session currently shows. Undo moves it onto
/// `future`, redo moves it back onto `past`. The limit counts every kept
/// snapshot including the present one.
#[derive(Debug)]
pub struct UndoStack {
    past: VecDeque<Snapshot>,
    present: Option<Snapshot>,
    future: Vec<Snapshot>,
    limit: usize,
}

impl UndoStack {
    /// Create a history that keeps at most `limit` snapshots (minimum 1)
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            present: None,
            future: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record `graph` as the new present state
    ///
    /// Anything that could have been redone is dropped.
    pub fn push(&mut self, graph: &ProcessGraph) -> Result<()> {
        let snapshot = Snapshot::capture(graph)?;

        self.future.clear();
        if let Some(previous) = self.present.replace(snapshot) {
            self.past.push_back(previous);
        }
        while self.len() > self.limit {
            self.past.pop_front();
        }
        Ok(())
    }

    /// Step back; None when there is nothing older
    pub fn undo(&mut self) -> Option<Result<ProcessGraph>> {
        let older = self.past.pop_back()?;
        let restored = older.restore();
        if let Some(newer) = self.present.replace(older) {
            self.future.push(newer);
        }
        Some(restored)
    }

    /// Step forward again after an undo
    pub fn redo(&mut self) -> Option<Result<ProcessGraph>> {
        let newer = self.future.pop()?;
        let restored = newer.restore();
        if let Some(older) = self.present.replace(newer) {
            self.past.push_back(older);
        }
        Some(restored)
    }

    /// Decompress the present state
    pub fn current(&self) -> Option<Result<ProcessGraph>> {
        self.present.as_ref().map(Snapshot::restore)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of kept snapshots
    pub fn len(&self) -> usize {
        self.past.len() + self.future.len() + usize::from(self.present.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_none()
    }

    /// Forget all history and start again from `graph`
    pub fn reset(&mut self, graph: &ProcessGraph) -> Result<()> {
        let snapshot = Snapshot::capture(graph)?;
        self.past.clear();
        self.future.clear();
        self.present = Some(snapshot);
        Ok(())
    }

    /// Bytes held by all snapshots
    pub fn compressed_size(&self) -> usize {
        self.past
            .iter()
            .chain(self.present.iter())
            .chain(self.future.iter())
            .map(|s| s.0.len())
            .sum()
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(100)
    }
}
