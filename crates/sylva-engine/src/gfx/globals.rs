//! Ordering of global uniform values within one render pass.
//!
//! Every update appends a snapshot of the whole block; binds refer to a
//! snapshot by index, which becomes a dynamic offset into the ring once all
//! snapshots are uploaded.

use anyhow::{ensure, Result};

use crate::render::{GlobalUniforms, GLOBALS_SIZE};

/// Globals bound at `slot`, reading snapshot `snapshot`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct GlobalsBind {
    pub slot: u32,
    pub snapshot: usize,
}

pub(crate) struct GlobalTimeline {
    /// Never empty; the last entry holds the current values.
    snapshots: Vec<GlobalUniforms>,
    bound_slot: Option<u32>,
}

impl GlobalTimeline {
    pub fn new(initial: GlobalUniforms) -> Self {
        Self {
            snapshots: vec![initial],
            bound_slot: None,
        }
    }

    pub fn current(&self) -> usize {
        self.snapshots.len() - 1
    }

    pub fn snapshots(&self) -> &[GlobalUniforms] {
        &self.snapshots
    }

    pub fn latest(&self) -> GlobalUniforms {
        self.snapshots[self.current()]
    }

    /// Binds the current values at `slot`; later updates rebind there.
    pub fn bind(&mut self, slot: u32) -> GlobalsBind {
        self.bound_slot = Some(slot);
        GlobalsBind {
            slot,
            snapshot: self.current(),
        }
    }

    /// Another resource set took `slot`.
    pub fn displace(&mut self, slot: u32) {
        if self.bound_slot == Some(slot) {
            self.bound_slot = None;
        }
    }

    /// Writes `bytes` at `offset` into a new snapshot. Returns the rebind the
    /// pass needs when globals are currently bound.
    pub fn update(&mut self, offset: u64, bytes: &[u8]) -> Result<Option<GlobalsBind>> {
        let start = offset as usize;
        let end = start + bytes.len();
        ensure!(
            end <= GLOBALS_SIZE as usize,
            "uniform write {start}..{end} exceeds the {GLOBALS_SIZE}-byte global block"
        );

        let mut next = self.latest();
        bytemuck::bytes_of_mut(&mut next)[start..end].copy_from_slice(bytes);
        self.snapshots.push(next);

        Ok(self.bound_slot.map(|slot| GlobalsBind {
            slot,
            snapshot: self.current(),
        }))
    }

    /// Ring contents: snapshot `i` at byte `i * slot_size`.
    pub fn pack(&self, slot_size: u64) -> Vec<u8> {
        let slot_size = slot_size as usize;
        let mut bytes = vec![0u8; slot_size * self.snapshots.len()];
        for (i, snapshot) in self.snapshots.iter().enumerate() {
            let start = i * slot_size;
            bytes[start..start + GLOBALS_SIZE as usize].copy_from_slice(bytemuck::bytes_of(snapshot));
        }
        bytes
    }
}

pub(crate) fn dynamic_offset(snapshot: usize, slot_size: u64) -> u32 {
    (snapshot as u64 * slot_size) as u32
}
