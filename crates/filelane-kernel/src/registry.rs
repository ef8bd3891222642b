//! Handle registry.
//!
//! One slot per active key, holding the key's lane and its open handle (if
//! any). Keeping both in the same `DashMap` entry makes lane creation,
//! handle registration, and lane retirement atomic with respect to each
//! other: they all take the same shard lock.
//!
//! Lookups are plain reads and may come from any thread. Registration and
//! unregistration only happen on the owning lane's worker.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use filelane_types::{FileKey, FilePath};
use tracing::{trace, warn};

use crate::handle::FileHandle;
use crate::lane::LaneHandle;

pub(crate) struct Slot {
    /// First spelling seen for the key; used for internal operations.
    pub path: FilePath,
    pub lane: LaneHandle,
    pub handle: Option<FileHandle>,
}

impl Slot {
    pub(crate) fn new(path: FilePath, lane: LaneHandle) -> Self {
        Self {
            path,
            lane,
            handle: None,
        }
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    slots: DashMap<FileKey, Slot>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lookup(&self, key: &FileKey) -> Option<FileHandle> {
        self.slots.get(key).and_then(|slot| slot.handle.clone())
    }

    pub(crate) fn register(&self, key: &FileKey, handle: FileHandle) {
        match self.slots.get_mut(key) {
            Some(mut slot) => {
                trace!(key = %key, "handle registered");
                slot.handle = Some(handle);
            }
            None => warn!(key = %key, "register without a lane; handle not recorded"),
        }
    }

    pub(crate) fn unregister(&self, key: &FileKey) -> Option<FileHandle> {
        let handle = self.slots.get_mut(key).and_then(|mut slot| slot.handle.take());
        if handle.is_some() {
            trace!(key = %key, "handle unregistered");
        }
        handle
    }

    pub(crate) fn entry(&self, key: FileKey) -> Entry<'_, FileKey, Slot> {
        self.slots.entry(key)
    }

    pub(crate) fn remove_if(
        &self,
        key: &FileKey,
        f: impl FnOnce(&FileKey, &Slot) -> bool,
    ) -> Option<(FileKey, Slot)> {
        self.slots.remove_if(key, f)
    }

    pub(crate) fn open_handles(&self) -> Vec<FileHandle> {
        self.slots
            .iter()
            .filter_map(|slot| slot.handle.clone())
            .collect()
    }

    /// Keys with a lane, with the path to address them by.
    pub(crate) fn lanes(&self) -> Vec<(FileKey, FilePath)> {
        self.slots
            .iter()
            .map(|slot| (slot.key().clone(), slot.path.clone()))
            .collect()
    }

    pub(crate) fn lane_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.handle.is_some()).count()
    }

    pub(crate) fn pending_ops(&self) -> usize {
        self.slots.iter().map(|slot| slot.lane.pending()).sum()
    }
}
