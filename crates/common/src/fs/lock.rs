//! Per-volume reader/writer locks.
//!
//! Operations lock every volume they touch. Locks are always taken in
//! registry order and each volume at most once, so two operations spanning
//! the same pair of volumes cannot deadlock. Guards are not reentrant:
//! code running under a guard must call the unlocked helpers.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
pub struct LockTable {
    locks: Vec<RwLock<()>>,
}

/// Held read locks; released on drop.
#[must_use = "locks are released as soon as the guard is dropped"]
pub struct ReadGuard<'a> {
    _guards: Vec<RwLockReadGuard<'a, ()>>,
}

/// Held write locks; released on drop.
#[must_use = "locks are released as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    _guards: Vec<RwLockWriteGuard<'a, ()>>,
}

fn ordered(volumes: &[usize]) -> Vec<usize> {
    let mut indices = volumes.to_vec();
    indices.sort_unstable();
    indices.dedup();
    indices
}

impl LockTable {
    pub fn new(volumes: usize) -> Self {
        Self {
            locks: (0..volumes).map(|_| RwLock::new(())).collect(),
        }
    }

    pub fn read(&self, volumes: &[usize]) -> ReadGuard<'_> {
        ReadGuard {
            _guards: ordered(volumes)
                .into_iter()
                .filter_map(|i| self.locks.get(i))
                .map(|lock| lock.read())
                .collect(),
        }
    }

    pub fn write(&self, volumes: &[usize]) -> WriteGuard<'_> {
        WriteGuard {
            _guards: ordered(volumes)
                .into_iter()
                .filter_map(|i| self.locks.get(i))
                .map(|lock| lock.write())
                .collect(),
        }
    }

    #[cfg(test)]
    fn is_locked(&self, volume: usize) -> bool {
        self.locks[volume].is_locked()
    }
}
