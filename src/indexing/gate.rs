use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Reader-writer discipline between document adds and commits.
///
/// Any number of adds may hold the shared side at once. A commit (or a
/// streaming add-batch-then-commit) holds the exclusive side, so no add is
/// in flight while it runs. Blocked threads park instead of spinning.
#[derive(Default)]
pub struct CommitGate {
    lock: RwLock<()>,
    add_windows: AtomicU64,
    commit_windows: AtomicU64,
}

impl CommitGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_window(&self) -> RwLockReadGuard<'_, ()> {
        let guard = self.lock.read();
        self.add_windows.fetch_add(1, Ordering::Relaxed);
        guard
    }

    pub fn commit_window(&self) -> RwLockWriteGuard<'_, ()> {
        let guard = self.lock.write();
        self.commit_windows.fetch_add(1, Ordering::Relaxed);
        guard
    }

    /// Run `f` with every add excluded.
    pub fn exclusive<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.commit_window();
        f()
    }

    pub fn add_windows_entered(&self) -> u64 {
        self.add_windows.load(Ordering::Relaxed)
    }

    pub fn commit_windows_entered(&self) -> u64 {
        self.commit_windows.load(Ordering::Relaxed)
    }
}
