// library.rs — Policy Library Store.
//
// `PolicyLibrary` is the plain map; `PolicyLibraryHandle` ("Global policy
// library" redesign) wraps it in a reader-writer lock so the engine's pure
// evaluation functions always take an explicit snapshot parameter rather
// than reaching for a module-level global. Readers run concurrently;
// mutation (patch/rollback/reload) takes the write guard for the whole
// operation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ids::ProfileName;
use crate::profile::PolicyProfile;

pub type PolicyLibrary = HashMap<ProfileName, PolicyProfile>;

/// A shared, lockable handle to the policy library.
///
/// Cloning a handle is cheap (it's an `Arc`); all clones see the same
/// underlying library.
#[derive(Clone, Default)]
pub struct PolicyLibraryHandle {
    inner: Arc<RwLock<PolicyLibrary>>,
}

impl PolicyLibraryHandle {
    pub fn new(library: PolicyLibrary) -> Self {
        Self {
            inner: Arc::new(RwLock::new(library)),
        }
    }

    /// Deep-copy the current library for a reader. Readers never see a
    /// torn/partial write — `replace` swaps one profile entry at a time
    /// under the write lock.
    pub fn snapshot(&self) -> PolicyLibrary {
        self.inner
            .read()
            .expect("policy library lock poisoned")
            .clone()
    }

    /// Look up a single profile by name without taking a full snapshot.
    pub fn get(&self, name: &ProfileName) -> Option<PolicyProfile> {
        self.inner
            .read()
            .expect("policy library lock poisoned")
            .get(name)
            .cloned()
    }

    /// Replace (or insert) one profile entry. This is the sole mutation
    /// primitive; higher-level patch/rollback logic builds `next_profile`
    /// and calls this once the write is ready to commit.
    pub fn replace(&self, profile: PolicyProfile) {
        let mut guard = self.inner.write().expect("policy library lock poisoned");
        guard.insert(profile.name.clone(), profile);
    }

    /// Acquire the write guard directly, for callers (the patch service)
    /// that need hash-check-then-write atomicity across several steps.
    pub fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, PolicyLibrary> {
        self.inner.write().expect("policy library lock poisoned")
    }
}
