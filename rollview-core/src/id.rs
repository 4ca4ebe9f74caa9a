//! # IDs
//! Scenes and render jobs need names that are unique for the life of the process, so that logs and
//! delivered results can say which frame they belong to. `RollID<T>` hands these out, namespaced by
//! the marker type `T`. Order of IDs is not guaranteed.

// Next available ID, per namespace.
static ID_SERVER: parking_lot::RwLock<
    std::collections::BTreeMap<std::any::TypeId, std::sync::atomic::AtomicU64>,
> = parking_lot::const_rwlock(std::collections::BTreeMap::new());

/// ID that is guaranteed unique within this execution of the program.
/// IDs with different marker types may share a value but are different types.
pub struct RollID<T: std::any::Any> {
    id: std::num::NonZeroU64,
    _phantom: std::marker::PhantomData<T>,
}
impl<T: std::any::Any> Clone for RollID<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: std::any::Any> Copy for RollID<T> {}
impl<T: std::any::Any> PartialEq for RollID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: std::any::Any> Eq for RollID<T> {}

// Safety - only a u64 is stored. A !Send or !Sync marker must not leak into the ID.
unsafe impl<T: std::any::Any> Send for RollID<T> {}
unsafe impl<T: std::any::Any> Sync for RollID<T> {}

impl<T: std::any::Any> std::hash::Hash for RollID<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: std::any::Any> RollID<T> {
    /// Get the raw numeric value of this ID.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id.get()
    }
    /// Allocate a fresh ID in this namespace.
    #[must_use]
    pub fn next() -> Self {
        let ty = std::any::TypeId::of::<T>();
        let raw = {
            let read = ID_SERVER.upgradable_read();
            if let Some(atomic) = read.get(&ty) {
                atomic.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            } else {
                // First ID of this namespace. Happens once per marker type.
                let mut write = parking_lot::RwLockUpgradableReadGuard::upgrade(read);
                write.insert(ty, 2.into());
                1
            }
        };
        // Zero is skipped on insertion. Wrapping past u64::MAX would take centuries of frames.
        let id = std::num::NonZeroU64::new(raw).unwrap_or(std::num::NonZeroU64::MIN);
        Self {
            id,
            _phantom: std::marker::PhantomData,
        }
    }
}
impl<T: std::any::Any> Default for RollID<T> {
    fn default() -> Self {
        Self::next()
    }
}
impl<T: std::any::Any> std::fmt::Display for RollID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = std::any::type_name::<T>();
        let short = name.rsplit("::").next().unwrap_or(name);
        write!(f, "{short}#{}", self.id)
    }
}
impl<T: std::any::Any> std::fmt::Debug for RollID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}
