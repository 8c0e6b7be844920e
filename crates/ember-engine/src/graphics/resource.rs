use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Opaque identity of a GPU-visible resource.
///
/// Ids are slot indices tagged with a generation. A slot is only recycled after the
/// resource living in it was destroyed, and recycling bumps the generation, so an id is
/// never reused while its resource is alive.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ResourceId {
    index: u32,
    generation: u32,
}

impl ResourceId {
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Kind of object a resource slot holds.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Buffer,
    Texture,
    Shader,
    BlendState,
    RenderTarget,
}

/// Resource lifecycle.
///
/// `Uninitialized` until the executor runs the init command, `Initialized` once a native
/// handle is bound, `Destroyed` after the delete command ran (also reported for stale ids).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceState {
    Uninitialized,
    Initialized,
    Destroyed,
}

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident => $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
        pub struct $name(ResourceId);

        impl $name {
            pub const KIND: ResourceKind = $kind;

            #[inline]
            pub(crate) const fn from_resource(id: ResourceId) -> Self {
                Self(id)
            }

            #[inline]
            pub const fn resource(self) -> ResourceId {
                self.0
            }
        }

        impl From<$name> for ResourceId {
            #[inline]
            fn from(id: $name) -> ResourceId {
                id.0
            }
        }
    };
}

typed_id!(
    /// Handle to a vertex/index/constant buffer.
    BufferId => ResourceKind::Buffer
);
typed_id!(
    /// Handle to a texture (sampled or render-target capable).
    TextureId => ResourceKind::Texture
);
typed_id!(
    /// Handle to a vertex + fragment shader pair.
    ShaderId => ResourceKind::Shader
);
typed_id!(
    /// Handle to a blend state object.
    BlendStateId => ResourceKind::BlendState
);
typed_id!(
    /// Handle to a presentable render target description.
    RenderTargetId => ResourceKind::RenderTarget
);

#[derive(Debug)]
struct Slot {
    generation: u32,
    kind: ResourceKind,
    state: ResourceState,
}

#[derive(Debug, Default)]
struct Slots {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

/// Slot table shared between the producer (allocates ids) and the executor (realizes and
/// destroys them).
///
/// Wrap in an `Arc` when producer and consumer live on different threads. Every method
/// holds the lock only for the duration of the call.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    inner: Mutex<Slots>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        // A panic while holding the lock cannot leave a slot half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves a fresh id in the `Uninitialized` state.
    pub fn allocate(&self, kind: ResourceKind) -> ResourceId {
        let mut inner = self.lock();

        if let Some(index) = inner.free.pop() {
            let slot = &mut inner.slots[index as usize];
            slot.kind = kind;
            slot.state = ResourceState::Uninitialized;
            return ResourceId { index, generation: slot.generation };
        }

        let index = inner.slots.len() as u32;
        inner.slots.push(Slot {
            generation: 0,
            kind,
            state: ResourceState::Uninitialized,
        });
        ResourceId { index, generation: 0 }
    }

    /// Returns the lifecycle state of `id`.
    ///
    /// Ids whose slot has since been recycled report `Destroyed`. Returns `None` for ids
    /// this registry never handed out.
    pub fn state(&self, id: ResourceId) -> Option<ResourceState> {
        let inner = self.lock();
        let slot = inner.slots.get(id.index as usize)?;
        if slot.generation == id.generation {
            Some(slot.state)
        } else {
            Some(ResourceState::Destroyed)
        }
    }

    /// Returns the kind of a live resource.
    pub fn kind(&self, id: ResourceId) -> Option<ResourceKind> {
        let inner = self.lock();
        inner
            .slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.state != ResourceState::Destroyed)
            .map(|slot| slot.kind)
    }

    /// True while `id` has been allocated and not yet destroyed.
    pub fn is_alive(&self, id: ResourceId) -> bool {
        matches!(
            self.state(id),
            Some(ResourceState::Uninitialized | ResourceState::Initialized)
        )
    }

    /// Marks `id` as realized by the executor. Returns `false` for stale ids.
    pub fn mark_initialized(&self, id: ResourceId) -> bool {
        let mut inner = self.lock();
        match inner.slots.get_mut(id.index as usize) {
            Some(slot)
                if slot.generation == id.generation && slot.state != ResourceState::Destroyed =>
            {
                slot.state = ResourceState::Initialized;
                true
            }
            _ => false,
        }
    }

    /// Destroys `id` and recycles its slot. Returns `false` for stale ids.
    pub fn release(&self, id: ResourceId) -> bool {
        let mut inner = self.lock();
        let Some(slot) = inner.slots.get_mut(id.index as usize) else {
            return false;
        };
        if slot.generation != id.generation || slot.state == ResourceState::Destroyed {
            return false;
        }

        slot.state = ResourceState::Destroyed;
        slot.generation = slot.generation.wrapping_add(1);
        inner.free.push(id.index);
        true
    }

    /// Number of resources currently allocated and not destroyed.
    pub fn live_count(&self) -> usize {
        let inner = self.lock();
        inner.slots.len() - inner.free.len()
    }
}

/// Executor-side base shared by every resource kind: identity, lifecycle, native handle.
#[derive(Debug)]
pub struct RenderResource<H> {
    id: ResourceId,
    state: ResourceState,
    native: Option<H>,
}

impl<H> RenderResource<H> {
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            state: ResourceState::Uninitialized,
            native: None,
        }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> ResourceState {
        self.state
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state == ResourceState::Initialized
    }

    #[inline]
    pub fn native(&self) -> Option<&H> {
        self.native.as_ref()
    }

    #[inline]
    pub fn native_mut(&mut self) -> Option<&mut H> {
        self.native.as_mut()
    }

    /// Binds (or replaces) the backend handle and marks the resource initialized.
    pub fn bind(&mut self, native: H) -> Option<H> {
        self.state = ResourceState::Initialized;
        self.native.replace(native)
    }

    /// Drops the binding and marks the resource destroyed, returning the handle.
    pub fn release(&mut self) -> Option<H> {
        self.state = ResourceState::Destroyed;
        self.native.take()
    }
}

/// Dense executor-side table of realized resources keyed by [`ResourceId`].
///
/// Lookups compare generations, so a stale id never resolves to a newer resource that
/// happens to reuse the same slot.
#[derive(Debug)]
pub struct ResourceTable<T> {
    entries: Vec<Option<(u32, T)>>,
    len: usize,
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            len: 0,
        }
    }
}

impl<T> ResourceTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `id`, replacing whatever occupied the slot.
    pub fn insert(&mut self, id: ResourceId, value: T) -> Option<T> {
        let index = id.index as usize;
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, || None);
        }

        let previous = self.entries[index].replace((id.generation, value));
        match previous {
            Some((generation, old)) if generation == id.generation => Some(old),
            Some(_) => None,
            None => {
                self.len += 1;
                None
            }
        }
    }

    pub fn get(&self, id: ResourceId) -> Option<&T> {
        match self.entries.get(id.index as usize) {
            Some(Some((generation, value))) if *generation == id.generation => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut T> {
        match self.entries.get_mut(id.index as usize) {
            Some(Some((generation, value))) if *generation == id.generation => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn contains(&self, id: ResourceId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: ResourceId) -> Option<T> {
        let entry = self.entries.get_mut(id.index as usize)?;
        match entry {
            Some((generation, _)) if *generation == id.generation => {
                self.len -= 1;
                entry.take().map(|(_, value)| value)
            }
            _ => None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_starts_uninitialized() {
        let reg = ResourceRegistry::new();
        let id = reg.allocate(ResourceKind::Buffer);
        assert_eq!(reg.state(id), Some(ResourceState::Uninitialized));
        assert_eq!(reg.kind(id), Some(ResourceKind::Buffer));
        assert!(reg.is_alive(id));
    }

    #[test]
    fn lifecycle_transitions() {
        let reg = ResourceRegistry::new();
        let id = reg.allocate(ResourceKind::Texture);

        assert!(reg.mark_initialized(id));
        assert_eq!(reg.state(id), Some(ResourceState::Initialized));

        assert!(reg.release(id));
        assert_eq!(reg.state(id), Some(ResourceState::Destroyed));
        assert!(!reg.is_alive(id));

        // Double release and late init are stale operations.
        assert!(!reg.release(id));
        assert!(!reg.mark_initialized(id));
    }

    #[test]
    fn recycled_slot_gets_new_generation() {
        let reg = ResourceRegistry::new();
        let a = reg.allocate(ResourceKind::Buffer);
        reg.release(a);

        let b = reg.allocate(ResourceKind::Shader);
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert_eq!(reg.state(a), Some(ResourceState::Destroyed));
        assert_eq!(reg.state(b), Some(ResourceState::Uninitialized));
        assert_eq!(reg.kind(b), Some(ResourceKind::Shader));
    }

    #[test]
    fn live_ids_are_never_shared() {
        let reg = ResourceRegistry::new();
        let ids: Vec<_> = (0..16).map(|_| reg.allocate(ResourceKind::Buffer)).collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(reg.live_count(), 16);
    }

    #[test]
    fn unknown_id_has_no_state() {
        let a = ResourceRegistry::new();
        let b = ResourceRegistry::new();
        b.allocate(ResourceKind::Buffer);
        let foreign = b.allocate(ResourceKind::Buffer);
        assert_eq!(a.state(foreign), None);
    }

    #[test]
    fn render_resource_bind_and_release() {
        let reg = ResourceRegistry::new();
        let mut res: RenderResource<u64> = RenderResource::new(reg.allocate(ResourceKind::Buffer));
        assert_eq!(res.state(), ResourceState::Uninitialized);
        assert!(res.native().is_none());

        res.bind(7);
        assert!(res.is_initialized());
        assert_eq!(res.native(), Some(&7));

        assert_eq!(res.release(), Some(7));
        assert_eq!(res.state(), ResourceState::Destroyed);
    }

    #[test]
    fn table_rejects_stale_generation() {
        let reg = ResourceRegistry::new();
        let old = reg.allocate(ResourceKind::Buffer);
        let mut table = ResourceTable::new();
        table.insert(old, "old");

        reg.release(old);
        table.remove(old);
        let new = reg.allocate(ResourceKind::Buffer);
        table.insert(new, "new");

        assert_eq!(table.get(old), None);
        assert_eq!(table.get(new), Some(&"new"));
        assert_eq!(table.len(), 1);
    }
}
