// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::RwLock;

// Layer 3: Internal module imports
use super::error::RegistryError;
use super::names::NameTable;
use crate::service::ServiceContext;
use crate::util::handle::LOCAL_MASK;
use crate::util::Handle;

/// Initial slot count; doubled on demand up to the full 24-bit space.
const INITIAL_SLOTS: usize = 4;

struct SlotTable {
    /// Power-of-two slot array indexed by `local_id & (len - 1)`.
    slots: Vec<Option<Arc<ServiceContext>>>,
    /// Next local id to try. Monotonic over the 24-bit space, so a retired
    /// handle value is not reissued before a full wraparound. That keeps a
    /// sender holding a stale handle from reaching an unrelated newcomer.
    next_local: u32,
}

/// Node-wide map from handles to live service contexts.
///
/// `grab` is the hot path: every send resolves its destination here, so the
/// slot table sits behind a read/write lock that lets lookups run in
/// parallel and serializes only the rare register/retire. The alias table
/// has its own lock for the same reason.
pub struct Registry {
    node_id: u8,
    slots: RwLock<SlotTable>,
    names: RwLock<NameTable>,
}

impl Registry {
    pub(crate) fn new(node_id: u8) -> Self {
        Registry {
            node_id,
            slots: RwLock::new(SlotTable {
                slots: vec![None; INITIAL_SLOTS],
                next_local: 1,
            }),
            names: RwLock::new(NameTable::default()),
        }
    }

    /// Insert a fresh context and assign it a unique handle.
    ///
    /// The context and its mailbox learn the handle before the slot is
    /// filled, all under the write lock, so no lookup can observe a
    /// half-addressed context. Registration does not add a logical
    /// reference beyond the slot's own clone; the caller keeps the launch
    /// reference it already holds.
    pub(crate) fn register(&self, ctx: &Arc<ServiceContext>) -> Result<Handle, RegistryError> {
        let mut table = self.slots.write();
        loop {
            let size = table.slots.len() as u32;
            for probe in 0..size {
                let mut local = (table.next_local + probe) & LOCAL_MASK;
                if local == 0 {
                    // Local id 0 is the reserved null handle.
                    local = 1;
                }
                let index = (local & (size - 1)) as usize;
                if table.slots.get(index).is_some_and(|s| s.is_none()) {
                    let handle = Handle::new(self.node_id, local);
                    ctx.bind_handle(handle);
                    ctx.mailbox().bind_owner(handle);
                    table.slots[index] = Some(Arc::clone(ctx));
                    table.next_local = (local + 1) & LOCAL_MASK;
                    return Ok(handle);
                }
            }

            // Every slot is occupied: double the table, or give up once
            // the whole 24-bit space is live.
            let new_size = (size as usize) * 2;
            if new_size > (LOCAL_MASK as usize) + 1 {
                return Err(RegistryError::OutOfHandles);
            }
            let old = std::mem::replace(&mut table.slots, vec![None; new_size]);
            for ctx in old.into_iter().flatten() {
                let index = (ctx.handle().local() as usize) & (new_size - 1);
                table.slots[index] = Some(ctx);
            }
        }
    }

    /// Resolve a handle to its live context, taking a shared reference.
    ///
    /// Returns `None` for unknown and retired handles alike.
    pub fn grab(&self, handle: Handle) -> Option<Arc<ServiceContext>> {
        if handle.is_zero() {
            return None;
        }
        let table = self.slots.read();
        let index = (handle.local() as usize) & (table.slots.len() - 1);
        let ctx = table.slots.get(index)?.as_ref()?;
        (ctx.handle() == handle).then(|| Arc::clone(ctx))
    }

    /// Remove the handle→context mapping and drop the registry's reference.
    ///
    /// After this returns, `grab` no longer resolves the handle even while
    /// other holders keep the context alive. Any aliases bound to the
    /// handle disappear with it.
    pub(crate) fn retire(&self, handle: Handle) -> bool {
        let removed = {
            let mut table = self.slots.write();
            let index = (handle.local() as usize) & (table.slots.len() - 1);
            match table.slots.get_mut(index) {
                Some(slot) if slot.as_ref().is_some_and(|c| c.handle() == handle) => slot.take(),
                _ => None,
            }
        };
        match removed {
            Some(ctx) => {
                self.names.write().unbind_handle(handle);
                // The registry reference drops here, outside both locks;
                // this may be the final reference and run teardown.
                drop(ctx);
                true
            }
            None => false,
        }
    }

    /// Retire every registered handle (shutdown). Loops until the table is
    /// observed empty so contexts launched mid-shutdown are caught too.
    pub(crate) fn retire_all(&self) {
        loop {
            let live: Vec<Handle> = {
                let table = self.slots.read();
                table
                    .slots
                    .iter()
                    .flatten()
                    .map(|ctx| ctx.handle())
                    .collect()
            };
            if live.is_empty() {
                return;
            }
            for handle in live {
                self.retire(handle);
            }
        }
    }

    /// Bind a `.name` alias to a handle.
    pub fn bind_name(&self, name: &str, handle: Handle) -> Result<(), RegistryError> {
        self.names.write().bind(name, handle)
    }

    /// Resolve a `.name` alias.
    pub fn find_name(&self, name: &str) -> Option<Handle> {
        self.names.read().find(name)
    }

    /// Number of live contexts (test and diagnostic use).
    pub fn live_count(&self) -> usize {
        self.slots.read().slots.iter().flatten().count()
    }
}
