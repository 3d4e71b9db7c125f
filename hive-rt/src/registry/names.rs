// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::error::RegistryError;
use crate::util::Handle;

/// Sorted `(name, handle)` alias array, looked up by binary search.
///
/// Kept separate from the slot table so name lookups never contend with
/// the grab/retire hot path.
#[derive(Default)]
pub(crate) struct NameTable {
    entries: Vec<(Box<str>, Handle)>,
}

impl NameTable {
    /// Bind `name` to `handle`, keeping the array sorted.
    pub(crate) fn bind(&mut self, name: &str, handle: Handle) -> Result<(), RegistryError> {
        match self.entries.binary_search_by(|(n, _)| n.as_ref().cmp(name)) {
            Ok(_) => Err(RegistryError::NameTaken(name.to_string())),
            Err(pos) => {
                self.entries.insert(pos, (name.into(), handle));
                Ok(())
            }
        }
    }

    /// Resolve a name to its handle.
    pub(crate) fn find(&self, name: &str) -> Option<Handle> {
        self.entries
            .binary_search_by(|(n, _)| n.as_ref().cmp(name))
            .ok()
            .and_then(|pos| self.entries.get(pos))
            .map(|(_, handle)| *handle)
    }

    /// Drop every alias bound to `handle` (context retirement).
    pub(crate) fn unbind_handle(&mut self, handle: Handle) {
        self.entries.retain(|(_, h)| *h != handle);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
