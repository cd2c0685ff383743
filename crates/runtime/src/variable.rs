//! Variable cells (§4.E): the refcounted storage behind a name in a wire's or
//! mesh's scope.

use loom_core::Value;
use std::sync::Arc;
use std::sync::Mutex;

pub const REF_COUNTED: u8 = 1 << 0;
pub const EXTERNAL: u8 = 1 << 1;
pub const EXPOSED: u8 = 1 << 2;

/// A named, refcounted cell. `Wire::variables` and `Mesh::variables` are both
/// `IndexMap<String, Cell>` — insertion order is preserved because several
/// diagnostics (dangling-variable reports at cleanup) want it.
#[derive(Debug, Clone)]
pub struct Cell {
    pub value: Value,
    pub refcount: u32,
    pub flags: u8,
}

impl Cell {
    /// A freshly created cell, per `referenceVariable`'s "create" path:
    /// `None`, refcount 0, until the first reference bumps it to 1.
    pub fn new_uninitialized() -> Self {
        Cell { value: Value::None, refcount: 0, flags: 0 }
    }

    pub fn is_exposed(&self) -> bool {
        self.flags & EXPOSED != 0
    }

    pub fn set_exposed(&mut self) {
        self.flags |= EXPOSED;
    }
}

/// A borrowed cell whose lifetime is owned outside the runtime (§3, §4.E):
/// "never refcounted or destroyed by the core." The embedder retains its own
/// `Arc`/`Mutex` and hands the runtime a clone of the handle.
#[derive(Clone)]
pub struct ExternalCell(pub Arc<Mutex<Value>>);

impl ExternalCell {
    pub fn new(value: Value) -> Self {
        ExternalCell(Arc::new(Mutex::new(value)))
    }

    pub fn get(&self) -> Value {
        self.0.lock().expect("external cell mutex poisoned").clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.lock().expect("external cell mutex poisoned") = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cell_is_none_with_zero_refcount() {
        let c = Cell::new_uninitialized();
        assert!(matches!(c.value, Value::None));
        assert_eq!(c.refcount, 0);
        assert!(!c.is_exposed());
    }

    #[test]
    fn external_cell_is_shared_not_cloned() {
        let ext = ExternalCell::new(Value::Int(1));
        let alias = ext.clone();
        alias.set(Value::Int(2));
        assert_eq!(ext.get(), Value::Int(2));
    }
}
