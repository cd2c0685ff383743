//! The C-callable ABI surface (§6): a versioned struct of function pointers.
//! This crate defines and unit-tests the table's layout and version
//! negotiation; it does not implement dynamic-library loading or plugin
//! discovery, both explicitly out of scope (§1, §6).

use crate::error::AbiMismatch;
use loom_core::Value;
use std::os::raw::c_char;

/// Bumped whenever a breaking change is made to [`AbiTable`]'s layout.
pub const ABI_VERSION: u32 = 1;

/// A plugin's view of the host: one C-callable function pointer per
/// collaborator surface named in §6 (allocation, registration, value ops,
/// variable ref/release, wire/mesh construction, composition, enum/object
/// lookup, string interning). Fields are raw function pointers rather than
/// closures so the struct has a stable, FFI-safe `repr(C)` layout.
#[repr(C)]
pub struct AbiTable {
    pub abi_version: u32,

    pub value_clone: unsafe extern "C" fn(*const Value) -> Value,
    pub value_destroy: unsafe extern "C" fn(*mut Value),
    pub value_equals: unsafe extern "C" fn(*const Value, *const Value) -> bool,
    pub value_hash: unsafe extern "C" fn(*const Value) -> u128,

    pub variable_reference: unsafe extern "C" fn(*const c_char) -> *mut c_char,
    pub variable_release: unsafe extern "C" fn(*mut c_char),

    pub wire_create: unsafe extern "C" fn(*const c_char) -> *mut c_char,
    pub wire_destroy: unsafe extern "C" fn(*mut c_char),

    pub mesh_create: unsafe extern "C" fn() -> *mut c_char,
    pub mesh_schedule: unsafe extern "C" fn(*mut c_char, *mut c_char) -> bool,
    pub mesh_tick: unsafe extern "C" fn(*mut c_char) -> bool,
    pub mesh_terminate: unsafe extern "C" fn(*mut c_char),

    pub intern_string: unsafe extern "C" fn(*const c_char) -> u32,
    pub lookup_interned: unsafe extern "C" fn(u32) -> *const c_char,
}

/// Verifies a plugin-requested ABI version against the host's
/// [`ABI_VERSION`] (§6: "a plugin requesting a mismatched ABI is rejected").
pub fn negotiate(requested: u32) -> Result<u32, AbiMismatch> {
    if requested == ABI_VERSION {
        Ok(ABI_VERSION)
    } else {
        Err(AbiMismatch { requested, supported: ABI_VERSION })
    }
}

/// Process-wide CRC32 → string table for compressed diagnostic strings
/// (§6). Absent entries decode to an empty string rather than erroring.
#[derive(Default)]
pub struct StringTable {
    entries: std::collections::HashMap<u32, String>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, crc32: u32, value: impl Into<String>) {
        self.entries.insert(crc32, value.into());
    }

    pub fn lookup(&self, crc32: u32) -> &str {
        self.entries.get(&crc32).map(String::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_version_negotiates_successfully() {
        assert_eq!(negotiate(ABI_VERSION), Ok(ABI_VERSION));
    }

    #[test]
    fn mismatched_version_is_rejected() {
        let err = negotiate(ABI_VERSION + 1).unwrap_err();
        assert_eq!(err.requested, ABI_VERSION + 1);
        assert_eq!(err.supported, ABI_VERSION);
    }

    #[test]
    fn string_table_defaults_missing_entries_to_empty() {
        let mut table = StringTable::new();
        table.insert(42, "hello");
        assert_eq!(table.lookup(42), "hello");
        assert_eq!(table.lookup(7), "");
    }
}
