//! The constant pool: a typed, interning table of the constants shared
//! by a class file's fields, methods, attributes and bytecode.
//!
//! Ported from the original `basic::constpool::{Item, Pool}`, extended
//! with a structural interning table (so `index()` can be used both to
//! look up an already-known index and to insert-or-find a fresh entry)
//! and with the `Dynamic` tag (17), which the original `Item` enum omits.

use crate::result::*;
use std::collections::HashMap;

/// A constant pool entry.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub enum PoolEntry {
    /// A modified-UTF-8 encoded string.
    Utf8(String),
    /// An `int`.
    Integer(i32),
    /// A `float`, compared bit-for-bit so that `NaN` interns consistently.
    Float(u32),
    /// A `long`. Takes two index slots.
    Long(i64),
    /// A `double`, compared bit-for-bit. Takes two index slots.
    Double(u64),
    /// The name of a class or the descriptor of an array type.
    /// Always refers to a `Utf8`.
    Class(u16),
    /// A `java.lang.String` object. Refers to a `Utf8`.
    String(u16),
    /// A field reference: (class, name_and_type).
    FieldRef(u16, u16),
    /// A method reference: (class, name_and_type).
    MethodRef(u16, u16),
    /// An interface method reference: (class, name_and_type).
    InterfaceMethodRef(u16, u16),
    /// A (name, descriptor) pair.
    NameAndType(u16, u16),
    /// A method handle.
    MethodHandle(ReferenceKind, u16),
    /// A method type, referring to a `Utf8` method descriptor.
    MethodType(u16),
    /// A dynamically-computed constant: (bootstrap_method, name_and_type).
    Dynamic(u16, u16),
    /// An invokedynamic call site: (bootstrap_method, name_and_type).
    InvokeDynamic(u16, u16),
    /// A module, referring to a `Utf8` module name.
    Module(u16),
    /// A package, referring to a `Utf8` package name in internal form.
    Package(u16),
}

impl PoolEntry {
    /// `true` if this entry occupies two index slots (`Long`, `Double`).
    pub fn is_double(&self) -> bool {
        matches!(self, PoolEntry::Long(_) | PoolEntry::Double(_))
    }

    pub fn tag(&self) -> u8 {
        match self {
            PoolEntry::Utf8(_) => 1,
            PoolEntry::Integer(_) => 3,
            PoolEntry::Float(_) => 4,
            PoolEntry::Long(_) => 5,
            PoolEntry::Double(_) => 6,
            PoolEntry::Class(_) => 7,
            PoolEntry::String(_) => 8,
            PoolEntry::FieldRef(..) => 9,
            PoolEntry::MethodRef(..) => 10,
            PoolEntry::InterfaceMethodRef(..) => 11,
            PoolEntry::NameAndType(..) => 12,
            PoolEntry::MethodHandle(..) => 15,
            PoolEntry::MethodType(_) => 16,
            PoolEntry::Dynamic(..) => 17,
            PoolEntry::InvokeDynamic(..) => 18,
            PoolEntry::Module(_) => 19,
            PoolEntry::Package(_) => 20,
        }
    }
}

#[derive(Eq, PartialEq, Hash, Clone, Copy, Debug)]
pub enum ReferenceKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl ReferenceKind {
    pub fn from_tag(tag: u8) -> Option<ReferenceKind> {
        use ReferenceKind::*;
        Some(match tag {
            1 => GetField,
            2 => GetStatic,
            3 => PutField,
            4 => PutStatic,
            5 => InvokeVirtual,
            6 => InvokeStatic,
            7 => InvokeSpecial,
            8 => NewInvokeSpecial,
            9 => InvokeInterface,
            _ => return None,
        })
    }

    pub fn tag(self) -> u8 {
        use ReferenceKind::*;
        match self {
            GetField => 1,
            GetStatic => 2,
            PutField => 3,
            PutStatic => 4,
            InvokeVirtual => 5,
            InvokeStatic => 6,
            InvokeSpecial => 7,
            NewInvokeSpecial => 8,
            InvokeInterface => 9,
        }
    }
}

/// The constant pool of a class file.
///
/// Entries are stored densely by index; the second slot of a `Long` or
/// `Double` is `None` ("padding"), matching the original
/// `Vec<Option<Item>>` representation, which gives O(1) access by
/// index without forcing every caller to special-case wide entries.
///
/// An interning table (`index_of`) maps a structural key back to its
/// index, so that `index()` can be used both when parsing (entries are
/// pushed in source order, duplicates kept, via `push_raw`) and when
/// building (entries are inserted-or-found, via `index`).
#[derive(Default)]
pub struct ConstantPool {
    entries: Vec<Option<PoolEntry>>,
    index_of: HashMap<PoolEntry, u16>,
}

impl ConstantPool {
    pub fn new() -> ConstantPool {
        ConstantPool {
            entries: Vec::new(),
            index_of: HashMap::new(),
        }
    }

    pub fn with_capacity(size: u16) -> ConstantPool {
        ConstantPool {
            entries: Vec::with_capacity(size as usize),
            index_of: HashMap::with_capacity(size as usize),
        }
    }

    /// The `constant_pool_count` field: one more than the highest valid
    /// index, since index 0 is always invalid and long/double entries
    /// burn an extra slot.
    pub fn encoded_length(&self) -> u16 {
        self.entries.len() as u16 + 1
    }

    /// Pushes an entry read from a source buffer, in source order,
    /// without deduplicating. Used by the parser, where later entries
    /// must be addressable by their original index even if they
    /// duplicate an earlier one.
    pub fn push_raw(&mut self, entry: Option<PoolEntry>) -> Result<u16> {
        if self.entries.len() >= u16::max_value() as usize - 1 {
            return Err(Error::CPTooLarge);
        }
        if let Some(ref e) = entry {
            // first entry wins the interning slot; re-interning a
            // structural duplicate during a later `index()` call
            // should still find the earliest occurrence.
            self.index_of.entry(e.clone()).or_insert(self.entries.len() as u16 + 1);
        }
        self.entries.push(entry);
        Ok(self.entries.len() as u16)
    }

    /// Inserts `entry`, returning its index. If a structurally equal
    /// entry already exists, its index is returned and nothing is
    /// inserted (interning).
    pub fn index(&mut self, entry: PoolEntry) -> Result<u16> {
        if let Some(&idx) = self.index_of.get(&entry) {
            return Ok(idx);
        }
        let is_double = entry.is_double();
        let idx = self.push_raw(Some(entry))?;
        if is_double {
            self.push_raw(None)?;
        }
        Ok(idx)
    }

    pub fn push_utf8(&mut self, s: impl Into<String>) -> Result<u16> {
        self.index(PoolEntry::Utf8(s.into()))
    }

    pub fn push_class(&mut self, name: impl Into<String>) -> Result<u16> {
        let name_index = self.push_utf8(name)?;
        self.index(PoolEntry::Class(name_index))
    }

    pub fn push_name_and_type(&mut self, name: u16, desc: u16) -> Result<u16> {
        self.index(PoolEntry::NameAndType(name, desc))
    }

    /// The entry at `index`, or an error if `index` is `0`, out of
    /// range, or points at the reserved second slot of a wide entry.
    pub fn entry(&self, index: u16) -> Result<&PoolEntry> {
        self.entries
            .get(index.wrapping_sub(1) as usize)
            .ok_or(Error::InvalidCPItem(index))?
            .as_ref()
            .ok_or(Error::InvalidCPItem(index))
    }

    pub fn get_utf8(&self, index: u16) -> Result<&str> {
        match self.entry(index)? {
            PoolEntry::Utf8(s) => Ok(s.as_str()),
            _ => Err(Error::InvalidCPItem(index)),
        }
    }

    pub fn get_class_name(&self, index: u16) -> Result<&str> {
        match self.entry(index)? {
            PoolEntry::Class(utf_index) => self.get_utf8(*utf_index),
            _ => Err(Error::InvalidCPItem(index)),
        }
    }

    /// Like `get_class_name`, but returns `None` for index `0`, which
    /// is how an absent `super_class` is encoded.
    pub fn get_class_name_opt(&self, index: u16) -> Result<Option<&str>> {
        if index == 0 {
            Ok(None)
        } else {
            self.get_class_name(index).map(Some)
        }
    }

    /// Iterates entries in index order, `None` slots included (the
    /// caller can skip them, but the index arithmetic is theirs to
    /// get right when they do).
    pub fn iter(&self) -> impl Iterator<Item = &Option<PoolEntry>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-interns `entry` (and, transitively, any pool entries it
    /// references) against `self`, used when merging pools across a
    /// transform. `resolve` looks up an entry from the *source* pool by
    /// index; `self` is the *target* pool being built.
    ///
    /// This is `AbstractPoolEntry.maybeClone` generalized to a full
    /// merge: the caller walks the source's entries outside-in and
    /// calls this once per entry, already having remapped any indices
    /// the entry itself refers to.
    pub fn intern_mapped(&mut self, entry: PoolEntry) -> Result<u16> {
        self.index(entry)
    }
}

/// Copies every entry of `source` into a fresh `ConstantPool`, remapping
/// indices as needed, deduplicating along the way. This implements the
/// `SHARED_POOL` construction mode: start a new pool by copying the
/// source model's pool into an interning mirror.
pub fn share_pool(source: &ConstantPool) -> Result<(ConstantPool, Vec<u16>)> {
    let mut target = ConstantPool::with_capacity(source.encoded_length());
    // old index -> new index, 0 is never valid so it's left as 0
    let mut remap = vec![0u16; source.entries.len() + 1];

    let mut i = 0usize;
    while i < source.entries.len() {
        let old_index = (i + 1) as u16;
        match &source.entries[i] {
            None => {
                // reserved second slot of a wide entry just behind us;
                // its remap entry was already set.
            }
            Some(entry) => {
                let remapped = remap_entry(entry, &remap);
                let new_index = target.index(remapped)?;
                remap[old_index as usize] = new_index;
                if entry.is_double() {
                    remap[old_index as usize + 1] = new_index;
                }
            }
        }
        i += 1;
    }

    Ok((target, remap))
}

fn remap_entry(entry: &PoolEntry, remap: &[u16]) -> PoolEntry {
    let r = |i: u16| remap.get(i as usize).copied().unwrap_or(i);
    match *entry {
        PoolEntry::Utf8(ref s) => PoolEntry::Utf8(s.clone()),
        PoolEntry::Integer(v) => PoolEntry::Integer(v),
        PoolEntry::Float(v) => PoolEntry::Float(v),
        PoolEntry::Long(v) => PoolEntry::Long(v),
        PoolEntry::Double(v) => PoolEntry::Double(v),
        PoolEntry::Class(i) => PoolEntry::Class(r(i)),
        PoolEntry::String(i) => PoolEntry::String(r(i)),
        PoolEntry::FieldRef(c, nt) => PoolEntry::FieldRef(r(c), r(nt)),
        PoolEntry::MethodRef(c, nt) => PoolEntry::MethodRef(r(c), r(nt)),
        PoolEntry::InterfaceMethodRef(c, nt) => PoolEntry::InterfaceMethodRef(r(c), r(nt)),
        PoolEntry::NameAndType(n, d) => PoolEntry::NameAndType(r(n), r(d)),
        PoolEntry::MethodHandle(kind, i) => PoolEntry::MethodHandle(kind, r(i)),
        PoolEntry::MethodType(i) => PoolEntry::MethodType(r(i)),
        PoolEntry::Dynamic(bsm, nt) => PoolEntry::Dynamic(bsm, r(nt)),
        PoolEntry::InvokeDynamic(bsm, nt) => PoolEntry::InvokeDynamic(bsm, r(nt)),
        PoolEntry::Module(i) => PoolEntry::Module(r(i)),
        PoolEntry::Package(i) => PoolEntry::Package(r(i)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn interning_returns_same_index() {
        let mut pool = ConstantPool::new();
        let a = pool.push_utf8("foo").unwrap();
        let b = pool.push_utf8("foo").unwrap();
        assert_eq!(a, b);
        let c = pool.push_utf8("bar").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn long_and_double_occupy_two_slots() {
        let mut pool = ConstantPool::new();
        let l = pool.index(PoolEntry::Long(42)).unwrap();
        let next = pool.push_utf8("after").unwrap();
        assert_eq!(next, l + 2);
        assert_eq!(pool.encoded_length(), next + 1);
    }

    #[test]
    fn index_zero_and_out_of_range_are_errors() {
        let pool = ConstantPool::new();
        assert!(pool.entry(0).is_err());
        assert!(pool.entry(1).is_err());
    }

    #[test]
    fn share_pool_deduplicates() {
        let mut source = ConstantPool::new();
        // push_raw bypasses interning, simulating a source file with an
        // actual duplicate (real compilers rarely emit these, but nothing
        // in the format forbids it).
        source.push_raw(Some(PoolEntry::Utf8("dup".into()))).unwrap();
        source.push_raw(Some(PoolEntry::Utf8("dup".into()))).unwrap();

        let (shared, remap) = share_pool(&source).unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(remap[1], remap[2]);
    }

    #[test]
    fn get_class_name_resolves_through_utf8() {
        let mut pool = ConstantPool::new();
        let idx = pool.push_class("java/lang/Object").unwrap();
        assert_eq!(pool.get_class_name(idx).unwrap(), "java/lang/Object");
    }
}
