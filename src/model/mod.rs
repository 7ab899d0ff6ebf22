//! Read-only, lazily-parsed views over a class file's bytes.
//!
//! `ClassModel` defers the actual `classfile_core::parse` call until
//! the first accessor is used, then memoizes the result for the life
//! of the model — most callers only ever ask a `ClassModel` for its
//! name or a handful of methods, and there is no reason to decode
//! attributes, code bodies and annotations nobody asked for.

mod class;
mod code;
mod field;
mod method;

pub use class::ClassModel;
pub use code::CodeModel;
pub use field::FieldModel;
pub use method::MethodModel;
