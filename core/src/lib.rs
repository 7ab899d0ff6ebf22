//! Core codec and transformation engine for JVM class files: parsing,
//! constant pool interning, bytecode assembly and stack map generation.
//!
//! This crate is the hard-engineering layer; `classfile` builds the
//! ergonomic façade (`ClassModel`, `ClassBuilder`, transforms) on top
//! of it.

#[macro_use]
extern crate bitflags;
extern crate byteorder;
#[macro_use]
extern crate yade;

mod assembler;
mod constpool;
mod decode;
mod element;
mod encode;
mod label;
mod parser;
mod remap;
mod result;
mod stackmap_gen;
mod transform;
mod tree;
mod writer;

pub use assembler::*;
pub use constpool::*;
pub use decode::{ByteView, Decoder};
pub use element::*;
pub use encode::{Encoder, Mark};
pub use label::*;
pub use parser::parse;
pub use remap::remap_class;
pub use result::Error;
pub use result::Result;
pub use stackmap_gen::*;
pub use transform::*;
pub use tree::*;
pub use writer::write;
