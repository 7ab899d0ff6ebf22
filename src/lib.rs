//! A library for reading, constructing and transforming JVM class
//! files.
//!
//! This crate is a thin façade over `classfile_core`, which owns every
//! binary decision — constant pool layout, the bytecode assembler, the
//! stack map generator. What lives here is ergonomics: lazily-parsed
//! models (`model`), a builder for constructing a class from nothing
//! (`builder`), transform traits for rewriting one in place
//! (`transform`), and the `Classfile` options record that threads
//! through all three.

#[macro_use]
extern crate yade;

pub mod builder;
pub mod descriptor;
pub mod model;
mod options;
mod result;
pub mod transform;

pub use descriptor::{MethodDescriptor, Type, TypeDescriptor};
pub use options::{Classfile, ConstantPoolSharing, DebugElements, LineNumbers, UnknownAttributes};
pub use result::{Error, Result};

#[cfg(test)]
mod test {
    use super::*;
    use classfile_core::{AccessFlags, Instruction};

    #[test]
    fn builds_and_parses_back_a_minimal_class() {
        let options = Classfile::new();
        let bytes = options
            .build(52, 0, AccessFlags::PUBLIC | AccessFlags::SUPER, "Hello", Some("java/lang/Object"))
            .unwrap()
            .finish()
            .unwrap();

        let model = options.parse(bytes);
        assert_eq!(model.name().unwrap(), "Hello");
        assert_eq!(model.super_name().unwrap(), Some("java/lang/Object"));
        assert!(model.methods().unwrap().is_empty());
    }

    #[test]
    fn builds_a_field() {
        let options = Classfile::new();
        let bytes = options
            .build(52, 0, AccessFlags::PUBLIC, "Point", Some("java/lang/Object"))
            .unwrap()
            .with_field(AccessFlags::PRIVATE, "x", "I")
            .unwrap()
            .finish()
            .unwrap();

        let model = options.parse(bytes);
        let fields = model.fields().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name().unwrap(), "x");
        assert_eq!(fields[0].descriptor_raw().unwrap(), "I");
    }

    #[test]
    fn transform_drops_a_method_and_rewrites_a_surviving_one() {
        use crate::model::MethodModel;
        use crate::transform::{ClassTransform, MethodTransform};
        use classfile_core::CodeElement;

        let options = Classfile::new();
        let mut builder = options
            .build(52, 0, AccessFlags::PUBLIC, "Greeter", Some("java/lang/Object"))
            .unwrap();

        let mut ping = builder.method(AccessFlags::PUBLIC, "ping", "()I").unwrap();
        let mut ping_code = ping.code(1, 1);
        ping_code
            .instruction(Instruction::IConst0)
            .instruction(Instruction::IReturn);
        let ping = ping
            .with_code(builder.pool(), 52, Vec::new(), ping_code)
            .unwrap()
            .finish();
        builder = builder.with_method(ping);

        let mut dead = builder.method(AccessFlags::PUBLIC, "dead", "()V").unwrap();
        let mut dead_code = dead.code(0, 0);
        dead_code.instruction(Instruction::Return);
        let dead = dead
            .with_code(builder.pool(), 52, Vec::new(), dead_code)
            .unwrap()
            .finish();
        builder = builder.with_method(dead);

        let bytes = builder.finish().unwrap();

        struct DropDead;
        impl ClassTransform for DropDead {
            fn keep_method(&mut self, method: &MethodModel) -> bool {
                method.name().unwrap() != "dead"
            }
        }

        struct ReplaceIConst0;
        impl MethodTransform for ReplaceIConst0 {
            fn transform_code(&mut self, _method: &MethodModel, elements: Vec<CodeElement>) -> Vec<CodeElement> {
                elements
                    .into_iter()
                    .map(|element| match element {
                        CodeElement::Instruction(Instruction::IConst0) => {
                            CodeElement::Instruction(Instruction::IConst1)
                        }
                        other => other,
                    })
                    .collect()
            }
        }

        let transformed = options
            .transform(&bytes, &mut DropDead, &mut ReplaceIConst0)
            .unwrap();

        let model = options.parse(transformed);
        let methods = model.methods().unwrap();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name().unwrap(), "ping");

        let code = methods[0].code().unwrap();
        let instructions: Vec<&Instruction> = code.instructions().values().collect();
        assert!(matches!(instructions[0], Instruction::IConst1));
    }
}
