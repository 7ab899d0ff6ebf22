//! Builds a small class from scratch and writes it to STDOUT:
//!
//! ```java
//! public class BasicExample {
//!     private int counter;
//!     public void run() {
//!         counter += 5;
//!     }
//! }
//! ```
extern crate classfile;
extern crate classfile_core;

use std::io::{stdout, Write};

use classfile_core::{AccessFlags, Instruction};

use classfile::Classfile;

fn main() {
    let options = Classfile::new();

    let mut builder = options
        .build(
            0x35,
            0x00,
            AccessFlags::PUBLIC | AccessFlags::SUPER,
            "BasicExample",
            Some("java/lang/Object"),
        )
        .expect("could not start class")
        .with_field(AccessFlags::PRIVATE, "counter", "I")
        .expect("could not add field");

    let field_ref = {
        let pool = builder.pool();
        let class = pool.push_class("BasicExample").unwrap();
        let name = pool.push_utf8("counter").unwrap();
        let desc = pool.push_utf8("I").unwrap();
        let name_and_type = pool.push_name_and_type(name, desc).unwrap();
        pool.intern_mapped(classfile_core::PoolEntry::FieldRef(class, name_and_type))
            .unwrap()
    };

    let run_method = {
        let mut method = builder
            .method(AccessFlags::PUBLIC, "run", "()V")
            .expect("could not start method");

        let mut code = method.code(3, 1);
        code.instruction(Instruction::ALoad0)
            .instruction(Instruction::Dup)
            .instruction(Instruction::GetField(field_ref))
            .instruction(Instruction::BIPush(5))
            .instruction(Instruction::IAdd)
            .instruction(Instruction::PutField(field_ref))
            .instruction(Instruction::Return);

        method
            .with_code(builder.pool(), 0x35, Vec::new(), code)
            .expect("could not assemble code")
            .finish()
    };

    builder = builder.with_method(run_method);

    let bytes = builder.finish().expect("could not write class");
    stdout().write_all(&bytes).unwrap();
}
