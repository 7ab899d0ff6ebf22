use classfile_core::{AccessFlags, Attribute, ConstantPool, Method, VerificationType};

use crate::builder::CodeBuilder;
use crate::options::Classfile;
use crate::result::*;

pub struct MethodBuilder {
    options: Classfile,
    access_flags: AccessFlags,
    name: u16,
    desc: u16,
    attributes: Vec<Attribute>,
}

impl MethodBuilder {
    pub fn new(
        options: Classfile,
        pool: &mut ConstantPool,
        access_flags: AccessFlags,
        name: &str,
        descriptor: &str,
    ) -> Result<MethodBuilder> {
        Ok(MethodBuilder {
            options,
            access_flags,
            name: pool.push_utf8(name)?,
            desc: pool.push_utf8(descriptor)?,
            attributes: Vec::new(),
        })
    }

    pub fn code(&self, max_stack: u16, max_locals: u16) -> CodeBuilder {
        CodeBuilder::new(self.options.clone(), max_stack, max_locals)
    }

    /// Attaches a `Code` attribute built with a `CodeBuilder` obtained
    /// from `self.code(..)`.
    pub fn with_code(
        mut self,
        pool: &mut ConstantPool,
        class_major_version: u16,
        initial_locals: Vec<VerificationType>,
        code: CodeBuilder,
    ) -> Result<MethodBuilder> {
        let attribute = code.finish(pool, class_major_version, initial_locals)?;
        self.attributes.push(attribute);
        Ok(self)
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> MethodBuilder {
        self.attributes.push(attribute);
        self
    }

    pub fn finish(self) -> Method {
        Method {
            access_flags: self.access_flags,
            name: self.name,
            desc: self.desc,
            attributes: self.attributes,
        }
    }
}
