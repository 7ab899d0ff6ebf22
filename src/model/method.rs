use classfile_core::{AccessFlags, Attribute, ConstantPool, Method};

use crate::descriptor::MethodDescriptor;
use crate::model::CodeModel;
use crate::result::*;

pub struct MethodModel<'a> {
    pool: &'a ConstantPool,
    method: &'a Method,
}

impl<'a> MethodModel<'a> {
    pub(crate) fn new(pool: &'a ConstantPool, method: &'a Method) -> MethodModel<'a> {
        MethodModel { pool, method }
    }

    pub fn access_flags(&self) -> AccessFlags {
        self.method.access_flags
    }

    pub fn name(&self) -> Result<&'a str> {
        Ok(self.pool.get_utf8(self.method.name)?)
    }

    pub fn descriptor_raw(&self) -> Result<&'a str> {
        Ok(self.pool.get_utf8(self.method.desc)?)
    }

    pub fn descriptor(&self) -> Result<MethodDescriptor> {
        self.descriptor_raw()?.parse()
    }

    /// `None` for an `abstract` or `native` method, which has no
    /// `Code` attribute.
    pub fn code(&self) -> Option<CodeModel<'a>> {
        self.method.attributes.iter().find_map(|attribute| {
            if let Attribute::Code {
                max_stack,
                max_locals,
                instructions,
                exceptions,
                attributes,
            } = attribute
            {
                Some(CodeModel::new(
                    *max_stack,
                    *max_locals,
                    instructions,
                    exceptions,
                    attributes,
                ))
            } else {
                None
            }
        })
    }
}
