use classfile_core::{AccessFlags, ConstantPool, Field};

use crate::descriptor::TypeDescriptor;
use crate::result::*;

pub struct FieldModel<'a> {
    pool: &'a ConstantPool,
    field: &'a Field,
}

impl<'a> FieldModel<'a> {
    pub(crate) fn new(pool: &'a ConstantPool, field: &'a Field) -> FieldModel<'a> {
        FieldModel { pool, field }
    }

    pub fn access_flags(&self) -> AccessFlags {
        self.field.access_flags
    }

    pub fn name(&self) -> Result<&'a str> {
        Ok(self.pool.get_utf8(self.field.name)?)
    }

    pub fn descriptor_raw(&self) -> Result<&'a str> {
        Ok(self.pool.get_utf8(self.field.desc)?)
    }

    pub fn descriptor(&self) -> Result<TypeDescriptor> {
        self.descriptor_raw()?.parse()
    }
}
