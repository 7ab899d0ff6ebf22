use std::sync::{Arc, OnceLock};

use classfile_core::{AccessFlags, Class, ConstantPool};

use crate::model::{FieldModel, MethodModel};
use crate::result::*;

/// A class file, held as raw bytes until something asks to look inside
/// it.
pub struct ClassModel {
    bytes: Arc<[u8]>,
    parsed: OnceLock<(ConstantPool, Class)>,
}

impl ClassModel {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> ClassModel {
        ClassModel {
            bytes: bytes.into(),
            parsed: OnceLock::new(),
        }
    }

    fn parsed(&self) -> Result<&(ConstantPool, Class)> {
        if self.parsed.get().is_none() {
            let parsed = classfile_core::parse(&self.bytes)?;
            // Another thread may have raced us to it; whichever parse
            // landed first wins, both are equivalent.
            let _ = self.parsed.set(parsed);
        }
        Ok(self.parsed.get().expect("just initialized above"))
    }

    fn pool(&self) -> Result<&ConstantPool> {
        self.parsed().map(|(pool, _)| pool)
    }

    fn class(&self) -> Result<&Class> {
        self.parsed().map(|(_, class)| class)
    }

    pub fn minor_version(&self) -> Result<u16> {
        Ok(self.class()?.minor_version)
    }

    pub fn major_version(&self) -> Result<u16> {
        Ok(self.class()?.major_version)
    }

    pub fn access_flags(&self) -> Result<AccessFlags> {
        Ok(self.class()?.access_flags)
    }

    pub fn name(&self) -> Result<&str> {
        let (pool, class) = self.parsed()?;
        Ok(pool.get_class_name(class.name)?)
    }

    pub fn super_name(&self) -> Result<Option<&str>> {
        let (pool, class) = self.parsed()?;
        Ok(pool.get_class_name_opt(class.super_name)?)
    }

    pub fn interfaces(&self) -> Result<Vec<&str>> {
        let (pool, class) = self.parsed()?;
        class
            .interfaces
            .iter()
            .map(|&index| pool.get_class_name(index).map_err(Error::from))
            .collect()
    }

    pub fn fields(&self) -> Result<Vec<FieldModel<'_>>> {
        let (pool, class) = self.parsed()?;
        Ok(class
            .fields
            .iter()
            .map(|field| FieldModel::new(pool, field))
            .collect())
    }

    pub fn methods(&self) -> Result<Vec<MethodModel<'_>>> {
        let (pool, class) = self.parsed()?;
        Ok(class
            .methods
            .iter()
            .map(|method| MethodModel::new(pool, method))
            .collect())
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Result<Option<MethodModel<'_>>> {
        for method in self.methods()? {
            if method.name()? == name && method.descriptor_raw()? == descriptor {
                return Ok(Some(method));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_truncated_input_lazily() {
        let model = ClassModel::new(vec![0xCA, 0xFE]);
        assert!(model.name().is_err());
    }
}
