use classfile_core::{
    remap_class, share_pool, write, AccessFlags, Attribute, Class, ConstantPool, Field, Method,
};

use crate::builder::MethodBuilder;
use crate::options::{Classfile, ConstantPoolSharing};
use crate::result::*;

/// Builds a class file from scratch, one field/method at a time.
pub struct ClassBuilder {
    options: Classfile,
    pool: ConstantPool,
    minor_version: u16,
    major_version: u16,
    access_flags: AccessFlags,
    name: u16,
    super_name: u16,
    interfaces: Vec<u16>,
    fields: Vec<Field>,
    methods: Vec<Method>,
    attributes: Vec<Attribute>,
}

impl ClassBuilder {
    pub fn new(
        options: Classfile,
        major_version: u16,
        minor_version: u16,
        access_flags: AccessFlags,
        name: &str,
        super_name: Option<&str>,
    ) -> Result<ClassBuilder> {
        let mut pool = ConstantPool::new();
        let name = pool.push_class(name)?;
        let super_name = match super_name {
            Some(super_name) => pool.push_class(super_name)?,
            None => 0,
        };
        Ok(ClassBuilder {
            options,
            pool,
            minor_version,
            major_version,
            access_flags,
            name,
            super_name,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        })
    }

    pub fn options(&self) -> &Classfile {
        &self.options
    }

    pub fn pool(&mut self) -> &mut ConstantPool {
        &mut self.pool
    }

    pub fn with_interface(mut self, name: &str) -> Result<ClassBuilder> {
        let index = self.pool.push_class(name)?;
        self.interfaces.push(index);
        Ok(self)
    }

    pub fn with_field(
        mut self,
        access_flags: AccessFlags,
        name: &str,
        descriptor: &str,
    ) -> Result<ClassBuilder> {
        let name = self.pool.push_utf8(name)?;
        let desc = self.pool.push_utf8(descriptor)?;
        self.fields.push(Field {
            access_flags,
            name,
            desc,
            attributes: Vec::new(),
        });
        Ok(self)
    }

    pub fn method(
        &mut self,
        access_flags: AccessFlags,
        name: &str,
        descriptor: &str,
    ) -> Result<MethodBuilder> {
        MethodBuilder::new(self.options.clone(), &mut self.pool, access_flags, name, descriptor)
    }

    pub fn with_method(mut self, method: Method) -> ClassBuilder {
        self.methods.push(method);
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> ClassBuilder {
        self.attributes.push(attribute);
        self
    }

    /// Assembles the final `Class` tree and encodes it to bytes,
    /// resharing the constant pool first if `constantPoolSharing` asks
    /// for it.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let mut class = Class {
            minor_version: self.minor_version,
            major_version: self.major_version,
            access_flags: self.access_flags,
            name: self.name,
            super_name: self.super_name,
            interfaces: self.interfaces,
            fields: self.fields,
            methods: self.methods,
            attributes: self.attributes,
        };

        if self.options.constant_pool_sharing() == ConstantPoolSharing::NewPool {
            let (shared_pool, remap) = share_pool(&self.pool)?;
            self.pool = shared_pool;
            remap_class(&mut class, &remap);
        }

        Ok(write(&mut self.pool, &class)?)
    }
}
