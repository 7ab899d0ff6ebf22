use std::collections::BTreeMap;

use classfile_core::{
    elements_of, Attribute, CodeElements, Exception, Instruction, LineNumber, LocalVariable,
    LocalVariableType,
};

/// Borrows straight into a parsed `Class`'s `Code` attribute — it has
/// no need of the constant pool itself, only of indices into it, so it
/// borrows nothing from `ClassModel` beyond the attribute's own fields.
pub struct CodeModel<'a> {
    max_stack: u16,
    max_locals: u16,
    instructions: &'a BTreeMap<u32, Instruction>,
    exceptions: &'a [Exception],
    attributes: &'a [Attribute],
}

impl<'a> CodeModel<'a> {
    pub(crate) fn new(
        max_stack: u16,
        max_locals: u16,
        instructions: &'a BTreeMap<u32, Instruction>,
        exceptions: &'a [Exception],
        attributes: &'a [Attribute],
    ) -> CodeModel<'a> {
        CodeModel {
            max_stack,
            max_locals,
            instructions,
            exceptions,
            attributes,
        }
    }

    pub fn max_stack(&self) -> u16 {
        self.max_stack
    }

    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }

    pub fn instructions(&self) -> &'a BTreeMap<u32, Instruction> {
        self.instructions
    }

    pub fn exceptions(&self) -> &'a [Exception] {
        self.exceptions
    }

    pub fn line_numbers(&self) -> &'a [LineNumber] {
        self.attributes
            .iter()
            .find_map(|attribute| match attribute {
                Attribute::LineNumberTable(lines) => Some(lines.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn local_variables(&self) -> &'a [LocalVariable] {
        self.attributes
            .iter()
            .find_map(|attribute| match attribute {
                Attribute::LocalVariableTable(vars) => Some(vars.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn local_variable_types(&self) -> &'a [LocalVariableType] {
        self.attributes
            .iter()
            .find_map(|attribute| match attribute {
                Attribute::LocalVariableTypeTable(types) => Some(types.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// The label-based element-stream view of this body, for feeding
    /// into a `CodeTransform` or a fresh `CodeBuilder`.
    pub fn elements(&self) -> CodeElements {
        elements_of(self.instructions, self.exceptions, self.attributes)
    }
}
