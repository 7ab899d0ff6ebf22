use std::collections::BTreeMap;

use classfile_core::{
    assemble, generate, requires_stack_maps, AsmElement, AsmOp, Attribute, ConstantPool,
    IfKind, Instruction, Label, LabelContext, LocalVariable, LocalVariableType, StackMapsOption,
    VerificationType,
};

use crate::options::{Classfile, DebugElements, LineNumbers};
use crate::result::*;

/// Builds one method body as a stream of `AsmElement`s, then resolves
/// it into a finished `Code` attribute on `finish`.
pub struct CodeBuilder {
    options: Classfile,
    labels: LabelContext,
    elements: Vec<AsmElement>,
    max_stack: u16,
    max_locals: u16,
}

impl CodeBuilder {
    pub fn new(options: Classfile, max_stack: u16, max_locals: u16) -> CodeBuilder {
        CodeBuilder {
            options,
            labels: LabelContext::new(),
            elements: Vec::new(),
            max_stack,
            max_locals,
        }
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.new_label()
    }

    pub fn bind_label(&mut self, label: Label) -> &mut CodeBuilder {
        self.elements.push(AsmElement::Label(label));
        self
    }

    pub fn instruction(&mut self, instruction: Instruction) -> &mut CodeBuilder {
        self.elements.push(AsmElement::Op(AsmOp::Instruction(instruction)));
        self
    }

    pub fn goto(&mut self, target: Label) -> &mut CodeBuilder {
        self.elements.push(AsmElement::Op(AsmOp::Goto(target)));
        self
    }

    pub fn jsr(&mut self, target: Label) -> &mut CodeBuilder {
        self.elements.push(AsmElement::Op(AsmOp::Jsr(target)));
        self
    }

    pub fn branch(&mut self, kind: IfKind, target: Label) -> &mut CodeBuilder {
        self.elements.push(AsmElement::Op(AsmOp::If(kind, target)));
        self
    }

    pub fn table_switch(
        &mut self,
        default: Label,
        low: i32,
        high: i32,
        targets: Vec<Label>,
    ) -> &mut CodeBuilder {
        self.elements.push(AsmElement::Op(AsmOp::TableSwitch {
            default,
            low,
            high,
            targets,
        }));
        self
    }

    pub fn lookup_switch(
        &mut self,
        default: Label,
        targets: BTreeMap<i32, Label>,
    ) -> &mut CodeBuilder {
        self.elements
            .push(AsmElement::Op(AsmOp::LookupSwitch { default, targets }));
        self
    }

    pub fn exception_catch(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        catch_type: Option<u16>,
    ) -> &mut CodeBuilder {
        self.elements.push(AsmElement::ExceptionCatch {
            start,
            end,
            handler,
            catch_type,
        });
        self
    }

    /// Dropped outright when either `DebugElements::DropDebug` or
    /// `LineNumbers::DropLineNumbers` is in effect, whether this call
    /// came from a fresh builder or a pass-through transform.
    pub fn line_number(&mut self, line: u16) -> &mut CodeBuilder {
        if self.options.debug_elements() == DebugElements::PassDebug
            && self.options.line_numbers() == LineNumbers::PassLineNumbers
        {
            self.elements.push(AsmElement::LineNumber(line));
        }
        self
    }

    pub fn local_variable(&mut self, var: LocalVariable) -> &mut CodeBuilder {
        if self.options.debug_elements() == DebugElements::PassDebug {
            self.elements.push(AsmElement::LocalVariable(var));
        }
        self
    }

    pub fn local_variable_type(&mut self, var_type: LocalVariableType) -> &mut CodeBuilder {
        if self.options.debug_elements() == DebugElements::PassDebug {
            self.elements.push(AsmElement::LocalVariableType(var_type));
        }
        self
    }

    /// Resolves the buffered element stream into a finished `Code`
    /// attribute, generating a `StackMapTable` first if the options
    /// and the class's major version call for one.
    pub fn finish(
        mut self,
        pool: &mut ConstantPool,
        class_major_version: u16,
        initial_locals: Vec<VerificationType>,
    ) -> Result<Attribute> {
        let assembled = assemble(&self.elements, &mut self.labels, &self.options.assembler_options())?;

        let mut attributes = assembled.attributes;

        if requires_stack_maps(class_major_version, self.options.stack_maps()) {
            let resolver = self.options.class_hierarchy_resolver();
            let frames = generate(
                &assembled.instructions,
                &assembled.exceptions,
                initial_locals,
                &assembled.dead_labels,
                pool,
                resolver,
            )?;
            if !frames.is_empty() || self.options.stack_maps() == StackMapsOption::AlwaysGenerate {
                attributes.push(Attribute::StackMapTable(frames));
            }
        }

        Ok(Attribute::Code {
            max_stack: self.max_stack,
            max_locals: self.max_locals,
            instructions: assembled.instructions,
            exceptions: assembled.exceptions,
            attributes,
        })
    }
}
