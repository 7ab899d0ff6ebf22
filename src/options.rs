use std::sync::Arc;

use classfile_core::{
    elements_of, generate, remap_class, requires_stack_maps, share_pool, Attribute, CodeElement,
    DeadCode, DeadLabels, Method, ShortJumps, StackMapsOption,
};

use crate::builder::ClassBuilder;
use crate::model::{ClassModel, CodeModel, MethodModel};
use crate::result::*;
use crate::transform::{rewrite_code, ClassTransform, MethodTransform};

/// Whether debug-only `Code` elements (line numbers, local variable
/// tables) are kept or dropped while building or transforming a method
/// body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugElements {
    PassDebug,
    DropDebug,
}

/// Whether `LineNumberTable` entries specifically are kept, independent
/// of `DebugElements`. `DropLineNumbers` wins over a pass-through
/// transform the same way `DropDebug` does: an element a drop option
/// excludes never reaches the terminal builder, whether it came from
/// pass-through or was freshly constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineNumbers {
    PassLineNumbers,
    DropLineNumbers,
}

/// Whether an attribute this crate does not itself model is kept as an
/// opaque blob or silently discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownAttributes {
    PassUnknownAttributes,
    DropUnknownAttributes,
}

/// Whether a freshly written constant pool reuses and deduplicates every
/// entry still reachable from the input pool, or starts empty and is
/// filled only with what the builder actually references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantPoolSharing {
    SharedPool,
    NewPool,
}

/// The set of knobs that govern how a class is read, built, and
/// transformed. Immutable once constructed; change one field by
/// deriving a new value with `with_*`, mirroring the rest of this
/// crate's builder idiom.
#[derive(Clone)]
pub struct Classfile {
    stack_maps: StackMapsOption,
    debug_elements: DebugElements,
    line_numbers: LineNumbers,
    unknown_attributes: UnknownAttributes,
    constant_pool_sharing: ConstantPoolSharing,
    short_jumps: ShortJumps,
    dead_code: DeadCode,
    dead_labels: DeadLabels,
    class_hierarchy_resolver: Arc<dyn Fn(&str, &str) -> Option<String> + Send + Sync>,
}

impl Default for Classfile {
    fn default() -> Classfile {
        Classfile {
            stack_maps: StackMapsOption::StackMapsWhenRequired,
            debug_elements: DebugElements::PassDebug,
            line_numbers: LineNumbers::PassLineNumbers,
            unknown_attributes: UnknownAttributes::PassUnknownAttributes,
            constant_pool_sharing: ConstantPoolSharing::SharedPool,
            short_jumps: ShortJumps::FixShortJumps,
            dead_code: DeadCode::PatchDeadCode,
            dead_labels: DeadLabels::FailOnDeadLabels,
            class_hierarchy_resolver: Arc::new(|_, _| None),
        }
    }
}

impl Classfile {
    pub fn new() -> Classfile {
        Classfile::default()
    }

    pub fn with_stack_maps(mut self, option: StackMapsOption) -> Classfile {
        self.stack_maps = option;
        self
    }

    pub fn with_debug_elements(mut self, option: DebugElements) -> Classfile {
        self.debug_elements = option;
        self
    }

    pub fn with_line_numbers(mut self, option: LineNumbers) -> Classfile {
        self.line_numbers = option;
        self
    }

    pub fn with_unknown_attributes(mut self, option: UnknownAttributes) -> Classfile {
        self.unknown_attributes = option;
        self
    }

    pub fn with_constant_pool_sharing(mut self, option: ConstantPoolSharing) -> Classfile {
        self.constant_pool_sharing = option;
        self
    }

    pub fn with_short_jumps(mut self, option: ShortJumps) -> Classfile {
        self.short_jumps = option;
        self
    }

    pub fn with_dead_code(mut self, option: DeadCode) -> Classfile {
        self.dead_code = option;
        self
    }

    pub fn with_dead_labels(mut self, option: DeadLabels) -> Classfile {
        self.dead_labels = option;
        self
    }

    /// Supplies the oracle used to join verification types across two
    /// divergent control-flow paths when generating a `StackMapTable`.
    /// The default resolver always answers `None`, which falls back to
    /// `java/lang/Object` for every join it cannot otherwise resolve.
    pub fn with_class_hierarchy_resolver<F>(mut self, resolver: F) -> Classfile
    where
        F: Fn(&str, &str) -> Option<String> + Send + Sync + 'static,
    {
        self.class_hierarchy_resolver = Arc::new(resolver);
        self
    }

    pub fn stack_maps(&self) -> StackMapsOption {
        self.stack_maps
    }

    pub fn debug_elements(&self) -> DebugElements {
        self.debug_elements
    }

    pub fn line_numbers(&self) -> LineNumbers {
        self.line_numbers
    }

    pub fn unknown_attributes(&self) -> UnknownAttributes {
        self.unknown_attributes
    }

    pub fn constant_pool_sharing(&self) -> ConstantPoolSharing {
        self.constant_pool_sharing
    }

    pub fn short_jumps(&self) -> ShortJumps {
        self.short_jumps
    }

    pub fn dead_code(&self) -> DeadCode {
        self.dead_code
    }

    pub fn dead_labels(&self) -> DeadLabels {
        self.dead_labels
    }

    pub fn class_hierarchy_resolver(&self) -> &(dyn Fn(&str, &str) -> Option<String> + Send + Sync) {
        &*self.class_hierarchy_resolver
    }

    pub(crate) fn assembler_options(&self) -> classfile_core::AssemblerOptions {
        classfile_core::AssemblerOptions {
            short_jumps: self.short_jumps,
            dead_code: self.dead_code,
            dead_labels: self.dead_labels,
        }
    }

    /// Wraps `bytes` as a lazily-parsed `ClassModel`. Parsing itself
    /// always keeps everything; the drop options govern what survives
    /// a subsequent `transform` or `ClassBuilder::finish`, not what a
    /// read-only model can see.
    pub fn parse(&self, bytes: impl Into<Arc<[u8]>>) -> ClassModel {
        ClassModel::new(bytes)
    }

    pub fn build(
        &self,
        major_version: u16,
        minor_version: u16,
        access_flags: classfile_core::AccessFlags,
        name: &str,
        super_name: Option<&str>,
    ) -> Result<ClassBuilder> {
        ClassBuilder::new(
            self.clone(),
            major_version,
            minor_version,
            access_flags,
            name,
            super_name,
        )
    }

    /// Parses `bytes`, runs `class_transform`/`method_transform` over
    /// every method, and re-encodes the result. `debug_elements()`,
    /// `line_numbers()` and `unknown_attributes()` are applied the same
    /// way here as they are on a fresh `CodeBuilder`: whichever option
    /// excludes an element, it never reaches the output, whether it
    /// arrived via pass-through or was freshly produced by a transform.
    /// `constant_pool_sharing() == NewPool` reshares the pool with
    /// `share_pool` once, after every method has been rewritten, and
    /// remaps every index the resulting tree holds to match.
    pub fn transform(
        &self,
        bytes: &[u8],
        class_transform: &mut dyn ClassTransform,
        method_transform: &mut dyn MethodTransform,
    ) -> Result<Vec<u8>> {
        let (mut pool, mut class) = classfile_core::parse(bytes)?;
        let major_version = class.major_version;

        let drop_debug = self.debug_elements() == DebugElements::DropDebug;
        let drop_line_numbers = drop_debug || self.line_numbers() == LineNumbers::DropLineNumbers;
        let drop_unknown = self.unknown_attributes() == UnknownAttributes::DropUnknownAttributes;

        let mut methods = Vec::with_capacity(class.methods.len());
        for method in &class.methods {
            if !class_transform.keep_method(&MethodModel::new(&pool, method)) {
                continue;
            }

            let mut attributes: Vec<Attribute> = method
                .attributes
                .iter()
                .filter(|attribute| !matches!(attribute, Attribute::Code { .. }))
                .filter(|attribute| !(drop_unknown && matches!(attribute, Attribute::Unknown(..))))
                .cloned()
                .collect();

            let code = method.attributes.iter().find_map(|attribute| match attribute {
                Attribute::Code {
                    max_stack,
                    max_locals,
                    instructions,
                    exceptions,
                    attributes,
                } => Some((*max_stack, *max_locals, instructions, exceptions, attributes)),
                _ => None,
            });

            if let Some((max_stack, max_locals, instructions, exceptions, code_attributes)) = code {
                let code_model = CodeModel::new(max_stack, max_locals, instructions, exceptions, code_attributes);
                let code_elements = code_model.elements();
                let original_bcis: Vec<u32> = instructions.keys().copied().collect();

                let transformed = method_transform
                    .transform_code(&MethodModel::new(&pool, method), code_elements.elements);

                let transformed: Vec<CodeElement> = transformed
                    .into_iter()
                    .filter(|element| match element {
                        CodeElement::LineNumber(_) => !drop_line_numbers,
                        CodeElement::LocalVariable(_) | CodeElement::LocalVariableType(_) => !drop_debug,
                        _ => true,
                    })
                    .collect();

                let mut labels = code_elements.labels;
                let asm = rewrite_code(transformed, &labels, &original_bcis);
                let assembled = classfile_core::assemble(&asm, &mut labels, &self.assembler_options())?;

                let mut debug_attributes = assembled.attributes;
                if requires_stack_maps(major_version, self.stack_maps()) {
                    let frames = generate(
                        &assembled.instructions,
                        &assembled.exceptions,
                        Vec::new(),
                        &assembled.dead_labels,
                        &mut pool,
                        self.class_hierarchy_resolver(),
                    )?;
                    if !frames.is_empty() {
                        debug_attributes.push(Attribute::StackMapTable(frames));
                    }
                }

                attributes.push(Attribute::Code {
                    max_stack,
                    max_locals,
                    instructions: assembled.instructions,
                    exceptions: assembled.exceptions,
                    attributes: debug_attributes,
                });
            }

            methods.push(Method {
                access_flags: method.access_flags,
                name: method.name,
                desc: method.desc,
                attributes,
            });
        }

        class.methods = methods;

        if self.constant_pool_sharing() == ConstantPoolSharing::NewPool {
            let (shared_pool, remap) = share_pool(&pool)?;
            pool = shared_pool;
            remap_class(&mut class, &remap);
        }

        Ok(classfile_core::write(&mut pool, &class)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_match_a_permissive_round_trip() {
        let options = Classfile::new();
        assert_eq!(options.debug_elements(), DebugElements::PassDebug);
        assert_eq!(options.line_numbers(), LineNumbers::PassLineNumbers);
        assert_eq!(
            options.unknown_attributes(),
            UnknownAttributes::PassUnknownAttributes
        );
        assert_eq!(
            options.constant_pool_sharing(),
            ConstantPoolSharing::SharedPool
        );
    }

    #[test]
    fn with_methods_derive_a_new_value_without_mutating_the_default() {
        let options = Classfile::new().with_debug_elements(DebugElements::DropDebug);
        assert_eq!(options.debug_elements(), DebugElements::DropDebug);
        assert_eq!(Classfile::new().debug_elements(), DebugElements::PassDebug);
    }

    #[test]
    fn class_hierarchy_resolver_defaults_to_unknown() {
        let options = Classfile::new();
        assert_eq!(
            (options.class_hierarchy_resolver())("a/B", "c/D"),
            None
        );
    }
}
