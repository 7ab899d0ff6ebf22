//! User-facing transform traits, layered over `classfile_core`'s
//! generic `Builder`/`drive` primitive.
//!
//! `CodeTransform` rewrites one method body's element stream.
//! `rewrite_code` is the bridge back from that stream to the
//! label-target `AsmElement` stream `classfile_core::assemble` wants:
//! a branch instruction here still carries its original, concrete
//! JVMS delta, so the bridge resolves `at + delta` against the
//! `LabelContext` the stream came with and re-emits the matching
//! `AsmOp` variant. This only works when a transform's instructions
//! still sit at the bcis they started at — a transform that inserts or
//! deletes instructions ahead of a branch must mint its own labels and
//! write through a `CodeBuilder` directly instead of going through
//! `rewrite_code`.

use std::collections::BTreeMap;

use classfile_core::{
    AsmElement, AsmOp, Builder, CodeElement, CollectingBuilder, IfKind, Instruction, Label,
    LabelContext,
};

use crate::model::MethodModel;

pub trait CodeTransform {
    /// Forwards `element` to `builder` unchanged. Override to drop,
    /// duplicate, or replace elements; call `builder.with(..)` zero or
    /// more times per element received.
    fn transform(&mut self, element: CodeElement, builder: &mut dyn Builder<CodeElement>) {
        builder.with(element);
    }
}

pub fn apply_code_transform(
    elements: Vec<CodeElement>,
    transform: &mut dyn CodeTransform,
) -> Vec<CodeElement> {
    let mut out = CollectingBuilder::new();
    for element in elements {
        transform.transform(element, &mut out);
    }
    out.elements
}

pub fn apply_code_transforms(
    mut elements: Vec<CodeElement>,
    transforms: &mut [Box<dyn CodeTransform>],
) -> Vec<CodeElement> {
    for transform in transforms {
        elements = apply_code_transform(elements, transform.as_mut());
    }
    elements
}

pub trait MethodTransform {
    /// Rewrites one method's code elements. The default is a no-op.
    fn transform_code(&mut self, _method: &MethodModel, elements: Vec<CodeElement>) -> Vec<CodeElement> {
        elements
    }
}

pub trait ClassTransform {
    /// Decides whether `method` survives into the transformed class.
    fn keep_method(&mut self, _method: &MethodModel) -> bool {
        true
    }
}

fn if_kind_of(instruction: &Instruction) -> Option<IfKind> {
    use Instruction::*;
    Some(match instruction {
        IfEq(_) => IfKind::Eq,
        IfNE(_) => IfKind::Ne,
        IfLT(_) => IfKind::Lt,
        IfGE(_) => IfKind::Ge,
        IfGT(_) => IfKind::Gt,
        IfLE(_) => IfKind::Le,
        IfICmpEq(_) => IfKind::ICmpEq,
        IfICmpNE(_) => IfKind::ICmpNe,
        IfICmpLT(_) => IfKind::ICmpLt,
        IfICmpGE(_) => IfKind::ICmpGe,
        IfICmpGT(_) => IfKind::ICmpGt,
        IfICmpLE(_) => IfKind::ICmpLe,
        IfACmpEq(_) => IfKind::ACmpEq,
        IfACmpNE(_) => IfKind::ACmpNe,
        IfNull(_) => IfKind::Null,
        IfNonNull(_) => IfKind::NonNull,
        _ => return None,
    })
}

/// Converts a (possibly transformed) `CodeElement` stream back into
/// the `AsmElement` stream the assembler consumes, reusing `labels` as
/// the source of truth for every branch target still present in the
/// stream. `original_bcis` is the bci each `CodeElement::Instruction`
/// occupied before the transform ran, in stream order; an inserted
/// instruction that introduces a *new* branch is not representable
/// this way and must go through `CodeBuilder` instead.
pub fn rewrite_code(
    elements: Vec<CodeElement>,
    labels: &LabelContext,
    original_bcis: &[u32],
) -> Vec<AsmElement> {
    let bci_to_label: BTreeMap<u32, Label> = labels
        .iter()
        .filter(|&label| labels.is_bound(label))
        .map(|label| (labels.bci_of(label).expect("just checked bound"), label))
        .collect();

    let mut out = Vec::with_capacity(elements.len());
    let mut position = 0usize;

    for element in elements {
        match element {
            CodeElement::Label(label) => out.push(AsmElement::Label(label)),
            CodeElement::ExceptionCatch {
                start,
                end,
                handler,
                catch_type,
            } => out.push(AsmElement::ExceptionCatch {
                start,
                end,
                handler,
                catch_type,
            }),
            CodeElement::LineNumber(line) => out.push(AsmElement::LineNumber(line)),
            CodeElement::LocalVariable(var) => out.push(AsmElement::LocalVariable(var)),
            CodeElement::LocalVariableType(var_type) => {
                out.push(AsmElement::LocalVariableType(var_type))
            }
            CodeElement::Pseudo(_) => {
                // derived/opaque data, not re-threaded through assembly
            }
            CodeElement::Instruction(instruction) => {
                let at = original_bcis.get(position).copied();
                position += 1;

                let targets = at.map(|at| instruction.branch_targets(at)).unwrap_or_default();
                let label_at = |target: i64| -> Label {
                    *bci_to_label
                        .get(&(target as u32))
                        .expect("rewrite_code: branch target has no bound label")
                };

                match instruction {
                    Instruction::GoTo(_) => out.push(AsmElement::Op(AsmOp::Goto(label_at(targets[0])))),
                    Instruction::Jsr(_) => out.push(AsmElement::Op(AsmOp::Jsr(label_at(targets[0])))),
                    Instruction::TableSwitch { low, high, .. } => {
                        let default = label_at(targets[0]);
                        let switch_targets = targets[1..].iter().map(|&t| label_at(t)).collect();
                        out.push(AsmElement::Op(AsmOp::TableSwitch {
                            default,
                            low,
                            high,
                            targets: switch_targets,
                        }));
                    }
                    Instruction::LookupSwitch { ref offsets, .. } => {
                        let default = label_at(targets[0]);
                        let switch_targets = offsets
                            .keys()
                            .zip(targets[1..].iter())
                            .map(|(&key, &t)| (key, label_at(t)))
                            .collect();
                        out.push(AsmElement::Op(AsmOp::LookupSwitch {
                            default,
                            targets: switch_targets,
                        }));
                    }
                    other => match if_kind_of(&other) {
                        Some(kind) => out.push(AsmElement::Op(AsmOp::If(kind, label_at(targets[0])))),
                        None => out.push(AsmElement::Op(AsmOp::Instruction(other))),
                    },
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;
    use classfile_core::{assemble, elements_of, AssemblerOptions, Exception};

    #[test]
    fn pass_through_preserves_a_backward_branch() {
        let mut instructions = BTreeMap::new();
        instructions.insert(0, Instruction::Nop);
        instructions.insert(1, Instruction::GoTo(-1));
        let original_bcis: Vec<u32> = instructions.keys().copied().collect();

        let view = elements_of(&instructions, &[], &[]);
        let mut transform = PassThrough;
        let transformed = apply_code_transform(view.elements, &mut transform);
        let asm = rewrite_code(transformed, &view.labels, &original_bcis);

        let mut labels = view.labels;
        let assembled = assemble(&asm, &mut labels, &AssemblerOptions::default()).unwrap();
        assert_eq!(assembled.instructions.len(), 2);
    }

    #[test]
    fn pass_through_preserves_an_exception_handler() {
        let mut instructions = BTreeMap::new();
        instructions.insert(0, Instruction::Nop);
        instructions.insert(1, Instruction::Return);
        instructions.insert(2, Instruction::AThrow);
        let original_bcis: Vec<u32> = instructions.keys().copied().collect();

        let exceptions = [Exception {
            start: 0,
            end: 1,
            handler: 2,
            catch_type: 0,
        }];

        let view = elements_of(&instructions, &exceptions, &[]);
        let mut transform = PassThrough;
        let transformed = apply_code_transform(view.elements, &mut transform);
        let asm = rewrite_code(transformed, &view.labels, &original_bcis);

        let mut labels = view.labels;
        let assembled = assemble(&asm, &mut labels, &AssemblerOptions::default()).unwrap();
        assert_eq!(assembled.exceptions.len(), 1);
    }

    struct PassThrough;
    impl CodeTransform for PassThrough {}
}
