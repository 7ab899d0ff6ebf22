//! The element-stream view of a `Code` attribute:
//! `Instruction | Label | ExceptionCatch | LineNumber | LocalVariable |
//! LocalVariableType | PseudoInstruction`, in source bci order with
//! labels interleaved at their bci.
//!
//! Nothing like this exists upstream (the original `basic` crate has no
//! label-based view at all, only the raw bci-keyed `Code` attribute);
//! this is new engineering, with the Rust encoding following the same
//! `BTreeMap<u32, _>` bci-ordering idiom already used in
//! `tree::Attribute::Code`.

use std::collections::{BTreeMap, BTreeSet};

use crate::label::{Label, LabelContext};
use crate::tree::*;

/// One element of a code stream. Branch instructions keep their raw,
/// JVMS-encoded delta (`Instruction::GoTo(i32)`, etc.) rather than a
/// resolved label; the *target* of a branch is found by computing
/// `at + delta` and looking up the label bound at that bci in the
/// same `LabelContext` this stream was built with.
#[derive(Debug)]
pub enum CodeElement {
    Instruction(Instruction),
    Label(Label),
    ExceptionCatch {
        start: Label,
        end: Label,
        handler: Label,
        /// `None` for a `finally` handler (catch_type index `0`).
        catch_type: Option<u16>,
    },
    LineNumber(u16),
    LocalVariable(LocalVariable),
    LocalVariableType(LocalVariableType),
    Pseudo(PseudoInstruction),
}

/// A Code sub-attribute with no dedicated element kind, carried
/// through the stream unchanged so a transform that doesn't care about
/// it can still pass it on. `StackMapTable` is deliberately excluded:
/// it is derived data, regenerated by `stackmap_gen` according to the
/// `stackMaps` option rather than threaded through the element stream.
#[derive(Debug)]
pub enum PseudoInstruction {
    Attribute(Attribute),
}

/// A decoded `Code` attribute body, as an element stream plus the
/// `LabelContext` that binds every `Label` the stream refers to.
pub struct CodeElements {
    pub labels: LabelContext,
    pub elements: Vec<CodeElement>,
}

/// Converts a bci-indexed `Code` attribute body into its element-stream
/// view. The inverse of `crate::assembler::assemble`.
pub fn elements_of(
    instructions: &BTreeMap<u32, Instruction>,
    exceptions: &[Exception],
    attributes: &[Attribute],
) -> CodeElements {
    let mut labels = LabelContext::new();
    let mut label_at: BTreeMap<u32, Label> = BTreeMap::new();

    let mut needed: BTreeSet<u32> = BTreeSet::new();
    for (&at, insn) in instructions {
        for target in insn.branch_targets(at) {
            if target >= 0 {
                needed.insert(target as u32);
            }
        }
    }
    for exception in exceptions {
        needed.insert(u32::from(exception.start));
        needed.insert(u32::from(exception.end));
        needed.insert(u32::from(exception.handler));
    }

    for bci in needed {
        let label = labels.new_label();
        labels
            .bind_label(label, bci)
            .expect("freshly minted label cannot already be bound");
        label_at.insert(bci, label);
    }

    let mut label_for = |labels: &mut LabelContext, label_at: &mut BTreeMap<u32, Label>, bci: u32| -> Label {
        if let Some(&label) = label_at.get(&bci) {
            return label;
        }
        let label = labels.new_label();
        labels
            .bind_label(label, bci)
            .expect("freshly minted label cannot already be bound");
        label_at.insert(bci, label);
        label
    };

    let mut elements = Vec::new();

    for exception in exceptions {
        elements.push(CodeElement::ExceptionCatch {
            start: label_for(&mut labels, &mut label_at, u32::from(exception.start)),
            end: label_for(&mut labels, &mut label_at, u32::from(exception.end)),
            handler: label_for(&mut labels, &mut label_at, u32::from(exception.handler)),
            catch_type: (exception.catch_type != 0).then_some(exception.catch_type),
        });
    }

    // group per-bci sub-attribute entries so they can be interleaved
    // right before the instruction at their `start` bci
    let mut pending: BTreeMap<u32, Vec<CodeElement>> = BTreeMap::new();
    let mut passthrough = Vec::new();

    for attribute in attributes {
        match attribute {
            Attribute::LineNumberTable(table) => {
                for entry in table {
                    pending
                        .entry(u32::from(entry.start))
                        .or_default()
                        .push(CodeElement::LineNumber(entry.line_number));
                }
            }
            Attribute::LocalVariableTable(table) => {
                for entry in table {
                    pending
                        .entry(u32::from(entry.start))
                        .or_default()
                        .push(CodeElement::LocalVariable(*entry));
                }
            }
            Attribute::LocalVariableTypeTable(table) => {
                for entry in table {
                    pending
                        .entry(u32::from(entry.start))
                        .or_default()
                        .push(CodeElement::LocalVariableType(*entry));
                }
            }
            Attribute::StackMapTable(_) => {
                // regenerated on assembly, never threaded through
            }
            other => passthrough.push(CodeElement::Pseudo(PseudoInstruction::Attribute(
                other.clone(),
            ))),
        }
    }

    elements.extend(passthrough);

    for (&at, insn) in instructions {
        if let Some(&label) = label_at.get(&at) {
            elements.push(CodeElement::Label(label));
        }
        if let Some(extra) = pending.remove(&at) {
            elements.extend(extra);
        }
        elements.push(CodeElement::Instruction(insn.clone()));
    }

    CodeElements { labels, elements }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn straight_line_code_has_no_labels() {
        let mut instructions = BTreeMap::new();
        instructions.insert(0, Instruction::IConst0);
        instructions.insert(1, Instruction::IReturn);

        let view = elements_of(&instructions, &[], &[]);
        assert!(view.labels.is_empty());
        assert_eq!(view.elements.len(), 2);
    }

    #[test]
    fn backward_branch_target_gets_a_label() {
        let mut instructions = BTreeMap::new();
        instructions.insert(0, Instruction::Nop);
        instructions.insert(1, Instruction::GoTo(-1));

        let view = elements_of(&instructions, &[], &[]);
        assert_eq!(view.labels.len(), 1);
        assert!(matches!(view.elements[0], CodeElement::Label(_)));
        assert!(matches!(view.elements[1], CodeElement::Instruction(Instruction::Nop)));
    }

    #[test]
    fn exception_handler_bcis_get_labels() {
        let mut instructions = BTreeMap::new();
        instructions.insert(0, Instruction::Nop);
        instructions.insert(1, Instruction::Return);
        instructions.insert(2, Instruction::AThrow);

        let exceptions = [Exception {
            start: 0,
            end: 1,
            handler: 2,
            catch_type: 0,
        }];

        let view = elements_of(&instructions, &exceptions, &[]);
        assert_eq!(view.labels.len(), 3);
        assert!(matches!(view.elements[0], CodeElement::ExceptionCatch { .. }));
    }

    #[test]
    fn line_numbers_interleave_before_their_instruction() {
        let mut instructions = BTreeMap::new();
        instructions.insert(0, Instruction::IConst0);
        instructions.insert(1, Instruction::IReturn);

        let attributes = [Attribute::LineNumberTable(vec![LineNumber {
            start: 1,
            line_number: 10,
        }])];

        let view = elements_of(&instructions, &[], &attributes);
        let positions: Vec<_> = view
            .elements
            .iter()
            .map(|e| matches!(e, CodeElement::LineNumber(_)))
            .collect();
        assert_eq!(positions, vec![false, true, true]);
    }
}
