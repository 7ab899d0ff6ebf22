//! Converts a builder-side element stream — instructions whose branch
//! targets are `Label`s, not yet-known deltas — into the bci-keyed
//! `Instruction` map that `writer::code` already knows how to encode.
//!
//! Building a `Code` attribute from scratch means branch targets are
//! only known as labels until layout settles, so this runs a sizing
//! fixpoint before a single emission pass produces concrete
//! instructions. It deliberately reuses `writer::code::write_instruction`
//! to size instructions during the fixpoint, so the sizing pass and
//! the real emission pass can never disagree about how long an
//! instruction encodes to.

use std::collections::BTreeMap;

use crate::encode::Encoder;
use crate::label::{Label, LabelContext};
use crate::result::*;
use crate::tree::*;
use crate::writer::code::write_instruction;

/// One conditional-branch family member, kept distinct from
/// `tree::Instruction` so the assembler can invert it when a long jump
/// is needed (JVMS has no wide encoding for conditional branches).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfKind {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
    ICmpEq,
    ICmpNe,
    ICmpLt,
    ICmpGe,
    ICmpGt,
    ICmpLe,
    ACmpEq,
    ACmpNe,
    Null,
    NonNull,
}

impl IfKind {
    fn invert(self) -> IfKind {
        use IfKind::*;
        match self {
            Eq => Ne,
            Ne => Eq,
            Lt => Ge,
            Ge => Lt,
            Gt => Le,
            Le => Gt,
            ICmpEq => ICmpNe,
            ICmpNe => ICmpEq,
            ICmpLt => ICmpGe,
            ICmpGe => ICmpLt,
            ICmpGt => ICmpLe,
            ICmpLe => ICmpGt,
            ACmpEq => ACmpNe,
            ACmpNe => ACmpEq,
            Null => NonNull,
            NonNull => Null,
        }
    }

    fn build(self, delta: i16) -> Instruction {
        use IfKind::*;
        match self {
            Eq => Instruction::IfEq(delta),
            Ne => Instruction::IfNE(delta),
            Lt => Instruction::IfLT(delta),
            Ge => Instruction::IfGE(delta),
            Gt => Instruction::IfGT(delta),
            Le => Instruction::IfLE(delta),
            ICmpEq => Instruction::IfICmpEq(delta),
            ICmpNe => Instruction::IfICmpNE(delta),
            ICmpLt => Instruction::IfICmpLT(delta),
            ICmpGe => Instruction::IfICmpGE(delta),
            ICmpGt => Instruction::IfICmpGT(delta),
            ICmpLe => Instruction::IfICmpLE(delta),
            ACmpEq => Instruction::IfACmpEq(delta),
            ACmpNe => Instruction::IfACmpNE(delta),
            Null => Instruction::IfNull(delta),
            NonNull => Instruction::IfNonNull(delta),
        }
    }
}

/// A unit of the builder-side element stream that contributes bytes to
/// the assembled `Code` body. Everything that is not a branch is
/// passed straight through as a concrete `Instruction`; branches carry
/// a `Label` target instead of a delta.
#[derive(Debug)]
pub enum AsmOp {
    Instruction(Instruction),
    Goto(Label),
    Jsr(Label),
    If(IfKind, Label),
    TableSwitch {
        default: Label,
        low: i32,
        high: i32,
        targets: Vec<Label>,
    },
    LookupSwitch {
        default: Label,
        targets: BTreeMap<i32, Label>,
    },
}

/// The non-byte-contributing elements a builder also emits into the
/// same stream, interleaved with `AsmOp`s.
#[derive(Debug)]
pub enum AsmElement {
    Op(AsmOp),
    Label(Label),
    ExceptionCatch {
        start: Label,
        end: Label,
        handler: Label,
        catch_type: Option<u16>,
    },
    LineNumber(u16),
    LocalVariable(LocalVariable),
    LocalVariableType(LocalVariableType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortJumps {
    FixShortJumps,
    FailOnShortJumps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadCode {
    PatchDeadCode,
    KeepDeadCode,
    FailOnDeadCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadLabels {
    FailOnDeadLabels,
    DropDeadLabels,
}

#[derive(Debug, Clone, Copy)]
pub struct AssemblerOptions {
    pub short_jumps: ShortJumps,
    pub dead_code: DeadCode,
    pub dead_labels: DeadLabels,
}

impl Default for AssemblerOptions {
    fn default() -> AssemblerOptions {
        AssemblerOptions {
            short_jumps: ShortJumps::FixShortJumps,
            dead_code: DeadCode::PatchDeadCode,
            dead_labels: DeadLabels::FailOnDeadLabels,
        }
    }
}

/// The fully resolved product of assembly: a `Code` attribute's raw
/// fields, ready for `writer::write_attribute` or a further
/// `stackmap_gen` pass.
pub struct Assembled {
    pub instructions: BTreeMap<u32, Instruction>,
    pub exceptions: Vec<Exception>,
    /// `LineNumberTable`/`LocalVariableTable`/`LocalVariableTypeTable`,
    /// rebuilt from the `LineNumber`/`LocalVariable`/`LocalVariableType`
    /// elements in the input stream, one entry per non-empty table.
    pub attributes: Vec<Attribute>,
    /// The first bci of each dead range `patch_dead_code` replaced with
    /// a `nop*; athrow` stub, in ascending order. Empty unless
    /// `DeadCode::PatchDeadCode` was in effect and dead code was found.
    /// `stackmap_gen::generate` needs these to seed a `Throwable`-only
    /// frame at each one, since nothing in the reachable control-flow
    /// graph ever flows into them on its own.
    pub dead_labels: Vec<u32>,
}

const MAX_FIXPOINT_ITERATIONS: usize = 65536;

/// A single op in the sizing pass's worklist. `promoted` tracks an
/// `If` op that has been widened to inverted-branch-plus-`goto_w`;
/// once promoted an op never shrinks back, which is what guarantees
/// the fixpoint terminates.
enum SizedOp {
    Plain(Instruction),
    Goto(Label),
    Jsr(Label),
    If { kind: IfKind, target: Label, promoted: bool },
    TableSwitch {
        default: Label,
        low: i32,
        high: i32,
        targets: Vec<Label>,
    },
    LookupSwitch {
        default: Label,
        targets: BTreeMap<i32, Label>,
    },
}

impl SizedOp {
    fn targets(&self) -> Vec<Label> {
        match self {
            SizedOp::Plain(_) => Vec::new(),
            SizedOp::Goto(l) | SizedOp::Jsr(l) => vec![*l],
            SizedOp::If { target, .. } => vec![*target],
            SizedOp::TableSwitch { default, targets, .. } => {
                let mut v = vec![*default];
                v.extend(targets.iter().copied());
                v
            }
            SizedOp::LookupSwitch { default, targets } => {
                let mut v = vec![*default];
                v.extend(targets.values().copied());
                v
            }
        }
    }
}

/// Converts an `AsmElement` stream into the bci-keyed `Instruction` map
/// `writer::code` emits. `labels` must already contain every `Label`
/// referenced by the stream (freshly minted ones bind here as they are
/// encountered).
pub fn assemble(
    elements: &[AsmElement],
    labels: &mut LabelContext,
    options: &AssemblerOptions,
) -> Result<Assembled> {
    let mut ops = Vec::new();
    let mut labels_before: Vec<Vec<Label>> = Vec::new();
    let mut pending_labels = Vec::new();
    let mut exception_specs = Vec::new();
    let mut debug_at: BTreeMap<usize, Vec<DebugEntry>> = BTreeMap::new();

    for element in elements {
        match element {
            AsmElement::Label(label) => pending_labels.push(*label),
            AsmElement::ExceptionCatch {
                start,
                end,
                handler,
                catch_type,
            } => exception_specs.push((*start, *end, *handler, *catch_type)),
            AsmElement::LineNumber(line) => {
                debug_at
                    .entry(ops.len())
                    .or_default()
                    .push(DebugEntry::Line(*line));
            }
            AsmElement::LocalVariable(var) => {
                debug_at
                    .entry(ops.len())
                    .or_default()
                    .push(DebugEntry::Var(*var));
            }
            AsmElement::LocalVariableType(var) => {
                debug_at
                    .entry(ops.len())
                    .or_default()
                    .push(DebugEntry::VarType(*var));
            }
            AsmElement::Op(op) => {
                labels_before.push(std::mem::take(&mut pending_labels));
                ops.push(to_sized(op));
            }
        }
    }
    let trailing_labels = pending_labels;

    // sizing fixpoint: provisional bcis, widening `If` ops that
    // overflow the short form until nothing changes.
    let mut sizes = vec![0u32; ops.len()];
    let mut bcis = vec![0u32; ops.len() + 1];
    for iteration in 0..MAX_FIXPOINT_ITERATIONS {
        let mut bci = 0u32;
        for (i, op) in ops.iter().enumerate() {
            bcis[i] = bci;
            sizes[i] = op_size(op, bci);
            bci += sizes[i];
        }
        bcis[ops.len()] = bci;

        // any label never emitted into the stream and never otherwise
        // bound is dead; apply policy once, up front, so both the
        // widening decision below and the final emission pass agree
        for op in &ops {
            for target in op.targets() {
                check_dead_label(labels, &bcis, &labels_before, target, options.dead_labels)?;
            }
        }

        let mut changed = false;
        for (i, op) in ops.iter_mut().enumerate() {
            if let SizedOp::If { kind: _, target, promoted } = op {
                if !*promoted {
                    let target_bci = resolve_provisional(labels, &bcis, &labels_before, *target);
                    if let Some(target_bci) = target_bci {
                        let delta = target_bci as i64 - bcis[i] as i64;
                        if delta < i16::MIN as i64 || delta > i16::MAX as i64 {
                            match options.short_jumps {
                                ShortJumps::FixShortJumps => {
                                    *promoted = true;
                                    changed = true;
                                }
                                ShortJumps::FailOnShortJumps => return Err(Error::ShortJumpOverflow),
                            }
                        }
                    }
                }
            }
        }
        if !changed {
            break;
        }
        if iteration == MAX_FIXPOINT_ITERATIONS - 1 {
            return Err(Error::FixupDidNotConverge);
        }
    }

    // bind every label to its final provisional bci
    for (i, labels_here) in labels_before.iter().enumerate() {
        for label in labels_here {
            labels.bind_label(*label, bcis[i])?;
        }
    }
    for label in &trailing_labels {
        labels.bind_label(*label, bcis[ops.len()])?;
    }

    // single emission pass
    let mut instructions = BTreeMap::new();
    for (i, op) in ops.iter().enumerate() {
        let at = bcis[i];
        match op {
            SizedOp::Plain(insn) => {
                instructions.insert(at, clone_plain(insn));
            }
            SizedOp::Goto(target) => {
                let target_bci = resolved_bci(labels, *target, at)?;
                instructions.insert(at, Instruction::GoTo(target_bci as i64 as i32 - at as i32));
            }
            SizedOp::Jsr(target) => {
                let target_bci = resolved_bci(labels, *target, at)?;
                instructions.insert(at, Instruction::Jsr(target_bci as i64 as i32 - at as i32));
            }
            SizedOp::If { kind, target, promoted } => {
                let target_bci = resolved_bci(labels, *target, at)?;
                let delta = target_bci as i64 - at as i64;
                if *promoted {
                    // inverted-condition skips over the goto_w that
                    // does the real, long jump
                    let goto_at = at + 3;
                    instructions.insert(at, kind.invert().build(3));
                    instructions.insert(goto_at, Instruction::GoTo(target_bci as i64 as i32 - goto_at as i32));
                } else {
                    instructions.insert(at, kind.build(delta as i16));
                }
            }
            SizedOp::TableSwitch {
                default,
                low,
                high,
                targets,
            } => {
                let default_bci = resolved_bci(labels, *default, at)? as i64 - at as i64;
                let offsets = targets
                    .iter()
                    .map(|t| Ok(resolved_bci(labels, *t, at)? as i64 as i32 - at as i32))
                    .collect::<Result<Vec<i32>>>()?;
                instructions.insert(
                    at,
                    Instruction::TableSwitch {
                        default: default_bci as i32,
                        low: *low,
                        high: *high,
                        offsets,
                    },
                );
            }
            SizedOp::LookupSwitch { default, targets } => {
                let default_bci = resolved_bci(labels, *default, at)? as i64 - at as i64;
                let mut offsets = BTreeMap::new();
                for (&key, target) in targets {
                    offsets.insert(key, resolved_bci(labels, *target, at)? as i64 as i32 - at as i32);
                }
                instructions.insert(
                    at,
                    Instruction::LookupSwitch {
                        default: default_bci as i32,
                        offsets,
                    },
                );
            }
        }
    }

    let exceptions = exception_specs
        .into_iter()
        .map(|(start, end, handler, catch_type)| {
            Ok(Exception {
                start: labels.bci_of(start)? as u16,
                end: labels.bci_of(end)? as u16,
                handler: labels.bci_of(handler)? as u16,
                catch_type: catch_type.unwrap_or(0),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let dead_labels = if matches!(options.dead_code, DeadCode::FailOnDeadCode | DeadCode::PatchDeadCode) {
        let code_length = bcis[ops.len()];
        patch_dead_code(&mut instructions, &exceptions, code_length, options.dead_code)?
    } else {
        Vec::new()
    };

    let attributes = debug_attributes(&debug_at, &bcis);

    Ok(Assembled {
        instructions,
        exceptions,
        attributes,
        dead_labels,
    })
}

/// Rebuilds `LineNumberTable`/`LocalVariableTable`/`LocalVariableTypeTable`
/// from the debug elements collected during the walk above. A
/// `LineNumber` only carries a line number — its bci is the position at
/// which it was encountered, looked up in `bcis`; a `LocalVariable`/
/// `LocalVariableType` already carries its own concrete start/length
/// (ranges are given as bcis by the builder, not as label pairs), so
/// those are threaded through unchanged regardless of position.
fn debug_attributes(debug_at: &BTreeMap<usize, Vec<DebugEntry>>, bcis: &[u32]) -> Vec<Attribute> {
    let mut lines = Vec::new();
    let mut vars = Vec::new();
    let mut var_types = Vec::new();
    for (&position, entries) in debug_at {
        let bci = bcis[position];
        for entry in entries {
            match entry {
                DebugEntry::Line(line_number) => lines.push(LineNumber {
                    start: bci as u16,
                    line_number: *line_number,
                }),
                DebugEntry::Var(var) => vars.push(*var),
                DebugEntry::VarType(var_type) => var_types.push(*var_type),
            }
        }
    }
    let mut attributes = Vec::new();
    if !lines.is_empty() {
        attributes.push(Attribute::LineNumberTable(lines));
    }
    if !vars.is_empty() {
        attributes.push(Attribute::LocalVariableTable(vars));
    }
    if !var_types.is_empty() {
        attributes.push(Attribute::LocalVariableTypeTable(var_types));
    }
    attributes
}

enum DebugEntry {
    Line(u16),
    Var(LocalVariable),
    VarType(LocalVariableType),
}

fn to_sized(op: &AsmOp) -> SizedOp {
    match op {
        AsmOp::Instruction(insn) => SizedOp::Plain(clone_plain(insn)),
        AsmOp::Goto(l) => SizedOp::Goto(*l),
        AsmOp::Jsr(l) => SizedOp::Jsr(*l),
        AsmOp::If(kind, l) => SizedOp::If {
            kind: *kind,
            target: *l,
            promoted: false,
        },
        AsmOp::TableSwitch {
            default,
            low,
            high,
            targets,
        } => SizedOp::TableSwitch {
            default: *default,
            low: *low,
            high: *high,
            targets: targets.clone(),
        },
        AsmOp::LookupSwitch { default, targets } => SizedOp::LookupSwitch {
            default: *default,
            targets: targets.clone(),
        },
    }
}

/// `Instruction` is `Clone`, but `to_sized` takes `&AsmOp` rather than
/// consuming it, so instructions embedded by value still need copying
/// out; named distinctly from `.clone()` call sites to read as
/// intentional rather than incidental.
fn clone_plain(insn: &Instruction) -> Instruction {
    insn.clone()
}

/// `None` only when `DropDeadLabels` is in effect and the target was
/// never bound; `check_dead_label` has already rejected everything
/// else.
fn resolve_provisional(
    labels: &LabelContext,
    bcis: &[u32],
    labels_before: &[Vec<Label>],
    target: Label,
) -> Option<u32> {
    for (i, here) in labels_before.iter().enumerate() {
        if here.contains(&target) {
            return Some(bcis[i]);
        }
    }
    if labels.is_bound(target) {
        return labels.bci_of(target).ok();
    }
    None
}

fn check_dead_label(
    labels: &LabelContext,
    bcis: &[u32],
    labels_before: &[Vec<Label>],
    target: Label,
    policy: DeadLabels,
) -> Result<()> {
    if resolve_provisional(labels, bcis, labels_before, target).is_some() {
        return Ok(());
    }
    match policy {
        DeadLabels::FailOnDeadLabels => Err(Error::DeadLabel),
        DeadLabels::DropDeadLabels => Ok(()),
    }
}

/// Resolves a branch target to an absolute bci for the final emission
/// pass. A label left dangling under `DropDeadLabels` resolves to `at`
/// itself (a zero-delta, effectively a no-op branch) since there is no
/// meaningful target bci to emit.
fn resolved_bci(labels: &LabelContext, target: Label, at: u32) -> Result<u32> {
    if labels.is_bound(target) {
        labels.bci_of(target)
    } else {
        Ok(at)
    }
}

/// Byte length of a single sized op at a known provisional bci, found
/// by actually running the real encoder over it — the sizing pass and
/// the emission pass can never disagree this way.
fn op_size(op: &SizedOp, at: u32) -> u32 {
    let mut probe = Encoder::new();
    let insn = match op {
        SizedOp::Plain(insn) => clone_plain(insn),
        SizedOp::Goto(_) => Instruction::GoTo(0),
        SizedOp::Jsr(_) => Instruction::Jsr(0),
        SizedOp::If { kind, promoted, .. } => {
            if *promoted {
                // inverted-if (3) + goto_w (5), computed directly since
                // it is two instructions, not one
                let mut enc = Encoder::new();
                write_instruction(&mut enc, at, &kind.invert().build(3)).expect("fixed-size op");
                write_instruction(&mut enc, at + 3, &Instruction::GoTo(i32::MAX)).expect("fixed-size op");
                return enc.size() as u32;
            }
            kind.build(0)
        }
        SizedOp::TableSwitch { default, low, high, targets } => {
            let _ = default;
            Instruction::TableSwitch {
                default: 0,
                low: *low,
                high: *high,
                offsets: vec![0; targets.len()],
            }
        }
        SizedOp::LookupSwitch { targets, .. } => Instruction::LookupSwitch {
            default: 0,
            offsets: targets.keys().map(|&k| (k, 0)).collect(),
        },
    };
    write_instruction(&mut probe, at, &insn).expect("fixed-size op");
    probe.size() as u32
}

/// Walks forward from bci 0 and each exception handler, following
/// control flow, to find bytecode no reachable path ever executes.
/// Unreachable ranges between a terminator and the next instruction
/// are either left alone, replaced with a `nop*; athrow` stub, or
/// reported, per `DeadCode` policy. Returns the first bci of each
/// range it replaced, so a stack map generator can seed a frame there.
fn patch_dead_code(
    instructions: &mut BTreeMap<u32, Instruction>,
    exceptions: &[Exception],
    code_length: u32,
    policy: DeadCode,
) -> Result<Vec<u32>> {
    let bcis: Vec<u32> = instructions.keys().copied().collect();
    if bcis.is_empty() {
        return Ok(Vec::new());
    }

    let mut reachable = std::collections::BTreeSet::new();
    let mut worklist = vec![0u32];
    for exception in exceptions {
        worklist.push(exception.handler.into());
    }

    while let Some(at) = worklist.pop() {
        if !reachable.insert(at) {
            continue;
        }
        let Some(insn) = instructions.get(&at) else {
            continue;
        };
        for target in insn.branch_targets(at) {
            if target >= 0 {
                worklist.push(target as u32);
            }
        }
        if !insn.is_unconditional_terminator() {
            if let Some(&next) = bcis.iter().find(|&&b| b > at) {
                worklist.push(next);
            }
        }
    }

    if bcis.iter().all(|at| reachable.contains(at)) {
        return Ok(Vec::new());
    }
    if policy == DeadCode::FailOnDeadCode {
        return Err(Error::DeadCode);
    }

    // Each maximal run of consecutive dead keys covers one contiguous
    // byte range, since the original instructions packed back-to-back
    // with no gaps. Refill that whole range byte-for-byte with `nop`,
    // with `athrow` only on the final byte, so the total length (and
    // every later bci that depends on it: branch targets, exception
    // bounds, line numbers) never shifts.
    let mut dead_labels = Vec::new();
    let mut i = 0;
    while i < bcis.len() {
        if reachable.contains(&bcis[i]) {
            i += 1;
            continue;
        }
        let start = bcis[i];
        let mut j = i;
        while j < bcis.len() && !reachable.contains(&bcis[j]) {
            instructions.remove(&bcis[j]);
            j += 1;
        }
        let end = if j < bcis.len() { bcis[j] } else { code_length };

        for pos in start..end {
            let insn = if pos + 1 == end { Instruction::AThrow } else { Instruction::Nop };
            instructions.insert(pos, insn);
        }
        dead_labels.push(start);
        i = j;
    }
    Ok(dead_labels)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn straight_line_code_needs_no_widening() {
        let mut labels = LabelContext::new();
        let elements = vec![
            AsmElement::Op(AsmOp::Instruction(Instruction::IConst0)),
            AsmElement::Op(AsmOp::Instruction(Instruction::IReturn)),
        ];
        let assembled = assemble(&elements, &mut labels, &AssemblerOptions::default()).unwrap();
        assert_eq!(assembled.instructions.len(), 2);
        assert!(matches!(assembled.instructions[&0], Instruction::IConst0));
        assert!(matches!(assembled.instructions[&1], Instruction::IReturn));
    }

    #[test]
    fn forward_goto_resolves_to_a_positive_delta() {
        let mut labels = LabelContext::new();
        let target = labels.new_label();
        let elements = vec![
            AsmElement::Op(AsmOp::Goto(target)),
            AsmElement::Op(AsmOp::Instruction(Instruction::Nop)),
            AsmElement::Label(target),
            AsmElement::Op(AsmOp::Instruction(Instruction::Return)),
        ];
        let assembled = assemble(&elements, &mut labels, &AssemblerOptions::default()).unwrap();
        assert!(matches!(assembled.instructions[&0], Instruction::GoTo(4)));
    }

    #[test]
    fn backward_if_resolves_to_a_negative_delta() {
        let mut labels = LabelContext::new();
        let top = labels.new_label();
        let elements = vec![
            AsmElement::Label(top),
            AsmElement::Op(AsmOp::Instruction(Instruction::IConst0)),
            AsmElement::Op(AsmOp::If(IfKind::Eq, top)),
        ];
        let assembled = assemble(&elements, &mut labels, &AssemblerOptions::default()).unwrap();
        assert!(matches!(assembled.instructions[&1], Instruction::IfEq(-1)));
    }

    #[test]
    fn dead_label_fails_by_default() {
        let mut labels = LabelContext::new();
        let dangling = labels.new_label();
        let elements = vec![AsmElement::Op(AsmOp::Goto(dangling))];
        let result = assemble(&elements, &mut labels, &AssemblerOptions::default());
        assert!(matches!(result, Err(Error::DeadLabel)));
    }

    #[test]
    fn unreachable_code_after_return_is_patched_to_athrow() {
        let mut labels = LabelContext::new();
        let elements = vec![
            AsmElement::Op(AsmOp::Instruction(Instruction::Return)),
            AsmElement::Op(AsmOp::Instruction(Instruction::IConst0)),
        ];
        let assembled = assemble(&elements, &mut labels, &AssemblerOptions::default()).unwrap();
        assert!(matches!(assembled.instructions[&1], Instruction::AThrow));
        assert_eq!(assembled.dead_labels, vec![1]);
    }

    #[test]
    fn multi_byte_dead_instruction_is_nop_padded_not_shrunk() {
        // bci 0: goto skip (3 bytes, terminator) — skips over dead code
        // bci 3: bipush 7 (2 bytes, dead — nothing ever branches here)
        // bci 5: skip: return (1 byte, live)
        let mut labels = LabelContext::new();
        let skip = labels.new_label();
        let elements = vec![
            AsmElement::Op(AsmOp::Goto(skip)),
            AsmElement::Op(AsmOp::Instruction(Instruction::BIPush(7))),
            AsmElement::Label(skip),
            AsmElement::Op(AsmOp::Instruction(Instruction::Return)),
        ];
        let assembled = assemble(&elements, &mut labels, &AssemblerOptions::default()).unwrap();

        // the 2-byte dead range [3, 5) must fill every byte, not collapse
        // to a single byte the way a naive instruction-for-instruction
        // replacement would — that would shift every later bci.
        assert!(matches!(assembled.instructions[&3], Instruction::Nop));
        assert!(matches!(assembled.instructions[&4], Instruction::AThrow));
        assert!(matches!(assembled.instructions[&5], Instruction::Return));
        assert_eq!(assembled.dead_labels, vec![3]);
    }
}
