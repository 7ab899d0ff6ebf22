//! `StackMapGenerator`: abstract interpretation over verification types,
//! producing the `StackMapTable` frames JVMS 4.10.1 requires for class
//! files targeting version 50 and above.
//!
//! Generating a `StackMapTable` from scratch means walking every
//! instruction's effect on the type state of the operand stack and
//! locals, merging at every point two or more control-flow edges meet.
//! The worklist/merge structure follows the textbook data-flow-over-a-CFG
//! shape already used for reachability in `assembler::patch_dead_code`;
//! the verification type lattice and the `classHierarchyResolver`
//! injection point are specific to this module.

use std::collections::{BTreeMap, VecDeque};

use crate::constpool::ConstantPool;
use crate::result::*;
use crate::tree::*;

/// `(this_class, other_class) -> common_superclass`, both as internal
/// (slash-separated) binary names. Returning `None` means "unknown";
/// the generator then falls back to `java/lang/Object` rather than
/// failing, since a sound join in general requires a classpath oracle
/// this crate does not own.
pub type ClassHierarchyResolver<'a> = dyn Fn(&str, &str) -> Option<String> + 'a;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackMapsOption {
    StackMapsWhenRequired,
    AlwaysGenerate,
    DropStackMaps,
}

/// Whether a `Code` attribute needs a generated `StackMapTable`, given
/// the enclosing class's major version and the configured option.
pub fn requires_stack_maps(major_version: u16, option: StackMapsOption) -> bool {
    match option {
        StackMapsOption::DropStackMaps => false,
        StackMapsOption::AlwaysGenerate => true,
        StackMapsOption::StackMapsWhenRequired => major_version >= 50,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    locals: Vec<VerificationType>,
    stack: Vec<VerificationType>,
}

/// Generates the `StackMapFrame` sequence for one method body.
///
/// `initial_locals` are the verification types of the method's
/// parameters (and `this`, already included by the caller for instance
/// methods), in slot order with wide types occupying one entry each.
///
/// `dead_labels` are bcis `assembler::patch_dead_code` replaced with a
/// `nop*; athrow` stub. Nothing in the reachable control-flow graph
/// flows into one of these on its own, so each gets its frame seeded
/// directly here: empty locals, one `Throwable` on the stack, per
/// JVMS 4.10.1's treatment of unreachable code.
pub fn generate(
    instructions: &BTreeMap<u32, Instruction>,
    exceptions: &[Exception],
    initial_locals: Vec<VerificationType>,
    dead_labels: &[u32],
    pool: &mut ConstantPool,
    resolver: &ClassHierarchyResolver<'_>,
) -> Result<Vec<StackMapFrame>> {
    if instructions.is_empty() {
        return Ok(Vec::new());
    }

    let bcis: Vec<u32> = instructions.keys().copied().collect();
    let next_bci = |at: u32| -> Option<u32> { bcis.iter().copied().find(|&b| b > at) };

    let mut targets: std::collections::BTreeSet<u32> = std::collections::BTreeSet::new();
    for (&at, insn) in instructions {
        for target in insn.branch_targets(at) {
            if target >= 0 {
                targets.insert(target as u32);
            }
        }
    }
    for exception in exceptions {
        targets.insert(u32::from(exception.handler));
    }
    for &dead_at in dead_labels {
        targets.insert(dead_at);
    }

    let mut frame_in: BTreeMap<u32, Frame> = BTreeMap::new();
    let mut worklist: VecDeque<u32> = VecDeque::new();

    frame_in.insert(
        0,
        Frame {
            locals: initial_locals,
            stack: Vec::new(),
        },
    );
    worklist.push_back(0);

    for &dead_at in dead_labels {
        let throwable = VerificationType::Object(pool.push_class("java/lang/Throwable")?);
        frame_in.insert(
            dead_at,
            Frame {
                locals: Vec::new(),
                stack: vec![throwable],
            },
        );
    }

    for exception in exceptions {
        let catch_type = match exception.catch_type {
            0 => VerificationType::Object(pool.push_class("java/lang/Throwable")?),
            index => VerificationType::Object(pool.get_class_name(index).map(|_| index)?),
        };
        let handler_bci = u32::from(exception.handler);
        let seed = Frame {
            locals: frame_in
                .get(&0)
                .map(|f| f.locals.clone())
                .unwrap_or_default(),
            stack: vec![catch_type],
        };
        if merge(&mut frame_in, handler_bci, seed, pool, resolver)? {
            worklist.push_back(handler_bci);
        }
    }

    while let Some(at) = worklist.pop_front() {
        let Some(insn) = instructions.get(&at) else {
            continue;
        };
        let frame = frame_in
            .get(&at)
            .cloned()
            .expect("frame_in seeded before enqueueing");
        let out = apply_effect(insn, &frame, pool)?;

        let mut successors = insn.branch_targets(at).into_iter().filter(|t| *t >= 0).map(|t| t as u32).collect::<Vec<_>>();
        if !insn.is_unconditional_terminator() {
            if let Some(fallthrough) = next_bci(at) {
                successors.push(fallthrough);
            }
        }

        for succ in successors {
            if merge(&mut frame_in, succ, out.clone(), pool, resolver)? {
                worklist.push_back(succ);
            }
        }
    }

    let mut frames = Vec::new();
    let mut previous_bci: i64 = -1;
    let mut previous_locals: Vec<VerificationType> = Vec::new();
    for &bci in &targets {
        if bci == 0 {
            continue;
        }
        let Some(frame) = frame_in.get(&bci) else {
            continue;
        };
        let offset_delta = if previous_bci < 0 {
            bci
        } else {
            bci - previous_bci as u32 - 1
        };
        frames.push(encode_frame(offset_delta, &previous_locals, frame));
        previous_bci = bci as i64;
        previous_locals = frame.locals.clone();
    }

    Ok(frames)
}

fn encode_frame(offset_delta: u32, previous_locals: &[VerificationType], frame: &Frame) -> StackMapFrame {
    let offset_delta = offset_delta as u16;
    if frame.stack.is_empty() && frame.locals == previous_locals {
        return StackMapFrame::Same { offset_delta };
    }
    if frame.stack.len() == 1 && frame.locals == previous_locals {
        return StackMapFrame::Same1 {
            offset_delta,
            stack: frame.stack[0],
        };
    }
    if frame.stack.is_empty() && frame.locals.len() < previous_locals.len() {
        let common = frame.locals.len().min(previous_locals.len());
        if frame.locals[..] == previous_locals[..common] && previous_locals.len() - frame.locals.len() <= 3 {
            return StackMapFrame::Chop {
                offset_delta,
                count: (previous_locals.len() - frame.locals.len()) as u8,
            };
        }
    }
    if frame.stack.is_empty() && frame.locals.len() > previous_locals.len() {
        let appended = frame.locals.len() - previous_locals.len();
        if appended <= 3 && frame.locals[..previous_locals.len()] == previous_locals[..] {
            return StackMapFrame::Append {
                offset_delta,
                locals: frame.locals[previous_locals.len()..].to_vec(),
            };
        }
    }
    StackMapFrame::Full {
        offset_delta,
        locals: frame.locals.clone(),
        stack: frame.stack.clone(),
    }
}

/// Joins `incoming` into the frame already recorded at `at`, if any.
/// Returns whether the stored frame changed (and thus whether `at`
/// needs to be (re-)walked).
fn merge(
    frame_in: &mut BTreeMap<u32, Frame>,
    at: u32,
    incoming: Frame,
    pool: &mut ConstantPool,
    resolver: &ClassHierarchyResolver<'_>,
) -> Result<bool> {
    match frame_in.get(&at) {
        None => {
            frame_in.insert(at, incoming);
            Ok(true)
        }
        Some(existing) => {
            let joined = join_frames(existing, &incoming, pool, resolver)?;
            if &joined == existing {
                Ok(false)
            } else {
                frame_in.insert(at, joined);
                Ok(true)
            }
        }
    }
}

fn join_frames(
    a: &Frame,
    b: &Frame,
    pool: &mut ConstantPool,
    resolver: &ClassHierarchyResolver<'_>,
) -> Result<Frame> {
    let len = a.locals.len().min(b.locals.len());
    let mut locals = Vec::with_capacity(len);
    for i in 0..len {
        locals.push(join_type(a.locals[i], b.locals[i], pool, resolver)?);
    }
    let mut stack = Vec::with_capacity(a.stack.len().min(b.stack.len()));
    for i in 0..a.stack.len().min(b.stack.len()) {
        stack.push(join_type(a.stack[i], b.stack[i], pool, resolver)?);
    }
    Ok(Frame { locals, stack })
}

fn join_type(
    a: VerificationType,
    b: VerificationType,
    pool: &mut ConstantPool,
    resolver: &ClassHierarchyResolver<'_>,
) -> Result<VerificationType> {
    use VerificationType::*;
    if a == b {
        return Ok(a);
    }
    match (a, b) {
        (Null, Object(c)) | (Object(c), Null) => Ok(Object(c)),
        (Null, Null) => Ok(Null),
        (Object(x), Object(y)) => {
            let name_x = pool.get_class_name(x)?.to_string();
            let name_y = pool.get_class_name(y)?.to_string();
            let common = resolver(&name_x, &name_y).unwrap_or_else(|| "java/lang/Object".to_string());
            Ok(Object(pool.push_class(common)?))
        }
        _ => Ok(Top),
    }
}

/// The type effect of a single instruction on a frame. Covers
/// constants, loads/stores, the generic stack-shuffle family,
/// arithmetic, control transfer, field/method access and object
/// creation; anything not recognized is treated as a no-op on the
/// frame, which under-approximates depth changes for opcodes this
/// generator does not yet model explicitly.
fn apply_effect(insn: &Instruction, frame: &Frame, pool: &mut ConstantPool) -> Result<Frame> {
    use Instruction::*;
    use VerificationType as V;

    let mut locals = frame.locals.clone();
    let mut stack = frame.stack.clone();

    macro_rules! push {
        ($t:expr) => {
            stack.push($t)
        };
    }
    macro_rules! pop {
        () => {
            stack.pop()
        };
    }

    match insn {
        Nop | BreakPoint | ImpDep1 | ImpDep2 => {}
        AConstNull => push!(V::Null),
        IConstM1 | IConst0 | IConst1 | IConst2 | IConst3 | IConst4 | IConst5 | BIPush(_) | SIPush(_) => {
            push!(V::Integer)
        }
        LConst0 | LConst1 => push!(V::Long),
        FConst0 | FConst1 | FConst2 => push!(V::Float),
        DConst0 | DConst1 => push!(V::Double),
        Ldc(index) | Ldc2W(index) => push!(constant_type(pool, *index)?),

        ILoad(slot) => push!(get_local(&locals, *slot)),
        ILoad0 => push!(get_local(&locals, 0)),
        ILoad1 => push!(get_local(&locals, 1)),
        ILoad2 => push!(get_local(&locals, 2)),
        ILoad3 => push!(get_local(&locals, 3)),
        LLoad(slot) => push!(get_local(&locals, *slot)),
        LLoad0 => push!(get_local(&locals, 0)),
        LLoad1 => push!(get_local(&locals, 1)),
        LLoad2 => push!(get_local(&locals, 2)),
        LLoad3 => push!(get_local(&locals, 3)),
        FLoad(slot) => push!(get_local(&locals, *slot)),
        FLoad0 => push!(get_local(&locals, 0)),
        FLoad1 => push!(get_local(&locals, 1)),
        FLoad2 => push!(get_local(&locals, 2)),
        FLoad3 => push!(get_local(&locals, 3)),
        DLoad(slot) => push!(get_local(&locals, *slot)),
        DLoad0 => push!(get_local(&locals, 0)),
        DLoad1 => push!(get_local(&locals, 1)),
        DLoad2 => push!(get_local(&locals, 2)),
        DLoad3 => push!(get_local(&locals, 3)),
        ALoad(slot) => push!(get_local(&locals, *slot)),
        ALoad0 => push!(get_local(&locals, 0)),
        ALoad1 => push!(get_local(&locals, 1)),
        ALoad2 => push!(get_local(&locals, 2)),
        ALoad3 => push!(get_local(&locals, 3)),

        IAStore | LAStore | FAStore | DAStore | AAStore | BAStore | CAStore | SAStore => {
            pop!();
            pop!();
            pop!();
        }
        IALoad => {
            pop!();
            pop!();
            push!(V::Integer)
        }
        LALoad => {
            pop!();
            pop!();
            push!(V::Long)
        }
        FALoad => {
            pop!();
            pop!();
            push!(V::Float)
        }
        DALoad => {
            pop!();
            pop!();
            push!(V::Double)
        }
        AALoad => {
            pop!();
            pop!();
            push!(V::Object(pool.push_class("java/lang/Object")?))
        }
        BALoad | CALoad | SALoad => {
            pop!();
            pop!();
            push!(V::Integer)
        }

        IStore(slot) => set_local(&mut locals, *slot, pop_or(&mut stack, V::Integer)),
        IStore0 => set_local(&mut locals, 0, pop_or(&mut stack, V::Integer)),
        IStore1 => set_local(&mut locals, 1, pop_or(&mut stack, V::Integer)),
        IStore2 => set_local(&mut locals, 2, pop_or(&mut stack, V::Integer)),
        IStore3 => set_local(&mut locals, 3, pop_or(&mut stack, V::Integer)),
        LStore(slot) => set_local(&mut locals, *slot, pop_or(&mut stack, V::Long)),
        LStore0 => set_local(&mut locals, 0, pop_or(&mut stack, V::Long)),
        LStore1 => set_local(&mut locals, 1, pop_or(&mut stack, V::Long)),
        LStore2 => set_local(&mut locals, 2, pop_or(&mut stack, V::Long)),
        LStore3 => set_local(&mut locals, 3, pop_or(&mut stack, V::Long)),
        FStore(slot) => set_local(&mut locals, *slot, pop_or(&mut stack, V::Float)),
        FStore0 => set_local(&mut locals, 0, pop_or(&mut stack, V::Float)),
        FStore1 => set_local(&mut locals, 1, pop_or(&mut stack, V::Float)),
        FStore2 => set_local(&mut locals, 2, pop_or(&mut stack, V::Float)),
        FStore3 => set_local(&mut locals, 3, pop_or(&mut stack, V::Float)),
        DStore(slot) => set_local(&mut locals, *slot, pop_or(&mut stack, V::Double)),
        DStore0 => set_local(&mut locals, 0, pop_or(&mut stack, V::Double)),
        DStore1 => set_local(&mut locals, 1, pop_or(&mut stack, V::Double)),
        DStore2 => set_local(&mut locals, 2, pop_or(&mut stack, V::Double)),
        DStore3 => set_local(&mut locals, 3, pop_or(&mut stack, V::Double)),
        AStore(slot) => {
            let t = pop!().unwrap_or(V::Null);
            set_local(&mut locals, *slot, t)
        }
        AStore0 => {
            let t = pop!().unwrap_or(V::Null);
            set_local(&mut locals, 0, t)
        }
        AStore1 => {
            let t = pop!().unwrap_or(V::Null);
            set_local(&mut locals, 1, t)
        }
        AStore2 => {
            let t = pop!().unwrap_or(V::Null);
            set_local(&mut locals, 2, t)
        }
        AStore3 => {
            let t = pop!().unwrap_or(V::Null);
            set_local(&mut locals, 3, t)
        }

        Pop => {
            pop!();
        }
        Pop2 => {
            pop!();
            pop!();
        }
        Dup => {
            if let Some(&top) = stack.last() {
                push!(top)
            }
        }
        DupX1 => {
            if stack.len() >= 2 {
                let top = stack[stack.len() - 1];
                stack.insert(stack.len() - 2, top);
            }
        }
        DupX2 => {
            if stack.len() >= 3 {
                let top = stack[stack.len() - 1];
                stack.insert(stack.len() - 3, top);
            }
        }
        Dup2 => {
            if stack.len() >= 2 {
                let a = stack[stack.len() - 2];
                let b = stack[stack.len() - 1];
                push!(a);
                push!(b);
            }
        }
        Dup2X1 => {
            if stack.len() >= 3 {
                let a = stack[stack.len() - 2];
                let b = stack[stack.len() - 1];
                stack.insert(stack.len() - 3, a);
                stack.insert(stack.len() - 2, b);
            }
        }
        Dup2X2 => {
            if stack.len() >= 4 {
                let a = stack[stack.len() - 2];
                let b = stack[stack.len() - 1];
                stack.insert(stack.len() - 4, a);
                stack.insert(stack.len() - 3, b);
            }
        }
        Swap => {
            let len = stack.len();
            if len >= 2 {
                stack.swap(len - 1, len - 2);
            }
        }

        IAdd | ISub | IMul | IDiv | IRem | IAnd | IOr | IXOr | IShL | IShR | IUShR => {
            pop!();
            pop!();
            push!(V::Integer)
        }
        LAdd | LSub | LMul | LDiv | LRem | LAnd | LOr | LXOr => {
            pop!();
            pop!();
            push!(V::Long)
        }
        LShL | LShR | LUShR => {
            pop!();
            pop!();
            push!(V::Long)
        }
        FAdd | FSub | FMul | FDiv | FRem => {
            pop!();
            pop!();
            push!(V::Float)
        }
        DAdd | DSub | DMul | DDiv | DRem => {
            pop!();
            pop!();
            push!(V::Double)
        }
        INeg => {
            pop!();
            push!(V::Integer)
        }
        LNeg => {
            pop!();
            push!(V::Long)
        }
        FNeg => {
            pop!();
            push!(V::Float)
        }
        DNeg => {
            pop!();
            push!(V::Double)
        }
        IInc(slot, _) => {
            let _ = get_local(&locals, *slot);
        }

        I2L => {
            pop!();
            push!(V::Long)
        }
        I2F => {
            pop!();
            push!(V::Float)
        }
        I2D => {
            pop!();
            push!(V::Double)
        }
        L2I => {
            pop!();
            push!(V::Integer)
        }
        L2F => {
            pop!();
            push!(V::Float)
        }
        L2D => {
            pop!();
            push!(V::Double)
        }
        F2I => {
            pop!();
            push!(V::Integer)
        }
        F2L => {
            pop!();
            push!(V::Long)
        }
        F2D => {
            pop!();
            push!(V::Double)
        }
        D2I => {
            pop!();
            push!(V::Integer)
        }
        D2L => {
            pop!();
            push!(V::Long)
        }
        D2F => {
            pop!();
            push!(V::Float)
        }
        I2B | I2C | I2S => {
            pop!();
            push!(V::Integer)
        }

        LCmp | FCmpL | FCmpG | DCmpL | DCmpG => {
            pop!();
            pop!();
            push!(V::Integer)
        }

        IfEq(_) | IfNE(_) | IfLT(_) | IfGE(_) | IfGT(_) | IfLE(_) | IfNull(_) | IfNonNull(_) => {
            pop!();
        }
        IfICmpEq(_) | IfICmpNE(_) | IfICmpLT(_) | IfICmpGE(_) | IfICmpGT(_) | IfICmpLE(_)
        | IfACmpEq(_) | IfACmpNE(_) => {
            pop!();
            pop!();
        }
        GoTo(_) | Jsr(_) | Ret(_) => {}
        TableSwitch { .. } | LookupSwitch { .. } => {
            pop!();
        }

        IReturn | LReturn | FReturn | DReturn | AReturn | Return => {}

        GetStatic(index) => push!(field_type(pool, *index)?),
        PutStatic(index) => {
            let _ = field_type(pool, *index)?;
            pop!();
        }
        GetField(index) => {
            pop!();
            push!(field_type(pool, *index)?)
        }
        PutField(index) => {
            let _ = field_type(pool, *index)?;
            pop!();
            pop!();
        }

        InvokeVirtual(index) | InvokeSpecial(index) | InvokeStatic(index) => {
            let (params, ret) = method_type(pool, *index, false)?;
            for _ in 0..params {
                pop!();
            }
            if !matches!(insn, InvokeStatic(_)) {
                pop!();
            }
            if let Some(ret) = ret {
                push!(ret)
            }
        }
        InvokeInterface(index, _) => {
            let (params, ret) = method_type(pool, *index, true)?;
            for _ in 0..params {
                pop!();
            }
            pop!();
            if let Some(ret) = ret {
                push!(ret)
            }
        }
        InvokeDynamic(index) => {
            let (params, ret) = invoke_dynamic_type(pool, *index)?;
            for _ in 0..params {
                pop!();
            }
            if let Some(ret) = ret {
                push!(ret)
            }
        }

        New(index) => push!(V::Object(*index)),
        NewArray(array_type) => {
            pop!();
            push!(V::Object(pool.push_class(array_descriptor(*array_type))?))
        }
        ANewArray(index) => {
            pop!();
            let name = pool.get_class_name(*index)?.to_string();
            push!(V::Object(pool.push_class(format!("[{}", element_descriptor(&name)))?))
        }
        ArrayLength => {
            pop!();
            push!(V::Integer)
        }
        AThrow => {}
        CheckCast(index) => {
            pop!();
            push!(V::Object(*index))
        }
        InstanceOf(_) => {
            pop!();
            push!(V::Integer)
        }
        MonitorEnter | MonitorExit => {
            pop!();
        }
        MultiANewArray(index, dims) => {
            for _ in 0..*dims {
                pop!();
            }
            push!(V::Object(*index))
        }
    }

    Ok(Frame { locals, stack })
}

fn pop_or(stack: &mut Vec<VerificationType>, fallback: VerificationType) -> VerificationType {
    stack.pop().unwrap_or(fallback)
}

fn get_local(locals: &[VerificationType], slot: u16) -> VerificationType {
    locals.get(slot as usize).copied().unwrap_or(VerificationType::Top)
}

fn set_local(locals: &mut Vec<VerificationType>, slot: u16, ty: VerificationType) {
    let slot = slot as usize;
    if locals.len() <= slot {
        locals.resize(slot + 1, VerificationType::Top);
    }
    locals[slot] = ty;
}

fn constant_type(pool: &mut ConstantPool, index: u16) -> Result<VerificationType> {
    use crate::constpool::PoolEntry::*;
    Ok(match pool.entry(index)? {
        Integer(_) => VerificationType::Integer,
        Float(_) => VerificationType::Float,
        Long(_) => VerificationType::Long,
        Double(_) => VerificationType::Double,
        String(_) => VerificationType::Object(pool.push_class("java/lang/String")?),
        Class(_) => VerificationType::Object(pool.push_class("java/lang/Class")?),
        MethodType(_) => VerificationType::Object(pool.push_class("java/lang/invoke/MethodType")?),
        MethodHandle(..) => VerificationType::Object(pool.push_class("java/lang/invoke/MethodHandle")?),
        Dynamic(..) => VerificationType::Object(pool.push_class("java/lang/Object")?),
        _ => return Err(Error::InvalidCPItem(index)),
    })
}

fn field_type(pool: &mut ConstantPool, field_ref: u16) -> Result<VerificationType> {
    let descriptor = field_descriptor_of(pool, field_ref)?;
    verification_type_of(pool, &descriptor)
}

fn field_descriptor_of(pool: &ConstantPool, field_ref: u16) -> Result<String> {
    let (_, name_and_type) = match pool.entry(field_ref)? {
        crate::constpool::PoolEntry::FieldRef(c, nt) => (*c, *nt),
        _ => return Err(Error::InvalidCPItem(field_ref)),
    };
    let (_, descriptor) = match pool.entry(name_and_type)? {
        crate::constpool::PoolEntry::NameAndType(n, d) => (*n, *d),
        _ => return Err(Error::InvalidCPItem(name_and_type)),
    };
    Ok(pool.get_utf8(descriptor)?.to_string())
}

fn method_type(pool: &mut ConstantPool, method_ref: u16, interface: bool) -> Result<(usize, Option<VerificationType>)> {
    let name_and_type = match pool.entry(method_ref)? {
        crate::constpool::PoolEntry::MethodRef(_, nt) if !interface => *nt,
        crate::constpool::PoolEntry::InterfaceMethodRef(_, nt) if interface => *nt,
        _ => return Err(Error::InvalidCPItem(method_ref)),
    };
    let descriptor = match pool.entry(name_and_type)? {
        crate::constpool::PoolEntry::NameAndType(_, d) => *d,
        _ => return Err(Error::InvalidCPItem(name_and_type)),
    };
    let descriptor = pool.get_utf8(descriptor)?.to_string();
    parse_method_descriptor(pool, &descriptor)
}

fn invoke_dynamic_type(pool: &mut ConstantPool, index: u16) -> Result<(usize, Option<VerificationType>)> {
    let name_and_type = match pool.entry(index)? {
        crate::constpool::PoolEntry::InvokeDynamic(_, nt) => *nt,
        _ => return Err(Error::InvalidCPItem(index)),
    };
    let descriptor = match pool.entry(name_and_type)? {
        crate::constpool::PoolEntry::NameAndType(_, d) => *d,
        _ => return Err(Error::InvalidCPItem(name_and_type)),
    };
    let descriptor = pool.get_utf8(descriptor)?.to_string();
    parse_method_descriptor(pool, &descriptor)
}

fn parse_method_descriptor(pool: &mut ConstantPool, descriptor: &str) -> Result<(usize, Option<VerificationType>)> {
    let mut chars = descriptor.chars().peekable();
    if chars.next() != Some('(') {
        return Err(Error::InvalidCPItem(0));
    }
    let mut count = 0;
    let mut buf = String::new();
    while let Some(&c) = chars.peek() {
        if c == ')' {
            chars.next();
            break;
        }
        buf.clear();
        consume_field_descriptor(&mut chars, &mut buf);
        count += 1;
    }
    let rest: String = chars.collect();
    let ret = if rest == "V" {
        None
    } else {
        Some(verification_type_of(pool, &rest)?)
    };
    Ok((count, ret))
}

fn consume_field_descriptor(chars: &mut std::iter::Peekable<std::str::Chars>, buf: &mut String) {
    match chars.next() {
        Some('[') => {
            buf.push('[');
            consume_field_descriptor(chars, buf);
        }
        Some('L') => {
            buf.push('L');
            for c in chars.by_ref() {
                buf.push(c);
                if c == ';' {
                    break;
                }
            }
        }
        Some(c) => buf.push(c),
        None => {}
    }
}

fn verification_type_of(pool: &mut ConstantPool, descriptor: &str) -> Result<VerificationType> {
    Ok(match descriptor.chars().next() {
        Some('I') | Some('Z') | Some('B') | Some('C') | Some('S') => VerificationType::Integer,
        Some('J') => VerificationType::Long,
        Some('F') => VerificationType::Float,
        Some('D') => VerificationType::Double,
        Some('L') => {
            let name = &descriptor[1..descriptor.len() - 1];
            VerificationType::Object(pool.push_class(name)?)
        }
        Some('[') => VerificationType::Object(pool.push_class(descriptor)?),
        _ => VerificationType::Top,
    })
}

fn element_descriptor(class_name: &str) -> String {
    if class_name.starts_with('[') {
        class_name.to_string()
    } else {
        format!("L{};", class_name)
    }
}

fn array_descriptor(array_type: ArrayType) -> &'static str {
    match array_type {
        ArrayType::Boolean => "[Z",
        ArrayType::Char => "[C",
        ArrayType::Float => "[F",
        ArrayType::Double => "[D",
        ArrayType::Byte => "[B",
        ArrayType::Short => "[S",
        ArrayType::Int => "[I",
        ArrayType::Long => "[J",
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constpool::ConstantPool;

    fn no_resolver() -> Box<ClassHierarchyResolver<'static>> {
        Box::new(|_: &str, _: &str| None)
    }

    #[test]
    fn straight_line_code_needs_no_frames() {
        let mut instructions = BTreeMap::new();
        instructions.insert(0, Instruction::IConst0);
        instructions.insert(1, Instruction::IReturn);

        let mut pool = ConstantPool::new();
        let resolver = no_resolver();
        let frames = generate(&instructions, &[], vec![], &[], &mut pool, &*resolver).unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn branch_join_produces_a_frame_with_an_integer_on_the_stack() {
        // bci: 0 iload_0 / 1 ifeq L(+7) / 4 iconst_1 / 5 goto E(+4) / 8 L: iconst_0 / 9 E: ireturn
        let mut instructions = BTreeMap::new();
        instructions.insert(0, Instruction::ILoad0);
        instructions.insert(1, Instruction::IfEq(7));
        instructions.insert(4, Instruction::IConst1);
        instructions.insert(5, Instruction::GoTo(4));
        instructions.insert(8, Instruction::IConst0);
        instructions.insert(9, Instruction::IReturn);

        let mut pool = ConstantPool::new();
        let resolver = no_resolver();
        let frames = generate(
            &instructions,
            &[],
            vec![VerificationType::Integer],
            &[],
            &mut pool,
            &*resolver,
        )
        .unwrap();

        // one frame at bci(L)=7, one at bci(E)=8 (fallthrough + jump join)
        assert_eq!(frames.len(), 2);
        match &frames[1] {
            StackMapFrame::Same1 { stack, .. } => {
                assert_eq!(*stack, VerificationType::Integer)
            }
            other => panic!("expected Same1, got {:?}", other),
        }
    }

    #[test]
    fn dead_label_gets_a_throwable_only_frame() {
        // bci 0: return (terminator) / bci 1: nop (dead, nothing branches here)
        let mut instructions = BTreeMap::new();
        instructions.insert(0, Instruction::Return);
        instructions.insert(1, Instruction::Nop);

        let mut pool = ConstantPool::new();
        let resolver = no_resolver();
        let frames = generate(&instructions, &[], vec![], &[1], &mut pool, &*resolver).unwrap();

        assert_eq!(frames.len(), 1);
        match &frames[0] {
            StackMapFrame::Same1 { stack, .. } => match stack {
                VerificationType::Object(index) => {
                    assert_eq!(pool.get_class_name(*index).unwrap(), "java/lang/Throwable")
                }
                other => panic!("expected Object(Throwable), got {:?}", other),
            },
            other => panic!("expected Same1, got {:?}", other),
        }
    }

    #[test]
    fn requires_stack_maps_honors_option() {
        assert!(!requires_stack_maps(49, StackMapsOption::StackMapsWhenRequired));
        assert!(requires_stack_maps(50, StackMapsOption::StackMapsWhenRequired));
        assert!(requires_stack_maps(49, StackMapsOption::AlwaysGenerate));
        assert!(!requires_stack_maps(55, StackMapsOption::DropStackMaps));
    }
}
