//! Bytecode encoding for the `Code` attribute: the mirror image of
//! `parser::code`. Each instruction is re-emitted at the same bci it
//! was read from (or that the builder assigned it), so `tableswitch`/
//! `lookupswitch` padding is recomputed the same way the parser skips
//! it.

use std::collections::BTreeMap;

use crate::encode::Encoder;
use crate::result::*;
use crate::tree::*;

pub fn write_code(
    encoder: &mut Encoder,
    instructions: &BTreeMap<u32, Instruction>,
) -> Result<()> {
    for (&at, insn) in instructions {
        write_instruction(encoder, at, insn)?;
    }
    Ok(())
}

pub(crate) fn write_instruction(encoder: &mut Encoder, at: u32, insn: &Instruction) -> Result<()> {
    use Instruction::*;

    match *insn {
        Nop => encoder.write_u8(0x00),
        AConstNull => encoder.write_u8(0x01),
        IConstM1 => encoder.write_u8(0x02),
        IConst0 => encoder.write_u8(0x03),
        IConst1 => encoder.write_u8(0x04),
        IConst2 => encoder.write_u8(0x05),
        IConst3 => encoder.write_u8(0x06),
        IConst4 => encoder.write_u8(0x07),
        IConst5 => encoder.write_u8(0x08),
        LConst0 => encoder.write_u8(0x09),
        LConst1 => encoder.write_u8(0x0A),
        FConst0 => encoder.write_u8(0x0B),
        FConst1 => encoder.write_u8(0x0C),
        FConst2 => encoder.write_u8(0x0D),
        DConst0 => encoder.write_u8(0x0E),
        DConst1 => encoder.write_u8(0x0F),
        BIPush(v) => {
            encoder.write_u8(0x10);
            encoder.write_i8(v);
        }
        SIPush(v) => {
            encoder.write_u8(0x11);
            encoder.write_i16(v);
        }
        Ldc(index) => {
            if index <= 0xFF {
                encoder.write_u8(0x12);
                encoder.write_u8(index as u8);
            } else {
                encoder.write_u8(0x13);
                encoder.write_u16(index);
            }
        }
        Ldc2W(index) => {
            encoder.write_u8(0x14);
            encoder.write_u16(index);
        }
        ILoad(i) => write_local_op(encoder, 0x15, 0xC4, i),
        LLoad(i) => write_local_op(encoder, 0x16, 0xC4, i),
        FLoad(i) => write_local_op(encoder, 0x17, 0xC4, i),
        DLoad(i) => write_local_op(encoder, 0x18, 0xC4, i),
        ALoad(i) => write_local_op(encoder, 0x19, 0xC4, i),
        ILoad0 => encoder.write_u8(0x1A),
        ILoad1 => encoder.write_u8(0x1B),
        ILoad2 => encoder.write_u8(0x1C),
        ILoad3 => encoder.write_u8(0x1D),
        LLoad0 => encoder.write_u8(0x1E),
        LLoad1 => encoder.write_u8(0x1F),
        LLoad2 => encoder.write_u8(0x20),
        LLoad3 => encoder.write_u8(0x21),
        FLoad0 => encoder.write_u8(0x22),
        FLoad1 => encoder.write_u8(0x23),
        FLoad2 => encoder.write_u8(0x24),
        FLoad3 => encoder.write_u8(0x25),
        DLoad0 => encoder.write_u8(0x26),
        DLoad1 => encoder.write_u8(0x27),
        DLoad2 => encoder.write_u8(0x28),
        DLoad3 => encoder.write_u8(0x29),
        ALoad0 => encoder.write_u8(0x2A),
        ALoad1 => encoder.write_u8(0x2B),
        ALoad2 => encoder.write_u8(0x2C),
        ALoad3 => encoder.write_u8(0x2D),
        IALoad => encoder.write_u8(0x2E),
        LALoad => encoder.write_u8(0x2F),
        FALoad => encoder.write_u8(0x30),
        DALoad => encoder.write_u8(0x31),
        AALoad => encoder.write_u8(0x32),
        BALoad => encoder.write_u8(0x33),
        CALoad => encoder.write_u8(0x34),
        SALoad => encoder.write_u8(0x35),
        IStore(i) => write_local_op(encoder, 0x36, 0xC4, i),
        LStore(i) => write_local_op(encoder, 0x37, 0xC4, i),
        FStore(i) => write_local_op(encoder, 0x38, 0xC4, i),
        DStore(i) => write_local_op(encoder, 0x39, 0xC4, i),
        AStore(i) => write_local_op(encoder, 0x3A, 0xC4, i),
        IStore0 => encoder.write_u8(0x3B),
        IStore1 => encoder.write_u8(0x3C),
        IStore2 => encoder.write_u8(0x3D),
        IStore3 => encoder.write_u8(0x3E),
        LStore0 => encoder.write_u8(0x3F),
        LStore1 => encoder.write_u8(0x40),
        LStore2 => encoder.write_u8(0x41),
        LStore3 => encoder.write_u8(0x42),
        FStore0 => encoder.write_u8(0x43),
        FStore1 => encoder.write_u8(0x44),
        FStore2 => encoder.write_u8(0x45),
        FStore3 => encoder.write_u8(0x46),
        DStore0 => encoder.write_u8(0x47),
        DStore1 => encoder.write_u8(0x48),
        DStore2 => encoder.write_u8(0x49),
        DStore3 => encoder.write_u8(0x4A),
        AStore0 => encoder.write_u8(0x4B),
        AStore1 => encoder.write_u8(0x4C),
        AStore2 => encoder.write_u8(0x4D),
        AStore3 => encoder.write_u8(0x4E),
        IAStore => encoder.write_u8(0x4F),
        LAStore => encoder.write_u8(0x50),
        FAStore => encoder.write_u8(0x51),
        DAStore => encoder.write_u8(0x52),
        AAStore => encoder.write_u8(0x53),
        BAStore => encoder.write_u8(0x54),
        CAStore => encoder.write_u8(0x55),
        SAStore => encoder.write_u8(0x56),
        Pop => encoder.write_u8(0x57),
        Pop2 => encoder.write_u8(0x58),
        Dup => encoder.write_u8(0x59),
        DupX1 => encoder.write_u8(0x5A),
        DupX2 => encoder.write_u8(0x5B),
        Dup2 => encoder.write_u8(0x5C),
        Dup2X1 => encoder.write_u8(0x5D),
        Dup2X2 => encoder.write_u8(0x5E),
        Swap => encoder.write_u8(0x5F),
        IAdd => encoder.write_u8(0x60),
        LAdd => encoder.write_u8(0x61),
        FAdd => encoder.write_u8(0x62),
        DAdd => encoder.write_u8(0x63),
        ISub => encoder.write_u8(0x64),
        LSub => encoder.write_u8(0x65),
        FSub => encoder.write_u8(0x66),
        DSub => encoder.write_u8(0x67),
        IMul => encoder.write_u8(0x68),
        LMul => encoder.write_u8(0x69),
        FMul => encoder.write_u8(0x6A),
        DMul => encoder.write_u8(0x6B),
        IDiv => encoder.write_u8(0x6C),
        LDiv => encoder.write_u8(0x6D),
        FDiv => encoder.write_u8(0x6E),
        DDiv => encoder.write_u8(0x6F),
        IRem => encoder.write_u8(0x70),
        LRem => encoder.write_u8(0x71),
        FRem => encoder.write_u8(0x72),
        DRem => encoder.write_u8(0x73),
        INeg => encoder.write_u8(0x74),
        LNeg => encoder.write_u8(0x75),
        FNeg => encoder.write_u8(0x76),
        DNeg => encoder.write_u8(0x77),
        IShL => encoder.write_u8(0x78),
        LShL => encoder.write_u8(0x79),
        IShR => encoder.write_u8(0x7A),
        LShR => encoder.write_u8(0x7B),
        IUShR => encoder.write_u8(0x7C),
        LUShR => encoder.write_u8(0x7D),
        IAnd => encoder.write_u8(0x7E),
        LAnd => encoder.write_u8(0x7F),
        IOr => encoder.write_u8(0x80),
        LOr => encoder.write_u8(0x81),
        IXOr => encoder.write_u8(0x82),
        LXOr => encoder.write_u8(0x83),
        IInc(index, value) => {
            if index <= 0xFF && (-128..=127).contains(&value) {
                encoder.write_u8(0x84);
                encoder.write_u8(index as u8);
                encoder.write_i8(value as i8);
            } else {
                encoder.write_u8(0xC4);
                encoder.write_u8(0x84);
                encoder.write_u16(index);
                encoder.write_i16(value);
            }
        }
        I2L => encoder.write_u8(0x85),
        I2F => encoder.write_u8(0x86),
        I2D => encoder.write_u8(0x87),
        L2I => encoder.write_u8(0x88),
        L2F => encoder.write_u8(0x89),
        L2D => encoder.write_u8(0x8A),
        F2I => encoder.write_u8(0x8B),
        F2L => encoder.write_u8(0x8C),
        F2D => encoder.write_u8(0x8D),
        D2I => encoder.write_u8(0x8E),
        D2L => encoder.write_u8(0x8F),
        D2F => encoder.write_u8(0x90),
        I2B => encoder.write_u8(0x91),
        I2C => encoder.write_u8(0x92),
        I2S => encoder.write_u8(0x93),
        LCmp => encoder.write_u8(0x94),
        FCmpL => encoder.write_u8(0x95),
        FCmpG => encoder.write_u8(0x96),
        DCmpL => encoder.write_u8(0x97),
        DCmpG => encoder.write_u8(0x98),
        IfEq(d) => write_branch16(encoder, 0x99, d),
        IfNE(d) => write_branch16(encoder, 0x9A, d),
        IfLT(d) => write_branch16(encoder, 0x9B, d),
        IfGE(d) => write_branch16(encoder, 0x9C, d),
        IfGT(d) => write_branch16(encoder, 0x9D, d),
        IfLE(d) => write_branch16(encoder, 0x9E, d),
        IfICmpEq(d) => write_branch16(encoder, 0x9F, d),
        IfICmpNE(d) => write_branch16(encoder, 0xA0, d),
        IfICmpLT(d) => write_branch16(encoder, 0xA1, d),
        IfICmpGE(d) => write_branch16(encoder, 0xA2, d),
        IfICmpGT(d) => write_branch16(encoder, 0xA3, d),
        IfICmpLE(d) => write_branch16(encoder, 0xA4, d),
        IfACmpEq(d) => write_branch16(encoder, 0xA5, d),
        IfACmpNE(d) => write_branch16(encoder, 0xA6, d),
        GoTo(d) => {
            if (i32::from(i16::MIN)..=i32::from(i16::MAX)).contains(&d) {
                encoder.write_u8(0xA7);
                encoder.write_i16(d as i16);
            } else {
                encoder.write_u8(0xC8);
                encoder.write_i32(d);
            }
        }
        Jsr(d) => {
            if (i32::from(i16::MIN)..=i32::from(i16::MAX)).contains(&d) {
                encoder.write_u8(0xA8);
                encoder.write_i16(d as i16);
            } else {
                encoder.write_u8(0xC9);
                encoder.write_i32(d);
            }
        }
        Ret(i) => write_local_op(encoder, 0xA9, 0xC4, i),
        TableSwitch {
            default,
            low,
            high,
            ref offsets,
        } => {
            encoder.write_u8(0xAA);
            for _ in 0..(3 - (at & 3)) {
                encoder.write_u8(0);
            }
            encoder.write_i32(default);
            encoder.write_i32(low);
            encoder.write_i32(high);
            for offset in offsets {
                encoder.write_i32(*offset);
            }
        }
        LookupSwitch {
            default,
            ref offsets,
        } => {
            encoder.write_u8(0xAB);
            for _ in 0..(3 - (at & 3)) {
                encoder.write_u8(0);
            }
            encoder.write_i32(default);
            encoder.write_u32(offsets.len() as u32);
            for (key, offset) in offsets {
                encoder.write_i32(*key);
                encoder.write_i32(*offset);
            }
        }
        IReturn => encoder.write_u8(0xAC),
        LReturn => encoder.write_u8(0xAD),
        FReturn => encoder.write_u8(0xAE),
        DReturn => encoder.write_u8(0xAF),
        AReturn => encoder.write_u8(0xB0),
        Return => encoder.write_u8(0xB1),
        GetStatic(i) => write_u16_op(encoder, 0xB2, i),
        PutStatic(i) => write_u16_op(encoder, 0xB3, i),
        GetField(i) => write_u16_op(encoder, 0xB4, i),
        PutField(i) => write_u16_op(encoder, 0xB5, i),
        InvokeVirtual(i) => write_u16_op(encoder, 0xB6, i),
        InvokeSpecial(i) => write_u16_op(encoder, 0xB7, i),
        InvokeStatic(i) => write_u16_op(encoder, 0xB8, i),
        InvokeInterface(index, count) => {
            encoder.write_u8(0xB9);
            encoder.write_u16(index);
            encoder.write_u8(count);
            encoder.write_u8(0);
        }
        InvokeDynamic(index) => {
            encoder.write_u8(0xBA);
            encoder.write_u16(index);
            encoder.write_u16(0);
        }
        New(i) => write_u16_op(encoder, 0xBB, i),
        NewArray(array_type) => {
            encoder.write_u8(0xBC);
            encoder.write_u8(array_type.tag());
        }
        ANewArray(i) => write_u16_op(encoder, 0xBD, i),
        ArrayLength => encoder.write_u8(0xBE),
        AThrow => encoder.write_u8(0xBF),
        CheckCast(i) => write_u16_op(encoder, 0xC0, i),
        InstanceOf(i) => write_u16_op(encoder, 0xC1, i),
        MonitorEnter => encoder.write_u8(0xC2),
        MonitorExit => encoder.write_u8(0xC3),
        MultiANewArray(class, dims) => {
            encoder.write_u8(0xC5);
            encoder.write_u16(class);
            encoder.write_u8(dims);
        }
        IfNull(d) => write_branch16(encoder, 0xC6, d),
        IfNonNull(d) => write_branch16(encoder, 0xC7, d),
        BreakPoint => encoder.write_u8(0xCA),
        ImpDep1 => encoder.write_u8(0xFE),
        ImpDep2 => encoder.write_u8(0xFF),
    }

    Ok(())
}

fn write_branch16(encoder: &mut Encoder, op_code: u8, delta: i16) {
    encoder.write_u8(op_code);
    encoder.write_i16(delta);
}

fn write_u16_op(encoder: &mut Encoder, op_code: u8, operand: u16) {
    encoder.write_u8(op_code);
    encoder.write_u16(operand);
}

/// Writes a load/store/ret-style instruction whose index fits in a u8
/// using the narrow opcode, or falls back to the `wide` prefix.
fn write_local_op(encoder: &mut Encoder, op_code: u8, wide_prefix: u8, index: u16) {
    if index <= 0xFF {
        encoder.write_u8(op_code);
        encoder.write_u8(index as u8);
    } else {
        encoder.write_u8(wide_prefix);
        encoder.write_u8(op_code);
        encoder.write_u16(index);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode(insn: Instruction, at: u32) -> Vec<u8> {
        let mut encoder = Encoder::new();
        write_instruction(&mut encoder, at, &insn).unwrap();
        encoder.into_bytes()
    }

    #[test]
    fn writes_return() {
        assert_eq!(encode(Instruction::Return, 0), vec![0xB1]);
    }

    #[test]
    fn writes_narrow_iinc() {
        assert_eq!(
            encode(Instruction::IInc(3, 5), 0),
            vec![0x84, 0x03, 0x05]
        );
    }

    #[test]
    fn writes_wide_iinc() {
        let bytes = encode(Instruction::IInc(300, -5), 0);
        assert_eq!(bytes[0], 0xC4);
        assert_eq!(bytes[1], 0x84);
        assert_eq!(bytes.len(), 6);
    }

    #[test]
    fn writes_short_goto() {
        assert_eq!(encode(Instruction::GoTo(100), 0), vec![0xA7, 0, 100]);
    }

    #[test]
    fn writes_wide_goto_for_out_of_range_delta() {
        let bytes = encode(Instruction::GoTo(100_000), 0);
        assert_eq!(bytes[0], 0xC8);
        assert_eq!(bytes.len(), 5);
    }

    #[test]
    fn writes_tableswitch_with_padding() {
        // at bci 1, so 2 padding bytes are needed before the operands.
        let bytes = encode(
            Instruction::TableSwitch {
                default: 0,
                low: 0,
                high: 0,
                offsets: vec![10],
            },
            1,
        );
        assert_eq!(bytes[0], 0xAA);
        assert_eq!(&bytes[1..3], &[0, 0]);
        assert_eq!(bytes.len(), 1 + 2 + 4 + 4 + 4 + 4);
    }
}
