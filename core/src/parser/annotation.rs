//! Parsing for annotations, type annotations, stack map frames, and the
//! various per-method tables (`Exceptions`, `LineNumberTable`, local
//! variable tables, `MethodParameters`).
//!
//! Ported from the original `basic::parser::{method, annotation}`
//! modules; the stack map frame dispatch modernizes the old
//! `0...63`-style inclusive range patterns (removed from stable Rust)
//! to `0..=63`.

use crate::decode::Decoder;
use crate::result::*;
use crate::tree::*;

pub fn parse_exceptions(decoder: &mut Decoder) -> Result<Attribute> {
    let count = decoder.read_u16()?;
    let mut exceptions = Vec::with_capacity(count as usize);
    for _ in 0..count {
        exceptions.push(decoder.read_u16()?);
    }
    Ok(Attribute::Exceptions(exceptions))
}

pub fn parse_line_number_table(decoder: &mut Decoder) -> Result<Attribute> {
    let count = decoder.read_u16()?;
    let mut table = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let start = decoder.read_u16()?;
        let line_number = decoder.read_u16()?;
        table.push(LineNumber { start, line_number });
    }
    Ok(Attribute::LineNumberTable(table))
}

pub fn parse_local_variable_table(decoder: &mut Decoder) -> Result<Attribute> {
    let count = decoder.read_u16()?;
    let mut table = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let start = decoder.read_u16()?;
        let length = decoder.read_u16()?;
        let name = decoder.read_u16()?;
        let descriptor = decoder.read_u16()?;
        let index = decoder.read_u16()?;
        table.push(LocalVariable {
            start,
            length,
            name,
            descriptor,
            index,
        });
    }
    Ok(Attribute::LocalVariableTable(table))
}

pub fn parse_local_variable_type_table(decoder: &mut Decoder) -> Result<Attribute> {
    let count = decoder.read_u16()?;
    let mut table = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let start = decoder.read_u16()?;
        let length = decoder.read_u16()?;
        let name = decoder.read_u16()?;
        let signature = decoder.read_u16()?;
        let index = decoder.read_u16()?;
        table.push(LocalVariableType {
            start,
            length,
            name,
            signature,
            index,
        });
    }
    Ok(Attribute::LocalVariableTypeTable(table))
}

pub fn parse_method_parameters(decoder: &mut Decoder) -> Result<Attribute> {
    let count = decoder.read_u16()?;
    let mut params = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = decoder.read_u16()?;
        let access_flags = AccessFlags::from_bits_truncate(decoder.read_u16()?);
        params.push(MethodParameter { name, access_flags });
    }
    Ok(Attribute::MethodParameters(params))
}

pub fn parse_stack_map_table(decoder: &mut Decoder) -> Result<Attribute> {
    let count = decoder.read_u16()?;
    let mut table = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let frame_type = decoder.read_u8()?;
        let frame = match frame_type {
            0..=63 => StackMapFrame::Same {
                offset_delta: u16::from(frame_type),
            },
            64..=127 => StackMapFrame::Same1 {
                offset_delta: u16::from(frame_type) - 64,
                stack: parse_verification_type(decoder)?,
            },
            247 => StackMapFrame::Same1 {
                offset_delta: decoder.read_u16()?,
                stack: parse_verification_type(decoder)?,
            },
            248..=250 => StackMapFrame::Chop {
                offset_delta: decoder.read_u16()?,
                count: 251 - frame_type,
            },
            251 => StackMapFrame::Same {
                offset_delta: decoder.read_u16()?,
            },
            252..=254 => {
                let offset_delta = decoder.read_u16()?;
                let diff = frame_type as usize - 251;
                let mut locals = Vec::with_capacity(diff);
                for _ in 0..diff {
                    locals.push(parse_verification_type(decoder)?);
                }
                StackMapFrame::Append {
                    offset_delta,
                    locals,
                }
            }
            255 => {
                let offset_delta = decoder.read_u16()?;
                let local_count = decoder.read_u16()? as usize;
                let mut locals = Vec::with_capacity(local_count);
                for _ in 0..local_count {
                    locals.push(parse_verification_type(decoder)?);
                }

                let stack_size = decoder.read_u16()? as usize;
                let mut stack = Vec::with_capacity(stack_size);
                for _ in 0..stack_size {
                    stack.push(parse_verification_type(decoder)?);
                }

                StackMapFrame::Full {
                    offset_delta,
                    locals,
                    stack,
                }
            }

            _ => return Err(Error::ReservedStackMapFrame(frame_type)),
        };
        table.push(frame);
    }

    Ok(Attribute::StackMapTable(table))
}

fn parse_verification_type(decoder: &mut Decoder) -> Result<VerificationType> {
    use self::VerificationType::*;

    let tag = decoder.read_u8()?;
    match tag {
        0 => Ok(Top),
        1 => Ok(Integer),
        2 => Ok(Float),
        3 => Ok(Double),
        4 => Ok(Long),
        5 => Ok(Null),
        6 => Ok(UninitializedThis),
        7 => Ok(Object(decoder.read_u16()?)),
        8 => Ok(Uninitialized(decoder.read_u16()?)),

        _ => Err(Error::InvalidVerificationType(tag)),
    }
}

pub fn parse_parameter_annotations(decoder: &mut Decoder) -> Result<Vec<Vec<Annotation>>> {
    let count = decoder.read_u8()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        annotations.push(parse_annotations(decoder)?);
    }
    Ok(annotations)
}

pub fn parse_annotations(decoder: &mut Decoder) -> Result<Vec<Annotation>> {
    let count = decoder.read_u16()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        annotations.push(parse_annotation(decoder)?);
    }
    Ok(annotations)
}

pub fn parse_type_annotations(decoder: &mut Decoder) -> Result<Vec<TypeAnnotation>> {
    let count = decoder.read_u16()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        annotations.push(parse_type_annotation(decoder)?);
    }
    Ok(annotations)
}

fn parse_annotation(decoder: &mut Decoder) -> Result<Annotation> {
    let type_index = decoder.read_u16()?;
    let count = decoder.read_u16()?;
    let mut element_value_pairs = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let name_index = decoder.read_u16()?;
        element_value_pairs.push((name_index, parse_element_value(decoder)?));
    }

    Ok(Annotation {
        type_index,
        element_value_pairs,
    })
}

pub fn parse_element_value(decoder: &mut Decoder) -> Result<ElementValue> {
    let tag = decoder.read_u8()?;

    match tag {
        b'B' => Ok(ElementValue::Byte(decoder.read_u16()?)),
        b'S' => Ok(ElementValue::Short(decoder.read_u16()?)),
        b'C' => Ok(ElementValue::Char(decoder.read_u16()?)),
        b'I' => Ok(ElementValue::Int(decoder.read_u16()?)),
        b'J' => Ok(ElementValue::Long(decoder.read_u16()?)),
        b'F' => Ok(ElementValue::Float(decoder.read_u16()?)),
        b'D' => Ok(ElementValue::Double(decoder.read_u16()?)),
        b'Z' => Ok(ElementValue::Boolean(decoder.read_u16()?)),
        b's' => Ok(ElementValue::String(decoder.read_u16()?)),
        b'c' => Ok(ElementValue::Class(decoder.read_u16()?)),
        b'e' => {
            let type_name = decoder.read_u16()?;
            let const_name = decoder.read_u16()?;
            Ok(ElementValue::Enum {
                type_name,
                const_name,
            })
        }
        b'@' => Ok(ElementValue::Annotation(Box::new(parse_annotation(
            decoder,
        )?))),
        b'[' => {
            let count = decoder.read_u16()?;
            let mut element_values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                element_values.push(parse_element_value(decoder)?);
            }
            Ok(ElementValue::Array(element_values))
        }

        _ => Err(Error::InvalidElementValue(tag)),
    }
}

fn parse_type_annotation(decoder: &mut Decoder) -> Result<TypeAnnotation> {
    let target_type = parse_target_type(decoder)?;
    let target_path = parse_type_path(decoder)?;
    let annotation = parse_annotation(decoder)?;
    Ok(TypeAnnotation {
        target_type,
        target_path,
        annotation,
    })
}

fn parse_target_type(decoder: &mut Decoder) -> Result<TargetType> {
    use self::TargetType::*;

    Ok(match decoder.read_u8()? {
        0x00 => TypeParameterClass(decoder.read_u8()?),
        0x01 => TypeParameterMethod(decoder.read_u8()?),
        0x10 => SuperType(decoder.read_u16()?),
        0x11 => TypeParameterBoundClass {
            type_parameter: decoder.read_u8()?,
            bound_index: decoder.read_u8()?,
        },
        0x12 => TypeParameterBoundMethod {
            type_parameter: decoder.read_u8()?,
            bound_index: decoder.read_u8()?,
        },
        0x13 => EmptyField,
        0x14 => EmptyReturn,
        0x15 => EmptyReceiver,
        0x16 => FormalParameter(decoder.read_u8()?),
        0x17 => Throws(decoder.read_u16()?),
        0x40 => LocalVariable(parse_local_variable(decoder)?),
        0x41 => ResourceVariable(parse_local_variable(decoder)?),
        0x42 => Catch(decoder.read_u16()?),
        0x43 => OffsetInstanceOf(decoder.read_u16()?),
        0x44 => OffsetNew(decoder.read_u16()?),
        0x45 => OffsetNewRef(decoder.read_u16()?),
        0x46 => OffsetRef(decoder.read_u16()?),
        0x47 => TypeArgumentCast {
            offset: decoder.read_u16()?,
            type_argument: decoder.read_u8()?,
        },
        0x48 => TypeArgumentConstructor {
            offset: decoder.read_u16()?,
            type_argument: decoder.read_u8()?,
        },
        0x49 => TypeArgumentMethod {
            offset: decoder.read_u16()?,
            type_argument: decoder.read_u8()?,
        },
        0x4A => TypeArgumentNewRef {
            offset: decoder.read_u16()?,
            type_argument: decoder.read_u8()?,
        },
        0x4B => TypeArgumentRef {
            offset: decoder.read_u16()?,
            type_argument: decoder.read_u8()?,
        },

        _ => return Err(Error::InvalidTargetType),
    })
}

fn parse_local_variable(decoder: &mut Decoder) -> Result<Vec<LocalVariableTarget>> {
    let length = decoder.read_u8()?;
    let mut table = Vec::with_capacity(length as usize);

    for _ in 0..length {
        let start = decoder.read_u16()?;
        let length = decoder.read_u16()?;
        let index = decoder.read_u16()?;
        table.push(LocalVariableTarget {
            start,
            length,
            index,
        });
    }

    Ok(table)
}

fn parse_type_path(decoder: &mut Decoder) -> Result<Vec<TypePathElement>> {
    let length = decoder.read_u8()?;
    let mut type_path = Vec::with_capacity(length as usize);

    for _ in 0..length {
        let path_kind = match decoder.read_u8()? {
            0x00 => TypePathKind::ArrayType,
            0x01 => TypePathKind::NestedType,
            0x02 => TypePathKind::WildcardType,
            0x03 => TypePathKind::Type,

            _ => return Err(Error::InvalidTypePath),
        };

        let argument_index = decoder.read_u8()?;
        type_path.push(TypePathElement {
            path_kind,
            argument_index,
        });
    }

    Ok(type_path)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_same_frame() {
        // StackMapTable with one entry: a SAME frame, offset_delta 10.
        let bytes = [0u8, 1u8, 10u8];
        let mut cursor = 0;
        let mut decoder = Decoder::new(&bytes, &mut cursor);
        match parse_stack_map_table(&mut decoder).unwrap() {
            Attribute::StackMapTable(frames) => match frames.as_slice() {
                [StackMapFrame::Same { offset_delta }] => assert_eq!(*offset_delta, 10),
                other => panic!("unexpected frames: {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn parses_full_frame() {
        // count=1, frame_type=255, offset_delta=1, 0 locals, 1 stack item (Integer)
        let bytes = [0u8, 1, 255, 0, 1, 0, 0, 0, 1, 1];
        let mut cursor = 0;
        let mut decoder = Decoder::new(&bytes, &mut cursor);
        match parse_stack_map_table(&mut decoder).unwrap() {
            Attribute::StackMapTable(frames) => match frames.as_slice() {
                [StackMapFrame::Full {
                    offset_delta,
                    locals,
                    stack,
                }] => {
                    assert_eq!(*offset_delta, 1);
                    assert!(locals.is_empty());
                    assert_eq!(stack, &[VerificationType::Integer]);
                }
                other => panic!("unexpected frames: {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn invalid_element_value_tag_is_an_error() {
        let bytes = [b'?'];
        let mut cursor = 0;
        let mut decoder = Decoder::new(&bytes, &mut cursor);
        assert!(matches!(
            parse_element_value(&mut decoder),
            Err(Error::InvalidElementValue(b'?'))
        ));
    }

    #[test]
    fn invalid_verification_type_tag_is_an_error() {
        let bytes = [9u8];
        let mut cursor = 0;
        let mut decoder = Decoder::new(&bytes, &mut cursor);
        assert!(matches!(
            parse_verification_type(&mut decoder),
            Err(Error::InvalidVerificationType(9))
        ));
    }
}
