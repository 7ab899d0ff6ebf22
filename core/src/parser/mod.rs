//! Parses a class file byte buffer into a `ConstantPool` and `Class`.
//!
//! Ported from the original `basic::parser` module (`class.rs`,
//! `method.rs`, `code.rs`, `annotation.rs`), consolidated into a single
//! module tree and extended with `NestHost`, `NestMembers`, `Record`
//! and `PermittedSubclasses`.

mod annotation;
mod class;
mod code;

use crate::constpool::*;
use crate::decode::Decoder;
use crate::result::*;
use crate::tree::*;

use self::annotation::*;
use self::class::*;
use self::code::*;

/// Parses a class file, returning its constant pool and structural
/// model.
pub fn parse(input: &[u8]) -> Result<(ConstantPool, Class)> {
    let mut cursor = 0;
    let mut decoder = Decoder::new(input, &mut cursor);

    if decoder.read_bytes(4)? != MAGIC {
        return Err(Error::NotAClass);
    }

    let minor_version = decoder.read_u16()?;
    let major_version = decoder.read_u16()?;

    let constant_pool = read_constant_pool(&mut decoder)?;

    let access_flags = AccessFlags::from_bits_truncate(decoder.read_u16()?);
    let name = decoder.read_u16()?;
    let super_name = decoder.read_u16()?;

    let interface_count = decoder.read_u16()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(decoder.read_u16()?);
    }

    let fields = parse_fields(&mut decoder, &constant_pool)?;
    let methods = parse_methods(&mut decoder, &constant_pool)?;
    let attributes = parse_attributes(&mut decoder, &constant_pool)?;

    let class = Class {
        minor_version,
        major_version,
        access_flags,
        name,
        super_name,
        interfaces,
        fields,
        methods,
        attributes,
    };

    Ok((constant_pool, class))
}

fn read_constant_pool(decoder: &mut Decoder) -> Result<ConstantPool> {
    let size = decoder.read_u16()?;
    let mut pool = ConstantPool::with_capacity(size);

    let mut index = 1u16;
    while index < size {
        let tag = decoder.read_u8()?;

        let entry = match tag {
            1 => {
                let length = decoder.read_u16()?;
                PoolEntry::Utf8(decoder.read_str(length as usize)?)
            }
            3 => PoolEntry::Integer(decoder.read_i32()?),
            4 => PoolEntry::Float(decoder.read_u32()?),
            5 => PoolEntry::Long(decoder.read_i64()?),
            6 => PoolEntry::Double(decoder.read_u64()?),
            7 => PoolEntry::Class(decoder.read_u16()?),
            8 => PoolEntry::String(decoder.read_u16()?),
            9 => PoolEntry::FieldRef(decoder.read_u16()?, decoder.read_u16()?),
            10 => PoolEntry::MethodRef(decoder.read_u16()?, decoder.read_u16()?),
            11 => PoolEntry::InterfaceMethodRef(decoder.read_u16()?, decoder.read_u16()?),
            12 => PoolEntry::NameAndType(decoder.read_u16()?, decoder.read_u16()?),
            15 => {
                let kind_tag = decoder.read_u8()?;
                let kind =
                    ReferenceKind::from_tag(kind_tag).ok_or(Error::InvalidCPItem(index))?;
                PoolEntry::MethodHandle(kind, decoder.read_u16()?)
            }
            16 => PoolEntry::MethodType(decoder.read_u16()?),
            17 => PoolEntry::Dynamic(decoder.read_u16()?, decoder.read_u16()?),
            18 => PoolEntry::InvokeDynamic(decoder.read_u16()?, decoder.read_u16()?),
            19 => PoolEntry::Module(decoder.read_u16()?),
            20 => PoolEntry::Package(decoder.read_u16()?),

            _ => return Err(Error::InvalidCPItem(index)),
        };

        let is_double = entry.is_double();
        pool.push_raw(Some(entry))?;
        index += 1;

        if is_double {
            pool.push_raw(None)?;
            index += 1;
        }
    }

    Ok(pool)
}

fn parse_fields(decoder: &mut Decoder, pool: &ConstantPool) -> Result<Vec<Field>> {
    let count = decoder.read_u16()?;
    let mut fields = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let access_flags = AccessFlags::from_bits_truncate(decoder.read_u16()?);
        let name = decoder.read_u16()?;
        let desc = decoder.read_u16()?;
        let attributes = parse_attributes(decoder, pool)?;
        fields.push(Field {
            access_flags,
            name,
            desc,
            attributes,
        });
    }
    Ok(fields)
}

fn parse_methods(decoder: &mut Decoder, pool: &ConstantPool) -> Result<Vec<Method>> {
    let count = decoder.read_u16()?;
    let mut methods = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let access_flags = AccessFlags::from_bits_truncate(decoder.read_u16()?);
        let name = decoder.read_u16()?;
        let desc = decoder.read_u16()?;
        let attributes = parse_attributes(decoder, pool)?;
        methods.push(Method {
            access_flags,
            name,
            desc,
            attributes,
        });
    }
    Ok(methods)
}

pub(crate) fn parse_attributes(
    decoder: &mut Decoder,
    pool: &ConstantPool,
) -> Result<Vec<Attribute>> {
    let count = decoder.read_u16()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_index = decoder.read_u16()?;
        let name = pool.get_utf8(name_index)?;
        let length = decoder.read_u32()?;

        let mut attr_decoder = decoder.limit(length as usize)?;

        let attribute = match name {
            "AnnotationDefault" => {
                Attribute::AnnotationDefault(parse_element_value(&mut attr_decoder)?)
            }
            "BootstrapMethods" => parse_bootstrap_methods(&mut attr_decoder)?,
            "Code" => parse_code(&mut attr_decoder, pool)?,
            "ConstantValue" => Attribute::ConstantValue(attr_decoder.read_u16()?),
            "Deprecated" => Attribute::Deprecated,
            "EnclosingMethod" => parse_enclosing_method(&mut attr_decoder)?,
            "Exceptions" => parse_exceptions(&mut attr_decoder)?,
            "InnerClasses" => parse_inner_classes(&mut attr_decoder)?,
            "LineNumberTable" => parse_line_number_table(&mut attr_decoder)?,
            "LocalVariableTable" => parse_local_variable_table(&mut attr_decoder)?,
            "LocalVariableTypeTable" => parse_local_variable_type_table(&mut attr_decoder)?,
            "MethodParameters" => parse_method_parameters(&mut attr_decoder)?,
            "Module" => parse_module(&mut attr_decoder)?,
            "ModuleMainClass" => Attribute::ModuleMainClass(attr_decoder.read_u16()?),
            "ModulePackages" => parse_module_packages(&mut attr_decoder)?,
            "NestHost" => Attribute::NestHost(attr_decoder.read_u16()?),
            "NestMembers" => parse_index_list(&mut attr_decoder, Attribute::NestMembers)?,
            "PermittedSubclasses" => {
                parse_index_list(&mut attr_decoder, Attribute::PermittedSubclasses)?
            }
            "Record" => parse_record(&mut attr_decoder, pool)?,
            "RuntimeVisibleAnnotations" => {
                Attribute::RuntimeVisibleAnnotations(parse_annotations(&mut attr_decoder)?)
            }
            "RuntimeInvisibleAnnotations" => {
                Attribute::RuntimeInvisibleAnnotations(parse_annotations(&mut attr_decoder)?)
            }
            "RuntimeVisibleParameterAnnotations" => Attribute::RuntimeVisibleParameterAnnotations(
                parse_parameter_annotations(&mut attr_decoder)?,
            ),
            "RuntimeInvisibleParameterAnnotations" => {
                Attribute::RuntimeInvisibleParameterAnnotations(parse_parameter_annotations(
                    &mut attr_decoder,
                )?)
            }
            "RuntimeVisibleTypeAnnotations" => {
                Attribute::RuntimeVisibleTypeAnnotations(parse_type_annotations(&mut attr_decoder)?)
            }
            "RuntimeInvisibleTypeAnnotations" => Attribute::RuntimeInvisibleTypeAnnotations(
                parse_type_annotations(&mut attr_decoder)?,
            ),
            "SourceFile" => Attribute::SourceFile(attr_decoder.read_u16()?),
            "Signature" => Attribute::Signature(attr_decoder.read_u16()?),
            "StackMapTable" => parse_stack_map_table(&mut attr_decoder)?,
            "Synthetic" => Attribute::Synthetic,
            "SourceDebugExtension" => {
                Attribute::SourceDebugExtension(attr_decoder.read_str(length as usize)?)
            }

            _ => {
                let bytes = attr_decoder.read_bytes(length as usize)?;
                Attribute::Unknown(name_index, bytes.to_vec())
            }
        };
        attributes.push(attribute);
        attr_decoder.remove_limit()?;
    }

    Ok(attributes)
}

fn parse_index_list(
    decoder: &mut Decoder,
    make: impl FnOnce(Vec<u16>) -> Attribute,
) -> Result<Attribute> {
    let count = decoder.read_u16()?;
    let mut indices = Vec::with_capacity(count as usize);
    for _ in 0..count {
        indices.push(decoder.read_u16()?);
    }
    Ok(make(indices))
}

fn parse_record(decoder: &mut Decoder, pool: &ConstantPool) -> Result<Attribute> {
    let count = decoder.read_u16()?;
    let mut components = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = decoder.read_u16()?;
        let desc = decoder.read_u16()?;
        let attributes = parse_attributes(decoder, pool)?;
        components.push(RecordComponent {
            name,
            desc,
            attributes,
        });
    }
    Ok(Attribute::Record(components))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_bad_magic() {
        let bytes = [0, 1, 2, 3];
        assert!(matches!(parse(&bytes), Err(Error::NotAClass)));
    }

    #[test]
    fn rejects_truncated_header() {
        let bytes = MAGIC;
        assert!(parse(bytes).is_err());
    }

    // A full read -> write -> read round trip is exercised in
    // `crate::writer::test` and in `tests/roundtrip.rs`, once the
    // writer half of the codec exists.
}
