//! Serializes a `ConstantPool` and `Class` back into class file bytes.
//!
//! Follows the original `basic::writer` module for the overall shape
//! (header, constant pool, fields, methods, attributes), but where the
//! original `write_attributes` is a stub that writes a zero count and
//! discards every attribute, this implements every `Attribute` variant
//! the parser recognizes, including `NestHost`/`NestMembers`/`Record`/
//! `PermittedSubclasses`.
//!
//! Attribute names are interned into the pool lazily as they're
//! needed, which is why `write` takes the pool by mutable reference:
//! a builder-produced `Class` does not have to pre-populate the names
//! of every attribute kind it uses.

pub(crate) mod code;

use crate::constpool::*;
use crate::encode::Encoder;
use crate::result::*;
use crate::tree::*;

use self::code::write_code;

/// Writes a constant pool and class to a byte vector.
pub fn write(pool: &mut ConstantPool, class: &Class) -> Result<Vec<u8>> {
    let mut body = Encoder::new();

    body.write_u16(class.access_flags.bits());
    body.write_u16(class.name);
    body.write_u16(class.super_name);

    body.write_u16(class.interfaces.len() as u16);
    for interface in &class.interfaces {
        body.write_u16(*interface);
    }

    write_fields(&mut body, pool, &class.fields)?;
    write_methods(&mut body, pool, &class.methods)?;
    write_attributes(&mut body, pool, &class.attributes)?;

    let mut encoder = Encoder::with_capacity(body.size() + pool.encoded_length() as usize * 4 + 16);
    encoder.write_bytes(MAGIC);
    encoder.write_u16(class.minor_version);
    encoder.write_u16(class.major_version);
    write_constant_pool(&mut encoder, pool);
    encoder.write_bytes(body.bytes());

    Ok(encoder.into_bytes())
}

fn write_constant_pool(encoder: &mut Encoder, pool: &ConstantPool) {
    encoder.write_u16(pool.encoded_length());
    for entry in pool.iter() {
        let entry = match entry {
            Some(e) => e,
            None => continue,
        };

        encoder.write_u8(entry.tag());
        match entry {
            PoolEntry::Utf8(s) => {
                encoder.write_u16(crate::encode::modified_utf8_len(s) as u16);
                encoder.write_modified_utf8(s);
            }
            PoolEntry::Integer(v) => encoder.write_i32(*v),
            PoolEntry::Float(bits) => encoder.write_u32(*bits),
            PoolEntry::Long(v) => encoder.write_i64(*v),
            PoolEntry::Double(bits) => encoder.write_u64(*bits),
            PoolEntry::Class(name) => encoder.write_u16(*name),
            PoolEntry::String(utf8) => encoder.write_u16(*utf8),
            PoolEntry::FieldRef(class, nat)
            | PoolEntry::MethodRef(class, nat)
            | PoolEntry::InterfaceMethodRef(class, nat) => {
                encoder.write_u16(*class);
                encoder.write_u16(*nat);
            }
            PoolEntry::NameAndType(name, desc) => {
                encoder.write_u16(*name);
                encoder.write_u16(*desc);
            }
            PoolEntry::MethodHandle(kind, index) => {
                encoder.write_u8(kind.tag());
                encoder.write_u16(*index);
            }
            PoolEntry::MethodType(desc) => encoder.write_u16(*desc),
            PoolEntry::Dynamic(bootstrap, nat) | PoolEntry::InvokeDynamic(bootstrap, nat) => {
                encoder.write_u16(*bootstrap);
                encoder.write_u16(*nat);
            }
            PoolEntry::Module(name) => encoder.write_u16(*name),
            PoolEntry::Package(name) => encoder.write_u16(*name),
        }
    }
}

fn write_fields(encoder: &mut Encoder, pool: &mut ConstantPool, fields: &[Field]) -> Result<()> {
    encoder.write_u16(fields.len() as u16);
    for field in fields {
        encoder.write_u16(field.access_flags.bits());
        encoder.write_u16(field.name);
        encoder.write_u16(field.desc);
        write_attributes(encoder, pool, &field.attributes)?;
    }
    Ok(())
}

fn write_methods(encoder: &mut Encoder, pool: &mut ConstantPool, methods: &[Method]) -> Result<()> {
    encoder.write_u16(methods.len() as u16);
    for method in methods {
        encoder.write_u16(method.access_flags.bits());
        encoder.write_u16(method.name);
        encoder.write_u16(method.desc);
        write_attributes(encoder, pool, &method.attributes)?;
    }
    Ok(())
}

fn write_attributes(
    encoder: &mut Encoder,
    pool: &mut ConstantPool,
    attributes: &[Attribute],
) -> Result<()> {
    encoder.write_u16(attributes.len() as u16);
    for attribute in attributes {
        write_attribute(encoder, pool, attribute)?;
    }
    Ok(())
}

fn write_attribute(encoder: &mut Encoder, pool: &mut ConstantPool, attribute: &Attribute) -> Result<()> {
    // `Unknown` already carries its own name index; every other
    // variant looks its name up (interning it if this is the first
    // occurrence of that attribute kind in the whole class file).
    let name_index = match attribute {
        Attribute::Unknown(name_index, _) => *name_index,
        _ => pool.push_utf8(attribute_name(attribute))?,
    };
    encoder.write_u16(name_index);

    let length_mark = encoder.mark();
    encoder.write_u32(0);
    let start = encoder.size();

    match attribute {
        Attribute::AnnotationDefault(value) => write_element_value(encoder, value),
        Attribute::BootstrapMethods(methods) => {
            encoder.write_u16(methods.len() as u16);
            for method in methods {
                encoder.write_u16(method.method_ref);
                encoder.write_u16(method.arguments.len() as u16);
                for arg in &method.arguments {
                    encoder.write_u16(*arg);
                }
            }
        }
        Attribute::Code {
            max_stack,
            max_locals,
            instructions,
            exceptions,
            attributes,
        } => {
            encoder.write_u16(*max_stack);
            encoder.write_u16(*max_locals);

            let code_length_mark = encoder.mark();
            encoder.write_u32(0);
            let code_start = encoder.size();
            write_code(encoder, instructions)?;
            let code_len = encoder.size() - code_start;
            if code_len >= 1 << 16 {
                return Err(Error::CodeTooLarge);
            }
            encoder.patch_u4(code_length_mark, code_len as u32);

            encoder.write_u16(exceptions.len() as u16);
            for exception in exceptions {
                encoder.write_u16(exception.start);
                encoder.write_u16(exception.end);
                encoder.write_u16(exception.handler);
                encoder.write_u16(exception.catch_type);
            }

            write_attributes(encoder, pool, attributes)?;
        }
        Attribute::ConstantValue(index) => encoder.write_u16(*index),
        Attribute::Deprecated => {}
        Attribute::EnclosingMethod {
            class_index,
            method_index,
        } => {
            encoder.write_u16(*class_index);
            encoder.write_u16(*method_index);
        }
        Attribute::Exceptions(classes) => write_u16_list(encoder, classes),
        Attribute::InnerClasses(inner_classes) => {
            encoder.write_u16(inner_classes.len() as u16);
            for ic in inner_classes {
                encoder.write_u16(ic.inner_class_info);
                encoder.write_u16(ic.outer_class_info);
                encoder.write_u16(ic.inner_name);
                encoder.write_u16(ic.inner_class_access_flags.bits());
            }
        }
        Attribute::LineNumberTable(table) => {
            encoder.write_u16(table.len() as u16);
            for entry in table {
                encoder.write_u16(entry.start);
                encoder.write_u16(entry.line_number);
            }
        }
        Attribute::LocalVariableTable(table) => {
            encoder.write_u16(table.len() as u16);
            for entry in table {
                encoder.write_u16(entry.start);
                encoder.write_u16(entry.length);
                encoder.write_u16(entry.name);
                encoder.write_u16(entry.descriptor);
                encoder.write_u16(entry.index);
            }
        }
        Attribute::LocalVariableTypeTable(table) => {
            encoder.write_u16(table.len() as u16);
            for entry in table {
                encoder.write_u16(entry.start);
                encoder.write_u16(entry.length);
                encoder.write_u16(entry.name);
                encoder.write_u16(entry.signature);
                encoder.write_u16(entry.index);
            }
        }
        Attribute::MethodParameters(params) => {
            encoder.write_u8(params.len() as u8);
            for param in params {
                encoder.write_u16(param.name);
                encoder.write_u16(param.access_flags.bits());
            }
        }
        Attribute::Module {
            name,
            flags,
            version,
            requires,
            exports,
            opens,
            uses,
            provides,
        } => {
            encoder.write_u16(*name);
            encoder.write_u16(flags.bits());
            encoder.write_u16(*version);

            encoder.write_u16(requires.len() as u16);
            for r in requires {
                encoder.write_u16(r.index);
                encoder.write_u16(r.flags.bits());
                encoder.write_u16(r.version);
            }

            encoder.write_u16(exports.len() as u16);
            for e in exports {
                encoder.write_u16(e.index);
                encoder.write_u16(e.flags.bits());
                write_u16_list(encoder, &e.to);
            }

            encoder.write_u16(opens.len() as u16);
            for o in opens {
                encoder.write_u16(o.index);
                encoder.write_u16(o.flags.bits());
                write_u16_list(encoder, &o.to);
            }

            write_u16_list(encoder, uses);

            encoder.write_u16(provides.len() as u16);
            for p in provides {
                encoder.write_u16(p.index);
                write_u16_list(encoder, &p.with);
            }
        }
        Attribute::ModuleMainClass(index) => encoder.write_u16(*index),
        Attribute::ModulePackages(packages) => write_u16_list(encoder, packages),
        Attribute::NestHost(index) => encoder.write_u16(*index),
        Attribute::NestMembers(members) => write_u16_list(encoder, members),
        Attribute::Record(components) => {
            encoder.write_u16(components.len() as u16);
            for component in components {
                encoder.write_u16(component.name);
                encoder.write_u16(component.desc);
                write_attributes(encoder, pool, &component.attributes)?;
            }
        }
        Attribute::PermittedSubclasses(classes) => write_u16_list(encoder, classes),
        Attribute::RuntimeVisibleAnnotations(annotations)
        | Attribute::RuntimeInvisibleAnnotations(annotations) => {
            write_annotations(encoder, annotations)
        }
        Attribute::RuntimeVisibleParameterAnnotations(param_annotations)
        | Attribute::RuntimeInvisibleParameterAnnotations(param_annotations) => {
            encoder.write_u8(param_annotations.len() as u8);
            for annotations in param_annotations {
                write_annotations(encoder, annotations);
            }
        }
        Attribute::RuntimeVisibleTypeAnnotations(annotations)
        | Attribute::RuntimeInvisibleTypeAnnotations(annotations) => {
            encoder.write_u16(annotations.len() as u16);
            for annotation in annotations {
                write_type_annotation(encoder, annotation);
            }
        }
        Attribute::Signature(index) => encoder.write_u16(*index),
        Attribute::Synthetic => {}
        Attribute::SourceFile(index) => encoder.write_u16(*index),
        Attribute::SourceDebugExtension(s) => encoder.write_modified_utf8(s),
        Attribute::StackMapTable(frames) => write_stack_map_table(encoder, frames),
        Attribute::Unknown(_, bytes) => encoder.write_bytes(bytes),
    }

    let length = (encoder.size() - start) as u32;
    encoder.patch_u4(length_mark, length);
    Ok(())
}

fn attribute_name(attribute: &Attribute) -> &'static str {
    match attribute {
        Attribute::AnnotationDefault(_) => "AnnotationDefault",
        Attribute::BootstrapMethods(_) => "BootstrapMethods",
        Attribute::Code { .. } => "Code",
        Attribute::ConstantValue(_) => "ConstantValue",
        Attribute::Deprecated => "Deprecated",
        Attribute::EnclosingMethod { .. } => "EnclosingMethod",
        Attribute::Exceptions(_) => "Exceptions",
        Attribute::InnerClasses(_) => "InnerClasses",
        Attribute::LineNumberTable(_) => "LineNumberTable",
        Attribute::LocalVariableTable(_) => "LocalVariableTable",
        Attribute::LocalVariableTypeTable(_) => "LocalVariableTypeTable",
        Attribute::MethodParameters(_) => "MethodParameters",
        Attribute::Module { .. } => "Module",
        Attribute::ModuleMainClass(_) => "ModuleMainClass",
        Attribute::ModulePackages(_) => "ModulePackages",
        Attribute::NestHost(_) => "NestHost",
        Attribute::NestMembers(_) => "NestMembers",
        Attribute::Record(_) => "Record",
        Attribute::PermittedSubclasses(_) => "PermittedSubclasses",
        Attribute::RuntimeVisibleAnnotations(_) => "RuntimeVisibleAnnotations",
        Attribute::RuntimeInvisibleAnnotations(_) => "RuntimeInvisibleAnnotations",
        Attribute::RuntimeVisibleParameterAnnotations(_) => {
            "RuntimeVisibleParameterAnnotations"
        }
        Attribute::RuntimeInvisibleParameterAnnotations(_) => {
            "RuntimeInvisibleParameterAnnotations"
        }
        Attribute::RuntimeVisibleTypeAnnotations(_) => "RuntimeVisibleTypeAnnotations",
        Attribute::RuntimeInvisibleTypeAnnotations(_) => "RuntimeInvisibleTypeAnnotations",
        Attribute::Signature(_) => "Signature",
        Attribute::Synthetic => "Synthetic",
        Attribute::SourceFile(_) => "SourceFile",
        Attribute::SourceDebugExtension(_) => "SourceDebugExtension",
        Attribute::StackMapTable(_) => "StackMapTable",
        Attribute::Unknown(..) => unreachable!("Unknown carries its own name index"),
    }
}

fn write_u16_list(encoder: &mut Encoder, items: &[u16]) {
    encoder.write_u16(items.len() as u16);
    for item in items {
        encoder.write_u16(*item);
    }
}

fn write_annotations(encoder: &mut Encoder, annotations: &[Annotation]) {
    encoder.write_u16(annotations.len() as u16);
    for annotation in annotations {
        write_annotation(encoder, annotation);
    }
}

fn write_annotation(encoder: &mut Encoder, annotation: &Annotation) {
    encoder.write_u16(annotation.type_index);
    encoder.write_u16(annotation.element_value_pairs.len() as u16);
    for (name_index, value) in &annotation.element_value_pairs {
        encoder.write_u16(*name_index);
        write_element_value(encoder, value);
    }
}

fn write_element_value(encoder: &mut Encoder, value: &ElementValue) {
    match value {
        ElementValue::Byte(v) => {
            encoder.write_u8(b'B');
            encoder.write_u16(*v);
        }
        ElementValue::Short(v) => {
            encoder.write_u8(b'S');
            encoder.write_u16(*v);
        }
        ElementValue::Char(v) => {
            encoder.write_u8(b'C');
            encoder.write_u16(*v);
        }
        ElementValue::Int(v) => {
            encoder.write_u8(b'I');
            encoder.write_u16(*v);
        }
        ElementValue::Long(v) => {
            encoder.write_u8(b'J');
            encoder.write_u16(*v);
        }
        ElementValue::Float(v) => {
            encoder.write_u8(b'F');
            encoder.write_u16(*v);
        }
        ElementValue::Double(v) => {
            encoder.write_u8(b'D');
            encoder.write_u16(*v);
        }
        ElementValue::Boolean(v) => {
            encoder.write_u8(b'Z');
            encoder.write_u16(*v);
        }
        ElementValue::String(v) => {
            encoder.write_u8(b's');
            encoder.write_u16(*v);
        }
        ElementValue::Class(v) => {
            encoder.write_u8(b'c');
            encoder.write_u16(*v);
        }
        ElementValue::Enum {
            type_name,
            const_name,
        } => {
            encoder.write_u8(b'e');
            encoder.write_u16(*type_name);
            encoder.write_u16(*const_name);
        }
        ElementValue::Annotation(annotation) => {
            encoder.write_u8(b'@');
            write_annotation(encoder, annotation);
        }
        ElementValue::Array(values) => {
            encoder.write_u8(b'[');
            encoder.write_u16(values.len() as u16);
            for value in values {
                write_element_value(encoder, value);
            }
        }
    }
}

fn write_type_annotation(encoder: &mut Encoder, annotation: &TypeAnnotation) {
    write_target_type(encoder, &annotation.target_type);
    encoder.write_u8(annotation.target_path.len() as u8);
    for element in &annotation.target_path {
        encoder.write_u8(match element.path_kind {
            TypePathKind::ArrayType => 0,
            TypePathKind::NestedType => 1,
            TypePathKind::WildcardType => 2,
            TypePathKind::Type => 3,
        });
        encoder.write_u8(element.argument_index);
    }
    write_annotation(encoder, &annotation.annotation);
}

fn write_target_type(encoder: &mut Encoder, target: &TargetType) {
    match target {
        TargetType::TypeParameterClass(i) => {
            encoder.write_u8(0x00);
            encoder.write_u8(*i);
        }
        TargetType::TypeParameterMethod(i) => {
            encoder.write_u8(0x01);
            encoder.write_u8(*i);
        }
        TargetType::SuperType(i) => {
            encoder.write_u8(0x10);
            encoder.write_u16(*i);
        }
        TargetType::TypeParameterBoundClass {
            type_parameter,
            bound_index,
        } => {
            encoder.write_u8(0x11);
            encoder.write_u8(*type_parameter);
            encoder.write_u8(*bound_index);
        }
        TargetType::TypeParameterBoundMethod {
            type_parameter,
            bound_index,
        } => {
            encoder.write_u8(0x12);
            encoder.write_u8(*type_parameter);
            encoder.write_u8(*bound_index);
        }
        TargetType::EmptyField => encoder.write_u8(0x13),
        TargetType::EmptyReturn => encoder.write_u8(0x14),
        TargetType::EmptyReceiver => encoder.write_u8(0x15),
        TargetType::FormalParameter(i) => {
            encoder.write_u8(0x16);
            encoder.write_u8(*i);
        }
        TargetType::Throws(i) => {
            encoder.write_u8(0x17);
            encoder.write_u16(*i);
        }
        TargetType::LocalVariable(table) => {
            encoder.write_u8(0x40);
            write_local_variable_targets(encoder, table);
        }
        TargetType::ResourceVariable(table) => {
            encoder.write_u8(0x41);
            write_local_variable_targets(encoder, table);
        }
        TargetType::Catch(i) => {
            encoder.write_u8(0x42);
            encoder.write_u16(*i);
        }
        TargetType::OffsetInstanceOf(i) => {
            encoder.write_u8(0x43);
            encoder.write_u16(*i);
        }
        TargetType::OffsetNew(i) => {
            encoder.write_u8(0x44);
            encoder.write_u16(*i);
        }
        TargetType::OffsetNewRef(i) => {
            encoder.write_u8(0x45);
            encoder.write_u16(*i);
        }
        TargetType::OffsetRef(i) => {
            encoder.write_u8(0x46);
            encoder.write_u16(*i);
        }
        TargetType::TypeArgumentCast {
            offset,
            type_argument,
        } => {
            encoder.write_u8(0x47);
            encoder.write_u16(*offset);
            encoder.write_u8(*type_argument);
        }
        TargetType::TypeArgumentConstructor {
            offset,
            type_argument,
        } => {
            encoder.write_u8(0x48);
            encoder.write_u16(*offset);
            encoder.write_u8(*type_argument);
        }
        TargetType::TypeArgumentMethod {
            offset,
            type_argument,
        } => {
            encoder.write_u8(0x49);
            encoder.write_u16(*offset);
            encoder.write_u8(*type_argument);
        }
        TargetType::TypeArgumentNewRef {
            offset,
            type_argument,
        } => {
            encoder.write_u8(0x4A);
            encoder.write_u16(*offset);
            encoder.write_u8(*type_argument);
        }
        TargetType::TypeArgumentRef {
            offset,
            type_argument,
        } => {
            encoder.write_u8(0x4B);
            encoder.write_u16(*offset);
            encoder.write_u8(*type_argument);
        }
    }
}

fn write_local_variable_targets(encoder: &mut Encoder, table: &[LocalVariableTarget]) {
    encoder.write_u8(table.len() as u8);
    for target in table {
        encoder.write_u16(target.start);
        encoder.write_u16(target.length);
        encoder.write_u16(target.index);
    }
}

fn write_stack_map_table(encoder: &mut Encoder, frames: &[StackMapFrame]) {
    encoder.write_u16(frames.len() as u16);
    for frame in frames {
        match frame {
            StackMapFrame::Same { offset_delta } if *offset_delta <= 63 => {
                encoder.write_u8(*offset_delta as u8);
            }
            StackMapFrame::Same { offset_delta } => {
                encoder.write_u8(251);
                encoder.write_u16(*offset_delta);
            }
            StackMapFrame::Same1 {
                offset_delta,
                stack,
            } if *offset_delta <= 63 => {
                encoder.write_u8(64 + *offset_delta as u8);
                write_verification_type(encoder, stack);
            }
            StackMapFrame::Same1 {
                offset_delta,
                stack,
            } => {
                encoder.write_u8(247);
                encoder.write_u16(*offset_delta);
                write_verification_type(encoder, stack);
            }
            StackMapFrame::Chop {
                offset_delta,
                count,
            } => {
                encoder.write_u8(251 - count);
                encoder.write_u16(*offset_delta);
            }
            StackMapFrame::Append {
                offset_delta,
                locals,
            } => {
                encoder.write_u8(251 + locals.len() as u8);
                encoder.write_u16(*offset_delta);
                for local in locals {
                    write_verification_type(encoder, local);
                }
            }
            StackMapFrame::Full {
                offset_delta,
                locals,
                stack,
            } => {
                encoder.write_u8(255);
                encoder.write_u16(*offset_delta);
                encoder.write_u16(locals.len() as u16);
                for local in locals {
                    write_verification_type(encoder, local);
                }
                encoder.write_u16(stack.len() as u16);
                for item in stack {
                    write_verification_type(encoder, item);
                }
            }
        }
    }
}

fn write_verification_type(encoder: &mut Encoder, vtype: &VerificationType) {
    match vtype {
        VerificationType::Top => encoder.write_u8(0),
        VerificationType::Integer => encoder.write_u8(1),
        VerificationType::Float => encoder.write_u8(2),
        VerificationType::Double => encoder.write_u8(3),
        VerificationType::Long => encoder.write_u8(4),
        VerificationType::Null => encoder.write_u8(5),
        VerificationType::UninitializedThis => encoder.write_u8(6),
        VerificationType::Object(class) => {
            encoder.write_u8(7);
            encoder.write_u16(*class);
        }
        VerificationType::Uninitialized(offset) => {
            encoder.write_u8(8);
            encoder.write_u16(*offset);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser;

    #[test]
    fn writes_minimal_class() {
        let mut pool = ConstantPool::new();
        let name = pool.push_class("Foo").unwrap();
        let super_name = pool.push_class("java/lang/Object").unwrap();

        let class = Class {
            minor_version: 0,
            major_version: 55,
            access_flags: AccessFlags::PUBLIC | AccessFlags::SUPER,
            name,
            super_name,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: vec![Attribute::Synthetic, Attribute::Deprecated],
        };

        let bytes = write(&mut pool, &class).unwrap();
        assert_eq!(&bytes[0..4], MAGIC);

        let (parsed_pool, parsed_class) = parser::parse(&bytes).unwrap();
        assert_eq!(parsed_class.major_version, 55);
        assert_eq!(
            parsed_pool.get_class_name(parsed_class.name).unwrap(),
            "Foo"
        );
        assert_eq!(
            parsed_pool
                .get_class_name(parsed_class.super_name)
                .unwrap(),
            "java/lang/Object"
        );
        assert_eq!(parsed_class.attributes.len(), 2);
    }

    #[test]
    fn round_trips_nest_host_and_members() {
        let mut pool = ConstantPool::new();
        let name = pool.push_class("Outer$Inner").unwrap();
        let super_name = pool.push_class("java/lang/Object").unwrap();
        let host = pool.push_class("Outer").unwrap();
        let member = pool.push_class("Outer$Other").unwrap();

        let class = Class {
            minor_version: 0,
            major_version: 60,
            access_flags: AccessFlags::SUPER,
            name,
            super_name,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: vec![
                Attribute::NestHost(host),
                Attribute::NestMembers(vec![member]),
            ],
        };

        let bytes = write(&mut pool, &class).unwrap();
        let (_, parsed) = parser::parse(&bytes).unwrap();
        assert!(matches!(parsed.attributes[0], Attribute::NestHost(h) if h == host));
        assert!(
            matches!(&parsed.attributes[1], Attribute::NestMembers(m) if m == &vec![member])
        );
    }
}
