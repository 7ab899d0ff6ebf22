//! Rewrites every constant-pool index embedded in a `Class` tree
//! according to a `share_pool`-style remap table.
//!
//! `share_pool` only fixes up cross-references *within* the pool it
//! builds (e.g. a `NameAndType` entry's own `Utf8` index); every index
//! the tree itself holds — `Class::name`, a method's `desc`, an
//! `Ldc` operand, an annotation's `type_index` — points at the old
//! pool and has to be walked and remapped separately. This mirrors
//! `writer::mod`'s traversal of the same tree, index field for index
//! field, substituting a lookup for a write.

use crate::tree::*;

fn r(remap: &[u16], index: u16) -> u16 {
    if index == 0 {
        0
    } else {
        remap.get(index as usize).copied().unwrap_or(index)
    }
}

pub fn remap_class(class: &mut Class, remap: &[u16]) {
    class.name = r(remap, class.name);
    class.super_name = r(remap, class.super_name);
    for interface in &mut class.interfaces {
        *interface = r(remap, *interface);
    }
    for field in &mut class.fields {
        field.name = r(remap, field.name);
        field.desc = r(remap, field.desc);
        remap_attributes(&mut field.attributes, remap);
    }
    for method in &mut class.methods {
        method.name = r(remap, method.name);
        method.desc = r(remap, method.desc);
        remap_attributes(&mut method.attributes, remap);
    }
    remap_attributes(&mut class.attributes, remap);
}

fn remap_attributes(attributes: &mut [Attribute], remap: &[u16]) {
    for attribute in attributes {
        remap_attribute(attribute, remap);
    }
}

fn remap_attribute(attribute: &mut Attribute, remap: &[u16]) {
    match attribute {
        Attribute::AnnotationDefault(value) => remap_element_value(value, remap),
        Attribute::BootstrapMethods(methods) => {
            for method in methods {
                method.method_ref = r(remap, method.method_ref);
                for arg in &mut method.arguments {
                    *arg = r(remap, *arg);
                }
            }
        }
        Attribute::Code {
            instructions,
            exceptions,
            attributes,
            ..
        } => {
            for insn in instructions.values_mut() {
                remap_instruction(insn, remap);
            }
            for exception in exceptions.iter_mut() {
                exception.catch_type = r(remap, exception.catch_type);
            }
            remap_attributes(attributes, remap);
        }
        Attribute::ConstantValue(index) => *index = r(remap, *index),
        Attribute::Deprecated => {}
        Attribute::EnclosingMethod {
            class_index,
            method_index,
        } => {
            *class_index = r(remap, *class_index);
            *method_index = r(remap, *method_index);
        }
        Attribute::Exceptions(classes) => remap_list(classes, remap),
        Attribute::InnerClasses(inner_classes) => {
            for ic in inner_classes {
                ic.inner_class_info = r(remap, ic.inner_class_info);
                ic.outer_class_info = r(remap, ic.outer_class_info);
                ic.inner_name = r(remap, ic.inner_name);
            }
        }
        Attribute::LineNumberTable(_) => {}
        Attribute::LocalVariableTable(table) => {
            for entry in table {
                entry.name = r(remap, entry.name);
                entry.descriptor = r(remap, entry.descriptor);
            }
        }
        Attribute::LocalVariableTypeTable(table) => {
            for entry in table {
                entry.name = r(remap, entry.name);
                entry.signature = r(remap, entry.signature);
            }
        }
        Attribute::MethodParameters(params) => {
            for param in params {
                param.name = r(remap, param.name);
            }
        }
        Attribute::Module {
            name,
            requires,
            exports,
            opens,
            uses,
            provides,
            ..
        } => {
            *name = r(remap, *name);
            for req in requires {
                req.index = r(remap, req.index);
            }
            for e in exports {
                e.index = r(remap, e.index);
                remap_list(&mut e.to, remap);
            }
            for o in opens {
                o.index = r(remap, o.index);
                remap_list(&mut o.to, remap);
            }
            remap_list(uses, remap);
            for p in provides {
                p.index = r(remap, p.index);
                remap_list(&mut p.with, remap);
            }
        }
        Attribute::ModuleMainClass(index) => *index = r(remap, *index),
        Attribute::ModulePackages(packages) => remap_list(packages, remap),
        Attribute::NestHost(index) => *index = r(remap, *index),
        Attribute::NestMembers(members) => remap_list(members, remap),
        Attribute::Record(components) => {
            for component in components {
                component.name = r(remap, component.name);
                component.desc = r(remap, component.desc);
                remap_attributes(&mut component.attributes, remap);
            }
        }
        Attribute::PermittedSubclasses(classes) => remap_list(classes, remap),
        Attribute::RuntimeVisibleAnnotations(annotations)
        | Attribute::RuntimeInvisibleAnnotations(annotations) => {
            for annotation in annotations {
                remap_annotation(annotation, remap);
            }
        }
        Attribute::RuntimeVisibleParameterAnnotations(param_annotations)
        | Attribute::RuntimeInvisibleParameterAnnotations(param_annotations) => {
            for annotations in param_annotations {
                for annotation in annotations {
                    remap_annotation(annotation, remap);
                }
            }
        }
        Attribute::RuntimeVisibleTypeAnnotations(annotations)
        | Attribute::RuntimeInvisibleTypeAnnotations(annotations) => {
            for annotation in annotations {
                remap_annotation(&mut annotation.annotation, remap);
            }
        }
        Attribute::Signature(index) => *index = r(remap, *index),
        Attribute::Synthetic => {}
        Attribute::SourceFile(index) => *index = r(remap, *index),
        Attribute::SourceDebugExtension(_) => {}
        Attribute::StackMapTable(frames) => {
            for frame in frames {
                remap_stack_map_frame(frame, remap);
            }
        }
        Attribute::Unknown(..) => {}
    }
}

fn remap_instruction(insn: &mut Instruction, remap: &[u16]) {
    use Instruction::*;
    match insn {
        Ldc(index) | Ldc2W(index) | GetStatic(index) | PutStatic(index) | GetField(index)
        | PutField(index) | InvokeVirtual(index) | InvokeSpecial(index) | InvokeStatic(index)
        | InvokeDynamic(index) | New(index) | ANewArray(index) | CheckCast(index)
        | InstanceOf(index) => *index = r(remap, *index),
        InvokeInterface(index, _) => *index = r(remap, *index),
        MultiANewArray(index, _) => *index = r(remap, *index),
        _ => {}
    }
}

fn remap_list(items: &mut [u16], remap: &[u16]) {
    for item in items {
        *item = r(remap, *item);
    }
}

fn remap_annotation(annotation: &mut Annotation, remap: &[u16]) {
    annotation.type_index = r(remap, annotation.type_index);
    for (name_index, value) in &mut annotation.element_value_pairs {
        *name_index = r(remap, *name_index);
        remap_element_value(value, remap);
    }
}

fn remap_element_value(value: &mut ElementValue, remap: &[u16]) {
    match value {
        ElementValue::Byte(v)
        | ElementValue::Short(v)
        | ElementValue::Char(v)
        | ElementValue::Int(v)
        | ElementValue::Long(v)
        | ElementValue::Float(v)
        | ElementValue::Double(v)
        | ElementValue::Boolean(v)
        | ElementValue::String(v)
        | ElementValue::Class(v) => *v = r(remap, *v),
        ElementValue::Enum {
            type_name,
            const_name,
        } => {
            *type_name = r(remap, *type_name);
            *const_name = r(remap, *const_name);
        }
        ElementValue::Annotation(annotation) => remap_annotation(annotation, remap),
        ElementValue::Array(values) => {
            for value in values {
                remap_element_value(value, remap);
            }
        }
    }
}

fn remap_stack_map_frame(frame: &mut StackMapFrame, remap: &[u16]) {
    match frame {
        StackMapFrame::Same { .. } | StackMapFrame::Chop { .. } => {}
        StackMapFrame::Same1 { stack, .. } => remap_verification_type(stack, remap),
        StackMapFrame::Append { locals, .. } => {
            for local in locals {
                remap_verification_type(local, remap);
            }
        }
        StackMapFrame::Full { locals, stack, .. } => {
            for local in locals {
                remap_verification_type(local, remap);
            }
            for item in stack {
                remap_verification_type(item, remap);
            }
        }
    }
}

fn remap_verification_type(vtype: &mut VerificationType, remap: &[u16]) {
    if let VerificationType::Object(index) = vtype {
        *index = r(remap, *index);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constpool::{share_pool, ConstantPool};

    #[test]
    fn remaps_class_name_and_field_descriptor() {
        let mut pool = ConstantPool::new();
        let name = pool.push_class("Dup").unwrap();
        // force a gap so share_pool's compaction actually renumbers something
        let _padding = pool.push_utf8("padding").unwrap();
        let field_name = pool.push_utf8("x").unwrap();
        let field_desc = pool.push_utf8("I").unwrap();

        let mut class = Class {
            minor_version: 0,
            major_version: 55,
            access_flags: AccessFlags::PUBLIC,
            name,
            super_name: 0,
            interfaces: Vec::new(),
            fields: vec![Field {
                access_flags: AccessFlags::PRIVATE,
                name: field_name,
                desc: field_desc,
                attributes: Vec::new(),
            }],
            methods: Vec::new(),
            attributes: Vec::new(),
        };

        let (new_pool, remap) = share_pool(&pool).unwrap();
        remap_class(&mut class, &remap);

        assert_eq!(new_pool.get_class_name(class.name).unwrap(), "Dup");
        assert_eq!(new_pool.get_utf8(class.fields[0].name).unwrap(), "x");
        assert_eq!(new_pool.get_utf8(class.fields[0].desc).unwrap(), "I");
    }
}
