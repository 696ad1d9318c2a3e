//! Serialization of classfile structures into their binary form

use super::class::ClassFile;

/// Serialize a finished [`ClassFile`] into class-file bytes
pub fn class_file_to_bytes(class_file: &ClassFile) -> Vec<u8> {
    let mut bytes = Vec::new();

    bytes.extend_from_slice(&class_file.magic.to_be_bytes());
    bytes.extend_from_slice(&class_file.minor_version.to_be_bytes());
    bytes.extend_from_slice(&class_file.major_version.to_be_bytes());

    bytes.extend_from_slice(&class_file.constant_pool.to_bytes());

    bytes.extend_from_slice(&class_file.access_flags.to_be_bytes());
    bytes.extend_from_slice(&class_file.this_class.to_be_bytes());
    bytes.extend_from_slice(&class_file.super_class.to_be_bytes());

    bytes.extend_from_slice(&(class_file.interfaces.len() as u16).to_be_bytes());
    for interface in &class_file.interfaces {
        bytes.extend_from_slice(&interface.to_be_bytes());
    }

    bytes.extend_from_slice(&(class_file.fields.len() as u16).to_be_bytes());
    for field in &class_file.fields {
        bytes.extend_from_slice(&field.to_bytes());
    }

    bytes.extend_from_slice(&(class_file.methods.len() as u16).to_be_bytes());
    for method in &class_file.methods {
        bytes.extend_from_slice(&method.to_bytes());
    }

    bytes.extend_from_slice(&(class_file.attributes.len() as u16).to_be_bytes());
    for attribute in &class_file.attributes {
        bytes.extend_from_slice(&attribute.to_bytes());
    }

    bytes
}
