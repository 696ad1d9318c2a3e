//! Core classfile structures: ClassFile, FieldInfo, MethodInfo

use super::attribute::AttributeInfo;
use super::constpool::ConstantPool;
use super::defs::MAGIC;

#[derive(Debug)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    pub fn new(major_version: u16) -> Self {
        Self {
            magic: MAGIC,
            minor_version: 0,
            major_version,
            constant_pool: ConstantPool::new(),
            access_flags: 0,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Find a method by name; convenience for callers inspecting the shape
    /// of an assembled class
    pub fn method_named(&self, name: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| self.constant_pool.utf8_at(m.name_index) == Some(name))
    }
}

#[derive(Debug)]
pub struct FieldInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl FieldInfo {
    pub fn new(access_flags: u16, name_index: u16, descriptor_index: u16) -> Self {
        Self { access_flags, name_index, descriptor_index, attributes: Vec::new() }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        member_bytes(self.access_flags, self.name_index, self.descriptor_index, &self.attributes)
    }
}

#[derive(Debug)]
pub struct MethodInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl MethodInfo {
    pub fn new(access_flags: u16, name_index: u16, descriptor_index: u16) -> Self {
        Self { access_flags, name_index, descriptor_index, attributes: Vec::new() }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        member_bytes(self.access_flags, self.name_index, self.descriptor_index, &self.attributes)
    }
}

fn member_bytes(
    access_flags: u16,
    name_index: u16,
    descriptor_index: u16,
    attributes: &[AttributeInfo],
) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&access_flags.to_be_bytes());
    bytes.extend_from_slice(&name_index.to_be_bytes());
    bytes.extend_from_slice(&descriptor_index.to_be_bytes());
    bytes.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
    for attribute in attributes {
        bytes.extend_from_slice(&attribute.to_bytes());
    }
    bytes
}
