//! Attribute structures for class files

use super::constpool::ConstantPool;

#[derive(Debug)]
pub struct AttributeInfo {
    pub name_index: u16,
    pub info: Vec<u8>,
}

impl AttributeInfo {
    pub fn new(name_index: u16, info: Vec<u8>) -> Self {
        Self { name_index, info }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.name_index.to_be_bytes());
        bytes.extend_from_slice(&(self.info.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.info);
        bytes
    }
}

#[derive(Debug)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        Self { max_stack, max_locals, code, attributes: Vec::new() }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.max_stack.to_be_bytes());
        bytes.extend_from_slice(&self.max_locals.to_be_bytes());
        bytes.extend_from_slice(&(self.code.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.code);
        // exception table; none of the lowered forms produce handlers
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&(self.attributes.len() as u16).to_be_bytes());
        for attribute in &self.attributes {
            bytes.extend_from_slice(&attribute.to_bytes());
        }
        bytes
    }
}

/// Helper to wrap a CodeAttribute payload into a named attribute
pub fn make_code_attribute(constant_pool: &mut ConstantPool, code: &CodeAttribute) -> AttributeInfo {
    let name_index = constant_pool.add_utf8("Code");
    AttributeInfo::new(name_index, code.to_bytes())
}

#[derive(Debug, Default)]
pub struct LineNumberTableAttribute {
    pub entries: Vec<(u16, u16)>,
}

impl LineNumberTableAttribute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, start_pc: u16, line_number: u16) {
        self.entries.push((start_pc, line_number));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(self.entries.len() as u16).to_be_bytes());
        for (start_pc, line_number) in &self.entries {
            bytes.extend_from_slice(&start_pc.to_be_bytes());
            bytes.extend_from_slice(&line_number.to_be_bytes());
        }
        bytes
    }
}

/// Helper to build an AttributeInfo for LineNumberTable
pub fn make_line_number_table_attribute(
    constant_pool: &mut ConstantPool,
    table: &LineNumberTableAttribute,
) -> AttributeInfo {
    let name_index = constant_pool.add_utf8("LineNumberTable");
    AttributeInfo::new(name_index, table.to_bytes())
}
