//! Method body buffer
//!
//! Instructions are collected in an arena with symbolic branch labels and
//! per-instruction stack effects. `finalize` resolves labels to byte
//! offsets, patches branch operands, and simulates stack depth along every
//! path; the method is rejected if depth goes negative or disagrees at a
//! merge point (that would be a backend bug, not user input).

use crate::classfile::constpool::ConstantPool;
use crate::classfile::opcodes as op;
use crate::common::{Error, Result};
use std::collections::HashMap;

/// Symbolic branch target, resolved at finalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(u32);

#[derive(Debug, Clone, Copy)]
enum Operand {
    None,
    Imm1(i8),
    Imm2(i16),
    Slot(u8),
    /// 1-byte constant pool index (ldc)
    PoolNarrow(u8),
    /// 2-byte constant pool index
    Pool(u16),
    Branch(Label),
    /// invokeinterface: pool index, arg slot count (plus the mandatory zero byte)
    Iface(u16, u8),
}

#[derive(Debug)]
struct Insn {
    op: u8,
    operand: Operand,
    /// Stack slots consumed, in widths
    pops: u16,
    /// Stack slots produced, in widths
    pushes: u16,
}

impl Insn {
    fn width(&self) -> usize {
        1 + match self.operand {
            Operand::None => 0,
            Operand::Imm1(_) | Operand::Slot(_) | Operand::PoolNarrow(_) => 1,
            Operand::Imm2(_) | Operand::Pool(_) | Operand::Branch(_) => 2,
            Operand::Iface(_, _) => 4,
        }
    }

    fn ends_flow(&self) -> bool {
        self.op == op::GOTO || (op::IRETURN..=op::RETURN).contains(&self.op)
    }
}

/// Result of finalizing a method body
#[derive(Debug)]
pub struct FinalizedCode {
    pub max_stack: u16,
    pub max_locals: u16,
    pub bytes: Vec<u8>,
    /// (pc, source line) pairs in emission order
    pub line_table: Vec<(u16, u16)>,
}

#[derive(Debug, Default)]
pub struct Code {
    insns: Vec<Insn>,
    /// Label id -> instruction boundary where it was placed
    labels: Vec<Option<usize>>,
    /// (instruction boundary, source line) marks recorded during lowering
    line_marks: Vec<(usize, u16)>,
    pub max_locals: u16,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self, opc: u8, operand: Operand, pops: u16, pushes: u16) {
        self.insns.push(Insn { op: opc, operand, pops, pushes });
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() as u32 - 1)
    }

    /// Place a label at the current position. Each label is placed at most
    /// once; a second placement is a backend defect.
    pub fn mark(&mut self, label: Label) -> Result<()> {
        let slot = &mut self.labels[label.0 as usize];
        if slot.is_some() {
            return Err(Error::internal(format!("label {:?} placed twice", label)));
        }
        *slot = Some(self.insns.len());
        Ok(())
    }

    pub fn mark_line(&mut self, line: u32) {
        let boundary = self.insns.len();
        // collapse repeated marks at the same position
        if self.line_marks.last().map(|&(b, _)| b) == Some(boundary) {
            self.line_marks.pop();
        }
        self.line_marks.push((boundary, line as u16));
    }

    /// Whether execution can run past the last emitted instruction
    pub fn falls_through(&self) -> bool {
        self.insns.last().map_or(true, |insn| !insn.ends_flow())
    }

    // ---- constants ----

    pub fn const_int(&mut self, pool: &mut ConstantPool, value: i32) {
        match value {
            -1 => self.emit(op::ICONST_M1, Operand::None, 0, 1),
            0..=5 => self.emit(op::ICONST_0 + value as u8, Operand::None, 0, 1),
            -128..=127 => self.emit(op::BIPUSH, Operand::Imm1(value as i8), 0, 1),
            -32768..=32767 => self.emit(op::SIPUSH, Operand::Imm2(value as i16), 0, 1),
            _ => {
                let index = pool.add_integer(value);
                self.ldc(index, 1);
            }
        }
    }

    pub fn const_float(&mut self, pool: &mut ConstantPool, value: f32) {
        if value == 0.0 {
            self.emit(op::FCONST_0, Operand::None, 0, 1);
        } else if value == 1.0 {
            self.emit(op::FCONST_1, Operand::None, 0, 1);
        } else if value == 2.0 {
            self.emit(op::FCONST_2, Operand::None, 0, 1);
        } else {
            let index = pool.add_float(value);
            self.ldc(index, 1);
        }
    }

    pub fn const_double(&mut self, pool: &mut ConstantPool, value: f64) {
        if value == 0.0 {
            self.emit(op::DCONST_0, Operand::None, 0, 2);
        } else if value == 1.0 {
            self.emit(op::DCONST_1, Operand::None, 0, 2);
        } else {
            let index = pool.add_double(value);
            self.emit(op::LDC2_W, Operand::Pool(index), 0, 2);
        }
    }

    pub fn const_bool(&mut self, value: bool) {
        self.emit(if value { op::ICONST_1 } else { op::ICONST_0 }, Operand::None, 0, 1);
    }

    pub fn const_str(&mut self, pool: &mut ConstantPool, value: &str) {
        let index = pool.add_string(value);
        self.ldc(index, 1);
    }

    fn ldc(&mut self, index: u16, width: u16) {
        if index <= u8::MAX as u16 {
            self.emit(op::LDC, Operand::PoolNarrow(index as u8), 0, width);
        } else {
            self.emit(op::LDC_W, Operand::Pool(index), 0, width);
        }
    }

    // ---- locals ----

    pub fn load(&mut self, opcode: u8, slot: u16, width: u16) {
        self.emit(opcode, Operand::Slot(slot as u8), 0, width);
        self.track_local(slot, width);
    }

    pub fn store(&mut self, opcode: u8, slot: u16, width: u16) {
        self.emit(opcode, Operand::Slot(slot as u8), width, 0);
        self.track_local(slot, width);
    }

    fn track_local(&mut self, slot: u16, width: u16) {
        self.max_locals = self.max_locals.max(slot + width);
    }

    // ---- arithmetic, conversions, stack shuffling ----

    /// Emit an operand-less instruction with an explicit stack effect
    pub fn simple(&mut self, opcode: u8, pops: u16, pushes: u16) {
        self.emit(opcode, Operand::None, pops, pushes);
    }

    pub fn dup(&mut self) {
        self.emit(op::DUP, Operand::None, 0, 1);
    }

    /// Discard the top value of the given width
    pub fn pop_value(&mut self, width: u16) {
        match width {
            0 => {}
            1 => self.emit(op::POP, Operand::None, 1, 0),
            _ => self.emit(op::POP2, Operand::None, 2, 0),
        }
    }

    // ---- branches ----

    pub fn branch(&mut self, opcode: u8, target: Label) {
        // the two-operand compare-and-branch forms, int and reference
        let pops = if (op::IF_ICMPEQ..=op::IF_ACMPNE).contains(&opcode) { 2 } else { 1 };
        self.emit(opcode, Operand::Branch(target), pops, 0);
    }

    pub fn goto(&mut self, target: Label) {
        self.emit(op::GOTO, Operand::Branch(target), 0, 0);
    }

    // ---- fields and methods ----

    pub fn get_static(&mut self, pool: &mut ConstantPool, class: &str, name: &str, descriptor: &str, width: u16) {
        let index = pool.add_field_ref(class, name, descriptor);
        self.emit(op::GETSTATIC, Operand::Pool(index), 0, width);
    }

    pub fn put_static(&mut self, pool: &mut ConstantPool, class: &str, name: &str, descriptor: &str, width: u16) {
        let index = pool.add_field_ref(class, name, descriptor);
        self.emit(op::PUTSTATIC, Operand::Pool(index), width, 0);
    }

    pub fn get_field(&mut self, pool: &mut ConstantPool, class: &str, name: &str, descriptor: &str, width: u16) {
        let index = pool.add_field_ref(class, name, descriptor);
        self.emit(op::GETFIELD, Operand::Pool(index), 1, width);
    }

    pub fn put_field(&mut self, pool: &mut ConstantPool, class: &str, name: &str, descriptor: &str, width: u16) {
        let index = pool.add_field_ref(class, name, descriptor);
        self.emit(op::PUTFIELD, Operand::Pool(index), 1 + width, 0);
    }

    pub fn invoke_static(&mut self, pool: &mut ConstantPool, class: &str, name: &str, descriptor: &str) {
        let (args, ret) = descriptor_widths(descriptor);
        let index = pool.add_method_ref(class, name, descriptor);
        self.emit(op::INVOKESTATIC, Operand::Pool(index), args, ret);
    }

    pub fn invoke_virtual(&mut self, pool: &mut ConstantPool, class: &str, name: &str, descriptor: &str) {
        let (args, ret) = descriptor_widths(descriptor);
        let index = pool.add_method_ref(class, name, descriptor);
        self.emit(op::INVOKEVIRTUAL, Operand::Pool(index), args + 1, ret);
    }

    pub fn invoke_special(&mut self, pool: &mut ConstantPool, class: &str, name: &str, descriptor: &str) {
        let (args, ret) = descriptor_widths(descriptor);
        let index = pool.add_method_ref(class, name, descriptor);
        self.emit(op::INVOKESPECIAL, Operand::Pool(index), args + 1, ret);
    }

    pub fn invoke_interface(&mut self, pool: &mut ConstantPool, class: &str, name: &str, descriptor: &str) {
        let (args, ret) = descriptor_widths(descriptor);
        let index = pool.add_interface_method_ref(class, name, descriptor);
        self.emit(op::INVOKEINTERFACE, Operand::Iface(index, args as u8 + 1), args + 1, ret);
    }

    pub fn new_object(&mut self, pool: &mut ConstantPool, class: &str) {
        let index = pool.add_class(class);
        self.emit(op::NEW, Operand::Pool(index), 0, 1);
    }

    pub fn checkcast(&mut self, pool: &mut ConstantPool, class: &str) {
        let index = pool.add_class(class);
        self.emit(op::CHECKCAST, Operand::Pool(index), 1, 1);
    }

    pub fn ret(&mut self, opcode: u8, width: u16) {
        self.emit(opcode, Operand::None, width, 0);
    }

    // ---- finalization ----

    /// Resolve labels, patch branches and compute max-stack by simulating
    /// stack effects along every instruction path.
    pub fn finalize(self) -> Result<FinalizedCode> {
        // byte offset of every instruction boundary
        let mut offsets = Vec::with_capacity(self.insns.len() + 1);
        let mut pc = 0usize;
        for insn in &self.insns {
            offsets.push(pc);
            pc += insn.width();
        }
        offsets.push(pc);
        if pc > u16::MAX as usize {
            return Err(Error::internal("method body exceeds bytecode size limit"));
        }

        // invert the label table: boundary -> labels placed there
        let mut marks: HashMap<usize, Vec<u32>> = HashMap::new();
        for (id, placed) in self.labels.iter().enumerate() {
            if let Some(boundary) = placed {
                marks.entry(*boundary).or_default().push(id as u32);
            }
        }

        let mut label_depth: HashMap<u32, u16> = HashMap::new();
        let mut depth: Option<u16> = Some(0);
        let mut max_stack: u16 = 0;

        let record = |table: &mut HashMap<u32, u16>, label: u32, d: u16| -> Result<()> {
            match table.insert(label, d) {
                Some(previous) if previous != d => Err(Error::internal(format!(
                    "stack imbalance: depth {} meets {} at merge point",
                    previous, d
                ))),
                _ => Ok(()),
            }
        };

        for (i, insn) in self.insns.iter().enumerate() {
            if let Some(labels_here) = marks.get(&i) {
                for &label in labels_here {
                    match (depth, label_depth.get(&label).copied()) {
                        (Some(cur), Some(recorded)) if cur != recorded => {
                            return Err(Error::internal(format!(
                                "stack imbalance: depth {} meets {} at merge point",
                                cur, recorded
                            )));
                        }
                        (Some(cur), None) => {
                            label_depth.insert(label, cur);
                        }
                        (None, Some(recorded)) => depth = Some(recorded),
                        _ => {}
                    }
                }
            }

            let Some(cur) = depth else {
                // unreachable instruction; nothing to simulate
                continue;
            };
            if insn.pops > cur {
                return Err(Error::internal(format!(
                    "stack imbalance: operand stack underflow at pc {}",
                    offsets[i]
                )));
            }
            let after = cur - insn.pops + insn.pushes;
            max_stack = max_stack.max(cur).max(after);

            if let Operand::Branch(target) = insn.operand {
                record(&mut label_depth, target.0, after)?;
            }
            depth = if insn.ends_flow() { None } else { Some(after) };
        }

        // serialize, patching branch offsets
        let mut bytes = Vec::with_capacity(pc);
        for (i, insn) in self.insns.iter().enumerate() {
            bytes.push(insn.op);
            match insn.operand {
                Operand::None => {}
                Operand::Imm1(v) => bytes.push(v as u8),
                Operand::Imm2(v) => bytes.extend_from_slice(&v.to_be_bytes()),
                Operand::Slot(v) => bytes.push(v),
                Operand::PoolNarrow(v) => bytes.push(v),
                Operand::Pool(v) => bytes.extend_from_slice(&v.to_be_bytes()),
                Operand::Branch(target) => {
                    let boundary = self.labels[target.0 as usize].ok_or_else(|| {
                        Error::internal(format!("branch to undefined label {:?}", target))
                    })?;
                    let rel = offsets[boundary] as i64 - offsets[i] as i64;
                    let rel = i16::try_from(rel).map_err(|_| {
                        Error::internal("branch offset exceeds 16-bit range")
                    })?;
                    bytes.extend_from_slice(&rel.to_be_bytes());
                }
                Operand::Iface(index, count) => {
                    bytes.extend_from_slice(&index.to_be_bytes());
                    bytes.push(count);
                    bytes.push(0);
                }
            }
        }

        let line_table = self
            .line_marks
            .iter()
            .map(|&(boundary, line)| (offsets[boundary] as u16, line))
            .collect();

        Ok(FinalizedCode { max_stack, max_locals: self.max_locals, bytes, line_table })
    }
}

/// Slot widths of a method descriptor's parameters and return value
pub fn descriptor_widths(descriptor: &str) -> (u16, u16) {
    let inner = descriptor
        .strip_prefix('(')
        .and_then(|d| d.split_once(')'))
        .unwrap_or(("", "V"));
    (params_width(inner.0), type_width(inner.1))
}

fn params_width(mut params: &str) -> u16 {
    let mut width = 0;
    while !params.is_empty() {
        let (w, rest) = next_param_width(params);
        width += w;
        params = rest;
    }
    width
}

fn next_param_width(s: &str) -> (u16, &str) {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, 'D')) | Some((_, 'J')) => (2, &s[1..]),
        Some((_, 'L')) => {
            let end = s.find(';').map_or(s.len(), |i| i + 1);
            (1, &s[end..])
        }
        Some((_, '[')) => {
            let (_, rest) = next_param_width(&s[1..]);
            (1, rest)
        }
        Some(_) => (1, &s[1..]),
        None => (0, s),
    }
}

fn type_width(s: &str) -> u16 {
    match s.chars().next() {
        Some('V') | None => 0,
        Some('D') | Some('J') => 2,
        _ => 1,
    }
}
