//! Slot and scope allocation for method locals
//!
//! Slot numbering is monotonic within a method; when a scope exits, its
//! slot range is released so a sibling scope can reuse it. The high-water
//! mark across the whole method becomes max-locals.

use crate::ast::{Mutability, Span};
use crate::common::{Error, Result};
use crate::types::TypeId;

/// Local slots addressable by the one-byte slot operands emitted here
const MAX_SLOTS: u16 = 256;

/// A named local with its storage slot and fixed mutability
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub ty: TypeId,
    pub mutability: Mutability,
    pub slot: u16,
}

#[derive(Debug)]
struct ScopeData {
    /// Value of `next_slot` when this scope was entered; restored on exit
    watermark: u16,
    bindings: Vec<Binding>,
}

#[derive(Debug)]
pub struct Scopes {
    stack: Vec<ScopeData>,
    next_slot: u16,
    max_slots: u16,
    temp_counter: u32,
}

impl Scopes {
    pub fn new() -> Self {
        Self { stack: Vec::new(), next_slot: 0, max_slots: 0, temp_counter: 0 }
    }

    pub fn enter_scope(&mut self) {
        self.stack.push(ScopeData { watermark: self.next_slot, bindings: Vec::new() });
    }

    /// Close the innermost scope, releasing its slots for sibling reuse.
    /// Closing with no scope open is a backend defect.
    pub fn exit_scope(&mut self) -> Result<()> {
        let scope = self
            .stack
            .pop()
            .ok_or_else(|| Error::internal("scope closed without a matching open"))?;
        self.next_slot = scope.watermark;
        Ok(())
    }

    /// Declare a binding in the innermost scope
    pub fn declare(
        &mut self,
        name: &str,
        ty: TypeId,
        width: u16,
        mutability: Mutability,
        span: Span,
    ) -> Result<&Binding> {
        let current = self
            .stack
            .last()
            .ok_or_else(|| Error::internal("declaration outside any scope"))?;
        if current.bindings.iter().any(|b| b.name == name) {
            return Err(Error::duplicate_binding(name, span));
        }
        let slot = self.next_slot;
        // slot operands are one byte in the emitted form
        if slot + width > MAX_SLOTS {
            return Err(Error::internal(format!(
                "local slot space exhausted declaring `{}`",
                name
            )));
        }
        self.next_slot += width;
        self.max_slots = self.max_slots.max(self.next_slot);
        let scope = self.stack.last_mut().unwrap();
        scope.bindings.push(Binding {
            name: name.to_string(),
            ty,
            mutability,
            slot,
        });
        Ok(scope.bindings.last().unwrap())
    }

    /// Allocate an anonymous slot for a synthesized temporary (e.g. the
    /// iterator of a for-each); released with the enclosing scope
    pub fn declare_temp(&mut self, ty: TypeId, width: u16) -> Result<u16> {
        self.temp_counter += 1;
        let name = format!("$tmp{}", self.temp_counter);
        self.declare(&name, ty, width, Mutability::Immutable, Span::default())
            .map(|b| b.slot)
    }

    /// Resolve a name through the scope chain, innermost first
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.stack
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.iter().find(|b| b.name == name))
    }

    /// High-water slot count across the method
    pub fn max_slots(&self) -> u16 {
        self.max_slots
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}
