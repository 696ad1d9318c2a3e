//! Statement and control-flow lowering.
//!
//! Blocks open a fresh scope so sibling blocks reuse the same local slots.
//! Loop shapes are the standard pre-test forms: condition first, a
//! conditional branch past the body, and an unconditional branch back to
//! the top.

use super::MethodGen;
use crate::ast::{Block, Mutability, Stmt};
use crate::classfile::opcodes as op;
use crate::common::Result;
use crate::types::{rt, ITERATOR, VOID};

impl MethodGen<'_> {
    pub(crate) fn lower_block(&mut self, block: &Block) -> Result<()> {
        self.scopes.enter_scope();
        for stmt in &block.stmts {
            self.lower_stmt(stmt)?;
        }
        self.scopes.exit_scope()?;
        Ok(())
    }

    pub(crate) fn lower_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Expr(expr) => {
                self.code.mark_line(expr.span.line);
                let ty = self.lower_expr(expr)?;
                self.code.pop_value(self.width_of(ty));
                Ok(())
            }
            Stmt::Decl { name, ty, mutability, init, span } => {
                self.code.mark_line(span.line);
                let declared = self.catalog.resolve(ty);
                let width = self.catalog.width(declared);
                let got = self.lower_expr(init)?;
                self.widen(got, declared);
                // declared after the initializer so the initializer cannot
                // observe the new binding
                let slot = self
                    .scopes
                    .declare(name, declared, width, *mutability, *span)?
                    .slot;
                self.code.store(self.catalog.store_opcode(declared), slot, width);
                Ok(())
            }
            Stmt::Block(block) => self.lower_block(block),
            Stmt::If { cond, then_block, else_block, span } => {
                self.code.mark_line(span.line);
                match else_block {
                    Some(else_block) => {
                        let else_start = self.code.new_label();
                        let join = self.code.new_label();
                        self.lower_expr(cond)?;
                        self.code.branch(op::IFEQ, else_start);
                        self.lower_block(then_block)?;
                        if self.code.falls_through() {
                            self.code.goto(join);
                        }
                        self.code.mark(else_start)?;
                        self.lower_block(else_block)?;
                        self.code.mark(join)?;
                    }
                    None => {
                        let join = self.code.new_label();
                        self.lower_expr(cond)?;
                        self.code.branch(op::IFEQ, join);
                        self.lower_block(then_block)?;
                        self.code.mark(join)?;
                    }
                }
                Ok(())
            }
            Stmt::While { cond, body, span } => {
                let top = self.code.new_label();
                let exit = self.code.new_label();
                self.code.mark(top)?;
                self.code.mark_line(span.line);
                self.lower_expr(cond)?;
                self.code.branch(op::IFEQ, exit);
                self.lower_block(body)?;
                self.code.goto(top);
                self.code.mark(exit)?;
                Ok(())
            }
            Stmt::ForEach { var, list, body, span } => {
                self.code.mark_line(span.line);
                self.scopes.enter_scope();

                let list_ty = self.lower_expr(list)?;
                let elem_ty = self.list_elem_type(list_ty)?;
                self.code.invoke_virtual(
                    self.pool,
                    rt::LIST_CLASS,
                    rt::ITERATOR.name,
                    rt::ITERATOR.descriptor,
                );
                let iter_slot = self.scopes.declare_temp(ITERATOR, 1)?;
                self.code.store(op::ASTORE, iter_slot, 1);

                let top = self.code.new_label();
                let exit = self.code.new_label();
                self.code.mark(top)?;
                self.code.load(op::ALOAD, iter_slot, 1);
                self.code.invoke_interface(
                    self.pool,
                    rt::ITERATOR_CLASS,
                    rt::HAS_NEXT.name,
                    rt::HAS_NEXT.descriptor,
                );
                self.code.branch(op::IFEQ, exit);

                self.code.load(op::ALOAD, iter_slot, 1);
                self.code.invoke_interface(
                    self.pool,
                    rt::ITERATOR_CLASS,
                    rt::NEXT.name,
                    rt::NEXT.descriptor,
                );
                self.unbox_to(elem_ty);
                let width = self.width_of(elem_ty);
                // the loop variable is a fresh immutable binding per element
                let slot = self
                    .scopes
                    .declare(var, elem_ty, width, Mutability::Immutable, *span)?
                    .slot;
                self.code.store(self.catalog.store_opcode(elem_ty), slot, width);

                self.lower_block(body)?;
                self.code.goto(top);
                self.code.mark(exit)?;
                self.scopes.exit_scope()?;
                Ok(())
            }
            Stmt::Return { value, span } => {
                self.code.mark_line(span.line);
                match value {
                    Some(expr) => {
                        let got = self.lower_expr(expr)?;
                        self.widen(got, self.ret);
                        let width = self.width_of(self.ret);
                        self.code.ret(self.catalog.return_opcode(self.ret), width);
                    }
                    None => {
                        debug_assert_eq!(self.ret, VOID);
                        self.code.ret(op::RETURN, 0);
                    }
                }
                Ok(())
            }
        }
    }
}
