//! Expression lowering.
//!
//! Every lowering leaves exactly one value of the expression's static type on
//! the operand stack, except assignments, which leave nothing. Mutability of
//! bindings is enforced here: a store to an immutable binding is a user
//! diagnostic, while an indexed write through one is legal since it mutates
//! the list contents, not the binding.

use super::MethodGen;
use crate::ast::{AssignTarget, BinOp, Expr, ExprKind, Lit, Mutability, UnOp};
use crate::classfile::opcodes as op;
use crate::common::consts::{PRELUDE_CLASS, STRING_BUILDER_CLASS};
use crate::common::{Error, Result};
use crate::types::{rt, TypeDesc, TypeId, BOOLEAN, DOUBLE, FLOAT, INT, VOID};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Runtime built-in callable without a declaration
struct Builtin {
    descriptor: &'static str,
    ret: TypeId,
    /// Whether primitive arguments are boxed to fit `Object` parameters
    boxes_args: bool,
}

static BUILTINS: Lazy<HashMap<&'static str, Builtin>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert(
        "println",
        Builtin { descriptor: "(Ljava/lang/Object;)V", ret: VOID, boxes_args: true },
    );
    table.insert(
        "print",
        Builtin { descriptor: "(Ljava/lang/Object;)V", ret: VOID, boxes_args: true },
    );
    table.insert(
        "len",
        Builtin { descriptor: "(Lsable/runtime/List;)I", ret: INT, boxes_args: false },
    );
    table
});

impl MethodGen<'_> {
    /// Lower one expression; returns the interned type of the value it
    /// leaves on the stack (`VOID` for assignments)
    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> Result<TypeId> {
        let ty = self.catalog.resolve(&expr.ty);
        match &expr.kind {
            ExprKind::Literal(lit) => {
                match lit {
                    Lit::Int(v) => self.code.const_int(self.pool, *v),
                    Lit::Float(v) => self.code.const_float(self.pool, *v),
                    Lit::Double(v) => self.code.const_double(self.pool, *v),
                    Lit::Bool(v) => self.code.const_bool(*v),
                    Lit::Str(v) => self.code.const_str(self.pool, v),
                }
                Ok(ty)
            }
            ExprKind::Var(name) => self.lower_var(name, expr),
            ExprKind::Unary { op: unop, operand } => {
                let operand_ty = self.lower_expr(operand)?;
                match unop {
                    UnOp::Neg => {
                        let width = self.width_of(operand_ty);
                        let opcode = match self.catalog.get(operand_ty) {
                            TypeDesc::Int => op::INEG,
                            TypeDesc::Float => op::FNEG,
                            TypeDesc::Double => op::DNEG,
                            other => {
                                return Err(Error::internal(format!(
                                    "cannot negate a value of type {:?}",
                                    other
                                )))
                            }
                        };
                        self.code.simple(opcode, width, width);
                    }
                    UnOp::Not => {
                        self.code.const_bool(true);
                        self.code.simple(op::IXOR, 2, 1);
                    }
                }
                Ok(ty)
            }
            ExprKind::Binary { op: binop, lhs, rhs } => self.lower_binary(*binop, lhs, rhs, ty, expr),
            ExprKind::ListLit(elems) => {
                let elem_ty = self.list_elem_type(ty)?;
                self.code.new_object(self.pool, rt::LIST_CLASS);
                self.code.dup();
                self.code.invoke_special(
                    self.pool,
                    rt::LIST_CLASS,
                    rt::CONSTRUCT.name,
                    rt::CONSTRUCT.descriptor,
                );
                for elem in elems {
                    self.code.dup();
                    let got = self.lower_expr(elem)?;
                    self.widen(got, elem_ty);
                    self.box_if_primitive(elem_ty);
                    self.code.invoke_virtual(
                        self.pool,
                        rt::LIST_CLASS,
                        rt::APPEND.name,
                        rt::APPEND.descriptor,
                    );
                }
                Ok(ty)
            }
            ExprKind::Index { list, index } => {
                self.lower_expr(list)?;
                self.lower_expr(index)?;
                self.code.invoke_virtual(
                    self.pool,
                    rt::LIST_CLASS,
                    rt::GET.name,
                    rt::GET.descriptor,
                );
                self.unbox_to(ty);
                Ok(ty)
            }
            ExprKind::Assign { target, value } => self.lower_assign(target, value, expr),
            ExprKind::Call { name, args } => self.lower_call(name, args, expr),
        }
    }

    fn lower_var(&mut self, name: &str, expr: &Expr) -> Result<TypeId> {
        if let Some(binding) = self.scopes.lookup(name) {
            let (slot, ty) = (binding.slot, binding.ty);
            let width = self.width_of(ty);
            self.code.load(self.catalog.load_opcode(ty), slot, width);
            return Ok(ty);
        }
        if let Some(field) = self.fields.get(name).cloned() {
            let width = self.width_of(field.ty);
            self.code
                .get_static(self.pool, &field.owner, name, &field.descriptor, width);
            return Ok(field.ty);
        }
        Err(Error::internal(format!(
            "unresolved name `{}` at line {}",
            name, expr.span.line
        )))
    }

    fn lower_binary(
        &mut self,
        binop: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        result_ty: TypeId,
        expr: &Expr,
    ) -> Result<TypeId> {
        match binop {
            // short-circuit forms leave 1 or 0 without evaluating the right
            // operand when the left already decides
            BinOp::And => {
                let push_false = self.code.new_label();
                let end = self.code.new_label();
                self.lower_expr(lhs)?;
                self.code.branch(op::IFEQ, push_false);
                self.lower_expr(rhs)?;
                self.code.branch(op::IFEQ, push_false);
                self.code.const_bool(true);
                self.code.goto(end);
                self.code.mark(push_false)?;
                self.code.const_bool(false);
                self.code.mark(end)?;
                Ok(BOOLEAN)
            }
            BinOp::Or => {
                let push_true = self.code.new_label();
                let end = self.code.new_label();
                self.lower_expr(lhs)?;
                self.code.branch(op::IFNE, push_true);
                self.lower_expr(rhs)?;
                self.code.branch(op::IFNE, push_true);
                self.code.const_bool(false);
                self.code.goto(end);
                self.code.mark(push_true)?;
                self.code.const_bool(true);
                self.code.mark(end)?;
                Ok(BOOLEAN)
            }
            BinOp::Xor => {
                self.lower_expr(lhs)?;
                self.lower_expr(rhs)?;
                self.code.simple(op::IXOR, 2, 1);
                Ok(BOOLEAN)
            }
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                self.lower_comparison(binop, lhs, rhs)
            }
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
                if binop == BinOp::Add && self.catalog.get(result_ty) == &TypeDesc::Str {
                    return self.lower_concat(lhs, rhs, result_ty);
                }
                let lhs_ty = self.lower_expr(lhs)?;
                self.widen(lhs_ty, result_ty);
                let rhs_ty = self.lower_expr(rhs)?;
                self.widen(rhs_ty, result_ty);
                let width = self.width_of(result_ty);
                let opcode = arith_opcode(self.catalog.get(result_ty), binop).ok_or_else(|| {
                    Error::internal(format!(
                        "no arithmetic form for {:?} at line {}",
                        binop, expr.span.line
                    ))
                })?;
                self.code.simple(opcode, width * 2, width);
                Ok(result_ty)
            }
        }
    }

    /// Numeric comparison producing 1 or 0. Int operands use the fused
    /// compare-and-branch forms; float and double go through `fcmpl`/`dcmpl`
    /// and branch on the sign of the comparison word.
    fn lower_comparison(&mut self, binop: BinOp, lhs: &Expr, rhs: &Expr) -> Result<TypeId> {
        let operand_ty = self.numeric_join(lhs, rhs);
        let lhs_ty = self.lower_expr(lhs)?;
        self.widen(lhs_ty, operand_ty);
        let rhs_ty = self.lower_expr(rhs)?;
        self.widen(rhs_ty, operand_ty);

        let push_true = self.code.new_label();
        let end = self.code.new_label();
        match self.catalog.get(operand_ty) {
            TypeDesc::Int | TypeDesc::Boolean => {
                let opcode = match binop {
                    BinOp::Eq => op::IF_ICMPEQ,
                    BinOp::Ne => op::IF_ICMPNE,
                    BinOp::Lt => op::IF_ICMPLT,
                    BinOp::Le => op::IF_ICMPLE,
                    BinOp::Gt => op::IF_ICMPGT,
                    _ => op::IF_ICMPGE,
                };
                self.code.branch(opcode, push_true);
            }
            TypeDesc::Float | TypeDesc::Double => {
                let (cmp, pops) = if *self.catalog.get(operand_ty) == TypeDesc::Float {
                    (op::FCMPL, 2)
                } else {
                    (op::DCMPL, 4)
                };
                self.code.simple(cmp, pops, 1);
                let opcode = match binop {
                    BinOp::Eq => op::IFEQ,
                    BinOp::Ne => op::IFNE,
                    BinOp::Lt => op::IFLT,
                    BinOp::Le => op::IFLE,
                    BinOp::Gt => op::IFGT,
                    _ => op::IFGE,
                };
                self.code.branch(opcode, push_true);
            }
            // reference operands support identity equality only
            TypeDesc::Str | TypeDesc::Object(_) | TypeDesc::List(_) => {
                let opcode = match binop {
                    BinOp::Eq => op::IF_ACMPEQ,
                    BinOp::Ne => op::IF_ACMPNE,
                    other => {
                        return Err(Error::internal(format!(
                            "no ordering between references ({:?})",
                            other
                        )))
                    }
                };
                self.code.branch(opcode, push_true);
            }
            other => {
                return Err(Error::internal(format!(
                    "cannot compare values of type {:?}",
                    other
                )))
            }
        }
        self.code.const_bool(false);
        self.code.goto(end);
        self.code.mark(push_true)?;
        self.code.const_bool(true);
        self.code.mark(end)?;
        Ok(BOOLEAN)
    }

    /// String concatenation through a StringBuilder, appending each side with
    /// the overload matching its static type
    fn lower_concat(&mut self, lhs: &Expr, rhs: &Expr, result_ty: TypeId) -> Result<TypeId> {
        self.code.new_object(self.pool, STRING_BUILDER_CLASS);
        self.code.dup();
        self.code
            .invoke_special(self.pool, STRING_BUILDER_CLASS, "<init>", "()V");
        self.append_to_builder(lhs)?;
        self.append_to_builder(rhs)?;
        self.code.invoke_virtual(
            self.pool,
            STRING_BUILDER_CLASS,
            "toString",
            "()Ljava/lang/String;",
        );
        Ok(result_ty)
    }

    fn append_to_builder(&mut self, operand: &Expr) -> Result<()> {
        let ty = self.lower_expr(operand)?;
        let descriptor = match self.catalog.get(ty) {
            TypeDesc::Int => "(I)Ljava/lang/StringBuilder;",
            TypeDesc::Float => "(F)Ljava/lang/StringBuilder;",
            TypeDesc::Double => "(D)Ljava/lang/StringBuilder;",
            TypeDesc::Boolean => "(Z)Ljava/lang/StringBuilder;",
            TypeDesc::Str => "(Ljava/lang/String;)Ljava/lang/StringBuilder;",
            _ => "(Ljava/lang/Object;)Ljava/lang/StringBuilder;",
        };
        self.code
            .invoke_virtual(self.pool, STRING_BUILDER_CLASS, "append", descriptor);
        Ok(())
    }

    fn lower_assign(
        &mut self,
        target: &AssignTarget,
        value: &Expr,
        expr: &Expr,
    ) -> Result<TypeId> {
        match target {
            AssignTarget::Name(name) => {
                if let Some(binding) = self.scopes.lookup(name) {
                    if binding.mutability == Mutability::Immutable {
                        return Err(Error::immutable_assignment(name, expr.span));
                    }
                    let (slot, ty) = (binding.slot, binding.ty);
                    let width = self.width_of(ty);
                    let got = self.lower_expr(value)?;
                    self.widen(got, ty);
                    self.code.store(self.catalog.store_opcode(ty), slot, width);
                    return Ok(VOID);
                }
                if let Some(field) = self.fields.get(name).cloned() {
                    if field.mutability == Mutability::Immutable {
                        return Err(Error::immutable_assignment(name, expr.span));
                    }
                    let width = self.width_of(field.ty);
                    let got = self.lower_expr(value)?;
                    self.widen(got, field.ty);
                    self.code
                        .put_static(self.pool, &field.owner, name, &field.descriptor, width);
                    return Ok(VOID);
                }
                Err(Error::internal(format!(
                    "unresolved assignment target `{}` at line {}",
                    name, expr.span.line
                )))
            }
            // element writes mutate the list contents, never the binding, so
            // no mutability check applies
            AssignTarget::Index { list, index } => {
                let list_ty = self.lower_expr(list)?;
                let elem_ty = self.list_elem_type(list_ty)?;
                self.lower_expr(index)?;
                let got = self.lower_expr(value)?;
                self.widen(got, elem_ty);
                self.box_if_primitive(elem_ty);
                self.code.invoke_virtual(
                    self.pool,
                    rt::LIST_CLASS,
                    rt::SET.name,
                    rt::SET.descriptor,
                );
                Ok(VOID)
            }
        }
    }

    fn lower_call(&mut self, name: &str, args: &[Expr], expr: &Expr) -> Result<TypeId> {
        if let Some(sig) = self.functions.get(name).cloned() {
            if args.len() != sig.params.len() {
                return Err(Error::internal(format!(
                    "`{}` expects {} argument(s), got {} at line {}",
                    name,
                    sig.params.len(),
                    args.len(),
                    expr.span.line
                )));
            }
            for (arg, param_ty) in args.iter().zip(&sig.params) {
                let got = self.lower_expr(arg)?;
                self.widen(got, *param_ty);
            }
            self.code
                .invoke_static(self.pool, &sig.owner, name, &sig.descriptor);
            return Ok(sig.ret);
        }
        if let Some(builtin) = BUILTINS.get(name) {
            let (descriptor, ret, boxes) = (builtin.descriptor, builtin.ret, builtin.boxes_args);
            for arg in args {
                let got = self.lower_expr(arg)?;
                if boxes {
                    self.box_if_primitive(got);
                }
            }
            self.code
                .invoke_static(self.pool, PRELUDE_CLASS, name, descriptor);
            return Ok(ret);
        }
        Err(Error::internal(format!(
            "call to unknown function `{}` at line {}",
            name, expr.span.line
        )))
    }

    /// Numeric widening; a no-op when the types already agree or are not a
    /// widening pair
    pub(crate) fn widen(&mut self, from: TypeId, to: TypeId) {
        if from == to {
            return;
        }
        match (from, to) {
            (INT, FLOAT) => self.code.simple(op::I2F, 1, 1),
            (INT, DOUBLE) => self.code.simple(op::I2D, 1, 2),
            (FLOAT, DOUBLE) => self.code.simple(op::F2D, 1, 2),
            _ => {}
        }
    }

    /// Common operand type of a mixed numeric pair
    fn numeric_join(&mut self, lhs: &Expr, rhs: &Expr) -> TypeId {
        let l = self.catalog.resolve(&lhs.ty);
        let r = self.catalog.resolve(&rhs.ty);
        if l == DOUBLE || r == DOUBLE {
            DOUBLE
        } else if l == FLOAT || r == FLOAT {
            FLOAT
        } else if l == r {
            l
        } else {
            INT
        }
    }
}

fn arith_opcode(desc: &TypeDesc, binop: BinOp) -> Option<u8> {
    let opcode = match (desc, binop) {
        (TypeDesc::Int, BinOp::Add) => op::IADD,
        (TypeDesc::Int, BinOp::Sub) => op::ISUB,
        (TypeDesc::Int, BinOp::Mul) => op::IMUL,
        (TypeDesc::Int, BinOp::Div) => op::IDIV,
        (TypeDesc::Int, BinOp::Rem) => op::IREM,
        (TypeDesc::Float, BinOp::Add) => op::FADD,
        (TypeDesc::Float, BinOp::Sub) => op::FSUB,
        (TypeDesc::Float, BinOp::Mul) => op::FMUL,
        (TypeDesc::Float, BinOp::Div) => op::FDIV,
        (TypeDesc::Float, BinOp::Rem) => op::FREM,
        (TypeDesc::Double, BinOp::Add) => op::DADD,
        (TypeDesc::Double, BinOp::Sub) => op::DSUB,
        (TypeDesc::Double, BinOp::Mul) => op::DMUL,
        (TypeDesc::Double, BinOp::Div) => op::DDIV,
        (TypeDesc::Double, BinOp::Rem) => op::DREM,
        _ => return None,
    };
    Some(opcode)
}
