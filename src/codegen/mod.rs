//! Code generation: typed tree in, class files out.
//!
//! The assembler walks one unit, builds a [`ClassFile`] per declared class
//! (plus the module class holding top-level functions), synthesizes the
//! implicit constructor and the static initializer, and serializes the
//! result. Expression and statement lowering live in [`gen_expr`] and
//! [`gen_stmt`]; both append to the [`code::Code`] buffer owned by a
//! [`MethodGen`].

pub mod code;
pub mod gen_expr;
pub mod gen_stmt;
pub mod scope;

use crate::ast::{FieldDecl, FunctionDecl, Mutability, Program, Type};
use crate::classfile::attribute::{
    make_code_attribute, make_line_number_table_attribute, CodeAttribute,
    LineNumberTableAttribute,
};
use crate::classfile::constpool::ConstantPool;
use crate::classfile::defs::{CONSTRUCTOR_METHOD_NAME, STATIC_INITIALIZER_METHOD_NAME};
use crate::classfile::opcodes as op;
use crate::classfile::{class_file_to_bytes, flags, ClassFile, FieldInfo, MethodInfo};
use crate::common::consts::{OBJECT_CLASS, STRING_CLASS};
use crate::common::{Config, Diagnostic, Error, Result};
use crate::types::{TypeCatalog, TypeDesc, TypeId, VOID};
use code::Code;
use scope::Scopes;
use std::collections::HashMap;
use tracing::debug;

/// Descriptor given to a `main` function regardless of its declared shape
const MAIN_DESCRIPTOR: &str = "([Ljava/lang/String;)V";

/// One finished class, named after its source declaration
#[derive(Debug)]
pub struct EmittedClass {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Signature of a callable top-level function or class method
#[derive(Debug, Clone)]
pub(crate) struct FnSig {
    pub owner: String,
    pub params: Vec<TypeId>,
    pub ret: TypeId,
    pub descriptor: String,
}

/// A static field visible to lowering by bare name
#[derive(Debug, Clone)]
pub(crate) struct FieldSym {
    pub owner: String,
    pub ty: TypeId,
    pub mutability: Mutability,
    pub descriptor: String,
}

/// Per-method lowering state shared by the expression and statement engines
pub(crate) struct MethodGen<'a> {
    pub(crate) catalog: &'a mut TypeCatalog,
    pub(crate) pool: &'a mut ConstantPool,
    pub(crate) code: Code,
    pub(crate) scopes: Scopes,
    pub(crate) functions: &'a HashMap<String, FnSig>,
    pub(crate) fields: &'a HashMap<String, FieldSym>,
    pub(crate) ret: TypeId,
}

/// Lower a unit into serialized class files
pub fn lower_unit(program: &Program, config: &Config) -> Result<Vec<EmittedClass>> {
    let classfiles = lower_unit_to_classfiles(program, config)?;
    Ok(classfiles
        .into_iter()
        .map(|(name, cf)| EmittedClass { name, bytes: class_file_to_bytes(&cf) })
        .collect())
}

/// Lower a unit into in-memory class structures; useful for inspecting the
/// assembled shape without decoding bytes
pub fn lower_unit_to_classfiles(
    program: &Program,
    config: &Config,
) -> Result<Vec<(String, ClassFile)>> {
    let mut catalog = TypeCatalog::new();
    let mut diagnostics = Vec::new();

    let module_fns = index_functions(&mut catalog, &program.name, &program.functions);

    let mut out = Vec::new();
    debug!(unit = %program.name, classes = program.classes.len(), "lowering unit");

    let module = lower_class_shape(
        &mut catalog,
        config,
        &program.name,
        None,
        &[],
        &program.functions,
        &module_fns,
        &mut diagnostics,
    )?;
    out.push((program.name.clone(), module));

    for class in &program.classes {
        // class methods resolve their own methods first, then module functions
        let mut visible = module_fns.clone();
        visible.extend(index_functions(&mut catalog, &class.name, &class.methods));
        let cf = lower_class_shape(
            &mut catalog,
            config,
            &class.name,
            class.superclass.as_deref(),
            &class.fields,
            &class.methods,
            &visible,
            &mut diagnostics,
        )?;
        out.push((class.name.clone(), cf));
    }

    if !diagnostics.is_empty() {
        return Err(Error::Compile(diagnostics));
    }
    Ok(out)
}

fn index_functions(
    catalog: &mut TypeCatalog,
    owner: &str,
    functions: &[FunctionDecl],
) -> HashMap<String, FnSig> {
    functions
        .iter()
        .filter(|f| f.name != "init")
        .map(|f| {
            let params: Vec<TypeId> = f.params.iter().map(|p| catalog.resolve(&p.ty)).collect();
            let ret = catalog.resolve(&f.ret);
            let descriptor = if f.name == "main" && f.params.is_empty() {
                MAIN_DESCRIPTOR.to_string()
            } else {
                catalog.method_descriptor(&params, ret)
            };
            (
                f.name.clone(),
                FnSig { owner: owner.to_string(), params, ret, descriptor },
            )
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn lower_class_shape(
    catalog: &mut TypeCatalog,
    config: &Config,
    name: &str,
    superclass: Option<&str>,
    fields: &[FieldDecl],
    methods: &[FunctionDecl],
    functions: &HashMap<String, FnSig>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<ClassFile> {
    let super_name = superclass.unwrap_or(OBJECT_CLASS);
    let mut cf = ClassFile::new(config.target_version);
    cf.access_flags = flags::ACC_PUBLIC | flags::ACC_SUPER;
    cf.this_class = cf.constant_pool.add_class(name);
    cf.super_class = cf.constant_pool.add_class(super_name);

    // field shapes plus the by-name symbol table for static field access
    let mut field_syms = HashMap::new();
    for field in fields {
        let ty = catalog.resolve(&field.ty);
        let descriptor = catalog.descriptor(ty);
        let mut access = flags::ACC_PUBLIC;
        if field.is_static {
            access |= flags::ACC_STATIC;
        }
        if field.mutability == Mutability::Immutable {
            access |= flags::ACC_FINAL;
        }
        let name_index = cf.constant_pool.add_utf8(&field.name);
        let descriptor_index = cf.constant_pool.add_utf8(&descriptor);
        cf.fields.push(FieldInfo::new(access, name_index, descriptor_index));
        if field.is_static {
            field_syms.insert(
                field.name.clone(),
                FieldSym {
                    owner: name.to_string(),
                    ty,
                    mutability: field.mutability,
                    descriptor,
                },
            );
        }
    }

    let mut declared_constructor = None;
    for function in methods {
        if function.name == "init" {
            declared_constructor = Some(function);
            continue;
        }
        match lower_function(catalog, config, &mut cf, name, function, functions, &field_syms) {
            Ok(method) => cf.methods.push(method),
            Err(Error::Diagnostic(d)) => diagnostics.push(d),
            Err(e) => return Err(e),
        }
    }

    // one synthesis pass after all explicit members: constructor, then the
    // aggregated static initializer
    match lower_constructor(
        catalog,
        config,
        &mut cf,
        name,
        super_name,
        fields,
        declared_constructor,
        functions,
        &field_syms,
    ) {
        Ok(method) => cf.methods.push(method),
        Err(Error::Diagnostic(d)) => diagnostics.push(d),
        Err(e) => return Err(e),
    }

    if fields.iter().any(|f| f.is_static && f.init.is_some()) {
        match lower_static_initializer(catalog, config, &mut cf, name, fields, functions, &field_syms)
        {
            Ok(method) => cf.methods.push(method),
            Err(Error::Diagnostic(d)) => diagnostics.push(d),
            Err(e) => return Err(e),
        }
    }

    Ok(cf)
}

fn lower_function(
    catalog: &mut TypeCatalog,
    config: &Config,
    cf: &mut ClassFile,
    class_name: &str,
    function: &FunctionDecl,
    functions: &HashMap<String, FnSig>,
    fields: &HashMap<String, FieldSym>,
) -> Result<MethodInfo> {
    debug!(class = class_name, function = %function.name, "lowering function");
    let ret = catalog.resolve(&function.ret);
    let is_main = function.name == "main" && function.params.is_empty();

    let mut gen = MethodGen {
        catalog,
        pool: &mut cf.constant_pool,
        code: Code::new(),
        scopes: Scopes::new(),
        functions,
        fields,
        ret,
    };
    gen.scopes.enter_scope();
    if is_main {
        // slot 0 holds the ignored argument array
        let args_ty = gen.catalog.resolve(&Type::Object(STRING_CLASS.to_string()));
        gen.scopes.declare_temp(args_ty, 1)?;
    }
    for param in &function.params {
        let ty = gen.catalog.resolve(&param.ty);
        let width = gen.catalog.width(ty);
        gen.scopes
            .declare(&param.name, ty, width, Mutability::Mutable, function.span)?;
    }

    gen.lower_block(&function.body)?;
    if gen.code.falls_through() {
        if ret == VOID {
            gen.code.ret(op::RETURN, 0);
        } else {
            return Err(Error::internal(format!(
                "function `{}` can fall off the end without returning a value",
                function.name
            )));
        }
    }
    gen.scopes.exit_scope()?;

    let descriptor = if is_main {
        MAIN_DESCRIPTOR.to_string()
    } else {
        let params: Vec<TypeId> =
            function.params.iter().map(|p| gen.catalog.resolve(&p.ty)).collect();
        gen.catalog.method_descriptor(&params, ret)
    };
    let max_slots = gen.scopes.max_slots();
    let code = gen.code;
    attach_method(
        cf,
        config,
        flags::PUBLIC_STATIC,
        &function.name,
        &descriptor,
        code,
        max_slots,
    )
}

/// Lower the declared `init` method as `<init>`, or synthesize the implicit
/// no-argument constructor. Either way the body starts with the superclass
/// constructor call and the instance field initializers in declaration
/// order.
#[allow(clippy::too_many_arguments)]
fn lower_constructor(
    catalog: &mut TypeCatalog,
    config: &Config,
    cf: &mut ClassFile,
    class_name: &str,
    super_name: &str,
    fields: &[FieldDecl],
    declared: Option<&FunctionDecl>,
    functions: &HashMap<String, FnSig>,
    field_syms: &HashMap<String, FieldSym>,
) -> Result<MethodInfo> {
    let this_ty = catalog.resolve(&Type::Object(class_name.to_string()));

    let mut gen = MethodGen {
        catalog,
        pool: &mut cf.constant_pool,
        code: Code::new(),
        scopes: Scopes::new(),
        functions,
        fields: field_syms,
        ret: VOID,
    };
    gen.scopes.enter_scope();
    gen.scopes
        .declare("this", this_ty, 1, Mutability::Immutable, Default::default())?;
    let mut param_ids = Vec::new();
    if let Some(ctor) = declared {
        for param in &ctor.params {
            let ty = gen.catalog.resolve(&param.ty);
            let width = gen.catalog.width(ty);
            param_ids.push(ty);
            gen.scopes
                .declare(&param.name, ty, width, Mutability::Mutable, ctor.span)?;
        }
    }

    gen.code.load(op::ALOAD, 0, 1);
    gen.code
        .invoke_special(gen.pool, super_name, CONSTRUCTOR_METHOD_NAME, "()V");

    for field in fields.iter().filter(|f| !f.is_static) {
        if let Some(init) = &field.init {
            let ty = gen.catalog.resolve(&field.ty);
            let descriptor = gen.catalog.descriptor(ty);
            let width = gen.catalog.width(ty);
            gen.code.mark_line(field.span.line);
            gen.code.load(op::ALOAD, 0, 1);
            gen.lower_expr(init)?;
            gen.code
                .put_field(gen.pool, class_name, &field.name, &descriptor, width);
        }
    }

    if let Some(ctor) = declared {
        gen.lower_block(&ctor.body)?;
    }
    if gen.code.falls_through() {
        gen.code.ret(op::RETURN, 0);
    }
    gen.scopes.exit_scope()?;

    let descriptor = gen.catalog.method_descriptor(&param_ids, VOID);
    let max_slots = gen.scopes.max_slots();
    let code = gen.code;
    attach_method(
        cf,
        config,
        flags::ACC_PUBLIC,
        CONSTRUCTOR_METHOD_NAME,
        &descriptor,
        code,
        max_slots,
    )
}

/// Aggregate every static field initializer into one `<clinit>` body, in
/// declaration order
fn lower_static_initializer(
    catalog: &mut TypeCatalog,
    config: &Config,
    cf: &mut ClassFile,
    class_name: &str,
    fields: &[FieldDecl],
    functions: &HashMap<String, FnSig>,
    field_syms: &HashMap<String, FieldSym>,
) -> Result<MethodInfo> {
    let mut gen = MethodGen {
        catalog,
        pool: &mut cf.constant_pool,
        code: Code::new(),
        scopes: Scopes::new(),
        functions,
        fields: field_syms,
        ret: VOID,
    };
    gen.scopes.enter_scope();

    for field in fields.iter().filter(|f| f.is_static) {
        if let Some(init) = &field.init {
            let ty = gen.catalog.resolve(&field.ty);
            let descriptor = gen.catalog.descriptor(ty);
            let width = gen.catalog.width(ty);
            gen.code.mark_line(field.span.line);
            gen.lower_expr(init)?;
            gen.code
                .put_static(gen.pool, class_name, &field.name, &descriptor, width);
        }
    }
    gen.code.ret(op::RETURN, 0);
    gen.scopes.exit_scope()?;

    let max_slots = gen.scopes.max_slots();
    let code = gen.code;
    attach_method(
        cf,
        config,
        flags::ACC_STATIC,
        STATIC_INITIALIZER_METHOD_NAME,
        "()V",
        code,
        max_slots,
    )
}

/// Finalize a body and wire it into a MethodInfo with its Code attribute
fn attach_method(
    cf: &mut ClassFile,
    config: &Config,
    access_flags: u16,
    name: &str,
    descriptor: &str,
    code: Code,
    max_slots: u16,
) -> Result<MethodInfo> {
    let finalized = code.finalize()?;
    let max_locals = finalized.max_locals.max(max_slots);

    let mut code_attr = CodeAttribute::new(finalized.max_stack, max_locals, finalized.bytes);
    if config.emit_line_numbers && !finalized.line_table.is_empty() {
        let mut table = LineNumberTableAttribute::new();
        for (pc, line) in &finalized.line_table {
            table.add(*pc, *line);
        }
        code_attr
            .attributes
            .push(make_line_number_table_attribute(&mut cf.constant_pool, &table));
    }

    let name_index = cf.constant_pool.add_utf8(name);
    let descriptor_index = cf.constant_pool.add_utf8(descriptor);
    let mut method = MethodInfo::new(access_flags, name_index, descriptor_index);
    method
        .attributes
        .push(make_code_attribute(&mut cf.constant_pool, &code_attr));
    Ok(method)
}

impl MethodGen<'_> {
    /// Width in slots of a value of the given type
    pub(crate) fn width_of(&self, ty: TypeId) -> u16 {
        self.catalog.width(ty)
    }

    /// Box the primitive on top of the stack if the type has a box class
    pub(crate) fn box_if_primitive(&mut self, ty: TypeId) {
        if let Some(boxing) = self.catalog.boxing(ty) {
            self.code
                .invoke_static(self.pool, boxing.class, "valueOf", boxing.box_descriptor);
        }
    }

    /// Convert the `Object` on top of the stack into a value of `ty`:
    /// checkcast to the box class and unbox for primitives, checkcast alone
    /// for references
    pub(crate) fn unbox_to(&mut self, ty: TypeId) {
        if let Some(boxing) = self.catalog.boxing(ty) {
            self.code.checkcast(self.pool, boxing.class);
            self.code.invoke_virtual(
                self.pool,
                boxing.class,
                boxing.unbox_name,
                boxing.unbox_descriptor,
            );
        } else if let Some(class) = self.catalog.cast_class(ty) {
            if class != OBJECT_CLASS {
                self.code.checkcast(self.pool, &class);
            }
        }
    }

    /// Element type of a list-typed expression; anything else is a front-end
    /// defect
    pub(crate) fn list_elem_type(&mut self, list_ty: TypeId) -> Result<TypeId> {
        match self.catalog.get(list_ty) {
            TypeDesc::List(elem) => Ok(*elem),
            other => Err(Error::internal(format!(
                "expected a list type, found {:?}",
                other
            ))),
        }
    }
}
