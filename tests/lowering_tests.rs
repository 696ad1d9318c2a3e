//! Expression lowering: runtime adapter calls, boxing, widening, concat.
//!
//! Most checks look for the constant-pool entries a lowering must have
//! interned; a missing entry means the corresponding call was never emitted.

use sablec::ast::{
    BinOp, Block, ClassDecl, Expr, FieldDecl, FunctionDecl, Mutability, Program, Span, Stmt, Type,
};
use sablec::classfile::opcodes as op;
use sablec::classfile::ClassFile;
use sablec::{lower_unit_to_classfiles, Config, Error};

fn function(name: &str, ret: Type, stmts: Vec<Stmt>) -> FunctionDecl {
    FunctionDecl {
        name: name.into(),
        params: Vec::new(),
        ret,
        body: Block::new(stmts),
        span: Span::default(),
    }
}

fn program(functions: Vec<FunctionDecl>) -> Program {
    Program { name: "Main".into(), functions, classes: Vec::new() }
}

fn decl(name: &str, ty: Type, mutability: Mutability, init: Expr) -> Stmt {
    Stmt::Decl { name: name.into(), ty, mutability, init, span: Span::default() }
}

fn lower_module(p: &Program, config: &Config) -> ClassFile {
    let mut classes = lower_unit_to_classfiles(p, config).unwrap();
    classes.remove(0).1
}

fn pool_has_utf8(cf: &ClassFile, needle: &str) -> bool {
    (1..cf.constant_pool.count()).any(|i| cf.constant_pool.utf8_at(i) == Some(needle))
}

/// Body bytes of a method's Code attribute
fn code_body<'a>(cf: &'a ClassFile, method: &str) -> &'a [u8] {
    let info = cf.method_named(method).expect("method not assembled");
    let attr = info
        .attributes
        .iter()
        .find(|a| cf.constant_pool.utf8_at(a.name_index) == Some("Code"))
        .expect("method has no Code attribute");
    // max_stack (2), max_locals (2), code_length (4), then the body
    let len = u32::from_be_bytes(attr.info[4..8].try_into().unwrap()) as usize;
    &attr.info[8..8 + len]
}

/// Decode a body into its opcode sequence, skipping operand bytes
fn opcode_sequence(code: &[u8]) -> Vec<u8> {
    let mut ops = Vec::new();
    let mut i = 0;
    while i < code.len() {
        let opc = code[i];
        ops.push(opc);
        i += 1 + operand_len(opc);
    }
    ops
}

fn operand_len(opc: u8) -> usize {
    match opc {
        op::BIPUSH | op::LDC | 0x15..=0x19 | 0x36..=0x3a => 1,
        op::SIPUSH | op::LDC_W | op::LDC2_W => 2,
        0x99..=0xa7 | 0xb2..=0xb8 | op::NEW | op::CHECKCAST => 2,
        op::INVOKEINTERFACE => 4,
        _ => 0,
    }
}

#[test]
fn list_literal_goes_through_the_runtime_adapter() {
    let body = vec![decl(
        "xs",
        Type::list_of(Type::Int),
        Mutability::Immutable,
        Expr::list(vec![Expr::int(1), Expr::int(2)], Type::Int),
    )];
    let cf = lower_module(&program(vec![function("main", Type::Void, body)]), &Config::default());

    assert!(pool_has_utf8(&cf, "sable/runtime/List"));
    assert!(pool_has_utf8(&cf, "append"));
    // int elements are boxed to cross the Object-typed adapter boundary
    assert!(pool_has_utf8(&cf, "java/lang/Integer"));
    assert!(pool_has_utf8(&cf, "valueOf"));
}

#[test]
fn list_literal_constructs_once_and_appends_in_order() {
    let body = vec![decl(
        "xs",
        Type::list_of(Type::Int),
        Mutability::Immutable,
        Expr::list(vec![Expr::int(1), Expr::int(2), Expr::int(3)], Type::Int),
    )];
    let cf = lower_module(&program(vec![function("main", Type::Void, body)]), &Config::default());

    let ops = opcode_sequence(code_body(&cf, "main"));
    // one construct, then per element: dup, push, box, append, in source order
    assert_eq!(
        ops,
        vec![
            op::NEW,
            op::DUP,
            op::INVOKESPECIAL,
            op::DUP,
            op::ICONST_1,
            op::INVOKESTATIC,
            op::INVOKEVIRTUAL,
            op::DUP,
            op::ICONST_2,
            op::INVOKESTATIC,
            op::INVOKEVIRTUAL,
            op::DUP,
            op::ICONST_3,
            op::INVOKESTATIC,
            op::INVOKEVIRTUAL,
            op::ASTORE,
            op::RETURN,
        ]
    );
}

#[test]
fn string_equality_compares_references() {
    let cond = Expr::binary(BinOp::Eq, Expr::str("a"), Expr::str("b"), Type::Bool);
    let body = vec![Stmt::If {
        cond,
        then_block: Block::new(Vec::new()),
        else_block: None,
        span: Span::default(),
    }];
    let cf = lower_module(&program(vec![function("main", Type::Void, body)]), &Config::default());

    let ops = opcode_sequence(code_body(&cf, "main"));
    assert!(ops.contains(&op::IF_ACMPEQ));
}

#[test]
fn reference_inequality_uses_the_negated_compare() {
    let list_ty = Type::list_of(Type::Int);
    let cond = Expr::binary(
        BinOp::Ne,
        Expr::var("xs", list_ty.clone()),
        Expr::var("ys", list_ty.clone()),
        Type::Bool,
    );
    let body = vec![
        decl("xs", list_ty.clone(), Mutability::Immutable, Expr::list(Vec::new(), Type::Int)),
        decl("ys", list_ty, Mutability::Immutable, Expr::list(Vec::new(), Type::Int)),
        Stmt::If {
            cond,
            then_block: Block::new(Vec::new()),
            else_block: None,
            span: Span::default(),
        },
    ];
    let cf = lower_module(&program(vec![function("main", Type::Void, body)]), &Config::default());

    let ops = opcode_sequence(code_body(&cf, "main"));
    assert!(ops.contains(&op::IF_ACMPNE));
}

#[test]
fn methods_exceeding_the_slot_space_are_rejected() {
    let stmts = (0..300)
        .map(|i| decl(&format!("v{}", i), Type::Int, Mutability::Mutable, Expr::int(i)))
        .collect();
    let p = program(vec![function("main", Type::Void, stmts)]);
    match lower_unit_to_classfiles(&p, &Config::default()) {
        Err(Error::Internal { message }) => assert!(message.contains("slot space")),
        other => panic!("expected an internal error, got {other:?}"),
    }
}

#[test]
fn indexed_read_unboxes_the_element() {
    let list_ty = Type::list_of(Type::Int);
    let body = vec![
        decl(
            "xs",
            list_ty.clone(),
            Mutability::Immutable,
            Expr::list(vec![Expr::int(5)], Type::Int),
        ),
        Stmt::Return {
            value: Some(Expr::index(Expr::var("xs", list_ty), Expr::int(0), Type::Int)),
            span: Span::default(),
        },
    ];
    let cf = lower_module(&program(vec![function("head", Type::Int, body)]), &Config::default());

    assert!(pool_has_utf8(&cf, "get"));
    assert!(pool_has_utf8(&cf, "intValue"));
}

#[test]
fn for_each_drives_the_iterator_protocol() {
    let body = vec![Stmt::ForEach {
        var: "n".into(),
        list: Expr::list(vec![Expr::int(1)], Type::Int),
        body: Block::new(Vec::new()),
        span: Span::default(),
    }];
    let cf = lower_module(&program(vec![function("main", Type::Void, body)]), &Config::default());

    assert!(pool_has_utf8(&cf, "java/util/Iterator"));
    assert!(pool_has_utf8(&cf, "hasNext"));
    assert!(pool_has_utf8(&cf, "next"));
}

#[test]
fn println_boxes_its_primitive_argument() {
    let body = vec![Stmt::Expr(Expr::call(
        "println",
        vec![Expr::double(2.5)],
        Type::Void,
    ))];
    let cf = lower_module(&program(vec![function("main", Type::Void, body)]), &Config::default());

    assert!(pool_has_utf8(&cf, "sable/runtime/Prelude"));
    assert!(pool_has_utf8(&cf, "java/lang/Double"));
    assert!(pool_has_utf8(&cf, "(D)Ljava/lang/Double;"));
}

#[test]
fn len_calls_the_prelude_without_boxing() {
    let body = vec![Stmt::Return {
        value: Some(Expr::call(
            "len",
            vec![Expr::list(vec![Expr::int(1)], Type::Int)],
            Type::Int,
        )),
        span: Span::default(),
    }];
    let cf = lower_module(&program(vec![function("count", Type::Int, body)]), &Config::default());

    assert!(pool_has_utf8(&cf, "len"));
    assert!(pool_has_utf8(&cf, "(Lsable/runtime/List;)I"));
}

#[test]
fn string_concat_builds_with_stringbuilder() {
    let concat = Expr::binary(
        BinOp::Add,
        Expr::str("n = "),
        Expr::int(42),
        Type::Str,
    );
    let body = vec![Stmt::Return { value: Some(concat), span: Span::default() }];
    let cf = lower_module(&program(vec![function("label", Type::Str, body)]), &Config::default());

    assert!(pool_has_utf8(&cf, "java/lang/StringBuilder"));
    assert!(pool_has_utf8(&cf, "(I)Ljava/lang/StringBuilder;"));
    assert!(pool_has_utf8(&cf, "toString"));
}

#[test]
fn mixed_arithmetic_widens_to_double() {
    let sum = Expr::binary(
        BinOp::Add,
        Expr::int(1),
        Expr::double(0.5),
        Type::Double,
    );
    let body = vec![Stmt::Return { value: Some(sum), span: Span::default() }];
    let p = program(vec![function("mix", Type::Double, body)]);
    // a widening mistake would leave the stack unbalanced and fail lowering
    assert!(lower_unit_to_classfiles(&p, &Config::default()).is_ok());
}

#[test]
fn user_function_calls_resolve_to_the_module_class() {
    let callee = function(
        "answer",
        Type::Int,
        vec![Stmt::Return { value: Some(Expr::int(42)), span: Span::default() }],
    );
    let caller = function(
        "main",
        Type::Void,
        vec![Stmt::Expr(Expr::call("answer", Vec::new(), Type::Int))],
    );
    let cf = lower_module(&program(vec![callee, caller]), &Config::default());

    assert!(pool_has_utf8(&cf, "answer"));
    assert!(pool_has_utf8(&cf, "()I"));
}

#[test]
fn superclass_name_is_interned() {
    let class = ClassDecl {
        name: "Derived".into(),
        superclass: Some("Base".into()),
        fields: Vec::new(),
        methods: Vec::new(),
        span: Span::default(),
    };
    let p = Program { name: "Main".into(), functions: Vec::new(), classes: vec![class] };
    let classes = lower_unit_to_classfiles(&p, &Config::default()).unwrap();
    let (_, cf) = &classes[1];

    assert!(pool_has_utf8(cf, "Base"));
}

#[test]
fn instance_field_initializer_runs_in_the_constructor() {
    let class = ClassDecl {
        name: "Point".into(),
        superclass: None,
        fields: vec![FieldDecl {
            name: "x".into(),
            ty: Type::Double,
            mutability: Mutability::Mutable,
            is_static: false,
            init: Some(Expr::double(1.0)),
            span: Span::default(),
        }],
        methods: Vec::new(),
        span: Span::default(),
    };
    let p = Program { name: "Main".into(), functions: Vec::new(), classes: vec![class] };
    let classes = lower_unit_to_classfiles(&p, &Config::default()).unwrap();
    let (_, cf) = &classes[1];

    assert!(cf.method_named("<init>").is_some());
    // the putfield target must be interned on the class
    assert!(pool_has_utf8(cf, "x"));
    assert!(pool_has_utf8(cf, "D"));
}

#[test]
fn line_number_tables_follow_the_config() {
    let body = vec![Stmt::Expr(
        Expr::call("println", vec![Expr::int(1)], Type::Void),
    )];
    let with = lower_module(
        &program(vec![function("main", Type::Void, body.clone())]),
        &Config::default().with_line_numbers(true),
    );
    let without = lower_module(
        &program(vec![function("main", Type::Void, body)]),
        &Config::default().with_line_numbers(false),
    );

    assert!(pool_has_utf8(&with, "LineNumberTable"));
    assert!(!pool_has_utf8(&without, "LineNumberTable"));
}
