//! Binding mutability enforcement during lowering.
//!
//! Immutability belongs to the binding, not the value: an immutable list
//! binding still allows element writes, it only forbids rebinding.

use sablec::ast::{
    Block, ClassDecl, Expr, FieldDecl, FunctionDecl, Mutability, Program, Span, Stmt, Type,
};
use sablec::{lower, Config, DiagnosticKind, Error};

fn function(name: &str, stmts: Vec<Stmt>) -> FunctionDecl {
    FunctionDecl {
        name: name.into(),
        params: Vec::new(),
        ret: Type::Void,
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

fn diagnostics(p: &Program) -> Vec<DiagnosticKind> {
    match lower(p, &Config::default()) {
        Err(Error::Compile(diags)) => diags.iter().map(|d| d.kind).collect(),
        Ok(_) => Vec::new(),
        Err(other) => panic!("expected compile diagnostics, got {other}"),
    }
}

#[test]
fn immutable_local_rejects_reassignment() {
    let p = program(vec![function(
        "main",
        vec![
            decl("x", Type::Int, Mutability::Immutable, Expr::int(1)),
            Stmt::Expr(Expr::assign("x", Expr::int(2))),
        ],
    )]);
    assert_eq!(diagnostics(&p), vec![DiagnosticKind::ImmutableAssignment]);
}

#[test]
fn mutable_local_accepts_reassignment() {
    let p = program(vec![function(
        "main",
        vec![
            decl("x", Type::Int, Mutability::Mutable, Expr::int(1)),
            Stmt::Expr(Expr::assign("x", Expr::int(2))),
        ],
    )]);
    assert!(lower(&p, &Config::default()).is_ok());
}

#[test]
fn element_write_through_immutable_binding_is_legal() {
    let list_ty = Type::list_of(Type::Int);
    let p = program(vec![function(
        "main",
        vec![
            decl(
                "xs",
                list_ty.clone(),
                Mutability::Immutable,
                Expr::list(vec![Expr::int(1), Expr::int(2)], Type::Int),
            ),
            Stmt::Expr(Expr::assign_index(
                Expr::var("xs", list_ty),
                Expr::int(0),
                Expr::int(9),
            )),
        ],
    )]);
    assert!(lower(&p, &Config::default()).is_ok());
}

#[test]
fn rebinding_an_immutable_list_is_rejected() {
    let list_ty = Type::list_of(Type::Int);
    let p = program(vec![function(
        "main",
        vec![
            decl(
                "xs",
                list_ty,
                Mutability::Immutable,
                Expr::list(vec![Expr::int(1)], Type::Int),
            ),
            Stmt::Expr(Expr::assign("xs", Expr::list(Vec::new(), Type::Int))),
        ],
    )]);
    assert_eq!(diagnostics(&p), vec![DiagnosticKind::ImmutableAssignment]);
}

#[test]
fn duplicate_binding_in_one_scope_is_rejected() {
    let p = program(vec![function(
        "main",
        vec![
            decl("x", Type::Int, Mutability::Mutable, Expr::int(1)),
            decl("x", Type::Int, Mutability::Mutable, Expr::int(2)),
        ],
    )]);
    assert_eq!(diagnostics(&p), vec![DiagnosticKind::DuplicateBinding]);
}

#[test]
fn shadowing_in_a_nested_block_is_legal() {
    let p = program(vec![function(
        "main",
        vec![
            decl("x", Type::Int, Mutability::Immutable, Expr::int(1)),
            Stmt::Block(Block::new(vec![decl(
                "x",
                Type::Str,
                Mutability::Immutable,
                Expr::str("inner"),
            )])),
        ],
    )]);
    assert!(lower(&p, &Config::default()).is_ok());
}

#[test]
fn errors_are_collected_across_functions() {
    let bad = |fname: &str| {
        function(
            fname,
            vec![
                decl("x", Type::Int, Mutability::Immutable, Expr::int(1)),
                Stmt::Expr(Expr::assign("x", Expr::int(2))),
            ],
        )
    };
    let p = program(vec![bad("first"), bad("second")]);
    assert_eq!(
        diagnostics(&p),
        vec![
            DiagnosticKind::ImmutableAssignment,
            DiagnosticKind::ImmutableAssignment
        ]
    );
}

#[test]
fn immutable_static_field_rejects_assignment() {
    let class = ClassDecl {
        name: "Consts".into(),
        superclass: None,
        fields: vec![FieldDecl {
            name: "k".into(),
            ty: Type::Int,
            mutability: Mutability::Immutable,
            is_static: true,
            init: Some(Expr::int(1)),
            span: Span::default(),
        }],
        methods: vec![function(
            "poke",
            vec![Stmt::Expr(Expr::assign("k", Expr::int(2)))],
        )],
        span: Span::default(),
    };
    let p = Program { name: "Main".into(), functions: Vec::new(), classes: vec![class] };
    assert_eq!(diagnostics(&p), vec![DiagnosticKind::ImmutableAssignment]);
}
