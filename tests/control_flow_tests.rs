//! Control-flow lowering: branch shapes, loop scoping, short-circuiting.
//!
//! Finalization simulates stack depth along every path, so a test that
//! lowers successfully also proves the emitted flow is stack-balanced.

use sablec::ast::{
    BinOp, Block, Expr, FunctionDecl, Mutability, Program, Span, Stmt, Type,
};
use sablec::{lower, Config, DiagnosticKind, Error};

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

fn ret(value: Expr) -> Stmt {
    Stmt::Return { value: Some(value), span: Span::default() }
}

#[test]
fn if_else_with_returns_in_both_arms() {
    let body = vec![Stmt::If {
        cond: Expr::binary(BinOp::Lt, Expr::int(1), Expr::int(2), Type::Bool),
        then_block: Block::new(vec![ret(Expr::int(1))]),
        else_block: Some(Block::new(vec![ret(Expr::int(2))])),
        span: Span::default(),
    }];
    let p = program(vec![function("pick", Type::Int, body)]);
    assert!(lower(&p, &Config::default()).is_ok());
}

#[test]
fn if_without_else_falls_through_to_the_join() {
    let body = vec![
        decl("x", Type::Int, Mutability::Mutable, Expr::int(0)),
        Stmt::If {
            cond: Expr::bool(true),
            then_block: Block::new(vec![Stmt::Expr(Expr::assign("x", Expr::int(1)))]),
            else_block: None,
            span: Span::default(),
        },
        ret(Expr::var("x", Type::Int)),
    ];
    let p = program(vec![function("f", Type::Int, body)]);
    assert!(lower(&p, &Config::default()).is_ok());
}

#[test]
fn while_loop_with_counter() {
    let cond = Expr::binary(
        BinOp::Lt,
        Expr::var("i", Type::Int),
        Expr::int(10),
        Type::Bool,
    );
    let step = Expr::assign(
        "i",
        Expr::binary(BinOp::Add, Expr::var("i", Type::Int), Expr::int(1), Type::Int),
    );
    let body = vec![
        decl("i", Type::Int, Mutability::Mutable, Expr::int(0)),
        Stmt::While {
            cond,
            body: Block::new(vec![Stmt::Expr(step)]),
            span: Span::default(),
        },
    ];
    let p = program(vec![function("main", Type::Void, body)]);
    assert!(lower(&p, &Config::default()).is_ok());
}

#[test]
fn for_each_over_a_list_literal() {
    let body = vec![Stmt::ForEach {
        var: "n".into(),
        list: Expr::list(vec![Expr::int(1), Expr::int(2), Expr::int(3)], Type::Int),
        body: Block::new(vec![Stmt::Expr(Expr::call(
            "println",
            vec![Expr::var("n", Type::Int)],
            Type::Void,
        ))]),
        span: Span::default(),
    }];
    let p = program(vec![function("main", Type::Void, body)]);
    assert!(lower(&p, &Config::default()).is_ok());
}

#[test]
fn for_each_variable_is_immutable() {
    let body = vec![Stmt::ForEach {
        var: "n".into(),
        list: Expr::list(vec![Expr::int(1)], Type::Int),
        body: Block::new(vec![Stmt::Expr(Expr::assign("n", Expr::int(0)))]),
        span: Span::default(),
    }];
    let p = program(vec![function("main", Type::Void, body)]);
    match lower(&p, &Config::default()) {
        Err(Error::Compile(diags)) => {
            assert_eq!(diags[0].kind, DiagnosticKind::ImmutableAssignment)
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
}

#[test]
fn for_each_over_an_empty_list() {
    let body = vec![Stmt::ForEach {
        var: "s".into(),
        list: Expr::list(Vec::new(), Type::Str),
        body: Block::new(Vec::new()),
        span: Span::default(),
    }];
    let p = program(vec![function("main", Type::Void, body)]);
    assert!(lower(&p, &Config::default()).is_ok());
}

#[test]
fn sibling_blocks_reuse_slots_without_collision() {
    let block = |name: &str| {
        Stmt::Block(Block::new(vec![
            decl(name, Type::Double, Mutability::Mutable, Expr::double(1.5)),
            Stmt::Expr(Expr::assign(name, Expr::double(2.5))),
        ]))
    };
    let p = program(vec![function("main", Type::Void, vec![block("a"), block("b")])]);
    assert!(lower(&p, &Config::default()).is_ok());
}

#[test]
fn short_circuit_conditions_lower_cleanly() {
    let both = Expr::binary(
        BinOp::And,
        Expr::binary(BinOp::Gt, Expr::int(3), Expr::int(1), Type::Bool),
        Expr::binary(
            BinOp::Or,
            Expr::bool(false),
            Expr::binary(BinOp::Ne, Expr::int(2), Expr::int(2), Type::Bool),
            Type::Bool,
        ),
        Type::Bool,
    );
    let body = vec![Stmt::If {
        cond: both,
        then_block: Block::new(Vec::new()),
        else_block: None,
        span: Span::default(),
    }];
    let p = program(vec![function("main", Type::Void, body)]);
    assert!(lower(&p, &Config::default()).is_ok());
}

#[test]
fn nested_loops_and_branches_stay_balanced() {
    let inner = Stmt::ForEach {
        var: "x".into(),
        list: Expr::var("xs", Type::list_of(Type::Int)),
        body: Block::new(vec![Stmt::If {
            cond: Expr::binary(
                BinOp::Ge,
                Expr::var("x", Type::Int),
                Expr::int(0),
                Type::Bool,
            ),
            then_block: Block::new(vec![Stmt::Expr(Expr::call(
                "println",
                vec![Expr::var("x", Type::Int)],
                Type::Void,
            ))]),
            else_block: Some(Block::new(Vec::new())),
            span: Span::default(),
        }]),
        span: Span::default(),
    };
    let body = vec![
        decl(
            "xs",
            Type::list_of(Type::Int),
            Mutability::Immutable,
            Expr::list(vec![Expr::int(-1), Expr::int(4)], Type::Int),
        ),
        inner,
    ];
    let p = program(vec![function("main", Type::Void, body)]);
    assert!(lower(&p, &Config::default()).is_ok());
}
