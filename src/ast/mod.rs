//! Typed program tree handed to the backend by the front-end.
//!
//! Every expression node carries the static type the checker assigned to it;
//! the backend trusts these types and treats contradictions as internal
//! errors, not user errors.

/// Source position attached to nodes for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Source-level type as resolved by the checker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Float,
    Double,
    Bool,
    Str,
    Void,
    /// Reference to a declared class, by its internal (slash-separated) name
    Object(String),
    /// The built-in list type with its element type
    List(Box<Type>),
}

impl Type {
    pub fn list_of(elem: Type) -> Self {
        Type::List(Box::new(elem))
    }
}

/// Whether a binding may be reassigned after its initializer.
///
/// This is an attribute of the binding, not of the type: a list held by an
/// immutable binding still has mutable contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Immutable,
    Mutable,
}

/// One source unit: the module class plus any classes declared in it
#[derive(Debug, Clone)]
pub struct Program {
    /// Internal name of the module class (derived from the file name by the
    /// driver)
    pub name: String,
    pub functions: Vec<FunctionDecl>,
    pub classes: Vec<ClassDecl>,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    /// Internal name of the superclass; `None` means `java/lang/Object`
    pub superclass: Option<String>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FunctionDecl>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: Type,
    pub mutability: Mutability,
    pub is_static: bool,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Type,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts, span: Span::default() }
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    /// Expression evaluated for its side effect; any produced value is
    /// discarded
    Expr(Expr),
    /// Local binding declaration with its initializer
    Decl {
        name: String,
        ty: Type,
        mutability: Mutability,
        init: Expr,
        span: Span,
    },
    Block(Block),
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
        span: Span,
    },
    /// Pre-test loop
    While {
        cond: Expr,
        body: Block,
        span: Span,
    },
    /// Iteration over the built-in list type
    ForEach {
        var: String,
        list: Expr,
        body: Block,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    /// Static type assigned by the checker
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Lit),
    /// Read of a local binding or a static field of the enclosing class
    Var(String),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    /// List literal; elements appended in source order
    ListLit(Vec<Expr>),
    /// Read of one list element
    Index {
        list: Box<Expr>,
        index: Box<Expr>,
    },
    /// Assignment; yields no value (its static type is `Void`)
    Assign {
        target: AssignTarget,
        value: Box<Expr>,
    },
    /// Call of a top-level function or a runtime built-in
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone)]
pub enum AssignTarget {
    /// Local binding or static field, resolved at lowering time
    Name(String),
    /// Indexed write into a list element
    Index {
        list: Box<Expr>,
        index: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(i32),
    Float(f32),
    Double(f64),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Type) -> Self {
        Self { kind, ty, span: Span::default() }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn int(value: i32) -> Self {
        Self::new(ExprKind::Literal(Lit::Int(value)), Type::Int)
    }

    pub fn double(value: f64) -> Self {
        Self::new(ExprKind::Literal(Lit::Double(value)), Type::Double)
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ExprKind::Literal(Lit::Bool(value)), Type::Bool)
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::new(ExprKind::Literal(Lit::Str(value.into())), Type::Str)
    }

    pub fn var(name: impl Into<String>, ty: Type) -> Self {
        Self::new(ExprKind::Var(name.into()), ty)
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr, ty: Type) -> Self {
        Self::new(
            ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
            ty,
        )
    }

    pub fn list(elems: Vec<Expr>, elem_ty: Type) -> Self {
        Self::new(ExprKind::ListLit(elems), Type::list_of(elem_ty))
    }

    pub fn index(list: Expr, index: Expr, elem_ty: Type) -> Self {
        Self::new(
            ExprKind::Index { list: Box::new(list), index: Box::new(index) },
            elem_ty,
        )
    }

    pub fn assign(name: impl Into<String>, value: Expr) -> Self {
        Self::new(
            ExprKind::Assign {
                target: AssignTarget::Name(name.into()),
                value: Box::new(value),
            },
            Type::Void,
        )
    }

    pub fn assign_index(list: Expr, index: Expr, value: Expr) -> Self {
        Self::new(
            ExprKind::Assign {
                target: AssignTarget::Index {
                    list: Box::new(list),
                    index: Box::new(index),
                },
                value: Box::new(value),
            },
            Type::Void,
        )
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>, ret: Type) -> Self {
        Self::new(ExprKind::Call { name: name.into(), args }, ret)
    }
}
