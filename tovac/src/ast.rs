//! Abstract Syntax Tree for Tova.
//!
//! This module defines the data structures that represent parsed Tova
//! programs. Every family is a closed sum type; traversals pattern-match on
//! the discriminant.
//!
//! # AST Structure
//!
//! - [`Program`] - Root node: the ordered top-level statements of one file
//! - [`Stmt`] - Statements, declarations and dialect blocks
//! - [`Expr`] - Expressions (literals, operators, postfix chains, lambdas)
//! - [`DestructurePattern`] - Binding targets for `let`, parameters, loops
//! - [`MatchPattern`] - Shape-testing patterns, only inside `match` arms
//! - [`TypeExpr`] - Type annotations
//! - [`DialectNode`] - Nodes contributed by block dialects
//!
//! # Design Notes
//!
//! - Nodes derive `Debug`, `Clone`, `PartialEq` and `Serialize`.
//! - Each node carries a [`Span`] whose line/column is that of the token that
//!   began the construct. The file name lives once on [`Program`].
//! - Nodes own their children; nothing is shared or back-referenced.
//!
//! # Example
//!
//! ```rust
//! use tovac::ast::{ExprKind, StmtKind};
//!
//! let program = tovac::parse_source("total = price * 2", "cart.tova").unwrap();
//! let StmtKind::Assign { targets, values } = &program.body[0].kind else {
//!     panic!("expected assignment");
//! };
//! assert!(matches!(targets[0].kind, ExprKind::Ident(ref n) if n == "total"));
//! assert!(matches!(values[0].kind, ExprKind::Binary { .. }));
//! ```

use std::sync::Arc;

use serde::Serialize;

use crate::span::{Span, Spanned};

/// A name with its location.
pub type Ident = Spanned<String>;

// ============================================================
// Program and blocks
// ============================================================

/// The root of one parsed file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    /// Top-level statements in source order.
    pub body: Vec<Stmt>,
    pub file: Arc<str>,
    pub span: Span,
}

/// A braced statement list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// Either a single expression or a block, as used by lambdas, match arms,
/// `defer` and route handlers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Body {
    Expr(Box<Expr>),
    Block(Block),
}

impl Body {
    pub fn span(&self) -> Span {
        match self {
            Body::Expr(expr) => expr.span,
            Body::Block(block) => block.span,
        }
    }
}

// ============================================================
// Expressions
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn boxed(self) -> Box<Expr> {
        Box::new(self)
    }
}

/// Literal values shared by expressions and match patterns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Nil,
}

/// One piece of a template string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TemplatePart {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    /// `42`, `1.5`, `"hi"`, `true`, `nil`
    Literal(Literal),
    /// `"Hello, {name}!"`
    Template(Vec<TemplatePart>),
    /// `/ab+c/gi`
    Regex { pattern: String, flags: String },
    /// `x`
    Ident(String),
    /// The piped-in receiver of `value |> .method()`; substituted downstream.
    Placeholder,

    /// `a + b`
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `-x`, `not x`, `!x`
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// `a and b`, `a || b`, `a ?? b`
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `a < b <= c`: N operands, N-1 operators.
    Chain {
        operands: Vec<Expr>,
        operators: Vec<BinOp>,
    },
    /// `a..b`, `a..=b`
    Range {
        start: Box<Expr>,
        end: Box<Expr>,
        inclusive: bool,
    },
    /// `x in xs`, `x not in xs`
    Membership {
        value: Box<Expr>,
        collection: Box<Expr>,
        negated: bool,
    },
    /// `x is Int`, `x is not Nil`
    TypeTest {
        value: Box<Expr>,
        ty: TypeExpr,
        negated: bool,
    },
    /// `xs |> map(f)`
    Pipe { left: Box<Expr>, right: Box<Expr> },

    /// `a.b`, `a?.b`
    Member {
        object: Box<Expr>,
        property: Ident,
        optional: bool,
    },
    /// `a[i]`, `a?.[i]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },
    /// `a[start:end:step]`, each bound optional
    Slice {
        object: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    /// `f(a, name: b)`
    Call { callee: Box<Expr>, args: Vec<Arg> },
    /// `value?`
    Propagate(Box<Expr>),

    /// `[1, 2, 3]`
    Array(Vec<Expr>),
    /// `{a, b: 1, ...rest}`
    Object(Vec<ObjectEntry>),
    /// `(a, b)`, `()`
    Tuple(Vec<Expr>),
    /// `[x * 2 for x in xs if x > 0]`
    ListComprehension {
        element: Box<Expr>,
        binding: DestructurePattern,
        iter: Box<Expr>,
        filter: Option<Box<Expr>>,
    },
    /// `{k: v for k, v in pairs}`
    DictComprehension {
        key: Box<Expr>,
        value: Box<Expr>,
        binding: DestructurePattern,
        iter: Box<Expr>,
        filter: Option<Box<Expr>>,
    },

    /// `(x) => x + 1`, `async fn(x) { ... }`
    Lambda(Box<Lambda>),
    /// `match x { ... }`
    Match {
        subject: Box<Expr>,
        arms: Vec<MatchArm>,
    },
    /// `if c { a } elif d { b } else { e }`; the `else` is mandatory here.
    If {
        branches: Vec<IfBranch>,
        else_body: Block,
    },

    /// `...xs`
    Spread(Box<Expr>),
    /// `await task`
    Await(Box<Expr>),
    /// `yield x`, `yield from gen`
    Yield {
        value: Option<Box<Expr>>,
        delegate: bool,
    },
    /// `spawn work(x)`
    Spawn(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    /// `++`
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Concat => "++",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::LtEq => "<=",
            BinOp::Gt => ">",
            BinOp::GtEq => ">=",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LogicalOp {
    And,
    Or,
    /// `??`
    Coalesce,
}

/// A call argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Arg {
    Positional(Expr),
    Named { name: Ident, value: Expr },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ObjectKey {
    Name(String),
    String(String),
    /// `[expr]: value`
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ObjectEntry {
    /// `{a}`
    Shorthand(Ident),
    /// `{a: 1}`
    KeyValue { key: ObjectKey, value: Expr },
    /// `{...rest}`
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lambda {
    pub params: Vec<Param>,
    pub body: Body,
    pub is_async: bool,
}

/// A function or lambda parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub pattern: DestructurePattern,
    pub ty: Option<TypeExpr>,
    pub default: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfBranch {
    pub cond: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchArm {
    pub pattern: MatchPattern,
    pub guard: Option<Expr>,
    pub body: Body,
    pub span: Span,
}

// ============================================================
// Patterns
// ============================================================

/// Binding-only patterns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestructurePattern {
    pub kind: DestructureKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DestructureKind {
    /// `x`
    Name(String),
    /// `{a, b: alias, c = default, ...rest}`
    Object {
        entries: Vec<ObjectPatternEntry>,
        rest: Option<Ident>,
    },
    /// `[a, b, ...rest]`
    Array {
        elements: Vec<DestructurePattern>,
        rest: Option<Ident>,
    },
    /// `(a, b)`
    Tuple(Vec<DestructurePattern>),
}

impl DestructurePattern {
    pub fn name(name: impl Into<String>, span: Span) -> Self {
        Self {
            kind: DestructureKind::Name(name.into()),
            span,
        }
    }
}

/// `key`, `key: value`, `key = default`, `key: value = default`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectPatternEntry {
    pub key: String,
    pub value: DestructurePattern,
    pub default: Option<Expr>,
    pub span: Span,
}

/// Shape-testing patterns, used only in `match` arms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchPattern {
    pub kind: MatchPatternKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MatchPatternKind {
    /// `_`
    Wildcard,
    /// `42`, `-1`, `"ok"`, `true`, `nil`
    Literal(Literal),
    /// `1..10`, `"a"..="z"`
    Range {
        start: Literal,
        end: Literal,
        inclusive: bool,
    },
    /// `"prefix" ++ rest`
    StringConcat { prefix: String, rest: Ident },
    /// `Some(x)`, `None`
    Variant {
        name: Ident,
        fields: Vec<MatchPattern>,
    },
    /// `(a, _)`
    Tuple(Vec<MatchPattern>),
    /// `[first, ...rest]`
    Array {
        elements: Vec<MatchPattern>,
        rest: Option<Ident>,
    },
    /// `x`
    Binding(String),
}

// ============================================================
// Types
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeExpr {
    pub kind: TypeKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeKind {
    /// `Int`, `Result<T, E>`
    Named { name: String, args: Vec<TypeExpr> },
    /// `[Int]`
    Array(Box<TypeExpr>),
    /// `(Int, String)`
    Tuple(Vec<TypeExpr>),
    /// `(Int) -> Bool`
    Function {
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
    },
}

// ============================================================
// Statements
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
    /// Text of the `///` lines immediately above the statement.
    pub docs: Option<String>,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self {
            kind,
            span,
            docs: None,
        }
    }

    /// Wrap a dialect node.
    pub fn dialect(node: DialectNode, span: Span) -> Self {
        Self::new(StmtKind::Dialect(Box::new(node)), span)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StmtKind {
    Expr(Expr),
    /// `x = 1`, `a, b = b, a`
    Assign { targets: Vec<Expr>, values: Vec<Expr> },
    /// `x += 1`
    CompoundAssign {
        target: Expr,
        op: AssignOp,
        value: Expr,
    },
    /// `var a, b = 1, 2`
    Var { targets: Vec<Ident>, values: Vec<Expr> },
    /// `let {a, b} = obj`, or `[a, b] = pair` without `let`
    Let {
        pattern: DestructurePattern,
        value: Expr,
    },

    If {
        branches: Vec<IfBranch>,
        else_body: Option<Block>,
    },
    For {
        label: Option<Ident>,
        binding: DestructurePattern,
        iter: Expr,
        guard: Option<Expr>,
        body: Block,
        else_body: Option<Block>,
    },
    While {
        label: Option<Ident>,
        cond: Expr,
        body: Block,
    },
    Loop {
        label: Option<Ident>,
        body: Block,
    },
    Try {
        body: Block,
        catch: Option<CatchClause>,
        finally: Option<Block>,
    },
    /// `guard cond else { ... }`
    Guard { cond: Expr, else_body: Block },
    Break { label: Option<Ident> },
    Continue { label: Option<Ident> },
    Return(Option<Expr>),
    Defer(Body),
    /// `with open(p) as f { ... }`
    With {
        resource: Expr,
        alias: Option<Ident>,
        body: Block,
    },

    Function(Box<FunctionDecl>),
    Type(Box<TypeDecl>),
    Interface(Box<InterfaceDecl>),
    Impl(Box<ImplDecl>),
    Extern(Box<ExternDecl>),
    Import(Box<ImportDecl>),

    /// A node contributed by a block dialect.
    Dialect(Box<DialectNode>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AssignOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Coalesce,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatchClause {
    pub name: Option<Ident>,
    pub body: Block,
}

// ============================================================
// Declarations
// ============================================================

/// `@name` or `@name(args)` before a function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decorator {
    pub name: Ident,
    pub args: Vec<Arg>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    pub name: Ident,
    pub decorators: Vec<Decorator>,
    pub is_pub: bool,
    pub is_async: bool,
    pub type_params: Vec<Ident>,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDecl {
    pub name: Ident,
    pub is_pub: bool,
    pub type_params: Vec<Ident>,
    pub body: TypeBody,
    pub derives: Vec<Ident>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeBody {
    /// `{ x: Int, y: Int }`
    Record(Vec<Field>),
    /// `{ Circle(r: Float), Empty }` or `= Red | Green`
    Variants(Vec<Variant>),
    /// `= String`
    Alias(TypeExpr),
    /// `= String where it.contains("@")`
    Refinement { base: TypeExpr, predicate: Expr },
}

/// A record field or variant field; variant fields may be positional.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: Option<Ident>,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    pub name: Ident,
    pub fields: Vec<Field>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InterfaceKind {
    Interface,
    Trait,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceDecl {
    pub kind: InterfaceKind,
    pub name: Ident,
    pub is_pub: bool,
    pub type_params: Vec<Ident>,
    pub methods: Vec<MethodSig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodSig {
    pub name: Ident,
    pub is_async: bool,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    /// Default implementation (traits only).
    pub default_body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImplDecl {
    pub trait_ty: Option<TypeExpr>,
    pub target: TypeExpr,
    pub methods: Vec<FunctionDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternDecl {
    pub name: Ident,
    pub is_async: bool,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportDecl {
    pub kind: ImportKind,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ImportKind {
    /// `import { a, b as c } from "m"`
    Named(Vec<ImportSpec>),
    /// `import d from "m"`
    Default(Ident),
    /// `import * as ns from "m"`
    Namespace(Ident),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSpec {
    pub name: Ident,
    pub alias: Option<Ident>,
}

// ============================================================
// Dialect nodes
// ============================================================

/// Nodes contributed by block dialects.
///
/// Serialized with a `dialect` discriminant field so downstream stages can
/// dispatch on it without knowing the parser.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "dialect")]
pub enum DialectNode {
    /// `server ["name"] { ... }`
    Server { name: Option<String>, body: Vec<Stmt> },
    /// `route GET "/users/:id" => handler`
    Route {
        method: String,
        path: String,
        handler: Body,
    },
    /// `middleware fn name(req, next) { ... }`
    Middleware { function: FunctionDecl },

    /// `client ["name"] { ... }`
    Client { name: Option<String>, body: Vec<Stmt> },
    /// `state count: Int = 0`
    State {
        name: Ident,
        ty: Option<TypeExpr>,
        value: Expr,
    },
    /// `computed total = price * qty`
    Computed { name: Ident, value: Expr },
    /// `effect { ... }`
    Effect { body: Block },
    /// `component Card(title) { ... }`
    Component {
        name: Ident,
        params: Vec<Param>,
        body: Block,
    },
    /// `store Cart { ... }`
    Store { name: Ident, body: Vec<Stmt> },

    /// `shared ["name"] { ... }`
    Shared { name: Option<String>, body: Vec<Stmt> },

    /// `security { role ..., protect ..., auth ... }`
    Security { entries: Vec<SecurityEntry> },

    /// `deploy "prod" { key: value }`
    Deploy {
        name: Option<String>,
        config: Vec<ConfigEntry>,
    },

    /// `concurrent [mode] { ... }`
    Concurrent { mode: ConcurrentMode, body: Block },
    /// `select { ... }`
    Select { cases: Vec<SelectCase> },

    /// A block from a dialect registered outside this crate.
    Extension {
        #[serde(rename = "extension")]
        dialect: String,
        name: Option<String>,
        body: Vec<Stmt>,
    },
}

/// `key: value` inside a configuration-style block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigEntry {
    pub key: Ident,
    pub value: Expr,
    pub span: Span,
}

/// One entry of a security block, e.g. `protect "/admin/*" { require: Admin }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityEntry {
    pub kind: SecurityKind,
    /// Role name, protected path, or auth scheme.
    pub target: Option<Expr>,
    pub config: Vec<ConfigEntry>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SecurityKind {
    Role,
    Protect,
    Auth,
    Cors,
    Csp,
    RateLimit,
}

impl SecurityKind {
    pub fn from_keyword(word: &str) -> Option<Self> {
        let kind = match word {
            "role" => SecurityKind::Role,
            "protect" => SecurityKind::Protect,
            "auth" => SecurityKind::Auth,
            "cors" => SecurityKind::Cors,
            "csp" => SecurityKind::Csp,
            "rate_limit" => SecurityKind::RateLimit,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConcurrentMode {
    /// Wait for every task.
    All,
    /// Cancel the remaining tasks on the first error.
    CancelOnError,
    /// Take the first task to finish.
    First,
    /// Cancel everything after the given number of milliseconds.
    Timeout(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectCase {
    pub kind: SelectKind,
    pub body: Body,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SelectKind {
    /// `msg from ch =>`
    Receive { binding: Ident, channel: Expr },
    /// `ch.send(v) =>`
    Send { channel: Expr, value: Expr },
    /// `timeout(ms) =>`
    Timeout(Expr),
    /// `_ =>`
    Default,
}
