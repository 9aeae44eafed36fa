//! Grammar-based generators for Tova source code.
//!
//! Generates syntactically plausible programs so the fuzzer spends its time
//! past the first token instead of on immediately rejected input.

use arbitrary::{Arbitrary, Unstructured};

/// Maximum depth for recursive structures (expressions, blocks).
const MAX_DEPTH: u8 = 5;

/// Maximum number of items in lists (parameters, arms, elements).
const MAX_LIST_LEN: u8 = 5;

const NAMES: &[&str] = &["x", "y", "items", "user", "state", "spawn", "select", "from", "req"];
const TYPE_NAMES: &[&str] = &["Int", "String", "Bool", "Float", "User", "Result"];
const VARIANTS: &[&str] = &["Some", "None", "Ok", "Err", "Circle", "Empty"];
const BINARY_OPS: &[&str] = &[
    "+", "-", "*", "/", "%", "**", "++", "==", "!=", "<", "<=", ">", ">=", "and", "or", "??",
    "|>", "..", "..=", "in", "not in",
];

fn pick<'a>(u: &mut Unstructured<'_>, items: &'a [&'a str]) -> arbitrary::Result<&'a str> {
    Ok(*u.choose(items)?)
}

fn count(u: &mut Unstructured<'_>) -> arbitrary::Result<u8> {
    let n: u8 = u.arbitrary()?;
    Ok(n % MAX_LIST_LEN)
}

fn join<T>(items: &[T], sep: &str, f: impl Fn(&T) -> String) -> String {
    items.iter().map(f).collect::<Vec<_>>().join(sep)
}

// ============================================================
// Program Structure
// ============================================================

/// A complete Tova program.
#[derive(Debug, Clone)]
pub struct FuzzProgram {
    pub statements: Vec<FuzzStmt>,
}

impl FuzzProgram {
    pub fn to_source(&self) -> String {
        join(&self.statements, "\n", FuzzStmt::to_source)
    }
}

impl<'a> Arbitrary<'a> for FuzzProgram {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let count = count(u)? + 1;
        let mut statements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            statements.push(FuzzStmt::arbitrary_with_depth(u, 0)?);
        }
        Ok(FuzzProgram { statements })
    }
}

// ============================================================
// Statements
// ============================================================

#[derive(Debug, Clone)]
pub enum FuzzStmt {
    Expr(FuzzExpr),
    Assign(String, FuzzExpr),
    Var(String, FuzzExpr),
    Let(FuzzPattern, FuzzExpr),
    Function {
        name: String,
        params: Vec<String>,
        ret: Option<String>,
        body: Vec<FuzzStmt>,
    },
    If(FuzzExpr, Vec<FuzzStmt>, Option<Vec<FuzzStmt>>),
    For(String, FuzzExpr, Vec<FuzzStmt>),
    Return(Option<FuzzExpr>),
    Type(String, Vec<String>),
    Dialect(FuzzDialect),
}

impl FuzzStmt {
    pub fn to_source(&self) -> String {
        match self {
            FuzzStmt::Expr(e) => e.to_source(),
            FuzzStmt::Assign(name, e) => format!("{} = {}", name, e.to_source()),
            FuzzStmt::Var(name, e) => format!("var {} = {}", name, e.to_source()),
            FuzzStmt::Let(p, e) => format!("let {} = {}", p.to_source(), e.to_source()),
            FuzzStmt::Function {
                name,
                params,
                ret,
                body,
            } => {
                let ret = ret.as_ref().map_or(String::new(), |r| format!(" -> {}", r));
                format!("fn {}({}){} {}", name, params.join(", "), ret, block(body))
            }
            FuzzStmt::If(cond, then, otherwise) => {
                let mut s = format!("if {} {}", cond.to_source(), block(then));
                if let Some(otherwise) = otherwise {
                    s.push_str(" else ");
                    s.push_str(&block(otherwise));
                }
                s
            }
            FuzzStmt::For(name, iter, body) => {
                format!("for {} in {} {}", name, iter.to_source(), block(body))
            }
            FuzzStmt::Return(value) => match value {
                Some(v) => format!("return {}", v.to_source()),
                None => "return".to_string(),
            },
            FuzzStmt::Type(name, variants) => format!("type {} = {}", name, variants.join(" | ")),
            FuzzStmt::Dialect(d) => d.to_source(),
        }
    }

    fn arbitrary_with_depth(u: &mut Unstructured<'_>, depth: u8) -> arbitrary::Result<Self> {
        if depth >= MAX_DEPTH {
            return Ok(FuzzStmt::Expr(FuzzExpr::arbitrary_with_depth(u, depth)?));
        }
        let choice: u8 = u.arbitrary()?;
        Ok(match choice % 10 {
            0 => FuzzStmt::Expr(FuzzExpr::arbitrary_with_depth(u, depth)?),
            1 => FuzzStmt::Assign(pick(u, NAMES)?.into(), FuzzExpr::arbitrary_with_depth(u, depth)?),
            2 => FuzzStmt::Var(pick(u, NAMES)?.into(), FuzzExpr::arbitrary_with_depth(u, depth)?),
            3 => FuzzStmt::Let(
                FuzzPattern::arbitrary_with_depth(u, depth)?,
                FuzzExpr::arbitrary_with_depth(u, depth)?,
            ),
            4 => {
                let n = count(u)?;
                let mut params = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    params.push(pick(u, NAMES)?.to_string());
                }
                let ret = if u.arbitrary()? {
                    Some(pick(u, TYPE_NAMES)?.to_string())
                } else {
                    None
                };
                FuzzStmt::Function {
                    name: pick(u, NAMES)?.into(),
                    params,
                    ret,
                    body: stmts(u, depth + 1)?,
                }
            }
            5 => {
                let otherwise = if u.arbitrary()? {
                    Some(stmts(u, depth + 1)?)
                } else {
                    None
                };
                FuzzStmt::If(
                    FuzzExpr::arbitrary_with_depth(u, depth)?,
                    stmts(u, depth + 1)?,
                    otherwise,
                )
            }
            6 => FuzzStmt::For(
                pick(u, NAMES)?.into(),
                FuzzExpr::arbitrary_with_depth(u, depth)?,
                stmts(u, depth + 1)?,
            ),
            7 => {
                let value = if u.arbitrary()? {
                    Some(FuzzExpr::arbitrary_with_depth(u, depth)?)
                } else {
                    None
                };
                FuzzStmt::Return(value)
            }
            8 => {
                let n = count(u)? + 1;
                let mut variants = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    variants.push(pick(u, VARIANTS)?.to_string());
                }
                FuzzStmt::Type(pick(u, TYPE_NAMES)?.into(), variants)
            }
            _ => FuzzStmt::Dialect(FuzzDialect::arbitrary_with_depth(u, depth)?),
        })
    }
}

fn stmts(u: &mut Unstructured<'_>, depth: u8) -> arbitrary::Result<Vec<FuzzStmt>> {
    let n = count(u)?;
    let mut out = Vec::with_capacity(n as usize);
    for _ in 0..n {
        out.push(FuzzStmt::arbitrary_with_depth(u, depth)?);
    }
    Ok(out)
}

fn block(body: &[FuzzStmt]) -> String {
    if body.is_empty() {
        return "{}".to_string();
    }
    format!("{{\n{}\n}}", join(body, "\n", FuzzStmt::to_source))
}

// ============================================================
// Dialect blocks
// ============================================================

#[derive(Debug, Clone)]
pub enum FuzzDialect {
    Server(Vec<(String, String, FuzzExpr)>),
    Client(Vec<(String, FuzzExpr)>),
    Concurrent(Vec<FuzzStmt>),
    Select(Vec<(String, FuzzExpr)>),
}

impl FuzzDialect {
    pub fn to_source(&self) -> String {
        match self {
            FuzzDialect::Server(routes) => format!(
                "server {{\n{}\n}}",
                join(routes, "\n", |(method, path, handler)| format!(
                    "route {} \"{}\" => {}",
                    method,
                    path,
                    handler.to_source()
                ))
            ),
            FuzzDialect::Client(states) => format!(
                "client {{\n{}\n}}",
                join(states, "\n", |(name, value)| format!(
                    "state {} = {}",
                    name,
                    value.to_source()
                ))
            ),
            FuzzDialect::Concurrent(body) => format!("concurrent {}", block(body)),
            FuzzDialect::Select(cases) => format!(
                "select {{\n{}\n}}",
                join(cases, "\n", |(name, body)| format!(
                    "{} from ch => {}",
                    name,
                    body.to_source()
                ))
            ),
        }
    }

    fn arbitrary_with_depth(u: &mut Unstructured<'_>, depth: u8) -> arbitrary::Result<Self> {
        let choice: u8 = u.arbitrary()?;
        let n = count(u)?;
        Ok(match choice % 4 {
            0 => {
                let mut routes = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    let method = pick(u, &["GET", "POST", "PUT", "FETCH"])?.to_string();
                    let path = pick(u, &["/", "/users", "/users/:id"])?.to_string();
                    routes.push((method, path, FuzzExpr::arbitrary_with_depth(u, depth + 1)?));
                }
                FuzzDialect::Server(routes)
            }
            1 => {
                let mut states = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    states.push((
                        pick(u, NAMES)?.to_string(),
                        FuzzExpr::arbitrary_with_depth(u, depth + 1)?,
                    ));
                }
                FuzzDialect::Client(states)
            }
            2 => FuzzDialect::Concurrent(stmts(u, depth + 1)?),
            _ => {
                let mut cases = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    cases.push((
                        pick(u, NAMES)?.to_string(),
                        FuzzExpr::arbitrary_with_depth(u, depth + 1)?,
                    ));
                }
                FuzzDialect::Select(cases)
            }
        })
    }
}

// ============================================================
// Expressions
// ============================================================

#[derive(Debug, Clone)]
pub enum FuzzExpr {
    Int(u16),
    Str(String),
    Template(String, Box<FuzzExpr>),
    Name(String),
    Binary(Box<FuzzExpr>, &'static str, Box<FuzzExpr>),
    Not(Box<FuzzExpr>),
    Call(Box<FuzzExpr>, Vec<FuzzExpr>),
    Member(Box<FuzzExpr>, String),
    Array(Vec<FuzzExpr>),
    Lambda(String, Box<FuzzExpr>),
    Match(Box<FuzzExpr>, Vec<(FuzzMatchPattern, FuzzExpr)>),
    Spawn(Box<FuzzExpr>),
}

impl FuzzExpr {
    pub fn to_source(&self) -> String {
        match self {
            FuzzExpr::Int(n) => n.to_string(),
            FuzzExpr::Str(s) => format!("\"{}\"", s),
            FuzzExpr::Template(s, e) => format!("\"{} {{{}}}\"", s, e.to_source()),
            FuzzExpr::Name(n) => n.clone(),
            FuzzExpr::Binary(l, op, r) => format!("({} {} {})", l.to_source(), op, r.to_source()),
            FuzzExpr::Not(e) => format!("not {}", e.to_source()),
            FuzzExpr::Call(f, args) => {
                format!("{}({})", f.to_source(), join(args, ", ", FuzzExpr::to_source))
            }
            FuzzExpr::Member(e, name) => format!("{}.{}", e.to_source(), name),
            FuzzExpr::Array(items) => format!("[{}]", join(items, ", ", FuzzExpr::to_source)),
            FuzzExpr::Lambda(param, body) => format!("({}) => {}", param, body.to_source()),
            FuzzExpr::Match(subject, arms) => format!(
                "match {} {{\n{}\n}}",
                subject.to_source(),
                join(arms, "\n", |(p, e)| format!("{} => {}", p.to_source(), e.to_source()))
            ),
            FuzzExpr::Spawn(e) => format!("spawn {}", e.to_source()),
        }
    }

    fn arbitrary_with_depth(u: &mut Unstructured<'_>, depth: u8) -> arbitrary::Result<Self> {
        let choice: u8 = u.arbitrary()?;
        let choice = if depth >= MAX_DEPTH { choice % 3 } else { choice % 12 };
        let next = depth + 1;
        Ok(match choice {
            0 => FuzzExpr::Int(u.arbitrary()?),
            1 => FuzzExpr::Str(pick(u, &["hi", "a b", ""])?.to_string()),
            2 => FuzzExpr::Name(pick(u, NAMES)?.to_string()),
            3 => FuzzExpr::Template(
                pick(u, &["Hello,", "n ="])?.to_string(),
                Box::new(Self::arbitrary_with_depth(u, next)?),
            ),
            4 => FuzzExpr::Binary(
                Box::new(Self::arbitrary_with_depth(u, next)?),
                pick(u, BINARY_OPS)?,
                Box::new(Self::arbitrary_with_depth(u, next)?),
            ),
            5 => FuzzExpr::Not(Box::new(Self::arbitrary_with_depth(u, next)?)),
            6 => {
                let n = count(u)?;
                let mut args = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    args.push(Self::arbitrary_with_depth(u, next)?);
                }
                FuzzExpr::Call(Box::new(Self::arbitrary_with_depth(u, next)?), args)
            }
            7 => FuzzExpr::Member(
                Box::new(Self::arbitrary_with_depth(u, next)?),
                pick(u, NAMES)?.to_string(),
            ),
            8 => {
                let n = count(u)?;
                let mut items = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    items.push(Self::arbitrary_with_depth(u, next)?);
                }
                FuzzExpr::Array(items)
            }
            9 => FuzzExpr::Lambda(
                pick(u, NAMES)?.to_string(),
                Box::new(Self::arbitrary_with_depth(u, next)?),
            ),
            10 => {
                let n = count(u)? + 1;
                let mut arms = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    arms.push((
                        FuzzMatchPattern::arbitrary_with_depth(u, next)?,
                        Self::arbitrary_with_depth(u, next)?,
                    ));
                }
                FuzzExpr::Match(Box::new(Self::arbitrary_with_depth(u, next)?), arms)
            }
            _ => FuzzExpr::Spawn(Box::new(Self::arbitrary_with_depth(u, next)?)),
        })
    }
}

// ============================================================
// Patterns
// ============================================================

#[derive(Debug, Clone)]
pub enum FuzzPattern {
    Object(Vec<String>),
    Array(Vec<String>, Option<String>),
}

impl FuzzPattern {
    pub fn to_source(&self) -> String {
        match self {
            FuzzPattern::Object(keys) => format!("{{{}}}", keys.join(", ")),
            FuzzPattern::Array(items, rest) => {
                let mut parts = items.clone();
                if let Some(rest) = rest {
                    parts.push(format!("...{}", rest));
                }
                format!("[{}]", parts.join(", "))
            }
        }
    }

    fn arbitrary_with_depth(u: &mut Unstructured<'_>, _depth: u8) -> arbitrary::Result<Self> {
        let n = count(u)?;
        let mut names = Vec::with_capacity(n as usize);
        for _ in 0..n {
            names.push(pick(u, NAMES)?.to_string());
        }
        Ok(if u.arbitrary()? {
            FuzzPattern::Object(names)
        } else {
            let rest = if u.arbitrary()? {
                Some(pick(u, NAMES)?.to_string())
            } else {
                None
            };
            FuzzPattern::Array(names, rest)
        })
    }
}

#[derive(Debug, Clone)]
pub enum FuzzMatchPattern {
    Wildcard,
    Binding(String),
    Int(i16),
    Range(u8, u8, bool),
    Variant(String, Vec<FuzzMatchPattern>),
}

impl FuzzMatchPattern {
    pub fn to_source(&self) -> String {
        match self {
            FuzzMatchPattern::Wildcard => "_".to_string(),
            FuzzMatchPattern::Binding(name) => name.clone(),
            FuzzMatchPattern::Int(n) => n.to_string(),
            FuzzMatchPattern::Range(a, b, inclusive) => {
                format!("{}{}{}", a, if *inclusive { "..=" } else { ".." }, b)
            }
            FuzzMatchPattern::Variant(name, fields) if fields.is_empty() => name.clone(),
            FuzzMatchPattern::Variant(name, fields) => {
                format!("{}({})", name, join(fields, ", ", FuzzMatchPattern::to_source))
            }
        }
    }

    fn arbitrary_with_depth(u: &mut Unstructured<'_>, depth: u8) -> arbitrary::Result<Self> {
        let choice: u8 = u.arbitrary()?;
        let choice = if depth >= MAX_DEPTH { choice % 4 } else { choice % 5 };
        Ok(match choice {
            0 => FuzzMatchPattern::Wildcard,
            1 => FuzzMatchPattern::Binding(pick(u, NAMES)?.to_string()),
            2 => FuzzMatchPattern::Int(u.arbitrary()?),
            3 => FuzzMatchPattern::Range(u.arbitrary()?, u.arbitrary()?, u.arbitrary()?),
            _ => {
                let n = count(u)?;
                let mut fields = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    fields.push(Self::arbitrary_with_depth(u, depth + 1)?);
                }
                FuzzMatchPattern::Variant(pick(u, VARIANTS)?.to_string(), fields)
            }
        })
    }
}
