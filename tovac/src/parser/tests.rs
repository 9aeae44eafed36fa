//! Parser tests.
//!
//! Expression shapes are compared through a compact s-expression rendering;
//! everything else matches on the AST directly.

use std::sync::Arc;

use proptest::prelude::*;

use super::*;
use crate::config::ParserConfig;
use crate::dialect::{Placement, Production, Trigger};

/// Helper to parse a complete program that must succeed.
fn parse(source: &str) -> Program {
    match Parser::from_source(source).parse_program() {
        Ok(program) => program,
        Err(failure) => panic!("unexpected parse errors: {:#?}", failure.errors),
    }
}

/// Helper to parse a program that must fail.
fn parse_err(source: &str) -> ParseFailure {
    match Parser::from_source(source).parse_program() {
        Ok(program) => panic!("expected parse errors, got {:#?}", program),
        Err(failure) => failure,
    }
}

fn first_stmt(source: &str) -> StmtKind {
    parse(source).body.remove(0).kind
}

fn expr(source: &str) -> Expr {
    match first_stmt(source) {
        StmtKind::Expr(e) => e,
        other => panic!("expected expression statement, got {:#?}", other),
    }
}

fn first_code(failure: &ParseFailure) -> ErrorCode {
    failure.errors[0].code
}

/// Render an expression as a compact s-expression.
fn sexpr(e: &Expr) -> String {
    match &e.kind {
        ExprKind::Literal(literal) => lit(literal),
        ExprKind::Ident(name) => name.clone(),
        ExprKind::Placeholder => "_".to_string(),
        ExprKind::Binary { op, left, right } => {
            format!("({} {} {})", op.as_str(), sexpr(left), sexpr(right))
        }
        ExprKind::Unary { op, operand } => format!("({:?} {})", op, sexpr(operand)),
        ExprKind::Logical { op, left, right } => {
            format!("({:?} {} {})", op, sexpr(left), sexpr(right))
        }
        ExprKind::Chain {
            operands,
            operators,
        } => {
            let mut out = format!("(chain {}", sexpr(&operands[0]));
            for (op, operand) in operators.iter().zip(&operands[1..]) {
                out.push_str(&format!(" {} {}", op.as_str(), sexpr(operand)));
            }
            out.push(')');
            out
        }
        ExprKind::Pipe { left, right } => format!("(|> {} {})", sexpr(left), sexpr(right)),
        ExprKind::Member {
            object,
            property,
            optional,
        } => {
            let dot = if *optional { "?." } else { "." };
            format!("{}{}{}", sexpr(object), dot, property.node)
        }
        ExprKind::Call { callee, args } => {
            let args: Vec<String> = args
                .iter()
                .map(|arg| match arg {
                    Arg::Positional(value) => sexpr(value),
                    Arg::Named { name, value } => format!("{}: {}", name.node, sexpr(value)),
                })
                .collect();
            format!("{}({})", sexpr(callee), args.join(", "))
        }
        ExprKind::Index { object, index, .. } => format!("{}[{}]", sexpr(object), sexpr(index)),
        ExprKind::Propagate(inner) => format!("{}?", sexpr(inner)),
        ExprKind::Tuple(items) => {
            let items: Vec<String> = items.iter().map(sexpr).collect();
            format!("(tuple {})", items.join(" "))
        }
        ExprKind::Await(inner) => format!("(await {})", sexpr(inner)),
        ExprKind::Spawn(inner) => format!("(spawn {})", sexpr(inner)),
        ExprKind::Spread(inner) => format!("...{}", sexpr(inner)),
        ExprKind::Array(items) => {
            let items: Vec<String> = items.iter().map(sexpr).collect();
            format!("[{}]", items.join(", "))
        }
        ExprKind::Object(entries) => {
            let entries: Vec<String> = entries
                .iter()
                .map(|entry| match entry {
                    ObjectEntry::Shorthand(name) => name.node.clone(),
                    ObjectEntry::KeyValue { key, value } => {
                        let key = match key {
                            ObjectKey::Name(name) => name.clone(),
                            ObjectKey::String(s) => format!("{:?}", s),
                            ObjectKey::Computed(e) => format!("[{}]", sexpr(e)),
                        };
                        format!("{}: {}", key, sexpr(value))
                    }
                    ObjectEntry::Spread(e) => format!("...{}", sexpr(e)),
                })
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        ExprKind::Lambda(lambda) => {
            let body = match &lambda.body {
                Body::Expr(e) => sexpr(e),
                Body::Block(block) => format!("{{{} stmt(s)}}", block.stmts.len()),
            };
            format!("(lambda ({}) {})", params(&lambda.params), body)
        }
        other => format!("<{:?}>", std::mem::discriminant(other)),
    }
}

fn sexpr_of(source: &str) -> String {
    sexpr(&expr(source))
}

fn lit(literal: &Literal) -> String {
    match literal {
        Literal::Int(n) => n.to_string(),
        Literal::Float(x) => x.to_string(),
        Literal::String(s) => format!("{:?}", s),
        Literal::Bool(b) => b.to_string(),
        Literal::Nil => "nil".to_string(),
    }
}

fn pat(p: &DestructurePattern) -> String {
    fn rest(rest: &Option<Ident>) -> Option<String> {
        rest.as_ref().map(|r| format!("...{}", r.node))
    }
    match &p.kind {
        DestructureKind::Name(name) => name.clone(),
        DestructureKind::Object { entries, rest: tail } => {
            let mut parts: Vec<String> = entries
                .iter()
                .map(|entry| {
                    let mut out = entry.key.clone();
                    if !matches!(&entry.value.kind, DestructureKind::Name(n) if *n == entry.key) {
                        out = format!("{}: {}", out, pat(&entry.value));
                    }
                    if let Some(default) = &entry.default {
                        out = format!("{} = {}", out, sexpr(default));
                    }
                    out
                })
                .collect();
            parts.extend(rest(tail));
            format!("{{{}}}", parts.join(", "))
        }
        DestructureKind::Array { elements, rest: tail } => {
            let mut parts: Vec<String> = elements.iter().map(pat).collect();
            parts.extend(rest(tail));
            format!("[{}]", parts.join(", "))
        }
        DestructureKind::Tuple(items) => {
            let items: Vec<String> = items.iter().map(pat).collect();
            format!("({})", items.join(", "))
        }
    }
}

fn mpat(p: &MatchPattern) -> String {
    let list = |items: &[MatchPattern]| items.iter().map(mpat).collect::<Vec<_>>().join(", ");
    match &p.kind {
        MatchPatternKind::Wildcard => "_".to_string(),
        MatchPatternKind::Literal(literal) => lit(literal),
        MatchPatternKind::Range {
            start,
            end,
            inclusive,
        } => {
            let op = if *inclusive { "..=" } else { ".." };
            format!("{}{}{}", lit(start), op, lit(end))
        }
        MatchPatternKind::StringConcat { prefix, rest } => format!("{:?} ++ {}", prefix, rest.node),
        MatchPatternKind::Variant { name, fields } if fields.is_empty() => name.node.clone(),
        MatchPatternKind::Variant { name, fields } => format!("{}({})", name.node, list(fields)),
        MatchPatternKind::Tuple(items) => format!("({})", list(items)),
        MatchPatternKind::Array { elements, rest } => {
            let mut parts: Vec<String> = elements.iter().map(mpat).collect();
            parts.extend(rest.as_ref().map(|r| format!("...{}", r.node)));
            format!("[{}]", parts.join(", "))
        }
        MatchPatternKind::Binding(name) => name.clone(),
    }
}

fn ty(t: &TypeExpr) -> String {
    let list = |items: &[TypeExpr]| items.iter().map(ty).collect::<Vec<_>>().join(", ");
    match &t.kind {
        TypeKind::Named { name, args } if args.is_empty() => name.clone(),
        TypeKind::Named { name, args } => format!("{}<{}>", name, list(args)),
        TypeKind::Array(element) => format!("[{}]", ty(element)),
        TypeKind::Tuple(items) => format!("({})", list(items)),
        TypeKind::Function { params, ret } => format!("({}) -> {}", list(params), ty(ret)),
    }
}

fn params(params: &[Param]) -> String {
    params
        .iter()
        .map(|param| {
            let mut out = pat(&param.pattern);
            if let Some(t) = &param.ty {
                out = format!("{}: {}", out, ty(t));
            }
            if let Some(default) = &param.default {
                out = format!("{} = {}", out, sexpr(default));
            }
            out
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn args(args: &[Arg]) -> String {
    args.iter()
        .map(|arg| match arg {
            Arg::Positional(value) => sexpr(value),
            Arg::Named { name, value } => format!("{}: {}", name.node, sexpr(value)),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|field| match &field.name {
            Some(name) => format!("{}: {}", name.node, ty(&field.ty)),
            None => ty(&field.ty),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn names(idents: &[Ident]) -> String {
    idents.iter().map(|i| i.node.as_str()).collect::<Vec<_>>().join(", ")
}

fn function_header(function: &FunctionDecl) -> String {
    let mut out = String::new();
    if function.is_pub {
        out.push_str("pub ");
    }
    if function.is_async {
        out.push_str("async ");
    }
    out.push_str("fn ");
    out.push_str(&function.name.node);
    if !function.type_params.is_empty() {
        out.push_str(&format!("<{}>", names(&function.type_params)));
    }
    out.push_str(&format!("({})", params(&function.params)));
    if let Some(ret) = &function.ret {
        out.push_str(&format!(" -> {}", ty(ret)));
    }
    out
}

/// Render a statement as an indented outline, one line per node.
fn outline(stmt: &Stmt) -> String {
    let mut lines = Vec::new();
    outline_into(stmt, 0, &mut lines);
    lines.join("\n")
}

fn outline_of(source: &str) -> String {
    parse(source).body.iter().map(outline).collect::<Vec<_>>().join("\n")
}

fn outline_body(stmts: &[Stmt], depth: usize, lines: &mut Vec<String>) {
    for stmt in stmts {
        outline_into(stmt, depth + 1, lines);
    }
}

fn outline_into(stmt: &Stmt, depth: usize, lines: &mut Vec<String>) {
    let pad = "  ".repeat(depth);
    let block_name = |keyword: &str, name: &Option<String>| match name {
        Some(name) => format!("{}{} {:?}", pad, keyword, name),
        None => format!("{}{}", pad, keyword),
    };
    match &stmt.kind {
        StmtKind::Expr(e) => lines.push(format!("{}{}", pad, sexpr(e))),
        StmtKind::Assign { targets, values } => {
            let targets: Vec<String> = targets.iter().map(sexpr).collect();
            let values: Vec<String> = values.iter().map(sexpr).collect();
            lines.push(format!("{}{} = {}", pad, targets.join(", "), values.join(", ")));
        }
        StmtKind::Let { pattern, value } => {
            lines.push(format!("{}let {} = {}", pad, pat(pattern), sexpr(value)))
        }
        StmtKind::Function(function) => {
            for decorator in &function.decorators {
                lines.push(format!("{}@{}({})", pad, decorator.name.node, args(&decorator.args)));
            }
            lines.push(format!("{}{}", pad, function_header(function)));
            outline_body(&function.body.stmts, depth, lines);
        }
        StmtKind::Type(decl) => {
            let mut head = format!("{}type {}", pad, decl.name.node);
            if !decl.type_params.is_empty() {
                head.push_str(&format!("<{}>", names(&decl.type_params)));
            }
            match &decl.body {
                TypeBody::Record(record) => head.push_str(&format!(" {{ {} }}", fields(record))),
                TypeBody::Variants(variants) => {
                    let variants: Vec<String> = variants
                        .iter()
                        .map(|v| {
                            if v.fields.is_empty() {
                                v.name.node.clone()
                            } else {
                                format!("{}({})", v.name.node, fields(&v.fields))
                            }
                        })
                        .collect();
                    head.push_str(&format!(" = {}", variants.join(" | ")));
                }
                TypeBody::Alias(alias) => head.push_str(&format!(" = {}", ty(alias))),
                TypeBody::Refinement { base, predicate } => {
                    head.push_str(&format!(" = {} where {}", ty(base), sexpr(predicate)))
                }
            }
            if !decl.derives.is_empty() {
                head.push_str(&format!(" derive [{}]", names(&decl.derives)));
            }
            lines.push(head);
        }
        StmtKind::Dialect(node) => match node.as_ref() {
            DialectNode::Server { name, body } => {
                lines.push(block_name("server", name));
                outline_body(body, depth, lines);
            }
            DialectNode::Route {
                method,
                path,
                handler,
            } => {
                let handler = match handler {
                    Body::Expr(e) => sexpr(e),
                    Body::Block(block) => format!("{{{} stmt(s)}}", block.stmts.len()),
                };
                lines.push(format!("{}route {} {:?} => {}", pad, method, path, handler));
            }
            DialectNode::Middleware { function } => {
                lines.push(format!("{}middleware {}", pad, function_header(function)));
                outline_body(&function.body.stmts, depth, lines);
            }
            DialectNode::Client { name, body } => {
                lines.push(block_name("client", name));
                outline_body(body, depth, lines);
            }
            DialectNode::State { name, ty: t, value } => {
                let annotation = t.as_ref().map(|t| format!(": {}", ty(t))).unwrap_or_default();
                lines.push(format!("{}state {}{} = {}", pad, name.node, annotation, sexpr(value)));
            }
            DialectNode::Computed { name, value } => {
                lines.push(format!("{}computed {} = {}", pad, name.node, sexpr(value)))
            }
            DialectNode::Effect { body } => {
                lines.push(format!("{}effect", pad));
                outline_body(&body.stmts, depth, lines);
            }
            DialectNode::Component {
                name,
                params: component_params,
                body,
            } => {
                lines.push(format!("{}component {}({})", pad, name.node, params(component_params)));
                outline_body(&body.stmts, depth, lines);
            }
            DialectNode::Store { name, body } => {
                lines.push(format!("{}store {}", pad, name.node));
                outline_body(body, depth, lines);
            }
            DialectNode::Shared { name, body } => {
                lines.push(block_name("shared", name));
                outline_body(body, depth, lines);
            }
            DialectNode::Security { entries } => {
                lines.push(format!("{}security", pad));
                for entry in entries {
                    let mut line = format!("{}  {:?}", pad, entry.kind);
                    if let Some(target) = &entry.target {
                        line.push_str(&format!(" {}", sexpr(target)));
                    }
                    for config in &entry.config {
                        line.push_str(&format!(" {}={}", config.key.node, sexpr(&config.value)));
                    }
                    lines.push(line);
                }
            }
            DialectNode::Deploy { name, config } => {
                lines.push(block_name("deploy", name));
                for entry in config {
                    lines.push(format!("{}  {}: {}", pad, entry.key.node, sexpr(&entry.value)));
                }
            }
            other => lines.push(format!("{}{:?}", pad, std::mem::discriminant(other))),
        },
        other => lines.push(format!("{}{:?}", pad, std::mem::discriminant(other))),
    }
}

// ============================================================
// Token cursor
// ============================================================

#[test]
fn test_cursor_is_bounds_safe() {
    let mut parser = Parser::from_source("a");
    assert_eq!(parser.current().kind, TokenKind::Ident);
    assert_eq!(parser.peek(100).kind, TokenKind::Eof);
    parser.advance();
    parser.advance();
    parser.advance();
    assert!(parser.is_at_end());
    assert_eq!(parser.current().kind, TokenKind::Eof);
}

#[test]
fn test_match_kind_does_not_consume_on_failure() {
    let mut parser = Parser::from_source("a b");
    assert!(parser.match_kind(&[TokenKind::LParen, TokenKind::Comma]).is_none());
    assert_eq!(parser.current().value, "a");
    assert!(parser.match_kind(&[TokenKind::Ident]).is_some());
    assert_eq!(parser.current().value, "b");
}

#[test]
fn test_expect_reports_location_and_expected_kind() {
    let mut parser = Parser::from_source("a\n  )");
    parser.advance();
    let err = parser.expect(TokenKind::LBrace).unwrap_err();
    assert_eq!(err.line(), 2);
    assert_eq!(err.column(), 3);
    assert!(err.message.contains('{'), "message: {}", err.message);
}

#[test]
fn test_new_appends_eof() {
    let parser = Parser::new(Vec::new());
    assert!(parser.is_at_end());
}

// ============================================================
// Speculative parsing
// ============================================================

#[test]
fn test_failed_speculation_restores_cursor_and_errors() {
    let mut parser = Parser::from_source("(a + 1)");
    let before = parser.checkpoint();

    let result = parser.speculate(|p| {
        p.expect(TokenKind::LParen)?;
        p.expect_ident()?;
        let noise = p.error_expected("noise");
        p.record(noise);
        p.expect(TokenKind::RParen)?;
        p.expect(TokenKind::FatArrow)
    });

    assert!(result.is_none());
    assert_eq!(parser.checkpoint(), before);
    assert!(parser.errors().is_empty());
}

#[test]
fn test_successful_speculation_keeps_position() {
    let mut parser = Parser::from_source("(a) => a");
    let result = parser.speculate(|p| {
        p.expect(TokenKind::LParen)?;
        p.expect_ident()?;
        p.expect(TokenKind::RParen)
    });
    assert!(result.is_some());
    assert_eq!(parser.current().kind, TokenKind::FatArrow);
}

// ============================================================
// Expressions
// ============================================================

#[test]
fn test_precedence_levels() {
    insta::assert_snapshot!(sexpr_of("1 + 2 * 3 ** 2"), @"(+ 1 (* 2 (** 3 2)))");
    insta::assert_snapshot!(sexpr_of("a - b - c"), @"(- (- a b) c)");
    insta::assert_snapshot!(sexpr_of("a * b + c % d"), @"(+ (* a b) (% c d))");
    insta::assert_snapshot!(sexpr_of("a ++ b"), @"(++ a b)");
}

#[test]
fn test_power_is_right_associative() {
    insta::assert_snapshot!(sexpr_of("2 ** 3 ** 2"), @"(** 2 (** 3 2))");
}

#[test]
fn test_unary_binds_tighter_than_power_operands() {
    insta::assert_snapshot!(sexpr_of("-a * b"), @"(* (Neg a) b)");
    insta::assert_snapshot!(sexpr_of("!done"), @"(Not done)");
}

#[test]
fn test_logical_levels() {
    insta::assert_snapshot!(
        sexpr_of("a ?? b or c and d"),
        @"(Coalesce a (Or b (And c d)))"
    );
    insta::assert_snapshot!(sexpr_of("a || b && c"), @"(Or a (And b c))");
}

#[test]
fn test_not_is_right_recursive() {
    insta::assert_snapshot!(sexpr_of("not not x"), @"(Not (Not x))");
    insta::assert_snapshot!(sexpr_of("not a == b"), @"(Not (== a b))");
}

#[test]
fn test_chained_comparison() {
    let e = expr("a < b <= c");
    match &e.kind {
        ExprKind::Chain {
            operands,
            operators,
        } => {
            assert_eq!(operands.len(), 3);
            assert_eq!(operators, &vec![BinOp::Lt, BinOp::LtEq]);
        }
        other => panic!("expected chain, got {:?}", other),
    }
}

#[test]
fn test_single_comparison_is_binary() {
    let e = expr("a < b");
    assert!(matches!(e.kind, ExprKind::Binary { op: BinOp::Lt, .. }));
}

#[test]
fn test_membership_and_type_tests() {
    let e = expr("x not in xs");
    assert!(matches!(e.kind, ExprKind::Membership { negated: true, .. }));

    let e = expr("x in xs");
    assert!(matches!(e.kind, ExprKind::Membership { negated: false, .. }));

    let e = expr("x is not Int");
    match e.kind {
        ExprKind::TypeTest { ty, negated, .. } => {
            assert!(negated);
            assert!(matches!(ty.kind, TypeKind::Named { ref name, .. } if name == "Int"));
        }
        other => panic!("expected type test, got {:?}", other),
    }
}

#[test]
fn test_range() {
    let e = expr("1..=10");
    assert!(matches!(e.kind, ExprKind::Range { inclusive: true, .. }));
    let e = expr("0..n + 1");
    match e.kind {
        ExprKind::Range { end, inclusive, .. } => {
            assert!(!inclusive);
            insta::assert_snapshot!(sexpr(&end), @"(+ n 1)");
        }
        other => panic!("expected range, got {:?}", other),
    }
}

#[test]
fn test_pipe_and_placeholder_method() {
    let e = expr("xs |> filter(ok) |> .map(f)");
    insta::assert_snapshot!(sexpr(&e), @"(|> (|> xs filter(ok)) _.map(f))");
}

#[test]
fn test_postfix_chain() {
    insta::assert_snapshot!(sexpr_of("a.b(c)[0]?.d"), @"a.b(c)[0]?.d");
    insta::assert_snapshot!(sexpr_of("load(path)?"), @"load(path)?");
    insta::assert_snapshot!(sexpr_of("f(x, key: 1)"), @"f(x, key: 1)");
}

#[test]
fn test_await_and_spread() {
    insta::assert_snapshot!(sexpr_of("await fetch(url)"), @"(await fetch(url))");
    let e = expr("[...xs, 1]");
    match e.kind {
        ExprKind::Array(items) => assert!(matches!(items[0].kind, ExprKind::Spread(_))),
        other => panic!("expected array, got {:?}", other),
    }
}

#[test]
fn test_slice() {
    let e = expr("xs[1:3]");
    match e.kind {
        ExprKind::Slice {
            start, end, step, ..
        } => {
            assert!(start.is_some());
            assert!(end.is_some());
            assert!(step.is_none());
        }
        other => panic!("expected slice, got {:?}", other),
    }
}

#[test]
fn test_bracket_on_new_line_is_not_indexing() {
    let program = parse("x = a\n[1, 2]");
    assert_eq!(program.body.len(), 2);
    assert!(matches!(
        &program.body[1].kind,
        StmtKind::Expr(e) if matches!(e.kind, ExprKind::Array(_))
    ));
}

#[test]
fn test_paren_on_new_line_is_not_a_call() {
    let program = parse("x = a\n(b)");
    assert_eq!(program.body.len(), 2);
    assert!(matches!(
        &program.body[0].kind,
        StmtKind::Assign { values, .. } if matches!(values[0].kind, ExprKind::Ident(_))
    ));
}

#[test]
fn test_arrow_lambda_with_parenthesized_params() {
    let e = expr("(x) => x + 1");
    match e.kind {
        ExprKind::Lambda(lambda) => {
            assert_eq!(lambda.params.len(), 1);
            assert!(matches!(lambda.params[0].pattern.kind, DestructureKind::Name(ref n) if n == "x"));
            match lambda.body {
                Body::Expr(body) => assert_eq!(sexpr(&body), "(+ x 1)"),
                Body::Block(_) => panic!("expected expression body"),
            }
        }
        other => panic!("expected lambda, got {:?}", other),
    }
}

#[test]
fn test_parenthesized_expression_is_not_lambda() {
    insta::assert_snapshot!(sexpr_of("(x + 1)"), @"(+ x 1)");
    insta::assert_snapshot!(sexpr_of("(x + 1) * 2"), @"(* (+ x 1) 2)");
}

#[test]
fn test_tuple_without_arrow() {
    insta::assert_snapshot!(sexpr_of("(x, y)"), @"(tuple x y)");
    assert_eq!(sexpr_of("()"), "(tuple )");
}

#[test]
fn test_other_lambda_forms() {
    let e = expr("x => x * 2");
    assert!(matches!(e.kind, ExprKind::Lambda(ref l) if l.params.len() == 1 && !l.is_async));

    let e = expr("(a: Int, b = 1) => a + b");
    match e.kind {
        ExprKind::Lambda(lambda) => {
            assert!(lambda.params[0].ty.is_some());
            assert!(lambda.params[1].default.is_some());
        }
        other => panic!("expected lambda, got {:?}", other),
    }

    let e = expr("async fn(req) { await handle(req) }");
    assert!(matches!(e.kind, ExprKind::Lambda(ref l) if l.is_async && matches!(l.body, Body::Block(_))));
}

#[test]
fn test_lambda_speculation_leaves_no_errors() {
    // `(a, b + 1)` begins like a parameter list; the abandoned attempt must
    // not leak its error.
    let program = parse("(a, b + 1)");
    assert_eq!(program.body.len(), 1);
}

#[test]
fn test_templates() {
    let e = expr(r#""Hello, {name}!""#);
    match e.kind {
        ExprKind::Template(parts) => {
            assert_eq!(parts.len(), 3);
            assert_eq!(parts[0], TemplatePart::Text("Hello, ".to_string()));
            assert!(matches!(&parts[1], TemplatePart::Expr(e) if sexpr(e) == "name"));
            assert_eq!(parts[2], TemplatePart::Text("!".to_string()));
        }
        other => panic!("expected template, got {:?}", other),
    }
}

#[test]
fn test_template_interpolation_is_a_full_expression() {
    let e = expr(r#""total: {price * qty + tax}""#);
    match e.kind {
        ExprKind::Template(parts) => {
            assert!(matches!(&parts[1], TemplatePart::Expr(e) if sexpr(e) == "(+ (* price qty) tax)"));
        }
        other => panic!("expected template, got {:?}", other),
    }
}

#[test]
fn test_list_comprehension() {
    let e = expr("[x * 2 for x in xs if x > 0]");
    match e.kind {
        ExprKind::ListComprehension {
            element, filter, ..
        } => {
            insta::assert_snapshot!(sexpr(&element), @"(* x 2)");
            assert!(filter.is_some());
        }
        other => panic!("expected list comprehension, got {:?}", other),
    }
}

#[test]
fn test_dict_comprehension_with_tuple_binding() {
    let e = expr("{k: v * 2 for k, v in pairs}");
    match e.kind {
        ExprKind::DictComprehension {
            key,
            binding,
            filter,
            ..
        } => {
            insta::assert_snapshot!(sexpr(&key), @"k");
            assert!(matches!(binding.kind, DestructureKind::Tuple(ref items) if items.len() == 2));
            assert!(filter.is_none());
        }
        other => panic!("expected dict comprehension, got {:?}", other),
    }
}

#[test]
fn test_literals_with_trailing_commas() {
    let e = expr("[1, 2, 3,]");
    assert!(matches!(e.kind, ExprKind::Array(ref items) if items.len() == 3));

    let e = expr(r#"{a, b: 2, "c": 3, ...rest,}"#);
    match e.kind {
        ExprKind::Object(entries) => {
            assert_eq!(entries.len(), 4);
            assert!(matches!(entries[0], ObjectEntry::Shorthand(_)));
            assert!(matches!(entries[3], ObjectEntry::Spread(_)));
        }
        other => panic!("expected object, got {:?}", other),
    }
}

#[test]
fn test_if_expression_requires_else() {
    let stmt = first_stmt("y = if a { 1 } else { 2 }");
    assert!(matches!(
        stmt,
        StmtKind::Assign { ref values, .. } if matches!(values[0].kind, ExprKind::If { .. })
    ));

    let failure = parse_err("y = if a { 1 }");
    assert_eq!(first_code(&failure), ErrorCode::IfExpressionWithoutElse);
}

#[test]
fn test_contextual_keywords_are_names_outside_dialects() {
    let program = parse("state = 1\nfn effect(store) { store }\nroute(from)");
    assert_eq!(program.body.len(), 3);
    assert!(matches!(
        &program.body[0].kind,
        StmtKind::Assign { targets, .. } if matches!(targets[0].kind, ExprKind::Ident(ref n) if n == "state")
    ));
    assert!(matches!(&program.body[1].kind, StmtKind::Function(f) if f.name.node == "effect"));
}

// ============================================================
// Patterns
// ============================================================

fn match_arms(source: &str) -> Vec<MatchArm> {
    match expr(source).kind {
        ExprKind::Match { arms, .. } => arms,
        other => panic!("expected match, got {:?}", other),
    }
}

#[test]
fn test_capitalization_decides_variant_or_binding() {
    let arms = match_arms("match v {\n  Some(x) => x\n  None => 0\n  x => x\n}");
    match &arms[0].pattern.kind {
        MatchPatternKind::Variant { name, fields } => {
            assert_eq!(name.node, "Some");
            assert_eq!(fields.len(), 1);
            assert!(matches!(fields[0].kind, MatchPatternKind::Binding(ref n) if n == "x"));
        }
        other => panic!("expected variant, got {:?}", other),
    }
    assert!(matches!(
        &arms[1].pattern.kind,
        MatchPatternKind::Variant { name, fields } if name.node == "None" && fields.is_empty()
    ));
    assert!(matches!(&arms[2].pattern.kind, MatchPatternKind::Binding(n) if n == "x"));
}

#[test]
fn test_literal_and_range_patterns() {
    let arms = match_arms(
        "match n {\n  0 => \"zero\"\n  -1 => \"minus one\"\n  1..=9 => \"digit\"\n  10..100 => \"big\"\n  _ => \"other\"\n}",
    );
    assert!(matches!(arms[0].pattern.kind, MatchPatternKind::Literal(Literal::Int(0))));
    assert!(matches!(arms[1].pattern.kind, MatchPatternKind::Literal(Literal::Int(-1))));
    assert!(matches!(
        arms[2].pattern.kind,
        MatchPatternKind::Range {
            start: Literal::Int(1),
            end: Literal::Int(9),
            inclusive: true
        }
    ));
    assert!(matches!(
        arms[3].pattern.kind,
        MatchPatternKind::Range { inclusive: false, .. }
    ));
    assert!(matches!(arms[4].pattern.kind, MatchPatternKind::Wildcard));
}

#[test]
fn test_string_concat_pattern() {
    let arms = match_arms("match path {\n  \"/api/\" ++ rest => rest\n  _ => nil\n}");
    assert!(matches!(
        &arms[0].pattern.kind,
        MatchPatternKind::StringConcat { prefix, rest } if prefix == "/api/" && rest.node == "rest"
    ));
}

#[test]
fn test_nested_collection_patterns() {
    let arms = match_arms("match v {\n  [first, ...rest] => first\n  (Ok(a), _) => a\n  [] => nil\n}");
    assert!(matches!(
        &arms[0].pattern.kind,
        MatchPatternKind::Array { elements, rest: Some(r) } if elements.len() == 1 && r.node == "rest"
    ));
    match &arms[1].pattern.kind {
        MatchPatternKind::Tuple(items) => {
            assert!(matches!(items[0].kind, MatchPatternKind::Variant { .. }));
            assert!(matches!(items[1].kind, MatchPatternKind::Wildcard));
        }
        other => panic!("expected tuple pattern, got {:?}", other),
    }
}

#[test]
fn test_match_guards() {
    let arms = match_arms("match n {\n  x if x > 0 => 1\n  x if ready => 2\n  _ => 3\n}");
    insta::assert_snapshot!(sexpr(arms[0].guard.as_ref().unwrap()), @"(> x 0)");
    insta::assert_snapshot!(sexpr(arms[1].guard.as_ref().unwrap()), @"ready");
    assert!(arms[2].guard.is_none());
}

#[test]
fn test_missing_arrow_in_match_arm() {
    let failure = parse_err("match v {\n  Some(x) x\n}");
    assert_eq!(first_code(&failure), ErrorCode::InvalidMatchArm);
}

#[test]
fn test_let_object_destructure() {
    match first_stmt("let {a, b: c} = obj") {
        StmtKind::Let { pattern, value } => {
            insta::assert_snapshot!(sexpr(&value), @"obj");
            match pattern.kind {
                DestructureKind::Object { entries, rest } => {
                    assert!(rest.is_none());
                    assert_eq!(entries.len(), 2);
                    assert_eq!(entries[0].key, "a");
                    assert!(matches!(entries[0].value.kind, DestructureKind::Name(ref n) if n == "a"));
                    assert_eq!(entries[1].key, "b");
                    assert!(matches!(entries[1].value.kind, DestructureKind::Name(ref n) if n == "c"));
                }
                other => panic!("expected object pattern, got {:?}", other),
            }
        }
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn test_let_defaults_and_rest() {
    match first_stmt("let {a = 1, ...others} = obj") {
        StmtKind::Let { pattern, .. } => match pattern.kind {
            DestructureKind::Object { entries, rest } => {
                assert!(entries[0].default.is_some());
                assert_eq!(rest.map(|r| r.node), Some("others".to_string()));
            }
            other => panic!("expected object pattern, got {:?}", other),
        },
        other => panic!("expected let, got {:?}", other),
    }

    match first_stmt("let [head, ...tail] = xs") {
        StmtKind::Let { pattern, .. } => assert!(matches!(
            pattern.kind,
            DestructureKind::Array { ref elements, rest: Some(_) } if elements.len() == 1
        )),
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn test_rest_must_be_last() {
    let failure = parse_err("let [a, ...rest, b] = xs");
    assert_eq!(first_code(&failure), ErrorCode::RestNotLast);
}

#[test]
fn test_match_pattern_shapes() {
    let sources = [
        "match v {\n  Some(x) => x\n  None => 0\n  x => x\n}",
        "match n {\n  0 => \"zero\"\n  -1 => \"minus one\"\n  1..=9 => \"digit\"\n  10..100 => \"big\"\n  _ => \"other\"\n}",
        "match path {\n  \"/api/\" ++ rest => rest\n  _ => nil\n}",
        "match v {\n  [first, ...rest] => first\n  (Ok(a), _) => a\n  [] => nil\n}",
    ];
    let patterns: Vec<String> = sources
        .iter()
        .flat_map(|source| match_arms(source))
        .map(|arm| mpat(&arm.pattern))
        .collect();
    insta::assert_snapshot!(patterns.join("\n"), @r#"
    Some(x)
    None
    x
    0
    -1
    1..=9
    10..100
    _
    "/api/" ++ rest
    _
    [first, ...rest]
    (Ok(a), _)
    []
    "#);
}

#[test]
fn test_destructure_pattern_shapes() {
    let source = "let {a, b: c} = obj\nlet {a = 1, ...others} = obj\nlet [head, ...tail] = xs\nlet [[x, y], {z}] = grid\n(a, b) = pair";
    insta::assert_snapshot!(outline_of(source), @r"
    let {a, b: c} = obj
    let {a = 1, ...others} = obj
    let [head, ...tail] = xs
    let [[x, y], {z}] = grid
    let (a, b) = pair
    ");
}

#[test]
fn test_tuple_assignment_destructures() {
    match first_stmt("(a, b) = pair") {
        StmtKind::Let { pattern, value } => {
            assert_eq!(sexpr(&value), "pair");
            assert!(matches!(
                pattern.kind,
                DestructureKind::Tuple(ref items) if items.len() == 2
            ));
        }
        other => panic!("expected destructuring let, got {:?}", other),
    }
}

#[test]
fn test_let_with_plain_name_is_rejected_with_hint() {
    let failure = parse_err("let x = 1");
    let error = &failure.errors[0];
    assert_eq!(error.code, ErrorCode::LetRequiresPattern);
    assert_eq!(error.category(), crate::diagnostics::ErrorCategory::Shape);
    let hint = error.hint.as_deref().unwrap_or_default();
    assert!(hint.contains("var x"), "hint: {}", hint);
}

#[test]
fn test_mut_is_rejected() {
    assert_eq!(first_code(&parse_err("let mut x = 1")), ErrorCode::MutNotSupported);
    assert_eq!(first_code(&parse_err("var mut x = 1")), ErrorCode::MutNotSupported);
    assert_eq!(first_code(&parse_err("mut x = 1")), ErrorCode::MutNotSupported);
}

// ============================================================
// Statements
// ============================================================

#[test]
fn test_assignment_forms() {
    assert!(matches!(
        first_stmt("x = 1"),
        StmtKind::Assign { ref targets, ref values } if targets.len() == 1 && values.len() == 1
    ));
    assert!(matches!(
        first_stmt("a, b = b, a"),
        StmtKind::Assign { ref targets, ref values } if targets.len() == 2 && values.len() == 2
    ));
    assert!(matches!(
        first_stmt("user.name = \"x\""),
        StmtKind::Assign { .. }
    ));
    assert!(matches!(
        first_stmt("[a, b] = pair"),
        StmtKind::Let { ref pattern, .. } if matches!(pattern.kind, DestructureKind::Array { .. })
    ));
}

#[test]
fn test_compound_assignment() {
    assert!(matches!(
        first_stmt("count += 1"),
        StmtKind::CompoundAssign { op: AssignOp::Add, .. }
    ));
    assert!(matches!(
        first_stmt("cache ??= load()"),
        StmtKind::CompoundAssign { op: AssignOp::Coalesce, .. }
    ));
}

#[test]
fn test_invalid_assignment_target() {
    assert_eq!(
        first_code(&parse_err("f() = 3")),
        ErrorCode::InvalidAssignmentTarget
    );
}

#[test]
fn test_var_multiple_targets() {
    match first_stmt("var a, b = 1, 2") {
        StmtKind::Var { targets, values } => {
            assert_eq!(targets.len(), 2);
            assert_eq!(values.len(), 2);
        }
        other => panic!("expected var, got {:?}", other),
    }
}

#[test]
fn test_if_elif_else_chain() {
    match first_stmt("if a {\n  x()\n} elif b {\n  y()\n} else if c {\n  z()\n} else {\n  w()\n}") {
        StmtKind::If {
            branches,
            else_body,
        } => {
            assert_eq!(branches.len(), 3);
            assert!(else_body.is_some());
        }
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn test_for_with_guard_and_else() {
    match first_stmt("for k, v in pairs if v > 0 {\n  print(k)\n} else {\n  print(\"none\")\n}") {
        StmtKind::For {
            label,
            binding,
            guard,
            else_body,
            ..
        } => {
            assert!(label.is_none());
            assert!(matches!(binding.kind, DestructureKind::Tuple(_)));
            assert!(guard.is_some());
            assert!(else_body.is_some());
        }
        other => panic!("expected for, got {:?}", other),
    }
}

#[test]
fn test_labeled_loops() {
    let source = "outer: for x in xs {\n  for y in ys {\n    break outer\n  }\n}";
    match first_stmt(source) {
        StmtKind::For { label, body, .. } => {
            assert_eq!(label.map(|l| l.node), Some("outer".to_string()));
            match &body.stmts[0].kind {
                StmtKind::For { body, .. } => assert!(matches!(
                    &body.stmts[0].kind,
                    StmtKind::Break { label: Some(l) } if l.node == "outer"
                )),
                other => panic!("expected inner for, got {:?}", other),
            }
        }
        other => panic!("expected for, got {:?}", other),
    }

    assert!(matches!(
        first_stmt("spin: loop {\n  continue spin\n}"),
        StmtKind::Loop { label: Some(_), .. }
    ));
}

#[test]
fn test_break_label_must_be_on_same_line() {
    match first_stmt("loop {\n  break\n  outer\n}") {
        StmtKind::Loop { body, .. } => {
            assert_eq!(body.stmts.len(), 2);
            assert!(matches!(body.stmts[0].kind, StmtKind::Break { label: None }));
            assert!(matches!(body.stmts[1].kind, StmtKind::Expr(_)));
        }
        other => panic!("expected loop, got {:?}", other),
    }
}

#[test]
fn test_return_value_must_be_on_same_line() {
    match first_stmt("fn f() {\n  return\n  x\n}") {
        StmtKind::Function(function) => {
            assert_eq!(function.body.stmts.len(), 2);
            assert!(matches!(function.body.stmts[0].kind, StmtKind::Return(None)));
        }
        other => panic!("expected function, got {:?}", other),
    }

    match first_stmt("fn f() { return a + 1 }") {
        StmtKind::Function(function) => assert!(matches!(
            &function.body.stmts[0].kind,
            StmtKind::Return(Some(e)) if sexpr(e) == "(+ a 1)"
        )),
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_try_catch_finally() {
    match first_stmt("try {\n  risky()\n} catch e {\n  log(e)\n} finally {\n  close()\n}") {
        StmtKind::Try { catch, finally, .. } => {
            let catch = catch.expect("catch clause");
            assert_eq!(catch.name.map(|n| n.node), Some("e".to_string()));
            assert!(finally.is_some());
        }
        other => panic!("expected try, got {:?}", other),
    }
}

#[test]
fn test_try_requires_a_handler() {
    let failure = parse_err("try {\n  risky()\n}");
    assert_eq!(failure.errors.len(), 1);
}

#[test]
fn test_guard_defer_with() {
    assert!(matches!(
        first_stmt("guard user else { return nil }"),
        StmtKind::Guard { .. }
    ));
    assert!(matches!(
        first_stmt("defer close(file)"),
        StmtKind::Defer(Body::Expr(_))
    ));
    assert!(matches!(
        first_stmt("with open(path) as f {\n  read(f)\n}"),
        StmtKind::With { alias: Some(_), .. }
    ));
}

#[test]
fn test_semicolons_are_optional_terminators() {
    let program = parse("a = 1; b = 2;\nc = 3");
    assert_eq!(program.body.len(), 3);
}

// ============================================================
// Declarations
// ============================================================

#[test]
fn test_function_declaration() {
    let source = "@cached(ttl: 60)\npub async fn get<T>(id: Int, {a, b}, opts = {}) -> Result<T, Error> {\n  id\n}";
    match first_stmt(source) {
        StmtKind::Function(function) => {
            assert_eq!(function.name.node, "get");
            assert!(function.is_pub);
            assert!(function.is_async);
            assert_eq!(function.decorators.len(), 1);
            assert_eq!(function.decorators[0].args.len(), 1);
            assert_eq!(function.type_params.len(), 1);
            assert_eq!(function.params.len(), 3);
            assert!(matches!(
                function.params[1].pattern.kind,
                DestructureKind::Object { .. }
            ));
            assert!(function.params[2].default.is_some());
            assert!(matches!(
                function.ret.as_ref().map(|t| &t.kind),
                Some(TypeKind::Named { name, args }) if name == "Result" && args.len() == 2
            ));
        }
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_type_annotations() {
    match first_stmt("fn f(xs: [Int], pair: (Int, String), cb: (Int) -> Bool) {}") {
        StmtKind::Function(function) => {
            let kinds: Vec<&TypeKind> = function
                .params
                .iter()
                .map(|p| &p.ty.as_ref().unwrap().kind)
                .collect();
            assert!(matches!(kinds[0], TypeKind::Array(_)));
            assert!(matches!(kinds[1], TypeKind::Tuple(items) if items.len() == 2));
            assert!(matches!(kinds[2], TypeKind::Function { params, .. } if params.len() == 1));
        }
        other => panic!("expected function, got {:?}", other),
    }
}

fn type_body(source: &str) -> TypeBody {
    match first_stmt(source) {
        StmtKind::Type(decl) => decl.body,
        other => panic!("expected type, got {:?}", other),
    }
}

#[test]
fn test_type_declarations() {
    assert!(matches!(
        type_body("type Point { x: Int, y: Int }"),
        TypeBody::Record(ref fields) if fields.len() == 2
    ));
    assert!(matches!(
        type_body("type Shape {\n  Circle(r: Float)\n  Rect(Float, Float)\n  Empty\n}"),
        TypeBody::Variants(ref variants) if variants.len() == 3 && variants[1].fields.len() == 2
    ));
    assert!(matches!(
        type_body("type Color = Red | Green | Blue"),
        TypeBody::Variants(ref variants) if variants.len() == 3
    ));
    assert!(matches!(type_body("type Id = String"), TypeBody::Alias(_)));
    assert!(matches!(
        type_body("type Email = String where it.contains(\"@\")"),
        TypeBody::Refinement { .. }
    ));
}

#[test]
fn test_type_derive() {
    match first_stmt("type Point { x: Int } derive [Eq, Show]") {
        StmtKind::Type(decl) => assert_eq!(decl.derives.len(), 2),
        other => panic!("expected type, got {:?}", other),
    }
}

#[test]
fn test_mixed_type_body_is_rejected() {
    let failure = parse_err("type Bad { x: Int, Empty }");
    assert_eq!(first_code(&failure), ErrorCode::MixedTypeBody);
}

#[test]
fn test_interfaces_traits_and_impls() {
    match first_stmt("interface Show {\n  fn show(self) -> String\n}") {
        StmtKind::Interface(decl) => {
            assert_eq!(decl.kind, InterfaceKind::Interface);
            assert_eq!(decl.methods.len(), 1);
        }
        other => panic!("expected interface, got {:?}", other),
    }

    match first_stmt("trait Greet {\n  fn greet(self) { print(\"hi\") }\n}") {
        StmtKind::Interface(decl) => assert!(decl.methods[0].default_body.is_some()),
        other => panic!("expected trait, got {:?}", other),
    }

    let failure = parse_err("interface Show {\n  fn show(self) { \"x\" }\n}");
    assert!(failure.errors[0].hint.is_some());

    match first_stmt("impl Show for Point {\n  fn show(self) { \"p\" }\n}") {
        StmtKind::Impl(decl) => {
            assert!(decl.trait_ty.is_some());
            assert_eq!(decl.methods.len(), 1);
        }
        other => panic!("expected impl, got {:?}", other),
    }
}

#[test]
fn test_extern_declaration() {
    assert!(matches!(
        first_stmt("extern async fn fetch(url: String) -> Response"),
        StmtKind::Extern(ref decl) if decl.is_async && decl.ret.is_some()
    ));
}

#[test]
fn test_import_forms() {
    let program = parse(
        "import { a, b as c } from \"lib\"\nimport d from \"lib\"\nimport * as ns from \"lib\"",
    );
    let kinds: Vec<&ImportKind> = program
        .body
        .iter()
        .map(|stmt| match &stmt.kind {
            StmtKind::Import(decl) => &decl.kind,
            other => panic!("expected import, got {:?}", other),
        })
        .collect();
    assert!(matches!(kinds[0], ImportKind::Named(specs) if specs.len() == 2 && specs[1].alias.is_some()));
    assert!(matches!(kinds[1], ImportKind::Default(name) if name.node == "d"));
    assert!(matches!(kinds[2], ImportKind::Namespace(name) if name.node == "ns"));
}

#[test]
fn test_declaration_outline() {
    let source = "@cached(ttl: 60)\npub async fn get<T>(id: Int, {a, b}, limit = 10) -> Result<T, Error> {\n  id\n}\ntype Point { x: Int, y: Int } derive [Eq, Show]\ntype Shape {\n  Circle(r: Float)\n  Rect(Float, Float)\n  Empty\n}\ntype Color = Red | Green | Blue\ntype Id = String\ntype Email = String where it.contains(\"@\")";
    insta::assert_snapshot!(outline_of(source), @r#"
    @cached(ttl: 60)
    pub async fn get<T>(id: Int, {a, b}, limit = 10) -> Result<T, Error>
      id
    type Point { x: Int, y: Int } derive [Eq, Show]
    type Shape = Circle(r: Float) | Rect(Float, Float) | Empty
    type Color = Red | Green | Blue
    type Id = String
    type Email = String where it.contains("@")
    "#);
}

#[test]
fn test_type_annotation_shapes() {
    let source = "fn f(xs: [Int], pair: (Int, String), one: (Int), cb: (Int) -> Bool, g: fn(Int, Int) -> Int, m: Map<String, [Int]>) {}";
    insta::assert_snapshot!(
        outline_of(source),
        @"fn f(xs: [Int], pair: (Int, String), one: Int, cb: (Int) -> Bool, g: (Int, Int) -> Int, m: Map<String, [Int]>)"
    );
}

// ============================================================
// Error recovery
// ============================================================

#[test]
fn test_recovery_keeps_well_formed_statement() {
    let failure = parse_err("x = )\nprint(\"ok\")");
    assert_eq!(failure.errors.len(), 1);
    assert_eq!(failure.errors[0].line(), 1);
    assert_eq!(failure.errors[0].code, ErrorCode::ExpectedExpression);
    assert_eq!(failure.program.body.len(), 1);
    assert!(matches!(
        &failure.program.body[0].kind,
        StmtKind::Expr(e) if sexpr(e) == "print(\"ok\")"
    ));
    assert!(!failure.truncated);
}

#[test]
fn test_recovery_inside_block() {
    let failure = parse_err("fn f() {\n  x = )\n  y = 2\n}\nz = 3");
    assert_eq!(failure.errors.len(), 1);
    assert_eq!(failure.errors[0].line(), 2);
    assert_eq!(failure.program.body.len(), 2);
    match &failure.program.body[0].kind {
        StmtKind::Function(function) => assert_eq!(function.body.stmts.len(), 1),
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_every_error_is_reported() {
    let failure = parse_err("a = )\nb = 1\nc = ]\nd = 2");
    assert_eq!(failure.errors.len(), 2);
    assert_eq!(failure.errors[1].line(), 3);
    assert_eq!(failure.program.body.len(), 2);
}

#[test]
fn test_unmatched_closing_brace() {
    let failure = parse_err("a = 1\n}\nb = 2");
    assert_eq!(first_code(&failure), ErrorCode::UnmatchedClosingBrace);
    assert_eq!(failure.program.body.len(), 2);
}

#[test]
fn test_error_carries_file_name() {
    let config = ParserConfig::builder().file("app.tova").build().unwrap();
    let failure = Parser::from_source("x = )")
        .with_config(config)
        .parse_program()
        .unwrap_err();
    assert_eq!(&*failure.errors[0].file, "app.tova");
    assert_eq!(&*failure.program.file, "app.tova");
}

#[test]
fn test_error_cap_truncates() {
    let source = "x = )\n".repeat(10);
    let config = ParserConfig::builder().max_errors(3).build().unwrap();
    let failure = Parser::from_source(&source)
        .with_config(config)
        .parse_program()
        .unwrap_err();
    assert_eq!(failure.errors.len(), 3);
    assert!(failure.truncated);
}

#[test]
fn test_nesting_limit_is_a_clean_error() {
    let source = format!("x = {}1{}", "(".repeat(1000), ")".repeat(1000));
    let config = ParserConfig::builder().max_depth(16).build().unwrap();
    let failure = Parser::from_source(&source)
        .with_config(config)
        .parse_program()
        .unwrap_err();
    assert!(failure
        .errors
        .iter()
        .any(|e| e.code == ErrorCode::NestingTooDeep));
}

#[test]
fn test_lexer_errors_surface_as_parse_errors() {
    let failure = parse_err("x = 1 /* never closed");
    assert_eq!(first_code(&failure), ErrorCode::UnclosedBlockComment);
}

#[test]
fn test_unclosed_call_recovers_on_next_line() {
    let failure = parse_err("foo(1, 2\ny = 3");
    assert_eq!(failure.errors.len(), 1);
    assert_eq!(failure.errors[0].line(), 2);
    assert!(failure.errors[0]
        .hint
        .as_deref()
        .is_some_and(|h| h.contains("line 1")));
    assert_eq!(failure.program.body.len(), 1);
    assert!(matches!(
        &failure.program.body[0].kind,
        StmtKind::Assign { targets, .. } if sexpr(&targets[0]) == "y"
    ));
}

#[test]
fn test_unclosed_array_recovers_on_next_line() {
    let failure = parse_err("x = [1, 2\ny = 3");
    assert_eq!(failure.errors.len(), 1);
    assert_eq!(failure.program.body.len(), 1);
    assert!(matches!(
        &failure.program.body[0].kind,
        StmtKind::Assign { targets, .. } if sexpr(&targets[0]) == "y"
    ));
}

#[test]
fn test_error_points_at_offending_line() {
    let failure = parse_err("a = 1\nb = )\nc = 2");
    assert_eq!(failure.errors.len(), 1);
    assert_eq!(failure.errors[0].line(), 2);
    assert_eq!(failure.errors[0].column(), 5);
    assert_eq!(failure.program.body.len(), 2);
}

#[test]
fn test_error_cap_reached_exactly_is_not_truncated() {
    let config = ParserConfig::builder().max_errors(2).build().unwrap();
    let failure = Parser::from_source("a = )\nb = ]\nc = 1")
        .with_config(config)
        .parse_program()
        .unwrap_err();
    assert_eq!(failure.errors.len(), 2);
    assert!(!failure.truncated);
}

/// Parse `source` with the default configuration on a thread with a 2 MiB
/// stack and report whether the nesting limit fired.
fn hits_nesting_limit(source: String) -> bool {
    std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || match Parser::from_source(&source).parse_program() {
            Ok(_) => false,
            Err(failure) => failure
                .errors
                .iter()
                .any(|e| e.code == ErrorCode::NestingTooDeep),
        })
        .unwrap()
        .join()
        .unwrap()
}

fn nest(open: &str, inner: &str, close: &str, depth: usize) -> String {
    format!("{}{}{}", open.repeat(depth), inner, close.repeat(depth))
}

#[test]
fn test_default_depth_limit_on_small_stack() {
    assert!(hits_nesting_limit(format!("x = {}", nest("(", "1", ")", 1000))));
    assert!(hits_nesting_limit(format!("x = {}", nest("[", "1", "]", 1000))));
    assert!(hits_nesting_limit(nest("if a {\n", "x = 1\n", "}\n", 1000)));
    assert!(hits_nesting_limit(format!("f = {}a", "(a) => ".repeat(1000))));
    assert!(hits_nesting_limit(format!("x = {}y", "not ".repeat(1000))));
}

#[test]
fn test_depth_limit_covers_patterns_types_and_spawn() {
    assert!(hits_nesting_limit(format!(
        "match x {{\n  {} => 1\n}}",
        nest("[", "y", "]", 1000)
    )));
    assert!(hits_nesting_limit(format!("let {} = v", nest("[", "y", "]", 1000))));
    assert!(hits_nesting_limit(format!("let {} = v", nest("(", "y", ")", 1000))));
    assert!(hits_nesting_limit(format!("fn f(a: {}) {{}}", nest("[", "Int", "]", 1000))));
    assert!(hits_nesting_limit(format!("x = {}f()", "spawn ".repeat(1000))));
}

#[test]
fn test_moderate_nesting_is_accepted() {
    let source = format!("x = {}", nest("(", "1", ")", 10));
    assert!(Parser::from_source(&source).parse_program().is_ok());
    let source = format!("let {} = v", nest("[", "y", "]", 10));
    assert!(Parser::from_source(&source).parse_program().is_ok());
}

// ============================================================
// Doc comments
// ============================================================

#[test]
fn test_doc_comments_attach_by_line_adjacency() {
    let source = "/// Adds two numbers.\n/// Returns the sum.\nfn add(a, b) { a + b }\n\n/// Orphan.\n\nx = 1";
    let program = parse(source);
    assert_eq!(
        program.body[0].docs.as_deref(),
        Some("Adds two numbers.\nReturns the sum.")
    );
    assert_eq!(program.body[1].docs, None);
}

#[test]
fn test_doc_comments_inside_blocks() {
    let source = "server {\n  /// Lists users.\n  route GET \"/users\" => list_users\n}";
    let program = parse(source);
    let StmtKind::Dialect(node) = &program.body[0].kind else {
        panic!("expected dialect node");
    };
    let DialectNode::Server { body, .. } = node.as_ref() else {
        panic!("expected server");
    };
    assert_eq!(body[0].docs.as_deref(), Some("Lists users."));
}

// ============================================================
// Dialects
// ============================================================

fn dialect(stmt: &Stmt) -> &DialectNode {
    match &stmt.kind {
        StmtKind::Dialect(node) => node,
        other => panic!("expected dialect node, got {:?}", other),
    }
}

#[test]
fn test_server_dialect() {
    let source = "server \"api\" {\n  middleware fn log(req, next) { next(req) }\n  route GET \"/users/:id\" => get_user\n  route POST \"/users\" => (req) => create(req)\n  helper = 1\n}";
    let program = parse(source);
    match dialect(&program.body[0]) {
        DialectNode::Server { name, body } => {
            assert_eq!(name.as_deref(), Some("api"));
            assert_eq!(body.len(), 4);
            assert!(matches!(dialect(&body[0]), DialectNode::Middleware { .. }));
            assert!(matches!(
                dialect(&body[1]),
                DialectNode::Route { method, path, .. } if method == "GET" && path == "/users/:id"
            ));
            assert!(matches!(body[3].kind, StmtKind::Assign { .. }));
        }
        other => panic!("expected server, got {:?}", other),
    }
}

#[test]
fn test_unknown_route_method() {
    let failure = parse_err("server {\n  route FETCH \"/x\" => f\n}");
    assert_eq!(first_code(&failure), ErrorCode::InvalidDialectEntry);
}

#[test]
fn test_client_dialect() {
    let source = "client {\n  state count: Int = 0\n  computed double = count * 2\n  effect {\n    print(count)\n  }\n  component Counter(label) {\n    state local = 1\n  }\n  store Cart {\n    state items = []\n  }\n}";
    let program = parse(source);
    match dialect(&program.body[0]) {
        DialectNode::Client { body, .. } => {
            assert_eq!(body.len(), 5);
            assert!(matches!(dialect(&body[0]), DialectNode::State { ty: Some(_), .. }));
            assert!(matches!(dialect(&body[1]), DialectNode::Computed { .. }));
            assert!(matches!(dialect(&body[2]), DialectNode::Effect { .. }));
            match dialect(&body[3]) {
                DialectNode::Component { params, body, .. } => {
                    assert_eq!(params.len(), 1);
                    assert!(matches!(dialect(&body.stmts[0]), DialectNode::State { .. }));
                }
                other => panic!("expected component, got {:?}", other),
            }
            assert!(matches!(dialect(&body[4]), DialectNode::Store { .. }));
        }
        other => panic!("expected client, got {:?}", other),
    }
}

#[test]
fn test_client_keywords_stay_names_in_plain_functions() {
    let program = parse("client {\n  state n = 0\n}\nfn f() {\n  state = 2\n}");
    match &program.body[1].kind {
        StmtKind::Function(function) => {
            assert!(matches!(function.body.stmts[0].kind, StmtKind::Assign { .. }))
        }
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_shared_security_deploy() {
    let source = "shared {\n  type Id = String\n}\nsecurity {\n  auth jwt { secret: env(\"KEY\") }\n  role Admin { can: [\"manage\"] }\n  protect \"/admin/*\" { require: Admin }\n  cors { origins: [\"*\"] }\n}\ndeploy \"prod\" {\n  server: \"1.2.3.4\",\n  instances: 2\n}";
    let program = parse(source);
    assert_eq!(program.body.len(), 3);
    assert!(matches!(dialect(&program.body[0]), DialectNode::Shared { body, .. } if body.len() == 1));
    match dialect(&program.body[1]) {
        DialectNode::Security { entries } => {
            let kinds: Vec<SecurityKind> = entries.iter().map(|e| e.kind).collect();
            assert_eq!(
                kinds,
                vec![
                    SecurityKind::Auth,
                    SecurityKind::Role,
                    SecurityKind::Protect,
                    SecurityKind::Cors
                ]
            );
            assert!(entries[3].target.is_none());
            assert_eq!(entries[1].config.len(), 1);
        }
        other => panic!("expected security, got {:?}", other),
    }
    assert!(matches!(
        dialect(&program.body[2]),
        DialectNode::Deploy { name: Some(n), config } if n == "prod" && config.len() == 2
    ));
}

#[test]
fn test_unknown_security_entry() {
    let failure = parse_err("security {\n  firewall { on: true }\n}");
    assert_eq!(first_code(&failure), ErrorCode::InvalidDialectEntry);
}

#[test]
fn test_concurrent_modes() {
    let source = "fn run() {\n  concurrent {\n    a()\n  }\n  concurrent cancel_on_error {\n    b()\n  }\n  concurrent timeout(500) {\n    c()\n  }\n}";
    match first_stmt(source) {
        StmtKind::Function(function) => {
            let modes: Vec<&ConcurrentMode> = function
                .body
                .stmts
                .iter()
                .map(|stmt| match dialect(stmt) {
                    DialectNode::Concurrent { mode, .. } => mode,
                    other => panic!("expected concurrent, got {:?}", other),
                })
                .collect();
            assert!(matches!(modes[0], ConcurrentMode::All));
            assert!(matches!(modes[1], ConcurrentMode::CancelOnError));
            assert!(matches!(modes[2], ConcurrentMode::Timeout(_)));
        }
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_select_cases() {
    let source = "select {\n  msg from inbox => handle(msg)\n  outbox.send(item) => log(item)\n  timeout(1000) => print(\"idle\")\n  _ => {}\n}";
    let program = parse(source);
    match dialect(&program.body[0]) {
        DialectNode::Select { cases } => {
            assert_eq!(cases.len(), 4);
            assert!(matches!(
                &cases[0].kind,
                SelectKind::Receive { binding, channel } if binding.node == "msg" && sexpr(channel) == "inbox"
            ));
            assert!(matches!(
                &cases[1].kind,
                SelectKind::Send { channel, value } if sexpr(channel) == "outbox" && sexpr(value) == "item"
            ));
            assert!(matches!(cases[2].kind, SelectKind::Timeout(_)));
            assert!(matches!(cases[3].kind, SelectKind::Default));
        }
        other => panic!("expected select, got {:?}", other),
    }
}

#[test]
fn test_server_outline() {
    let source = "server \"api\" {\n  middleware fn log(req, next) { next(req) }\n  route GET \"/users/:id\" => get_user\n  route POST \"/users\" => (req) => create(req)\n  helper = 1\n}";
    insta::assert_snapshot!(outline_of(source), @r#"
    server "api"
      middleware fn log(req, next)
        next(req)
      route GET "/users/:id" => get_user
      route POST "/users" => (lambda (req) create(req))
      helper = 1
    "#);
}

#[test]
fn test_client_outline() {
    let source = "client {\n  state count: Int = 0\n  computed double = count * 2\n  effect {\n    print(count)\n  }\n  component Counter(label) {\n    state local = 1\n  }\n  store Cart {\n    state items = []\n  }\n}";
    insta::assert_snapshot!(outline_of(source), @r"
    client
      state count: Int = 0
      computed double = (* count 2)
      effect
        print(count)
      component Counter(label)
        state local = 1
      store Cart
        state items = []
    ");
}

#[test]
fn test_shared_security_deploy_outline() {
    let source = "shared {\n  type Id = String\n}\nsecurity {\n  auth jwt { secret: env(\"KEY\") }\n  role Admin { can: [\"manage\"] }\n  protect \"/admin/*\" { require: Admin }\n  cors { origins: [\"*\"] }\n}\ndeploy \"prod\" {\n  server: \"1.2.3.4\",\n  instances: 2\n}";
    insta::assert_snapshot!(outline_of(source), @r#"
    shared
      type Id = String
    security
      Auth jwt secret=env("KEY")
      Role Admin can=["manage"]
      Protect "/admin/*" require=Admin
      Cors origins=["*"]
    deploy "prod"
      server: "1.2.3.4"
      instances: 2
    "#);
}

#[test]
fn test_spawn_expression() {
    insta::assert_snapshot!(sexpr_of("spawn work(x)"), @"(spawn work(x))");
    let stmt = first_stmt("task = spawn fetch(url)");
    assert!(matches!(
        stmt,
        StmtKind::Assign { ref values, .. } if matches!(values[0].kind, ExprKind::Spawn(_))
    ));
}

#[test]
fn test_dialect_words_as_plain_names() {
    let program = parse("spawn = 1\nselect = spawn + 1\nconcurrent = [select]\nsecurity = nil\ndeploy = 2");
    assert_eq!(program.body.len(), 5);
    for stmt in &program.body {
        assert!(matches!(stmt.kind, StmtKind::Assign { .. }), "got {:?}", stmt.kind);
    }
}

/// A dialect whose trigger word appears in none of the programs below.
struct Unused;

fn parse_unused(p: &mut Parser) -> PResult<Stmt> {
    p.parse_extension_block("zzz_unused")
}

impl crate::dialect::Dialect for Unused {
    fn name(&self) -> &'static str {
        "zzz_unused"
    }

    fn productions(&self) -> Vec<Production> {
        vec![Production::statement(
            Trigger::word_before("zzz_unused", &[TokenKind::LBrace]),
            Placement::Anywhere,
            parse_unused,
        )]
    }
}

fn parse_with_registry(source: &str, registry: DialectRegistry) -> Result<Program, ParseFailure> {
    Parser::from_source(source)
        .with_registry(Arc::new(registry))
        .parse_program()
}

#[test]
fn test_unused_dialect_does_not_change_results() {
    let sources = [
        "x = 1\nfn f(a) { a * 2 }",
        "server { route GET \"/\" => index }",
        "match v {\n  Some(x) => x\n  _ => 0\n}",
        "x = )\ny = 2",
    ];
    for source in sources {
        let standard = parse_with_registry(source, DialectRegistry::standard());
        let extended = parse_with_registry(source, DialectRegistry::standard().with(Unused));
        assert_eq!(format!("{:?}", standard), format!("{:?}", extended), "source: {}", source);
    }
}

// ============================================================
// Properties
// ============================================================

const FRAGMENTS: &[&str] = &[
    "x", "= ", "1", "+", "(", ")", "{", "}", "[", "]", ",", "\n", "fn ", "if ", "else ", "for ",
    " in ", "match ", "=>", "let ", "var ", "\"s\"", "\"{a}\"", "..", "|>", "?", ".", "server ",
    "client ", "state ", "select ", "spawn ", "return ", "_", "Some", ":", "**", "not ",
];

fn program_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..40).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn prop_parser_never_panics(source in program_text()) {
        let _ = Parser::from_source(&source).parse_program();
    }

    #[test]
    fn prop_parser_never_panics_on_arbitrary_text(source in "\\PC{0,80}") {
        let _ = Parser::from_source(&source).parse_program();
    }

    #[test]
    fn prop_parse_is_deterministic(source in program_text()) {
        let first = format!("{:?}", Parser::from_source(&source).parse_program());
        let second = format!("{:?}", Parser::from_source(&source).parse_program());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_unused_dialect_is_additive(source in program_text()) {
        let standard = parse_with_registry(&source, DialectRegistry::standard());
        let extended = parse_with_registry(&source, DialectRegistry::standard().with(Unused));
        prop_assert_eq!(format!("{:?}", standard), format!("{:?}", extended));
    }

    #[test]
    fn prop_failures_respect_error_cap(source in program_text()) {
        let config = ParserConfig::builder().max_errors(2).build().unwrap();
        if let Err(failure) = Parser::from_source(&source).with_config(config).parse_program() {
            prop_assert!(!failure.errors.is_empty());
            prop_assert!(failure.errors.len() <= 2);
        }
    }
}
