//! Dialect extension registry.
//!
//! A dialect is an independently developed grammar module that adds block
//! forms to the core grammar (`server { }`, `security { }`, `select { }`,
//! ...). Each dialect registers [`Production`]s: a [`Trigger`] deciding
//! whether the production applies at the cursor, and an [`Entry`] point
//! that parses from there. The core dispatcher walks the registry in
//! registration order and hands control to the first match, so adding a
//! dialect never touches the core.
//!
//! A dialect may also contribute contextual body rules (e.g. `state` inside
//! `client { }`). These are installed into the per-parse
//! [`GrammarExtensions`] the first time the dialect is encountered; a second
//! installation is a no-op.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tovac::dialect::{Dialect, DialectRegistry, Placement, Production, Trigger};
//! use tovac::parser::{PResult, Parser};
//! use tovac::ast::{DialectNode, Stmt, StmtKind};
//!
//! struct Widgets;
//!
//! fn parse_widget(p: &mut Parser) -> PResult<Stmt> {
//!     p.parse_extension_block("widget")
//! }
//!
//! impl Dialect for Widgets {
//!     fn name(&self) -> &'static str {
//!         "widget"
//!     }
//!
//!     fn productions(&self) -> Vec<Production> {
//!         vec![Production::statement(
//!             Trigger::word_before("widget", &[tovac::lexer::TokenKind::LBrace]),
//!             Placement::TopLevel,
//!             parse_widget,
//!         )]
//!     }
//! }
//!
//! let registry = Arc::new(DialectRegistry::standard().with(Widgets));
//! let program = Parser::from_source("widget { x = 1 }")
//!     .with_registry(registry)
//!     .parse_program()
//!     .unwrap();
//! let StmtKind::Dialect(node) = &program.body[0].kind else { panic!() };
//! assert!(matches!(**node, DialectNode::Extension { ref dialect, .. } if dialect == "widget"));
//! ```

mod client;
mod concurrency;
mod deploy;
mod security;
mod server;
mod shared;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::ast::{ConfigEntry, Expr, Stmt};
use crate::lexer::TokenKind;
use crate::parser::{PResult, Parser};
use crate::span::Span;

pub use self::client::ClientDialect;
pub use self::concurrency::ConcurrencyDialect;
pub use self::deploy::DeployDialect;
pub use self::security::SecurityDialect;
pub use self::server::ServerDialect;
pub use self::shared::SharedDialect;

/// Parses a statement-level dialect form.
pub type StmtEntry = fn(&mut Parser) -> PResult<Stmt>;
/// Parses an expression-level dialect form.
pub type ExprEntry = fn(&mut Parser) -> PResult<Expr>;
/// Extra condition over the tokens following a trigger word.
pub type Lookahead = fn(&Parser) -> bool;

/// When a production applies.
#[derive(Clone, Copy)]
pub enum Trigger {
    /// The current token has this keyword kind.
    Keyword(TokenKind),
    /// A contextual keyword, accepted only if the next token is one of
    /// `next`; otherwise the keyword stays usable as a plain name.
    KeywordBefore {
        kind: TokenKind,
        next: &'static [TokenKind],
    },
    /// The current token is an identifier spelled `value`, and `lookahead`
    /// (if any) accepts the following tokens. The lookahead keeps ordinary
    /// variables with the same spelling parsing as variables.
    Word {
        value: &'static str,
        lookahead: Option<Lookahead>,
    },
    /// Like `Word`, accepted only if the next token is one of `next`.
    WordBefore {
        value: &'static str,
        next: &'static [TokenKind],
    },
}

impl Trigger {
    pub fn keyword(kind: TokenKind) -> Self {
        Trigger::Keyword(kind)
    }

    pub fn keyword_before(kind: TokenKind, next: &'static [TokenKind]) -> Self {
        Trigger::KeywordBefore { kind, next }
    }

    pub fn word(value: &'static str, lookahead: Lookahead) -> Self {
        Trigger::Word {
            value,
            lookahead: Some(lookahead),
        }
    }

    pub fn word_before(value: &'static str, next: &'static [TokenKind]) -> Self {
        Trigger::WordBefore { value, next }
    }

    /// Whether the trigger matches at the parser's cursor.
    pub fn matches(&self, parser: &Parser) -> bool {
        let current = parser.current();
        match *self {
            Trigger::Keyword(kind) => current.kind == kind,
            Trigger::KeywordBefore { kind, next } => {
                current.kind == kind && next.contains(&parser.peek(1).kind)
            }
            Trigger::Word { value, lookahead } => {
                current.kind == TokenKind::Ident
                    && current.value == value
                    && lookahead.map_or(true, |accept| accept(parser))
            }
            Trigger::WordBefore { value, next } => {
                current.kind == TokenKind::Ident
                    && current.value == value
                    && next.contains(&parser.peek(1).kind)
            }
        }
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Keyword(kind) => write!(f, "Keyword({:?})", kind),
            Trigger::KeywordBefore { kind, next } => f
                .debug_struct("KeywordBefore")
                .field("kind", kind)
                .field("next", next)
                .finish(),
            Trigger::Word { value, lookahead } => f
                .debug_struct("Word")
                .field("value", value)
                .field("lookahead", &lookahead.is_some())
                .finish(),
            Trigger::WordBefore { value, next } => f
                .debug_struct("WordBefore")
                .field("value", value)
                .field("next", next)
                .finish(),
        }
    }
}

/// Where a statement production may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Only among a program's top-level statements.
    TopLevel,
    /// Wherever a statement may appear.
    Anywhere,
}

/// Parse entry point of a production.
#[derive(Clone, Copy)]
pub enum Entry {
    Statement(StmtEntry),
    Expression(ExprEntry),
}

/// One registered grammar production.
#[derive(Clone, Copy)]
pub struct Production {
    pub trigger: Trigger,
    pub placement: Placement,
    pub entry: Entry,
}

impl Production {
    pub fn statement(trigger: Trigger, placement: Placement, entry: StmtEntry) -> Self {
        Self {
            trigger,
            placement,
            entry: Entry::Statement(entry),
        }
    }

    /// Expression productions are consulted wherever a primary expression
    /// may start.
    pub fn expression(trigger: Trigger, entry: ExprEntry) -> Self {
        Self {
            trigger,
            placement: Placement::Anywhere,
            entry: Entry::Expression(entry),
        }
    }
}

impl fmt::Debug for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = match self.entry {
            Entry::Statement(_) => "statement",
            Entry::Expression(_) => "expression",
        };
        f.debug_struct("Production")
            .field("trigger", &self.trigger)
            .field("placement", &self.placement)
            .field("entry", &entry)
            .finish()
    }
}

/// A grammar module that plugs into the core parser.
pub trait Dialect: Send + Sync {
    /// Stable identity, used for idempotent installation.
    fn name(&self) -> &'static str;

    /// The productions this dialect adds, in priority order.
    fn productions(&self) -> Vec<Production>;

    /// Install contextual body rules the first time the dialect is used in a
    /// parse.
    fn install(&self, _grammar: &mut GrammarExtensions) {}
}

/// A contextual statement rule consulted only inside one block context.
#[derive(Debug, Clone, Copy)]
pub struct BodyRule {
    pub trigger: Trigger,
    pub entry: EntryFn,
}

/// A statement entry point with an opaque `Debug`.
#[derive(Clone, Copy)]
pub struct EntryFn(pub StmtEntry);

impl fmt::Debug for EntryFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EntryFn")
    }
}

/// Per-parse grammar state contributed by installed dialects.
#[derive(Debug, Clone, Default)]
pub struct GrammarExtensions {
    installed: HashSet<&'static str>,
    body_rules: HashMap<&'static str, Vec<BodyRule>>,
}

impl GrammarExtensions {
    /// Whether the dialect named `name` has been installed.
    pub fn is_installed(&self, name: &str) -> bool {
        self.installed.contains(name)
    }

    /// Mark `name` installed. Returns `false` if it already was.
    pub(crate) fn mark_installed(&mut self, name: &'static str) -> bool {
        self.installed.insert(name)
    }

    /// Add a statement rule for bodies of the given context.
    pub fn add_body_rule(&mut self, context: &'static str, trigger: Trigger, entry: StmtEntry) {
        self.body_rules.entry(context).or_default().push(BodyRule {
            trigger,
            entry: EntryFn(entry),
        });
    }

    /// The first body rule of `context` that matches at the cursor.
    pub fn body_rule(&self, context: &str, parser: &Parser) -> Option<StmtEntry> {
        self.body_rules
            .get(context)?
            .iter()
            .find(|rule| rule.trigger.matches(parser))
            .map(|rule| rule.entry.0)
    }

    /// Number of body rules for `context`.
    pub fn rule_count(&self, context: &str) -> usize {
        self.body_rules.get(context).map_or(0, Vec::len)
    }
}

struct Registered {
    dialect: Arc<dyn Dialect>,
    productions: Vec<Production>,
}

/// Ordered table of dialects consulted by the core dispatcher.
pub struct DialectRegistry {
    dialects: Vec<Registered>,
}

impl DialectRegistry {
    /// A registry with no dialects.
    pub fn empty() -> Self {
        Self {
            dialects: Vec::new(),
        }
    }

    /// The built-in dialects.
    pub fn standard() -> Self {
        Self::empty()
            .with(ServerDialect)
            .with(ClientDialect)
            .with(SharedDialect)
            .with(SecurityDialect)
            .with(DeployDialect)
            .with(ConcurrencyDialect)
    }

    /// Add a dialect after all existing ones.
    pub fn register(&mut self, dialect: impl Dialect + 'static) -> &mut Self {
        let productions = dialect.productions();
        self.dialects.push(Registered {
            dialect: Arc::new(dialect),
            productions,
        });
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, dialect: impl Dialect + 'static) -> Self {
        self.register(dialect);
        self
    }

    /// Names of registered dialects in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.dialects.iter().map(|r| r.dialect.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.dialects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialects.is_empty()
    }

    /// The first statement production matching at the cursor.
    ///
    /// `TopLevel` productions are only considered when `top_level` is set.
    pub fn match_statement(
        &self,
        parser: &Parser,
        top_level: bool,
    ) -> Option<(&dyn Dialect, StmtEntry)> {
        self.dialects.iter().find_map(|registered| {
            registered.productions.iter().find_map(|production| match production.entry {
                Entry::Statement(entry)
                    if (top_level || production.placement == Placement::Anywhere)
                        && production.trigger.matches(parser) =>
                {
                    Some((registered.dialect.as_ref(), entry))
                }
                _ => None,
            })
        })
    }

    /// The first expression production matching at the cursor.
    pub fn match_expression(&self, parser: &Parser) -> Option<(&dyn Dialect, ExprEntry)> {
        self.dialects.iter().find_map(|registered| {
            registered.productions.iter().find_map(|production| match production.entry {
                Entry::Expression(entry) if production.trigger.matches(parser) => {
                    Some((registered.dialect.as_ref(), entry))
                }
                _ => None,
            })
        })
    }
}

/// `{ key: value, ... }`, as used by configuration-style dialect blocks.
pub(crate) fn parse_config_entries(p: &mut Parser) -> PResult<(Vec<ConfigEntry>, Span)> {
    let open = p.expect(TokenKind::LBrace)?;
    let mut entries = Vec::new();
    while !p.check(TokenKind::RBrace) && !p.is_at_end() {
        let key = p.expect_member_name()?;
        p.expect(TokenKind::Colon)?;
        let value = p.parse_expression()?;
        entries.push(ConfigEntry {
            span: key.span.merge(value.span),
            key,
            value,
        });
        p.eat(TokenKind::Comma);
    }
    let close = p.expect(TokenKind::RBrace)?;
    Ok((entries, open.span.merge(close.span)))
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
