//! Initializer expression syntax
//!
//! A minimal already-parsed tree for object/collection/indexer initializer
//! expressions. The real parser is an external collaborator; the test suite
//! builds these nodes directly. The engine interprets only node kinds and
//! child structure — spans exist purely for diagnostic association.
//!
//! `Display` regenerates C#-like source text, which the renderer uses for
//! `(Syntax: '…')` annotations.

use std::fmt;

/// Half-open byte range in the original source, for diagnostic association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start offset
    pub start: u32,
    /// End offset (exclusive)
    pub end: u32,
}

impl Span {
    /// The empty span at offset zero.
    pub const ZERO: Span = Span { start: 0, end: 0 };

    /// Create a span from raw offsets.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// A compile-time constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// Integer constant
    Int(i64),
    /// Floating-point constant
    Double(f64),
    /// Boolean constant
    Bool(bool),
    /// String constant
    Str(String),
    /// The null literal
    Null,
}

impl ConstValue {
    /// Render the constant the way source text spells it (`true`, `"s"`, `2`).
    pub fn source_text(&self) -> String {
        match self {
            ConstValue::Int(v) => v.to_string(),
            ConstValue::Double(v) => v.to_string(),
            ConstValue::Bool(v) => v.to_string(),
            ConstValue::Str(s) => format!("\"{}\"", s),
            ConstValue::Null => "null".to_string(),
        }
    }

    /// Render the constant the way the operation tree prints it (`True`, `2`).
    pub fn tree_text(&self) -> String {
        match self {
            ConstValue::Bool(true) => "True".to_string(),
            ConstValue::Bool(false) => "False".to_string(),
            other => other.source_text(),
        }
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal constant
    Literal {
        /// The constant value
        value: ConstValue,
        /// Source location
        span: Span,
    },
    /// Reference to a local or parameter
    Local {
        /// Name of the local
        name: String,
        /// Source location
        span: Span,
    },
    /// Object creation `new T(args) { … }`; `type_name` is `None` for
    /// target-typed `new(args) { … }`
    New {
        /// Created type name, or `None` for target-typed `new`
        type_name: Option<String>,
        /// Constructor arguments
        args: Vec<Expr>,
        /// Optional object/collection initializer
        initializer: Option<InitializerList>,
        /// Source location
        span: Span,
    },
    /// Ternary `cond ? a : b`
    Conditional {
        /// Condition
        cond: Box<Expr>,
        /// Value when the condition is true
        when_true: Box<Expr>,
        /// Value when the condition is false
        when_false: Box<Expr>,
        /// Source location
        span: Span,
    },
    /// Null-coalescing `value ?? fallback`
    Coalesce {
        /// Value operand
        value: Box<Expr>,
        /// Fallback evaluated only when the value is null
        when_null: Box<Expr>,
        /// Source location
        span: Span,
    },
    /// Pattern `switch` expression
    Switch {
        /// Scrutinee
        scrutinee: Box<Expr>,
        /// Arms in source order
        arms: Vec<SwitchArm>,
        /// Source location
        span: Span,
    },
}

impl Expr {
    /// Source location of this node.
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Local { span, .. }
            | Expr::New { span, .. }
            | Expr::Conditional { span, .. }
            | Expr::Coalesce { span, .. }
            | Expr::Switch { span, .. } => *span,
        }
    }

    /// Integer literal.
    pub fn int(v: i64) -> Expr {
        Expr::Literal { value: ConstValue::Int(v), span: Span::ZERO }
    }

    /// Boolean literal.
    pub fn bool(v: bool) -> Expr {
        Expr::Literal { value: ConstValue::Bool(v), span: Span::ZERO }
    }

    /// String literal.
    pub fn str(s: impl Into<String>) -> Expr {
        Expr::Literal { value: ConstValue::Str(s.into()), span: Span::ZERO }
    }

    /// The null literal.
    pub fn null() -> Expr {
        Expr::Literal { value: ConstValue::Null, span: Span::ZERO }
    }

    /// Local reference.
    pub fn local(name: impl Into<String>) -> Expr {
        Expr::Local { name: name.into(), span: Span::ZERO }
    }

    /// `new T(args)` without an initializer.
    pub fn new_obj(type_name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::New {
            type_name: Some(type_name.into()),
            args,
            initializer: None,
            span: Span::ZERO,
        }
    }

    /// `new T(args) { entries }`.
    pub fn new_init(
        type_name: impl Into<String>,
        args: Vec<Expr>,
        entries: Vec<Entry>,
    ) -> Expr {
        Expr::New {
            type_name: Some(type_name.into()),
            args,
            initializer: Some(InitializerList { entries }),
            span: Span::ZERO,
        }
    }

    /// Target-typed `new(args) { entries }`.
    pub fn new_target_typed(args: Vec<Expr>, entries: Vec<Entry>) -> Expr {
        Expr::New {
            type_name: None,
            args,
            initializer: Some(InitializerList { entries }),
            span: Span::ZERO,
        }
    }

    /// `cond ? a : b`.
    pub fn ternary(cond: Expr, when_true: Expr, when_false: Expr) -> Expr {
        Expr::Conditional {
            cond: Box::new(cond),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
            span: Span::ZERO,
        }
    }

    /// `value ?? fallback`.
    pub fn coalesce(value: Expr, when_null: Expr) -> Expr {
        Expr::Coalesce {
            value: Box::new(value),
            when_null: Box::new(when_null),
            span: Span::ZERO,
        }
    }

    /// `scrutinee switch { arms }`.
    pub fn switch(scrutinee: Expr, arms: Vec<SwitchArm>) -> Expr {
        Expr::Switch { scrutinee: Box::new(scrutinee), arms, span: Span::ZERO }
    }
}

/// One arm of a `switch` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchArm {
    /// Pattern tested against the scrutinee
    pub pattern: Pattern,
    /// Arm result
    pub value: Expr,
}

impl SwitchArm {
    /// Constant-pattern arm `c => value`.
    pub fn constant(c: ConstValue, value: Expr) -> Self {
        Self { pattern: Pattern::Constant(c), value }
    }

    /// Discard arm `_ => value`.
    pub fn discard(value: Expr) -> Self {
        Self { pattern: Pattern::Discard, value }
    }
}

/// Pattern of a switch arm.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Constant pattern
    Constant(ConstValue),
    /// `_`
    Discard,
}

/// A brace-enclosed initializer list.
#[derive(Debug, Clone, PartialEq)]
pub struct InitializerList {
    /// Entries in source order
    pub entries: Vec<Entry>,
}

/// Target of an initializer assignment entry.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    /// `Name = …`
    Member(String),
    /// Anything else on the left-hand side; always an error
    /// (e.g. a parenthesized or `??`-combined expression)
    Expr(Box<Expr>),
}

/// One element of an initializer list.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// `Member = expr`
    Assign {
        /// Assignment target
        target: AssignTarget,
        /// Right-hand side
        value: Expr,
        /// Source location
        span: Span,
    },
    /// `Member = { entries }` — nested member initializer without `new`
    AssignNested {
        /// Member name
        member: String,
        /// Nested entries
        entries: Vec<Entry>,
        /// Source location
        span: Span,
    },
    /// Bare collection element `expr` or keyed shorthand `{ a, b }`
    Add {
        /// `Add` arguments (one for `expr`, several for `{ a, b }`)
        args: Vec<Expr>,
        /// Source location
        span: Span,
    },
    /// `[i, j] = expr`
    Index {
        /// Index arguments in source order
        indices: Vec<Expr>,
        /// Assigned value
        value: Expr,
        /// Source location
        span: Span,
    },
    /// `[i] = { entries }` — nested initializer through an indexer
    IndexNested {
        /// Index arguments in source order
        indices: Vec<Expr>,
        /// Nested entries
        entries: Vec<Entry>,
        /// Source location
        span: Span,
    },
}

impl Entry {
    /// `Member = expr`.
    pub fn assign(member: impl Into<String>, value: Expr) -> Entry {
        Entry::Assign {
            target: AssignTarget::Member(member.into()),
            value,
            span: Span::ZERO,
        }
    }

    /// An entry whose left-hand side is not a member name (always an error).
    pub fn assign_expr_target(target: Expr, value: Expr) -> Entry {
        Entry::Assign {
            target: AssignTarget::Expr(Box::new(target)),
            value,
            span: Span::ZERO,
        }
    }

    /// `Member = { entries }`.
    pub fn assign_nested(member: impl Into<String>, entries: Vec<Entry>) -> Entry {
        Entry::AssignNested { member: member.into(), entries, span: Span::ZERO }
    }

    /// Bare collection element.
    pub fn add(value: Expr) -> Entry {
        Entry::Add { args: vec![value], span: Span::ZERO }
    }

    /// Keyed collection shorthand `{ a, b }`.
    pub fn add_many(args: Vec<Expr>) -> Entry {
        Entry::Add { args, span: Span::ZERO }
    }

    /// `[indices] = value`.
    pub fn index(indices: Vec<Expr>, value: Expr) -> Entry {
        Entry::Index { indices, value, span: Span::ZERO }
    }

    /// `[indices] = { entries }`.
    pub fn index_nested(indices: Vec<Expr>, entries: Vec<Entry>) -> Entry {
        Entry::IndexNested { indices, entries, span: Span::ZERO }
    }

    /// Source location of this entry.
    pub fn span(&self) -> Span {
        match self {
            Entry::Assign { span, .. }
            | Entry::AssignNested { span, .. }
            | Entry::Add { span, .. }
            | Entry::Index { span, .. }
            | Entry::IndexNested { span, .. } => *span,
        }
    }
}

/// A statement-level initializer expression, optionally bound to a local:
/// `C c = new C() { … };` or a bare `new C() { … };`.
#[derive(Debug, Clone, PartialEq)]
pub struct InitializerStatement {
    /// Declared result local, if any
    pub local: Option<String>,
    /// Declared type of the local; picks the target type for `new(…)` and
    /// is otherwise inferred from the creation
    pub local_ty: Option<String>,
    /// The creation expression
    pub expr: Expr,
}

impl InitializerStatement {
    /// A bare expression statement.
    pub fn expression(expr: Expr) -> Self {
        Self { local: None, local_ty: None, expr }
    }

    /// A declaration statement `var local = expr;`.
    pub fn declaration(local: impl Into<String>, expr: Expr) -> Self {
        Self { local: Some(local.into()), local_ty: None, expr }
    }

    /// A declaration statement with an explicit type, `T local = expr;`.
    pub fn declaration_typed(
        ty: impl Into<String>,
        local: impl Into<String>,
        expr: Expr,
    ) -> Self {
        Self {
            local: Some(local.into()),
            local_ty: Some(ty.into()),
            expr,
        }
    }
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal { value, .. } => write!(f, "{}", value.source_text()),
            Expr::Local { name, .. } => write!(f, "{}", name),
            Expr::New { type_name, args, initializer, .. } => {
                match type_name {
                    Some(name) => write!(f, "new {}({})", name, join(args, ", "))?,
                    None => write!(f, "new({})", join(args, ", "))?,
                }
                if let Some(init) = initializer {
                    write!(f, " {}", init)?;
                }
                Ok(())
            }
            Expr::Conditional { cond, when_true, when_false, .. } => {
                write!(f, "{} ? {} : {}", cond, when_true, when_false)
            }
            Expr::Coalesce { value, when_null, .. } => {
                write!(f, "{} ?? {}", value, when_null)
            }
            Expr::Switch { scrutinee, arms, .. } => {
                write!(f, "{} switch {{ {} }}", scrutinee, join(arms, ", "))
            }
        }
    }
}

impl fmt::Display for SwitchArm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.pattern, self.value)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Constant(c) => write!(f, "{}", c.source_text()),
            Pattern::Discard => write!(f, "_"),
        }
    }
}

impl fmt::Display for InitializerList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "{{ }}");
        }
        write!(f, "{{ {} }}", join(&self.entries, ", "))
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Assign { target, value, .. } => write!(f, "{} = {}", target, value),
            Entry::AssignNested { member, entries, .. } => {
                write!(f, "{} = {}", member, InitializerList { entries: entries.clone() })
            }
            Entry::Add { args, .. } => {
                if args.len() == 1 {
                    write!(f, "{}", args[0])
                } else {
                    write!(f, "{{ {} }}", join(args, ", "))
                }
            }
            Entry::Index { indices, value, .. } => {
                write!(f, "[{}] = {}", join(indices, ", "), value)
            }
            Entry::IndexNested { indices, entries, .. } => {
                write!(
                    f,
                    "[{}] = {}",
                    join(indices, ", "),
                    InitializerList { entries: entries.clone() }
                )
            }
        }
    }
}

impl fmt::Display for AssignTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignTarget::Member(name) => write!(f, "{}", name),
            AssignTarget::Expr(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Display for InitializerStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.local {
            Some(local) => write!(f, "{} = {}", local, self.expr),
            None => write!(f, "{}", self.expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_simple_creation() {
        let e = Expr::new_init("F", vec![], vec![Entry::assign("Field", Expr::int(2))]);
        assert_eq!(e.to_string(), "new F() { Field = 2 }");
    }

    #[test]
    fn test_display_target_typed() {
        let e = Expr::new_target_typed(vec![], vec![Entry::add(Expr::int(1))]);
        assert_eq!(e.to_string(), "new() { 1 }");
    }

    #[test]
    fn test_display_nested_and_indexed() {
        let e = Expr::new_init(
            "C",
            vec![Expr::local("x")],
            vec![
                Entry::assign_nested("X", vec![Entry::assign("A", Expr::int(1))]),
                Entry::index(vec![Expr::local("i"), Expr::local("j")], Expr::int(3)),
                Entry::add_many(vec![Expr::int(1), Expr::int(2)]),
            ],
        );
        assert_eq!(
            e.to_string(),
            "new C(x) { X = { A = 1 }, [i, j] = 3, { 1, 2 } }"
        );
    }

    #[test]
    fn test_display_branches() {
        let t = Expr::ternary(Expr::local("b"), Expr::int(1), Expr::int(2));
        assert_eq!(t.to_string(), "b ? 1 : 2");
        let c = Expr::coalesce(Expr::local("x"), Expr::int(0));
        assert_eq!(c.to_string(), "x ?? 0");
        let s = Expr::switch(
            Expr::local("i"),
            vec![
                SwitchArm::constant(ConstValue::Int(1), Expr::int(10)),
                SwitchArm::discard(Expr::int(0)),
            ],
        );
        assert_eq!(s.to_string(), "i switch { 1 => 10, _ => 0 }");
    }
}
