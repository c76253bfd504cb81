//! Node-kind descriptors and the built-in vocabulary.
//!
//! An [`ExprKind`] is a static description of one node type: its name, the
//! ordered argument keys it accepts, which of those are required, and
//! whether it behaves like a (variadic) function call. Grammar layers built
//! on top of this crate define their own descriptor tables; the handful
//! below are the kinds the engine itself and its tests need.

/// Static descriptor for one expression node type.
#[derive(Debug)]
pub struct ExprKind {
    /// Type tag, also used as the structural hash seed.
    pub name: &'static str,
    /// Argument keys in declaration order.
    pub arg_keys: &'static [&'static str],
    /// Subset of `arg_keys` that must be present and non-empty.
    pub required_args: &'static [&'static str],
    /// Accepts an unbounded argument list.
    pub variadic: bool,
    /// Function-call node, subject to positional arity validation.
    pub is_func: bool,
}

impl ExprKind {
    #[must_use]
    pub const fn new(name: &'static str, arg_keys: &'static [&'static str]) -> Self {
        ExprKind {
            name,
            arg_keys,
            required_args: &[],
            variadic: false,
            is_func: false,
        }
    }

    #[must_use]
    pub const fn required(mut self, required_args: &'static [&'static str]) -> Self {
        self.required_args = required_args;
        self
    }

    #[must_use]
    pub const fn func(mut self) -> Self {
        self.is_func = true;
        self
    }

    #[must_use]
    pub const fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }
}

impl PartialEq for ExprKind {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ExprKind {}

pub static IDENTIFIER: ExprKind =
    ExprKind::new("Identifier", &["this", "quoted"]).required(&["this"]);

pub static LITERAL: ExprKind =
    ExprKind::new("Literal", &["this", "is_string"]).required(&["this", "is_string"]);

pub static COLUMN: ExprKind =
    ExprKind::new("Column", &["this", "table", "db", "catalog"]).required(&["this"]);

pub static TABLE: ExprKind = ExprKind::new("Table", &["this", "db", "catalog", "alias"]);

pub static ALIAS: ExprKind = ExprKind::new("Alias", &["this", "alias"]).required(&["this"]);

pub static STAR: ExprKind = ExprKind::new("Star", &[]);

pub static PAREN: ExprKind = ExprKind::new("Paren", &["this"]).required(&["this"]);

pub static NOT: ExprKind = ExprKind::new("Not", &["this"]).required(&["this"]);

pub static SELECT: ExprKind = ExprKind::new(
    "Select",
    &[
        "with",
        "expressions",
        "from",
        "where",
        "group",
        "having",
        "order",
        "limit",
        "distinct",
    ],
);

pub static SUBQUERY: ExprKind = ExprKind::new("Subquery", &["this", "alias"]).required(&["this"]);

/// Catch-all function call: `this` is the function name, `expressions` the
/// positional arguments.
pub static ANONYMOUS_FUNC: ExprKind = ExprKind::new("AnonymousFunc", &["this", "expressions"])
    .required(&["this"])
    .func()
    .variadic();

/// Fixed two-argument function, used to exercise arity validation.
pub static COALESCE2: ExprKind = ExprKind::new("Coalesce2", &["this", "expression"])
    .required(&["this"])
    .func();
