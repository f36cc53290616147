use crate::{BinaryOpType, ColumnRef, Select, TableRef, UnaryOpType, Value};

/// Identifies an external binder parameter: a value supplied by the caller or
/// session scope at execution time (e.g. a current-user filter).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamRef {
    pub name: String,
}

impl ParamRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Abstract syntax node of a query or data-modification command.
///
/// The tree is immutable once a [`crate::Command`] is constructed; the
/// analyzer works on its own shaped copy. `LocalSlot` never appears in caller
/// input, the analyzer inserts it where a run-time local was excised.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Literal embeddable at compile time.
    Constant(Value),
    /// Runtime parameter bound to caller/session scope, or to an enclosing
    /// lambda binder when the name is shadowed by one.
    Parameter(ParamRef),
    /// Member access, `base.member`.
    Member {
        base: Box<Expr>,
        member: String,
    },
    /// Direct column reference.
    Column(ColumnRef),
    /// Reference to a row/column backed entity collection.
    Table(TableRef),
    Unary {
        op: UnaryOpType,
        arg: Box<Expr>,
    },
    Binary {
        op: BinaryOpType,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Function call rendered through a dialect template.
    Call {
        function: String,
        args: Vec<Expr>,
    },
    /// Ternary conditional, rendered as CASE WHEN.
    Conditional {
        condition: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
    /// Record construction. Non-scalar constructions represent explicit
    /// output-column lists and are never folded to a literal.
    Construct {
        type_name: String,
        scalar: bool,
        fields: Vec<(String, Expr)>,
    },
    /// Lambda-like sub-expression introducing internal binder parameters.
    Lambda {
        params: Vec<String>,
        body: Box<Expr>,
    },
    /// Collection literal, rendered as an IN list.
    Collection(Vec<Expr>),
    /// Explicit type conversion, elided when the dialect does not require it.
    Cast {
        arg: Box<Expr>,
        ty: Value,
    },
    /// Parenthesized sub-select.
    Subquery(Box<Select>),
    /// Slot resolved from the locals list at bind time. Inserted by the
    /// analyzer only.
    LocalSlot {
        index: usize,
        list: bool,
    },
}

impl Expr {
    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Constant(value.into())
    }
    pub fn column(name: impl Into<std::borrow::Cow<'static, str>>) -> Self {
        Expr::Column(ColumnRef::new(name))
    }
    pub fn parameter(name: impl Into<String>) -> Self {
        Expr::Parameter(ParamRef::new(name))
    }
    pub fn binary(op: BinaryOpType, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
    pub fn unary(op: UnaryOpType, arg: Expr) -> Self {
        Expr::Unary {
            op,
            arg: Box::new(arg),
        }
    }
    pub fn call(function: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            function: function.into(),
            args,
        }
    }
    pub fn equal(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOpType::Equal, lhs, rhs)
    }
    pub fn and(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOpType::And, lhs, rhs)
    }

    /// Name of the node shape, used in cache-key tokens and diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Constant(..) => "Constant",
            Expr::Parameter(..) => "Parameter",
            Expr::Member { .. } => "Member",
            Expr::Column(..) => "Column",
            Expr::Table(..) => "Table",
            Expr::Unary { .. } => "Unary",
            Expr::Binary { .. } => "Binary",
            Expr::Call { .. } => "Call",
            Expr::Conditional { .. } => "Conditional",
            Expr::Construct { .. } => "Construct",
            Expr::Lambda { .. } => "Lambda",
            Expr::Collection(..) => "Collection",
            Expr::Cast { .. } => "Cast",
            Expr::Subquery(..) => "Subquery",
            Expr::LocalSlot { .. } => "LocalSlot",
        }
    }
}
