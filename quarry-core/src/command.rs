use crate::{ColumnDef, ColumnRef, Expr, Ordered, TableRef};

/// Operation kind of a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Select,
    Insert,
    Update,
    Delete,
}

/// An abstract query or data-modification command, immutable after
/// construction. The analyzer and the fragment builder consume it, the
/// caller never sees it again after [`crate::Compiler::compile`].
#[derive(Debug, Clone)]
pub struct Command {
    pub kind: CommandKind,
    pub ast: CommandAst,
}

#[derive(Debug, Clone)]
pub enum CommandAst {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Command {
    pub fn select(select: Select) -> Self {
        Self {
            kind: CommandKind::Select,
            ast: CommandAst::Select(select),
        }
    }
    pub fn insert(insert: Insert) -> Self {
        Self {
            kind: CommandKind::Insert,
            ast: CommandAst::Insert(insert),
        }
    }
    pub fn update(update: Update) -> Self {
        Self {
            kind: CommandKind::Update,
            ast: CommandAst::Update(update),
        }
    }
    pub fn delete(delete: Delete) -> Self {
        Self {
            kind: CommandKind::Delete,
            ast: CommandAst::Delete(delete),
        }
    }
}

/// Set operator chaining simple selects into a multi-set select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    UnionAll,
    Intersect,
    Except,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    #[default]
    Default,
    Inner,
    Outer,
    Left,
    Right,
    Cross,
}

/// Join declaration of a [`TableSource`]: the parent is the index of the
/// table this one joins to, used by the ordering pass so parents always
/// render first.
#[derive(Debug, Clone)]
pub struct Join {
    pub parent: usize,
    pub kind: JoinType,
    pub on: Expr,
}

/// A table participating in the FROM clause, optionally joined to a parent.
#[derive(Debug, Clone)]
pub struct TableSource {
    pub table: TableRef,
    pub join: Option<Join>,
}

impl TableSource {
    pub fn new(table: TableRef) -> Self {
        Self { table, join: None }
    }
    pub fn joined(table: TableRef, parent: usize, kind: JoinType, on: Expr) -> Self {
        Self {
            table,
            join: Some(Join { parent, kind, on }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Select {
    pub projection: Vec<Expr>,
    pub from: Vec<TableSource>,
    pub condition: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<Ordered>,
    /// Emit the dialect's locking clause (FOR UPDATE).
    pub locking: bool,
    /// Row-limit count. Excluded from the cache key, captured as a local.
    pub limit: Option<Expr>,
    /// Row-skip count. Excluded from the cache key, captured as a local.
    pub offset: Option<Expr>,
    /// UNION-style continuation selects.
    pub set_ops: Vec<(SetOp, Select)>,
}

impl Select {
    pub fn new(from: TableRef) -> Self {
        Self {
            projection: Vec::new(),
            from: vec![TableSource::new(from)],
            condition: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            locking: false,
            limit: None,
            offset: None,
            set_ops: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub table: TableRef,
    pub columns: Vec<ColumnDef>,
    pub values: Vec<Expr>,
    /// Identity column whose value the database generates.
    pub generated_key: Option<ColumnRef>,
}

#[derive(Debug, Clone)]
pub struct Update {
    pub table: TableRef,
    pub assignments: Vec<(ColumnRef, Expr)>,
    pub condition: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct Delete {
    pub table: TableRef,
    pub condition: Option<Expr>,
}
