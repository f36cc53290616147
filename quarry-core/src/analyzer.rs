use crate::{
    BinaryOpType, Command, CommandAst, Environment, Error, Expr, Insert, ParamRef, Result, Select,
    Value, evaluate,
};
use std::fmt::{self, Display};

/// Where a sub-expression's value comes from, driving literal embedding,
/// local capture and cache-key construction.
///
/// Origins combine upward by `max`: a node is as dynamic as its most dynamic
/// child, with the overrides documented on [`analyze`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValueOrigin {
    /// Embeddable at compile time.
    Constant,
    /// Resolved once per execution from caller-supplied values.
    Local,
    /// Depends on a row/column, must remain part of the generated SQL.
    DataDependent,
}

/// Structural signature of a command: equal keys reuse one compiled plan.
///
/// Tokens come from node kinds, operators, member names and statically
/// evaluable literals; excised local subtrees contribute one opaque marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    tokens: Vec<Box<str>>,
}

impl CacheKey {
    pub fn tokens(&self) -> &[Box<str>] {
        &self.tokens
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for token in &self.tokens {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            f.write_str(token)?;
        }
        Ok(())
    }
}

/// Everything the analyzer learns about a command in its single pass.
#[derive(Debug)]
pub struct QueryShape {
    pub key: CacheKey,
    /// The command with every local subtree replaced by a slot reference and
    /// every foldable constant subtree folded to a literal.
    pub command: Command,
    /// Sub-expressions evaluated once per execution, by slot index.
    pub locals: Vec<Expr>,
    /// External binder parameters the environment must supply, deduplicated.
    pub externals: Vec<ParamRef>,
}

/// Marker token standing in for an excised local subtree.
const LOCAL_MARKER: &str = "?";

/// Walk the command once, classify every node's value origin, build the
/// structural cache key and collect the execution-time locals.
///
/// Combine rule: constant children fold to `Constant` unless a sibling is
/// more dynamic; table/column references and internal binder parameters are
/// always `DataDependent`; external binder parameters and member chains off
/// non-data bases are `Local`. When a node resolves `Local` its key tokens
/// and nested locals are trimmed and the whole subtree is captured as a
/// single local behind one marker token, so queries differing only in an
/// embedded runtime value share a key while queries differing in shape never
/// do.
pub fn analyze(command: &Command) -> Result<QueryShape> {
    let mut analyzer = Analyzer::default();
    let mut command = command.clone();
    match &mut command.ast {
        CommandAst::Select(select) => {
            analyzer.visit_select(select)?;
        }
        CommandAst::Insert(insert) => {
            analyzer.visit_insert(insert)?;
        }
        CommandAst::Update(update) => {
            analyzer.push_token("UPDATE");
            analyzer.push_token(update.table.full_name());
            for (column, value) in &mut update.assignments {
                analyzer.push_token(format!("set:{}", column.name));
                analyzer.visit(value)?;
            }
            if let Some(condition) = &mut update.condition {
                analyzer.push_token("WHERE");
                analyzer.visit(condition)?;
            }
        }
        CommandAst::Delete(delete) => {
            analyzer.push_token("DELETE");
            analyzer.push_token(delete.table.full_name());
            if let Some(condition) = &mut delete.condition {
                analyzer.push_token("WHERE");
                analyzer.visit(condition)?;
            }
        }
    }
    Ok(QueryShape {
        key: CacheKey {
            tokens: analyzer.tokens,
        },
        command,
        locals: analyzer.locals,
        externals: analyzer.externals,
    })
}

#[derive(Default)]
struct Analyzer {
    tokens: Vec<Box<str>>,
    locals: Vec<Expr>,
    externals: Vec<ParamRef>,
    /// Parameters introduced by enclosing lambda-like sub-expressions,
    /// innermost last.
    binders: Vec<String>,
    /// Set while visiting the right operand of a membership operator: a local
    /// captured there expands to a value list at bind time.
    list_position: bool,
}

impl Analyzer {
    fn push_token(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into().into_boxed_str());
    }

    fn visit_select(&mut self, select: &mut Select) -> Result<()> {
        self.push_token("SELECT");
        for expr in &mut select.projection {
            self.visit(expr)?;
        }
        self.push_token("FROM");
        for source in &mut select.from {
            self.push_token(source.table.full_name());
            if let Some(join) = &mut source.join {
                self.push_token(format!("join:{:?}:{}", join.kind, join.parent));
                self.visit(&mut join.on)?;
            }
        }
        if let Some(condition) = &mut select.condition {
            self.push_token("WHERE");
            self.visit(condition)?;
        }
        if !select.group_by.is_empty() {
            self.push_token("GROUPBY");
            for expr in &mut select.group_by {
                self.visit(expr)?;
            }
        }
        if let Some(having) = &mut select.having {
            self.push_token("HAVING");
            self.visit(having)?;
        }
        if !select.order_by.is_empty() {
            self.push_token("ORDERBY");
            for ordered in &mut select.order_by {
                self.visit(&mut ordered.expression)?;
                self.push_token(format!("{:?}", ordered.order));
            }
        }
        if select.locking {
            self.push_token("LOCK");
        }
        // Paging counts never contribute their value to the key, only their
        // position, so one plan serves any page size/offset.
        if let Some(limit) = &mut select.limit {
            self.capture_paging(limit, "LIMIT?")?;
        }
        if let Some(offset) = &mut select.offset {
            self.capture_paging(offset, "OFFSET?")?;
        }
        for (op, select) in &mut select.set_ops {
            self.push_token(format!("setop:{:?}", op));
            self.visit_select(select)?;
        }
        Ok(())
    }

    fn visit_insert(&mut self, insert: &mut Insert) -> Result<()> {
        self.push_token("INSERT");
        self.push_token(insert.table.full_name());
        for column in &insert.columns {
            self.push_token(format!("col:{}", column.name()));
        }
        for value in &mut insert.values {
            self.visit(value)?;
        }
        if let Some(key) = &insert.generated_key {
            self.push_token(format!("genkey:{}", key.name));
        }
        Ok(())
    }

    /// Visit one node: classify, then fold constants or excise locals.
    fn visit(&mut self, expr: &mut Expr) -> Result<ValueOrigin> {
        let saved_len = self.tokens.len();
        let saved_locals = self.locals.len();
        let in_list_position = std::mem::take(&mut self.list_position);
        let snapshot = expr.clone();
        let origin = self.visit_inner(expr)?;
        match origin {
            ValueOrigin::Local => {
                // Fold-and-trim: drop the subtree's tokens and nested locals,
                // keep one marker and capture the original subtree whole.
                self.tokens.truncate(saved_len);
                self.push_token(LOCAL_MARKER);
                self.locals.truncate(saved_locals);
                let list = in_list_position
                    || matches!(
                        snapshot,
                        Expr::Collection(..) | Expr::Constant(Value::List(..))
                    );
                let index = self.locals.len();
                self.locals.push(snapshot);
                *expr = Expr::LocalSlot { index, list };
            }
            ValueOrigin::Constant => {
                // Folding is best effort: shapes the interpreter does not
                // cover (IN, LIKE, ...) render as constant SQL instead.
                if !matches!(
                    expr,
                    Expr::Constant(..) | Expr::Collection(..) | Expr::Construct { .. }
                ) && let Ok(value) = evaluate(expr, &Environment::new())
                {
                    *expr = Expr::Constant(value);
                }
            }
            ValueOrigin::DataDependent => {}
        }
        Ok(origin)
    }

    fn visit_inner(&mut self, expr: &mut Expr) -> Result<ValueOrigin> {
        Ok(match expr {
            Expr::Constant(value) => {
                self.push_token(format!("C:{:?}", value));
                ValueOrigin::Constant
            }
            Expr::Parameter(param) => {
                if self.binders.iter().any(|b| b == &param.name) {
                    self.push_token(format!("P:{}", param.name));
                    ValueOrigin::DataDependent
                } else {
                    if !self.externals.contains(param) {
                        self.externals.push(param.clone());
                    }
                    ValueOrigin::Local
                }
            }
            Expr::Column(column) => {
                self.push_token(format!("col:{}.{}", column.table, column.name));
                ValueOrigin::DataDependent
            }
            Expr::Table(table) => {
                self.push_token(format!("tab:{}", table.full_name()));
                ValueOrigin::DataDependent
            }
            Expr::Member { base, member } => {
                self.push_token(format!("M:{}", member));
                let base = self.visit(base)?;
                // A member chain off a non-data base resolves once per
                // execution (shared/static value access).
                base.max(ValueOrigin::Local)
            }
            Expr::Unary { op, arg } => {
                self.push_token(format!("U:{}", op));
                self.visit(arg)?
            }
            Expr::Binary { op, lhs, rhs } => {
                self.push_token(format!("B:{}", op));
                let lhs = self.visit(lhs)?;
                self.list_position = matches!(op, BinaryOpType::In | BinaryOpType::NotIn);
                let rhs = self.visit(rhs)?;
                lhs.max(rhs)
            }
            Expr::Call { function, args } => {
                self.push_token(format!("F:{}", function));
                let mut origin = ValueOrigin::Constant;
                for arg in args {
                    origin = origin.max(self.visit(arg)?);
                }
                origin
            }
            Expr::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                self.push_token("IF");
                let condition = self.visit(condition)?;
                let then_value = self.visit(then_value)?;
                let else_value = self.visit(else_value)?;
                condition.max(then_value).max(else_value)
            }
            Expr::Construct {
                type_name,
                scalar,
                fields,
            } => {
                self.push_token(format!("N:{}", type_name));
                let mut origin = ValueOrigin::Constant;
                for (name, field) in fields {
                    self.push_token(format!("fld:{}", name));
                    origin = origin.max(self.visit(field)?);
                }
                if *scalar {
                    origin
                } else {
                    // Non-scalar constructions are explicit output-column
                    // lists; folding or excising them would hide required
                    // output columns from the statement.
                    ValueOrigin::DataDependent
                }
            }
            Expr::Lambda { params, body } => {
                self.push_token("L");
                for param in params.iter() {
                    self.push_token(format!("p:{}", param));
                }
                let depth = self.binders.len();
                self.binders.extend(params.iter().cloned());
                let origin = self.visit(body);
                self.binders.truncate(depth);
                origin?
            }
            Expr::Collection(items) => {
                self.push_token("COLL");
                let mut origin = ValueOrigin::Constant;
                for item in items {
                    origin = origin.max(self.visit(item)?);
                }
                origin
            }
            Expr::Cast { arg, ty } => {
                self.push_token(format!("CAST:{}", ty.type_name()));
                self.visit(arg)?
            }
            Expr::Subquery(select) => {
                self.push_token("SUB");
                self.visit_select(select)?;
                ValueOrigin::DataDependent
            }
            Expr::LocalSlot { .. } => {
                return Err(Error::Translation {
                    kind: expr.kind_name(),
                    node: format!("{:?}", expr),
                });
            }
        })
    }

    /// Capture a paging count: its position contributes a fixed token, its
    /// value only ever lives in the locals list.
    fn capture_paging(&mut self, expr: &mut Expr, token: &str) -> Result<()> {
        let saved_len = self.tokens.len();
        let saved_locals = self.locals.len();
        let snapshot = expr.clone();
        let origin = self.visit_inner(expr)?;
        if origin == ValueOrigin::DataDependent {
            return Err(Error::Translation {
                kind: snapshot.kind_name(),
                node: format!("paging count cannot depend on row data: {:?}", snapshot),
            });
        }
        self.tokens.truncate(saved_len);
        self.locals.truncate(saved_locals);
        self.push_token(token);
        let index = self.locals.len();
        self.locals.push(snapshot);
        *expr = Expr::LocalSlot { index, list: false };
        Ok(())
    }
}
