use crate::{
    ColumnDef, Command, CommandAst, Delete, Error, ErrorCollector, Expr, Insert, Order,
    ParamDirection, Placeholder, Result, Select, SqlBuf, SqlWriter, Statement, StatementKind,
    TableSource, Update, possibly_parenthesized, separated_by,
    writer::{Context, Fragment},
};

/// Renders a shaped command into a composable statement template.
///
/// Purely structural: consults the dialect for syntax, never the cache, and
/// never a concrete runtime value (literals render through the dialect's
/// formatter, locals become placeholders).
pub struct SqlBuilder<'a> {
    writer: &'a dyn SqlWriter,
}

impl<'a> SqlBuilder<'a> {
    pub fn new(writer: &'a dyn SqlWriter) -> Self {
        Self { writer }
    }

    pub fn build(&self, command: &Command) -> Result<Statement> {
        match &command.ast {
            CommandAst::Select(select) => self.build_select(select),
            CommandAst::Insert(insert) => self.build_insert(insert),
            CommandAst::Update(update) => self.build_update(update),
            CommandAst::Delete(delete) => self.build_delete(delete),
        }
    }

    /// Render a (possibly multi-set) select.
    pub fn build_select(&self, select: &Select) -> Result<Statement> {
        let mut statement = Statement::new(StatementKind::Select);
        self.write_select(select, &mut statement)?;
        for (op, next) in &select.set_ops {
            statement.seal();
            statement.push('\n');
            statement.push_str(self.writer.set_operator_text(op));
            statement.push('\n');
            self.write_select(next, &mut statement)?;
        }
        Ok(statement)
    }

    fn write_select(&self, select: &Select, out: &mut Statement) -> Result<()> {
        let qualify = select.from.len() > 1;
        let context = Context::new(Fragment::SqlSelect, qualify);
        out.seal();
        out.push_str("SELECT ");
        if select.projection.is_empty() {
            out.push('*');
        } else {
            self.write_expr_list(&select.projection, out, context, ", ")?;
        }
        out.seal();
        out.push_str("\nFROM ");
        self.write_from(&select.from, out, context.switch_fragment(Fragment::SqlSelectFrom))?;
        if let Some(condition) = &select.condition {
            out.seal();
            out.push_str("\nWHERE ");
            self.write_expr(condition, out, context.switch_fragment(Fragment::SqlSelectWhere))?;
        }
        if !select.group_by.is_empty() {
            out.seal();
            out.push_str("\nGROUP BY ");
            self.write_expr_list(
                &select.group_by,
                out,
                context.switch_fragment(Fragment::SqlSelectGroupBy),
                ", ",
            )?;
        }
        if let Some(having) = &select.having {
            out.seal();
            out.push_str("\nHAVING ");
            self.write_expr(having, out, context.switch_fragment(Fragment::SqlSelectHaving))?;
        }
        if !select.order_by.is_empty() {
            out.seal();
            out.push_str("\nORDER BY ");
            let order_context = context.switch_fragment(Fragment::SqlSelectOrderBy);
            let mut error = None;
            separated_by(
                out,
                &select.order_by,
                |out, ordered| {
                    if error.is_some() {
                        return;
                    }
                    if let Err(e) = self.write_expr(&ordered.expression, out, order_context) {
                        error = Some(e);
                        return;
                    }
                    out.push_str(match ordered.order {
                        Order::Asc => " ASC",
                        Order::Desc => " DESC",
                    });
                },
                ", ",
            );
            if let Some(error) = error {
                return Err(error);
            }
        }
        if select.locking {
            out.seal();
            out.push('\n');
            out.push_str(self.writer.locking_clause());
        }
        if let Some(limit) = &select.limit {
            out.seal();
            out.push_str("\nLIMIT ");
            self.write_expr(limit, out, context.switch_fragment(Fragment::SqlSelectLimit))?;
        }
        if let Some(offset) = &select.offset {
            out.seal();
            out.push_str("\nOFFSET ");
            self.write_expr(offset, out, context.switch_fragment(Fragment::SqlSelectLimit))?;
        }
        Ok(())
    }

    /// Render the FROM clause with tables in dependency-stable order: joined
    /// tables always after the table they join to, ties by declaration order.
    fn write_from(&self, sources: &[TableSource], out: &mut Statement, context: Context) -> Result<()> {
        let order = self.order_tables(sources)?;
        let mut first = true;
        for index in order {
            let source = &sources[index];
            if let Some(join) = &source.join {
                out.push(' ');
                let join_context = context.switch_fragment(Fragment::SqlJoin);
                self.writer.write_join_type(&join_context, out, &join.kind);
                out.push(' ');
                self.writer.write_table_ref(&join_context, out, &source.table);
                out.push_str(" ON ");
                let mut on_context = join_context;
                on_context.qualify_columns = true;
                self.write_expr(&join.on, out, on_context)?;
            } else {
                if !first {
                    out.push_str(", ");
                }
                self.writer.write_table_ref(&context, out, &source.table);
            }
            first = false;
        }
        Ok(())
    }

    /// Fixed-point ranking pass ordering tables under the join-parent
    /// relation. Non-convergence within `2 × tables` passes indicates a
    /// cyclic or malformed join graph and is fatal.
    fn order_tables(&self, sources: &[TableSource]) -> Result<Vec<usize>> {
        let tables = sources.len();
        for source in sources {
            if let Some(join) = &source.join {
                if join.parent >= tables {
                    return Err(Error::Translation {
                        kind: "Join",
                        node: format!(
                            "join parent {} of table {} does not exist",
                            join.parent,
                            source.table.full_name()
                        ),
                    });
                }
            }
        }
        let max_passes = 2 * tables;
        let mut rank = vec![0usize; tables];
        let mut pass = 0;
        loop {
            let mut changed = false;
            for (i, source) in sources.iter().enumerate() {
                if let Some(join) = &source.join {
                    if rank[join.parent] >= rank[i] {
                        rank[i] = rank[join.parent] + 1;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
            pass += 1;
            if pass >= max_passes {
                return Err(Error::Convergence {
                    passes: max_passes,
                    tables,
                });
            }
        }
        let mut order: Vec<usize> = (0..tables).collect();
        order.sort_by_key(|&i| rank[i]);
        Ok(order)
    }

    /// Check every column prototype against the dialect's type catalog,
    /// reporting all unmappable columns in one aggregate failure.
    fn check_column_types(&self, columns: &[ColumnDef]) -> Result<()> {
        let mut errors = ErrorCollector::new();
        for column in columns {
            if self.writer.column_type_of(&column.value).is_none() {
                errors.push(Error::TypeMapping {
                    column: column.name().into(),
                    value_type: column.value.type_name().into(),
                });
            }
        }
        errors.finish()
    }

    pub fn build_insert(&self, insert: &Insert) -> Result<Statement> {
        self.check_column_types(&insert.columns)?;
        let mut statement = Statement::new(StatementKind::Insert);
        let context = Context::new(Fragment::SqlInsertInto, false);
        statement.push_str("INSERT INTO ");
        self.writer.write_table_ref(&context, &mut statement, &insert.table);
        statement.push_str(" (");
        separated_by(
            &mut statement as &mut dyn SqlBuf,
            &insert.columns,
            |out, column| {
                self.writer.write_identifier_quoted(&context, out, column.name());
            },
            ", ",
        );
        statement.push_str(") VALUES (");
        statement.seal();
        let values_context = context.switch_fragment(Fragment::SqlInsertIntoValues);
        self.write_expr_list(&insert.values, &mut statement, values_context, ", ")?;
        statement.push(')');
        if let Some(key) = &insert.generated_key {
            statement.seal();
            let name = format!("out{}", statement.placeholders().len());
            statement.push_placeholder(Placeholder::ColumnValue {
                column: key.clone(),
                direction: ParamDirection::Output,
                name: name.clone(),
            });
            let returning_context = context.switch_fragment(Fragment::SqlInsertReturning);
            self.writer
                .write_insert_returning(&returning_context, &mut statement, key, &name);
        }
        Ok(statement)
    }

    pub fn build_update(&self, update: &Update) -> Result<Statement> {
        let mut statement = Statement::new(StatementKind::Update);
        let context = Context::new(Fragment::SqlUpdate, false);
        statement.push_str("UPDATE ");
        self.writer.write_table_ref(&context, &mut statement, &update.table);
        statement.seal();
        statement.push_str("\nSET ");
        let set_context = context.switch_fragment(Fragment::SqlUpdateSet);
        let mut first = true;
        for (column, value) in &update.assignments {
            if !first {
                statement.push_str(", ");
            }
            first = false;
            self.writer
                .write_column_ref(&set_context, &mut statement, column);
            statement.push_str(" = ");
            self.write_expr(value, &mut statement, set_context)?;
        }
        if let Some(condition) = &update.condition {
            statement.seal();
            statement.push_str("\nWHERE ");
            self.write_expr(
                condition,
                &mut statement,
                context.switch_fragment(Fragment::SqlUpdateWhere),
            )?;
        }
        Ok(statement)
    }

    pub fn build_delete(&self, delete: &Delete) -> Result<Statement> {
        let mut statement = Statement::new(StatementKind::Delete);
        let context = Context::new(Fragment::SqlDeleteFrom, false);
        statement.push_str("DELETE FROM ");
        self.writer.write_table_ref(&context, &mut statement, &delete.table);
        if let Some(condition) = &delete.condition {
            statement.seal();
            statement.push_str("\nWHERE ");
            self.write_expr(
                condition,
                &mut statement,
                context.switch_fragment(Fragment::SqlDeleteFromWhere),
            )?;
        }
        Ok(statement)
    }

    fn write_expr_list(
        &self,
        exprs: &[Expr],
        out: &mut Statement,
        context: Context,
        separator: &str,
    ) -> Result<()> {
        let mut first = true;
        for expr in exprs {
            if !first {
                out.push_str(separator);
            }
            first = false;
            self.write_expr(expr, out, context)?;
        }
        Ok(())
    }

    /// Effective precedence of a node, operands bind strongest.
    fn precedence(&self, expr: &Expr) -> i32 {
        match expr {
            Expr::Binary { op, .. } => self.writer.expression_binary_op_precedence(op),
            Expr::Unary { op, .. } => self.writer.expression_unary_op_precedence(op),
            _ => 1_000_000_000,
        }
    }

    /// Recursively render one expression node.
    pub fn write_expr(&self, expr: &Expr, out: &mut Statement, context: Context) -> Result<()> {
        match expr {
            Expr::Constant(value) => self.writer.write_value(&context, out, value),
            Expr::Column(column) => self.writer.write_column_ref(&context, out, column),
            Expr::Table(table) => self.writer.write_table_ref(&context, out, table),
            Expr::Member { base, member } => match base.as_ref() {
                // A member off an internal binder parameter is a column of
                // the bound row.
                Expr::Parameter(..) => self.writer.write_identifier_quoted(&context, out, member),
                base => {
                    self.write_expr(base, out, context)?;
                    out.push('.');
                    self.writer.write_identifier_quoted(&context, out, member);
                }
            },
            Expr::Unary { op, arg } => {
                let prefix =
                    self.writer
                        .expression_unary_op_prefix(op)
                        .ok_or_else(|| Error::Translation {
                            kind: expr.kind_name(),
                            node: format!("{:?}", expr),
                        })?;
                out.push_str(prefix);
                possibly_parenthesized!(
                    out,
                    self.precedence(arg) <= self.writer.expression_unary_op_precedence(op),
                    self.write_expr(arg, out, context)?
                );
            }
            Expr::Binary { op, lhs, rhs } => {
                let parts =
                    self.writer
                        .expression_binary_op_parts(op)
                        .ok_or_else(|| Error::Translation {
                            kind: expr.kind_name(),
                            node: format!("{:?}", expr),
                        })?;
                let precedence = self.writer.expression_binary_op_precedence(op);
                out.push_str(parts.prefix);
                possibly_parenthesized!(
                    out,
                    !parts.lhs_parenthesized && self.precedence(lhs) < precedence,
                    self.write_expr(lhs, out, context)?
                );
                out.push_str(parts.infix);
                possibly_parenthesized!(
                    out,
                    !parts.rhs_parenthesized && self.precedence(rhs) <= precedence,
                    self.write_expr(rhs, out, context)?
                );
                out.push_str(parts.suffix);
            }
            Expr::Call { function, args } => {
                let template =
                    self.writer
                        .call_template(function)
                        .ok_or_else(|| Error::Translation {
                            kind: expr.kind_name(),
                            node: format!("{:?}", expr),
                        })?;
                out.push_str(&template.prefix);
                self.write_expr_list(args, out, context, template.separator)?;
                out.push_str(template.suffix);
            }
            Expr::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                out.push_str("CASE WHEN ");
                self.write_expr(condition, out, context)?;
                out.push_str(" THEN ");
                self.write_expr(then_value, out, context)?;
                out.push_str(" ELSE ");
                self.write_expr(else_value, out, context)?;
                out.push_str(" END");
            }
            Expr::Construct { fields, .. } => {
                let mut first = true;
                for (name, field) in fields {
                    if !first {
                        out.push_str(", ");
                    }
                    first = false;
                    self.write_expr(field, out, context)?;
                    let plain_column = matches!(field, Expr::Column(c) if c.name == *name);
                    if !name.is_empty() && !plain_column {
                        out.push_str(" AS ");
                        self.writer.write_identifier_quoted(&context, out, name);
                    }
                }
            }
            Expr::Lambda { body, .. } => self.write_expr(body, out, context)?,
            Expr::Collection(items) => {
                out.push('(');
                self.write_expr_list(items, out, context, ", ")?;
                out.push(')');
            }
            Expr::Cast { arg, ty } => {
                if self.writer.requires_explicit_cast(ty) {
                    let type_text =
                        self.writer
                            .column_type_of(ty)
                            .ok_or_else(|| Error::TypeMapping {
                                column: "CAST target".into(),
                                value_type: ty.type_name().into(),
                            })?;
                    out.push_str("CAST(");
                    self.write_expr(arg, out, context.switch_fragment(Fragment::Casting))?;
                    out.push_str(" AS ");
                    out.push_str(&type_text);
                    out.push(')');
                } else {
                    self.write_expr(arg, out, context)?;
                }
            }
            Expr::Subquery(select) => {
                out.push('(');
                let sub = self.build_select(select)?;
                out.append(&sub);
                out.push(')');
            }
            Expr::LocalSlot { index, list } => {
                let placeholder = if *list {
                    Placeholder::List { slot: *index }
                } else {
                    Placeholder::Scalar { slot: *index }
                };
                out.push_placeholder(placeholder);
            }
            Expr::Parameter(..) => {
                return Err(Error::Translation {
                    kind: expr.kind_name(),
                    node: format!("{:?}", expr),
                });
            }
        }
        Ok(())
    }
}
