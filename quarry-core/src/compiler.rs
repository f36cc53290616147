use crate::{
    CacheKey, Command, Environment, Error, Expr, ParamRef, Placeholder, Result, SqlBuilder,
    SqlFragment, SqlWriter, Statement, StatementCache, Value, analyze, evaluate, truncate_long,
    writer::Context,
};
use std::{
    fmt::{self, Display},
    sync::Arc,
};

/// Compilation front end: analyzes a command, reuses the cached template when
/// one exists and compiles + caches it otherwise.
///
/// Compilation failures propagate to the caller and are never cached, so a
/// later attempt with a fixed command is not poisoned.
pub struct Compiler<'a> {
    writer: &'a dyn SqlWriter,
    cache: Arc<StatementCache>,
}

impl<'a> Compiler<'a> {
    pub fn new(writer: &'a dyn SqlWriter, cache: Arc<StatementCache>) -> Self {
        Self { writer, cache }
    }

    pub fn cache(&self) -> &Arc<StatementCache> {
        &self.cache
    }

    pub fn compile(&self, command: &Command) -> Result<CompiledQuery> {
        let shape = analyze(command)?;
        let statement = match self.cache.lookup(&shape.key) {
            Some(statement) => statement,
            None => {
                let statement = SqlBuilder::new(self.writer).build(&shape.command)?;
                self.cache.add(shape.key.clone(), statement)
            }
        };
        Ok(CompiledQuery {
            key: shape.key,
            statement,
            locals: shape.locals,
            externals: shape.externals,
        })
    }
}

/// A compiled command ready for repeated execution: the shared statement
/// template plus the per-execution sub-expressions excised from it.
#[derive(Debug)]
pub struct CompiledQuery {
    pub key: CacheKey,
    pub statement: Arc<Statement>,
    /// Sub-expressions evaluated at bind time, by slot index.
    pub locals: Vec<Expr>,
    /// External parameters the environment must supply.
    pub externals: Vec<ParamRef>,
}

impl CompiledQuery {
    /// Resolve every local against the environment and render the template to
    /// executable text with positional parameters.
    pub fn bind(&self, writer: &dyn SqlWriter, environment: &Environment) -> Result<BoundStatement> {
        let context = Context::default();
        let mut text = String::new();
        let mut parameters = Vec::new();
        for fragment in self.statement.fragments() {
            match fragment {
                SqlFragment::Text(value) => text.push_str(value),
                SqlFragment::Placeholder(index) => {
                    let placeholder =
                        self.statement
                            .placeholders()
                            .get(*index)
                            .ok_or_else(|| {
                                Error::Binding(format!("placeholder {} out of range", index))
                            })?;
                    match placeholder {
                        Placeholder::Scalar { slot } => {
                            let value = evaluate(self.local(*slot)?, environment)?;
                            placeholder.format_parameter(
                                writer,
                                &context,
                                &mut text,
                                parameters.len(),
                            );
                            parameters.push(value);
                        }
                        Placeholder::List { slot } => {
                            let value = evaluate(self.local(*slot)?, environment)?;
                            let items = match value {
                                Value::List(Some(items), ..) => items,
                                other => {
                                    return Err(Error::Binding(format!(
                                        "collection slot {} resolved to {}",
                                        slot,
                                        other.type_name()
                                    )));
                                }
                            };
                            // An empty membership list must stay valid SQL
                            // and match nothing.
                            text.push('(');
                            if items.is_empty() {
                                text.push_str("NULL");
                            }
                            let mut first = true;
                            for item in items {
                                if !first {
                                    text.push_str(", ");
                                }
                                first = false;
                                placeholder.format_parameter(
                                    writer,
                                    &context,
                                    &mut text,
                                    parameters.len(),
                                );
                                parameters.push(item);
                            }
                            text.push(')');
                        }
                        Placeholder::ColumnValue { .. } => {
                            placeholder.format_parameter(writer, &context, &mut text, 0);
                        }
                    }
                }
            }
        }
        Ok(BoundStatement { text, parameters })
    }

    fn local(&self, slot: usize) -> Result<&Expr> {
        self.locals
            .get(slot)
            .ok_or_else(|| Error::Binding(format!("local slot {} out of range", slot)))
    }
}

/// Executable SQL text plus its positional parameter values, in marker order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub text: String,
    pub parameters: Vec<Value>,
}

impl Display for BoundStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.text))?;
        if !self.parameters.is_empty() {
            write!(f, " [{} parameters]", self.parameters.len())?;
        }
        Ok(())
    }
}
