use thiserror::Error;

/// Failure taxonomy of the compilation pipeline.
///
/// Structural errors (`Translation`, `Convergence`, `Sequencing`) are
/// unrecoverable and raised immediately. Per-object model errors
/// (`TypeMapping`) are meant to be gathered in an [`ErrorCollector`] so every
/// problem is reported in one aggregate failure.
#[derive(Debug, Error)]
pub enum Error {
    /// An AST node, operator or function has no SQL rendering.
    #[error("no SQL translation for {kind} node: {node}")]
    Translation { kind: &'static str, node: String },
    /// A column's value type has no corresponding database type.
    #[error("column {column} has no database type for {value_type}")]
    TypeMapping { column: String, value_type: String },
    /// A batch referenced a generated identity before the producing insert
    /// was built.
    #[error("record {record} of {table} is referenced before its insert was added to the batch")]
    Sequencing { record: usize, table: String },
    /// A fixed-point pass failed to stabilize, the join graph is cyclic or
    /// malformed.
    #[error("table ordering did not converge within {passes} passes over {tables} tables")]
    Convergence { passes: usize, tables: usize },
    /// A placeholder could not be resolved at bind time.
    #[error("cannot bind statement: {0}")]
    Binding(String),
    /// A local expression could not be evaluated against the environment.
    #[error("cannot evaluate local expression: {0}")]
    Evaluation(String),
    /// Several collected model errors reported at once.
    #[error("{count} model errors\n{details}")]
    Aggregate { count: usize, details: String },
}

pub type Result<T> = core::result::Result<T, Error>;

/// Log-like accumulator for per-object validation errors.
///
/// Push every problem found during a pass, then call [`ErrorCollector::finish`]
/// once to either succeed or raise a single [`Error::Aggregate`].
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<Error>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&mut self, error: Error) {
        self.errors.push(error);
    }
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
    pub fn len(&self) -> usize {
        self.errors.len()
    }
    pub fn finish(mut self) -> Result<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        if self.errors.len() == 1 {
            return Err(self.errors.remove(0));
        }
        let mut details = String::new();
        for e in &self.errors {
            details.push_str("- ");
            details.push_str(&e.to_string());
            details.push('\n');
        }
        Err(Error::Aggregate {
            count: self.errors.len(),
            details,
        })
    }
}
