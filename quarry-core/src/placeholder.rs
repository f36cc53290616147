use crate::{ColumnRef, SqlBuf, SqlWriter, Value, writer::Context};

/// Flow direction of a column value placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDirection {
    Input,
    Output,
    InputOutput,
}

/// Deferred-value slot inside an otherwise static SQL fragment tree.
///
/// A placeholder's index is its position in the owning statement's
/// placeholder list; appending a statement to another re-indexes every
/// placeholder sequentially.
#[derive(Debug, Clone)]
pub enum Placeholder {
    /// Bound to a row/column at batch build time.
    ColumnValue {
        column: ColumnRef,
        direction: ParamDirection,
        name: String,
    },
    /// Bound to a scalar slot of the locals list.
    Scalar { slot: usize },
    /// Bound to a collection slot of the locals list, expands to an IN list.
    List { slot: usize },
}

impl Placeholder {
    pub fn direction(&self) -> ParamDirection {
        match self {
            Placeholder::ColumnValue { direction, .. } => *direction,
            _ => ParamDirection::Input,
        }
    }

    /// Render the bound value as an inline literal.
    pub fn format_literal(
        &self,
        writer: &dyn SqlWriter,
        context: &Context,
        out: &mut dyn SqlBuf,
        value: &Value,
    ) {
        writer.write_value(context, out, value);
    }

    /// Render a parameter marker requesting the value from the backend.
    pub fn format_parameter(
        &self,
        writer: &dyn SqlWriter,
        context: &Context,
        out: &mut dyn SqlBuf,
        index: usize,
    ) {
        match self {
            Placeholder::ColumnValue { name, .. } => writer.write_named_parameter(out, name),
            _ => writer.write_parameter_marker(context, out, index),
        }
    }
}
