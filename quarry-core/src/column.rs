use crate::{TableRef, Value};
use std::borrow::Cow;

/// Qualified reference to a table column.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Column name.
    pub name: Cow<'static, str>,
    /// Table name (may be empty for unqualified references).
    pub table: Cow<'static, str>,
    /// Schema name (may be empty).
    pub schema: Cow<'static, str>,
}

impl ColumnRef {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
    pub fn qualified(table: impl Into<Cow<'static, str>>, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            ..Default::default()
        }
    }
    pub fn table(&self) -> TableRef {
        TableRef {
            name: self.table.clone(),
            schema: self.schema.clone(),
            ..Default::default()
        }
    }
}

/// Indicates how (or if) a column participates in the primary key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKeyType {
    /// Single-column primary key.
    PrimaryKey,
    /// Member of a composite primary key.
    PartOfPrimaryKey,
    /// Not part of the primary key.
    #[default]
    None,
}

/// Declarative specification of a table column as consumed by this pipeline.
#[derive(Default, Debug, Clone)]
pub struct ColumnDef {
    /// Column identity.
    pub column_ref: ColumnRef,
    /// `Value` prototype describing the column type.
    pub value: Value,
    /// Nullability flag.
    pub nullable: bool,
    /// Primary key participation.
    pub primary_key: PrimaryKeyType,
    /// The database produces this column's value on insert (identity key).
    pub auto_generated: bool,
    /// Long values of this column must bind as parameters instead of
    /// rendering as literals.
    pub requires_param_for_long: bool,
}

impl ColumnDef {
    pub fn name(&self) -> &str {
        &self.column_ref.name
    }
    pub fn table(&self) -> &str {
        &self.column_ref.table
    }
    pub fn schema(&self) -> &str {
        &self.column_ref.schema
    }
}

impl<'a> From<&'a ColumnDef> for &'a ColumnRef {
    fn from(value: &'a ColumnDef) -> Self {
        &value.column_ref
    }
}
