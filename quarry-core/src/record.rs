use crate::{ColumnDef, ColumnRef, TableRef, Value};

/// Pending persistence state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Not yet in the database, becomes an INSERT.
    New,
    /// Exists and has changed columns, becomes an UPDATE.
    Modified,
    /// Marked for removal, becomes a DELETE.
    Deleting,
}

/// Handle to a record inside a [`RecordSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(pub usize);

/// A column value pending write: either a concrete value or the key of
/// another record, resolved once that record's insert has produced it.
#[derive(Debug, Clone)]
pub enum RecordValue {
    Value(Value),
    /// Foreign key reference to a record whose key is generated by its own
    /// insert within the same batch.
    KeyOf(RecordId),
}

/// Where a record's generated key will surface within a batch command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputParam {
    /// Execution unit the owning statement was placed in.
    pub unit: usize,
    pub name: String,
}

/// One pending row change with enough metadata to render its statement.
#[derive(Debug, Clone)]
pub struct Record {
    pub status: RecordStatus,
    pub table: TableRef,
    /// Changed columns in declaration order. For deletes this is empty.
    pub values: Vec<(ColumnDef, RecordValue)>,
    /// Identifying column and value for UPDATE/DELETE targeting.
    pub key: Option<(ColumnRef, Value)>,
    /// Auto-generated key column the insert must return, if any.
    pub generated_key: Option<ColumnDef>,
    /// Set when the batch reserves an output parameter for the generated key.
    pub output_param: Option<OutputParam>,
}

impl Record {
    pub fn insert(table: TableRef) -> Self {
        Self {
            status: RecordStatus::New,
            table,
            values: Vec::new(),
            key: None,
            generated_key: None,
            output_param: None,
        }
    }

    pub fn update(table: TableRef, key: ColumnRef, key_value: impl Into<Value>) -> Self {
        Self {
            status: RecordStatus::Modified,
            table,
            values: Vec::new(),
            key: Some((key, key_value.into())),
            generated_key: None,
            output_param: None,
        }
    }

    pub fn delete(table: TableRef, key: ColumnRef, key_value: impl Into<Value>) -> Self {
        Self {
            status: RecordStatus::Deleting,
            table,
            values: Vec::new(),
            key: None,
            generated_key: None,
            output_param: None,
        }
        .with_key(key, key_value)
    }

    pub fn with_value(mut self, column: ColumnDef, value: impl Into<Value>) -> Self {
        self.values.push((column, RecordValue::Value(value.into())));
        self
    }

    pub fn with_key_of(mut self, column: ColumnDef, source: RecordId) -> Self {
        self.values.push((column, RecordValue::KeyOf(source)));
        self
    }

    pub fn with_key(mut self, key: ColumnRef, key_value: impl Into<Value>) -> Self {
        self.key = Some((key, key_value.into()));
        self
    }

    pub fn with_generated_key(mut self, column: ColumnDef) -> Self {
        self.generated_key = Some(column);
        self
    }
}

/// Arena of pending records; [`RecordId`]s index into it and stay valid for
/// the arena's lifetime.
#[derive(Debug, Default)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: Record) -> RecordId {
        let id = RecordId(self.records.len());
        self.records.push(record);
        id
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id.0)
    }

    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        self.records.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        (0..self.records.len()).map(RecordId)
    }
}
