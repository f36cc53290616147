use crate::{
    BoundStatement, ColumnDef, Error, OutputParam, ParamDirection, Record, RecordId, RecordSet,
    RecordStatus, RecordValue, Result, SqlWriter, Value,
    writer::{Context, Fragment},
};

/// Tuning knobs of the batch builder.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Statements per execution unit; adding more opens a new unit.
    pub max_statements_per_command: usize,
    /// Inline values as literals wherever the dialect allows, instead of
    /// binding them as parameters.
    pub prefer_literals: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_statements_per_command: 100,
            prefer_literals: false,
        }
    }
}

/// One named parameter of a batch unit.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchParameter {
    pub name: String,
    pub direction: ParamDirection,
    /// Input value; `Null` for outputs and for inputs filled by a copy.
    pub value: Value,
}

/// Instruction to feed one unit's output parameter into a later unit's input
/// parameter between executions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterCopy {
    pub from_unit: usize,
    pub from_name: String,
    pub to_unit: usize,
    pub to_name: String,
}

/// One round trip's worth of statements plus its named parameters.
#[derive(Debug, Clone)]
pub struct BatchUnit {
    pub text: String,
    pub parameters: Vec<BatchParameter>,
}

/// Finished batch: execution units in order plus the parameter copies the
/// executor must perform between them.
#[derive(Debug, Clone, Default)]
pub struct BatchCommand {
    pub units: Vec<BatchUnit>,
    pub copies: Vec<ParameterCopy>,
}

/// Accumulates record changes and pre-bound queries into execution units,
/// threading generated keys from inserts into the statements that reference
/// them.
///
/// A key generated and consumed within one unit flows through its named
/// output parameter directly; across units it becomes a [`ParameterCopy`]
/// the executor replays between round trips. Referencing a record that has
/// not produced its key yet is a sequencing error: callers add records in
/// dependency order.
pub struct Batch<'a> {
    writer: &'a dyn SqlWriter,
    config: BatchConfig,
    statements: Vec<(usize, String)>,
    unit_parameters: Vec<Vec<BatchParameter>>,
    copies: Vec<ParameterCopy>,
}

impl<'a> Batch<'a> {
    pub fn new(writer: &'a dyn SqlWriter, config: BatchConfig) -> Self {
        Self {
            writer,
            config,
            statements: Vec::new(),
            unit_parameters: Vec::new(),
            copies: Vec::new(),
        }
    }

    /// Unit the next statement lands in.
    fn current_unit(&mut self) -> usize {
        let unit = self.statements.len() / self.config.max_statements_per_command.max(1);
        while self.unit_parameters.len() <= unit {
            self.unit_parameters.push(Vec::new());
        }
        unit
    }

    /// Reserve the next parameter slot of a unit, naming it by unit and
    /// ordinal so names stay unique across the whole batch.
    fn push_parameter(&mut self, unit: usize, direction: ParamDirection, value: Value) -> String {
        let name = format!("p{}_{}", unit, self.unit_parameters[unit].len());
        self.unit_parameters[unit].push(BatchParameter {
            name: name.clone(),
            direction,
            value,
        });
        name
    }

    /// Whether the dialect accepts this value as an inline literal for the
    /// given column.
    pub fn can_use_literal(&self, column: Option<&ColumnDef>, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        if let (Some(column), Some(len)) = (column, value.literal_len()) {
            if column.requires_param_for_long && len > self.writer.max_literal_len() {
                return false;
            }
        }
        true
    }

    fn use_literal(&self, column: Option<&ColumnDef>, value: &Value) -> bool {
        value.is_null() || (self.config.prefer_literals && self.can_use_literal(column, value))
    }

    fn write_value(
        &mut self,
        unit: usize,
        context: &Context,
        out: &mut String,
        column: Option<&ColumnDef>,
        value: &Value,
    ) {
        if self.use_literal(column, value) {
            self.writer.write_value(context, out, value);
        } else {
            let name = self.push_parameter(unit, ParamDirection::Input, value.clone());
            self.writer.write_named_parameter(out, &name);
        }
    }

    /// Resolve a foreign key reference to an already-added record's generated
    /// key.
    fn write_key_of(
        &mut self,
        unit: usize,
        out: &mut String,
        records: &RecordSet,
        source: RecordId,
    ) -> Result<()> {
        let record = records.get(source).ok_or(Error::Sequencing {
            record: source.0,
            table: String::new(),
        })?;
        let output = record
            .output_param
            .as_ref()
            .ok_or_else(|| Error::Sequencing {
                record: source.0,
                table: record.table.full_name(),
            })?;
        if output.unit == unit {
            self.writer.write_named_parameter(out, &output.name);
        } else {
            let name = self.push_parameter(unit, ParamDirection::Input, Value::Null);
            self.writer.write_named_parameter(out, &name);
            self.copies.push(ParameterCopy {
                from_unit: output.unit,
                from_name: output.name.clone(),
                to_unit: unit,
                to_name: name,
            });
        }
        Ok(())
    }

    /// Render one record's pending change and append it to the batch. Sets
    /// the record's output parameter when its insert returns a generated key.
    pub fn add_record(&mut self, records: &mut RecordSet, id: RecordId) -> Result<()> {
        let record = records.get(id).cloned().ok_or(Error::Sequencing {
            record: id.0,
            table: String::new(),
        })?;
        let unit = self.current_unit();
        let output = match record.status {
            RecordStatus::New => self.render_insert(unit, records, &record)?,
            RecordStatus::Modified => {
                self.render_update(unit, records, &record)?;
                None
            }
            RecordStatus::Deleting => {
                self.render_delete(unit, &record)?;
                None
            }
        };
        if let Some(record) = records.get_mut(id) {
            record.output_param = output;
        }
        Ok(())
    }

    /// Add several records in order, stopping at the first failure.
    pub fn add_records(
        &mut self,
        records: &mut RecordSet,
        ids: impl IntoIterator<Item = RecordId>,
    ) -> Result<()> {
        for id in ids {
            self.add_record(records, id)?;
        }
        Ok(())
    }

    fn render_insert(
        &mut self,
        unit: usize,
        records: &RecordSet,
        record: &Record,
    ) -> Result<Option<OutputParam>> {
        let context = Context::new(Fragment::SqlInsertInto, false);
        let mut text = String::new();
        text.push_str("INSERT INTO ");
        self.writer.write_table_ref(&context, &mut text, &record.table);
        text.push_str(" (");
        let mut first = true;
        for (column, _) in &record.values {
            if !first {
                text.push_str(", ");
            }
            first = false;
            self.writer
                .write_identifier_quoted(&context, &mut text, column.name());
        }
        text.push_str(") VALUES (");
        let values_context = context.switch_fragment(Fragment::SqlInsertIntoValues);
        let mut first = true;
        for (column, value) in &record.values {
            if !first {
                text.push_str(", ");
            }
            first = false;
            match value {
                RecordValue::Value(value) => {
                    self.write_value(unit, &values_context, &mut text, Some(column), value)
                }
                RecordValue::KeyOf(source) => {
                    self.write_key_of(unit, &mut text, records, *source)?
                }
            }
        }
        text.push(')');
        let output = match &record.generated_key {
            Some(key) => {
                let name = self.push_parameter(unit, ParamDirection::Output, Value::Null);
                self.writer.write_insert_returning(
                    &context.switch_fragment(Fragment::SqlInsertReturning),
                    &mut text,
                    &key.column_ref,
                    &name,
                );
                Some(OutputParam { unit, name })
            }
            None => None,
        };
        self.statements.push((unit, text));
        Ok(output)
    }

    fn render_update(&mut self, unit: usize, records: &RecordSet, record: &Record) -> Result<()> {
        let (key, key_value) = record.key.as_ref().ok_or_else(|| Error::Translation {
            kind: "Record",
            node: format!("update of {} has no key", record.table.full_name()),
        })?;
        let context = Context::new(Fragment::SqlUpdate, false);
        let mut text = String::new();
        text.push_str("UPDATE ");
        self.writer.write_table_ref(&context, &mut text, &record.table);
        text.push_str(" SET ");
        let set_context = context.switch_fragment(Fragment::SqlUpdateSet);
        let mut first = true;
        for (column, value) in &record.values {
            if !first {
                text.push_str(", ");
            }
            first = false;
            self.writer
                .write_identifier_quoted(&set_context, &mut text, column.name());
            text.push_str(" = ");
            match value {
                RecordValue::Value(value) => {
                    self.write_value(unit, &set_context, &mut text, Some(column), value)
                }
                RecordValue::KeyOf(source) => {
                    self.write_key_of(unit, &mut text, records, *source)?
                }
            }
        }
        text.push_str(" WHERE ");
        let where_context = context.switch_fragment(Fragment::SqlUpdateWhere);
        self.writer.write_column_ref(&where_context, &mut text, key);
        text.push_str(" = ");
        self.write_value(unit, &where_context, &mut text, None, key_value);
        self.statements.push((unit, text));
        Ok(())
    }

    fn render_delete(&mut self, unit: usize, record: &Record) -> Result<()> {
        let (key, key_value) = record.key.as_ref().ok_or_else(|| Error::Translation {
            kind: "Record",
            node: format!("delete of {} has no key", record.table.full_name()),
        })?;
        let context = Context::new(Fragment::SqlDeleteFrom, false);
        let mut text = String::new();
        text.push_str("DELETE FROM ");
        self.writer.write_table_ref(&context, &mut text, &record.table);
        text.push_str(" WHERE ");
        let where_context = context.switch_fragment(Fragment::SqlDeleteFromWhere);
        self.writer.write_column_ref(&where_context, &mut text, key);
        text.push_str(" = ");
        self.write_value(unit, &where_context, &mut text, None, key_value);
        self.statements.push((unit, text));
        Ok(())
    }

    /// Append an already-bound query, converting its positional markers to
    /// this batch's named parameters.
    pub fn add_query(&mut self, query: &BoundStatement) -> Result<()> {
        let unit = self.current_unit();
        let mut text = String::new();
        let mut values = query.parameters.iter();
        let mut in_string = false;
        let mut in_identifier = false;
        for c in query.text.chars() {
            match c {
                '\'' if !in_identifier => in_string = !in_string,
                '"' if !in_string => in_identifier = !in_identifier,
                _ => {}
            }
            if c == '?' && !in_string && !in_identifier {
                let value = values.next().ok_or_else(|| {
                    Error::Binding("more markers than bound parameters".into())
                })?;
                let name = self.push_parameter(unit, ParamDirection::Input, value.clone());
                self.writer.write_named_parameter(&mut text, &name);
            } else {
                text.push(c);
            }
        }
        if values.next().is_some() {
            return Err(Error::Binding("more bound parameters than markers".into()));
        }
        self.statements.push((unit, text));
        Ok(())
    }

    /// Assemble the accumulated statements into execution units.
    ///
    /// Multi-statement units get the dialect's batch wrapper; a transactional
    /// batch opens with BEGIN in its first unit and commits at the end of its
    /// last. A batch of one statement is emitted bare, it is atomic on its
    /// own.
    pub fn finish(self, enclose_in_transaction: bool) -> Result<BatchCommand> {
        let total = self.statements.len();
        let mut units: Vec<BatchUnit> = self
            .unit_parameters
            .into_iter()
            .map(|parameters| BatchUnit {
                text: String::new(),
                parameters,
            })
            .collect();
        let transactional = enclose_in_transaction && total > 1;
        let last_unit = units.len().saturating_sub(1);
        for (index, unit) in units.iter_mut().enumerate() {
            let statements: Vec<&str> = self
                .statements
                .iter()
                .filter(|(u, _)| *u == index)
                .map(|(_, text)| text.as_str())
                .collect();
            let wrap = statements.len() > 1;
            if wrap {
                if let Some(begin) = self.writer.batch_begin() {
                    unit.text.push_str(begin);
                    unit.text.push('\n');
                }
            }
            if transactional && index == 0 {
                unit.text.push_str(self.writer.transaction_begin());
                unit.text.push('\n');
            }
            let mut first = true;
            for statement in statements {
                if !first {
                    unit.text.push('\n');
                }
                first = false;
                unit.text.push_str(statement);
                unit.text.push(';');
            }
            if transactional && index == last_unit {
                unit.text.push('\n');
                unit.text.push_str(self.writer.transaction_commit());
            }
            if wrap {
                if let Some(end) = self.writer.batch_end() {
                    unit.text.push('\n');
                    unit.text.push_str(end);
                }
            }
        }
        Ok(BatchCommand {
            units,
            copies: self.copies,
        })
    }
}
