#[cfg(test)]
mod tests {
    use indoc::indoc;
    use quarry::{
        Batch, BatchConfig, BoundStatement, ColumnDef, ColumnRef, Error, GenericSqlWriter,
        ParamDirection, ParameterCopy, Record, RecordSet, TableRef, Value,
    };

    const WRITER: GenericSqlWriter = GenericSqlWriter::new();

    fn varchar_column(name: &'static str) -> ColumnDef {
        ColumnDef {
            column_ref: ColumnRef::new(name),
            value: Value::Varchar(None),
            ..Default::default()
        }
    }

    fn key_column(name: &'static str) -> ColumnDef {
        ColumnDef {
            column_ref: ColumnRef::new(name),
            value: Value::Int64(None),
            auto_generated: true,
            ..Default::default()
        }
    }

    fn author_and_book(records: &mut RecordSet) -> (quarry::RecordId, quarry::RecordId) {
        let author = records.add(
            Record::insert(TableRef::new("Author"))
                .with_value(varchar_column("Name"), "Herbert")
                .with_generated_key(key_column("Id")),
        );
        let book = records.add(
            Record::insert(TableRef::new("Book"))
                .with_value(varchar_column("Title"), "Dune")
                .with_key_of(key_column("AuthorId"), author),
        );
        (author, book)
    }

    #[test]
    fn generated_key_flows_within_one_unit() {
        let mut records = RecordSet::new();
        let (author, book) = author_and_book(&mut records);
        let mut batch = Batch::new(&WRITER, BatchConfig::default());
        batch.add_records(&mut records, [author, book]).unwrap();
        let command = batch.finish(true).unwrap();

        assert_eq!(command.units.len(), 1);
        assert!(command.copies.is_empty());
        let unit = &command.units[0];
        assert_eq!(
            unit.text,
            indoc! {r#"
                BEGIN;
                INSERT INTO "Author" ("Name") VALUES (:p0_0) RETURNING "Id" INTO :p0_1;
                INSERT INTO "Book" ("Title", "AuthorId") VALUES (:p0_2, :p0_1);
                COMMIT;
            "#}
            .trim()
        );
        assert_eq!(unit.parameters.len(), 3);
        assert_eq!(unit.parameters[0].value, Value::Varchar(Some("Herbert".into())));
        assert_eq!(unit.parameters[1].direction, ParamDirection::Output);
        assert_eq!(unit.parameters[2].value, Value::Varchar(Some("Dune".into())));
    }

    #[test]
    fn generated_key_crosses_units_as_a_copy() {
        let mut records = RecordSet::new();
        let (author, book) = author_and_book(&mut records);
        let mut batch = Batch::new(
            &WRITER,
            BatchConfig {
                max_statements_per_command: 1,
                ..Default::default()
            },
        );
        batch.add_records(&mut records, [author, book]).unwrap();
        let command = batch.finish(false).unwrap();

        assert_eq!(command.units.len(), 2);
        assert_eq!(
            command.units[0].text,
            r#"INSERT INTO "Author" ("Name") VALUES (:p0_0) RETURNING "Id" INTO :p0_1;"#
        );
        assert_eq!(
            command.units[1].text,
            r#"INSERT INTO "Book" ("Title", "AuthorId") VALUES (:p1_0, :p1_1);"#
        );
        assert_eq!(
            command.copies,
            vec![ParameterCopy {
                from_unit: 0,
                from_name: "p0_1".into(),
                to_unit: 1,
                to_name: "p1_1".into(),
            }]
        );
    }

    #[test]
    fn referencing_an_unadded_record_is_a_sequencing_error() {
        let mut records = RecordSet::new();
        let (_, book) = author_and_book(&mut records);
        let mut batch = Batch::new(&WRITER, BatchConfig::default());
        let result = batch.add_record(&mut records, book);
        assert!(matches!(result, Err(Error::Sequencing { .. })));
    }

    #[test]
    fn literals_are_inlined_on_request() {
        let mut records = RecordSet::new();
        let author = records.add(
            Record::insert(TableRef::new("Author"))
                .with_value(varchar_column("Name"), "Herbert")
                .with_value(varchar_column("Motto"), Option::<String>::None),
        );
        let mut batch = Batch::new(
            &WRITER,
            BatchConfig {
                prefer_literals: true,
                ..Default::default()
            },
        );
        batch.add_record(&mut records, author).unwrap();
        let command = batch.finish(false).unwrap();
        assert_eq!(
            command.units[0].text,
            r#"INSERT INTO "Author" ("Name", "Motto") VALUES ('Herbert', NULL);"#
        );
        assert!(command.units[0].parameters.is_empty());
    }

    #[test]
    fn long_values_bind_even_when_literals_are_preferred() {
        let long_text = "x".repeat(5000);
        let column = ColumnDef {
            requires_param_for_long: true,
            ..varchar_column("Body")
        };
        let batch = Batch::new(
            &WRITER,
            BatchConfig {
                prefer_literals: true,
                ..Default::default()
            },
        );
        assert!(!batch.can_use_literal(
            Some(&column),
            &Value::Varchar(Some(long_text.clone()))
        ));

        let mut records = RecordSet::new();
        let post = records.add(
            Record::insert(TableRef::new("Post")).with_value(column, long_text.clone()),
        );
        let mut batch = Batch::new(
            &WRITER,
            BatchConfig {
                prefer_literals: true,
                ..Default::default()
            },
        );
        batch.add_record(&mut records, post).unwrap();
        let command = batch.finish(false).unwrap();
        assert_eq!(
            command.units[0].text,
            r#"INSERT INTO "Post" ("Body") VALUES (:p0_0);"#
        );
        assert_eq!(
            command.units[0].parameters[0].value,
            Value::Varchar(Some(long_text))
        );
    }

    #[test]
    fn nulls_render_as_literals_in_default_mode() {
        let mut records = RecordSet::new();
        let author = records.add(
            Record::insert(TableRef::new("Author"))
                .with_value(varchar_column("Motto"), Option::<String>::None),
        );
        let mut batch = Batch::new(&WRITER, BatchConfig::default());
        batch.add_record(&mut records, author).unwrap();
        let command = batch.finish(false).unwrap();
        assert_eq!(
            command.units[0].text,
            r#"INSERT INTO "Author" ("Motto") VALUES (NULL);"#
        );
    }

    #[test]
    fn updates_and_deletes_target_by_key() {
        let mut records = RecordSet::new();
        let update = records.add(
            Record::update(TableRef::new("Book"), ColumnRef::new("Id"), 7i64)
                .with_value(varchar_column("Title"), "Revised"),
        );
        let delete = records.add(Record::delete(
            TableRef::new("Book"),
            ColumnRef::new("Id"),
            9i64,
        ));
        let mut batch = Batch::new(&WRITER, BatchConfig::default());
        batch.add_records(&mut records, [update, delete]).unwrap();
        let command = batch.finish(false).unwrap();
        assert_eq!(
            command.units[0].text,
            indoc! {r#"
                UPDATE "Book" SET "Title" = :p0_0 WHERE "Id" = :p0_1;
                DELETE FROM "Book" WHERE "Id" = :p0_2;
            "#}
            .trim()
        );
        assert_eq!(command.units[0].parameters[1].value, Value::Int64(Some(7)));
        assert_eq!(command.units[0].parameters[2].value, Value::Int64(Some(9)));
    }

    #[test]
    fn bound_queries_join_the_batch() {
        let mut batch = Batch::new(&WRITER, BatchConfig::default());
        batch
            .add_query(&BoundStatement {
                text: r#"SELECT * FROM "Book" WHERE "Id" = ? AND "Note" = 'a?b'"#.into(),
                parameters: vec![Value::Int64(Some(3))],
            })
            .unwrap();
        let command = batch.finish(false).unwrap();
        assert_eq!(
            command.units[0].text,
            r#"SELECT * FROM "Book" WHERE "Id" = :p0_0 AND "Note" = 'a?b';"#
        );
        assert_eq!(command.units[0].parameters[0].value, Value::Int64(Some(3)));
    }

    #[test]
    fn markers_inside_quoted_identifiers_are_preserved() {
        let mut batch = Batch::new(&WRITER, BatchConfig::default());
        batch
            .add_query(&BoundStatement {
                text: r#"SELECT "odd?name" FROM "Book" WHERE "Id" = ?"#.into(),
                parameters: vec![Value::Int64(Some(3))],
            })
            .unwrap();
        let command = batch.finish(false).unwrap();
        assert_eq!(
            command.units[0].text,
            r#"SELECT "odd?name" FROM "Book" WHERE "Id" = :p0_0;"#
        );
        assert_eq!(command.units[0].parameters.len(), 1);
    }

    #[test]
    fn marker_and_parameter_counts_must_agree() {
        let mut batch = Batch::new(&WRITER, BatchConfig::default());
        let result = batch.add_query(&BoundStatement {
            text: "SELECT ?".into(),
            parameters: vec![],
        });
        assert!(matches!(result, Err(Error::Binding(..))));
    }

    #[test]
    fn single_statement_batch_is_not_wrapped() {
        let mut records = RecordSet::new();
        let author = records.add(
            Record::insert(TableRef::new("Author"))
                .with_value(varchar_column("Name"), "Herbert"),
        );
        let mut batch = Batch::new(&WRITER, BatchConfig::default());
        batch.add_record(&mut records, author).unwrap();
        let command = batch.finish(true).unwrap();
        assert_eq!(
            command.units[0].text,
            r#"INSERT INTO "Author" ("Name") VALUES (:p0_0);"#
        );
    }
}
