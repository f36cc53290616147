#[cfg(test)]
mod tests {
    use indoc::indoc;
    use quarry::{
        BinaryOpType, ColumnDef, ColumnRef, Command, Error, Expr, GenericSqlWriter, Insert,
        JoinType, Select, SetOp, SqlBuilder, Statement, StatementKind, TableRef, TableSource,
        Value, analyze, writer::Context,
    };

    const WRITER: GenericSqlWriter = GenericSqlWriter::new();

    fn render(expr: &Expr) -> String {
        let builder = SqlBuilder::new(&WRITER);
        let mut out = Statement::new(StatementKind::Select);
        builder
            .write_expr(expr, &mut out, Context::default())
            .unwrap();
        out.text()
    }

    #[test]
    fn simple_select() {
        let mut select = Select::new(TableRef::new("Book"));
        select.projection = vec![Expr::column("Title"), Expr::column("Pages")];
        select.condition = Some(Expr::equal(
            Expr::column("Title"),
            Expr::constant("Dune"),
        ));
        let statement = SqlBuilder::new(&WRITER).build_select(&select).unwrap();
        assert_eq!(
            statement.text(),
            indoc! {r#"
                SELECT "Title", "Pages"
                FROM "Book"
                WHERE "Title" = 'Dune'
            "#}
            .trim()
        );
    }

    #[test]
    fn precedence_parenthesizes_weaker_operands() {
        let expr = Expr::and(
            Expr::binary(
                BinaryOpType::Or,
                Expr::column("a"),
                Expr::column("b"),
            ),
            Expr::column("c"),
        );
        assert_eq!(render(&expr), r#"("a" OR "b") AND "c""#);

        let expr = Expr::binary(
            BinaryOpType::Multiplication,
            Expr::binary(BinaryOpType::Addition, Expr::column("a"), Expr::column("b")),
            Expr::column("c"),
        );
        assert_eq!(render(&expr), r#"("a" + "b") * "c""#);

        // Equal-strength operands on the left stay bare.
        let expr = Expr::binary(
            BinaryOpType::Addition,
            Expr::binary(BinaryOpType::Subtraction, Expr::column("a"), Expr::column("b")),
            Expr::column("c"),
        );
        assert_eq!(render(&expr), r#""a" - "b" + "c""#);
    }

    #[test]
    fn conditional_renders_as_case() {
        let expr = Expr::Conditional {
            condition: Box::new(Expr::binary(
                BinaryOpType::Greater,
                Expr::column("Pages"),
                Expr::constant(500),
            )),
            then_value: Box::new(Expr::constant("long")),
            else_value: Box::new(Expr::constant("short")),
        };
        assert_eq!(
            render(&expr),
            r#"CASE WHEN "Pages" > 500 THEN 'long' ELSE 'short' END"#
        );
    }

    #[test]
    fn cast_is_elided_when_implicit() {
        let explicit = Expr::Cast {
            arg: Box::new(Expr::column("Pages")),
            ty: Value::Int64(None),
        };
        assert_eq!(render(&explicit), r#"CAST("Pages" AS BIGINT)"#);
        let implicit = Expr::Cast {
            arg: Box::new(Expr::column("Pages")),
            ty: Value::Varchar(None),
        };
        assert_eq!(render(&implicit), r#""Pages""#);
    }

    #[test]
    fn unknown_function_is_a_translation_error() {
        let builder = SqlBuilder::new(&WRITER);
        let mut out = Statement::new(StatementKind::Select);
        let result = builder.write_expr(
            &Expr::call("FROBNICATE", vec![Expr::column("a")]),
            &mut out,
            Context::default(),
        );
        assert!(matches!(result, Err(Error::Translation { .. })));
    }

    #[test]
    fn joined_tables_render_after_their_parent() {
        let mut select = Select::new(TableRef::new("Author"));
        select.from = vec![
            TableSource::joined(
                TableRef::new("Review"),
                1,
                JoinType::Default,
                Expr::equal(
                    Expr::Column(ColumnRef::qualified("Review", "BookId")),
                    Expr::Column(ColumnRef::qualified("Book", "Id")),
                ),
            ),
            TableSource::joined(
                TableRef::new("Book"),
                2,
                JoinType::Default,
                Expr::equal(
                    Expr::Column(ColumnRef::qualified("Book", "AuthorId")),
                    Expr::Column(ColumnRef::qualified("Author", "Id")),
                ),
            ),
            TableSource::new(TableRef::new("Author")),
        ];
        let statement = SqlBuilder::new(&WRITER).build_select(&select).unwrap();
        assert_eq!(
            statement.text(),
            indoc! {r#"
                SELECT *
                FROM "Author" JOIN "Book" ON "Book"."AuthorId" = "Author"."Id" JOIN "Review" ON "Review"."BookId" = "Book"."Id"
            "#}
            .trim()
        );
    }

    #[test]
    fn cyclic_join_graph_does_not_converge() {
        let mut select = Select::new(TableRef::new("A"));
        select.from = vec![
            TableSource::joined(
                TableRef::new("A"),
                1,
                JoinType::Default,
                Expr::constant(true),
            ),
            TableSource::joined(
                TableRef::new("B"),
                0,
                JoinType::Default,
                Expr::constant(true),
            ),
        ];
        let result = SqlBuilder::new(&WRITER).build_select(&select);
        assert!(matches!(result, Err(Error::Convergence { .. })));
    }

    #[test]
    fn self_joined_table_does_not_converge() {
        let mut select = Select::new(TableRef::new("A"));
        select.from = vec![TableSource::joined(
            TableRef::new("A"),
            0,
            JoinType::Default,
            Expr::constant(true),
        )];
        let result = SqlBuilder::new(&WRITER).build_select(&select);
        assert!(matches!(result, Err(Error::Convergence { .. })));
    }

    #[test]
    fn untyped_columns_report_every_mapping_failure() {
        let column = |name: &'static str, value: Value| ColumnDef {
            column_ref: ColumnRef::new(name),
            value,
            ..Default::default()
        };
        let insert = Insert {
            table: TableRef::new("Book"),
            columns: vec![
                column("Edition", Value::Null),
                column("Title", Value::Varchar(None)),
                column("Printing", Value::Null),
            ],
            values: vec![
                Expr::constant(1),
                Expr::constant("Dune"),
                Expr::constant(2),
            ],
            generated_key: None,
        };
        match SqlBuilder::new(&WRITER).build_insert(&insert) {
            Err(Error::Aggregate { count, details }) => {
                assert_eq!(count, 2);
                assert!(details.contains("Edition"));
                assert!(details.contains("Printing"));
            }
            other => panic!("expected an aggregate failure, got {:?}", other),
        }

        let single = Insert {
            table: TableRef::new("Book"),
            columns: vec![column("Edition", Value::Null)],
            values: vec![Expr::constant(1)],
            generated_key: None,
        };
        let result = SqlBuilder::new(&WRITER).build_insert(&single);
        assert!(matches!(result, Err(Error::TypeMapping { .. })));
    }

    #[test]
    fn set_operations_chain_selects() {
        let mut first = Select::new(TableRef::new("Book"));
        first.projection = vec![Expr::column("Title")];
        let mut second = Select::new(TableRef::new("Magazine"));
        second.projection = vec![Expr::column("Title")];
        first.set_ops = vec![(SetOp::UnionAll, second)];
        let statement = SqlBuilder::new(&WRITER).build_select(&first).unwrap();
        assert_eq!(
            statement.text(),
            indoc! {r#"
                SELECT "Title"
                FROM "Book"
                UNION ALL
                SELECT "Title"
                FROM "Magazine"
            "#}
            .trim()
        );
    }

    #[test]
    fn paging_slots_become_placeholders() {
        let mut select = Select::new(TableRef::new("Book"));
        select.order_by = vec![quarry::Ordered::asc(Expr::column("Title"))];
        select.limit = Some(Expr::constant(10));
        select.offset = Some(Expr::constant(20));
        let shape = analyze(&Command::select(select)).unwrap();
        let statement = SqlBuilder::new(&WRITER).build(&shape.command).unwrap();
        assert_eq!(statement.placeholders().len(), 2);
        assert_eq!(
            statement.to_string(),
            indoc! {r#"
                SELECT *
                FROM "Book"
                ORDER BY "Title" ASC
                LIMIT {0}
                OFFSET {1}
            "#}
            .trim()
        );
    }

    #[test]
    fn locking_clause_is_appended() {
        let mut select = Select::new(TableRef::new("Book"));
        select.locking = true;
        let statement = SqlBuilder::new(&WRITER).build_select(&select).unwrap();
        assert_eq!(
            statement.text(),
            indoc! {r#"
                SELECT *
                FROM "Book"
                FOR UPDATE
            "#}
            .trim()
        );
    }

    #[test]
    fn subquery_is_parenthesized() {
        let mut inner = Select::new(TableRef::new("Author"));
        inner.projection = vec![Expr::column("Id")];
        let expr = Expr::binary(
            BinaryOpType::In,
            Expr::column("AuthorId"),
            Expr::Subquery(Box::new(inner)),
        );
        assert_eq!(
            render(&expr),
            "\"AuthorId\" IN (SELECT \"Id\"\nFROM \"Author\")"
        );
    }
}
