#[cfg(test)]
mod tests {
    use quarry::{
        BinaryOpType, Command, CommandAst, Expr, Select, TableRef, analyze,
    };

    fn book_by_title(parameter: &str) -> Command {
        let mut select = Select::new(TableRef::new("Book"));
        select.projection = vec![Expr::column("Title"), Expr::column("Pages")];
        select.condition = Some(Expr::equal(
            Expr::column("Title"),
            Expr::parameter(parameter.to_owned()),
        ));
        Command::select(select)
    }

    #[test]
    fn parameter_filter_is_excised() {
        let shape = analyze(&book_by_title("title")).unwrap();
        assert_eq!(shape.locals.len(), 1);
        assert!(matches!(shape.locals[0], Expr::Parameter(..)));
        assert_eq!(shape.externals.len(), 1);
        assert_eq!(shape.externals[0].name, "title");
        let CommandAst::Select(select) = &shape.command.ast else {
            panic!("expected a select");
        };
        let Some(Expr::Binary { rhs, .. }) = &select.condition else {
            panic!("expected a binary condition");
        };
        assert!(matches!(**rhs, Expr::LocalSlot { index: 0, list: false }));
    }

    #[test]
    fn key_ignores_parameter_identity() {
        let a = analyze(&book_by_title("a")).unwrap();
        let b = analyze(&book_by_title("b")).unwrap();
        assert_eq!(a.key, b.key);
    }

    #[test]
    fn key_distinguishes_shape() {
        let base = analyze(&book_by_title("title")).unwrap();
        let mut other = Select::new(TableRef::new("Author"));
        other.projection = vec![Expr::column("Title"), Expr::column("Pages")];
        other.condition = Some(Expr::equal(
            Expr::column("Title"),
            Expr::parameter("title"),
        ));
        let other = analyze(&Command::select(other)).unwrap();
        assert_ne!(base.key, other.key);

        let mut operator = Select::new(TableRef::new("Book"));
        operator.projection = vec![Expr::column("Title"), Expr::column("Pages")];
        operator.condition = Some(Expr::binary(
            BinaryOpType::NotEqual,
            Expr::column("Title"),
            Expr::parameter("title"),
        ));
        let operator = analyze(&Command::select(operator)).unwrap();
        assert_ne!(base.key, operator.key);
    }

    #[test]
    fn paging_counts_share_one_key() {
        let mut first = Select::new(TableRef::new("Book"));
        first.limit = Some(Expr::constant(10));
        first.offset = Some(Expr::constant(0));
        let mut second = Select::new(TableRef::new("Book"));
        second.limit = Some(Expr::constant(20));
        second.offset = Some(Expr::constant(40));
        let first = analyze(&Command::select(first)).unwrap();
        let second = analyze(&Command::select(second)).unwrap();
        assert_eq!(first.key, second.key);
        assert!(first.key.tokens().iter().any(|t| &**t == "LIMIT?"));
        assert!(first.key.tokens().iter().any(|t| &**t == "OFFSET?"));
        // Both counts became locals even though they are constants.
        assert_eq!(first.locals.len(), 2);
    }

    #[test]
    fn constant_arithmetic_folds() {
        let mut select = Select::new(TableRef::new("Book"));
        select.condition = Some(Expr::binary(
            BinaryOpType::Greater,
            Expr::column("Pages"),
            Expr::binary(
                BinaryOpType::Multiplication,
                Expr::binary(BinaryOpType::Addition, Expr::constant(2), Expr::constant(3)),
                Expr::constant(10),
            ),
        ));
        let shape = analyze(&Command::select(select)).unwrap();
        assert!(shape.locals.is_empty());
        let CommandAst::Select(select) = &shape.command.ast else {
            panic!("expected a select");
        };
        let Some(Expr::Binary { rhs, .. }) = &select.condition else {
            panic!("expected a binary condition");
        };
        assert!(
            matches!(&**rhs, Expr::Constant(v) if *v == quarry::Value::Int64(Some(50)))
        );
    }

    #[test]
    fn collection_of_parameters_is_one_list_local() {
        let mut select = Select::new(TableRef::new("Book"));
        select.condition = Some(Expr::binary(
            BinaryOpType::In,
            Expr::column("Id"),
            Expr::Collection(vec![Expr::parameter("a"), Expr::parameter("b")]),
        ));
        let shape = analyze(&Command::select(select)).unwrap();
        assert_eq!(shape.locals.len(), 1);
        assert!(matches!(shape.locals[0], Expr::Collection(..)));
        assert_eq!(shape.externals.len(), 2);
        let CommandAst::Select(select) = &shape.command.ast else {
            panic!("expected a select");
        };
        let Some(Expr::Binary { rhs, .. }) = &select.condition else {
            panic!("expected a binary condition");
        };
        assert!(matches!(**rhs, Expr::LocalSlot { index: 0, list: true }));
    }

    #[test]
    fn external_parameters_deduplicate() {
        let mut select = Select::new(TableRef::new("Book"));
        select.condition = Some(Expr::and(
            Expr::equal(Expr::column("Author"), Expr::parameter("who")),
            Expr::equal(Expr::column("Editor"), Expr::parameter("who")),
        ));
        let shape = analyze(&Command::select(select)).unwrap();
        assert_eq!(shape.externals.len(), 1);
        assert_eq!(shape.locals.len(), 2);
    }

    #[test]
    fn lambda_binders_stay_in_the_query() {
        let mut select = Select::new(TableRef::new("Book"));
        select.condition = Some(Expr::equal(
            Expr::Lambda {
                params: vec!["row".into()],
                body: Box::new(Expr::Member {
                    base: Box::new(Expr::parameter("row")),
                    member: "Title".into(),
                }),
            },
            Expr::parameter("title"),
        ));
        let shape = analyze(&Command::select(select)).unwrap();
        // The binder-rooted member access is part of the shape, only the
        // external filter value was captured.
        assert_eq!(shape.locals.len(), 1);
        assert_eq!(shape.externals.len(), 1);
        assert_eq!(shape.externals[0].name, "title");
        assert!(shape.key.tokens().iter().any(|t| &**t == "P:row"));
    }

    #[test]
    fn member_chain_off_external_is_one_local() {
        let mut select = Select::new(TableRef::new("Book"));
        select.condition = Some(Expr::equal(
            Expr::column("OwnerId"),
            Expr::Member {
                base: Box::new(Expr::parameter("user")),
                member: "id".into(),
            },
        ));
        let shape = analyze(&Command::select(select)).unwrap();
        assert_eq!(shape.locals.len(), 1);
        assert!(matches!(shape.locals[0], Expr::Member { .. }));
    }

    #[test]
    fn set_operations_contribute_to_the_key() {
        let mut plain = Select::new(TableRef::new("Book"));
        plain.projection = vec![Expr::column("Title")];
        let mut with_union = plain.clone();
        let mut second = Select::new(TableRef::new("Magazine"));
        second.projection = vec![Expr::column("Title")];
        with_union.set_ops = vec![(quarry::SetOp::Union, second)];
        let plain = analyze(&Command::select(plain)).unwrap();
        let with_union = analyze(&Command::select(with_union)).unwrap();
        assert_ne!(plain.key, with_union.key);
    }
}
