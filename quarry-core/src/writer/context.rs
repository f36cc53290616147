/// Fragment of a statement currently being rendered, lets dialects adjust
/// syntax by position (alias declaration, string escaping, ORDER BY forms).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    #[default]
    None,
    StringLiteral,
    Casting,
    SqlSelect,
    SqlSelectFrom,
    SqlSelectWhere,
    SqlSelectGroupBy,
    SqlSelectHaving,
    SqlSelectOrderBy,
    SqlSelectLimit,
    SqlJoin,
    SqlSetOperation,
    SqlInsertInto,
    SqlInsertIntoValues,
    SqlInsertReturning,
    SqlUpdate,
    SqlUpdateSet,
    SqlUpdateWhere,
    SqlDeleteFrom,
    SqlDeleteFromWhere,
}

/// Rendering state handed down through writer calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub fragment: Fragment,
    pub qualify_columns: bool,
}

impl Context {
    pub fn new(fragment: Fragment, qualify_columns: bool) -> Self {
        Self {
            fragment,
            qualify_columns,
        }
    }
    pub fn switch_fragment(self, fragment: Fragment) -> Self {
        Self { fragment, ..self }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(Fragment::None, true)
    }
}
