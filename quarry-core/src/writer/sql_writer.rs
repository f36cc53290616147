use crate::{
    BinaryOpType, ColumnRef, JoinType, SetOp, SqlBuf, TableRef, UnaryOpType, Value, separated_by,
    writer::{Context, Fragment},
};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}
macro_rules! write_float {
    ($this:ident, $context:ident, $out:ident, $value:expr) => {{
        if $value.is_infinite() {
            $this.write_value_infinity($context, $out, $value.is_sign_negative());
        } else if $value.is_nan() {
            $this.write_value_nan($context, $out);
        } else {
            let mut buffer = ryu::Buffer::new();
            $out.push_str(buffer.format($value));
        }
    }};
}

/// Rendering recipe for a binary operator: `prefix lhs infix rhs suffix`.
///
/// The parenthesized flags mark sides already delimited by the template
/// itself so precedence handling never adds a second pair.
#[derive(Debug, Clone, Copy)]
pub struct BinaryOpParts {
    pub prefix: &'static str,
    pub infix: &'static str,
    pub suffix: &'static str,
    pub lhs_parenthesized: bool,
    pub rhs_parenthesized: bool,
}

impl BinaryOpParts {
    const fn infix(infix: &'static str) -> Self {
        Self {
            prefix: "",
            infix,
            suffix: "",
            lhs_parenthesized: false,
            rhs_parenthesized: false,
        }
    }
}

/// Rendering recipe for a function call: `prefix arg, arg, ... suffix`.
#[derive(Debug, Clone)]
pub struct CallTemplate {
    pub prefix: String,
    pub separator: &'static str,
    pub suffix: &'static str,
}

/// Dialect provider converting semantic constructs into concrete SQL text.
///
/// The fragment builder queries this trait for everything that varies by
/// backend; it never implements syntax itself. Template lookups return
/// `Option` so a missing operator or function surfaces as a translation
/// error instead of silently broken SQL.
pub trait SqlWriter: Send + Sync {
    fn as_dyn(&self) -> &dyn SqlWriter;

    /// Whether the current fragment context allows alias declaration.
    fn alias_declaration(&self, context: &Context) -> bool {
        matches!(context.fragment, Fragment::SqlSelectFrom | Fragment::SqlJoin)
    }

    /// Escape occurrences of `search` char with `replace` while copying into
    /// the buffer.
    fn write_escaped(
        &self,
        _context: &Context,
        out: &mut dyn SqlBuf,
        value: &str,
        search: char,
        replace: &str,
    ) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + 1;
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier_quoted(&self, context: &Context, out: &mut dyn SqlBuf, value: &str) {
        out.push('"');
        self.write_escaped(context, out, value, '"', "\"\"");
        out.push('"');
    }

    /// Render a table reference, declaring the alias only where the context
    /// allows it and referring through the alias elsewhere.
    fn write_table_ref(&self, context: &Context, out: &mut dyn SqlBuf, value: &TableRef) {
        if self.alias_declaration(context) || value.alias.is_empty() {
            if !value.schema.is_empty() {
                self.write_identifier_quoted(context, out, &value.schema);
                out.push('.');
            }
            self.write_identifier_quoted(context, out, &value.name);
        }
        if !value.alias.is_empty() {
            if self.alias_declaration(context) {
                out.push(' ');
            }
            out.push_str(&value.alias);
        }
    }

    /// Render a column reference optionally qualifying with schema/table.
    fn write_column_ref(&self, context: &Context, out: &mut dyn SqlBuf, value: &ColumnRef) {
        if context.qualify_columns && !value.table.is_empty() {
            if !value.schema.is_empty() {
                self.write_identifier_quoted(context, out, &value.schema);
                out.push('.');
            }
            self.write_identifier_quoted(context, out, &value.table);
            out.push('.');
        }
        self.write_identifier_quoted(context, out, &value.name);
    }

    /// Database type for a `Value` prototype, `None` when the dialect has no
    /// corresponding type (reported as a type-mapping model error).
    fn column_type_of(&self, value: &Value) -> Option<String> {
        Some(match value {
            Value::Boolean(..) => "BOOLEAN".into(),
            Value::Int8(..) => "TINYINT".into(),
            Value::Int16(..) => "SMALLINT".into(),
            Value::Int32(..) => "INTEGER".into(),
            Value::Int64(..) => "BIGINT".into(),
            Value::UInt8(..) => "UTINYINT".into(),
            Value::UInt16(..) => "USMALLINT".into(),
            Value::UInt32(..) => "UINTEGER".into(),
            Value::UInt64(..) => "UBIGINT".into(),
            Value::Float32(..) => "FLOAT".into(),
            Value::Float64(..) => "DOUBLE".into(),
            Value::Decimal(.., precision, scale) => {
                if (precision, scale) != (&0, &0) {
                    format!("DECIMAL({},{})", precision, scale)
                } else {
                    "DECIMAL".into()
                }
            }
            Value::Varchar(..) => "VARCHAR".into(),
            Value::Blob(..) => "BLOB".into(),
            Value::Date(..) => "DATE".into(),
            Value::Time(..) => "TIME".into(),
            Value::Timestamp(..) => "TIMESTAMP".into(),
            Value::TimestampWithTimezone(..) => "TIMESTAMPTZ".into(),
            Value::Uuid(..) => "UUID".into(),
            Value::List(.., inner) => format!("{}[]", self.column_type_of(inner)?),
            Value::Null => return None,
        })
    }

    /// Render a concrete value (including proper quoting / escaping).
    fn write_value(&self, context: &Context, out: &mut dyn SqlBuf, value: &Value) {
        match value {
            v if v.is_null() => self.write_value_none(context, out),
            Value::Boolean(Some(v), ..) => self.write_value_bool(context, out, *v),
            Value::Int8(Some(v), ..) => write_integer!(out, *v),
            Value::Int16(Some(v), ..) => write_integer!(out, *v),
            Value::Int32(Some(v), ..) => write_integer!(out, *v),
            Value::Int64(Some(v), ..) => write_integer!(out, *v),
            Value::UInt8(Some(v), ..) => write_integer!(out, *v),
            Value::UInt16(Some(v), ..) => write_integer!(out, *v),
            Value::UInt32(Some(v), ..) => write_integer!(out, *v),
            Value::UInt64(Some(v), ..) => write_integer!(out, *v),
            Value::Float32(Some(v), ..) => write_float!(self, context, out, *v),
            Value::Float64(Some(v), ..) => write_float!(self, context, out, *v),
            Value::Decimal(Some(v), ..) => drop(write!(out, "{}", v)),
            Value::Varchar(Some(v), ..) => self.write_value_string(context, out, v),
            Value::Blob(Some(v), ..) => self.write_value_blob(context, out, v.as_ref()),
            Value::Date(Some(v), ..) => self.write_value_date(context, out, v, false),
            Value::Time(Some(v), ..) => self.write_value_time(context, out, v, false),
            Value::Timestamp(Some(v), ..) => self.write_value_timestamp(context, out, v),
            Value::TimestampWithTimezone(Some(v), ..) => {
                self.write_value_timestamptz(context, out, v)
            }
            Value::Uuid(Some(v), ..) => drop(write!(out, "'{}'", v)),
            Value::List(Some(v), ..) => self.write_value_list(context, out, v),
            _ => {
                log::error!("Cannot write {:?}", value);
            }
        };
    }

    /// Render NULL literal.
    fn write_value_none(&self, _context: &Context, out: &mut dyn SqlBuf) {
        out.push_str("NULL");
    }

    /// Render boolean literal.
    fn write_value_bool(&self, _context: &Context, out: &mut dyn SqlBuf, value: bool) {
        out.push_str(["false", "true"][value as usize]);
    }

    /// Render +/- INF via CAST for dialect portability.
    fn write_value_infinity(&self, _context: &Context, out: &mut dyn SqlBuf, negative: bool) {
        out.push_str(if negative {
            "CAST('-inf' AS DOUBLE)"
        } else {
            "CAST('inf' AS DOUBLE)"
        });
    }

    /// Render NaN via CAST for dialect portability.
    fn write_value_nan(&self, _context: &Context, out: &mut dyn SqlBuf) {
        out.push_str("CAST('nan' AS DOUBLE)");
    }

    /// Render and escape a string literal using single quotes.
    fn write_value_string(&self, context: &Context, out: &mut dyn SqlBuf, value: &str) {
        let (delim, escaped) = if context.fragment != Fragment::StringLiteral {
            ('\'', "''")
        } else {
            ('"', r#"\""#)
        };
        out.push(delim);
        let mut pos = 0;
        for (i, c) in value.char_indices() {
            if c == delim {
                out.push_str(&value[pos..i]);
                out.push_str(escaped);
                pos = i + 1;
            } else if c == '\n' {
                out.push_str(&value[pos..i]);
                out.push_str("\\n");
                pos = i + 1;
            }
        }
        out.push_str(&value[pos..]);
        out.push(delim);
    }

    /// Render a blob literal using hex notation.
    fn write_value_blob(&self, _context: &Context, out: &mut dyn SqlBuf, value: &[u8]) {
        out.push_str("X'");
        out.push_str(&hex::encode_upper(value));
        out.push('\'');
    }

    /// Render a DATE literal (optionally as part of TIMESTAMP composition).
    fn write_value_date(&self, _context: &Context, out: &mut dyn SqlBuf, value: &Date, timestamp: bool) {
        let b = if timestamp { "" } else { "'" };
        let _ = write!(
            out,
            "{b}{:04}-{:02}-{:02}{b}",
            value.year(),
            value.month() as u8,
            value.day()
        );
    }

    /// Render a TIME literal (optionally as part of TIMESTAMP composition).
    fn write_value_time(&self, _context: &Context, out: &mut dyn SqlBuf, value: &Time, timestamp: bool) {
        let mut subsecond = value.nanosecond();
        let mut width = 9;
        while width > 1 && subsecond % 10 == 0 {
            subsecond /= 10;
            width -= 1;
        }
        let b = if timestamp { "" } else { "'" };
        let _ = write!(
            out,
            "{b}{:02}:{:02}:{:02}.{:0width$}{b}",
            value.hour(),
            value.minute(),
            value.second(),
            subsecond
        );
    }

    /// Render a TIMESTAMP literal.
    fn write_value_timestamp(&self, context: &Context, out: &mut dyn SqlBuf, value: &PrimitiveDateTime) {
        out.push('\'');
        self.write_value_date(context, out, &value.date(), true);
        out.push('T');
        self.write_value_time(context, out, &value.time(), true);
        out.push('\'');
    }

    /// Render a TIMESTAMPTZ literal.
    fn write_value_timestamptz(&self, context: &Context, out: &mut dyn SqlBuf, value: &OffsetDateTime) {
        let date_time = value.to_utc();
        self.write_value_timestamp(
            context,
            out,
            &PrimitiveDateTime::new(date_time.date(), date_time.time()),
        );
    }

    /// Render list literal.
    fn write_value_list(&self, context: &Context, out: &mut dyn SqlBuf, value: &[Value]) {
        out.push('[');
        separated_by(
            out,
            value,
            |out, v| {
                self.write_value(context, out, v);
            },
            ",",
        );
        out.push(']');
    }

    /// Longest value the dialect accepts as an inline literal.
    fn max_literal_len(&self) -> usize {
        4000
    }

    /// Render the positional parameter marker.
    fn write_parameter_marker(&self, _context: &Context, out: &mut dyn SqlBuf, _index: usize) {
        out.push('?');
    }

    /// Render a named parameter reference.
    fn write_named_parameter(&self, out: &mut dyn SqlBuf, name: &str) {
        out.push(':');
        out.push_str(name);
    }

    /// Precedence table for unary operators.
    fn expression_unary_op_precedence(&self, value: &UnaryOpType) -> i32 {
        match value {
            UnaryOpType::Negative => 1250,
            UnaryOpType::Not => 250,
        }
    }

    /// Precedence table for binary operators.
    fn expression_binary_op_precedence(&self, value: &BinaryOpType) -> i32 {
        match value {
            BinaryOpType::Or => 100,
            BinaryOpType::And => 200,
            BinaryOpType::Equal => 300,
            BinaryOpType::NotEqual => 300,
            BinaryOpType::Less => 300,
            BinaryOpType::Greater => 300,
            BinaryOpType::LessEqual => 300,
            BinaryOpType::GreaterEqual => 300,
            BinaryOpType::Is => 400,
            BinaryOpType::IsNot => 400,
            BinaryOpType::Like => 400,
            BinaryOpType::NotLike => 400,
            BinaryOpType::In => 400,
            BinaryOpType::NotIn => 400,
            BinaryOpType::BitwiseOr => 500,
            BinaryOpType::BitwiseAnd => 600,
            BinaryOpType::ShiftLeft => 700,
            BinaryOpType::ShiftRight => 700,
            BinaryOpType::Concat => 750,
            BinaryOpType::Subtraction => 800,
            BinaryOpType::Addition => 800,
            BinaryOpType::Multiplication => 900,
            BinaryOpType::Division => 900,
            BinaryOpType::Remainder => 900,
            BinaryOpType::Indexing => 1000,
        }
    }

    /// Rendering template for a binary operator, `None` when the dialect has
    /// no syntax for it.
    fn expression_binary_op_parts(&self, op: &BinaryOpType) -> Option<BinaryOpParts> {
        Some(match op {
            BinaryOpType::Indexing => BinaryOpParts {
                prefix: "",
                infix: "[",
                suffix: "]",
                lhs_parenthesized: false,
                rhs_parenthesized: true,
            },
            BinaryOpType::Multiplication => BinaryOpParts::infix(" * "),
            BinaryOpType::Division => BinaryOpParts::infix(" / "),
            BinaryOpType::Remainder => BinaryOpParts::infix(" % "),
            BinaryOpType::Addition => BinaryOpParts::infix(" + "),
            BinaryOpType::Subtraction => BinaryOpParts::infix(" - "),
            BinaryOpType::ShiftLeft => BinaryOpParts::infix(" << "),
            BinaryOpType::ShiftRight => BinaryOpParts::infix(" >> "),
            BinaryOpType::BitwiseAnd => BinaryOpParts::infix(" & "),
            BinaryOpType::BitwiseOr => BinaryOpParts::infix(" | "),
            BinaryOpType::Is => BinaryOpParts::infix(" IS "),
            BinaryOpType::IsNot => BinaryOpParts::infix(" IS NOT "),
            BinaryOpType::Like => BinaryOpParts::infix(" LIKE "),
            BinaryOpType::NotLike => BinaryOpParts::infix(" NOT LIKE "),
            BinaryOpType::In => BinaryOpParts::infix(" IN "),
            BinaryOpType::NotIn => BinaryOpParts::infix(" NOT IN "),
            BinaryOpType::Equal => BinaryOpParts::infix(" = "),
            BinaryOpType::NotEqual => BinaryOpParts::infix(" != "),
            BinaryOpType::Less => BinaryOpParts::infix(" < "),
            BinaryOpType::LessEqual => BinaryOpParts::infix(" <= "),
            BinaryOpType::Greater => BinaryOpParts::infix(" > "),
            BinaryOpType::GreaterEqual => BinaryOpParts::infix(" >= "),
            BinaryOpType::And => BinaryOpParts::infix(" AND "),
            BinaryOpType::Or => BinaryOpParts::infix(" OR "),
            BinaryOpType::Concat => BinaryOpParts::infix(" || "),
        })
    }

    /// Rendering template for a unary operator.
    fn expression_unary_op_prefix(&self, op: &UnaryOpType) -> Option<&'static str> {
        Some(match op {
            UnaryOpType::Negative => "-",
            UnaryOpType::Not => "NOT ",
        })
    }

    /// Rendering template for a function call, `None` when the dialect does
    /// not know the function.
    fn call_template(&self, function: &str) -> Option<CallTemplate> {
        const KNOWN: &[&str] = &[
            "ABS", "AVG", "COALESCE", "COUNT", "LENGTH", "LOWER", "MAX", "MIN", "ROUND", "SUBSTRING",
            "SUM", "TRIM", "UPPER",
        ];
        let upper = function.to_ascii_uppercase();
        if !KNOWN.contains(&upper.as_str()) {
            return None;
        }
        Some(CallTemplate {
            prefix: format!("{upper}("),
            separator: ", ",
            suffix: ")",
        })
    }

    /// Whether converting to `target` needs an explicit CAST; conversions the
    /// backend performs implicitly are elided.
    fn requires_explicit_cast(&self, target: &Value) -> bool {
        !matches!(target, Value::Varchar(..))
    }

    /// Set operator text for multi-set selects.
    fn set_operator_text(&self, op: &SetOp) -> &'static str {
        match op {
            SetOp::Union => "UNION",
            SetOp::UnionAll => "UNION ALL",
            SetOp::Intersect => "INTERSECT",
            SetOp::Except => "EXCEPT",
        }
    }

    /// Render join keyword(s) for the given join type.
    fn write_join_type(&self, _context: &Context, out: &mut dyn SqlBuf, join_type: &JoinType) {
        out.push_str(match join_type {
            JoinType::Default => "JOIN",
            JoinType::Inner => "INNER JOIN",
            JoinType::Outer => "FULL OUTER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Cross => "CROSS JOIN",
        })
    }

    /// Locking clause appended to selects requesting it.
    fn locking_clause(&self) -> &'static str {
        "FOR UPDATE"
    }

    /// BEGIN statement text.
    fn transaction_begin(&self) -> &'static str {
        "BEGIN;"
    }

    /// COMMIT statement text.
    fn transaction_commit(&self) -> &'static str {
        "COMMIT;"
    }

    /// Optional wrapper opening a multi-statement batch.
    fn batch_begin(&self) -> Option<&'static str> {
        None
    }

    /// Optional wrapper closing a multi-statement batch.
    fn batch_end(&self) -> Option<&'static str> {
        None
    }

    /// Render the clause returning a generated key into a named parameter.
    fn write_insert_returning(
        &self,
        context: &Context,
        out: &mut dyn SqlBuf,
        column: &ColumnRef,
        param: &str,
    ) {
        out.push_str(" RETURNING ");
        self.write_identifier_quoted(context, out, &column.name);
        out.push_str(" INTO ");
        self.write_named_parameter(out, param);
    }
}

/// Fallback generic SQL writer (closest to PostgreSQL / DuckDB conventions).
pub struct GenericSqlWriter;
impl GenericSqlWriter {
    pub const fn new() -> Self {
        Self {}
    }
}
impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}
