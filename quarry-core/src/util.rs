/// Writes `values` through `f` inserting `separator` between the items that
/// actually produced output.
pub fn separated_by<W, T, F>(out: &mut W, values: impl IntoIterator<Item = T>, mut f: F, separator: &str)
where
    W: SqlBuf + ?Sized,
    F: FnMut(&mut W, T),
{
    let mut len = out.buf_len();
    for v in values {
        if out.buf_len() > len {
            out.push_str(separator);
        }
        len = out.buf_len();
        f(out, v);
    }
}

/// Minimal growable SQL output target, implemented by both `String` and
/// `Statement` so the same rendering helpers serve templates and final text.
pub trait SqlBuf: std::fmt::Write {
    fn push_str(&mut self, value: &str);
    fn push(&mut self, value: char);
    fn buf_len(&self) -> usize;
}

impl SqlBuf for String {
    fn push_str(&mut self, value: &str) {
        String::push_str(self, value);
    }
    fn push(&mut self, value: char) {
        String::push(self, value);
    }
    fn buf_len(&self) -> usize {
        self.len()
    }
}

#[macro_export]
macro_rules! possibly_parenthesized {
    ($buff:ident, $cond:expr, $v:expr) => {
        if $cond {
            $buff.push('(');
            $v;
            $buff.push(')');
        } else {
            $v;
        }
    };
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            &$query[..::std::cmp::min($query.len(), 497)].trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}
