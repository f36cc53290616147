use crate::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// An expression carrying ordering information inside ORDER BY.
#[derive(Debug, Clone)]
pub struct Ordered {
    pub order: Order,
    pub expression: Expr,
}

impl Ordered {
    pub fn asc(expression: Expr) -> Self {
        Self {
            order: Order::Asc,
            expression,
        }
    }
    pub fn desc(expression: Expr) -> Self {
        Self {
            order: Order::Desc,
            expression,
        }
    }
}
