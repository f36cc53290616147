mod analyzer;
mod batch;
mod builder;
mod cache;
mod column;
mod command;
mod compiler;
mod error;
mod eval;
mod expr;
mod placeholder;
mod record;
mod statement;
mod table_ref;
mod util;
mod value;
pub mod writer;

pub use analyzer::*;
pub use batch::*;
pub use builder::*;
pub use cache::*;
pub use column::*;
pub use command::*;
pub use compiler::*;
pub use error::*;
pub use eval::*;
pub use expr::*;
pub use placeholder::*;
pub use record::*;
pub use statement::*;
pub use table_ref::*;
pub use util::*;
pub use value::*;
pub use writer::{BinaryOpParts, CallTemplate, GenericSqlWriter, SqlWriter};
