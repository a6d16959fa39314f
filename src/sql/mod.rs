//! SQL generation - token-based SQL construction with dialect support.
//!
//! The rewrite pipeline builds generated query fragments (model CTEs,
//! metric rollups, date spines) with the [`Query`] builder and serializes
//! them through a [`Dialect`], so every identifier and literal is quoted
//! the way the target engine expects.

pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;

pub use dialect::{Dialect, SqlDialect};
pub use expr::{Expr, ExprExt};
pub use query::{Cte, Join, JoinType, Query, SelectExpr, SetOperation, TableRef};
pub use token::{Token, TokenStream};
