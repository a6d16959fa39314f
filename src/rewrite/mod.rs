//! Query rewriting - semantic SQL in, physical SQL out.
//!
//! [`rewrite`] parses a statement, runs it through the rule pipeline,
//! and emits one SQL string with a generated CTE for every semantic
//! reference. The engine is synchronous and stateless per call; one
//! [`AnalyzedMdl`](crate::mdl::AnalyzedMdl) is shared immutably across
//! concurrent rewrites.

pub mod analyzer;
pub mod emitter;
pub mod error;
pub mod expand;
pub mod rules;

pub use analyzer::{
    analyze_query, analyze_statement, analyze_table_factor, analyze_table_with_joins,
    AnalyzedColumn, ExprSource, QueryAnalysis, RelationAnalysis,
};
pub use error::{RewriteError, RewriteResult};
pub use expand::{Expander, GeneratedCte};
pub use rules::{RewriteRule, RewrittenStatement, SemanticCteRewrite};

use crate::mdl::AnalyzedMdl;
use crate::sql::Dialect;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Per-call rewrite settings.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub catalog: String,
    pub schema: String,
    /// When set, generated model CTEs project only the columns the
    /// outer statement references. Never changes rows or values.
    pub enable_dynamic: bool,
    pub dialect: Dialect,
}

impl SessionContext {
    pub fn new(catalog: &str, schema: &str) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            enable_dynamic: false,
            dialect: Dialect::default(),
        }
    }

    pub fn with_dynamic(mut self, enable_dynamic: bool) -> Self {
        self.enable_dynamic = enable_dynamic;
        self
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }
}

/// Rewrite one semantic SQL statement into physical SQL.
///
/// Rules run in list order; any error fails the whole call with no
/// SQL emitted.
pub fn rewrite(
    sql: &str,
    ctx: &SessionContext,
    mdl: &AnalyzedMdl,
    rules: &[&dyn RewriteRule],
) -> RewriteResult<String> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql)?;
    let mut statements = statements.into_iter();
    let statement = statements
        .next()
        .ok_or_else(|| RewriteError::Unsupported("empty statement".into()))?;
    if statements.next().is_some() {
        return Err(RewriteError::Unsupported(
            "expected a single statement".into(),
        ));
    }

    let mut rewritten = RewrittenStatement::new(statement);
    for rule in rules {
        rewritten = rule.apply(rewritten, ctx, mdl)?;
    }
    emitter::emit(&rewritten, ctx.dialect)
}
