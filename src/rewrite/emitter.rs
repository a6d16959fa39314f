//! SQL emission - serialize a rewritten statement to one SQL string.
//!
//! Pure projection: generated CTEs (already in dependency order) are
//! merged ahead of any CTEs the input query carried, then the
//! statement body follows. No semantic validation happens here.

use crate::sql::Dialect;
use sqlparser::ast::Statement;
use std::collections::HashSet;

use super::error::{RewriteError, RewriteResult};
use super::rules::RewrittenStatement;

/// Serialize the statement with its generated CTEs.
pub fn emit(rewritten: &RewrittenStatement, dialect: Dialect) -> RewriteResult<String> {
    if rewritten.ctes.is_empty() {
        return Ok(rewritten.statement.to_string());
    }

    let mut statement = rewritten.statement.clone();
    let query = match &mut statement {
        Statement::Query(query) => query,
        _ => {
            return Err(RewriteError::Unsupported(
                "generated CTEs require a query statement".into(),
            ))
        }
    };
    let user_with = query.with.take();

    let mut recursive = rewritten.ctes.iter().any(|cte| cte.is_recursive());
    let mut seen = HashSet::new();
    let mut rendered = Vec::new();
    for cte in &rewritten.ctes {
        if seen.insert(cte.name().to_string()) {
            rendered.push(cte.render(dialect));
        }
    }
    if let Some(with) = user_with {
        recursive = recursive || with.recursive;
        for cte in &with.cte_tables {
            if seen.insert(cte.alias.name.value.clone()) {
                rendered.push(cte.to_string());
            }
        }
    }

    let keyword = if recursive { "WITH RECURSIVE" } else { "WITH" };
    Ok(format!("{} {}\n{}", keyword, rendered.join(",\n"), query))
}
