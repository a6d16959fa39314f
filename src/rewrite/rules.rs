//! Rewrite rules - the transformation pipeline over a statement.
//!
//! Rules are applied in list order. The pipeline is idempotent:
//! once every semantic reference has a generated CTE and every
//! implicit join carries its condition, reapplying a rule changes
//! nothing.

use crate::mdl::AnalyzedMdl;
use sqlparser::ast::{
    self, Ident, JoinConstraint, JoinOperator, ObjectName, SelectItem, SetExpr, Statement,
    TableFactor, TableWithJoins,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use super::analyzer::{analyze_table_with_joins, implicit_join_condition};
use super::error::{RewriteError, RewriteResult};
use super::expand::{Expander, GeneratedCte};
use super::SessionContext;

/// A statement moving through the pipeline: the (possibly mutated)
/// AST plus the generated CTEs accumulated so far.
#[derive(Debug)]
pub struct RewrittenStatement {
    pub statement: Statement,
    pub ctes: Vec<GeneratedCte>,
}

impl RewrittenStatement {
    pub fn new(statement: Statement) -> Self {
        Self {
            statement,
            ctes: vec![],
        }
    }
}

/// A named rewrite step.
pub trait RewriteRule {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        statement: RewrittenStatement,
        ctx: &SessionContext,
        mdl: &AnalyzedMdl,
    ) -> RewriteResult<RewrittenStatement>;
}

/// The core rule: analyze every FROM item, generate a CTE for every
/// semantic reference (transitively, dependencies first), and fill
/// implicit join criteria from relationships.
pub struct SemanticCteRewrite;

impl RewriteRule for SemanticCteRewrite {
    fn name(&self) -> &'static str {
        "SemanticCteRewrite"
    }

    fn apply(
        &self,
        mut rewritten: RewrittenStatement,
        ctx: &SessionContext,
        mdl: &AnalyzedMdl,
    ) -> RewriteResult<RewrittenStatement> {
        // The query's own CTE names shadow semantic objects.
        let shadowed = top_level_cte_names(&rewritten.statement);

        // Find semantic references, stripping catalog/schema
        // qualification so they bind to the generated CTE names.
        let mut names: Vec<String> = Vec::new();
        for_each_from_item_mut(&mut rewritten.statement, &mut |twj| {
            resolve_factor(&mut twj.relation, ctx, mdl, &shadowed, &mut names);
            for join in &mut twj.joins {
                resolve_factor(&mut join.relation, ctx, mdl, &shadowed, &mut names);
            }
            Ok(())
        })?;
        if names.is_empty() {
            return Ok(rewritten);
        }

        // Validate relations and inject implicit join conditions.
        for_each_from_item_mut(&mut rewritten.statement, &mut |twj| {
            analyze_table_with_joins(twj, mdl)?;
            inject_implicit_joins(twj, mdl)
        })?;

        // Generate CTEs for everything not covered by a previous pass.
        let mut expander = Expander::new(mdl, ctx.dialect, ctx.enable_dynamic)
            .with_outer_statement(&rewritten.statement.to_string())?;
        for cte in &rewritten.ctes {
            expander.skip(cte.name());
        }
        for name in &shadowed {
            expander.skip(name);
        }
        for name in &names {
            expander.expand(name)?;
        }
        rewritten.ctes.extend(expander.into_ctes()?);
        Ok(rewritten)
    }
}

fn resolve_factor(
    factor: &mut TableFactor,
    ctx: &SessionContext,
    mdl: &AnalyzedMdl,
    shadowed: &[String],
    names: &mut Vec<String>,
) {
    if let TableFactor::Table { name, .. } = factor {
        if let Some(entity) = entity_name(name, ctx) {
            if mdl.is_semantic(&entity) && !shadowed.contains(&entity) {
                if !names.contains(&entity) {
                    names.push(entity.clone());
                }
                if name.0.len() > 1 {
                    *name = ObjectName(vec![Ident::new(entity)]);
                }
            }
        }
    }
}

/// The entity a table reference could name: a bare name, or one
/// qualified by the session's schema or catalog.schema.
fn entity_name(name: &ObjectName, ctx: &SessionContext) -> Option<String> {
    let parts: Vec<&str> = name.0.iter().map(|i| i.value.as_str()).collect();
    match parts.as_slice() {
        [entity] => Some(entity.to_string()),
        [schema, entity] if *schema == ctx.schema => Some(entity.to_string()),
        [catalog, schema, entity] if *catalog == ctx.catalog && *schema == ctx.schema => {
            Some(entity.to_string())
        }
        _ => None,
    }
}

fn inject_implicit_joins(twj: &mut TableWithJoins, mdl: &AnalyzedMdl) -> RewriteResult<()> {
    let mut left_name = factor_entity(&twj.relation);
    for join in &mut twj.joins {
        let right_name = factor_entity(&join.relation);
        if let Some(constraint) = join_constraint_mut(&mut join.join_operator) {
            if matches!(constraint, JoinConstraint::None) {
                if let (Some(left), Some(right)) = (&left_name, &right_name) {
                    if mdl.model(left).is_some() && mdl.model(right).is_some() {
                        let condition = implicit_join_condition(mdl, left, right)?;
                        let expr = Parser::new(&GenericDialect {})
                            .try_with_sql(&condition)?
                            .parse_expr()?;
                        *constraint = JoinConstraint::On(expr);
                    }
                }
            }
        }
        left_name = right_name;
    }
    Ok(())
}

fn factor_entity(factor: &TableFactor) -> Option<String> {
    match factor {
        TableFactor::Table { name, .. } => name.0.last().map(|i| i.value.clone()),
        _ => None,
    }
}

fn join_constraint_mut(operator: &mut JoinOperator) -> Option<&mut JoinConstraint> {
    match operator {
        JoinOperator::Inner(constraint)
        | JoinOperator::LeftOuter(constraint)
        | JoinOperator::RightOuter(constraint)
        | JoinOperator::FullOuter(constraint) => Some(constraint),
        _ => None,
    }
}

fn top_level_cte_names(statement: &Statement) -> Vec<String> {
    match statement {
        Statement::Query(query) => query
            .with
            .as_ref()
            .map(|with| {
                with.cte_tables
                    .iter()
                    .map(|cte| cte.alias.name.value.clone())
                    .collect()
            })
            .unwrap_or_default(),
        _ => vec![],
    }
}

// ---- AST walking ------------------------------------------------------

/// Visit every FROM item in a statement, innermost first.
fn for_each_from_item_mut<F>(statement: &mut Statement, f: &mut F) -> RewriteResult<()>
where
    F: FnMut(&mut TableWithJoins) -> RewriteResult<()>,
{
    match statement {
        Statement::Query(query) => walk_query(query, f),
        _ => Ok(()),
    }
}

fn walk_query<F>(query: &mut ast::Query, f: &mut F) -> RewriteResult<()>
where
    F: FnMut(&mut TableWithJoins) -> RewriteResult<()>,
{
    if let Some(with) = &mut query.with {
        for cte in &mut with.cte_tables {
            walk_query(&mut cte.query, f)?;
        }
    }
    walk_set_expr(&mut query.body, f)
}

fn walk_set_expr<F>(body: &mut SetExpr, f: &mut F) -> RewriteResult<()>
where
    F: FnMut(&mut TableWithJoins) -> RewriteResult<()>,
{
    match body {
        SetExpr::Select(select) => {
            for item in &mut select.projection {
                match item {
                    SelectItem::UnnamedExpr(expr)
                    | SelectItem::ExprWithAlias { expr, .. } => walk_expr(expr, f)?,
                    _ => {}
                }
            }
            for twj in &mut select.from {
                walk_table_with_joins(twj, f)?;
            }
            if let Some(selection) = &mut select.selection {
                walk_expr(selection, f)?;
            }
            if let Some(having) = &mut select.having {
                walk_expr(having, f)?;
            }
            Ok(())
        }
        SetExpr::Query(query) => walk_query(query, f),
        SetExpr::SetOperation { left, right, .. } => {
            walk_set_expr(left, f)?;
            walk_set_expr(right, f)
        }
        _ => Ok(()),
    }
}

fn walk_table_with_joins<F>(twj: &mut TableWithJoins, f: &mut F) -> RewriteResult<()>
where
    F: FnMut(&mut TableWithJoins) -> RewriteResult<()>,
{
    walk_factor(&mut twj.relation, f)?;
    for join in &mut twj.joins {
        walk_factor(&mut join.relation, f)?;
        if let Some(JoinConstraint::On(expr)) = join_constraint_mut(&mut join.join_operator) {
            walk_expr(expr, f)?;
        }
    }
    f(twj)
}

/// Descend into subquery-bearing expressions (EXISTS, IN, scalar
/// subqueries) so references inside them are visited too.
fn walk_expr<F>(expr: &mut ast::Expr, f: &mut F) -> RewriteResult<()>
where
    F: FnMut(&mut TableWithJoins) -> RewriteResult<()>,
{
    match expr {
        ast::Expr::Exists { subquery, .. } | ast::Expr::Subquery(subquery) => {
            walk_query(subquery, f)
        }
        ast::Expr::InSubquery { expr, subquery, .. } => {
            walk_expr(expr, f)?;
            walk_query(subquery, f)
        }
        ast::Expr::BinaryOp { left, right, .. } => {
            walk_expr(left, f)?;
            walk_expr(right, f)
        }
        ast::Expr::UnaryOp { expr, .. } | ast::Expr::Nested(expr) => walk_expr(expr, f),
        ast::Expr::IsNull(expr) | ast::Expr::IsNotNull(expr) => walk_expr(expr, f),
        ast::Expr::Between {
            expr, low, high, ..
        } => {
            walk_expr(expr, f)?;
            walk_expr(low, f)?;
            walk_expr(high, f)
        }
        ast::Expr::InList { expr, list, .. } => {
            walk_expr(expr, f)?;
            for item in list {
                walk_expr(item, f)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn walk_factor<F>(factor: &mut TableFactor, f: &mut F) -> RewriteResult<()>
where
    F: FnMut(&mut TableWithJoins) -> RewriteResult<()>,
{
    match factor {
        TableFactor::Derived { subquery, .. } => walk_query(subquery, f),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => walk_table_with_joins(table_with_joins, f),
        _ => Ok(()),
    }
}
