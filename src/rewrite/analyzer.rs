//! Relation analysis - resolves FROM items against the MDL.
//!
//! Produces a [`RelationAnalysis`] tree for a FROM item: which
//! datasets it reads, what columns come out, and where each column
//! ultimately comes from. Lineage for metric and cumulative metric
//! references points through the expansion to the original physical
//! dataset, never to a generated CTE name.

use crate::mdl::AnalyzedMdl;
use crate::sql::JoinType;
use sqlparser::ast::{
    self, JoinConstraint, JoinOperator, SelectItem, SetExpr, Statement, TableFactor,
    TableWithJoins,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use super::error::{RewriteError, RewriteResult};
use super::expand::{entity_columns, physical_source};

/// Where an output column's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprSource {
    /// The SQL expression producing the column.
    pub expression: String,
    /// The physical dataset the expression ultimately reads from.
    pub source_dataset: String,
}

/// An output column of an analyzed relation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedColumn {
    pub name: String,
    pub type_name: Option<String>,
    /// Lineage; `None` for columns with no dataset origin (literals).
    pub source: Option<ExprSource>,
}

/// Analysis of one SELECT within a query body.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAnalysis {
    pub columns: Vec<AnalyzedColumn>,
    pub relation: Option<Box<RelationAnalysis>>,
}

/// Analysis of a FROM item.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationAnalysis {
    /// A direct table reference: a model or a physical passthrough.
    Table {
        table_name: String,
        alias: Option<String>,
        columns: Vec<AnalyzedColumn>,
    },
    /// A join of two relations.
    Join {
        join_kind: JoinType,
        alias: Option<String>,
        left: Box<RelationAnalysis>,
        right: Box<RelationAnalysis>,
        /// Join condition SQL; implicit joins carry the resolved
        /// relationship condition.
        criteria: Option<String>,
        expr_sources: Vec<ExprSource>,
    },
    /// A subquery: an inline derived table, or a metric, cumulative
    /// metric, or view reference (one entry per SELECT in a
    /// set-operation chain).
    Subquery {
        alias: Option<String>,
        body: Vec<QueryAnalysis>,
    },
}

impl RelationAnalysis {
    /// Output columns of this relation, joins flattened left-first.
    pub fn output_columns(&self) -> Vec<&AnalyzedColumn> {
        match self {
            RelationAnalysis::Table { columns, .. } => columns.iter().collect(),
            RelationAnalysis::Join { left, right, .. } => {
                let mut columns = left.output_columns();
                columns.extend(right.output_columns());
                columns
            }
            RelationAnalysis::Subquery { body, .. } => body
                .first()
                .map(|q| q.columns.iter().collect())
                .unwrap_or_default(),
        }
    }
}

/// Analyze a statement. Only queries carry relations to analyze.
pub fn analyze_statement(
    statement: &Statement,
    mdl: &AnalyzedMdl,
) -> RewriteResult<Vec<QueryAnalysis>> {
    match statement {
        Statement::Query(query) => analyze_query(query, mdl),
        _ => Err(RewriteError::Unsupported(
            "only queries are analyzed".into(),
        )),
    }
}

/// Analyze a query body: one [`QueryAnalysis`] per SELECT in its
/// set-operation chain.
pub fn analyze_query(query: &ast::Query, mdl: &AnalyzedMdl) -> RewriteResult<Vec<QueryAnalysis>> {
    let mut analyses = Vec::new();
    collect_set_expr(&query.body, mdl, &mut analyses)?;
    Ok(analyses)
}

fn collect_set_expr(
    set_expr: &SetExpr,
    mdl: &AnalyzedMdl,
    out: &mut Vec<QueryAnalysis>,
) -> RewriteResult<()> {
    match set_expr {
        SetExpr::Select(select) => {
            out.push(analyze_select(select, mdl)?);
            Ok(())
        }
        SetExpr::Query(query) => {
            out.extend(analyze_query(query, mdl)?);
            Ok(())
        }
        SetExpr::SetOperation { left, right, .. } => {
            collect_set_expr(left, mdl, out)?;
            collect_set_expr(right, mdl, out)
        }
        SetExpr::Values(_) => {
            out.push(QueryAnalysis {
                columns: vec![],
                relation: None,
            });
            Ok(())
        }
        _ => Err(RewriteError::Unsupported(
            "unsupported query body".into(),
        )),
    }
}

fn analyze_select(select: &ast::Select, mdl: &AnalyzedMdl) -> RewriteResult<QueryAnalysis> {
    let relation = match select.from.len() {
        0 => None,
        _ => {
            // Comma-separated FROM items analyze as a cross join chain.
            let mut analysis = analyze_table_with_joins(&select.from[0], mdl)?;
            for item in &select.from[1..] {
                let right = analyze_table_with_joins(item, mdl)?;
                analysis = join_node(JoinType::Cross, analysis, right, None);
            }
            Some(Box::new(analysis))
        }
    };

    let mut columns = Vec::new();
    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) => {
                columns.push(projected_column(expr, None, relation.as_deref()));
            }
            SelectItem::ExprWithAlias { expr, alias } => {
                columns.push(projected_column(expr, Some(alias.value.clone()), relation.as_deref()));
            }
            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(_, _) => {
                if let Some(relation) = &relation {
                    columns.extend(relation.output_columns().into_iter().cloned());
                }
            }
        }
    }

    Ok(QueryAnalysis { columns, relation })
}

fn projected_column(
    expr: &ast::Expr,
    alias: Option<String>,
    relation: Option<&RelationAnalysis>,
) -> AnalyzedColumn {
    let referenced = match expr {
        ast::Expr::Identifier(ident) => Some(ident.value.clone()),
        ast::Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.clone()),
        _ => None,
    };

    let resolved = referenced.as_ref().and_then(|name| {
        relation.and_then(|r| {
            r.output_columns()
                .into_iter()
                .find(|c| c.name == *name)
                .cloned()
        })
    });

    let name = alias
        .or(referenced)
        .unwrap_or_else(|| expr.to_string());

    match resolved {
        Some(column) => AnalyzedColumn { name, ..column },
        None => AnalyzedColumn {
            name,
            type_name: None,
            source: None,
        },
    }
}

/// Analyze a FROM item with its joins, building a left-deep tree.
///
/// Joins with omitted criteria resolve through the unique relationship
/// connecting the two sides; zero or multiple matches fail.
pub fn analyze_table_with_joins(
    twj: &TableWithJoins,
    mdl: &AnalyzedMdl,
) -> RewriteResult<RelationAnalysis> {
    let mut analysis = analyze_table_factor(&twj.relation, mdl)?;
    for join in &twj.joins {
        let right = analyze_table_factor(&join.relation, mdl)?;
        let (join_kind, criteria) = match &join.join_operator {
            JoinOperator::Inner(constraint) => {
                (JoinType::Inner, resolve_criteria(constraint, &analysis, &right, mdl)?)
            }
            JoinOperator::LeftOuter(constraint) => {
                (JoinType::Left, resolve_criteria(constraint, &analysis, &right, mdl)?)
            }
            JoinOperator::RightOuter(constraint) => {
                (JoinType::Right, resolve_criteria(constraint, &analysis, &right, mdl)?)
            }
            JoinOperator::FullOuter(constraint) => {
                (JoinType::Full, resolve_criteria(constraint, &analysis, &right, mdl)?)
            }
            JoinOperator::CrossJoin => (JoinType::Cross, None),
            other => {
                return Err(RewriteError::Unsupported(format!(
                    "unsupported join operator: {:?}",
                    other
                )))
            }
        };
        analysis = join_node(join_kind, analysis, right, criteria);
    }
    Ok(analysis)
}

fn join_node(
    join_kind: JoinType,
    left: RelationAnalysis,
    right: RelationAnalysis,
    criteria: Option<String>,
) -> RelationAnalysis {
    let mut expr_sources = Vec::new();
    for column in left.output_columns().iter().chain(right.output_columns().iter()) {
        if let Some(source) = &column.source {
            expr_sources.push(source.clone());
        }
    }
    RelationAnalysis::Join {
        join_kind,
        alias: None,
        left: Box::new(left),
        right: Box::new(right),
        criteria,
        expr_sources,
    }
}

fn resolve_criteria(
    constraint: &JoinConstraint,
    left: &RelationAnalysis,
    right: &RelationAnalysis,
    mdl: &AnalyzedMdl,
) -> RewriteResult<Option<String>> {
    match constraint {
        JoinConstraint::On(expr) => Ok(Some(expr.to_string())),
        JoinConstraint::Using(columns) => Ok(Some(format!(
            "USING ({})",
            columns
                .iter()
                .map(|c| c.value.clone())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
        JoinConstraint::Natural => Ok(None),
        // Implicit criteria resolve through a relationship when both
        // sides are models; physical tables pass through untouched.
        JoinConstraint::None => match (rightmost_table_name(left), rightmost_table_name(right)) {
            (Some(l), Some(r)) if mdl.model(l).is_some() && mdl.model(r).is_some() => {
                implicit_join_condition(mdl, l, r).map(Some)
            }
            _ => Ok(None),
        },
    }
}

/// The unique relationship condition connecting two models.
pub fn implicit_join_condition(
    mdl: &AnalyzedMdl,
    left: &str,
    right: &str,
) -> RewriteResult<String> {
    let relationships = mdl.relationships_between(left, right);
    if relationships.len() == 1 {
        Ok(relationships[0].condition.clone())
    } else {
        Err(RewriteError::AmbiguousImplicitJoin {
            left: left.to_string(),
            right: right.to_string(),
            found: relationships.len(),
        })
    }
}

fn rightmost_table_name(analysis: &RelationAnalysis) -> Option<&str> {
    match analysis {
        RelationAnalysis::Table { table_name, .. } => Some(table_name),
        RelationAnalysis::Join { right, .. } => rightmost_table_name(right),
        RelationAnalysis::Subquery { .. } => None,
    }
}

/// Analyze a single FROM factor.
pub fn analyze_table_factor(
    factor: &TableFactor,
    mdl: &AnalyzedMdl,
) -> RewriteResult<RelationAnalysis> {
    match factor {
        TableFactor::Table { name, alias, .. } => {
            let alias = alias.as_ref().map(|a| a.name.value.clone());
            let table_name = object_name(name);
            let entity = name.0.last().map(|i| i.value.clone()).unwrap_or_default();
            analyze_named_relation(&table_name, &entity, alias, mdl)
        }
        TableFactor::Derived {
            subquery, alias, ..
        } => Ok(RelationAnalysis::Subquery {
            alias: alias.as_ref().map(|a| a.name.value.clone()),
            body: analyze_query(subquery, mdl)?,
        }),
        TableFactor::NestedJoin {
            table_with_joins,
            alias,
        } => {
            let mut analysis = analyze_table_with_joins(table_with_joins, mdl)?;
            if let Some(alias) = alias {
                set_alias(&mut analysis, alias.name.value.clone());
            }
            Ok(analysis)
        }
        other => Err(RewriteError::Unsupported(format!(
            "unsupported FROM item: {}",
            other
        ))),
    }
}

fn analyze_named_relation(
    table_name: &str,
    entity: &str,
    alias: Option<String>,
    mdl: &AnalyzedMdl,
) -> RewriteResult<RelationAnalysis> {
    if mdl.model(entity).is_some() {
        let columns = semantic_columns(mdl, entity);
        Ok(RelationAnalysis::Table {
            table_name: entity.to_string(),
            alias,
            columns,
        })
    } else if mdl.metric(entity).is_some() || mdl.cumulative_metric(entity).is_some() {
        // Expanded into a generated subquery; lineage points through
        // to the physical dataset.
        let columns = semantic_columns(mdl, entity);
        Ok(RelationAnalysis::Subquery {
            alias,
            body: vec![QueryAnalysis {
                columns,
                relation: None,
            }],
        })
    } else if let Some(view) = mdl.view(entity) {
        let statements = Parser::parse_sql(&GenericDialect {}, &view.statement)?;
        let query = statements
            .iter()
            .find_map(|s| match s {
                Statement::Query(q) => Some(q),
                _ => None,
            })
            .ok_or_else(|| {
                RewriteError::Unsupported(format!("view {} is not a query", entity))
            })?;
        Ok(RelationAnalysis::Subquery {
            alias,
            body: analyze_query(query, mdl)?,
        })
    } else {
        // Unknown names pass through as physical tables.
        Ok(RelationAnalysis::Table {
            table_name: table_name.to_string(),
            alias,
            columns: vec![],
        })
    }
}

fn set_alias(analysis: &mut RelationAnalysis, value: String) {
    match analysis {
        RelationAnalysis::Table { alias, .. }
        | RelationAnalysis::Join { alias, .. }
        | RelationAnalysis::Subquery { alias, .. } => *alias = Some(value),
    }
}

fn semantic_columns(mdl: &AnalyzedMdl, entity: &str) -> Vec<AnalyzedColumn> {
    let source_dataset = physical_source(mdl, entity);
    entity_columns(mdl, entity)
        .unwrap_or_default()
        .into_iter()
        .map(|c| AnalyzedColumn {
            name: c.name,
            type_name: Some(c.type_name),
            source: Some(ExprSource {
                expression: c.expression,
                source_dataset: source_dataset.clone(),
            }),
        })
        .collect()
}

fn object_name(name: &ast::ObjectName) -> String {
    name.0
        .iter()
        .map(|i| i.value.clone())
        .collect::<Vec<_>>()
        .join(".")
}
