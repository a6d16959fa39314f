//! Metric expansion - turns semantic references into CTEs.
//!
//! Each model, metric, cumulative metric, or view referenced by a
//! query becomes a CTE named exactly after the entity, so FROM
//! references bind without rewriting the statement body. Expansion
//! runs in two passes: a collect pass resolves the dependency graph
//! (validating cycles, windows, and ref columns), then a generate
//! pass builds CTE bodies in dependency order.

use crate::mdl::{
    is_temporal_type, AnalyzedMdl, Column, CumulativeMetric, DateSpine, Measure, Metric, Model,
};
use crate::sql::expr::{col, func, lit_date, lit_int, raw_sql, table_col};
use crate::sql::{Cte, Dialect, Expr, ExprExt, JoinType, Query, SelectExpr, SqlDialect, TableRef};
use chrono::NaiveDate;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::ParserError;
use sqlparser::tokenizer::{Token as SqlToken, Tokenizer};
use std::collections::{HashMap, HashSet};

use super::error::{RewriteError, RewriteResult};

/// Name of the shared recursive calendar CTE.
pub const SPINE_CTE: &str = "__date_spine";

/// A CTE produced by expansion.
#[derive(Debug, Clone)]
pub enum GeneratedCte {
    /// A built query body.
    Query(Cte),
    /// A view statement passed through verbatim.
    RawStatement { name: String, sql: String },
}

impl GeneratedCte {
    pub fn name(&self) -> &str {
        match self {
            GeneratedCte::Query(cte) => &cte.name,
            GeneratedCte::RawStatement { name, .. } => name,
        }
    }

    pub fn is_recursive(&self) -> bool {
        matches!(self, GeneratedCte::Query(cte) if cte.recursive)
    }

    /// Render as `name AS (body)` for the given dialect.
    pub fn render(&self, dialect: Dialect) -> String {
        match self {
            GeneratedCte::Query(cte) => cte.to_tokens_for_dialect(dialect).serialize(dialect),
            GeneratedCte::RawStatement { name, sql } => {
                format!("{} AS (\n{}\n)", dialect.quote_identifier(name), sql)
            }
        }
    }
}

/// Expands semantic references into generated CTEs.
pub struct Expander<'a> {
    mdl: &'a AnalyzedMdl,
    dialect: Dialect,
    enable_dynamic: bool,
    /// Words (identifiers and keywords) of the outer statement,
    /// used as the keep-set for dynamic projection pruning.
    outer_words: HashSet<String>,
    outer_wildcard: bool,
    /// Columns each entity's dependents reference on it.
    required: HashMap<String, HashSet<String>>,
    /// Entities in dependency-first order.
    order: Vec<String>,
    done: HashSet<String>,
    /// Chain of names currently being expanded, for cycle detection.
    chain: Vec<String>,
    spine: Option<DateSpine>,
}

impl<'a> Expander<'a> {
    pub fn new(mdl: &'a AnalyzedMdl, dialect: Dialect, enable_dynamic: bool) -> Self {
        Self {
            mdl,
            dialect,
            enable_dynamic,
            outer_words: HashSet::new(),
            outer_wildcard: false,
            required: HashMap::new(),
            order: vec![],
            done: HashSet::new(),
            chain: vec![],
            spine: None,
        }
    }

    /// Seed the pruning keep-set from the outer statement's SQL.
    pub fn with_outer_statement(mut self, sql: &str) -> RewriteResult<Self> {
        let (words, wildcard) = sql_words(sql)?;
        self.outer_words = words;
        self.outer_wildcard = wildcard;
        Ok(self)
    }

    /// Mark an entity as already expanded in a previous pass, so it
    /// is not generated again.
    pub fn skip(&mut self, name: &str) {
        self.done.insert(name.to_string());
    }

    /// Collect an entity and its transitive dependencies.
    pub fn expand(&mut self, name: &str) -> RewriteResult<()> {
        if self.done.contains(name) {
            return Ok(());
        }
        if self.chain.iter().any(|n| n == name) {
            let mut cycle = self.chain.clone();
            cycle.push(name.to_string());
            return Err(RewriteError::ReferenceCycle(cycle.join(" -> ")));
        }
        self.chain.push(name.to_string());
        let collected = self.collect(name);
        self.chain.pop();
        collected?;
        self.done.insert(name.to_string());
        self.order.push(name.to_string());
        Ok(())
    }

    /// Generate all collected CTEs, dependencies first.
    pub fn into_ctes(mut self) -> RewriteResult<Vec<GeneratedCte>> {
        let mut ctes = Vec::new();
        if let Some(spine) = self.spine.take() {
            ctes.push(self.spine_cte(&spine));
        }
        let order = std::mem::take(&mut self.order);
        for name in &order {
            self.generate(name, &mut ctes)?;
        }
        Ok(ctes)
    }

    // ---- collect pass -------------------------------------------------

    fn collect(&mut self, name: &str) -> RewriteResult<()> {
        let mdl = self.mdl;
        if let Some(model) = mdl.model(name) {
            match (&model.ref_sql, &model.base_object) {
                (Some(_), _) => Ok(()),
                (None, Some(base)) => {
                    let base = base.clone();
                    if !mdl.is_semantic(&base) {
                        return Err(RewriteError::UnresolvedReference(base));
                    }
                    let words = columns_words(&model.columns)?;
                    self.require(&base, words);
                    self.expand(&base)
                }
                (None, None) => Err(RewriteError::Unsupported(format!(
                    "model {} has neither refSql nor baseObject",
                    name
                ))),
            }
        } else if let Some(metric) = mdl.metric(name) {
            let base = metric.base_object.clone();
            if !mdl.is_semantic(&base) {
                return Err(RewriteError::UnresolvedReference(base));
            }
            let columns: Vec<Column> = metric.output_columns().cloned().collect();
            let words = columns_words(&columns)?;
            self.require(&base, words);
            self.expand(&base)
        } else if let Some(metric) = mdl.cumulative_metric(name) {
            let metric = metric.clone();
            self.collect_cumulative(&metric)
        } else if let Some(view) = mdl.view(name) {
            let (words, _) = sql_words(&view.statement)?;
            let deps: Vec<String> = words
                .iter()
                .filter(|w| w.as_str() != name && mdl.is_semantic(w))
                .cloned()
                .collect();
            for dep in deps {
                self.require(&dep, words.clone());
                self.expand(&dep)?;
            }
            Ok(())
        } else {
            Err(RewriteError::UnresolvedReference(name.to_string()))
        }
    }

    fn collect_cumulative(&mut self, metric: &CumulativeMetric) -> RewriteResult<()> {
        let mdl = self.mdl;
        let base = metric.base_object.clone();
        if !mdl.is_semantic(&base) {
            return Err(RewriteError::UnresolvedReference(base));
        }

        let spine = mdl
            .manifest()
            .date_spine
            .as_ref()
            .ok_or_else(|| RewriteError::MissingDateSpine(metric.name.clone()))?
            .clone();
        parse_date(&spine.start)?;
        parse_date(&spine.end)?;

        let window = &metric.window;
        parse_date(&window.start)?;
        parse_date(&window.end)?;
        if window.time_unit < spine.unit {
            return Err(RewriteError::WindowTooFine {
                window: window.time_unit,
                spine: spine.unit,
            });
        }

        let base_columns = entity_columns(mdl, &base).ok_or_else(|| {
            RewriteError::Unsupported(format!(
                "cumulative metric {} over view {}",
                metric.name, base
            ))
        })?;
        let ref_column = base_columns
            .iter()
            .find(|c| c.name == window.ref_column)
            .ok_or_else(|| {
                RewriteError::UnresolvedReference(format!("{}.{}", base, window.ref_column))
            })?;
        if !is_temporal_type(&ref_column.type_name) {
            return Err(RewriteError::InvalidWindowRefColumn);
        }

        let mut words = HashSet::from([window.ref_column.clone()]);
        let (measure_words, _) = sql_words(&metric.measure.ref_column)?;
        words.extend(measure_words);
        self.require(&base, words);
        self.spine = Some(spine);
        self.expand(&base)
    }

    fn require(&mut self, entity: &str, columns: HashSet<String>) {
        self.required
            .entry(entity.to_string())
            .or_default()
            .extend(columns);
    }

    // ---- generate pass ------------------------------------------------

    fn generate(&self, name: &str, out: &mut Vec<GeneratedCte>) -> RewriteResult<()> {
        let mdl = self.mdl;
        if let Some(model) = mdl.model(name) {
            out.push(self.model_cte(model));
        } else if let Some(metric) = mdl.metric(name) {
            out.push(self.metric_cte(metric));
        } else if let Some(metric) = mdl.cumulative_metric(name) {
            let spine = mdl
                .manifest()
                .date_spine
                .as_ref()
                .ok_or_else(|| RewriteError::MissingDateSpine(name.to_string()))?;
            self.cumulative_ctes(metric, spine, out)?;
        } else if let Some(view) = mdl.view(name) {
            out.push(GeneratedCte::RawStatement {
                name: view.name.clone(),
                sql: view.statement.clone(),
            });
        }
        Ok(())
    }

    fn spine_cte(&self, spine: &DateSpine) -> GeneratedCte {
        let column = spine.column();
        let seed = Query::new().select(vec![lit_date(&spine.start).alias(column)]);
        let step_expr = self
            .dialect
            .date_step(spine.unit, &self.dialect.quote_identifier(column));
        let step = Query::new()
            .select(vec![SelectExpr::new(raw_sql(&step_expr))])
            .from(TableRef::new(SPINE_CTE))
            .filter(col(column).lt(lit_date(&spine.end)));
        GeneratedCte::Query(
            Cte::recursive(SPINE_CTE, seed.union_all(step)).with_columns(vec![column]),
        )
    }

    fn model_cte(&self, model: &Model) -> GeneratedCte {
        let select: Vec<SelectExpr> = self
            .pruned_columns(model)
            .into_iter()
            .map(projection)
            .collect();
        let from = match (&model.ref_sql, &model.base_object) {
            (Some(ref_sql), _) => TableRef::derived(ref_sql).with_alias(&model.name),
            (None, Some(base)) => TableRef::new(base),
            // Rejected during the collect pass.
            (None, None) => TableRef::new(&model.name),
        };
        GeneratedCte::Query(Cte::new(&model.name, Query::new().select(select).from(from)))
    }

    /// Visible columns of a model, pruned to the keep-set in dynamic
    /// mode. Pruning never breaks references: a column is dropped only
    /// when neither the outer statement nor any dependent CTE mentions
    /// its name, and a wildcard anywhere disables pruning entirely.
    fn pruned_columns<'m>(&self, model: &'m Model) -> Vec<&'m Column> {
        let visible: Vec<&Column> = model.visible_columns().collect();
        if !self.enable_dynamic || self.outer_wildcard {
            return visible;
        }
        let required = self.required.get(&model.name);
        let kept: Vec<&Column> = visible
            .iter()
            .copied()
            .filter(|c| {
                contains_ci(&self.outer_words, &c.name)
                    || required.is_some_and(|words| contains_ci(words, &c.name))
            })
            .collect();
        if kept.is_empty() {
            visible
        } else {
            kept
        }
    }

    fn metric_cte(&self, metric: &Metric) -> GeneratedCte {
        let select: Vec<SelectExpr> = metric.output_columns().map(projection).collect();
        let group_by: Vec<Expr> = (1..=metric.dimension.len() as i64).map(lit_int).collect();
        let query = Query::new()
            .select(select)
            .from(TableRef::new(&metric.base_object))
            .group_by(group_by);
        GeneratedCte::Query(Cte::new(&metric.name, query))
    }

    fn cumulative_ctes(
        &self,
        metric: &CumulativeMetric,
        spine: &DateSpine,
        out: &mut Vec<GeneratedCte>,
    ) -> RewriteResult<()> {
        let window = &metric.window;
        let granule_cte = format!("{}__spine", metric.name);

        // Distinct window granules inside [start, end].
        let trunc = self.dialect.date_trunc(
            window.time_unit,
            &self.dialect.quote_identifier(spine.column()),
        );
        let granules = Query::new()
            .select(vec![raw_sql(&trunc).alias(&window.name)])
            .distinct()
            .from(TableRef::new(SPINE_CTE))
            .filter(
                col(spine.column()).between(lit_date(&window.start), lit_date(&window.end)),
            );
        out.push(GeneratedCte::Query(Cte::new(&granule_cte, granules)));

        // One output row per granule: LEFT JOIN keeps empty granules,
        // the range predicate buckets base rows without truncating them.
        let granule = table_col("spine", &window.name);
        let granule_sql = format!(
            "{}.{}",
            self.dialect.quote_identifier("spine"),
            self.dialect.quote_identifier(&window.name)
        );
        let next_granule = self.dialect.date_step(window.time_unit, &granule_sql);
        let ref_column = table_col("base", &window.ref_column);
        let measure = self.measure_expr(&metric.measure)?;
        let rollup = Query::new()
            .select(vec![
                granule.clone().alias(&window.name),
                measure.alias(&metric.measure.name),
            ])
            .from(TableRef::new(&granule_cte).with_alias("spine"))
            .join(
                JoinType::Left,
                TableRef::new(&metric.base_object).with_alias("base"),
                ref_column
                    .clone()
                    .gte(granule.clone())
                    .and(ref_column.lt(raw_sql(&next_granule))),
            )
            .group_by(vec![granule]);
        out.push(GeneratedCte::Query(Cte::new(&metric.name, rollup)));
        Ok(())
    }

    fn measure_expr(&self, measure: &Measure) -> RewriteResult<Expr> {
        let name = match measure.operator.to_lowercase().as_str() {
            "sum" => "SUM",
            "count" => "COUNT",
            "avg" => "AVG",
            "min" => "MIN",
            "max" => "MAX",
            _ => return Err(RewriteError::UnknownOperator(measure.operator.clone())),
        };
        let arg = if is_bare_identifier(&measure.ref_column) {
            table_col("base", &measure.ref_column)
        } else {
            raw_sql(&measure.ref_column)
        };
        Ok(func(name, vec![arg]))
    }
}

fn projection(column: &Column) -> SelectExpr {
    match &column.expression {
        Some(expression) => raw_sql(expression).alias(&column.name),
        None => SelectExpr::new(col(&column.name)),
    }
}

// ---- entity introspection ---------------------------------------------

/// A resolved output column of a semantic entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityColumn {
    pub name: String,
    pub type_name: String,
    /// The SQL expression the column projects.
    pub expression: String,
}

/// Output columns of a semantic entity, in projection order.
///
/// Returns `None` for views (their shape is not declared) and for
/// names that are not semantic.
pub fn entity_columns(mdl: &AnalyzedMdl, name: &str) -> Option<Vec<EntityColumn>> {
    if let Some(model) = mdl.model(name) {
        Some(
            model
                .visible_columns()
                .map(|c| EntityColumn {
                    name: c.name.clone(),
                    type_name: c.type_name.clone(),
                    expression: c.sql_expression().to_string(),
                })
                .collect(),
        )
    } else if let Some(metric) = mdl.metric(name) {
        Some(
            metric
                .output_columns()
                .map(|c| EntityColumn {
                    name: c.name.clone(),
                    type_name: c.type_name.clone(),
                    expression: c.sql_expression().to_string(),
                })
                .collect(),
        )
    } else if let Some(metric) = mdl.cumulative_metric(name) {
        Some(vec![
            EntityColumn {
                name: metric.window.name.clone(),
                type_name: "DATE".into(),
                expression: metric.window.ref_column.clone(),
            },
            EntityColumn {
                name: metric.measure.name.clone(),
                type_name: metric.measure.type_name.clone(),
                expression: metric.measure.ref_column.clone(),
            },
        ])
    } else {
        None
    }
}

/// The physical dataset an entity ultimately reads from: the bottom
/// of its base-object chain.
pub fn physical_source(mdl: &AnalyzedMdl, name: &str) -> String {
    let mut current = name.to_string();
    let mut seen = HashSet::new();
    loop {
        if !seen.insert(current.clone()) {
            return current;
        }
        let base = if let Some(model) = mdl.model(&current) {
            match &model.base_object {
                Some(base) => base.clone(),
                None => return current,
            }
        } else if let Some(metric) = mdl.metric(&current) {
            metric.base_object.clone()
        } else if let Some(metric) = mdl.cumulative_metric(&current) {
            metric.base_object.clone()
        } else {
            return current;
        };
        current = base;
    }
}

// ---- helpers ----------------------------------------------------------

/// All word tokens of a SQL fragment, plus whether a `*` appears.
fn sql_words(sql: &str) -> RewriteResult<(HashSet<String>, bool)> {
    let dialect = GenericDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .tokenize()
        .map_err(ParserError::from)?;
    let mut words = HashSet::new();
    let mut wildcard = false;
    for token in tokens {
        match token {
            SqlToken::Word(word) => {
                words.insert(word.value);
            }
            SqlToken::Mul => wildcard = true,
            _ => {}
        }
    }
    Ok((words, wildcard))
}

fn columns_words(columns: &[Column]) -> RewriteResult<HashSet<String>> {
    let mut words = HashSet::new();
    for column in columns {
        let (expr_words, _) = sql_words(column.sql_expression())?;
        words.extend(expr_words);
    }
    Ok(words)
}

fn contains_ci(words: &HashSet<String>, name: &str) -> bool {
    words.contains(name) || words.iter().any(|w| w.eq_ignore_ascii_case(name))
}

fn is_bare_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_date(s: &str) -> RewriteResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| RewriteError::InvalidDate(s.to_string()))
}
