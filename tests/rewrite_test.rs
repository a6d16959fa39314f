//! Integration tests for the end-to-end rewrite pipeline.

use strata::mdl::{
    AnalyzedMdl, Column, DateSpine, JoinKind, Manifest, Metric, Model, Relationship, TimeUnit,
    View,
};
use strata::rewrite::{rewrite, RewriteError, SemanticCteRewrite, SessionContext};
use strata::sql::Dialect;

fn manifest() -> Manifest {
    Manifest::builder()
        .catalog("accio")
        .schema("test")
        .model(Model::new(
            "Orders",
            "SELECT * FROM tpch.orders",
            vec![
                Column::new("orderkey", "INTEGER"),
                Column::new("custkey", "INTEGER"),
                Column::new("totalprice", "INTEGER"),
                Column::new("orderdate", "DATE"),
            ],
        ))
        .model(Model::new(
            "Customer",
            "SELECT * FROM tpch.customer",
            vec![
                Column::new("custkey", "INTEGER"),
                Column::new("name", "VARCHAR"),
            ],
        ))
        .relationship(Relationship::new(
            "OrdersCustomer",
            vec!["Orders", "Customer"],
            JoinKind::ManyToOne,
            "Orders.custkey = Customer.custkey",
        ))
        .metric(Metric::new(
            "Revenue",
            "Orders",
            vec![Column::new("custkey", "INTEGER")],
            vec![Column::calculated("totalprice", "INTEGER", "sum(totalprice)")],
        ))
        .view(View::new("TopRevenue", "SELECT custkey FROM Revenue"))
        .date_spine(DateSpine::new(TimeUnit::Day, "1970-01-01", "2077-12-31"))
        .build()
        .unwrap()
}

fn mdl() -> AnalyzedMdl {
    AnalyzedMdl::new(manifest())
}

fn ctx() -> SessionContext {
    SessionContext::new("accio", "test")
}

fn run(sql: &str) -> Result<String, RewriteError> {
    rewrite(sql, &ctx(), &mdl(), &[&SemanticCteRewrite])
}

// ============================================================================
// Models
// ============================================================================

#[test]
fn test_model_reference_becomes_cte() {
    let sql = run("SELECT orderkey FROM Orders WHERE totalprice > 100").unwrap();
    assert!(sql.starts_with("WITH \"Orders\" AS ("));
    assert!(sql.contains("FROM (SELECT * FROM tpch.orders) AS \"Orders\""));
    assert!(sql.ends_with("SELECT orderkey FROM Orders WHERE totalprice > 100"));
}

#[test]
fn test_hidden_and_calculated_columns() {
    let manifest = manifest()
        .to_builder()
        .model(Model::new(
            "Lineitem",
            "SELECT * FROM tpch.lineitem",
            vec![
                Column::new("orderkey", "INTEGER"),
                Column::calculated("revenue", "INTEGER", "extendedprice * (1 - discount)"),
                Column::new("internal", "INTEGER").hidden(),
            ],
        ))
        .build()
        .unwrap();
    let mdl = AnalyzedMdl::new(manifest);

    let sql = rewrite("SELECT * FROM Lineitem", &ctx(), &mdl, &[&SemanticCteRewrite]).unwrap();
    assert!(sql.contains("extendedprice * (1 - discount) AS \"revenue\""));
    assert!(!sql.contains("\"internal\""));
}

#[test]
fn test_qualified_model_reference() {
    let sql = run("SELECT * FROM accio.test.Orders").unwrap();
    assert!(sql.starts_with("WITH \"Orders\" AS ("));
    assert!(sql.ends_with("SELECT * FROM Orders"));
}

#[test]
fn test_other_schema_is_physical() {
    let sql = run("SELECT * FROM other.schema.Orders").unwrap();
    assert_eq!(sql, "SELECT * FROM other.schema.Orders");
}

// ============================================================================
// Mixed Semantic and Physical References
// ============================================================================

#[test]
fn test_physical_passthrough() {
    let sql = "SELECT * FROM tpch.nation WHERE nationkey < 10";
    assert_eq!(run(sql).unwrap(), sql);
}

#[test]
fn test_model_in_exists_subquery_gets_cte() {
    let sql = run("SELECT * FROM tpch.nation WHERE EXISTS (SELECT 1 FROM Orders)").unwrap();
    assert!(sql.starts_with("WITH \"Orders\" AS ("));
    assert!(sql.ends_with("SELECT * FROM tpch.nation WHERE EXISTS (SELECT 1 FROM Orders)"));
}

#[test]
fn test_model_in_in_subquery_gets_cte() {
    let sql =
        run("SELECT * FROM tpch.nation WHERE nationkey IN (SELECT custkey FROM Orders)").unwrap();
    assert!(sql.contains("\"Orders\" AS ("));
    assert!(sql.ends_with(
        "SELECT * FROM tpch.nation WHERE nationkey IN (SELECT custkey FROM Orders)"
    ));
}

#[test]
fn test_metric_in_scalar_subquery_gets_cte() {
    let sql =
        run("SELECT (SELECT MAX(totalprice) FROM Revenue) AS max_price FROM tpch.nation").unwrap();
    let pos_orders = sql.find("\"Orders\" AS (").unwrap();
    let pos_revenue = sql.find("\"Revenue\" AS (").unwrap();
    assert!(pos_orders < pos_revenue);
}

#[test]
fn test_mixed_query_resolves_both() {
    let sql = run("SELECT * FROM Orders o JOIN tpch.nation n ON o.custkey = n.nationkey")
        .unwrap();
    assert!(sql.starts_with("WITH \"Orders\" AS ("));
    assert!(sql.contains("JOIN tpch.nation AS n ON o.custkey = n.nationkey"));
}

// ============================================================================
// Relationships
// ============================================================================

#[test]
fn test_implicit_join_filled_from_relationship() {
    let sql = run("SELECT name, totalprice FROM Orders JOIN Customer").unwrap();
    assert!(sql.contains("JOIN Customer ON Orders.custkey = Customer.custkey"));
    assert!(sql.contains("\"Customer\" AS ("));
}

#[test]
fn test_explicit_join_left_alone() {
    let sql = run("SELECT * FROM Orders o JOIN Customer c ON o.custkey = c.custkey").unwrap();
    assert!(sql.contains("ON o.custkey = c.custkey"));
}

#[test]
fn test_implicit_join_without_relationship_fails() {
    let manifest = manifest()
        .to_builder()
        .model(Model::new(
            "Nation",
            "SELECT * FROM tpch.nation",
            vec![Column::new("nationkey", "INTEGER")],
        ))
        .build()
        .unwrap();
    let mdl = AnalyzedMdl::new(manifest);
    let err = rewrite(
        "SELECT * FROM Orders JOIN Nation",
        &ctx(),
        &mdl,
        &[&SemanticCteRewrite],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RewriteError::AmbiguousImplicitJoin { found: 0, .. }
    ));
}

#[test]
fn test_multiple_matching_relationships_fail() {
    let manifest = manifest()
        .to_builder()
        .relationship(Relationship::new(
            "OrdersCustomerAgain",
            vec!["Orders", "Customer"],
            JoinKind::ManyToOne,
            "Orders.orderkey = Customer.custkey",
        ))
        .build()
        .unwrap();
    let mdl = AnalyzedMdl::new(manifest);
    let err = rewrite(
        "SELECT * FROM Orders JOIN Customer",
        &ctx(),
        &mdl,
        &[&SemanticCteRewrite],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RewriteError::AmbiguousImplicitJoin { found: 2, .. }
    ));
}

// ============================================================================
// Metrics and Views
// ============================================================================

#[test]
fn test_metric_reference() {
    let sql = run("SELECT custkey, totalprice FROM Revenue").unwrap();
    let pos_orders = sql.find("\"Orders\" AS (").unwrap();
    let pos_revenue = sql.find("\"Revenue\" AS (").unwrap();
    assert!(pos_orders < pos_revenue);
    assert!(sql.contains("sum(totalprice) AS \"totalprice\""));
    assert!(sql.contains("GROUP BY 1"));
}

#[test]
fn test_view_expands_its_dependencies() {
    let sql = run("SELECT * FROM TopRevenue").unwrap();
    let pos_orders = sql.find("\"Orders\" AS (").unwrap();
    let pos_revenue = sql.find("\"Revenue\" AS (").unwrap();
    let pos_view = sql.find("\"TopRevenue\" AS (").unwrap();
    assert!(pos_orders < pos_revenue);
    assert!(pos_revenue < pos_view);
    assert!(sql.contains("SELECT custkey FROM Revenue"));
}

// ============================================================================
// User CTEs
// ============================================================================

#[test]
fn test_user_cte_merged_after_generated() {
    let sql = run("WITH recent AS (SELECT * FROM Orders) SELECT * FROM recent").unwrap();
    let pos_orders = sql.find("\"Orders\" AS (").unwrap();
    let pos_recent = sql.find("recent AS (").unwrap();
    assert!(sql.starts_with("WITH "));
    assert!(pos_orders < pos_recent);
    assert!(sql.ends_with("SELECT * FROM recent"));
}

#[test]
fn test_user_cte_shadows_model() {
    let sql = run("WITH Orders AS (SELECT 1 AS x) SELECT * FROM Orders").unwrap();
    assert_eq!(sql, "WITH Orders AS (SELECT 1 AS x) SELECT * FROM Orders");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_multiple_statements_rejected() {
    let err = run("SELECT 1; SELECT 2").unwrap_err();
    assert!(matches!(err, RewriteError::Unsupported(_)));
}

#[test]
fn test_syntax_error_reported() {
    let err = run("SELECT FROM FROM").unwrap_err();
    assert!(matches!(err, RewriteError::SqlParse(_)));
}

#[test]
fn test_dangling_metric_base_fails() {
    let manifest = Manifest::builder()
        .catalog("accio")
        .schema("test")
        .metric(Metric::new(
            "Orphan",
            "Missing",
            vec![Column::new("x", "INTEGER")],
            vec![Column::calculated("y", "INTEGER", "sum(x)")],
        ))
        .build()
        .unwrap();
    let mdl = AnalyzedMdl::new(manifest);
    let err = rewrite("SELECT * FROM Orphan", &ctx(), &mdl, &[&SemanticCteRewrite]).unwrap_err();
    assert!(matches!(err, RewriteError::UnresolvedReference(name) if name == "Missing"));
}

#[test]
fn test_cycle_fails_eagerly() {
    let manifest = Manifest::builder()
        .catalog("accio")
        .schema("test")
        .model(Model::on_base_object("A", "B", vec![Column::new("x", "INTEGER")]))
        .model(Model::on_base_object("B", "A", vec![Column::new("x", "INTEGER")]))
        .build()
        .unwrap();
    let mdl = AnalyzedMdl::new(manifest);
    let err = rewrite("SELECT * FROM A", &ctx(), &mdl, &[&SemanticCteRewrite]).unwrap_err();
    assert!(matches!(err, RewriteError::ReferenceCycle(_)));
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_manifest_shared_across_threads() {
    let mdl = std::sync::Arc::new(mdl());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let mdl = std::sync::Arc::clone(&mdl);
            std::thread::spawn(move || {
                rewrite(
                    "SELECT custkey FROM Revenue",
                    &SessionContext::new("accio", "test"),
                    &mdl,
                    &[&SemanticCteRewrite],
                )
                .unwrap()
            })
        })
        .collect();
    let results: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}

// ============================================================================
// Dialect Selection
// ============================================================================

#[test]
fn test_dialect_controls_identifier_quoting() {
    let duckdb = rewrite("SELECT * FROM Orders", &ctx(), &mdl(), &[&SemanticCteRewrite]).unwrap();
    let bigquery = rewrite(
        "SELECT * FROM Orders",
        &ctx().with_dialect(Dialect::BigQuery),
        &mdl(),
        &[&SemanticCteRewrite],
    )
    .unwrap();
    assert!(duckdb.contains("\"Orders\" AS ("));
    assert!(bigquery.contains("`Orders` AS ("));
}
