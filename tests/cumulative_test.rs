//! Integration tests for cumulative metric expansion.
//!
//! The fixture mirrors a TPC-H Orders model with one cumulative
//! revenue metric per time unit, driven by a daily date spine.

use strata::mdl::{
    AnalyzedMdl, Column, CumulativeMetric, DateSpine, Manifest, Measure, Metric, Model, TimeUnit,
    Window,
};
use strata::rewrite::{rewrite, SemanticCteRewrite, SessionContext};
use strata::sql::Dialect;

fn orders_model() -> Model {
    Model::new(
        "Orders",
        "SELECT * FROM tpch.orders",
        vec![
            Column::new("orderkey", "INTEGER"),
            Column::new("custkey", "INTEGER"),
            Column::new("orderstatus", "VARCHAR"),
            Column::new("totalprice", "INTEGER"),
            Column::new("orderdate", "DATE"),
            Column::new("orderpriority", "VARCHAR"),
            Column::new("clerk", "VARCHAR"),
            Column::new("shippriority", "INTEGER"),
            Column::new("comment", "VARCHAR"),
        ],
    )
}

fn revenue_metric(name: &str, unit: TimeUnit, start: &str, end: &str) -> CumulativeMetric {
    CumulativeMetric::new(
        name,
        "Orders",
        Measure::new("totalprice", "INTEGER", "sum", "totalprice"),
        Window::new("orderdate", "orderdate", unit, start, end),
    )
}

fn manifest() -> Manifest {
    Manifest::builder()
        .catalog("accio")
        .schema("test")
        .model(orders_model())
        .cumulative_metric(revenue_metric(
            "DailyRevenue",
            TimeUnit::Day,
            "1994-01-01",
            "1994-12-31",
        ))
        .cumulative_metric(revenue_metric(
            "WeeklyRevenue",
            TimeUnit::Week,
            "1994-01-01",
            "1994-12-31",
        ))
        .cumulative_metric(revenue_metric(
            "MonthlyRevenue",
            TimeUnit::Month,
            "1994-01-01",
            "1994-12-31",
        ))
        .cumulative_metric(revenue_metric(
            "QuarterlyRevenue",
            TimeUnit::Quarter,
            "1994-01-01",
            "1995-12-31",
        ))
        .cumulative_metric(revenue_metric(
            "YearlyRevenue",
            TimeUnit::Year,
            "1994-01-01",
            "1998-12-31",
        ))
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

// ============================================================================
// Expansion Structure
// ============================================================================

#[test]
fn test_rewrite_weekly_revenue() {
    let sql = rewrite("SELECT * FROM WeeklyRevenue", &ctx(), &mdl(), &[&SemanticCteRewrite])
        .unwrap();

    assert!(sql.starts_with("WITH RECURSIVE \"__date_spine\" (\"date_day\") AS ("));
    assert!(sql.contains("\"Orders\" AS ("));
    assert!(sql.contains("\"WeeklyRevenue__spine\" AS ("));
    assert!(sql.contains("\"WeeklyRevenue\" AS ("));
    assert!(sql.ends_with("SELECT * FROM WeeklyRevenue"));

    // Granules: distinct week starts inside the window.
    assert!(sql.contains("SELECT DISTINCT"));
    assert!(sql.contains("DATE_TRUNC('week', \"date_day\") AS \"orderdate\""));
    assert!(sql.contains("BETWEEN DATE '1994-01-01' AND DATE '1994-12-31'"));

    // Rollup: empty granules survive the LEFT JOIN, base rows bucket
    // into [granule, granule + 1 week).
    assert!(sql.contains("LEFT JOIN \"Orders\" AS \"base\""));
    assert!(sql.contains("\"base\".\"orderdate\" >= \"spine\".\"orderdate\""));
    assert!(sql.contains("\"base\".\"orderdate\" < (\"spine\".\"orderdate\" + INTERVAL 1 WEEK)"));
    assert!(sql.contains("SUM(\"base\".\"totalprice\") AS \"totalprice\""));
    assert!(sql.contains("GROUP BY \"spine\".\"orderdate\""));
}

#[test]
fn test_spine_cte_covers_manifest_range() {
    let sql = rewrite("SELECT * FROM DailyRevenue", &ctx(), &mdl(), &[&SemanticCteRewrite])
        .unwrap();
    assert!(sql.contains("DATE '1970-01-01' AS \"date_day\""));
    assert!(sql.contains("\"date_day\" < DATE '2077-12-31'"));
    assert!(sql.contains("UNION ALL"));
}

// ============================================================================
// Row-Count Laws
// ============================================================================
//
// The granule CTE selects DISTINCT truncated spine dates inside the
// window, and the LEFT JOIN preserves every granule. The output row
// count is therefore exactly the period count of the window,
// independent of the data.

#[test]
fn test_window_period_counts() {
    let mdl = mdl();
    for (name, expected) in [
        ("DailyRevenue", 365),
        ("WeeklyRevenue", 53),
        ("MonthlyRevenue", 12),
        ("QuarterlyRevenue", 8),
        ("YearlyRevenue", 5),
    ] {
        let metric = mdl.cumulative_metric(name).unwrap();
        let window = &metric.window;
        let start = window.start.parse().unwrap();
        let end = window.end.parse().unwrap();
        assert_eq!(
            window.time_unit.periods_between(start, end),
            expected,
            "window {} has wrong period count",
            name
        );
    }
}

// ============================================================================
// Layering
// ============================================================================

#[test]
fn test_model_on_cumulative_metric() {
    let manifest = manifest()
        .to_builder()
        .model(Model::on_base_object(
            "RevenueModel",
            "WeeklyRevenue",
            vec![
                Column::new("orderdate", "DATE"),
                Column::new("totalprice", "INTEGER"),
            ],
        ))
        .build()
        .unwrap();
    let mdl = AnalyzedMdl::new(manifest);

    let sql = rewrite("SELECT * FROM RevenueModel", &ctx(), &mdl, &[&SemanticCteRewrite])
        .unwrap();
    assert!(sql.contains("\"WeeklyRevenue\" AS ("));
    assert!(sql.contains("\"RevenueModel\" AS ("));
    assert!(sql.ends_with("SELECT * FROM RevenueModel"));

    // Exactly the two columns of the underlying cumulative metric.
    let statement = sqlparser::parser::Parser::parse_sql(
        &sqlparser::dialect::GenericDialect {},
        "SELECT * FROM RevenueModel",
    )
    .unwrap()
    .remove(0);
    let analyses = strata::rewrite::analyze_statement(&statement, &mdl).unwrap();
    assert_eq!(analyses[0].columns.len(), 2);
}

#[test]
fn test_metric_on_cumulative_metric() {
    let manifest = manifest()
        .to_builder()
        .metric(Metric::new(
            "MonthlyFromDaily",
            "DailyRevenue",
            vec![Column::calculated(
                "ordermonth",
                "DATE",
                "date_trunc('month', orderdate)",
            )],
            vec![Column::calculated("totalprice", "INTEGER", "sum(totalprice)")],
        ))
        .build()
        .unwrap();
    let mdl = AnalyzedMdl::new(manifest);

    let sql = rewrite(
        "SELECT * FROM MonthlyFromDaily",
        &ctx(),
        &mdl,
        &[&SemanticCteRewrite],
    )
    .unwrap();

    assert!(sql.contains("\"DailyRevenue\" AS ("));
    assert!(sql.contains("\"MonthlyFromDaily\" AS ("));
    assert!(sql.contains("date_trunc('month', orderdate) AS \"ordermonth\""));
    assert!(sql.contains("GROUP BY 1"));

    // Grouping 365 daily buckets by month yields the 12 distinct keys.
    assert_eq!(
        TimeUnit::Month.periods_between(
            "1994-01-01".parse().unwrap(),
            "1994-12-31".parse().unwrap()
        ),
        12
    );
}

#[test]
fn test_cumulative_on_cumulative_metric() {
    let manifest = manifest()
        .to_builder()
        .cumulative_metric(CumulativeMetric::new(
            "YearlyFromWeekly",
            "WeeklyRevenue",
            Measure::new("totalprice", "INTEGER", "sum", "totalprice"),
            Window::new("orderdate", "orderdate", TimeUnit::Year, "1994-01-01", "1998-12-31"),
        ))
        .build()
        .unwrap();
    let mdl = AnalyzedMdl::new(manifest);

    let sql = rewrite(
        "SELECT * FROM YearlyFromWeekly",
        &ctx(),
        &mdl,
        &[&SemanticCteRewrite],
    )
    .unwrap();

    // The base cumulative and its own dependencies come first.
    let pos_weekly = sql.find("\"WeeklyRevenue\" AS (").unwrap();
    let pos_yearly = sql.find("\"YearlyFromWeekly\" AS (").unwrap();
    assert!(pos_weekly < pos_yearly);
    assert!(sql.contains("LEFT JOIN \"WeeklyRevenue\" AS \"base\""));
}

#[test]
fn test_cumulative_on_metric() {
    let manifest = manifest()
        .to_builder()
        .metric(Metric::new(
            "OrderDates",
            "Orders",
            vec![Column::new("orderdate", "DATE")],
            vec![Column::calculated("totalprice", "INTEGER", "sum(totalprice)")],
        ))
        .cumulative_metric(CumulativeMetric::new(
            "YearlyFromMetric",
            "OrderDates",
            Measure::new("totalprice", "INTEGER", "sum", "totalprice"),
            Window::new("orderdate", "orderdate", TimeUnit::Year, "1994-01-01", "1998-12-31"),
        ))
        .build()
        .unwrap();
    let mdl = AnalyzedMdl::new(manifest);

    let sql = rewrite(
        "SELECT * FROM YearlyFromMetric",
        &ctx(),
        &mdl,
        &[&SemanticCteRewrite],
    )
    .unwrap();
    assert!(sql.contains("\"OrderDates\" AS ("));
    assert!(sql.contains("LEFT JOIN \"OrderDates\" AS \"base\""));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_invalid_ref_column_fails_verbatim_in_both_modes() {
    let manifest = manifest()
        .to_builder()
        .cumulative_metric(CumulativeMetric::new(
            "BadRevenue",
            "Orders",
            Measure::new("totalprice", "INTEGER", "sum", "totalprice"),
            Window::new(
                "totalprice",
                "totalprice",
                TimeUnit::Week,
                "1994-01-01",
                "1994-12-31",
            ),
        ))
        .build()
        .unwrap();
    let mdl = AnalyzedMdl::new(manifest);

    for dynamic in [false, true] {
        let context = ctx().with_dynamic(dynamic);
        let err = rewrite("SELECT * FROM BadRevenue", &context, &mdl, &[&SemanticCteRewrite])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "CumulativeMetric measure cannot be window as it is not date/timestamp type"
        );
    }
}

// ============================================================================
// Dynamic Mode
// ============================================================================

#[test]
fn test_select_one_succeeds_in_both_modes() {
    let mdl = mdl();
    for dynamic in [false, true] {
        let context = ctx().with_dynamic(dynamic);
        let sql = rewrite(
            "SELECT 1 FROM WeeklyRevenue",
            &context,
            &mdl,
            &[&SemanticCteRewrite],
        )
        .unwrap();
        assert!(sql.ends_with("SELECT 1 FROM WeeklyRevenue"));
    }
}

#[test]
fn test_dynamic_mode_prunes_unused_model_columns() {
    let mdl = mdl();
    let sql = rewrite(
        "SELECT 1 FROM WeeklyRevenue",
        &ctx().with_dynamic(true),
        &mdl,
        &[&SemanticCteRewrite],
    )
    .unwrap();
    // The rollup needs orderdate and totalprice of Orders; the other
    // seven columns drop out of the model CTE.
    assert!(sql.contains("\"orderdate\""));
    assert!(sql.contains("\"totalprice\""));
    assert!(!sql.contains("\"clerk\""));
    assert!(!sql.contains("\"orderpriority\""));
}

#[test]
fn test_select_star_identical_across_modes() {
    let mdl = mdl();
    let plain = rewrite(
        "SELECT * FROM WeeklyRevenue",
        &ctx(),
        &mdl,
        &[&SemanticCteRewrite],
    )
    .unwrap();
    let dynamic = rewrite(
        "SELECT * FROM WeeklyRevenue",
        &ctx().with_dynamic(true),
        &mdl,
        &[&SemanticCteRewrite],
    )
    .unwrap();
    assert_eq!(plain, dynamic);
}

// ============================================================================
// Dialects
// ============================================================================

#[test]
fn test_postgres_dialect_quoted_intervals() {
    let sql = rewrite(
        "SELECT * FROM WeeklyRevenue",
        &ctx().with_dialect(Dialect::Postgres),
        &mdl(),
        &[&SemanticCteRewrite],
    )
    .unwrap();
    assert!(sql.contains("+ INTERVAL '1 week'"));
    assert!(sql.contains("+ INTERVAL '1 day'"));
}

#[test]
fn test_bigquery_dialect_backticks_and_date_add() {
    let sql = rewrite(
        "SELECT * FROM WeeklyRevenue",
        &ctx().with_dialect(Dialect::BigQuery),
        &mdl(),
        &[&SemanticCteRewrite],
    )
    .unwrap();
    assert!(sql.contains("`Orders` AS ("));
    assert!(sql.contains("DATE_TRUNC(`date_day`, WEEK(MONDAY))"));
    assert!(sql.contains("DATE_ADD(`spine`.`orderdate`, INTERVAL 1 WEEK)"));
}
