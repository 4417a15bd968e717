// SPDX-License-Identifier: MIT

mod integration_test_util;

use cmplot::analyzer::PlotStyle;
use cmplot::error::ErrorKind;
use integration_test_util::{pipeline_err_kind, run_pipeline};

use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn inline_sql_plot() {
    let plots = run_pipeline(".define-plot 'x.png'\n\n    select 1;\n").unwrap();
    assert_eq!(plots.len(), 1);
    assert_eq!(plots[0].image_name, "x.png");
    assert_eq!(plots[0].query, "select 1;\n");
}

#[test]
fn named_query_reference() {
    let document = "\
.define-query 'q'

    select * from CompilationView;

.define-plot 'y.png'
.query 'q'
";
    let plots = run_pipeline(document).unwrap();
    assert_eq!(plots.len(), 1);
    assert_eq!(plots[0].image_name, "y.png");
    assert_eq!(plots[0].query, "select * from CompilationView;\n");
}

#[test]
fn realistic_document() {
    let document = "\
.define-query 'longest-duration'

    select FileName, avg(DurationSeconds) as AverageDuration
    from CompilationView
    group by FileName
    order by AverageDuration desc
    limit 25;

.define-plot 'longest-duration-linux.png'
.query 'longest-duration'
.system 'Linux'
.xAxisLabel 'seconds (average)'
.style horizontal-bars

.define-plot 'memory-over-time.png'
.style line
.period '2016-01-01' '2016-07-01'
.width 1200

    select Start, Memory
    from CompilationView
    order by Start;
";
    let plots = run_pipeline(document).unwrap();
    assert_eq!(plots.len(), 2);

    assert_eq!(plots[0].image_name, "longest-duration-linux.png");
    assert_eq!(plots[0].system.as_deref(), Some("Linux"));
    assert_eq!(plots[0].style, PlotStyle::HorizontalBars);
    assert!(plots[0].query.starts_with("select FileName"));

    assert_eq!(plots[1].image_name, "memory-over-time.png");
    assert_eq!(plots[1].style, PlotStyle::Line);
    assert_eq!(plots[1].width, 1200);
    assert!(plots[1].period.is_some());
}

#[test]
fn plots_preserve_document_order() {
    let document = "\
.define-query 'q'

    select 1;

.define-plot 'a.png'
.query 'q'

.define-plot 'b.png'

    select 2;
";
    let names: Vec<String> = run_pipeline(document)
        .unwrap()
        .into_iter()
        .map(|p| p.image_name)
        .collect();
    assert_eq!(names, vec!["a.png", "b.png"]);
}

#[test]
fn pipeline_is_idempotent() {
    let document = "\
.define-query 'q'

    select FileName from CompilationView;

.define-plot 'a.png'
.query 'q'
.period '2016-01-01T00:00:00Z' '2016-02-01T00:00:00Z'
";
    assert_eq!(run_pipeline(document).unwrap(), run_pipeline(document).unwrap());
}

#[rstest]
#[case::invalid_line("select 1;\n", ErrorKind::Lex)]
// Lex accepts the indented line; the parser rejects it for lacking a definition.
#[case::indent_without_definition("    select 1;\n", ErrorKind::UnexpectedIndent)]
#[case::indent_without_blank_line(
    ".define-plot 'x.png'\n    select 1;\n",
    ErrorKind::UnexpectedIndent
)]
#[case::sql_runs_into_directive(
    ".define-plot 'x.png'\n\n    select 1;\n.width 800\n",
    ErrorKind::MissingBlankLine
)]
#[case::directive_without_argument(".define-plot\n", ErrorKind::TraitTooShort)]
#[case::unterminated_quote(".define-plot 'x.png\n", ErrorKind::UnterminatedQuote)]
#[case::unknown_definition(".define-table 't'\n\n    select 1;\n", ErrorKind::UnknownDefinition)]
#[case::unknown_trait(
    ".define-plot 'x.png'\n.colour red\n\n    select 1;\n",
    ErrorKind::UnknownTrait
)]
#[case::bad_width(".define-plot 'x.png'\n.width tall\n\n    select 1;\n", ErrorKind::ParseValue)]
#[case::bad_style(".define-plot 'x.png'\n.style pie\n\n    select 1;\n", ErrorKind::UnknownStyle)]
#[case::empty_period(
    ".define-plot 'x.png'\n.period '2016-01-01' '2016-01-01'\n\n    select 1;\n",
    ErrorKind::EmptyPeriod
)]
#[case::undefined_query(".define-plot 'x.png'\n.query 'nope'\n", ErrorKind::UndefinedQuery)]
#[case::duplicate_query(
    ".define-query 'q'\n\n    select 1;\n\n.define-query 'q'\n\n    select 2;\n",
    ErrorKind::DuplicateQuery
)]
#[case::conflicting_query_sources(
    ".define-query 'q'\n\n    select 1;\n\n.define-plot 'x.png'\n.query 'q'\n\n    select 2;\n",
    ErrorKind::QueryConflict
)]
#[case::no_query(".define-plot 'x.png'\n", ErrorKind::MissingQuery)]
fn document_errors(#[case] document: &str, #[case] expected: ErrorKind) {
    assert_eq!(pipeline_err_kind(document), expected);
}
