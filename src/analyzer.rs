// SPDX-License-Identifier: MIT

//! Types and methods for resolving definitions into fully validated plot descriptors.
//!
//! `define-query` definitions register their SQL under a name and yield nothing; `define-plot`
//! definitions yield a `Plot`. Resolution is a single forward pass: a named query must be defined
//! before the plot that references it, so the only state carried across definitions is the
//! registry of names seen so far.
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::iso8601;
use crate::parser::{Definition, Trait};

/// How a plot's data is drawn. The renderer downstream interprets this; the analyzer only
/// validates it against the whitelist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum PlotStyle {
    Bars,
    Line,
    HorizontalBars,
}

impl PlotStyle {
    /// The accepted spellings of the `style` trait, in whitelist order.
    pub const NAMES: [&'static str; 3] = ["bars", "line", "horizontal-bars"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bars" => Some(PlotStyle::Bars),
            "line" => Some(PlotStyle::Line),
            "horizontal-bars" => Some(PlotStyle::HorizontalBars),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlotStyle::Bars => "bars",
            PlotStyle::Line => "line",
            PlotStyle::HorizontalBars => "horizontal-bars",
        }
    }
}

impl std::fmt::Display for PlotStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A fully resolved, validated report descriptor, ready for query execution.
#[derive(Clone, Debug, PartialEq)]
#[must_use]
pub struct Plot {
    /// File name of the image the renderer will produce.
    pub image_name: String,
    /// The SQL to run against `CompilationView`. Non-empty after analysis.
    pub query: String,
    pub width: u32,
    pub height: u32,
    pub x_axis_label: Option<String>,
    pub y_axis_label: Option<String>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    pub style: PlotStyle,
    /// Restricts rows to one OS family (`Machine.System`, e.g. "Linux") when set.
    pub system: Option<String>,
    /// Restricts rows to compilations whose start lies in `[begin, end]` when set.
    /// Invariant: `begin < end`.
    pub period: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl Plot {
    fn new(image_name: String, query: String) -> Self {
        Self {
            image_name,
            query,
            width: 800,
            height: 600,
            x_axis_label: None,
            y_axis_label: None,
            y_min: None,
            y_max: None,
            style: PlotStyle::HorizontalBars,
            system: None,
            period: None,
        }
    }
}

/// Join an SQL block back into one statement: newline separators plus a trailing newline, exactly
/// reproducing the indented text minus the fixed indent.
fn join_sql(lines: &[&str]) -> String {
    let mut sql = lines.join("\n");
    sql.push('\n');
    sql
}

fn expect_arity(t: &Trait, expected: usize) -> Result<()> {
    if t.args.len() == expected {
        Ok(())
    } else {
        Err(Box::new(Error::TraitArity {
            span: t.span,
            name: t.name.clone(),
            expected,
            got: t.args.len(),
        }))
    }
}

fn parse_arg<T: std::str::FromStr>(t: &Trait, what: &str) -> Result<T> {
    t.args[0].parse().map_err(|_| {
        Box::new(Error::ParseValue {
            span: t.span,
            desc: format!("{:?} is not a valid {} value", t.args[0], what),
        })
    })
}

fn parse_timestamp(t: &Trait, arg: &str) -> Result<DateTime<Utc>> {
    iso8601::parse(arg).ok_or_else(|| {
        Box::new(Error::ParseValue {
            span: t.span,
            desc: format!("{:?} is not a supported ISO 8601 datetime", arg),
        })
    })
}

/// A lazy stream of `Plot`s over a definition stream, in document order.
///
/// Fuses after the first error; a malformed definition is never skipped.
#[must_use]
pub struct Analyzer<I> {
    definitions: I,
    /// Named-query registry: name -> SQL text.
    queries: HashMap<String, String>,
    done: bool,
}

impl<'d, I> Analyzer<I>
where
    I: Iterator<Item = Result<Definition<'d>>>,
{
    /// Validate a `define-query` definition and register its SQL.
    fn define_query(&mut self, definition: &Definition<'d>) -> Result<()> {
        let first = &definition.traits[0];
        // define-query admits no further traits: its dispatch table is empty.
        if let Some(extra) = definition.traits.get(1) {
            return Err(Box::new(Error::UnknownTrait {
                span: extra.span,
                name: extra.name.clone(),
            }));
        }
        expect_arity(first, 1)?;
        let name = first.args[0].clone();
        let sql = match &definition.sql_block {
            Some(lines) => join_sql(lines),
            None => return Err(Box::new(Error::MissingQuery { span: definition.span })),
        };
        if self.queries.contains_key(&name) {
            return Err(Box::new(Error::DuplicateQuery {
                span: first.span,
                name,
            }));
        }
        self.queries.insert(name, sql);
        Ok(())
    }

    /// Validate a `define-plot` definition into a `Plot`.
    fn define_plot(&self, definition: &Definition<'d>) -> Result<Plot> {
        let first = &definition.traits[0];
        expect_arity(first, 1)?;

        let image_name = first.args[0].clone();
        let mut query: Option<String> = definition.sql_block.as_deref().map(join_sql);
        let mut plot = Plot::new(image_name, String::new());

        for t in &definition.traits[1..] {
            match t.name.as_str() {
                "query" => {
                    expect_arity(t, 1)?;
                    // The inline SQL block and an earlier query trait both conflict with this one.
                    if query.is_some() {
                        return Err(Box::new(Error::QueryConflict { span: t.span }));
                    }
                    let name = &t.args[0];
                    match self.queries.get(name) {
                        Some(sql) => query = Some(sql.clone()),
                        None => {
                            return Err(Box::new(Error::UndefinedQuery {
                                span: t.span,
                                name: name.clone(),
                            }))
                        }
                    }
                }
                "width" => {
                    expect_arity(t, 1)?;
                    plot.width = parse_arg(t, "width")?;
                }
                "height" => {
                    expect_arity(t, 1)?;
                    plot.height = parse_arg(t, "height")?;
                }
                "system" => {
                    expect_arity(t, 1)?;
                    plot.system = Some(t.args[0].clone());
                }
                "xAxisLabel" => {
                    expect_arity(t, 1)?;
                    plot.x_axis_label = Some(t.args[0].clone());
                }
                "yAxisLabel" => {
                    expect_arity(t, 1)?;
                    plot.y_axis_label = Some(t.args[0].clone());
                }
                "yMin" => {
                    expect_arity(t, 1)?;
                    plot.y_min = Some(parse_arg(t, "yMin")?);
                }
                "yMax" => {
                    expect_arity(t, 1)?;
                    plot.y_max = Some(parse_arg(t, "yMax")?);
                }
                "style" => {
                    expect_arity(t, 1)?;
                    plot.style = match PlotStyle::from_name(&t.args[0]) {
                        Some(style) => style,
                        None => {
                            return Err(Box::new(Error::UnknownStyle {
                                span: t.span,
                                style: t.args[0].clone(),
                            }))
                        }
                    };
                }
                "period" => {
                    expect_arity(t, 2)?;
                    let begin = parse_timestamp(t, &t.args[0])?;
                    let end = parse_timestamp(t, &t.args[1])?;
                    if begin >= end {
                        return Err(Box::new(Error::EmptyPeriod { span: t.span }));
                    }
                    plot.period = Some((begin, end));
                }
                _ => {
                    return Err(Box::new(Error::UnknownTrait {
                        span: t.span,
                        name: t.name.clone(),
                    }))
                }
            }
        }

        plot.query = match query {
            Some(sql) => sql,
            None => return Err(Box::new(Error::MissingQuery { span: definition.span })),
        };
        Ok(plot)
    }

    /// Dispatch one definition: register a query (yielding nothing) or build a plot.
    fn analyze_definition(&mut self, definition: &Definition<'d>) -> Result<Option<Plot>> {
        let first = &definition.traits[0];
        match first.name.as_str() {
            "define-query" => {
                self.define_query(definition)?;
                Ok(None)
            }
            "define-plot" => Ok(Some(self.define_plot(definition)?)),
            _ => Err(Box::new(Error::UnknownDefinition {
                span: first.span,
                name: first.name.clone(),
            })),
        }
    }
}

impl<'d, I> Iterator for Analyzer<I>
where
    I: Iterator<Item = Result<Definition<'d>>>,
{
    type Item = Result<Plot>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.definitions.next() {
                Some(Ok(definition)) => match self.analyze_definition(&definition) {
                    Ok(Some(plot)) => return Some(Ok(plot)),
                    Ok(None) => continue,
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                },
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}

/// Analyze a stream of definitions into a stream of plots.
pub fn analyze<'d, I>(definitions: I) -> Analyzer<I>
where
    I: Iterator<Item = Result<Definition<'d>>>,
{
    Analyzer {
        definitions,
        queries: HashMap::new(),
        done: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::lexer::lex;
    use crate::parser::parse;

    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn plots(document: &str) -> Vec<Result<Plot>> {
        analyze(parse(lex(document))).collect()
    }

    fn plots_ok(document: &str) -> Vec<Plot> {
        plots(document).into_iter().map(|p| p.unwrap()).collect()
    }

    fn first_err_kind(document: &str) -> ErrorKind {
        plots(document)
            .into_iter()
            .find_map(|p| p.err())
            .expect("expected an analysis error")
            .kind()
    }

    #[test]
    fn test_inline_sql_plot() {
        let result = plots_ok(".define-plot 'x.png'\n\n    select 1;\n");
        assert_eq!(result.len(), 1);
        let plot = &result[0];
        assert_eq!(plot.image_name, "x.png");
        assert_eq!(plot.query, "select 1;\n");
        assert_eq!(plot.width, 800);
        assert_eq!(plot.height, 600);
        assert_eq!(plot.style, PlotStyle::HorizontalBars);
        assert_eq!(plot.system, None);
        assert_eq!(plot.period, None);
    }

    #[test]
    fn test_named_query_resolution() {
        let document = "\
.define-query 'q'

    select * from CompilationView;

.define-plot 'y.png'
.query 'q'
";
        let result = plots_ok(document);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].image_name, "y.png");
        assert_eq!(result[0].query, "select * from CompilationView;\n");
    }

    #[test]
    fn test_all_traits() {
        let document = "\
.define-plot 'full.png'
.width 1024
.height 768
.system 'Linux'
.xAxisLabel 'file'
.yAxisLabel 'seconds'
.yMin '0.5'
.yMax '120'
.style bars
.period '2016-01-01' '2016-02-01'

    select FileName, Duration from CompilationView;
";
        let result = plots_ok(document);
        let plot = &result[0];
        assert_eq!(plot.width, 1024);
        assert_eq!(plot.height, 768);
        assert_eq!(plot.system.as_deref(), Some("Linux"));
        assert_eq!(plot.x_axis_label.as_deref(), Some("file"));
        assert_eq!(plot.y_axis_label.as_deref(), Some("seconds"));
        assert_eq!(plot.y_min, Some(0.5));
        assert_eq!(plot.y_max, Some(120.0));
        assert_eq!(plot.style, PlotStyle::Bars);
        let begin = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2016, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(plot.period, Some((begin, end)));
    }

    #[rstest]
    #[case::bars("bars", PlotStyle::Bars)]
    #[case::line("line", PlotStyle::Line)]
    #[case::horizontal_bars("horizontal-bars", PlotStyle::HorizontalBars)]
    fn test_styles(#[case] name: &str, #[case] expected: PlotStyle) {
        let document = format!(".define-plot 'x.png'\n.style {}\n\n    select 1;\n", name);
        assert_eq!(plots_ok(&document)[0].style, expected);
    }

    #[rstest]
    #[case::unknown_definition(".define-graph 'x.png'\n\n    select 1;\n", ErrorKind::UnknownDefinition)]
    #[case::unknown_trait(".define-plot 'x.png'\n.zAxisLabel 'z'\n\n    select 1;\n", ErrorKind::UnknownTrait)]
    #[case::trait_on_define_query(".define-query 'q'\n.width 800\n\n    select 1;\n", ErrorKind::UnknownTrait)]
    #[case::define_query_two_args(".define-query 'q' 'r'\n\n    select 1;\n", ErrorKind::TraitArity)]
    #[case::define_query_without_sql(".define-query 'q'\n", ErrorKind::MissingQuery)]
    #[case::plot_without_query(".define-plot 'x.png'\n.width 800\n", ErrorKind::MissingQuery)]
    #[case::width_not_integer(".define-plot 'x.png'\n.width 'wide'\n\n    select 1;\n", ErrorKind::ParseValue)]
    #[case::width_two_args(".define-plot 'x.png'\n.width 800 600\n\n    select 1;\n", ErrorKind::TraitArity)]
    #[case::y_min_not_float(".define-plot 'x.png'\n.yMin 'low'\n\n    select 1;\n", ErrorKind::ParseValue)]
    #[case::unknown_style(".define-plot 'x.png'\n.style 'pie'\n\n    select 1;\n", ErrorKind::UnknownStyle)]
    #[case::period_one_arg(".define-plot 'x.png'\n.period '2016-01-01'\n\n    select 1;\n", ErrorKind::TraitArity)]
    #[case::period_bad_timestamp(".define-plot 'x.png'\n.period 'then' 'now'\n\n    select 1;\n", ErrorKind::ParseValue)]
    #[case::period_empty(".define-plot 'x.png'\n.period '2016-01-01' '2016-01-01'\n\n    select 1;\n", ErrorKind::EmptyPeriod)]
    #[case::period_reversed(".define-plot 'x.png'\n.period '2016-02-01' '2016-01-01'\n\n    select 1;\n", ErrorKind::EmptyPeriod)]
    #[case::undefined_query(".define-plot 'x.png'\n.query 'missing'\n", ErrorKind::UndefinedQuery)]
    #[case::both_sql_and_query(
        ".define-query 'q'\n\n    select 1;\n\n.define-plot 'x.png'\n.query 'q'\n\n    select 2;\n",
        ErrorKind::QueryConflict
    )]
    #[case::query_twice(
        ".define-query 'q'\n\n    select 1;\n\n.define-plot 'x.png'\n.query 'q'\n.query 'q'\n",
        ErrorKind::QueryConflict
    )]
    #[case::duplicate_query_name(
        ".define-query 'q'\n\n    select 1;\n\n.define-query 'q'\n\n    select 2;\n",
        ErrorKind::DuplicateQuery
    )]
    fn test_semantic_errors(#[case] document: &str, #[case] expected: ErrorKind) {
        assert_eq!(first_err_kind(document), expected);
    }

    #[test]
    fn test_forward_reference_is_an_error() {
        // Single forward pass: names resolve only after their define-query appears.
        let document = "\
.define-plot 'x.png'
.query 'later'

.define-query 'later'

    select 1;
";
        assert_eq!(first_err_kind(document), ErrorKind::UndefinedQuery);
    }

    #[test]
    fn test_stream_stops_at_first_error() {
        let document = "\
.define-plot 'bad.png'
.query 'missing'

.define-plot 'good.png'

    select 1;
";
        let result = plots(document);
        assert_eq!(result.len(), 1);
        assert!(result[0].is_err());
    }

    #[test]
    fn test_plots_in_document_order() {
        let document = "\
.define-query 'q'

    select 1;

.define-plot 'a.png'
.query 'q'

.define-plot 'b.png'

    select 2;

.define-plot 'c.png'
.query 'q'
";
        let names: Vec<String> = plots_ok(document).into_iter().map(|p| p.image_name).collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let document = "\
.define-query 'q'

    select FileName from CompilationView;

.define-plot 'a.png'
.query 'q'
.period '2016-01-01' '2016-02-01'

.define-plot 'b.png'
.style line

    select 2;
";
        assert_eq!(plots_ok(document), plots_ok(document));
    }

    #[test]
    fn test_multi_line_sql_joined_with_trailing_newline() {
        let document = "\
.define-plot 'x.png'

    select FileName
    from CompilationView;
";
        assert_eq!(
            plots_ok(document)[0].query,
            "select FileName\nfrom CompilationView;\n"
        );
    }
}
