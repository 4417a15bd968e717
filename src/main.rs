//! Execute the queries of a plot-definitions file against a compilation-metrics store.

use cmplot::analyzer;
use cmplot::cli;
use cmplot::db;
use cmplot::error;
use cmplot::lexer;
use cmplot::parser;

fn run_plots(args: &cli::Cli, document: &str) -> error::Result<()> {
    let conn = db::connect(args.database.as_deref())?;

    for plot in analyzer::analyze(parser::parse(lexer::lex(document))) {
        let plot = plot?;
        // One header line per plot, then one JSON array per result row, streamed.
        println!("# {}", plot.image_name);
        db::stream_rows(&conn, &plot, |row| {
            println!("{}", serde_json::Value::from(db::row_values(row)?));
            Ok(())
        })?;
    }

    Ok(())
}

fn main() -> miette::Result<()> {
    let args = cli::parse();

    let document = match std::fs::read_to_string(&args.definitions) {
        Ok(document) => document,
        Err(source) => {
            return Err(miette::Report::new_boxed(Box::new(error::Error::Io {
                path: args.definitions.display().to_string(),
                source,
            })))
        }
    };

    run_plots(&args, &document)
        .map_err(|e| miette::Report::new_boxed(e).with_source_code(document))
}
