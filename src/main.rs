use anyhow::Result;
use clap::Parser;
use sereno::analyzer::{self, AnalyzerConfig};
use sereno::cli::{Cli, OutputFormat};
use sereno::csv_output::CsvReport;
use sereno::json_output::JsonReport;
use sereno::report;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    if args.jobs == 0 {
        anyhow::bail!("Invalid value for --jobs: 0 (must be at least 1)");
    }

    init_tracing(args.debug);

    let config = AnalyzerConfig {
        threshold: args.threshold,
        top_n: args.top_n,
        trend: args.trend,
        jobs: args.jobs,
    };

    let analysis = analyzer::run(&args.log_file, &config)?;

    report::print_ingest_summary(
        &analysis.summary,
        analysis.trend.as_ref().map(|trend| trend.excluded()),
    );

    match args.format {
        OutputFormat::Text => report::print_report(&analysis, &config),
        OutputFormat::Json => {
            let envelope = JsonReport::from_analysis(&analysis, config.threshold, config.top_n);
            println!("{}", envelope.to_json()?);
        }
        OutputFormat::Csv => {
            let csv = CsvReport::from_analysis(&analysis);
            print!("{}", csv.to_csv());
        }
    }

    Ok(())
}
