use anyhow::{Context, Result};
use clap::Parser;
use tracemint::{
    cli::Cli, config::MiningConfig, context::AnalysisContext, parser::LogParser, pipeline,
};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for progress and debug output
fn init_tracing(verbose: bool, debug: bool) {
    let level = if debug {
        tracing::Level::TRACE
    } else if verbose {
        tracing::Level::DEBUG
    } else {
        return;
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose, args.debug);

    let mut config = match &args.config {
        Some(path) => MiningConfig::from_toml_file(path)?,
        None => MiningConfig::default(),
    };
    args.apply_to(&mut config);
    config.validate()?;

    let parser = LogParser::new(
        &args.regexps,
        args.separator.as_deref(),
        args.ignore_non_matching,
    )?
    .with_partition_mapping(&args.partition_mapping)?
    .with_ignore_parse_errors(args.ignore_parse_errors);

    if args.debug_parse {
        for line in parser.debug_files(&args.logs)? {
            println!("{line}");
        }
        return Ok(());
    }
    let traces = parser.parse_files(&args.logs)?;

    let mut ctx = AnalysisContext::new();
    let output = pipeline::run(&traces, &config, &mut ctx).context("Model inference failed")?;
    let json = serde_json::to_string_pretty(&output).context("Failed to serialize result")?;

    match &args.output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
