use anyhow::{Context, Result};
use clap::Parser;
use statmine::{
    analysis::{run_to_workbook, Analyzer},
    cli::Cli,
    config::AnalysisConfig,
    dataset::Group,
    report,
};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Config file (or defaults) with command-line flags applied on top
fn load_config(args: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_toml_file(path)?,
        None => AnalysisConfig::default(),
    };

    config.paired |= args.paired;
    config.describe |= args.describe;
    config.skip_failed_tests |= args.skip_failed;
    if args.significant_only {
        config.report_all = false;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = load_config(&args)?;

    let groups = args
        .groups
        .iter()
        .map(Group::from_file)
        .collect::<Result<Vec<_>>>()?;
    let control = args.control.as_ref().map(Group::from_file).transpose()?;

    let analyzer = Analyzer::new(&groups, control.as_ref(), &config)?;

    if args.json {
        let (analysis, _) = run_to_workbook(&analyzer, &args.output_dir, &mut io::sink())
            .context("Analysis failed")?;
        println!("{}", report::to_json(&analysis)?);
    } else {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let (_, path) =
            run_to_workbook(&analyzer, &args.output_dir, &mut out).context("Analysis failed")?;
        writeln!(out, "Results written to {}", path.display())?;
    }

    Ok(())
}
