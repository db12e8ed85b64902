pub mod cli;
pub mod config;
pub mod dates;
pub mod dumper;
pub mod error;
pub mod external;
pub mod progress;
pub mod query;
pub mod runner;

pub async fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let args = cli::Cli::parse();

    // Configure logger based on debug flag
    if args.debug {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
        log::debug!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    // Enable colors if not in quiet mode
    if !args.quiet {
        console::set_colors_enabled(true);
        log::debug!("Console colors enabled");
    }

    let config = config::DumpConfig::from_file(&args.config)?;
    let dates = dates::resolve_dates(&args)?;

    log::info!(
        "Dumping {} date(s) from database {} into {}",
        dates.len(),
        config.database,
        config.dump_root.display()
    );

    let client = external::PsqlClient::new(config::ClientSettings::from_cli(&args));
    let compressor = external::CommandCompressor;
    let options = runner::RunOptions {
        compression: args.compression().map(str::to_string),
        min_size: args.min_size,
        strict: args.strict,
        quiet: args.quiet,
    };

    // Per-date failures are logged by the runner and do not change the exit status
    let summary = runner::dump_dates(&config, &client, &compressor, &dates, &options).await?;
    if !summary.is_clean() {
        log::warn!("Some dates did not produce an output file");
    }

    Ok(())
}
