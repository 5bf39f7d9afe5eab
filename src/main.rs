mod categories;
mod cli;
mod db;
mod error;
mod export;
mod filename;
mod fmt;
mod fx;
mod ingest;
mod llm;
mod models;
mod ocr;
#[cfg(feature = "pdf")]
mod pdf;
mod reviewer;
mod settings;
mod store;

use clap::Parser;
use tracing_subscriber::{fmt as log_fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands, CostCenterCommands};

fn init_logging(verbose: bool) {
    // RUST_LOG > --verbose > warn
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("chit=debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(log_fmt::layer().with_target(false).with_writer(std::io::stderr).compact())
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Load { path } => cli::load::run(&path),
        Commands::Status => cli::status::run(),
        Commands::Backup { output } => cli::backup::run(output),
        Commands::Upload { paths, allow_duplicates } => cli::upload::run(&paths, allow_duplicates),
        Commands::List { reviewed, pending } => cli::receipts::list(reviewed, pending),
        Commands::Show { id } => cli::receipts::show(id),
        Commands::Review { id, fields } => cli::review::run(id, fields),
        Commands::Delete { id } => cli::receipts::delete(id),
        Commands::Split { id, cost_centers } => cli::review::split(id, &cost_centers),
        Commands::Reprice { fx_rate, markup } => cli::reprice::run(&fx_rate, markup.as_deref()),
        Commands::Clear { yes } => cli::receipts::clear(yes),
        Commands::Export { command } => cli::export::dispatch(command),
        Commands::Suggest { field } => cli::categories::suggest(&field),
        Commands::CostCenters { command } => match command {
            CostCenterCommands::List => cli::categories::list_cost_centers(),
            CostCenterCommands::Add { name } => cli::categories::add(&name),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
