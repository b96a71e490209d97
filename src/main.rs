//! h5graph CLI - ingest HDF5 container trees into a property graph.

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use h5graph::{GraphStore, IngestReport, Ingestor, WriteSummary, store};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;

use cli::{Cli, Command, IngestArgs};

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("h5graph")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("h5graph.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn print_summary(summary: &WriteSummary) {
    println!("  {}: {}", "Nodes created".bold(), summary.nodes_created);
    println!("  {}: {}", "Relationships created".bold(), summary.relationships_created);
    println!("  {}: {}", "Time taken (ms)".bold(), summary.elapsed.as_millis());
}

fn print_file(report: &IngestReport) {
    println!(
        "{} Ingested: {} {}",
        "✓".green(),
        report.filepath,
        format!("({})", report.run).dimmed()
    );
    print_summary(&report.written);
    if report.walk.excluded > 0 {
        println!("  {}: {}", "Excluded".bold(), report.walk.excluded);
    }
    if report.dependencies > 0 {
        println!("  {}: {}", "Dependencies linked".bold(), report.dependencies);
    }
}

fn ingestor<'s, S: GraphStore + ?Sized>(store: &'s mut S, args: &IngestArgs) -> Result<Ingestor<'s, S>> {
    let config = args.to_config().context("Invalid ingest options")?;
    Ok(Ingestor::new(store, config)?.with_reset(args.reset))
}

fn print_reset(args: &IngestArgs) {
    if args.reset {
        println!("{} Reset graph store", "✓".green());
    }
}

fn run(cli: Cli) -> Result<()> {
    let store_config = cli.store_config();
    let mut store = store::open(&store_config).with_context(|| format!("Failed to open store {}", store_config.uri))?;

    match cli.command {
        Command::File { path, ingest } => {
            let report = ingestor(store.as_mut(), &ingest)?.ingest_file(&path, &ingest.depends_on)?;
            print_reset(&ingest);
            print_file(&report);
        }

        Command::Directory { dir, ingest } => {
            let report = ingestor(store.as_mut(), &ingest)?.ingest_directory(&dir, &ingest.depends_on)?;
            print_reset(&ingest);

            for file in &report.files {
                print_file(file);
            }
            if report.files.is_empty() {
                println!("{}", "No container files found".dimmed());
            } else {
                println!(
                    "{} {} file(s) from {} director(ies):",
                    "→".blue(),
                    report.files.len(),
                    report.directories
                );
                print_summary(&report.total());
            }
        }

        Command::Reset => {
            store.reset().context("Failed to reset graph store")?;
            println!("{} Reset graph store at {}", "✓".green(), store_config.uri);
        }

        Command::Stats => {
            let stats = store.stats().context("Failed to read graph stats")?;
            println!("{}: {}", "Files".bold(), stats.files);
            println!("{}: {}", "Groups".bold(), stats.groups);
            println!("{}: {}", "Datasets".bold(), stats.datasets);
            println!("{}: {}", "holds".bold(), stats.holds);
            println!("{}: {}", "depends_on".bold(), stats.depends_on);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
