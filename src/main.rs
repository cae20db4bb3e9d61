use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use fis_race_info::{prompt, summary, FisScraperBuilder, RaceError};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Outil pour récupérer les informations des courses FIS
#[derive(Debug, Parser)]
#[command(name = "fis-race-info", version, about)]
struct Args {
    /// Codex FIS de la course
    #[arg(short, long)]
    codex: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<RaceError>() {
                Some(err) => eprintln!("Erreur: {}", err),
                None => {
                    error!("{:?}", e);
                    eprintln!("Une erreur inconnue est survenue: {:#}", e);
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let codex = prompt::resolve_codex(args.codex)?;
    let scraper = FisScraperBuilder::default().build()?;

    println!("Récupération des informations de la course...");
    let info = scraper.scrape(&codex).await?;
    println!("URL de la page de la course: {}", info.url);
    summary::print(&codex, &info)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
