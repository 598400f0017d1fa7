//! Cassette CLI

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use cassette::{RecordMode, Session};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Cassette v{}", env!("CARGO_PKG_VERSION"));
        eprintln!();
        eprintln!("Usage: cassette <command> <cassette-file>");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  stats     Show interaction counts");
        eprintln!("  list      List recorded interactions");
        process::exit(1);
    }

    let path = PathBuf::from(&args[2]);
    let result = match args[1].as_str() {
        "stats" => show_stats(&path),
        "list" => list_interactions(&path),
        command => {
            eprintln!("Unknown command: {command}");
            eprintln!("Run 'cassette' for usage information.");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn load(path: &Path) -> anyhow::Result<Session> {
    if !path.exists() {
        bail!("Cassette not found: {}", path.display());
    }
    Session::open(path, RecordMode::None)
        .with_context(|| format!("Failed to load cassette {}", path.display()))
}

fn show_stats(path: &Path) -> anyhow::Result<()> {
    let session = load(path)?;

    let mut per_method: BTreeMap<&str, usize> = BTreeMap::new();
    let mut urls = std::collections::BTreeSet::new();
    for interaction in session.interactions() {
        *per_method.entry(interaction.request.method.as_str()).or_default() += 1;
        urls.insert(interaction.request.url.as_str());
    }

    println!("Cassette: {}", path.display());
    println!("Interactions: {}", session.len());
    println!("Distinct URLs: {}", urls.len());
    for (method, count) in per_method {
        println!("  {method:<8} {count}");
    }

    Ok(())
}

fn list_interactions(path: &Path) -> anyhow::Result<()> {
    let session = load(path)?;

    for interaction in session.interactions() {
        println!(
            "{} {} {} -> {}",
            interaction.recorded_at,
            interaction.request.method,
            interaction.request.url,
            interaction.response.status
        );
    }

    Ok(())
}
