use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use series_ranking::{
    normalize_race, write_race_points, write_standings, ConsoleResolver, CsvRaceLoader,
    DuplicateCandidate, PointsDirLoader, PolicyResolver, RaceId, RaceLoader, RaceResults,
    Resolution, SeasonConfig, SeasonPipeline, SeasonReport, Standings,
};

const EXIT_CONFIG: i32 = 2;
const EXIT_FAILURE: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "series-ranking")]
#[command(about = "Season standings for an orienteering race series", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ./series.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score one race and export points_<ID>.csv
    Race {
        /// ORIS event id
        id: RaceId,

        /// Read results from a CSV file instead of ORIS
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Compute standings from every points_*.csv in the output directory
    Overall {
        /// Directory with points files (defaults to output_dir from config)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Resolve duplicates without asking: keep-left, keep-right or keep-both
        #[arg(long)]
        auto: Option<Resolution>,
    },
    /// Interactive command loop (default)
    Shell,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = match SeasonConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Shell) {
        Commands::Race { id, file } => run_race(&config, id, file.as_deref()),
        Commands::Overall { dir, auto } => run_overall(&config, dir.as_deref(), auto),
        Commands::Shell => run_shell(&config),
    };

    if let Err(e) = result {
        eprintln!("❌ {:#}", e);
        std::process::exit(EXIT_FAILURE);
    }
}

// ============================================================================
// race
// ============================================================================

fn load_race(config: &SeasonConfig, id: RaceId, file: Option<&Path>) -> Result<RaceResults> {
    if let Some(path) = file {
        return CsvRaceLoader::new(path).load(id);
    }
    load_from_oris(config, id)
}

#[cfg(feature = "oris")]
fn load_from_oris(config: &SeasonConfig, id: RaceId) -> Result<RaceResults> {
    series_ranking::OrisClient::new(&config.oris_url).load(id)
}

#[cfg(not(feature = "oris"))]
fn load_from_oris(_config: &SeasonConfig, _id: RaceId) -> Result<RaceResults> {
    Err(anyhow::anyhow!(
        "ORIS support not compiled in; pass --file or rebuild with --features oris"
    ))
}

fn run_race(config: &SeasonConfig, id: RaceId, file: Option<&Path>) -> Result<()> {
    println!("📂 Loading race {}...", id);
    let race = load_race(config, id, file)?;

    if let Some(info) = &race.info {
        println!("Race name: {}", info.name);
        match info.date {
            Some(date) => println!("Race date: {}", date.format("%d.%m.%Y")),
            None => println!("Race date: unknown"),
        }
    }

    let normalized = normalize_race(race.race_id, &race.rows, config)
        .with_context(|| format!("Race {} rejected", id))?;

    let path = write_race_points(&config.output_dir, id, &normalized.rows)?;
    println!(
        "✓ Race scored: {} runners ({} rows outside series categories)",
        normalized.rows.len(),
        normalized.skipped_rows
    );
    println!("✓ Saved to {}", path.display());

    Ok(())
}

// ============================================================================
// overall
// ============================================================================

fn run_overall(config: &SeasonConfig, dir: Option<&Path>, auto: Option<Resolution>) -> Result<()> {
    let dir = dir.unwrap_or(config.output_dir.as_path());
    let loader = PointsDirLoader::new(dir);
    let races = loader.load_all()?;
    if races.is_empty() {
        println!("No points_*.csv files in {}", dir.display());
        return Ok(());
    }
    println!("📊 Computing standings from {} races in {}", races.len(), loader.source_name());

    let pipeline = SeasonPipeline::new(config);
    let (standings, report) = match auto {
        Some(fixed) => {
            let mut resolver = PolicyResolver::new(move |_: &DuplicateCandidate<'_>| fixed);
            pipeline.run(races, &mut resolver)?
        }
        None => {
            let stdin = io::stdin();
            let mut resolver = ConsoleResolver::new(stdin.lock(), io::stdout());
            pipeline.run(races, &mut resolver)?
        }
    };

    print_report(&report);

    let paths = write_standings(&config.output_dir, &standings)?;
    print_summary(&standings);
    for path in paths {
        println!("✓ Saved {}", path.display());
    }

    Ok(())
}

fn print_report(report: &SeasonReport) {
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Races folded: {:?}", report.folded_races());
    for (race_id, error) in &report.rejected {
        println!("❌ Race {} rejected: {}", race_id, error);
    }
    for warning in report.warnings() {
        println!("⚠️  {}", warning);
    }
    println!(
        "✓ Duplicates: {} offered, {} merged, {} kept apart",
        report.merge.candidates, report.merge.merged, report.merge.kept_separate
    );
}

fn print_summary(standings: &Standings) {
    for category in &standings.categories {
        println!(
            "\n{} (best {} of {})",
            category.category,
            category.counted,
            category.race_ids.len()
        );
        for ranked in category.rows.iter().take(3) {
            println!("  {:>3}. {:<30} {:>5}", ranked.rank, ranked.row.name, ranked.total);
        }
    }
}

// ============================================================================
// shell
// ============================================================================

fn print_help() {
    println!("Available commands:");
    println!("\thelp\t...\tshow this help");
    println!("\trace\t...\tscore one race and export its points");
    println!("\toverall\t...\tcompute standings for all races in the output directory");
    println!("\tquit\t...\texit");
}

fn ask(prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn run_shell(config: &SeasonConfig) -> Result<()> {
    println!("=== Series ranking - season standings ===");
    print_help();

    while let Some(command) = ask("> ")? {
        let outcome = match command.as_str() {
            "help" => {
                print_help();
                Ok(())
            }
            "race" => match ask("ORIS event id:\n---> ")? {
                Some(text) => match text.parse::<RaceId>() {
                    Ok(id) => run_race(config, id, None),
                    Err(_) => {
                        println!("Not a valid event id: '{}'", text);
                        Ok(())
                    }
                },
                None => break,
            },
            "overall" => run_overall(config, None, None),
            "quit" => break,
            "" => Ok(()),
            other => {
                println!("Unknown command: '{}'", other);
                Ok(())
            }
        };

        // One failed command doesn't end the session
        if let Err(e) = outcome {
            eprintln!("❌ {:#}", e);
        }
    }

    Ok(())
}
