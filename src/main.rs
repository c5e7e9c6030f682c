//! dbpulse CLI entry point

use anyhow::{Context, Result};
use dbpulse::config::{cli::Cli, toml, validator, Config};
use dbpulse::coordinator::{self, CycleSettings, TpsSettings};
use dbpulse::corpus::index::AvailabilityIndex;
use dbpulse::corpus::{pattern, session_name, Corpus};
use dbpulse::output::{json, text, RunOutcome};
use dbpulse::session::{Session, StatsLayout};
use dbpulse::store;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);
    cli.validate()?;

    let config = toml::build_config(&cli)?;
    validator::validate_config(&config).context("Configuration validation failed")?;

    println!("dbpulse v{}", env!("CARGO_PKG_VERSION"));
    println!("Data store load generator");
    println!();
    println!("Configuration:");
    println!("{}", config);

    if cli.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }
    println!();

    run(&config)
}

/// Log to stderr; `RUST_LOG` wins over `-v`
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .ok();
}

fn run(config: &Config) -> Result<()> {
    let workload = &config.workload;
    let reused = workload.session.is_some();
    let name = match workload.session {
        Some(ref name) => name.clone(),
        None => {
            let mut rng = match workload.seed {
                Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
                None => Xoshiro256PlusPlus::from_entropy(),
            };
            session_name(&mut rng)
        }
    };

    text::print_banner(config, &name);

    let (corpus, index) = if workload.stored_patterns {
        pattern::load_patterns(&config.store.patterns).context("Failed to load stored patterns")?
    } else {
        info!(
            partitions = workload.loops,
            records = workload.iterations,
            "creating data pattern"
        );
        let corpus = Corpus::generate(&workload.corpus_shape())
            .context("Failed to generate data pattern")?;
        (corpus, AvailabilityIndex::new())
    };

    if let Some(ref dir) = config.output.export_patterns {
        let files = pattern::export_patterns(&corpus, dir).context("Failed to export patterns")?;
        println!("Exported {} pattern file(s) to {}", files.len(), dir.display());
    }

    let store = store::open(&config.store, reused, workload.seed)
        .with_context(|| format!("Failed to open {} store", config.store.kind))?;

    let layout = StatsLayout {
        histogram_max: config.output.histogram_max(),
        buckets: config.output.histogram_buckets,
    };
    let session = Session::new(name, corpus, index, store, layout)?
        .reused(reused)
        .verify(workload.verify);
    session.prepare().context("Failed to create test tables")?;

    let outcome = if workload.tps {
        let settings = TpsSettings::from_config(workload)?;
        RunOutcome::Tps(coordinator::run_tps(&session, &settings)?)
    } else {
        let settings = CycleSettings::from_config(workload);
        RunOutcome::Cycles(coordinator::run_cycles(&session, &settings)?)
    };

    text::print_results(&outcome, &session, &config.output);

    if let Some(ref path) = config.output.json_output {
        let report = json::build_report(config, &session, &outcome);
        json::write_json_output(path, &report, true)?;
        println!("JSON report written to {}", path.display());
    }

    Ok(())
}
