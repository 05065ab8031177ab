//! SleepSort CLI — sorts a table of entities by sleeping on their keys.

mod config;
mod output;

use clap::Parser;
use config::{ConfigError, SleepSortConfig, VariantChoice};
use sleepsort_runtime::{Entity, SleepSorter, SortError, Variant, DEFAULT_UNIT};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sort(#[from] SortError),
    #[error("cannot write output: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(
    name = "sleepsort",
    version,
    about = "Sort entities by sleeping on their keys"
)]
struct Cli {
    /// Milliseconds of delay per unit of sort key (default: 1)
    #[arg(long)]
    unit_ms: Option<u64>,

    /// Which collector to run (default: both)
    #[arg(long, value_enum)]
    variant: Option<VariantChoice>,

    /// Config file (default: sleepsort.toml in this or a parent directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print elapsed time after each variant
    #[arg(long)]
    timing: bool,

    /// Log sort lifecycle events to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Flags layered over the config file.
#[derive(Debug)]
struct Settings {
    unit: Duration,
    variants: Vec<Variant>,
    entities: Vec<Entity>,
    timing: bool,
}

impl Settings {
    fn resolve(cli: &Cli, cfg: &SleepSortConfig) -> Result<Self, CliError> {
        let unit = cli
            .unit_ms
            .or(cfg.sort.unit_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_UNIT);
        let variants = cli
            .variant
            .or(cfg.sort.variant)
            .unwrap_or_default()
            .variants();
        Ok(Self {
            unit,
            variants,
            entities: cfg.entities()?,
            timing: cli.timing,
        })
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<SleepSortConfig, CliError> {
    if let Some(path) = &cli.config {
        return Ok(SleepSortConfig::load_from(path)?);
    }
    match SleepSortConfig::discover()? {
        Some((path, cfg)) => {
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(cfg)
        }
        None => Ok(SleepSortConfig::default()),
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let cfg = load_config(&cli)?;
    let settings = Settings::resolve(&cli, &cfg)?;
    tracing::debug!(
        entities = settings.entities.len(),
        unit_ms = settings.unit.as_millis() as u64,
        "resolved settings"
    );

    let sorter = SleepSorter::new(settings.unit);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for variant in settings.variants {
        let emissions = sorter.sort(variant, &settings.entities)?;
        output::write_variant(&mut out, emissions, settings.timing)?;
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", red("error:"), e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["sleepsort"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn no_flags_no_config_matches_reference_run() {
        let settings = Settings::resolve(&cli(&[]), &SleepSortConfig::default()).unwrap();
        assert_eq!(settings.unit, Duration::from_millis(1));
        assert_eq!(settings.variants, vec![Variant::Unbuffered, Variant::Buffered]);
        assert_eq!(settings.entities, config::default_table());
        assert!(!settings.timing);
    }

    #[test]
    fn flags_override_config() {
        let cfg = SleepSortConfig::parse(
            "[sort]\nunit_ms = 7\nvariant = \"buffered\"\n",
            Path::new("sleepsort.toml"),
        )
        .unwrap();

        let from_file = Settings::resolve(&cli(&[]), &cfg).unwrap();
        assert_eq!(from_file.unit, Duration::from_millis(7));
        assert_eq!(from_file.variants, vec![Variant::Buffered]);

        let flagged = Settings::resolve(
            &cli(&["--unit-ms", "2", "--variant", "unbuffered", "--timing"]),
            &cfg,
        )
        .unwrap();
        assert_eq!(flagged.unit, Duration::from_millis(2));
        assert_eq!(flagged.variants, vec![Variant::Unbuffered]);
        assert!(flagged.timing);
    }

    #[test]
    fn invalid_key_in_config_fails_resolution() {
        let cfg = SleepSortConfig::parse(
            "[[entity]]\nname = \"Ghost\"\nkey = -1\n",
            Path::new("sleepsort.toml"),
        )
        .unwrap();
        let err = Settings::resolve(&cli(&[]), &cfg).unwrap_err();
        assert!(matches!(err, CliError::Sort(SortError::InvalidKey { .. })));
        assert!(err.to_string().contains("Ghost"));
    }

    #[test]
    fn unknown_variant_flag_is_rejected() {
        assert!(Cli::try_parse_from(["sleepsort", "--variant", "sideways"]).is_err());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let err = load_config(&cli(&["--config", "/definitely/not/here.toml"])).unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::Read { .. })));
    }
}
