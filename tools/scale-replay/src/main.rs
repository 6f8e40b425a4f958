//! scale-replay - run the scale filter against a recorded batch
//!
//! Plays the host side of the plugin lifecycle: builds the configuration
//! category, calls `init`, feeds a JSON batch through `ingest` (optionally a
//! second time after `reconfigure`) and prints every forwarded batch.

mod settings;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use scale_filter::{
    plugin_info, BufferedOutput, MemoryAssetTracker, ReadingSet, ScaleFilter, FILTER_NAME,
};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scale-replay")]
#[command(about = "Replay reading batches through the scale filter")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error) or filter directive; RUST_LOG wins when set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print plugin information and the default configuration
    Info {
        /// Pretty-print JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Scale a batch and print the forwarded result
    Run {
        /// Batch file (JSON array of readings), `-` for stdin
        #[arg(short, long)]
        input: PathBuf,

        /// Settings file (toml, yaml or json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Settings applied through reconfigure before a second ingest
        #[arg(short, long)]
        reconfigure: Option<PathBuf>,

        /// Configuration category name reported to asset tracking
        #[arg(long, default_value = FILTER_NAME)]
        category: String,

        /// Pretty-print JSON
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Commands::Info { pretty } => write_json(&mut stdout, &plugin_info(), pretty),
        Commands::Run {
            input,
            config,
            reconfigure,
            category,
            pretty,
        } => {
            let batch = read_batch(&input, std::io::stdin().lock())?;
            replay(
                batch,
                config.as_deref(),
                reconfigure.as_deref(),
                &category,
                &mut stdout,
                pretty,
            )
        },
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run the host lifecycle over `batch` and write every forwarded batch to `out`
fn replay<W: Write>(
    batch: ReadingSet,
    config: Option<&Path>,
    reconfigure: Option<&Path>,
    category_name: &str,
    out: &mut W,
    pretty: bool,
) -> Result<()> {
    let settings = settings::load_settings(config)?;
    let category = settings::to_category(category_name, &settings)?;

    let tracker = Arc::new(MemoryAssetTracker::new());
    let mut filter = ScaleFilter::init(&category, BufferedOutput::new())
        .context("Failed to initialize scale filter")?
        .with_asset_tracker(Arc::clone(&tracker));

    filter.ingest(batch.clone());

    if let Some(path) = reconfigure {
        let updated = settings::load_settings(Some(path))?;
        let document = serde_json::to_string(&updated)?;
        filter
            .reconfigure(&document)
            .context("Failed to reconfigure scale filter")?;
        filter.ingest(batch);
    }

    for forwarded in filter.output_mut().take() {
        write_batch(out, &forwarded, pretty)?;
    }
    filter.shutdown();

    for tuple in tracker.tuples() {
        info!("Asset tracked: {}", tuple);
    }
    Ok(())
}

/// Read a batch from `input`, or from `stdin` when `input` is `-`
fn read_batch<R: Read>(input: &Path, mut stdin: R) -> Result<ReadingSet> {
    let content = if input.as_os_str() == "-" {
        let mut buf = String::new();
        stdin
            .read_to_string(&mut buf)
            .context("Failed to read batch from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read batch file {}", input.display()))?
    };

    serde_json::from_str(&content).context("Batch must be a JSON array of readings")
}

/// JSON has no NaN or infinity; serde_json would write them as `null`
fn write_batch<W: Write>(out: &mut W, batch: &ReadingSet, pretty: bool) -> Result<()> {
    for reading in batch.readings() {
        if let Some(dp) = reading.datapoints.iter().find(|dp| !dp.value.is_finite()) {
            bail!(
                "Datapoint '{}' of asset '{}' holds a non-finite float that JSON cannot represent",
                dp.name,
                reading.asset_name
            );
        }
    }
    write_json(out, batch, pretty)
}

fn write_json<W: Write, T: serde::Serialize>(out: &mut W, value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writeln!(out, "{}", json)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // unwrap is acceptable in tests
mod tests {
    use super::*;
    use figment::Jail;
    use scale_filter::Value;
    use tempfile::{Builder, NamedTempFile};

    const BATCH: &str = r#"[{"asset_name": "pump", "datapoints": [{"name": "speed", "value": 10}]}]"#;

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn speed(batch: &ReadingSet) -> Value {
        batch.readings()[0].datapoint("speed").unwrap().value.clone()
    }

    // Runs `replay` with a clean environment and parses one batch per line
    fn replay_lines(
        batch: &str,
        config: &NamedTempFile,
        reconfigure: Option<&NamedTempFile>,
    ) -> Result<Vec<ReadingSet>> {
        let input = temp_file(".json", batch);
        let mut result = None;
        Jail::expect_with(|jail| {
            jail.clear_env();
            let run = || -> Result<Vec<ReadingSet>> {
                let batch = read_batch(input.path(), std::io::empty())?;
                let mut out = Vec::new();
                replay(
                    batch,
                    Some(config.path()),
                    reconfigure.map(|f| f.path()),
                    "scale",
                    &mut out,
                    false,
                )?;
                let text = String::from_utf8(out)?;
                text.lines()
                    .map(|line| Ok(serde_json::from_str::<ReadingSet>(line)?))
                    .collect()
            };
            result = Some(run());
            Ok(())
        });
        result.unwrap()
    }

    #[test]
    fn test_replay_forwards_one_batch() {
        let config = temp_file(".yaml", "enable: true
factor: 2
");
        let forwarded = replay_lines(BATCH, &config, None).unwrap();

        assert_eq!(forwarded.len(), 1);
        assert_eq!(speed(&forwarded[0]), Value::Integer(20));
    }

    #[test]
    fn test_replay_reconfigure_ingests_again() {
        let config = temp_file(".yaml", "enable: true
factor: 2
");
        let reconfigure = temp_file(".toml", "enable = true
factor = 3
offset = 1
");
        let forwarded = replay_lines(BATCH, &config, Some(&reconfigure)).unwrap();

        assert_eq!(forwarded.len(), 2);
        assert_eq!(speed(&forwarded[0]), Value::Integer(20));
        assert_eq!(speed(&forwarded[1]), Value::Integer(31));
    }

    #[test]
    fn test_replay_rejects_invalid_reconfigure() {
        let config = temp_file(".yaml", "enable: true
");
        let reconfigure = temp_file(".yaml", "match: \"pump([\"
");
        let err = replay_lines(BATCH, &config, Some(&reconfigure)).unwrap_err();
        assert!(err.to_string().contains("reconfigure"));
    }

    #[test]
    fn test_replay_refuses_non_finite_output() {
        let config = temp_file(".yaml", "enable: true
factor: 10
");
        let batch = r#"[{"asset_name": "pump", "datapoints": [{"name": "speed", "value": 1e308}]}]"#;
        let err = replay_lines(batch, &config, None).unwrap_err();
        assert!(err.to_string().contains("non-finite"), "{}", err);
    }

    #[test]
    fn test_write_batch_keeps_finite_floats() {
        let batch: ReadingSet = serde_json::from_str(
            r#"[{"asset_name": "a", "datapoints": [{"name": "x", "value": 2.5}]}]"#,
        )
        .unwrap();
        let mut out = Vec::new();
        write_batch(&mut out, &batch, false).unwrap();

        let back: ReadingSet = serde_json::from_slice(&out).unwrap();
        assert_eq!(back, batch);
    }

    #[test]
    fn test_write_batch_rejects_infinity() {
        let batch: ReadingSet = vec![scale_filter::Reading::single(
            "a",
            scale_filter::Datapoint::new("x", f64::INFINITY),
        )]
        .into();
        let mut out = Vec::new();

        assert!(write_batch(&mut out, &batch, false).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_read_batch_from_stdin() {
        let batch = read_batch(Path::new("-"), BATCH.as_bytes()).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(speed(&batch), Value::Integer(10));
    }

    #[test]
    fn test_read_batch_malformed() {
        let err = read_batch(Path::new("-"), "{not json".as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "Batch must be a JSON array of readings");

        let file = temp_file(".json", r#"{"asset_name": "pump"}"#);
        let err = read_batch(file.path(), std::io::empty()).unwrap_err();
        assert_eq!(err.to_string(), "Batch must be a JSON array of readings");
    }

    #[test]
    fn test_read_batch_missing_file() {
        let err = read_batch(Path::new("/nonexistent/batch.json"), std::io::empty()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read batch file"));
    }
}
