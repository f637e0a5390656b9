use anyhow::{Context, bail};
use clap::Parser;
use isbn_sweep::{BODY_SPACE, PartitionPlan, PartitionSettings, Prefix};
use std::{path::PathBuf, time::Duration};

/// Runtime configuration for the `isbn-sweep` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is honoured), with defaults that sweep both bookland prefixes across
/// eight workers.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "isbn-sweep",
    version,
    about = "Generates every allocated ISBN-13 into per-partition gzip files"
)]
pub struct CliArgs {
    /// Path to the allocation directory JSON.
    ///
    /// Environment variable: `ISBN_DIRECTORY`
    #[arg(long, env = "ISBN_DIRECTORY", default_value = "data/isbn_directory.json")]
    pub directory: PathBuf,

    /// Directory that receives `<prefix>_<index>.txt.gz` files. Created if
    /// missing.
    ///
    /// Environment variable: `OUTPUT_DIR`
    #[arg(long, env = "OUTPUT_DIR", default_value = "isbn")]
    pub output_dir: PathBuf,

    /// Comma-separated prefixes to sweep.
    ///
    /// Environment variable: `PREFIXES`
    #[arg(long, env = "PREFIXES", value_delimiter = ',', default_value = "978,979")]
    pub prefixes: Vec<String>,

    /// Number of 9-digit bodies to sweep under each prefix, starting at 0.
    ///
    /// Environment variable: `BODY_SPACE`
    #[arg(long, env = "BODY_SPACE", default_value_t = BODY_SPACE)]
    pub space: u64,

    /// Bodies generated and validated per batch.
    ///
    /// Environment variable: `CHUNK_SIZE`
    #[arg(long, env = "CHUNK_SIZE", default_value_t = 1_000_000)]
    pub chunk_size: usize,

    /// Accepted identifiers buffered before a bulk write to the gzip stream.
    ///
    /// Environment variable: `FLUSH_SIZE`
    #[arg(long, env = "FLUSH_SIZE", default_value_t = 100_000)]
    pub flush_size: usize,

    /// Number of workers, which is also the number of partitions per prefix.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = 8)]
    pub num_workers: usize,

    /// gzip level (0-9) of the output files.
    ///
    /// Environment variable: `COMPRESSION_LEVEL`
    #[arg(long, env = "COMPRESSION_LEVEL", default_value_t = 5)]
    pub compression_level: u32,

    /// Restrict the run to these partitions, as `PREFIX:INDEX` pairs.
    ///
    /// Partition bounds are computed exactly as for a full run, so a failed
    /// partition can be regenerated on its own.
    ///
    /// Example: `--only 978:3,979:0`
    ///
    /// Environment variable: `ONLY_PARTITIONS`
    #[arg(long, env = "ONLY_PARTITIONS", value_delimiter = ',')]
    pub only: Vec<String>,

    /// Seconds to wait for each worker to acknowledge shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub directory: PathBuf,
    pub output_dir: PathBuf,
    pub prefixes: Vec<Prefix>,
    pub space: u64,
    pub num_workers: usize,
    pub settings: PartitionSettings,
    pub only: Vec<(Prefix, usize)>,
    pub shutdown_timeout: Duration,
}

impl RunConfig {
    /// Every partition this run is responsible for.
    pub fn plan(&self) -> isbn_sweep::Result<PartitionPlan> {
        let plan = PartitionPlan::new(&self.prefixes, self.space, self.num_workers)?;
        if self.only.is_empty() {
            Ok(plan)
        } else {
            Ok(plan.only(&self.only))
        }
    }
}

fn parse_only(entry: &str) -> anyhow::Result<(Prefix, usize)> {
    let (prefix, index) = entry
        .trim()
        .split_once(':')
        .with_context(|| format!("ONLY_PARTITIONS entry {entry:?} is not PREFIX:INDEX"))?;
    let prefix: Prefix = prefix.parse()?;
    let index = index
        .parse()
        .with_context(|| format!("ONLY_PARTITIONS entry {entry:?} has a bad index"))?;
    Ok((prefix, index))
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        if args.space > BODY_SPACE {
            bail!("BODY_SPACE ({}) exceeds the 9-digit body space ({BODY_SPACE})", args.space);
        }

        let mut prefixes = Vec::with_capacity(args.prefixes.len());
        for text in args.prefixes.iter().filter(|p| !p.trim().is_empty()) {
            let prefix: Prefix = text.parse()?;
            if !prefixes.contains(&prefix) {
                prefixes.push(prefix);
            }
        }
        if prefixes.is_empty() {
            bail!("PREFIXES must name at least one prefix");
        }

        let settings = PartitionSettings {
            chunk_size: args.chunk_size,
            flush_size: args.flush_size,
            compression_level: args.compression_level,
        };
        settings.validate()?;

        let only = args
            .only
            .iter()
            .filter(|entry| !entry.trim().is_empty())
            .map(|entry| parse_only(entry))
            .collect::<anyhow::Result<Vec<_>>>()?;
        for &(prefix, index) in &only {
            if !prefixes.contains(&prefix) {
                bail!("ONLY_PARTITIONS names prefix {prefix}, which is not in PREFIXES");
            }
            if index >= args.num_workers {
                bail!(
                    "ONLY_PARTITIONS index {index} is out of range for {} workers",
                    args.num_workers
                );
            }
        }

        Ok(Self {
            directory: args.directory,
            output_dir: args.output_dir,
            prefixes,
            space: args.space,
            num_workers: args.num_workers,
            settings,
            only,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> anyhow::Result<RunConfig> {
        let mut argv = vec!["isbn-sweep", "--directory", "dir.json", "--output-dir", "out"];
        argv.extend_from_slice(extra);
        RunConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn accepts_documented_defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.prefixes, [Prefix::BOOKLAND, Prefix::BOOKLAND_EXT]);
        assert_eq!(config.space, BODY_SPACE);
        assert_eq!(config.num_workers, 8);
        assert_eq!(config.settings, PartitionSettings::default());
        assert!(config.only.is_empty());

        let plan = config.plan().unwrap();
        assert_eq!(plan.len(), 16);
        assert_eq!(plan.total_candidates(), 2 * BODY_SPACE);
    }

    #[test]
    fn only_filters_plan_without_moving_bounds() {
        let config = parse(&["--only", "979:7,978:0"]).unwrap();
        let plan = config.plan().unwrap();
        assert_eq!(plan.len(), 2);
        let p = plan.partitions()[1];
        assert_eq!((p.prefix, p.index), (Prefix::BOOKLAND_EXT, 7));
        assert_eq!((p.start, p.stop), (875_000_000, BODY_SPACE));
    }

    #[test]
    fn dedupes_prefixes() {
        let config = parse(&["--prefixes", "979,979,978"]).unwrap();
        assert_eq!(config.prefixes, [Prefix::BOOKLAND_EXT, Prefix::BOOKLAND]);
    }

    #[test]
    fn rejects_invalid_values() {
        for extra in [
            &["--num-workers", "0"][..],
            &["--space", "1000000001"],
            &["--prefixes", "97"],
            &["--chunk-size", "0"],
            &["--flush-size", "0"],
            &["--compression-level", "10"],
            &["--only", "978"],
            &["--only", "978:x"],
            &["--only", "977:0"],
            &["--only", "978:8"],
        ] {
            assert!(parse(extra).is_err(), "expected {extra:?} to be rejected");
        }
    }
}
