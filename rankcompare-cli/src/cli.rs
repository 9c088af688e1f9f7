use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use rankcompare_core::{AlignmentMode, BatchPolicy, ComparisonSettings, Metric, PValueTail};

#[derive(Parser, Debug)]
#[command(name = "rankcompare")]
#[command(about = "Compare every ranking of one table with every ranking of another")]
pub struct Args {
    /// Rankings forming the rows of every matrix
    pub table_a: PathBuf,

    /// Rankings forming the columns of every matrix
    pub table_b: PathBuf,

    /// Distance: kt, ktw or emd
    #[arg(short, long, value_parser = Metric::from_name)]
    pub metric: Option<Metric>,

    /// Permutation rounds per pair
    #[arg(short, long)]
    pub niter: Option<usize>,

    /// Run the permutation test instead of only computing distances
    #[arg(short, long)]
    pub test: bool,

    /// Master seed. A seed is drawn and logged if none is given
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Worker threads
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Side of the null distribution counted by the p-value: lower or upper
    #[arg(long)]
    pub tail: Option<PValueTail>,

    /// Restrict each pair on its own (pairwise) or all rankings at once (shared)
    #[arg(long)]
    pub alignment: Option<AlignmentMode>,

    /// Report failing pairs as NaN cells instead of aborting
    #[arg(long)]
    pub skip_failed: bool,

    /// Write the null distance of every round
    #[arg(long)]
    pub retain_null: bool,

    /// YAML settings file. Flags given on the command line take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory the matrices are written to
    #[arg(short, long, default_value = "rankcompare-out")]
    pub output: PathBuf,

    /// off, error, warn, info, debug or trace
    #[arg(long, default_value = "info", value_parser = parse_level)]
    pub log_level: log::LevelFilter,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Defaults, overridden by the settings file, overridden by the flags.
    pub fn settings(&self) -> anyhow::Result<ComparisonSettings> {
        let mut settings = match &self.config {
            Some(path) => load_settings(path)?,
            None => ComparisonSettings::default(),
        };
        self.apply(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    fn apply(&self, settings: &mut ComparisonSettings) {
        if let Some(metric) = self.metric {
            settings.metric = metric;
        }
        if let Some(niter) = self.niter {
            settings.niter = niter;
        }
        if self.test {
            settings.test_mode = true;
        }
        if let Some(seed) = self.seed {
            settings.seed = Some(seed);
        }
        if let Some(threads) = self.threads {
            settings.parallelism = threads;
        }
        if let Some(tail) = self.tail {
            settings.pvalue_tail = tail;
        }
        if let Some(alignment) = self.alignment {
            settings.alignment = alignment;
        }
        if self.skip_failed {
            settings.batch_policy = BatchPolicy::SkipAndReport;
        }
        if self.retain_null {
            settings.retain_null_distributions = true;
        }
    }
}

fn parse_level(level: &str) -> Result<log::LevelFilter, String> {
    level
        .parse()
        .map_err(|_| format!("unknown log level {:?}", level))
}

pub fn load_settings(path: &Path) -> anyhow::Result<ComparisonSettings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read settings from {}", path.display()))?;
    parse_settings(&content).with_context(|| format!("invalid settings in {}", path.display()))
}

fn parse_settings(content: &str) -> anyhow::Result<ComparisonSettings> {
    Ok(serde_yaml::from_str(content)?)
}
