use std::{
    fs::OpenOptions,
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::Context;
use clap::Parser;
use fern::colors::ColoredLevelConfig;
use rankcompare_orchestrator::ComparisonOrchestrator;
use rankcompare_permutation::PermutationEngine;

mod cli;
mod tsv;

fn setup_logging(level: log::LevelFilter, log_file: Option<&Path>) -> anyhow::Result<()> {
    let colors = ColoredLevelConfig::new()
        .debug(fern::colors::Color::Cyan)
        .info(fern::colors::Color::Green)
        .warn(fern::colors::Color::Yellow)
        .error(fern::colors::Color::Red);

    let mut dispatch = fern::Dispatch::new()
        .format(move |out, message, record| {
            let start_length = record.target().len();
            let max_len = 30;
            let (target, target_padding) = if start_length > max_len {
                (&record.target()[start_length - max_len..], "".to_string())
            } else {
                (record.target(), " ".repeat(max_len - start_length))
            };
            out.finish(format_args!(
                "[{}{}][{}] {}",
                target,
                target_padding,
                colors.color(record.level()),
                message
            ))
        })
        .level(level)
        // Every single intersection is traced, which drowns everything else.
        .level_for("rankcompare_core::ranked_set", level.min(log::LevelFilter::Debug))
        .chain(std::io::stdout());

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("could not open log file {}", path.display()))?;
        dispatch = dispatch.chain(file);
    }

    dispatch
        .apply()
        .map_err(|err| anyhow::anyhow!("could not install the logger: {}", err))
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    setup_logging(args.log_level, args.log_file.as_deref())?;

    let settings = args.settings()?;
    log::debug!("Settings: {:?}", settings);

    let table_a = tsv::read_table(&args.table_a)?;
    let table_b = tsv::read_table(&args.table_b)?;

    let rounds = Arc::new(AtomicU64::new(0));
    let engine = PermutationEngine::from_settings(&settings)?.with_progress(rounds.clone());
    let orchestrator = ComparisonOrchestrator::with_engine(settings, engine)?;

    let result = orchestrator
        .compare(&table_a, &table_b)
        .context("comparison failed")?;

    for failure in &result.failures {
        log::warn!(
            "{} against {} was skipped: {}",
            failure.row,
            failure.column,
            failure.error
        );
    }

    let written = tsv::write_result(&args.output, &result)?;
    log::info!(
        "Wrote {} file(s) to {} after {} permutation round(s), seed {}",
        written.len(),
        args.output.display(),
        rounds.load(Ordering::Relaxed),
        result.seed
    );
    Ok(())
}
