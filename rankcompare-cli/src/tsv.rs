//! Tab-separated ranking tables in, tab-separated matrices out.

use std::{
    collections::HashSet,
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use csv::{Position, ReaderBuilder, StringRecord, Trim, WriterBuilder};
use rankcompare_core::{InputError, Item, Matrix, RankCompareError, RankedSet, RankingTable};
use rankcompare_orchestrator::{ComparisonResult, PairFailure};

/// Read a ranking table. The table is labelled with its path.
pub fn read_table(path: &Path) -> anyhow::Result<RankingTable> {
    let file = File::open(path).with_context(|| format!("could not open {}", path.display()))?;
    let table = parse_table(&path.display().to_string(), file)?;
    log::info!(
        "Read {} ranking(s) from {}",
        table.len(),
        path.display()
    );
    Ok(table)
}

fn malformed(origin: &str, line: Option<u64>, reason: String) -> RankCompareError {
    let reason = match line {
        Some(line) => format!("line {}: {}", line, reason),
        None => reason,
    };
    InputError::Malformed {
        origin: origin.to_string(),
        reason,
    }
    .into()
}

fn line_of(record: &StringRecord) -> Option<u64> {
    record.position().map(Position::line)
}

/// Parse a ranking table from `reader`.
///
/// The header names the item column, then one ranking per column. Every other line holds an item
/// followed by its score in each ranking. Empty, `NA` and `nan` cells leave the item out of that
/// ranking. Rankings are ordered by descending score and ties keep the order of the file.
pub fn parse_table<R: Read>(origin: &str, reader: R) -> Result<RankingTable, RankCompareError> {
    let csv_error = |err: csv::Error| {
        let line = err.position().map(Position::line);
        malformed(origin, line, err.to_string())
    };

    // Field counts are checked below, so errors can say what was expected.
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let header = reader.headers().map_err(csv_error)?.clone();
    let header_line = line_of(&header).or(Some(1));
    if header.is_empty() {
        return Err(malformed(origin, None, "the file is empty".to_string()));
    }
    let names: Vec<String> = header.iter().skip(1).map(str::to_string).collect();
    if names.is_empty() {
        return Err(malformed(
            origin,
            header_line,
            "the header names no rankings".to_string(),
        ));
    }
    if names.iter().any(String::is_empty) {
        return Err(malformed(
            origin,
            header_line,
            "the header has an empty ranking name".to_string(),
        ));
    }

    let mut columns: Vec<Vec<(Item, f64)>> = vec![Vec::new(); names.len()];
    let mut seen: HashSet<Item> = HashSet::new();

    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let line = line_of(&record);
        if record.len() != header.len() {
            return Err(malformed(
                origin,
                line,
                format!("expected {} fields, found {}", header.len(), record.len()),
            ));
        }

        let item = &record[0];
        if item.is_empty() {
            return Err(malformed(origin, line, "the item id is empty".to_string()));
        }
        if !seen.insert(item.to_string()) {
            return Err(malformed(
                origin,
                line,
                format!("item {:?} appears twice", item),
            ));
        }

        for (column, cell) in columns.iter_mut().zip(record.iter().skip(1)) {
            if is_missing(cell) {
                continue;
            }
            let score: f64 = cell.parse().map_err(|_| {
                malformed(origin, line, format!("cannot parse score {:?}", cell))
            })?;
            if !score.is_finite() || score < 0.0 {
                return Err(malformed(
                    origin,
                    line,
                    format!("score {:?} is not a non-negative number", cell),
                ));
            }
            column.push((item.to_string(), score));
        }
    }

    let rankings = names
        .into_iter()
        .zip(columns)
        .map(|(name, mut entries)| {
            if entries.is_empty() {
                return Err(malformed(
                    origin,
                    header_line,
                    format!("ranking {:?} has no items", name),
                ));
            }
            // Stable, so tied items keep their file order.
            entries.sort_by(|a, b| b.1.total_cmp(&a.1));
            RankedSet::new(name, entries)
        })
        .collect::<Result<Vec<_>, _>>()?;

    RankingTable::new(origin, rankings)
}

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("nan")
}

/// Write `matrix` with `corner` in the top left cell.
pub fn write_matrix<W: Write>(out: W, corner: &str, matrix: &Matrix) -> csv::Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(out);
    writer.write_record(
        std::iter::once(corner).chain(matrix.column_names().iter().map(String::as_str)),
    )?;
    for (row, name) in matrix.row_names().iter().enumerate() {
        writer.write_record(
            std::iter::once(name.clone()).chain(matrix.row(row).iter().map(f64::to_string)),
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn write_matrix_file(path: PathBuf, corner: &str, matrix: &Matrix) -> anyhow::Result<PathBuf> {
    let file = File::create(&path).with_context(|| format!("could not create {}", path.display()))?;
    write_matrix(file, corner, matrix)
        .with_context(|| format!("could not write {}", path.display()))?;
    log::debug!("Wrote {}", path.display());
    Ok(path)
}

/// One line per skipped pair, under a `row`, `column`, `error` header.
pub fn write_failures<W: Write>(out: W, failures: &[PairFailure]) -> csv::Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(out);
    writer.write_record(["row", "column", "error"])?;
    for failure in failures {
        writer.write_record([
            failure.row.as_str(),
            failure.column.as_str(),
            failure.error.to_string().as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write every matrix of `result` to `dir`, returning the written paths.
pub fn write_result(dir: &Path, result: &ComparisonResult) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("could not create {}", dir.display()))?;
    let corner = result.metric.to_string();
    let mut written = vec![write_matrix_file(
        dir.join("distances.tsv"),
        &corner,
        &result.distances,
    )?];

    if let Some(pvalues) = &result.pvalues {
        written.push(write_matrix_file(dir.join("pvalues.tsv"), &corner, pvalues)?);
    }
    if let Some(summaries) = &result.null_summaries {
        written.push(write_matrix_file(dir.join("null_mean.tsv"), &corner, &summaries.mean)?);
        written.push(write_matrix_file(dir.join("null_std.tsv"), &corner, &summaries.std_dev)?);
        written.push(write_matrix_file(
            dir.join("null_zscore.tsv"),
            &corner,
            &summaries.z_score,
        )?);
    }
    if let Some(rounds) = &result.null_distributions {
        let null_dir = dir.join("null");
        fs::create_dir_all(&null_dir)
            .with_context(|| format!("could not create {}", null_dir.display()))?;
        for (round, matrix) in rounds.iter().enumerate() {
            written.push(write_matrix_file(
                null_dir.join(format!("round_{}.tsv", round)),
                &corner,
                matrix,
            )?);
        }
    }
    if !result.failures.is_empty() {
        let path = dir.join("failures.tsv");
        let file =
            File::create(&path).with_context(|| format!("could not create {}", path.display()))?;
        write_failures(file, &result.failures)
            .with_context(|| format!("could not write {}", path.display()))?;
        written.push(path);
    }

    Ok(written)
}
