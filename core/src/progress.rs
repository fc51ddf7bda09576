use std::io::{Read, Write};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{
    Goals, MetricChange, PROGRESS_METRICS, ProgressEntry, ProgressMetric, WeightGoalProgress,
    validate_progress_entry,
};

/// Header used for CSV export and expected on import.
pub const CSV_HEADER: [&str; 7] = [
    "Date",
    "Weight",
    "Body Fat %",
    "Waist",
    "Chest",
    "Arms",
    "Thighs",
];

/// Body measurements in the order they were logged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProgressLog {
    entries: Vec<ProgressEntry>,
}

impl ProgressLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, entry: ProgressEntry) -> Result<&ProgressEntry> {
        validate_progress_entry(&entry)?;
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by date. Same-day entries keep their logging order.
    #[must_use]
    pub fn entries_by_date(&self) -> Vec<ProgressEntry> {
        let mut sorted = self.entries.clone();
        sorted.sort_by_key(|e| e.date);
        sorted
    }

    #[must_use]
    pub fn metric_series(&self, metric: ProgressMetric) -> Vec<(NaiveDate, f64)> {
        self.entries_by_date()
            .iter()
            .map(|e| (e.date, metric.value_of(e)))
            .collect()
    }

    /// Last minus first for every metric, in date order. `None` with fewer than two entries.
    #[must_use]
    pub fn overall_changes(&self) -> Option<Vec<MetricChange>> {
        if self.entries.len() < 2 {
            return None;
        }
        let sorted = self.entries_by_date();
        let (first, last) = (sorted.first()?, sorted.last()?);
        Some(
            PROGRESS_METRICS
                .iter()
                .map(|&metric| MetricChange {
                    metric,
                    label: metric.label(),
                    change: metric.value_of(last) - metric.value_of(first),
                })
                .collect(),
        )
    }

    pub fn export_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(CSV_HEADER)?;
        for e in self.entries_by_date() {
            wtr.write_record([
                e.date.format("%Y-%m-%d").to_string(),
                e.weight_kg.to_string(),
                e.body_fat_pct.to_string(),
                e.waist_cm.to_string(),
                e.chest_cm.to_string(),
                e.arms_cm.to_string(),
                e.thighs_cm.to_string(),
            ])?;
        }
        wtr.flush().context("Failed to write progress CSV")?;
        Ok(())
    }

    /// Append every row of a CSV export. Nothing is added if any row is invalid.
    pub fn import_csv<R: Read>(&mut self, reader: R) -> Result<usize> {
        let rows = parse_progress_csv(reader)?;
        let count = rows.len();
        self.entries.extend(rows);
        Ok(count)
    }
}

/// Parse progress rows. Column order is free; matching is case-insensitive.
pub fn parse_progress_csv<R: Read>(reader: R) -> Result<Vec<ProgressEntry>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
    let mut idx = [0usize; 7];
    for (slot, name) in idx.iter_mut().zip(CSV_HEADER) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .with_context(|| format!("Missing required column: {name}"))?;
    }

    let mut entries = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let line = line_num + 2;
        let record = result.with_context(|| format!("Failed to parse CSV row {line}"))?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let field = |i: usize| record.get(idx[i]).unwrap_or("");
        let number = |i: usize| -> Result<f64> {
            let raw = field(i);
            raw.parse::<f64>()
                .with_context(|| format!("Row {line}: invalid {} '{raw}'", CSV_HEADER[i]))
        };

        let date = NaiveDate::parse_from_str(field(0), "%Y-%m-%d")
            .with_context(|| format!("Row {line}: invalid date '{}'", field(0)))?;
        let entry = ProgressEntry {
            date,
            weight_kg: number(1)?,
            body_fat_pct: number(2)?,
            waist_cm: number(3)?,
            chest_cm: number(4)?,
            arms_cm: number(5)?,
            thighs_cm: number(6)?,
        };
        validate_progress_entry(&entry).with_context(|| format!("Row {line}"))?;
        entries.push(entry);
    }

    if entries.is_empty() {
        bail!("CSV contains no progress rows");
    }
    Ok(entries)
}

/// Percent of the way from the first logged weight to the target. `None` when the
/// log is empty or the first weight already equals the target.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn weight_goal_progress(log: &ProgressLog, goals: &Goals) -> Option<WeightGoalProgress> {
    let sorted = log.entries_by_date();
    let start = sorted.first()?.weight_kg;
    let current = sorted.last()?.weight_kg;
    let target = goals.target_weight_kg;

    if start == target {
        return None;
    }

    let percent = (start - current) / (start - target) * 100.0;
    Some(WeightGoalProgress {
        start_weight_kg: start,
        current_weight_kg: current,
        target_weight_kg: target,
        percent,
        fraction: (percent / 100.0).clamp(0.0, 1.0),
    })
}
