use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use caltrack_core::models::{GoalsUpdate, ProgressEntry, parse_progress_metric};
use caltrack_core::service::CalTrackService;

use super::helpers::{no_neg_zero, print_json, progress_bar};

/// Body measurements for one `progress log` call. Unset fields are logged as 0.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Measurements {
    pub weight_kg: f64,
    pub body_fat_pct: f64,
    pub waist_cm: f64,
    pub chest_cm: f64,
    pub arms_cm: f64,
    pub thighs_cm: f64,
}

pub(crate) fn progress_log(
    svc: &mut CalTrackService,
    date: NaiveDate,
    m: Measurements,
    json: bool,
) -> Result<()> {
    let entry = svc.log_progress(ProgressEntry {
        date,
        weight_kg: m.weight_kg,
        body_fat_pct: m.body_fat_pct,
        waist_cm: m.waist_cm,
        chest_cm: m.chest_cm,
        arms_cm: m.arms_cm,
        thighs_cm: m.thighs_cm,
    })?;
    if json {
        return print_json(&entry);
    }
    println!(
        "Logged progress for {}: {:.1} kg, {:.1}% body fat",
        entry.date.format("%Y-%m-%d"),
        entry.weight_kg,
        entry.body_fat_pct
    );
    Ok(())
}

pub(crate) fn progress_show(
    svc: &CalTrackService,
    metric: Option<&str>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight")]
        weight: String,
        #[tabled(rename = "Body Fat %")]
        body_fat: String,
        #[tabled(rename = "Waist")]
        waist: String,
        #[tabled(rename = "Chest")]
        chest: String,
        #[tabled(rename = "Arms")]
        arms: String,
        #[tabled(rename = "Thighs")]
        thighs: String,
    }

    if let Some(metric) = metric {
        let metric = parse_progress_metric(metric)?;
        let series = svc.metric_series(metric);
        if json {
            return print_json(&serde_json::json!({
                "metric": metric,
                "label": metric.label(),
                "points": series,
            }));
        }
        if series.is_empty() {
            eprintln!("No data available. Log your progress first.");
            return Ok(());
        }
        println!("{} over time\n", metric.label());
        for (date, value) in series {
            println!("  {}  {value:>7.1}", date.format("%Y-%m-%d"));
        }
        return Ok(());
    }

    let entries = svc.progress_entries();
    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        eprintln!("No data available. Log your progress first.");
        return Ok(());
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            date: e.date.format("%Y-%m-%d").to_string(),
            weight: format!("{:.1}", e.weight_kg),
            body_fat: format!("{:.1}", e.body_fat_pct),
            waist: format!("{:.1}", e.waist_cm),
            chest: format!("{:.1}", e.chest_cm),
            arms: format!("{:.1}", e.arms_cm),
            thighs: format!("{:.1}", e.thighs_cm),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn progress_changes(svc: &CalTrackService, json: bool) -> Result<()> {
    let changes = svc.progress_changes();
    if json {
        return print_json(&changes);
    }
    let Some(changes) = changes else {
        eprintln!("Log at least two entries to see overall changes.");
        return Ok(());
    };
    println!("Overall changes\n");
    for c in changes {
        println!("  {:<11} {:+.2}", c.label, no_neg_zero(c.change));
    }
    Ok(())
}

pub(crate) fn progress_export(svc: &CalTrackService, path: &Path, json: bool) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    svc.export_progress_csv(BufWriter::new(file))?;
    let count = svc.progress().len();
    if json {
        println!(
            "{}",
            serde_json::json!({ "exported": count, "path": path.display().to_string() })
        );
    } else {
        println!("Exported {count} entries to {}", path.display());
    }
    Ok(())
}

pub(crate) fn progress_import(svc: &mut CalTrackService, path: &Path, json: bool) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let count = svc.import_progress_csv(file)?;
    if json {
        println!("{}", serde_json::json!({ "imported": count }));
    } else {
        println!("Imported {count} entries from {}", path.display());
    }
    Ok(())
}

/// Fields left as `None` keep their current value.
pub(crate) fn goals_set(
    svc: &mut CalTrackService,
    weight_kg: Option<f64>,
    body_fat_pct: Option<f64>,
    date: Option<NaiveDate>,
    today: NaiveDate,
    json: bool,
) -> Result<()> {
    let update = GoalsUpdate {
        target_weight_kg: weight_kg,
        target_body_fat_pct: body_fat_pct,
        target_date: date,
    };
    svc.update_goals(&update, today)?;
    if !json {
        println!("Goals set successfully!\n");
    }
    goals_show(svc, today, json)
}

pub(crate) fn goals_show(svc: &CalTrackService, today: NaiveDate, json: bool) -> Result<()> {
    let view = svc.goals(today);
    if json {
        return print_json(&view);
    }

    let g = &view.goals;
    if !view.is_set {
        println!("No goals set yet. Defaults:");
    }
    println!("  Target weight:   {:.1} kg", g.target_weight_kg);
    println!("  Target body fat: {:.1} %", g.target_body_fat_pct);
    println!("  Target date:     {}", g.target_date.format("%Y-%m-%d"));

    if let Some(p) = &view.weight_progress {
        println!(
            "\n  Weight: {:.1} kg -> {:.1} kg (target {:.1} kg)",
            p.start_weight_kg, p.current_weight_kg, p.target_weight_kg
        );
        println!("  {}", progress_bar(p.fraction, 20));
        println!("  {:.1}% towards your weight goal", p.percent);
    }
    Ok(())
}
