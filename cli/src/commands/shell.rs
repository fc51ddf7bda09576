use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::Local;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};

use caltrack_core::service::CalTrackService;

use super::helpers::{json_error, parse_date};
use super::plan::{plan_add, plan_clear, plan_goal, plan_remove, plan_show, plan_suggest};
use super::progress::{
    Measurements, goals_set, goals_show, progress_changes, progress_export, progress_import,
    progress_log, progress_show,
};
use super::tracker::{
    tracker_connect, tracker_dashboard, tracker_disconnect, tracker_status, tracker_sync,
};

const PROMPT: &str = "caltrack> ";

#[derive(Parser, Debug)]
#[command(
    name = "shell",
    no_binary_name = true,
    disable_version_flag = true,
    help_template = "{subcommands}"
)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    /// Build today's meal plan
    Plan {
        #[command(subcommand)]
        command: PlanCommand,
    },
    /// Log and review body measurements
    Progress {
        #[command(subcommand)]
        command: ProgressCommand,
    },
    /// Weight and body fat targets
    Goals {
        #[command(subcommand)]
        command: GoalsCommand,
    },
    /// Fitness tracker connection and activity data
    Tracker {
        #[command(subcommand)]
        command: TrackerCommand,
    },
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

#[derive(Subcommand, Debug)]
enum PlanCommand {
    /// Add a food to a meal
    Add {
        /// Meal: breakfast, lunch, dinner or snacks
        meal: String,
        /// Food name (quote multi-word names)
        food: String,
        /// Amount (e.g. "150", "150g", "0.2kg", "5 oz"; default 100g)
        amount: Option<String>,
    },
    /// Remove an item by its number in `plan show`
    Remove { meal: String, number: usize },
    /// Show the plan with totals
    Show {
        /// Compare against this calorie goal instead of the current one
        #[arg(long)]
        goal: Option<u32>,
    },
    /// Remove every item
    Clear,
    /// Set the daily calorie goal
    Goal { calories: u32 },
    /// Suggest meals for a calorie goal
    Suggest {
        #[arg(short, long)]
        calories: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
        /// Add the suggested items to the plan
        #[arg(long)]
        apply: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ProgressCommand {
    /// Log body measurements
    Log {
        /// Weight in kg
        #[arg(short, long, default_value_t = 0.0)]
        weight: f64,
        /// Body fat percentage
        #[arg(long, default_value_t = 0.0)]
        body_fat: f64,
        #[arg(long, default_value_t = 0.0)]
        waist: f64,
        #[arg(long, default_value_t = 0.0)]
        chest: f64,
        #[arg(long, default_value_t = 0.0)]
        arms: f64,
        #[arg(long, default_value_t = 0.0)]
        thighs: f64,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Show logged entries, or one metric over time
    Show {
        /// weight, body-fat, waist, chest, arms or thighs
        #[arg(short, long)]
        metric: Option<String>,
    },
    /// Change of every metric between the first and last entry
    Changes,
    /// Write the log to a CSV file
    Export { path: PathBuf },
    /// Load entries from a CSV file
    Import { path: PathBuf },
}

#[derive(Subcommand, Debug)]
enum GoalsCommand {
    /// Set targets; omitted fields keep their current value
    Set {
        /// Target weight in kg
        #[arg(short, long)]
        weight: Option<f64>,
        /// Target body fat percentage
        #[arg(long)]
        body_fat: Option<f64>,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },
    /// Show targets and weight progress
    Show,
}

#[derive(Subcommand, Debug)]
enum TrackerCommand {
    Connect,
    Disconnect,
    Status,
    /// Recent activity with averages
    Dashboard {
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Adjust the calorie goal from recent activity
    Sync,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Split a shell line into words. Single or double quotes group words.
fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if let Some(q) = quote {
        bail!("Unterminated {q} quote");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn run_line(svc: &mut CalTrackService, line: &str, json: bool) -> Result<Flow> {
    let words = split_words(line)?;
    if words.is_empty() {
        return Ok(Flow::Continue);
    }

    let parsed = match ShellLine::try_parse_from(&words) {
        Ok(parsed) => parsed,
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) =>
        {
            println!("{}", e.render());
            return Ok(Flow::Continue);
        }
        Err(e) => bail!("{}", e.render().to_string().trim_end()),
    };

    dispatch(svc, parsed.command, json)
}

fn dispatch(svc: &mut CalTrackService, command: ShellCommand, json: bool) -> Result<Flow> {
    let today = Local::now().date_naive();
    match command {
        ShellCommand::Quit => return Ok(Flow::Quit),
        ShellCommand::Plan { command } => match command {
            PlanCommand::Add { meal, food, amount } => {
                plan_add(svc, &meal, &food, amount.as_deref(), json)?;
            }
            PlanCommand::Remove { meal, number } => plan_remove(svc, &meal, number, json)?,
            PlanCommand::Show { goal } => plan_show(svc, goal, json)?,
            PlanCommand::Clear => plan_clear(svc, json),
            PlanCommand::Goal { calories } => plan_goal(svc, calories, json)?,
            PlanCommand::Suggest {
                calories,
                seed,
                apply,
            } => plan_suggest(svc, calories, seed, apply, json)?,
        },
        ShellCommand::Progress { command } => match command {
            ProgressCommand::Log {
                weight,
                body_fat,
                waist,
                chest,
                arms,
                thighs,
                date,
            } => {
                let m = Measurements {
                    weight_kg: weight,
                    body_fat_pct: body_fat,
                    waist_cm: waist,
                    chest_cm: chest,
                    arms_cm: arms,
                    thighs_cm: thighs,
                };
                progress_log(svc, parse_date(date)?, m, json)?;
            }
            ProgressCommand::Show { metric } => progress_show(svc, metric.as_deref(), json)?,
            ProgressCommand::Changes => progress_changes(svc, json)?,
            ProgressCommand::Export { path } => progress_export(svc, &path, json)?,
            ProgressCommand::Import { path } => progress_import(svc, &path, json)?,
        },
        ShellCommand::Goals { command } => match command {
            GoalsCommand::Set {
                weight,
                body_fat,
                date,
            } => {
                let date = date.map(|d| parse_date(Some(d))).transpose()?;
                goals_set(svc, weight, body_fat, date, today, json)?;
            }
            GoalsCommand::Show => goals_show(svc, today, json)?,
        },
        ShellCommand::Tracker { command } => match command {
            TrackerCommand::Connect => tracker_connect(svc, json)?,
            TrackerCommand::Disconnect => tracker_disconnect(svc, json)?,
            TrackerCommand::Status => tracker_status(svc, json)?,
            TrackerCommand::Dashboard { days } => tracker_dashboard(svc, days, today, json)?,
            TrackerCommand::Sync => tracker_sync(svc, json)?,
        },
    }
    Ok(Flow::Continue)
}

pub(crate) fn cmd_shell(json: bool) -> Result<()> {
    let mut svc = CalTrackService::new();
    tracing::info!(session = svc.session_id(), "shell session started");
    if !json {
        eprintln!("CalTrack interactive shell. Type `help` for commands, `quit` to leave.");
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        eprint!("{PROMPT}");
        io::stderr().flush()?;

        let Some(line) = lines.next().transpose()? else {
            eprintln!();
            break;
        };

        match run_line(&mut svc, &line, json) {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) if json => println!("{}", json_error(&format!("{e:#}"))),
            Err(e) => eprintln!("Error: {e:#}"),
        }
    }
    Ok(())
}
