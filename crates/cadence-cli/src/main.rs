//! Cadence CLI
//!
//! Command-line interface for managing study schedules.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use directories::ProjectDirs;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use cadence_core::{
    CompletionUpdate, CreateRepetitionInput, ModuleProgress, ModuleRef, NewModuleProgress,
    Repetition, RepetitionOrder, RepetitionService, RepetitionStatus, ScheduleConfig, Storage,
};

/// Cadence - spaced repetition study scheduler
#[derive(Parser)]
#[command(name = "cadence")]
#[command(author = "Cadence Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the Cadence study scheduler")]
#[command(long_about = "Cadence schedules five reviews per study unit at growing intervals.\n\nCompletions shift the rest of the cycle; finished cycles start the next one.")]
struct Cli {
    /// Database file (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Schedule configuration JSON (defaults to <data dir>/schedule.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a learner on a unit and generate its first cycle
    Start {
        /// Unit identifier
        module_id: String,
        /// Learner identifier
        #[arg(long)]
        learner: String,
        /// Number of words in the unit (0 means nothing to review)
        #[arg(long)]
        words: u32,
        /// First learning date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        on: Option<NaiveDate>,
    },

    /// Show a progress and its current cycle
    Show {
        progress_id: String,
        /// Include repetitions of finished cycles
        #[arg(long)]
        history: bool,
    },

    /// Add one repetition by hand to the current cycle
    Add {
        progress_id: String,
        /// Order: first..fifth or 1..5
        order: RepetitionOrder,
        /// Review date (YYYY-MM-DD)
        date: NaiveDate,
    },

    /// Mark a repetition as studied
    Complete {
        repetition_id: String,
        /// Overall progress in the unit, 0-100
        #[arg(long)]
        percent: f64,
        /// Day it was studied (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        on: Option<NaiveDate>,
        /// Reopen a completed repetition instead
        #[arg(long)]
        undo: bool,
    },

    /// Move a repetition to another day
    Reschedule {
        repetition_id: String,
        /// New review date (YYYY-MM-DD)
        date: NaiveDate,
        /// Move later pending repetitions by the same amount
        #[arg(long)]
        cascade: bool,
    },

    /// Delete a repetition
    Delete { repetition_id: String },

    /// List progresses due in a date range
    Due {
        /// Range start (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Range end (YYYY-MM-DD, defaults to the start)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Create a consistent copy of the database
    Backup {
        /// Output file path for the backup
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let storage = Arc::new(Storage::new(cli.db.clone())?);
    let config = load_config(cli.config.as_deref())?;
    let service = RepetitionService::new(storage, config)?;
    let json = cli.json;

    match cli.command {
        Commands::Start {
            module_id,
            learner,
            words,
            on,
        } => run_start(&service, module_id, learner, words, on, json),
        Commands::Show {
            progress_id,
            history,
        } => run_show(&service, &progress_id, history, json),
        Commands::Add {
            progress_id,
            order,
            date,
        } => run_add(&service, progress_id, order, date, json),
        Commands::Complete {
            repetition_id,
            percent,
            on,
            undo,
        } => run_complete(&service, &repetition_id, percent, on, undo, json),
        Commands::Reschedule {
            repetition_id,
            date,
            cascade,
        } => run_reschedule(&service, &repetition_id, date, cascade, json),
        Commands::Delete { repetition_id } => run_delete(&service, &repetition_id, json),
        Commands::Due { from, to } => run_due(&service, from, to, json),
        Commands::Backup { output } => run_backup(&service, &output),
    }
}

/// Explicit path, else `<data dir>/schedule.json`, else defaults
fn load_config(path: Option<&Path>) -> anyhow::Result<ScheduleConfig> {
    if let Some(path) = path {
        return ScheduleConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let default = ProjectDirs::from("com", "cadence", "core")
        .map(|dirs| dirs.data_dir().join("schedule.json"));
    match default {
        Some(path) if path.exists() => ScheduleConfig::from_json_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        _ => Ok(ScheduleConfig::default()),
    }
}

fn run_start(
    service: &RepetitionService,
    module_id: String,
    learner: String,
    words: u32,
    on: Option<NaiveDate>,
    json: bool,
) -> anyhow::Result<()> {
    let progress = service.storage().create_progress(NewModuleProgress {
        learner_id: learner,
        module_ref: ModuleRef::new(module_id, words),
        first_learning_date: on,
    })?;
    let schedule = schedule_or_discard(service, &progress, on.unwrap_or_else(today))?;
    let progress = service.get_progress(&progress.id)?;

    if json {
        return print_json(&serde_json::json!({ "progress": progress, "repetitions": schedule }));
    }

    println!("{}", "=== Cadence Start ===".cyan().bold());
    println!();
    print_progress(&progress);
    if schedule.is_empty() {
        println!("{}", "Unit has no words; nothing to review.".dimmed());
    } else {
        println!();
        print_repetitions(&schedule);
    }
    Ok(())
}

/// Generate the first cycle; a progress that cannot be scheduled is deleted again
fn schedule_or_discard(
    service: &RepetitionService,
    progress: &ModuleProgress,
    today: NaiveDate,
) -> anyhow::Result<Vec<Repetition>> {
    match service.create_default_schedule_on(&progress.id, today) {
        Ok(schedule) => Ok(schedule),
        Err(e) => {
            if let Err(cleanup) = service.storage().delete_progress(&progress.id) {
                tracing::warn!("Failed to discard unscheduled progress {}: {}", progress.id, cleanup);
            }
            Err(anyhow::Error::new(e)
                .context(format!("Failed to schedule progress {}", progress.id)))
        }
    }
}

fn run_show(
    service: &RepetitionService,
    progress_id: &str,
    history: bool,
    json: bool,
) -> anyhow::Result<()> {
    let progress = service.get_progress(progress_id)?;
    let repetitions = if history {
        service.list_history(progress_id)?
    } else {
        service.list_repetitions(progress_id)?
    };

    if json {
        return print_json(&serde_json::json!({ "progress": progress, "repetitions": repetitions }));
    }

    print_progress(&progress);
    println!();
    if repetitions.is_empty() {
        println!("{}", "No repetitions scheduled.".dimmed());
    } else {
        print_repetitions(&repetitions);
    }
    Ok(())
}

fn run_add(
    service: &RepetitionService,
    progress_id: String,
    order: RepetitionOrder,
    date: NaiveDate,
    json: bool,
) -> anyhow::Result<()> {
    let repetition = service.create(CreateRepetitionInput {
        progress_id,
        repetition_order: order,
        review_date: date,
        status: RepetitionStatus::NotStarted,
    })?;

    if json {
        return print_json(&repetition);
    }
    println!("{} {}", "Added".green().bold(), describe(&repetition));
    Ok(())
}

fn run_complete(
    service: &RepetitionService,
    repetition_id: &str,
    percent: f64,
    on: Option<NaiveDate>,
    undo: bool,
    json: bool,
) -> anyhow::Result<()> {
    let update = CompletionUpdate {
        status: if undo {
            RepetitionStatus::NotStarted
        } else {
            RepetitionStatus::Completed
        },
        percent_complete: percent,
        completed_on: on,
    };
    let result = service.update_completion(repetition_id, update)?;

    if json {
        return print_json(&result);
    }

    let verb = if undo { "Reopened" } else { "Completed" };
    println!("{} {}", verb.green().bold(), describe(&result.repetition));
    if !result.shifted.is_empty() {
        println!();
        println!("{}", "Shifted:".yellow().bold());
        print_repetitions(&result.shifted);
    }
    if let Some(next_cycle) = &result.next_cycle {
        println!();
        println!(
            "{} {}",
            "Cycle finished, now in".cyan().bold(),
            result.progress.cycles_studied
        );
        print_repetitions(next_cycle);
    }
    println!();
    print_next_study(result.progress.next_study_date);
    Ok(())
}

fn run_reschedule(
    service: &RepetitionService,
    repetition_id: &str,
    date: NaiveDate,
    cascade: bool,
    json: bool,
) -> anyhow::Result<()> {
    let result = service.reschedule(repetition_id, date, cascade)?;

    if json {
        return print_json(&result);
    }

    println!("{} {}", "Moved".green().bold(), describe(&result.repetition));
    if !result.cascaded.is_empty() {
        print_repetitions(&result.cascaded);
    }
    print_next_study(result.next_study_date);
    Ok(())
}

fn run_delete(service: &RepetitionService, repetition_id: &str, json: bool) -> anyhow::Result<()> {
    let progress = service.delete(repetition_id)?;

    if json {
        return print_json(&progress);
    }
    println!("{} {}", "Deleted".red().bold(), repetition_id);
    print_next_study(progress.next_study_date);
    Ok(())
}

fn run_due(
    service: &RepetitionService,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    json: bool,
) -> anyhow::Result<()> {
    let from = from.unwrap_or_else(today);
    let to = to.unwrap_or(from);
    let due = service.due_between(from, to)?;

    if json {
        return print_json(&due);
    }

    println!(
        "{}",
        format!("=== Due {} to {} ===", from, to).cyan().bold()
    );
    if due.is_empty() {
        println!("{}", "Nothing due.".dimmed());
        return Ok(());
    }
    for progress in &due {
        let date = progress
            .next_study_date
            .map(|d| d.to_string())
            .unwrap_or_default();
        println!(
            "  {}  {}  {} ({})  {}",
            date.white().bold(),
            progress.id.dimmed(),
            progress.module_ref.module_id,
            progress.learner_id,
            progress.cycles_studied
        );
    }
    if from == to {
        let load = service.storage().pending_load_on(from)?;
        println!();
        println!("{}: {}", "Reviews on this day".white().bold(), load);
    }
    Ok(())
}

fn run_backup(service: &RepetitionService, output: &Path) -> anyhow::Result<()> {
    if output.exists() {
        anyhow::bail!("Refusing to overwrite {}", output.display());
    }
    service.storage().backup_to(output)?;
    println!(
        "{} {} -> {}",
        "Backed up".green().bold(),
        service.storage().path().display(),
        output.display()
    );
    Ok(())
}

// ============================================================================
// OUTPUT
// ============================================================================

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_progress(progress: &ModuleProgress) {
    println!("{}: {}", "Progress".white().bold(), progress.id);
    println!("{}: {}", "Learner".white().bold(), progress.learner_id);
    println!(
        "{}: {} ({} words)",
        "Unit".white().bold(),
        progress.module_ref.module_id,
        progress.module_ref.word_count
    );
    println!("{}: {}", "Stage".white().bold(), progress.cycles_studied);
    if let Some(first) = progress.first_learning_date {
        println!("{}: {}", "First Learned".white().bold(), first);
    }
    println!("{}: {:.0}%", "Complete".white().bold(), progress.percent_complete);
    print_next_study(progress.next_study_date);
}

fn print_next_study(next: Option<NaiveDate>) {
    match next {
        Some(date) => println!("{}: {}", "Next Study".white().bold(), date),
        None => println!("{}: {}", "Next Study".white().bold(), "none".dimmed()),
    }
}

fn print_repetitions(repetitions: &[Repetition]) {
    for repetition in repetitions {
        println!("  {}", describe(repetition));
    }
}

fn describe(repetition: &Repetition) -> String {
    let status = match repetition.status {
        RepetitionStatus::Completed => "done".green(),
        RepetitionStatus::NotStarted => "pending".yellow(),
    };
    format!(
        "{:<7} {}  {:<8} {}",
        repetition.repetition_order.as_str(),
        repetition.review_date,
        status,
        repetition.id.dimmed()
    )
}
