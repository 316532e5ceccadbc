//! todo-list - command line front end.
//!
//! Plays the UI role: presents the list, maps commands onto the list manager
//! and the add/edit form, and prints observer notifications.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use todo_list::config::{parse_store_type, Config};
use todo_list::present::TaskRow;
use todo_list::{
    create_task_store, FieldValue, FormField, FormObserver, TaskForm, TaskListError,
    TaskListManager, TaskListObserver, TaskPriority,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "todo-list", version, about = "Keep a prioritized to-do list")]
struct Cli {
    /// Storage backend: memory, file or sqlite (overrides TODO_LIST_STORE)
    #[arg(long, global = true)]
    store: Option<String>,

    /// Directory for store files (overrides TODO_LIST_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Store profile name (overrides TODO_LIST_PROFILE)
    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show every task, highest priority first
    List,
    /// Add a new task
    Add {
        #[arg(long)]
        title: String,
        /// high, medium or low
        #[arg(long, value_parser = parse_priority)]
        priority: TaskPriority,
        /// Due date as YYYY-MM-DD
        #[arg(long, value_parser = parse_due)]
        due: Option<NaiveDate>,
    },
    /// Edit the task at INDEX
    Edit {
        index: usize,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<TaskPriority>,
        #[arg(long, value_parser = parse_due, conflicts_with = "no_due")]
        due: Option<NaiveDate>,
        /// Remove the due date
        #[arg(long)]
        no_due: bool,
    },
    /// Mark the task at INDEX as completed
    Complete { index: usize },
    /// Delete the task at INDEX
    Remove { index: usize },
}

fn parse_priority(s: &str) -> Result<TaskPriority, String> {
    TaskPriority::parse(s).ok_or_else(|| format!("unknown priority '{}'", s))
}

fn parse_due(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("{}: {}", s, e))
}

/// Prints notifications the way a screen would surface them.
struct ConsoleObserver;

impl TaskListObserver for ConsoleObserver {
    fn on_tasks_changed(&self) {
        tracing::debug!("Task list changed");
    }

    fn on_error(&self, error: &TaskListError) {
        eprintln!("Error: {}", error);
    }
}

impl FormObserver for ConsoleObserver {
    fn on_due_date_visibility_changed(&self, is_on: bool) {
        tracing::debug!("Due date picker visible: {}", is_on);
    }

    fn on_changes_made(&self) {
        tracing::debug!("Form changed");
    }

    fn on_error(&self, error: &TaskListError) {
        eprintln!("Error: {}", error);
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> anyhow::Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo_list=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(store) = &cli.store {
        config.store_type = parse_store_type(store)?;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(profile) = cli.profile {
        config.profile = profile;
    }
    info!(
        "Using {:?} store in {} (profile {})",
        config.store_type,
        config.data_dir.display(),
        config.profile
    );

    let store = create_task_store(config.store_type, config.data_dir, &config.profile).await?;
    let observer = Arc::new(ConsoleObserver);
    let mut manager = TaskListManager::new(Arc::new(store), observer.clone());

    // Errors were already printed by the observer.
    let outcome = run(cli.command, &mut manager, observer).await;
    Ok(match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    })
}

async fn run(
    command: Command,
    manager: &mut TaskListManager,
    observer: Arc<ConsoleObserver>,
) -> Result<(), TaskListError> {
    manager.fetch_tasks().await?;

    match command {
        Command::List => {}
        Command::Add {
            title,
            priority,
            due,
        } => {
            let mut form = manager.add_form(observer);
            fill_form(&mut form, Some(title), Some(priority), due.map(Some))?;
            let saved = form.save().await?;
            println!("Added '{}'", saved.title());
            manager.fetch_tasks().await?;
        }
        Command::Edit {
            index,
            title,
            priority,
            due,
            no_due,
        } => {
            let due = if no_due { Some(None) } else { due.map(Some) };
            let mut form = manager.edit_form(index, observer)?;
            fill_form(&mut form, title, priority, due)?;
            let saved = form.save().await?;
            println!("Updated '{}'", saved.title());
            manager.fetch_tasks().await?;
        }
        Command::Complete { index } => {
            let task = manager.complete_item(index).await?;
            println!("Completed '{}'", task.title());
        }
        Command::Remove { index } => {
            let task = manager.remove_item(index).await?;
            println!("Removed '{}'", task.title());
        }
    }

    print_list(manager);
    Ok(())
}

/// Feed values into the form one field at a time, the way a screen would.
/// `due` is `Some(None)` to clear the date and `None` to leave it alone.
fn fill_form(
    form: &mut TaskForm,
    title: Option<String>,
    priority: Option<TaskPriority>,
    due: Option<Option<NaiveDate>>,
) -> Result<(), TaskListError> {
    if let Some(title) = title {
        form.handle_input(row_of(form, FormField::Title), FieldValue::Text(title))?;
    }
    if let Some(due) = due {
        if due.is_some() != form.is_due_date_visible() {
            form.handle_input(row_of(form, FormField::DueDateToggle), FieldValue::Toggle)?;
        }
        if let Some(date) = due {
            let midnight = date.and_time(NaiveTime::MIN);
            let local = Local
                .from_local_datetime(&midnight)
                .earliest()
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|| midnight.and_utc());
            form.handle_input(row_of(form, FormField::DueDatePicker), FieldValue::Date(local))?;
        }
    }
    if let Some(priority) = priority {
        form.handle_input(
            row_of(form, FormField::Priority),
            FieldValue::Priority(priority),
        )?;
    }
    Ok(())
}

fn row_of(form: &TaskForm, field: FormField) -> usize {
    form.fields()
        .iter()
        .position(|f| *f == field)
        .unwrap_or(usize::MAX)
}

fn print_list(manager: &TaskListManager) {
    if manager.is_empty() {
        println!("Nothing to do.");
        return;
    }
    for (index, task) in manager.tasks().iter().enumerate() {
        println!("{:>3}  {}", index, TaskRow::from_task(task));
    }
}
