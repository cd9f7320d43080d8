// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::{Context, Result, anyhow, bail};
use board::{
    BoardController, BreakdownState, BreakdownTarget, Command, FileBackend, Outcome,
    PersistentStore, Settings, Suggester, TaskRepository,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use common::{NewTask, Priority, TaskFields, TaskId, TaskStatus};

#[derive(Parser)]
#[command(name = "taskboard", about = "A task board with AI sub-task suggestions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Show the board, one column per status
    List,
    /// Add a task
    Add {
        #[command(flatten)]
        fields: FieldArgs,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Replace the fields of a task
    Edit {
        id: TaskId,
        #[command(flatten)]
        fields: FieldArgs,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Move a task to another column
    Move {
        id: TaskId,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// Delete a task
    Remove { id: TaskId },
    /// Ask the model to split a task into sub-tasks
    Breakdown {
        id: TaskId,
        /// Add the suggestions to the board
        #[arg(long)]
        accept: bool,
    },
}

#[derive(Args)]
struct FieldArgs {
    title: String,
    #[arg(long)]
    description: Option<String>,
    /// Due date as YYYY-MM-DD
    #[arg(long)]
    due: Option<NaiveDate>,
    #[arg(long, value_enum)]
    priority: Option<PriorityArg>,
}

impl From<FieldArgs> for TaskFields {
    fn from(args: FieldArgs) -> Self {
        TaskFields {
            title: args.title,
            description: args.description,
            due_date: args.due,
            priority: args.priority.map(Into::into),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Todo,
    InProgress,
    Done,
}

impl From<StatusArg> for TaskStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Todo => TaskStatus::ToDo,
            StatusArg::InProgress => TaskStatus::InProgress,
            StatusArg::Done => TaskStatus::Done,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::High => Priority::High,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env();
    tracing::debug!("Using data directory {}", settings.data_dir.display());

    let store = PersistentStore::new(FileBackend::new(&settings.data_dir));
    let mut board = BoardController::new(TaskRepository::open(store));

    match cli.command.unwrap_or(Cmd::List) {
        Cmd::List => print_board(&board),
        Cmd::Add { fields, status } => {
            let new_task = NewTask {
                fields: fields.into(),
                status: status.map(Into::into),
            };
            if let Outcome::Created(task) = board.dispatch(Command::Create(new_task))? {
                println!("Created {} ({})", task.title, task.id);
            }
        }
        Cmd::Edit { id, fields, status } => {
            let command = Command::Update {
                id,
                fields: fields.into(),
                status: status.map(Into::into),
            };
            if let Outcome::Updated(task) = board.dispatch(command)? {
                println!("Updated {} ({})", task.title, task.id);
            }
        }
        Cmd::Move { id, status } => {
            let status: TaskStatus = status.into();
            match board.dispatch(Command::SetStatus { id, status })? {
                Outcome::Moved(Some(task)) => println!("Moved {} to {}", task.title, status.label()),
                _ => println!("No task with ID {id}"),
            }
        }
        Cmd::Remove { id } => match board.dispatch(Command::Remove(id))? {
            Outcome::Removed(true) => println!("Deleted {id}"),
            _ => println!("No task with ID {id}"),
        },
        Cmd::Breakdown { id, accept } => breakdown(&mut board, &settings, id, accept).await?,
    }

    if let Some(err) = board.repository().last_save_error() {
        eprintln!("Warning: changes were not saved: {err}");
    }
    Ok(())
}

async fn breakdown(
    board: &mut BoardController<FileBackend>,
    settings: &Settings,
    id: TaskId,
    accept: bool,
) -> Result<()> {
    let suggester = Suggester::from_settings(settings)
        .map_err(|e| anyhow!(e.user_message()))?
        .context("AI suggestions are turned off; set GEMINI_API_KEY or TASKBOARD_PROXY_URL")?;
    let target = board
        .repository()
        .get(id)
        .map(BreakdownTarget::from)
        .with_context(|| format!("No task with ID {id}"))?;

    println!("Asking for sub-tasks of \"{}\"...", target.title);
    board.run_breakdown(&suggester, target).await?;

    match board.breakdown_state() {
        BreakdownState::Ready { suggestions, .. } => {
            for (i, s) in suggestions.iter().enumerate() {
                match &s.description {
                    Some(d) => println!("  {}. {} - {}", i + 1, s.title, d),
                    None => println!("  {}. {}", i + 1, s.title),
                }
            }
        }
        BreakdownState::Failed { message, .. } => bail!("{message}"),
        _ => return Ok(()),
    }

    if accept {
        if let Outcome::Accepted(created) = board.dispatch(Command::AcceptSuggestions)? {
            println!("Added {} tasks to the board.", created.len());
        }
    } else {
        board.dispatch(Command::DismissSuggestions)?;
    }
    Ok(())
}

fn print_board(board: &BoardController<FileBackend>) {
    for status in TaskStatus::ALL {
        let column = board.repository().column(status);
        println!("== {} ({})", status.label(), column.len());
        for task in column {
            let mut line = format!("  {}  {}", task.id, task.title);
            if let Some(priority) = task.priority {
                line.push_str(&format!(" [{}]", priority.label()));
            }
            if let Some(due) = task.due_date {
                line.push_str(&format!(" due {due}"));
            }
            println!("{line}");
        }
    }
}
