use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::io::IsTerminal;
use task_cli::cli::{Cli, Command, build_filter, page_count, page_slice};
use task_cli::render::Renderer;
use task_core::config::load_config_with_fallback;
use task_core::error::AppError;
use task_core::model::Task;
use task_core::query::SortKey;
use task_core::{StatusChange, TaskStore};
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "TASK_CLI_LOG";
const DEFAULT_LOG_LEVEL: &str = "warn";
const INTERRUPTED_MESSAGE: &str = "Operation cancelled by user.";
const INTERRUPTED_EXIT_CODE: i32 = 1;

struct Output {
    json: bool,
    renderer: Renderer,
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}

/// Saves replace the data file by rename, so exiting from the handler thread
/// never leaves a half-written store behind.
fn install_interrupt_handler() {
    let installed = ctrlc::set_handler(|| {
        eprintln!("\n{INTERRUPTED_MESSAGE}");
        std::process::exit(INTERRUPTED_EXIT_CODE);
    });
    if let Err(err) = installed {
        tracing::warn!(error = %err, "could not install interrupt handler");
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let rendered =
        serde_json::to_string(value).map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn print_tasks(store: &TaskStore, tasks: &[Task], output: &Output) -> Result<(), AppError> {
    if output.json {
        return print_json(tasks);
    }
    println!("{}", output.renderer.task_table(tasks, store.today()));
    Ok(())
}

fn print_status_change(
    id: u64,
    change: StatusChange,
    done_label: &str,
    output: &Output,
) -> Result<(), AppError> {
    if output.json {
        return print_json(&serde_json::json!({
            "id": id,
            "status": done_label,
            "changed": change == StatusChange::Changed,
        }));
    }

    match change {
        StatusChange::Changed => println!("Task {id} marked as {}.", done_label.replace('-', " ")),
        StatusChange::Unchanged => println!("Task {id} is already {}.", done_label.replace('-', " ")),
    }
    Ok(())
}

fn run_command(store: &mut TaskStore, command: Command, output: &Output) -> Result<(), AppError> {
    match command {
        Command::Add {
            description,
            fields,
        } => {
            let task = store.add(fields.into_draft(description))?;
            if output.json {
                print_json(&task)?;
            } else {
                println!("Task added successfully (ID: {})", task.id);
            }
        }
        Command::Update {
            id,
            description,
            fields,
        } => {
            let task = store.update(id, fields.into_draft(description))?;
            if output.json {
                print_json(&task)?;
            } else {
                println!("Task {} updated successfully.", task.id);
            }
        }
        Command::Delete { id } => {
            let task = store.delete(id)?;
            if output.json {
                print_json(&task)?;
            } else {
                println!("Task {} deleted successfully.", task.id);
            }
        }
        Command::MarkInProgress { id } => {
            let change = store.mark_in_progress(id)?;
            print_status_change(id, change, "in-progress", output)?;
        }
        Command::MarkDone { id } => {
            let change = store.mark_done(id)?;
            print_status_change(id, change, "done", output)?;
        }
        Command::List {
            status,
            category,
            priority,
            due_soon,
            sort,
            reverse,
            page,
        } => {
            let filter = build_filter(
                store.config(),
                status.as_deref(),
                category.as_deref(),
                priority.as_deref(),
                due_soon,
            )?;
            let selection = SortKey::select(&sort);
            if let Some(warning) = &selection.warning {
                eprintln!("WARNING: {}", warning.message());
            }

            let tasks = store.list(&filter, selection.key, reverse);
            if tasks.is_empty() && !output.json {
                match filter.status {
                    Some(status) => println!("No tasks found with status '{status}'."),
                    None => println!("No tasks found."),
                }
                return Ok(());
            }

            let per_page = store.config().tasks_per_page;
            let shown = match page {
                Some(page) => page_slice(&tasks, page, per_page)?,
                None => tasks.as_slice(),
            };
            print_tasks(store, shown, output)?;
            if !output.json {
                if let Some(page) = page {
                    println!("\nPage {page} of {}", page_count(tasks.len(), per_page));
                }
                println!("\nTotal: {} task(s)", tasks.len());
            }
        }
        Command::Search {
            query,
            status,
            category,
            priority,
        } => {
            let filter = build_filter(
                store.config(),
                status.as_deref(),
                category.as_deref(),
                priority.as_deref(),
                false,
            )?;
            let tasks = store.search(&query, &filter);
            if tasks.is_empty() && !output.json {
                println!("No tasks found matching '{}'.", query.trim());
                return Ok(());
            }
            print_tasks(store, &tasks, output)?;
            if !output.json {
                println!("\nFound {} task(s) matching '{}'.", tasks.len(), query.trim());
            }
        }
        Command::Stats => {
            let stats = store.statistics()?;
            if output.json {
                print_json(&stats)?;
            } else if stats.is_empty() {
                println!("No tasks found.");
            } else {
                println!("{}", output.renderer.statistics(&stats));
            }
        }
        Command::Backups => {
            let backups = store.backups().list()?;
            if output.json {
                let paths: Vec<String> = backups
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect();
                print_json(&paths)?;
            } else if backups.is_empty() {
                println!("No backups found.");
            } else {
                for path in &backups {
                    println!("{}", path.display());
                }
            }
        }
    }

    Ok(())
}

fn main() {
    init_logging();
    install_interrupt_handler();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return;
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let Some(command) = cli.command else {
        print_help();
        return;
    };

    let loaded = load_config_with_fallback();
    if let Some(err) = &loaded.error {
        eprintln!("WARNING: {err}. Using default configuration.");
    }

    let color = !cli.no_color
        && !cli.json
        && std::env::var_os("NO_COLOR").is_none()
        && std::io::stdout().is_terminal();
    let output = Output {
        json: cli.json,
        renderer: Renderer::new(&loaded.config, color),
    };

    let mut store = match TaskStore::open(loaded.config) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("ERROR: {err}");
            std::process::exit(1);
        }
    };
    tracing::debug!(data_file = %store.data_file().display(), tasks = store.tasks().len(), "opened task store");
    if let Some(warning) = store.load_warning() {
        eprintln!("WARNING: {warning}");
        eprintln!("Starting with an empty task list.");
    }

    if let Err(err) = run_command(&mut store, command, &output) {
        eprintln!("ERROR: {err}");
        if err.is_fatal() {
            std::process::exit(1);
        }
    }
}
