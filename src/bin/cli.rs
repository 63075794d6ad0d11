use std::fs::File;
use std::io::{self, Write};
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use day_planner::{
    Command, DayPlanner, Notice, NoticeLevel, PersistenceError, PlannerCliArgs, PlannerConfig,
    Priority, PriorityFilter, SystemClock, Task, TaskBlobStore, TaskDraft, TaskId, TaskPatch,
    export_tasks_to_csv, load_tasks_from_json_file, save_tasks_to_json_file,
};

type Planner = DayPlanner<Box<dyn TaskBlobStore + Send + Sync>>;

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.chars().count());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&widths, headers.iter().copied()));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(&widths, row.iter().map(String::as_str)));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn render_row<'a>(widths: &[usize], cells: impl Iterator<Item = &'a str>) -> String {
    let mut line = String::from("|");
    for (ci, cell) in cells.enumerate() {
        line.push(' ');
        line.push_str(cell);
        let pad = widths[ci].saturating_sub(cell.chars().count());
        line.push_str(&" ".repeat(pad));
        line.push_str(" |");
    }
    line
}

fn render_day(planner: &Planner) -> String {
    let tasks = planner.visible_tasks();
    let rows: Vec<Vec<String>> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            vec![
                (i + 1).to_string(),
                format!("{}-{}", task.start_time, task.end_time),
                task.title.clone(),
                task.priority.to_string(),
                if task.completed { "x".into() } else { String::new() },
                task.id.to_string(),
            ]
        })
        .collect();
    let summary = planner.summary();
    format!(
        "{} ({})\n{}{} of {} done, {} min scheduled",
        planner.date_heading(),
        day_planner::time_math::long_date(planner.viewed_date()),
        render_text_table(&["#", "time", "title", "priority", "done", "id"], &rows),
        summary.completed,
        summary.total,
        summary.scheduled_minutes,
    )
}

fn print_help() {
    println!(
        "Commands:\n  help                              Show this help\n  show                              Show the viewed day\n  add <HH:MM> <HH:MM> <title...>    Add a task to the viewed day\n  edit <task> <HH:MM> <HH:MM>       Change start and end\n  rename <task> <title...>          Change title\n  desc <task> <text...>             Set description (empty clears)\n  prio <task> <low|medium|high>     Set priority\n  done <task>                       Toggle completed\n  delete <task>                     Delete a task\n  drag <task> <pixels>              Drag by a pixel offset (60 per hour)\n  date <YYYY-MM-DD> | today | next | prev\n                                    Change the viewed day\n  search [text...]                  Filter by title/description\n  filter <all|low|medium|high>      Filter by priority\n  completed                         Toggle showing completed tasks\n  export <path>                     Write all tasks as JSON\n  import <path>                     Replace all tasks from JSON\n  csv <path>                        Write all tasks as CSV\n  quit|exit                         Exit\n\n<task> is a row number from 'show' or a task id."
    );
}

fn print_notices(notices: &[Notice]) {
    for notice in notices {
        println!("[{}] {}", level_name(notice), notice.message);
    }
}

fn level_name(notice: &Notice) -> &'static str {
    match notice.level {
        NoticeLevel::Success => "ok",
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    }
}

/// Row numbers refer to the last rendered view; anything else is taken as an id.
fn resolve_task(planner: &Planner, arg: &str) -> TaskId {
    let visible: Vec<Task> = planner.visible_tasks();
    match arg.parse::<usize>() {
        Ok(row) if row >= 1 && row <= visible.len() => visible[row - 1].id.clone(),
        _ => TaskId::from(arg),
    }
}

fn run(planner: &mut Planner, command: Command) {
    match planner.dispatch(command) {
        Ok(outcome) => print_notices(&outcome.notices),
        Err(e) => println!("Error: {}", e),
    }
}

fn main() {
    let cli = PlannerCliArgs::parse();
    let config = match PlannerConfig::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(2);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let store = match config.storage.open() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Storage error: {}", e);
            std::process::exit(2);
        }
    };
    let mut planner: Planner = DayPlanner::open(store, Arc::new(SystemClock));

    println!("Day Planner (CLI) - type 'help' for commands\n");
    print_notices(&planner.take_startup_notices());
    println!("{}", render_day(&planner));

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => println!("{}", render_day(&planner)),
            "add" => {
                let start = parts.next();
                let end = parts.next();
                let title = parts.collect::<Vec<_>>().join(" ");
                match (start, end) {
                    (Some(start), Some(end)) if !title.is_empty() => {
                        run(&mut planner, Command::AddTask(TaskDraft::new(title, start, end)));
                    }
                    _ => println!("Usage: add <HH:MM> <HH:MM> <title...>"),
                }
            }
            "edit" => match (parts.next(), parts.next(), parts.next()) {
                (Some(task), Some(start), Some(end)) => {
                    let id = resolve_task(&planner, task);
                    run(
                        &mut planner,
                        Command::UpdateTask {
                            id,
                            patch: TaskPatch::times(start, end),
                        },
                    );
                }
                _ => println!("Usage: edit <task> <HH:MM> <HH:MM>"),
            },
            "rename" | "desc" => {
                let Some(task) = parts.next() else {
                    println!("Usage: {} <task> <text...>", cmd);
                    continue;
                };
                let text = parts.collect::<Vec<_>>().join(" ");
                let id = resolve_task(&planner, task);
                let patch = if cmd == "rename" {
                    TaskPatch {
                        title: Some(text),
                        ..TaskPatch::default()
                    }
                } else {
                    TaskPatch {
                        description: Some(text),
                        ..TaskPatch::default()
                    }
                };
                run(&mut planner, Command::UpdateTask { id, patch });
            }
            "prio" => match (parts.next(), parts.next()) {
                (Some(task), Some(level)) => {
                    let priority: Priority = match level.parse() {
                        Ok(p) => p,
                        Err(e) => {
                            println!("Error: {}", e);
                            continue;
                        }
                    };
                    let id = resolve_task(&planner, task);
                    let patch = TaskPatch {
                        priority: Some(priority),
                        ..TaskPatch::default()
                    };
                    run(&mut planner, Command::UpdateTask { id, patch });
                }
                _ => println!("Usage: prio <task> <low|medium|high>"),
            },
            "done" | "delete" => match parts.next() {
                Some(task) => {
                    let id = resolve_task(&planner, task);
                    let command = if cmd == "done" {
                        Command::ToggleComplete(id)
                    } else {
                        Command::DeleteTask(id)
                    };
                    run(&mut planner, command);
                }
                None => println!("Usage: {} <task>", cmd),
            },
            "drag" => match (parts.next(), parts.next().map(str::parse::<i64>)) {
                (Some(task), Some(Ok(delta))) => {
                    let id = resolve_task(&planner, task);
                    let drag = [
                        Command::BeginDrag { id, pointer_y: 0 },
                        Command::MoveDrag { pointer_y: delta },
                        Command::EndDrag,
                    ];
                    for command in drag {
                        match planner.dispatch(command) {
                            Ok(outcome) => print_notices(&outcome.notices),
                            Err(e) => {
                                println!("Error: {}", e);
                                let _ = planner.dispatch(Command::AbortDrag);
                                break;
                            }
                        }
                    }
                }
                _ => println!("Usage: drag <task> <pixels>"),
            },
            "date" => match parts.next().map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d")) {
                Some(Ok(date)) => {
                    run(&mut planner, Command::SetDate(date));
                    println!("{}", render_day(&planner));
                }
                Some(Err(_)) => println!("Invalid date (YYYY-MM-DD)"),
                None => println!("Usage: date <YYYY-MM-DD>"),
            },
            "today" | "next" | "prev" => {
                let command = match cmd {
                    "next" => Command::NavigateDays(1),
                    "prev" => Command::NavigateDays(-1),
                    _ => Command::SetDate(planner.today()),
                };
                run(&mut planner, command);
                println!("{}", render_day(&planner));
            }
            "search" => {
                let text = parts.collect::<Vec<_>>().join(" ");
                run(&mut planner, Command::SetSearch(text));
                println!("{}", render_day(&planner));
            }
            "filter" => match parts.next().map(str::parse::<PriorityFilter>) {
                Some(Ok(filter)) => {
                    run(&mut planner, Command::SetPriorityFilter(filter));
                    println!("{}", render_day(&planner));
                }
                Some(Err(e)) => println!("Error: {}", e),
                None => println!("Usage: filter <all|low|medium|high>"),
            },
            "completed" => {
                run(&mut planner, Command::ToggleShowCompleted);
                println!("{}", render_day(&planner));
            }
            "export" => match parts.next() {
                Some(path) => match save_tasks_to_json_file(&planner.store().all(), path) {
                    Ok(()) => println!("Exported {} tasks to {}", planner.store().len(), path),
                    Err(e) => println!("Export error: {}", e),
                },
                None => println!("Usage: export <path> (suggested: {})", planner.export_file_name()),
            },
            "import" => match parts.next() {
                Some(path) => match load_tasks_from_json_file(path) {
                    Ok(payload) => run(&mut planner, Command::Import(payload)),
                    Err(e) => println!("Error importing tasks: {}", e),
                },
                None => println!("Usage: import <path>"),
            },
            "csv" => match parts.next() {
                Some(path) => {
                    let result = File::create(path)
                        .map_err(PersistenceError::from)
                        .and_then(|file| export_tasks_to_csv(&planner.store().all(), file));
                    match result {
                        Ok(()) => println!("Wrote {}", path),
                        Err(e) => println!("CSV error: {}", e),
                    }
                }
                None => println!("Usage: csv <path>"),
            },
            _ => println!("Unknown command. Type 'help'."),
        }
    }
}
