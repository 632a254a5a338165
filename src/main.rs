// Terminal host: prints today's list and runs one focus session.
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, Utc};
use daybook_lib::logging::init_logging;
use daybook_lib::notify::NoNotifications;
use daybook_lib::pomodoro::{format_time, TimerStatus, DEFAULT_DURATION_MINUTES};
use daybook_lib::ticker::{FocusTimer, SessionAlert, Ticker, TICK_PERIOD};
use daybook_lib::todos::DAILY_TODO_LIMIT;
use daybook_lib::Daybook;

const DATA_DIR_ENV: &str = "DAYBOOK_DATA_DIR";
const DEFAULT_DATA_DIR: &str = "daybook-data";

struct ConsoleAlert;

impl SessionAlert for ConsoleAlert {
    fn session_completed(&self, duration_secs: u32) {
        println!("\x07\nFocus session complete ({})", format_time(duration_secs));
    }
}

#[tokio::main]
async fn main() {
    let data_dir = std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    let _logger = match init_logging(&data_dir) {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("failed to start logging: {err}");
            None
        }
    };

    if let Err(err) = run(data_dir).await {
        log::error!("daybook exited with error: {err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(data_dir: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let book = Daybook::open_dir(data_dir, Arc::new(NoNotifications))?;
    if let Some(name) = book.auto_backup(&Local::now())? {
        println!("Backup written: {name}");
    }

    let today = book.todos().todays_todos();
    println!(
        "Today's tasks ({}/{DAILY_TODO_LIMIT}, {} left):",
        today.len(),
        book.todos().remaining_today()
    );
    for todo in &today {
        let mark = if todo.completed { "x" } else { " " };
        println!("  [{mark}] {}", todo.text);
    }
    let overdue = book.reminders().overdue(Utc::now());
    if !overdue.is_empty() {
        println!("{} overdue reminder(s)", overdue.len());
    }

    let minutes = std::env::args()
        .nth(1)
        .map(|arg| arg.parse::<u32>())
        .transpose()?
        .unwrap_or(DEFAULT_DURATION_MINUTES);

    let mut timer = FocusTimer::new(Arc::new(ConsoleAlert));
    timer.set_duration_minutes(minutes)?;
    timer.start();
    log::info!("terminal focus session minutes={minutes}");

    let mut display = Ticker::new(TICK_PERIOD);
    while timer.status() != TimerStatus::Completed {
        print!(
            "\r{} {:>3.0}% {}   ",
            timer.formatted_remaining(),
            timer.progress() * 100.0,
            timer.status_label()
        );
        std::io::stdout().flush()?;
        display.next().await;
    }
    Ok(())
}
