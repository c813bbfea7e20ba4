//! Command-line host for the Taskify core.
//!
//! # Responsibility
//! - Wire configuration, logging, the SQLite database, local auth and the
//!   synchronization store the way a UI host would.
//! - Print today's agenda grouped by category.

use chrono::Local;
use log::error;
use rusqlite::Connection;
use std::process::ExitCode;
use std::rc::Rc;
use taskify_core::{
    init_logging_from, open_shared_db, AuthSession, CoreConfig, LocalAuthSession,
    SqliteRemoteStore, SyncStore,
};

const USAGE: &str = "usage:
  taskify ping
  taskify version
  taskify signup <name> <email> <password>
  taskify agenda <email> <password>";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["ping"] => {
            println!("taskify_core ping={}", taskify_core::ping());
            ExitCode::SUCCESS
        }
        ["version"] => {
            println!("taskify_core version={}", taskify_core::core_version());
            ExitCode::SUCCESS
        }
        ["signup", name, email, password] => report(signup(name, email, password).await),
        ["agenda", email, password] => report(agenda(email, password).await),
        _ => {
            eprintln!("{USAGE}");
            ExitCode::from(2)
        }
    }
}

fn report(result: Result<(), String>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_exit module=cli status=error");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn open_session() -> Result<(Rc<Connection>, LocalAuthSession), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    init_logging_from(&config)?;
    let conn = open_shared_db(Some(&config.db_path)).map_err(|err| err.to_string())?;
    let session = LocalAuthSession::new(Rc::clone(&conn));
    Ok((conn, session))
}

async fn signup(name: &str, email: &str, password: &str) -> Result<(), String> {
    let (_, session) = open_session()?;
    let identity = session
        .sign_up(name, email, password)
        .await
        .map_err(|err| err.to_string())?;
    println!(
        "signed up {}",
        identity.display_name.as_deref().unwrap_or(identity.id.as_str())
    );
    Ok(())
}

async fn agenda(email: &str, password: &str) -> Result<(), String> {
    let (conn, session) = open_session()?;
    let identity = session
        .sign_in(email, password)
        .await
        .map_err(|err| err.to_string())?;

    let today = Local::now().date_naive();
    let remote = SqliteRemoteStore::new(conn, session.subscribe());
    let store = SyncStore::new(remote, today);
    store
        .set_identity(Some(identity))
        .await
        .map_err(|err| err.to_string())?;

    let snapshot = store.snapshot();
    let counts = snapshot.counts();
    println!(
        "{} - {} pending of {} task(s)",
        today.format("%A %Y-%m-%d"),
        counts.pending_on_selected_date,
        counts.total
    );
    let groups = snapshot.visible_groups(today);
    if groups.is_empty() {
        println!("nothing due today");
    }
    for group in groups {
        println!("{}", group.category);
        for task in group.tasks {
            let mark = if task.completed { "x" } else { " " };
            println!("  [{mark}] {} ({})", task.title, task.priority);
        }
    }
    Ok(())
}
