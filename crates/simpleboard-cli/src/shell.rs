//! Interactive shell.
//!
//! Keeps one session open across many commands. Every input line counts as
//! a key press for the idle watcher, which logs the user out after three
//! idle hours and ends the shell on the login view.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use simpleboard_core::auth::{ActivitySignal, SessionWatcher};
use simpleboard_core::routes::{Navigator, Route};

use crate::app::App;
use crate::commands::{self, Command};

/// How often the shell looks for a logout forced by the watcher.
const ROUTE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Lines read ahead of the shell loop.
const LINE_BUFFER: usize = 16;

const PROMPT: &str = "> ";

/// Why the shell loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellExit {
    Quit,
    EndOfInput,
    LoggedOut,
}

/// Split a line into arguments, honouring double quotes.
pub fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                has_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

/// Feed stdin lines into a channel from a plain thread. A blocking read on
/// that thread never holds up runtime shutdown.
fn spawn_stdin_reader() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read stdin");
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

fn on_login_view(app: &App) -> bool {
    Route::parse(&app.navigator.current_location()) == Route::Login
}

fn prompt(out: &mut impl Write) -> Result<()> {
    write!(out, "{}", PROMPT)?;
    out.flush()?;
    Ok(())
}

pub async fn run(app: &mut App) -> Result<()> {
    if !app.enter(&Route::Boards.path()) {
        return Ok(());
    }

    println!("SimpleBoard shell. Type 'help' for commands, 'exit' to leave.");
    let mut lines = spawn_stdin_reader()?;
    info!("Shell started");

    let exit = run_loop(app, &mut lines, ROUTE_POLL_INTERVAL, &mut std::io::stdout()).await?;
    info!(?exit, "Shell stopped");
    Ok(())
}

/// Run commands from `lines` with the watcher alive until input ends, the
/// user leaves, or the session ends. The watcher is torn down on return.
pub async fn run_loop<W: Write>(
    app: &mut App,
    lines: &mut mpsc::Receiver<String>,
    poll_every: Duration,
    out: &mut W,
) -> Result<ShellExit> {
    let navigator: Arc<dyn Navigator> = app.navigator.clone();
    let watcher = SessionWatcher::new(Arc::clone(&app.session), navigator).spawn();
    let mut poll = tokio::time::interval(poll_every);

    prompt(out)?;
    let exit = loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else {
                    break ShellExit::EndOfInput;
                };
                watcher.notify(ActivitySignal::KeyPress);
                if let Some(exit) = handle_line(app, &line).await? {
                    break exit;
                }
                prompt(out)?;
            }
            _ = poll.tick() => {
                if on_login_view(app) {
                    writeln!(out)?;
                    if let Some(message) = app.session.consume_logout_message() {
                        writeln!(out, "{}", message)?;
                    }
                    writeln!(out, "Please log in again: simpleboard login")?;
                    break ShellExit::LoggedOut;
                }
            }
        }
    };

    watcher.shutdown().await;
    Ok(exit)
}

async fn handle_line(app: &mut App, line: &str) -> Result<Option<ShellExit>> {
    let args = split_args(line);
    let Some(first) = args.first() else {
        return Ok(None);
    };
    if matches!(first.as_str(), "exit" | "quit") {
        return Ok(Some(ShellExit::Quit));
    }

    match Command::parse(&args) {
        Ok(Command::Login { .. } | Command::Register | Command::Shell) => {
            println!("Not available inside the shell.");
        }
        Ok(Command::Logout) => {
            app.logout();
            return Ok(Some(ShellExit::LoggedOut));
        }
        Ok(command) => {
            debug!(?command, "Shell command");
            commands::run(app, command).await?;
            if on_login_view(app) {
                return Ok(Some(ShellExit::LoggedOut));
            }
        }
        Err(e) => eprintln!("{}", e),
    }
    Ok(None)
}
