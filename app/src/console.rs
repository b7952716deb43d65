//! Line-oriented terminal front-end.
//!
//! Reads commands from stdin, forwards them to the counter loop and prints
//! the loop's events. Runs on its own thread; the counter loop keeps the
//! main thread.

use clicktally_core::{Command, ControllerEvent, Phase, SessionSnapshot};
use crossbeam_channel::{bounded, never, select, Receiver, Sender};
use std::io::BufRead;
use std::path::PathBuf;
use std::thread;
use tracing::debug;

pub const HELP: &str = "\
commands:
  s | start | stop     toggle counting
  f <folder>           set output folder
  e [comment]          export to CSV and reset
  status               show current tally
  h | help             this text
  q | quit             exit";

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Toggle,
    SetFolder(PathBuf),
    Export(String),
    Status,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_line(line: &str) -> Input {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "" => Input::Empty,
        "s" | "start" | "stop" | "toggle" => Input::Toggle,
        "f" | "folder" if !rest.is_empty() => Input::SetFolder(PathBuf::from(rest)),
        "e" | "export" | "save" => Input::Export(rest.to_string()),
        "status" | "?" => Input::Status,
        "h" | "help" => Input::Help,
        "q" | "quit" | "exit" => Input::Quit,
        _ => Input::Unknown(line.to_string()),
    }
}

pub fn format_phase(phase: Phase) -> &'static str {
    match phase {
        Phase::Ready => "Ready",
        Phase::Counting => "Counting",
        Phase::Paused => "Paused",
    }
}

pub fn format_snapshot(s: &SessionSnapshot) -> String {
    let folder = s
        .output_folder
        .as_ref()
        .map(|f| f.display().to_string())
        .unwrap_or_else(|| "Not Set".into());
    format!(
        "Status: {} | Clicks: {} | Time: {} seconds | Output Folder: {}",
        format_phase(s.phase),
        s.click_count,
        s.elapsed_seconds,
        folder
    )
}

/// Human-readable line for an event.
pub fn format_event(event: &ControllerEvent) -> String {
    match event {
        ControllerEvent::PhaseChanged { phase } => format!("Status: {}", format_phase(*phase)),
        ControllerEvent::ClickCounted { click_count } => format!("Clicks: {}", click_count),
        ControllerEvent::Ticked { elapsed_seconds } => format!("Time: {} seconds", elapsed_seconds),
        ControllerEvent::FolderSet { folder } => format!("Output Folder: {}", folder.display()),
        ControllerEvent::Exported { path, record } => format!(
            "Data saved successfully to: {} ({} clicks, {} seconds)",
            path.display(),
            record.clicks,
            record.duration_seconds
        ),
        ControllerEvent::FolderRequired { .. } => {
            "No output folder set. Enter a folder path (empty to cancel):".to_string()
        }
        ControllerEvent::ExportFailed { message } => format!("Error saving file: {}", message),
        ControllerEvent::Snapshot(snapshot) => format_snapshot(snapshot),
    }
}

/// Spawn a thread forwarding stdin lines. The channel closes on EOF.
///
/// The thread is never joined: it may sit in a blocking read at exit.
pub fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = bounded(16);
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        debug!("stdin closed");
    });
    rx
}

pub struct Console {
    commands: Sender<Command>,
    events: Receiver<ControllerEvent>,
    lines: Receiver<String>,
    json: bool,
    /// Comment of an export waiting for the user to name a folder.
    pending_export: Option<String>,
}

impl Console {
    pub fn new(
        commands: Sender<Command>,
        events: Receiver<ControllerEvent>,
        lines: Receiver<String>,
        json: bool,
    ) -> Self {
        Self {
            commands,
            events,
            lines,
            json,
            pending_export: None,
        }
    }

    /// Run until the counter loop has gone away.
    pub fn run(mut self) {
        let events = self.events.clone();
        let mut lines = self.lines.clone();

        loop {
            select! {
                recv(lines) -> line => match line {
                    Ok(line) => self.handle_line(&line),
                    Err(_) => {
                        // EOF on stdin: same as quit.
                        self.send(Command::Shutdown);
                        lines = never();
                    }
                },
                recv(events) -> event => match event {
                    Ok(event) => self.render(&event),
                    Err(_) => break,
                },
            }
        }
    }

    fn handle_line(&mut self, line: &str) {
        if let Some(comment) = self.pending_export.take() {
            let answer = line.trim();
            if answer.is_empty() {
                println!("Export cancelled.");
            } else {
                self.send(Command::Export {
                    folder: Some(PathBuf::from(answer)),
                    comment,
                });
            }
            return;
        }

        match parse_line(line) {
            Input::Toggle => self.send(Command::Toggle),
            Input::SetFolder(folder) => self.send(Command::SetOutputFolder(folder)),
            Input::Export(comment) => self.send(Command::Export {
                folder: None,
                comment,
            }),
            Input::Status => self.send(Command::Snapshot),
            Input::Help => println!("{}", HELP),
            Input::Quit => self.send(Command::Shutdown),
            Input::Empty => {}
            Input::Unknown(text) => println!("Unknown command: {} (type 'help')", text),
        }
    }

    fn render(&mut self, event: &ControllerEvent) {
        if let ControllerEvent::FolderRequired { comment } = event {
            self.pending_export = Some(comment.clone());
        }

        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("Failed to serialize event: {}", e),
            }
        } else {
            println!("{}", format_event(event));
        }
    }

    fn send(&self, cmd: Command) {
        if self.commands.send(cmd).is_err() {
            debug!("Counter loop already gone");
        }
    }
}
