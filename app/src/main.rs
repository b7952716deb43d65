mod console;
mod logging;

use clap::Parser;
use clicktally_core::{
    load_settings, load_settings_from, save_settings, save_settings_to, Controller, CounterLoop,
    CsvExporter, MouseButton,
};
use clicktally_platform::{native_backend, permission_hint, ClickListener, ListenerConfig};
use console::{spawn_stdin_reader, Console, HELP};
use crossbeam_channel::bounded;
use std::path::PathBuf;
use tracing::{info, warn};

/// Count global mouse clicks against a timer and export the tally to CSV.
#[derive(Debug, Parser)]
#[command(name = "clicktally", version, about)]
struct Args {
    /// Folder the CSV file is written to.
    #[arg(short, long)]
    output_folder: Option<PathBuf>,

    /// Settings file to use instead of the default location.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV file name inside the output folder.
    #[arg(long)]
    file_name: Option<String>,

    /// Count every mouse button, not only the configured ones.
    #[arg(long)]
    all_buttons: bool,

    /// Print events as JSON lines.
    #[arg(long)]
    json: bool,

    /// Write the effective settings to the settings file before starting.
    #[arg(long)]
    save_config: bool,

    /// More log output (-v for debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Reported after logging is up: the subscriber depends on the settings.
    let loaded = match &args.config {
        Some(path) => load_settings_from(path),
        None => load_settings(),
    };
    let mut settings = loaded.as_ref().cloned().unwrap_or_default();
    if let Some(folder) = args.output_folder {
        settings.output_folder = Some(folder);
    }
    if let Some(file_name) = args.file_name {
        settings.file_name = file_name;
    }
    if args.all_buttons {
        settings.count_buttons = vec![
            MouseButton::Left,
            MouseButton::Right,
            MouseButton::Middle,
            MouseButton::Other,
        ];
    }

    logging::setup(args.verbose, settings.log_to_file);
    if let Err(e) = &loaded {
        warn!("Failed to load settings: {}, using defaults", e);
        eprintln!("Settings file ignored: {}", e);
    }
    info!(?settings, "Starting clicktally");

    if args.save_config && loaded.is_err() {
        warn!("Not overwriting a settings file that failed to load");
    } else if args.save_config {
        let saved = match &args.config {
            Some(path) => save_settings_to(path, &settings).map(|_| path.clone()),
            None => save_settings(&settings),
        };
        match saved {
            Ok(path) => println!("Settings written to {}", path.display()),
            Err(e) => warn!("Failed to save settings: {}", e),
        }
    }

    settings.output_folder = usable_output_folder(settings.output_folder.take());

    // Producer: the global hook, on its own thread.
    let (click_tx, click_rx) = bounded(settings.channel_capacity.max(1));
    let mut listener = ClickListener::new(ListenerConfig {
        buttons: settings.count_buttons.clone(),
        startup_timeout: settings.startup_timeout(),
    });
    match native_backend().and_then(|backend| listener.start(backend, click_tx)) {
        Ok(()) => info!(active = listener.is_active(), "Click listener started"),
        Err(e) => {
            warn!("Click listener unavailable: {}", e);
            eprintln!("{}\n{}", e, permission_hint());
        }
    }

    // Consumer: the controller, on the loop thread.
    let exporter = CsvExporter::new(settings.file_name.clone());
    info!(file = exporter.file_name(), "CSV export target");
    let controller = Controller::new(exporter, settings.tick_interval())
        .with_output_folder(settings.output_folder.clone());
    let counter_loop = CounterLoop::spawn(controller, click_rx);

    if !args.json {
        println!("Global Click Counter");
        println!("{}", HELP);
    }

    // Front-end on this thread; returns once the loop has exited.
    Console::new(
        counter_loop.commands(),
        counter_loop.events(),
        spawn_stdin_reader(),
        args.json,
    )
    .run();
    let last = counter_loop.join().unwrap_or_default();

    // Hook is unregistered and its thread joined before the process exits.
    listener.stop();

    info!(
        clicks = last.click_count,
        seconds = last.elapsed_seconds,
        "clicktally exiting"
    );
    Ok(())
}

/// Keep the configured folder only if it exists as a directory.
/// Otherwise export will ask for a folder instead.
fn usable_output_folder(folder: Option<PathBuf>) -> Option<PathBuf> {
    let folder = folder?;
    if folder.is_dir() {
        return Some(folder);
    }
    warn!(?folder, "Configured output folder is not a directory, ignoring it");
    eprintln!(
        "Output folder {} is not a directory; you will be asked for one on export.",
        folder.display()
    );
    None
}
