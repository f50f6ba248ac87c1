// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
//
use std::error::Error;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use beatpad::audio;
use beatpad::config;
use beatpad::import::ImportProgress;
use beatpad::library::{ImportOutcome, LibraryView};
use beatpad::playsync::CancelHandle;
use beatpad::session::Session;
use beatpad::util::duration_display;
use clap::{crate_version, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "An eight-pad sample instrument."
)]
struct Cli {
    /// The path to the player config. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum View {
    All,
    Starred,
    Recent,
    Unassigned,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Imports audio files into the library.
    Import {
        /// The files to import.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// The folder to place the imported samples in.
        #[arg(short, long)]
        folder: Option<String>,
    },
    /// Lists samples in the library.
    Library {
        /// Which samples to list. Ignored when a folder is given.
        #[arg(short, long, value_enum, default_value = "all")]
        view: View,
        /// Only list samples in this folder.
        #[arg(short, long)]
        folder: Option<String>,
        /// Only list samples whose name contains this text.
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Lists folders.
    Folders {},
    /// Creates a folder.
    CreateFolder {
        /// The name of the new folder.
        name: String,
    },
    /// Removes a sample from the library.
    Remove {
        /// The sample id.
        id: String,
    },
    /// Stars or unstars a sample.
    Star {
        /// The sample id.
        id: String,
    },
    /// Moves a sample into a folder, or out of all folders when none is given.
    Move {
        /// The sample id.
        id: String,
        /// The destination folder.
        #[arg(short, long)]
        folder: Option<String>,
    },
    /// Prints the waveform preview of a sample.
    Waveform {
        /// The sample id.
        id: String,
    },
    /// Starts the engine and plays pads from commands read on stdin: "down N", "up N",
    /// "assign N <sample id>", "stop" and "quit".
    Play {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => config::Beatpad::deserialize(path)?,
        None => config::Beatpad::default(),
    };

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Import { files, folder } => {
            let session = Session::open(&config)?;
            let progress = |progress: ImportProgress| {
                info!(
                    file = progress.file_name,
                    stage = ?progress.stage,
                    progress = progress.fraction,
                    "Import progress"
                );
            };
            let outcomes = session.library().import_files(
                &files,
                folder.as_deref(),
                &progress,
                &CancelHandle::new(),
            );

            let mut failed = 0;
            for (file, outcome) in files.iter().zip(outcomes) {
                match outcome {
                    Ok(ImportOutcome::Imported(asset)) => {
                        println!("Imported {} as {} ({})", file.display(), asset.name, asset.id)
                    }
                    Ok(ImportOutcome::Duplicate { asset, original }) => println!(
                        "Linked {} as {} ({}), same audio as {}",
                        file.display(),
                        asset.name,
                        asset.id,
                        original
                    ),
                    Err(e) => {
                        failed += 1;
                        println!("Failed {}: {}", file.display(), e);
                    }
                }
            }
            if failed > 0 {
                return Err(format!("{} of {} imports failed", failed, files.len()).into());
            }
        }
        Commands::Library {
            view,
            folder,
            search,
        } => {
            let session = Session::open(&config)?;
            let view = match (folder, view) {
                (Some(folder), _) => LibraryView::Folder(folder),
                (None, View::All) => LibraryView::All,
                (None, View::Starred) => LibraryView::Starred,
                (None, View::Recent) => LibraryView::Recent,
                (None, View::Unassigned) => LibraryView::Unassigned,
            };
            let samples = session
                .library()
                .index()
                .search(&view, search.as_deref().unwrap_or_default());

            if samples.is_empty() {
                println!("No samples found.");
                return Ok(());
            }

            println!("Samples (count: {}):", samples.len());
            for sample in samples {
                println!(
                    "- {}{} ({}, {})",
                    if sample.is_starred { "* " } else { "" },
                    sample.name,
                    sample.id,
                    duration_display(std::time::Duration::from_secs_f64(
                        sample.duration_seconds.max(0.0)
                    )),
                );
            }
        }
        Commands::Folders {} => {
            let session = Session::open(&config)?;
            let folders = session.library().index().all_folders();

            if folders.is_empty() {
                println!("No folders found.");
                return Ok(());
            }

            println!("Folders:");
            for folder in folders {
                println!(
                    "- {} ({}, {} samples)",
                    folder.name,
                    folder.id,
                    folder.sample_ids.len()
                );
            }
        }
        Commands::CreateFolder { name } => {
            let session = Session::open(&config)?;
            let folder = session.library().index().add_folder(&name);
            println!("Created {} ({})", folder.name, folder.id);
        }
        Commands::Remove { id } => {
            let session = Session::open(&config)?;
            match session.library().index().remove(&id) {
                Some(sample) => println!("Removed {}", sample.name),
                None => return Err(format!("no sample with id {}", id).into()),
            }
        }
        Commands::Star { id } => {
            let session = Session::open(&config)?;
            match session.library().index().toggle_star(&id) {
                Some(true) => println!("Starred {}", id),
                Some(false) => println!("Unstarred {}", id),
                None => return Err(format!("no sample with id {}", id).into()),
            }
        }
        Commands::Move { id, folder } => {
            let session = Session::open(&config)?;
            if !session.library().index().move_sample(&id, folder.as_deref()) {
                return Err("unknown sample or folder".into());
            }
            match folder {
                Some(folder) => println!("Moved {} to {}", id, folder),
                None => println!("Moved {} out of its folder", id),
            }
        }
        Commands::Waveform { id } => {
            let session = Session::open(&config)?;
            let Some(points) = session.library().waveform(&id) else {
                return Err(format!("no sample with id {}", id).into());
            };
            for point in points {
                println!("{:.6}", point);
            }
        }
        Commands::Play {} => {
            let session = Arc::new(Session::open(&config)?);
            session.restore_pads();
            session.engine().start()?;

            let mut pads = session.engine().subscribe();
            tokio::spawn(async move {
                while pads.changed().await.is_ok() {
                    let loaded = pads
                        .borrow_and_update()
                        .iter()
                        .filter(|pad| pad.has_sample())
                        .count();
                    info!(loaded, "Pads changed");
                }
            });

            let player = session.clone();
            tokio::task::spawn_blocking(move || play_from_stdin(&player)).await??;
            session.close();
        }
    };

    Ok(())
}

/// Reads pad commands from stdin until it closes or "quit" is read.
fn play_from_stdin(session: &Session) -> Result<(), io::Error> {
    println!("Ready. Commands: down N, up N, assign N <id>, stop, quit");
    for line in io::stdin().lock().lines() {
        let line = line?;
        let words: Vec<&str> = line.split_whitespace().collect();
        let result = match words.as_slice() {
            [] => continue,
            ["quit"] => break,
            ["stop"] => session.engine().stop_all().map_err(|e| e.to_string()),
            ["down", pad] | ["up", pad] => match pad.parse::<usize>() {
                Ok(pad) => session
                    .engine()
                    .trigger(pad, words[0] == "down")
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            },
            ["assign", pad, id] => match pad.parse::<usize>() {
                Ok(pad) => session.assign_sample(pad, id).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            },
            _ => Err(format!("unrecognized command: {}", line)),
        };
        if let Err(e) = result {
            warn!(err = e, "Command failed");
        }
    }
    Ok(())
}
