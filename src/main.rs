//! FLATAR - Command Line Interface
//! `stat`, `input`, `extract` and `help` over a single archive file.

use std::ffi::OsString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};

use flatar::config::{Config, DEFAULT_BUFFER_SIZE};
use flatar::engine::Archive;
use flatar::error::ArchiveError;
use flatar::types::EntryInfo;

#[derive(Parser)]
#[command(name = "flatar", version)]
#[command(about = "Flat-file archiver without compression", long_about = None)]
#[command(disable_help_subcommand = true)]
#[command(after_help = "Extract removes the entry from the archive after writing it.")]
struct Cli {
    /// Do not fsync the rewritten archive before committing it
    #[arg(long, global = true)]
    no_sync: bool,

    /// Copy buffer size in bytes
    #[arg(long, global = true, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the entries of an archive
    Stat {
        /// Archive file
        archive: PathBuf,

        /// Print one JSON object per entry
        #[arg(long)]
        json: bool,
    },

    /// Add or replace a file, stored under its base name
    Input {
        /// Archive file (created if missing)
        archive: PathBuf,

        /// File to store
        file: PathBuf,
    },

    /// Extract an entry and remove it from the archive
    Extract {
        /// Archive file
        archive: PathBuf,

        /// Entry name
        name: OsString,

        /// Directory to write the extracted file into
        #[arg(short = 'C', long = "directory", default_value = ".")]
        directory: PathBuf,
    },

    /// Print usage
    Help,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            let _ = err.print();
            return code;
        }
    };

    let config = |archive: &Path| {
        Config::new(archive)
            .with_sync_writes(!cli.no_sync)
            .with_buffer_size(cli.buffer_size)
    };

    match &cli.command {
        Command::Stat { archive, json } => {
            report("stat", archive, stat(config(archive), *json))
        }
        Command::Input { archive, file } => {
            let result = Archive::open(config(archive)).and_then(|a| a.add(file));
            report("input", archive, result.map(|_| ()))
        }
        Command::Extract {
            archive,
            name,
            directory,
        } => {
            let result = Archive::open(config(archive).with_extract_dir(directory))
                .and_then(|a| a.extract(name.as_bytes()));
            if let Ok(extracted) = &result {
                for warning in &extracted.warnings {
                    eprintln!("flatar: warning: {}", warning);
                }
            }
            report("extract", archive, result.map(|_| ()))
        }
        Command::Help => {
            let _ = Cli::command().print_help();
            println!();
            ExitCode::SUCCESS
        }
    }
}

fn stat(config: Config, json: bool) -> Result<(), ArchiveError> {
    let archive = Archive::open(config)?;
    archive.for_each_entry(|info| {
        if json {
            match serde_json::to_string(info) {
                Ok(line) => println!("{}", line),
                Err(e) => log::error!("Failed to encode {:?}: {}", info.display_name(), e),
            }
        } else {
            println!("{}", format_row(info));
        }
    })?;
    Ok(())
}

fn format_row(info: &EntryInfo) -> String {
    format!(
        "{}\t{} bytes\tmode {:o}\tuid {}\tgid {}\tmtime {}",
        info.display_name(),
        info.content_len,
        info.meta.permissions(),
        info.meta.uid,
        info.meta.gid,
        info.meta.mtime
    )
}

fn report(command: &str, archive: &Path, result: Result<(), ArchiveError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("flatar: {} {}: {}", command, archive.display(), err);
            ExitCode::FAILURE
        }
    }
}
