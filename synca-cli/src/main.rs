// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Synchronizer CLI
//!
//! Thin entry point: parse arguments, wire up a [`Synchronizer`], drive it
//! to completion, report the archive digest, and map any error to a
//! `sysexits.h`-style process exit code.

mod cli;
mod exit_code;
mod logger;

use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;

use synca_core::{FsStore, GearChunker, Synchronizer};
use synca_domain::{ChunkerParams, Direction, StepOutcome, SyncError};

use cli::{Cli, Commands};
use exit_code::ExitCode;

fn main() -> ProcessExitCode {
    let cli = cli::parse();
    logger::init(cli.verbose);

    match run(cli) {
        Ok(()) => ProcessExitCode::SUCCESS,
        Err(err) => {
            let code = ExitCode::from_sync_error(&err);
            tracing::error!(error = %err, exit_code = code.as_i32(), "synchronizer session failed");
            eprintln!("synca: {err}");
            ProcessExitCode::from(code.as_i32() as u8)
        }
    }
}

fn run(cli: Cli) -> Result<(), SyncError> {
    match cli.command {
        Commands::Encode {
            base,
            archive,
            index,
            store,
            min_size,
            avg_size,
            max_size,
        } => run_encode(base, archive, index, store, min_size, avg_size, max_size),
        Commands::Decode {
            base,
            archive,
            index,
            store,
            seeds,
            base_mode,
            min_size,
            avg_size,
            max_size,
        } => run_decode(base, archive, index, store, seeds, base_mode.into(), min_size, avg_size, max_size),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_encode(
    base: PathBuf,
    archive: Option<PathBuf>,
    index: Option<PathBuf>,
    store: Option<PathBuf>,
    min_size: usize,
    avg_size: usize,
    max_size: usize,
) -> Result<(), SyncError> {
    let params = ChunkerParams::new(min_size, avg_size, max_size)?;
    let mut sync = Synchronizer::new(Direction::Encode, Box::new(GearChunker::new(params)));

    sync.set_base_path(&base)?;
    if let Some(archive) = &archive {
        sync.set_archive_path(archive)?;
    }
    if let Some(index) = &index {
        sync.set_index_path(index)?;
    }
    if let Some(store) = &store {
        sync.set_wstore(Box::new(FsStore::create(store).map_err(|e| SyncError::io_error(e.to_string()))?))?;
    }

    drive_to_finish(&mut sync)?;
    let digest = sync.get_digest()?;
    println!("{digest}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_decode(
    base: PathBuf,
    archive: Option<PathBuf>,
    index: Option<PathBuf>,
    store: Option<PathBuf>,
    seeds: Vec<PathBuf>,
    base_mode: synca_domain::BaseMode,
    min_size: usize,
    avg_size: usize,
    max_size: usize,
) -> Result<(), SyncError> {
    let params = ChunkerParams::new(min_size, avg_size, max_size)?;
    let mut sync = Synchronizer::new(Direction::Decode, Box::new(GearChunker::new(params)));

    sync.set_base_path(&base)?;
    sync.set_base_mode(base_mode)?;
    if let Some(archive) = &archive {
        sync.set_archive_path(archive)?;
    }
    if let Some(index) = &index {
        sync.set_index_path(index)?;
    }
    if let Some(store) = &store {
        sync.set_wstore(Box::new(FsStore::open(store)))?;
    }
    for seed in &seeds {
        sync.add_rstore(Box::new(FsStore::open(seed)))?;
    }

    drive_to_finish(&mut sync)?;
    let digest = sync.get_digest()?;
    println!("{digest}");
    Ok(())
}

fn drive_to_finish(sync: &mut Synchronizer) -> Result<(), SyncError> {
    loop {
        if let StepOutcome::Finished = sync.step()? {
            return Ok(());
        }
    }
}
