// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Command-line surface, parsed with `clap`'s derive API.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use synca_domain::BaseMode;

/// Mirrors [`synca_domain::BaseMode`] for clap's derive, since the domain
/// enum does not (and should not) depend on clap.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BaseModeArg {
    Dir,
    Reg,
    Blk,
}

impl From<BaseModeArg> for BaseMode {
    fn from(value: BaseModeArg) -> Self {
        match value {
            BaseModeArg::Dir => BaseMode::Dir,
            BaseModeArg::Reg => BaseMode::Reg,
            BaseModeArg::Blk => BaseMode::Blk,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "synca", version, about = "Content-addressed archive synchronizer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug-level logging.
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Walk a directory tree (or a single file) and emit an archive, a
    /// chunk index, and content-addressed objects in a store.
    Encode {
        /// File or directory to encode.
        #[arg(long)]
        base: PathBuf,

        /// Archive output path. At least one of `--archive` or `--index`
        /// must be given.
        #[arg(long)]
        archive: Option<PathBuf>,

        /// Chunk index output path.
        #[arg(long)]
        index: Option<PathBuf>,

        /// Writable content-addressed object store.
        #[arg(long)]
        store: Option<PathBuf>,

        /// Minimum chunk size in bytes.
        #[arg(long, default_value_t = 256 * 1024)]
        min_size: usize,

        /// Average (target) chunk size in bytes; must be a power of two.
        #[arg(long, default_value_t = 1024 * 1024)]
        avg_size: usize,

        /// Maximum chunk size in bytes.
        #[arg(long, default_value_t = 4 * 1024 * 1024)]
        max_size: usize,
    },

    /// Reconstruct a file or directory tree from a chunk index and one or
    /// more content-addressed stores, or directly from an archive.
    Decode {
        /// Destination path for the reconstructed tree or file.
        #[arg(long)]
        base: PathBuf,

        /// Archive input path, used when no index/store pair is given.
        #[arg(long)]
        archive: Option<PathBuf>,

        /// Chunk index to read object ids and sizes from.
        #[arg(long)]
        index: Option<PathBuf>,

        /// Writable content-addressed object store, consulted first.
        #[arg(long)]
        store: Option<PathBuf>,

        /// Read-only seed stores, consulted in order after `--store` misses.
        #[arg(long = "seed")]
        seeds: Vec<PathBuf>,

        /// What kind of filesystem object `--base` should become.
        #[arg(long, value_enum, default_value = "dir")]
        base_mode: BaseModeArg,

        /// Minimum chunk size in bytes; must match the value used to encode.
        #[arg(long, default_value_t = 256 * 1024)]
        min_size: usize,

        /// Average (target) chunk size in bytes; must match the encoder.
        #[arg(long, default_value_t = 1024 * 1024)]
        avg_size: usize,

        /// Maximum chunk size in bytes; must match the encoder.
        #[arg(long, default_value_t = 4 * 1024 * 1024)]
        max_size: usize,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
