use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use warden_stack::config::{DEFAULT_DUMP_BYTES, MAX_CAPACITY};

#[derive(Parser, Debug)]
#[command(
    name = "warden",
    about = "Time a push/pop cycle on a protected stack and dump its final state",
    version
)]
pub struct Cli {
    /// Number of elements pushed and then popped
    #[arg(short, long, default_value_t = 50_000)]
    pub elements: usize,

    /// Starting capacity and shrink floor
    #[arg(short, long, default_value_t = 3)]
    pub base_capacity: usize,

    /// Protection preset
    #[arg(short, long, value_enum, default_value_t = Profile::Debug)]
    pub profile: Profile,

    /// Fixed hash salt, for reproducible dumps
    #[arg(long, env = "WARDEN_SEED")]
    pub seed: Option<u64>,

    /// File the diagnostic dump is written to (truncated on start)
    #[arg(short, long, default_value = "err_log.txt")]
    pub dump_file: PathBuf,

    /// Capacity ceiling, in elements
    #[arg(long, default_value_t = MAX_CAPACITY)]
    pub max_capacity: usize,

    /// Payload bytes shown in the dump
    #[arg(long, default_value_t = DEFAULT_DUMP_BYTES)]
    pub dump_bytes: usize,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    /// Checksums and canaries on, errors are fatal
    Debug,
    /// Field checks only, errors are returned
    Production,
}
