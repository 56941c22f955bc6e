//! `warden`: times a fill/drain cycle on a protected stack.
//!
//! Pushes `--elements` values, pops them back checking LIFO order, prints
//! the elapsed time, asserts the stack is still valid and writes its dump to
//! `--dump-file`.

use std::fs::File;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use warden_integrity::{Integrity, Salt};
use warden_stack::{DiagnosticSink, GrowthPolicy, Stack, StackConfig};

mod cli;
use cli::{Cli, Profile};

/// First value pushed; values count up from here.
const FIRST_VALUE: i32 = -5;

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    // Each run starts a fresh log, like redirecting stderr to it.
    File::create(&cli.dump_file)
        .with_context(|| format!("cannot create dump file {}", cli.dump_file.display()))?;

    let config = build_config(&cli)?;
    debug!(?cli, "configuration resolved");

    let mut stack = Stack::<i32>::with_config(config);

    let started = Instant::now();
    fill_and_drain(&mut stack, cli.elements)?;
    let elapsed = started.elapsed();
    println!("TIME = {elapsed:?}");

    info!(
        expansions = stack.stats().expansions,
        shrinks = stack.stats().shrinks,
        peak_capacity = stack.stats().peak_capacity,
        "run finished"
    );

    stack.assert_valid();
    stack
        .dump()
        .with_context(|| format!("cannot write dump to {}", cli.dump_file.display()))?;
    stack.destroy();

    Ok(())
}

/// Filter from `WARDEN_LOG`, then `RUST_LOG`, else warnings only.
fn init_logging() {
    let filter = std::env::var("WARDEN_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_config(cli: &Cli) -> Result<StackConfig> {
    let preset = match cli.profile {
        Profile::Debug => StackConfig::debug(),
        Profile::Production => StackConfig::production(),
    };
    let integrity = cli
        .seed
        .map_or_else(Integrity::thread_default, |seed| Integrity::new(Salt::fixed(seed)));
    let growth = GrowthPolicy::default()
        .with_max_capacity(cli.max_capacity)
        .context("invalid --max-capacity")?;

    let config = preset
        .with_base_capacity(cli.base_capacity)
        .with_growth(growth)
        .with_integrity(integrity)
        .with_max_dump_bytes(cli.dump_bytes)
        .with_dump_sink(DiagnosticSink::File(cli.dump_file.clone()));
    config.validate().context("invalid stack configuration")?;
    Ok(config)
}

fn fill_and_drain(stack: &mut Stack<i32>, elements: usize) -> Result<()> {
    let mut value = FIRST_VALUE;
    for index in 0..elements {
        stack
            .push(value)
            .with_context(|| format!("push #{index} failed"))?;
        value = value.wrapping_add(1);
    }

    for index in 0..elements {
        let expected = value.wrapping_sub(1);
        let popped = stack
            .pop()
            .with_context(|| format!("pop #{index} failed"))?;
        if popped != expected {
            bail!("pop #{index} returned {popped}, expected {expected}");
        }
        value = expected;
    }

    Ok(())
}
