// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use std::{env, time::Duration};

use argh::FromArgs;
use camino::Utf8PathBuf;
use dacbench_harness::{
    Campaign, DacCode, HarnessError, HarnessOptions, VerilatedDut,
};
use dacbench_verilator::{VerilatorRuntime, VerilatorRuntimeOptions};
use indicatif::ProgressBar;
use owo_colors::OwoColorize;
use snafu::{OptionExt, ResultExt, Whatever, whatever};

const DEFAULT_ARTIFACT_DIRECTORY: &str = "artifacts";

/// Check a Verilog PWM DAC against the 12-bit duty-cycle contract
#[derive(FromArgs)]
struct DacbenchCommand {
    /// the Verilog file defining the DAC top module
    #[argh(positional)]
    source: Utf8PathBuf,

    /// name of the top module (defaults to the file stem of the source)
    #[argh(option)]
    top: Option<String>,

    /// TOML file with a [harness] table overriding the default options
    #[argh(option, short = 'c')]
    config: Option<Utf8PathBuf>,

    /// directory for Verilator build artifacts
    #[argh(option, default = "DEFAULT_ARTIFACT_DIRECTORY.into()")]
    artifacts: Utf8PathBuf,

    /// DAC code to test; repeat to test several (replaces the configured
    /// vectors)
    #[argh(option)]
    vector: Vec<u16>,

    /// verilator optimization level (0 to 3)
    #[argh(option, short = 'O')]
    optimization: Option<usize>,

    /// rebuild the Verilator library even if it is up to date
    #[argh(switch)]
    rebuild: bool,

    /// log harness and Verilator progress
    #[argh(switch, short = 'v')]
    verbose: bool,
}

fn harness_options(
    command: &DacbenchCommand,
) -> Result<HarnessOptions, Whatever> {
    let mut options = match &command.config {
        Some(path) => HarnessOptions::from_file(path).whatever_context(
            format!("Failed to load harness options from {}", path),
        )?,
        None => HarnessOptions::default(),
    };

    if !command.vector.is_empty() {
        options.vectors = command
            .vector
            .iter()
            .copied()
            .map(DacCode::new)
            .collect::<Result<_, _>>()
            .whatever_context("Invalid --vector")?;
    }
    options.log = options.log || command.verbose;

    Ok(options)
}

/// Runs `task` behind `spinner`, which is stopped whether or not the task
/// succeeds.
fn spin<T>(
    spinner: &ProgressBar,
    loaded_message: String,
    task: impl FnOnce() -> Result<T, Whatever>,
) -> Result<T, Whatever> {
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = task();
    match &result {
        Ok(_) => spinner.finish_with_message(loaded_message),
        Err(_) => spinner.abandon(),
    }
    result
}

#[snafu::report]
fn main() -> Result<(), Whatever> {
    let command: DacbenchCommand = argh::from_env();

    if command.verbose || env::var("RUST_LOG").is_ok() {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("info"),
        )
        .init();
    }

    let options = harness_options(&command)?;

    let top = match &command.top {
        Some(top) => top.clone(),
        None => command
            .source
            .file_stem()
            .whatever_context(format!(
                "Cannot infer a top module name from {}; pass --top",
                command.source
            ))?
            .to_string(),
    };

    let runtime_options = VerilatorRuntimeOptions {
        verilator_optimization: command.optimization,
        force_verilator_rebuild: command.rebuild,
        log: command.verbose,
        ..Default::default()
    };
    let mut runtime = VerilatorRuntime::new(
        &command.artifacts,
        &[command.source.as_path()],
        &[],
        runtime_options,
    )?;

    let spinner = ProgressBar::new_spinner()
        .with_message(format!("Building {} from {}", top, command.source));
    let mut dut = {
        let runtime = &mut runtime;
        let (top, source) = (top.as_str(), command.source.as_path());
        spin(&spinner, format!("Built {}", top), move || {
            VerilatedDut::new(runtime, top, source)
        })?
    };

    let vector_count = options.vectors.len();
    println!(
        "{} {} vector{} on a {} ns clock [{}]",
        "     STARTING".bold().bright_cyan(),
        vector_count,
        if vector_count == 1 { "" } else { "s" },
        options.clock_period_ns,
        top,
    );

    let result = Campaign::new(options).run_with(&mut dut, |measurement| {
        println!(
            "         {} [input {}: {}/{} high cycles]",
            "PASS".bold().bright_green(),
            measurement.code,
            measurement.high_cycles,
            measurement.period_cycles,
        );
    });

    match result {
        Ok(report) => {
            println!(
                "{} with 0 failures in {} of simulated time",
                "     FINISHED".bold().bright_cyan(),
                report.elapsed,
            );
            Ok(())
        }
        Err(error @ HarnessError::Mismatch { .. }) => {
            println!("        {} [{}]", "FAIL".bold().bright_red(), error);
            println!(
                "{} with 1 failure",
                "     FINISHED".bold().bright_cyan(),
            );
            whatever!("Exiting due to failure(s)");
        }
        Err(error) => Err(error)
            .whatever_context(format!("Failed to drive {} in simulation", top)),
    }
}
