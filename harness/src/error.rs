// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use std::{error::Error, io};

use camino::Utf8PathBuf;
use snafu::Snafu;

use crate::{
    clock::SimTime,
    pins::{DacCode, Port},
};

/// Everything that can go wrong while driving the DAC under test.
///
/// Only [`HarnessError::Mismatch`] says something about the DUT itself; the
/// remaining variants report a misconfigured harness or a broken connection
/// to the simulator.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum HarnessError {
    #[snafu(display(
        "Failed for input {code}: expected {expected} high cycles, but got {actual}"
    ))]
    Mismatch {
        code: DacCode,
        expected: u32,
        actual: u32,
    },

    #[snafu(display(
        "DAC code {value} does not fit in {} bits (maximum is {})",
        DacCode::BITS,
        DacCode::MAX
    ))]
    CodeOutOfRange { value: u64 },

    #[snafu(display("Failed to {operation} port {port} on the DUT"))]
    Dut {
        port: Port,
        operation: &'static str,
        source: Box<dyn Error + Send + Sync>,
    },

    #[snafu(display("Failed to evaluate the DUT"))]
    Eval { source: Box<dyn Error + Send + Sync> },

    #[snafu(display(
        "Clock period of {period_ps} ps must be positive and a whole number of half periods"
    ))]
    InvalidClockPeriod { period_ps: u64 },

    #[snafu(display("Simulation time overflowed after {now}"))]
    TimeOverflow { now: SimTime },

    #[snafu(display("The clock must be started before waiting on its edges"))]
    ClockNotStarted,

    #[snafu(display("Invalid harness configuration: {message}"))]
    Config { message: String },

    #[snafu(display("Failed to read harness configuration {path}"))]
    ReadConfig { path: Utf8PathBuf, source: io::Error },

    #[snafu(display("Failed to parse harness configuration"))]
    ParseConfig { source: toml::de::Error },
}

impl HarnessError {
    /// Whether this error is a duty-cycle mismatch reported by the DUT, as
    /// opposed to a harness or simulator failure.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch { .. })
    }
}
