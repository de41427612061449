// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Verification harness for a 12-bit PWM DAC.
//!
//! The DAC is a black box reachable only through its pins (see [`Port`]): a
//! 12-bit code is split across `ui_in` (bits `[11:4]`) and `uio_in` (bits
//! `[3:0]`), and bit 0 of `uo_out` must be high for exactly `code` out of
//! every 4096 clock cycles.
//!
//! ```ignore
//! use dacbench_harness::prelude::*;
//!
//! let mut dut = PwmDacModel::new();
//! let report = run_campaign(&mut dut)?;
//! assert_eq!(report.measurements.len(), 6);
//! ```
//!
//! Any type implementing [`Dut`] can be checked. [`PwmDacModel`] is a software
//! model; [`VerilatedDut`] drives a Verilog implementation through the
//! Verilator runtime.

pub mod campaign;
pub mod clock;
pub mod error;
pub mod measure;
pub mod model;
pub mod options;
pub mod pins;
pub mod reset;
pub mod verilated;

pub use campaign::{Campaign, CampaignReport, run_campaign};
pub use clock::{Clock, SimTime};
pub use error::HarnessError;
pub use measure::{Measurement, check, measure};
pub use model::{ModelError, PwmDacModel};
pub use options::{DEFAULT_VECTORS, HarnessOptions};
pub use pins::{DacCode, Dut, Port, pwm_output};
pub use reset::reset;
pub use verilated::VerilatedDut;

pub mod prelude {
    pub use crate::{
        Campaign, CampaignReport, Clock, DacCode, Dut, HarnessError,
        HarnessOptions, Measurement, Port, PwmDacModel, SimTime,
        VerilatedDut, run_campaign,
    };
}
