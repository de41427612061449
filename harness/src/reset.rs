// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use crate::{
    clock::Clock,
    error::HarnessError,
    options::HarnessOptions,
    pins::{self, Dut, Port},
};

/// Puts the DUT into a known state: `rst_n` is held low with both code
/// segments zeroed for [`HarnessOptions::reset_hold_cycles`], then released
/// for [`HarnessOptions::reset_release_cycles`].
///
/// A DUT that fails to come out of reset is not detected here; it surfaces as
/// a mismatch on the first measurement.
pub fn reset<D: Dut>(
    dut: &mut D,
    clock: &mut Clock,
    options: &HarnessOptions,
) -> Result<(), HarnessError> {
    if options.log {
        log::info!("Resetting DUT");
    }
    pins::drive(dut, Port::RstN, 0)?;
    pins::drive(dut, Port::UiIn, 0)?;
    pins::drive(dut, Port::UioIn, 0)?;
    pins::settle(dut)?;
    clock.cycles(dut, options.reset_hold_cycles)?;

    pins::drive(dut, Port::RstN, 1)?;
    pins::settle(dut)?;
    clock.cycles(dut, options.reset_release_cycles)?;
    if options.log {
        log::info!("Reset complete at {}", clock.now());
    }
    Ok(())
}
