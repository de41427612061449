// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! The top-level test: one reset followed by every configured vector, in
//! order, stopping at the first failure.

use crate::{
    clock::{Clock, SimTime},
    error::HarnessError,
    measure::{self, Measurement},
    options::HarnessOptions,
    pins::{DacCode, Dut},
    reset::reset,
};

/// Every vector of a successful campaign.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignReport {
    pub measurements: Vec<Measurement>,
    /// Simulation time from clock start to the last sample.
    pub elapsed: SimTime,
    /// Rising edges driven in total, reset included.
    pub edges: u64,
}

/// A sequence of DAC codes checked against one DUT.
#[derive(Debug, Clone, Default)]
pub struct Campaign {
    options: HarnessOptions,
}

impl Campaign {
    pub fn new(options: HarnessOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &HarnessOptions {
        &self.options
    }

    pub fn vectors(&self) -> &[DacCode] {
        &self.options.vectors
    }

    /// Starts the clock, resets `dut` once and checks every vector in order.
    /// The first [`HarnessError::Mismatch`] (or any other error) aborts the
    /// remaining vectors.
    pub fn run<D: Dut>(
        &self,
        dut: &mut D,
    ) -> Result<CampaignReport, HarnessError> {
        self.run_with(dut, |_| {})
    }

    /// Like [`Campaign::run`], but calls `on_pass` after each vector that
    /// passes, before the next one is applied.
    pub fn run_with<D: Dut, F: FnMut(&Measurement)>(
        &self,
        dut: &mut D,
        mut on_pass: F,
    ) -> Result<CampaignReport, HarnessError> {
        let options = &self.options;
        options.validate()?;

        let mut clock = Clock::new(options.clock_period())?;
        if options.log {
            log::info!("Starting clock with a {} period", clock.period());
        }
        clock.start(dut)?;

        reset(dut, &mut clock, options)?;

        let mut measurements = Vec::with_capacity(options.vectors.len());
        for &code in &options.vectors {
            let measurement = measure::check(dut, &mut clock, code, options)?;
            on_pass(&measurement);
            measurements.push(measurement);
        }

        if options.log {
            log::info!("All DAC tests passed successfully!");
        }
        Ok(CampaignReport {
            measurements,
            elapsed: clock.now(),
            edges: clock.edges(),
        })
    }
}

/// Runs the default campaign, `{0, 100, 1024, 2048, 3500, 4095}` on a 10 ns
/// clock, against `dut`.
pub fn run_campaign<D: Dut>(
    dut: &mut D,
) -> Result<CampaignReport, HarnessError> {
    Campaign::default().run(dut)
}
