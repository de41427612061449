// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! A free-running clock that doubles as the harness's notion of simulation
//! time.
//!
//! Waiting on the clock is synchronous: [`Clock::rising_edge`] toggles `clk`
//! on the DUT, evaluates it and advances [`SimTime`] before returning, so the
//! harness never needs a scheduler of its own.

use std::{fmt, ops::Add};

use snafu::OptionExt;

use crate::{
    error::{HarnessError, TimeOverflowSnafu},
    pins::{self, Dut, Port},
};

/// Picoseconds per nanosecond.
pub const PS_PER_NS: u64 = 1_000;
/// Picoseconds per microsecond.
pub const PS_PER_US: u64 = 1_000_000;
/// Picoseconds per millisecond.
pub const PS_PER_MS: u64 = 1_000_000_000;

/// A point in (or span of) simulation time, in picoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime {
    ps: u64,
}

impl SimTime {
    pub const ZERO: SimTime = SimTime { ps: 0 };

    pub fn from_ps(ps: u64) -> Self {
        Self { ps }
    }

    /// Saturates at the largest representable time.
    pub fn from_ns(ns: u64) -> Self {
        Self {
            ps: ns.saturating_mul(PS_PER_NS),
        }
    }

    pub fn checked_add(self, rhs: SimTime) -> Option<SimTime> {
        self.ps.checked_add(rhs.ps).map(SimTime::from_ps)
    }

    pub fn as_ps(self) -> u64 {
        self.ps
    }

    /// Truncates to whole nanoseconds.
    pub fn as_ns(self) -> u64 {
        self.ps / PS_PER_NS
    }
}

impl Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> SimTime {
        SimTime {
            ps: self.ps + rhs.ps,
        }
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ps = self.ps;
        if ps == 0 {
            write!(f, "0 ps")
        } else if ps % PS_PER_MS == 0 {
            write!(f, "{} ms", ps / PS_PER_MS)
        } else if ps % PS_PER_US == 0 {
            write!(f, "{} us", ps / PS_PER_US)
        } else if ps % PS_PER_NS == 0 {
            write!(f, "{} ns", ps / PS_PER_NS)
        } else {
            write!(f, "{ps} ps")
        }
    }
}

/// Drives `clk` on a [`Dut`] with a fixed period.
#[derive(Debug, Clone)]
pub struct Clock {
    half_period: SimTime,
    now: SimTime,
    level: bool,
    started: bool,
    edges: u64,
}

impl Clock {
    /// A clock with the given `period`, which must split evenly into two
    /// nonzero half periods.
    pub fn new(period: SimTime) -> Result<Self, HarnessError> {
        let period_ps = period.as_ps();
        if period_ps == 0 || period_ps % 2 != 0 {
            return Err(HarnessError::InvalidClockPeriod { period_ps });
        }
        Ok(Self {
            half_period: SimTime::from_ps(period_ps / 2),
            now: SimTime::ZERO,
            level: false,
            started: false,
            edges: 0,
        })
    }

    pub fn period(&self) -> SimTime {
        self.half_period + self.half_period
    }

    /// Rounded down, so periods longer than a second report 0 Hz.
    pub fn frequency_hz(&self) -> u64 {
        1_000_000_000_000 / self.period().as_ps()
    }

    /// Simulation time elapsed since [`Clock::start`].
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// The number of rising edges driven so far.
    pub fn edges(&self) -> u64 {
        self.edges
    }

    /// Drives `clk` low at time zero.
    pub fn start<D: Dut>(&mut self, dut: &mut D) -> Result<(), HarnessError> {
        pins::drive(dut, Port::Clk, 0)?;
        pins::settle(dut)?;
        self.level = false;
        self.started = true;
        Ok(())
    }

    /// Advances through the next rising edge of `clk`. When this returns, the
    /// DUT has been evaluated with `clk` high.
    pub fn rising_edge<D: Dut>(
        &mut self,
        dut: &mut D,
    ) -> Result<(), HarnessError> {
        if !self.started {
            return Err(HarnessError::ClockNotStarted);
        }
        if self.level {
            self.advance()?;
            pins::drive(dut, Port::Clk, 0)?;
            pins::settle(dut)?;
        }
        self.advance()?;
        pins::drive(dut, Port::Clk, 1)?;
        pins::settle(dut)?;
        self.level = true;
        self.edges += 1;
        Ok(())
    }

    fn advance(&mut self) -> Result<(), HarnessError> {
        self.now = self
            .now
            .checked_add(self.half_period)
            .context(TimeOverflowSnafu { now: self.now })?;
        Ok(())
    }

    /// Waits for `count` rising edges.
    pub fn cycles<D: Dut>(
        &mut self,
        dut: &mut D,
        count: u32,
    ) -> Result<(), HarnessError> {
        for _ in 0..count {
            self.rising_edge(dut)?;
        }
        Ok(())
    }
}
