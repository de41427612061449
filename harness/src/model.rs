// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! A cycle-based software stand-in for the DAC.
//!
//! [`PwmDacModel`] behaves like the simplest conforming design, a free-running
//! 12-bit counter compared against the input code, so the harness can be
//! exercised without a hardware simulator. It does not describe how the real
//! design must be built.

use dacbench_verilator::PortDirection;
use snafu::Snafu;

use crate::pins::{DacCode, Dut, Port};

/// Using a port against its direction.
#[derive(Debug, Snafu)]
#[snafu(display(
    "Port {port} on the DAC model is an {direction} port, but was used as an {attempted_direction} port"
))]
pub struct ModelError {
    port: Port,
    direction: PortDirection,
    attempted_direction: PortDirection,
}

/// See the [module documentation](self).
#[derive(Debug, Clone, Default)]
pub struct PwmDacModel {
    clk: bool,
    last_clk: bool,
    rst_n: bool,
    ui_in: u8,
    uio_in: u8,
    counter: u16,
}

impl PwmDacModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current position within the PWM period.
    pub fn counter(&self) -> u16 {
        self.counter
    }

    /// The code currently presented on the input buses.
    pub fn code(&self) -> DacCode {
        DacCode::from_segments(self.ui_in, self.uio_in)
    }

    fn check_direction(
        port: Port,
        attempted_direction: PortDirection,
    ) -> Result<(), ModelError> {
        let direction = port.direction();
        if direction != attempted_direction {
            return ModelSnafu {
                port,
                direction,
                attempted_direction,
            }
            .fail();
        }
        Ok(())
    }
}

impl Dut for PwmDacModel {
    type Error = ModelError;

    fn pin(&mut self, port: Port, value: u8) -> Result<(), ModelError> {
        match port {
            Port::Clk => self.clk = value & 1 == 1,
            Port::RstN => self.rst_n = value & 1 == 1,
            Port::UiIn => self.ui_in = value,
            Port::UioIn => self.uio_in = value,
            Port::UoOut => {
                return Self::check_direction(port, PortDirection::Input);
            }
        }
        Ok(())
    }

    fn read(&self, port: Port) -> Result<u8, ModelError> {
        Self::check_direction(port, PortDirection::Output)?;
        Ok(u8::from(self.counter < self.code().value()))
    }

    fn eval(&mut self) -> Result<(), ModelError> {
        if self.clk && !self.last_clk {
            self.counter = if self.rst_n {
                (self.counter + 1) & DacCode::MAX.value()
            } else {
                0
            };
        }
        self.last_clk = self.clk;
        Ok(())
    }
}
