// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Driving a Verilog implementation of the DAC through Verilator.

use camino::Utf8Path;
use dacbench_verilator::{PortAccessError, VerilatedModel, VerilatorRuntime};
use snafu::{ResultExt, Whatever};

use crate::pins::{Dut, Port};

/// A verilated top module exposing the DAC pin interface.
pub struct VerilatedDut<'ctx> {
    model: VerilatedModel<'ctx>,
}

impl<'ctx> VerilatedDut<'ctx> {
    /// Builds (or reuses) the Verilator library for module `top` defined in
    /// `source_path` and instantiates it. `source_path` must be one of the
    /// runtime's source files.
    pub fn new(
        runtime: &'ctx mut VerilatorRuntime,
        top: &str,
        source_path: &Utf8Path,
    ) -> Result<Self, Whatever> {
        let model = runtime
            .instantiate(top, source_path, &Port::signature())
            .whatever_context(format!(
                "Failed to instantiate DAC module `{}` from {}",
                top, source_path
            ))?;
        Ok(Self { model })
    }

    pub fn model(&self) -> &VerilatedModel<'ctx> {
        &self.model
    }
}

impl Dut for VerilatedDut<'_> {
    type Error = PortAccessError;

    fn pin(&mut self, port: Port, value: u8) -> Result<(), Self::Error> {
        self.model.pin(port.name(), value)
    }

    fn read(&self, port: Port) -> Result<u8, Self::Error> {
        self.model.read(port.name())
    }

    fn eval(&mut self) -> Result<(), Self::Error> {
        self.model.eval();
        Ok(())
    }
}
