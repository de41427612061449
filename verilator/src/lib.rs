// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Compiles a Verilog top module with Verilator and drives it from Rust.
//!
//! Only narrow interfaces are supported: every port is an input or an output
//! of at most 8 bits, so a value always travels as a single byte (Verilator's
//! `CData`). Ports are described at runtime with [`PortSpec`], and
//! [`VerilatorRuntime::instantiate`] returns a [`VerilatedModel`] whose
//! accessors are resolved once, when the model is created.

use std::fmt;

mod compile;
mod lock;
mod model;
mod options;
mod progress;
mod runtime;

pub use model::{PortAccessError, VerilatedModel};
pub use options::VerilatorRuntimeOptions;
pub use runtime::VerilatorRuntime;

/// The widest port a [`PortSpec`] can describe.
pub const MAX_PORT_WIDTH: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => "input",
            PortDirection::Output => "output",
        }
        .fmt(f)
    }
}

/// One port of a top module: its Verilog name, its width in bits (counted
/// from bit 0) and its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortSpec {
    pub name: &'static str,
    pub width: u8,
    pub direction: PortDirection,
}

impl PortSpec {
    pub const fn input(name: &'static str, width: u8) -> Self {
        Self {
            name,
            width,
            direction: PortDirection::Input,
        }
    }

    pub const fn output(name: &'static str, width: u8) -> Self {
        Self {
            name,
            width,
            direction: PortDirection::Output,
        }
    }

    /// The bits of a byte this port carries. Only meaningful for widths
    /// from 1 to [`MAX_PORT_WIDTH`].
    pub fn mask(&self) -> u8 {
        u8::MAX >> (MAX_PORT_WIDTH - self.width.clamp(1, MAX_PORT_WIDTH))
    }

    /// The most significant bit, as written in the Verilog declaration.
    pub fn msb(&self) -> u8 {
        self.width.saturating_sub(1)
    }
}

/// Whether `name` can be spliced into C++ identifiers and Verilator flags
/// as-is.
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
