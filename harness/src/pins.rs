// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! The pin-level interface of the DAC under test.

use std::{error::Error, fmt};

use dacbench_verilator::{PortDirection, PortSpec};

use snafu::OptionExt;

use crate::error::{CodeOutOfRangeSnafu, HarnessError};

/// A port on the DUT. The names and widths are fixed by the DAC's top module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    /// Clock input.
    Clk,
    /// Active-low reset input.
    RstN,
    /// DAC code bits `[11:4]`.
    UiIn,
    /// DAC code bits `[3:0]` in the low nibble; the high nibble is unused.
    UioIn,
    /// Bit 0 carries the PWM signal.
    UoOut,
}

impl Port {
    /// Every port, in the order the top module declares them.
    pub const ALL: [Port; 5] =
        [Port::Clk, Port::RstN, Port::UiIn, Port::UioIn, Port::UoOut];

    /// The Verilog name of the port.
    pub fn name(self) -> &'static str {
        match self {
            Port::Clk => "clk",
            Port::RstN => "rst_n",
            Port::UiIn => "ui_in",
            Port::UioIn => "uio_in",
            Port::UoOut => "uo_out",
        }
    }

    /// The port's declaration in the top module.
    pub fn spec(self) -> PortSpec {
        match self {
            Port::Clk | Port::RstN => PortSpec::input(self.name(), 1),
            Port::UiIn | Port::UioIn => PortSpec::input(self.name(), 8),
            Port::UoOut => PortSpec::output(self.name(), 8),
        }
    }

    pub fn width(self) -> u8 {
        self.spec().width
    }

    pub fn direction(self) -> PortDirection {
        self.spec().direction
    }

    /// The whole interface, as the Verilator runtime takes it.
    pub fn signature() -> [PortSpec; 5] {
        Port::ALL.map(Port::spec)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

/// A handle to the DAC under test.
///
/// The harness owns exactly one of these for the duration of a campaign and
/// passes it explicitly to every procedure. Input ports are driven with
/// [`Dut::pin`], outputs are sampled with [`Dut::read`], and [`Dut::eval`]
/// propagates pin changes through the design. Clocked state advances when
/// `clk` goes from 0 to 1 and the design is evaluated.
pub trait Dut {
    type Error: Error + Send + Sync + 'static;

    /// Drives the input `port` to `value`. The harness only drives values
    /// that fit the port's width.
    fn pin(&mut self, port: Port, value: u8) -> Result<(), Self::Error>;

    /// Samples the output `port`.
    fn read(&self, port: Port) -> Result<u8, Self::Error>;

    fn eval(&mut self) -> Result<(), Self::Error>;
}

impl<D: Dut + ?Sized> Dut for &mut D {
    type Error = D::Error;

    fn pin(&mut self, port: Port, value: u8) -> Result<(), Self::Error> {
        (**self).pin(port, value)
    }

    fn read(&self, port: Port) -> Result<u8, Self::Error> {
        (**self).read(port)
    }

    fn eval(&mut self) -> Result<(), Self::Error> {
        (**self).eval()
    }
}

pub(crate) fn drive<D: Dut>(
    dut: &mut D,
    port: Port,
    value: u8,
) -> Result<(), HarnessError> {
    dut.pin(port, value).map_err(|source| HarnessError::Dut {
        port,
        operation: "drive",
        source: Box::new(source),
    })
}

pub(crate) fn sample<D: Dut>(dut: &D, port: Port) -> Result<u8, HarnessError> {
    dut.read(port).map_err(|source| HarnessError::Dut {
        port,
        operation: "sample",
        source: Box::new(source),
    })
}

pub(crate) fn settle<D: Dut>(dut: &mut D) -> Result<(), HarnessError> {
    dut.eval().map_err(|source| HarnessError::Eval {
        source: Box::new(source),
    })
}

/// The PWM signal carried on bit 0 of `uo_out`.
pub fn pwm_output(uo_out: u8) -> bool {
    uo_out & 1 == 1
}

/// A 12-bit DAC input code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DacCode(u16);

impl DacCode {
    pub const BITS: u32 = 12;

    /// The length of one PWM period in clock cycles.
    pub const PWM_PERIOD_CYCLES: u32 = 1 << Self::BITS;

    pub const MIN: DacCode = DacCode(0);
    pub const MAX: DacCode = DacCode((1 << Self::BITS) - 1);

    pub fn new(value: u16) -> Result<Self, HarnessError> {
        Self::try_from(u64::from(value))
    }

    /// `value` as a code, or `None` if it needs more than 12 bits. Usable in
    /// constants.
    pub const fn checked(value: u16) -> Option<Self> {
        if value <= Self::MAX.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Reassembles a code from its `ui_in` and `uio_in` segments. Only the
    /// low nibble of `low` is used.
    pub fn from_segments(high: u8, low: u8) -> Self {
        Self((u16::from(high) << 4) | u16::from(low & 0x0f))
    }

    pub fn value(self) -> u16 {
        self.0
    }

    /// Bits `[11:4]`, driven on `ui_in`.
    pub fn high(self) -> u8 {
        (self.0 >> 4) as u8
    }

    /// Bits `[3:0]`, driven on the low nibble of `uio_in`.
    pub fn low(self) -> u8 {
        (self.0 & 0x0f) as u8
    }
}

impl TryFrom<u64> for DacCode {
    type Error = HarnessError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .ok()
            .and_then(Self::checked)
            .context(CodeOutOfRangeSnafu { value })
    }
}

impl From<DacCode> for u32 {
    fn from(code: DacCode) -> Self {
        code.0.into()
    }
}

impl fmt::Display for DacCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
