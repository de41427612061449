// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Driving a code onto the DUT and counting the high cycles of its PWM
//! output.

use crate::{
    clock::Clock,
    error::HarnessError,
    options::HarnessOptions,
    pins::{self, DacCode, Dut, Port, pwm_output},
};

/// The outcome of sampling one PWM period for one code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub code: DacCode,
    /// Rising edges at which `uo_out[0]` was high.
    pub high_cycles: u32,
    /// Rising edges sampled in total.
    pub period_cycles: u32,
}

impl Measurement {
    /// The number of high cycles a correct DUT produces for this code.
    pub fn expected(&self) -> u32 {
        self.code.into()
    }

    pub fn passed(&self) -> bool {
        self.high_cycles == self.expected()
    }

    /// The observed fraction of the period spent high. For reporting only;
    /// pass/fail is decided by exact cycle counts.
    pub fn duty_cycle(&self) -> f64 {
        if self.period_cycles == 0 {
            return 0.0;
        }
        f64::from(self.high_cycles) / f64::from(self.period_cycles)
    }
}

/// Drives `code` onto `ui_in` (bits `[11:4]`) and `uio_in` (bits `[3:0]`,
/// with the unused upper nibble held at zero).
pub fn apply<D: Dut>(dut: &mut D, code: DacCode) -> Result<(), HarnessError> {
    pins::drive(dut, Port::UiIn, code.high())?;
    pins::drive(dut, Port::UioIn, code.low())?;
    pins::settle(dut)
}

/// Counts the rising edges, out of the next `cycles`, at which the PWM output
/// is high.
pub fn sample_period<D: Dut>(
    dut: &mut D,
    clock: &mut Clock,
    cycles: u32,
) -> Result<u32, HarnessError> {
    let mut high_cycles = 0;
    for _ in 0..cycles {
        clock.rising_edge(dut)?;
        if pwm_output(pins::sample(dut, Port::UoOut)?) {
            high_cycles += 1;
        }
    }
    Ok(high_cycles)
}

/// Applies `code`, waits [`HarnessOptions::settle_cycles`] and samples one
/// PWM period, without judging the result.
pub fn measure<D: Dut>(
    dut: &mut D,
    clock: &mut Clock,
    code: DacCode,
    options: &HarnessOptions,
) -> Result<Measurement, HarnessError> {
    if options.log {
        log::info!("Testing DAC value: {}", code);
    }
    apply(dut, code)?;
    clock.cycles(dut, options.settle_cycles)?;
    let high_cycles = sample_period(dut, clock, options.pwm_period_cycles)?;
    if options.log {
        log::info!("Input: {}, Measured high cycles: {}", code, high_cycles);
    }
    Ok(Measurement {
        code,
        high_cycles,
        period_cycles: options.pwm_period_cycles,
    })
}

/// [`measure`]s `code` and fails with [`HarnessError::Mismatch`] unless the
/// high-cycle count equals the code exactly.
pub fn check<D: Dut>(
    dut: &mut D,
    clock: &mut Clock,
    code: DacCode,
    options: &HarnessOptions,
) -> Result<Measurement, HarnessError> {
    let measurement = measure(dut, clock, code, options)?;
    if !measurement.passed() {
        return Err(HarnessError::Mismatch {
            code,
            expected: measurement.expected(),
            actual: measurement.high_cycles,
        });
    }
    Ok(measurement)
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::{Measurement, apply, sample_period};
    use crate::{
        clock::{Clock, SimTime},
        pins::{DacCode, Dut, Port},
    };

    /// Outputs a fixed pattern, one bit per rising edge.
    struct Pattern {
        bits: Vec<bool>,
        position: usize,
        clk: u8,
        ui_in: u8,
        uio_in: u8,
    }

    impl Pattern {
        fn new(bits: Vec<bool>) -> Self {
            Self {
                bits,
                position: 0,
                clk: 0,
                ui_in: 0,
                uio_in: 0,
            }
        }
    }

    impl Dut for Pattern {
        type Error = Infallible;

        fn pin(&mut self, port: Port, value: u8) -> Result<(), Infallible> {
            match port {
                Port::Clk => {
                    if self.clk == 0 && value == 1 {
                        self.position += 1;
                    }
                    self.clk = value;
                }
                Port::UiIn => self.ui_in = value,
                Port::UioIn => self.uio_in = value,
                _ => {}
            }
            Ok(())
        }

        fn read(&self, _port: Port) -> Result<u8, Infallible> {
            let bit = self.bits[(self.position - 1) % self.bits.len()];
            Ok(if bit { 0b1111_1111 } else { 0b1111_1110 })
        }

        fn eval(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
    }

    #[test]
    fn only_bit_zero_is_counted() {
        let mut clock = Clock::new(SimTime::from_ns(10)).expect("valid period");
        let mut dut = Pattern::new(vec![true, false, false, true, true]);
        clock.start(&mut dut).expect("infallible");

        let high = sample_period(&mut dut, &mut clock, 10).expect("infallible");
        assert_eq!(high, 6);
        assert_eq!(clock.edges(), 10);
    }

    #[test]
    fn apply_splits_the_code_across_both_buses() {
        let mut dut = Pattern::new(vec![false]);
        apply(&mut dut, DacCode::new(0xabc).expect("in range")).expect("infallible");
        assert_eq!(dut.ui_in, 0xab);
        assert_eq!(dut.uio_in, 0x0c);
    }

    #[test]
    fn measurement_judges_exact_equality() {
        let code = DacCode::new(100).expect("in range");
        let exact = Measurement {
            code,
            high_cycles: 100,
            period_cycles: 4096,
        };
        assert!(exact.passed());
        assert_eq!(exact.expected(), 100);

        let off_by_one = Measurement {
            high_cycles: 101,
            ..exact
        };
        assert!(!off_by_one.passed());

        let half = Measurement {
            code: DacCode::new(2048).expect("in range"),
            high_cycles: 2048,
            period_cycles: 4096,
        };
        assert_eq!(half.duty_cycle(), 0.5);
    }
}
