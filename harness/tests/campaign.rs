// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use std::env;

use dacbench_harness::{
    Campaign, Clock, DacCode, Dut, HarnessError, HarnessOptions, ModelError,
    Port, PwmDacModel, check, measure, reset, run_campaign,
};
use snafu::{ResultExt, Snafu, Whatever};

fn init_logging() {
    if env::var("RUST_LOG").is_ok() {
        let _ = env_logger::builder().is_test(true).try_init();
    }
}

fn code(value: u16) -> DacCode {
    DacCode::new(value).expect("test codes fit in 12 bits")
}

/// A DAC whose comparator is `<=` instead of `<`.
#[derive(Default)]
struct OffByOne(PwmDacModel);

impl Dut for OffByOne {
    type Error = ModelError;

    fn pin(&mut self, port: Port, value: u8) -> Result<(), ModelError> {
        self.0.pin(port, value)
    }

    fn read(&self, port: Port) -> Result<u8, ModelError> {
        self.0.read(port)?;
        Ok(u8::from(self.0.counter() <= self.0.code().value()))
    }

    fn eval(&mut self) -> Result<(), ModelError> {
        self.0.eval()
    }
}

/// A DAC with bit 6 of `ui_in` (code bit 10) tied low.
#[derive(Default)]
struct StuckBit(PwmDacModel);

impl Dut for StuckBit {
    type Error = ModelError;

    fn pin(&mut self, port: Port, value: u8) -> Result<(), ModelError> {
        let value = if port == Port::UiIn {
            value & !(1 << 6)
        } else {
            value
        };
        self.0.pin(port, value)
    }

    fn read(&self, port: Port) -> Result<u8, ModelError> {
        self.0.read(port)
    }

    fn eval(&mut self) -> Result<(), ModelError> {
        self.0.eval()
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("simulator connection lost"))]
struct Disconnected;

/// A DUT whose output can no longer be read.
struct Unreachable;

impl Dut for Unreachable {
    type Error = Disconnected;

    fn pin(&mut self, _port: Port, _value: u8) -> Result<(), Disconnected> {
        Ok(())
    }

    fn read(&self, _port: Port) -> Result<u8, Disconnected> {
        DisconnectedSnafu.fail()
    }

    fn eval(&mut self) -> Result<(), Disconnected> {
        Ok(())
    }
}

#[test]
#[snafu::report]
fn reference_model_passes_the_default_campaign() -> Result<(), Whatever> {
    init_logging();

    let mut dut = PwmDacModel::new();
    let report = run_campaign(&mut dut)
        .whatever_context("Default campaign failed on the reference model")?;

    let measured = report
        .measurements
        .iter()
        .map(|measurement| (measurement.code.value(), measurement.high_cycles))
        .collect::<Vec<_>>();
    assert_eq!(
        measured,
        vec![
            (0, 0),
            (100, 100),
            (1024, 1024),
            (2048, 2048),
            (3500, 3500),
            (4095, 4095)
        ]
    );

    // 10 reset edges, then settle + one period per vector
    assert_eq!(report.edges, 10 + 6 * (10 + 4096));
    assert_eq!(report.elapsed.as_ns(), 5 + (report.edges - 1) * 10);

    Ok(())
}

#[test]
#[snafu::report]
fn logging_campaign_still_passes() -> Result<(), Whatever> {
    init_logging();

    let campaign = Campaign::new(HarnessOptions {
        vectors: vec![code(7)],
        ..HarnessOptions::default_logging()
    });
    let report = campaign
        .run(&mut PwmDacModel::new())
        .whatever_context("Logging campaign failed")?;
    assert_eq!(report.measurements[0].high_cycles, 7);

    Ok(())
}

#[test]
fn every_code_yields_exactly_its_high_cycle_count() {
    let options = HarnessOptions::default();
    let mut dut = PwmDacModel::new();
    let mut clock = Clock::new(options.clock_period()).expect("valid period");
    clock.start(&mut dut).expect("model pins");
    reset(&mut dut, &mut clock, &options).expect("model pins");

    for value in 0..=DacCode::MAX.value() {
        let measurement = check(&mut dut, &mut clock, code(value), &options)
            .unwrap_or_else(|error| panic!("{error}"));
        assert_eq!(measurement.high_cycles, u32::from(value));
    }
}

#[test]
fn boundaries_are_never_and_almost_always_high() {
    let options = HarnessOptions::default();
    let mut dut = PwmDacModel::new();
    let mut clock = Clock::new(options.clock_period()).expect("valid period");
    clock.start(&mut dut).expect("model pins");
    reset(&mut dut, &mut clock, &options).expect("model pins");

    let zero =
        measure(&mut dut, &mut clock, DacCode::MIN, &options).expect("model");
    assert_eq!(zero.high_cycles, 0);
    assert_eq!(zero.duty_cycle(), 0.0);

    let max =
        measure(&mut dut, &mut clock, DacCode::MAX, &options).expect("model");
    assert_eq!(max.high_cycles, 4095);
    assert_eq!(max.period_cycles - max.high_cycles, 1);
}

#[test]
fn repeated_vectors_measure_the_same() {
    let options = HarnessOptions::default();
    let mut dut = PwmDacModel::new();
    let mut clock = Clock::new(options.clock_period()).expect("valid period");
    clock.start(&mut dut).expect("model pins");
    reset(&mut dut, &mut clock, &options).expect("model pins");

    for value in [100, 3500] {
        let first =
            measure(&mut dut, &mut clock, code(value), &options).expect("model");
        let second =
            measure(&mut dut, &mut clock, code(value), &options).expect("model");
        assert_eq!(first, second);
    }
}

#[test]
fn literal_scenarios_follow_a_reset() {
    for value in [100, 1024, 2048, 3500] {
        let campaign = Campaign::new(HarnessOptions {
            vectors: vec![code(value)],
            ..Default::default()
        });
        let report = campaign
            .run(&mut PwmDacModel::new())
            .unwrap_or_else(|error| panic!("{error}"));
        assert_eq!(report.measurements.len(), 1);
        assert_eq!(report.measurements[0].high_cycles, u32::from(value));
        assert_eq!(report.edges, 10 + 10 + 4096);
    }
}

#[test]
fn off_by_one_comparator_fails_on_the_first_vector() {
    let mut passed = vec![];
    let error = Campaign::default()
        .run_with(&mut OffByOne::default(), |measurement| {
            passed.push(measurement.code)
        })
        .expect_err("`<=` produces one extra high cycle");

    assert!(passed.is_empty());
    assert!(error.is_mismatch());
    assert_eq!(
        error.to_string(),
        "Failed for input 0: expected 0 high cycles, but got 1"
    );
}

#[test]
fn first_mismatch_aborts_the_remaining_vectors() {
    let mut passed = vec![];
    let error = Campaign::default()
        .run_with(&mut StuckBit::default(), |measurement| {
            passed.push(measurement.code.value())
        })
        .expect_err("code bit 10 is stuck low");

    assert_eq!(passed, vec![0, 100]);
    match error {
        HarnessError::Mismatch {
            code,
            expected,
            actual,
        } => {
            assert_eq!(code.value(), 1024);
            assert_eq!(expected, 1024);
            assert_eq!(actual, 0);
        }
        other => panic!("expected a mismatch, got {other}"),
    }
}

#[test]
fn simulator_errors_are_not_mismatches() {
    let error = run_campaign(&mut Unreachable)
        .expect_err("the output cannot be sampled");

    assert!(!error.is_mismatch());
    assert_eq!(error.to_string(), "Failed to sample port uo_out on the DUT");
    let source = std::error::Error::source(&error).expect("has a cause");
    assert_eq!(source.to_string(), "simulator connection lost");
}

#[test]
fn invalid_options_are_rejected_before_touching_the_dut() {
    let campaign = Campaign::new(HarnessOptions {
        clock_period_ns: 0,
        ..Default::default()
    });
    let error = campaign
        .run(&mut Unreachable)
        .expect_err("a zero clock period is invalid");
    assert!(matches!(error, HarnessError::Config { .. }));
}

#[test]
fn empty_campaign_only_resets() {
    let campaign = Campaign::new(HarnessOptions {
        vectors: vec![],
        ..Default::default()
    });
    let report = campaign
        .run(&mut PwmDacModel::new())
        .unwrap_or_else(|error| panic!("{error}"));
    assert!(report.measurements.is_empty());
    assert_eq!(report.edges, 10);
}

#[test]
fn oversized_clock_period_is_rejected_instead_of_overflowing() {
    for clock_period_ns in [1_000_000_000_000_000, 20_000_000_000_000_000] {
        let campaign = Campaign::new(HarnessOptions {
            clock_period_ns,
            ..Default::default()
        });
        let error = campaign
            .run(&mut PwmDacModel::new())
            .expect_err("simulation time would not fit in 64 bits");
        assert!(matches!(error, HarnessError::Config { .. }));
    }
}
