// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use std::process::{Command, Stdio};

use camino::Utf8PathBuf;
use dacbench_harness::{
    Campaign, DacCode, Dut, HarnessOptions, Port, VerilatedDut, run_campaign,
};
use dacbench_verilator::{
    PortAccessError, PortSpec, VerilatorRuntime, VerilatorRuntimeOptions,
};
use snafu::{ResultExt, Whatever};

fn verilator_available() -> bool {
    Command::new("verilator")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

fn runtime(artifacts: &str) -> Result<(VerilatorRuntime, Utf8PathBuf), Whatever> {
    let source =
        Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/hdl/tt_um_dac12.v");
    let artifact_directory =
        Utf8PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(artifacts);
    let runtime = VerilatorRuntime::new(
        &artifact_directory,
        &[source.as_path()],
        &[],
        VerilatorRuntimeOptions::default_logging(),
    )?;
    Ok((runtime, source))
}

#[test]
#[snafu::report]
fn verilated_dac_passes_the_default_campaign() -> Result<(), Whatever> {
    if !verilator_available() {
        eprintln!("skipping: `verilator` is not on PATH");
        return Ok(());
    }
    colog::init();

    let (mut runtime, source) = runtime("default_campaign")?;
    let mut dut = VerilatedDut::new(&mut runtime, "tt_um_dac12", &source)?;
    assert_eq!(dut.model().top(), "tt_um_dac12");

    let report = run_campaign(&mut dut)
        .whatever_context("DAC campaign failed on the verilated design")?;
    for measurement in &report.measurements {
        assert_eq!(measurement.high_cycles, u32::from(measurement.code));
    }

    Ok(())
}

#[test]
#[snafu::report]
fn verilated_dac_tracks_a_custom_vector_list() -> Result<(), Whatever> {
    if !verilator_available() {
        eprintln!("skipping: `verilator` is not on PATH");
        return Ok(());
    }

    let (mut runtime, source) = runtime("custom_vectors")?;
    let mut dut = VerilatedDut::new(&mut runtime, "tt_um_dac12", &source)?;

    let vectors = [1, 15, 16, 2047, 4094]
        .into_iter()
        .map(DacCode::new)
        .collect::<Result<Vec<_>, _>>()
        .whatever_context("Vector out of range")?;
    let report = Campaign::new(HarnessOptions {
        vectors,
        ..HarnessOptions::default_logging()
    })
    .run(&mut dut)
    .whatever_context("Custom campaign failed on the verilated design")?;

    let measured = report
        .measurements
        .iter()
        .map(|measurement| measurement.high_cycles)
        .collect::<Vec<_>>();
    assert_eq!(measured, vec![1, 15, 16, 2047, 4094]);

    Ok(())
}

#[test]
#[snafu::report]
fn verilated_ports_enforce_direction_and_width() -> Result<(), Whatever> {
    if !verilator_available() {
        eprintln!("skipping: `verilator` is not on PATH");
        return Ok(());
    }

    let (mut runtime, source) = runtime("port_checks")?;
    let mut dut = VerilatedDut::new(&mut runtime, "tt_um_dac12", &source)?;
    assert_eq!(dut.model().port("ui_in"), Some(PortSpec::input("ui_in", 8)));
    assert_eq!(dut.model().port("nonexistent"), None);

    assert!(matches!(
        dut.pin(Port::UoOut, 1),
        Err(PortAccessError::WrongDirection { port: "uo_out", .. })
    ));
    assert!(matches!(
        dut.read(Port::UiIn),
        Err(PortAccessError::WrongDirection { port: "ui_in", .. })
    ));
    assert!(matches!(
        dut.pin(Port::Clk, 2),
        Err(PortAccessError::ValueTooWide { width: 1, value: 2, .. })
    ));

    // clear the counter with one reset edge, then present code 1
    dut.pin(Port::RstN, 0).whatever_context("rst_n")?;
    for level in [0, 1] {
        dut.pin(Port::Clk, level).whatever_context("clk")?;
        dut.eval().whatever_context("eval")?;
    }
    dut.pin(Port::UiIn, 0).whatever_context("ui_in")?;
    dut.pin(Port::UioIn, 1).whatever_context("uio_in")?;
    dut.eval().whatever_context("eval")?;
    assert_eq!(dut.read(Port::UoOut).whatever_context("uo_out")?, 1);

    Ok(())
}
