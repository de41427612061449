// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use std::fs;

use camino::Utf8Path;
use snafu::{OptionExt, ResultExt};

use crate::{
    clock::{PS_PER_NS, SimTime},
    error::{ConfigSnafu, HarnessError, ParseConfigSnafu, ReadConfigSnafu},
    pins::DacCode,
};

/// The vectors a campaign applies unless told otherwise: both ends of the
/// range, quarter and half scale, and two arbitrary points.
pub const DEFAULT_VECTORS: [DacCode; 6] = [
    code(0),
    code(100),
    code(1024),
    code(2048),
    code(3500),
    code(4095),
];

/// For constants only: an out-of-range literal fails to compile.
const fn code(value: u16) -> DacCode {
    match DacCode::checked(value) {
        Some(code) => code,
        None => panic!("DAC code literal does not fit in 12 bits"),
    }
}

/// Optional configuration for a campaign. Usually, you can just use
/// [`HarnessOptions::default()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessOptions {
    /// The clock period in nanoseconds.
    pub clock_period_ns: u64,

    /// How many cycles `rst_n` is held low.
    pub reset_hold_cycles: u32,

    /// How many cycles to wait after `rst_n` is released.
    pub reset_release_cycles: u32,

    /// How many cycles to wait after driving a new code before sampling.
    pub settle_cycles: u32,

    /// How many rising edges make up one PWM period.
    pub pwm_period_cycles: u32,

    /// The codes to apply, in order.
    pub vectors: Vec<DacCode>,

    /// Whether to use the log crate.
    pub log: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            clock_period_ns: 10,
            reset_hold_cycles: 5,
            reset_release_cycles: 5,
            settle_cycles: 10,
            pwm_period_cycles: DacCode::PWM_PERIOD_CYCLES,
            vectors: DEFAULT_VECTORS.to_vec(),
            log: false,
        }
    }
}

fn unsigned(
    table: &toml::Table,
    key: &str,
) -> Result<Option<u64>, HarnessError> {
    let Some(value) = table.get(key) else {
        return Ok(None);
    };
    value
        .as_integer()
        .and_then(|integer| u64::try_from(integer).ok())
        .map(Some)
        .with_context(|| ConfigSnafu {
            message: format!("`harness.{key}` must be a non-negative integer"),
        })
}

fn cycles(table: &toml::Table, key: &str) -> Result<Option<u32>, HarnessError> {
    unsigned(table, key)?
        .map(|value| {
            u32::try_from(value).ok().with_context(|| ConfigSnafu {
                message: format!("`harness.{key}` is too large"),
            })
        })
        .transpose()
}

impl HarnessOptions {
    /// The same as the [`Default`] implementation except that the log crate is
    /// used.
    pub fn default_logging() -> Self {
        Self {
            log: true,
            ..Default::default()
        }
    }

    pub fn clock_period(&self) -> SimTime {
        SimTime::from_ns(self.clock_period_ns)
    }

    /// Checks the invariants a campaign relies on.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.clock_period_ns == 0 {
            return ConfigSnafu {
                message: "the clock period must be positive",
            }
            .fail();
        }
        if self.pwm_period_cycles == 0 {
            return ConfigSnafu {
                message: "the PWM period must be at least one cycle",
            }
            .fail();
        }

        let edges = self.campaign_edges();
        let fits = u128::from(self.clock_period_ns)
            .checked_mul(u128::from(PS_PER_NS))
            .and_then(|period_ps| period_ps.checked_mul(edges.max(1)))
            .is_some_and(|total_ps| total_ps <= u128::from(u64::MAX));
        if !fits {
            return ConfigSnafu {
                message: format!(
                    "a {} ns clock period overflows simulation time over a {}-cycle campaign",
                    self.clock_period_ns, edges
                ),
            }
            .fail();
        }
        Ok(())
    }

    /// Rising edges a campaign with these options drives: the reset, then
    /// settling and one PWM period per vector.
    pub fn campaign_edges(&self) -> u128 {
        let per_vector = u128::from(self.settle_cycles)
            + u128::from(self.pwm_period_cycles);
        u128::from(self.reset_hold_cycles)
            + u128::from(self.reset_release_cycles)
            + self.vectors.len() as u128 * per_vector
    }

    /// Reads options from the `[harness]` table of a TOML document. Missing
    /// keys keep their defaults and unrecognized keys are ignored.
    ///
    /// ```toml
    /// [harness]
    /// clock_period_ns = 10
    /// settle_cycles = 10
    /// vectors = [0, 100, 4095]
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self, HarnessError> {
        let document: toml::Value =
            toml::from_str(contents).context(ParseConfigSnafu)?;

        let mut options = Self::default();
        let Some(harness) = document.get("harness") else {
            return Ok(options);
        };
        let table = harness.as_table().context(ConfigSnafu {
            message: "`harness` must be a table",
        })?;

        if let Some(clock_period_ns) = unsigned(table, "clock_period_ns")? {
            options.clock_period_ns = clock_period_ns;
        }
        if let Some(cycles) = cycles(table, "reset_hold_cycles")? {
            options.reset_hold_cycles = cycles;
        }
        if let Some(cycles) = cycles(table, "reset_release_cycles")? {
            options.reset_release_cycles = cycles;
        }
        if let Some(cycles) = cycles(table, "settle_cycles")? {
            options.settle_cycles = cycles;
        }
        if let Some(cycles) = cycles(table, "pwm_period_cycles")? {
            options.pwm_period_cycles = cycles;
        }
        if let Some(log) = table.get("log") {
            options.log = log.as_bool().context(ConfigSnafu {
                message: "`harness.log` must be a boolean",
            })?;
        }
        if let Some(vectors) = table.get("vectors") {
            let vectors = vectors.as_array().context(ConfigSnafu {
                message: "`harness.vectors` must be an array of integers",
            })?;
            options.vectors = vectors
                .iter()
                .map(|vector| {
                    let value = vector
                        .as_integer()
                        .and_then(|integer| u64::try_from(integer).ok())
                        .context(ConfigSnafu {
                            message: "`harness.vectors` must contain only non-negative integers",
                        })?;
                    DacCode::try_from(value)
                })
                .collect::<Result<_, _>>()?;
        }

        options.validate()?;
        Ok(options)
    }

    /// Reads and parses the TOML file at `path`. See
    /// [`HarnessOptions::from_toml_str`].
    pub fn from_file(path: &Utf8Path) -> Result<Self, HarnessError> {
        let contents = fs::read_to_string(path)
            .context(ReadConfigSnafu { path })?;
        Self::from_toml_str(&contents)
    }
}
