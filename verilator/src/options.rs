// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use std::ffi::OsString;

/// Optional configuration for a [`crate::VerilatorRuntime`]. Usually, you can
/// just use [`VerilatorRuntimeOptions::default()`].
#[derive(Debug, Clone)]
pub struct VerilatorRuntimeOptions {
    /// The program to run as Verilator, looked up on `PATH` unless it is a
    /// path.
    pub verilator_executable: OsString,

    /// `-O0` through `-O3`, or no flag at all when `None`.
    pub verilator_optimization: Option<usize>,

    /// Recompile even when the library is newer than every source file.
    pub force_verilator_rebuild: bool,

    /// Lint warnings passed to Verilator as `-Wno-<warning>`.
    pub ignored_warnings: Vec<String>,

    /// Whether to use the log crate.
    pub log: bool,
}

impl Default for VerilatorRuntimeOptions {
    fn default() -> Self {
        Self {
            verilator_executable: "verilator".into(),
            verilator_optimization: None,
            force_verilator_rebuild: false,
            ignored_warnings: vec![],
            log: false,
        }
    }
}

impl VerilatorRuntimeOptions {
    /// The same as the [`Default`] implementation except that the log crate is
    /// used.
    pub fn default_logging() -> Self {
        Self {
            log: true,
            ..Default::default()
        }
    }

    /// The name Verilator's build profile is reported under.
    pub(crate) fn profile(&self) -> String {
        match self.verilator_optimization {
            Some(level) => format!("O{level}"),
            None => "unoptimized".into(),
        }
    }
}
