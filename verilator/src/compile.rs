// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Turning a top module into a shared library.
//!
//! Layout of a model's artifact directory:
//!
//! ```text
//! <directory>/shim/ffi.cpp           generated C entry points
//! <directory>/obj_dir/libV<top>_dyn.so
//! ```

use std::{fs, process::Command, time::SystemTime};

use camino::{Utf8Path, Utf8PathBuf};
use snafu::{ResultExt, Whatever, whatever};

use crate::{PortDirection, PortSpec, VerilatorRuntimeOptions};

/// Everything needed to compile one top module.
pub(crate) struct Build<'a> {
    pub top: &'a str,
    pub ports: &'a [PortSpec],
    pub source_files: &'a [Utf8PathBuf],
    pub include_directories: &'a [Utf8PathBuf],
    pub directory: &'a Utf8Path,
    pub options: &'a VerilatorRuntimeOptions,
}

/// C entry points around the verilated class `V<top>`. Each port is a
/// `CData` (`VL_IN8`/`VL_OUT8`), so every accessor moves one byte.
pub(crate) fn shim_source(top: &str, ports: &[PortSpec]) -> String {
    let mut source = format!(
        r#"#include "verilated.h"
#include "V{top}.h"

extern "C" {{
void* ffi_new_V{top}() {{ return new V{top}{{}}; }}
void ffi_V{top}_eval(V{top}* top) {{ top->eval(); }}
void ffi_delete_V{top}(V{top}* top) {{
    top->final();
    delete top;
}}
"#
    );

    for port in ports {
        let name = port.name;
        let msb = port.msb();
        let accessor = match port.direction {
            PortDirection::Input => format!(
                "void ffi_V{top}_pin_{name}(V{top}* top, VL_IN8(value, {msb}, 0)) {{ top->{name} = value; }}\n"
            ),
            PortDirection::Output => format!(
                "VL_OUT8(/* return */, {msb}, 0) ffi_V{top}_read_{name}(V{top}* top) {{ return top->{name}; }}\n"
            ),
        };
        source.push_str(&accessor);
    }

    source.push_str("} // extern \"C\"\n");
    source
}

impl Build<'_> {
    fn shim_directory(&self) -> Utf8PathBuf {
        self.directory.join("shim")
    }

    fn object_directory(&self) -> Utf8PathBuf {
        self.directory.join("obj_dir")
    }

    fn library_name(&self) -> String {
        format!("V{}_dyn", self.top)
    }

    pub(crate) fn library_path(&self) -> Utf8PathBuf {
        self.object_directory()
            .join(format!("lib{}.so", self.library_name()))
    }

    /// Whether some source file changed after the library was last linked.
    fn is_stale(&self) -> Result<bool, Whatever> {
        let library_path = self.library_path();
        let Ok(built) = fs::metadata(&library_path)
            .and_then(|metadata| metadata.modified())
        else {
            return Ok(true);
        };

        for source_file in self.source_files {
            if modified(source_file)? > built {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The full Verilator invocation. The shim is named relative to
    /// `--Mdir` (verilator#5226).
    pub(crate) fn command(&self) -> Result<Command, Whatever> {
        let mut command = Command::new(&self.options.verilator_executable);
        command
            .args(["--cc", "-sv", "--build", "-j", "0"])
            .args(["-CFLAGS", "-shared -fpic"])
            .args(["--lib-create", &self.library_name()])
            .args(["--Mdir", self.object_directory().as_str()])
            .args(["--top-module", self.top]);

        match self.options.verilator_optimization {
            Some(level @ 0..=3) => {
                command.arg(format!("-O{level}"));
            }
            Some(level) => whatever!(
                "Verilator optimization level must be between 0 and 3 inclusive, got {}",
                level
            ),
            None => {}
        }
        command.args(
            self.options
                .ignored_warnings
                .iter()
                .map(|warning| format!("-Wno-{warning}")),
        );
        command.args(
            self.include_directories
                .iter()
                .map(|directory| format!("-I{directory}")),
        );
        command.args(self.source_files).arg("../shim/ffi.cpp");
        Ok(command)
    }

    /// Returns the path of an up-to-date library, invoking Verilator only
    /// when [`Build::is_stale`] (or a rebuild is forced).
    pub(crate) fn run(&self) -> Result<Utf8PathBuf, Whatever> {
        let library_path = self.library_path();
        if !self.options.force_verilator_rebuild && !self.is_stale()? {
            if self.options.log {
                log::info!("Reusing {}", library_path);
            }
            return Ok(library_path);
        }

        let shim_directory = self.shim_directory();
        fs::create_dir_all(&shim_directory).whatever_context(format!(
            "Failed to create shim directory {}",
            shim_directory
        ))?;
        fs::write(
            shim_directory.join("ffi.cpp"),
            shim_source(self.top, self.ports),
        )
        .whatever_context("Failed to write the FFI shim")?;

        let mut command = self.command()?;
        if self.options.log {
            log::info!("Invoking verilator: {:?}", command);
        }
        let output = command
            .output()
            .whatever_context("Invocation of verilator failed")?;
        if !output.status.success() {
            whatever!(
                "Invocation of verilator failed with {}\n\n--- STDOUT ---\n{}\n\n--- STDERR ---\n{}",
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }

        Ok(library_path)
    }
}

fn modified(path: &Utf8Path) -> Result<SystemTime, Whatever> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .whatever_context(format!(
            "Failed to determine last-modified time for source file {}",
            path
        ))
}
