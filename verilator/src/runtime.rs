// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    collections::{HashMap, HashSet, hash_map::Entry},
    fs,
    time::Instant,
};

use camino::{Utf8Path, Utf8PathBuf};
use libloading::Library;
use snafu::{ResultExt, Whatever, whatever};

use crate::{
    MAX_PORT_WIDTH, PortSpec, VerilatorRuntimeOptions,
    compile::Build,
    is_plain_identifier, lock,
    model::VerilatedModel,
    progress::{self, Status},
};

/// Compiles and loads Verilog top modules. Libraries are cached per
/// `(top, source file)` for the lifetime of the runtime and on disk under the
/// artifact directory.
pub struct VerilatorRuntime {
    artifact_directory: Utf8PathBuf,
    source_files: Vec<Utf8PathBuf>,
    include_directories: Vec<Utf8PathBuf>,
    options: VerilatorRuntimeOptions,
    libraries: HashMap<(String, Utf8PathBuf), Library>,
}

/// The per-model artifact directory for `top` defined in `source_path`.
/// Underscores are doubled before separators become underscores, so distinct
/// paths never share a directory.
fn model_directory_name(top: &str, source_path: &Utf8Path) -> String {
    let path = source_path.as_str().replace('_', "__").replace('/', "_");
    format!("{top}_{path}")
}

/// Rejects interfaces that the generated shim cannot express.
fn check_interface(top: &str, ports: &[PortSpec]) -> Result<(), Whatever> {
    if !is_plain_identifier(top) {
        whatever!(
            "Top module name `{}` must be a plain Verilog identifier",
            top
        );
    }

    let mut seen = HashSet::with_capacity(ports.len());
    for port in ports {
        if !is_plain_identifier(port.name) {
            whatever!(
                "Port name `{}` on module {} must be a plain Verilog identifier",
                port.name,
                top
            );
        }
        if !(1..=MAX_PORT_WIDTH).contains(&port.width) {
            whatever!(
                "Port {} on module {} is {} bits wide, but only 1 to {} bits are supported",
                port.name,
                top,
                port.width,
                MAX_PORT_WIDTH
            );
        }
        if !seen.insert(port.name) {
            whatever!("Port {} on module {} is declared twice", port.name, top);
        }
    }
    Ok(())
}

impl VerilatorRuntime {
    /// Creates a runtime that compiles `source_files` (all of which must
    /// exist) into `artifact_directory`.
    pub fn new(
        artifact_directory: &Utf8Path,
        source_files: &[&Utf8Path],
        include_directories: &[&Utf8Path],
        options: VerilatorRuntimeOptions,
    ) -> Result<Self, Whatever> {
        if options.log {
            log::info!("Validating source files");
        }
        if let Some(missing) =
            source_files.iter().find(|source_file| !source_file.is_file())
        {
            whatever!(
                "Source file {} does not exist or is not a file. Note that if it's a relative path, you must be in the correct directory",
                missing
            );
        }

        Ok(Self {
            artifact_directory: artifact_directory.to_owned(),
            source_files: source_files
                .iter()
                .map(|path| path.to_path_buf())
                .collect(),
            include_directories: include_directories
                .iter()
                .map(|path| path.to_path_buf())
                .collect(),
            options,
            libraries: HashMap::new(),
        })
    }

    /// The options this runtime was created with.
    pub fn options(&self) -> &VerilatorRuntimeOptions {
        &self.options
    }

    /// Instantiates module `top`, defined in `source_path` (one of the
    /// runtime's source files), exposing exactly `ports`. The library is
    /// compiled on first use and reused afterwards.
    ///
    /// `ports` must match the module's declarations: a port declared here but
    /// missing from the module fails to compile, and one declared with the
    /// wrong width or direction is undefined behavior at the C boundary.
    pub fn instantiate(
        &mut self,
        top: &str,
        source_path: &Utf8Path,
        ports: &[PortSpec],
    ) -> Result<VerilatedModel<'_>, Whatever> {
        check_interface(top, ports)?;
        let library = self
            .library(top, source_path, ports)
            .whatever_context(format!(
                "Failed to build or load the Verilator library for {}",
                top
            ))?;
        VerilatedModel::load(library, top, ports)
    }

    fn library(
        &mut self,
        top: &str,
        source_path: &Utf8Path,
        ports: &[PortSpec],
    ) -> Result<&Library, Whatever> {
        if self.options.log {
            log::info!("Validating model source file");
        }
        let canonical_source = source_path.canonicalize_utf8().whatever_context(
            format!("Failed to resolve source file {}", source_path),
        )?;
        let is_known_source = self.source_files.iter().any(|source_file| {
            source_file
                .canonicalize_utf8()
                .is_ok_and(|path| path == canonical_source)
        });
        if !is_known_source {
            whatever!(
                "Module `{}` requires source file {}, which was not provided to the runtime",
                top,
                source_path
            );
        }

        let entry = match self
            .libraries
            .entry((top.to_string(), canonical_source))
        {
            Entry::Occupied(entry) => return Ok(entry.into_mut()),
            Entry::Vacant(entry) => entry,
        };

        let directory = self
            .artifact_directory
            .join(model_directory_name(top, source_path));
        if self.options.log {
            log::info!("Creating artifacts directory {}", directory);
        }
        fs::create_dir_all(&directory).whatever_context(format!(
            "Failed to create artifacts directory {}",
            directory
        ))?;

        let build = Build {
            top,
            ports,
            source_files: &self.source_files,
            include_directories: &self.include_directories,
            directory: &directory,
            options: &self.options,
        };
        let library_path = lock::with_directory_locked(
            &directory,
            self.options.log,
            || {
                progress::report(
                    Status::Compiling,
                    format_args!("{} ({})", top, source_path),
                )?;
                let start = Instant::now();
                let library_path = build.run()?;
                let elapsed = start.elapsed();
                progress::report(
                    Status::Finished,
                    format_args!(
                        "`verilator-{}` profile target(s) in {}.{:02}s",
                        self.options.profile(),
                        elapsed.as_secs(),
                        elapsed.subsec_millis() / 10
                    ),
                )?;
                Ok(library_path)
            },
        )?;

        if self.options.log {
            log::info!("Opening {}", library_path);
        }
        let library = unsafe { Library::new(&library_path) }.whatever_context(
            format!("Failed to load Verilator library {}", library_path),
        )?;
        Ok(entry.insert(library))
    }
}
