// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Mutual exclusion for one artifact directory.
//!
//! `file_guard` serializes builds across processes (parallel `cargo test`
//! binaries share `target/`), but an advisory lock held by this process does
//! not stop its own threads, so each directory also gets an in-process mutex.

use std::{
    fs::OpenOptions,
    sync::{Arc, LazyLock, Mutex},
};

use camino::{Utf8Path, Utf8PathBuf};
use dashmap::DashMap;
use snafu::{ResultExt, Whatever, whatever};

use crate::progress::{self, Status};

static IN_PROCESS: LazyLock<DashMap<Utf8PathBuf, Arc<Mutex<()>>>> =
    LazyLock::new(DashMap::default);

/// The lock file guarding `directory`, kept beside it so that deleting the
/// directory does not release a lock someone else holds.
pub(crate) fn lock_file_path(directory: &Utf8Path) -> Utf8PathBuf {
    let name = directory.file_name().unwrap_or("artifacts");
    directory.with_file_name(format!("{name}.lock"))
}

/// Runs `critical` while holding both the cross-process and the in-process
/// lock on `directory`.
pub(crate) fn with_directory_locked<T>(
    directory: &Utf8Path,
    log: bool,
    critical: impl FnOnce() -> Result<T, Whatever>,
) -> Result<T, Whatever> {
    let lock_path = lock_file_path(directory);
    let lock_file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .whatever_context(format!("Failed to open lock file {}", lock_path))?;

    progress::report(
        Status::Blocking,
        format_args!("waiting for file lock on {}", directory),
    )?;
    if log {
        log::info!("Acquiring file lock {}", lock_path);
    }
    let _file_guard =
        file_guard::lock(&lock_file, file_guard::Lock::Exclusive, 0, 1)
            .whatever_context(format!("Failed to lock {}", lock_path))?;

    let mutex =
        Arc::clone(&IN_PROCESS.entry(directory.to_path_buf()).or_default());
    let Ok(_thread_guard) = mutex.lock() else {
        whatever!("A thread panicked while building into {}", directory);
    };

    critical()
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;

    use super::lock_file_path;

    #[test]
    fn lock_file_sits_beside_the_directory() {
        assert_eq!(
            lock_file_path(Utf8Path::new("artifacts/dac_hdl_dac.v")),
            Utf8Path::new("artifacts/dac_hdl_dac.v.lock")
        );
    }
}
