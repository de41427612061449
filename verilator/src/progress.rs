// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Cargo-style status lines written straight to file descriptor 2, so they
//! show up even while the test harness captures `eprintln!`.

use std::{
    fmt,
    fs::File,
    io::Write,
    mem::ManuallyDrop,
    os::fd::FromRawFd,
    sync::{LazyLock, Mutex},
};

use owo_colors::OwoColorize;
use snafu::{ResultExt, Whatever};

// never closed: the descriptor belongs to the process
static STDERR: LazyLock<Mutex<ManuallyDrop<File>>> = LazyLock::new(|| {
    Mutex::new(ManuallyDrop::new(unsafe {
        File::from_raw_fd(libc::STDERR_FILENO)
    }))
});

#[derive(Debug, Clone, Copy)]
pub(crate) enum Status {
    Blocking,
    Compiling,
    Finished,
    Fresh,
}

impl Status {
    fn verb(self) -> &'static str {
        match self {
            Status::Blocking => "Blocking",
            Status::Compiling => "Compiling",
            Status::Finished => "Finished",
            Status::Fresh => "Fresh",
        }
    }
}

/// Writes `verb message`, with the verb right-aligned the way Cargo does it.
pub(crate) fn report(
    status: Status,
    message: fmt::Arguments<'_>,
) -> Result<(), Whatever> {
    let verb = format!("{:>12}", status.verb());
    let line = match status {
        Status::Blocking => format!("{} {}", verb.bold().cyan(), message),
        _ => format!("{} {}", verb.bold().green(), message),
    };

    // a poisoned lock only means another thread panicked mid-line
    let Ok(mut stderr) = STDERR.lock() else {
        return Ok(());
    };
    writeln!(stderr, "{line}")
        .whatever_context("Failed to write to non-captured stderr")
}

#[cfg(test)]
mod tests {
    use super::Status;

    #[test]
    fn verbs_fit_the_status_column() {
        for status in [
            Status::Blocking,
            Status::Compiling,
            Status::Finished,
            Status::Fresh,
        ] {
            assert!(status.verb().len() <= 12);
        }
    }
}
