//! Shared helpers for tests that run CGI programs
//!
//! Writing an executable and then exec'ing it while another test thread
//! forks can fail with `ETXTBSY`, because the forked child briefly holds the
//! write descriptor. Tests that write or run programs hold `exec_lock()`.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

static EXEC_LOCK: Mutex<()> = Mutex::new(());

pub fn exec_lock() -> MutexGuard<'static, ()> {
    EXEC_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn make_executable(path: &Path) {
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Writes a `/bin/sh` script called `name` into `dir`
pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    make_executable(&path);
    path
}
