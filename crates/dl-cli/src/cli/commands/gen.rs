//! `dl gen <args...>` – write a `.dl` script that runs `dl <args...> "$@"`.

use anyhow::{Context, Result};
use dl_core::store::MARKER_SCRIPT;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

pub fn run_gen(dir: &Path, self_name: &str, args: &[OsString]) -> Result<()> {
    let path = dir.join(MARKER_SCRIPT);
    let script = render_script(self_name, args);

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o755)
        .open(&path)
        .with_context(|| format!("create {}", path.display()))?;
    file.write_all(&script)
        .with_context(|| format!("write {}", path.display()))?;
    // `mode` only applies to newly created files.
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("chmod {}", path.display()))?;
    Ok(())
}

fn render_script(self_name: &str, args: &[OsString]) -> Vec<u8> {
    let mut script = b"#!/bin/sh\n\nexec ".to_vec();
    script.extend_from_slice(&shell_quote(self_name.as_bytes()));
    for arg in args {
        script.push(b' ');
        script.extend_from_slice(&shell_quote(arg.as_bytes()));
    }
    script.extend_from_slice(b" \"$@\"\n");
    script
}

/// Quote for POSIX sh unless every byte is obviously safe.
fn shell_quote(word: &[u8]) -> Vec<u8> {
    let safe = |b: &u8| b.is_ascii_alphanumeric() || b"-_./=:,+@%".contains(b);
    if !word.is_empty() && word.iter().all(safe) {
        return word.to_vec();
    }
    let mut quoted = vec![b'\''];
    for &b in word {
        if b == b'\'' {
            quoted.extend_from_slice(b"'\\''");
        } else {
            quoted.push(b);
        }
    }
    quoted.push(b'\'');
    quoted
}
