//! In-place scrubbing of the author and machine names in a module header.
//!
//! The two identity strings are overwritten with [`PLACEHOLDER`] bytes of the
//! same length, so every length prefix and every byte outside those two
//! fields stays where it was. The patched file is written to a sibling
//! temporary file and renamed over the original, so a crash mid-write never
//! leaves a half-scrubbed module behind.

use std::io::Write;
use std::path::Path;

use crate::error::PexError;
use crate::header::{parse_header, PexHeader, PexString};

/// Byte written over every identity character.
pub const PLACEHOLDER: u8 = b'_';

/// Result of anonymizing one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonymizeOutcome {
    /// Identity strings were replaced and the file was rewritten.
    Anonymized,
    /// Both identity strings were already scrubbed; the file was not touched.
    AlreadyAnonymized,
}

fn is_scrubbed(field: &PexString) -> bool {
    field.raw.iter().all(|&b| b == PLACEHOLDER)
}

fn scrub(data: &mut [u8], field: &PexString) {
    data[field.content_range()].fill(PLACEHOLDER);
}

/// Returns a copy of `data` with the identity strings replaced, or `None` if
/// they are already scrubbed.
///
/// `path` is only used for error reporting.
pub fn anonymized_bytes(data: &[u8], path: &Path) -> Result<Option<Vec<u8>>, PexError> {
    let header: PexHeader = parse_header(data, path)?;
    if is_scrubbed(&header.user_name) && is_scrubbed(&header.computer_name) {
        return Ok(None);
    }

    let mut patched = data.to_vec();
    scrub(&mut patched, &header.user_name);
    scrub(&mut patched, &header.computer_name);
    Ok(Some(patched))
}

/// Scrubs the author and machine names of the module at `path`.
///
/// Running it twice is harmless: the second call reports
/// [`AnonymizeOutcome::AlreadyAnonymized`] and leaves the file untouched. On
/// any error the original file is left as it was.
pub fn anonymize(path: &Path) -> Result<AnonymizeOutcome, PexError> {
    let io_err = |source: std::io::Error| PexError::Io {
        path: path.to_path_buf(),
        source,
    };

    let data = std::fs::read(path).map_err(io_err)?;
    let Some(patched) = anonymized_bytes(&data, path)? else {
        return Ok(AnonymizeOutcome::AlreadyAnonymized);
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&patched).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    Ok(AnonymizeOutcome::Anonymized)
}
