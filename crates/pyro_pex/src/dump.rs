//! Human-readable rendering of a module header.

use std::fmt;
use std::path::Path;

use crate::error::PexError;
use crate::header::{read_header, PexHeader};

impl fmt::Display for PexHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Endianness:       {:?}", self.endianness)?;
        writeln!(
            f,
            "Version:          {}.{}",
            self.major_version, self.minor_version
        )?;
        writeln!(f, "Game:             {} ({})", self.game_name(), self.game_id)?;
        writeln!(f, "Compilation time: {}", self.compilation_time)?;
        writeln!(f, "Source file:      {}", self.source_file_name.value)?;
        writeln!(f, "User name:        {}", self.user_name.value)?;
        write!(f, "Computer name:    {}", self.computer_name.value)
    }
}

/// Reads the module at `path` and renders its header as text.
pub fn dump(path: &Path) -> Result<String, PexError> {
    let header = read_header(path)?;
    Ok(header.to_string())
}
