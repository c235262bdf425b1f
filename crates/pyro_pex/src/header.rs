//! Module header layout, parsing and serialization.
//!
//! The prologue of a compiled module is laid out as:
//!
//! ```text
//! u32   magic              0xFA57C0DE
//! u8    major version
//! u8    minor version
//! u16   game id
//! u64   compilation time   seconds since the Unix epoch
//! wstr  source file name   u16 length + bytes
//! wstr  user name
//! wstr  computer name
//! ...   opaque payload
//! ```
//!
//! Skyrim titles write every integer big-endian, Fallout 4 and later write
//! them little-endian. The byte order is detected from the magic number.

use std::ops::Range;
use std::path::Path;

use serde::Serialize;

use crate::error::PexError;

/// Magic number at the start of every compiled module.
pub const PEX_MAGIC: u32 = 0xFA57_C0DE;

/// Major format version written by every known compiler release.
const SUPPORTED_MAJOR_VERSION: u8 = 3;

/// Size of the prologue when all three strings are empty.
pub const MIN_HEADER_SIZE: usize = 4 + 1 + 1 + 2 + 8 + 2 * 3;

/// Offset of the source file name length prefix.
const STRINGS_OFFSET: usize = 16;

/// Byte order of a module's integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Big-endian (Skyrim, Skyrim Special Edition).
    Big,
    /// Little-endian (Fallout 4 and later).
    Little,
}

impl Endianness {
    /// Detects the byte order from the first four bytes of a module.
    fn detect(magic: [u8; 4]) -> Option<Self> {
        if u32::from_be_bytes(magic) == PEX_MAGIC {
            Some(Endianness::Big)
        } else if u32::from_le_bytes(magic) == PEX_MAGIC {
            Some(Endianness::Little)
        } else {
            None
        }
    }

    fn u16_bytes(self, v: u16) -> [u8; 2] {
        match self {
            Endianness::Big => v.to_be_bytes(),
            Endianness::Little => v.to_le_bytes(),
        }
    }

    fn u32_bytes(self, v: u32) -> [u8; 4] {
        match self {
            Endianness::Big => v.to_be_bytes(),
            Endianness::Little => v.to_le_bytes(),
        }
    }

    fn u64_bytes(self, v: u64) -> [u8; 8] {
        match self {
            Endianness::Big => v.to_be_bytes(),
            Endianness::Little => v.to_le_bytes(),
        }
    }
}

/// A length-prefixed string field together with its position in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PexString {
    /// The decoded value. Bytes that are not valid UTF-8 are replaced.
    pub value: String,

    /// The exact bytes stored on disk, without the length prefix.
    #[serde(skip)]
    pub raw: Vec<u8>,

    /// Offset of the field's two-byte length prefix.
    pub offset: usize,
}

impl PexString {
    fn new(raw: Vec<u8>, offset: usize) -> Self {
        Self {
            value: String::from_utf8_lossy(&raw).into_owned(),
            raw,
            offset,
        }
    }

    /// Returns the byte range of the string content, excluding the length prefix.
    pub fn content_range(&self) -> Range<usize> {
        let start = self.offset + 2;
        start..start + self.raw.len()
    }

    /// Returns the number of bytes the field occupies on disk.
    pub fn on_disk_len(&self) -> usize {
        2 + self.raw.len()
    }
}

/// The fixed prologue of a compiled module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PexHeader {
    /// Byte order of every integer in the file.
    pub endianness: Endianness,
    /// Major format version.
    pub major_version: u8,
    /// Minor format version.
    pub minor_version: u8,
    /// Identifier of the game the module was compiled for.
    pub game_id: u16,
    /// Build timestamp in seconds since the Unix epoch.
    pub compilation_time: u64,
    /// Path of the script the module was compiled from.
    pub source_file_name: PexString,
    /// Name of the user who ran the compiler.
    pub user_name: PexString,
    /// Name of the machine the compiler ran on.
    pub computer_name: PexString,
}

impl PexHeader {
    /// Creates a header with the default version and game id for the byte order.
    ///
    /// Big-endian headers default to the Skyrim layout (3.2, game 1),
    /// little-endian headers to Fallout 4 (3.9, game 2). Strings longer than
    /// a length prefix can describe are truncated.
    pub fn new(endianness: Endianness, source: &str, user: &str, machine: &str) -> Self {
        let (minor_version, game_id) = match endianness {
            Endianness::Big => (2, 1),
            Endianness::Little => (9, 2),
        };

        let clamp = |s: &str| -> Vec<u8> {
            let bytes = s.as_bytes();
            bytes[..bytes.len().min(u16::MAX as usize)].to_vec()
        };

        let source_file_name = PexString::new(clamp(source), STRINGS_OFFSET);
        let user_offset = source_file_name.offset + source_file_name.on_disk_len();
        let user_name = PexString::new(clamp(user), user_offset);
        let machine_offset = user_name.offset + user_name.on_disk_len();
        let computer_name = PexString::new(clamp(machine), machine_offset);

        Self {
            endianness,
            major_version: SUPPORTED_MAJOR_VERSION,
            minor_version,
            game_id,
            compilation_time: 0,
            source_file_name,
            user_name,
            computer_name,
        }
    }

    /// Sets the build timestamp.
    pub fn with_compilation_time(mut self, seconds: u64) -> Self {
        self.compilation_time = seconds;
        self
    }

    /// Returns the number of bytes the header occupies on disk.
    pub fn len(&self) -> usize {
        self.computer_name.offset + self.computer_name.on_disk_len()
    }

    /// Always `false`: a header is never shorter than [`MIN_HEADER_SIZE`].
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the name of the game identified by `game_id`.
    pub fn game_name(&self) -> &'static str {
        match self.game_id {
            1 => "Skyrim",
            2 => "Fallout 4",
            3 => "Fallout 76",
            4 => "Starfield",
            _ => "unknown",
        }
    }

    /// Serializes the header into its on-disk form.
    pub fn encode(&self) -> Vec<u8> {
        let e = self.endianness;
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(&e.u32_bytes(PEX_MAGIC));
        out.push(self.major_version);
        out.push(self.minor_version);
        out.extend_from_slice(&e.u16_bytes(self.game_id));
        out.extend_from_slice(&e.u64_bytes(self.compilation_time));
        for field in [&self.source_file_name, &self.user_name, &self.computer_name] {
            out.extend_from_slice(&e.u16_bytes(field.raw.len() as u16));
            out.extend_from_slice(&field.raw);
        }
        out
    }
}

/// Bounds-checked reader over module bytes.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    endianness: Endianness,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                format!(
                    "truncated while reading {what} at offset {} ({} bytes in file)",
                    self.pos,
                    self.data.len()
                )
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self, what: &str) -> Result<u8, String> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &str) -> Result<u16, String> {
        let b = self.take(2, what)?;
        let arr = [b[0], b[1]];
        Ok(match self.endianness {
            Endianness::Big => u16::from_be_bytes(arr),
            Endianness::Little => u16::from_le_bytes(arr),
        })
    }

    fn u64(&mut self, what: &str) -> Result<u64, String> {
        let b = self.take(8, what)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(match self.endianness {
            Endianness::Big => u64::from_be_bytes(arr),
            Endianness::Little => u64::from_le_bytes(arr),
        })
    }

    fn wstring(&mut self, what: &str) -> Result<PexString, String> {
        let offset = self.pos;
        let len = self.u16(what)? as usize;
        let raw = self.take(len, what)?.to_vec();
        Ok(PexString::new(raw, offset))
    }
}

/// Parses a module header from the start of `data`.
///
/// `path` is only used for error reporting. Fails with
/// [`PexError::Format`] if `data` is shorter than [`MIN_HEADER_SIZE`], the
/// magic number is not recognized, the major version is unsupported, or a
/// string runs past the end of the data.
pub fn parse_header(data: &[u8], path: &Path) -> Result<PexHeader, PexError> {
    let format_err = |reason: String| PexError::Format {
        path: path.to_path_buf(),
        reason,
    };

    if data.len() < MIN_HEADER_SIZE {
        return Err(format_err(format!(
            "file is {} bytes, shorter than the minimum header size of {MIN_HEADER_SIZE}",
            data.len()
        )));
    }

    let magic = [data[0], data[1], data[2], data[3]];
    let endianness = Endianness::detect(magic).ok_or_else(|| {
        format_err(format!(
            "unrecognized magic number 0x{:08X}",
            u32::from_be_bytes(magic)
        ))
    })?;

    let mut cursor = Cursor {
        data,
        pos: 4,
        endianness,
    };

    let major_version = cursor.u8("major version").map_err(format_err)?;
    if major_version != SUPPORTED_MAJOR_VERSION {
        return Err(format_err(format!(
            "unsupported format version {major_version}"
        )));
    }
    let minor_version = cursor.u8("minor version").map_err(format_err)?;
    let game_id = cursor.u16("game id").map_err(format_err)?;
    let compilation_time = cursor.u64("compilation time").map_err(format_err)?;
    let source_file_name = cursor.wstring("source file name").map_err(format_err)?;
    let user_name = cursor.wstring("user name").map_err(format_err)?;
    let computer_name = cursor.wstring("computer name").map_err(format_err)?;

    Ok(PexHeader {
        endianness,
        major_version,
        minor_version,
        game_id,
        compilation_time,
        source_file_name,
        user_name,
        computer_name,
    })
}

/// Reads and parses the header of the module at `path`.
pub fn read_header(path: &Path) -> Result<PexHeader, PexError> {
    let data = std::fs::read(path).map_err(|e| PexError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_header(&data, path)
}
