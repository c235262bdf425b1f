//! Reading, dumping and anonymizing compiled Papyrus modules.
//!
//! A compiled module (`.pex`) starts with a fixed prologue: magic number,
//! format version, game id, compilation timestamp, and three length-prefixed
//! strings naming the source file, the author and the machine it was built
//! on. This crate parses and serializes that prologue, renders it for
//! humans, and scrubs the two identity strings in place without moving any
//! other byte of the file.

#![warn(missing_docs)]

pub mod anonymize;
pub mod dump;
pub mod error;
pub mod header;

pub use anonymize::{anonymize, anonymized_bytes, AnonymizeOutcome, PLACEHOLDER};
pub use dump::dump;
pub use error::PexError;
pub use header::{parse_header, read_header, Endianness, PexHeader, PexString, MIN_HEADER_SIZE};
