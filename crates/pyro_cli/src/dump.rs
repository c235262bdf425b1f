//! `pyro dump`: print the header of a compiled module.

use crate::{DumpArgs, ReportFormat};

/// Runs the `pyro dump` command.
///
/// Writes the header to stdout. A file that is not a valid module is an
/// error and leaves stdout empty.
pub fn run(args: &DumpArgs) -> Result<i32, Box<dyn std::error::Error>> {
    println!("{}", render(args)?);
    Ok(0)
}

fn render(args: &DumpArgs) -> Result<String, Box<dyn std::error::Error>> {
    match args.format {
        ReportFormat::Text => Ok(pyro_pex::dump(&args.file)?.trim_end().to_string()),
        ReportFormat::Json => {
            let header = pyro_pex::read_header(&args.file)?;
            Ok(serde_json::to_string_pretty(&header)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyro_pex::{Endianness, PexHeader};
    use std::path::{Path, PathBuf};

    fn write_module(dir: &Path) -> PathBuf {
        let path = dir.join("Quest.pex");
        let header = PexHeader::new(Endianness::Little, "Quest.psc", "bob", "BOB-PC")
            .with_compilation_time(1_600_000_000);
        std::fs::write(&path, header.encode()).unwrap();
        path
    }

    #[test]
    fn text_lists_identity() {
        let dir = tempfile::tempdir().unwrap();
        let args = DumpArgs {
            file: write_module(dir.path()),
            format: ReportFormat::Text,
        };
        let text = render(&args).unwrap();
        assert!(text.contains("Quest.psc"));
        assert!(text.contains("bob"));
        assert!(text.contains("BOB-PC"));
    }

    #[test]
    fn json_is_parseable() {
        let dir = tempfile::tempdir().unwrap();
        let args = DumpArgs {
            file: write_module(dir.path()),
            format: ReportFormat::Json,
        };
        let value: serde_json::Value = serde_json::from_str(&render(&args).unwrap()).unwrap();
        assert_eq!(value["endianness"], "little");
        assert_eq!(value["user_name"]["value"], "bob");
        assert_eq!(value["computer_name"]["value"], "BOB-PC");
    }

    #[test]
    fn invalid_module_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.pex");
        std::fs::write(&path, b"not a module").unwrap();
        let args = DumpArgs {
            file: path,
            format: ReportFormat::Text,
        };
        assert!(render(&args).is_err());
    }
}
