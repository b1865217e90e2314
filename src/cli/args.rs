// Tue Jan 20 2026 - Alex

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "schema-pack")]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Inspect and export archived schema-pack layouts", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true, default_value = "warn")]
    pub log_level: String,

    /// JSON settings file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the archived layout tree with offsets and traits.
    Inspect(InspectArgs),
    /// Write a Kaitai Struct declaration for the archived layout.
    Kaitai(KaitaiArgs),
    /// Decode a blob with the archived layout and print it as JSON.
    Dump(DumpArgs),
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    pub archive: PathBuf,
}

#[derive(Parser, Debug)]
pub struct KaitaiArgs {
    pub archive: PathBuf,

    #[arg(long = "version", default_value = "1")]
    pub layout_version: u32,

    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overrides `kaitai.id` from the config.
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Parser, Debug)]
pub struct DumpArgs {
    pub archive: PathBuf,

    pub blob: PathBuf,

    #[arg(long)]
    pub compact: bool,
}

impl KaitaiArgs {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(id) = &self.id {
            if id.is_empty() || !id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
                return Err(format!("Kaitai id must be lower_snake_case: {}", id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kaitai() {
        let args = Args::parse_from([
            "schema-pack",
            "--log-level",
            "debug",
            "kaitai",
            "layout.js",
            "--version",
            "4",
            "-o",
            "out.ksy",
        ]);
        assert_eq!(args.log_level, "debug");
        match args.command {
            Command::Kaitai(kaitai) => {
                assert_eq!(kaitai.layout_version, 4);
                assert_eq!(kaitai.output, Some(PathBuf::from("out.ksy")));
                assert!(kaitai.validate().is_ok());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_dump() {
        let args = Args::parse_from(["schema-pack", "dump", "layout.js", "blob.bin", "--compact"]);
        assert!(matches!(args.command, Command::Dump(DumpArgs { compact: true, .. })));
        assert_eq!(args.log_level, "warn");
    }

    #[test]
    fn test_invalid_id() {
        let args = KaitaiArgs {
            archive: PathBuf::from("layout.js"),
            layout_version: 1,
            output: None,
            id: Some("Bad Id".to_string()),
        };
        assert!(args.validate().is_err());
    }
}
