// Tue Jan 20 2026 - Alex

use super::args::{Args, Command, DumpArgs, InspectArgs, KaitaiArgs};
use crate::archive::restore_detached;
use crate::buffer::BufferView;
use crate::cache::Cache;
use crate::config::Config;
use crate::error::Result;
use crate::kaitai::export_declaration;
use crate::layout::{describe, LayoutRef};
use colored::Colorize;
use std::fs;
use std::path::Path;

pub struct CommandHandler {
    config: Config,
}

/// Reads an archive file and rebuilds its layout without interceptors.
pub fn load_layout(path: &Path) -> Result<LayoutRef> {
    let text = fs::read_to_string(path)?;
    Ok(restore_detached(&text)?)
}

impl CommandHandler {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn execute(mut self, args: Args) -> anyhow::Result<()> {
        self.setup_logging(&args)?;
        if args.no_color {
            colored::control::set_override(false);
        }
        if let Some(path) = &args.config {
            self.config = Config::load(path)?;
        }

        match args.command {
            Command::Inspect(inspect_args) => self.handle_inspect(inspect_args),
            Command::Kaitai(kaitai_args) => self.handle_kaitai(kaitai_args),
            Command::Dump(dump_args) => self.handle_dump(dump_args),
        }
    }

    fn setup_logging(&self, args: &Args) -> anyhow::Result<()> {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            "off" => log::LevelFilter::Off,
            _ => log::LevelFilter::Warn,
        };

        env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp(None)
            .try_init()?;

        Ok(())
    }

    fn handle_inspect(&self, args: InspectArgs) -> anyhow::Result<()> {
        let layout = load_layout(&args.archive)?;

        println!("{} {}", "Layout:".cyan().bold(), args.archive.display());
        println!("{}", "-".repeat(40).cyan());
        print!("{}", describe(&layout));
        println!("{}", "-".repeat(40).cyan());
        println!("  Kind: {}", layout.kind().green());
        println!("  Traits: {}", layout.traits().to_string().green());
        Ok(())
    }

    fn handle_kaitai(&self, args: KaitaiArgs) -> anyhow::Result<()> {
        args.validate().map_err(|e| anyhow::anyhow!(e))?;

        let layout = load_layout(&args.archive)?;
        let mut kaitai = self.config.kaitai.clone();
        if let Some(id) = args.id {
            kaitai.id = id;
        }
        let declaration = export_declaration(&layout, args.layout_version, &kaitai)?;

        match &args.output {
            Some(path) => {
                fs::write(path, &declaration)?;
                println!("{}", format!("Declaration written to: {:?}", path).green());
            }
            None => print!("{}", declaration),
        }
        Ok(())
    }

    fn handle_dump(&self, args: DumpArgs) -> anyhow::Result<()> {
        if !args.blob.exists() {
            return Err(anyhow::anyhow!("Blob file does not exist: {:?}", args.blob));
        }

        let layout = load_layout(&args.archive)?;
        let mut cache = Cache::with_config(self.config.writer.clone());
        let decoder = cache.make_reader_for(&layout)?;
        let view = BufferView::new(fs::read(&args.blob)?);
        let value = decoder.decode(&view)?;
        log::debug!("Decoded {} from {} bytes", value.type_name(), view.len());

        let json = value.to_json()?;
        let text = if args.compact {
            serde_json::to_string(&json)?
        } else {
            serde_json::to_string_pretty(&json)?
        };
        println!("{}", text);
        Ok(())
    }
}

impl Default for CommandHandler {
    fn default() -> Self {
        Self::new()
    }
}
