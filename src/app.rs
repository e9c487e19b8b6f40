use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::browse;
use crate::config;
use crate::controller::{self, Controller};
use crate::headline;
use crate::logging;
use crate::store;
use crate::ui;

pub const USAGE: &str = "slashdot-tui - Browse cached Slashdot headlines from the terminal.\n\n  \
--database <path>    Headline database to read\n  \
--config <path>      Config file to use instead of the default\n  \
--list               Print the formatted headlines and exit\n  \
--version, -V        Show version and exit\n  \
--help,    -h        Show this help message";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    pub database: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub list: bool,
    pub version: bool,
    pub help: bool,
}

impl Args {
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = Args::default();
        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--version" | "-V" => parsed.version = true,
                "--help" | "-h" => parsed.help = true,
                "--list" => parsed.list = true,
                "--database" => {
                    let value = args.next().context("--database needs a path")?;
                    parsed.database = Some(PathBuf::from(value));
                }
                "--config" => {
                    let value = args.next().context("--config needs a path")?;
                    parsed.config_file = Some(PathBuf::from(value));
                }
                other => bail!("unknown argument {other:?}"),
            }
        }
        Ok(parsed)
    }
}

pub fn run(args: Args) -> Result<()> {
    let mut cfg = config::load(config::LoadOptions {
        config_file: args.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    if let Some(database) = args.database {
        cfg.database = database;
    }

    if let Some(path) = logging::init()? {
        tracing::debug!(log = %path.display(), "logging enabled");
    }

    if args.list {
        return print_headlines(&cfg);
    }

    let controller = Controller::new(controller::Options {
        database: cfg.database.clone(),
        formatter: headline::default_formatter(cfg.format.time_format.clone()),
        browser: browse::from_command(&cfg.browser.command),
    });

    let mut model = ui::Model::new(ui::Options {
        controller,
        message_timeout: cfg.ui.message_timeout,
        copy_to_clipboard: cfg.ui.copy_to_clipboard,
        open_on_start: true,
    });
    model.run()?;

    let collected = model.scratch_text();
    if !collected.is_empty() {
        println!("{collected}");
    }
    Ok(())
}

fn print_headlines(cfg: &config::Config) -> Result<()> {
    let loaded = store::load(&cfg.database)?;
    if let Some(notice) = loaded.notice {
        eprintln!("{notice}");
    }
    let format = headline::default_formatter(cfg.format.time_format.clone());
    for entry in &loaded.entries {
        println!("{}", format(&entry.record));
    }
    Ok(())
}
