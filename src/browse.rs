use std::process::{Command, Stdio};
use std::thread;

use anyhow::{anyhow, Context, Result};

pub const URL_PLACEHOLDER: &str = "%URL%";

/// Hands a story URL to something that can show it. Fire and forget: the
/// browser's own outcome is never awaited, but a failure to launch it is
/// returned as a message for the user.
pub trait Browser {
    fn open(&mut self, url: &str) -> Option<String>;
}

impl<F: FnMut(&str)> Browser for F {
    fn open(&mut self, url: &str) -> Option<String> {
        self(url);
        None
    }
}

/// The desktop's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&mut self, url: &str) -> Option<String> {
        match webbrowser::open(url) {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(%url, error = %err, "system browser failed");
                Some(format!("Failed to open {url}: {err}"))
            }
        }
    }
}

/// A user-configured command such as `["firefox", "--new-tab", "%URL%"]`.
#[derive(Debug, Clone)]
pub struct CommandBrowser {
    argv: Vec<String>,
}

impl CommandBrowser {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        anyhow::ensure!(!argv.is_empty(), "browser command is empty");
        Ok(Self { argv })
    }

    /// Arguments for `url`: the placeholder is substituted, or the URL is
    /// appended when the command has none.
    pub fn args_for(&self, url: &str) -> Vec<String> {
        let mut args: Vec<String> = self.argv[1..]
            .iter()
            .map(|arg| arg.replace(URL_PLACEHOLDER, url))
            .collect();
        if !self.argv.iter().any(|arg| arg.contains(URL_PLACEHOLDER)) {
            args.push(url.to_string());
        }
        args
    }

    fn spawn(&self, url: &str) -> Result<()> {
        let program = self
            .argv
            .first()
            .ok_or_else(|| anyhow!("browser command is empty"))?;
        let mut command = Command::new(program);
        command.args(self.args_for(url));
        command.stdin(Stdio::null());
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());
        let mut child = command
            .spawn()
            .with_context(|| format!("launch {program} for {url}"))?;
        thread::Builder::new()
            .name("browser-reaper".into())
            .spawn(move || {
                if let Err(err) = child.wait() {
                    tracing::warn!(error = %err, "wait for browser command");
                }
            })
            .context("start browser reaper thread")?;
        Ok(())
    }
}

impl Browser for CommandBrowser {
    fn open(&mut self, url: &str) -> Option<String> {
        match self.spawn(url) {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(%url, error = %err, "browser command failed");
                Some(format!("Failed to open {url}: {err:#}"))
            }
        }
    }
}

/// Picks the configured command, falling back to the system browser.
pub fn from_command(argv: &[String]) -> Box<dyn Browser> {
    match CommandBrowser::new(argv.to_vec()) {
        Ok(browser) => Box::new(browser),
        Err(_) => Box::new(SystemBrowser),
    }
}
