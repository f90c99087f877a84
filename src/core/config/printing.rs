use crate::core::config::data::Config;
use std::io::{self, Write};

impl Config {
    pub fn print_all(&self, base_url: &str) -> io::Result<()> {
        self.write_summary(&mut io::stdout().lock(), base_url)
    }

    pub fn write_summary<W: Write>(&self, out: &mut W, base_url: &str) -> io::Result<()> {
        writeln!(out, "Current configuration:")?;
        match &self.base_url {
            Some(url) => writeln!(out, "  base-url: {url}")?,
            None => writeln!(out, "  base-url: (unset, using {base_url})")?,
        }
        writeln!(
            out,
            "  credential-store: {}",
            self.credential_backend().as_str()
        )?;
        writeln!(
            out,
            "  memory-enabled: {}",
            if self.memory_enabled() { "on" } else { "off" }
        )?;
        match &self.model {
            Some(model) => writeln!(out, "  model: {model}")?,
            None => writeln!(out, "  model: (server default)")?,
        }
        writeln!(
            out,
            "  preferences-poll-secs: {}",
            self.preferences_poll_interval().as_secs()
        )?;
        writeln!(
            out,
            "  markdown: {}",
            if self.markdown() { "on" } else { "off" }
        )
    }
}
