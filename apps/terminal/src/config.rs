use std::{fs, io::ErrorKind, path::Path, str::FromStr};

use anyhow::{bail, Context};
use clap::ValueEnum;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// HTTP scoring service at `service_url`.
    Remote,
    /// Built-in demo players kept in memory.
    Memory,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "memory" | "mock" => Ok(Self::Memory),
            other => bail!("unknown backend '{other}' (expected 'remote' or 'memory')"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub service_url: Option<String>,
    pub backend: Backend,
    pub reveal_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: None,
            backend: Backend::Remote,
            reveal_delay_ms: 1500,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    service_url: Option<String>,
    backend: Option<String>,
    reveal_delay_ms: Option<u64>,
}

/// Defaults, then the TOML file at `path` if it exists, then environment.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to read settings from '{}'", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to open '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.service_url {
        settings.service_url = Some(v);
    }
    if let Some(v) = file_cfg.backend {
        settings.backend = v.parse()?;
    }
    if let Some(v) = file_cfg.reveal_delay_ms {
        settings.reveal_delay_ms = v;
    }
    Ok(())
}

fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("DICE_SERVICE_URL") {
        settings.service_url = Some(v);
    }
    if let Some(v) = lookup("APP__SERVICE_URL") {
        settings.service_url = Some(v);
    }

    if let Some(v) = lookup("APP__BACKEND") {
        settings.backend = v.parse()?;
    }

    if let Some(v) = lookup("APP__REVEAL_DELAY_MS") {
        settings.reveal_delay_ms = v
            .trim()
            .parse()
            .with_context(|| format!("APP__REVEAL_DELAY_MS is not a number: '{v}'"))?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
