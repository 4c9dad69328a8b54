// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PollwatchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PollwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.watch, raw.command))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_watch_section(cfg)?;
    validate_command_section(cfg)?;
    Ok(())
}

fn validate_watch_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.concurrency == 0 {
        return Err(PollwatchError::Config(
            "[watch].concurrency must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(pos) = cfg.watch.patterns.iter().position(|p| p.trim().is_empty()) {
        return Err(PollwatchError::Config(format!(
            "[watch].patterns[{pos}] is empty"
        )));
    }

    Ok(())
}

fn validate_command_section(cfg: &RawConfigFile) -> Result<()> {
    // An absent command is fine here; it may come from the command line.
    if let Some(program) = cfg.command.run.first() {
        if program.trim().is_empty() {
            return Err(PollwatchError::Config(
                "[command].run must start with a program name".to_string(),
            ));
        }
    }
    Ok(())
}
