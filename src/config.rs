//! Session configuration.

use crate::mi::correlator::Correlator;
use crate::mi::decode::Encoding;
use crate::mi::error::Error;
use crate::mi::parser::Parser;
use crate::mi::session::{Session, SessionHooks, DEFAULT_PROMPT};
use crate::mi::transport::{FileTracer, TrafficLog};
use crate::{mi_error, muted_error, weak_error};
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Line the backend prints when ready for input.
    pub prompt: String,
    /// Encoding of file names reported by the backend.
    pub encoding: Encoding,
    /// Traffic log file.
    pub log_file: Option<PathBuf>,
    /// Write incoming lines to the traffic log too, not only outgoing commands.
    pub trace: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            encoding: Encoding::default(),
            log_file: None,
            trace: true,
        }
    }
}

impl SessionConfig {
    const DEFAULT_PATH: &'static str = ".config/mitap/config.toml";

    pub fn parse(data: &str) -> Result<Self, Error> {
        Ok(toml::de::from_str(data)?)
    }

    /// Load config from file, `None` means the default location in home directory.
    /// Defaults are used if the file is missing or invalid.
    pub fn from_file(path: Option<&Path>) -> Self {
        let data = match path {
            None => {
                let Some(home) = home::home_dir() else {
                    return Self::default();
                };
                match muted_error!(read_to_string(home.join(Self::DEFAULT_PATH))) {
                    Some(data) => data,
                    None => return Self::default(),
                }
            }
            Some(path) => match read_to_string(path) {
                Ok(data) => data,
                Err(err) => {
                    mi_error!("Error while load config file {}: {err}", path.display());
                    return Self::default();
                }
            },
        };

        weak_error!(Self::parse(&data), "invalid config:").unwrap_or_default()
    }

    /// Open the traffic log, if configured.
    pub fn traffic_log(&self) -> anyhow::Result<Option<Arc<dyn TrafficLog>>> {
        let Some(path) = &self.log_file else {
            return Ok(None);
        };
        let tracer: Arc<dyn TrafficLog> = Arc::new(FileTracer::new(path)?);
        Ok(Some(tracer))
    }

    /// Build a session around `correlator` according to this config.
    pub fn build_session<H: SessionHooks>(
        &self,
        mut correlator: Correlator,
        hooks: H,
    ) -> anyhow::Result<Session<H>> {
        if let Some(traffic) = self.traffic_log()? {
            correlator = correlator.with_traffic_log(traffic);
        }
        let parser = Parser::new(Arc::new(self.encoding));
        Ok(Session::new(Arc::new(correlator), parser, hooks)
            .with_prompt(self.prompt.clone())
            .with_trace(self.trace))
    }
}
