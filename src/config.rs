use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SsError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub language: String,
    pub recursive: bool,
    pub skip: bool,
    pub mkv: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            recursive: false,
            skip: false,
            mkv: false,
        }
    }
}

/// On-disk layout: every setting lives in the `[ss]` table.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    ss: Configuration,
}

impl Configuration {
    /// Reads `path`; a missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, SsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|err| SsError::io(path, err))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, SsError> {
        toml::from_str::<ConfigFile>(raw)
            .map(|file| file.ss)
            .map_err(|err| SsError::Config(err.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, SsError> {
        toml::to_string(&ConfigFile { ss: self.clone() })
            .map_err(|err| SsError::Config(err.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), SsError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| SsError::io(parent, err))?;
        }
        fs::write(path, self.to_toml()?).map_err(|err| SsError::io(path, err))
    }

    /// Applies one `key=value` assignment, as given to `--set`.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<(), SsError> {
        let Some((key, value)) = assignment.split_once('=') else {
            return Err(SsError::Config(format!(
                "expected key=value, got '{assignment}'"
            )));
        };
        let value = value.trim();
        match key.trim() {
            "language" => {
                if value.is_empty() {
                    return Err(SsError::Config("language cannot be empty".to_string()));
                }
                self.language = value.to_string();
            }
            "recursive" => self.recursive = parse_bool(value)?,
            "skip" => self.skip = parse_bool(value)?,
            "mkv" => self.mkv = parse_bool(value)?,
            other => return Err(SsError::Config(format!("unknown setting '{other}'"))),
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Result<bool, SsError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Ok(true),
        "0" | "no" | "false" | "off" => Ok(false),
        _ => Err(SsError::Config(format!("not a boolean: '{raw}'"))),
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "language = {}", self.language)?;
        writeln!(f, "recursive = {}", self.recursive)?;
        writeln!(f, "skip = {}", self.skip)?;
        write!(f, "mkv = {}", self.mkv)
    }
}
