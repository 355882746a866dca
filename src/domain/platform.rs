use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app::ScoutError;

/// Source site a job targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Fanqie,
    Qidian,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Fanqie, Platform::Qidian];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Fanqie => "fanqie",
            Platform::Qidian => "qidian",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fanqie" => Ok(Platform::Fanqie),
            "qidian" => Ok(Platform::Qidian),
            other => Err(ScoutError::Configuration(format!(
                "unsupported platform: {other:?} (expected one of: fanqie, qidian)"
            ))),
        }
    }
}
