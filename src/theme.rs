//! Light/dark colour themes for terminal output.

use crate::error::PyqError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// ANSI SGR parameter strings (the part between `\x1b[` and `m`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub heading: &'static str,
    pub accent: &'static str,
    pub muted: &'static str,
    pub active_tab: &'static str,
    pub inactive_tab: &'static str,
    pub error: &'static str,
}

const LIGHT: Palette = Palette {
    heading: "1;34",
    accent: "35",
    muted: "90",
    active_tab: "1;97;44",
    inactive_tab: "34",
    error: "1;31",
};

const DARK: Palette = Palette {
    heading: "1;96",
    accent: "93",
    muted: "2",
    active_tab: "1;30;106",
    inactive_tab: "96",
    error: "1;91",
};

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn palette(self) -> &'static Palette {
        match self {
            Theme::Light => &LIGHT,
            Theme::Dark => &DARK,
        }
    }
}

impl Palette {
    /// Wrap `s` in the given SGR code.
    pub fn paint(code: &str, s: &str) -> String {
        format!("\x1b[{code}m{s}\x1b[0m")
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

impl FromStr for Theme {
    type Err = PyqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(PyqError::InvalidConfig(format!(
                "Unknown theme '{other}' (expected 'light' or 'dark')"
            ))),
        }
    }
}
