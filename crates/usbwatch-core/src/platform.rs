// ── Host platform ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Operating system family whose commands and output grammars apply.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Platform {
    Linux,
    #[strum(to_string = "macos", serialize = "darwin")]
    #[serde(rename = "macos", alias = "darwin")]
    MacOs,
    Windows,
}

impl Platform {
    /// Platform of the compile target. Unknown unix-likes use the Linux grammar.
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    /// Separator appended to resolved mount paths.
    pub fn path_separator(self) -> char {
        match self {
            Self::Windows => '\\',
            Self::Linux | Self::MacOs => '/',
        }
    }
}
