use std::{env::VarError, fmt::Display, str::FromStr};

use anyhow::anyhow;

pub const ENV_PROFILE: &str = "PROFILE";
pub const SERVER_PROFILE: &str = "server";
pub const CONSOLE_PROFILE: &str = "console";

/// Deployment mode selecting which logging preset is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Profile {
    /// JSON records, meant for log collectors.
    #[default]
    Server,
    /// Tab separated records, meant for a terminal.
    Console,
}

impl Profile {
    /// Reads `PROFILE` from the process environment.
    pub fn from_env() -> Self {
        Self::resolve(read_env().as_deref())
    }

    /// Maps a raw profile value to a profile. Only the exact console token selects
    /// [`Profile::Console`]; everything else, unset included, is [`Profile::Server`].
    pub fn resolve(value: Option<&str>) -> Self {
        match value {
            Some(CONSOLE_PROFILE) => Profile::Console,
            Some(SERVER_PROFILE) => Profile::Server,
            _ => Profile::default(),
        }
    }

    pub fn is_recognized(value: &str) -> bool {
        value.parse::<Profile>().is_ok()
    }
}

/// The raw `PROFILE` value. A value that isn't valid unicode is kept, lossily
/// converted, so it still counts as set but unrecognized.
pub(crate) fn read_env() -> Option<String> {
    env_value(std::env::var(ENV_PROFILE))
}

fn env_value(result: Result<String, VarError>) -> Option<String> {
    match result {
        Ok(value) => Some(value),
        Err(VarError::NotPresent) => None,
        Err(VarError::NotUnicode(raw)) => Some(raw.to_string_lossy().into_owned()),
    }
}

impl FromStr for Profile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            SERVER_PROFILE => Ok(Profile::Server),
            CONSOLE_PROFILE => Ok(Profile::Console),
            s => Err(anyhow!("unknown profile: {}", s)),
        }
    }
}

impl Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Profile::Server => write!(f, "{}", SERVER_PROFILE),
            Profile::Console => write!(f, "{}", CONSOLE_PROFILE),
        }
    }
}
