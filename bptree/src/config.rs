//! Shell configuration module.
//!
//! This module provides configuration loading for the `bptree` shell from
//! the command line and environment variables.
//!
//! # Sources
//!
//! - First command-line argument: path of the tree file
//! - `BPTREE_DATABASE_PATH`: tree file path when no argument is given
//! - `BPTREE_GROWTH_BATCH`: pages added per file growth (default: `1024`)
//!
//! # Invariants
//!
//! - `database_path` is never empty (the file may not exist yet)
//! - `growth_batch` is always at least 1

use std::path::PathBuf;

use crate::storage::DEFAULT_GROWTH_BATCH;

const DATABASE_PATH_VAR: &str = "BPTREE_DATABASE_PATH";
const GROWTH_BATCH_VAR: &str = "BPTREE_GROWTH_BATCH";

/// Shell configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Tree file to open or create.
    pub database_path: PathBuf,
    /// Pages added each time the free list runs out.
    pub growth_batch: u64,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither an argument nor `BPTREE_DATABASE_PATH` names a tree file.
    MissingDatabasePath,
    /// A setting has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDatabasePath => write!(
                f,
                "no tree file given (usage: bptree <file>, or set {DATABASE_PATH_VAR})"
            ),
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ShellConfig {
    /// Load configuration from the process arguments and environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(std::env::args().skip(1), |name| std::env::var(name).ok())
    }

    /// Load configuration from `args` (program name already skipped) and an
    /// environment lookup.
    pub fn load<I, F>(args: I, env: F) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let database_path = args
            .into_iter()
            .next()
            .or_else(|| env(DATABASE_PATH_VAR))
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingDatabasePath)?;

        let growth_batch = match env(GROWTH_BATCH_VAR) {
            Some(value) => parse_growth_batch(&value)?,
            None => DEFAULT_GROWTH_BATCH,
        };

        Ok(Self {
            database_path,
            growth_batch,
        })
    }
}

fn parse_growth_batch(value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(batch) if batch > 0 => Ok(batch),
        _ => Err(ConfigError::InvalidValue {
            name: GROWTH_BATCH_VAR.to_string(),
            message: format!("'{value}' is not a positive page count"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_argument_path_and_defaults() {
        let config = ShellConfig::load(args(&["tree.db"]), env_from(&[])).expect("load");

        assert_eq!(config.database_path, PathBuf::from("tree.db"));
        assert_eq!(config.growth_batch, DEFAULT_GROWTH_BATCH);
    }

    #[test]
    fn test_argument_wins_over_env() {
        let env = env_from(&[(DATABASE_PATH_VAR, "env.db")]);
        let config = ShellConfig::load(args(&["arg.db"]), env).expect("load");
        assert_eq!(config.database_path, PathBuf::from("arg.db"));
    }

    #[test]
    fn test_env_path_and_growth_batch() {
        let env = env_from(&[(DATABASE_PATH_VAR, "/tmp/x.db"), (GROWTH_BATCH_VAR, "8")]);
        let config = ShellConfig::load(args(&[]), env).expect("load");

        assert_eq!(config.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.growth_batch, 8);
    }

    #[test]
    fn test_missing_path() {
        let result = ShellConfig::load(args(&[]), env_from(&[]));
        assert_eq!(result, Err(ConfigError::MissingDatabasePath));

        let result = ShellConfig::load(args(&[""]), env_from(&[]));
        assert_eq!(result, Err(ConfigError::MissingDatabasePath));
    }

    #[test]
    fn test_invalid_growth_batch() {
        for bad in ["0", "-3", "lots"] {
            let env = env_from(&[(GROWTH_BATCH_VAR, bad)]);
            let result = ShellConfig::load(args(&["t.db"]), env);
            assert!(
                matches!(result, Err(ConfigError::InvalidValue { ref name, .. }) if name == GROWTH_BATCH_VAR),
                "value {bad:?} should be rejected"
            );
        }
    }
}
