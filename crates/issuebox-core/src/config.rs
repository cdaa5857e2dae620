//! Configuration for issuebox
//!
//! Read from a TOML file, by default `<config dir>/issuebox/config.toml`.

use crate::issue::User;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// issuebox configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the API server binds to
    pub host: String,

    /// Port the API server listens on
    pub port: u16,

    /// Users seeded into the store at startup
    pub users: Vec<User>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            users: default_users(),
        }
    }
}

/// The fixed user table every fresh store starts with
pub fn default_users() -> Vec<User> {
    vec![
        User::new(1, "김개발"),
        User::new(2, "이디자인"),
        User::new(3, "박기획"),
    ]
}

impl Config {
    /// Default location of the config file, if the platform has one
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("issuebox").join("config.toml"))
    }

    /// Load config from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate config from TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the seed user table: non-empty, positive and unique ids
    pub fn validate(&self) -> crate::Result<()> {
        if self.users.is_empty() {
            return Err(crate::Error::Config("at least one user is required".into()));
        }

        let mut seen = HashSet::new();
        for user in &self.users {
            if user.id == 0 {
                return Err(crate::Error::Config(format!(
                    "user '{}' has id 0; ids must be positive",
                    user.name
                )));
            }
            if !seen.insert(user.id) {
                return Err(crate::Error::Config(format!(
                    "duplicate user id {}",
                    user.id
                )));
            }
        }
        Ok(())
    }

    /// Generate a default config file with comments
    pub fn default_with_comments() -> String {
        let mut out = String::from(
            r#"# issuebox configuration

# Address the API server binds to
host = "127.0.0.1"

# Port the API server listens on
port = 8080

# Users available as assignees. Ids must be positive and unique.
# The table is fixed for the lifetime of the process.
"#,
        );
        for user in default_users() {
            out.push_str(&format!(
                "\n[[users]]\nid = {}\nname = \"{}\"\n",
                user.id, user.name
            ));
        }
        out
    }
}
