use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_MYSQL_PORT: &str = "3306";

/// Connection form for the MySQL target. Nothing here is ever dialed.
#[derive(Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub host: String,
    pub port: String,
    pub database: String,
    pub username: String,
    password: String,
}

impl TargetConfig {
    pub fn set(&mut self, field: TargetField, value: impl Into<String>) {
        let value = value.into();
        match field {
            TargetField::Host => self.host = value,
            TargetField::Port => self.port = value,
            TargetField::Database => self.database = value,
            TargetField::Username => self.username = value,
            TargetField::Password => self.password = value,
        }
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    pub fn masked_password(&self) -> String {
        "•".repeat(self.password.chars().count())
    }

    /// `host:port/database`, with placeholders for blank fields.
    pub fn display_target(&self) -> String {
        let host = if self.host.is_empty() { "localhost" } else { &self.host };
        let port = if self.port.is_empty() { DEFAULT_MYSQL_PORT } else { &self.port };
        let database = if self.database.is_empty() { "my_database" } else { &self.database };
        format!("{host}:{port}/{database}")
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_MYSQL_PORT.to_string(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
        }
    }
}

// Hand-written so the password never reaches a log line.
impl std::fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetField {
    Host,
    Port,
    Database,
    Username,
    Password,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown target field {0:?}")]
pub struct UnknownTargetField(pub String);

impl FromStr for TargetField {
    type Err = UnknownTargetField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(TargetField::Host),
            "port" => Ok(TargetField::Port),
            "database" | "db" => Ok(TargetField::Database),
            "username" | "user" => Ok(TargetField::Username),
            "password" => Ok(TargetField::Password),
            other => Err(UnknownTargetField(other.to_string())),
        }
    }
}
