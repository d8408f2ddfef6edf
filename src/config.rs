use dotenvy::dotenv;
use std::{env, fs, io, net::SocketAddr, path::PathBuf};
use thiserror::Error;

/// Upload limits handed to [`SlideAsset::create`](crate::asset::SlideAsset::create).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum byte length of an asset's display file name.
    pub slide_asset_name_max_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            slide_asset_name_max_len: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Memory,
    Local,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
    #[error("Could not prepare asset directory {}: {source}", path.display())]
    AssetDir { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub auth_token: String,
    pub storage_type: StorageType,
    pub asset_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub limits: Limits,
    pub log_level: tracing::Level,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let auth_token = lookup("AUTH_TOKEN")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("AUTH_TOKEN"))?;

        let storage_type = match lookup("STORAGE_TYPE").as_deref() {
            None | Some("memory") => StorageType::Memory,
            Some("local") => StorageType::Local,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_TYPE",
                    value: other.to_string(),
                });
            }
        };

        let limits = match lookup("SLIDE_ASSET_NAME_MAX_LEN") {
            Some(value) => Limits {
                slide_asset_name_max_len: parse("SLIDE_ASSET_NAME_MAX_LEN", value)?,
            },
            None => Limits::default(),
        };

        Ok(Self {
            auth_token,
            storage_type,
            asset_path: lookup("ASSET_PATH")
                .unwrap_or_else(|| "./assets".to_string())
                .into(),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse("PORT", lookup("PORT").unwrap_or_else(|| "8080".to_string()))?,
            limits,
            log_level: parse(
                "LOG_LEVEL",
                lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            )?,
        })
    }

    /// Create the asset directory and make its path absolute, so stored
    /// asset paths do not depend on the working directory.
    pub fn resolve_asset_path(&mut self) -> Result<(), ConfigError> {
        let resolved = fs::create_dir_all(&self.asset_path)
            .and_then(|()| fs::canonicalize(&self.asset_path))
            .map_err(|source| ConfigError::AssetDir {
                path: self.asset_path.clone(),
                source,
            })?;
        self.asset_path = resolved;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::Invalid {
            name: "HOST",
            value: addr,
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
