use std::{env, str::FromStr};

use thiserror::Error;

use crate::{chunk::DEFAULT_MAX_CHUNK_SIZE, compression::Compression};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 12201;

pub const HOST_VAR: &str = "GELF_HOST";
pub const PORT_VAR: &str = "GELF_PORT";
pub const MAX_CHUNK_SIZE_VAR: &str = "GELF_MAX_CHUNK_SIZE";
pub const COMPRESSION_VAR: &str = "GELF_COMPRESSION";
pub const SOURCE_HOST_VAR: &str = "GELF_SOURCE_HOST";

/// Recognised handler options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Destination hostname or IP.
    pub host: String,
    /// Destination UDP port.
    pub port: u16,
    /// Largest datagram sent.
    pub max_chunk_size: usize,
    pub compression: Compression,
    /// `host` of messages that carry none. The local hostname when unset.
    pub source_host: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            compression: Compression::None,
            source_host: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {name} is not valid unicode")]
    NotUnicode { name: &'static str },
    #[error("environment variable {name} has invalid value `{value}`: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl Config {
    /// Read the `GELF_*` environment variables over the defaults. Empty variables are ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut not_unicode = None;
        let config = Config::from_lookup(|name| match env::var(name) {
            Ok(value) => Some(value),
            Err(env::VarError::NotPresent) => None,
            Err(env::VarError::NotUnicode(_)) => {
                if not_unicode.is_none() {
                    not_unicode = Some(name);
                }
                None
            }
        });
        match not_unicode {
            Some(name) => Err(ConfigError::NotUnicode { name }),
            None => config,
        }
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&'static str) -> Option<String>,
    {
        let mut config = Config::default();

        read(&mut lookup, HOST_VAR, &mut config.host)?;
        read(&mut lookup, PORT_VAR, &mut config.port)?;
        read(&mut lookup, MAX_CHUNK_SIZE_VAR, &mut config.max_chunk_size)?;
        read(&mut lookup, COMPRESSION_VAR, &mut config.compression)?;

        let mut source_host = String::new();
        read(&mut lookup, SOURCE_HOST_VAR, &mut source_host)?;
        if !source_host.is_empty() {
            config.source_host = Some(source_host);
        }

        Ok(config)
    }
}

fn read<F, T>(lookup: &mut F, name: &'static str, into: &mut T) -> Result<(), ConfigError>
where
    F: FnMut(&'static str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        // The variable is unset or empty
        None => Ok(()),
        Some(value) if value.trim().is_empty() => Ok(()),
        Some(value) => {
            *into = value.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
                name,
                reason: err.to_string(),
                value,
            })?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&'static str, &str)]) -> impl FnMut(&'static str) -> Option<String> {
        let vars: HashMap<_, _> = vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_chunk_size, 1420);
        assert_eq!(config.port, 12201);
    }

    #[test]
    fn reads_every_variable() {
        let config = Config::from_lookup(lookup(&[
            (HOST_VAR, "graylog.internal"),
            (PORT_VAR, "12202"),
            (MAX_CHUNK_SIZE_VAR, "8192"),
            (COMPRESSION_VAR, "gzip"),
            (SOURCE_HOST_VAR, "worker-3"),
        ]))
        .unwrap();

        assert_eq!(config.host, "graylog.internal");
        assert_eq!(config.port, 12202);
        assert_eq!(config.max_chunk_size, 8192);
        assert_eq!(config.compression, Compression::Gzip);
        assert_eq!(config.source_host.as_deref(), Some("worker-3"));
    }

    #[test]
    fn empty_values_keep_defaults() {
        let config = Config::from_lookup(lookup(&[(PORT_VAR, ""), (SOURCE_HOST_VAR, " ")])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.source_host, None);
    }

    #[test]
    fn invalid_port() {
        let err = Config::from_lookup(lookup(&[(PORT_VAR, "70000")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: PORT_VAR, .. }));
    }

    #[test]
    fn invalid_compression() {
        let err = Config::from_lookup(lookup(&[(COMPRESSION_VAR, "brotli")])).unwrap_err();
        assert!(err.to_string().contains("brotli"));
    }
}
