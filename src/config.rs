// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

use std::env;
use std::fs;

use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};
use serde_yaml;

/// Environment variable naming the configuration file, consulted when
/// the initialization arguments do not carry a path
pub const CONFIG_ENV_VARIABLE: &str = "KMS_PKCS11_CONFIG";

/// One virtual token, bound to a remote key ring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    /// Full resource name of the key ring backing this token
    pub key_ring: String,
    /// Token label reported through CK_TOKEN_INFO
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub tokens: Vec<TokenConfig>,
    pub kms_endpoint: String,
    #[serde(default)]
    pub generate_certs: bool,
    #[serde(default)]
    pub use_insecure_grpc_channel_credentials: bool,
}

impl Config {
    /// Resolves the configuration path: an explicit path from the
    /// initialization arguments wins, then the environment variable
    pub fn resolve_path(init_path: Option<&str>) -> Result<String> {
        if let Some(path) = init_path {
            return Ok(path.to_string());
        }
        match env::var(CONFIG_ENV_VARIABLE) {
            Ok(path) => Ok(path),
            Err(_) => Err(Error::failed_precondition(format!(
                "no configuration path provided and {} is not set",
                CONFIG_ENV_VARIABLE
            ))
            .with_rv(crate::pkcs11::CKR_ARGUMENTS_BAD)),
        }
    }

    /// Loads and validates the configuration document
    pub fn from_file(path: &str) -> Result<Config> {
        check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            Error::failed_precondition(format!(
                "cannot read configuration file {}: {}",
                path, e
            ))
        })?;
        let conf: Config = serde_yaml::from_str(&content).map_err(|e| {
            Error::failed_precondition(format!(
                "malformed configuration file {}: {}",
                path, e
            ))
        })?;
        conf.validate()?;
        Ok(conf)
    }

    fn validate(&self) -> Result<()> {
        if self.kms_endpoint.is_empty() {
            return Err(Error::failed_precondition(
                "kms_endpoint must be set",
            ));
        }
        if self.tokens.is_empty() {
            return Err(Error::failed_precondition(
                "at least one token must be configured",
            ));
        }
        Ok(())
    }
}

/// The configuration file must not be writable by group or other.
#[cfg(unix)]
fn check_permissions(path: &str) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let meta = fs::metadata(path).map_err(|e| {
        Error::failed_precondition(format!(
            "cannot stat configuration file {}: {}",
            path, e
        ))
    })?;
    let mode = meta.permissions().mode();
    if mode & 0o022 != 0 {
        return Err(Error::failed_precondition(format!(
            "configuration file {} is group or world writable (mode {:o})",
            path, mode
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &str) -> Result<()> {
    Ok(())
}
