//! Required inputs: certificate paths and JSON documents on local disk.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::error;

use crate::error::{IntegError, IntegResult};

/// Path to the CA certificate etcdctl trusts.
pub const CACERT_VAR: &str = "ETCDCTL_CACERT";
/// Path to the client certificate etcdctl presents.
pub const CERT_VAR: &str = "ETCDCTL_CERT";
/// Path to the client certificate's private key.
pub const KEY_VAR: &str = "ETCDCTL_KEY";

/// Fails unless `path` is set and names an existing regular file.
///
/// `name` is only used for the error message.
pub fn check_path_variable(name: &str, path: Option<&Path>) -> IntegResult<()> {
    let Some(path) = path else {
        error!("Variable {name} is not set");
        return Err(IntegError::VariableNotSet(name.to_string()));
    };
    if !path.is_file() {
        error!(
            "Variable {name} doesn't represent an existing file: {}",
            path.display()
        );
        return Err(IntegError::NotAFile {
            name: name.to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// The TLS material etcdctl picks up from its environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsPaths {
    pub ca_cert: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

impl TlsPaths {
    /// Reads the three certificate variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    /// Reads the three certificate variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        Self {
            ca_cert: lookup(CACERT_VAR).map(PathBuf::from),
            cert: lookup(CERT_VAR).map(PathBuf::from),
            key: lookup(KEY_VAR).map(PathBuf::from),
        }
    }

    /// Checks CA cert, client cert, then client key; stops at the first bad one.
    pub fn validate(&self) -> IntegResult<()> {
        check_path_variable(CACERT_VAR, self.ca_cert.as_deref())?;
        check_path_variable(CERT_VAR, self.cert.as_deref())?;
        check_path_variable(KEY_VAR, self.key.as_deref())
    }
}

/// Reads and parses a JSON file.
pub fn load_json(path: &Path) -> IntegResult<Value> {
    let text = fs::read_to_string(path).map_err(|source| {
        error!(
            "I/O error occurred during loading of {} json file: {source}",
            path.display()
        );
        IntegError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;
    serde_json::from_str(&text).map_err(|source| {
        error!("Failed to parse {} json file: {source}", path.display());
        IntegError::InvalidJson {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn unset_variable_is_config_error() {
        let err = check_path_variable(CERT_VAR, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigError);
        assert!(matches!(err, IntegError::VariableNotSet(ref n) if n == CERT_VAR));
    }

    #[test]
    fn missing_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.pem");
        let err = check_path_variable(KEY_VAR, Some(&path)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigError);
    }

    #[test]
    fn directory_is_not_a_file() {
        let temp = TempDir::new().unwrap();
        let err = check_path_variable(CACERT_VAR, Some(temp.path())).unwrap_err();
        assert!(matches!(err, IntegError::NotAFile { .. }));
    }

    #[test]
    fn regular_file_passes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ca.pem");
        fs::write(&path, "pem").unwrap();
        check_path_variable(CACERT_VAR, Some(&path)).unwrap();
    }

    #[test]
    fn tls_paths_validate_in_order() {
        let temp = TempDir::new().unwrap();
        let ca = temp.path().join("ca.pem");
        fs::write(&ca, "pem").unwrap();
        let vars: HashMap<&str, OsString> = HashMap::from([(CACERT_VAR, ca.into_os_string())]);
        let tls = TlsPaths::from_lookup(|name| vars.get(name).cloned());

        let err = tls.validate().unwrap_err();
        assert!(matches!(err, IntegError::VariableNotSet(ref n) if n == CERT_VAR));
    }

    #[test]
    fn load_json_reads_object() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"b": 1, "a": 2}"#).unwrap();
        let doc = load_json(&path).unwrap();
        let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn load_json_keeps_numbers_as_written() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"id": 123456789012345678901234567890, "t": 1.50}"#).unwrap();
        let doc = load_json(&path).unwrap();
        assert_eq!(doc["id"].to_string(), "123456789012345678901234567890");
        assert_eq!(doc["t"].to_string(), "1.50");
    }

    #[test]
    fn load_json_missing_file_is_filesystem_error() {
        let temp = TempDir::new().unwrap();
        let err = load_json(&temp.path().join("nope.json")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileSystemError);
    }

    #[test]
    fn load_json_malformed_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let err = load_json(&path).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigError);
    }
}
