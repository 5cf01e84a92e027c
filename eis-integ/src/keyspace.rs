//! etcd key layout shared by every EIS application.
//!
//! Private data lives under `/{app}/`, public keys under `/Publickeys/`, and
//! deployment-wide settings under `/GlobalEnv/`. Existing deployments depend
//! on these exact strings.

/// Prefix holding every application's public key.
pub const PUBLIC_KEYS_PREFIX: &str = "/Publickeys/";

/// Prefix holding settings readable by every application.
pub const GLOBAL_ENV_PREFIX: &str = "/GlobalEnv/";

/// `/Publickeys/{app}`
pub fn public_key_path(app: &str) -> String {
    format!("{PUBLIC_KEYS_PREFIX}{app}")
}

/// `/{app}/private_key`
pub fn private_key_path(app: &str) -> String {
    format!("/{app}/private_key")
}

/// `/{app}/config`
pub fn config_path(app: &str) -> String {
    format!("/{app}/config")
}

/// `/{app}/`
pub fn app_prefix(app: &str) -> String {
    format!("/{app}/")
}

/// `/{app}/datastore`
pub fn datastore_prefix(app: &str) -> String {
    format!("/{app}/datastore")
}
