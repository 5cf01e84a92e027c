//! Application provisioning operations.
//!
//! Each function is one step an operator runs against etcd: store or check
//! ZMQ keys, create or remove an application's user and role, push or remove
//! configuration. Failures are logged with the key, user or application they
//! concern before being returned.
//!
//! Multi-step operations stop at the first failure and never roll back what
//! already succeeded.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::error::{IntegError, IntegResult};
use crate::etcd::{Etcdctl, Permission};
use crate::keys::CurveKeyPair;
use crate::keyspace::{
    app_prefix, config_path, datastore_prefix, private_key_path, public_key_path,
    GLOBAL_ENV_PREFIX, PUBLIC_KEYS_PREFIX,
};
use crate::runner::CommandRunner;

/// Which halves of a freshly generated key pair reached etcd.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredKeys {
    pub public: bool,
    pub private: bool,
}

impl StoredKeys {
    pub fn complete(&self) -> bool {
        self.public && self.private
    }
}

/// Generates a CURVE key pair for `app` and stores both halves.
///
/// The two writes are independent: a failed public-key write is logged and
/// the private key is still attempted. This function itself never fails.
pub fn put_zmq_keys<R: CommandRunner>(etcd: &Etcdctl<R>, app: &str) -> StoredKeys {
    let keys = CurveKeyPair::generate();

    let public = etcd.put(&public_key_path(app), keys.public());
    if let Err(err) = &public {
        error!("Error putting Etcd public key for {app}: {err}");
    }

    let private = etcd.put(&private_key_path(app), keys.secret());
    if let Err(err) = &private {
        error!("Error putting Etcd private key for {app}: {err}");
    }

    StoredKeys {
        public: public.is_ok(),
        private: private.is_ok(),
    }
}

/// Returns true if etcdctl printed something for both halves of `app`'s key pair.
pub fn check_zmq_keys<R: CommandRunner>(etcd: &Etcdctl<R>, app: &str) -> IntegResult<bool> {
    let public = etcd.get(&public_key_path(app)).inspect_err(|err| {
        error!("Error returned while getting the public key for {app} app from etcd: {err}");
    })?;
    let private = etcd.get(&private_key_path(app)).inspect_err(|err| {
        error!("Error returned while getting the private key for {app} app from etcd: {err}");
    })?;
    Ok(!public.is_empty() && !private.is_empty())
}

/// Removes both halves of `app`'s key pair, private key first.
pub fn remove_zmq_keys<R: CommandRunner>(etcd: &Etcdctl<R>, app: &str) -> IntegResult<()> {
    remove_key(etcd, &private_key_path(app))?;
    remove_key(etcd, &public_key_path(app))
}

/// Creates the `root` user and role, then turns on cluster authentication.
pub fn enable_auth<R: CommandRunner>(etcd: &Etcdctl<R>, password: &str) -> IntegResult<()> {
    let steps = || -> IntegResult<()> {
        etcd.user_add("root", Some(password))?;
        etcd.role_add("root")?;
        etcd.user_grant_role("root", "root")?;
        etcd.auth_enable()
    };
    steps().inspect_err(|err| error!("Error while enabling authentication: {err}"))?;
    info!("Authentication has been enabled.");
    Ok(())
}

/// Writes one key.
pub fn put_key<R: CommandRunner>(etcd: &Etcdctl<R>, key: &str, value: &str) -> IntegResult<()> {
    etcd.put(key, value).inspect_err(|err| {
        error!("Error returned while adding the {key} key to the etcd: {err}");
    })
}

/// Serializes a JSON value with four-space indentation.
pub fn to_indented_json(value: &Value) -> IntegResult<String> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Writes every top-level field of `document` as its own key, in document order.
///
/// Stops at the first failed write; earlier fields stay written.
pub fn put_json<R: CommandRunner>(etcd: &Etcdctl<R>, document: &Value) -> IntegResult<()> {
    let fields = as_object(document)?;
    for (key, value) in fields {
        put_key(etcd, key, &to_indented_json(value)?)?;
        info!("Value for the {key} key has been added to the etcd.");
    }
    Ok(())
}

fn as_object(document: &Value) -> IntegResult<&Map<String, Value>> {
    document.as_object().ok_or_else(|| {
        let kind = json_kind(document);
        error!("JSON document must be an object, got {kind}");
        IntegError::NotAnObject(kind)
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Creates a passwordless user and a same-named role for `app`.
///
/// The role can read `/{app}/`, read and write `/{app}/datastore`, and read
/// every public key and the global environment.
pub fn create_app_identity<R: CommandRunner>(etcd: &Etcdctl<R>, app: &str) -> IntegResult<()> {
    etcd.user_add(app, None)
        .inspect_err(|err| error!("Error while creating {app} user: {err}"))?;
    info!("User {app} has been created.");

    let role = || -> IntegResult<()> {
        etcd.role_add(app)?;
        etcd.user_grant_role(app, app)?;
        etcd.role_grant_prefix(app, Permission::Read, &app_prefix(app))?;
        etcd.role_grant_prefix(app, Permission::ReadWrite, &datastore_prefix(app))?;
        etcd.role_grant_prefix(app, Permission::Read, PUBLIC_KEYS_PREFIX)?;
        etcd.role_grant_prefix(app, Permission::Read, GLOBAL_ENV_PREFIX)
    };
    role().inspect_err(|err| error!("Error while creating {app} role: {err}"))?;
    info!("Role {app} has been created.");
    Ok(())
}

/// Prints every key under `client` to the terminal.
///
/// # Panics
///
/// Panics if etcdctl fails. This operation is meant to abort the whole
/// process rather than hand back a recoverable error.
pub fn read_config<R: CommandRunner>(etcd: &Etcdctl<R>, client: &str) {
    info!("Read the configuration from etcd");
    if let Err(err) = etcd.get_prefix_to_terminal(client) {
        error!("Reading the {client} configuration from etcd failed: {err}");
        panic!("reading {client} from etcd failed: {err}");
    }
}

/// Deletes exactly one key.
pub fn remove_key<R: CommandRunner>(etcd: &Etcdctl<R>, key: &str) -> IntegResult<()> {
    etcd.del(key).inspect_err(|err| {
        error!("Error returned while removing the {key} key from etcd: {err}");
    })
}

/// Deletes `key` and everything below it.
///
/// # Panics
///
/// Panics if etcdctl fails, like [`read_config`].
pub fn remove_key_prefix<R: CommandRunner>(etcd: &Etcdctl<R>, key: &str) {
    if let Err(err) = etcd.del_prefix_to_terminal(key) {
        error!("Removing the {key} prefix from etcd failed: {err}");
        panic!("removing {key} from etcd failed: {err}");
    }
}

/// Deletes a role.
pub fn remove_role<R: CommandRunner>(etcd: &Etcdctl<R>, name: &str) -> IntegResult<()> {
    etcd.role_delete(name)
        .inspect_err(|err| error!("Error returned while removing the {name} role: {err}"))?;
    info!("Role {name} has been removed.");
    Ok(())
}

/// Deletes a user.
pub fn remove_user<R: CommandRunner>(etcd: &Etcdctl<R>, name: &str) -> IntegResult<()> {
    etcd.user_delete(name)
        .inspect_err(|err| error!("Error returned while removing the {name} user: {err}"))?;
    info!("User {name} has been removed.");
    Ok(())
}

/// Deletes `/{app}/config`, and the key pair first when `delete_keys` is set.
pub fn remove_app_config<R: CommandRunner>(
    etcd: &Etcdctl<R>,
    app: &str,
    delete_keys: bool,
) -> IntegResult<()> {
    if delete_keys {
        remove_zmq_keys(etcd, app)?;
    }
    remove_key(etcd, &config_path(app))
}

/// Removes an application: config (and keys if asked), then role, then user.
///
/// A failure part-way leaves the earlier removals in place.
pub fn remove_app<R: CommandRunner>(
    etcd: &Etcdctl<R>,
    app: &str,
    delete_keys: bool,
) -> IntegResult<()> {
    remove_app_config(etcd, app, delete_keys)?;
    remove_role(etcd, app)?;
    remove_user(etcd, app)
}
