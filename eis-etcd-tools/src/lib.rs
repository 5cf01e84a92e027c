//! Command-line front ends for EIS etcd provisioning.
//!
//! Both tools share one startup sequence: discover the etcd endpoint from the
//! cluster, point every etcdctl call at it, and require the TLS material
//! etcdctl needs. See [`connect`].

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use eis_integ::provision::{self, StoredKeys};
use eis_integ::{
    load_json, ClusterConfig, CommandRunner, EtcdConfig, Etcdctl, IntegResult, Kubectl,
    LogConfig, TlsPaths, DEFAULT_LOG_PATH,
};
use tracing::info;

/// Options shared by every tool.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionArgs {
    /// Log file path
    #[arg(long, global = true, default_value = DEFAULT_LOG_PATH)]
    pub log_file: PathBuf,

    /// etcdctl executable
    #[arg(long, global = true, env = "EIS_ETCDCTL", hide = true)]
    pub etcdctl: Option<String>,

    /// kubectl executable
    #[arg(long, global = true, env = "EIS_KUBECTL", hide = true)]
    pub kubectl: Option<String>,

    /// Namespace of the etcd service
    #[arg(long, global = true, hide = true)]
    pub namespace: Option<String>,

    /// Name of the etcd service
    #[arg(long, global = true, hide = true)]
    pub service: Option<String>,

    /// Name of the etcd client port
    #[arg(long, global = true, hide = true)]
    pub port_name: Option<String>,
}

impl ConnectionArgs {
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            path: self.log_file.clone(),
            ..LogConfig::default()
        }
    }

    pub fn cluster_config(&self) -> ClusterConfig {
        let mut config = ClusterConfig::default();
        if let Some(binary) = &self.kubectl {
            config.binary = binary.clone();
        }
        if let Some(namespace) = &self.namespace {
            config.namespace = namespace.clone();
        }
        if let Some(service) = &self.service {
            config.service = service.clone();
        }
        if let Some(port_name) = &self.port_name {
            config.port_name = port_name.clone();
        }
        config
    }

    pub fn etcd_config(&self) -> EtcdConfig {
        let mut config = EtcdConfig::default();
        if let Some(binary) = &self.etcdctl {
            config.binary = binary.clone();
        }
        config
    }
}

/// Resolves the etcd endpoint and validates the TLS paths, in that order.
///
/// The returned client exports `ETCDCTL_ENDPOINTS=https://<ip>:<port>` to
/// every etcdctl call it makes.
pub fn connect<R: CommandRunner + Clone>(
    runner: R,
    args: &ConnectionArgs,
    tls: &TlsPaths,
) -> IntegResult<Etcdctl<R>> {
    let kube = Kubectl::with_runner(runner.clone(), args.cluster_config());
    let endpoint = kube.extract_etcd_endpoint()?;

    let mut etcd = Etcdctl::with_runner(runner, args.etcd_config());
    etcd.set_endpoints(format!("https://{endpoint}"));

    tls.validate()?;
    Ok(etcd)
}

// ── etcd-zmq-key ────────────────────────────────────────────────

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "etcd-zmq-key")]
#[command(about = "Generate ZMQ keys for an application and put them into etcd")]
pub struct ZmqKeyArgs {
    /// Name of the client application
    pub app: String,

    /// Put newly generated ZMQ keys without checking if they already exist
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// What [`ensure_zmq_keys`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Generated(StoredKeys),
    Skipped,
}

/// Generates and stores a key pair for `app` unless one exists.
///
/// With `force`, the existence check is skipped and keys are always replaced.
pub fn ensure_zmq_keys<R: CommandRunner>(
    etcd: &Etcdctl<R>,
    app: &str,
    force: bool,
) -> IntegResult<KeyOutcome> {
    let exists = if force {
        false
    } else {
        info!("Check if ZMQ key pair for {app} app already exists");
        provision::check_zmq_keys(etcd, app)?
    };

    if exists {
        info!("ZMQ pair keys generation skipped for {app} app");
        return Ok(KeyOutcome::Skipped);
    }

    info!("Generate ZMQ pair keys for {app} and put them to the etcd database");
    Ok(KeyOutcome::Generated(provision::put_zmq_keys(etcd, app)))
}

/// The whole `etcd-zmq-key` run after logging is up.
pub fn run_zmq_key<R: CommandRunner + Clone>(
    args: &ZmqKeyArgs,
    runner: R,
    tls: &TlsPaths,
) -> IntegResult<KeyOutcome> {
    let etcd = connect(runner, &args.connection, tls)?;
    ensure_zmq_keys(&etcd, &args.app, args.force)
}

// ── eis-etcd ────────────────────────────────────────────────────

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "eis-etcd")]
#[command(about = "Manage EIS application configuration and credentials in etcd")]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommand,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// Put every top-level field of a JSON file into etcd
    PutJson { file: PathBuf },

    /// Put a single key
    Put { key: String, value: String },

    /// Create a user and a scoped role for each application
    CreateUser {
        #[arg(required = true)]
        apps: Vec<String>,
    },

    /// Create the root user and enable authentication
    EnableAuth {
        /// Password for the root user
        #[arg(long, env = "ETCD_ROOT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Print every key under a prefix
    Read { client: String },

    /// Report whether an application's ZMQ key pair exists
    CheckKeys { app: String },

    /// Remove a single key
    RemoveKey { key: String },

    /// Remove a key and everything under it
    RemovePrefix { key: String },

    /// Remove an application's config, role and user
    RemoveApp {
        app: String,

        /// Also remove the application's ZMQ key pair
        #[arg(long)]
        delete_keys: bool,
    },
}

impl AdminCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PutJson { .. } => "put-json",
            Self::Put { .. } => "put",
            Self::CreateUser { .. } => "create-user",
            Self::EnableAuth { .. } => "enable-auth",
            Self::Read { .. } => "read",
            Self::CheckKeys { .. } => "check-keys",
            Self::RemoveKey { .. } => "remove-key",
            Self::RemovePrefix { .. } => "remove-prefix",
            Self::RemoveApp { .. } => "remove-app",
        }
    }
}

/// Runs one administrative command against a connected client.
pub fn execute<R: CommandRunner>(etcd: &Etcdctl<R>, command: &AdminCommand) -> IntegResult<()> {
    match command {
        AdminCommand::PutJson { file } => provision::put_json(etcd, &load_json(file)?),
        AdminCommand::Put { key, value } => provision::put_key(etcd, key, value),
        AdminCommand::CreateUser { apps } => apps
            .iter()
            .try_for_each(|app| provision::create_app_identity(etcd, app)),
        AdminCommand::EnableAuth { password } => provision::enable_auth(etcd, password),
        AdminCommand::Read { client } => {
            provision::read_config(etcd, client);
            Ok(())
        }
        AdminCommand::CheckKeys { app } => {
            let exists = provision::check_zmq_keys(etcd, app)?;
            info!("ZMQ key pair for {app} app exists: {exists}");
            println!("{exists}");
            Ok(())
        }
        AdminCommand::RemoveKey { key } => provision::remove_key(etcd, key),
        AdminCommand::RemovePrefix { key } => {
            provision::remove_key_prefix(etcd, key);
            Ok(())
        }
        AdminCommand::RemoveApp { app, delete_keys } => {
            provision::remove_app(etcd, app, *delete_keys)
        }
    }
}

/// The whole `eis-etcd` run after logging is up.
pub fn run_admin<R: CommandRunner + Clone>(
    args: &AdminArgs,
    runner: R,
    tls: &TlsPaths,
) -> IntegResult<()> {
    let etcd = connect(runner, &args.connection, tls)?;
    execute(&etcd, &args.command)
}
