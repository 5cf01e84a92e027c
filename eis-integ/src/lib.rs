//! etcd and Kubernetes integration for EIS application provisioning.
//!
//! This crate drives the `etcdctl` and `kubectl` command-line tools to:
//! - discover the etcd client endpoint from the cluster's service list
//! - generate and store per-application ZeroMQ CURVE key pairs
//! - create and remove per-application etcd users and roles
//! - push and remove JSON configuration
//!
//! # Error model
//!
//! Operations return [`IntegResult`]. Every [`IntegError`] maps to an
//! [`ErrorCode`] whose numeric value is the process exit status of the
//! command-line tools. [`provision::read_config`] and
//! [`provision::remove_key_prefix`] are the exception: they panic on failure.

pub mod config;
mod error;
pub mod etcd;
pub mod keys;
pub mod keyspace;
pub mod kube;
pub mod logging;
pub mod provision;
pub mod runner;

pub use config::{check_path_variable, load_json, TlsPaths};
pub use error::{ErrorCode, IntegError, IntegResult};
pub use etcd::{EtcdConfig, Etcdctl, Permission};
pub use keys::CurveKeyPair;
pub use kube::{ClusterConfig, Kubectl};
pub use logging::{init_logging, LogConfig, LogHandle, DEFAULT_LOG_PATH};
pub use runner::{CommandOutput, CommandRunner, Invocation, SystemRunner};
