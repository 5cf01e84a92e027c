//! Generate a ZMQ CURVE key pair for an application and put it into etcd.
//!
//! Usage:
//!   etcd-zmq-key <app> [--force]
//!
//! The etcd endpoint is discovered from the cluster; `ETCDCTL_CACERT`,
//! `ETCDCTL_CERT` and `ETCDCTL_KEY` must name existing files. The exit status
//! is 0 on success, 1 if an external command failed, 2 on a configuration
//! error and 3 on a filesystem error.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use eis_etcd_tools::{run_zmq_key, ZmqKeyArgs};
use eis_integ::{init_logging, ErrorCode, SystemRunner, TlsPaths};
use tracing::error;

fn main() -> Result<ExitCode> {
    let args = ZmqKeyArgs::parse();
    let _logging =
        init_logging(&args.connection.log_config()).context("Failed to initialize logging")?;

    let code = match run_zmq_key(&args, SystemRunner, &TlsPaths::from_env()) {
        Ok(_) => ErrorCode::NoError,
        Err(err) => {
            error!("Error while generating ZMQ keys: {err}");
            err.code()
        }
    };
    Ok(ExitCode::from(code.value()))
}
