//! Administrative access to EIS application data in etcd.
//!
//! Usage:
//!   eis-etcd put-json <file>
//!   eis-etcd create-user <app>...
//!   eis-etcd remove-app <app> [--delete-keys]
//!
//! Run `eis-etcd --help` for the full list. Exit statuses match
//! `etcd-zmq-key`.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use eis_etcd_tools::{run_admin, AdminArgs};
use eis_integ::{init_logging, ErrorCode, SystemRunner, TlsPaths};
use tracing::error;

fn main() -> Result<ExitCode> {
    let args = AdminArgs::parse();
    let _logging =
        init_logging(&args.connection.log_config()).context("Failed to initialize logging")?;

    let code = match run_admin(&args, SystemRunner, &TlsPaths::from_env()) {
        Ok(()) => ErrorCode::NoError,
        Err(err) => {
            error!("Error while running {}: {err}", args.command.name());
            err.code()
        }
    };
    Ok(ExitCode::from(code.value()))
}
