//! Typed client over the `etcdctl` command-line tool.
//!
//! Each method issues exactly one `etcdctl` invocation. Methods do not log;
//! logging with operation context happens in [`crate::provision`].

use crate::error::IntegResult;
use crate::runner::{run_checked, run_passthrough, CommandRunner, Invocation, SystemRunner};

/// Environment variable etcdctl reads its endpoint list from.
pub const ENDPOINTS_VAR: &str = "ETCDCTL_ENDPOINTS";

/// Connection settings for etcdctl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtcdConfig {
    /// Program to execute.
    pub binary: String,
    /// Value exported as `ETCDCTL_ENDPOINTS` to every call, if set.
    pub endpoints: Option<String>,
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self {
            binary: "etcdctl".to_string(),
            endpoints: None,
        }
    }
}

/// Access level of a role permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    ReadWrite,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::ReadWrite => "readwrite",
        }
    }
}

/// etcdctl wrapper bound to one endpoint.
#[derive(Debug, Clone)]
pub struct Etcdctl<R = SystemRunner> {
    runner: R,
    config: EtcdConfig,
}

impl Etcdctl<SystemRunner> {
    /// Creates a client that runs the real etcdctl binary.
    pub fn new(config: EtcdConfig) -> Self {
        Self::with_runner(SystemRunner, config)
    }
}

impl<R: CommandRunner> Etcdctl<R> {
    pub fn with_runner(runner: R, config: EtcdConfig) -> Self {
        Self { runner, config }
    }

    /// Sets the endpoint used by all subsequent calls.
    pub fn set_endpoints(&mut self, endpoints: impl Into<String>) {
        self.config.endpoints = Some(endpoints.into());
    }

    pub fn endpoints(&self) -> Option<&str> {
        self.config.endpoints.as_deref()
    }

    fn command(&self) -> Invocation {
        let invocation = Invocation::new(self.config.binary.clone());
        match &self.config.endpoints {
            Some(endpoints) => invocation.env(ENDPOINTS_VAR, endpoints.clone()),
            None => invocation,
        }
    }

    fn run(&self, invocation: Invocation) -> IntegResult<String> {
        run_checked(&self.runner, &invocation).map(|out| out.stdout_text())
    }

    /// `etcdctl get -- <key>`; returns raw stdout, empty when the key is absent.
    pub fn get(&self, key: &str) -> IntegResult<String> {
        self.run(self.command().args(["get", "--", key]))
    }

    /// `etcdctl get <prefix> --prefix`, printed straight to the terminal.
    pub fn get_prefix_to_terminal(&self, prefix: &str) -> IntegResult<()> {
        let invocation = self.command().args(["get", prefix, "--prefix"]);
        run_passthrough(&self.runner, &invocation).map(drop)
    }

    /// `etcdctl put -- <key> <value>`
    pub fn put(&self, key: &str, value: &str) -> IntegResult<()> {
        self.run(self.command().args(["put", "--", key, value]))
            .map(drop)
    }

    /// `etcdctl del -- <key>`
    pub fn del(&self, key: &str) -> IntegResult<()> {
        self.run(self.command().args(["del", "--", key])).map(drop)
    }

    /// `etcdctl del <prefix> --prefix`, printed straight to the terminal.
    pub fn del_prefix_to_terminal(&self, prefix: &str) -> IntegResult<()> {
        let invocation = self.command().args(["del", prefix, "--prefix"]);
        run_passthrough(&self.runner, &invocation).map(drop)
    }

    /// `etcdctl user add <name>:<password>`, or `<name> --no-password`.
    pub fn user_add(&self, name: &str, password: Option<&str>) -> IntegResult<()> {
        let invocation = self.command().args(["user", "add"]);
        let invocation = match password {
            Some(password) => invocation.sensitive_arg(format!("{name}:{password}")),
            None => invocation.args([name, "--no-password"]),
        };
        self.run(invocation).map(drop)
    }

    /// `etcdctl user grant-role <user> <role>`
    pub fn user_grant_role(&self, user: &str, role: &str) -> IntegResult<()> {
        self.run(self.command().args(["user", "grant-role", user, role]))
            .map(drop)
    }

    /// `etcdctl user delete <name>`
    pub fn user_delete(&self, name: &str) -> IntegResult<()> {
        self.run(self.command().args(["user", "delete", name]))
            .map(drop)
    }

    /// `etcdctl role add <name>`
    pub fn role_add(&self, name: &str) -> IntegResult<()> {
        self.run(self.command().args(["role", "add", name])).map(drop)
    }

    /// `etcdctl role grant-permission <role> <permission> <key> --prefix`
    pub fn role_grant_prefix(
        &self,
        role: &str,
        permission: Permission,
        prefix: &str,
    ) -> IntegResult<()> {
        self.run(self.command().args([
            "role",
            "grant-permission",
            role,
            permission.as_str(),
            prefix,
            "--prefix",
        ]))
        .map(drop)
    }

    /// `etcdctl role delete <name>`
    pub fn role_delete(&self, name: &str) -> IntegResult<()> {
        self.run(self.command().args(["role", "delete", name]))
            .map(drop)
    }

    /// `etcdctl auth enable`
    pub fn auth_enable(&self) -> IntegResult<()> {
        self.run(self.command().args(["auth", "enable"])).map(drop)
    }
}
