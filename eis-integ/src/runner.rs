//! Process execution seam.
//!
//! Every etcd and Kubernetes call is described as an [`Invocation`] and handed
//! to a [`CommandRunner`]. Production code uses [`SystemRunner`]; tests use
//! [`mock::FakeCluster`], which interprets the same invocations in memory.

use std::collections::BTreeSet;
use std::fmt;
use std::process::{Command, Stdio};

use crate::error::{IntegError, IntegResult};

/// A single external command: program, arguments and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    sensitive: BTreeSet<usize>,
}

impl Invocation {
    /// Creates an invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            sensitive: BTreeSet::new(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends an argument that must never appear in logs or error messages.
    #[must_use]
    pub fn sensitive_arg(mut self, arg: impl Into<String>) -> Self {
        self.sensitive.insert(self.args.len());
        self.args.push(arg.into());
        self
    }

    /// Sets an environment variable for the child process only.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_envs(&self) -> &[(String, String)] {
        &self.envs
    }

    /// Returns the value of a child environment variable set on this invocation.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Human-readable command line with sensitive arguments masked.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for (idx, arg) in self.args.iter().enumerate() {
            line.push(' ');
            if self.sensitive.contains(&idx) {
                line.push_str("<redacted>");
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Exit status and captured streams of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// A successful run with the given stdout.
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// A failed run with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Combined stdout and stderr, trimmed, for error reporting.
    pub fn combined_text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&self.stderr));
        text.trim().to_string()
    }

    fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit status: {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs external commands.
pub trait CommandRunner {
    /// Runs the command to completion, capturing stdout and stderr.
    fn capture(&self, invocation: &Invocation) -> std::io::Result<CommandOutput>;

    /// Runs the command with stdout and stderr inherited from this process.
    /// The returned output carries the exit code only.
    fn passthrough(&self, invocation: &Invocation) -> std::io::Result<CommandOutput>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn capture(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
        (**self).capture(invocation)
    }

    fn passthrough(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
        (**self).passthrough(invocation)
    }
}

/// Runs commands as real child processes. No timeout is applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(invocation: &Invocation) -> Command {
        let mut command = Command::new(invocation.program());
        command.args(invocation.get_args());
        for (key, value) in invocation.get_envs() {
            command.env(key, value);
        }
        command
    }
}

impl CommandRunner for SystemRunner {
    fn capture(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
        let output = Self::command(invocation).stdin(Stdio::null()).output()?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn passthrough(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
        let status = Self::command(invocation).status()?;
        Ok(CommandOutput {
            code: status.code(),
            ..CommandOutput::default()
        })
    }
}

/// Runs a capturing command and turns spawn failures and nonzero exits into errors.
pub fn run_checked<R: CommandRunner + ?Sized>(
    runner: &R,
    invocation: &Invocation,
) -> IntegResult<CommandOutput> {
    let output = runner
        .capture(invocation)
        .map_err(|source| spawn_error(invocation, source))?;
    ensure_success(invocation, output)
}

/// Like [`run_checked`], but the child writes straight to this process's terminal.
pub fn run_passthrough<R: CommandRunner + ?Sized>(
    runner: &R,
    invocation: &Invocation,
) -> IntegResult<CommandOutput> {
    let output = runner
        .passthrough(invocation)
        .map_err(|source| spawn_error(invocation, source))?;
    ensure_success(invocation, output)
}

fn spawn_error(invocation: &Invocation, source: std::io::Error) -> IntegError {
    IntegError::Spawn {
        command: invocation.command_line(),
        source,
    }
}

fn ensure_success(invocation: &Invocation, output: CommandOutput) -> IntegResult<CommandOutput> {
    if output.success() {
        Ok(output)
    } else {
        Err(IntegError::CommandFailed {
            command: invocation.command_line(),
            status: output.status_text(),
            output: output.combined_text(),
        })
    }
}

/// In-memory stand-ins for `etcdctl` and `kubectl`.
pub mod mock {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    /// One permission granted to a role.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct GrantedPermission {
        pub permission: String,
        pub key: String,
        pub prefix: bool,
    }

    #[derive(Debug, Clone)]
    struct ServiceRecord {
        namespace: String,
        name: String,
        cluster_ip: String,
        port_name: String,
        port: u16,
    }

    #[derive(Debug, Default)]
    struct UserRecord {
        password: Option<String>,
        roles: BTreeSet<String>,
    }

    #[derive(Debug, Default)]
    struct ClusterState {
        kv: BTreeMap<String, String>,
        users: BTreeMap<String, UserRecord>,
        roles: BTreeMap<String, Vec<GrantedPermission>>,
        auth_enabled: bool,
        services: Vec<ServiceRecord>,
        failures: Vec<String>,
        invocations: Vec<Invocation>,
        printed: String,
    }

    /// A fake etcd cluster plus a fake Kubernetes service list.
    ///
    /// Clones share state, so a test can keep one handle for assertions and
    /// give another to the code under test.
    #[derive(Debug, Clone, Default)]
    pub struct FakeCluster {
        state: Arc<Mutex<ClusterState>>,
    }

    impl FakeCluster {
        /// Creates an empty cluster with no services registered.
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a cluster exposing the default EIS etcd service.
        pub fn with_etcd_service(cluster_ip: &str, port: u16) -> Self {
            let cluster = Self::new();
            cluster.add_service("eis", "ia-etcd-service", cluster_ip, "etcd-clt-port", port);
            cluster
        }

        /// Registers a Kubernetes service with one named port.
        pub fn add_service(
            &self,
            namespace: &str,
            name: &str,
            cluster_ip: &str,
            port_name: &str,
            port: u16,
        ) {
            self.state.lock().unwrap().services.push(ServiceRecord {
                namespace: namespace.to_string(),
                name: name.to_string(),
                cluster_ip: cluster_ip.to_string(),
                port_name: port_name.to_string(),
                port,
            });
        }

        /// Makes every invocation whose command line contains `pattern` exit 1.
        pub fn fail_when(&self, pattern: &str) {
            self.state.lock().unwrap().failures.push(pattern.to_string());
        }

        /// Stores a key directly, bypassing the command layer.
        pub fn seed(&self, key: &str, value: &str) {
            self.state
                .lock()
                .unwrap()
                .kv
                .insert(key.to_string(), value.to_string());
        }

        pub fn get(&self, key: &str) -> Option<String> {
            self.state.lock().unwrap().kv.get(key).cloned()
        }

        pub fn keys(&self) -> Vec<String> {
            self.state.lock().unwrap().kv.keys().cloned().collect()
        }

        pub fn user_exists(&self, name: &str) -> bool {
            self.state.lock().unwrap().users.contains_key(name)
        }

        pub fn user_password(&self, name: &str) -> Option<String> {
            self.state
                .lock()
                .unwrap()
                .users
                .get(name)
                .and_then(|u| u.password.clone())
        }

        pub fn user_roles(&self, name: &str) -> Vec<String> {
            self.state
                .lock()
                .unwrap()
                .users
                .get(name)
                .map(|u| u.roles.iter().cloned().collect())
                .unwrap_or_default()
        }

        pub fn role_permissions(&self, name: &str) -> Option<Vec<GrantedPermission>> {
            self.state.lock().unwrap().roles.get(name).cloned()
        }

        pub fn auth_enabled(&self) -> bool {
            self.state.lock().unwrap().auth_enabled
        }

        /// Every invocation seen so far, in order.
        pub fn invocations(&self) -> Vec<Invocation> {
            self.state.lock().unwrap().invocations.clone()
        }

        /// Invocations of `program` whose arguments start with `prefix`.
        pub fn count_calls(&self, program: &str, prefix: &[&str]) -> usize {
            self.invocations()
                .iter()
                .filter(|inv| inv.program() == program)
                .filter(|inv| {
                    let args = positional(inv.get_args());
                    args.len() >= prefix.len() && args.iter().zip(prefix).all(|(a, p)| a == p)
                })
                .count()
        }

        /// Text that passthrough commands would have written to the terminal.
        pub fn printed(&self) -> String {
            self.state.lock().unwrap().printed.clone()
        }

        fn execute(&self, invocation: &Invocation) -> CommandOutput {
            let mut state = self.state.lock().unwrap();
            state.invocations.push(invocation.clone());

            let line = invocation.command_line();
            if state.failures.iter().any(|p| line.contains(p.as_str())) {
                return CommandOutput::failed(1, format!("Error: injected failure for `{line}`"));
            }

            let program = invocation
                .program()
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string();
            match program.as_str() {
                "etcdctl" => state.etcdctl(invocation.get_args()),
                "kubectl" => state.kubectl(invocation.get_args()),
                other => CommandOutput::failed(127, format!("{other}: command not found")),
            }
        }
    }

    impl CommandRunner for FakeCluster {
        fn capture(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
            Ok(self.execute(invocation))
        }

        fn passthrough(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
            let output = self.execute(invocation);
            let mut state = self.state.lock().unwrap();
            state.printed.push_str(&String::from_utf8_lossy(&output.stdout));
            Ok(CommandOutput {
                code: output.code,
                ..CommandOutput::default()
            })
        }
    }

    /// Drops `--` separators and `--prefix`/`--no-password` switches.
    fn positional(args: &[String]) -> Vec<&str> {
        args.iter()
            .map(String::as_str)
            .filter(|a| !a.starts_with("--"))
            .collect()
    }

    fn has_flag(args: &[String], flag: &str) -> bool {
        args.iter().any(|a| a == flag)
    }

    impl ClusterState {
        fn etcdctl(&mut self, raw: &[String]) -> CommandOutput {
            let prefix = has_flag(raw, "--prefix");
            let args = positional(raw);
            match args.as_slice() {
                ["get", key] => {
                    let mut out = String::new();
                    for (k, v) in self.kv.iter().filter(|(k, _)| matches(k, key, prefix)) {
                        out.push_str(&format!("{k}\n{v}\n"));
                    }
                    CommandOutput::ok(out)
                }
                ["put", key, value] => {
                    self.kv.insert(key.to_string(), value.to_string());
                    CommandOutput::ok("OK\n")
                }
                ["del", key] => {
                    let doomed: Vec<String> = self
                        .kv
                        .keys()
                        .filter(|k| matches(k, key, prefix))
                        .cloned()
                        .collect();
                    for k in &doomed {
                        self.kv.remove(k);
                    }
                    CommandOutput::ok(format!("{}\n", doomed.len()))
                }
                ["user", "add", user] => {
                    let (name, password) = match user.split_once(':') {
                        Some((name, pw)) => (name, Some(pw.to_string())),
                        None if has_flag(raw, "--no-password") => (*user, None),
                        None => return CommandOutput::failed(1, "Error: password required"),
                    };
                    if self.users.contains_key(name) {
                        return CommandOutput::failed(
                            1,
                            "Error: etcdserver: user name already exists",
                        );
                    }
                    self.users.insert(
                        name.to_string(),
                        UserRecord {
                            password,
                            roles: BTreeSet::new(),
                        },
                    );
                    CommandOutput::ok(format!("User {name} created\n"))
                }
                ["user", "grant-role", user, role] => {
                    if !self.roles.contains_key(*role) {
                        return CommandOutput::failed(1, "Error: etcdserver: role name not found");
                    }
                    match self.users.get_mut(*user) {
                        Some(record) => {
                            record.roles.insert(role.to_string());
                            CommandOutput::ok(format!("Role {role} is granted to user {user}\n"))
                        }
                        None => CommandOutput::failed(1, "Error: etcdserver: user name not found"),
                    }
                }
                ["user", "delete", name] => match self.users.remove(*name) {
                    Some(_) => CommandOutput::ok(format!("User {name} deleted\n")),
                    None => CommandOutput::failed(1, "Error: etcdserver: user name not found"),
                },
                ["role", "add", name] => {
                    if self.roles.contains_key(*name) {
                        return CommandOutput::failed(
                            1,
                            "Error: etcdserver: role name already exists",
                        );
                    }
                    self.roles.insert(name.to_string(), Vec::new());
                    CommandOutput::ok(format!("Role {name} created\n"))
                }
                ["role", "grant-permission", role, permission, key] => {
                    match self.roles.get_mut(*role) {
                        Some(grants) => {
                            grants.push(GrantedPermission {
                                permission: permission.to_string(),
                                key: key.to_string(),
                                prefix,
                            });
                            CommandOutput::ok(format!("Role {role} updated\n"))
                        }
                        None => CommandOutput::failed(1, "Error: etcdserver: role name not found"),
                    }
                }
                ["role", "delete", name] => match self.roles.remove(*name) {
                    Some(_) => {
                        for user in self.users.values_mut() {
                            user.roles.remove(*name);
                        }
                        CommandOutput::ok(format!("Role {name} deleted\n"))
                    }
                    None => CommandOutput::failed(1, "Error: etcdserver: role name not found"),
                },
                ["auth", "enable"] => {
                    let root_ready = self
                        .users
                        .get("root")
                        .is_some_and(|u| u.roles.contains("root"));
                    if !root_ready {
                        return CommandOutput::failed(
                            1,
                            "Error: etcdserver: root user does not have root role",
                        );
                    }
                    self.auth_enabled = true;
                    CommandOutput::ok("Authentication Enabled\n")
                }
                _ => CommandOutput::failed(1, format!("Error: unknown command {raw:?}")),
            }
        }

        fn kubectl(&self, args: &[String]) -> CommandOutput {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            let ["get", "svc", "-n", namespace, "-o", output] = args.as_slice() else {
                return CommandOutput::failed(1, format!("error: unknown command {args:?}"));
            };
            let Some(query) = output.strip_prefix("jsonpath=") else {
                return CommandOutput::failed(1, "error: unsupported output format");
            };
            let service = self.services.iter().find(|s| {
                s.namespace == *namespace
                    && query.contains(&format!("@.metadata.name==\"{}\"", s.name))
            });
            let Some(service) = service else {
                return CommandOutput::ok("");
            };
            if query.ends_with(".spec.clusterIP}") {
                CommandOutput::ok(service.cluster_ip.clone())
            } else if query.contains(&format!("@.name==\"{}\"", service.port_name)) {
                CommandOutput::ok(service.port.to_string())
            } else {
                CommandOutput::ok("")
            }
        }
    }

    fn matches(candidate: &str, key: &str, prefix: bool) -> bool {
        if prefix {
            candidate.starts_with(key)
        } else {
            candidate == key
        }
    }
}
