//! etcd endpoint discovery through `kubectl`.

use tracing::error;

use crate::error::IntegResult;
use crate::runner::{run_checked, CommandRunner, Invocation, SystemRunner};

/// Where the deployment's etcd service lives in the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Program to execute.
    pub binary: String,
    pub namespace: String,
    /// Name of the etcd `Service` object.
    pub service: String,
    /// Name of the service port carrying client traffic.
    pub port_name: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            binary: "kubectl".to_string(),
            namespace: "eis".to_string(),
            service: "ia-etcd-service".to_string(),
            port_name: "etcd-clt-port".to_string(),
        }
    }
}

impl ClusterConfig {
    /// JSONPath selecting the service's cluster IP from a service list.
    pub fn cluster_ip_query(&self) -> String {
        format!(
            "jsonpath={{.items[?(@.metadata.name==\"{}\")].spec.clusterIP}}",
            self.service
        )
    }

    /// JSONPath selecting the client port number from a service list.
    pub fn port_query(&self) -> String {
        format!(
            "jsonpath={{.items[?(@.metadata.name==\"{}\")].spec.ports[?(@.name==\"{}\")].port}}",
            self.service, self.port_name
        )
    }
}

/// kubectl wrapper for service lookups.
#[derive(Debug, Clone)]
pub struct Kubectl<R = SystemRunner> {
    runner: R,
    config: ClusterConfig,
}

impl Kubectl<SystemRunner> {
    pub fn new(config: ClusterConfig) -> Self {
        Self::with_runner(SystemRunner, config)
    }
}

impl<R: CommandRunner> Kubectl<R> {
    pub fn with_runner(runner: R, config: ClusterConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// `kubectl get svc -n <namespace> -o <query>`
    fn query_services(&self, query: String) -> IntegResult<String> {
        let invocation = Invocation::new(self.config.binary.clone()).args([
            "get".to_string(),
            "svc".to_string(),
            "-n".to_string(),
            self.config.namespace.clone(),
            "-o".to_string(),
            query,
        ]);
        run_checked(&self.runner, &invocation).map(|out| out.stdout_text())
    }

    /// Returns the etcd client endpoint as `ip:port`.
    ///
    /// The two lookups are concatenated as returned; an unmatched service
    /// yields an empty half rather than an error.
    pub fn extract_etcd_endpoint(&self) -> IntegResult<String> {
        let lookup = || -> IntegResult<(String, String)> {
            let ip = self.query_services(self.config.cluster_ip_query())?;
            let port = self.query_services(self.config.port_query())?;
            Ok((ip, port))
        };
        let (ip, port) = lookup().inspect_err(|err| {
            error!("Failed to call kubectl command to extract ETCD endpoint: '{err}'");
        })?;
        Ok(format!("{ip}:{port}"))
    }
}
