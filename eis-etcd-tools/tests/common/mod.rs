//! Shared test helpers for the command-line tools.

#![allow(dead_code)]

use std::fs;

use eis_integ::runner::mock::FakeCluster;
use eis_integ::TlsPaths;
use tempfile::TempDir;

pub const ETCD_IP: &str = "10.43.0.12";
pub const ETCD_PORT: u16 = 2379;

/// Certificate files on disk. Keep the `TempDir` alive for the test's duration.
pub fn tls_files() -> (TempDir, TlsPaths) {
    let temp = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for name in ["ca.pem", "client.pem", "client-key.pem"] {
        let path = temp.path().join(name);
        fs::write(&path, "-----BEGIN CERTIFICATE-----\n").unwrap();
        paths.push(path);
    }
    let tls = TlsPaths {
        ca_cert: Some(paths[0].clone()),
        cert: Some(paths[1].clone()),
        key: Some(paths[2].clone()),
    };
    (temp, tls)
}

/// A fake cluster advertising the default etcd service.
pub fn cluster() -> FakeCluster {
    FakeCluster::with_etcd_service(ETCD_IP, ETCD_PORT)
}

/// Number of etcdctl invocations seen by `cluster`.
pub fn etcd_calls(cluster: &FakeCluster) -> usize {
    cluster
        .invocations()
        .iter()
        .filter(|inv| inv.program() == "etcdctl")
        .count()
}
