//! Shared test helpers for provisioning tests.

#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};

use eis_integ::logging::LevelPrefixFormat;
use eis_integ::runner::mock::FakeCluster;
use eis_integ::{EtcdConfig, Etcdctl};
use tracing_subscriber::layer::SubscriberExt;

/// Endpoint the fake service list advertises.
pub const ETCD_IP: &str = "10.43.0.12";
pub const ETCD_PORT: u16 = 2379;

/// A fake cluster with the default etcd service and a client bound to it.
pub fn cluster() -> (FakeCluster, Etcdctl<FakeCluster>) {
    let cluster = FakeCluster::with_etcd_service(ETCD_IP, ETCD_PORT);
    let mut etcd = Etcdctl::with_runner(cluster.clone(), EtcdConfig::default());
    etcd.set_endpoints(format!("https://{ETCD_IP}:{ETCD_PORT}"));
    (cluster, etcd)
}

/// Number of `etcdctl put` calls issued so far.
pub fn puts(cluster: &FakeCluster) -> usize {
    cluster.count_calls("etcdctl", &["put"])
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a thread-local subscriber and returns its result along with
/// every line logged meanwhile, in `LEVEL - message` form.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .event_format(LevelPrefixFormat)
            .with_ansi(false)
            .with_writer(move || writer.clone()),
    );
    let result = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    (result, text)
}

/// The `ERROR - ...` lines of captured log text.
pub fn error_lines(logs: &str) -> Vec<&str> {
    logs.lines().filter(|line| line.starts_with("ERROR - ")).collect()
}
