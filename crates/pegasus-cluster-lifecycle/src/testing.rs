//! Canned admin responses and helpers shared by the lifecycle tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::admin::{AdminClient, AdminRequest, MockAdminCommandExecutor};
use crate::deployment::MockDeployment;
use crate::settings::LifecycleSettings;
use crate::Context;

pub const META: &str = "10.0.0.1:34601";

/// Ordered record of what the fakes observed
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn record(log: &EventLog, event: impl Into<String>) {
    log.lock().unwrap().push(event.into());
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// `nodes -d` with one row per `(address, status, replica_count, primary_count)`
pub fn nodes_output(rows: &[(&str, &str, u64, u64)]) -> String {
    let mut out = String::from(
        "[details]\naddress              status   replica_count  primary_count  secondary_count\n",
    );
    for (address, status, replicas, primaries) in rows {
        out.push_str(&format!(
            "{}  {}  {}  {}  {}\n",
            address,
            status,
            replicas,
            primaries,
            replicas - primaries
        ));
    }
    out.push_str("\n[summary]\ntotal_node_count : 1\n");
    out
}

/// `ls -d` with one table and the given unhealthy partition count
pub fn apps_output(unhealthy: u64) -> String {
    format!(
        "[general_info]\napp_id  status  app_name\n1  AVAILABLE  temp\n\n\
         [healthy_info]\n\
         app_id  app_name  partition_count  fully_healthy  unhealthy  write_unhealthy  read_unhealthy\n\
         1       temp      8                {}              {}          0                0\n\n\
         [summary]\ntotal_app_count : 1\n",
        8 - unhealthy,
        unhealthy
    )
}

/// Perf-counter reply for the three replica counters
pub fn counters_output(serving: u64, opening: u64, closing: u64) -> String {
    format!(
        r#"[{{"name":"replica*eon.replica_stub*replica(Count)","type":"NUMBER","value":{}}},{{"name":"replica*eon.replica_stub*opening.replica(Count)","type":"NUMBER","value":{}}},{{"name":"replica*eon.replica_stub*closing.replica(Count)","type":"NUMBER","value":{}}}]"#,
        serving, opening, closing
    )
}

/// `cluster_info` for cluster `name`, optionally reporting pending balance operations
pub fn cluster_info_output(name: &str, balance: Option<u64>) -> String {
    let mut out = format!(
        "[cluster_info]\nmeta_servers        : {meta}\nprimary_meta_server : {meta}\nzookeeper_root      : /pegasus/{name}\n",
        meta = META,
        name = name
    );
    if let Some(total) = balance {
        out.push_str(&format!(
            "balance_operation_count : total={},move_pri={},copy_pri=0,copy_sec=0\n",
            total, total
        ));
    }
    out
}

/// Reply to a remote config set, carrying the marker that request expects
pub fn config_ack(request: &AdminRequest) -> String {
    match request {
        AdminRequest::SetMetaLevel(_) => "control meta level ok, the old level is fl_steady\n".into(),
        AdminRequest::RemoteCommand { command, .. }
            if command == crate::admin::keys::ASSIGN_SECONDARY_BLACK_LIST =>
        {
            "set ok\n".into()
        }
        _ => "OK\n".into(),
    }
}

pub fn context(admin: MockAdminCommandExecutor, deployment: MockDeployment) -> Context {
    Context::new(
        AdminClient::new(Arc::new(admin)),
        Arc::new(deployment),
        LifecycleSettings::default(),
    )
}

/// Admin fake for cluster `onebox` hosting the replica `node`.
///
/// Successive `nodes -d` reads report `primaries` as the node's primary and
/// replica count until the deployment fake logs a `rolling_update` event,
/// after which the node is listed alive and empty. Perf-counter reads replay `counters` as the
/// serving count. The last value of each script repeats.
pub fn scripted_cluster(
    log: &EventLog,
    node: &'static str,
    primaries: Vec<u64>,
    counters: Vec<u64>,
) -> MockAdminCommandExecutor {
    let log = log.clone();
    let primary_reads = Arc::new(AtomicUsize::new(0));
    let counter_reads = Arc::new(AtomicUsize::new(0));

    let mut mock = MockAdminCommandExecutor::new();
    mock.expect_execute().returning(move |request| {
        let reply = match request {
            AdminRequest::ClusterInfo => {
                record(&log, "cluster_info");
                cluster_info_output("onebox", None)
            }
            AdminRequest::ListNodes => {
                let restarted = events(&log).iter().any(|e| e.starts_with("rolling_update"));
                if restarted {
                    nodes_output(&[(node, "ALIVE", 0, 0)])
                } else {
                    let i = primary_reads.fetch_add(1, Ordering::SeqCst);
                    let p = primaries[i.min(primaries.len() - 1)];
                    nodes_output(&[(node, "ALIVE", p, p)])
                }
            }
            AdminRequest::ListApps => apps_output(0),
            AdminRequest::RemoteCommand { command, .. } if command == "perf-counters" => {
                let i = counter_reads.fetch_add(1, Ordering::SeqCst);
                let total = counters[i.min(counters.len() - 1)];
                record(&log, format!("counters {}", total));
                counters_output(total, 0, 0)
            }
            AdminRequest::DowngradeNode { node } => {
                record(&log, "downgrade_node");
                format!(
                    "propose {node} 1.0 downgrade\npropose {node} 1.1 downgrade\n",
                    node = node
                )
            }
            AdminRequest::MigrateNode { .. } => {
                record(&log, "migrate_node");
                String::new()
            }
            other => {
                record(&log, other.to_string());
                config_ack(other)
            }
        };
        Ok(reply)
    });
    mock
}
