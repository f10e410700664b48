// ============================================================================
// File: src/host/tests.rs
// ----------------------------------------------------------------------------
// Test suite for the host entity, driven by an in-memory session backend
// ============================================================================

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use serde_json::json;

use crate::errors::HostError;
use crate::session::{
    CommandResult, ContainerRuntime, Session, SessionError, SessionResult, SshTarget,
    register_backend,
};

use super::*;

const MOCK_BACKEND: &str = "mock";

/// Per-hostname call counters
#[derive(Debug, Default, Clone)]
struct Calls {
    connects: usize,
    disconnects: usize,
    timeouts: Vec<Option<Duration>>,
}

fn calls() -> &'static Mutex<HashMap<String, Calls>> {
    static CALLS: OnceLock<Mutex<HashMap<String, Calls>>> = OnceLock::new();
    CALLS.get_or_init(Default::default)
}

fn calls_for(hostname: &str) -> Calls {
    calls()
        .lock()
        .expect("calls lock poisoned")
        .get(hostname)
        .cloned()
        .unwrap_or_default()
}

fn record<F: FnOnce(&mut Calls)>(hostname: &str, f: F) {
    let mut map = calls().lock().expect("calls lock poisoned");
    f(map.entry(hostname.to_string()).or_default());
}

#[derive(Debug)]
struct MockSession {
    hostname: String,
}

impl MockSession {
    fn boxed(target: &SshTarget) -> SessionResult<Box<dyn Session>> {
        if target.hostname.starts_with("unreachable") {
            return Err(SessionError::Connect {
                target: target.address(),
                details: "connection refused".to_string(),
            });
        }
        record(&target.hostname, |c| c.connects += 1);
        Ok(Box::new(MockSession {
            hostname: target.hostname.clone(),
        }))
    }
}

impl Session for MockSession {
    fn run(&mut self, command: &str, timeout: Option<Duration>) -> SessionResult<CommandResult> {
        record(&self.hostname, |c| c.timeouts.push(timeout));

        if let Some(text) = command.strip_prefix("echo ") {
            return Ok(CommandResult::success(format!("{text}\n")));
        }
        match command {
            "which dnf" => Ok(CommandResult::success("/usr/bin/dnf\n")),
            "which yum" => Ok(CommandResult::new(
                1,
                "",
                "/usr/bin/which: no yum in (/usr/bin)",
            )),
            "sleep" => Err(SessionError::Timeout {
                command: command.to_string(),
                timeout: timeout.unwrap_or_default(),
            }),
            "false" => Ok(CommandResult::failure(1, "")),
            _ => Ok(CommandResult::failure(127, format!("{command}: not found"))),
        }
    }

    fn sftp_write(&mut self, _local_path: &Path, _remote_dir: &str) -> SessionResult<()> {
        Ok(())
    }

    fn sftp_read(
        &mut self,
        _remote_path: &str,
        _local_path: Option<&Path>,
        return_data: bool,
    ) -> SessionResult<Option<Vec<u8>>> {
        Ok(return_data.then(Vec::new))
    }

    fn disconnect(&mut self) -> SessionResult<()> {
        record(&self.hostname, |c| c.disconnects += 1);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        MOCK_BACKEND
    }
}

fn mock_host(hostname: &str) -> Host {
    register_backend(MOCK_BACKEND, MockSession::boxed);
    Host::builder()
        .hostname(hostname)
        .backend(MOCK_BACKEND)
        .build()
        .expect("valid host")
}

#[derive(Debug)]
struct Provider {
    releases: Arc<Mutex<Vec<String>>>,
}

impl ProviderLink for Provider {
    fn instance(&self) -> &str {
        "test-provider"
    }

    fn release(&self, host: &Host) -> crate::HostResult<()> {
        self.releases
            .lock()
            .expect("release lock poisoned")
            .push(host.label());
        Ok(())
    }
}

#[derive(Debug)]
struct ReadOnlyProvider;

impl ProviderLink for ReadOnlyProvider {
    fn instance(&self) -> &str {
        "read-only"
    }
}

#[test]
fn construction_requires_identity() {
    let err = Host::builder().name("nameless").build().expect_err("no identity");
    assert!(matches!(err, HostError::MissingIdentity));
}

#[test]
fn reconstruction_tolerates_missing_identity() {
    let host = Host::builder()
        .reconstructing(true)
        .name("half-built")
        .build()
        .expect("reconstruction tolerates missing hostname");
    assert_eq!(host.hostname(), None);
    assert_eq!(host.label(), "half-built");
}

#[test]
fn ip_stands_in_for_hostname() {
    let host = Host::builder().ip("10.1.2.3").build().expect("ip is identity");
    assert_eq!(host.hostname(), Some("10.1.2.3"));
    assert_eq!(host.attr("ip"), Some(&json!("10.1.2.3")));
}

#[test]
fn options_default_from_settings() {
    let host = Host::new("defaults.example.com").expect("valid host");
    let settings = crate::settings::settings().expect("settings load");
    assert_eq!(host.config().username, settings.ssh.username);
    assert_eq!(host.config().port, settings.ssh.port);
    assert_eq!(host.default_timeout(), Duration::ZERO);
}

#[test]
fn explicit_options_win() {
    let host = Host::builder()
        .hostname("explicit.example.com")
        .username("admin")
        .port(2222)
        .ipv6(true)
        .attr("job_id", 42)
        .build()
        .expect("valid host");
    assert_eq!(host.config().username, "admin");
    assert_eq!(host.config().port, 2222);
    assert!(host.config().ipv6);
    assert_eq!(host.attr("job_id"), Some(&json!(42)));
}

#[test]
fn session_is_lazy_and_reused() {
    let mut host = mock_host("lazy.example.com");
    assert!(!host.has_session());

    let first = host.execute("echo ok", None).expect("echo runs");
    assert!(first.stdout.contains("ok"));
    assert!(host.has_session());

    host.execute("echo again", None).expect("echo runs");
    assert_eq!(calls_for("lazy.example.com").connects, 1);
}

#[test]
fn connect_creates_session_eagerly() {
    let mut host = mock_host("eager.example.com");
    host.connect(ConnectOverrides::new().port(2200))
        .expect("mock connects");
    assert!(host.has_session());
    assert_eq!(host.config().port, 2200);

    // A forced reconnect replaces the old session.
    host.connect(ConnectOverrides::new()).expect("mock connects");
    let calls = calls_for("eager.example.com");
    assert_eq!(calls.connects, 2);
    assert_eq!(calls.disconnects, 1);
}

#[test]
fn close_is_idempotent() {
    let mut host = mock_host("close.example.com");
    host.execute("echo hi", None).expect("echo runs");

    host.close().expect("close succeeds");
    assert!(!host.has_session());
    host.close().expect("second close is a no-op");

    assert_eq!(calls_for("close.example.com").disconnects, 1);
}

#[test]
fn drop_closes_open_session() {
    {
        let mut host = mock_host("dropped.example.com");
        host.execute("echo hi", None).expect("echo runs");
    }
    assert_eq!(calls_for("dropped.example.com").disconnects, 1);
}

#[test]
fn execute_timeout_defaults_and_overrides() {
    let mut host = mock_host("timeouts.example.com");
    host.set_default_timeout(Duration::from_secs(30));

    host.execute("echo a", None).expect("runs");
    host.execute("echo b", Some(Duration::from_secs(5))).expect("runs");
    host.execute("echo c", None).expect("runs");
    host.execute("echo d", Some(Duration::ZERO)).expect("runs");

    assert_eq!(
        calls_for("timeouts.example.com").timeouts,
        vec![
            Some(Duration::from_secs(30)),
            Some(Duration::from_secs(5)),
            Some(Duration::from_secs(30)),
            None,
        ]
    );
}

#[test]
fn transport_errors_carry_context() {
    let mut host = mock_host("timeout-err.example.com");
    let err = host
        .execute("sleep", Some(Duration::from_millis(10)))
        .expect_err("mock times out");
    assert!(err.is_timeout());
    assert!(err.to_string().contains("timeout-err.example.com"));

    // A failing command is a result, not an error.
    let result = host.execute("false", None).expect("command ran");
    assert!(!result.is_success());
}

#[test]
fn connection_failure_is_session_error() {
    let mut host = mock_host("unreachable.example.com");
    let err = host.execute("echo hi", None).expect_err("cannot connect");
    assert!(matches!(
        err,
        HostError::Session {
            operation: "connect",
            source: SessionError::Connect { .. },
            ..
        }
    ));
    assert!(!host.has_session());
}

#[test]
fn unknown_backend_fails_fast() {
    let mut host = Host::builder()
        .hostname("nobackend.example.com")
        .backend("does-not-exist")
        .build()
        .expect("construction does not resolve the backend");
    let err = host.execute("echo hi", None).expect_err("unknown backend");
    assert!(matches!(err, HostError::UnknownBackend { .. }));
}

#[test]
fn container_without_ssh_port_uses_container_session() {
    let mut host = Host::builder()
        .hostname("container.example.com")
        .backend(MOCK_BACKEND)
        .container(ContainerLink::new("c0ffee", ContainerRuntime::Podman).with_port(80, 8080))
        .build()
        .expect("valid host");

    let session = host.session().expect("container session needs no network");
    assert_eq!(session.backend_type(), "podman");
    assert_eq!(calls_for("container.example.com").connects, 0);
}

#[test]
fn container_with_ssh_port_uses_registry_backend() {
    register_backend(MOCK_BACKEND, MockSession::boxed);
    let mut host = Host::builder()
        .hostname("sshcontainer.example.com")
        .backend(MOCK_BACKEND)
        .container(ContainerLink::new("c0ffee", ContainerRuntime::Docker).with_port(22, 32222))
        .build()
        .expect("valid host");

    let session = host.session().expect("mock connects");
    assert_eq!(session.backend_type(), MOCK_BACKEND);
}

#[test]
fn release_without_provider_is_not_implemented() {
    let mut host = mock_host("norelease.example.com");
    let err = host.release().expect_err("no provider");
    assert!(matches!(
        err,
        HostError::NotImplemented {
            operation: "release",
            ..
        }
    ));

    host.set_provider(Arc::new(ReadOnlyProvider));
    let err = host.release().expect_err("provider cannot release");
    assert!(matches!(err, HostError::NotImplemented { .. }));
}

#[test]
fn release_delegates_and_closes() {
    let releases = Arc::new(Mutex::new(Vec::new()));
    let mut host = mock_host("release.example.com");
    host.set_provider(Arc::new(Provider {
        releases: Arc::clone(&releases),
    }));
    host.execute("echo hi", None).expect("runs");

    host.release().expect("provider releases");
    assert!(!host.has_session());
    assert_eq!(
        *releases.lock().expect("release lock poisoned"),
        vec!["release.example.com".to_string()]
    );
}

#[test]
fn to_dict_uses_allow_list() {
    let host = Host::builder()
        .hostname("dict.example.com")
        .name("dict")
        .provider(Arc::new(ReadOnlyProvider))
        .attr("job_id", "1234")
        .attr("os_distribution", "RHEL")
        .attr("_cont_inst", "not serialized")
        .attr("secret_token", "not serialized")
        .build()
        .expect("valid host");

    let record = host.to_dict();
    assert_eq!(record.name.as_deref(), Some("dict"));
    assert_eq!(record.kind, "host");
    assert_eq!(record.provider_instance, json!("read-only"));
    assert!(record.fields.keys().all(|k| RECORD_KEYS.contains(&k.as_str())));
    assert_eq!(record.fields.get("job_id"), Some(&json!("1234")));
    assert!(!record.fields.contains_key("secret_token"));
}

#[test]
fn dict_round_trip() {
    let host = Host::builder()
        .hostname("round.example.com")
        .name("round")
        .attr("exposed_ports", json!({"22/tcp": 2222}))
        .build()
        .expect("valid host");

    let record = host.to_dict();
    let rebuilt = Host::from_dict(record.clone()).expect("record rebuilds");
    assert_eq!(rebuilt.hostname(), Some("round.example.com"));
    assert_eq!(rebuilt.name(), Some("round"));
    assert_eq!(rebuilt.to_dict(), record);
}

#[test]
fn from_dict_allows_missing_hostname() {
    let record: HostRecord = serde_json::from_value(json!({
        "name": "checkin-me",
        "_broker_provider_instance": "tower",
        "type": "host",
        "job_id": 99,
    }))
    .expect("valid record");

    let mut host = Host::from_dict(record).expect("reconstruction tolerates no hostname");
    assert_eq!(host.hostname(), None);
    assert_eq!(host.to_dict().provider_instance, json!("tower"));

    host.set_hostname("completed.example.com");
    assert_eq!(host.hostname(), Some("completed.example.com"));
}

#[test]
fn from_dict_rejects_other_types() {
    let record: HostRecord = serde_json::from_value(json!({
        "name": "x",
        "type": "container",
        "hostname": "h",
    }))
    .expect("valid record");
    let err = Host::from_dict(record).expect_err("wrong type");
    assert!(matches!(err, HostError::InvalidRecord { .. }));
}

#[test]
fn json_round_trip() {
    let host = Host::builder()
        .hostname("json.example.com")
        .attr("deploy_network_type", "ipv6")
        .build()
        .expect("valid host");
    let json = host.to_json().expect("serializable");
    let rebuilt = Host::from_json(&json).expect("parsable");
    assert_eq!(rebuilt.hostname(), Some("json.example.com"));
    assert_eq!(rebuilt.attr("deploy_network_type"), Some(&json!("ipv6")));
}

#[test]
fn pkg_mgr_probe() {
    let mut host = mock_host("probe.example.com");
    assert_eq!(host.pkg_mgr(), Some(PackageManager::Dnf));

    let mut unreachable = mock_host("unreachable-probe.example.com");
    assert_eq!(unreachable.pkg_mgr(), None);
}

#[derive(Debug)]
struct CountingHooks {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl HostHooks for CountingHooks {
    fn setup(&mut self, _host: &mut Host) -> crate::HostResult<()> {
        self.events.lock().expect("events lock poisoned").push("setup");
        Ok(())
    }

    fn teardown(&mut self, _host: &mut Host) -> crate::HostResult<()> {
        self.events
            .lock()
            .expect("events lock poisoned")
            .push("teardown");
        Ok(())
    }
}

#[test]
fn scoped_runs_hooks_and_closes_on_error() {
    register_backend(MOCK_BACKEND, MockSession::boxed);
    let events = Arc::new(Mutex::new(Vec::new()));
    let mut host = Host::builder()
        .hostname("scoped.example.com")
        .backend(MOCK_BACKEND)
        .hooks(Box::new(CountingHooks {
            events: Arc::clone(&events),
        }))
        .build()
        .expect("valid host");

    let outcome: crate::HostResult<()> = host.scoped(|h| {
        h.execute("echo inside", None)?;
        Err(HostError::InvalidRecord {
            details: "boom".to_string(),
        })
    });

    assert!(matches!(outcome, Err(HostError::InvalidRecord { .. })));
    assert!(!host.has_session());
    assert_eq!(calls_for("scoped.example.com").disconnects, 1);
    assert_eq!(
        *events.lock().expect("events lock poisoned"),
        vec!["setup", "teardown"]
    );
}

#[test]
fn guard_closes_on_drop() {
    {
        let mut guard = HostGuard::new(mock_host("guard.example.com"));
        guard.execute("echo hi", None).expect("runs");
    }
    assert_eq!(calls_for("guard.example.com").disconnects, 1);
}

#[test]
fn display_hides_password() {
    let host = Host::builder()
        .hostname("display.example.com")
        .password("hunter2")
        .attr("job_id", 5)
        .build()
        .expect("valid host");
    let shown = host.to_string();
    assert!(shown.starts_with("Host(hostname=display.example.com"));
    assert!(shown.contains("job_id=5"));
    assert!(!shown.contains("hunter2"));
    assert!(!format!("{host:?}").contains("hunter2"));
}
