//! End-to-end resolution of compose files written to disk.
//!
//! Covers merging in file order, interpolation, schema checks, lazy
//! dependency lookup, cycle detection, and routing of commands and volume
//! inspection through the podman executors.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pcb_common::error::PcbError;
use pcb_compose::interpolate::Environment;
use pcb_compose::{ComposeLoader, Project};
use pcb_exec::scripted::{Reply, ScriptedExecutor};
use pcb_exec::{ArgCommand, ExecOptions, PodmanClient, ShellCommand};

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write compose file");
    path
}

fn load(files: &[PathBuf], env: &[(&str, &str)]) -> Result<Project, PcbError> {
    let env: Environment = env
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    ComposeLoader::with_environment(env)
        .project_name(Some("shop".to_owned()))
        .load(files)
}

fn client(host: Arc<ScriptedExecutor>) -> PodmanClient {
    PodmanClient::new(
        host,
        Path::new("/usr/bin/podman"),
        &["--log-level=error".to_owned()],
        Path::new("/usr/bin/podman-compose"),
    )
}

// ── Merging ──────────────────────────────────────────────────────────

#[test]
fn override_file_wins_and_adds_volume() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = write(
        dir.path(),
        "docker-compose.yml",
        r#"
version: "3.0"
services:
  db:
    image: postgres:15
    environment:
      - POSTGRES_DB=shop
"#,
    );
    let extra = write(
        dir.path(),
        "docker-compose.override.yml",
        r#"
version: "3.8"
services:
  db:
    image: postgres:16
    volumes:
      - data:/var/lib/postgresql/data
volumes:
  data:
"#,
    );

    let project = load(&[base, extra], &[]).expect("resolve");
    assert_eq!(project.version(), "3.8");

    let db = project.service("db").unwrap();
    assert_eq!(
        db.definition().get("image").and_then(|v| v.as_str()),
        Some("postgres:16")
    );
    assert_eq!(
        db.definition()
            .get("environment")
            .and_then(|env| env.get("POSTGRES_DB"))
            .and_then(|v| v.as_str()),
        Some("shop")
    );

    let data = project.volume("data").expect("new volume");
    assert_eq!(data.public_name().as_str(), "shop_data");
    assert_eq!(project.volume_users("data").unwrap().len(), 1);
}

#[test]
fn depends_on_short_and_long_forms_merge_without_duplicates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = write(
        dir.path(),
        "a.yml",
        "version: '3.8'\nservices:\n  web:\n    depends_on: db\n  db: {}\n  cache: {}\n",
    );
    let extra = write(
        dir.path(),
        "b.yml",
        "services:\n  web:\n    depends_on:\n      db: {condition: service_started}\n      cache: {condition: service_healthy}\n",
    );

    let project = load(&[base, extra], &[]).expect("resolve");
    let deps: Vec<&str> = project
        .dependencies("web")
        .unwrap()
        .iter()
        .map(|svc| svc.name().as_str())
        .collect();
    assert_eq!(deps, ["db", "cache"]);
}

#[test]
fn variables_are_substituted_per_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(
        dir.path(),
        "docker-compose.yml",
        r#"
version: "3.8"
services:
  web:
    image: "nginx:${NGINX_TAG:-stable}"
    container_name: "${PREFIX}-web"
    environment:
      ROOT: /srv
    working_dir: "${ROOT}/html"
"#,
    );

    let project = load(&[file], &[("PREFIX", "prod")]).expect("resolve");
    let web = project.service("web").unwrap();
    assert_eq!(web.container_name().as_str(), "prod-web");
    assert_eq!(
        web.definition().get("image").and_then(|v| v.as_str()),
        Some("nginx:stable")
    );
    assert_eq!(
        web.definition().get("working_dir").and_then(|v| v.as_str()),
        Some("/srv/html")
    );
}

#[test]
fn required_variable_missing_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(
        dir.path(),
        "docker-compose.yml",
        "version: '3.8'\nservices:\n  web:\n    image: \"${IMAGE:?set an image}\"\n",
    );
    let err = load(&[file], &[]).unwrap_err();
    assert!(err.to_string().contains("set an image"), "{err}");
}

// ── Validation ───────────────────────────────────────────────────────

#[test]
fn version_two_is_unsupported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(
        dir.path(),
        "docker-compose.yml",
        "version: '2.4'\nservices:\n  web: {}\n",
    );
    assert!(matches!(
        load(&[file], &[]),
        Err(PcbError::UnsupportedVersion { version }) if version == "2.4"
    ));
}

#[test]
fn top_level_list_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(dir.path(), "docker-compose.yml", "- web\n- db\n");
    let err = load(&[file], &[]).unwrap_err();
    assert!(matches!(err, PcbError::Config { .. }));
    assert!(!err.is_file_access());
}

#[test]
fn missing_file_is_a_file_access_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = load(&[dir.path().join("nope.yml")], &[]).unwrap_err();
    assert!(matches!(err, PcbError::Io { .. }));
    assert!(err.is_file_access());
    assert!(err.to_string().contains("nope.yml"));
}

#[test]
fn unknown_dependency_fails_on_access_not_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(
        dir.path(),
        "docker-compose.yml",
        "version: '3.8'\nservices:\n  web:\n    depends_on: [ghost]\n",
    );
    let project = load(&[file], &[]).expect("load is lazy");
    assert!(matches!(
        project.dependencies("web"),
        Err(PcbError::NotFound { kind: "service", id }) if id == "ghost"
    ));
    assert!(project.startup_order().is_err());
}

#[test]
fn circular_dependencies_are_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(
        dir.path(),
        "docker-compose.yml",
        r"
version: '3.8'
services:
  a: {depends_on: [b]}
  b: {depends_on: [c]}
  c: {depends_on: [a]}
  d: {}
",
    );
    let project = load(&[file], &[]).expect("resolve");
    match project.startup_order() {
        Err(PcbError::CyclicDependency { services }) => {
            let names: Vec<&str> = services.iter().map(|s| s.as_str()).collect();
            assert_eq!(names, ["a", "b", "c"]);
        }
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn bind_mount_is_unsupported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(
        dir.path(),
        "docker-compose.yml",
        "version: '3.8'\nservices:\n  web:\n    volumes: ['./html:/usr/share/nginx/html']\n",
    );
    let project = load(&[file], &[]).expect("resolve");
    assert!(matches!(
        project.volume_mounts(),
        Err(PcbError::UnsupportedMount { .. })
    ));
}

// ── Execution routing ────────────────────────────────────────────────

#[test]
fn compose_and_service_commands_are_routed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(
        dir.path(),
        "docker-compose.yml",
        "version: '3.8'\nservices:\n  db: {}\n",
    );
    let project = load(&[file.clone()], &[]).expect("resolve");
    let host = Arc::new(ScriptedExecutor::new());
    let podman = client(Arc::clone(&host));

    let _ = ArgCommand::new(["ps"])
        .run(&project.compose_target(&podman), &ExecOptions::checked())
        .unwrap();
    let db = project.service("db").unwrap();
    let _ = ArgCommand::new(["pg_dump", "shop"])
        .run(&db.target(&podman), &ExecOptions::checked().in_dir("/tmp"))
        .unwrap();

    let calls = host.calls();
    assert_eq!(
        calls[0].command,
        [
            "/usr/bin/podman-compose".to_owned(),
            "--project-name=shop".to_owned(),
            format!("--file={}", file.display()),
            "ps".to_owned(),
        ]
    );
    assert_eq!(calls[0].options.work_dir.as_deref(), Some(dir.path()));
    assert_eq!(
        calls[1].command,
        [
            "/usr/bin/podman",
            "--log-level=error",
            "container",
            "exec",
            "--interactive=false",
            "--workdir=/tmp",
            "shop_db_1",
            "pg_dump",
            "shop"
        ]
    );
}

#[test]
fn shell_commands_in_a_service_discover_the_shell_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(
        dir.path(),
        "docker-compose.yml",
        "version: '3.8'\nservices:\n  db: {}\n",
    );
    let project = load(&[file], &[]).expect("resolve");
    let host = Arc::new(ScriptedExecutor::new().on(
        &[
            "/usr/bin/podman",
            "--log-level=error",
            "container",
            "exec",
            "--interactive=false",
            "shop_db_1",
            "/usr/bin/bash",
        ],
        Reply::exit(127),
    ));
    let podman = client(Arc::clone(&host));
    let db = project.service("db").unwrap();

    let dump = ShellCommand::new("pg_dumpall").pipe(&ArgCommand::new(["gzip"]).into());
    let _ = dump.run(&db.target(&podman), &ExecOptions::checked()).unwrap();
    let _ = dump.run(&db.target(&podman), &ExecOptions::checked()).unwrap();

    let calls = host.calls();
    assert_eq!(calls.len(), 4);
    let last = &calls[3].command;
    assert_eq!(last[last.len() - 3..], ["/bin/bash", "-c", "(pg_dumpall) | (gzip)"]);
}

#[test]
fn volume_backup_policy_comes_from_labels() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(
        dir.path(),
        "docker-compose.yml",
        "version: '3.8'\nvolumes:\n  data:\n",
    );
    let project = load(&[file], &[]).expect("resolve");
    let inspect = r#"[{
        "Name": "shop_data",
        "Driver": "local",
        "Mountpoint": "/var/lib/containers/storage/volumes/shop_data/_data",
        "CreatedAt": "2024-03-01T12:30:00+01:00",
        "Labels": {
            "work.banananet.podman.backup.stop": "Yes",
            "work.banananet.podman.backup.compress-cmd": "zstd"
        },
        "Scope": "local",
        "Options": null
    }]"#;
    let host = Arc::new(ScriptedExecutor::new().on(
        &["/usr/bin/podman", "--log-level=error", "volume", "inspect", "shop_data"],
        Reply::stdout(inspect),
    ));
    let podman = client(Arc::clone(&host));
    let prefixes = vec!["work.banananet.podman.backup.".to_owned()];

    let data = project.volume("data").unwrap();
    let config = data.backup_config(podman.engine(), &prefixes).unwrap();
    assert!(config.enable);
    assert!(config.stop);
    assert_eq!(
        config.decompress_cmd.as_ref().map(ShellCommand::as_str),
        Some("zstd -d")
    );
    let _ = data.backup_config(podman.engine(), &prefixes).unwrap();
    assert_eq!(host.calls().len(), 1);
    assert!(data.cached_inspect().is_some());
}

#[test]
fn failing_inspect_surfaces_exit_code() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(
        dir.path(),
        "docker-compose.yml",
        "version: '3.8'\nvolumes:\n  data:\n",
    );
    let project = load(&[file], &[]).expect("resolve");
    let host = Arc::new(ScriptedExecutor::new().with_default(Reply::exit(125)));
    let podman = client(host);

    let err = project
        .volume("data")
        .unwrap()
        .inspect(podman.engine())
        .unwrap_err();
    assert!(matches!(err, PcbError::ExecFailed { exit_code: 125, .. }));
}
