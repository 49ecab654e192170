//! `fleet-workerd`/`fleet-statusd` must fail fast, before touching any
//! network, when a required environment variable is missing — the
//! "ConfigurationError is fatal at start" rule the ambient config
//! layer follows throughout (`WorkerConfig::from_env`,
//! `DalConfig::from_env`, `BrokerConfig::from_env`, `StatusConfig::from_env`).

use std::path::{Path, PathBuf};

use assert_cmd::Command;

fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

fn cmd(name: &str) -> Command {
    let mut command = Command::new(binary_path(name));
    command.env_clear();
    command
}

#[test]
fn fleet_workerd_refuses_to_start_without_an_install_root() {
    cmd("fleet-workerd")
        .env("FLEET_DAL_URL", "http://localhost:9999")
        .env("FLEET_BROKER_URI", "amqp://localhost:5672")
        .env("FLEET_WORKER_INSTALLER_BINARY", "/bin/true")
        .assert()
        .failure();
}

#[test]
fn fleet_workerd_refuses_to_start_without_an_installer_binary() {
    cmd("fleet-workerd")
        .env("FLEET_WORKER_INSTALL_ROOT", "/tmp")
        .env("FLEET_DAL_URL", "http://localhost:9999")
        .env("FLEET_BROKER_URI", "amqp://localhost:5672")
        .assert()
        .failure();
}

#[test]
fn fleet_workerd_refuses_to_start_without_a_broker_uri() {
    cmd("fleet-workerd")
        .env("FLEET_WORKER_INSTALL_ROOT", "/tmp")
        .env("FLEET_DAL_URL", "http://localhost:9999")
        .env("FLEET_WORKER_INSTALLER_BINARY", "/bin/true")
        .assert()
        .failure();
}

#[test]
fn fleet_statusd_refuses_to_start_without_a_database_url() {
    cmd("fleet-statusd")
        .env("FLEET_BROKER_URI", "amqp://localhost:5672")
        .assert()
        .failure();
}

#[test]
fn fleet_statusd_refuses_to_start_without_a_broker_uri() {
    cmd("fleet-statusd")
        .env("FLEET_STATUS_DATABASE_URL", "postgres://localhost/fleet")
        .assert()
        .failure();
}
