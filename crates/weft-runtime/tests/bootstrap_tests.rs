//! Bootstrapping an engine from configuration and plan files.

use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use weft_component::{LifecycleState, PortSpec};
use weft_runtime::{
    ConfigLoader, Engine, EngineError, JsonPlanSource, SelectionPolicy, TomlPlanSource,
    FACTORY_PORT, INSTANTIATE_OPERATION,
};

// =============================================================================
// Test Fixtures
// =============================================================================

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

const CONFIG: &str = r#"
[resolution]
policy = "round_robin"

[gc]
auto_collect = true

[[membrane.controllers]]
kind = "trace"
"#;

const PLAN: &str = r#"
key = "app"

[[children]]
key = "store"
ports = [{ name = "kv", direction = "provided", contract = "Kv" }]

[[children]]
key = "api"
ports = [{ name = "kv", direction = "required", contract = "Kv" }]

[[bindings]]
required = { component = "api", port = "kv" }
provided = { component = "store", port = "kv" }
"#;

fn configured_engine(dir: &Path) -> Engine {
    let path = write_file(dir, "weft.toml", CONFIG);
    let config = ConfigLoader::new()
        .with_config_file(path)
        .skip_env_vars()
        .load()
        .unwrap();
    Engine::with_config(config)
}

// =============================================================================
// Bootstrap
// =============================================================================

#[test]
fn bootstrap_from_toml_file() {
    let temp = TempDir::new().unwrap();
    let engine = configured_engine(temp.path());
    assert_eq!(engine.config().resolution.policy, SelectionPolicy::RoundRobin);

    let plan = write_file(temp.path(), "app.toml", PLAN);
    let app = engine.bootstrap(&TomlPlanSource::file(plan)).unwrap();

    assert_eq!(engine.state(app).unwrap(), LifecycleState::Started);
    let api = engine.find_by_key("api").unwrap();
    let store = engine.find_by_key("store").unwrap();
    assert_eq!(engine.state(api).unwrap(), LifecycleState::Started);
    assert_eq!(engine.view(api).unwrap().controllers, vec!["trace"]);
    assert_eq!(
        engine.resolve(engine.port(api, "kv").unwrap()).unwrap().ports(),
        vec![engine.port(store, "kv").unwrap()]
    );
    assert_eq!(engine.loaded_plans(), vec!["app"]);
}

#[test]
fn unload_with_auto_collect() {
    let temp = TempDir::new().unwrap();
    let engine = configured_engine(temp.path());
    engine.bootstrap(&TomlPlanSource::inline(PLAN)).unwrap();
    let before = engine.len();

    engine.unload("app").unwrap();
    assert_eq!(engine.len(), before - 3);
    assert!(engine.unreachable().is_empty());
    assert!(engine.find_by_key("store").is_none());
}

#[test]
fn unreadable_plan_file_is_invalid_plan() {
    let temp = TempDir::new().unwrap();
    let engine = Engine::new();
    let err = engine
        .bootstrap(&JsonPlanSource::file(temp.path().join("missing.json")))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPlan(ref m) if m.contains("failed to read")));
    assert_eq!(engine.state(engine.bootstrap_id()).unwrap(), LifecycleState::New);
}

#[test]
fn plans_can_be_sent_to_the_factory_port() {
    let engine = Engine::new();
    engine
        .bootstrap(&JsonPlanSource::inline(r#"{"key": "shell"}"#))
        .unwrap();

    let builder = engine.create_component("builder");
    let out = engine
        .invoke_provided(
            engine.factory_id(),
            FACTORY_PORT,
            INSTANTIATE_OPERATION,
            json!({
                "key": "worker",
                "ports": [{ "name": "jobs", "direction": "provided", "contract": "Jobs" }]
            }),
        )
        .unwrap();
    assert_eq!(out["key"], json!("worker"));

    let worker = engine.find_by_key("worker").unwrap();
    assert_eq!(engine.state(worker).unwrap(), LifecycleState::New);
    assert!(engine.parents(worker).unwrap().is_empty());
    assert_eq!(
        engine.port_spec(engine.port(worker, "jobs").unwrap()).unwrap(),
        PortSpec::provided("jobs", "Jobs")
    );

    engine.attach(builder, worker).unwrap();
    engine.start(builder).unwrap();
    assert_eq!(engine.state(worker).unwrap(), LifecycleState::Started);
}
