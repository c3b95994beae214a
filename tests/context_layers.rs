//! Integration tests for service injection: swapping live and mock services,
//! and building an application from dependent layers.

use std::collections::HashMap;
use std::sync::Arc;
use undertow::testing::TestContext;
use undertow::{
    assert_die, assert_fail, assert_success, run_promise, run_sync, service_tag, Cause, DefectKind,
    Effect, Layer, Runtime,
};

// ============================================================================
// Random: one program, two implementations
// ============================================================================

#[derive(Clone)]
struct Random {
    next_int_between: Arc<dyn Fn(i64, i64) -> Effect<i64> + Send + Sync>,
}

service_tag!(RandomTag => Random);

fn random_live() -> Random {
    Random {
        next_int_between: Arc::new(|min: i64, max: i64| -> Effect<i64> {
            Effect::sync(move || {
                let nanos = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.subsec_nanos() as i64)
                    .unwrap_or(0);
                min + nanos % (max - min + 1)
            })
        }),
    }
}

fn random_mock(value: i64) -> Random {
    Random {
        next_int_between: Arc::new(move |_: i64, _: i64| -> Effect<i64> { Effect::succeed(value) }),
    }
}

fn high_or_low() -> Effect<&'static str> {
    Effect::gen(|cx| async move {
        let random = cx.service::<RandomTag>()?;
        let n = cx.bind((random.next_int_between)(1, 10)).await?;
        Ok(if n < 5 { "Low" } else { "High" })
    })
}

#[test]
fn live_random_produces_either_answer() {
    let exit = run_sync(high_or_low().provide_service::<RandomTag>(random_live()));
    assert!(matches!(exit.success(), Some("Low") | Some("High")));
}

#[test]
fn mock_random_is_deterministic() {
    let high = high_or_low().provide_service::<RandomTag>(random_mock(5));
    let low = high_or_low().provide_service::<RandomTag>(random_mock(2));

    assert_success!(run_sync(high), "High");
    assert_success!(run_sync(low), "Low");
}

#[test]
fn test_context_runtime_supplies_mock() {
    let runtime = TestContext::new()
        .with::<RandomTag>(random_mock(9))
        .runtime();
    assert_success!(runtime.run_sync(high_or_low()), "High");
}

#[test]
fn unprovided_service_dies_with_its_name() {
    assert_die!(
        run_sync(high_or_low()),
        DefectKind::MissingService { service: "RandomTag" }
    );
}

// ============================================================================
// FeatureFlags built from ConfigFile
// ============================================================================

#[derive(Clone)]
struct ConfigFile {
    contents: HashMap<String, bool>,
}

#[derive(Clone)]
struct FeatureFlags {
    is_enabled: Arc<dyn Fn(&str) -> Effect<bool> + Send + Sync>,
}

service_tag!(ConfigFileTag => ConfigFile);
service_tag!(FeatureFlagsTag => FeatureFlags);

#[derive(Debug, Clone, PartialEq)]
struct ConfigError(String);

fn feature_flags_live() -> Layer<ConfigError> {
    Layer::effect::<FeatureFlagsTag>(Effect::service::<ConfigFileTag>().map(|config| {
        FeatureFlags {
            is_enabled: Arc::new(move |flag: &str| -> Effect<bool> {
                let enabled = config.contents.get(flag).copied().unwrap_or(false);
                Effect::succeed(enabled)
            }),
        }
    }))
    .depends_on::<ConfigFileTag>()
}

fn config_file_live(path: std::path::PathBuf) -> Layer<ConfigError> {
    let read: Effect<String, ConfigError> = Effect::try_promise(
        move || {
            let path = path.clone();
            async move { std::fs::read_to_string(path) }
        },
        |_| ConfigError("Could not read config file".into()),
    );
    let parsed = read.flat_map(|contents| {
        Effect::try_sync(
            move || serde_json::from_str::<HashMap<String, bool>>(&contents),
            |_| ConfigError("Could not parse config file".into()),
        )
    });
    Layer::effect::<ConfigFileTag>(parsed.map(|contents| ConfigFile { contents }))
}

fn config_file_mock(pairs: &[(&str, bool)]) -> Layer<ConfigError> {
    let contents = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    Layer::succeed::<ConfigFileTag>(ConfigFile { contents }).widen_error()
}

fn main_program() -> Effect<&'static str, ConfigError> {
    Effect::service::<FeatureFlagsTag>()
        .flat_map(|flags| (flags.is_enabled)("foo").widen_error())
        .map(|enabled| if enabled { "Enabled" } else { "Disabled" })
}

fn temp_config(name: &str, body: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!(
        "undertow_config_{}_{}.json",
        name,
        std::process::id()
    ));
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn feature_flags_without_config_dies() {
    assert_die!(
        run_sync(main_program().provide(feature_flags_live())),
        DefectKind::MissingService { service: "ConfigFileTag" }
    );
}

#[test]
fn feature_flags_over_mock_config() {
    let enabled = feature_flags_live().provide(config_file_mock(&[("foo", true)]));
    let disabled = feature_flags_live().provide(config_file_mock(&[("bar", true)]));

    assert_success!(run_sync(main_program().provide(enabled)), "Enabled");
    assert_success!(run_sync(main_program().provide(disabled)), "Disabled");
}

#[test]
fn final_layer_has_no_requirements() {
    let final_layer = feature_flags_live().provide(config_file_mock(&[]));
    assert!(final_layer.requirements().is_empty());
    assert_eq!(final_layer.outputs().len(), 1);
}

#[tokio::test]
async fn feature_flags_over_config_file() {
    let path = temp_config("enabled", r#"{"foo": true}"#);
    let final_layer = feature_flags_live().provide(config_file_live(path.clone()));

    let result = run_promise(main_program().provide(final_layer)).await;
    std::fs::remove_file(&path).unwrap();
    assert_eq!(result, Ok("Enabled"));
}

#[tokio::test]
async fn unreadable_config_fails_the_program() {
    let path = std::env::temp_dir().join("undertow_config_missing_file.json");
    let final_layer = feature_flags_live().provide(config_file_live(path));

    let result = run_promise(main_program().provide(final_layer)).await;
    assert_eq!(
        result,
        Err(Cause::Fail(ConfigError("Could not read config file".into())))
    );
}

#[tokio::test]
async fn malformed_config_fails_the_program() {
    let path = temp_config("malformed", "{not json");
    let final_layer = feature_flags_live().provide(config_file_live(path.clone()));

    let exit = Runtime::new()
        .run_exit(main_program().provide(final_layer))
        .await;
    std::fs::remove_file(&path).unwrap();
    assert_fail!(exit, ConfigError("Could not parse config file".into()));
}

#[test]
fn config_file_layer_needs_async_run() {
    let path = temp_config("sync", r#"{"foo": true}"#);
    let final_layer = feature_flags_live().provide(config_file_live(path.clone()));

    let exit = run_sync(main_program().provide(final_layer));
    std::fs::remove_file(&path).unwrap();
    assert_die!(exit, DefectKind::AsyncInSyncRun);
}

#[test]
fn graph_assembles_layers_in_any_order() {
    let app = Layer::graph([feature_flags_live(), config_file_mock(&[("foo", true)])]).unwrap();
    assert_success!(run_sync(main_program().provide(app)), "Enabled");
}
