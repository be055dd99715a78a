//! Load / unload behaviour of the session manager.

use ember_core::testing::{temp_model, FakeEngine};
use ember_core::{EmberError, ErrorKind, SessionConfig, SessionManager};

fn config(tag: &str) -> SessionConfig {
    SessionConfig::new(temp_model(tag), 2, 1024)
}

#[test]
fn test_load_then_unload() {
    let fake = FakeEngine::new();
    let mut mgr = SessionManager::new(fake.clone());
    assert!(!mgr.is_loaded());

    mgr.load(config("load-unload")).unwrap();
    assert!(mgr.is_loaded());
    assert_eq!(mgr.config().unwrap().context_tokens, 1024);
    assert_eq!(fake.state().backend_inits, 1);

    mgr.unload();
    assert!(!mgr.is_loaded());
    assert!(mgr.config().is_none());
}

#[test]
fn test_unload_is_idempotent() {
    let fake = FakeEngine::new();
    let mut mgr = SessionManager::new(fake.clone());
    mgr.unload();

    mgr.load(config("unload-twice")).unwrap();
    mgr.unload();
    mgr.unload();
    assert!(!mgr.is_loaded());

    let released = fake
        .events()
        .iter()
        .filter(|e| e.as_str() == "model released")
        .count();
    assert_eq!(released, 1);
}

#[test]
fn test_missing_file_fails_before_engine() {
    let fake = FakeEngine::new();
    let mut mgr = SessionManager::new(fake.clone());

    let err = mgr
        .load(SessionConfig::new("/definitely/not/here.gguf", 1, 512))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelLoadFailed);
    assert!(!mgr.is_loaded());
    assert_eq!(fake.state().models_loaded, 0);
    assert!(mgr.last_error().unwrap().contains("not/here.gguf"));
}

#[test]
fn test_unload_clears_last_error() {
    let mut mgr = SessionManager::new(FakeEngine::new());
    assert!(mgr.load(SessionConfig::new("/nope.gguf", 1, 512)).is_err());
    assert!(mgr.last_error().is_some());
    mgr.unload();
    assert!(mgr.last_error().is_none());
}

#[test]
fn test_engine_rejects_model() {
    let fake = FakeEngine::new();
    fake.state().fail_load = true;
    let mut mgr = SessionManager::new(fake.clone());

    let err = mgr.load(config("reject")).unwrap_err();
    assert!(matches!(err, EmberError::ModelLoadFailed { .. }));
    assert!(!mgr.is_loaded());
}

#[test]
fn test_context_failure_rolls_back_model() {
    let fake = FakeEngine::new();
    fake.state().fail_context = true;
    let mut mgr = SessionManager::new(fake.clone());

    let err = mgr.load(config("rollback")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContextCreationFailed);
    assert!(!mgr.is_loaded());
    assert_eq!(
        fake.events(),
        vec!["model loaded".to_string(), "model released".to_string()]
    );
    assert!(mgr.last_error().unwrap().contains("out of memory"));

    fake.state().fail_context = false;
    mgr.load(config("rollback")).unwrap();
    assert!(mgr.is_loaded());
    assert!(mgr.last_error().is_none());
}

#[test]
fn test_release_order_is_sampler_context_model() {
    let fake = FakeEngine::new().with_reply("ok");
    let mut mgr = SessionManager::new(fake.clone());
    mgr.load(config("release-order")).unwrap();
    mgr.generate(&ember_core::GenerationRequest::new("hi", Default::default()))
        .unwrap();

    fake.state().events.clear();
    mgr.unload();
    assert_eq!(
        fake.events(),
        vec!["sampler released", "context released", "model released"]
    );
}

#[test]
fn test_load_replaces_previous_session() {
    let fake = FakeEngine::new();
    let mut mgr = SessionManager::new(fake.clone());
    mgr.load(config("first")).unwrap();

    fake.state().events.clear();
    mgr.load(config("second")).unwrap();
    let events = fake.events();
    assert_eq!(&events[..3], &["context released", "model released", "model loaded"]);
    assert!(mgr.config().unwrap().model_path.ends_with(
        format!("second-{}.gguf", std::process::id())
    ));
}

#[test]
fn test_failed_load_leaves_nothing_loaded() {
    let fake = FakeEngine::new();
    let mut mgr = SessionManager::new(fake.clone());
    mgr.load(config("good")).unwrap();

    fake.state().fail_load = true;
    assert!(mgr.load(config("good")).is_err());
    assert!(!mgr.is_loaded());
}

#[test]
fn test_ensure_loaded_skips_identical_config() {
    let fake = FakeEngine::new();
    let mut mgr = SessionManager::new(fake.clone());
    let cfg = config("ensure");

    mgr.ensure_loaded(cfg.clone()).unwrap();
    mgr.ensure_loaded(cfg.clone()).unwrap();
    assert_eq!(fake.state().models_loaded, 1);

    let mut wider = cfg;
    wider.context_tokens = 4096;
    mgr.ensure_loaded(wider).unwrap();
    assert_eq!(fake.state().models_loaded, 2);
    assert_eq!(mgr.config().unwrap().context_tokens, 4096);
}

#[test]
fn test_context_params_follow_config() {
    let fake = FakeEngine::new();
    let mut mgr = SessionManager::new(fake.clone());
    mgr.load(SessionConfig::new(temp_model("params"), 3, 777))
        .unwrap();

    let params = fake.state().context_params[0];
    assert_eq!(params.n_ctx, 777);
    assert_eq!(params.n_batch, 777);
    assert_eq!(params.n_threads, 3);
    assert_eq!(params.n_threads_batch, 3);
}

#[test]
fn test_drop_releases_session() {
    let fake = FakeEngine::new();
    {
        let mut mgr = SessionManager::new(fake.clone());
        mgr.load(config("drop")).unwrap();
    }
    assert_eq!(fake.events().last().map(String::as_str), Some("model released"));
}
