//! Environment overrides for session configuration.

use ember_core::config::{DEFAULT_CONTEXT_TOKENS, ENV_CONTEXT_TOKENS, ENV_THREADS};
use ember_core::SessionConfig;
use serial_test::serial;

// SAFETY: every test that touches the environment runs under `#[serial]`.
fn clear_env() {
    unsafe {
        std::env::remove_var(ENV_THREADS);
        std::env::remove_var(ENV_CONTEXT_TOKENS);
    }
}

fn set_env(threads: &str, context_tokens: &str) {
    unsafe {
        std::env::set_var(ENV_THREADS, threads);
        std::env::set_var(ENV_CONTEXT_TOKENS, context_tokens);
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    let c = SessionConfig::from_env("/m.gguf");
    assert_eq!(c.threads, num_cpus::get().max(1) as i32);
    assert_eq!(c.context_tokens, DEFAULT_CONTEXT_TOKENS);
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    set_env("3", " 4096 ");
    let c = SessionConfig::from_env("/m.gguf");
    assert_eq!(c.threads, 3);
    assert_eq!(c.context_tokens, 4096);
    clear_env();
}

#[test]
#[serial]
fn test_from_env_ignores_garbage() {
    clear_env();
    set_env("many", "-5");
    let c = SessionConfig::from_env("/m.gguf");
    assert_eq!(c.threads, num_cpus::get().max(1) as i32);
    assert_eq!(c.context_tokens, DEFAULT_CONTEXT_TOKENS);
    clear_env();
}

#[test]
fn test_config_round_trips_through_json() {
    let c = SessionConfig::new("/models/a.gguf", 4, 2048);
    let js = serde_json::to_string(&c).unwrap();
    let back: SessionConfig = serde_json::from_str(&js).unwrap();
    assert_eq!(back, c);
}
