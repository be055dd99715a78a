//! Boundary contract: bool / string collapse and the error side channel.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Barrier};

use ember::{params_from_args, Bridge};
use ember_core::testing::{temp_model, FakeEngine};

fn loaded(fake: &FakeEngine) -> Bridge<FakeEngine> {
    let bridge = Bridge::new(fake.clone());
    let path = temp_model("bridge");
    assert!(bridge.load_model(path.to_str().unwrap(), 2, 1024));
    bridge
}

#[test]
fn test_generate_before_load_is_empty() {
    let bridge = Bridge::new(FakeEngine::new().with_reply("never"));
    assert!(!bridge.is_loaded());
    assert_eq!(bridge.generate("hi", 16, 0.8, 0.95, 40, 1.1), "");
    assert_eq!(bridge.last_error(), "no model loaded");
}

#[test]
fn test_load_generate_unload() {
    let fake = FakeEngine::new().with_reply("hello there");
    let bridge = loaded(&fake);
    assert!(bridge.is_loaded());
    assert_eq!(bridge.last_error(), "");

    assert_eq!(bridge.generate("hi", 64, 0.8, 0.95, 40, 1.1), "hello there");

    bridge.unload_model();
    bridge.unload_model();
    assert!(!bridge.is_loaded());
}

#[test]
fn test_bad_path_reports_failure() {
    let bridge = Bridge::new(FakeEngine::new());
    assert!(!bridge.load_model("/no/such/model.gguf", 1, 512));
    assert!(!bridge.is_loaded());
    assert!(bridge.last_error().contains("/no/such/model.gguf"));
}

#[test]
fn test_error_cleared_by_success() {
    let fake = FakeEngine::new().with_reply("ok");
    let bridge = loaded(&fake);

    fake.state().fail_tokenize = true;
    assert_eq!(bridge.generate("x", 8, 0.8, 0.95, 40, 1.1), "");
    assert!(bridge.last_error().starts_with("tokenization failed"));

    fake.state().fail_tokenize = false;
    assert_eq!(bridge.generate("x", 8, 0.8, 0.95, 40, 1.1), "ok");
    assert_eq!(bridge.last_error(), "");
}

#[test]
fn test_negative_max_tokens_is_zero() {
    let fake = FakeEngine::new().with_reply("abc");
    let bridge = loaded(&fake);
    assert_eq!(bridge.generate("x", -5, 0.8, 0.95, 40, 1.1), "");
    assert_eq!(bridge.last_error(), "");
    assert_eq!(params_from_args(-5, 0.8, 0.95, 40, 1.1).max_tokens, 0);
}

#[test]
fn test_chat_fallback_prompt() {
    let fake = FakeEngine::new().with_reply("r");
    let bridge = loaded(&fake);

    let out = bridge.generate_chat(&["system", "user"], &["s", "u"], 8, 0.8, 0.95, 40, 1.1);
    assert_eq!(out, "r");
    let prompt: String = fake.state().prefills[0]
        .iter()
        .map(|t| char::from_u32(t.0 as u32).unwrap())
        .collect();
    assert_eq!(prompt, "system: s\nuser: u\nassistant:");
}

#[test]
fn test_chat_input_validation() {
    let fake = FakeEngine::new().with_reply("r");
    let bridge = loaded(&fake);

    let empty: [&str; 0] = [];
    assert_eq!(bridge.generate_chat(&empty, &empty, 8, 0.8, 0.95, 40, 1.1), "");
    assert!(bridge.last_error().starts_with("invalid chat input"));

    assert_eq!(
        bridge.generate_chat(&["user", "user"], &["one"], 8, 0.8, 0.95, 40, 1.1),
        ""
    );
    assert!(bridge.last_error().contains("2 roles but 1 contents"));
    assert_eq!(fake.state().cache_clears, 0);
    assert!(bridge.is_loaded());
}

#[test]
fn test_idle_cancel_is_reset_by_next_generate() {
    let fake = FakeEngine::new().with_reply("abcdef");
    let bridge = loaded(&fake);
    bridge.cancel_generation();
    assert_eq!(bridge.generate("x", 16, 0.8, 0.95, 40, 1.1), "abcdef");
}

#[test]
fn test_cancel_from_another_thread_stops_generation() {
    let fake = FakeEngine::new().with_reply("abcdefghij");
    let bridge = loaded(&fake);
    let barrier = Arc::new(Barrier::new(2));
    fake.state().pause_at = Some((3, barrier.clone()));

    let text = std::thread::scope(|s| {
        let worker = s.spawn(|| bridge.generate("x", 50, 0.8, 0.95, 40, 1.1));
        // The worker is parked inside its third draw, holding the session.
        barrier.wait();
        bridge.cancel_generation();
        barrier.wait();
        worker.join().unwrap()
    });

    assert_eq!(text, "abc");
    assert_eq!(bridge.last_error(), "");

    // The next request starts uncancelled.
    fake.state().pause_at = None;
    assert_eq!(bridge.generate("x", 50, 0.8, 0.95, 40, 1.1), "abcdefghij");
}

#[test]
fn test_recovers_after_engine_panic() {
    let fake = FakeEngine::new().with_reply("ok");
    let bridge = loaded(&fake);

    fake.state().panic_tokenize = true;
    let res = panic::catch_unwind(AssertUnwindSafe(|| {
        bridge.generate("x", 8, 0.8, 0.95, 40, 1.1)
    }));
    assert!(res.is_err());
    fake.state().panic_tokenize = false;

    // The session that was in use when the panic hit is released.
    assert!(!bridge.is_loaded());
    let released = |fake: &FakeEngine| {
        fake.events()
            .iter()
            .filter(|e| *e == "model released")
            .count()
    };
    assert_eq!(released(&fake), 1);
    assert!(fake.events().ends_with(&[
        "sampler released".to_string(),
        "context released".to_string(),
        "model released".to_string(),
    ]));

    bridge.unload_model();
    assert_eq!(released(&fake), 1);

    let path = temp_model("bridge-after-panic");
    assert!(bridge.load_model(path.to_str().unwrap(), 1, 512));
    assert!(bridge.is_loaded());
    assert_eq!(bridge.generate("x", 8, 0.8, 0.95, 40, 1.1), "ok");
    assert_eq!(bridge.last_error(), "");
}

#[test]
fn test_last_error_mirrors_manager() {
    let fake = FakeEngine::new().with_reply("ok");
    let bridge = loaded(&fake);

    fake.state().fail_context = true;
    let path = temp_model("bridge-mirror");
    assert!(!bridge.load_model(path.to_str().unwrap(), 1, 512));
    assert!(bridge.last_error().contains("out of memory"));

    bridge.unload_model();
    assert_eq!(bridge.last_error(), "");
}

#[test]
fn test_max_tokens_bound() {
    let fake = FakeEngine::new().with_reply("abcdefghij");
    let bridge = loaded(&fake);
    assert_eq!(bridge.generate("x", 3, 0.8, 0.95, 40, 1.1), "abc");
}

#[test]
fn test_reload_replaces_session() {
    let fake = FakeEngine::new().with_reply("r");
    let bridge = loaded(&fake);
    let other = temp_model("bridge-other");
    assert!(bridge.load_model(other.to_str().unwrap(), 0, 0));
    assert!(bridge.is_loaded());
    assert_eq!(fake.state().models_loaded, 2);

    let params = fake.state().context_params[1];
    assert_eq!(params.n_ctx, 2048);
    assert!(params.n_threads >= 1);
}
