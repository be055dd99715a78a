//! `extern "C"` surface backed by llama.cpp.
//!
//! Strings returned here are owned by the library; release them with
//! [`ember_free_string`]. No export unwinds into the caller.

use std::ffi::c_char;
use std::panic::{self, AssertUnwindSafe};

use ember_abi::ffi::{
    CancelFn, EmberString, FreeStringFn, GenerateChatFn, GenerateFn, IsLoadedFn, LastErrorFn,
    LoadModelFn, UnloadFn, EMBER_ABI_VERSION,
};
use llama_engine::LlamaEngine;
use once_cell::sync::Lazy;

use crate::marshal::{free_string, make_string, str_arg, str_array};
use crate::Bridge;

static BRIDGE: Lazy<Bridge<LlamaEngine>> = Lazy::new(|| Bridge::new(LlamaEngine::new()));

// Keep the exports in step with the published function-pointer types.
const _: LoadModelFn = ember_load_model;
const _: GenerateFn = ember_generate;
const _: GenerateChatFn = ember_generate_chat;
const _: CancelFn = ember_cancel_generation;
const _: UnloadFn = ember_unload_model;
const _: IsLoadedFn = ember_is_loaded;
const _: LastErrorFn = ember_last_error;
const _: FreeStringFn = ember_free_string;

fn guard<T>(what: &str, fallback: T, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(v) => v,
        Err(_) => {
            BRIDGE.note_error(format!("panic in {what}"));
            fallback
        }
    }
}

#[no_mangle]
pub extern "C" fn ember_abi_version() -> u32 {
    EMBER_ABI_VERSION
}

/// # Safety
/// `model_path` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn ember_load_model(
    model_path: *const c_char,
    threads: i32,
    context_tokens: i32,
) -> bool {
    guard("ember_load_model", false, || {
        match str_arg(model_path, "model path") {
            Ok(path) => BRIDGE.load_model(path, threads, context_tokens),
            Err(e) => {
                BRIDGE.note_error(e);
                false
            }
        }
    })
}

/// # Safety
/// `prompt` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn ember_generate(
    prompt: *const c_char,
    max_tokens: i32,
    temperature: f32,
    top_p: f32,
    top_k: i32,
    repeat_penalty: f32,
) -> EmberString {
    let text = guard("ember_generate", String::new(), || {
        match str_arg(prompt, "prompt") {
            Ok(p) => BRIDGE.generate(p, max_tokens, temperature, top_p, top_k, repeat_penalty),
            Err(e) => {
                BRIDGE.note_error(e);
                String::new()
            }
        }
    });
    make_string(&text)
}

/// # Safety
/// `roles` / `contents` must point to `n_roles` / `n_contents` valid
/// NUL-terminated strings (or be null with a zero count).
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn ember_generate_chat(
    roles: *const *const c_char,
    n_roles: usize,
    contents: *const *const c_char,
    n_contents: usize,
    max_tokens: i32,
    temperature: f32,
    top_p: f32,
    top_k: i32,
    repeat_penalty: f32,
) -> EmberString {
    let text = guard("ember_generate_chat", String::new(), || {
        let parts = str_array(roles, n_roles, "roles")
            .and_then(|r| str_array(contents, n_contents, "contents").map(|c| (r, c)));
        match parts {
            Ok((r, c)) => BRIDGE.generate_chat(
                &r,
                &c,
                max_tokens,
                temperature,
                top_p,
                top_k,
                repeat_penalty,
            ),
            Err(e) => {
                BRIDGE.note_error(e);
                String::new()
            }
        }
    });
    make_string(&text)
}

#[no_mangle]
pub extern "C" fn ember_cancel_generation() {
    guard("ember_cancel_generation", (), || BRIDGE.cancel_generation());
}

#[no_mangle]
pub extern "C" fn ember_unload_model() {
    guard("ember_unload_model", (), || BRIDGE.unload_model());
}

#[no_mangle]
pub extern "C" fn ember_is_loaded() -> bool {
    guard("ember_is_loaded", false, || BRIDGE.is_loaded())
}

/// Empty string when the last call succeeded.
#[no_mangle]
pub extern "C" fn ember_last_error() -> EmberString {
    let text = guard("ember_last_error", String::new(), || BRIDGE.last_error());
    make_string(&text)
}

/// # Safety
/// `s` must be a string returned by this library, freed at most once.
#[no_mangle]
pub unsafe extern "C" fn ember_free_string(s: EmberString) {
    free_string(s);
}
