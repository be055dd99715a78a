use core::ffi::c_char;

/// Bump this when you break the ABI. Callers check it at load time.
pub const EMBER_ABI_VERSION: u32 = 1;

/// Library-owned UTF-8 string (NUL-terminated; `len` excludes the NUL).
/// Release with `ember_free_string`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EmberString {
    pub ptr: *mut c_char,
    pub len: usize,
}

impl EmberString {
    pub const fn null() -> Self {
        Self {
            ptr: core::ptr::null_mut(),
            len: 0,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }
}

// ---------- Function pointer types (C ABI) ----------

pub type LoadModelFn =
    unsafe extern "C" fn(model_path: *const c_char, threads: i32, context_tokens: i32) -> bool;

pub type GenerateFn = unsafe extern "C" fn(
    prompt: *const c_char,
    max_tokens: i32,
    temperature: f32,
    top_p: f32,
    top_k: i32,
    repeat_penalty: f32,
) -> EmberString;

pub type GenerateChatFn = unsafe extern "C" fn(
    roles: *const *const c_char,
    n_roles: usize,
    contents: *const *const c_char,
    n_contents: usize,
    max_tokens: i32,
    temperature: f32,
    top_p: f32,
    top_k: i32,
    repeat_penalty: f32,
) -> EmberString;

pub type CancelFn = unsafe extern "C" fn();
pub type UnloadFn = unsafe extern "C" fn();
pub type IsLoadedFn = unsafe extern "C" fn() -> bool;
pub type LastErrorFn = unsafe extern "C" fn() -> EmberString;
pub type FreeStringFn = unsafe extern "C" fn(s: EmberString);
