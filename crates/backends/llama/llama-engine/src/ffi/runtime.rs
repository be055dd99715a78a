// Process-wide backend init, model load/free and chat-template helpers.

use std::ffi::{c_char, CStr, CString};
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::OnceLock;

use ember_abi::{ChatMessage, EngineError, ModelParams};
use llama_cpp_sys_2::{
    llama_backend_init, llama_chat_apply_template, llama_chat_builtin_templates,
    llama_chat_message, llama_model, llama_model_chat_template, llama_model_default_params,
    llama_model_free, llama_model_load_from_file, llama_model_params,
};
use tracing::{debug, trace};

static BACKEND_INIT: OnceLock<()> = OnceLock::new();

/// One-time `llama_backend_init`; later calls are ignored.
pub fn init_backend() {
    BACKEND_INIT.get_or_init(|| {
        debug!("llama_backend_init");
        unsafe { llama_backend_init() };
    });
}

pub fn model_params(p: &ModelParams) -> llama_model_params {
    let mut out = unsafe { llama_model_default_params() };
    out.n_gpu_layers = p.gpu_layers;
    out.use_mmap = p.use_mmap;
    out
}

pub fn load_model(path: &Path, p: &ModelParams) -> Result<NonNull<llama_model>, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::ModelLoad("path is not valid UTF-8".into()))?;
    let c_path =
        CString::new(path_str).map_err(|_| EngineError::ModelLoad("path has interior NUL".into()))?;
    trace!(path = path_str, "llama_model_load_from_file");
    let raw = unsafe { llama_model_load_from_file(c_path.as_ptr(), model_params(p)) };
    NonNull::new(raw)
        .ok_or_else(|| EngineError::ModelLoad("llama_model_load_from_file returned null".into()))
}

/// # Safety
/// `model` must come from [`load_model`] and not be freed yet, and no
/// context created from it may still be alive.
pub unsafe fn free_model(model: NonNull<llama_model>) {
    trace!("llama_model_free");
    llama_model_free(model.as_ptr());
}

/// The template stored in the model's metadata, if any.
pub fn model_chat_template(model: NonNull<llama_model>) -> Option<String> {
    let raw = unsafe { llama_model_chat_template(model.as_ptr(), ptr::null()) };
    if raw.is_null() {
        return None;
    }
    let tmpl = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
    debug!(len = tmpl.len(), "model carries a chat template");
    Some(tmpl)
}

/// Names of llama.cpp's built-in templates.
pub fn builtin_templates() -> Vec<String> {
    let n = unsafe { llama_chat_builtin_templates(ptr::null_mut(), 0) };
    if n <= 0 {
        return Vec::new();
    }
    let mut names: Vec<*const c_char> = vec![ptr::null(); n as usize];
    let got = unsafe { llama_chat_builtin_templates(names.as_mut_ptr(), names.len()) };
    names
        .into_iter()
        .take(got.max(0) as usize)
        .filter(|p| !p.is_null())
        .map(|p| unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned())
        .collect()
}

/// Keeps the C strings alive while llama reads them.
struct ChatMsgFFI {
    _role: CString,
    _content: CString,
    c_msg: llama_chat_message,
}

impl ChatMsgFFI {
    fn new(m: &ChatMessage) -> Result<Self, EngineError> {
        let role = CString::new(m.role.as_str())
            .map_err(|_| EngineError::Template("role has interior NUL".into()))?;
        let content = CString::new(m.content.as_str())
            .map_err(|_| EngineError::Template("content has interior NUL".into()))?;
        let c_msg = llama_chat_message {
            role: role.as_ptr(),
            content: content.as_ptr(),
        };
        Ok(Self {
            _role: role,
            _content: content,
            c_msg,
        })
    }
}

/// Probe for the rendered length, then fill a buffer of exactly that size.
/// A non-positive probe renders to an empty string.
pub fn apply_chat_template(
    template: &str,
    messages: &[ChatMessage],
    add_assistant: bool,
) -> Result<String, EngineError> {
    let tmpl = CString::new(template)
        .map_err(|_| EngineError::Template("template has interior NUL".into()))?;
    let owned = messages
        .iter()
        .map(ChatMsgFFI::new)
        .collect::<Result<Vec<_>, _>>()?;
    let c_msgs: Vec<llama_chat_message> = owned.iter().map(|m| m.c_msg).collect();

    let needed = unsafe {
        llama_chat_apply_template(
            tmpl.as_ptr(),
            c_msgs.as_ptr(),
            c_msgs.len(),
            add_assistant,
            ptr::null_mut(),
            0,
        )
    };
    if needed <= 0 {
        debug!(needed, "chat template rendered nothing");
        return Ok(String::new());
    }

    let mut buf: Vec<c_char> = vec![0; needed as usize + 1];
    let wrote = unsafe {
        llama_chat_apply_template(
            tmpl.as_ptr(),
            c_msgs.as_ptr(),
            c_msgs.len(),
            add_assistant,
            buf.as_mut_ptr(),
            buf.len() as i32,
        )
    };
    if wrote < 0 {
        return Err(EngineError::Template(format!(
            "llama_chat_apply_template failed ({wrote})"
        )));
    }
    let len = (wrote as usize).min(buf.len());
    let bytes: Vec<u8> = buf[..len].iter().map(|&c| c as u8).collect();
    String::from_utf8(bytes).map_err(|e| EngineError::Template(format!("non-UTF-8 output: {e}")))
}
