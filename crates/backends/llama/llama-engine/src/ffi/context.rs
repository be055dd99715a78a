// Context creation plus the vocab and decode calls the generation loop uses.

use std::ffi::{c_char, CString};
use std::ptr::NonNull;

use ember_abi::{ContextParams, EngineError, Token, TokenizeFlags};
use llama_cpp_sys_2::{
    llama_batch_get_one, llama_context, llama_context_default_params, llama_context_params,
    llama_decode, llama_free, llama_get_memory, llama_init_from_model, llama_memory_clear,
    llama_model, llama_model_get_vocab, llama_token, llama_token_to_piece, llama_tokenize,
    llama_vocab, llama_vocab_is_eog,
};
use tracing::trace;

/// Upstream defaults with the window, batch and thread counts applied. One
/// sequence only.
pub fn context_params(p: &ContextParams) -> llama_context_params {
    let mut out = unsafe { llama_context_default_params() };
    out.n_ctx = p.n_ctx;
    out.n_batch = p.n_batch;
    out.n_ubatch = p.n_batch;
    out.n_seq_max = 1;
    out.n_threads = p.n_threads;
    out.n_threads_batch = p.n_threads_batch;
    out.embeddings = false;
    out
}

pub fn create_context(
    model: NonNull<llama_model>,
    p: &ContextParams,
) -> Result<NonNull<llama_context>, EngineError> {
    let raw = unsafe { llama_init_from_model(model.as_ptr(), context_params(p)) };
    NonNull::new(raw).ok_or_else(|| {
        EngineError::ContextCreation(format!(
            "llama_init_from_model returned null (n_ctx={})",
            p.n_ctx
        ))
    })
}

/// # Safety
/// `ctx` must come from [`create_context`] and not be freed yet.
pub unsafe fn free_context(ctx: NonNull<llama_context>) {
    trace!("llama_free(context)");
    llama_free(ctx.as_ptr());
}

#[inline]
fn vocab(model: NonNull<llama_model>) -> *const llama_vocab {
    unsafe { llama_model_get_vocab(model.as_ptr()) }
}

/// Two-pass tokenize: a zero-capacity probe reports `-needed`, then fill.
pub fn tokenize(
    model: NonNull<llama_model>,
    text: &str,
    flags: TokenizeFlags,
) -> Result<Vec<Token>, EngineError> {
    let c_text =
        CString::new(text).map_err(|_| EngineError::Tokenize("text has interior NUL".into()))?;
    let text_len = i32::try_from(c_text.as_bytes().len())
        .map_err(|_| EngineError::Tokenize("text too long".into()))?;
    let vocab = vocab(model);

    let probe = unsafe {
        llama_tokenize(
            vocab,
            c_text.as_ptr(),
            text_len,
            std::ptr::null_mut(),
            0,
            flags.add_special,
            flags.parse_special,
        )
    };
    let needed = probe.unsigned_abs() as usize;
    if needed == 0 {
        return Ok(Vec::new());
    }

    let mut buf: Vec<llama_token> = vec![0; needed];
    let filled = unsafe {
        llama_tokenize(
            vocab,
            c_text.as_ptr(),
            text_len,
            buf.as_mut_ptr(),
            buf.len() as i32,
            flags.add_special,
            flags.parse_special,
        )
    };
    if filled < 0 {
        return Err(EngineError::Tokenize(format!(
            "llama_tokenize needed {} tokens after sizing to {needed}",
            -filled
        )));
    }
    buf.truncate(filled as usize);
    Ok(buf.into_iter().map(Token).collect())
}

/// Evaluate `tokens` as one batch continuing sequence 0.
pub fn decode(ctx: NonNull<llama_context>, tokens: &[Token]) -> Result<(), EngineError> {
    if tokens.is_empty() {
        return Ok(());
    }
    // llama_batch_get_one takes a mutable pointer but does not write through it.
    let mut ids: Vec<llama_token> = tokens.iter().map(|t| t.0).collect();
    let n = i32::try_from(ids.len()).map_err(|_| EngineError::Decode(-1))?;
    let rc = unsafe {
        let batch = llama_batch_get_one(ids.as_mut_ptr(), n);
        llama_decode(ctx.as_ptr(), batch)
    };
    if rc != 0 {
        Err(EngineError::Decode(rc))
    } else {
        Ok(())
    }
}

/// Drop all cached state, data buffers included.
pub fn clear_memory(ctx: NonNull<llama_context>) {
    unsafe {
        let mem = llama_get_memory(ctx.as_ptr());
        llama_memory_clear(mem, true);
    }
}

pub fn is_eog(model: NonNull<llama_model>, token: Token) -> bool {
    unsafe { llama_vocab_is_eog(vocab(model), token.0) }
}

/// Raw piece bytes with special tokens rendered. Grows once if the first
/// buffer is too small.
pub fn token_to_piece(model: NonNull<llama_model>, token: Token) -> Result<Vec<u8>, EngineError> {
    let vocab = vocab(model);
    let mut buf: Vec<c_char> = vec![0; 32];
    let mut n = unsafe {
        llama_token_to_piece(vocab, token.0, buf.as_mut_ptr(), buf.len() as i32, 0, true)
    };
    if n < 0 {
        buf.resize(n.unsigned_abs() as usize, 0);
        n = unsafe {
            llama_token_to_piece(vocab, token.0, buf.as_mut_ptr(), buf.len() as i32, 0, true)
        };
        if n < 0 {
            return Err(EngineError::Piece(token.0, format!("needs {} bytes", -n)));
        }
    }
    Ok(buf[..n as usize].iter().map(|&c| c as u8).collect())
}
