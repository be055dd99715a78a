//! Deterministic in-memory engine for tests.
//!
//! Text tokenizes one token per `char` (the token id is the code point) and
//! the sampler replays a scripted reply. Every handle records its release in
//! a shared event log so tests can check teardown order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier, Mutex, MutexGuard};

use ember_abi::{
    ChatMessage, ContextParams, EngineError, InferenceEngine, ModelParams, SamplerChain, Token,
    TokenizeFlags,
};

use crate::cancel::CancelSignal;

/// End-of-generation token.
pub const EOS: Token = Token(0);

/// First id above the code point range; use these for custom byte pieces.
pub const CUSTOM_PIECE_BASE: i32 = 0x11_0000;

/// Knobs and recordings shared by an engine and all of its handles.
#[derive(Debug, Default)]
pub struct FakeState {
    pub reply: Vec<Token>,
    pub pieces: HashMap<i32, Vec<u8>>,
    pub embedded_template: Option<String>,
    pub builtins: Vec<String>,

    pub fail_load: bool,
    pub fail_context: bool,
    pub fail_tokenize: bool,
    pub panic_tokenize: bool,
    pub fail_prefill: bool,
    /// Fail the single-token evaluation after this many succeeded.
    pub fail_decode_after: Option<usize>,
    /// Fail the draw after this many succeeded.
    pub fail_sample_after: Option<usize>,
    /// Trip the signal on this draw (1-based).
    pub cancel_at: Option<(usize, CancelSignal)>,
    /// Block on this draw (1-based): wait on the barrier once to meet the
    /// other thread, then again until it has acted.
    pub pause_at: Option<(usize, Arc<Barrier>)>,

    pub events: Vec<String>,
    pub backend_inits: usize,
    pub models_loaded: usize,
    pub cache_clears: usize,
    pub prefills: Vec<Vec<Token>>,
    pub chains: Vec<SamplerChain>,
    pub templates_applied: Vec<String>,
    pub context_params: Vec<ContextParams>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<FakeState>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the reply as text; the sampler emits one token per char and
    /// then EOS.
    pub fn with_reply(self, text: &str) -> Self {
        self.state().reply = text.chars().map(char_token).collect();
        self
    }

    pub fn with_reply_tokens(self, tokens: Vec<Token>) -> Self {
        self.state().reply = tokens;
        self
    }

    /// Map `token` to raw bytes instead of its code point.
    pub fn with_piece(self, token: Token, bytes: &[u8]) -> Self {
        self.state().pieces.insert(token.0, bytes.to_vec());
        self
    }

    pub fn with_embedded_template(self, template: &str) -> Self {
        self.state().embedded_template = Some(template.to_string());
        self
    }

    pub fn with_builtins(self, names: &[&str]) -> Self {
        self.state().builtins = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Lock the shared state. Panics if a previous holder panicked.
    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake engine state poisoned")
    }

    pub fn events(&self) -> Vec<String> {
        self.state().events.clone()
    }

    fn log(&self, event: impl Into<String>) {
        self.state().events.push(event.into());
    }
}

pub fn char_token(c: char) -> Token {
    Token(c as i32)
}

/// Create an empty file to stand in for model weights.
pub fn temp_model(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("ember-fake-models");
    std::fs::create_dir_all(&dir).expect("create temp model dir");
    let path = dir.join(format!("{tag}-{}.gguf", std::process::id()));
    std::fs::write(&path, b"GGUF").expect("write temp model");
    path
}

#[derive(Debug)]
pub struct FakeModel {
    pub path: PathBuf,
    state: Arc<Mutex<FakeState>>,
}

impl Drop for FakeModel {
    fn drop(&mut self) {
        if let Ok(mut s) = self.state.lock() {
            s.events.push("model released".into());
        }
    }
}

#[derive(Debug)]
pub struct FakeContext {
    pub n_ctx: usize,
    pub kv: Vec<Token>,
    single_decodes: usize,
    state: Arc<Mutex<FakeState>>,
}

impl Drop for FakeContext {
    fn drop(&mut self) {
        if let Ok(mut s) = self.state.lock() {
            s.events.push("context released".into());
        }
    }
}

#[derive(Debug)]
pub struct FakeSampler {
    pub chain: SamplerChain,
    reply: Vec<Token>,
    draws: usize,
    state: Arc<Mutex<FakeState>>,
}

impl Drop for FakeSampler {
    fn drop(&mut self) {
        if let Ok(mut s) = self.state.lock() {
            s.events.push("sampler released".into());
        }
    }
}

impl InferenceEngine for FakeEngine {
    type Model = FakeModel;
    type Context = FakeContext;
    type Sampler = FakeSampler;

    fn init_backend(&self) {
        self.state().backend_inits += 1;
    }

    fn load_model(&self, path: &Path, _params: &ModelParams) -> Result<FakeModel, EngineError> {
        let mut s = self.state();
        if s.fail_load {
            return Err(EngineError::ModelLoad("not a model".into()));
        }
        s.models_loaded += 1;
        s.events.push("model loaded".into());
        Ok(FakeModel {
            path: path.to_path_buf(),
            state: self.state.clone(),
        })
    }

    fn create_context(
        &self,
        _model: &FakeModel,
        params: &ContextParams,
    ) -> Result<FakeContext, EngineError> {
        let mut s = self.state();
        if s.fail_context {
            return Err(EngineError::ContextCreation("out of memory".into()));
        }
        s.context_params.push(*params);
        s.events.push("context created".into());
        Ok(FakeContext {
            n_ctx: params.n_ctx as usize,
            kv: Vec::new(),
            single_decodes: 0,
            state: self.state.clone(),
        })
    }

    fn tokenize(
        &self,
        _model: &FakeModel,
        text: &str,
        _flags: TokenizeFlags,
    ) -> Result<Vec<Token>, EngineError> {
        let (fail, explode) = {
            let s = self.state();
            (s.fail_tokenize, s.panic_tokenize)
        };
        if explode {
            panic!("tokenizer panicked");
        }
        if fail {
            return Err(EngineError::Tokenize("bad input".into()));
        }
        Ok(text.chars().map(char_token).collect())
    }

    fn decode(&self, ctx: &mut FakeContext, tokens: &[Token]) -> Result<(), EngineError> {
        let mut s = self.state();
        if ctx.kv.is_empty() {
            if s.fail_prefill {
                return Err(EngineError::Decode(-1));
            }
            s.prefills.push(tokens.to_vec());
        } else {
            if s.fail_decode_after == Some(ctx.single_decodes) {
                return Err(EngineError::Decode(2));
            }
            ctx.single_decodes += 1;
        }
        if ctx.kv.len() + tokens.len() > ctx.n_ctx {
            return Err(EngineError::Decode(1));
        }
        ctx.kv.extend_from_slice(tokens);
        Ok(())
    }

    fn clear_cache(&self, ctx: &mut FakeContext) {
        ctx.kv.clear();
        ctx.single_decodes = 0;
        self.state().cache_clears += 1;
    }

    fn build_sampler(
        &self,
        _model: &FakeModel,
        chain: &SamplerChain,
    ) -> Result<FakeSampler, EngineError> {
        let mut s = self.state();
        s.chains.push(chain.clone());
        s.events.push("sampler built".into());
        Ok(FakeSampler {
            chain: chain.clone(),
            reply: s.reply.clone(),
            draws: 0,
            state: self.state.clone(),
        })
    }

    fn sample(
        &self,
        sampler: &mut FakeSampler,
        ctx: &mut FakeContext,
    ) -> Result<Token, EngineError> {
        if ctx.kv.is_empty() {
            return Err(EngineError::Sampler("no logits".into()));
        }
        let (token, pause) = {
            let s = self.state();
            if s.fail_sample_after == Some(sampler.draws) {
                return Err(EngineError::Sampler("draw failed".into()));
            }
            let token = sampler.reply.get(sampler.draws).copied().unwrap_or(EOS);
            sampler.draws += 1;
            if let Some((at, signal)) = &s.cancel_at {
                if *at == sampler.draws {
                    signal.cancel();
                }
            }
            let pause = s
                .pause_at
                .as_ref()
                .filter(|(at, _)| *at == sampler.draws)
                .map(|(_, barrier)| barrier.clone());
            (token, pause)
        };
        if let Some(barrier) = pause {
            barrier.wait();
            barrier.wait();
        }
        Ok(token)
    }

    fn is_end_of_generation(&self, _model: &FakeModel, token: Token) -> bool {
        token == EOS
    }

    fn token_to_piece(&self, _model: &FakeModel, token: Token) -> Result<Vec<u8>, EngineError> {
        if let Some(bytes) = self.state().pieces.get(&token.0) {
            return Ok(bytes.clone());
        }
        u32::try_from(token.0)
            .ok()
            .and_then(char::from_u32)
            .map(|c| c.to_string().into_bytes())
            .ok_or_else(|| EngineError::Piece(token.0, "no such token".into()))
    }

    fn chat_template(&self, _model: &FakeModel) -> Option<String> {
        self.state().embedded_template.clone()
    }

    fn builtin_templates(&self) -> Vec<String> {
        self.state().builtins.clone()
    }

    /// `"chatml"` renders ChatML, `"!fail"` errors, `""` renders nothing,
    /// anything holding `{role}` / `{content}` is used as a per-message
    /// pattern. Other names are unknown.
    fn apply_chat_template(
        &self,
        template: &str,
        messages: &[ChatMessage],
        add_assistant: bool,
    ) -> Result<String, EngineError> {
        self.log(format!("template {template}"));
        self.state().templates_applied.push(template.to_string());

        if template.is_empty() {
            return Ok(String::new());
        }
        if template == "!fail" {
            return Err(EngineError::Template("render failed".into()));
        }

        let pattern = match template {
            "chatml" => "<|im_start|>{role}\n{content}<|im_end|>\n",
            t if t.contains("{role}") || t.contains("{content}") => t,
            other => return Err(EngineError::Template(format!("unknown template {other}"))),
        };

        let mut out = String::new();
        for m in messages {
            out.push_str(
                &pattern
                    .replace("{role}", &m.role)
                    .replace("{content}", &m.content),
            );
        }
        if add_assistant {
            let open = pattern
                .split("{content}")
                .next()
                .unwrap_or_default()
                .replace("{role}", "assistant");
            out.push_str(&open);
        }
        Ok(out)
    }
}
