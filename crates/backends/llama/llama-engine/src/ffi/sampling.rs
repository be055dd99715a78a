// Materialises an engine-agnostic `SamplerChain` as a llama_sampler chain.

use std::ptr::NonNull;

use ember_abi::{EngineError, SamplerChain, SamplerStage, Token};
use llama_cpp_sys_2::{
    llama_context, llama_sampler, llama_sampler_chain_add, llama_sampler_chain_default_params,
    llama_sampler_chain_init, llama_sampler_free, llama_sampler_init_dist,
    llama_sampler_init_penalties, llama_sampler_init_temp, llama_sampler_init_top_k,
    llama_sampler_init_top_p, llama_sampler_sample,
};

fn init_stage(stage: &SamplerStage) -> *mut llama_sampler {
    unsafe {
        match *stage {
            SamplerStage::RepeatPenalty {
                last_n,
                repeat,
                frequency,
                presence,
            } => llama_sampler_init_penalties(last_n, repeat, frequency, presence),
            SamplerStage::TopK { k } => llama_sampler_init_top_k(k),
            SamplerStage::TopP { p, min_keep } => llama_sampler_init_top_p(p, min_keep),
            SamplerStage::Temperature { t } => llama_sampler_init_temp(t),
            SamplerStage::Distribution { seed } => llama_sampler_init_dist(seed),
        }
    }
}

/// Build a chain applying `chain.stages` in order. The chain owns every
/// stage added to it.
pub fn build_chain(chain: &SamplerChain) -> Result<NonNull<llama_sampler>, EngineError> {
    let root = unsafe { llama_sampler_chain_init(llama_sampler_chain_default_params()) };
    let root = NonNull::new(root)
        .ok_or_else(|| EngineError::Sampler("llama_sampler_chain_init returned null".into()))?;

    for stage in &chain.stages {
        let s = init_stage(stage);
        if s.is_null() {
            unsafe { free_chain(root) };
            return Err(EngineError::Sampler(format!("failed to init {stage:?}")));
        }
        unsafe { llama_sampler_chain_add(root.as_ptr(), s) };
    }
    Ok(root)
}

/// Draw from the logits of the last evaluated position.
pub fn sample(
    chain: NonNull<llama_sampler>,
    ctx: NonNull<llama_context>,
) -> Result<Token, EngineError> {
    let id = unsafe { llama_sampler_sample(chain.as_ptr(), ctx.as_ptr(), -1) };
    if id < 0 {
        Err(EngineError::Sampler(format!("invalid token id {id}")))
    } else {
        Ok(Token(id))
    }
}

/// # Safety
/// `chain` must come from [`build_chain`] and not be freed yet.
pub unsafe fn free_chain(chain: NonNull<llama_sampler>) {
    llama_sampler_free(chain.as_ptr());
}
