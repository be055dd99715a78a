use ember_abi::{GenerationParams, SamplerChain, SamplerStage};

/// Fixed seed for the final draw, so identical requests reproduce.
pub const SAMPLER_SEED: u32 = 1234;

/// Penalty window in accepted tokens.
pub const PENALTY_LAST_N: i32 = 64;

/// Ordered pipeline for one request: penalty (only above 1.0), top-k,
/// top-p, temperature, seeded draw.
pub fn build_chain(params: &GenerationParams) -> SamplerChain {
    let mut chain = SamplerChain::new();

    if params.repeat_penalty > 1.0 {
        chain.push(SamplerStage::RepeatPenalty {
            last_n: PENALTY_LAST_N,
            repeat: params.repeat_penalty,
            frequency: 0.0,
            presence: 0.0,
        });
    }

    chain
        .push(SamplerStage::TopK { k: params.top_k })
        .push(SamplerStage::TopP {
            p: params.top_p,
            min_keep: 1,
        })
        .push(SamplerStage::Temperature {
            t: params.temperature,
        })
        .push(SamplerStage::Distribution { seed: SAMPLER_SEED });

    chain
}
