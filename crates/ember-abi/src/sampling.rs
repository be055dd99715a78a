use serde::{Deserialize, Serialize};

/// Per-request generation knobs as the caller supplies them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Upper bound on generated tokens; 0 generates nothing.
    pub max_tokens: u32,
    /// Logit divisor; -> 0 sharpens towards argmax.
    pub temperature: f32,
    /// Nucleus mass in (0, 1].
    pub top_p: f32,
    /// Keep the K most likely candidates; 0 disables the filter.
    pub top_k: i32,
    /// Classic repetition penalty; values <= 1.0 disable it.
    pub repeat_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 256,
            temperature: 0.8,
            top_p: 0.95,
            top_k: 40,
            repeat_penalty: 1.1,
        }
    }
}

impl GenerationParams {
    /// Returns a clamped copy that engines can consume without re-validating.
    ///
    /// - non-finite or negative temperature → 0.0
    /// - top_p clamped to [0, 1]; non-finite → 1.0
    /// - negative top_k → 0 (disabled)
    /// - non-finite repeat_penalty → 1.0 (disabled)
    pub fn normalized(mut self) -> Self {
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            self.temperature = 0.0;
        }
        self.top_p = if self.top_p.is_finite() {
            self.top_p.clamp(0.0, 1.0)
        } else {
            1.0
        };
        if self.top_k < 0 {
            self.top_k = 0;
        }
        if !self.repeat_penalty.is_finite() {
            self.repeat_penalty = 1.0;
        }
        self
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<GenerationParams>(json).map(Self::normalized)
    }
}

/// One transform in a sampler pipeline. The order of stages inside a
/// [`SamplerChain`] is significant and engines must apply them as listed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum SamplerStage {
    /// Penalise tokens seen in the last `last_n` accepted tokens.
    RepeatPenalty {
        last_n: i32,
        repeat: f32,
        frequency: f32,
        presence: f32,
    },
    TopK { k: i32 },
    TopP { p: f32, min_keep: usize },
    Temperature { t: f32 },
    /// Terminal stochastic draw.
    Distribution { seed: u32 },
}

/// Engine-agnostic description of a sampler pipeline. Engines turn this into
/// their native chain handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplerChain {
    pub stages: Vec<SamplerStage>,
}

impl SamplerChain {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    #[inline]
    pub fn push(&mut self, stage: SamplerStage) -> &mut Self {
        self.stages.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
