use serde::{Deserialize, Serialize};

/// 標準の重み（スキル一致と意味類似度を等分）
pub const DEFAULT_WEIGHTS: ScoringWeights = ScoringWeights {
    skill: 0.5,
    semantic: 0.5,
};

/// 意味類似度が使えないとき（スキルのみ）
pub const SKILL_ONLY_WEIGHTS: ScoringWeights = ScoringWeights {
    skill: 1.0,
    semantic: 0.0,
};

/// 求人側にスキルがないとき（意味類似度のみ）
pub const SEMANTIC_ONLY_WEIGHTS: ScoringWeights = ScoringWeights {
    skill: 0.0,
    semantic: 1.0,
};

/// 両シグナルとも使えないとき
pub const NO_WEIGHTS: ScoringWeights = ScoringWeights {
    skill: 0.0,
    semantic: 0.0,
};

/// 歓迎スキル一致の寄与（必須スキル一致 = 1.0 に対する比）
pub const DEFAULT_PREFERRED_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub skill: f64,
    pub semantic: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.skill + self.semantic
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}
