use serde::{Deserialize, Serialize};

/// Coarse progress label shown to the user, derived from the order of
/// the current unfinished stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    Seed,
    Sprout,
    Growing,
    Fruit,
}

impl GrowthStage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Sprout => "sprout",
            Self::Growing => "growing",
            Self::Fruit => "fruit",
        }
    }
}

/// Ordinal-range buckets for the classifier. Adjustable through
/// configuration; the defaults match the product's stage design
/// (1 = seed, 2-4 = sprout, 5-7 = growing, 8+ = fruit).
#[derive(Debug, Clone)]
pub struct GrowthStageConfig {
    pub sprout_min_order: u16,
    pub growing_min_order: u16,
    pub fruit_min_order: u16,
}

impl Default for GrowthStageConfig {
    fn default() -> Self {
        Self {
            sprout_min_order: 2,
            growing_min_order: 5,
            fruit_min_order: 8,
        }
    }
}

/// Total over all stage orders: every ordinal maps to exactly one label,
/// and orders below every threshold (including 0) map to the lowest.
pub fn classify(stage_order: u16, config: &GrowthStageConfig) -> GrowthStage {
    if stage_order >= config.fruit_min_order {
        GrowthStage::Fruit
    } else if stage_order >= config.growing_min_order {
        GrowthStage::Growing
    } else if stage_order >= config.sprout_min_order {
        GrowthStage::Sprout
    } else {
        GrowthStage::Seed
    }
}
