use serde::Serialize;

/// Ordinal bucket a score falls into, relative to its own maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementTier {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl AchievementTier {
    pub const fn label(self) -> &'static str {
        match self {
            AchievementTier::Poor => "poor",
            AchievementTier::Fair => "fair",
            AchievementTier::Good => "good",
            AchievementTier::Excellent => "excellent",
        }
    }

    /// Color token consumed by presentation regions for badges and bars.
    pub const fn color_token(self) -> &'static str {
        match self {
            AchievementTier::Poor => "danger",
            AchievementTier::Fair => "warning",
            AchievementTier::Good => "info",
            AchievementTier::Excellent => "success",
        }
    }
}

const FAIR_FLOOR: f32 = 0.40;
const GOOD_FLOOR: f32 = 0.60;
const EXCELLENT_FLOOR: f32 = 0.80;

/// Tier plus the bar fill percentage, computed identically everywhere a
/// criterion or total renders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierBadge {
    pub tier: AchievementTier,
    pub fill_percent: f32,
    pub color: &'static str,
}

impl TierBadge {
    /// Total function: a zero or negative maximum reads as an empty bar in
    /// the lowest tier rather than an error.
    pub fn classify(achieved: f32, max: f32) -> TierBadge {
        if max <= 0.0 {
            return TierBadge::from_tier(AchievementTier::Poor, 0.0);
        }

        let fraction = achieved / max;
        let tier = if fraction >= EXCELLENT_FLOOR {
            AchievementTier::Excellent
        } else if fraction >= GOOD_FLOOR {
            AchievementTier::Good
        } else if fraction >= FAIR_FLOOR {
            AchievementTier::Fair
        } else {
            AchievementTier::Poor
        };

        TierBadge::from_tier(tier, (fraction * 100.0).clamp(0.0, 100.0))
    }

    fn from_tier(tier: AchievementTier, fill_percent: f32) -> TierBadge {
        TierBadge {
            tier,
            fill_percent,
            color: tier.color_token(),
        }
    }
}
