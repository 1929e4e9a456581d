//! Multiplicative buff/debuff profile shared by players and tiles

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffType {
    RuneGeneration,
    EnergyGeneration,
    RiverRuneGeneration,
    ShopPrice,
    ArtifactChance,
    Debuffable,
}

impl BuffType {
    /// Lowest value a multiplier may reach
    fn floor(self) -> f64 {
        match self {
            BuffType::ShopPrice => 0.5,
            _ => 0.0,
        }
    }
}

/// Rounds to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    rune_generation: f64,
    energy_generation: f64,
    river_rune_generation: f64,
    shop_price: f64,
    artifact_chance: f64,
    debuffable: bool,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            rune_generation: 1.0,
            energy_generation: 1.0,
            river_rune_generation: 1.0,
            shop_price: 1.0,
            artifact_chance: 1.0,
            debuffable: true,
        }
    }
}

impl Status {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current multiplier, or `1.0`/`0.0` for the debuffable flag
    pub fn get(&self, buff: BuffType) -> f64 {
        match buff {
            BuffType::RuneGeneration => self.rune_generation,
            BuffType::EnergyGeneration => self.energy_generation,
            BuffType::RiverRuneGeneration => self.river_rune_generation,
            BuffType::ShopPrice => self.shop_price,
            BuffType::ArtifactChance => self.artifact_chance,
            BuffType::Debuffable => {
                if self.debuffable {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn is_debuffable(&self) -> bool {
        self.debuffable
    }

    /// Whether a delta of this sign would take effect
    pub fn accepts(&self, delta: f64) -> bool {
        delta >= 0.0 || self.debuffable
    }

    /// Adds `delta` (rounded to two decimals) to the multiplier.
    ///
    /// Negative deltas are ignored while the subject is not debuffable.
    /// For [`BuffType::Debuffable`] a negative delta clears the flag and a
    /// positive one sets it. Returns whether anything was applied.
    pub fn buff(&mut self, buff: BuffType, delta: f64) -> bool {
        let delta = round2(delta);
        if !self.accepts(delta) {
            return false;
        }
        match buff {
            BuffType::Debuffable => {
                if delta != 0.0 {
                    self.debuffable = delta > 0.0;
                }
            }
            other => {
                if let Some(slot) = self.slot_mut(other) {
                    *slot = round2((*slot + delta).max(other.floor()));
                }
            }
        }
        true
    }

    /// Assigns an absolute value, still respecting the type's floor
    pub fn set(&mut self, buff: BuffType, value: f64) {
        match buff {
            BuffType::Debuffable => self.debuffable = value != 0.0,
            other => {
                if let Some(slot) = self.slot_mut(other) {
                    *slot = round2(value.max(other.floor()));
                }
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn slot_mut(&mut self, buff: BuffType) -> Option<&mut f64> {
        match buff {
            BuffType::RuneGeneration => Some(&mut self.rune_generation),
            BuffType::EnergyGeneration => Some(&mut self.energy_generation),
            BuffType::RiverRuneGeneration => Some(&mut self.river_rune_generation),
            BuffType::ShopPrice => Some(&mut self.shop_price),
            BuffType::ArtifactChance => Some(&mut self.artifact_chance),
            BuffType::Debuffable => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RG:{:.2},EG:{:.2},RR:{:.2},SP:{:.2},AC:{:.2},DB:{}",
            self.rune_generation,
            self.energy_generation,
            self.river_rune_generation,
            self.shop_price,
            self.artifact_chance,
            u8::from(self.debuffable)
        )
    }
}

/// Comprehensive test suite for status modifiers
#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_new_status_is_neutral() {
        let status = Status::new();
        assert_approx_eq!(status.get(BuffType::RuneGeneration), 1.0);
        assert_approx_eq!(status.get(BuffType::ShopPrice), 1.0);
        assert!(status.is_debuffable());
    }

    #[test]
    fn test_buff_rounds_delta_to_two_decimals() {
        let mut status = Status::new();
        assert!(status.buff(BuffType::RuneGeneration, 0.123456));
        assert_approx_eq!(status.get(BuffType::RuneGeneration), 1.12);
    }

    #[test]
    fn test_generation_floor_is_zero() {
        let mut status = Status::new();
        status.buff(BuffType::EnergyGeneration, -5.0);
        assert_approx_eq!(status.get(BuffType::EnergyGeneration), 0.0);
    }

    #[test]
    fn test_shop_price_floor_is_half() {
        let mut status = Status::new();
        status.buff(BuffType::ShopPrice, -0.9);
        assert_approx_eq!(status.get(BuffType::ShopPrice), 0.5);
        status.set(BuffType::ShopPrice, 0.1);
        assert_approx_eq!(status.get(BuffType::ShopPrice), 0.5);
    }

    #[test]
    fn test_non_debuffable_ignores_negative_delta() {
        let mut status = Status::new();
        status.set(BuffType::Debuffable, 0.0);
        assert!(!status.buff(BuffType::RuneGeneration, -0.5));
        assert_approx_eq!(status.get(BuffType::RuneGeneration), 1.0);
        assert!(!status.buff(BuffType::Debuffable, -1.0));
        assert!(status.buff(BuffType::RuneGeneration, 0.5));
        assert_approx_eq!(status.get(BuffType::RuneGeneration), 1.5);
    }

    #[test]
    fn test_debuffable_flag_toggles_by_sign() {
        let mut status = Status::new();
        assert!(status.buff(BuffType::Debuffable, -1.0));
        assert!(!status.is_debuffable());
        assert!(status.buff(BuffType::Debuffable, 1.0));
        assert!(status.is_debuffable());
    }

    #[test]
    fn test_reset_restores_neutral_values() {
        let mut status = Status::new();
        status.buff(BuffType::ArtifactChance, 2.0);
        status.set(BuffType::Debuffable, 0.0);
        status.reset();
        assert_eq!(status, Status::default());
    }

    #[test]
    fn test_display_format() {
        let mut status = Status::new();
        status.buff(BuffType::ShopPrice, 0.25);
        assert_eq!(
            status.to_string(),
            "RG:1.00,EG:1.00,RR:1.00,SP:1.25,AC:1.00,DB:1"
        );
    }
}
