//! Scoring thrown potions as damage.
//!
//! A splash only counts as an attack when it carries a harmful effect. The
//! credited amount is the configured base damage, doubled for upgraded or
//! extended potions, scaled by how close each target was to the burst.

use cellblock_core::PotionConfig;
use cellblock_types::PotionEffect;
use rust_decimal::Decimal;

/// Whether any effect on the potion counts as an attack.
pub fn is_harmful(effects: &[PotionEffect]) -> bool {
    effects.iter().any(|effect| effect.is_harmful())
}

/// Damage to credit for one target of a splash.
///
/// `intensity` is clamped to `0..=1`. Potions with no harmful effect score
/// zero.
pub fn splash_damage(
    effects: &[PotionEffect],
    amplified: bool,
    intensity: Decimal,
    config: &PotionConfig,
) -> Decimal {
    if !is_harmful(effects) {
        return Decimal::ZERO;
    }

    let base = if amplified {
        config.base_damage.saturating_mul(Decimal::TWO)
    } else {
        config.base_damage
    };
    base.saturating_mul(intensity.clamp(Decimal::ZERO, Decimal::ONE))
}
