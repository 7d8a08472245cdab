//! Interpretation Engine - what does this stimulus mean right now?
//!
//! Three pure steps, deterministic given the stimulus and the vitals:
//! 1. Appraisal: significance = |intensity| × category weight × contextual
//!    amplifiers (weak integrity ×1.5, low stability ×1.2), clamped to [0, 1]
//! 2. Impact modeling: per-category base delta scaled by |intensity| × significance
//! 3. Pattern suggestion from significance and stability; the impact is then
//!    rewritten by the suggested pattern

use vitalis_core::{Category, CoreError, Meaning, ReactionPattern, StateDelta, Stimulus, Vitals};

const WEAK_INTEGRITY: f32 = 0.3;
const WEAK_INTEGRITY_AMPLIFIER: f32 = 1.5;
const UNSTABLE: f32 = 0.5;
const UNSTABLE_AMPLIFIER: f32 = 1.2;

const DAMPEN_ABOVE_STABILITY: f32 = 0.8;
const AMPLIFY_BELOW_STABILITY: f32 = 0.3;

/// Fixed appraisal weight per category.
pub fn category_weight(category: Category) -> f32 {
    match category {
        Category::Shock => 1.0,
        Category::Decay => 0.6,
        Category::Recovery => 0.5,
        Category::AmbientNoise => 0.3,
        Category::Idle => 0.1,
    }
}

/// Unscaled per-dimension impact of a category.
pub fn base_impact(category: Category) -> StateDelta {
    match category {
        Category::Shock => StateDelta::new(-10.0, -0.1, -0.15),
        Category::Decay => StateDelta::new(-3.0, -0.05, -0.02),
        Category::Recovery => StateDelta::new(5.0, 0.05, 0.05),
        Category::AmbientNoise => StateDelta::new(-0.5, 0.0, -0.02),
        Category::Idle => StateDelta::new(-0.2, 0.0, 0.0),
    }
}

/// Result of interpreting one stimulus.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    /// Meaning with its impact already rewritten for `suggested`
    pub meaning: Meaning,
    pub suggested: ReactionPattern,
}

#[derive(Debug, Clone)]
pub struct InterpretationEngine {
    significance_floor: f32,
}

impl Default for InterpretationEngine {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl InterpretationEngine {
    pub fn new(significance_floor: f32) -> Self {
        Self {
            significance_floor: significance_floor.clamp(0.0, 1.0),
        }
    }

    pub fn significance_floor(&self) -> f32 {
        self.significance_floor
    }

    /// Step 1: how much does this stimulus matter given the current vitals?
    pub fn appraise(&self, stimulus: &Stimulus, vitals: &Vitals) -> f32 {
        let mut significance = stimulus.intensity().abs() * category_weight(stimulus.category());
        if vitals.integrity < WEAK_INTEGRITY {
            significance *= WEAK_INTEGRITY_AMPLIFIER;
        }
        if vitals.stability < UNSTABLE {
            significance *= UNSTABLE_AMPLIFIER;
        }
        if significance.is_finite() {
            significance.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Step 2: proposed change before any pattern rewriting.
    pub fn model_impact(&self, stimulus: &Stimulus, significance: f32) -> StateDelta {
        base_impact(stimulus.category()).scale(stimulus.intensity().abs() * significance)
    }

    /// Step 3: suggested reaction class.
    pub fn suggest_pattern(&self, significance: f32, vitals: &Vitals) -> ReactionPattern {
        if significance < self.significance_floor {
            ReactionPattern::Ignore
        } else if vitals.stability > DAMPEN_ABOVE_STABILITY {
            ReactionPattern::Dampen
        } else if vitals.stability < AMPLIFY_BELOW_STABILITY {
            ReactionPattern::Amplify
        } else {
            ReactionPattern::Absorb
        }
    }

    pub fn interpret(&self, stimulus: &Stimulus, vitals: &Vitals) -> Result<Interpretation, CoreError> {
        let significance = self.appraise(stimulus, vitals);
        let impact = self.model_impact(stimulus, significance);
        let suggested = self.suggest_pattern(significance, vitals);

        let mut meaning = Meaning::new(stimulus.id(), stimulus.category(), significance, impact)?;
        meaning.apply_pattern(suggested);

        tracing::debug!(
            "Interpreted {} ({:.2}): significance={:.3}, suggested={}",
            stimulus.category(),
            stimulus.intensity(),
            significance,
            suggested
        );

        Ok(Interpretation { meaning, suggested })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals(integrity: f32, stability: f32) -> Vitals {
        Vitals { vitality: 80.0, integrity, stability }
    }

    #[test]
    fn test_shock_against_stable_condition_is_dampened() {
        let engine = InterpretationEngine::default();
        let stimulus = Stimulus::new(Category::Shock, 1.0);
        let out = engine.interpret(&stimulus, &vitals(0.8, 0.9)).unwrap();

        assert_eq!(out.suggested, ReactionPattern::Dampen);
        assert_eq!(out.meaning.significance(), 1.0);
        let impact = out.meaning.impact();
        assert!(impact.vitality < 0.0 && impact.integrity < 0.0 && impact.stability < 0.0);
        // exactly half of the unmodified base impact
        assert_eq!(out.meaning.base_impact(), base_impact(Category::Shock));
        assert_eq!(impact, base_impact(Category::Shock).scale(0.5));
    }

    #[test]
    fn test_amplifiers_stack() {
        let engine = InterpretationEngine::default();
        let stimulus = Stimulus::new(Category::AmbientNoise, 0.5);
        let calm = engine.appraise(&stimulus, &vitals(0.9, 0.9));
        let weak = engine.appraise(&stimulus, &vitals(0.2, 0.9));
        let both = engine.appraise(&stimulus, &vitals(0.2, 0.4));
        assert!((calm - 0.15).abs() < 1e-6);
        assert!((weak - 0.15 * 1.5).abs() < 1e-6);
        assert!((both - 0.15 * 1.5 * 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_significance_is_clamped() {
        let engine = InterpretationEngine::default();
        let stimulus = Stimulus::new(Category::Shock, -1.0);
        assert_eq!(engine.appraise(&stimulus, &vitals(0.1, 0.1)), 1.0);
    }

    #[test]
    fn test_below_floor_is_ignored_with_zero_impact() {
        let engine = InterpretationEngine::default();
        let stimulus = Stimulus::new(Category::Idle, 0.5);
        let out = engine.interpret(&stimulus, &vitals(0.9, 0.6)).unwrap();
        assert_eq!(out.suggested, ReactionPattern::Ignore);
        assert!(out.meaning.impact().is_zero());
        assert!(!out.meaning.base_impact().is_zero());
    }

    #[test]
    fn test_pattern_thresholds() {
        let engine = InterpretationEngine::default();
        assert_eq!(engine.suggest_pattern(0.5, &vitals(1.0, 0.81)), ReactionPattern::Dampen);
        assert_eq!(engine.suggest_pattern(0.5, &vitals(1.0, 0.8)), ReactionPattern::Absorb);
        assert_eq!(engine.suggest_pattern(0.5, &vitals(1.0, 0.3)), ReactionPattern::Absorb);
        assert_eq!(engine.suggest_pattern(0.5, &vitals(1.0, 0.29)), ReactionPattern::Amplify);
        assert_eq!(engine.suggest_pattern(0.09, &vitals(1.0, 0.1)), ReactionPattern::Ignore);
    }

    #[test]
    fn test_recovery_raises_and_idle_only_drains_vitality() {
        let engine = InterpretationEngine::default();
        let v = vitals(0.9, 0.6);
        let recovery = engine.interpret(&Stimulus::new(Category::Recovery, 1.0), &v).unwrap();
        let r = recovery.meaning.impact();
        assert!(r.vitality > 0.0 && r.integrity > 0.0 && r.stability > 0.0);

        let idle = engine.interpret(&Stimulus::new(Category::Idle, 1.0), &v).unwrap();
        let i = idle.meaning.impact();
        assert!(i.vitality < 0.0);
        assert_eq!(i.integrity, 0.0);
        assert_eq!(i.stability, 0.0);
    }

    #[test]
    fn test_interpretation_is_deterministic() {
        let engine = InterpretationEngine::default();
        let stimulus = Stimulus::new(Category::Decay, -0.7);
        let v = vitals(0.5, 0.5);
        assert_eq!(
            engine.interpret(&stimulus, &v).unwrap(),
            engine.interpret(&stimulus, &v).unwrap()
        );
    }
}
