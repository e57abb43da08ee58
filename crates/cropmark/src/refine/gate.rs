//! Acceptance gate.
//!
//! A pure predicate over baseline and refined window metrics. The required
//! retention ratios depend only on how much of the baseline's far half was
//! body text: the more text the refiners had to fight, the more shrinkage
//! the gate tolerates. A refinement that fails falls back to the A-only
//! window, and failing that, to the baseline itself.

use super::WindowMetrics;
use serde::Serialize;

/// Minimum retention ratios (refined / baseline) for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GateThresholds {
    pub height: f32,
    pub area: f32,
    pub ink: f32,
    pub coverage: f32,
}

/// A-only fallback floors.
const A_ONLY_MIN_HEIGHT_RATIO: f32 = 0.60;
const A_ONLY_MIN_AREA_RATIO: f32 = 0.55;

/// Tier table keyed by far-half paragraph coverage of the baseline.
pub fn tier(far_coverage: f32) -> GateThresholds {
    if far_coverage >= 0.60 {
        GateThresholds {
            height: 0.35,
            area: 0.25,
            ink: 0.70,
            coverage: 0.70,
        }
    } else if far_coverage >= 0.30 {
        GateThresholds {
            height: 0.45,
            area: 0.35,
            ink: 0.75,
            coverage: 0.75,
        }
    } else if far_coverage >= 0.18 {
        GateThresholds {
            height: 0.50,
            area: 0.40,
            ink: 0.80,
            coverage: 0.80,
        }
    } else {
        GateThresholds {
            height: 0.60,
            area: 0.55,
            ink: 0.90,
            coverage: 0.85,
        }
    }
}

/// The gate's verdict on a refined window.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Pass,
    Fail(String),
}

fn ratio(refined: f32, baseline: f32) -> f32 {
    if baseline <= 0.0 { 1.0 } else { refined / baseline }
}

/// All four retention ratios must clear the tier, and a multi-component
/// baseline must stay multi-component.
pub fn decide(baseline: &WindowMetrics, refined: &WindowMetrics, far_coverage: f32) -> GateDecision {
    let t = tier(far_coverage);

    let height_ratio = ratio(refined.height, baseline.height);
    let area_ratio = ratio(refined.area, baseline.area);
    let ink_ratio = ratio(refined.ink_density, baseline.ink_density);
    let coverage_ratio = ratio(refined.object_coverage, baseline.object_coverage);

    let fail = |what: &str, got: f32, need: f32| {
        GateDecision::Fail(format!(
            "{} ratio {:.3} below {:.2} (far coverage {:.2})",
            what, got, need, far_coverage
        ))
    };

    if height_ratio < t.height {
        return fail("height", height_ratio, t.height);
    }
    if area_ratio < t.area {
        return fail("area", area_ratio, t.area);
    }
    if ink_ratio < t.ink {
        return fail("ink", ink_ratio, t.ink);
    }
    if coverage_ratio < t.coverage {
        return fail("coverage", coverage_ratio, t.coverage);
    }
    if baseline.component_count >= 2 && refined.component_count < 2 {
        return GateDecision::Fail(format!(
            "component count dropped {} -> {}",
            baseline.component_count, refined.component_count
        ));
    }
    GateDecision::Pass
}

/// The A-only fallback keeps enough of the baseline to be trusted.
pub fn accept_a_only(baseline: &WindowMetrics, a_only: &WindowMetrics) -> bool {
    ratio(a_only.height, baseline.height) >= A_ONLY_MIN_HEIGHT_RATIO
        && ratio(a_only.area, baseline.area) >= A_ONLY_MIN_AREA_RATIO
}
