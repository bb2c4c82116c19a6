use crate::common::seeded_rng;
use sanfab_core::{FailureParams, NodeRole};

#[test]
fn test_reliability_decreases_with_horizon() {
    let params = FailureParams::default();
    let mut last = 1.0;
    for horizon in [1.0, 10.0, 100.0, 1000.0] {
        let r = params.reliability(0.5, horizon);
        assert!(r > 0.0 && r < last, "R must strictly decrease in t, got {r}");
        last = r;
    }
}

#[test]
fn test_reliability_decreases_with_load() {
    let params = FailureParams::default();
    let mut last = 1.0 + 1e-12;
    for fraction in [0.0, 0.2, 0.5, 0.7, 0.8] {
        let r = params.reliability(fraction, 50.0);
        assert!(
            r < last,
            "R must strictly decrease in load, got {r} at fraction {fraction}"
        );
        last = r;
    }
    // Deep in the amplified regime R underflows toward zero; the hazard
    // rate itself must still be strictly increasing.
    let mut last_hazard = params.hazard_rate(0.8);
    for fraction in [0.85, 1.0, 1.2] {
        let h = params.hazard_rate(fraction);
        assert!(h > last_hazard, "hazard must strictly increase in load");
        last_hazard = h;
    }
}

#[test]
fn test_hazard_amplifies_in_high_load_regime() {
    let params = FailureParams::default();
    let below = params.hazard_rate(0.75);
    let above = params.hazard_rate(0.85);
    // The coefficient is multiplied by 5 past the warning band, so the
    // jump dwarfs the plain exponential growth.
    assert!(above / below > 1e6, "expected amplified regime, got ratio {}", above / below);
}

#[test]
fn test_hazard_at_zero_load_matches_base_rate() {
    let params = FailureParams {
        base_mttf: 500.0,
        alpha: 5.0,
    };
    assert!((params.hazard_rate(0.0) - 1.0 / 500.0).abs() < 1e-12);
}

#[test]
fn test_unbounded_roles_never_fail() {
    let params = FailureParams::for_role(NodeRole::Source);
    assert_eq!(params.hazard_rate(10.0), 0.0);
    let mut rng = seeded_rng(3);
    for _ in 0..1000 {
        assert!(!params.check_failure(10.0, 1.0, &mut rng));
    }
}

#[test]
fn test_certain_failure_when_hazard_saturates() {
    // h * dt >= 1 clamps to probability 1.
    let params = FailureParams {
        base_mttf: 1.0,
        alpha: 5.0,
    };
    let mut rng = seeded_rng(4);
    assert!(params.check_failure(1.0, 1.0, &mut rng));
}

#[test]
fn test_failure_decisions_reproduce_with_seed() {
    let params = FailureParams::default();
    let mut a = seeded_rng(42);
    let mut b = seeded_rng(42);
    for _ in 0..200 {
        assert_eq!(
            params.check_failure(0.9, 1.0, &mut a),
            params.check_failure(0.9, 1.0, &mut b)
        );
    }
}
