use approx::assert_relative_eq;

use sinusoid::analysis::{
    HrvEngine, PhysiologicalState, RateCalculator, Readiness,
};
use sinusoid::config::{DetectorConfig, EcgConfig, HrvConfig, RateConfig, StateConfig};
use sinusoid::signal_processing::{Peak, QrsDetector};

fn engine() -> HrvEngine {
    HrvEngine::new(&HrvConfig::default(), &StateConfig::default())
}

#[test]
fn test_constant_rr_sequence_has_zero_variability() {
    let mut hrv = engine();
    for _ in 0..4 {
        hrv.record(800.0);
    }
    let snapshot = hrv.snapshot();
    assert_eq!(snapshot.sdnn, 0.0);
    assert_eq!(snapshot.rmssd, 0.0);
}

#[test]
fn test_alternating_rr_sequence_rmssd_is_exact() {
    let mut hrv = engine();
    for rr in [700.0, 900.0, 700.0, 900.0] {
        hrv.record(rr);
    }
    assert_relative_eq!(hrv.snapshot().rmssd, 200.0, max_relative = 1e-5);
}

#[test]
fn test_pnn50_boundary_cases() {
    // Every successive difference above 50 ms → 100%
    let mut hrv = engine();
    for rr in [700.0, 760.0, 700.0, 760.0, 700.0] {
        hrv.record(rr);
    }
    assert_eq!(hrv.snapshot().pnn50, 100.0);

    // No successive difference above 50 ms → 0%
    let mut hrv = engine();
    for rr in [700.0, 740.0, 700.0, 740.0, 700.0] {
        hrv.record(rr);
    }
    assert_eq!(hrv.snapshot().pnn50, 0.0);
}

#[test]
fn test_triangular_index_sample_gate_and_bound() {
    let mut hrv = engine();
    for i in 0..19 {
        hrv.record(600.0 + (i % 10) as f32 * 60.0);
    }
    assert_eq!(hrv.snapshot().triangular_index, 0.0);

    // Keep adding widely spread intervals; the index never exceeds the
    // sample count no matter the variance.
    for i in 0..100 {
        hrv.record(400.0 + (i % 50) as f32 * 30.0);
    }
    let snapshot = hrv.snapshot();
    assert!(snapshot.triangular_index > 0.0);
    assert!(snapshot.triangular_index <= snapshot.sample_count as f32);
}

#[test]
fn test_smoothed_bpm_converges_to_75_for_800ms_beats() {
    let mut rate = RateCalculator::new(&RateConfig::default(), 250.0);
    // 800 ms at 250 Hz = 200 samples between peaks
    let peaks: Vec<Peak> = (0..5)
        .map(|i| Peak {
            index: i * 200,
            amplitude: 1.0,
        })
        .collect();

    let mut estimate = rate.update(&peaks);
    for _ in 0..20 {
        estimate = rate.update(&peaks);
    }
    assert_relative_eq!(estimate.smoothed.unwrap(), 75.0, max_relative = 1e-4);
    assert_relative_eq!(estimate.raw.unwrap(), 75.0, max_relative = 1e-4);
}

#[test]
fn test_hrv_readiness_transitions_exactly_at_thirty() {
    let mut hrv = engine();
    assert_eq!(hrv.readiness(), Readiness::Cold);

    for i in 0..29 {
        assert!(hrv.record(650.0 + (i % 8) as f32 * 30.0));
    }
    assert_eq!(hrv.readiness(), Readiness::Warming);
    let snapshot = hrv.snapshot();
    assert_eq!(snapshot.state.state, PhysiologicalState::Analyzing);
    assert_eq!(snapshot.state.confidence, 0.0);

    assert!(hrv.record(700.0));
    assert_eq!(hrv.readiness(), Readiness::Ready);
    let snapshot = hrv.snapshot();
    assert_ne!(snapshot.state.state, PhysiologicalState::Analyzing);
    assert!(
        (0.6..=0.95).contains(&snapshot.state.confidence),
        "confidence {} outside [0.6, 0.95]",
        snapshot.state.confidence
    );
}

#[test]
fn test_out_of_bounds_rr_never_stored() {
    let mut hrv = engine();
    assert!(!hrv.record(250.0));
    assert!(!hrv.record(2500.0));
    assert!(!hrv.record(-800.0));
    assert_eq!(hrv.snapshot().sample_count, 0);
}

#[test]
fn test_detector_empty_on_zeros_and_reset_matches_fresh() {
    let config = EcgConfig::default();
    let sample_rate = config.acquisition.sample_rate;

    let mut detector = QrsDetector::new(&DetectorConfig::default(), sample_rate).unwrap();
    assert!(detector.detect(&vec![0.0; 1200]).is_empty());

    // Exercise the adaptive state with a real-looking burst, then reset
    let mut spiky = vec![0.0; 1200];
    for i in (100..1200).step_by(200) {
        spiky[i] = 1.0;
        spiky[i - 1] = 0.4;
        spiky[i + 1] = 0.4;
    }
    detector.detect(&spiky);
    detector.reset();

    let fresh = QrsDetector::new(&DetectorConfig::default(), sample_rate).unwrap();
    assert_eq!(detector.thresholds(), fresh.thresholds());
}
