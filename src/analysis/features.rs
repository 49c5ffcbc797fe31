use crate::analysis::hrv::HrvSnapshot;
use crate::analysis::intervals::IntervalSet;
use crate::analysis::rate::BpmEstimate;

/// Number of entries in the classification feature vector.
pub const FEATURE_COUNT: usize = 13;

/// Assemble the numeric feature vector handed to the rhythm-classification
/// collaborator.
///
/// The ordering is a contract that collaborator depends on: append new
/// features at the end, never reorder:
///
/// `[pr, qrs, qt, qtc, st_deviation, bpm, rmssd, sdnn, pnn50,
///   triangular_index, lf, hf, lf_hf_ratio]`
///
/// Unavailable measurements are encoded as NaN rather than a numeric
/// default so the consumer can distinguish "absent" from "zero".
pub fn feature_vector(
    intervals: &IntervalSet,
    bpm: &BpmEstimate,
    hrv: &HrvSnapshot,
) -> [f32; FEATURE_COUNT] {
    let missing = f32::NAN;
    [
        intervals.pr.value.unwrap_or(missing),
        intervals.qrs.value.unwrap_or(missing),
        intervals.qt.value.unwrap_or(missing),
        intervals.qtc.value.unwrap_or(missing),
        intervals.st_deviation.value.unwrap_or(missing),
        bpm.smoothed.unwrap_or(missing),
        hrv.rmssd,
        hrv.sdnn,
        hrv.pnn50,
        hrv.triangular_index,
        hrv.lf,
        hrv.hf,
        hrv.lf_hf_ratio,
    ]
}
