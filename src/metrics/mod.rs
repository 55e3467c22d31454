//! Detection quality metrics computed over a validation pass.

pub mod average_precision;
pub mod matching;

pub use average_precision::{DetectionMetrics, MatchedPrediction, ValidationStats, ap_per_class};
pub use matching::{IOU_THRESHOLD_COUNT, iou_thresholds, match_predictions};
