use crate::annotations::bounding_box::BoundingBoxGeometry;
use crate::annotations::detection::Detection;
use itertools::Itertools;

pub const IOU_THRESHOLD_COUNT: usize = 10;

/// 0.50, 0.55, ..., 0.95
pub fn iou_thresholds() -> [f32; IOU_THRESHOLD_COUNT] {
    std::array::from_fn(|i| 0.5 + 0.05 * i as f32)
}

/// Marks which predictions are true positives at each IoU threshold.
///
/// At every threshold each label is claimed by at most one prediction of the same
/// class and each prediction claims at most one label, highest IoU pairs first.
/// Returns one row per prediction, in input order.
pub fn match_predictions<T: BoundingBoxGeometry, U: BoundingBoxGeometry>(
    predictions: &[Detection<T>],
    labels: &[U],
    thresholds: &[f32; IOU_THRESHOLD_COUNT],
) -> Vec<[bool; IOU_THRESHOLD_COUNT]> {
    let mut correct = vec![[false; IOU_THRESHOLD_COUNT]; predictions.len()];
    if predictions.is_empty() || labels.is_empty() {
        return correct;
    }

    // (label, prediction, iou) for every same-class overlapping pair, best first.
    let pairs: Vec<(usize, usize, f32)> = labels
        .iter()
        .enumerate()
        .cartesian_product(predictions.iter().enumerate())
        .filter(|((_, label), (_, pred))| label.class_id() == pred.annotation.class_id())
        .map(|((li, label), (pi, pred))| (li, pi, label.intersection_over_union(&pred.annotation)))
        .filter(|(_, _, iou)| *iou > 0.0)
        .sorted_by(|a, b| b.2.total_cmp(&a.2))
        .collect();

    for (t, threshold) in thresholds.iter().enumerate() {
        let mut label_taken = vec![false; labels.len()];
        let mut prediction_taken = vec![false; predictions.len()];
        for &(li, pi, _) in pairs.iter().take_while(|(_, _, iou)| iou >= threshold) {
            if label_taken[li] || prediction_taken[pi] {
                continue;
            }
            label_taken[li] = true;
            prediction_taken[pi] = true;
            correct[pi][t] = true;
        }
    }
    correct
}
