use crate::metrics::matching::IOU_THRESHOLD_COUNT;
use itertools::Itertools;

const EPS: f64 = 1e-16;
/// Points on the confidence axis used for the precision/recall/F1 curves.
const CURVE_POINTS: usize = 1000;
/// Points used to integrate the precision envelope.
const AP_POINTS: usize = 101;

/// One prediction after it has been matched against the labels of its image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchedPrediction {
    pub confidence: f32,
    pub class_id: usize,
    pub true_positive: [bool; IOU_THRESHOLD_COUNT],
}

/// Everything collected over a validation pass.
#[derive(Clone, Debug, Default)]
pub struct ValidationStats {
    predictions: Vec<MatchedPrediction>,
    label_classes: Vec<usize>,
}

impl ValidationStats {
    pub fn add_image(
        &mut self,
        predictions: impl IntoIterator<Item = MatchedPrediction>,
        label_classes: impl IntoIterator<Item = usize>,
    ) {
        self.predictions.extend(predictions);
        self.label_classes.extend(label_classes);
    }

    pub fn label_count(&self) -> usize {
        self.label_classes.len()
    }

    pub fn prediction_count(&self) -> usize {
        self.predictions.len()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassMetrics {
    pub class_id: usize,
    pub labels: usize,
    pub precision: f64,
    pub recall: f64,
    pub ap: [f64; IOU_THRESHOLD_COUNT],
}

/// Aggregate detection metrics; means are over the classes present in the labels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionMetrics {
    pub precision: f64,
    pub recall: f64,
    pub map50: f64,
    pub map50_95: f64,
    pub per_class: Vec<ClassMetrics>,
}

/// Linear interpolation of `(xp, fp)` at `x`, `xp` ascending.
///
/// Values left of `xp[0]` take `left`, values right of the last point take the last
/// value of `fp`.
fn interp(x: f64, xp: &[f64], fp: &[f64], left: f64) -> f64 {
    let Some(&last) = fp.last() else {
        return left;
    };
    if x < xp[0] {
        return left;
    }
    let upper = xp.partition_point(|&v| v <= x);
    if upper >= xp.len() {
        return last;
    }
    let j = upper - 1;
    let t = (x - xp[j]) / (xp[j + 1] - xp[j]);
    fp[j] + t * (fp[j + 1] - fp[j])
}

fn linspace(points: usize) -> Vec<f64> {
    (0..points).map(|i| i as f64 / (points - 1) as f64).collect()
}

fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
        .sum()
}

/// Box filter over `fraction` of the curve, edges padded with the end values.
fn smooth(y: &[f64], fraction: f64) -> Vec<f64> {
    let (Some(&first), Some(&last)) = (y.first(), y.last()) else {
        return Vec::new();
    };
    let width = ((y.len() as f64 * fraction * 2.0).round() as usize) / 2 + 1;
    let pad = width / 2;
    let padded: Vec<f64> = std::iter::repeat_n(first, pad)
        .chain(y.iter().copied())
        .chain(std::iter::repeat_n(last, pad))
        .collect();
    padded
        .windows(width)
        .map(|w| w.iter().sum::<f64>() / width as f64)
        .collect()
}

/// Area under the precision/recall curve.
///
/// The curve is closed with (0, 1) and (1, 0), replaced by its monotone precision
/// envelope and integrated over 101 evenly spaced recall points.
pub fn compute_ap(recall: &[f64], precision: &[f64]) -> f64 {
    let mrec: Vec<f64> = std::iter::once(0.0)
        .chain(recall.iter().copied())
        .chain(std::iter::once(1.0))
        .collect();
    let mut mpre: Vec<f64> = std::iter::once(1.0)
        .chain(precision.iter().copied())
        .chain(std::iter::once(0.0))
        .collect();
    for i in (0..mpre.len() - 1).rev() {
        mpre[i] = mpre[i].max(mpre[i + 1]);
    }
    let x = linspace(AP_POINTS);
    let y: Vec<f64> = x.iter().map(|&xi| interp(xi, &mrec, &mpre, mpre[0])).collect();
    trapezoid(&y, &x)
}

/// Per-class AP at every IoU threshold plus precision and recall at the confidence
/// that maximizes the smoothed mean F1.
pub fn ap_per_class(stats: &ValidationStats) -> DetectionMetrics {
    let classes: Vec<(usize, usize)> = stats
        .label_classes
        .iter()
        .copied()
        .counts()
        .into_iter()
        .sorted()
        .collect();
    if classes.is_empty() {
        return DetectionMetrics::default();
    }

    let sorted: Vec<&MatchedPrediction> = stats
        .predictions
        .iter()
        .sorted_by(|a, b| b.confidence.total_cmp(&a.confidence))
        .collect();
    let grid = linspace(CURVE_POINTS);

    let mut ap = Vec::with_capacity(classes.len());
    let mut p_curves = Vec::with_capacity(classes.len());
    let mut r_curves = Vec::with_capacity(classes.len());
    for &(class_id, n_labels) in &classes {
        let class_preds: Vec<&MatchedPrediction> = sorted
            .iter()
            .copied()
            .filter(|p| p.class_id == class_id)
            .collect();
        if class_preds.is_empty() {
            ap.push([0.0; IOU_THRESHOLD_COUNT]);
            p_curves.push(vec![0.0; CURVE_POINTS]);
            r_curves.push(vec![0.0; CURVE_POINTS]);
            continue;
        }

        let mut recall = vec![Vec::with_capacity(class_preds.len()); IOU_THRESHOLD_COUNT];
        let mut precision = vec![Vec::with_capacity(class_preds.len()); IOU_THRESHOLD_COUNT];
        for t in 0..IOU_THRESHOLD_COUNT {
            let (mut tp, mut fp) = (0.0_f64, 0.0_f64);
            for pred in &class_preds {
                if pred.true_positive[t] {
                    tp += 1.0;
                } else {
                    fp += 1.0;
                }
                recall[t].push(tp / (n_labels as f64 + EPS));
                precision[t].push(tp / (tp + fp));
            }
        }

        // Confidence decreasing, so its negation is the ascending axis.
        let neg_conf: Vec<f64> = class_preds.iter().map(|p| -(p.confidence as f64)).collect();
        r_curves.push(
            grid.iter()
                .map(|&x| interp(-x, &neg_conf, &recall[0], 0.0))
                .collect::<Vec<_>>(),
        );
        p_curves.push(
            grid.iter()
                .map(|&x| interp(-x, &neg_conf, &precision[0], 1.0))
                .collect::<Vec<_>>(),
        );
        ap.push(std::array::from_fn(|t| compute_ap(&recall[t], &precision[t])));
    }

    let mean_f1: Vec<f64> = (0..CURVE_POINTS)
        .map(|i| {
            let total: f64 = p_curves
                .iter()
                .zip(&r_curves)
                .map(|(p, r)| 2.0 * p[i] * r[i] / (p[i] + r[i] + EPS))
                .sum();
            total / classes.len() as f64
        })
        .collect();
    let smoothed = smooth(&mean_f1, 0.1);
    let best = smoothed
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0;

    let per_class: Vec<ClassMetrics> = classes
        .iter()
        .enumerate()
        .map(|(c, &(class_id, labels))| ClassMetrics {
            class_id,
            labels,
            precision: p_curves[c][best],
            recall: r_curves[c][best],
            ap: ap[c],
        })
        .collect();

    let n = per_class.len() as f64;
    DetectionMetrics {
        precision: per_class.iter().map(|c| c.precision).sum::<f64>() / n,
        recall: per_class.iter().map(|c| c.recall).sum::<f64>() / n,
        map50: per_class.iter().map(|c| c.ap[0]).sum::<f64>() / n,
        map50_95: per_class
            .iter()
            .map(|c| c.ap.iter().sum::<f64>() / IOU_THRESHOLD_COUNT as f64)
            .sum::<f64>()
            / n,
        per_class,
    }
}
