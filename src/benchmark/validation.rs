use crate::annotations::bounding_box::{BoundingBox, BoundingBoxGeometry};
use crate::benchmark::dataset::DatasetDescriptor;
use crate::benchmark::labels::{label_path_for_image, read_yolo_labels};
use crate::error::{DetectorError, Result};
use crate::image_utils::image_io::{has_image_extension, read_image_as_rgb8};
use crate::metrics::{
    DetectionMetrics, MatchedPrediction, ValidationStats, ap_per_class, iou_thresholds,
    match_predictions,
};
use crate::object_detection::object_detection_model::{ObjectDetectionModel, PredictConfig, Speed};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Clone, Debug, PartialEq)]
pub struct ValidationResults {
    pub metrics: DetectionMetrics,
    /// Average per image.
    pub speed: Speed,
    pub images: usize,
    pub labels: usize,
}

/// Images of a split, sorted by path so repeated runs see the same order.
pub fn collect_images(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable dataset entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && has_image_extension(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Runs the model over the validation split named by the descriptor file and scores
/// it against the ground-truth labels.
pub fn validate<M: ObjectDetectionModel<BoundingBox>>(
    model: &mut M,
    descriptor_path: &Path,
    config: &PredictConfig,
) -> Result<ValidationResults> {
    let descriptor = DatasetDescriptor::load(descriptor_path)?;
    let val_dir = descriptor.ensure_val_dir()?;
    let class_names = descriptor.class_names();
    let images = collect_images(&val_dir);
    if images.is_empty() {
        return Err(DetectorError::EmptyDataset(val_dir.display().to_string()));
    }
    info!(images = images.len(), split = %val_dir.display(), "validation started");

    let thresholds = iou_thresholds();
    let mut stats = ValidationStats::default();
    let mut speed = Speed::default();
    let mut processed = 0;
    for image_path in &images {
        let image = match read_image_as_rgb8(image_path) {
            Ok(image) => image,
            Err(e) => {
                warn!(image = %image_path.display(), error = %e, "skipping unreadable image");
                continue;
            }
        };
        let labels = match label_path_for_image(image_path) {
            Some(label_path) => {
                read_yolo_labels(&label_path, image.width(), image.height(), &class_names)?
            }
            None => Vec::new(),
        };

        let prediction = model.predict(&image, config)?;
        let correct = match_predictions(&prediction.detections, &labels, &thresholds);
        debug!(
            image = %image_path.display(),
            labels = labels.len(),
            predictions = prediction.detections.len(),
            "image validated"
        );
        stats.add_image(
            prediction
                .detections
                .iter()
                .zip(correct)
                .map(|(detection, true_positive)| MatchedPrediction {
                    confidence: detection.confidence,
                    class_id: detection.annotation.class_id(),
                    true_positive,
                }),
            labels.iter().map(|label| label.class_id()),
        );
        speed += prediction.speed;
        processed += 1;
    }
    if processed == 0 {
        return Err(DetectorError::EmptyDataset(val_dir.display().to_string()));
    }

    let metrics = ap_per_class(&stats);
    info!(
        images = processed,
        labels = stats.label_count(),
        predictions = stats.prediction_count(),
        map50 = metrics.map50,
        map50_95 = metrics.map50_95,
        "validation finished"
    );
    Ok(ValidationResults {
        metrics,
        speed: speed.per_image(processed),
        images: processed,
        labels: stats.label_count(),
    })
}
