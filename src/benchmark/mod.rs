//! Accuracy and speed benchmark of a model over a labeled dataset.

pub mod dataset;
pub mod labels;
pub mod validation;

use crate::annotations::bounding_box::BoundingBox;
use crate::error::{DetectorError, Result};
use crate::object_detection::object_detection_model::{ObjectDetectionModel, PredictConfig};
use dataset::{DatasetDescriptor, resolve_dataset_dir};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};
use validation::{ValidationResults, validate};

/// What the host shows on its benchmark page.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub model: String,
    pub map50: f64,
    pub map5095: f64,
    pub precision: f64,
    pub recall: f64,
    /// Inference milliseconds per image.
    pub speed: f64,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

impl BenchmarkReport {
    pub fn new(model: String, results: &ValidationResults) -> Self {
        BenchmarkReport {
            model,
            map50: round_to(results.metrics.map50, 4),
            map5095: round_to(results.metrics.map50_95, 4),
            precision: round_to(results.metrics.precision, 4),
            recall: round_to(results.metrics.recall, 4),
            speed: round_to(results.speed.inference, 2),
        }
    }
}

/// Resolves the dataset, writes its descriptor, loads the model and validates.
///
/// The model is only loaded once the dataset is known to exist. The descriptor
/// file is removed before returning, on success and on every error after it was
/// written.
pub fn run_benchmark<M, F>(
    model_name: String,
    dataset_images_dir: &str,
    cwd: &Path,
    config: &PredictConfig,
    load_model: F,
) -> Result<BenchmarkReport>
where
    M: ObjectDetectionModel<BoundingBox>,
    F: FnOnce() -> Result<M>,
{
    let images_dir = resolve_dataset_dir(dataset_images_dir, cwd)
        .ok_or_else(|| DetectorError::DatasetNotFound(dataset_images_dir.to_string()))?;
    let descriptor = DatasetDescriptor::for_images_dir(&images_dir)?;
    let descriptor_file = descriptor.write_temp()?;

    let mut model = load_model()?;
    let results = validate(&mut model, descriptor_file.path(), config);

    let descriptor_path = descriptor_file.path().to_path_buf();
    if let Err(e) = descriptor_file.close() {
        warn!(descriptor = %descriptor_path.display(), error = %e, "could not remove dataset descriptor");
    } else {
        debug!(descriptor = %descriptor_path.display(), "dataset descriptor removed");
    }

    Ok(BenchmarkReport::new(model_name, &results?))
}
