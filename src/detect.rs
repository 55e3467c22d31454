//! Per-image chromosome counting.
//!
//! The report is a JSON object keyed by the image paths exactly as they were passed
//! on the command line, in the same order.

use crate::annotations::bounding_box::{BoundingBox, BoundingBoxGeometry};
use crate::annotations::detection::Detection;
use crate::error::{DetectorError, Result};
use crate::image_utils::image_io::read_image_as_rgb8;
use crate::object_detection::object_detection_model::{ObjectDetectionModel, PredictConfig};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Message recorded for an image path that does not exist.
pub const FILE_NOT_FOUND: &str = "Arquivo não encontrado";

#[derive(Clone, Debug, Default)]
pub struct DetectOptions {
    pub predict: PredictConfig,
    /// Emit per-box geometry in `details` instead of an empty list.
    pub emit_details: bool,
}

/// One detected box as the host application draws it.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct BoxDetail {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub w: f32,
    pub h: f32,
    pub confidence: f32,
    pub class_id: usize,
    pub class_name: String,
}

impl From<&Detection<BoundingBox>> for BoxDetail {
    fn from(detection: &Detection<BoundingBox>) -> Self {
        let (x1, y1, x2, y2) = detection.annotation.as_xyxy();
        BoxDetail {
            x1,
            y1,
            x2,
            y2,
            w: detection.annotation.width(),
            h: detection.annotation.height(),
            confidence: detection.confidence,
            class_id: detection.annotation.class_id(),
            class_name: detection.annotation.category().to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum ImageEntry {
    Detected {
        count: usize,
        status: Status,
        details: Vec<BoxDetail>,
    },
    Failed {
        count: usize,
        error: String,
    },
}

impl ImageEntry {
    pub fn failed(error: impl Into<String>) -> Self {
        ImageEntry::Failed {
            count: 0,
            error: error.into(),
        }
    }

    pub fn count(&self) -> usize {
        match self {
            ImageEntry::Detected { count, .. } | ImageEntry::Failed { count, .. } => *count,
        }
    }
}

/// Image path to result, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionReport {
    entries: Vec<(String, ImageEntry)>,
}

impl DetectionReport {
    /// Records the entry for `path`. A path seen before keeps its position and takes
    /// the new entry.
    pub fn insert(&mut self, path: String, entry: ImageEntry) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == path) {
            Some((_, slot)) => *slot = entry,
            None => self.entries.push((path, entry)),
        }
    }

    pub fn get(&self, path: &str) -> Option<&ImageEntry> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == path)
            .map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_count(&self) -> usize {
        self.entries.iter().map(|(_, entry)| entry.count()).sum()
    }
}

impl Serialize for DetectionReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, entry) in &self.entries {
            map.serialize_entry(path, entry)?;
        }
        map.end()
    }
}

/// Resolves the model reference given on the command line to an ONNX file.
///
/// The host usually passes the `.pt` weights it trained. When an `.onnx` export sits
/// next to them it is used instead; the reference itself is the last candidate.
pub fn resolve_model_path(model_ref: &str) -> Result<PathBuf> {
    let given = PathBuf::from(model_ref);
    let is_onnx = given
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("onnx"))
        .unwrap_or(false);
    if !is_onnx {
        let exported = given.with_extension("onnx");
        if exported.is_file() {
            debug!(model = %exported.display(), "using onnx export of model");
            return Ok(exported);
        }
    }
    if given.is_file() {
        return Ok(given);
    }
    Err(DetectorError::ModelNotFound(model_ref.to_string()))
}

/// File name of the model reference, as reported back to the host.
pub fn model_display_name(model_ref: &str) -> String {
    Path::new(model_ref)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| model_ref.to_string())
}

/// Runs the model over every image path.
///
/// Missing or undecodable files are recorded per image and do not stop the run.
/// Failures of the model itself abort the whole run.
pub fn run_detection<M: ObjectDetectionModel<BoundingBox>>(
    model: &mut M,
    image_paths: &[String],
    options: &DetectOptions,
) -> Result<DetectionReport> {
    let mut report = DetectionReport::default();
    for img_path in image_paths {
        let path = Path::new(img_path);
        if !path.exists() {
            warn!(image = %img_path, "image not found");
            report.insert(img_path.clone(), ImageEntry::failed(FILE_NOT_FOUND));
            continue;
        }
        let image = match read_image_as_rgb8(path) {
            Ok(image) => image,
            Err(e) => {
                warn!(image = %img_path, error = %e, "image could not be decoded");
                report.insert(img_path.clone(), ImageEntry::failed(e.to_string()));
                continue;
            }
        };

        let prediction = model.predict(&image, &options.predict)?;
        let details = if options.emit_details {
            prediction.detections.iter().map(BoxDetail::from).collect()
        } else {
            Vec::new()
        };
        debug!(
            image = %img_path,
            count = prediction.detections.len(),
            inference_ms = prediction.speed.inference,
            "image processed"
        );
        report.insert(
            img_path.clone(),
            ImageEntry::Detected {
                count: prediction.detections.len(),
                status: Status::Success,
                details,
            },
        );
    }
    info!(
        images = report.len(),
        detections = report.total_count(),
        "detection finished"
    );
    Ok(report)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::object_detection::object_detection_model::{Prediction, Speed};
    use image::RgbImage;
    use serde_json::{Value, json};

    /// Returns the same boxes for every image.
    pub(crate) struct FixedModel {
        pub boxes: Vec<Detection<BoundingBox>>,
        pub calls: usize,
    }

    impl FixedModel {
        pub fn with_boxes(n: usize) -> Self {
            let boxes = (0..n)
                .map(|i| Detection {
                    annotation: BoundingBox::new(
                        i as f32 * 10.0,
                        0.0,
                        i as f32 * 10.0 + 5.0,
                        8.0,
                        0,
                        "cromossomo".to_string(),
                    )
                    .unwrap(),
                    confidence: 0.9,
                })
                .collect();
            FixedModel { boxes, calls: 0 }
        }
    }

    impl ObjectDetectionModel<BoundingBox> for FixedModel {
        fn predict(
            &mut self,
            _image: &RgbImage,
            _config: &PredictConfig,
        ) -> Result<Prediction<BoundingBox>> {
            self.calls += 1;
            Ok(Prediction {
                detections: self.boxes.clone(),
                speed: Speed::default(),
            })
        }
    }

    struct BrokenModel;

    impl ObjectDetectionModel<BoundingBox> for BrokenModel {
        fn predict(
            &mut self,
            _image: &RgbImage,
            _config: &PredictConfig,
        ) -> Result<Prediction<BoundingBox>> {
            Err(DetectorError::ModelOutput("boom".to_string()))
        }
    }

    fn write_image(dir: &Path, name: &str) -> String {
        let path = dir.join(name);
        RgbImage::new(16, 16).save(&path).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn counts_present_images_and_flags_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        let present = write_image(dir.path(), "a.png");
        let missing = dir.path().join("missing.jpg").to_string_lossy().into_owned();
        let mut model = FixedModel::with_boxes(3);

        let report = run_detection(
            &mut model,
            &[present.clone(), missing.clone()],
            &DetectOptions::default(),
        )
        .unwrap();

        let mut expected = serde_json::Map::new();
        expected.insert(
            present,
            json!({"count": 3, "status": "success", "details": []}),
        );
        expected.insert(missing, json!({"count": 0, "error": "Arquivo não encontrado"}));
        assert_eq!(serde_json::to_value(&report).unwrap(), Value::Object(expected));
        assert_eq!(model.calls, 1);
    }

    #[test]
    fn missing_image_does_not_stop_later_images() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.png").to_string_lossy().into_owned();
        let first = write_image(dir.path(), "first.png");
        let second = write_image(dir.path(), "second.png");
        let mut model = FixedModel::with_boxes(2);

        let report = run_detection(
            &mut model,
            &[first.clone(), missing.clone(), second.clone()],
            &DetectOptions::default(),
        )
        .unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(report.get(&second).unwrap().count(), 2);
        assert_eq!(report.get(&missing), Some(&ImageEntry::failed(FILE_NOT_FOUND)));
        assert_eq!(report.total_count(), 4);
    }

    #[test]
    fn keys_keep_argument_order() {
        let dir = tempfile::tempdir().unwrap();
        let b = write_image(dir.path(), "b.png");
        let a = write_image(dir.path(), "a.png");
        let report = run_detection(
            &mut FixedModel::with_boxes(1),
            &[b.clone(), a.clone(), b.clone()],
            &DetectOptions::default(),
        )
        .unwrap();
        let text = serde_json::to_string(&report).unwrap();
        assert_eq!(report.len(), 2);
        assert!(text.find(&b).unwrap() < text.find(&a).unwrap());
    }

    #[test]
    fn details_are_emitted_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let img = write_image(dir.path(), "a.png");
        let options = DetectOptions {
            emit_details: true,
            ..DetectOptions::default()
        };
        let report = run_detection(&mut FixedModel::with_boxes(2), &[img.clone()], &options).unwrap();
        let value = serde_json::to_value(&report).unwrap();
        let details = value[img.as_str()]["details"].as_array().unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[1]["x1"], json!(10.0));
        assert_eq!(details[1]["w"], json!(5.0));
        assert_eq!(details[1]["h"], json!(8.0));
        assert_eq!(details[1]["class_name"], json!("cromossomo"));
    }

    #[test]
    fn undecodable_image_is_reported_per_item() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"garbage").unwrap();
        let broken = broken.to_string_lossy().into_owned();
        let good = write_image(dir.path(), "good.png");

        let report = run_detection(
            &mut FixedModel::with_boxes(1),
            &[broken.clone(), good.clone()],
            &DetectOptions::default(),
        )
        .unwrap();

        match report.get(&broken).unwrap() {
            ImageEntry::Failed { count, error } => {
                assert_eq!(*count, 0);
                assert!(error.starts_with("Falha ao ler imagem"));
            }
            other => panic!("unexpected entry {:?}", other),
        }
        assert_eq!(report.get(&good).unwrap().count(), 1);
    }

    #[test]
    fn model_failure_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let img = write_image(dir.path(), "a.png");
        let err = run_detection(&mut BrokenModel, &[img], &DetectOptions::default()).unwrap_err();
        assert!(matches!(err, DetectorError::ModelOutput(_)));
    }

    #[test]
    fn model_reference_falls_back_to_onnx_export() {
        let dir = tempfile::tempdir().unwrap();
        let onnx = dir.path().join("best.onnx");
        std::fs::write(&onnx, b"").unwrap();
        let pt = dir.path().join("best.pt").to_string_lossy().into_owned();
        assert_eq!(resolve_model_path(&pt).unwrap(), onnx);
        assert_eq!(resolve_model_path(onnx.to_str().unwrap()).unwrap(), onnx);

        let missing = dir.path().join("other.pt").to_string_lossy().into_owned();
        assert!(matches!(
            resolve_model_path(&missing),
            Err(DetectorError::ModelNotFound(_))
        ));
    }

    #[test]
    fn onnx_export_is_preferred_over_weights_next_to_it() {
        let dir = tempfile::tempdir().unwrap();
        let pt = dir.path().join("best.pt");
        let onnx = dir.path().join("best.onnx");
        std::fs::write(&pt, b"torch").unwrap();
        std::fs::write(&onnx, b"onnx").unwrap();
        assert_eq!(resolve_model_path(pt.to_str().unwrap()).unwrap(), onnx);

        // Without an export the reference is used as given.
        let other = dir.path().join("other.engine");
        std::fs::write(&other, b"").unwrap();
        assert_eq!(resolve_model_path(other.to_str().unwrap()).unwrap(), other);
    }

    #[test]
    fn model_display_name_is_file_name() {
        assert_eq!(model_display_name("/models/run1/best.pt"), "best.pt");
        assert_eq!(model_display_name("yolo11n.pt"), "yolo11n.pt");
    }
}
