use crate::annotations::bounding_box::BoundingBoxGeometry;
use crate::annotations::detection::Detection;
use crate::error::Result;
use image::RgbImage;

/// Thresholds applied when turning raw model output into detections.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PredictConfig {
    pub confidence: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            confidence: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
        }
    }
}

impl PredictConfig {
    /// Validation keeps almost every candidate so the precision/recall curves span
    /// the whole confidence range.
    pub fn validation() -> Self {
        Self {
            confidence: 0.001,
            ..Self::default()
        }
    }
}

/// Milliseconds spent in each stage of one prediction.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Speed {
    pub preprocess: f64,
    pub inference: f64,
    pub postprocess: f64,
}

impl std::ops::AddAssign for Speed {
    fn add_assign(&mut self, other: Self) {
        self.preprocess += other.preprocess;
        self.inference += other.inference;
        self.postprocess += other.postprocess;
    }
}

impl Speed {
    pub fn per_image(self, images: usize) -> Self {
        if images == 0 {
            return Self::default();
        }
        let n = images as f64;
        Self {
            preprocess: self.preprocess / n,
            inference: self.inference / n,
            postprocess: self.postprocess / n,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Prediction<T: BoundingBoxGeometry> {
    pub detections: Vec<Detection<T>>,
    pub speed: Speed,
}

/// Defines a trait that all object detection models must follow.
///
/// Models take a decoded image in its original resolution and return detections in
/// that same coordinate frame; any resizing the network needs happens inside.
/// `predict` takes `&mut self` because an onnxruntime session needs exclusive access
/// while running.
pub trait ObjectDetectionModel<T: BoundingBoxGeometry> {
    fn predict(&mut self, image: &RgbImage, config: &PredictConfig) -> Result<Prediction<T>>;
}
