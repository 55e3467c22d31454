use crate::annotations::bounding_box::BoundingBox;
use crate::annotations::detection::Detection;
use crate::error::{DetectorError, Result};
use crate::image_utils::image_conversion::convert_rgb_image_to_owned_array;
use crate::image_utils::padding::{Letterbox, letterbox_img_rgb8};
use crate::object_detection::object_detection_model::{
    ObjectDetectionModel, PredictConfig, Prediction, Speed,
};
use crate::object_detection::object_detection_utils::{category_name, non_maximum_suppression};
use crate::object_detection::ort_inference_session::OrtInferenceSession;
use image::RgbImage;
use ndarray::{ArrayView2, Axis};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// A YOLOv8/YOLOv11 detection model exported to ONNX.
pub struct Yolov11BoundingBox {
    ort_session: OrtInferenceSession,
    class_names: Vec<String>,
    input_size: u32,
    model_name: String,
}

impl Yolov11BoundingBox {
    pub fn new(
        model_path: &Path,
        class_names: Vec<String>,
        input_size: u32,
        model_name: String,
    ) -> Result<Self> {
        let ort_session = OrtInferenceSession::new(model_path)?;
        Ok(Yolov11BoundingBox {
            ort_session,
            class_names,
            input_size,
            model_name,
        })
    }
}

impl ObjectDetectionModel<BoundingBox> for Yolov11BoundingBox {
    fn predict(
        &mut self,
        image: &RgbImage,
        config: &PredictConfig,
    ) -> Result<Prediction<BoundingBox>> {
        let start = Instant::now();
        let (canvas, letterbox) = letterbox_img_rgb8(image, self.input_size);
        let input_array = convert_rgb_image_to_owned_array(&canvas);
        let preprocess = start.elapsed();

        let start = Instant::now();
        let output = self.ort_session.run(&input_array)?;
        let inference = start.elapsed();

        let start = Instant::now();
        let candidates =
            decode_predictions(output.view(), &letterbox, &self.class_names, config.confidence)?;
        let candidate_count = candidates.len();
        let detections =
            non_maximum_suppression(candidates, config.iou_threshold, config.max_detections);
        let postprocess = start.elapsed();

        debug!(
            model = %self.model_name,
            candidates = candidate_count,
            kept = detections.len(),
            "prediction finished"
        );
        Ok(Prediction {
            detections,
            speed: Speed {
                preprocess: preprocess.as_secs_f64() * 1000.0,
                inference: inference.as_secs_f64() * 1000.0,
                postprocess: postprocess.as_secs_f64() * 1000.0,
            },
        })
    }
}

/// Turns the rows of a YOLO detection head into boxes on the original image.
///
/// Each row is `cx, cy, w, h` on the letterboxed canvas followed by one score per
/// class. Rows whose best class scores below `confidence` are dropped.
pub fn decode_predictions(
    output: ArrayView2<f32>,
    letterbox: &Letterbox,
    class_names: &[String],
    confidence: f32,
) -> Result<Vec<Detection<BoundingBox>>> {
    if output.ncols() <= 4 {
        return Err(DetectorError::ModelOutput(format!(
            "expected at least 5 values per anchor, got {}",
            output.ncols()
        )));
    }
    let mut detections: Vec<Detection<BoundingBox>> = Vec::new();
    for row in output.axis_iter(Axis(0)) {
        let Some((class_id, prob)) = row
            .iter()
            .skip(4) // skips bounding box coords.
            .copied()
            .enumerate()
            .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
        else {
            continue;
        };
        if prob < confidence {
            continue;
        }
        let (x, y, w, h) = (row[0], row[1], row[2], row[3]);
        let (left, top) = letterbox.to_original(x - w / 2.0, y - h / 2.0);
        let (right, bottom) = letterbox.to_original(x + w / 2.0, y + h / 2.0);
        let bbox = BoundingBox::new(
            left,
            top,
            right,
            bottom,
            class_id,
            category_name(class_names, class_id),
        )?;
        detections.push(Detection {
            annotation: bbox,
            confidence: prob,
        });
    }
    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::bounding_box::BoundingBoxGeometry;
    use ndarray::array;

    fn identity() -> Letterbox {
        Letterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
            original_width: 640,
            original_height: 640,
        }
    }

    #[test]
    fn decode_keeps_rows_above_confidence() {
        let output = array![
            [100.0, 100.0, 20.0, 40.0, 0.9, 0.1],
            [300.0, 300.0, 10.0, 10.0, 0.1, 0.2],
            [50.0, 60.0, 10.0, 20.0, 0.05, 0.6],
        ];
        let names = vec!["cromossomo".to_string()];
        let dets = decode_predictions(output.view(), &identity(), &names, 0.25).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].annotation.as_xyxy(), (90.0, 80.0, 110.0, 120.0));
        assert_eq!(dets[0].annotation.category(), "cromossomo");
        assert_eq!(dets[0].confidence, 0.9);
        assert_eq!(dets[1].annotation.class_id(), 1);
        assert_eq!(dets[1].annotation.category(), "1");
    }

    #[test]
    fn decode_undoes_letterbox() {
        // 200x100 image on a 100x100 canvas: scale 0.5, 25px of padding on top.
        let letterbox = Letterbox {
            scale: 0.5,
            pad_x: 0.0,
            pad_y: 25.0,
            original_width: 200,
            original_height: 100,
        };
        let output = array![[50.0, 50.0, 20.0, 10.0, 0.8]];
        let dets = decode_predictions(output.view(), &letterbox, &[], 0.25).unwrap();
        assert_eq!(dets[0].annotation.as_xyxy(), (80.0, 40.0, 120.0, 60.0));
    }

    #[test]
    fn decode_rejects_headless_output() {
        let output = array![[1.0, 2.0, 3.0, 4.0]];
        assert!(decode_predictions(output.view(), &identity(), &[], 0.25).is_err());
    }
}
