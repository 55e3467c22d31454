use crate::error::{DetectorError, Result};
use ndarray::{Array2, Array4, Axis, Ix2};
use ort::inputs;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use tracing::debug;

/// An onnxruntime inference session.
///
/// All of the object detection classes in this project are just wrappers
/// around an ONNX inference session that handles running the model on
/// hardware.
pub struct OrtInferenceSession {
    session: Session,
    input_name: String,
    output_name: String,
}

impl OrtInferenceSession {
    pub fn new(model_path: &Path) -> Result<Self> {
        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(model_path))
            .map_err(|source| DetectorError::ModelLoad {
                path: model_path.display().to_string(),
                source,
            })?;
        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| DetectorError::ModelOutput("model declares no inputs".to_string()))?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| DetectorError::ModelOutput("model declares no outputs".to_string()))?;
        debug!(
            model = %model_path.display(),
            input = %input_name,
            output = %output_name,
            "onnx session ready"
        );
        Ok(Self {
            session,
            input_name,
            output_name,
        })
    }

    /// Runs a single (1, 3, H, W) image through the network.
    ///
    /// YOLO detection heads emit (1, 4 + classes, anchors); the batch axis is dropped
    /// and the result transposed so each row is one anchor.
    pub fn run(&mut self, input_array: &Array4<f32>) -> Result<Array2<f32>> {
        let outputs = self.session.run(inputs![
            self.input_name.as_str() => TensorRef::from_array_view(input_array)?
        ])?;
        let output = outputs[self.output_name.as_str()].try_extract_array::<f32>()?;
        if output.ndim() != 3 || output.shape()[0] != 1 {
            return Err(DetectorError::ModelOutput(format!(
                "expected output shaped (1, 4 + classes, anchors), got {:?}",
                output.shape()
            )));
        }
        let rows = output
            .index_axis(Axis(0), 0)
            .reversed_axes()
            .into_dimensionality::<Ix2>()
            .map_err(|e| DetectorError::ModelOutput(e.to_string()))?;
        Ok(rows.to_owned())
    }
}
