use crate::annotations::bounding_box::BoundingBox;
use crate::error::{DetectorError, Result};
use crate::object_detection::object_detection_utils::category_name;
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// Label file for an image: the last `images` folder in its path becomes `labels`
/// and the extension becomes `.txt`.
pub fn label_path_for_image(image_path: &Path) -> Option<PathBuf> {
    let components: Vec<Component> = image_path.components().collect();
    let position = components
        .iter()
        .rposition(|c| c.as_os_str() == OsStr::new("images"))?;
    let mut label_path = PathBuf::new();
    for (i, component) in components.iter().enumerate() {
        if i == position {
            label_path.push("labels");
        } else {
            label_path.push(component.as_os_str());
        }
    }
    label_path.set_extension("txt");
    Some(label_path)
}

/// Reads a YOLO label file into boxes on an image of the given size.
///
/// Each line is `class cx cy w h`, normalized to the image. Lines with more values
/// are polygons (`class x1 y1 x2 y2 ...`) and become their enclosing box. A missing
/// file is an image without objects. Malformed lines are logged and skipped.
pub fn read_yolo_labels(
    label_path: &Path,
    image_width: u32,
    image_height: u32,
    class_names: &[String],
) -> Result<Vec<BoundingBox>> {
    if !label_path.is_file() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(label_path)?;
    let mut labels = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_label_line(line, image_width, image_height, class_names) {
            Ok(bbox) => labels.push(bbox),
            Err(reason) => {
                let error = DetectorError::Label {
                    path: label_path.display().to_string(),
                    line: index + 1,
                    reason,
                };
                warn!(error = %error, "skipping label line");
            }
        }
    }
    Ok(labels)
}

fn parse_label_line(
    line: &str,
    image_width: u32,
    image_height: u32,
    class_names: &[String],
) -> std::result::Result<BoundingBox, String> {
    let (w, h) = (image_width as f32, image_height as f32);
    let mut fields = line.split_whitespace();
    let class_id: usize = fields
        .next()
        .and_then(|v| v.parse::<f32>().ok())
        .filter(|v| *v >= 0.0 && v.fract() == 0.0)
        .map(|v| v as usize)
        .ok_or_else(|| "class id is not a non-negative integer".to_string())?;
    let values = fields
        .map(|v| v.parse::<f32>())
        .collect::<std::result::Result<Vec<f32>, _>>()
        .map_err(|e| e.to_string())?;
    let category = category_name(class_names, class_id);

    match values.len() {
        4 => BoundingBox::from_center(
            values[0] * w,
            values[1] * h,
            values[2] * w,
            values[3] * h,
            class_id,
            category,
        ),
        n if n >= 6 && n % 2 == 0 => {
            let xs = values.iter().step_by(2);
            let ys = values.iter().skip(1).step_by(2);
            let (left, right) = xs.fold((f32::MAX, f32::MIN), |(lo, hi), &x| (lo.min(x), hi.max(x)));
            let (top, bottom) = ys.fold((f32::MAX, f32::MIN), |(lo, hi), &y| (lo.min(y), hi.max(y)));
            BoundingBox::new(left * w, top * h, right * w, bottom * h, class_id, category)
        }
        n => return Err(format!("expected 4 box values or a polygon, got {}", n)),
    }
    .map_err(|e| e.to_string())
}
