use crate::annotations::bounding_box::BoundingBoxGeometry;
use crate::annotations::detection::Detection;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Reads a file with the class names into a vector so that the number ids
/// which come directly from the ORT inference session can be given meaning.
///
/// Blank lines are skipped.
pub fn read_classes_txt_file(filepath: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for line in BufReader::new(File::open(filepath)?).lines() {
        let line = line?;
        let name = line.trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Name for a class id, falling back to the id itself when the model knows more
/// classes than were named.
pub fn category_name(class_names: &[String], class_id: usize) -> String {
    match class_names.get(class_id) {
        Some(v) => v.clone(),
        None => class_id.to_string(),
    }
}

/// Non maxmimum suppression is a way of removing duplicate detections.
///
/// Boxes are only suppressed by higher-confidence boxes of the same class. At most
/// `max_detections` survive, highest confidence first.
pub fn non_maximum_suppression<T: BoundingBoxGeometry>(
    mut detections: Vec<Detection<T>>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection<T>> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut detections_to_remove: Vec<bool> = vec![false; detections.len()];
    let mut kept = 0;
    for current_index in 0..detections.len() {
        if detections_to_remove[current_index] {
            continue;
        }
        if kept == max_detections {
            detections_to_remove[current_index] = true;
            continue;
        }
        kept += 1;
        let current_det = &detections[current_index];
        for (other_index, other_det) in detections[current_index + 1..].iter().enumerate() {
            if detections_to_remove[current_index + other_index + 1] {
                continue;
            }
            if current_det.annotation.class_id() != other_det.annotation.class_id() {
                continue;
            }
            let iou = current_det
                .annotation
                .intersection_over_union(&other_det.annotation);
            if iou > iou_threshold {
                detections_to_remove[current_index + other_index + 1] = true;
            }
        }
    }
    let mut drop_iter = detections_to_remove.into_iter();
    detections.retain(|_| !drop_iter.next().unwrap_or(true));
    detections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::bounding_box::BoundingBox;

    fn det(l: f32, t: f32, r: f32, b: f32, class_id: usize, confidence: f32) -> Detection<BoundingBox> {
        Detection {
            annotation: BoundingBox::new(l, t, r, b, class_id, class_id.to_string()).unwrap(),
            confidence,
        }
    }

    #[test]
    fn nms_no_overlap() {
        let dets = vec![det(0., 0., 1., 1., 0, 0.6), det(2., 2., 3., 3., 0, 0.6)];
        let nms_result = non_maximum_suppression(dets.clone(), 0.5, 300);
        assert_eq!(dets, nms_result);
    }

    #[test]
    fn nms_standard_usage() {
        let dets = vec![
            det(0., 0., 4., 4., 0, 0.6),
            det(0., 0., 5., 5., 0, 0.55),
            det(6., 6., 10., 10., 0, 0.75),
        ];
        let nms_result = non_maximum_suppression(dets, 0.5, 300);
        let true_dets = vec![det(6., 6., 10., 10., 0, 0.75), det(0., 0., 4., 4., 0, 0.6)];
        assert_eq!(true_dets, nms_result);
    }

    #[test]
    fn nms_overlap_but_different_classes() {
        let dets = vec![
            det(0., 0., 4.5, 4.5, 0, 0.6),
            det(0., 0., 5., 5., 1, 0.55),
            det(0.5, 0.5, 4., 4., 0, 0.8),
            det(6., 6., 10., 10., 0, 0.75),
        ];
        let nms_result = non_maximum_suppression(dets, 0.5, 300);
        let true_dets = vec![
            det(0.5, 0.5, 4., 4., 0, 0.8),
            det(6., 6., 10., 10., 0, 0.75),
            det(0., 0., 5., 5., 1, 0.55),
        ];
        assert_eq!(true_dets, nms_result);
    }

    #[test]
    fn nms_suppressed_box_does_not_suppress_others() {
        // b is removed by a; c overlaps only b and must survive.
        let a = det(0., 0., 10., 10., 0, 0.9);
        let b = det(2., 0., 12., 10., 0, 0.8);
        let c = det(9., 0., 19., 10., 0, 0.7);
        let nms_result = non_maximum_suppression(vec![c.clone(), b, a.clone()], 0.5, 300);
        assert_eq!(vec![a, c], nms_result);
    }

    #[test]
    fn nms_caps_detections() {
        let dets = vec![
            det(0., 0., 1., 1., 0, 0.5),
            det(2., 2., 3., 3., 0, 0.9),
            det(4., 4., 5., 5., 0, 0.7),
        ];
        let nms_result = non_maximum_suppression(dets, 0.5, 2);
        assert_eq!(
            vec![det(2., 2., 3., 3., 0, 0.9), det(4., 4., 5., 5., 0, 0.7)],
            nms_result
        );
    }

    #[test]
    fn category_name_falls_back_to_id() {
        let names = vec!["cromossomo".to_string()];
        assert_eq!(category_name(&names, 0), "cromossomo");
        assert_eq!(category_name(&names, 3), "3");
    }

    #[test]
    fn classes_file_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.txt");
        std::fs::write(&path, "cromossomo\n\nnucleo\n").unwrap();
        assert_eq!(
            read_classes_txt_file(&path).unwrap(),
            vec!["cromossomo".to_string(), "nucleo".to_string()]
        );
    }
}
