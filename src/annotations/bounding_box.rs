use crate::error::{DetectorError, Result};
use std::fmt;

/// A struct representing a bounding box.
///
/// A bounding box is a rectangle used to annotate objects in images for training deep object
/// detection models. An ideal bounding box is the smallest box that totally contains the
/// object within the image. Bounding boxes are composed of a rectangle and a category denoting
/// what object it is. When an object detection model runs, it will output bounding boxes as its
/// output along with a probability encoding its confidence in that box+category.
///
/// This project uses the standard convention of the left side of the image being x=0 and the top
/// of the image being y=0. Coordinates are pixels of the original (not letterboxed) image.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
    class_id: usize,
    category: String,
}

impl BoundingBox {
    /// Checks if a box has valid parameters before constructing.
    pub fn new(
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        class_id: usize,
        category: String,
    ) -> Result<Self> {
        if left > right {
            Err(DetectorError::Annotation(format!(
                "value for left > value for right ({} > {}).",
                left, right
            )))
        } else if top > bottom {
            Err(DetectorError::Annotation(format!(
                "value for top > value for bottom ({} > {}).",
                top, bottom
            )))
        } else {
            Ok(BoundingBox {
                left,
                top,
                right,
                bottom,
                class_id,
                category,
            })
        }
    }

    /// Builds a box from YOLO's center format.
    pub fn from_center(
        center_x: f32,
        center_y: f32,
        width: f32,
        height: f32,
        class_id: usize,
        category: String,
    ) -> Result<Self> {
        BoundingBox::new(
            center_x - width / 2.0,
            center_y - height / 2.0,
            center_x + width / 2.0,
            center_y + height / 2.0,
            class_id,
            category,
        )
    }
}

/// Geometry shared by every annotation that is, or wraps, a rectangle.
pub trait BoundingBoxGeometry {
    fn left(&self) -> f32;
    fn top(&self) -> f32;
    fn right(&self) -> f32;
    fn bottom(&self) -> f32;
    fn class_id(&self) -> usize;
    fn category(&self) -> &str;

    fn width(&self) -> f32 {
        self.right() - self.left()
    }

    fn height(&self) -> f32 {
        self.bottom() - self.top()
    }

    fn area(&self) -> f32 {
        self.width() * self.height()
    }

    fn center(&self) -> (f32, f32) {
        (
            (self.left() + self.right()) / 2.0,
            (self.top() + self.bottom()) / 2.0,
        )
    }

    fn as_xyxy(&self) -> (f32, f32, f32, f32) {
        (self.left(), self.top(), self.right(), self.bottom())
    }

    /// Area of the overlap divided by area of the union. Zero for disjoint boxes.
    fn intersection_over_union<U: BoundingBoxGeometry>(&self, other: &U) -> f32 {
        let inter_w = (self.right().min(other.right()) - self.left().max(other.left())).max(0.0);
        let inter_h = (self.bottom().min(other.bottom()) - self.top().max(other.top())).max(0.0);
        let intersection = inter_w * inter_h;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

impl BoundingBoxGeometry for BoundingBox {
    fn left(&self) -> f32 {
        self.left
    }

    fn top(&self) -> f32 {
        self.top
    }

    fn right(&self) -> f32 {
        self.right
    }

    fn bottom(&self) -> f32 {
        self.bottom
    }

    fn class_id(&self) -> usize {
        self.class_id
    }

    fn category(&self) -> &str {
        &self.category
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BoundingBox {{ left: {}, top: {}, right: {}, bottom: {}, category: {} }}",
            self.left, self.top, self.right, self.bottom, self.category
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(left: f32, top: f32, right: f32, bottom: f32) -> BoundingBox {
        BoundingBox::new(left, top, right, bottom, 0, "cromossomo".to_string()).unwrap()
    }

    #[test]
    fn rejects_inverted_box() {
        assert!(BoundingBox::new(2.0, 0.0, 1.0, 1.0, 0, "x".to_string()).is_err());
        assert!(BoundingBox::new(0.0, 2.0, 1.0, 1.0, 0, "x".to_string()).is_err());
    }

    #[test]
    fn from_center_matches_corners() {
        let b = BoundingBox::from_center(5.0, 5.0, 4.0, 2.0, 0, "x".to_string()).unwrap();
        assert_eq!(b.as_xyxy(), (3.0, 4.0, 7.0, 6.0));
        assert_eq!(b.center(), (5.0, 5.0));
        assert_eq!(b.area(), 8.0);
    }

    #[test]
    fn iou_identical_is_one() {
        let a = bbox(0.0, 0.0, 4.0, 4.0);
        assert_eq!(a.intersection_over_union(&a.clone()), 1.0);
    }

    #[test]
    fn iou_partial_overlap() {
        let a = bbox(0.0, 0.0, 2.0, 2.0);
        let b = bbox(1.0, 0.0, 3.0, 2.0);
        // overlap 2, union 6
        assert!((a.intersection_over_union(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn iou_disjoint_is_zero() {
        let a = bbox(0.0, 0.0, 1.0, 1.0);
        let b = bbox(2.0, 2.0, 3.0, 3.0);
        assert_eq!(a.intersection_over_union(&b), 0.0);
    }
}
