use image::RgbImage;
use ndarray::{Array, ArrayBase, Dim, OwnedRepr};

/// Converts an rgb8 image into a (1, 3, height, width) array scaled to [0, 1].
pub fn convert_rgb_image_to_owned_array(
    rgb_image: &RgbImage,
) -> ArrayBase<OwnedRepr<f32>, Dim<[usize; 4]>> {
    let mut image_array = Array::zeros((
        1,
        3,
        rgb_image.height() as usize,
        rgb_image.width() as usize,
    ));
    for pixel in rgb_image.enumerate_pixels() {
        let x = pixel.0 as usize;
        let y = pixel.1 as usize;
        let [r, g, b] = pixel.2.0;
        image_array[[0, 0, y, x]] = (r as f32) / 255.;
        image_array[[0, 1, y, x]] = (g as f32) / 255.;
        image_array[[0, 2, y, x]] = (b as f32) / 255.;
    }
    image_array
}
