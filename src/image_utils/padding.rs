use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Gray used to fill the border around a letterboxed image.
pub const LETTERBOX_FILL: u8 = 114;

/// How an image was placed on the model's square canvas.
///
/// Kept alongside the tensor so predictions can be mapped back to the pixels of the
/// original image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub original_width: u32,
    pub original_height: u32,
}

impl Letterbox {
    /// Maps a point on the canvas back onto the original image, clipped to its bounds.
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let ox = (x - self.pad_x) / self.scale;
        let oy = (y - self.pad_y) / self.scale;
        (
            ox.clamp(0.0, self.original_width as f32),
            oy.clamp(0.0, self.original_height as f32),
        )
    }
}

/// Resizes an rgb8 image to fit a `size` x `size` canvas keeping its aspect ratio and
/// pads the remainder on both sides. A `size` of zero is treated as one.
pub fn letterbox_img_rgb8(original_image: &RgbImage, size: u32) -> (RgbImage, Letterbox) {
    let size = size.max(1);
    let (width, height) = original_image.dimensions();
    let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
    let new_width = ((width as f32 * scale).round() as u32).clamp(1, size);
    let new_height = ((height as f32 * scale).round() as u32).clamp(1, size);

    let pad_x = (size - new_width) as f32 / 2.0;
    let pad_y = (size - new_height) as f32 / 2.0;
    let left = (pad_x - 0.1).round().max(0.0) as i64;
    let top = (pad_y - 0.1).round().max(0.0) as i64;

    let mut padded_image = RgbImage::from_pixel(size, size, Rgb([LETTERBOX_FILL; 3]));
    if (new_width, new_height) == (width, height) {
        imageops::overlay(&mut padded_image, original_image, left, top);
    } else {
        let resized = imageops::resize(original_image, new_width, new_height, FilterType::Triangle);
        imageops::overlay(&mut padded_image, &resized, left, top);
    }

    let letterbox = Letterbox {
        scale,
        pad_x: left as f32,
        pad_y: top as f32,
        original_width: width,
        original_height: height,
    };
    (padded_image, letterbox)
}
