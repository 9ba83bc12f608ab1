pub mod color_utils;
pub mod image_utils;
