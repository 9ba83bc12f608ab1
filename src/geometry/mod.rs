pub mod camera;
pub mod interpolation;
pub mod transform;
