pub mod fast;
pub mod homography;
pub mod keypoint;
pub mod matcher;
pub mod orb;
