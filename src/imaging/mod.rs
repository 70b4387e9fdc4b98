// Image codec layer
//
// Narrow port over the image libraries:
// - Format: detection and extension mapping for JPEG/PNG/GIF/WEBP
// - Codec: decode/encode, including animated GIF and WebP frames
// - Resize: thumbnail sizing policies

pub mod codec;
pub mod format;
pub mod resize;

pub use codec::{DecodedImage, decode, encode, encode_animation, encode_webp_animation};
pub use format::{ImageFormat, ImageOutputFormat};
pub use resize::{ResizeMode, ResizeSpec};
