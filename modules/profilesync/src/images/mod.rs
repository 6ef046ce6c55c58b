// Profile image handling: liveness probing, choosing between prior, fresh
// and fallback references, and optionally storing the chosen image locally.

pub mod download;
pub mod liveness;
pub mod resolver;

pub use download::{HttpImageDownloader, ImageDownloader};
pub use liveness::{locate, HttpImageProbe, ImageLocation, ImageProbe};
pub use resolver::{resolve_image, ImageChoice};
