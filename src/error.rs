// Error types for image loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a file or byte buffer into an [`HdrImage`](crate::image_loader::HdrImage)
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read image file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not detect the image format of {name}")]
    UnknownFormat { name: String },

    #[error("failed to decode {name}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("{name} has no pixels ({width}x{height})")]
    Empty {
        name: String,
        width: u32,
        height: u32,
    },
}
