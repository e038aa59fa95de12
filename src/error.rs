use crate::{
    camera::CameraError, dead_pixels::DeadPixelError, greenwald::GreenwaldError,
    lcfs::EnvelopeError, normalize::NormalizeError, source::SourceError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `source` module")]
    Source(#[from] SourceError),
    #[error("Error in the `lcfs` module")]
    Envelope(#[from] EnvelopeError),
    #[error("Error in the `dead_pixels` module")]
    DeadPixel(#[from] DeadPixelError),
    #[error("Error in the `greenwald` module")]
    Greenwald(#[from] GreenwaldError),
    #[error("Error in the `normalize` module")]
    Normalize(#[from] NormalizeError),
    #[error("Error in the `camera` module")]
    Camera(#[from] CameraError),
}
