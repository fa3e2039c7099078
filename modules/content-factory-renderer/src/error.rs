use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("plan has no slides")]
    NoSlides,

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("zip packaging failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
