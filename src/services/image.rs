use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use strum::{Display, EnumString};

/// Picture formats the model endpoint accepts. Anything else is re-encoded
/// to JPEG before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageEncoding {
    Jpeg,
    Png,
    Gif,
    Webp,
}

/// Image bytes plus the encoding tag that must accompany them on the wire.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub bytes: Vec<u8>,
    pub encoding: ImageEncoding,
}

/// Load an image from a local path or an http(s) URL and normalize it to a
/// supported encoding. The tag is derived by sniffing the bytes, never from
/// the file extension.
pub async fn load(source: &str) -> Result<LoadedImage, ImageError> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        fetch(source).await?
    } else {
        let path = Path::new(source);
        if !path.exists() {
            return Err(ImageError::NotFound(source.to_string()));
        }
        tokio::fs::read(path).await?
    };

    prepare(bytes)
}

async fn fetch(url: &str) -> Result<Vec<u8>, ImageError> {
    let response = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?
        .get(url)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Sniff the byte format and pass supported encodings through untouched;
/// decodable-but-unsupported formats (bmp, tiff, ...) are re-encoded to JPEG
/// in memory.
pub fn prepare(bytes: Vec<u8>) -> Result<LoadedImage, ImageError> {
    let sniffed = image::guess_format(&bytes).map_err(|_| ImageError::Unrecognized)?;

    let encoding = match sniffed {
        image::ImageFormat::Jpeg => ImageEncoding::Jpeg,
        image::ImageFormat::Png => ImageEncoding::Png,
        image::ImageFormat::Gif => ImageEncoding::Gif,
        image::ImageFormat::WebP => ImageEncoding::Webp,
        other => {
            tracing::info!(format = ?other, "re-encoding unsupported image format to jpeg");
            return reencode_to_jpeg(&bytes);
        }
    };

    Ok(LoadedImage { bytes, encoding })
}

fn reencode_to_jpeg(bytes: &[u8]) -> Result<LoadedImage, ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let rgb = image::DynamicImage::ImageRgb8(decoded.to_rgb8());

    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, image::ImageFormat::Jpeg)?;

    Ok(LoadedImage {
        bytes: out.into_inner(),
        encoding: ImageEncoding::Jpeg,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to fetch image: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("unrecognized image data")]
    Unrecognized,

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}
