use crate::config::TranscodeSettings;
use crate::error::ItemError;
use crate::infrastructure::workspace::{Workspace, ensure_parent};
use crate::models::TranscodeStatus;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::imageops::FilterType as ResizeFilter;
use image::{ColorType, DynamicImage, ImageEncoder, ImageFormat};
use tracing::{info, warn};

/// Encoding chosen for a mobile variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// JPEG stays JPEG; every other decodable format becomes PNG.
    pub fn for_source(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Jpeg => OutputFormat::Jpeg,
            _ => OutputFormat::Png,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
        }
    }

    pub fn mime_type(self) -> mime::Mime {
        match self {
            OutputFormat::Jpeg => mime::IMAGE_JPEG,
            OutputFormat::Png => mime::IMAGE_PNG,
        }
    }

    /// Output format implied by the extension of an original key.
    pub fn from_key(key: &str) -> Option<Self> {
        match crate::utils::keys::extension(key)? {
            ".jpg" | ".jpeg" => Some(OutputFormat::Jpeg),
            ".png" => Some(OutputFormat::Png),
            _ => None,
        }
    }
}

/// An encoded mobile variant.
#[derive(Debug, Clone)]
pub struct Transcoded {
    pub data: Vec<u8>,
    pub source_format: ImageFormat,
    pub output_format: OutputFormat,
    pub source_width: u32,
    pub width: u32,
    pub height: u32,
}

impl Transcoded {
    pub fn status(&self) -> TranscodeStatus {
        TranscodeStatus {
            source_format: format!("{:?}", self.source_format).to_lowercase(),
            output_format: self.output_format.name().to_string(),
            source_width: self.source_width,
            width: self.width,
            height: self.height,
            bytes: self.data.len() as u64,
        }
    }
}

/// Decodes `data`, shrinks it to `max_width` when wider, and re-encodes it.
pub fn transcode_bytes(data: &[u8], settings: &TranscodeSettings) -> Result<Transcoded, ItemError> {
    let source_format =
        image::guess_format(data).map_err(|e| ItemError::Decode(e.to_string()))?;
    let img = image::load_from_memory_with_format(data, source_format)
        .map_err(|e| ItemError::Decode(e.to_string()))?;

    let source_width = img.width();
    let img = if source_width > settings.max_width {
        // Height is left unconstrained so only the width bounds the result.
        img.resize(settings.max_width, u32::MAX, ResizeFilter::Lanczos3)
    } else {
        img
    };

    let output_format = OutputFormat::for_source(source_format);
    let data = match output_format {
        OutputFormat::Jpeg => encode_jpeg(&img, settings.jpeg_quality)?,
        OutputFormat::Png => encode_png(&img, settings.png_compression)?,
    };

    Ok(Transcoded {
        data,
        source_format,
        output_format,
        source_width,
        width: img.width(),
        height: img.height(),
    })
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ItemError> {
    // Baseline JPEG carries no alpha channel.
    let img = match img.color() {
        ColorType::L8 => DynamicImage::ImageLuma8(img.to_luma8()),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    };

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .write_image(img.as_bytes(), img.width(), img.height(), img.color())
        .map_err(|e| ItemError::Encode(e.to_string()))?;
    Ok(out)
}

fn encode_png(img: &DynamicImage, level: u8) -> Result<Vec<u8>, ItemError> {
    // Normalise to 8-bit so the encoder never sees float or 16-bit buffers.
    let img = match img.color() {
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => img.clone(),
        c if c.has_alpha() => DynamicImage::ImageRgba8(img.to_rgba8()),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    };

    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, png_compression(level), FilterType::Adaptive)
        .write_image(img.as_bytes(), img.width(), img.height(), img.color())
        .map_err(|e| ItemError::Encode(e.to_string()))?;
    Ok(out)
}

/// Maps a zlib-style level (0-9) onto the encoder's presets.
fn png_compression(level: u8) -> CompressionType {
    match level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Turns cached originals into mobile variants in the out area.
pub struct Transcoder {
    workspace: Workspace,
    settings: TranscodeSettings,
}

impl Transcoder {
    pub fn new(workspace: Workspace, settings: TranscodeSettings) -> Self {
        Self {
            workspace,
            settings,
        }
    }

    pub async fn transcode(&self, key: &str) -> Result<TranscodeStatus, ItemError> {
        info!(key = %key, "Compressing {}", key);
        let input = self.workspace.raw_path(key)?;
        let output = self.workspace.out_path(key)?;

        let data = tokio::fs::read(&input).await?;
        let settings = self.settings;
        let transcoded =
            tokio::task::spawn_blocking(move || transcode_bytes(&data, &settings)).await??;

        if OutputFormat::from_key(key) != Some(transcoded.output_format) {
            warn!(
                key = %key,
                "{} decoded as {:?}, writing {} under the original name",
                key,
                transcoded.source_format,
                transcoded.output_format.name()
            );
        }

        ensure_parent(&output).await?;
        tokio::fs::write(&output, &transcoded.data).await?;
        Ok(transcoded.status())
    }
}
