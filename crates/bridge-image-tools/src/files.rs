//! Loading and saving images in local storage.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use bridge_core::{Attachment, Result, ToolOutcome, ToolResponse};
use bridge_tool::{FunctionTool, generate_schema, parse_params};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Limits};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

pub const LOAD_IMAGE_TOOL: &str = "load_image";
pub const SAVE_IMAGE_TOOL: &str = "save_image";

fn default_true() -> bool {
    true
}

fn default_format() -> String {
    "PNG".to_string()
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LoadImageRequest {
    /// Path to the image file
    pub path: String,
    /// Width to resize the image to, in pixels
    #[serde(default)]
    pub resize_width: Option<u32>,
    /// Keep the aspect ratio when resizing (default: true)
    #[serde(default = "default_true")]
    pub maintain_aspect_ratio: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SaveImageRequest {
    /// Base64 encoded image bytes
    #[serde(default)]
    pub image_data: String,
    /// File name inside the storage directory (default: a random name)
    #[serde(default)]
    pub filename: Option<String>,
    /// Format to save as (default: PNG)
    #[serde(default = "default_format")]
    pub format: String,
}

/// A decoded, possibly resized image re-encoded for transport.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl LoadedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Bytes per pixel of the f32 RGBA buffer the Lanczos3 resampler works in.
const RESAMPLE_BYTES_PER_PIXEL: u64 = 16;

/// Largest resampling buffer, in pixels, a resize may allocate.
///
/// Derived from the decoder's default allocation limit so a resize never
/// needs more memory than decoding an image may.
fn resize_pixel_budget() -> u64 {
    Limits::default().max_alloc.unwrap_or(512 * 1024 * 1024) / RESAMPLE_BYTES_PER_PIXEL
}

/// Target size for a resize to `resize_width`.
pub fn resized_dimensions(
    width: u32,
    height: u32,
    resize_width: u32,
    maintain_aspect_ratio: bool,
) -> (u32, u32) {
    if maintain_aspect_ratio && width > 0 {
        let h = u64::from(resize_width) * u64::from(height) / u64::from(width);
        (resize_width, u32::try_from(h).unwrap_or(u32::MAX))
    } else {
        (resize_width, height)
    }
}

/// Decode, optionally resize, and re-encode an image file.
///
/// The source format is kept when it can be written, PNG otherwise.
pub fn load_image(request: &LoadImageRequest) -> std::result::Result<LoadedImage, String> {
    let path = Path::new(&request.path);
    if !path.exists() {
        return Err(format!("Image file not found: {}", request.path));
    }

    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| e.to_string())?;
    let source_format = reader.format();
    let mut img = reader.decode().map_err(|e| e.to_string())?;

    if let Some(resize_width) = request.resize_width.filter(|w| *w > 0) {
        let (w, h) = resized_dimensions(
            img.width(),
            img.height(),
            resize_width,
            request.maintain_aspect_ratio,
        );
        if h == 0 {
            return Err(format!("Resized height would be zero for width {}", w));
        }
        // Vertical pass first: the working buffer is max(old, new) wide and new high
        let pixels = u64::from(w.max(img.width())) * u64::from(h);
        let budget = resize_pixel_budget();
        if pixels > budget {
            return Err(format!(
                "Resized image {}x{} exceeds the limit of {} pixels",
                w, h, budget
            ));
        }
        img = img.resize_exact(w, h, FilterType::Lanczos3);
    }

    let format = source_format
        .filter(|f| f.writing_enabled())
        .unwrap_or(ImageFormat::Png);
    let bytes = encode(&img, format).map_err(|e| e.to_string())?;

    Ok(LoadedImage {
        bytes,
        format,
        width: img.width(),
        height: img.height(),
    })
}

fn encode(img: &DynamicImage, format: ImageFormat) -> image::ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    // JPEG has no alpha channel
    if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(img.to_rgb8()).write_to(&mut Cursor::new(&mut buf), format)?;
    } else {
        img.write_to(&mut Cursor::new(&mut buf), format)?;
    }
    Ok(buf)
}

fn invalid_image(error: impl std::fmt::Display) -> ToolOutcome {
    ToolOutcome::failure(
        format!("Invalid image data: {}", error),
        "Could not process or save the provided image data",
    )
}

/// Decode base64 image bytes and write them into `storage_dir`.
///
/// Supplied file names are reduced to their final component.
pub fn save_image(request: &SaveImageRequest, storage_dir: &Path) -> ToolOutcome {
    let encoded = request.image_data.trim();
    // Accept data URLs as well as bare base64
    let encoded = match encoded.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
        None => encoded,
    };
    if encoded.is_empty() {
        return ToolOutcome::failure("No image data provided", "Image data is empty or None");
    }

    let Some(format) = ImageFormat::from_extension(request.format.to_lowercase())
        .filter(|f| f.writing_enabled())
    else {
        return ToolOutcome::failure(
            format!("Unsupported image format: {}", request.format),
            "Could not process or save the provided image data",
        );
    };

    let bytes = match BASE64.decode(encoded) {
        Ok(bytes) => bytes,
        Err(e) => return invalid_image(e),
    };

    if let Err(e) = std::fs::create_dir_all(storage_dir) {
        error!("Failed to create storage directory {:?}: {}", storage_dir, e);
        return ToolOutcome::failure(e.to_string(), "Failed to save image due to an error");
    }

    let filename = request
        .filename
        .clone()
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| format!("{}.{}", Uuid::new_v4(), request.format.to_lowercase()));
    let Some(safe_filename) = Path::new(&filename)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
    else {
        return ToolOutcome::failure(
            format!("Invalid filename: {}", filename),
            "Could not process or save the provided image data",
        );
    };
    let full_path = storage_dir.join(&safe_filename);

    let img = match image::load_from_memory(&bytes) {
        Ok(img) => img,
        Err(e) => return invalid_image(e),
    };
    let encoded = match encode(&img, format) {
        Ok(encoded) => encoded,
        Err(e) => return invalid_image(e),
    };
    if let Err(e) = std::fs::write(&full_path, encoded) {
        error!("Failed to write {:?}: {}", full_path, e);
        return ToolOutcome::failure(e.to_string(), "Failed to save image due to an error");
    }

    let path = full_path.display().to_string();
    info!("Saved image to {}", path);
    ToolOutcome::success(
        json!({"filename": safe_filename, "path": path}),
        format!("Image successfully saved to {}", path),
    )
    .with_filename(safe_filename)
    .with_path(path)
}

pub fn create_load_image_tool() -> Result<FunctionTool> {
    FunctionTool::builder()
        .name(LOAD_IMAGE_TOOL)
        .description(
            "Load an image from disk with optional resizing. \
             When resize_width is given the aspect ratio is kept unless maintain_aspect_ratio is false.",
        )
        .schema(generate_schema::<LoadImageRequest>())
        .execute(|_ctx, params| async move {
            let request: LoadImageRequest = match parse_params(LOAD_IMAGE_TOOL, params) {
                Ok(request) => request,
                Err(outcome) => return Ok(outcome.into()),
            };
            let path = request.path.clone();

            let loaded = tokio::task::spawn_blocking(move || load_image(&request))
                .await
                .unwrap_or_else(|e| Err(e.to_string()));

            let response = match loaded {
                Ok(img) => {
                    let mime_type = img.mime_type().to_string();
                    let outcome = ToolOutcome::success(
                        json!({
                            "path": path,
                            "width": img.width,
                            "height": img.height,
                            "mime_type": mime_type,
                        }),
                        format!("Loaded image {} ({}x{})", path, img.width, img.height),
                    )
                    .with_path(path)
                    .with_content_type(mime_type.clone());
                    ToolResponse::from(outcome).with_attachment(Attachment::Image {
                        data: BASE64.encode(&img.bytes),
                        mime_type,
                    })
                }
                Err(e) => {
                    error!("Error loading image {}: {}", path, e);
                    ToolOutcome::failure(
                        format!("Error loading or resizing image: {}", e),
                        format!("Could not load the image at {}", path),
                    )
                    .into()
                }
            };
            Ok(response)
        })
        .build()
}

pub fn create_save_image_tool(storage_dir: impl Into<PathBuf>) -> Result<FunctionTool> {
    let storage_dir: Arc<PathBuf> = Arc::new(storage_dir.into());

    FunctionTool::builder()
        .name(SAVE_IMAGE_TOOL)
        .description(
            "Save base64 encoded image data to the storage directory. \
             Returns the saved file name and path.",
        )
        .schema(generate_schema::<SaveImageRequest>())
        .execute(move |_ctx, params| {
            let storage_dir = Arc::clone(&storage_dir);
            async move {
                let request: SaveImageRequest = match parse_params(SAVE_IMAGE_TOOL, params) {
                    Ok(request) => request,
                    Err(outcome) => return Ok(outcome.into()),
                };
                let outcome =
                    tokio::task::spawn_blocking(move || save_image(&request, &storage_dir))
                        .await
                        .unwrap_or_else(|e| {
                            error!("Image worker failed: {}", e);
                            ToolOutcome::failure(e.to_string(), "Failed to save image due to an error")
                        });
                Ok(outcome.into())
            }
        })
        .build()
}
