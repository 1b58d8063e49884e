//! Colour statistics over rectangular regions of PAD card images.

use bridge_core::{Result, ToolOutcome};
use bridge_tool::{FunctionTool, generate_schema, parse_params};
use image::RgbImage;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::path::Path;
use tracing::{debug, error};

pub const COMPUTE_AVERAGE_RGB_TOOL: &str = "compute_average_rgb";
pub const ANALYZE_IMAGE_REGIONS_TOOL: &str = "analyze_image_regions";

/// Bounding box as supplied by the caller; any coordinate may be missing.
///
/// Fractional coordinates are truncated toward zero. A coordinate that is not
/// a number counts as missing.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct BoundingBoxInput {
    /// Left edge (inclusive)
    #[serde(default, deserialize_with = "coordinate")]
    #[schemars(with = "Option<f64>")]
    pub x1: Option<i64>,
    /// Top edge (inclusive)
    #[serde(default, deserialize_with = "coordinate")]
    #[schemars(with = "Option<f64>")]
    pub y1: Option<i64>,
    /// Right edge (exclusive)
    #[serde(default, deserialize_with = "coordinate")]
    #[schemars(with = "Option<f64>")]
    pub x2: Option<i64>,
    /// Bottom edge (exclusive)
    #[serde(default, deserialize_with = "coordinate")]
    #[schemars(with = "Option<f64>")]
    pub y2: Option<i64>,
}

fn coordinate<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| {
        v.as_i64()
            .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
    }))
}

impl BoundingBoxInput {
    /// `None` unless all four coordinates are present.
    pub fn complete(&self) -> Option<BoundingBox> {
        Some(BoundingBox {
            x1: self.x1?,
            y1: self.y1?,
            x2: self.x2?,
            y2: self.y2?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl BoundingBox {
    pub fn width(&self) -> i64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i64 {
        self.y2 - self.y1
    }

    /// Inside a `width` x `height` image and non-empty.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.x1 >= 0
            && self.y1 >= 0
            && self.x2 <= i64::from(width)
            && self.y2 <= i64::from(height)
            && self.x1 < self.x2
            && self.y1 < self.y2
    }

    /// Pull the box inside the image, keeping at least one pixel.
    pub fn clamp_to(&self, width: u32, height: u32) -> BoundingBox {
        let (w, h) = (i64::from(width), i64::from(height));
        let x1 = self.x1.min(w - 1).max(0);
        let y1 = self.y1.min(h - 1).max(0);
        BoundingBox {
            x1,
            y1,
            x2: self.x2.min(w).max(x1 + 1),
            y2: self.y2.min(h).max(y1 + 1),
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{'x1': {}, 'y1': {}, 'x2': {}, 'y2': {}}}",
            self.x1, self.y1, self.x2, self.y2
        )
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AverageRgbRequest {
    /// Bounding box with keys x1, y1 (top-left) and x2, y2 (bottom-right)
    #[serde(default)]
    pub bbox: Option<BoundingBoxInput>,
    /// File system path to the image
    pub image_path: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RegionSpec {
    /// Region identifier, defaults to region_N
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bbox: BoundingBoxInput,
    /// Subset of avg, std, min, max, median, mode (default: avg)
    #[serde(default)]
    pub metrics: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AnalyzeRegionsRequest {
    /// Path to the image file
    pub image_path: String,
    #[serde(default)]
    pub regions: Vec<RegionSpec>,
}

/// Per-channel statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Avg,
    Std,
    Min,
    Max,
    Median,
    Mode,
}

impl Metric {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "avg" => Some(Metric::Avg),
            "std" => Some(Metric::Std),
            "min" => Some(Metric::Min),
            "max" => Some(Metric::Max),
            "median" => Some(Metric::Median),
            "mode" => Some(Metric::Mode),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Avg => "avg",
            Metric::Std => "std",
            Metric::Min => "min",
            Metric::Max => "max",
            Metric::Median => "median",
            Metric::Mode => "mode",
        }
    }

    /// Compute over a non-empty sample.
    fn compute(&self, sorted: &[u8]) -> f64 {
        let n = sorted.len() as f64;
        let mean = || sorted.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
        match self {
            Metric::Avg => mean(),
            Metric::Std => {
                let m = mean();
                let var = sorted
                    .iter()
                    .map(|&v| (f64::from(v) - m).powi(2))
                    .sum::<f64>()
                    / n;
                var.sqrt()
            }
            Metric::Min => f64::from(sorted[0]),
            Metric::Max => f64::from(sorted[sorted.len() - 1]),
            Metric::Median => {
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (f64::from(sorted[mid - 1]) + f64::from(sorted[mid])) / 2.0
                } else {
                    f64::from(sorted[mid])
                }
            }
            Metric::Mode => {
                let mut counts = [0usize; 256];
                for &v in sorted {
                    counts[usize::from(v)] += 1;
                }
                // max_by_key keeps the last maximum, so scan in reverse for the smallest value
                let mode = (0..256usize)
                    .rev()
                    .max_by_key(|&v| counts[v])
                    .unwrap_or_default();
                mode as f64
            }
        }
    }
}

/// Channel samples of a box already known to lie inside the image.
fn channel_samples(img: &RgbImage, bbox: BoundingBox) -> [Vec<u8>; 3] {
    let capacity = (bbox.width() * bbox.height()) as usize;
    let mut channels = [
        Vec::with_capacity(capacity),
        Vec::with_capacity(capacity),
        Vec::with_capacity(capacity),
    ];
    for y in bbox.y1..bbox.y2 {
        for x in bbox.x1..bbox.x2 {
            let pixel = img.get_pixel(x as u32, y as u32);
            for (channel, value) in channels.iter_mut().zip(pixel.0) {
                channel.push(value);
            }
        }
    }
    channels
}

/// Statistics for each requested metric over one channel.
pub fn channel_stats(samples: &mut [u8], metrics: &[Metric]) -> Map<String, Value> {
    samples.sort_unstable();
    let mut stats = Map::new();
    if samples.is_empty() {
        return stats;
    }
    for metric in metrics {
        stats.insert(metric.as_str().to_string(), json!(metric.compute(samples)));
    }
    stats
}

fn open_rgb(path: &Path) -> std::result::Result<RgbImage, ToolOutcome> {
    image::open(path).map(|img| img.to_rgb8()).map_err(|e| {
        ToolOutcome::failure(
            format!("Failed to open image: {}", e),
            "Could not open or process the image file.",
        )
    })
}

fn missing_image(path: &str) -> ToolOutcome {
    ToolOutcome::failure(
        format!("Image path does not exist: {}", path),
        "Failed to locate the specified image file.",
    )
}

/// Mean R, G and B inside a single bounding box.
pub fn compute_average_rgb(request: &AverageRgbRequest) -> ToolOutcome {
    let path = Path::new(&request.image_path);
    if !path.exists() {
        return missing_image(&request.image_path);
    }

    let Some(bbox) = request.bbox.as_ref().and_then(BoundingBoxInput::complete) else {
        return ToolOutcome::failure(
            "Bounding box must contain 'x1', 'y1', 'x2', and 'y2' keys.",
            "Invalid bounding box specification.",
        );
    };

    let img = match open_rgb(path) {
        Ok(img) => img,
        Err(outcome) => return outcome,
    };

    let (width, height) = img.dimensions();
    if !bbox.fits(width, height) {
        return ToolOutcome::failure(
            format!(
                "Invalid bounding box coordinates: {} for image size {}x{}",
                bbox, width, height
            ),
            "Bounding box coordinates are outside image dimensions or invalid.",
        );
    }

    let [mut r, mut g, mut b] = channel_samples(&img, bbox);
    let avg = |samples: &mut Vec<u8>| {
        channel_stats(samples, &[Metric::Avg])
            .remove("avg")
            .unwrap_or(Value::Null)
    };
    debug!("Averaging {}x{} region of {:?}", bbox.width(), bbox.height(), path);

    ToolOutcome::success(
        json!({
            "avg_r": avg(&mut r),
            "avg_g": avg(&mut g),
            "avg_b": avg(&mut b),
            "region_size": {"width": bbox.width(), "height": bbox.height()},
        }),
        format!(
            "Computed average RGB values for the specified bounding box ({}x{} pixels).",
            bbox.width(),
            bbox.height()
        ),
    )
}

/// Per-region, per-channel statistics.
///
/// Boxes are clamped into the image rather than rejected. A region without
/// all four coordinates is reported invalid on its own.
pub fn analyze_image_regions(request: &AnalyzeRegionsRequest) -> ToolOutcome {
    let path = Path::new(&request.image_path);
    if !path.exists() {
        return missing_image(&request.image_path);
    }

    let img = match open_rgb(path) {
        Ok(img) => img,
        Err(outcome) => return outcome,
    };
    let (width, height) = img.dimensions();

    let mut results = Map::new();
    for (i, region) in request.regions.iter().enumerate() {
        let name = region
            .name
            .clone()
            .unwrap_or_else(|| format!("region_{}", i + 1));
        let metrics: Vec<Metric> = match &region.metrics {
            Some(names) => names.iter().filter_map(|m| Metric::parse(m)).collect(),
            None => vec![Metric::Avg],
        };

        let Some(bbox) = region.bbox.complete() else {
            results.insert(
                name,
                json!({"error": "Invalid bounding box specification", "valid": false}),
            );
            continue;
        };

        let bbox = bbox.clamp_to(width, height);
        let samples = channel_samples(&img, bbox);
        let mut channels = Map::new();
        for (channel, mut values) in ["r", "g", "b"].into_iter().zip(samples) {
            channels.insert(
                channel.to_string(),
                Value::Object(channel_stats(&mut values, &metrics)),
            );
        }

        results.insert(
            name,
            json!({
                "bbox": bbox,
                "size": {"width": bbox.width(), "height": bbox.height()},
                "channels": channels,
                "valid": true,
            }),
        );
    }

    let count = results.len();
    ToolOutcome::success(
        Value::Object(results),
        format!("Analyzed {} regions in the image.", count),
    )
}

/// Run blocking pixel work off the async runtime.
async fn run_blocking<F>(work: F, failure_description: &'static str) -> ToolOutcome
where
    F: FnOnce() -> ToolOutcome + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Image worker failed: {}", e);
            ToolOutcome::failure(e.to_string(), failure_description)
        }
    }
}

pub fn create_compute_average_rgb_tool() -> Result<FunctionTool> {
    FunctionTool::builder()
        .name(COMPUTE_AVERAGE_RGB_TOOL)
        .description(
            "Compute the average RGB values within a bounding box of an image. \
             The box is given by x1, y1 (top-left) and x2, y2 (bottom-right) in pixels.",
        )
        .schema(generate_schema::<AverageRgbRequest>())
        .execute(|_ctx, params| async move {
            let request: AverageRgbRequest = match parse_params(COMPUTE_AVERAGE_RGB_TOOL, params) {
                Ok(request) => request,
                Err(outcome) => return Ok(outcome.into()),
            };
            let outcome = run_blocking(
                move || compute_average_rgb(&request),
                "Failed to compute average RGB values due to an error.",
            )
            .await;
            Ok(outcome.into())
        })
        .build()
}

pub fn create_analyze_image_regions_tool() -> Result<FunctionTool> {
    FunctionTool::builder()
        .name(ANALYZE_IMAGE_REGIONS_TOOL)
        .description(
            "Analyze multiple regions of an image and compute per-channel statistics \
             (avg, std, min, max, median, mode) for each region.",
        )
        .schema(generate_schema::<AnalyzeRegionsRequest>())
        .execute(|_ctx, params| async move {
            let request: AnalyzeRegionsRequest =
                match parse_params(ANALYZE_IMAGE_REGIONS_TOOL, params) {
                    Ok(request) => request,
                    Err(outcome) => return Ok(outcome.into()),
                };
            let outcome = run_blocking(
                move || analyze_image_regions(&request),
                "Failed to analyze image regions due to an error.",
            )
            .await;
            Ok(outcome.into())
        })
        .build()
}
