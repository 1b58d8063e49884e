//! Local image tools for PAD card analysis.
//!
//! - `compute_average_rgb`: mean colour inside one bounding box
//! - `analyze_image_regions`: per-channel statistics for several named regions
//! - `load_image`: read (and optionally resize) an image, returned inline
//! - `save_image`: write base64 image data into the storage directory
//!
//! Pixel work runs on the blocking thread pool; every failure is returned as
//! a `success=false` envelope.

pub mod analysis;
pub mod files;

pub use analysis::{
    ANALYZE_IMAGE_REGIONS_TOOL, AnalyzeRegionsRequest, AverageRgbRequest, BoundingBox,
    BoundingBoxInput, COMPUTE_AVERAGE_RGB_TOOL, Metric, RegionSpec, analyze_image_regions,
    compute_average_rgb, create_analyze_image_regions_tool, create_compute_average_rgb_tool,
};
pub use files::{
    LOAD_IMAGE_TOOL, LoadImageRequest, LoadedImage, SAVE_IMAGE_TOOL, SaveImageRequest,
    create_load_image_tool, create_save_image_tool, load_image, save_image,
};

use bridge_core::{Result, Tool};
use std::path::PathBuf;
use std::sync::Arc;

/// All image tools, saving into `storage_dir`.
pub fn image_tools(storage_dir: impl Into<PathBuf>) -> Result<Vec<Arc<dyn Tool>>> {
    Ok(vec![
        Arc::new(create_compute_average_rgb_tool()?) as Arc<dyn Tool>,
        Arc::new(create_analyze_image_regions_tool()?) as Arc<dyn Tool>,
        Arc::new(create_load_image_tool()?) as Arc<dyn Tool>,
        Arc::new(create_save_image_tool(storage_dir)?) as Arc<dyn Tool>,
    ])
}
