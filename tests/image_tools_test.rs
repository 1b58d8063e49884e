//! Image tools exercised through the `Tool` trait, as the MCP server calls them.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use image::{ImageFormat, Rgb, RgbImage};
use openbridge::bridge_core::{ToolContext, ToolResponse};
use openbridge::bridge_image_tools::image_tools;
use openbridge::bridge_tool::DefaultToolContext;
use serde_json::{Value, json};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// 100x100 card: left half pure red, right half pure blue.
fn write_card(path: &Path) {
    let img = RgbImage::from_fn(100, 100, |x, _| {
        if x < 50 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
    });
    img.save(path).unwrap();
}

fn ctx() -> Arc<dyn ToolContext> {
    Arc::new(DefaultToolContext::new("call-1".into(), "session-1".into()))
}

async fn call(storage: &Path, name: &str, params: Value) -> ToolResponse {
    let tools = image_tools(storage.to_path_buf()).unwrap();
    let tool = tools.into_iter().find(|t| t.name() == name).unwrap();
    tool.execute(ctx(), params).await.unwrap()
}

#[tokio::test]
async fn test_average_rgb_over_left_half() {
    let dir = tempfile::tempdir().unwrap();
    let card = dir.path().join("card.png");
    write_card(&card);

    let response = call(
        dir.path(),
        "compute_average_rgb",
        json!({
            "image_path": card.to_str().unwrap(),
            "bbox": {"x1": 10, "y1": 10, "x2": 50, "y2": 50}
        }),
    )
    .await;

    assert!(response.is_success());
    let data = &response.result["data"];
    assert_eq!(data["avg_r"], 255.0);
    assert_eq!(data["avg_g"], 0.0);
    assert_eq!(data["avg_b"], 0.0);
    assert_eq!(data["region_size"], json!({"width": 40, "height": 40}));
}

#[tokio::test]
async fn test_average_rgb_rejects_inverted_box() {
    let dir = tempfile::tempdir().unwrap();
    let card = dir.path().join("card.png");
    write_card(&card);

    let response = call(
        dir.path(),
        "compute_average_rgb",
        json!({
            "image_path": card.to_str().unwrap(),
            "bbox": {"x1": 60, "y1": 10, "x2": 20, "y2": 50}
        }),
    )
    .await;

    assert!(!response.is_success());
    let error = response.result["error"].as_str().unwrap();
    assert!(error.starts_with("Invalid bounding box coordinates"));
    assert!(error.ends_with("for image size 100x100"));
}

#[tokio::test]
async fn test_missing_image_reported_by_both_analysis_tools() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.png");
    let missing = missing.to_str().unwrap();

    let average = call(
        dir.path(),
        "compute_average_rgb",
        json!({"image_path": missing, "bbox": {"x1": 0, "y1": 0, "x2": 1, "y2": 1}}),
    )
    .await;
    let regions = call(
        dir.path(),
        "analyze_image_regions",
        json!({"image_path": missing, "regions": []}),
    )
    .await;

    for response in [average, regions] {
        assert!(!response.is_success());
        assert_eq!(
            response.result["error"],
            format!("Image path does not exist: {}", missing)
        );
    }
}

#[tokio::test]
async fn test_regions_with_metrics_and_clamping() {
    let dir = tempfile::tempdir().unwrap();
    let card = dir.path().join("card.png");
    write_card(&card);

    let response = call(
        dir.path(),
        "analyze_image_regions",
        json!({
            "image_path": card.to_str().unwrap(),
            "regions": [
                {"name": "blue", "bbox": {"x1": 60, "y1": 0, "x2": 500, "y2": 10},
                 "metrics": ["avg", "std", "median"]},
                {"bbox": {"x1": 0, "y1": 0, "x2": 10}}
            ]
        }),
    )
    .await;

    assert!(response.is_success());
    let blue = &response.result["data"]["blue"];
    assert_eq!(blue["valid"], true);
    assert_eq!(blue["bbox"]["x2"], 100);
    assert_eq!(blue["size"], json!({"width": 40, "height": 10}));
    assert_eq!(blue["channels"]["b"]["avg"], 255.0);
    assert_eq!(blue["channels"]["b"]["std"], 0.0);
    assert_eq!(blue["channels"]["r"]["median"], 0.0);

    let unnamed = &response.result["data"]["region_2"];
    assert_eq!(unnamed["valid"], false);
}

#[tokio::test]
async fn test_save_then_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let storage = dir.path().join("storage");

    let mut png = Vec::new();
    RgbImage::from_pixel(8, 4, Rgb([0, 128, 0]))
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();

    let saved = call(
        &storage,
        "save_image",
        json!({"image_data": BASE64.encode(&png), "filename": "../escape/green.png"}),
    )
    .await;
    assert!(saved.is_success());
    assert_eq!(saved.result["filename"], "green.png");
    let path = saved.result["path"].as_str().unwrap().to_string();
    assert!(Path::new(&path).starts_with(&storage));

    let loaded = call(&storage, "load_image", json!({"path": &path})).await;
    assert!(loaded.is_success());
    assert_eq!(loaded.result["data"]["width"], 8);
    assert_eq!(loaded.result["data"]["height"], 4);
    assert_eq!(loaded.attachments.len(), 1);

    let resized = call(
        &storage,
        "load_image",
        json!({"path": path, "resize_width": 4}),
    )
    .await;
    assert_eq!(resized.result["data"]["width"], 4);
    assert_eq!(resized.result["data"]["height"], 2);
}

#[tokio::test]
async fn test_save_without_data_fails() {
    let dir = tempfile::tempdir().unwrap();
    let response = call(dir.path(), "save_image", json!({"image_data": ""})).await;
    assert!(!response.is_success());
    assert_eq!(response.result["error"], "No image data provided");
}

#[tokio::test]
async fn test_huge_resize_width_returns_failure_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let card = dir.path().join("small.png");
    RgbImage::from_pixel(10, 10, Rgb([1, 2, 3])).save(&card).unwrap();

    let response = call(
        dir.path(),
        "load_image",
        json!({
            "path": card.to_str().unwrap(),
            "resize_width": 4_000_000_000u32,
            "maintain_aspect_ratio": false
        }),
    )
    .await;

    assert!(!response.is_success());
    assert!(response.attachments.is_empty());
    let error = response.result["error"].as_str().unwrap();
    assert!(error.starts_with("Error loading or resizing image"));
    assert!(error.contains("exceeds the limit"));
}
