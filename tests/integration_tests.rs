// Integration tests for img2stitch
use img2stitch::{
    convert, convert_thread_brand, load_image, Brand, PatternBuilder, PatternConfig, PatternType, ThreadCatalog,
    UNSTITCHED,
};
use std::fs;
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("img2stitch_{}_{}", std::process::id(), name))
}

// Create a simple test image programmatically
fn create_test_png(path: &PathBuf, width: u32, height: u32, pattern: &str) {
    let mut pixel_data: Vec<u8> = Vec::with_capacity((width * height * 4) as usize);

    for y in 0..height {
        for x in 0..width {
            let (r, g, b, a) = match pattern {
                "gradient" => {
                    let r = (x * 255 / width.max(1)) as u8;
                    let g = (y * 255 / height.max(1)) as u8;
                    (r, g, 128, 255)
                }
                "checkerboard" => {
                    let size = 10;
                    let is_white = ((x / size) + (y / size)) % 2 == 0;
                    if is_white { (255, 255, 255, 255) } else { (0, 0, 0, 255) }
                }
                "circle" => {
                    let cx = width / 2;
                    let cy = height / 2;
                    let radius = width.min(height) / 4;
                    let dx = x as i32 - cx as i32;
                    let dy = y as i32 - cy as i32;
                    if dx * dx + dy * dy < (radius * radius) as i32 {
                        (255, 0, 0, 255)
                    } else {
                        (255, 255, 255, 255)
                    }
                }
                "transparent" => {
                    if x < width / 2 { (0, 0, 255, 255) } else { (0, 0, 0, 0) }
                }
                "solid" => (128, 128, 128, 255),
                _ => (255, 255, 255, 255),
            };
            pixel_data.extend_from_slice(&[r, g, b, a]);
        }
    }

    let img: image::RgbaImage = image::ImageBuffer::from_raw(width, height, pixel_data).unwrap();
    img.save(path).expect("Failed to save test image");
}

fn catalog() -> ThreadCatalog {
    ThreadCatalog::builtin().expect("Built-in catalog")
}

fn seeded(max_colors: usize) -> PatternConfig {
    PatternConfig {
        max_colors,
        seed: Some(42),
        ..Default::default()
    }
}

#[test]
fn test_builtin_catalog_has_all_brands() {
    let catalog = catalog();
    for brand in Brand::ALL {
        assert!(!catalog.by_brand(brand).is_empty(), "no {} threads", brand);
    }
    assert!(catalog.get("dmc_310").is_some());
}

#[test]
fn test_full_pipeline_gradient() {
    let test_img = temp_path("gradient.png");
    let test_json = temp_path("gradient.json");
    create_test_png(&test_img, 60, 40, "gradient");

    let artifact = convert(&test_img, &test_json, &seeded(8), &catalog()).expect("Failed to convert");
    assert_eq!((artifact.grid.width, artifact.grid.height), (60, 40));
    assert!(!artifact.color_palette.is_empty());
    assert!(artifact.color_palette.len() <= 8);

    // Verify the written document
    let content = fs::read_to_string(&test_json).expect("Failed to read JSON");
    let json: serde_json::Value = serde_json::from_str(&content).expect("Invalid JSON");
    assert_eq!(json["grid_data"]["width"], 60);
    assert_eq!(json["grid_data"]["height"], 40);
    assert_eq!(json["grid_data"]["grid"].as_array().unwrap().len(), 40);
    assert_eq!(json["grid_data"]["grid"][0].as_array().unwrap().len(), 60);
    assert_eq!(json["dimensions"]["width_stitches"], 60);
    assert!(json["pattern_id"].as_str().unwrap().starts_with("pattern_"));
    assert!(json["estimated_time"].as_u64().unwrap() > 0);
    for color in json["color_palette"].as_array().unwrap() {
        assert_eq!(color["thread_brand"], "DMC");
        assert_eq!(color["symbol"].as_str().unwrap().chars().count(), 1);
    }

    let _ = fs::remove_file(&test_img);
    let _ = fs::remove_file(&test_json);
}

#[test]
fn test_full_pipeline_checkerboard() {
    let test_img = temp_path("checkerboard.png");
    create_test_png(&test_img, 40, 40, "checkerboard");

    let image = load_image(&test_img).expect("Failed to load image");
    let catalog = catalog();
    let artifact = PatternBuilder::new(&catalog).build(&image, &seeded(4)).expect("Failed to build");

    // Black and white only
    assert_eq!(artifact.color_palette.len(), 2);
    assert_eq!(artifact.color_palette[0].stitch_count, 800);
    assert_eq!(artifact.color_palette[1].stitch_count, 800);
    assert_ne!(artifact.grid.get(0, 0), artifact.grid.get(10, 0));
    assert_eq!(artifact.grid.get(0, 0), artifact.grid.get(10, 10));

    let _ = fs::remove_file(&test_img);
}

#[test]
fn test_full_pipeline_circle_outline() {
    let test_img = temp_path("circle.png");
    create_test_png(&test_img, 60, 60, "circle");

    let image = load_image(&test_img).expect("Failed to load image");
    let catalog = catalog();
    let config = PatternConfig {
        pattern_type: PatternType::Outline,
        ..seeded(4)
    };
    let artifact = PatternBuilder::new(&catalog).build(&image, &config).expect("Failed to build");

    let stitched = artifact.grid.stitched_count();
    assert!(stitched > 0);
    assert!(stitched < 60 * 60 / 4);
    // Circle center and corners are interior, not outline
    assert_eq!(artifact.grid.get(30, 30), UNSTITCHED);
    assert_eq!(artifact.grid.get(0, 0), UNSTITCHED);

    let json: serde_json::Value = serde_json::from_str(&artifact.to_json().unwrap()).unwrap();
    assert_eq!(json["grid_data"]["type"], "outline");
    assert_eq!(json["grid_data"]["grid"][0][0], -1);

    let _ = fs::remove_file(&test_img);
}

#[test]
fn test_transparent_pixels_become_white() {
    let test_img = temp_path("transparent.png");
    create_test_png(&test_img, 10, 10, "transparent");

    let catalog = catalog();
    let image = load_image(&test_img).expect("Failed to load image");
    let artifact = PatternBuilder::new(&catalog).build(&image, &seeded(2)).expect("Failed to build");

    let right = &artifact.color_palette[artifact.grid.get(9, 0) as usize].thread;
    assert!(right.rgb.r > 240 && right.rgb.g > 240 && right.rgb.b > 240);

    let _ = fs::remove_file(&test_img);
}

#[test]
fn test_large_image_is_downscaled() {
    let test_img = temp_path("large.png");
    create_test_png(&test_img, 400, 200, "gradient");

    let catalog = catalog();
    let image = load_image(&test_img).expect("Failed to load image");
    let artifact = PatternBuilder::new(&catalog).build(&image, &seeded(6)).expect("Failed to build");
    assert_eq!((artifact.grid.width, artifact.grid.height), (150, 75));
    assert!((artifact.dimensions.width_cm - 150.0 * 2.54 / 14.0).abs() < 1e-9);

    let _ = fs::remove_file(&test_img);
}

#[test]
fn test_various_color_counts() {
    let test_img = temp_path("counts.png");
    create_test_png(&test_img, 30, 30, "gradient");

    let catalog = catalog();
    let image = load_image(&test_img).expect("Failed to load image");
    for colors in [1, 2, 5, 12, 24] {
        let artifact = PatternBuilder::new(&catalog)
            .build(&image, &seeded(colors))
            .expect("Failed to build");
        assert!(artifact.color_palette.len() <= colors);
        assert!(!artifact.color_palette.is_empty());
        let total: usize = artifact.color_palette.iter().map(|p| p.stitch_count).sum();
        assert_eq!(total, 900);
    }

    let _ = fs::remove_file(&test_img);
}

#[test]
fn test_every_brand_and_aida() {
    let test_img = temp_path("brands.png");
    create_test_png(&test_img, 20, 20, "circle");

    let catalog = catalog();
    let image = load_image(&test_img).expect("Failed to load image");
    for brand in Brand::ALL {
        for aida in [14, 16, 18, 20] {
            let config = PatternConfig {
                thread_brand: brand.to_string(),
                aida_count: aida,
                ..seeded(3)
            };
            let artifact = PatternBuilder::new(&catalog).build(&image, &config).expect("Failed to build");
            assert!(artifact.color_palette.iter().all(|p| p.thread.brand == brand));
            assert!((artifact.dimensions.width_cm - 20.0 * 2.54 / aida as f64).abs() < 1e-9);
        }
    }

    let _ = fs::remove_file(&test_img);
}

#[test]
fn test_convert_thread_brand_round_trip_black() {
    let catalog = catalog();
    let anchor = convert_thread_brand(&catalog, "310", Brand::Dmc, Brand::Anchor).expect("No match");
    assert_eq!(anchor.thread.brand, Brand::Anchor);
    assert_eq!(anchor.thread.thread_id, "anchor_403");

    let err = convert_thread_brand(&catalog, "no-such-code", Brand::Dmc, Brand::Anchor);
    assert!(err.is_err());
}

#[test]
fn test_custom_catalog_file() {
    let path = temp_path("catalog.json");
    fs::write(
        &path,
        r#"[
            {"thread_id": "dmc_310", "brand": "DMC", "color_code": "310", "color_name": "Black", "rgb": [0, 0, 0]},
            {"thread_id": "dmc_321", "brand": "DMC", "color_code": "321", "color_name": "Red", "rgb": [199, 44, 72]}
        ]"#,
    )
    .unwrap();

    let catalog = ThreadCatalog::load(&path).expect("Failed to load catalog");
    assert_eq!(catalog.len(), 2);

    let test_img = temp_path("custom_circle.png");
    create_test_png(&test_img, 20, 20, "circle");
    let image = load_image(&test_img).expect("Failed to load image");
    let artifact = PatternBuilder::new(&catalog).build(&image, &seeded(2)).expect("Failed to build");
    assert!(artifact.color_palette.iter().all(|p| catalog.get(&p.thread.thread_id).is_some()));

    let _ = fs::remove_file(&path);
    let _ = fs::remove_file(&test_img);
}

#[test]
fn test_missing_input_file() {
    let result = convert(
        &temp_path("does_not_exist.png"),
        &temp_path("never_written.json"),
        &PatternConfig::default(),
        &catalog(),
    );
    assert!(result.is_err());
}

#[test]
fn test_shared_catalog_concurrent_builds() {
    let test_img = temp_path("concurrent.png");
    create_test_png(&test_img, 30, 20, "gradient");

    let catalog = catalog();
    let image = load_image(&test_img).expect("Failed to load image");
    let config = seeded(5);
    let ids: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| PatternBuilder::new(&catalog).build(&image, &config).unwrap().pattern_id))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(ids.windows(2).all(|w| w[0] == w[1]));

    let _ = fs::remove_file(&test_img);
}
