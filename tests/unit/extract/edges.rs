use super::*;

fn step_edge(w: u32, h: u32, edge_x: u32) -> DynamicImage {
    let img = image::GrayImage::from_fn(w, h, |x, _| image::Luma([if x >= edge_x { 255 } else { 0 }]));
    DynamicImage::ImageLuma8(img)
}

fn texture(w: u32, h: u32) -> DynamicImage {
    let img = image::RgbImage::from_fn(w, h, |x, y| {
        let v = ((x * 37 + y * 91 + (x * y) % 13) % 256) as u8;
        image::Rgb([v, v.wrapping_mul(3), 255 - v])
    });
    DynamicImage::ImageRgb8(img)
}

fn params(threshold: f32, sample_rate: u32) -> ExtractParams {
    ExtractParams {
        threshold,
        sample_rate,
        ..ExtractParams::default()
    }
}

#[test]
fn vertical_edge_yields_unit_normals_row_major() {
    let set = extract_points(&step_edge(20, 10, 10), &params(95.0, 1)).unwrap();
    assert_eq!((set.width(), set.height()), (20, 10));
    assert_eq!(set.len(), 16);

    let first = set.get(0).unwrap();
    assert_eq!((first.x, first.y), (9, 1));
    assert_eq!((first.nx, first.ny), (1.0, 0.0));
    assert_eq!(first.mag, 1020);

    let coords: Vec<(u32, u32)> = set.as_slice().iter().map(|p| (p.y, p.x)).collect();
    let mut sorted = coords.clone();
    sorted.sort();
    assert_eq!(coords, sorted);
}

#[test]
fn sample_rate_strides_rows_and_columns() {
    let set = extract_points(&step_edge(20, 10, 10), &params(95.0, 2)).unwrap();
    let xs: Vec<u32> = set.as_slice().iter().map(|p| p.x).collect();
    let ys: Vec<u32> = set.as_slice().iter().map(|p| p.y).collect();
    assert_eq!(xs, vec![9, 9, 9, 9]);
    assert_eq!(ys, vec![1, 3, 5, 7]);
}

#[test]
fn lower_threshold_or_rate_never_yields_fewer_points() {
    let img = texture(64, 48);
    let count = |t: f32, s: u32| extract_points(&img, &params(t, s)).map_or(0, |p| p.len());

    let by_threshold: Vec<usize> = [400.0, 200.0, 95.0, 40.0, 0.0]
        .into_iter()
        .map(|t| count(t, 1))
        .collect();
    assert!(by_threshold.windows(2).all(|w| w[0] <= w[1]), "{by_threshold:?}");

    assert!(count(95.0, 3) <= count(95.0, 1));
}

#[test]
fn zero_threshold_keeps_every_interior_pixel() {
    let set = extract_points(&texture(10, 6), &params(0.0, 1)).unwrap();
    assert_eq!(set.len(), 8 * 4);
}

#[test]
fn large_images_are_downscaled_small_ones_kept() {
    let big = texture(1040, 260);
    let gray = downscaled_luma(&big, 520);
    assert_eq!(gray.dimensions(), (520, 130));

    let small = texture(30, 20);
    assert_eq!(downscaled_luma(&small, 520).dimensions(), (30, 20));

    let sliver = texture(2000, 1);
    assert_eq!(downscaled_luma(&sliver, 100).dimensions(), (100, 1));
}

#[test]
fn solid_image_is_an_empty_result_naming_params() {
    let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(64, 64, image::Rgb([90, 90, 90])));
    let err = extract_points(&img, &ExtractParams::default()).unwrap_err();
    match &err {
        WovenError::EmptyResult { stage, msg } => {
            assert_eq!(*stage, Stage::Extract);
            assert!(msg.contains("threshold 95"));
            assert!(msg.contains("max_dim=520"));
            assert!(msg.contains("sample_rate=2"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn images_without_interior_are_empty() {
    let err = extract_points(&step_edge(2, 2, 1), &params(0.0, 1)).unwrap_err();
    assert!(matches!(err, WovenError::EmptyResult { .. }));
}

#[test]
fn invalid_params_are_config_errors() {
    let img = step_edge(20, 10, 10);
    for bad in [
        ExtractParams { max_dim: 0, ..ExtractParams::default() },
        ExtractParams { sample_rate: 0, ..ExtractParams::default() },
        ExtractParams { threshold: -1.0, ..ExtractParams::default() },
        ExtractParams { threshold: f32::NAN, ..ExtractParams::default() },
        ExtractParams { max_points: 0, ..ExtractParams::default() },
    ] {
        let err = extract_points(&img, &bad).unwrap_err();
        assert!(matches!(err, WovenError::Config { .. }), "{bad:?}: {err}");
    }
}

#[test]
fn unreadable_images_name_the_path() {
    let dir = std::path::PathBuf::from("target").join("wovenglow-unit").join("edges");
    std::fs::create_dir_all(&dir).unwrap();

    let missing = dir.join("does-not-exist.png");
    let err = load_image(&missing).unwrap_err();
    assert!(matches!(err, WovenError::Input { stage: Stage::Extract, .. }));
    assert!(err.to_string().contains("does-not-exist.png"));

    let garbage = dir.join("garbage.png");
    std::fs::write(&garbage, b"definitely not an image").unwrap();
    let err = extract_points_from_path(&garbage, &ExtractParams::default()).unwrap_err();
    assert!(matches!(err, WovenError::Input { .. }));
    assert!(err.to_string().contains("garbage.png"));
}

#[test]
fn extraction_is_repeatable() {
    let img = texture(80, 60);
    let a = extract_points(&img, &params(60.0, 1)).unwrap();
    let b = extract_points(&img, &params(60.0, 1)).unwrap();
    assert_eq!(a, b);
}
