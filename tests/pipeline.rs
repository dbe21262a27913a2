use std::path::{Path, PathBuf};

use garmentprep::{
    InputImage, PipelineParams, Role, SegmentationSource, SessionStore, build_segmenter,
    process_batch, process_paths_to_dir, process_session,
};
use image::{Rgba, RgbaImage};

/// 300x400 opaque photo: red garment on a light backdrop.
fn shirt_photo() -> RgbaImage {
    RgbaImage::from_fn(300, 400, |x, y| {
        if (75..225).contains(&x) && (100..300).contains(&y) {
            Rgba([190, 25, 35, 255])
        } else {
            Rgba([246, 244, 240, 255])
        }
    })
}

fn write_inputs(dir: &Path) -> Vec<PathBuf> {
    ["shirt_front.png", "shirt_back.png"]
        .iter()
        .map(|name| {
            let path = dir.join(name);
            shirt_photo().save(&path).unwrap();
            path
        })
        .collect()
}

fn assert_standardized(img: &RgbaImage) {
    assert_eq!(img.dimensions(), (1024, 1024));

    for i in 0..1024 {
        assert_eq!(img.get_pixel(i, 0)[3], 0, "top border at x={i}");
        assert_eq!(img.get_pixel(i, 1023)[3], 0, "bottom border at x={i}");
        assert_eq!(img.get_pixel(0, i)[3], 0, "left border at y={i}");
        assert_eq!(img.get_pixel(1023, i)[3], 0, "right border at y={i}");
    }

    // Garment lands around x 327..697, y 266..758 of the output
    let center = img.get_pixel(512, 512);
    assert!(center[3] >= 250, "center alpha {}", center[3]);
    assert!(center[0] > 150 && center[1] < 80, "center colour {:?}", center);

    for (x, y, p) in img.enumerate_pixels() {
        if p[3] > 0 {
            assert!(
                (315..710).contains(&x) && (255..770).contains(&y),
                "opaque pixel outside the garment region at ({x}, {y})"
            );
        }
    }
}

#[test]
fn local_fallback_produces_standardized_outputs() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let inputs = write_inputs(src.path());

    let params = PipelineParams::default();
    assert!(!params.remote.has_credential());
    let segmenter = build_segmenter(&params).unwrap();

    let report = process_paths_to_dir(&inputs, out.path(), &segmenter, &params).unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.errors, 0);
    let roles: Vec<Role> = report.results.iter().map(|r| r.role).collect();
    assert_eq!(roles, vec![Role::Front, Role::Back]);

    for name in ["front.png", "back.png"] {
        let decoded = image::open(out.path().join(name)).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgba8);
        assert_standardized(&decoded.to_rgba8());
    }
}

#[test]
fn batch_reports_local_segmentation() {
    let params = PipelineParams::default();
    let segmenter = build_segmenter(&params).unwrap();
    let mut bytes = Vec::new();
    shirt_photo()
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();

    let inputs = vec![
        InputImage::new("shirt_front.png", bytes.clone()),
        InputImage::new("shirt_side.png", bytes),
    ];
    let results = process_batch(&inputs, &segmenter, &params).unwrap();
    for result in results {
        let processed = result.unwrap();
        assert_eq!(processed.source, SegmentationSource::Local);
        assert_standardized(&processed.image);
    }
}

#[test]
fn session_mode_persists_results_and_manifest() {
    let data = tempfile::tempdir().unwrap();
    let src = tempfile::tempdir().unwrap();
    let uploads: Vec<InputImage> = write_inputs(src.path())
        .iter()
        .map(|p| InputImage::from_path(p).unwrap())
        .collect();

    let params = PipelineParams::default();
    let segmenter = build_segmenter(&params).unwrap();
    let store = SessionStore::new(data.path());
    let report = process_session(&store, &uploads, &segmenter, &params).unwrap();

    assert_eq!(report.processed, 2);
    assert!(report.failures.is_empty());
    let listed = store.list_processed(&report.session_id).unwrap();
    let files: Vec<_> = listed.iter().map(|r| r.result.filename.as_str()).collect();
    assert_eq!(files, vec!["back.png", "front.png"]);
    assert!(listed.iter().all(|r| r.result.width == 1024 && r.result.height == 1024));

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report.manifest).unwrap()).unwrap();
    assert_eq!(manifest["results"].as_array().unwrap().len(), 2);
}

#[test]
fn uniform_photo_keeps_the_whole_frame() {
    let params = PipelineParams::default();
    let segmenter = build_segmenter(&params).unwrap();
    let mut bytes = Vec::new();
    RgbaImage::from_pixel(300, 400, Rgba([255, 0, 0, 255]))
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();

    let results = process_batch(&[InputImage::new("plain_front.png", bytes)], &segmenter, &params)
        .unwrap();
    let processed = results.into_iter().next().unwrap().unwrap();
    assert_eq!(processed.source, SegmentationSource::Passthrough);

    let img = &processed.image;
    assert_eq!(img.dimensions(), (1024, 1024));
    // 300x400 on a 400 square plus an 8 px border, scaled by 1024 / 416:
    // the frame spans roughly x 143..881, y 20..1004
    for (x, y) in [(512, 512), (160, 512), (865, 512), (512, 35), (512, 990)] {
        let p = img.get_pixel(x, y);
        assert!(p[3] >= 250 && p[0] > 240, "({x}, {y}) = {:?}", p);
    }
    for (x, y) in [(0, 0), (1023, 1023), (120, 512), (905, 512), (512, 5), (512, 1018)] {
        assert_eq!(img.get_pixel(x, y)[3], 0, "({x}, {y}) should be transparent");
    }
}
