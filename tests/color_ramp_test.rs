mod common;

use habitat_etl::core::color_ramp::{ColorRampJob, ColorRampSettings};
use habitat_etl::{EtlEngine, LocalStorage};
use tempfile::TempDir;

#[tokio::test]
async fn test_ramp_tree_then_upload() {
    let geo = TempDir::new().unwrap();
    let input_dir = geo.path().join("suitability_tiles_clip");
    let output_dir = geo.path().join("suitability_tiles_clip_rgb");

    common::write_gradient_png(&input_dir.join("7/35/48.png"), 5, 80);
    common::write_gradient_png(&input_dir.join("7/35/49.png"), 2, 0);
    std::fs::write(input_dir.join("7/35/50.png"), b"truncated").unwrap();
    std::fs::write(input_dir.join("openlayers.html"), b"<html/>").unwrap();

    let buckets = TempDir::new().unwrap();
    let job = ColorRampJob::new(
        LocalStorage::new(buckets.path(), "grousemapper"),
        ColorRampSettings {
            input_dir: input_dir.clone(),
            output_dir: output_dir.clone(),
            remote_dir: "suitability_tiles_clip_rgb/".to_string(),
        },
    );

    let report = EtlEngine::new(job).run().await.unwrap();
    assert_eq!(report.items_processed, 2);
    assert_eq!(report.items_skipped, 1);
    assert_eq!(report.objects_uploaded, 2);

    let rgb = image::open(output_dir.join("7/35/48.png")).unwrap().to_rgb8();
    assert_eq!(rgb.dimensions(), (5, 1));
    assert_eq!(rgb.get_pixel(0, 0).0, [255, 0, 0]);
    assert_eq!(rgb.get_pixel(4, 0).0, [0, 255, 0]);
    assert_eq!(rgb.get_pixel(2, 0).0[2], 0);

    let black = image::open(output_dir.join("7/35/49.png")).unwrap().to_rgb8();
    assert!(black.pixels().all(|p| p.0 == [255, 0, 0]));

    assert_eq!(
        common::tree(&buckets.path().join("grousemapper")),
        vec!["suitability_tiles_clip_rgb/7/35/48.png", "suitability_tiles_clip_rgb/7/35/49.png"]
    );
}

#[tokio::test]
async fn test_rerun_keeps_existing_outputs() {
    let geo = TempDir::new().unwrap();
    let input_dir = geo.path().join("tiles");
    let output_dir = geo.path().join("tiles_rgb");
    common::write_gradient_png(&input_dir.join("2/1/1.png"), 3, 200);
    std::fs::create_dir_all(output_dir.join("2/1")).unwrap();
    std::fs::write(output_dir.join("2/1/1.png"), b"kept").unwrap();

    let buckets = TempDir::new().unwrap();
    let job = ColorRampJob::new(
        LocalStorage::new(buckets.path(), "grousemapper"),
        ColorRampSettings {
            input_dir,
            output_dir: output_dir.clone(),
            remote_dir: "tiles_rgb".to_string(),
        },
    );

    let report = EtlEngine::new(job).run().await.unwrap();
    assert_eq!(report.items_processed, 0);
    assert_eq!(report.items_skipped, 1);
    assert_eq!(std::fs::read(output_dir.join("2/1/1.png")).unwrap(), b"kept");
    assert_eq!(
        std::fs::read(buckets.path().join("grousemapper/tiles_rgb/2/1/1.png")).unwrap(),
        b"kept"
    );
}
