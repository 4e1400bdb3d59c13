//! Full pipeline from CSV text to a written report.

use std::fmt::Write;

use clickme::{group_by_image, read_rows, AgreementMode, CeilingConfig, CeilingRunner, ImageShape};
use common::file_format::write_file;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const PREFIX: &str = "CO3D_ClickMe2/";

/// (image, blob center) pairs; chairs sit top-left, laptops bottom-right.
const IMAGES: &[(&str, (i32, i32))] = &[
    ("chair/1/0001.png", (12, 12)),
    ("chair/2/0001.png", (14, 12)),
    ("chair/3/0001.png", (12, 15)),
    ("laptop/1/0001.png", (48, 50)),
    ("laptop/2/0001.png", (50, 48)),
    ("laptop/3/0001.png", (49, 49)),
];

fn synthetic_csv(subjects: usize, seed: u64) -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut csv = String::from("user_id,image_path,clicks\n");
    for user in 0..subjects {
        for (image, (cx, cy)) in IMAGES {
            let clicks = rng.random_range(8..=12);
            let tuples: Vec<String> = (0..clicks)
                .map(|_| {
                    format!(
                        "({},{})",
                        cx + rng.random_range(-4..=4),
                        cy + rng.random_range(-4..=4)
                    )
                })
                .collect();
            writeln!(csv, "{},{}{},\"{{{}}}\"", user, PREFIX, image, tuples.join(",")).unwrap();
        }
    }
    // Rows that must be rejected without aborting the run.
    writeln!(csv, "99,{}chair/1/0001.png,{{}}", PREFIX).unwrap();
    writeln!(csv, "99,{}laptop/1/0001.png,\"{{(1,x),(2,2)}}\"", PREFIX).unwrap();
    csv
}

fn config() -> CeilingConfig {
    CeilingConfig {
        blur_size: 7,
        min_clicks: 5,
        max_clicks: 20,
        min_pixels: Some(10),
        min_subjects: 3,
        image_shape: ImageShape::new(64, 64),
        center_crop: Some(ImageShape::new(60, 60)),
        null_iterations: 5,
        metric: "spearman".to_string(),
        seed: 7,
        ..CeilingConfig::default()
    }
}

#[test]
fn test_pipeline_from_csv() {
    let rows = read_rows(synthetic_csv(5, 1).as_bytes()).unwrap();
    let images = group_by_image(rows, Some(PREFIX));
    assert_eq!(images.len(), IMAGES.len());
    assert_eq!(images[0].key, "chair/1/0001.png");

    let report = CeilingRunner::run(config(), images).unwrap();

    assert_eq!(report.summary.images_scored, 6);
    assert_eq!(report.diagnostics.empty_trials, 1);
    assert_eq!(report.diagnostics.malformed_trials, 1);
    assert!(report.diagnostics.excluded.is_empty());
    assert_eq!(
        report.category_correlations.keys().collect::<Vec<_>>(),
        vec!["chair", "laptop"]
    );
    assert_eq!(report.null_correlations.len(), 5);

    // Subjects agree on their own image far more than across categories.
    assert!(report.summary.mean_ceiling_full > report.summary.mean_null_full);
    assert!(report.summary.mean_ceiling_full > 0.0);

    let percentile = report.click_percentiles.all;
    assert!((8.0..=12.0).contains(&percentile));
}

#[test]
fn test_auc_split_half_report_is_written() {
    let rows = read_rows(synthetic_csv(6, 2).as_bytes()).unwrap();
    let images = group_by_image(rows, Some(PREFIX));
    let config = CeilingConfig {
        metric: "auc".to_string(),
        mode: AgreementMode::SplitHalf,
        n_splits: 10,
        ..config()
    };

    let report = CeilingRunner::run(config, images).unwrap();
    for scores in report.subject_correlations.values() {
        assert_eq!(scores.len(), 10);
        assert!(scores.iter().all(|s| s.is_nan() || (0.0..=1.0).contains(s)));
    }

    let path = std::env::temp_dir().join(format!("clickme_report_{}.json", std::process::id()));
    write_file(&report, &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["metric"], "auc");
    assert_eq!(json["mode"], "split_half");
    assert!(json["final_clickmaps"]["chair/1/0001.png"].is_array());
    assert!(json["summary"]["mean_ceiling_full"].is_number());
}
