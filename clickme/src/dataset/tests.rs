//! Tests for CSV loading and grouping.

use super::*;

const CSV: &str = "\
image_path,clicks,user_id
CO3D_ClickMe2/chair/378/00018.png,\"{(10,10),(11,11)}\",7
CO3D_ClickMe2/laptop/606/00006.png,\"{(1,2),(3,4),(5,6)}\",7
CO3D_ClickMe2/chair/378/00018.png,{},8
";

#[test]
fn test_read_rows_ignores_extra_columns() {
    let rows = read_rows(CSV.as_bytes()).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].image_path, "CO3D_ClickMe2/chair/378/00018.png");
    assert_eq!(rows[0].clicks, "{(10,10),(11,11)}");
    assert_eq!(rows[2].clicks, "{}");
}

#[test]
fn test_read_rows_missing_column_fails() {
    let err = read_rows("image_path\nfoo.png\n".as_bytes()).unwrap_err();
    assert!(matches!(err, DatasetError::Csv(_)));
}

#[test]
fn test_group_by_image_preserves_first_seen_order() {
    let rows = read_rows(CSV.as_bytes()).unwrap();
    let images = group_by_image(rows, Some("CO3D_ClickMe2/"));
    assert_eq!(images.len(), 2);
    assert_eq!(images[0].key, "chair/378/00018.png");
    assert_eq!(images[0].clicks, vec!["{(10,10),(11,11)}", "{}"]);
    assert_eq!(images[1].key, "laptop/606/00006.png");
}

#[test]
fn test_group_without_prefix_keeps_path() {
    let rows = vec![ClickRow {
        image_path: "a/b.png".to_string(),
        clicks: "{}".to_string(),
    }];
    assert_eq!(group_by_image(rows, None)[0].key, "a/b.png");
}

#[test]
fn test_category_of() {
    assert_eq!(category_of("chair/378/00018.png"), "chair");
    assert_eq!(category_of("flat.png"), "flat.png");
}

#[test]
fn test_read_missing_csv_reports_path() {
    let err = read_csv(Path::new("/no/such/clicks.csv")).unwrap_err();
    assert!(err.to_string().contains("/no/such/clicks.csv"));
}
