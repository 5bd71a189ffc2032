//! Filename derivation and on-disk dedup (SPEC_FULL.md §4.7, invariants I2/I4):
//! every derived filename stays path-safe and collisions are never silently
//! overwritten.

use std::path::Path;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use gatecapture::capture::{dedup_path, derive_filename};
use proptest::prelude::*;

#[test]
fn dedup_path_suffixes_on_collision() {
    let tmp = TempDir::new().expect("tempdir");
    tmp.child("report.pdf").touch().expect("touch existing file");

    let first = dedup_path(tmp.path(), "report.pdf");
    assert_eq!(first, tmp.path().join("report_1.pdf"));

    std::fs::write(&first, b"x").expect("write collision file");
    let second = dedup_path(tmp.path(), "report.pdf");
    assert_eq!(second, tmp.path().join("report_2.pdf"));
}

#[test]
fn dedup_path_passes_through_when_free() {
    let tmp = TempDir::new().expect("tempdir");
    let path = dedup_path(tmp.path(), "fresh.png");
    assert_eq!(path, tmp.path().join("fresh.png"));
}

#[test]
fn derive_filename_is_stable_for_same_inputs() {
    let a = derive_filename("https://example.com/a/b.png?x=1", "image/png", None, "salt");
    let b = derive_filename("https://example.com/a/b.png?x=1", "image/png", None, "salt");
    assert_eq!(a, b, "same url/content-type/salt must hash to the same filename");
}

#[test]
fn derive_filename_differs_across_salts() {
    let a = derive_filename("https://example.com/a.bin", "application/octet-stream", None, "page_one");
    let b = derive_filename("https://example.com/a.bin", "application/octet-stream", None, "page_two");
    assert_ne!(a, b, "salting by page keeps identical-URL assets from colliding across sessions");
}

proptest! {
    #[test]
    fn derive_filename_never_exceeds_path_budget(
        path_seg in "[a-zA-Z0-9/_.-]{0,400}",
        content_type in prop::sample::select(vec![
            "text/html", "image/png", "application/javascript", "application/octet-stream",
        ]),
    ) {
        let url = format!("https://example.com/{path_seg}");
        let name = derive_filename(&url, content_type, None, "s");
        prop_assert!(name.len() <= 255, "derived filename exceeded filesystem path budget: {}", name);
        prop_assert!(!name.is_empty());
        prop_assert!(Path::new(&name).file_name().is_some());
    }
}
