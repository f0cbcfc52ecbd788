//! Fixture setup shared by the integration tests.

use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Copy `fixtures/` and `schemas/` into a temp dir and generate the logos.
///
/// `filament_shop` gets a 300x200 logo, which the logo validator rejects.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    copy_dir(&root.join("fixtures"), tmp.path());
    copy_dir(&root.join("schemas"), &tmp.path().join("schemas"));

    write_png(&tmp.path().join("data/Prusament/logo.png"), 200, 200);
    write_png(&tmp.path().join("stores/prusa_store/logo.png"), 200, 200);
    write_png(&tmp.path().join("stores/filament_shop/logo.png"), 300, 200);
    tmp
}

fn copy_dir(src: &Path, dst: &Path) {
    fs::create_dir_all(dst).unwrap();
    for entry in fs::read_dir(src).unwrap() {
        let entry = entry.unwrap();
        let target = dst.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), target).unwrap();
        }
    }
}

fn write_png(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbImage::from_pixel(width, height, image::Rgb([255, 102, 0]))
        .save(path)
        .unwrap();
}
