use image::{Rgba, RgbaImage};
use std::path::PathBuf;
use tile_pyramid_core::prelude::*;
use tile_pyramid_core::slice_depth;

/// 32x32 image where every 8x8 cell has its own colour.
fn checker() -> RgbaImage {
    RgbaImage::from_fn(32, 32, |x, y| {
        Rgba([(x / 8 * 60) as u8, (y / 8 * 60) as u8, 128, 255])
    })
}

fn config() -> PyramidConfig {
    PyramidConfig::builder().tile_size(8).build()
}

#[test]
fn slice_depth_requires_power_of_two_ratio() {
    assert_eq!(slice_depth(16, 8).expect("depth"), 1);
    assert_eq!(slice_depth(32, 8).expect("depth"), 2);
    assert_eq!(slice_depth(1024, 256).expect("depth"), 2);
    for (side, tile) in [(8, 8), (24, 8), (30, 8), (4, 8)] {
        assert!(matches!(
            slice_depth(side, tile),
            Err(PyramidError::InvalidDimensions { .. })
        ));
    }
}

#[test]
fn slicing_writes_every_grid_tile() {
    let out = tempfile::tempdir().expect("tempdir");
    let img = checker();
    let (report, tiles) = slice_image(&img, &config(), out.path()).expect("slice");

    assert_eq!(report.depth, 2);
    assert_eq!(report.tiles, 16);
    assert_eq!(report.source_side, 32);
    assert_eq!(tiles.len(), 16);

    for (path, file) in &tiles {
        assert_eq!(file, &out.path().join(path.to_relative_path(Some("png"))));
        let tile = image::open(file).expect("open").to_rgba8();
        assert_eq!(tile.dimensions(), (8, 8));
        let r = path.region(32);
        assert_eq!(tile.get_pixel(0, 0), img.get_pixel(r.x, r.y));
        assert_eq!(tile.get_pixel(7, 7), img.get_pixel(r.x + 7, r.y + 7));
    }

    // "2/3": top-right quadrant, then its bottom-left cell
    let tile = image::open(out.path().join("2").join("3.png"))
        .expect("open")
        .to_rgba8();
    assert_eq!(tile.get_pixel(0, 0), img.get_pixel(16, 8));
}

#[test]
fn non_square_image_is_rejected() {
    let out = tempfile::tempdir().expect("tempdir");
    let img = RgbaImage::new(32, 16);
    assert!(matches!(
        slice_image(&img, &config(), out.path()),
        Err(PyramidError::NotSquare {
            width: 32,
            height: 16
        })
    ));
}

#[test]
fn side_not_a_power_of_two_multiple_is_rejected() {
    let out = tempfile::tempdir().expect("tempdir");
    let img = RgbaImage::new(24, 24);
    assert!(matches!(
        slice_image(&img, &config(), out.path()),
        Err(PyramidError::InvalidDimensions {
            side: 24,
            tile_size: 8
        })
    ));
}

#[test]
fn sliced_tiles_reduce_back_to_a_base() {
    let sliced = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");
    let img = RgbaImage::from_pixel(32, 32, Rgba([40, 80, 120, 255]));
    let cfg = config();
    let (_, tiles) = slice_image(&img, &cfg, sliced.path()).expect("slice");

    let tree: QuadTree<PathBuf> = QuadTree::new();
    for (path, file) in tiles {
        assert!(tree.insert(&path, file).expect("insert"));
    }
    let pyramid = Pyramid::new(cfg).expect("config");
    let (levels, base) = pyramid.finish(&tree, out.path()).expect("finish");

    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0].groups, 4);
    let base = image::open(base).expect("open").to_rgba8();
    assert!(base.pixels().all(|p| p.0 == [40, 80, 120, 255]));
}
