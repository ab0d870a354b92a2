use std::collections::HashSet;
use std::path::PathBuf;
use tile_pyramid_core::prelude::*;

#[test]
fn index_sector_round_trip() {
    for i in 1..=4u8 {
        let sector = Sector::from_index(i).expect("valid index");
        assert_eq!(sector.index(), i);
    }
    assert_eq!(Sector::from_index(0), None);
    assert_eq!(Sector::from_index(5), None);
}

#[test]
fn sector_order_and_deltas() {
    assert_eq!(Sector::from_index(1), Some(Sector::TopLeft));
    assert_eq!(Sector::from_index(2), Some(Sector::TopRight));
    assert_eq!(Sector::from_index(3), Some(Sector::BottomLeft));
    assert_eq!(Sector::from_index(4), Some(Sector::BottomRight));

    assert_eq!(Sector::TopLeft.delta(), (-1, -1));
    assert_eq!(Sector::TopRight.delta(), (1, -1));
    assert_eq!(Sector::BottomLeft.delta(), (-1, 1));
    assert_eq!(Sector::BottomRight.delta(), (1, 1));
}

#[test]
fn pixel_offsets_follow_delta_signs() {
    assert_eq!(Sector::TopLeft.pixel_offset(128), (0, 0));
    assert_eq!(Sector::TopRight.pixel_offset(128), (128, 0));
    assert_eq!(Sector::BottomLeft.pixel_offset(128), (0, 128));
    assert_eq!(Sector::BottomRight.pixel_offset(128), (128, 128));
}

#[test]
fn all_possible_paths_depth_two() {
    let paths = all_possible_paths(2);
    assert_eq!(paths.len(), 16);
    let unique: HashSet<_> = paths.iter().cloned().collect();
    assert_eq!(unique.len(), 16);
    for p in &paths {
        assert_eq!(p.len(), 2);
    }
    let mut combos: Vec<Vec<u8>> = paths.iter().map(|p| p.indices()).collect();
    combos.sort();
    let mut expected = Vec::new();
    for a in 1..=4u8 {
        for b in 1..=4u8 {
            expected.push(vec![a, b]);
        }
    }
    assert_eq!(combos, expected);
    // already lexicographic
    assert_eq!(paths[0].indices(), vec![1, 1]);
    assert_eq!(paths[15].indices(), vec![4, 4]);
}

#[test]
fn all_possible_paths_small_depths() {
    assert_eq!(all_possible_paths(0), vec![QuadPath::root()]);
    assert_eq!(all_possible_paths(1).len(), 4);
    assert_eq!(all_possible_paths(3).len(), 64);
}

#[test]
fn directory_path_formatting() {
    let p = QuadPath::from_indices(&[1, 4, 2]).expect("path");
    assert_eq!(p.to_directory_path("", ""), "1/4/2");
    assert_eq!(p.to_directory_path("", ".png"), "1/4/2.png");
    assert_eq!(p.to_directory_path("tiles/", ".png"), "tiles/1/4/2.png");
    assert_eq!(p.to_string(), "1/4/2");
    assert_eq!(QuadPath::root().to_string(), "<root>");

    let file: PathBuf = ["1", "4", "2.png"].iter().collect();
    assert_eq!(p.to_relative_path(Some("png")), file);
    let dir: PathBuf = ["1", "4", "2"].iter().collect();
    assert_eq!(p.to_relative_path(None), dir);
}

#[test]
fn parse_and_navigate() {
    let p: QuadPath = "3/1/2".parse().expect("parse");
    assert_eq!(p.indices(), vec![3, 1, 2]);
    assert_eq!(p.last(), Some(Sector::TopRight));
    let parent = p.parent().expect("parent");
    assert_eq!(parent.indices(), vec![3, 1]);
    assert_eq!(parent.child(Sector::TopRight), p);
    assert_eq!(QuadPath::root().parent(), None);

    assert!("1/5".parse::<QuadPath>().is_err());
    assert!("1/x".parse::<QuadPath>().is_err());
    assert_eq!("".parse::<QuadPath>().expect("root"), QuadPath::root());
    assert!(matches!(
        QuadPath::from_indices(&[0]),
        Err(PyramidError::InvalidPath(_))
    ));
}

#[test]
fn child_does_not_mutate_parent() {
    let base = QuadPath::from_indices(&[2]).expect("path");
    let a = base.child(Sector::TopLeft);
    let b = base.child(Sector::BottomRight);
    assert_eq!(base.len(), 1);
    assert_eq!(a.indices(), vec![2, 1]);
    assert_eq!(b.indices(), vec![2, 4]);
}

#[test]
fn regions_partition_the_image() {
    let side = 32;
    assert_eq!(QuadPath::root().region(side), Rect::new(0, 0, 32, 32));

    let tr: QuadPath = "2".parse().expect("path");
    assert_eq!(tr.region(side), Rect::new(16, 0, 16, 16));

    let tr_bl: QuadPath = "2/3".parse().expect("path");
    assert_eq!(tr_bl.region(side), Rect::new(16, 8, 8, 8));

    // every depth-2 region is distinct and inside the image
    let bounds = Rect::new(0, 0, side, side);
    let regions: HashSet<(u32, u32)> = all_possible_paths(2)
        .iter()
        .map(|p| {
            let r = p.region(side);
            assert!(bounds.contains(&r));
            assert_eq!((r.w, r.h), (8, 8));
            (r.x, r.y)
        })
        .collect();
    assert_eq!(regions.len(), 16);
}
