//! Tests for connected component labeling.

use std::collections::VecDeque;

use common::{BitBuffer3, Shape};

use super::*;
use crate::error::Error;

/// Build a 2-D mask from ASCII art rows, `#` is foreground.
fn mask_from_art(rows: &[&str]) -> BitBuffer3 {
    let height = rows.len();
    let width = rows[0].len();
    let shape = Shape::new_2d(width, height);
    BitBuffer3::from_fn(shape, |idx| {
        rows[idx / width].as_bytes()[idx % width] == b'#'
    })
}

/// Deterministic pseudo-random mask with the given foreground density in percent.
fn noise_mask(shape: Shape, density: u64, seed: u64) -> BitBuffer3 {
    BitBuffer3::from_fn(shape, |idx| {
        let mut x = (idx as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ seed;
        x ^= x >> 31;
        x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
        x ^= x >> 27;
        x % 100 < density
    })
}

/// Flood-fill labeling in scan order, used as ground truth.
fn reference_labels(mask: &BitBuffer3, connectivity: Connectivity) -> (Vec<u32>, usize) {
    let shape = mask.shape();
    let offsets = connectivity.offsets();
    let mut labels = vec![0u32; shape.len()];
    let mut next = 0u32;
    let mut queue = VecDeque::new();

    for seed in 0..shape.len() {
        if !mask.get(seed) || labels[seed] != 0 {
            continue;
        }
        next += 1;
        labels[seed] = next;
        queue.push_back(seed);
        while let Some(idx) = queue.pop_front() {
            let cell = shape.coords(idx);
            for o in &offsets {
                if let Some((x, y, z)) = shape.offset(cell, (o.x, o.y, o.z)) {
                    let n = shape.index(x, y, z);
                    if mask.get(n) && labels[n] == 0 {
                        labels[n] = next;
                        queue.push_back(n);
                    }
                }
            }
        }
    }
    (labels, next as usize)
}

// ============================================================================
// Run extraction
// ============================================================================

fn runs_of(bits: &[bool]) -> Vec<(u32, u32)> {
    let mask = BitBuffer3::from_slice(Shape::new_2d(bits.len(), 1), bits);
    let mut runs = Vec::new();
    extract_runs_from_row(mask.row_words(0), bits.len(), &mut runs);
    runs.iter().map(|r| (r.start, r.end)).collect()
}

#[test]
fn test_extract_runs_simple() {
    let bits: Vec<bool> = "..##.#...###".chars().map(|c| c == '#').collect();
    assert_eq!(runs_of(&bits), vec![(2, 4), (5, 6), (9, 12)]);
}

#[test]
fn test_extract_runs_empty_and_full() {
    assert!(runs_of(&[false; 100]).is_empty());
    assert_eq!(runs_of(&[true; 100]), vec![(0, 100)]);
    assert_eq!(runs_of(&[true; 128]), vec![(0, 128)]);
}

#[test]
fn test_extract_runs_across_word_boundary() {
    let mut bits = vec![false; 200];
    for b in bits.iter_mut().take(70).skip(60) {
        *b = true;
    }
    for b in bits.iter_mut().take(200).skip(127) {
        *b = true;
    }
    assert_eq!(runs_of(&bits), vec![(60, 70), (127, 200)]);
}

#[test]
fn test_extract_runs_ends_on_word_boundary() {
    let mut bits = vec![false; 130];
    for b in bits.iter_mut().take(64).skip(10) {
        *b = true;
    }
    bits[129] = true;
    assert_eq!(runs_of(&bits), vec![(10, 64), (129, 130)]);
}

// ============================================================================
// 2-D labeling
// ============================================================================

#[test]
fn test_diagonal_cells_four_vs_eight() {
    // 5x5 grid, two cells touching at a corner:
    // . . . . .
    // . # . . .
    // . . # . .
    // . . . . .
    // . . . . .
    let mask = mask_from_art(&[".....", ".#...", "..#..", ".....", "....."]);

    let four = LabelMap::from_mask(&mask, Connectivity::Four);
    assert_eq!(four.num_labels(), 2);
    assert_eq!(four.label_at(1, 1, 0), 1);
    assert_eq!(four.label_at(2, 2, 0), 2);

    let eight = LabelMap::from_mask(&mask, Connectivity::Eight);
    assert_eq!(eight.num_labels(), 1);
    assert_eq!(eight.label_at(1, 1, 0), 1);
    assert_eq!(eight.label_at(2, 2, 0), 1);
}

#[test]
fn test_background_is_never_labeled() {
    let mask = mask_from_art(&["#..#", ".##.", "#..#"]);
    let labels = LabelMap::from_mask(&mask, Connectivity::Four);
    for idx in 0..mask.len() {
        assert_eq!(labels[idx] == 0, !mask.get(idx), "cell {idx}");
    }
    assert_eq!(labels.cell_count(), 6);
}

#[test]
fn test_u_shape_merges_late() {
    // Both arms start as separate runs and join on the last row:
    // # . . #
    // # . . #
    // # # # #
    let mask = mask_from_art(&["#..#", "#..#", "####"]);
    let labels = LabelMap::from_mask(&mask, Connectivity::Four);
    assert_eq!(labels.num_labels(), 1);
    assert!(labels.labels().iter().all(|&l| l == 0 || l == 1));
}

#[test]
fn test_labels_follow_seed_visit_order() {
    // . . # . # #
    // # . # . . .
    // # . . . # .
    // Seeds in scan order: (2,0), (4,0), (0,1), (4,2)
    let mask = mask_from_art(&["..#.##", "#.#...", "#...#."]);
    let labels = LabelMap::from_mask(&mask, Connectivity::Four);
    assert_eq!(labels.num_labels(), 4);
    assert_eq!(labels.label_at(2, 0, 0), 1);
    assert_eq!(labels.label_at(2, 1, 0), 1);
    assert_eq!(labels.label_at(4, 0, 0), 2);
    assert_eq!(labels.label_at(5, 0, 0), 2);
    assert_eq!(labels.label_at(0, 1, 0), 3);
    assert_eq!(labels.label_at(0, 2, 0), 3);
    assert_eq!(labels.label_at(4, 2, 0), 4);
}

#[test]
fn test_seed_order_when_later_run_is_absorbed() {
    // The run at (2,1) gets its own provisional label and is only joined
    // to the component seeded at (4,0) on the last row.
    // . . . . #
    // # . # . #
    // # . # # #
    let mask = mask_from_art(&["....#", "#.#.#", "#.###"]);
    let labels = LabelMap::from_mask(&mask, Connectivity::Four);
    assert_eq!(labels.num_labels(), 2);
    assert_eq!(labels.label_at(4, 0, 0), 1);
    assert_eq!(labels.label_at(2, 1, 0), 1);
    assert_eq!(labels.label_at(0, 1, 0), 2);
    assert_eq!(labels.label_at(0, 2, 0), 2);
}

#[test]
fn test_component_sizes() {
    let mask = mask_from_art(&["##..#", "#...#", "....#"]);
    let labels = LabelMap::from_mask(&mask, Connectivity::Four);
    assert_eq!(labels.component_sizes(), vec![0, 3, 3]);
}

#[test]
fn test_empty_and_full_masks() {
    let shape = Shape::new_2d(17, 9);
    let empty = LabelMap::from_mask(&BitBuffer3::new_default(shape), Connectivity::Eight);
    assert_eq!(empty.num_labels(), 0);
    assert!(empty.labels().iter().all(|&l| l == 0));

    let full = LabelMap::from_mask(&BitBuffer3::new_filled(shape, true), Connectivity::Four);
    assert_eq!(full.num_labels(), 1);
    assert!(full.labels().iter().all(|&l| l == 1));
}

#[test]
fn test_zero_sized_mask() {
    let labels = LabelMap::from_mask(
        &BitBuffer3::new_default(Shape::new_2d(0, 5)),
        Connectivity::Four,
    );
    assert_eq!(labels.num_labels(), 0);
    assert!(labels.labels().is_empty());
}

#[test]
fn test_matches_flood_fill_2d() {
    for (seed, density) in [(1, 20), (2, 45), (3, 60), (4, 80)] {
        let mask = noise_mask(Shape::new_2d(71, 43), density, seed);
        for connectivity in [Connectivity::Four, Connectivity::Eight] {
            let labels = LabelMap::from_mask(&mask, connectivity);
            let (expected, count) = reference_labels(&mask, connectivity);
            assert_eq!(labels.num_labels(), count, "{connectivity} seed {seed}");
            assert_eq!(labels.labels(), expected.as_slice(), "{connectivity} seed {seed}");
        }
    }
}

// ============================================================================
// 3-D labeling
// ============================================================================

#[test]
fn test_3d_connectivity_orders() {
    // Voxels touching by a face, an edge and a corner respectively.
    let shape = Shape::new(3, 3, 3);
    let mut mask = BitBuffer3::new_default(shape);
    mask.set_xyz(0, 0, 0, true);
    mask.set_xyz(0, 0, 1, true); // face neighbour of (0,0,0)
    mask.set_xyz(1, 1, 1, true); // edge neighbour of (0,0,1)
    mask.set_xyz(2, 2, 2, true); // corner neighbour of (1,1,1)

    assert_eq!(LabelMap::from_mask(&mask, Connectivity::Six).num_labels(), 3);
    assert_eq!(LabelMap::from_mask(&mask, Connectivity::Eighteen).num_labels(), 2);
    assert_eq!(LabelMap::from_mask(&mask, Connectivity::TwentySix).num_labels(), 1);
}

#[test]
fn test_stacked_planes_join_through_z() {
    // Two separate blobs in plane 0 bridged by a column in plane 1.
    let shape = Shape::new(5, 1, 2);
    let mut mask = BitBuffer3::new_default(shape);
    mask.set_xyz(0, 0, 0, true);
    mask.set_xyz(4, 0, 0, true);
    for x in 0..5 {
        mask.set_xyz(x, 0, 1, true);
    }
    let labels = LabelMap::from_mask(&mask, Connectivity::Six);
    assert_eq!(labels.num_labels(), 1);
}

#[test]
fn test_matches_flood_fill_3d() {
    for (seed, density) in [(5, 15), (6, 30), (7, 50)] {
        let mask = noise_mask(Shape::new(13, 11, 9), density, seed);
        for connectivity in [
            Connectivity::Six,
            Connectivity::Eighteen,
            Connectivity::TwentySix,
        ] {
            let labels = LabelMap::from_mask(&mask, connectivity);
            let (expected, count) = reference_labels(&mask, connectivity);
            assert_eq!(labels.num_labels(), count, "{connectivity} seed {seed}");
            assert_eq!(labels.labels(), expected.as_slice(), "{connectivity} seed {seed}");
        }
    }
}

// ============================================================================
// Strips and determinism
// ============================================================================

#[test]
fn test_strip_count_does_not_change_labels_2d() {
    let mask = noise_mask(Shape::new_2d(97, 131), 55, 11);
    for connectivity in [Connectivity::Four, Connectivity::Eight] {
        let (sequential, count) = label_mask_sequential(&mask, connectivity);
        for num_strips in [2, 3, 7, 16, 131, 500] {
            let (striped, striped_count) = label_mask_strips(&mask, connectivity, num_strips);
            assert_eq!(striped_count, count, "{connectivity}, {num_strips} strips");
            assert_eq!(striped, sequential, "{connectivity}, {num_strips} strips");
        }
    }
}

#[test]
fn test_strip_count_does_not_change_labels_3d() {
    let mask = noise_mask(Shape::new(23, 17, 12), 35, 12);
    for connectivity in [
        Connectivity::Six,
        Connectivity::Eighteen,
        Connectivity::TwentySix,
    ] {
        let (sequential, count) = label_mask_sequential(&mask, connectivity);
        for num_strips in [2, 3, 5, 12] {
            let (striped, striped_count) = label_mask_strips(&mask, connectivity, num_strips);
            assert_eq!(striped_count, count, "{connectivity}, {num_strips} strips");
            assert_eq!(striped, sequential, "{connectivity}, {num_strips} strips");
        }
    }
}

#[test]
fn test_component_spanning_every_strip() {
    // A single vertical line crosses every strip boundary.
    let shape = Shape::new_2d(8, 200);
    let mask = BitBuffer3::from_fn(shape, |idx| idx % 8 == 3);
    let (labels, count) = label_mask_strips(&mask, Connectivity::Four, 9);
    assert_eq!(count, 1);
    assert!(labels
        .iter()
        .enumerate()
        .all(|(i, &l)| l == u32::from(i % 8 == 3)));
}

#[test]
fn test_parallel_path_matches_sequential() {
    // Large enough to take the parallel path through from_mask.
    let mask = noise_mask(Shape::new_2d(400, 300), 50, 21);
    let labels = LabelMap::from_mask(&mask, Connectivity::Eight);
    let (sequential, count) = label_mask_sequential(&mask, Connectivity::Eight);
    assert_eq!(labels.num_labels(), count);
    assert_eq!(labels.buffer(), &sequential);
}

#[test]
fn test_repeated_calls_are_identical() {
    let mask = noise_mask(Shape::new(40, 40, 50), 40, 99);
    let a = LabelMap::from_mask(&mask, Connectivity::TwentySix);
    let b = LabelMap::from_mask(&mask, Connectivity::TwentySix);
    assert_eq!(a.num_labels(), b.num_labels());
    assert_eq!(a.labels(), b.labels());
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_from_grid_rejects_wrong_dimensionality() {
    let grid = Grid::new_2d(5, 5, vec![1u8; 25]);
    let err = LabelMap::from_grid(&grid, Connectivity::TwentySix).unwrap_err();
    assert_eq!(
        err,
        Error::InvalidConnectivity {
            connectivity: 26,
            ndim: 2
        }
    );
}

#[test]
#[should_panic(expected = "connectivity does not fit")]
fn test_from_mask_panics_on_wrong_dimensionality() {
    let mask = BitBuffer3::new_default(Shape::new(4, 4, 4));
    LabelMap::from_mask(&mask, Connectivity::Eight);
}
