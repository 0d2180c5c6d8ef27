use datasieve::interpolate::interpolate_to_grid;
use datasieve::render::{comparison_png, heatmap_png};
use datasieve::SieveError;

// =====================
// Scatter-to-grid interpolation
// =====================

#[test]
fn triangle_covers_inside_and_leaves_outside_undefined() {
    let x = [0.0, 2.0, 0.0];
    let y = [0.0, 0.0, 2.0];
    let z = [1.0, 2.0, 3.0];

    let surface = interpolate_to_grid(&x, &y, &z, 5).unwrap();

    // Grid spans [0,2]x[0,2]; the hull is the triangle x + y <= 2.
    for (row, &gy) in surface.ys.iter().enumerate() {
        for (col, &gx) in surface.xs.iter().enumerate() {
            let v = surface.values[row][col];
            if gx + gy <= 2.0 + 1e-9 {
                assert!(!v.is_nan(), "node ({gx}, {gy}) should be defined");
            } else {
                assert!(v.is_nan(), "node ({gx}, {gy}) should be undefined, got {v}");
            }
        }
    }

    // Vertices reproduce their inputs exactly under barycentric weights.
    assert!((surface.values[0][0] - 1.0).abs() < 1e-9);
    assert!((surface.values[0][4] - 2.0).abs() < 1e-9);
    assert!((surface.values[4][0] - 3.0).abs() < 1e-9);
}

#[test]
fn two_points_is_not_enough() {
    let err = interpolate_to_grid(&[0.0, 1.0], &[0.0, 1.0], &[1.0, 2.0], 10).unwrap_err();
    assert!(matches!(err, SieveError::NotEnoughPoints(2)));
    assert!(err.to_string().contains("not enough points"));
}

#[test]
fn mismatched_input_lengths_are_rejected() {
    let err = interpolate_to_grid(&[0.0, 1.0, 2.0], &[0.0, 1.0], &[1.0, 2.0, 3.0], 10).unwrap_err();
    assert!(matches!(err, SieveError::PointLengthMismatch { .. }));
}

#[test]
fn collinear_points_produce_no_surface() {
    let x = [0.0, 1.0, 2.0, 3.0];
    let y = [0.0, 1.0, 2.0, 3.0];
    let z = [1.0, 2.0, 3.0, 4.0];

    let err = interpolate_to_grid(&x, &y, &z, 10).unwrap_err();
    assert!(matches!(err, SieveError::EmptySurface));
    assert!(err.to_string().contains("no valid surface"));
}

#[test]
fn unit_square_corners_reproduce_input_values() {
    let x = [0.0, 1.0, 1.0, 0.0];
    let y = [0.0, 0.0, 1.0, 1.0];
    let z = [0.0, 1.0, 1.0, 0.0];

    let surface = interpolate_to_grid(&x, &y, &z, 2).unwrap();

    // resolution 2 puts the four nodes exactly on the corners
    assert!((surface.values[0][0] - 0.0).abs() < 1e-9); // (0,0)
    assert!((surface.values[0][1] - 1.0).abs() < 1e-9); // (1,0)
    assert!((surface.values[1][1] - 1.0).abs() < 1e-9); // (1,1)
    assert!((surface.values[1][0] - 0.0).abs() < 1e-9); // (0,1)
}

#[test]
fn unit_square_center_is_bilinear_consistent() {
    let x = [0.0, 1.0, 1.0, 0.0];
    let y = [0.0, 0.0, 1.0, 1.0];
    let z = [0.0, 1.0, 1.0, 0.0];

    // resolution 3 puts a node at (0.5, 0.5); either diagonal split of the
    // square interpolates it to 0.5
    let surface = interpolate_to_grid(&x, &y, &z, 3).unwrap();
    assert!((surface.values[1][1] - 0.5).abs() < 1e-9);
}

#[test]
fn interpolation_is_deterministic() {
    let x = [0.3, 1.7, 0.9, 2.4, 1.1, 0.2];
    let y = [0.1, 0.8, 2.1, 1.5, 1.0, 1.9];
    let z = [4.0, 2.5, 7.1, 3.3, 5.0, 6.2];

    let a = interpolate_to_grid(&x, &y, &z, 40).unwrap();
    let b = interpolate_to_grid(&x, &y, &z, 40).unwrap();

    for (ra, rb) in a.values.iter().zip(&b.values) {
        for (va, vb) in ra.iter().zip(rb) {
            assert_eq!(va.to_bits(), vb.to_bits());
        }
    }
}

#[test]
fn rows_with_non_finite_coordinates_are_dropped() {
    let x = [0.0, 2.0, 0.0, f64::NAN];
    let y = [0.0, 0.0, 2.0, 1.0];
    let z = [1.0, 2.0, 3.0, 9.0];

    let surface = interpolate_to_grid(&x, &y, &z, 5).unwrap();
    assert!(surface.has_defined_nodes());
    // the NaN row must not stretch the grid
    assert_eq!(*surface.xs.last().unwrap(), 2.0);
}

#[test]
fn grid_axes_span_observed_ranges_inclusive() {
    let x = [-1.0, 3.0, 1.0];
    let y = [2.0, 5.0, 8.0];
    let z = [0.0, 1.0, 2.0];

    let surface = interpolate_to_grid(&x, &y, &z, 100).unwrap();
    assert_eq!(surface.resolution(), 100);
    assert_eq!(surface.xs[0], -1.0);
    assert_eq!(*surface.xs.last().unwrap(), 3.0);
    assert_eq!(surface.ys[0], 2.0);
    assert_eq!(*surface.ys.last().unwrap(), 8.0);
}

// =====================
// Rendering
// =====================

#[test]
fn heatmap_renders_to_png_bytes() {
    let x = [0.0, 1.0, 1.0, 0.0, 0.5];
    let y = [0.0, 0.0, 1.0, 1.0, 0.5];
    let z = [0.0, 1.0, 1.0, 0.0, 0.5];

    let surface = interpolate_to_grid(&x, &y, &z, 30).unwrap();
    let png = heatmap_png(&surface, &x, &y, &z, "x", "y", "conversion").unwrap();

    assert_eq!(&png[..4], b"\x89PNG");
}

#[test]
fn comparison_chart_renders_to_png_bytes() {
    let original: Vec<f64> = (0..100).map(|i| (i as f64 * 0.2).sin()).collect();
    let decimated: Vec<f64> = original.iter().copied().step_by(5).collect();

    let png = comparison_png(&original, &decimated, 5, "signal").unwrap();
    assert_eq!(&png[..4], b"\x89PNG");
}
