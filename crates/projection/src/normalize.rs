//! Coordinate post-processing between reduction and plot assembly.

use crate::reduce::Point3;

/// Largest coordinate magnitude allowed into the plot. Reduced layouts can
/// land anywhere; scaling them into a fixed box keeps the camera defaults
/// usable for every input.
pub const MAX_COORD: f64 = 10.0;

/// Uniformly rescale coordinates so the largest magnitude is at most
/// [`MAX_COORD`]. Returns the factor applied (`1.0` when the layout was
/// already in range).
///
/// The factor is global, never per-axis: relative geometry and the origin
/// are preserved, only the overall size changes.
pub fn rescale_in_place(coords: &mut [Point3]) -> f64 {
    let mut coord_range = 0.0f64;
    for point in coords.iter() {
        for value in point {
            coord_range = coord_range.max(value.abs());
        }
    }
    if coord_range <= MAX_COORD {
        return 1.0;
    }
    let factor = MAX_COORD / coord_range;
    for point in coords.iter_mut() {
        for value in point.iter_mut() {
            *value *= factor;
        }
    }
    factor
}

/// Per-axis display ranges, `[min - 1, max + 1]`, computed from the
/// (already rescaled) coordinates so every point renders with margin.
pub fn axis_ranges(coords: &[Point3]) -> [[f64; 2]; 3] {
    let mut ranges = [[0.0f64, 0.0f64]; 3];
    for (axis, range) in ranges.iter_mut().enumerate() {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for point in coords {
            min = min.min(point[axis]);
            max = max.max(point[axis]);
        }
        if !min.is_finite() || !max.is_finite() {
            min = 0.0;
            max = 0.0;
        }
        *range = [min - 1.0, max + 1.0];
    }
    ranges
}

/// Replace NaN and infinite coordinates with `0.0`, returning how many
/// values were replaced. Reduction should not produce these, but JSON
/// cannot carry them, so anything that slips through is pinned to the
/// origin here and reported by the caller.
pub fn sanitize_in_place(coords: &mut [Point3]) -> usize {
    let mut replaced = 0;
    for point in coords.iter_mut() {
        for value in point.iter_mut() {
            if !value.is_finite() {
                *value = 0.0;
                replaced += 1;
            }
        }
    }
    replaced
}
