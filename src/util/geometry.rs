//! Angle and intersection helpers shared by the predictor, evasion engine and sensors.
//!
//! Headings are radians measured counter-clockwise from +x. Arcs are described by a
//! start angle and a positive counter-clockwise span.

use std::f32::consts::{PI, TAU};

use crate::util::vec2::Vec2;

/// Wrap an angle into (-PI, PI]
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

/// Wrap an angle into [0, TAU)
#[inline]
pub fn wrap_positive(angle: f32) -> f32 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Signed shortest rotation taking `from` to `to`
#[inline]
pub fn angle_delta(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

/// Unsigned angular distance between two headings, in [0, PI]
#[inline]
pub fn angle_between(a: f32, b: f32) -> f32 {
    angle_delta(a, b).abs()
}

/// Whether `angle` lies inside the counter-clockwise arc starting at `start` with width `span`
pub fn angle_in_range(angle: f32, start: f32, span: f32) -> bool {
    if span >= TAU {
        return true;
    }
    let offset = wrap_positive(angle - start);
    offset <= span
}

/// Circular mean of headings weighted by `weight`. Returns `None` when weights cancel out.
pub fn mean_heading(headings: impl IntoIterator<Item = (f32, f32)>) -> Option<f32> {
    let sum: Vec2 = headings
        .into_iter()
        .map(|(heading, weight)| Vec2::from_angle(heading) * weight)
        .sum();
    if sum.length_sq() < 1e-9 {
        None
    } else {
        Some(sum.angle())
    }
}

/// Closest distance from `point` to the segment `a`-`b`
pub fn distance_to_segment(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return point.distance_to(a);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance_to(a + ab * t)
}

/// First intersection of segment `start`-`end` with a circle.
///
/// Returns the parametric position `t` in [0, 1] along the segment, or `None` if the
/// segment never touches the circle. A segment starting inside the circle reports `t = 0`.
pub fn line_circle_intersection(start: Vec2, end: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let d = end - start;
    let f = start - center;

    let c = f.length_sq() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }

    let a = d.length_sq();
    if a <= f32::EPSILON {
        return None;
    }
    let b = 2.0 * f.dot(d);
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_disc = discriminant.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    if (0.0..=1.0).contains(&t1) {
        return Some(t1);
    }
    let t2 = (-b + sqrt_disc) / (2.0 * a);
    if (0.0..=1.0).contains(&t2) {
        return Some(t2);
    }
    None
}

/// Straight-line forecast: `frames` ticks at constant heading and speed
#[inline]
pub fn predict_linear(position: Vec2, heading: f32, speed: f32, frames: f32) -> Vec2 {
    position + Vec2::from_angle(heading) * (speed * frames)
}

/// Linear interpolation of `value` from `[from_a, from_b]` onto `[to_a, to_b]`, clamped
#[inline]
pub fn remap(value: f32, from_a: f32, from_b: f32, to_a: f32, to_b: f32) -> f32 {
    if (from_b - from_a).abs() <= f32::EPSILON {
        return to_b;
    }
    let t = ((value - from_a) / (from_b - from_a)).clamp(0.0, 1.0);
    to_a + (to_b - to_a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_normalize_angle_range() {
        for raw in [-10.0_f32, -PI, -1.0, 0.0, 1.0, PI, 4.0, 10.0, 100.0] {
            let a = normalize_angle(raw);
            assert!(a > -PI - EPSILON && a <= PI + EPSILON, "{raw} -> {a}");
            assert!((Vec2::from_angle(a) - Vec2::from_angle(raw)).length() < 1e-3);
        }
    }

    #[test]
    fn test_angle_delta_wraps() {
        let d = angle_delta(PI - 0.1, -PI + 0.1);
        assert!((d - 0.2).abs() < EPSILON);
        assert!((angle_between(0.1, -0.1) - 0.2).abs() < EPSILON);
    }

    #[test]
    fn test_angle_in_range_across_zero() {
        let start = wrap_positive(-0.5);
        assert!(angle_in_range(0.0, start, 1.0));
        assert!(angle_in_range(0.4, start, 1.0));
        assert!(!angle_in_range(0.6, start, 1.0));
        assert!(!angle_in_range(PI, start, 1.0));
    }

    #[test]
    fn test_wrap_positive() {
        assert!((wrap_positive(-PI / 2.0) - 1.5 * PI).abs() < EPSILON);
        assert!(wrap_positive(TAU) < EPSILON);
    }

    #[test]
    fn test_line_circle_hit_and_miss() {
        let center = Vec2::new(50.0, 0.0);
        let t = line_circle_intersection(Vec2::ZERO, Vec2::new(100.0, 0.0), center, 10.0).unwrap();
        assert!((t - 0.4).abs() < EPSILON);

        let miss = line_circle_intersection(Vec2::ZERO, Vec2::new(100.0, 0.0), Vec2::new(50.0, 30.0), 10.0);
        assert!(miss.is_none());

        let short = line_circle_intersection(Vec2::ZERO, Vec2::new(20.0, 0.0), center, 10.0);
        assert!(short.is_none());
    }

    #[test]
    fn test_line_circle_start_inside() {
        let t = line_circle_intersection(Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::ZERO, 5.0);
        assert_eq!(t, Some(0.0));
    }

    #[test]
    fn test_distance_to_segment() {
        let d = distance_to_segment(Vec2::new(5.0, 3.0), Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert!((d - 3.0).abs() < EPSILON);
        let end = distance_to_segment(Vec2::new(13.0, 4.0), Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert!((end - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_predict_linear() {
        let p = predict_linear(Vec2::new(1.0, 1.0), 0.0, 2.0, 5.0);
        assert!(p.approx_eq(Vec2::new(11.0, 1.0), EPSILON));
    }

    #[test]
    fn test_mean_heading_cancels() {
        assert!(mean_heading([(0.0, 1.0), (PI, 1.0)]).is_none());
        let m = mean_heading([(0.0, 1.0), (PI / 2.0, 1.0)]).unwrap();
        assert!((m - PI / 4.0).abs() < EPSILON);
    }

    #[test]
    fn test_remap_clamps() {
        assert!((remap(150.0, 100.0, 200.0, 1.0, 0.6) - 0.8).abs() < EPSILON);
        assert!((remap(50.0, 100.0, 200.0, 1.0, 0.6) - 1.0).abs() < EPSILON);
        assert!((remap(500.0, 100.0, 200.0, 1.0, 0.6) - 0.6).abs() < EPSILON);
    }
}
