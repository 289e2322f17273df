//! Contour search and quadrilateral scoring
//!
//! Finds the outer contours of the edge map, keeps the largest one that
//! simplifies to exactly four corners and orders those corners for the
//! perspective transform.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;

/// Document outline with corners ordered top-left, top-right, bottom-left,
/// bottom-right
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub corners: [Point<i32>; 4],
    /// Area of the contour the quad was approximated from
    pub area: f64,
}

impl Quad {
    /// Order four corners and wrap them
    pub fn from_unordered(points: [Point<i32>; 4], area: f64) -> Self {
        Self {
            corners: reorder(points),
            area,
        }
    }

    pub fn top_left(&self) -> Point<i32> {
        self.corners[0]
    }

    pub fn top_right(&self) -> Point<i32> {
        self.corners[1]
    }

    pub fn bottom_left(&self) -> Point<i32> {
        self.corners[2]
    }

    pub fn bottom_right(&self) -> Point<i32> {
        self.corners[3]
    }

    /// Corners as float pairs, in order
    pub fn as_f32(&self) -> [(f32, f32); 4] {
        self.corners.map(|p| (p.x as f32, p.y as f32))
    }

    /// Outline edges as corner pairs: top, left, bottom, right
    pub fn edges(&self) -> [(Point<i32>, Point<i32>); 4] {
        [
            (self.top_left(), self.top_right()),
            (self.top_left(), self.bottom_left()),
            (self.bottom_right(), self.bottom_left()),
            (self.bottom_right(), self.top_right()),
        ]
    }
}

/// Outer borders of the top-level white regions
pub fn external_contours(edges: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(edges)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points)
        .collect()
}

/// Polygon area by the shoelace formula
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();

    twice_area.abs() as f64 / 2.0
}

/// Perimeter of a point chain, closing it back to the start when `closed`
pub fn arc_length(points: &[Point<i32>], closed: bool) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    let open: f64 = points.windows(2).map(|w| distance(w[0], w[1])).sum();
    if closed {
        open + distance(points[points.len() - 1], points[0])
    } else {
        open
    }
}

/// Douglas-Peucker simplification of a closed contour
///
/// The ring is cut at two extreme points (the point farthest from the start,
/// and the point farthest from that one) so a start point lying in the middle
/// of an edge never survives as a spurious vertex.
pub fn approximate_polygon(contour: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if contour.len() < 3 {
        return contour.to_vec();
    }

    let a = farthest_from(contour, contour[0]);
    let b = farthest_from(contour, contour[a]);
    let (i, j) = (a.min(b), a.max(b));
    if i == j {
        return vec![contour[i]];
    }

    let first = &contour[i..=j];
    let second: Vec<Point<i32>> = contour[j..]
        .iter()
        .chain(contour[..=i].iter())
        .copied()
        .collect();

    let mut polygon = douglas_peucker(first, epsilon);
    polygon.pop();
    let mut rest = douglas_peucker(&second, epsilon);
    rest.pop();
    polygon.extend(rest);
    polygon
}

/// Largest contour above `min_area` whose simplification has four corners
///
/// Returns the unordered corners and the contour area.
pub fn biggest_contour(
    contours: &[Vec<Point<i32>>],
    min_area: f64,
    epsilon_factor: f64,
) -> Option<([Point<i32>; 4], f64)> {
    let mut best = None;
    let mut max_area = 0.0;

    for contour in contours {
        let area = contour_area(contour);
        if area <= min_area || area <= max_area {
            continue;
        }

        let perimeter = arc_length(contour, true);
        let approx = approximate_polygon(contour, epsilon_factor * perimeter);
        if let Ok(corners) = <[Point<i32>; 4]>::try_from(approx) {
            best = Some(corners);
            max_area = area;
        }
    }

    best.map(|corners| (corners, max_area))
}

/// Order corners as top-left, top-right, bottom-left, bottom-right
///
/// Top-left has the smallest x+y and bottom-right the largest; top-right has
/// the smallest y-x and bottom-left the largest. When those picks collide (a
/// quad rotated near 45 degrees) the corners are split into the two upper and
/// two lower points instead, each pair ordered by x.
pub fn reorder(points: [Point<i32>; 4]) -> [Point<i32>; 4] {
    let sums = points.map(|p| p.x + p.y);
    let diffs = points.map(|p| p.y - p.x);

    let picks = [
        argmin(&sums),
        argmin(&diffs),
        argmax(&diffs),
        argmax(&sums),
    ];

    let distinct = (0..4).all(|i| (i + 1..4).all(|j| picks[i] != picks[j]));
    if distinct {
        return picks.map(|i| points[i]);
    }

    let mut by_y = points;
    by_y.sort_by_key(|p| (p.y, p.x));
    let (mut top, mut bottom) = ([by_y[0], by_y[1]], [by_y[2], by_y[3]]);
    top.sort_by_key(|p| p.x);
    bottom.sort_by_key(|p| p.x);
    [top[0], top[1], bottom[0], bottom[1]]
}

fn argmin(values: &[i32; 4]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v < values[best] {
            best = i;
        }
    }
    best
}

fn argmax(values: &[i32; 4]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn distance(a: Point<i32>, b: Point<i32>) -> f64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

fn farthest_from(points: &[Point<i32>], origin: Point<i32>) -> usize {
    let mut best = 0;
    let mut best_dist = -1.0;
    for (i, p) in points.iter().enumerate() {
        let d = distance(*p, origin);
        if d > best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

/// Distance from `p` to the line through `a` and `b`
fn perpendicular_distance(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let length = distance(a, b);
    if length == 0.0 {
        return distance(p, a);
    }
    let cross = (b.x - a.x) as f64 * (a.y - p.y) as f64 - (a.x - p.x) as f64 * (b.y - a.y) as f64;
    cross.abs() / length
}

/// Open-chain Douglas-Peucker, iterative to keep long contours off the stack
fn douglas_peucker(chain: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let last = chain.len() - 1;
    let mut keep = vec![false; chain.len()];
    keep[0] = true;
    keep[last] = true;

    let mut pending = vec![(0, last)];
    while let Some((start, end)) = pending.pop() {
        if end <= start + 1 {
            continue;
        }

        let mut index = start;
        let mut max_dist = 0.0;
        for k in start + 1..end {
            let d = perpendicular_distance(chain[k], chain[start], chain[end]);
            if d > max_dist {
                index = k;
                max_dist = d;
            }
        }

        if max_dist > epsilon {
            keep[index] = true;
            pending.push((start, index));
            pending.push((index, end));
        }
    }

    chain
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}
