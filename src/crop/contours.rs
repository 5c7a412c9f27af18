//! External contour extraction on a binary mask.
//!
//! Components are 8-connected. Each one is discovered at its first pixel in
//! raster order and its outer border is followed with the Suzuki-Abe border
//! following rule, so discovery order (and therefore tie-breaking between
//! equal areas) is fully determined by the mask.
//!
//! Components sitting inside a hole of another component are reported too.
//! Their outer border always encloses less area than the surrounding one, so
//! selecting by largest area gives the same answer as a strictly external
//! search.

use image::GrayImage;

/// Screen-clockwise neighbour offsets starting east (y grows downward)
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const WEST: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Outer border of one connected foreground component
#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<(i32, i32)>,
}

impl Contour {
    /// Polygon area enclosed by the border points (shoelace formula).
    ///
    /// Borders run through pixel centres, so a filled `w x h` rectangle has
    /// area `(w - 1) * (h - 1)`, and single pixels or one-pixel lines have 0.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let (x0, y0) = self.points[i];
                let (x1, y1) = self.points[(i + 1) % n];
                x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64
            })
            .sum();
        twice.abs() as f64 / 2.0
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
        let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
        for &(x, y) in &self.points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        if self.points.is_empty() {
            return BoundingBox {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            };
        }
        BoundingBox {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        }
    }
}

struct Mask<'a> {
    mask: &'a GrayImage,
    width: i32,
    height: i32,
}

impl Mask<'_> {
    #[inline]
    fn is_set(&self, (x, y): (i32, i32)) -> bool {
        x >= 0
            && y >= 0
            && x < self.width
            && y < self.height
            && self.mask.get_pixel(x as u32, y as u32).0[0] != 0
    }
}

/// Outer contours of every foreground component, in discovery order.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour> {
    let (width, height) = mask.dimensions();
    let view = Mask {
        mask,
        width: width as i32,
        height: height as i32,
    };
    let mut visited = vec![false; width as usize * height as usize];
    let mut contours = Vec::new();

    for y in 0..view.height {
        for x in 0..view.width {
            let idx = (y * view.width + x) as usize;
            if visited[idx] || !view.is_set((x, y)) {
                continue;
            }
            contours.push(Contour {
                points: trace_outer_border(&view, (x, y)),
            });
            flood_component(&view, (x, y), &mut visited);
        }
    }

    contours
}

fn offset((x, y): (i32, i32), d: usize) -> (i32, i32) {
    let (dx, dy) = DIRECTIONS[d];
    (x + dx, y + dy)
}

fn direction_between(from: (i32, i32), to: (i32, i32)) -> usize {
    let delta = (to.0 - from.0, to.1 - from.1);
    DIRECTIONS
        .iter()
        .position(|&d| d == delta)
        .unwrap_or(WEST)
}

/// `start` must be the first pixel of its component in raster order, so its
/// west neighbour is background.
fn trace_outer_border(mask: &Mask<'_>, start: (i32, i32)) -> Vec<(i32, i32)> {
    let first = (0..8)
        .map(|k| (WEST + k) % 8)
        .map(|d| offset(start, d))
        .find(|&p| mask.is_set(p));

    let Some(second) = first else {
        return vec![start];
    };

    let mut points = Vec::new();
    let mut previous = second;
    let mut current = start;
    loop {
        // Counter-clockwise sweep around `current`, beginning just past `previous`
        let back = direction_between(current, previous);
        let next = (1..=8)
            .map(|k| offset(current, (back + 8 - k) % 8))
            .find(|&p| mask.is_set(p))
            .unwrap_or(previous);

        points.push(current);
        if next == start && current == second {
            break;
        }
        previous = current;
        current = next;
    }
    points
}

fn flood_component(mask: &Mask<'_>, seed: (i32, i32), visited: &mut [bool]) {
    let index = |(x, y): (i32, i32)| (y * mask.width + x) as usize;
    let mut stack = vec![seed];
    visited[index(seed)] = true;
    while let Some(p) = stack.pop() {
        for d in 0..8 {
            let n = offset(p, d);
            if mask.is_set(n) && !visited[index(n)] {
                visited[index(n)] = true;
                stack.push(n);
            }
        }
    }
}
