//! 轮廓几何量：面积、周长、多边形近似、外接矩形、凸包、区域掩码

use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::geometry::{approximate_polygon_dp, arc_length, convex_hull};
use imageproc::point::Point;
use serde::Serialize;

/// 外接矩形（包含端点像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BoundingRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingRect {
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }
}

/// 鞋带公式
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    twice_area.abs() as f64 / 2.0
}

pub fn perimeter(points: &[Point<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    arc_length(points, true)
}

pub fn bounding_rect(points: &[Point<i32>]) -> BoundingRect {
    let Some(first) = points.first() else {
        return BoundingRect::default();
    };
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    BoundingRect {
        x: min_x,
        y: min_y,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    }
}

/// 闭合轮廓的 Douglas-Peucker 近似
///
/// 环在两个极点处切成两段，分别做开曲线近似再拼接。
/// 极点一定是凸包顶点，起点落在直边中间也不会多出顶点。
pub fn approx_polygon(points: &[Point<i32>], epsilon_ratio: f64) -> Vec<Point<i32>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let epsilon = epsilon_ratio * perimeter(points);
    if epsilon <= 0.0 {
        return points.to_vec();
    }

    let (a, _) = farthest_from(points, points[0]);
    let (b, dist) = farthest_from(points, points[a]);
    if dist == 0 {
        return vec![points[0]];
    }
    let (i, j) = (a.min(b), a.max(b));

    let mut polygon = approximate_polygon_dp(&points[i..=j], epsilon, false);

    let mut wrap = points[j..].to_vec();
    wrap.extend_from_slice(&points[..=i]);
    let tail = approximate_polygon_dp(&wrap, epsilon, false);
    if tail.len() > 2 {
        polygon.extend_from_slice(&tail[1..tail.len() - 1]);
    }

    polygon
}

/// 距离相同时取先出现的点
fn farthest_from(points: &[Point<i32>], origin: Point<i32>) -> (usize, i64) {
    points
        .iter()
        .enumerate()
        .fold((0usize, 0i64), |best, (i, p)| {
            let d = squared_distance(origin, *p);
            if d > best.1 {
                (i, d)
            } else {
                best
            }
        })
}

pub fn vertex_count(points: &[Point<i32>], epsilon_ratio: f64) -> usize {
    approx_polygon(points, epsilon_ratio).len()
}

pub fn hull_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    contour_area(&convex_hull(points))
}

/// 面积 / 凸包面积
pub fn solidity(points: &[Point<i32>]) -> f64 {
    let hull = hull_area(points);
    if hull <= 0.0 {
        return 0.0;
    }
    (contour_area(points) / hull).min(1.0)
}

/// 轮廓围成区域的填充掩码
pub fn region_mask(width: u32, height: u32, points: &[Point<i32>]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);

    let mut polygon: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for p in points {
        if polygon.last() != Some(p) {
            polygon.push(*p);
        }
    }
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    if polygon.len() < 3 {
        return mask;
    }

    draw_polygon_mut(&mut mask, &polygon, Luma([255]));
    mask
}

fn squared_distance(a: Point<i32>, b: Point<i32>) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    dx * dx + dy * dy
}

#[cfg(test)]
pub(crate) fn rect_outline(x: i32, y: i32, w: i32, h: i32) -> Vec<Point<i32>> {
    // 顺时针逐像素，和 find_contours 的输出形态一致
    let mut points = Vec::new();
    for i in 0..w {
        points.push(Point::new(x + i, y));
    }
    for j in 1..h {
        points.push(Point::new(x + w - 1, y + j));
    }
    for i in (0..w - 1).rev() {
        points.push(Point::new(x + i, y + h - 1));
    }
    for j in (1..h - 1).rev() {
        points.push(Point::new(x, y + j));
    }
    points
}
