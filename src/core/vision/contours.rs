//! 轮廓提取与子区域分类
//!
//! 在二值掩码上做 Suzuki 边界跟踪得到带父子关系的轮廓，选出最大的
//! 四到六边形外边界作为文档外框，再把外框的直接子轮廓（洞）分成照片 / 印章 / 文字框。

use super::geometry::{self, BoundingRect};
use crate::core::config::ContourConfig;
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use log::debug;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SubRegionKind {
    Photo,
    Stamp,
    TextField,
    /// 不计分，只用于诊断和叠加图
    Unknown,
}

/// 轮廓及其派生几何量
#[derive(Debug, Clone)]
pub struct ContourShape {
    pub points: Vec<Point<i32>>,
    pub parent: Option<usize>,
    pub area: f64,
    pub perimeter: f64,
    pub vertices: usize,
    pub bounds: BoundingRect,
}

impl ContourShape {
    fn measure(points: Vec<Point<i32>>, parent: Option<usize>, area: f64, vertices: usize) -> Self {
        let perimeter = geometry::perimeter(&points);
        let bounds = geometry::bounding_rect(&points);
        Self {
            points,
            parent,
            area,
            perimeter,
            vertices,
            bounds,
        }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.bounds.aspect_ratio()
    }
}

#[derive(Debug, Clone)]
pub struct OuterCandidate {
    /// 在本帧轮廓列表中的下标
    pub index: usize,
    pub shape: ContourShape,
}

#[derive(Debug, Clone)]
pub struct SubRegion {
    pub kind: SubRegionKind,
    pub area: f64,
    pub aspect_ratio: f64,
    pub vertices: usize,
    pub shape: ContourShape,
}

#[derive(Debug, Clone, Default)]
pub struct ContourAnalysis {
    pub outer: Option<OuterCandidate>,
    pub sub_regions: Vec<SubRegion>,
    pub total_contours: usize,
}

impl ContourAnalysis {
    pub fn count(&self, kind: SubRegionKind) -> usize {
        self.sub_regions.iter().filter(|r| r.kind == kind).count()
    }
}

/// 按 照片 > 印章 > 文字框 的优先级分类，纯函数
pub fn classify_sub_region(
    area: f64,
    aspect_ratio: f64,
    vertices: usize,
    config: &ContourConfig,
) -> SubRegionKind {
    let squareness = (aspect_ratio - 1.0).abs();

    if squareness < config.photo_aspect_tolerance
        && area > config.photo_min_area
        && area < config.photo_max_area
    {
        SubRegionKind::Photo
    } else if squareness < config.stamp_aspect_tolerance && area < config.stamp_max_area {
        SubRegionKind::Stamp
    } else if vertices == 4 && area > config.text_field_min_area {
        SubRegionKind::TextField
    } else {
        SubRegionKind::Unknown
    }
}

pub struct ContourExtractor {
    config: ContourConfig,
}

impl ContourExtractor {
    pub fn new(config: ContourConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, mask: &GrayImage) -> ContourAnalysis {
        let contours = find_contours::<i32>(mask);
        let areas: Vec<f64> = contours
            .iter()
            .map(|c| geometry::contour_area(&c.points))
            .collect();
        let epsilon = self.config.approx_epsilon_ratio;
        let vertex_range = self.config.min_outer_vertices..=self.config.max_outer_vertices;

        // 面积严格更大才替换，相同面积保留先出现的
        let mut best: Option<(usize, usize)> = None;
        for (i, contour) in contours.iter().enumerate() {
            // 洞边界是白色区域的内沿，不是文档本身
            if contour.border_type != BorderType::Outer {
                continue;
            }
            if areas[i] <= self.config.min_outer_area {
                continue;
            }
            let vertices = geometry::vertex_count(&contour.points, epsilon);
            if !vertex_range.contains(&vertices) {
                continue;
            }
            if best.map_or(true, |(b, _)| areas[i] > areas[b]) {
                best = Some((i, vertices));
            }
        }

        let total_contours = contours.len();
        let Some((outer_index, outer_vertices)) = best else {
            debug!("🔍 {} contours, no document outline", total_contours);
            return ContourAnalysis {
                outer: None,
                sub_regions: Vec::new(),
                total_contours,
            };
        };

        let mut outer_points = Vec::new();
        let mut sub_regions = Vec::new();
        for (i, contour) in contours.into_iter().enumerate() {
            if i == outer_index {
                outer_points = contour.points;
                continue;
            }
            if contour.parent != Some(outer_index) {
                continue;
            }
            let area = areas[i];
            if area <= self.config.sub_region_min_area || area >= self.config.sub_region_max_area {
                continue;
            }

            let vertices = geometry::vertex_count(&contour.points, epsilon);
            let shape = ContourShape::measure(contour.points, contour.parent, area, vertices);
            let aspect_ratio = shape.aspect_ratio();
            sub_regions.push(SubRegion {
                kind: classify_sub_region(area, aspect_ratio, vertices, &self.config),
                area,
                aspect_ratio,
                vertices,
                shape,
            });
        }

        let outer = OuterCandidate {
            index: outer_index,
            shape: ContourShape::measure(outer_points, None, areas[outer_index], outer_vertices),
        };

        let analysis = ContourAnalysis {
            outer: Some(outer),
            sub_regions,
            total_contours,
        };
        debug!(
            "🔍 {} contours, outline area {:.0} perimeter {:.0}, sub-regions: {} photo / {} stamp / {} text",
            total_contours,
            areas[outer_index],
            analysis.outer.as_ref().map_or(0.0, |o| o.shape.perimeter),
            analysis.count(SubRegionKind::Photo),
            analysis.count(SubRegionKind::Stamp),
            analysis.count(SubRegionKind::TextField),
        );
        analysis
    }
}
