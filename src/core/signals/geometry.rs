use super::{CycleInputs, SignalBundle, SignalSource};
use crate::core::config::{GeometryConfig, ScoreWeights};
use crate::core::vision::geometry::solidity;
use std::ops::RangeInclusive;

#[derive(Debug, Clone)]
pub struct GeometryEvidence {
    pub bundle: SignalBundle,
    pub area_ratio: f64,
    pub aspect_ratio: f64,
    pub vertices: usize,
    pub solidity: f64,
}

pub struct GeometrySignal {
    config: GeometryConfig,
    vertex_range: RangeInclusive<usize>,
    weights: ScoreWeights,
}

impl GeometrySignal {
    pub fn new(config: GeometryConfig, vertex_range: RangeInclusive<usize>, weights: ScoreWeights) -> Self {
        Self {
            config,
            vertex_range,
            weights,
        }
    }

    pub fn extract(&self, inputs: &CycleInputs) -> GeometryEvidence {
        let shape = &inputs.outer.shape;
        let frame_area = inputs.frame.pixel_count().max(1) as f64;

        let area_ratio = shape.area / frame_area;
        let aspect_ratio = shape.aspect_ratio();
        let vertices = shape.vertices;
        let solidity = solidity(&shape.points);

        let mut bundle = SignalBundle::new(SignalSource::Geometry);
        bundle.check(
            area_ratio >= self.config.min_area_ratio && area_ratio <= self.config.max_area_ratio,
            self.weights.area,
            format!("Frame coverage {:.1}%", area_ratio * 100.0),
        );
        bundle.check(
            (aspect_ratio - self.config.ideal_aspect).abs() < self.config.aspect_tolerance,
            self.weights.aspect,
            format!("Aspect ratio {:.2}", aspect_ratio),
        );
        bundle.check(
            self.vertex_range.contains(&vertices),
            self.weights.vertices,
            format!("Outline vertices: {}", vertices),
        );
        bundle.check(
            solidity > self.config.min_solidity,
            self.weights.solidity,
            format!("Outline solidity {:.2}", solidity),
        );

        GeometryEvidence {
            bundle,
            area_ratio,
            aspect_ratio,
            vertices,
            solidity,
        }
    }
}
