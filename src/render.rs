use crate::math::{Point3, Vector3};
use crate::selection::ComponentMode;

/// Draw state requested for a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Highlight {
    #[default]
    None,
    /// The owning object is selected.
    Selected,
    /// The primitive is a selected component.
    ComponentSelected,
    /// Preview of a clip plane cutting the object.
    ClipPlane,
}

/// Receives primitives from [`Renderable`] nodes.
pub trait RenderableCollector {
    /// A convex polygon, wound counter-clockwise when seen from `normal`.
    fn add_polygon(&mut self, points: &[Point3], normal: &Vector3, highlight: Highlight);

    /// Independent line segments.
    fn add_lines(&mut self, segments: &[(Point3, Point3)], highlight: Highlight);

    fn add_points(&mut self, points: &[Point3], highlight: Highlight);
}

/// Geometry a node can submit for drawing. Never mutates the node.
pub trait Renderable {
    fn render_solid(&self, collector: &mut dyn RenderableCollector);

    fn render_wireframe(&self, collector: &mut dyn RenderableCollector);

    /// Submits the components of `mode`, highlighting the selected ones.
    fn render_components(&self, mode: ComponentMode, collector: &mut dyn RenderableCollector);
}

/// Collector that stores everything it is given.
///
/// Useful for tests and for renderers that batch a whole frame.
#[derive(Debug, Clone, Default)]
pub struct RecordingCollector {
    pub polygons: Vec<(Vec<Point3>, Vector3, Highlight)>,
    pub lines: Vec<((Point3, Point3), Highlight)>,
    pub points: Vec<(Point3, Highlight)>,
}

impl RenderableCollector for RecordingCollector {
    fn add_polygon(&mut self, points: &[Point3], normal: &Vector3, highlight: Highlight) {
        self.polygons.push((points.to_vec(), *normal, highlight));
    }

    fn add_lines(&mut self, segments: &[(Point3, Point3)], highlight: Highlight) {
        self.lines.extend(segments.iter().map(|&s| (s, highlight)));
    }

    fn add_points(&mut self, points: &[Point3], highlight: Highlight) {
        self.points.extend(points.iter().map(|&p| (p, highlight)));
    }
}
