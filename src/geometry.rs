use geo::{Coord, LineString, MultiLineString, Point};

/// A decoded geometry. Only the shapes found in trip-log exports are
/// modelled; everything else surfaces as `Unsupported`.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point {
        point: Point,
        srid: Option<u32>,
    },
    LineString {
        line: LineString,
        srid: Option<u32>,
    },
    MultiLineString {
        lines: MultiLineString,
        srid: Option<u32>,
    },
    /// A type code the decoder recognises as WKB but does not decode.
    Unsupported {
        code: u32,
        srid: Option<u32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    LineString,
    MultiLineString,
    Unsupported,
}

impl GeometryKind {
    pub fn name(self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::Unsupported => "unsupported",
        }
    }
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point { .. } => GeometryKind::Point,
            Geometry::LineString { .. } => GeometryKind::LineString,
            Geometry::MultiLineString { .. } => GeometryKind::MultiLineString,
            Geometry::Unsupported { .. } => GeometryKind::Unsupported,
        }
    }

    pub fn srid(&self) -> Option<u32> {
        match self {
            Geometry::Point { srid, .. }
            | Geometry::LineString { srid, .. }
            | Geometry::MultiLineString { srid, .. }
            | Geometry::Unsupported { srid, .. } => *srid,
        }
    }

    /// All coordinates in encoding order; MultiLineString members are
    /// concatenated in member order.
    pub fn coords(&self) -> Vec<Coord> {
        match self {
            Geometry::Point { point, .. } => vec![point.0],
            Geometry::LineString { line, .. } => line.0.clone(),
            Geometry::MultiLineString { lines, .. } => lines
                .iter()
                .flat_map(|line| line.coords().copied())
                .collect(),
            Geometry::Unsupported { .. } => Vec::new(),
        }
    }
}
