//! Well-known-binary encoding of shapefile geometries and the GeoPackage
//! geometry blob header that wraps it.

use crate::error::{ProcessingError, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use shapefile::{Point, PointM, PointZ, PolygonRing, Shape};

const WKB_LITTLE_ENDIAN: u8 = 1;
const WKB_POINT: u32 = 1;
const WKB_LINESTRING: u32 = 2;
const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOINT: u32 = 4;
const WKB_MULTILINESTRING: u32 = 5;
const WKB_MULTIPOLYGON: u32 = 6;
const WKB_Z_OFFSET: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

impl GeometryKind {
    pub fn gpkg_name(&self) -> &'static str {
        match self {
            GeometryKind::Point => "POINT",
            GeometryKind::MultiPoint => "MULTIPOINT",
            GeometryKind::MultiLineString => "MULTILINESTRING",
            GeometryKind::MultiPolygon => "MULTIPOLYGON",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Envelope {
    fn of_point(x: f64, y: f64) -> Self {
        Self {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        }
    }

    pub fn expand(&mut self, other: &Envelope) {
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
    }
}

#[derive(Debug, Clone)]
pub struct EncodedGeometry {
    pub kind: GeometryKind,
    pub wkb: Vec<u8>,
    pub envelope: Option<Envelope>,
}

trait Coordinate {
    fn x(&self) -> f64;
    fn y(&self) -> f64;
    fn z(&self) -> Option<f64>;
}

impl Coordinate for Point {
    fn x(&self) -> f64 {
        self.x
    }
    fn y(&self) -> f64 {
        self.y
    }
    fn z(&self) -> Option<f64> {
        None
    }
}

impl Coordinate for PointM {
    fn x(&self) -> f64 {
        self.x
    }
    fn y(&self) -> f64 {
        self.y
    }
    fn z(&self) -> Option<f64> {
        None
    }
}

impl Coordinate for PointZ {
    fn x(&self) -> f64 {
        self.x
    }
    fn y(&self) -> f64 {
        self.y
    }
    fn z(&self) -> Option<f64> {
        Some(self.z)
    }
}

/// Whether the shape carries Z values.
pub fn shape_has_z(shape: &Shape) -> bool {
    matches!(
        shape,
        Shape::PointZ(_) | Shape::PolylineZ(_) | Shape::PolygonZ(_) | Shape::MultipointZ(_)
    )
}

/// Encode a shape as little-endian WKB. M values are dropped; Z is written when
/// `with_z` is set (0.0 for shapes that have none). Null shapes encode to `None`.
pub fn encode_shape(shape: &Shape, with_z: bool) -> Result<Option<EncodedGeometry>> {
    let mut encoder = Encoder::new(with_z);
    let kind = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(p) => encoder.point(p).map(|_| GeometryKind::Point),
        Shape::PointM(p) => encoder.point(p).map(|_| GeometryKind::Point),
        Shape::PointZ(p) => encoder.point(p).map(|_| GeometryKind::Point),
        Shape::Multipoint(mp) => encoder.multi_point(mp.points()).map(|_| GeometryKind::MultiPoint),
        Shape::MultipointM(mp) => encoder.multi_point(mp.points()).map(|_| GeometryKind::MultiPoint),
        Shape::MultipointZ(mp) => encoder.multi_point(mp.points()).map(|_| GeometryKind::MultiPoint),
        Shape::Polyline(l) => encoder.multi_line(l.parts()).map(|_| GeometryKind::MultiLineString),
        Shape::PolylineM(l) => encoder.multi_line(l.parts()).map(|_| GeometryKind::MultiLineString),
        Shape::PolylineZ(l) => encoder.multi_line(l.parts()).map(|_| GeometryKind::MultiLineString),
        Shape::Polygon(p) => encoder.multi_polygon(p.rings()).map(|_| GeometryKind::MultiPolygon),
        Shape::PolygonM(p) => encoder.multi_polygon(p.rings()).map(|_| GeometryKind::MultiPolygon),
        Shape::PolygonZ(p) => encoder.multi_polygon(p.rings()).map(|_| GeometryKind::MultiPolygon),
        Shape::Multipatch(_) => {
            return Err(ProcessingError::UnsupportedGeometry(
                "multipatch shapes cannot be stored as simple features".to_string(),
            ))
        }
    }?;

    Ok(Some(EncodedGeometry {
        kind,
        wkb: encoder.buf,
        envelope: encoder.envelope,
    }))
}

struct Encoder {
    buf: Vec<u8>,
    with_z: bool,
    envelope: Option<Envelope>,
}

impl Encoder {
    fn new(with_z: bool) -> Self {
        Self {
            buf: Vec::new(),
            with_z,
            envelope: None,
        }
    }

    fn header(&mut self, wkb_type: u32) -> Result<()> {
        let code = if self.with_z {
            wkb_type + WKB_Z_OFFSET
        } else {
            wkb_type
        };
        self.buf.write_u8(WKB_LITTLE_ENDIAN)?;
        self.buf.write_u32::<LittleEndian>(code)?;
        Ok(())
    }

    fn coordinate<P: Coordinate>(&mut self, p: &P) -> Result<()> {
        self.buf.write_f64::<LittleEndian>(p.x())?;
        self.buf.write_f64::<LittleEndian>(p.y())?;
        if self.with_z {
            self.buf.write_f64::<LittleEndian>(p.z().unwrap_or(0.0))?;
        }
        let point = Envelope::of_point(p.x(), p.y());
        match self.envelope.as_mut() {
            Some(envelope) => envelope.expand(&point),
            None => self.envelope = Some(point),
        }
        Ok(())
    }

    fn count(&mut self, n: usize) -> Result<()> {
        self.buf.write_u32::<LittleEndian>(n as u32)?;
        Ok(())
    }

    fn point<P: Coordinate>(&mut self, p: &P) -> Result<()> {
        self.header(WKB_POINT)?;
        self.coordinate(p)
    }

    fn multi_point<P: Coordinate>(&mut self, points: &[P]) -> Result<()> {
        self.header(WKB_MULTIPOINT)?;
        self.count(points.len())?;
        for p in points {
            self.point(p)?;
        }
        Ok(())
    }

    fn line_string<P: Coordinate>(&mut self, points: &[P]) -> Result<()> {
        self.header(WKB_LINESTRING)?;
        self.count(points.len())?;
        for p in points {
            self.coordinate(p)?;
        }
        Ok(())
    }

    fn multi_line<P: Coordinate>(&mut self, parts: &[Vec<P>]) -> Result<()> {
        self.header(WKB_MULTILINESTRING)?;
        self.count(parts.len())?;
        for part in parts {
            self.line_string(part)?;
        }
        Ok(())
    }

    /// Shapefile polygons are a flat ring list; each outer ring opens a new polygon
    /// and the inner rings that follow belong to it.
    fn multi_polygon<P: Coordinate>(&mut self, rings: &[PolygonRing<P>]) -> Result<()> {
        let mut polygons: Vec<Vec<&[P]>> = Vec::new();
        for ring in rings {
            match ring {
                PolygonRing::Outer(points) => polygons.push(vec![points.as_slice()]),
                PolygonRing::Inner(points) => match polygons.last_mut() {
                    Some(polygon) => polygon.push(points.as_slice()),
                    None => polygons.push(vec![points.as_slice()]),
                },
            }
        }

        self.header(WKB_MULTIPOLYGON)?;
        self.count(polygons.len())?;
        for polygon in polygons {
            self.header(WKB_POLYGON)?;
            self.count(polygon.len())?;
            for ring in polygon {
                self.count(ring.len())?;
                for p in ring {
                    self.coordinate(p)?;
                }
            }
        }
        Ok(())
    }
}

/// Wrap WKB in a GeoPackage binary header (version 0, little-endian, XY envelope).
pub fn gpkg_blob(srs_id: i32, geometry: &EncodedGeometry) -> Result<Vec<u8>> {
    let mut blob = Vec::with_capacity(8 + 32 + geometry.wkb.len());
    blob.extend_from_slice(b"GP");
    blob.write_u8(0)?;

    let envelope_code: u8 = if geometry.envelope.is_some() { 1 } else { 0 };
    let flags = WKB_LITTLE_ENDIAN | (envelope_code << 1);
    blob.write_u8(flags)?;
    blob.write_i32::<LittleEndian>(srs_id)?;

    if let Some(envelope) = geometry.envelope {
        blob.write_f64::<LittleEndian>(envelope.min_x)?;
        blob.write_f64::<LittleEndian>(envelope.max_x)?;
        blob.write_f64::<LittleEndian>(envelope.min_y)?;
        blob.write_f64::<LittleEndian>(envelope.max_y)?;
    }
    blob.extend_from_slice(&geometry.wkb);
    Ok(blob)
}
