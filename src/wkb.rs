//! Well-known binary (WKB) geometry codec.
//!
//! Covers the subset found in trip-log exports: Point, LineString and
//! MultiLineString, each optionally tagged with an SRID
//! (<https://libgeos.org/specifications/wkb/>).
//!
//! LineString points are stored back-to-back without headers, while every
//! MultiLineString member is a complete WKB LineString with its own byte
//! order flag and type code.

use geo::{Coord, LineString, MultiLineString, Point};
use log::warn;

use crate::error::{GeometryError, RowError};
use crate::geometry::Geometry;

pub const WKB_POINT: u32 = 0x0000_0001;
pub const WKB_LINESTRING: u32 = 0x0000_0002;
pub const WKB_MULTILINESTRING: u32 = 0x0000_0005;

const WITH_Z: u32 = 0x8000_0000;
const WITH_M: u32 = 0x4000_0000;
const WITH_SRID: u32 = 0x2000_0000;

const POINT_SIZE: usize = 16;
// byte order + type code + point count
const MIN_LINESTRING_SIZE: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    /// `1` selects little-endian, anything else big-endian.
    pub fn from_flag(flag: u8) -> Self {
        if flag == 1 {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        }
    }

    pub fn flag(self) -> u8 {
        match self {
            ByteOrder::BigEndian => 0,
            ByteOrder::LittleEndian => 1,
        }
    }

    fn u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::BigEndian => u32::from_be_bytes(bytes),
            ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
        }
    }

    fn f64(self, bytes: [u8; 8]) -> f64 {
        match self {
            ByteOrder::BigEndian => f64::from_be_bytes(bytes),
            ByteOrder::LittleEndian => f64::from_le_bytes(bytes),
        }
    }

    fn put_u32(self, value: u32, out: &mut Vec<u8>) {
        match self {
            ByteOrder::BigEndian => out.extend_from_slice(&value.to_be_bytes()),
            ByteOrder::LittleEndian => out.extend_from_slice(&value.to_le_bytes()),
        }
    }

    fn put_f64(self, value: f64, out: &mut Vec<u8>) {
        match self {
            ByteOrder::BigEndian => out.extend_from_slice(&value.to_be_bytes()),
            ByteOrder::LittleEndian => out.extend_from_slice(&value.to_le_bytes()),
        }
    }
}

/// Decode one WKB geometry from the start of `bytes`.
///
/// Unknown type codes are not an error: they come back as
/// [`Geometry::Unsupported`] so callers can decide what to do with them.
/// Trailing bytes after the geometry are ignored.
pub fn decode(bytes: &[u8]) -> Result<Geometry, GeometryError> {
    let mut offset = 0;
    read_geometry(bytes, &mut offset)
}

/// Decode a hex string (two digits per byte, any case) and then the geometry.
pub fn decode_hex_geometry(hex: &str) -> Result<Geometry, RowError> {
    let bytes = decode_hex(hex)?;
    Ok(decode(&bytes)?)
}

fn take<const N: usize>(bytes: &[u8], offset: &mut usize) -> Result<[u8; N], GeometryError> {
    let chunk = offset
        .checked_add(N)
        .and_then(|end| bytes.get(*offset..end))
        .ok_or(GeometryError::Truncated {
            needed: N,
            offset: *offset,
            len: bytes.len(),
        })?;
    let mut out = [0u8; N];
    out.copy_from_slice(chunk);
    *offset += N;
    Ok(out)
}

fn read_header(
    bytes: &[u8],
    offset: &mut usize,
) -> Result<(ByteOrder, u32, Option<u32>), GeometryError> {
    let [flag] = take::<1>(bytes, offset)?;
    let order = ByteOrder::from_flag(flag);
    let code = order.u32(take(bytes, offset)?);
    let srid = if code & WITH_SRID != 0 {
        Some(order.u32(take(bytes, offset)?))
    } else {
        None
    };
    Ok((order, code, srid))
}

/// Read a count and make sure `count` elements of at least `min_size` bytes
/// each can still fit in the buffer.
fn read_count(
    bytes: &[u8],
    offset: &mut usize,
    order: ByteOrder,
    min_size: usize,
) -> Result<usize, GeometryError> {
    let count = order.u32(take(bytes, offset)?);
    let remaining = bytes.len().saturating_sub(*offset);
    match (count as usize).checked_mul(min_size) {
        Some(needed) if needed <= remaining => Ok(count as usize),
        _ => Err(GeometryError::CountOverflow {
            count,
            offset: *offset - 4,
            remaining,
        }),
    }
}

fn read_coord(bytes: &[u8], offset: &mut usize, order: ByteOrder) -> Result<Coord, GeometryError> {
    let x = order.f64(take(bytes, offset)?);
    let y = order.f64(take(bytes, offset)?);
    Ok(Coord { x, y })
}

fn read_line_body(
    bytes: &[u8],
    offset: &mut usize,
    order: ByteOrder,
) -> Result<LineString, GeometryError> {
    let count = read_count(bytes, offset, order, POINT_SIZE)?;
    let mut coords = Vec::with_capacity(count);
    for _ in 0..count {
        coords.push(read_coord(bytes, offset, order)?);
    }
    Ok(LineString::new(coords))
}

fn read_geometry(bytes: &[u8], offset: &mut usize) -> Result<Geometry, GeometryError> {
    let (order, code, srid) = read_header(bytes, offset)?;

    if code & (WITH_Z | WITH_M) != 0 {
        warn!("Unsupported WKB dimension modifiers in type code {:#010x}", code);
        return Ok(Geometry::Unsupported { code, srid });
    }

    match code & 0xFF {
        WKB_POINT => Ok(Geometry::Point {
            point: Point(read_coord(bytes, offset, order)?),
            srid,
        }),
        WKB_LINESTRING => Ok(Geometry::LineString {
            line: read_line_body(bytes, offset, order)?,
            srid,
        }),
        WKB_MULTILINESTRING => {
            let count = read_count(bytes, offset, order, MIN_LINESTRING_SIZE)?;
            let mut lines = Vec::with_capacity(count);
            for index in 0..count {
                // members are read flat, never through read_geometry
                let (member_order, member_code, _) = read_header(bytes, offset)?;
                if member_code & (WITH_Z | WITH_M) != 0 || member_code & 0xFF != WKB_LINESTRING {
                    return Err(GeometryError::NestedKind {
                        index,
                        found: type_name(member_code),
                    });
                }
                lines.push(read_line_body(bytes, offset, member_order)?);
            }
            Ok(Geometry::MultiLineString {
                lines: MultiLineString::new(lines),
                srid,
            })
        }
        other => {
            warn!("Unknown geometry type: {}", other);
            Ok(Geometry::Unsupported { code, srid })
        }
    }
}

fn type_name(code: u32) -> &'static str {
    if code & (WITH_Z | WITH_M) != 0 {
        return "Unsupported";
    }
    match code & 0xFF {
        WKB_POINT => "Point",
        WKB_LINESTRING => "LineString",
        WKB_MULTILINESTRING => "MultiLineString",
        _ => "Unsupported",
    }
}

/// Encode a geometry as WKB in the given byte order.
pub fn encode(geometry: &Geometry, order: ByteOrder) -> Result<Vec<u8>, GeometryError> {
    let mut out = Vec::new();
    write_geometry(geometry, order, &mut out)?;
    Ok(out)
}

fn write_header(code: u32, srid: Option<u32>, order: ByteOrder, out: &mut Vec<u8>) {
    out.push(order.flag());
    match srid {
        Some(srid) => {
            order.put_u32(code | WITH_SRID, out);
            order.put_u32(srid, out);
        }
        None => order.put_u32(code, out),
    }
}

fn write_line_body(line: &LineString, order: ByteOrder, out: &mut Vec<u8>) {
    order.put_u32(line.0.len() as u32, out);
    for coord in line.coords() {
        order.put_f64(coord.x, out);
        order.put_f64(coord.y, out);
    }
}

fn write_geometry(
    geometry: &Geometry,
    order: ByteOrder,
    out: &mut Vec<u8>,
) -> Result<(), GeometryError> {
    match geometry {
        Geometry::Point { point, srid } => {
            write_header(WKB_POINT, *srid, order, out);
            order.put_f64(point.x(), out);
            order.put_f64(point.y(), out);
        }
        Geometry::LineString { line, srid } => {
            write_header(WKB_LINESTRING, *srid, order, out);
            write_line_body(line, order, out);
        }
        Geometry::MultiLineString { lines, srid } => {
            write_header(WKB_MULTILINESTRING, *srid, order, out);
            order.put_u32(lines.0.len() as u32, out);
            for line in lines.iter() {
                write_header(WKB_LINESTRING, None, order, out);
                write_line_body(line, order, out);
            }
        }
        Geometry::Unsupported { code, .. } => {
            return Err(GeometryError::Unsupported { code: *code });
        }
    }
    Ok(())
}

/// Decode a hex string into bytes. Odd lengths are rejected up front.
pub fn decode_hex(hex: &str) -> Result<Vec<u8>, RowError> {
    let digits = hex.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(RowError::OddHex(digits.len()));
    }

    let nibble = |position: usize| -> Result<u8, RowError> {
        let digit = digits[position] as char;
        digit
            .to_digit(16)
            .map(|value| value as u8)
            .ok_or(RowError::InvalidHex { digit, position })
    };

    (0..digits.len())
        .step_by(2)
        .map(|i| -> Result<u8, RowError> { Ok((nibble(i)? << 4) | nibble(i + 1)?) })
        .collect()
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}
