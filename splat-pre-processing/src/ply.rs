/// PLY header parsing and fixed-schema vertex row decoding
use crate::error::IngestError;
use glam::{Quat, Vec3};
use splat_buffer::SplatRecord;
use splat_buffer::record::normalize_or_identity;
use splat_constants::format::{DEFAULT_COLOR, DEFAULT_SCALE, MAX_PLY_HEADER_BYTES, SH_C0};

const HEADER_TERMINATOR: &[u8] = b"end_header";

/// Scalar property types a PLY document may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyPropertyType {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Double,
}

impl PlyPropertyType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "char" | "int8" => Some(Self::Char),
            "uchar" | "uint8" => Some(Self::UChar),
            "short" | "int16" => Some(Self::Short),
            "ushort" | "uint16" => Some(Self::UShort),
            "int" | "int32" => Some(Self::Int),
            "uint" | "uint32" => Some(Self::UInt),
            "float" | "float32" => Some(Self::Float),
            "double" | "float64" => Some(Self::Double),
            _ => None,
        }
    }

    pub fn size(self) -> usize {
        match self {
            Self::Char | Self::UChar => 1,
            Self::Short | Self::UShort => 2,
            Self::Int | Self::UInt | Self::Float => 4,
            Self::Double => 8,
        }
    }

    /// Read a little-endian value as f32. `uchar` is normalized to 0..1.
    pub fn read_f32(self, bytes: &[u8]) -> f32 {
        match self {
            Self::Char => bytes[0] as i8 as f32,
            Self::UChar => bytes[0] as f32 / 255.0,
            Self::Short => i16::from_le_bytes([bytes[0], bytes[1]]) as f32,
            Self::UShort => u16::from_le_bytes([bytes[0], bytes[1]]) as f32,
            Self::Int => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
            Self::UInt => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
            Self::Float => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            Self::Double => f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]) as f32,
        }
    }
}

/// One vertex property. `ty` is `None` when the declared type is unknown;
/// such a property occupies no bytes and is never read.
#[derive(Debug, Clone, PartialEq)]
pub struct PlyProperty {
    pub name: String,
    pub ty: Option<PlyPropertyType>,
    pub offset: usize,
}

/// Parsed header of a `binary_little_endian` PLY document.
#[derive(Debug, Clone)]
pub struct PlyHeader {
    pub vertex_count: usize,
    pub properties: Vec<PlyProperty>,
    /// Bytes per vertex row.
    pub row_stride: usize,
    /// Offset of the first vertex row from the start of the document.
    pub vertex_data_offset: usize,
}

#[derive(Debug)]
struct PendingElement {
    name: String,
    count: usize,
    stride: usize,
    has_list: bool,
}

impl PlyHeader {
    /// Locate the header terminator within a bounded scan and parse every
    /// line before it.
    pub fn parse(bytes: &[u8]) -> Result<Self, IngestError> {
        let scan_limit = bytes.len().min(MAX_PLY_HEADER_BYTES);
        let terminator = bytes[..scan_limit]
            .windows(HEADER_TERMINATOR.len())
            .position(|window| window == HEADER_TERMINATOR)
            .ok_or(IngestError::HeaderTerminatorNotFound(MAX_PLY_HEADER_BYTES))?;

        // Body starts after the newline that ends the terminator line.
        let line_end = bytes[terminator..]
            .iter()
            .position(|&b| b == b'\n')
            .ok_or(IngestError::HeaderTerminatorNotFound(MAX_PLY_HEADER_BYTES))?;
        let header_end = terminator + line_end + 1;

        let text = std::str::from_utf8(&bytes[..terminator])
            .map_err(|e| IngestError::InvalidHeader(format!("header is not UTF-8: {}", e)))?;

        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
        if lines.next() != Some("ply") {
            return Err(IngestError::InvalidHeader("missing 'ply' magic".to_string()));
        }

        let mut format_seen = false;
        let mut elements: Vec<PendingElement> = Vec::new();
        let mut vertex_properties: Vec<PlyProperty> = Vec::new();

        for line in lines {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                ["comment", ..] | ["obj_info", ..] => {}
                ["format", format, _version] => {
                    if *format != "binary_little_endian" {
                        return Err(IngestError::UnsupportedFormat(format.to_string()));
                    }
                    format_seen = true;
                }
                ["element", name, count] => {
                    let count = count.parse::<usize>().map_err(|_| {
                        IngestError::InvalidHeader(format!("bad element count in '{}'", line))
                    })?;
                    elements.push(PendingElement {
                        name: name.to_string(),
                        count,
                        stride: 0,
                        has_list: false,
                    });
                }
                ["property", "list", ..] => {
                    let element = elements.last_mut().ok_or_else(|| {
                        IngestError::InvalidHeader("property before any element".to_string())
                    })?;
                    if element.name == "vertex" {
                        return Err(IngestError::InvalidHeader(
                            "list properties on vertex elements are not supported".to_string(),
                        ));
                    }
                    element.has_list = true;
                }
                ["property", type_name, name] => {
                    let element = elements.last_mut().ok_or_else(|| {
                        IngestError::InvalidHeader("property before any element".to_string())
                    })?;
                    let ty = PlyPropertyType::from_name(type_name);
                    if element.name == "vertex" {
                        if ty.is_none() {
                            tracing::warn!(
                                "Ignoring vertex property '{}' of unknown type '{}'",
                                name,
                                type_name
                            );
                        }
                        vertex_properties.push(PlyProperty {
                            name: name.to_string(),
                            ty,
                            offset: element.stride,
                        });
                    }
                    element.stride += ty.map_or(0, PlyPropertyType::size);
                }
                _ => tracing::debug!("Skipping header line '{}'", line),
            }
        }

        if !format_seen {
            return Err(IngestError::InvalidHeader("missing format line".to_string()));
        }

        // Elements declared before the vertex element precede its rows.
        let mut vertex_data_offset = header_end;
        let mut vertex = None;
        for element in &elements {
            if element.name == "vertex" {
                vertex = Some(element);
                break;
            }
            if element.has_list {
                return Err(IngestError::UnsupportedFormat(format!(
                    "list element '{}' before vertex data",
                    element.name
                )));
            }
            vertex_data_offset = element
                .count
                .checked_mul(element.stride)
                .and_then(|size| size.checked_add(vertex_data_offset))
                .ok_or_else(|| {
                    IngestError::InvalidHeader(format!(
                        "element '{}' of {} rows is too large",
                        element.name, element.count
                    ))
                })?;
        }
        let vertex =
            vertex.ok_or_else(|| IngestError::InvalidHeader("no vertex element".to_string()))?;

        let header = Self {
            vertex_count: vertex.count,
            properties: vertex_properties,
            row_stride: vertex.stride,
            vertex_data_offset,
        };
        header.vertex_data_end()?;
        Ok(header)
    }

    /// Offset one past the last vertex row.
    pub fn vertex_data_end(&self) -> Result<usize, IngestError> {
        self.vertex_count
            .checked_mul(self.row_stride)
            .and_then(|size| size.checked_add(self.vertex_data_offset))
            .ok_or_else(|| {
                IngestError::InvalidHeader(format!(
                    "{} vertices of {} bytes cannot be addressed",
                    self.vertex_count, self.row_stride
                ))
            })
    }

    pub fn property(&self, name: &str) -> Option<&PlyProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Number of higher order colour coefficients (`f_rest_*`).
    pub fn f_rest_count(&self) -> usize {
        self.properties
            .iter()
            .filter(|p| p.name.starts_with("f_rest_"))
            .count()
    }

}

/// Resolved location of a readable field within a row.
#[derive(Debug, Clone, Copy)]
struct Field {
    ty: PlyPropertyType,
    offset: usize,
}

impl Field {
    #[inline]
    fn read(self, row: &[u8]) -> f32 {
        self.ty.read_f32(&row[self.offset..self.offset + self.ty.size()])
    }
}

fn read_or_zero(field: Option<Field>, row: &[u8]) -> f32 {
    field.map_or(0.0, |f| f.read(row))
}

/// Fixed splat schema resolved once per document from the header's
/// name to offset table.
#[derive(Debug, Clone)]
pub struct VertexSchema {
    position: [Option<Field>; 3],
    scale: [Option<Field>; 3],
    rotation: [Option<Field>; 4],
    color: [Option<Field>; 3],
    opacity: Option<Field>,
    pub has_scale: bool,
    pub has_color: bool,
    pub has_opacity: bool,
}

impl VertexSchema {
    pub fn resolve(header: &PlyHeader) -> Self {
        let field = |name: &str| {
            header
                .property(name)
                .and_then(|p| p.ty.map(|ty| Field { ty, offset: p.offset }))
        };

        let position = [field("x"), field("y"), field("z")];
        let scale = [field("scale_0"), field("scale_1"), field("scale_2")];
        let rotation = [field("rot_0"), field("rot_1"), field("rot_2"), field("rot_3")];
        let color = [field("f_dc_0"), field("f_dc_1"), field("f_dc_2")];
        let opacity = field("opacity");

        Self {
            has_scale: scale[0].is_some(),
            has_color: color[0].is_some(),
            has_opacity: opacity.is_some(),
            position,
            scale,
            rotation,
            color,
            opacity,
        }
    }

    /// Alpha on the 0-255 scale; opaque when the source has no opacity.
    pub fn alpha(&self, row: &[u8]) -> f32 {
        match self.opacity {
            Some(field) => sigmoid(field.read(row)) * 255.0,
            None => 255.0,
        }
    }

    /// Decode a row into a splat, substituting defaults for absent fields.
    pub fn decode(&self, row: &[u8]) -> SplatRecord {
        let position = Vec3::new(
            read_or_zero(self.position[0], row),
            read_or_zero(self.position[1], row),
            read_or_zero(self.position[2], row),
        );

        let (scale, rotation) = if self.has_scale {
            let scale = Vec3::new(
                read_or_zero(self.scale[0], row).exp(),
                read_or_zero(self.scale[1], row).exp(),
                read_or_zero(self.scale[2], row).exp(),
            );
            // Rows store rotation as w, x, y, z.
            let rotation = Quat::from_xyzw(
                read_or_zero(self.rotation[1], row),
                read_or_zero(self.rotation[2], row),
                read_or_zero(self.rotation[3], row),
                read_or_zero(self.rotation[0], row),
            );
            (scale, normalize_or_identity(rotation))
        } else {
            (Vec3::splat(DEFAULT_SCALE), Quat::IDENTITY)
        };

        let mut color = DEFAULT_COLOR;
        if self.has_color {
            for (channel, field) in self.color.iter().enumerate() {
                color[channel] = to_color_byte((0.5 + SH_C0 * read_or_zero(*field, row)) * 255.0);
            }
        }
        color[3] = to_color_byte(self.alpha(row));

        SplatRecord {
            position,
            scale,
            rotation,
            color,
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[inline]
fn to_color_byte(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
