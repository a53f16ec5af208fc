//! PLY (Stanford polygon format) reader.
//!
//! Handles `ascii 1.0`, `binary_little_endian 1.0` and
//! `binary_big_endian 1.0` bodies. The `vertex` element supplies positions
//! and, when present, normals and colors; the `face` element supplies
//! polygons, which are fan-triangulated. Any other element is read and
//! discarded. A file without faces comes back as a point cloud.

use thiserror::Error;

use crate::geometry::MeshData;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlyError {
    #[error("missing 'ply' magic line")]
    MissingMagic,
    #[error("unsupported format '{0}'")]
    UnsupportedFormat(String),
    #[error("malformed header line {line}: {reason}")]
    Header { line: usize, reason: String },
    #[error("unexpected end of data in element '{0}'")]
    UnexpectedEof(String),
    #[error("invalid value '{value}' in element '{element}'")]
    InvalidValue { element: String, value: String },
    #[error("face references vertex {index} but only {count} vertices exist")]
    IndexOutOfRange { index: i64, count: usize },
    #[error("vertex element has no x/y/z properties")]
    MissingPositions,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scalar {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl Scalar {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "char" | "int8" => Self::I8,
            "uchar" | "uint8" => Self::U8,
            "short" | "int16" => Self::I16,
            "ushort" | "uint16" => Self::U16,
            "int" | "int32" => Self::I32,
            "uint" | "uint32" => Self::U32,
            "float" | "float32" => Self::F32,
            "double" | "float64" => Self::F64,
            _ => return None,
        })
    }

    fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Scale factor that maps an integer color channel onto `[0, 1]`.
    fn color_scale(self) -> f32 {
        match self {
            Self::U8 => 1.0 / 255.0,
            Self::U16 => 1.0 / 65535.0,
            _ => 1.0,
        }
    }
}

#[derive(Clone, Debug)]
enum Property {
    Scalar { name: String, ty: Scalar },
    List { name: String, count: Scalar, item: Scalar },
}

impl Property {
    fn name(&self) -> &str {
        match self {
            Property::Scalar { name, .. } | Property::List { name, .. } => name,
        }
    }
}

#[derive(Clone, Debug)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

impl Element {
    fn scalar_index(&self, name: &str) -> Option<(usize, Scalar)> {
        self.properties.iter().enumerate().find_map(|(i, p)| match p {
            Property::Scalar { name: n, ty } if n == name => Some((i, *ty)),
            _ => None,
        })
    }
}

struct Header {
    format: Format,
    elements: Vec<Element>,
}

/// Parse a complete PLY file held in memory.
pub fn parse(bytes: &[u8]) -> Result<MeshData, PlyError> {
    let (header, body_start) = parse_header(bytes)?;
    let body = &bytes[body_start..];

    let mut reader = match header.format {
        Format::Ascii => {
            let text = std::str::from_utf8(body).map_err(|_| PlyError::InvalidValue {
                element: "body".into(),
                value: "non-UTF-8 ascii body".into(),
            })?;
            Body::Ascii(text)
        }
        Format::BinaryLittleEndian => Body::Binary {
            data: body,
            pos: 0,
            big_endian: false,
        },
        Format::BinaryBigEndian => Body::Binary {
            data: body,
            pos: 0,
            big_endian: true,
        },
    };

    let mut mesh = MeshData::default();
    let mut saw_vertices = false;

    for element in &header.elements {
        match element.name.as_str() {
            "vertex" => {
                read_vertices(element, &mut reader, &mut mesh)?;
                saw_vertices = true;
            }
            "face" => read_faces(element, &mut reader, &mut mesh)?,
            _ => skip_element(element, &mut reader)?,
        }
    }

    if !saw_vertices {
        return Err(PlyError::MissingPositions);
    }

    let count = mesh.positions.len();
    if let Some(&bad) = mesh.indices.iter().find(|&&i| i as usize >= count) {
        return Err(PlyError::IndexOutOfRange {
            index: bad as i64,
            count,
        });
    }

    Ok(mesh)
}

fn parse_header(bytes: &[u8]) -> Result<(Header, usize), PlyError> {
    let mut format = None;
    let mut elements: Vec<Element> = Vec::new();
    let mut pos = 0;
    let mut line_no = 0;

    loop {
        let Some(rel_end) = bytes[pos..].iter().position(|&b| b == b'\n') else {
            return Err(PlyError::Header {
                line: line_no + 1,
                reason: "header is not terminated by end_header".into(),
            });
        };
        let raw = &bytes[pos..pos + rel_end];
        pos += rel_end + 1;
        line_no += 1;

        let line = std::str::from_utf8(raw)
            .map_err(|_| PlyError::Header {
                line: line_no,
                reason: "non-ascii header".into(),
            })?
            .trim();

        if line_no == 1 {
            if line != "ply" {
                return Err(PlyError::MissingMagic);
            }
            continue;
        }

        let mut tokens = line.split_ascii_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        let bad = |reason: &str| PlyError::Header {
            line: line_no,
            reason: reason.to_string(),
        };

        match keyword {
            "comment" | "obj_info" => {}
            "format" => {
                let name = tokens.next().ok_or_else(|| bad("format without a name"))?;
                format = Some(match name {
                    "ascii" => Format::Ascii,
                    "binary_little_endian" => Format::BinaryLittleEndian,
                    "binary_big_endian" => Format::BinaryBigEndian,
                    other => return Err(PlyError::UnsupportedFormat(other.to_string())),
                });
            }
            "element" => {
                let name = tokens.next().ok_or_else(|| bad("element without a name"))?;
                let count = tokens
                    .next()
                    .and_then(|c| c.parse::<usize>().ok())
                    .ok_or_else(|| bad("element count is not a number"))?;
                elements.push(Element {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            "property" => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| bad("property before any element"))?;
                let first = tokens.next().ok_or_else(|| bad("property without a type"))?;
                let property = if first == "list" {
                    let count = tokens
                        .next()
                        .and_then(Scalar::from_name)
                        .ok_or_else(|| bad("unknown list count type"))?;
                    let item = tokens
                        .next()
                        .and_then(Scalar::from_name)
                        .ok_or_else(|| bad("unknown list item type"))?;
                    let name = tokens.next().ok_or_else(|| bad("list without a name"))?;
                    Property::List {
                        name: name.to_string(),
                        count,
                        item,
                    }
                } else {
                    let ty = Scalar::from_name(first).ok_or_else(|| bad("unknown property type"))?;
                    let name = tokens.next().ok_or_else(|| bad("property without a name"))?;
                    Property::Scalar {
                        name: name.to_string(),
                        ty,
                    }
                };
                element.properties.push(property);
            }
            "end_header" => break,
            _ => return Err(bad("unknown keyword")),
        }
    }

    let format = format.ok_or(PlyError::Header {
        line: line_no,
        reason: "no format line".into(),
    })?;

    Ok((Header { format, elements }, pos))
}

enum Body<'a> {
    /// Unread remainder of the text body.
    Ascii(&'a str),
    Binary {
        data: &'a [u8],
        pos: usize,
        big_endian: bool,
    },
}

fn next_token<'a>(text: &mut &'a str) -> Option<&'a str> {
    let trimmed = text.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let end = trimmed
        .find(|c: char| c.is_ascii_whitespace())
        .unwrap_or(trimmed.len());
    let (token, rest) = trimmed.split_at(end);
    *text = rest;
    (!token.is_empty()).then_some(token)
}

impl Body<'_> {
    /// Upper bound on how many more values of `size` bytes the body holds.
    /// An ascii value takes at least one character plus a separator.
    fn max_values(&self, size: usize) -> usize {
        match self {
            Body::Ascii(text) => text.len().div_ceil(2),
            Body::Binary { data, pos, .. } => (data.len() - *pos) / size.max(1),
        }
    }

    /// Fail early when the header promises more rows than the body can
    /// hold, so counts from the file never drive allocation on their own.
    fn check_rows(&self, element: &Element) -> Result<(), PlyError> {
        let max_rows = match self {
            Body::Ascii(_) => self.max_values(1) / element.properties.len().max(1),
            Body::Binary { .. } => {
                let row: usize = element
                    .properties
                    .iter()
                    .map(|p| match p {
                        Property::Scalar { ty, .. } => ty.size(),
                        Property::List { count, .. } => count.size(),
                    })
                    .sum();
                self.max_values(row)
            }
        };
        if element.count > max_rows {
            return Err(PlyError::UnexpectedEof(element.name.clone()));
        }
        Ok(())
    }

    fn read(&mut self, ty: Scalar, element: &str) -> Result<f64, PlyError> {
        match self {
            Body::Ascii(text) => {
                let token = next_token(text)
                    .ok_or_else(|| PlyError::UnexpectedEof(element.to_string()))?;
                token.parse::<f64>().map_err(|_| PlyError::InvalidValue {
                    element: element.to_string(),
                    value: token.to_string(),
                })
            }
            Body::Binary {
                data,
                pos,
                big_endian,
            } => {
                let size = ty.size();
                let chunk = data
                    .get(*pos..*pos + size)
                    .ok_or_else(|| PlyError::UnexpectedEof(element.to_string()))?;
                *pos += size;
                Ok(decode_binary(ty, chunk, *big_endian))
            }
        }
    }

    fn read_property(&mut self, property: &Property, element: &str) -> Result<Value, PlyError> {
        match property {
            Property::Scalar { ty, .. } => Ok(Value::Scalar(self.read(*ty, element)?)),
            Property::List { count, item, .. } => {
                let n = self.read(*count, element)?;
                if n < 0.0 || n.fract() != 0.0 {
                    return Err(PlyError::InvalidValue {
                        element: element.to_string(),
                        value: n.to_string(),
                    });
                }
                if n > self.max_values(item.size()) as f64 {
                    return Err(PlyError::UnexpectedEof(element.to_string()));
                }
                let n = n as usize;
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(self.read(*item, element)?);
                }
                Ok(Value::List(items))
            }
        }
    }
}

enum Value {
    Scalar(f64),
    List(Vec<f64>),
}

fn decode_binary(ty: Scalar, b: &[u8], big_endian: bool) -> f64 {
    macro_rules! num {
        ($t:ty, $n:literal) => {{
            let mut raw = [0u8; $n];
            raw.copy_from_slice(b);
            if big_endian {
                <$t>::from_be_bytes(raw) as f64
            } else {
                <$t>::from_le_bytes(raw) as f64
            }
        }};
    }
    match ty {
        Scalar::I8 => b[0] as i8 as f64,
        Scalar::U8 => b[0] as f64,
        Scalar::I16 => num!(i16, 2),
        Scalar::U16 => num!(u16, 2),
        Scalar::I32 => num!(i32, 4),
        Scalar::U32 => num!(u32, 4),
        Scalar::F32 => num!(f32, 4),
        Scalar::F64 => num!(f64, 8),
    }
}

fn read_vertices(element: &Element, body: &mut Body, mesh: &mut MeshData) -> Result<(), PlyError> {
    let (Some((xi, _)), Some((yi, _)), Some((zi, _))) = (
        element.scalar_index("x"),
        element.scalar_index("y"),
        element.scalar_index("z"),
    ) else {
        return Err(PlyError::MissingPositions);
    };

    let normal_idx = match (
        element.scalar_index("nx"),
        element.scalar_index("ny"),
        element.scalar_index("nz"),
    ) {
        (Some((a, _)), Some((b, _)), Some((c, _))) => Some([a, b, c]),
        _ => None,
    };
    let color_idx = match (
        element.scalar_index("red"),
        element.scalar_index("green"),
        element.scalar_index("blue"),
    ) {
        (Some(r), Some(g), Some(b)) => Some((r, g, b, element.scalar_index("alpha"))),
        _ => None,
    };

    body.check_rows(element)?;
    mesh.positions.reserve(element.count);
    let mut normals = Vec::new();
    let mut colors = Vec::new();
    let mut row = vec![0.0f64; element.properties.len()];

    for _ in 0..element.count {
        for (slot, property) in row.iter_mut().zip(&element.properties) {
            // List properties on vertices carry nothing we use.
            *slot = match body.read_property(property, &element.name)? {
                Value::Scalar(v) => v,
                Value::List(_) => 0.0,
            };
        }

        mesh.positions
            .push([row[xi] as f32, row[yi] as f32, row[zi] as f32]);

        if let Some([a, b, c]) = normal_idx {
            normals.push([row[a] as f32, row[b] as f32, row[c] as f32]);
        }
        if let Some(((ri, rt), (gi, gt), (bi, bt), alpha)) = color_idx {
            let a = alpha.map_or(1.0, |(ai, at)| row[ai] as f32 * at.color_scale());
            colors.push([
                row[ri] as f32 * rt.color_scale(),
                row[gi] as f32 * gt.color_scale(),
                row[bi] as f32 * bt.color_scale(),
                a,
            ]);
        }
    }

    if normal_idx.is_some() {
        mesh.normals = normals;
    }
    if color_idx.is_some() {
        mesh.colors = Some(colors);
    }
    Ok(())
}

fn read_faces(element: &Element, body: &mut Body, mesh: &mut MeshData) -> Result<(), PlyError> {
    let list_idx = element
        .properties
        .iter()
        .position(|p| {
            matches!(p, Property::List { .. })
                && matches!(p.name(), "vertex_indices" | "vertex_index")
        });

    if element.properties.is_empty() {
        return Ok(());
    }
    body.check_rows(element)?;
    let capacity = element.count.checked_mul(3).ok_or_else(|| PlyError::Header {
        line: 0,
        reason: format!("face count {} overflows", element.count),
    })?;
    mesh.indices.reserve(capacity);

    for _ in 0..element.count {
        for (i, property) in element.properties.iter().enumerate() {
            let value = body.read_property(property, &element.name)?;
            if Some(i) != list_idx {
                continue;
            }
            let Value::List(polygon) = value else {
                continue;
            };
            let mut corners = Vec::with_capacity(polygon.len());
            for v in polygon {
                if v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
                    return Err(PlyError::IndexOutOfRange {
                        index: v as i64,
                        count: mesh.positions.len(),
                    });
                }
                corners.push(v as u32);
            }
            for k in 1..corners.len().saturating_sub(1) {
                mesh.indices
                    .extend_from_slice(&[corners[0], corners[k], corners[k + 1]]);
            }
        }
    }
    Ok(())
}

fn skip_element(element: &Element, body: &mut Body) -> Result<(), PlyError> {
    if element.properties.is_empty() {
        return Ok(());
    }
    body.check_rows(element)?;
    for _ in 0..element.count {
        for property in &element.properties {
            body.read_property(property, &element.name)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASCII_QUAD: &str = "ply
format ascii 1.0
comment two triangles
element vertex 4
property float x
property float y
property float z
property uchar red
property uchar green
property uchar blue
element face 1
property list uchar int vertex_indices
end_header
0 0 0 255 0 0
1 0 0 0 255 0
1 1 0 0 0 255
0 1 0 255 255 255
4 0 1 2 3
";

    fn binary_triangle(big_endian: bool) -> Vec<u8> {
        let format = if big_endian {
            "binary_big_endian"
        } else {
            "binary_little_endian"
        };
        let mut bytes = format!(
            "ply\nformat {format} 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n"
        )
        .into_bytes();
        let verts = [[0.0f32, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]];
        for v in verts {
            for c in v {
                bytes.extend(if big_endian {
                    c.to_be_bytes()
                } else {
                    c.to_le_bytes()
                });
            }
        }
        bytes.push(3);
        for i in [0i32, 1, 2] {
            bytes.extend(if big_endian {
                i.to_be_bytes()
            } else {
                i.to_le_bytes()
            });
        }
        bytes
    }

    #[test]
    fn ascii_quad_is_fan_triangulated() {
        let mesh = parse(ASCII_QUAD.as_bytes()).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        let colors = mesh.colors.unwrap();
        assert_eq!(colors[0], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(colors[3], [1.0, 1.0, 1.0, 1.0]);
        assert!(mesh.normals.is_empty());
    }

    #[test]
    fn binary_little_and_big_endian_agree() {
        let le = parse(&binary_triangle(false)).unwrap();
        let be = parse(&binary_triangle(true)).unwrap();
        assert_eq!(le, be);
        assert_eq!(le.positions[1], [2.0, 0.0, 0.0]);
        assert_eq!(le.indices, vec![0, 1, 2]);
    }

    #[test]
    fn vertices_without_faces_form_a_point_cloud() {
        let src = "ply\nformat ascii 1.0\nelement vertex 2\nproperty double x\nproperty double y\nproperty double z\nproperty float nx\nproperty float ny\nproperty float nz\nend_header\n0 0 0 0 1 0\n1 1 1 0 1 0\n";
        let mesh = parse(src.as_bytes()).unwrap();
        assert!(mesh.is_point_cloud());
        assert_eq!(mesh.normals, vec![[0.0, 1.0, 0.0]; 2]);
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let src = "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nelement edge 1\nproperty int vertex1\nproperty int vertex2\nelement face 1\nproperty list uchar uint vertex_index\nend_header\n0 0 0\n1 0 0\n0 1 0\n0 1\n3 2 1 0\n";
        let mesh = parse(src.as_bytes()).unwrap();
        assert_eq!(mesh.indices, vec![2, 1, 0]);
    }

    #[test]
    fn rejects_missing_magic() {
        assert_eq!(parse(b"obj\nformat ascii 1.0\nend_header\n"), Err(PlyError::MissingMagic));
    }

    #[test]
    fn rejects_unknown_format() {
        assert_eq!(
            parse(b"ply\nformat binary_middle_endian 1.0\nend_header\n"),
            Err(PlyError::UnsupportedFormat("binary_middle_endian".into()))
        );
    }

    #[test]
    fn rejects_truncated_binary_body() {
        let mut bytes = binary_triangle(false);
        bytes.truncate(bytes.len() - 6);
        assert_eq!(parse(&bytes), Err(PlyError::UnexpectedEof("face".into())));
    }

    #[test]
    fn rejects_out_of_range_face_index() {
        let src = "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n0 0 0\n1 0 0\n0 1 0\n3 0 1 7\n";
        assert_eq!(
            parse(src.as_bytes()),
            Err(PlyError::IndexOutOfRange { index: 7, count: 3 })
        );
    }

    #[test]
    fn rejects_unterminated_header() {
        assert!(matches!(
            parse(b"ply\nformat ascii 1.0\nelement vertex 1\n"),
            Err(PlyError::Header { .. })
        ));
    }

    fn ascii_triangle(vertex_count: &str, face_count: &str, face_body: &str) -> String {
        format!(
            "ply\nformat ascii 1.0\nelement vertex {vertex_count}\nproperty float x\nproperty float y\nproperty float z\nelement face {face_count}\nproperty list uchar int vertex_indices\nend_header\n0 0 0\n1 0 0\n0 1 0\n{face_body}"
        )
    }

    #[test]
    fn rejects_absurd_element_count() {
        let faces = ascii_triangle("3", &(usize::MAX / 2).to_string(), "3 0 1 2\n");
        assert_eq!(
            parse(faces.as_bytes()),
            Err(PlyError::UnexpectedEof("face".into()))
        );

        let vertices = ascii_triangle(&(usize::MAX / 4).to_string(), "1", "3 0 1 2\n");
        assert_eq!(
            parse(vertices.as_bytes()),
            Err(PlyError::UnexpectedEof("vertex".into()))
        );

        let binary = binary_triangle(false);
        let body_at = binary.windows(11).position(|w| w == b"end_header\n").unwrap() + 11;
        let header = std::str::from_utf8(&binary[..body_at])
            .unwrap()
            .replace("vertex 3", "vertex 4000000000");
        let mut bytes = header.into_bytes();
        bytes.extend_from_slice(&binary[body_at..]);
        assert_eq!(parse(&bytes), Err(PlyError::UnexpectedEof("vertex".into())));
    }

    #[test]
    fn rejects_absurd_list_count() {
        let ascii = ascii_triangle("3", "1", "1e300 0 1 2\n");
        assert_eq!(
            parse(ascii.as_bytes()),
            Err(PlyError::UnexpectedEof("face".into()))
        );

        let header = "ply\nformat binary_little_endian 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uint int vertex_indices\nend_header\n";
        let mut bytes = header.as_bytes().to_vec();
        for _ in 0..3 {
            bytes.extend(0.0f32.to_le_bytes());
        }
        bytes.extend(4_000_000_000u32.to_le_bytes());
        bytes.extend(0i32.to_le_bytes());
        assert_eq!(parse(&bytes), Err(PlyError::UnexpectedEof("face".into())));
    }

    #[test]
    fn ascii_body_tolerates_irregular_whitespace() {
        let src = ascii_triangle("3", "1", "3\t0  1\r\n2");
        let mesh = parse(src.as_bytes()).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn rejects_vertex_without_positions() {
        let src = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float u\nend_header\n0\n";
        assert_eq!(parse(src.as_bytes()), Err(PlyError::MissingPositions));
    }
}
