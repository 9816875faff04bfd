//! World map terrain files (`wm0.map`, `wm2.map`, `wm3.map`). A map is
//! a run of fixed 0xB800-byte sections; each section holds sixteen
//! compressed meshes addressed through a leading offset table. Meshes
//! are grouped 4x4 per section, and the overworld appends alternate
//! section slots that replace normal sections when story flags enable
//! them.

use std::fmt::Write as _;

use thiserror::Error;

use crate::bytes::{put_i16_le, put_u16_le, put_u32_le, read_i16_le, read_u16_le, read_u32_le, read_u8, ByteError};
use crate::lzss::{self, LzssError};

pub const SECTION_SIZE: usize = 0xB800;
pub const MESHES_PER_SECTION: usize = 16;
pub const MESHES_PER_ROW: usize = 4;

/// Overworld sections that have story-driven replacements, in the
/// order their alternates are appended after the normal sections.
pub const ALTERNATE_SECTIONS: [usize; 6] = [50, 41, 42, 60, 47, 48];

const OBJ_SCALE: f64 = 1024.0;
const UV_SCALE: f64 = 256.0;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("map size {0} is not a multiple of the section size")]
    BadMapSize(usize),
    #[error("section index {index} out of range 0-{max}")]
    SectionOutOfRange { index: usize, max: usize },
    #[error("mesh index {index} out of range 0-15")]
    MeshOutOfRange { index: usize },
    #[error("grid cell ({row}, {col}) outside the {kind:?} map")]
    CellOutOfRange {
        row: usize,
        col: usize,
        kind: WorldMapKind,
    },
    #[error("truncated mesh data: {0}")]
    Truncated(#[from] ByteError),
    #[error("mesh decompression failed: {0}")]
    Lzss(#[from] LzssError),
    #[error("mesh has {count} vertices, more than the 256 the format can index")]
    TooManyVertices { count: usize },
    #[error("triangle references vertex {vertex} but the mesh has {count} vertices")]
    BadVertexIndex { vertex: u8, count: usize },
    #[error("section {section} meshes total {actual} bytes, exceeding the section size")]
    SectionOverflow { section: usize, actual: usize },
    #[error("interchange line {line}: {reason}")]
    Interchange { line: usize, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vertex {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub vertices: [u8; 3],
    /// Terrain walkability class, 5 bits.
    pub terrain_type: u8,
    /// Mesh script id, 3 bits.
    pub script: u8,
    pub uvs: [(u8, u8); 3],
    pub texture: u16,
    pub location_id: u8,
    pub is_chocobo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
    pub vertices: Vec<Vertex>,
    pub normals: Vec<Vertex>,
}

impl Mesh {
    pub fn parse(data: &[u8]) -> Result<Self, MapError> {
        let num_triangles = read_u16_le(data, 0)? as usize;
        let num_vertices = read_u16_le(data, 2)? as usize;
        let mut pos = 4;

        let mut triangles = Vec::with_capacity(num_triangles);
        for _ in 0..num_triangles {
            let v0 = read_u8(data, pos)?;
            let v1 = read_u8(data, pos + 1)?;
            let v2 = read_u8(data, pos + 2)?;
            let walk = read_u8(data, pos + 3)?;
            let uvs = [
                (read_u8(data, pos + 4)?, read_u8(data, pos + 5)?),
                (read_u8(data, pos + 6)?, read_u8(data, pos + 7)?),
                (read_u8(data, pos + 8)?, read_u8(data, pos + 9)?),
            ];
            let ids = read_u16_le(data, pos + 10)?;
            pos += 12;
            triangles.push(Triangle {
                vertices: [v0, v1, v2],
                terrain_type: walk & 0x1F,
                script: walk >> 5,
                uvs,
                texture: ids & 0x1FF,
                location_id: ((ids >> 9) & 0x1F) as u8,
                is_chocobo: ids >> 15 != 0,
            });
        }

        let read_records = |pos: &mut usize| -> Result<Vec<Vertex>, ByteError> {
            let mut records = Vec::with_capacity(num_vertices);
            for _ in 0..num_vertices {
                records.push(Vertex {
                    x: read_i16_le(data, *pos)?,
                    y: read_i16_le(data, *pos + 2)?,
                    z: read_i16_le(data, *pos + 4)?,
                });
                *pos += 8;
            }
            Ok(records)
        };
        let vertices = read_records(&mut pos)?;
        let normals = read_records(&mut pos)?;

        let mesh = Mesh {
            triangles,
            vertices,
            normals,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    fn validate(&self) -> Result<(), MapError> {
        if self.vertices.len() > 256 {
            return Err(MapError::TooManyVertices {
                count: self.vertices.len(),
            });
        }
        for triangle in &self.triangles {
            for &v in &triangle.vertices {
                if v as usize >= self.vertices.len() {
                    return Err(MapError::BadVertexIndex {
                        vertex: v,
                        count: self.vertices.len(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn serialize(&self) -> Result<Vec<u8>, MapError> {
        self.validate()?;
        let mut out =
            Vec::with_capacity(4 + self.triangles.len() * 12 + self.vertices.len() * 16);
        put_u16_le(&mut out, self.triangles.len() as u16);
        put_u16_le(&mut out, self.vertices.len() as u16);
        for t in &self.triangles {
            out.extend_from_slice(&t.vertices);
            out.push((t.script << 5) | (t.terrain_type & 0x1F));
            for &(u, v) in &t.uvs {
                out.push(u);
                out.push(v);
            }
            let ids = (t.texture & 0x1FF)
                | ((t.location_id as u16 & 0x1F) << 9)
                | ((t.is_chocobo as u16) << 15);
            put_u16_le(&mut out, ids);
        }
        for records in [&self.vertices, &self.normals] {
            for r in records.iter() {
                put_i16_le(&mut out, r.x);
                put_i16_le(&mut out, r.y);
                put_i16_le(&mut out, r.z);
                put_u16_le(&mut out, 0);
            }
        }
        Ok(out)
    }

    /// Export to Wavefront OBJ text. Positions are shifted by the
    /// mesh's world offset and divided by the map's unit scale; normals
    /// are written unscaled.
    pub fn to_obj(&self, offset_x: i32, offset_z: i32) -> String {
        let mut obj = String::new();
        for v in &self.vertices {
            let _ = writeln!(
                obj,
                "v {:.6} {:.6} {:.6}",
                (v.x as f64 + offset_x as f64) / OBJ_SCALE,
                v.y as f64 / OBJ_SCALE,
                (v.z as f64 + offset_z as f64) / OBJ_SCALE,
            );
        }
        for n in &self.normals {
            let _ = writeln!(obj, "vn {:.6} {:.6} {:.6}", n.x as f64, n.y as f64, n.z as f64);
        }
        let mut vt_index = 0usize;
        for t in &self.triangles {
            if t.texture != 0 {
                for &(u, v) in &t.uvs {
                    let _ = writeln!(obj, "vt {:.6} {:.6}", u as f64 / UV_SCALE, v as f64 / UV_SCALE);
                }
            }
            let [a, b, c] = t.vertices.map(|v| v as usize + 1);
            if t.texture != 0 {
                let _ = writeln!(
                    obj,
                    "f {}/{}/{} {}/{}/{} {}/{}/{}",
                    a,
                    vt_index + 1,
                    a,
                    b,
                    vt_index + 2,
                    b,
                    c,
                    vt_index + 3,
                    c,
                );
                vt_index += 3;
            } else {
                let _ = writeln!(obj, "f {}//{} {}//{} {}//{}", a, a, b, b, c, c);
            }
        }
        obj
    }

    /// Import geometry from OBJ text, producing a new mesh. Triangles
    /// whose three vertex positions match a triangle already in `self`
    /// (in any winding) keep that triangle's texture, UVs and terrain
    /// attributes; new triangles get neutral defaults.
    pub fn from_obj(&self, obj: &str, offset_x: i32, offset_z: i32) -> Result<Mesh, MapError> {
        let mut positions: Vec<Vertex> = Vec::new();
        let mut obj_normals: Vec<Vertex> = Vec::new();
        let mut faces: Vec<[(usize, Option<usize>); 3]> = Vec::new();

        for (lineno, line) in obj.lines().enumerate() {
            let lineno = lineno + 1;
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("v") => {
                    let (x, y, z) = parse_triplet(&mut parts, lineno)?;
                    positions.push(Vertex {
                        x: (x * OBJ_SCALE - offset_x as f64).round() as i16,
                        y: (y * OBJ_SCALE).round() as i16,
                        z: (z * OBJ_SCALE - offset_z as f64).round() as i16,
                    });
                }
                Some("vn") => {
                    let (x, y, z) = parse_triplet(&mut parts, lineno)?;
                    obj_normals.push(Vertex {
                        x: x.round() as i16,
                        y: y.round() as i16,
                        z: z.round() as i16,
                    });
                }
                Some("f") => {
                    let mut refs = [(0usize, None); 3];
                    for slot in &mut refs {
                        let token = parts.next().ok_or_else(|| MapError::Interchange {
                            line: lineno,
                            reason: "face needs three vertex references".to_string(),
                        })?;
                        *slot = parse_face_ref(token, lineno)?;
                    }
                    if parts.next().is_some() {
                        return Err(MapError::Interchange {
                            line: lineno,
                            reason: "only triangular faces are supported".to_string(),
                        });
                    }
                    faces.push(refs);
                }
                _ => {}
            }
        }

        if positions.len() > 256 {
            return Err(MapError::TooManyVertices {
                count: positions.len(),
            });
        }

        let mut normals = vec![Vertex { x: 0, y: 0, z: 0 }; positions.len()];
        let mut triangles = Vec::with_capacity(faces.len());
        for face in &faces {
            let mut vertex_ids = [0u8; 3];
            for (i, &(v, n)) in face.iter().enumerate() {
                if v == 0 || v > positions.len() {
                    return Err(MapError::BadVertexIndex {
                        vertex: v.min(255) as u8,
                        count: positions.len(),
                    });
                }
                vertex_ids[i] = (v - 1) as u8;
                if let Some(n) = n {
                    if let Some(&normal) = obj_normals.get(n - 1) {
                        normals[v - 1] = normal;
                    }
                }
            }

            let corner_positions = vertex_ids.map(|v| positions[v as usize]);
            let mut triangle = Triangle {
                vertices: vertex_ids,
                terrain_type: 0,
                script: 0,
                uvs: [(0, 0); 3],
                texture: 0,
                location_id: 0,
                is_chocobo: false,
            };
            if let Some(original) = self.find_matching_triangle(&corner_positions) {
                triangle.terrain_type = original.terrain_type;
                triangle.script = original.script;
                triangle.texture = original.texture;
                triangle.location_id = original.location_id;
                triangle.is_chocobo = original.is_chocobo;
                // Carry each UV over with the corner it belonged to.
                for (i, pos) in corner_positions.iter().enumerate() {
                    for (j, &orig_v) in original.vertices.iter().enumerate() {
                        if self.vertices[orig_v as usize] == *pos {
                            triangle.uvs[i] = original.uvs[j];
                            break;
                        }
                    }
                }
            }
            triangles.push(triangle);
        }

        let mesh = Mesh {
            triangles,
            vertices: positions,
            normals,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    fn find_matching_triangle(&self, corners: &[Vertex; 3]) -> Option<&Triangle> {
        self.triangles.iter().find(|t| {
            let own = t.vertices.map(|v| self.vertices[v as usize]);
            corners
                .iter()
                .all(|c| own.contains(c))
        })
    }
}

fn parse_triplet(
    parts: &mut std::str::SplitWhitespace<'_>,
    line: usize,
) -> Result<(f64, f64, f64), MapError> {
    let mut values = [0f64; 3];
    for value in &mut values {
        let token = parts.next().ok_or_else(|| MapError::Interchange {
            line,
            reason: "expected three coordinates".to_string(),
        })?;
        *value = token.parse().map_err(|_| MapError::Interchange {
            line,
            reason: format!("bad coordinate '{token}'"),
        })?;
    }
    Ok((values[0], values[1], values[2]))
}

fn parse_face_ref(token: &str, line: usize) -> Result<(usize, Option<usize>), MapError> {
    let mut fields = token.split('/');
    let v = fields
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| MapError::Interchange {
            line,
            reason: format!("bad face reference '{token}'"),
        })?;
    let _vt = fields.next();
    let n = match fields.next() {
        Some("") | None => None,
        Some(s) => Some(s.parse().map_err(|_| MapError::Interchange {
            line,
            reason: format!("bad normal reference '{token}'"),
        })?),
    };
    Ok((v, n))
}

/// A terrain file split into its fixed-size sections. Mesh payloads
/// stay compressed until read.
pub struct MapFile {
    sections: Vec<Vec<u8>>,
}

impl MapFile {
    pub fn parse(data: &[u8]) -> Result<Self, MapError> {
        if data.is_empty() || data.len() % SECTION_SIZE != 0 {
            return Err(MapError::BadMapSize(data.len()));
        }
        Ok(MapFile {
            sections: data.chunks(SECTION_SIZE).map(<[u8]>::to_vec).collect(),
        })
    }

    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.sections.concat()
    }

    fn section(&self, index: usize) -> Result<&[u8], MapError> {
        self.sections
            .get(index)
            .map(Vec::as_slice)
            .ok_or(MapError::SectionOutOfRange {
                index,
                max: self.sections.len().saturating_sub(1),
            })
    }

    fn compressed_mesh(&self, section: usize, mesh: usize) -> Result<&[u8], MapError> {
        if mesh >= MESHES_PER_SECTION {
            return Err(MapError::MeshOutOfRange { index: mesh });
        }
        let data = self.section(section)?;
        let offset = read_u32_le(data, mesh * 4)? as usize;
        let size = read_u32_le(data, offset)? as usize;
        if offset + 4 + size > data.len() {
            return Err(MapError::Truncated(ByteError::Underrun {
                offset: offset + 4,
                needed: size,
                len: data.len(),
            }));
        }
        Ok(&data[offset + 4..offset + 4 + size])
    }

    pub fn read_mesh(&self, section: usize, mesh: usize) -> Result<Mesh, MapError> {
        let packed = self.compressed_mesh(section, mesh)?;
        Mesh::parse(&lzss::decompress(packed)?)
    }

    /// Recompress one mesh and rebuild its section's offset table.
    pub fn write_mesh(&mut self, section: usize, mesh: usize, data: &Mesh) -> Result<(), MapError> {
        if mesh >= MESHES_PER_SECTION {
            return Err(MapError::MeshOutOfRange { index: mesh });
        }
        let mut payloads = Vec::with_capacity(MESHES_PER_SECTION);
        for i in 0..MESHES_PER_SECTION {
            payloads.push(self.compressed_mesh(section, i)?.to_vec());
        }
        payloads[mesh] = lzss::compress(&data.serialize()?);

        let mut out = Vec::with_capacity(SECTION_SIZE);
        let mut offset = MESHES_PER_SECTION * 4;
        for payload in &payloads {
            put_u32_le(&mut out, offset as u32);
            offset += 4 + payload.len();
            offset = (offset + 3) & !3;
        }
        for payload in &payloads {
            put_u32_le(&mut out, payload.len() as u32);
            out.extend_from_slice(payload);
            while out.len() % 4 != 0 {
                out.push(0);
            }
        }
        if out.len() > SECTION_SIZE {
            return Err(MapError::SectionOverflow {
                section,
                actual: out.len(),
            });
        }
        out.resize(SECTION_SIZE, 0);
        self.sections[section] = out;
        Ok(())
    }
}

/// Which terrain file a grid belongs to; fixes the section grid's
/// dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldMapKind {
    Overworld,
    Underwater,
    Glacier,
}

impl WorldMapKind {
    pub fn section_columns(self) -> usize {
        match self {
            WorldMapKind::Overworld => 9,
            WorldMapKind::Underwater => 3,
            WorldMapKind::Glacier => 2,
        }
    }

    pub fn section_rows(self) -> usize {
        match self {
            WorldMapKind::Overworld => 7,
            WorldMapKind::Underwater => 4,
            WorldMapKind::Glacier => 2,
        }
    }

    pub fn num_sections(self) -> usize {
        self.section_columns() * self.section_rows()
    }

    pub fn mesh_columns(self) -> usize {
        self.section_columns() * MESHES_PER_ROW
    }

    pub fn mesh_rows(self) -> usize {
        self.section_rows() * MESHES_PER_ROW
    }
}

/// Maps grid cells to storage sections, honoring whichever alternate
/// sections are currently enabled. The redirection is read-time only;
/// storage never moves.
pub struct SectionResolver {
    kind: WorldMapKind,
    enabled: [bool; ALTERNATE_SECTIONS.len()],
    mapping: Vec<usize>,
}

impl SectionResolver {
    pub fn new(kind: WorldMapKind) -> Self {
        let mut resolver = SectionResolver {
            kind,
            enabled: [false; ALTERNATE_SECTIONS.len()],
            mapping: Vec::new(),
        };
        resolver.rebuild_all();
        resolver
    }

    pub fn kind(&self) -> WorldMapKind {
        self.kind
    }

    /// Enable or disable one alternate and refresh only its section.
    pub fn set_alternate_enabled(&mut self, alternate: usize, enabled: bool) {
        if alternate >= ALTERNATE_SECTIONS.len() || self.kind != WorldMapKind::Overworld {
            return;
        }
        self.enabled[alternate] = enabled;
        self.rebuild_section(ALTERNATE_SECTIONS[alternate]);
    }

    fn rebuild_all(&mut self) {
        self.mapping = (0..self.kind.num_sections()).collect();
        if self.kind == WorldMapKind::Overworld {
            for section in ALTERNATE_SECTIONS {
                self.rebuild_section(section);
            }
        }
    }

    fn rebuild_section(&mut self, section: usize) {
        let base = self.kind.num_sections();
        self.mapping[section] = section;
        for (i, &alt) in ALTERNATE_SECTIONS.iter().enumerate() {
            if alt == section && self.enabled[i] {
                self.mapping[section] = base + i;
            }
        }
    }

    /// Storage section index for a grid section.
    pub fn storage_section(&self, section: usize) -> Result<usize, MapError> {
        self.mapping
            .get(section)
            .copied()
            .ok_or(MapError::SectionOutOfRange {
                index: section,
                max: self.kind.num_sections() - 1,
            })
    }

    /// Resolve a global mesh cell to its (storage section, mesh index)
    /// pair.
    pub fn resolve_cell(&self, row: usize, col: usize) -> Result<(usize, usize), MapError> {
        if row >= self.kind.mesh_rows() || col >= self.kind.mesh_columns() {
            return Err(MapError::CellOutOfRange {
                row,
                col,
                kind: self.kind,
            });
        }
        let section =
            (row / MESHES_PER_ROW) * self.kind.section_columns() + col / MESHES_PER_ROW;
        let mesh = (row % MESHES_PER_ROW) * MESHES_PER_ROW + col % MESHES_PER_ROW;
        Ok((self.storage_section(section)?, mesh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mesh() -> Mesh {
        Mesh {
            triangles: vec![
                Triangle {
                    vertices: [0, 1, 2],
                    terrain_type: 5,
                    script: 2,
                    uvs: [(0, 0), (16, 0), (0, 16)],
                    texture: 12,
                    location_id: 3,
                    is_chocobo: true,
                },
                Triangle {
                    vertices: [1, 3, 2],
                    terrain_type: 1,
                    script: 0,
                    uvs: [(0, 0); 3],
                    texture: 0,
                    location_id: 0,
                    is_chocobo: false,
                },
            ],
            vertices: vec![
                Vertex { x: 0, y: 10, z: 0 },
                Vertex { x: 512, y: 0, z: 0 },
                Vertex { x: 0, y: 0, z: 512 },
                Vertex { x: 512, y: -20, z: 512 },
            ],
            normals: vec![
                Vertex { x: 0, y: 4096, z: 0 },
                Vertex { x: 0, y: 4096, z: 0 },
                Vertex { x: 0, y: 4096, z: 0 },
                Vertex { x: 0, y: 4096, z: 0 },
            ],
        }
    }

    fn sample_map() -> MapFile {
        let mut section = Vec::new();
        let payloads: Vec<Vec<u8>> = (0..MESHES_PER_SECTION)
            .map(|_| lzss::compress(&sample_mesh().serialize().unwrap()))
            .collect();
        let mut offset = MESHES_PER_SECTION * 4;
        for payload in &payloads {
            put_u32_le(&mut section, offset as u32);
            offset += 4 + payload.len();
            offset = (offset + 3) & !3;
        }
        for payload in &payloads {
            put_u32_le(&mut section, payload.len() as u32);
            section.extend_from_slice(payload);
            while section.len() % 4 != 0 {
                section.push(0);
            }
        }
        section.resize(SECTION_SIZE, 0);
        MapFile::parse(&section).unwrap()
    }

    #[test]
    fn mesh_round_trips_byte_exact() {
        let mesh = sample_mesh();
        let bytes = mesh.serialize().unwrap();
        assert_eq!(Mesh::parse(&bytes).unwrap(), mesh);
    }

    #[test]
    fn packed_triangle_fields_split_correctly() {
        let bytes = sample_mesh().serialize().unwrap();
        // Triangle 0 walk byte: script 2, type 5.
        assert_eq!(bytes[4 + 3], (2 << 5) | 5);
        // ids word: chocobo | location 3 | texture 12.
        let ids = u16::from_le_bytes([bytes[4 + 10], bytes[4 + 11]]);
        assert_eq!(ids, 0x8000 | (3 << 9) | 12);
    }

    #[test]
    fn map_read_write_mesh_round_trips() {
        let mut map = sample_map();
        let mut mesh = map.read_mesh(0, 5).unwrap();
        assert_eq!(mesh, sample_mesh());

        mesh.vertices[0].y = 999;
        map.write_mesh(0, 5, &mesh).unwrap();
        assert_eq!(map.read_mesh(0, 5).unwrap().vertices[0].y, 999);
        // Neighbors are untouched.
        assert_eq!(map.read_mesh(0, 4).unwrap(), sample_mesh());
        assert_eq!(map.serialize().len(), SECTION_SIZE);
    }

    #[test]
    fn rejects_bad_indices() {
        let map = sample_map();
        assert!(matches!(
            map.read_mesh(0, 16).unwrap_err(),
            MapError::MeshOutOfRange { index: 16 }
        ));
        assert!(matches!(
            map.read_mesh(3, 0).unwrap_err(),
            MapError::SectionOutOfRange { index: 3, .. }
        ));
    }

    #[test]
    fn obj_round_trip_preserves_triangle_metadata() {
        let mesh = sample_mesh();
        let obj = mesh.to_obj(4096, 8192);
        let imported = mesh.from_obj(&obj, 4096, 8192).unwrap();
        assert_eq!(imported.vertices, mesh.vertices);
        assert_eq!(imported.normals, mesh.normals);
        assert_eq!(imported.triangles, mesh.triangles);
    }

    #[test]
    fn obj_import_defaults_metadata_for_new_triangles() {
        let mesh = sample_mesh();
        let obj = "v 0.0 0.0 0.0\nv 1.0 0.0 0.0\nv 0.0 0.0 1.0\nf 1 2 3\n";
        let imported = mesh.from_obj(obj, 0, 0).unwrap();
        assert_eq!(imported.triangles.len(), 1);
        assert_eq!(imported.triangles[0].texture, 0);
        assert_eq!(imported.triangles[0].terrain_type, 0);
    }

    #[test]
    fn untextured_faces_omit_uv_references() {
        let mesh = sample_mesh();
        let obj = mesh.to_obj(0, 0);
        assert!(obj.contains("f 2//2 4//4 3//3"));
    }

    #[test]
    fn resolver_redirects_enabled_alternates() {
        let mut resolver = SectionResolver::new(WorldMapKind::Overworld);
        assert_eq!(resolver.storage_section(50).unwrap(), 50);
        resolver.set_alternate_enabled(0, true);
        assert_eq!(resolver.storage_section(50).unwrap(), 63);
        assert_eq!(resolver.storage_section(41).unwrap(), 41);
        resolver.set_alternate_enabled(5, true);
        assert_eq!(resolver.storage_section(48).unwrap(), 68);
        resolver.set_alternate_enabled(0, false);
        assert_eq!(resolver.storage_section(50).unwrap(), 50);
    }

    #[test]
    fn resolver_maps_grid_cells_to_sections() {
        let resolver = SectionResolver::new(WorldMapKind::Overworld);
        assert_eq!(resolver.resolve_cell(0, 0).unwrap(), (0, 0));
        assert_eq!(resolver.resolve_cell(5, 6).unwrap(), (10, 6));
        assert_eq!(resolver.resolve_cell(27, 35).unwrap(), (62, 15));
        assert!(matches!(
            resolver.resolve_cell(28, 0).unwrap_err(),
            MapError::CellOutOfRange { .. }
        ));
    }

    #[test]
    fn smaller_maps_have_no_alternates() {
        let mut resolver = SectionResolver::new(WorldMapKind::Glacier);
        resolver.set_alternate_enabled(0, true);
        assert_eq!(resolver.storage_section(0).unwrap(), 0);
        assert_eq!(resolver.resolve_cell(7, 7).unwrap(), (3, 15));
    }
}
