//! The BSPX `BRUSHLIST` lump.
//!
//! Engines that understand it trace boxes of any size against the original
//! brushes instead of the precomputed hulls. Only non-axial faces are
//! stored; the axial ones are implied by the brush bounds.

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::contents::{q1, ContentFlags};
use crate::{Brush, GamePolicy, Plane, PlaneTable};

/// Lump format version.
pub const BRUSHLIST_VERSION: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushListFace {
    pub normal: [f32; 3],
    pub dist: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrushListBrush {
    pub mins: [f32; 3],
    pub maxs: [f32; 3],
    pub contents: i16,
    pub faces: Vec<BrushListFace>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrushListModel {
    pub modelnum: i32,
    pub brushes: Vec<BrushListBrush>,
}

impl BrushListModel {
    pub fn num_faces(&self) -> usize {
        self.brushes.iter().map(|b| b.faces.len()).sum()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_i32::<LittleEndian>(BRUSHLIST_VERSION)?;
        writer.write_i32::<LittleEndian>(self.modelnum)?;
        writer.write_i32::<LittleEndian>(count(self.brushes.len(), "brushes")?)?;
        writer.write_i32::<LittleEndian>(count(self.num_faces(), "faces")?)?;

        for brush in &self.brushes {
            for v in brush.mins.iter().chain(&brush.maxs) {
                writer.write_f32::<LittleEndian>(*v)?;
            }
            writer.write_i16::<LittleEndian>(brush.contents)?;
            writer.write_u16::<LittleEndian>(count(brush.faces.len(), "brush faces")?)?;

            for face in &brush.faces {
                for v in &face.normal {
                    writer.write_f32::<LittleEndian>(*v)?;
                }
                writer.write_f32::<LittleEndian>(face.dist)?;
            }
        }
        Ok(())
    }
}

fn count<T: TryFrom<usize>>(n: usize, what: &str) -> io::Result<T> {
    T::try_from(n).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{n} {what} do not fit in the brush list lump"),
        )
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrushListLump {
    models: Vec<BrushListModel>,
}

fn is_axial(plane: &Plane) -> bool {
    plane.normal().iter().any(|c| c.abs() == 1.0)
}

/// Contents value understood by the engine.
fn engine_contents(policy: &dyn GamePolicy, contents: &ContentFlags) -> i16 {
    if policy.is_clip(contents) {
        return q1::CONTENTS_CLIP as i16;
    }
    match contents.native {
        q1::CONTENTS_EMPTY
        | q1::CONTENTS_SOLID
        | q1::CONTENTS_WATER
        | q1::CONTENTS_SLIME
        | q1::CONTENTS_LAVA
        | q1::CONTENTS_SKY => contents.native as i16,
        _ => {
            log::warn!(
                "Unknown contents: {}. Translating to solid.",
                policy.contents_to_string(contents)
            );
            q1::CONTENTS_SOLID as i16
        }
    }
}

fn to_f32(v: impl IntoIterator<Item = f64>) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (o, v) in out.iter_mut().zip(v) {
        *o = v as f32;
    }
    out
}

impl BrushListLump {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn models(&self) -> &[BrushListModel] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Appends the brushes of one model.
    pub fn add_model(&mut self, modelnum: i32, brushes: &[Brush], planes: &PlaneTable, policy: &dyn GamePolicy) {
        let brushes = brushes
            .iter()
            .map(|brush| {
                let faces = brush
                    .sides
                    .iter()
                    .map(|side| planes.get_plane(side.plane_num))
                    .filter(|plane| !is_axial(plane))
                    .map(|plane| BrushListFace {
                        normal: to_f32(plane.normal().iter().copied()),
                        dist: plane.dist() as f32,
                    })
                    .collect();

                BrushListBrush {
                    mins: to_f32(brush.bounds.mins.iter().copied()),
                    maxs: to_f32(brush.bounds.maxs.iter().copied()),
                    contents: engine_contents(policy, &brush.contents),
                    faces,
                }
            })
            .collect();

        self.models.push(BrushListModel { modelnum, brushes });
    }

    /// Writes every model back to back, little-endian.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for model in &self.models {
            model.write_to(writer)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }
}
