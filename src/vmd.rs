//! VMD (Vocaloid Motion Data) writer.
//!
//! Only bone keyframes are written. The morph, camera, light, self-shadow and
//! IK sections follow as empty lists.

use std::fs::File;
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};

use encoding_rs::SHIFT_JIS;
use glam::{Quat, Vec3};

use crate::binary::{BinaryWriter, Endian};

pub const VMD_SIGNATURE: &str = "Vocaloid Motion Data 0002";
pub const DEFAULT_MODEL_NAME: &str = "Koikatsu Export";
pub const VMD_EXTENSION: &str = "vmd";

const SIGNATURE_LEN: usize = 30;
const MODEL_NAME_LEN: usize = 20;
const BONE_NAME_LEN: usize = 15;
/// Morph, camera, light, self-shadow and IK-toggle sections.
const EMPTY_SECTION_COUNT: usize = 5;

/// Linear-ish bezier handles shared by every bone keyframe.
pub const DEFAULT_INTERPOLATION: [u8; 64] = [
    20, 20, 0, 0, 107, 107, 107, 107, 20, 20, 20, 20, 107, 107, 107, 107, //
    20, 20, 20, 107, 107, 107, 107, 20, 20, 20, 20, 107, 107, 107, 107, 0, //
    20, 20, 107, 107, 107, 107, 20, 20, 20, 20, 107, 107, 107, 107, 0, 0, //
    20, 107, 107, 107, 107, 20, 20, 20, 20, 107, 107, 107, 107, 0, 0, 0,
];

/// A fully resolved bone keyframe.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionFrame {
    pub bone_name: String,
    pub frame_number: u32,
    pub position: Vec3,
    pub rotation: Quat,
    pub interpolation: &'static [u8; 64],
}

impl MotionFrame {
    pub fn new(bone_name: &str, frame_number: u32, position: Vec3, rotation: Quat) -> Self {
        Self {
            bone_name: bone_name.to_string(),
            frame_number,
            position,
            rotation,
            interpolation: &DEFAULT_INTERPOLATION,
        }
    }

    pub fn write_to<W: Write + Seek>(&self, bw: &mut BinaryWriter<W>) -> io::Result<()> {
        bw.write_fixed(&encode_sjis(&self.bone_name), BONE_NAME_LEN)?;
        bw.write_u32(self.frame_number)?;
        bw.write_f32(self.position.x)?;
        bw.write_f32(self.position.y)?;
        bw.write_f32(self.position.z)?;
        bw.write_f32(self.rotation.x)?;
        bw.write_f32(self.rotation.y)?;
        bw.write_f32(self.rotation.z)?;
        bw.write_f32(self.rotation.w)?;
        bw.write_vec(self.interpolation)
    }
}

/// One motion file: a model name and its ordered bone keyframes.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionFile {
    pub model_name: String,
    pub frames: Vec<MotionFrame>,
}

impl MotionFile {
    pub fn new(model_name: &str, frames: Vec<MotionFrame>) -> Self {
        Self {
            model_name: model_name.to_string(),
            frames,
        }
    }

    pub fn write_to<W: Write + Seek>(&self, bw: &mut BinaryWriter<W>) -> io::Result<()> {
        bw.write_fixed(&encode_sjis(VMD_SIGNATURE), SIGNATURE_LEN)?;
        bw.write_fixed(&encode_sjis(&self.model_name), MODEL_NAME_LEN)?;
        bw.write_i32(self.frames.len() as i32)?;
        for frame in &self.frames {
            frame.write_to(bw)?;
        }
        for _ in 0..EMPTY_SECTION_COUNT {
            bw.write_i32(0)?;
        }
        bw.flush()
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        let mut bw = BinaryWriter::new(file, Endian::Little);
        self.write_to(&mut bw)?;
        bw.into_inner()?.sync_all()
    }
}

/// Encodes `text` as Shift_JIS. Characters without a mapping become
/// numeric character references, as encoding_rs does for legacy encoders.
pub fn encode_sjis(text: &str) -> Vec<u8> {
    let (bytes, _, _) = SHIFT_JIS.encode(text);
    bytes.into_owned()
}

/// `<dir>/<stem>_<object index>.vmd`. Path separators in the index are
/// replaced so the file always lands in `dir`.
pub fn motion_file_path(dir: &Path, stem: &str, object_index: &str) -> PathBuf {
    let index: String = object_index
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    dir.join(format!("{stem}_{index}.{VMD_EXTENSION}"))
}
