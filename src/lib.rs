//! Koikatsu studio scene to MMD motion converter.
//!
//! A scene card is a PNG with the studio scene appended: the object tree,
//! the scene settings and an ExtensibleSaveFormat block. The timeline
//! plugin's animation in that block is retargeted onto MMD bones and written
//! as one VMD file per animated object.

pub mod binary;
pub mod bone_map;
pub mod convert;
pub mod error;
pub mod ext;
pub mod png;
pub mod scene;
pub mod timeline;
pub mod vmd;

#[cfg(test)]
mod test_fixture;

pub use convert::{
    convert_bytes, convert_file, write_scene_dump, ConversionReport, ConvertOptions, PluginStage,
    TimelineStage, WrittenMotion,
};
pub use error::{Error, Result};
