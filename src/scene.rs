//! Studio scene object tree.
//!
//! A scene file is a PNG thumbnail followed by the scene version, the root
//! object list and the scene settings. Every object record starts with its
//! kind and internal key, then the transform block, then a kind-specific
//! body that may itself contain child records. All of it has to be walked
//! byte-exactly to reach the extended data behind it.

pub mod scene_parser;
pub mod scene_struct;
pub(crate) mod scene_util;

pub use scene_parser::{scene_parse, scene_skip_settings_block, SettingsSkip};
pub use scene_struct::{ObjectKind, ObjectPayload, ObjectTree, SceneObject};
