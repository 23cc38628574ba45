use std::io::{Read, Seek};

use tracing::{debug, warn};

use crate::binary::BinaryReader;
use crate::error::{Error, Result};
use crate::scene::scene_struct::{
    Attachment, CharacterInfo, FolderInfo, ItemInfo, ObjectKind, ObjectPayload, ObjectTree,
    SceneObject, UnsupportedKind,
};
use crate::scene::scene_util::{
    scene_read_base, scene_read_chara_file, scene_skip_bone_dictionary, scene_skip_bone_info,
    scene_skip_int_pairs, scene_skip_pattern_info, scene_skip_settings, scene_skip_voice_ctrl,
    EXT_MARKER_PREFIX,
};

const ITEM_STRING_COUNT: usize = 8;
const ITEM_PATTERN_COUNT: usize = 3;
const CHARA_TAIL_INT_COUNT: usize = 6;

/// Outcome of the scene settings skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSkip {
    /// Nothing left, or the extended block follows the object list directly.
    Absent,
    Skipped { len: u64 },
}

/// Parses the scene version, the root object list and every nested object.
///
/// An unsupported object kind stops the walk; the roots parsed before it are
/// returned with `incomplete` set. Running out of data is an error.
pub fn scene_parse<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<ObjectTree> {
    let start = br.position()?;
    let version = br
        .read_net_string()
        .map_err(|e| Error::from(e).at("scene version", start))?;
    let declared_roots = br
        .read_count()
        .map_err(|e| Error::from(e).at("root object count", start))?;
    debug!("Scene version '{}', {} root objects", version, declared_roots);

    let mut tree = ObjectTree {
        version,
        declared_roots,
        ..Default::default()
    };

    for index in 0..declared_roots {
        let root_start = br.position()?;
        let parsed = br
            .read_i32()
            .map_err(Error::from)
            .and_then(|key| scene_read_object(br, 0, key));
        match parsed {
            Ok(object) => tree.roots.push(object),
            Err(Error::UnsupportedObjectKind { kind, position }) => {
                warn!(
                    "Object walk stopped at root {} of {}: unsupported kind {} at byte {}",
                    index + 1,
                    declared_roots,
                    kind,
                    position
                );
                tree.incomplete = true;
                tree.unsupported = Some(UnsupportedKind { kind, position });
                break;
            }
            Err(e) => return Err(e.at("root object", root_start)),
        }
    }

    tree.end_position = br.position()?;
    debug!(
        "Object list done: {} objects, cursor at {}",
        tree.object_count(),
        tree.end_position
    );
    Ok(tree)
}

/// Reads one object record and, recursively, all the children it declares.
pub fn scene_read_object<R: Read + Seek>(
    br: &mut BinaryReader<R>,
    depth: usize,
    key: i32,
) -> Result<SceneObject> {
    let offset = br.position()?;
    let kind_code = br.read_i32()?;
    let internal_key = br.read_i32()?;
    let kind = ObjectKind::try_from(kind_code).map_err(|kind| Error::UnsupportedObjectKind {
        kind,
        position: offset,
    })?;
    let base = scene_read_base(br)?;
    debug!(
        "{:indent$}{:?} key={} internal_key={} at {}",
        "",
        kind,
        key,
        internal_key,
        offset,
        indent = depth * 2
    );

    let mut children = Vec::new();
    let payload = match kind {
        ObjectKind::Character => {
            ObjectPayload::Character(read_character(br, depth, &mut children)?)
        }
        ObjectKind::Item => ObjectPayload::Item(read_item(br, depth, &mut children)?),
        ObjectKind::Folder => ObjectPayload::Folder(read_folder(br, depth, &mut children)?),
    };

    Ok(SceneObject {
        key,
        internal_key,
        base,
        payload,
        children,
        offset,
        byte_len: br.position()? - offset,
    })
}

fn read_children<R: Read + Seek>(
    br: &mut BinaryReader<R>,
    depth: usize,
    count: usize,
    children: &mut Vec<SceneObject>,
) -> Result<()> {
    for _ in 0..count {
        children.push(scene_read_object(br, depth + 1, -1)?);
    }
    Ok(())
}

fn read_folder<R: Read + Seek>(
    br: &mut BinaryReader<R>,
    depth: usize,
    children: &mut Vec<SceneObject>,
) -> Result<FolderInfo> {
    let name = br.read_net_string()?;
    let child_count = br.read_count()?;
    read_children(br, depth, child_count, children)?;
    Ok(FolderInfo { name })
}

fn read_item<R: Read + Seek>(
    br: &mut BinaryReader<R>,
    depth: usize,
    children: &mut Vec<SceneObject>,
) -> Result<ItemInfo> {
    let mut item = ItemInfo {
        group: br.read_i32()?,
        category: br.read_i32()?,
        no: br.read_i32()?,
        anime_speed: br.read_f32()?,
        ..Default::default()
    };
    for _ in 0..ITEM_STRING_COUNT {
        br.read_net_string()?; // colors, pattern paths
    }
    for _ in 0..ITEM_PATTERN_COUNT {
        scene_skip_pattern_info(br)?;
    }
    item.alpha = br.read_f32()?;
    br.read_net_string()?; // line color
    item.line_width = br.read_f32()?;
    br.read_net_string()?; // emission color
    item.emission_power = br.read_f32()?;
    item.light_cancel = br.read_f32()?;
    scene_skip_pattern_info(br)?; // panel
    item.enable_fk = br.read_bool()?;

    let bone_count = br.read_count()?;
    for _ in 0..bone_count {
        item.bone_names.push(br.read_net_string()?);
        scene_skip_bone_info(br)?;
    }
    item.enable_dynamic_bone = br.read_bool()?;
    item.anime_normalized_time = br.read_f32()?;

    let child_count = br.read_count()?;
    read_children(br, depth, child_count, children)?;
    Ok(item)
}

fn read_character<R: Read + Seek>(
    br: &mut BinaryReader<R>,
    depth: usize,
    children: &mut Vec<SceneObject>,
) -> Result<CharacterInfo> {
    let sex = br.read_i32()?;
    let (product_no, card_marker, card_version) = scene_read_chara_file(br)?;
    let fk_bone_count = scene_skip_bone_dictionary(br)?;
    let ik_target_count = scene_skip_bone_dictionary(br)?;

    let pair_count = br.read_count()?;
    let mut attachments = Vec::with_capacity(pair_count.min(64));
    for _ in 0..pair_count {
        let parent_key = br.read_i32()?;
        let child_count = br.read_count()?;
        read_children(br, depth, child_count, children)?;
        attachments.push(Attachment {
            parent_key,
            child_count,
        });
    }

    skip_character_tail(br)?;

    Ok(CharacterInfo {
        sex,
        product_no,
        card_marker,
        card_version,
        fk_bone_count,
        ik_target_count,
        attachments,
    })
}

/// Pose, animation, hand, mouth, eye and voice state of a character. None of
/// it feeds the export.
fn skip_character_tail<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<()> {
    for _ in 0..CHARA_TAIL_INT_COUNT {
        br.read_i32()?;
    }
    br.read_f32()?;
    br.skip(5)?;
    br.read_f32()?;
    br.read_bool()?;
    scene_skip_bone_info(br)?;
    br.read_bool()?;
    br.skip(5)?;
    br.read_bool()?;
    br.skip(7)?;
    br.skip(8)?;
    br.read_f32()?;
    br.read_f32()?;
    br.read_bool()?;
    br.read_bool()?;
    scene_skip_voice_ctrl(br)?;
    br.read_bool()?;
    br.read_f32()?;
    br.read_bool()?;
    br.read_net_string()?;
    br.read_f32()?;
    br.read_f32()?;
    br.skip_i32_block()?; // neck look data
    br.skip_i32_block()?; // eyes look data
    br.read_f32()?;
    scene_skip_int_pairs(br)?;
    scene_skip_int_pairs(br)?;
    Ok(())
}

/// Skips the scene settings block when one sits between the object list and
/// the extended data.
pub fn scene_skip_settings_block<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<SettingsSkip> {
    let start = br.position()?;
    if !br.has_remaining()? || br.peek_matches(EXT_MARKER_PREFIX)? {
        return Ok(SettingsSkip::Absent);
    }
    scene_skip_settings(br).map_err(|e| Error::from(e).at("scene settings", start))?;
    let len = br.position()? - start;
    debug!("Skipped {} bytes of scene settings", len);
    Ok(SettingsSkip::Skipped { len })
}
