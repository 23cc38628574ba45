use std::io::{self, Read, Seek};

use crate::binary::BinaryReader;
use crate::scene::scene_struct::{ObjectBase, Transform};

/// Net-string encoding of the extended data marker.
pub(crate) const EXT_MARKER_PREFIX: &[u8] = b"\x04KKEx";

/// Bone state following the i32 bone id.
const BONE_INFO_BODY_LEN: u64 = 36;
const VOICE_ENTRY_LEN: u64 = 12;
const INT_PAIR_LEN: u64 = 8;
const BOOKMARK_CAMERAS: usize = 10;

pub(crate) fn scene_read_transform<R: Read + Seek>(
    br: &mut BinaryReader<R>,
) -> io::Result<Transform> {
    Ok(Transform {
        position: br.read_f32_triple()?.into(),
        rotation: br.read_f32_triple()?.into(),
        scale: br.read_f32_triple()?.into(),
    })
}

pub(crate) fn scene_read_base<R: Read + Seek>(br: &mut BinaryReader<R>) -> io::Result<ObjectBase> {
    Ok(ObjectBase {
        transform: scene_read_transform(br)?,
        tree_state: br.read_i32()?,
        visible: br.read_bool()?,
    })
}

pub(crate) fn scene_skip_pattern_info<R: Read + Seek>(br: &mut BinaryReader<R>) -> io::Result<()> {
    br.read_i32()?;
    br.read_net_string()?;
    br.read_bool()?;
    br.read_net_string()?;
    br.read_f32()?;
    Ok(())
}

pub(crate) fn scene_skip_bone_info<R: Read + Seek>(br: &mut BinaryReader<R>) -> io::Result<()> {
    br.read_i32()?;
    br.skip(BONE_INFO_BODY_LEN)
}

/// Skips an i32-keyed dictionary of bone-info records and returns its size.
pub(crate) fn scene_skip_bone_dictionary<R: Read + Seek>(
    br: &mut BinaryReader<R>,
) -> io::Result<usize> {
    let count = br.read_count()?;
    for _ in 0..count {
        br.read_i32()?;
        scene_skip_bone_info(br)?;
    }
    Ok(count)
}

pub(crate) fn scene_skip_int_pairs<R: Read + Seek>(br: &mut BinaryReader<R>) -> io::Result<()> {
    let count = br.read_count()? as u64;
    br.skip(count * INT_PAIR_LEN)
}

pub(crate) fn scene_skip_voice_ctrl<R: Read + Seek>(br: &mut BinaryReader<R>) -> io::Result<()> {
    let count = br.read_count()? as u64;
    br.skip(count * VOICE_ENTRY_LEN)?;
    br.read_i32()?;
    Ok(())
}

/// Character card embedded in a character record. Only the two header
/// strings are kept; the card's PNG, face and body blobs are skipped.
pub(crate) fn scene_read_chara_file<R: Read + Seek>(
    br: &mut BinaryReader<R>,
) -> io::Result<(i32, String, String)> {
    let product_no = br.read_i32()?;
    let marker = br.read_net_string()?;
    let version = br.read_net_string()?;
    br.skip_i32_block()?;
    br.skip_i32_block()?;
    br.skip_i64_block()?;
    Ok((product_no, marker, version))
}

fn scene_skip_camera<R: Read + Seek>(br: &mut BinaryReader<R>) -> io::Result<()> {
    let version = br.read_i32()?;
    br.read_f32_triple()?;
    br.read_f32_triple()?;
    if version == 1 {
        br.read_f32()?;
    } else {
        br.read_f32_triple()?;
    }
    br.read_f32()?;
    Ok(())
}

fn scene_skip_light<R: Read + Seek>(br: &mut BinaryReader<R>, has_type: bool) -> io::Result<()> {
    br.read_net_string()?;
    br.read_f32_triple()?;
    br.read_bool()?;
    if has_type {
        br.read_i32()?;
    }
    Ok(())
}

fn scene_skip_sound<R: Read + Seek>(
    br: &mut BinaryReader<R>,
    has_file_name: bool,
) -> io::Result<()> {
    br.read_bool()?;
    br.read_i32()?;
    if has_file_name {
        br.read_net_string()?;
    } else {
        br.read_i32()?;
    }
    Ok(())
}

/// Skips the scene settings block (map, post effects, cameras, lights,
/// sound) that sits between the object list and the extended data.
pub(crate) fn scene_skip_settings<R: Read + Seek>(br: &mut BinaryReader<R>) -> io::Result<()> {
    br.read_i32()?; // map
    scene_read_transform(br)?;
    br.read_i32()?; // sun light type
    br.read_bool()?; // map option
    br.read_i32()?; // ACE number
    br.read_f32()?; // ACE blend
    br.read_bool()?; // AOE
    br.read_net_string()?;
    br.read_f32()?;
    br.read_bool()?; // bloom
    br.read_f32_triple()?;
    br.read_bool()?; // depth of field
    br.read_f32()?;
    br.read_f32()?;
    br.read_bool()?; // vignette
    br.read_bool()?; // fog
    br.read_net_string()?;
    br.read_f32()?;
    br.read_f32()?;
    br.read_bool()?; // sun shafts
    br.read_net_string()?;
    br.read_net_string()?;
    br.read_i32()?; // sun caster
    br.read_bool()?; // shadows
    br.read_bool()?; // face normal
    br.read_bool()?; // face shadow
    br.read_f32()?;
    br.read_net_string()?;
    br.read_f32()?;
    br.read_i32()?; // ramp
    br.read_f32()?;

    scene_skip_camera(br)?;
    for _ in 0..BOOKMARK_CAMERAS {
        scene_skip_camera(br)?;
    }
    scene_skip_light(br, false)?;
    scene_skip_light(br, true)?;
    scene_skip_sound(br, false)?; // BGM
    scene_skip_sound(br, false)?; // environment
    scene_skip_sound(br, true)?; // outside sound

    br.read_net_string()?; // background
    br.read_net_string()?; // frame
    if br.has_remaining()? && !br.peek_matches(EXT_MARKER_PREFIX)? {
        br.read_net_string()?; // end tag
    }
    Ok(())
}
