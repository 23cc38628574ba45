//! Builders for synthetic scene containers used across the unit tests.

use std::io::Cursor;

use rmpv::Value;

use crate::binary::{BinaryWriter, Endian};

type Writer = BinaryWriter<Cursor<Vec<u8>>>;

pub(crate) fn build(f: impl FnOnce(&mut Writer) -> std::io::Result<()>) -> Vec<u8> {
    let mut bw = BinaryWriter::new(Cursor::new(Vec::new()), Endian::Little);
    f(&mut bw).unwrap();
    bw.into_inner().unwrap().into_inner()
}

fn write_base(bw: &mut Writer, kind: i32) -> std::io::Result<()> {
    bw.write_i32(kind)?;
    bw.write_i32(100 + kind)?; // internal key
    for v in [0.0, 1.0, 2.0, 0.0, 90.0, 0.0, 1.0, 1.0, 1.0] {
        bw.write_f32(v)?;
    }
    bw.write_i32(0)?; // tree state
    bw.write_bool(true)
}

fn write_pattern(bw: &mut Writer) -> std::io::Result<()> {
    bw.write_i32(0)?;
    bw.write_net_string("pattern")?;
    bw.write_bool(false)?;
    bw.write_net_string("0,0,1,1")?;
    bw.write_f32(0.0)
}

fn write_bone_info(bw: &mut Writer, id: i32) -> std::io::Result<()> {
    bw.write_i32(id)?;
    bw.write_vec(&[0u8; 36])
}

pub(crate) fn folder_record(name: &str, children: &[Vec<u8>]) -> Vec<u8> {
    build(|bw| {
        write_base(bw, 3)?;
        bw.write_net_string(name)?;
        bw.write_i32(children.len() as i32)?;
        for child in children {
            bw.write_vec(child)?;
        }
        Ok(())
    })
}

pub(crate) fn item_record(children: &[Vec<u8>]) -> Vec<u8> {
    build(|bw| {
        write_base(bw, 1)?;
        bw.write_i32(0)?;
        bw.write_i32(1)?;
        bw.write_i32(42)?;
        bw.write_f32(1.0)?;
        for i in 0..8 {
            bw.write_net_string(&format!("color{i}"))?;
        }
        for _ in 0..3 {
            write_pattern(bw)?;
        }
        bw.write_f32(1.0)?; // alpha
        bw.write_net_string("line")?;
        bw.write_f32(0.5)?;
        bw.write_net_string("emission")?;
        bw.write_f32(0.0)?;
        bw.write_f32(0.0)?;
        write_pattern(bw)?;
        bw.write_bool(true)?; // fk
        bw.write_i32(2)?;
        for name in ["root", "tip"] {
            bw.write_net_string(name)?;
            write_bone_info(bw, 0)?;
        }
        bw.write_bool(false)?;
        bw.write_f32(0.25)?;
        bw.write_i32(children.len() as i32)?;
        for child in children {
            bw.write_vec(child)?;
        }
        Ok(())
    })
}

pub(crate) fn character_record(attachments: &[(i32, Vec<Vec<u8>>)]) -> Vec<u8> {
    build(|bw| {
        write_base(bw, 0)?;
        bw.write_i32(1)?; // sex
        // character card
        bw.write_i32(100)?;
        bw.write_net_string("【KoiKatuChara】")?;
        bw.write_net_string("0.0.0")?;
        bw.write_i32(3)?;
        bw.write_vec(&[1, 2, 3])?;
        bw.write_i32(0)?;
        bw.write_i64(2)?;
        bw.write_vec(&[9, 9])?;
        // fk and ik dictionaries
        bw.write_i32(2)?;
        for key in [0, 1] {
            bw.write_i32(key)?;
            write_bone_info(bw, key)?;
        }
        bw.write_i32(1)?;
        bw.write_i32(5)?;
        write_bone_info(bw, 5)?;
        // attachments
        bw.write_i32(attachments.len() as i32)?;
        for (parent_key, children) in attachments {
            bw.write_i32(*parent_key)?;
            bw.write_i32(children.len() as i32)?;
            for child in children {
                bw.write_vec(child)?;
            }
        }
        // tail
        for _ in 0..6 {
            bw.write_i32(0)?;
        }
        bw.write_f32(1.0)?;
        bw.write_vec(&[0u8; 5])?;
        bw.write_f32(0.0)?;
        bw.write_bool(false)?;
        write_bone_info(bw, 0)?;
        bw.write_bool(false)?;
        bw.write_vec(&[0u8; 5])?;
        bw.write_bool(false)?;
        bw.write_vec(&[0u8; 7])?;
        bw.write_vec(&[0u8; 8])?;
        bw.write_f32(0.0)?;
        bw.write_f32(0.0)?;
        bw.write_bool(false)?;
        bw.write_bool(true)?;
        bw.write_i32(2)?; // voice entries
        bw.write_vec(&[0u8; 24])?;
        bw.write_i32(0)?;
        bw.write_bool(false)?;
        bw.write_f32(1.0)?;
        bw.write_bool(false)?;
        bw.write_net_string("")?;
        bw.write_f32(0.0)?;
        bw.write_f32(0.0)?;
        bw.write_i32(4)?;
        bw.write_vec(&[0u8; 4])?;
        bw.write_i32(0)?;
        bw.write_f32(0.0)?;
        bw.write_i32(1)?;
        bw.write_vec(&[0u8; 8])?;
        bw.write_i32(0)
    })
}

/// Kind, internal key and base block of an object kind without a known body.
pub(crate) fn unsupported_record(kind: i32) -> Vec<u8> {
    build(|bw| write_base(bw, kind))
}

pub(crate) fn scene_bytes(version: &str, roots: &[(i32, Vec<u8>)]) -> Vec<u8> {
    build(|bw| {
        bw.write_net_string(version)?;
        bw.write_i32(roots.len() as i32)?;
        for (key, record) in roots {
            bw.write_i32(*key)?;
            bw.write_vec(record)?;
        }
        Ok(())
    })
}

fn write_camera(bw: &mut Writer, version: i32) -> std::io::Result<()> {
    bw.write_i32(version)?;
    for _ in 0..6 {
        bw.write_f32(0.0)?;
    }
    if version == 1 {
        bw.write_f32(-3.0)?;
    } else {
        for _ in 0..3 {
            bw.write_f32(-3.0)?;
        }
    }
    bw.write_f32(23.0)
}

/// Scene settings including the trailing end tag.
pub(crate) fn settings_block() -> Vec<u8> {
    build(|bw| {
        bw.write_i32(-1)?;
        for _ in 0..9 {
            bw.write_f32(0.0)?;
        }
        bw.write_i32(0)?;
        bw.write_bool(false)?;
        bw.write_i32(0)?;
        bw.write_f32(0.0)?;
        bw.write_bool(true)?;
        bw.write_net_string("aoe")?;
        bw.write_f32(0.1)?;
        bw.write_bool(true)?;
        for _ in 0..3 {
            bw.write_f32(0.5)?;
        }
        bw.write_bool(false)?;
        bw.write_f32(0.0)?;
        bw.write_f32(0.0)?;
        bw.write_bool(false)?;
        bw.write_bool(false)?;
        bw.write_net_string("fog")?;
        bw.write_f32(0.0)?;
        bw.write_f32(0.0)?;
        bw.write_bool(false)?;
        bw.write_net_string("sun")?;
        bw.write_net_string("sun2")?;
        bw.write_i32(-1)?;
        bw.write_bool(true)?;
        bw.write_bool(true)?;
        bw.write_bool(true)?;
        bw.write_f32(0.0)?;
        bw.write_net_string("ambient")?;
        bw.write_f32(1.0)?;
        bw.write_i32(0)?;
        bw.write_f32(0.0)?;
        write_camera(bw, 2)?;
        for i in 0..10 {
            write_camera(bw, if i % 2 == 0 { 1 } else { 2 })?;
        }
        bw.write_net_string("chara light")?;
        for _ in 0..3 {
            bw.write_f32(1.0)?;
        }
        bw.write_bool(true)?;
        bw.write_net_string("map light")?;
        for _ in 0..3 {
            bw.write_f32(1.0)?;
        }
        bw.write_bool(true)?;
        bw.write_i32(1)?;
        for _ in 0..2 {
            bw.write_bool(false)?;
            bw.write_i32(0)?;
            bw.write_i32(0)?;
        }
        bw.write_bool(false)?;
        bw.write_i32(0)?;
        bw.write_net_string("")?;
        bw.write_net_string("")?;
        bw.write_net_string("")?;
        bw.write_net_string("【KStudio】")
    })
}

pub(crate) fn encode_value(value: &Value) -> Vec<u8> {
    let mut data = Vec::new();
    rmpv::encode::write_value(&mut data, value).unwrap();
    data
}

pub(crate) fn kkex_block(plugins: &Value) -> Vec<u8> {
    let data = encode_value(plugins);
    build(|bw| {
        bw.write_net_string("KKEx")?;
        bw.write_i32(3)?;
        bw.write_i32(data.len() as i32)?;
        bw.write_vec(&data)
    })
}

pub(crate) fn timeline_plugin_entry(xml: &str) -> (Value, Value) {
    (
        Value::from("timeline"),
        Value::Array(vec![
            Value::from(1),
            Value::Map(vec![(Value::from("sceneInfo"), Value::from(xml))]),
        ]),
    )
}
