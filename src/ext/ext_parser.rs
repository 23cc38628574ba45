use std::collections::BTreeMap;
use std::io::{Read, Seek};

use rmpv::Value;
use tracing::{debug, info, warn};

use crate::binary::BinaryReader;
use crate::error::{Error, Result};
use crate::ext::ext_struct::{ExtendedPayload, FieldError, PluginRecord, PluginValue};

pub const EXT_MARKER: &str = "KKEx";
pub const TIMELINE_PLUGIN: &str = "timeline";
pub const TIMELINE_FIELD: &str = "sceneInfo";

/// Outcome of reading the extended save block.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtStage {
    /// No bytes left after the scene data.
    NotPresent,
    /// Something other than the extended block follows the scene data.
    MarkerMismatch { expected: &'static str, found: String },
    Extracted(ExtendedPayload),
}

/// Where the timeline XML lookup ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineLookup<'a> {
    PluginMissing,
    FieldUnavailable { version: i32, reason: FieldError },
    Found { version: i32, xml: &'a str },
}

/// Reads the marker, version, length and plugin map of the extended block.
pub fn ext_parse<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<ExtStage> {
    if !br.has_remaining()? {
        debug!("No extended data after the scene");
        return Ok(ExtStage::NotPresent);
    }

    let start = br.position()?;
    let marker = br
        .read_net_string()
        .map_err(|e| Error::from(e).at("extended data marker", start))?;
    if marker != EXT_MARKER {
        warn!(
            "Extended data marker mismatch: expected '{}', found '{}'",
            EXT_MARKER, marker
        );
        return Ok(ExtStage::MarkerMismatch {
            expected: EXT_MARKER,
            found: marker,
        });
    }

    let version = br.read_i32().map_err(|e| Error::from(e).at("extended data header", start))?;
    let length = br.read_i32().map_err(|e| Error::from(e).at("extended data header", start))?;
    if length < 0 {
        return Err(Error::InvalidLength {
            context: "extended data",
            length: length as i64,
        });
    }
    let data = br
        .read_vec(length as usize)
        .map_err(|e| Error::from(e).at("extended data payload", start))?;

    let plugins = ext_decode_plugins(&data)?;
    info!(
        "Extended data v{}: {} plugins ({})",
        version,
        plugins.len(),
        plugins
            .iter()
            .map(|(id, _)| id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(ExtStage::Extracted(ExtendedPayload {
        marker,
        version,
        plugins,
    }))
}

/// Decodes the MessagePack map of plugin id to `[version, fields]`.
pub fn ext_decode_plugins(data: &[u8]) -> Result<Vec<(String, PluginRecord)>> {
    let mut rd = data;
    let entries = match rmpv::decode::read_value(&mut rd)? {
        Value::Map(entries) => entries,
        other => {
            return Err(Error::PluginShape(format!(
                "expected a map of plugins, found {}",
                other
            )))
        }
    };

    let mut plugins: Vec<(String, PluginRecord)> = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let id = match key.as_str() {
            Some(id) => id.to_string(),
            None => return Err(Error::PluginShape(format!("plugin id {} is not a string", key))),
        };
        let record = decode_record(&id, value)?;
        match plugins.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => slot.1 = record,
            None => plugins.push((id, record)),
        }
    }
    Ok(plugins)
}

fn decode_record(id: &str, value: Value) -> Result<PluginRecord> {
    let (version, data) = match value {
        Value::Nil => return Ok(PluginRecord::default()),
        Value::Array(mut items) => {
            let data = if items.len() > 1 {
                items.swap_remove(1)
            } else {
                Value::Nil
            };
            (items.first().and_then(Value::as_i64).unwrap_or(0), data)
        }
        Value::Map(entries) => {
            let mut version = 0;
            let mut data = Value::Nil;
            for (k, v) in entries {
                match k.as_str() {
                    Some("version") => version = v.as_i64().unwrap_or(0),
                    Some("data") => data = v,
                    _ => {}
                }
            }
            (version, data)
        }
        other => {
            return Err(Error::PluginShape(format!(
                "plugin '{}' record is {}, expected [version, data]",
                id, other
            )))
        }
    };

    let fields = match convert_value(data) {
        PluginValue::Nil => BTreeMap::new(),
        PluginValue::Map(fields) => fields,
        other => {
            return Err(Error::PluginShape(format!(
                "plugin '{}' data is {}, expected a map",
                id,
                other.type_name()
            )))
        }
    };

    Ok(PluginRecord {
        version: version as i32,
        fields,
    })
}

fn convert_value(value: Value) -> PluginValue {
    match value {
        Value::Nil => PluginValue::Nil,
        Value::Boolean(b) => PluginValue::Bool(b),
        Value::Integer(i) => match i.as_i64() {
            Some(v) => PluginValue::Int(v),
            None => PluginValue::Float(i.as_f64().unwrap_or_default()),
        },
        Value::F32(f) => PluginValue::Float(f as f64),
        Value::F64(f) => PluginValue::Float(f),
        Value::String(s) => match s.as_str() {
            Some(text) => PluginValue::Str(text.to_string()),
            None => PluginValue::Bytes(s.as_bytes().to_vec()),
        },
        Value::Binary(bytes) => PluginValue::Bytes(bytes),
        Value::Array(items) => PluginValue::Array(items.into_iter().map(convert_value).collect()),
        Value::Map(entries) => PluginValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (map_key(&k), convert_value(v)))
                .collect(),
        ),
        Value::Ext(_, bytes) => PluginValue::Bytes(bytes),
    }
}

fn map_key(key: &Value) -> String {
    match key.as_str() {
        Some(s) => s.to_string(),
        None => key.to_string(),
    }
}

/// Finds the timeline plugin and its XML scene document.
pub fn ext_timeline_xml(payload: &ExtendedPayload) -> TimelineLookup<'_> {
    let Some(record) = payload.plugin(TIMELINE_PLUGIN) else {
        return TimelineLookup::PluginMissing;
    };
    match record.str_field(TIMELINE_FIELD) {
        Ok(xml) => TimelineLookup::Found {
            version: record.version,
            xml,
        },
        Err(reason) => TimelineLookup::FieldUnavailable {
            version: record.version,
            reason,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::Endian;
    use crate::test_fixture::*;
    use std::io::Cursor;

    fn reader(bytes: Vec<u8>) -> BinaryReader<Cursor<Vec<u8>>> {
        BinaryReader::new(Cursor::new(bytes), Endian::Little)
    }

    fn extracted(stage: ExtStage) -> ExtendedPayload {
        match stage {
            ExtStage::Extracted(payload) => payload,
            other => panic!("expected extracted payload, got {:?}", other),
        }
    }

    #[test]
    fn extracts_timeline_xml_and_keeps_unknown_plugins() -> Result<()> {
        let plugins = Value::Map(vec![
            (
                Value::from("KKPE"),
                Value::Array(vec![Value::from(2), Value::Map(vec![])]),
            ),
            timeline_plugin_entry("<root />"),
            (Value::from("com.example.mystery"), Value::Nil),
        ]);
        let payload = extracted(ext_parse(&mut reader(kkex_block(&plugins)))?);

        assert_eq!(payload.marker, "KKEx");
        assert_eq!(
            payload.plugin_ids().collect::<Vec<_>>(),
            vec!["KKPE", "timeline", "com.example.mystery"]
        );
        assert_eq!(payload.plugin("KKPE").map(|p| p.version), Some(2));
        assert_eq!(
            ext_timeline_xml(&payload),
            TimelineLookup::Found {
                version: 1,
                xml: "<root />"
            }
        );
        Ok(())
    }

    #[test]
    fn marker_mismatch_is_an_outcome() -> Result<()> {
        let mut bytes = Vec::new();
        bytes.push(4);
        bytes.extend_from_slice(b"ABCD");
        bytes.extend_from_slice(&[0; 8]);
        let stage = ext_parse(&mut reader(bytes))?;
        assert_eq!(
            stage,
            ExtStage::MarkerMismatch {
                expected: "KKEx",
                found: "ABCD".into()
            }
        );
        Ok(())
    }

    #[test]
    fn nothing_after_scene_is_not_present() -> Result<()> {
        assert_eq!(ext_parse(&mut reader(Vec::new()))?, ExtStage::NotPresent);
        Ok(())
    }

    #[test]
    fn timeline_without_xml_field() -> Result<()> {
        let plugins = Value::Map(vec![(
            Value::from("timeline"),
            Value::Array(vec![
                Value::from(3),
                Value::Map(vec![(Value::from("sceneInfo"), Value::from(12))]),
            ]),
        )]);
        let payload = extracted(ext_parse(&mut reader(kkex_block(&plugins)))?);
        assert!(matches!(
            ext_timeline_xml(&payload),
            TimelineLookup::FieldUnavailable {
                version: 3,
                reason: FieldError::WrongType { .. }
            }
        ));
        Ok(())
    }

    #[test]
    fn missing_timeline_plugin() -> Result<()> {
        let plugins = Value::Map(vec![]);
        let payload = extracted(ext_parse(&mut reader(kkex_block(&plugins)))?);
        assert_eq!(ext_timeline_xml(&payload), TimelineLookup::PluginMissing);
        Ok(())
    }

    #[test]
    fn map_shaped_records_are_accepted() -> Result<()> {
        let data = encode_value(&Value::Map(vec![(
            Value::from("timeline"),
            Value::Map(vec![
                (Value::from("version"), Value::from(4)),
                (
                    Value::from("data"),
                    Value::Map(vec![
                        (Value::from("sceneInfo"), Value::from("<root/>")),
                        (Value::from(7), Value::Boolean(true)),
                    ]),
                ),
            ]),
        )]));
        let plugins = ext_decode_plugins(&data)?;
        assert_eq!(plugins[0].1.version, 4);
        assert_eq!(plugins[0].1.field("7"), Some(&PluginValue::Bool(true)));
        Ok(())
    }

    #[test]
    fn non_map_payload_is_a_shape_error() {
        let data = encode_value(&Value::from(5));
        assert!(matches!(
            ext_decode_plugins(&data),
            Err(Error::PluginShape(_))
        ));
    }

    #[test]
    fn short_payload_is_an_error() {
        let mut bytes = kkex_block(&Value::Map(vec![timeline_plugin_entry("<root/>")]));
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            ext_parse(&mut reader(bytes)),
            Err(Error::UnexpectedEof { .. })
        ));
    }
}
