//! Scene-to-motion pipeline.
//!
//! Image skip, object tree, scene settings, extended data, timeline compile
//! and finally one motion file per animated object index.

use std::fs::{self, File};
use std::io::{BufWriter, Cursor, SeekFrom};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::binary::{BinaryReader, Endian};
use crate::bone_map::BoneMap;
use crate::error::{Error, Result};
use crate::ext::{ext_parse, ext_timeline_xml, ExtStage, ExtendedPayload, TimelineLookup};
use crate::png::png_length;
use crate::scene::{scene_parse, scene_skip_settings_block, ObjectTree, SettingsSkip};
use crate::timeline::{
    compile, CompileOutcome, CompileSettings, CompileStats, CompiledTimeline, TimelineDocument,
};
use crate::vmd::{motion_file_path, MotionFile, DEFAULT_MODEL_NAME};

const SCENE_DUMP_SUFFIX: &str = "scene.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Model name written into every motion header.
    pub model_name: String,
    /// Where motion files go; defaults to the input file's directory.
    pub output_dir: Option<PathBuf>,
    /// Start of the scene data. Detected from the leading PNG when unset.
    pub image_offset: Option<u64>,
    pub skip_scene_settings: bool,
    pub fps: f32,
    pub position_scale: f32,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        let compile = CompileSettings::default();
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            output_dir: None,
            image_offset: None,
            skip_scene_settings: true,
            fps: compile.fps,
            position_scale: compile.position_scale,
        }
    }
}

impl ConvertOptions {
    fn compile_settings(&self) -> Result<CompileSettings> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(Error::InvalidInput(format!("frame rate {} must be positive", self.fps)));
        }
        if !self.position_scale.is_finite() {
            return Err(Error::InvalidInput(format!(
                "position scale {} is not a number",
                self.position_scale
            )));
        }
        Ok(CompileSettings {
            fps: self.fps,
            position_scale: self.position_scale,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PluginStage {
    /// The object walk was incomplete, so the block could not be located.
    Skipped,
    NotPresent,
    MarkerMismatch { expected: &'static str, found: String },
    /// The block was found but could not be read.
    Failed(String),
    Extracted(ExtendedPayload),
}

impl PluginStage {
    pub fn payload(&self) -> Option<&ExtendedPayload> {
        match self {
            PluginStage::Extracted(payload) => Some(payload),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimelineStage {
    Skipped,
    /// No timeline plugin, or its XML field is missing or not a string.
    NoAnimationData,
    InvalidXml(String),
    NothingToExport(CompileStats),
    Compiled(CompiledTimeline),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenMotion {
    pub path: PathBuf,
    pub object_index: String,
    pub frame_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    /// Bytes of leading image skipped before the scene data.
    pub image_len: u64,
    pub tree: ObjectTree,
    /// `None` when the skip was disabled or the walk was incomplete.
    pub settings: Option<SettingsSkip>,
    pub plugins: PluginStage,
    pub timeline: TimelineStage,
    pub written: Vec<WrittenMotion>,
}

impl ConversionReport {
    pub fn compiled(&self) -> Option<&CompiledTimeline> {
        match &self.timeline {
            TimelineStage::Compiled(compiled) => Some(compiled),
            _ => None,
        }
    }
}

/// Runs every stage over an in-memory container. Nothing is written.
pub fn convert_bytes(bytes: &[u8], options: &ConvertOptions) -> Result<ConversionReport> {
    let settings = options.compile_settings()?;
    let mut br = BinaryReader::new(Cursor::new(bytes), Endian::Little);

    let image_len = match options.image_offset {
        Some(offset) if offset > bytes.len() as u64 => {
            return Err(Error::InvalidInput(format!(
                "image offset {} is past the end of the {} byte input",
                offset,
                bytes.len()
            )))
        }
        Some(offset) => offset,
        None => png_length(&mut br)?,
    };
    if image_len == 0 && options.image_offset.is_none() {
        warn!("No leading PNG found, reading scene data from the start");
    } else {
        debug!("Scene data starts at byte {}", image_len);
    }
    br.seek(SeekFrom::Start(image_len))?;

    let tree = scene_parse(&mut br)?;
    info!(
        "Scene '{}': {} of {} roots parsed, {} objects",
        tree.version,
        tree.roots.len(),
        tree.declared_roots,
        tree.object_count()
    );

    if tree.incomplete {
        warn!("Object tree is incomplete; extended data cannot be located");
        return Ok(ConversionReport {
            image_len,
            tree,
            settings: None,
            plugins: PluginStage::Skipped,
            timeline: TimelineStage::Skipped,
            written: Vec::new(),
        });
    }

    let settings_skip = if options.skip_scene_settings {
        Some(scene_skip_settings_block(&mut br)?)
    } else {
        None
    };

    let plugins = match ext_parse(&mut br) {
        Ok(ExtStage::NotPresent) => PluginStage::NotPresent,
        Ok(ExtStage::MarkerMismatch { expected, found }) => {
            PluginStage::MarkerMismatch { expected, found }
        }
        Ok(ExtStage::Extracted(payload)) => PluginStage::Extracted(payload),
        Err(Error::Io(e)) => return Err(Error::Io(e)),
        Err(e) => {
            warn!("Extended data unreadable: {}", e);
            PluginStage::Failed(e.to_string())
        }
    };

    let timeline = match plugins.payload() {
        Some(payload) => timeline_stage(payload, &settings),
        None => TimelineStage::NoAnimationData,
    };

    Ok(ConversionReport {
        image_len,
        tree,
        settings: settings_skip,
        plugins,
        timeline,
        written: Vec::new(),
    })
}

fn timeline_stage(payload: &ExtendedPayload, settings: &CompileSettings) -> TimelineStage {
    let xml = match ext_timeline_xml(payload) {
        TimelineLookup::Found { version, xml } => {
            debug!("Timeline plugin v{}, {} bytes of XML", version, xml.len());
            xml
        }
        TimelineLookup::PluginMissing => {
            info!("No timeline plugin in the scene");
            return TimelineStage::NoAnimationData;
        }
        TimelineLookup::FieldUnavailable { version, reason } => {
            info!("Timeline plugin v{} has no animation: {}", version, reason);
            return TimelineStage::NoAnimationData;
        }
    };

    let doc = match TimelineDocument::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("{}", e);
            return TimelineStage::InvalidXml(e.to_string());
        }
    };
    match compile(&doc, &BoneMap::new(), settings) {
        CompileOutcome::NothingToExport(stats) => TimelineStage::NothingToExport(stats),
        CompileOutcome::Compiled(compiled) => TimelineStage::Compiled(compiled),
    }
}

fn output_dir(input: &Path, options: &ConvertOptions) -> Result<PathBuf> {
    match &options.output_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            Ok(dir.clone())
        }
        None => Ok(input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))),
    }
}

fn input_stem(input: &Path) -> Result<String> {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidInput(format!("{} has no file name", input.display())))
}

/// Converts the container at `input` and writes `<stem>_<index>.vmd` for
/// every animated object index.
pub fn convert_file(input: &Path, options: &ConvertOptions) -> Result<ConversionReport> {
    let bytes = fs::read(input)?;
    info!("Read {} ({} bytes)", input.display(), bytes.len());
    let mut report = convert_bytes(&bytes, options)?;

    let Some(compiled) = report.compiled() else {
        info!("No motion to write");
        return Ok(report);
    };

    let dir = output_dir(input, options)?;
    let stem = input_stem(input)?;
    let mut written = Vec::with_capacity(compiled.objects.len());
    for (object_index, frames) in &compiled.objects {
        if frames.is_empty() {
            continue;
        }
        let path = motion_file_path(&dir, &stem, object_index);
        MotionFile::new(&options.model_name, frames.clone()).save(&path)?;
        info!(
            "Wrote {} ({} frames, object {})",
            path.display(),
            frames.len(),
            object_index
        );
        written.push(WrittenMotion {
            path,
            object_index: object_index.clone(),
            frame_count: frames.len(),
        });
    }
    report.written = written;
    Ok(report)
}

#[derive(Serialize)]
struct SceneDump<'a> {
    image_len: u64,
    tree: &'a ObjectTree,
    plugin_ids: Vec<&'a str>,
    written: &'a [WrittenMotion],
}

/// Writes the parsed object tree and plugin ids as `<stem>.scene.json`.
pub fn write_scene_dump(
    report: &ConversionReport,
    input: &Path,
    options: &ConvertOptions,
) -> Result<PathBuf> {
    let dir = output_dir(input, options)?;
    let path = dir.join(format!("{}.{}", input_stem(input)?, SCENE_DUMP_SUFFIX));
    let dump = SceneDump {
        image_len: report.image_len,
        tree: &report.tree,
        plugin_ids: report
            .plugins
            .payload()
            .map(|payload| payload.plugin_ids().collect())
            .unwrap_or_default(),
        written: &report.written,
    };
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, &dump).map_err(std::io::Error::from)?;
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    info!("Wrote scene dump {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixture::*;
    use rmpv::Value;

    const TRACK_XML: &str = r#"<root>
        <interpolable objectIndex="0" id="guideObjectPos" guideObjectPath="BodyTop/p_cf_body_bone/cf_j_hips">
            <keyframe time="0" valueX="0" valueY="1" valueZ="0" />
            <keyframe time="1" valueX="0" valueY="2" valueZ="0" />
        </interpolable>
    </root>"#;

    fn png() -> Vec<u8> {
        let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        for (kind, len) in [(b"IHDR", 13u32), (b"IEND", 0)] {
            bytes.extend(len.to_be_bytes());
            bytes.extend(kind);
            bytes.extend(vec![0u8; len as usize + 4]);
        }
        bytes
    }

    fn container(roots: &[(i32, Vec<u8>)], tail: &[Vec<u8>]) -> Vec<u8> {
        let mut bytes = png();
        bytes.extend(scene_bytes("1.1.2.1", roots));
        for part in tail {
            bytes.extend(part);
        }
        bytes
    }

    fn timeline_block(xml: &str) -> Vec<u8> {
        let (key, value) = timeline_plugin_entry(xml);
        kkex_block(&Value::Map(vec![(key, value)]))
    }

    #[test]
    fn full_pipeline_compiles_timeline() -> Result<()> {
        let bytes = container(
            &[(0, folder_record("f", &[item_record(&[])]))],
            &[settings_block(), timeline_block(TRACK_XML)],
        );
        let report = convert_bytes(&bytes, &ConvertOptions::default())?;

        assert_eq!(report.image_len, png().len() as u64);
        assert_eq!(report.tree.object_count(), 2);
        assert!(matches!(report.settings, Some(SettingsSkip::Skipped { .. })));
        assert_eq!(
            report
                .plugins
                .payload()
                .map(|p| p.plugin_ids().collect::<Vec<_>>()),
            Some(vec!["timeline"])
        );
        let compiled = report.compiled().expect("compiled timeline");
        let frames = &compiled.objects["0"];
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].bone_name, "センター");
        assert_eq!(frames[1].frame_number, 30);
        assert!(report.written.is_empty());
        Ok(())
    }

    #[test]
    fn settings_can_be_absent_before_extended_block() -> Result<()> {
        let bytes = container(&[], &[timeline_block(TRACK_XML)]);
        let report = convert_bytes(&bytes, &ConvertOptions::default())?;
        assert_eq!(report.settings, Some(SettingsSkip::Absent));
        assert!(report.compiled().is_some());
        Ok(())
    }

    #[test]
    fn incomplete_tree_skips_later_stages() -> Result<()> {
        let bytes = container(
            &[(0, item_record(&[])), (1, unsupported_record(5))],
            &[timeline_block(TRACK_XML)],
        );
        let report = convert_bytes(&bytes, &ConvertOptions::default())?;
        assert!(report.tree.incomplete);
        assert_eq!(report.tree.roots.len(), 1);
        assert_eq!(report.plugins, PluginStage::Skipped);
        assert_eq!(report.timeline, TimelineStage::Skipped);
        Ok(())
    }

    #[test]
    fn truncated_tree_is_fatal() {
        let mut bytes = container(&[(0, item_record(&[]))], &[]);
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            convert_bytes(&bytes, &ConvertOptions::default()),
            Err(Error::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn marker_mismatch_keeps_the_tree() -> Result<()> {
        let junk = build(|bw| bw.write_net_string("KKEy"));
        let options = ConvertOptions {
            skip_scene_settings: false,
            ..Default::default()
        };
        let report = convert_bytes(&container(&[(0, item_record(&[]))], &[junk]), &options)?;
        assert_eq!(report.tree.roots.len(), 1);
        assert_eq!(report.settings, None);
        assert_eq!(
            report.plugins,
            PluginStage::MarkerMismatch {
                expected: "KKEx",
                found: "KKEy".into()
            }
        );
        assert_eq!(report.timeline, TimelineStage::NoAnimationData);
        Ok(())
    }

    #[test]
    fn runaway_marker_length_fails_only_its_stage() -> Result<()> {
        let mut bytes = scene_bytes("1.0", &[]);
        bytes.extend([0x80, 0x80, 0x80, 0x80, 0x80, b'K', b'K', b'E', b'x']);
        let options = ConvertOptions {
            skip_scene_settings: false,
            ..Default::default()
        };
        let report = convert_bytes(&bytes, &options)?;
        assert!(matches!(report.plugins, PluginStage::Failed(_)));
        assert_eq!(report.timeline, TimelineStage::NoAnimationData);
        Ok(())
    }

    #[test]
    fn truncated_extended_block_fails_only_its_stage() -> Result<()> {
        let mut block = timeline_block(TRACK_XML);
        block.truncate(block.len() - 10);
        let report = convert_bytes(&container(&[], &[block]), &ConvertOptions::default())?;
        assert!(matches!(report.plugins, PluginStage::Failed(_)));
        assert_eq!(report.timeline, TimelineStage::NoAnimationData);
        Ok(())
    }

    #[test]
    fn missing_timeline_is_not_an_error() -> Result<()> {
        let other = kkex_block(&Value::Map(vec![(
            Value::from("other"),
            Value::Array(vec![Value::from(1), Value::Nil]),
        )]));
        let report = convert_bytes(&container(&[], &[other]), &ConvertOptions::default())?;
        assert_eq!(report.timeline, TimelineStage::NoAnimationData);

        let report = convert_bytes(
            &container(&[], &[timeline_block("<root><interpolable")]),
            &ConvertOptions::default(),
        )?;
        assert!(matches!(report.timeline, TimelineStage::InvalidXml(_)));
        Ok(())
    }

    #[test]
    fn no_png_reads_from_start() -> Result<()> {
        let bytes = scene_bytes("1.0", &[]);
        let report = convert_bytes(&bytes, &ConvertOptions::default())?;
        assert_eq!(report.image_len, 0);
        assert_eq!(report.plugins, PluginStage::NotPresent);
        Ok(())
    }

    #[test]
    fn rejects_bad_options() {
        let bytes = scene_bytes("1.0", &[]);
        let past_end = ConvertOptions {
            image_offset: Some(bytes.len() as u64 + 1),
            ..Default::default()
        };
        assert!(matches!(
            convert_bytes(&bytes, &past_end),
            Err(Error::InvalidInput(_))
        ));
        let zero_fps = ConvertOptions {
            fps: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            convert_bytes(&bytes, &zero_fps),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: ConvertOptions =
            serde_json::from_str(r#"{"model_name": "Miku", "fps": 60.0}"#).unwrap();
        assert_eq!(options.model_name, "Miku");
        assert_eq!(options.fps, 60.0);
        assert!(options.skip_scene_settings);
        assert_eq!(options.position_scale, 12.5);
        assert_eq!(options.output_dir, None);
    }
}
