//! Turns timeline interpolables into dense per-object MMD bone keyframes.
//!
//! Tracks are filtered to guide-object position/rotation and KKPE bone
//! rotation, retargeted through the bone map, converted to MMD units and
//! axes, then merged per (object, bone). Each bone's frames are densified by
//! carrying the last known position and rotation forward.

use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use tracing::{debug, info, warn};

use crate::bone_map::BoneMap;
use crate::error::Result;
use crate::timeline::timeline_xml::{parse_xml, XmlNode};
use crate::vmd::MotionFrame;

pub const DEFAULT_FPS: f32 = 30.0;
/// Studio units to MMD units.
pub const DEFAULT_POSITION_SCALE: f32 = 12.5;

const ROOT_ELEMENT: &str = "root";
const TRACK_ELEMENT: &str = "interpolable";
const KEYFRAME_ELEMENT: &str = "keyframe";

const ID_GUIDE_POS: &str = "guideObjectPos";
const ID_GUIDE_ROT: &str = "guideObjectRot";
const ID_BONE_ROT: &str = "boneRot";
const OWNER_KKPE: &str = "KKPE";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompileSettings {
    pub fps: f32,
    pub position_scale: f32,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            position_scale: DEFAULT_POSITION_SCALE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Position,
    Rotation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub value_x: Option<f32>,
    pub value_y: Option<f32>,
    pub value_z: Option<f32>,
    pub value_w: Option<f32>,
}

impl Keyframe {
    fn vec3(&self) -> Option<[f32; 3]> {
        Some([self.value_x?, self.value_y?, self.value_z?])
    }

    fn vec4(&self) -> Option<[f32; 4]> {
        let [x, y, z] = self.vec3()?;
        Some([x, y, z, self.value_w?])
    }
}

/// One `interpolable` element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub object_index: Option<String>,
    pub id: Option<String>,
    pub owner: Option<String>,
    pub parameter: Option<String>,
    pub guide_object_path: Option<String>,
    pub keyframes: Vec<Keyframe>,
    /// Keyframes dropped because `time` was missing or not a number.
    pub untimed_keyframes: usize,
}

impl Track {
    pub fn kind(&self) -> Option<TrackKind> {
        match (self.id.as_deref(), self.owner.as_deref()) {
            (Some(ID_GUIDE_POS), _) => Some(TrackKind::Position),
            (Some(ID_GUIDE_ROT), _) => Some(TrackKind::Rotation),
            (Some(ID_BONE_ROT), Some(OWNER_KKPE)) => Some(TrackKind::Rotation),
            _ => None,
        }
    }

    /// KKPE names the joint directly; guide-object tracks carry a path.
    pub fn bone_source(&self) -> Option<&str> {
        if self.owner.as_deref() == Some(OWNER_KKPE) {
            self.parameter.as_deref()
        } else {
            self.guide_object_path.as_deref()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineDocument {
    pub tracks: Vec<Track>,
}

fn parse_number(raw: Option<&str>) -> Option<f32> {
    raw?.trim().parse::<f32>().ok()
}

impl TimelineDocument {
    pub fn parse(xml: &str) -> Result<Self> {
        Ok(Self::from_xml(&parse_xml(xml)?))
    }

    /// Collects the `interpolable` children of the `root` element.
    pub fn from_xml(root: &XmlNode) -> Self {
        if root.name != ROOT_ELEMENT {
            return Self::default();
        }
        let tracks = root
            .children_named(TRACK_ELEMENT)
            .map(|node| {
                let mut track = Track {
                    object_index: node.attr("objectIndex").map(str::to_string),
                    id: node.attr("id").map(str::to_string),
                    owner: node.attr("owner").map(str::to_string),
                    parameter: node.attr("parameter").map(str::to_string),
                    guide_object_path: node.attr("guideObjectPath").map(str::to_string),
                    ..Default::default()
                };
                for key in node.children_named(KEYFRAME_ELEMENT) {
                    match parse_number(key.attr("time")) {
                        Some(time) => track.keyframes.push(Keyframe {
                            time,
                            value_x: parse_number(key.attr("valueX")),
                            value_y: parse_number(key.attr("valueY")),
                            value_z: parse_number(key.attr("valueZ")),
                            value_w: parse_number(key.attr("valueW")),
                        }),
                        None => track.untimed_keyframes += 1,
                    }
                }
                track
            })
            .collect();
        Self { tracks }
    }
}

/// Rounds half away from zero. Negative or out-of-range frames are rejected.
pub fn frame_number(time: f32, fps: f32) -> Option<u32> {
    let frame = (time * fps).round();
    // 2^32 is the first f32 past u32::MAX.
    if !frame.is_finite() || frame < 0.0 || frame >= 4_294_967_296.0 {
        return None;
    }
    Some(frame as u32)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialFrame {
    pub position: Option<Vec3>,
    pub rotation: Option<Quat>,
}

/// Sparse samples of one bone on one object, keyed by frame number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneChannelSequence {
    pub frames: BTreeMap<u32, PartialFrame>,
}

impl BoneChannelSequence {
    pub fn set_position(&mut self, frame: u32, position: Vec3) {
        self.frames.entry(frame).or_default().position = Some(position);
    }

    pub fn set_rotation(&mut self, frame: u32, rotation: Quat) {
        self.frames.entry(frame).or_default().rotation = Some(rotation);
    }

    /// Fills every frame's missing channels with the last value seen before
    /// it; frames before the first sample, or channels never sampled, get
    /// zero / identity. Returns nothing if no channel was ever sampled.
    pub fn densify(&self, bone_name: &str) -> Vec<MotionFrame> {
        let has_position = self.frames.values().any(|f| f.position.is_some());
        let has_rotation = self.frames.values().any(|f| f.rotation.is_some());
        if !has_position && !has_rotation {
            return Vec::new();
        }

        let mut last_position: Option<Vec3> = None;
        let mut last_rotation: Option<Quat> = None;
        self.frames
            .iter()
            .map(|(&frame, partial)| {
                last_position = partial.position.or(last_position);
                last_rotation = partial.rotation.or(last_rotation);
                MotionFrame::new(
                    bone_name,
                    frame,
                    last_position.unwrap_or(Vec3::ZERO),
                    last_rotation.unwrap_or(Quat::IDENTITY),
                )
            })
            .collect()
    }
}

/// Channel samples grouped by object index, then MMD bone name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneChannels {
    pub objects: BTreeMap<String, BTreeMap<&'static str, BoneChannelSequence>>,
}

impl BoneChannels {
    pub fn sequence_mut(
        &mut self,
        object_index: &str,
        bone: &'static str,
    ) -> &mut BoneChannelSequence {
        self.objects
            .entry(object_index.to_string())
            .or_default()
            .entry(bone)
            .or_default()
    }

    /// Dense, sorted frames per object index. Objects whose bones never got
    /// a sample are left out.
    pub fn densify(&self) -> BTreeMap<String, Vec<MotionFrame>> {
        let mut out = BTreeMap::new();
        for (object_index, bones) in &self.objects {
            let mut frames: Vec<MotionFrame> = bones
                .iter()
                .flat_map(|(bone, seq)| seq.densify(bone))
                .collect();
            if frames.is_empty() {
                warn!("Object {} has no usable bone keyframes, skipped", object_index);
                continue;
            }
            frames.sort_by(|a, b| {
                a.frame_number
                    .cmp(&b.frame_number)
                    .then_with(|| a.bone_name.cmp(&b.bone_name))
            });
            out.insert(object_index.clone(), frames);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub tracks_total: usize,
    pub tracks_used: usize,
    pub tracks_ignored: usize,
    pub tracks_unmapped: usize,
    pub keyframes_used: usize,
    pub keyframes_skipped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTimeline {
    pub objects: BTreeMap<String, Vec<MotionFrame>>,
    pub stats: CompileStats,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompileOutcome {
    /// No track list, or nothing in it survived filtering.
    NothingToExport(CompileStats),
    Compiled(CompiledTimeline),
}

/// Filters, retargets and converts every track into channel samples.
pub fn aggregate(
    doc: &TimelineDocument,
    bones: &BoneMap,
    settings: &CompileSettings,
) -> (BoneChannels, CompileStats) {
    let mut channels = BoneChannels::default();
    let mut stats = CompileStats {
        tracks_total: doc.tracks.len(),
        ..Default::default()
    };

    for track in &doc.tracks {
        let (Some(object_index), Some(kind)) = (
            track.object_index.as_deref().filter(|s| !s.is_empty()),
            track.kind(),
        ) else {
            stats.tracks_ignored += 1;
            continue;
        };
        let Some(bone) = track.bone_source().and_then(|src| bones.translate(src)) else {
            debug!(
                "No MMD bone for {:?} ({:?})",
                track.bone_source(),
                track.id
            );
            stats.tracks_unmapped += 1;
            continue;
        };
        stats.tracks_used += 1;
        stats.keyframes_skipped += track.untimed_keyframes;

        let seq = channels.sequence_mut(object_index, bone);
        for key in &track.keyframes {
            let Some(frame) = frame_number(key.time, settings.fps) else {
                stats.keyframes_skipped += 1;
                continue;
            };
            let applied = match kind {
                TrackKind::Position => key.vec3().map(|[x, y, z]| {
                    let s = settings.position_scale;
                    seq.set_position(frame, Vec3::new(-x * s, y * s, -z * s));
                }),
                TrackKind::Rotation => key.vec4().map(|[x, y, z, w]| {
                    seq.set_rotation(frame, Quat::from_xyzw(-x, y, -z, w));
                }),
            };
            match applied {
                Some(()) => stats.keyframes_used += 1,
                None => stats.keyframes_skipped += 1,
            }
        }
    }
    (channels, stats)
}

pub fn compile(
    doc: &TimelineDocument,
    bones: &BoneMap,
    settings: &CompileSettings,
) -> CompileOutcome {
    if doc.tracks.is_empty() {
        warn!("Timeline has no interpolables");
        return CompileOutcome::NothingToExport(CompileStats::default());
    }

    let (channels, stats) = aggregate(doc, bones, settings);
    let objects = channels.densify();
    info!(
        "Timeline: {} of {} tracks used ({} unmapped), {} keyframes used, {} skipped",
        stats.tracks_used,
        stats.tracks_total,
        stats.tracks_unmapped,
        stats.keyframes_used,
        stats.keyframes_skipped
    );
    if objects.is_empty() {
        warn!("Timeline has no bone keyframes that map to MMD");
        return CompileOutcome::NothingToExport(stats);
    }
    CompileOutcome::Compiled(CompiledTimeline { objects, stats })
}
