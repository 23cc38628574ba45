//! Timeline plugin animation.
//!
//! The plugin stores a `<root>` element holding `<interpolable>` tracks, each
//! with `<keyframe>` children carrying `time` and `valueX`..`valueW`
//! attributes. Only bone position and rotation tracks are compiled.

pub mod timeline_compiler;
pub mod timeline_xml;

pub use timeline_compiler::{
    aggregate, compile, frame_number, BoneChannelSequence, BoneChannels, CompileOutcome,
    CompileSettings, CompileStats, CompiledTimeline, Keyframe, PartialFrame, TimelineDocument,
    Track, TrackKind,
};
pub use timeline_xml::{parse_xml, XmlNode};
