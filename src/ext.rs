//! ExtensibleSaveFormat block appended after the scene data.
//!
//! Layout: the `KKEx` marker as a .NET string, an i32 format version, an i32
//! byte length and a MessagePack map from plugin id to that plugin's saved
//! record. The timeline plugin keeps its whole animation as an XML string.

pub mod ext_parser;
pub mod ext_struct;

pub use ext_parser::{ext_parse, ext_timeline_xml, ExtStage, TimelineLookup};
pub use ext_struct::{ExtendedPayload, FieldError, PluginRecord, PluginValue};
