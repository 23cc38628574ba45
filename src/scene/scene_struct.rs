use serde::Serialize;

/// Object kinds the studio scene format knows about. Only Character, Item and
/// Folder records have a known layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum ObjectKind {
    Character = 0,
    Item = 1,
    Folder = 3,
}

impl TryFrom<i32> for ObjectKind {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ObjectKind::Character),
            1 => Ok(ObjectKind::Item),
            3 => Ok(ObjectKind::Folder),
            other => Err(other),
        }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SceneVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<[f32; 3]> for SceneVec3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub position: SceneVec3,
    pub rotation: SceneVec3,
    pub scale: SceneVec3,
}

/// Fields shared by every object record.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct ObjectBase {
    pub transform: Transform,
    pub tree_state: i32,
    pub visible: bool,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct FolderInfo {
    pub name: String,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct ItemInfo {
    pub group: i32,
    pub category: i32,
    pub no: i32,
    pub anime_speed: f32,
    pub alpha: f32,
    pub line_width: f32,
    pub emission_power: f32,
    pub light_cancel: f32,
    pub enable_fk: bool,
    pub bone_names: Vec<String>,
    pub enable_dynamic_bone: bool,
    pub anime_normalized_time: f32,
}

/// One accessory attachment point of a character and how many of the
/// character's children hang off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub parent_key: i32,
    pub child_count: usize,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct CharacterInfo {
    pub sex: i32,
    pub product_no: i32,
    pub card_marker: String,
    pub card_version: String,
    pub fk_bone_count: usize,
    pub ik_target_count: usize,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ObjectPayload {
    Character(CharacterInfo),
    Item(ItemInfo),
    Folder(FolderInfo),
}

impl ObjectPayload {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectPayload::Character(_) => ObjectKind::Character,
            ObjectPayload::Item(_) => ObjectKind::Item,
            ObjectPayload::Folder(_) => ObjectKind::Folder,
        }
    }
}

/// A fully parsed object record together with the children it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneObject {
    /// Scene dictionary key for root objects, -1 for nested ones.
    pub key: i32,
    pub internal_key: i32,
    pub base: ObjectBase,
    pub payload: ObjectPayload,
    pub children: Vec<SceneObject>,
    /// Byte offset of the record's kind field.
    pub offset: u64,
    /// Bytes consumed by the record, children included.
    pub byte_len: u64,
}

impl SceneObject {
    pub fn kind(&self) -> ObjectKind {
        self.payload.kind()
    }

    /// Number of objects in this subtree, this one included.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(SceneObject::subtree_len).sum::<usize>()
    }
}

/// Where the object walk stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnsupportedKind {
    pub kind: i32,
    pub position: u64,
}

/// Result of the object-tree stage.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct ObjectTree {
    pub version: String,
    pub declared_roots: usize,
    pub roots: Vec<SceneObject>,
    /// Set when an unsupported kind stopped the walk; `roots` then holds only
    /// the objects parsed before it.
    pub incomplete: bool,
    pub unsupported: Option<UnsupportedKind>,
    /// Reader position right after the last consumed byte.
    pub end_position: u64,
}

impl ObjectTree {
    pub fn object_count(&self) -> usize {
        self.roots.iter().map(SceneObject::subtree_len).sum()
    }
}
