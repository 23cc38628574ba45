//! Koikatsu joint name to MMD bone name table.
//!
//! Only the joints with a counterpart on a standard MMD skeleton are listed;
//! everything else is dropped by the timeline compiler.

use hashbrown::HashMap;

const KK_TO_MMD: &[(&str, &str)] = &[
    ("", "全ての親"),
    // Center / hips
    ("cf_j_hips", "センター"),
    ("cf_t_hips", "センター"),
    // Body
    ("cf_j_spine01", "上半身"),
    ("cf_j_spine02", "上半身2"),
    // Head
    ("cf_j_neck", "首"),
    ("cf_j_head", "頭"),
    // Left arm
    ("cf_d_shoulder_L", "左肩"),
    ("cf_j_shoulder_L", "左肩"),
    ("cf_j_arm00_L", "左腕"),
    ("cf_j_forearm01_L", "左ひじ"),
    ("cf_t_elbo_L", "左ひじ"),
    ("cf_j_hand_L", "左手首"),
    ("cf_t_hand_L", "左手首"),
    // Right arm
    ("cf_d_shoulder_R", "右肩"),
    ("cf_j_shoulder_R", "右肩"),
    ("cf_j_arm00_R", "右腕"),
    ("cf_j_forearm01_R", "右ひじ"),
    ("cf_t_elbo_R", "右ひじ"),
    ("cf_j_hand_R", "右手首"),
    ("cf_t_hand_R", "右手首"),
    // Left leg
    ("cf_j_thigh00_L", "左足"),
    ("cf_j_leg01_L", "左ひざ"),
    ("cf_j_leg03_L", "左足首"),
    // Right leg
    ("cf_j_thigh00_R", "右足"),
    ("cf_j_leg01_R", "右ひざ"),
    ("cf_j_leg03_R", "右足首"),
    // Left fingers
    ("cf_j_thumb01_L", "左親指１"),
    ("cf_j_thumb02_L", "左親指２"),
    ("cf_j_index01_L", "左人指１"),
    ("cf_j_index02_L", "左人指２"),
    ("cf_j_index03_L", "左人指３"),
    ("cf_j_middle01_L", "左中指１"),
    ("cf_j_middle02_L", "左中指２"),
    ("cf_j_middle03_L", "左中指３"),
    ("cf_j_ring01_L", "左薬指１"),
    ("cf_j_ring02_L", "左薬指２"),
    ("cf_j_ring03_L", "左薬指３"),
    ("cf_j_little01_L", "左小指１"),
    ("cf_j_little02_L", "左小指２"),
    ("cf_j_little03_L", "左小指３"),
    // Right fingers
    ("cf_j_thumb01_R", "右親指１"),
    ("cf_j_thumb02_R", "右親指２"),
    ("cf_j_index01_R", "右人指１"),
    ("cf_j_index02_R", "右人指２"),
    ("cf_j_index03_R", "右人指３"),
    ("cf_j_middle01_R", "右中指１"),
    ("cf_j_middle02_R", "右中指２"),
    ("cf_j_middle03_R", "右中指３"),
    ("cf_j_ring01_R", "右薬指１"),
    ("cf_j_ring02_R", "右薬指２"),
    ("cf_j_ring03_R", "右薬指３"),
    ("cf_j_little01_R", "右小指１"),
    ("cf_j_little02_R", "右小指２"),
    ("cf_j_little03_R", "右小指３"),
];

/// Read-only joint lookup, built once and shared by reference.
#[derive(Debug, Clone)]
pub struct BoneMap {
    table: HashMap<&'static str, &'static str>,
}

impl Default for BoneMap {
    fn default() -> Self {
        Self {
            table: KK_TO_MMD.iter().copied().collect(),
        }
    }
}

impl BoneMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Translates a timeline bone reference (a bare joint name or a
    /// guide-object path) into an MMD bone name.
    pub fn translate(&self, source: &str) -> Option<&'static str> {
        self.table.get(joint_token(source).as_str()).copied()
    }
}

/// Reduces a bone reference to its joint token: drops "(work)", trims, and
/// keeps the last path segment.
pub fn joint_token(source: &str) -> String {
    let cleaned = source.replace("(work)", "");
    let cleaned = cleaned.trim();
    match cleaned.rfind('/') {
        Some(idx) => cleaned[idx + 1..].to_string(),
        None => cleaned.to_string(),
    }
}
