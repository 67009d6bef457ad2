// Channel catalogue and header alias matching
//
// Motion-capture exports name the same quantity a dozen different ways
// ("Pelvis Rotation (deg)", "pelvis_rot", "PELVIS-ROT"). Headers are
// normalised and compared against a fixed alias list per channel; anything
// unrecognised is reported, never fatal.

use serde::{Deserialize, Serialize};

/// Broad grouping of channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Identifiers, time and event markers
    Meta,
    /// Segment axial rotation angle
    Rotation,
    /// Joint angle read at contact
    JointAngle,
    /// Segment kinetic energy (J)
    Energy,
    /// Bat linear momentum component
    Momentum,
    /// Hand or bat speed
    Speed,
    /// Sensor swing-summary field
    Sensor,
}

/// Every channel the normalizer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    SwingId,
    Time,
    ContactMarker,
    StrideMarker,
    TimeToContact,
    PelvisRot,
    TorsoRot,
    LeadHipFlex,
    LeadHipAdd,
    LeadHipRot,
    RearHipFlex,
    RearHipAdd,
    RearHipRot,
    LeadKnee,
    RearKnee,
    LeadAnkleInv,
    LeadAnkleFlex,
    LeadElbow,
    RearElbow,
    LegsKe,
    TorsoKe,
    ArmsKe,
    BatKe,
    TotalKe,
    BatMomX,
    BatMomY,
    BatMomZ,
    HandSpeed,
    BatSpeed,
    AttackAngle,
}

impl Channel {
    pub const ALL: [Channel; 30] = [
        Channel::SwingId,
        Channel::Time,
        Channel::ContactMarker,
        Channel::StrideMarker,
        Channel::TimeToContact,
        Channel::PelvisRot,
        Channel::TorsoRot,
        Channel::LeadHipFlex,
        Channel::LeadHipAdd,
        Channel::LeadHipRot,
        Channel::RearHipFlex,
        Channel::RearHipAdd,
        Channel::RearHipRot,
        Channel::LeadKnee,
        Channel::RearKnee,
        Channel::LeadAnkleInv,
        Channel::LeadAnkleFlex,
        Channel::LeadElbow,
        Channel::RearElbow,
        Channel::LegsKe,
        Channel::TorsoKe,
        Channel::ArmsKe,
        Channel::BatKe,
        Channel::TotalKe,
        Channel::BatMomX,
        Channel::BatMomY,
        Channel::BatMomZ,
        Channel::HandSpeed,
        Channel::BatSpeed,
        Channel::AttackAngle,
    ];

    /// Segment energy channels in lower-to-upper body order
    pub const ENERGIES: [Channel; 5] = [
        Channel::LegsKe,
        Channel::TorsoKe,
        Channel::ArmsKe,
        Channel::BatKe,
        Channel::TotalKe,
    ];

    /// Joint angle channels reported at contact
    pub const JOINT_ANGLES: [Channel; 12] = [
        Channel::LeadHipFlex,
        Channel::LeadHipAdd,
        Channel::LeadHipRot,
        Channel::RearHipFlex,
        Channel::RearHipAdd,
        Channel::RearHipRot,
        Channel::LeadKnee,
        Channel::RearKnee,
        Channel::LeadAnkleInv,
        Channel::LeadAnkleFlex,
        Channel::LeadElbow,
        Channel::RearElbow,
    ];

    /// Canonical snake_case name
    pub fn name(self) -> &'static str {
        self.aliases()[0]
    }

    pub fn kind(self) -> ChannelKind {
        use Channel::*;
        match self {
            SwingId | Time | ContactMarker | StrideMarker | TimeToContact => ChannelKind::Meta,
            PelvisRot | TorsoRot => ChannelKind::Rotation,
            LeadHipFlex | LeadHipAdd | LeadHipRot | RearHipFlex | RearHipAdd | RearHipRot
            | LeadKnee | RearKnee | LeadAnkleInv | LeadAnkleFlex | LeadElbow | RearElbow => {
                ChannelKind::JointAngle
            }
            LegsKe | TorsoKe | ArmsKe | BatKe | TotalKe => ChannelKind::Energy,
            BatMomX | BatMomY | BatMomZ => ChannelKind::Momentum,
            HandSpeed | BatSpeed => ChannelKind::Speed,
            AttackAngle => ChannelKind::Sensor,
        }
    }

    /// Whether values are angles subject to the radian/degree heuristic
    pub fn is_angle(self) -> bool {
        matches!(
            self.kind(),
            ChannelKind::Rotation | ChannelKind::JointAngle
        )
    }

    /// Whether the column holds numbers (everything except the swing id)
    pub fn is_numeric(self) -> bool {
        self != Channel::SwingId
    }

    /// Accepted header spellings after normalisation; the first is canonical
    pub fn aliases(self) -> &'static [&'static str] {
        use Channel::*;
        match self {
            SwingId => &[
                "swing_id",
                "swing",
                "swingid",
                "swing_number",
                "movement_id",
                "movement",
                "trial",
                "trial_id",
                "rep",
                "id",
            ],
            Time => &["time", "t", "time_s", "time_sec", "timestamp", "seconds"],
            ContactMarker => &[
                "contact_marker",
                "contact",
                "contact_frame",
                "is_contact",
                "contact_flag",
                "impact",
                "impact_frame",
                "ball_contact",
            ],
            StrideMarker => &[
                "stride_marker",
                "stride",
                "stride_frame",
                "load_start",
                "load_frame",
                "foot_up",
            ],
            TimeToContact => &[
                "time_to_contact",
                "ttc",
                "time_to_impact",
                "t_contact",
                "time_before_contact",
            ],
            PelvisRot => &[
                "pelvis_rot",
                "pelvis_rotation",
                "pelvis_rot_z",
                "pelvis_axial_rotation",
                "pelvis_angle",
                "pelvis",
            ],
            TorsoRot => &[
                "torso_rot",
                "torso_rotation",
                "trunk_rotation",
                "thorax_rotation",
                "torso_rot_z",
                "trunk_rot",
                "torso_angle",
                "torso",
            ],
            LeadHipFlex => &["lead_hip_flex", "lead_hip_flexion", "front_hip_flexion"],
            LeadHipAdd => &["lead_hip_add", "lead_hip_adduction", "front_hip_adduction"],
            LeadHipRot => &["lead_hip_rot", "lead_hip_rotation", "front_hip_rotation"],
            RearHipFlex => &["rear_hip_flex", "rear_hip_flexion", "back_hip_flexion"],
            RearHipAdd => &["rear_hip_add", "rear_hip_adduction", "back_hip_adduction"],
            RearHipRot => &["rear_hip_rot", "rear_hip_rotation", "back_hip_rotation"],
            LeadKnee => &[
                "lead_knee",
                "lead_knee_flex",
                "lead_knee_flexion",
                "front_knee",
                "front_knee_flexion",
            ],
            RearKnee => &[
                "rear_knee",
                "rear_knee_flex",
                "rear_knee_flexion",
                "back_knee",
                "back_knee_flexion",
            ],
            LeadAnkleInv => &[
                "lead_ankle_inv",
                "lead_ankle_inversion",
                "front_ankle_inversion",
            ],
            LeadAnkleFlex => &[
                "lead_ankle_flex",
                "lead_ankle_flexion",
                "lead_ankle_dorsiflexion",
                "front_ankle_flexion",
            ],
            LeadElbow => &["lead_elbow", "lead_elbow_flex", "lead_elbow_flexion", "front_elbow"],
            RearElbow => &["rear_elbow", "rear_elbow_flex", "rear_elbow_flexion", "back_elbow"],
            LegsKe => &[
                "legs_ke",
                "leg_ke",
                "legs_kinetic_energy",
                "lower_body_ke",
                "legs_energy",
            ],
            TorsoKe => &["torso_ke", "trunk_ke", "torso_kinetic_energy", "torso_energy"],
            ArmsKe => &["arms_ke", "arm_ke", "arms_kinetic_energy", "arms_energy"],
            BatKe => &["bat_ke", "bat_kinetic_energy", "bat_energy"],
            TotalKe => &[
                "total_ke",
                "total_kinetic_energy",
                "total_energy",
                "body_ke",
                "whole_body_ke",
            ],
            BatMomX => &["bat_mom_x", "bat_momentum_x", "bat_linear_momentum_x", "bat_p_x"],
            BatMomY => &["bat_mom_y", "bat_momentum_y", "bat_linear_momentum_y", "bat_p_y"],
            BatMomZ => &["bat_mom_z", "bat_momentum_z", "bat_linear_momentum_z", "bat_p_z"],
            HandSpeed => &[
                "hand_speed",
                "hand_speed_mph",
                "max_hand_speed",
                "peak_hand_speed",
                "hands_speed",
            ],
            BatSpeed => &["bat_speed", "bat_speed_mph", "peak_bat_speed", "bat_velocity"],
            AttackAngle => &["attack_angle", "attack_angle_deg", "aa", "swing_path_angle"],
        }
    }

    /// Resolve a raw header to a channel
    pub fn from_header(header: &str) -> Option<Channel> {
        let key = normalize_header(header);
        if key.is_empty() {
            return None;
        }
        Channel::ALL
            .iter()
            .copied()
            .find(|channel| channel.aliases().iter().any(|alias| *alias == key))
    }
}

/// Normalise a header for alias comparison
///
/// Lowercases, drops a trailing unit annotation in parentheses or brackets,
/// and collapses separators to single underscores.
pub fn normalize_header(header: &str) -> String {
    let lowered = header.trim().trim_start_matches('\u{feff}').to_ascii_lowercase();
    let without_units = match lowered.find(|c: char| c == '(' || c == '[') {
        Some(idx) => &lowered[..idx],
        None => lowered.as_str(),
    };

    let mut out = String::with_capacity(without_units.len());
    for ch in without_units.chars() {
        let mapped = if ch.is_ascii_alphanumeric() { ch } else { '_' };
        if mapped == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        out.push(mapped);
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Pelvis Rotation (deg)"), "pelvis_rotation");
        assert_eq!(normalize_header("  PELVIS-ROT "), "pelvis_rot");
        assert_eq!(normalize_header("bat.KE [J]"), "bat_ke");
        assert_eq!(normalize_header("\u{feff}Swing ID"), "swing_id");
        assert_eq!(normalize_header("___"), "");
    }

    #[test]
    fn test_alias_matching_is_case_insensitive() {
        assert_eq!(Channel::from_header("Trunk Rotation"), Some(Channel::TorsoRot));
        assert_eq!(Channel::from_header("TOTAL_KE"), Some(Channel::TotalKe));
        assert_eq!(Channel::from_header("Time (s)"), Some(Channel::Time));
        assert_eq!(Channel::from_header("Movement ID"), Some(Channel::SwingId));
        assert_eq!(Channel::from_header("unrelated column"), None);
    }

    #[test]
    fn test_aliases_are_unique_across_channels() {
        let mut seen = std::collections::HashSet::new();
        for channel in Channel::ALL {
            for alias in channel.aliases() {
                assert!(seen.insert(*alias), "alias {alias} used twice");
                assert_eq!(normalize_header(alias), *alias);
            }
        }
    }

    #[test]
    fn test_channel_kinds() {
        assert!(Channel::PelvisRot.is_angle());
        assert!(Channel::LeadKnee.is_angle());
        assert!(!Channel::BatKe.is_angle());
        assert_eq!(Channel::BatMomZ.kind(), ChannelKind::Momentum);
        assert!(!Channel::SwingId.is_numeric());
        assert_eq!(Channel::LegsKe.name(), "legs_ke");
    }
}
