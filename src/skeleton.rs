//! Canonical humanoid skeleton.
//!
//! `HumanoidBone` is the closed set of bones the solver can drive. Bones form a
//! fixed tree rooted at [`HumanoidBone::Hips`]. Per-bone tables are stored in
//! [`BoneMap`], a fixed array indexed by bone ordinal, so the per-frame path
//! never hashes or compares strings. Rig-specific bone names are resolved once
//! at model load through [`BoneAliasTable`].

use crate::landmarks::Side;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Canonical humanoid bone identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HumanoidBone {
    Hips,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,

    LeftShoulder,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightShoulder,
    RightUpperArm,
    RightLowerArm,
    RightHand,

    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    LeftToes,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
    RightToes,

    LeftThumbProximal,
    LeftThumbIntermediate,
    LeftThumbDistal,
    LeftIndexProximal,
    LeftIndexIntermediate,
    LeftIndexDistal,
    LeftMiddleProximal,
    LeftMiddleIntermediate,
    LeftMiddleDistal,
    LeftRingProximal,
    LeftRingIntermediate,
    LeftRingDistal,
    LeftLittleProximal,
    LeftLittleIntermediate,
    LeftLittleDistal,

    RightThumbProximal,
    RightThumbIntermediate,
    RightThumbDistal,
    RightIndexProximal,
    RightIndexIntermediate,
    RightIndexDistal,
    RightMiddleProximal,
    RightMiddleIntermediate,
    RightMiddleDistal,
    RightRingProximal,
    RightRingIntermediate,
    RightRingDistal,
    RightLittleProximal,
    RightLittleIntermediate,
    RightLittleDistal,
}

/// Finger identifiers, thumb first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

impl Finger {
    pub const ALL: [Self; 5] = [Self::Thumb, Self::Index, Self::Middle, Self::Ring, Self::Little];
}

/// Finger segment, from the knuckle outward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phalanx {
    Proximal,
    Intermediate,
    Distal,
}

impl Phalanx {
    pub const ALL: [Self; 3] = [Self::Proximal, Self::Intermediate, Self::Distal];
}

impl HumanoidBone {
    /// Number of canonical bones
    pub const COUNT: usize = 52;

    /// Every bone, in ordinal order (parents always precede their children)
    pub const ALL: [Self; Self::COUNT] = [
        Self::Hips,
        Self::Spine,
        Self::Chest,
        Self::UpperChest,
        Self::Neck,
        Self::Head,
        Self::LeftShoulder,
        Self::LeftUpperArm,
        Self::LeftLowerArm,
        Self::LeftHand,
        Self::RightShoulder,
        Self::RightUpperArm,
        Self::RightLowerArm,
        Self::RightHand,
        Self::LeftUpperLeg,
        Self::LeftLowerLeg,
        Self::LeftFoot,
        Self::LeftToes,
        Self::RightUpperLeg,
        Self::RightLowerLeg,
        Self::RightFoot,
        Self::RightToes,
        Self::LeftThumbProximal,
        Self::LeftThumbIntermediate,
        Self::LeftThumbDistal,
        Self::LeftIndexProximal,
        Self::LeftIndexIntermediate,
        Self::LeftIndexDistal,
        Self::LeftMiddleProximal,
        Self::LeftMiddleIntermediate,
        Self::LeftMiddleDistal,
        Self::LeftRingProximal,
        Self::LeftRingIntermediate,
        Self::LeftRingDistal,
        Self::LeftLittleProximal,
        Self::LeftLittleIntermediate,
        Self::LeftLittleDistal,
        Self::RightThumbProximal,
        Self::RightThumbIntermediate,
        Self::RightThumbDistal,
        Self::RightIndexProximal,
        Self::RightIndexIntermediate,
        Self::RightIndexDistal,
        Self::RightMiddleProximal,
        Self::RightMiddleIntermediate,
        Self::RightMiddleDistal,
        Self::RightRingProximal,
        Self::RightRingIntermediate,
        Self::RightRingDistal,
        Self::RightLittleProximal,
        Self::RightLittleIntermediate,
        Self::RightLittleDistal,
    ];

    /// Ordinal of this bone in [`HumanoidBone::ALL`]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Parent bone; `None` only for the hips
    #[must_use]
    pub fn parent(self) -> Option<Self> {
        use HumanoidBone::*;

        if let Some((side, finger, phalanx)) = self.finger() {
            return Some(match phalanx {
                Phalanx::Proximal => Self::hand(side),
                Phalanx::Intermediate => Self::finger_bone(side, finger, Phalanx::Proximal),
                Phalanx::Distal => Self::finger_bone(side, finger, Phalanx::Intermediate),
            });
        }

        let parent = match self {
            Hips => return None,
            Spine => Hips,
            Chest => Spine,
            UpperChest => Chest,
            Neck => UpperChest,
            Head => Neck,
            LeftShoulder | RightShoulder => UpperChest,
            LeftUpperArm => LeftShoulder,
            LeftLowerArm => LeftUpperArm,
            LeftHand => LeftLowerArm,
            RightUpperArm => RightShoulder,
            RightLowerArm => RightUpperArm,
            RightHand => RightLowerArm,
            LeftUpperLeg | RightUpperLeg => Hips,
            LeftLowerLeg => LeftUpperLeg,
            LeftFoot => LeftLowerLeg,
            LeftToes => LeftFoot,
            RightLowerLeg => RightUpperLeg,
            RightFoot => RightLowerLeg,
            RightToes => RightFoot,
            _ => unreachable!("finger bones handled above"),
        };
        Some(parent)
    }

    /// Direct children of this bone
    pub fn children(self) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |bone| bone.parent() == Some(self))
    }

    /// Body side, `None` for bones on the centerline
    #[must_use]
    pub fn side(self) -> Option<Side> {
        let index = self.index();
        match index {
            0..=5 => None,
            6..=9 | 14..=17 | 22..=36 => Some(Side::Left),
            _ => Some(Side::Right),
        }
    }

    /// Side, finger and segment for finger bones
    #[must_use]
    pub fn finger(self) -> Option<(Side, Finger, Phalanx)> {
        let index = self.index();
        let (side, offset) = match index {
            22..=36 => (Side::Left, index - 22),
            37..=51 => (Side::Right, index - 37),
            _ => return None,
        };
        Some((side, Finger::ALL[offset / 3], Phalanx::ALL[offset % 3]))
    }

    /// Finger bone for a side, finger and segment
    #[must_use]
    pub fn finger_bone(side: Side, finger: Finger, phalanx: Phalanx) -> Self {
        let base = match side {
            Side::Left => 22,
            Side::Right => 37,
        };
        Self::ALL[base + finger as usize * 3 + phalanx as usize]
    }

    #[must_use]
    pub fn shoulder(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftShoulder,
            Side::Right => Self::RightShoulder,
        }
    }

    #[must_use]
    pub fn upper_arm(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftUpperArm,
            Side::Right => Self::RightUpperArm,
        }
    }

    #[must_use]
    pub fn lower_arm(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftLowerArm,
            Side::Right => Self::RightLowerArm,
        }
    }

    #[must_use]
    pub fn hand(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftHand,
            Side::Right => Self::RightHand,
        }
    }

    #[must_use]
    pub fn upper_leg(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftUpperLeg,
            Side::Right => Self::RightUpperLeg,
        }
    }

    #[must_use]
    pub fn lower_leg(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftLowerLeg,
            Side::Right => Self::RightLowerLeg,
        }
    }

    #[must_use]
    pub fn foot(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftFoot,
            Side::Right => Self::RightFoot,
        }
    }

    /// Next bone along the same limb or finger, whose rest offset gives this
    /// bone's pointing direction
    #[must_use]
    pub fn segment_child(self) -> Option<Self> {
        use HumanoidBone::*;

        if let Some((side, finger, phalanx)) = self.finger() {
            return match phalanx {
                Phalanx::Proximal => Some(Self::finger_bone(side, finger, Phalanx::Intermediate)),
                Phalanx::Intermediate => Some(Self::finger_bone(side, finger, Phalanx::Distal)),
                Phalanx::Distal => None,
            };
        }

        match self {
            Hips => Some(Spine),
            Spine => Some(Chest),
            Chest => Some(UpperChest),
            UpperChest => Some(Neck),
            Neck => Some(Head),
            LeftShoulder => Some(LeftUpperArm),
            LeftUpperArm => Some(LeftLowerArm),
            LeftLowerArm => Some(LeftHand),
            LeftHand => Some(LeftMiddleProximal),
            RightShoulder => Some(RightUpperArm),
            RightUpperArm => Some(RightLowerArm),
            RightLowerArm => Some(RightHand),
            RightHand => Some(RightMiddleProximal),
            LeftUpperLeg => Some(LeftLowerLeg),
            LeftLowerLeg => Some(LeftFoot),
            LeftFoot => Some(LeftToes),
            RightUpperLeg => Some(RightLowerLeg),
            RightLowerLeg => Some(RightFoot),
            RightFoot => Some(RightToes),
            _ => None,
        }
    }

    /// Canonical camelCase name
    #[must_use]
    pub fn name(self) -> &'static str {
        use HumanoidBone::*;
        match self {
            Hips => "hips",
            Spine => "spine",
            Chest => "chest",
            UpperChest => "upperChest",
            Neck => "neck",
            Head => "head",
            LeftShoulder => "leftShoulder",
            LeftUpperArm => "leftUpperArm",
            LeftLowerArm => "leftLowerArm",
            LeftHand => "leftHand",
            RightShoulder => "rightShoulder",
            RightUpperArm => "rightUpperArm",
            RightLowerArm => "rightLowerArm",
            RightHand => "rightHand",
            LeftUpperLeg => "leftUpperLeg",
            LeftLowerLeg => "leftLowerLeg",
            LeftFoot => "leftFoot",
            LeftToes => "leftToes",
            RightUpperLeg => "rightUpperLeg",
            RightLowerLeg => "rightLowerLeg",
            RightFoot => "rightFoot",
            RightToes => "rightToes",
            LeftThumbProximal => "leftThumbProximal",
            LeftThumbIntermediate => "leftThumbIntermediate",
            LeftThumbDistal => "leftThumbDistal",
            LeftIndexProximal => "leftIndexProximal",
            LeftIndexIntermediate => "leftIndexIntermediate",
            LeftIndexDistal => "leftIndexDistal",
            LeftMiddleProximal => "leftMiddleProximal",
            LeftMiddleIntermediate => "leftMiddleIntermediate",
            LeftMiddleDistal => "leftMiddleDistal",
            LeftRingProximal => "leftRingProximal",
            LeftRingIntermediate => "leftRingIntermediate",
            LeftRingDistal => "leftRingDistal",
            LeftLittleProximal => "leftLittleProximal",
            LeftLittleIntermediate => "leftLittleIntermediate",
            LeftLittleDistal => "leftLittleDistal",
            RightThumbProximal => "rightThumbProximal",
            RightThumbIntermediate => "rightThumbIntermediate",
            RightThumbDistal => "rightThumbDistal",
            RightIndexProximal => "rightIndexProximal",
            RightIndexIntermediate => "rightIndexIntermediate",
            RightIndexDistal => "rightIndexDistal",
            RightMiddleProximal => "rightMiddleProximal",
            RightMiddleIntermediate => "rightMiddleIntermediate",
            RightMiddleDistal => "rightMiddleDistal",
            RightRingProximal => "rightRingProximal",
            RightRingIntermediate => "rightRingIntermediate",
            RightRingDistal => "rightRingDistal",
            RightLittleProximal => "rightLittleProximal",
            RightLittleIntermediate => "rightLittleIntermediate",
            RightLittleDistal => "rightLittleDistal",
        }
    }
}

impl fmt::Display for HumanoidBone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed-size per-bone table indexed by [`HumanoidBone`]
#[derive(Debug, Clone, PartialEq)]
pub struct BoneMap<T>([T; HumanoidBone::COUNT]);

impl<T> BoneMap<T> {
    /// Build a table by evaluating `f` for every bone
    pub fn from_fn(mut f: impl FnMut(HumanoidBone) -> T) -> Self {
        Self(std::array::from_fn(|i| f(HumanoidBone::ALL[i])))
    }

    /// Iterate over all bones with their values
    pub fn iter(&self) -> impl Iterator<Item = (HumanoidBone, &T)> {
        HumanoidBone::ALL.iter().copied().zip(self.0.iter())
    }

    /// Iterate mutably over all bones with their values
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (HumanoidBone, &mut T)> {
        HumanoidBone::ALL.iter().copied().zip(self.0.iter_mut())
    }
}

impl<T: Default> Default for BoneMap<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> Index<HumanoidBone> for BoneMap<T> {
    type Output = T;

    fn index(&self, bone: HumanoidBone) -> &T {
        &self.0[bone.index()]
    }
}

impl<T> IndexMut<HumanoidBone> for BoneMap<T> {
    fn index_mut(&mut self, bone: HumanoidBone) -> &mut T {
        &mut self.0[bone.index()]
    }
}

impl<T> BoneMap<Option<T>> {
    /// Value for a bone, if present
    #[must_use]
    pub fn get(&self, bone: HumanoidBone) -> Option<&T> {
        self[bone].as_ref()
    }

    /// Set the value for a bone, returning the previous one
    pub fn insert(&mut self, bone: HumanoidBone, value: T) -> Option<T> {
        self[bone].replace(value)
    }

    /// Clear the value for a bone
    pub fn remove(&mut self, bone: HumanoidBone) -> Option<T> {
        self[bone].take()
    }

    /// Whether a value is present for the bone
    #[must_use]
    pub fn contains(&self, bone: HumanoidBone) -> bool {
        self[bone].is_some()
    }

    /// Number of bones with a value
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.iter().filter(|value| value.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Clear every entry
    pub fn clear(&mut self) {
        for value in &mut self.0 {
            *value = None;
        }
    }

    /// Iterate over present entries only
    pub fn present(&self) -> impl Iterator<Item = (HumanoidBone, &T)> {
        self.iter().filter_map(|(bone, value)| value.as_ref().map(|v| (bone, v)))
    }
}

/// Resolves third-party rig bone names to canonical bones
///
/// Covers the canonical camelCase names, Unity/VRM PascalCase names, Mixamo
/// (`mixamorig:LeftArm`), VRoid (`J_Bip_L_UpperArm`) and Blender metarig
/// (`upper_arm.L`) conventions. Matching ignores case and separators.
#[derive(Debug, Clone)]
pub struct BoneAliasTable {
    aliases: HashMap<String, HumanoidBone>,
}

impl BoneAliasTable {
    /// Build the table of known aliases
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self { aliases: HashMap::new() };
        for bone in HumanoidBone::ALL {
            table.add(bone.name(), bone);
            for alias in rig_aliases(bone) {
                table.add(&alias, bone);
            }
        }
        table
    }

    /// Register an extra alias; the first registration of a key wins
    pub fn add(&mut self, alias: &str, bone: HumanoidBone) {
        let key = normalize_rig_name(alias);
        if key.is_empty() {
            return;
        }
        if let Some(existing) = self.aliases.get(&key) {
            if *existing != bone {
                debug!("Alias '{alias}' already maps to {existing}, ignoring {bone}");
            }
            return;
        }
        self.aliases.insert(key, bone);
    }

    /// Resolve a rig bone name
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<HumanoidBone> {
        self.aliases.get(&normalize_rig_name(name)).copied()
    }

    /// Number of registered aliases
    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl Default for BoneAliasTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase, drop the Mixamo namespace and every non-alphanumeric character
fn normalize_rig_name(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    // Mixamo prefixes are numbered when several rigs share a scene (mixamorig1:)
    let stripped = lower
        .strip_prefix("mixamorig")
        .map_or(lower.as_str(), |rest| rest.trim_start_matches(|c: char| c.is_ascii_digit()));
    stripped.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Per-convention names for one bone, without side markers
struct RigNames {
    pascal: &'static str,
    mixamo: &'static str,
    blender: &'static str,
}

fn rig_names(bone: HumanoidBone) -> Option<RigNames> {
    use HumanoidBone::*;

    let names = |pascal, mixamo, blender| RigNames { pascal, mixamo, blender };
    Some(match bone {
        Hips => names("Hips", "Hips", "pelvis"),
        Spine => names("Spine", "Spine", "spine"),
        Chest => names("Chest", "Spine1", "chest"),
        UpperChest => names("UpperChest", "Spine2", "upper_chest"),
        Neck => names("Neck", "Neck", "neck"),
        Head => names("Head", "Head", "head"),
        LeftShoulder | RightShoulder => names("Shoulder", "Shoulder", "shoulder"),
        LeftUpperArm | RightUpperArm => names("UpperArm", "Arm", "upper_arm"),
        LeftLowerArm | RightLowerArm => names("LowerArm", "ForeArm", "forearm"),
        LeftHand | RightHand => names("Hand", "Hand", "hand"),
        LeftUpperLeg | RightUpperLeg => names("UpperLeg", "UpLeg", "thigh"),
        LeftLowerLeg | RightLowerLeg => names("LowerLeg", "Leg", "shin"),
        LeftFoot | RightFoot => names("Foot", "Foot", "foot"),
        LeftToes | RightToes => names("Toes", "ToeBase", "toe"),
        _ => return None,
    })
}

fn rig_aliases(bone: HumanoidBone) -> Vec<String> {
    if let Some((side, finger, phalanx)) = bone.finger() {
        return finger_aliases(side, finger, phalanx);
    }

    let Some(names) = rig_names(bone) else {
        return Vec::new();
    };

    match bone.side() {
        None => vec![
            names.pascal.to_string(),
            names.mixamo.to_string(),
            names.blender.to_string(),
            format!("J_Bip_C_{}", names.pascal),
        ],
        Some(side) => {
            let (word, letter) = side_markers(side);
            let vroid_part = if names.mixamo == "ToeBase" { "ToeBase" } else { names.pascal };
            vec![
                format!("{word}{}", names.pascal),
                format!("{word}{}", names.mixamo),
                format!("{}.{letter}", names.blender),
                format!("J_Bip_{letter}_{vroid_part}"),
            ]
        }
    }
}

fn finger_aliases(side: Side, finger: Finger, phalanx: Phalanx) -> Vec<String> {
    let (word, letter) = side_markers(side);
    let segment = phalanx as usize + 1;
    let (pascal, mixamo, blender) = match finger {
        Finger::Thumb => ("Thumb", "Thumb", "thumb"),
        Finger::Index => ("Index", "Index", "f_index"),
        Finger::Middle => ("Middle", "Middle", "f_middle"),
        Finger::Ring => ("Ring", "Ring", "f_ring"),
        Finger::Little => ("Little", "Pinky", "f_pinky"),
    };
    let phalanx_name = match phalanx {
        Phalanx::Proximal => "Proximal",
        Phalanx::Intermediate => "Intermediate",
        Phalanx::Distal => "Distal",
    };
    vec![
        format!("{word}{pascal}{phalanx_name}"),
        format!("{word}Hand{mixamo}{segment}"),
        format!("J_Bip_{letter}_{pascal}{segment}"),
        format!("{blender}.0{segment}.{letter}"),
    ]
}

fn side_markers(side: Side) -> (&'static str, &'static str) {
    match side {
        Side::Left => ("Left", "L"),
        Side::Right => ("Right", "R"),
    }
}
