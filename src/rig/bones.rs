//! Humanoid bone identifiers (VRM humanoid naming).

/// Rig-side body side. Tracker handedness maps onto this through mirroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

macro_rules! humanoid_bones {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Stable semantic bone identifier.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum HumanoidBone {
            $($variant),*
        }

        impl HumanoidBone {
            pub const ALL: &'static [HumanoidBone] = &[$(HumanoidBone::$variant),*];
            pub const COUNT: usize = Self::ALL.len();

            /// VRM humanoid bone name
            pub fn vrm_name(self) -> &'static str {
                match self {
                    $(HumanoidBone::$variant => $name),*
                }
            }

            pub fn from_vrm_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(HumanoidBone::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

humanoid_bones! {
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

    LeftThumbMetacarpal => "leftThumbMetacarpal",
    LeftThumbProximal => "leftThumbProximal",
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

    RightThumbMetacarpal => "rightThumbMetacarpal",
    RightThumbProximal => "rightThumbProximal",
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

impl HumanoidBone {
    /// Position in `ALL`, used to index fixed-size binding tables.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn upper_arm(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftUpperArm,
            Side::Right => Self::RightUpperArm,
        }
    }

    pub fn lower_arm(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftLowerArm,
            Side::Right => Self::RightLowerArm,
        }
    }

    pub fn hand(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftHand,
            Side::Right => Self::RightHand,
        }
    }

    /// Finger chains, thumb first, each ordered root → tip.
    pub fn fingers(side: Side) -> [[HumanoidBone; 3]; 5] {
        use HumanoidBone::*;
        match side {
            Side::Left => [
                [LeftThumbMetacarpal, LeftThumbProximal, LeftThumbDistal],
                [LeftIndexProximal, LeftIndexIntermediate, LeftIndexDistal],
                [LeftMiddleProximal, LeftMiddleIntermediate, LeftMiddleDistal],
                [LeftRingProximal, LeftRingIntermediate, LeftRingDistal],
                [LeftLittleProximal, LeftLittleIntermediate, LeftLittleDistal],
            ],
            Side::Right => [
                [RightThumbMetacarpal, RightThumbProximal, RightThumbDistal],
                [RightIndexProximal, RightIndexIntermediate, RightIndexDistal],
                [RightMiddleProximal, RightMiddleIntermediate, RightMiddleDistal],
                [RightRingProximal, RightRingIntermediate, RightRingDistal],
                [RightLittleProximal, RightLittleIntermediate, RightLittleDistal],
            ],
        }
    }
}

impl std::fmt::Display for HumanoidBone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.vrm_name())
    }
}
