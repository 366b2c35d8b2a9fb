//! In-memory humanoid skeleton.
//!
//! Holds rest-pose TRS, parent links, current local rotations and expression
//! channels for a node hierarchy. Parents always precede their children, so
//! forward kinematics is a single pass in node order.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::bones::HumanoidBone;
use super::{NodeId, Rig};
use crate::error::{MarionetteError, RigError};

/// VRM 1.0 expression presets exposed by the built-in rig
pub const EXPRESSION_PRESETS: &[&str] = &[
    "happy", "angry", "sad", "relaxed", "surprised", "aa", "ih", "ou", "ee", "oh", "blink",
    "blinkLeft", "blinkRight", "lookUp", "lookDown", "lookLeft", "lookRight", "neutral",
];

#[derive(Debug, Clone)]
struct SkeletonNode {
    name: String,
    parent: Option<NodeId>,
    rest_translation: Vec3,
    rest_rotation: Quat,
    rotation: Quat,
}

/// A node hierarchy with humanoid bone bindings
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    nodes: Vec<SkeletonNode>,
    name_to_node: HashMap<String, NodeId>,
    bone_to_node: HashMap<HumanoidBone, NodeId>,
    node_to_bone: HashMap<NodeId, HumanoidBone>,
    expressions: BTreeMap<String, f32>,
}

/// Serialized form of a skeleton (TOML)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonDescription {
    pub expressions: Vec<String>,
    pub nodes: Vec<NodeDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDescription {
    pub name: String,
    /// Parent node name; must be declared earlier
    #[serde(default)]
    pub parent: Option<String>,
    /// Rest translation relative to the parent
    #[serde(default)]
    pub translation: [f32; 3],
    /// Rest rotation quaternion [x, y, z, w]
    #[serde(default = "identity_quat")]
    pub rotation: [f32; 4],
    /// Humanoid bone this node represents (VRM name)
    #[serde(default)]
    pub bone: Option<String>,
}

fn identity_quat() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node. Its rotation starts at the rest rotation.
    pub fn add_node(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        rest_translation: Vec3,
        rest_rotation: Quat,
    ) -> NodeId {
        let id = self.nodes.len();
        let parent = parent.filter(|&p| p < id);
        self.nodes.push(SkeletonNode {
            name: name.to_string(),
            parent,
            rest_translation,
            rest_rotation,
            rotation: rest_rotation,
        });
        self.name_to_node.insert(name.to_string(), id);
        id
    }

    /// Mark `node` as the given humanoid bone.
    pub fn bind(&mut self, bone: HumanoidBone, node: NodeId) {
        if node < self.nodes.len() {
            self.bone_to_node.insert(bone, node);
            self.node_to_bone.insert(node, bone);
        }
    }

    pub fn add_expression(&mut self, name: &str) {
        self.expressions.entry(name.to_string()).or_insert(0.0);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.name_to_node.get(name).copied()
    }

    pub fn node_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node).map(|n| n.name.as_str())
    }

    pub fn expressions(&self) -> &BTreeMap<String, f32> {
        &self.expressions
    }

    /// Bound humanoid bones with their current local rotations.
    pub fn bone_rotations(&self) -> BTreeMap<HumanoidBone, Quat> {
        self.bone_to_node
            .iter()
            .map(|(&bone, &node)| (bone, self.nodes[node].rotation))
            .collect()
    }

    /// Put every node back to its rest rotation and zero all expressions.
    pub fn reset_pose(&mut self) {
        for node in &mut self.nodes {
            node.rotation = node.rest_rotation;
        }
        for weight in self.expressions.values_mut() {
            *weight = 0.0;
        }
    }

    /// World transforms for all nodes using the current rotations.
    pub fn world_transforms(&self) -> Vec<Mat4> {
        let mut world = vec![Mat4::IDENTITY; self.nodes.len()];
        for (idx, node) in self.nodes.iter().enumerate() {
            let local = Mat4::from_rotation_translation(node.rotation, node.rest_translation);
            world[idx] = match node.parent {
                Some(parent) => world[parent] * local,
                None => local,
            };
        }
        world
    }

    pub fn world_position(&self, node: NodeId) -> Vec3 {
        self.world_transforms()
            .get(node)
            .map(|m| m.col(3).truncate())
            .unwrap_or(Vec3::ZERO)
    }

    /// Build from a description; parents must be declared before children.
    pub fn from_description(desc: &SkeletonDescription) -> Result<Self, MarionetteError> {
        let mut skeleton = Self::new();

        for node in &desc.nodes {
            if skeleton.name_to_node.contains_key(&node.name) {
                return Err(RigError::DuplicateNode(node.name.clone()).into());
            }

            let parent = match &node.parent {
                Some(parent_name) => Some(skeleton.node_by_name(parent_name).ok_or_else(|| {
                    RigError::UnknownParent {
                        node: node.name.clone(),
                        parent: parent_name.clone(),
                    }
                })?),
                None => None,
            };

            let rotation = Quat::from_array(node.rotation).normalize();
            let id = skeleton.add_node(
                &node.name,
                parent,
                Vec3::from_array(node.translation),
                rotation,
            );

            if let Some(bone_name) = &node.bone {
                let bone = HumanoidBone::from_vrm_name(bone_name)
                    .ok_or_else(|| RigError::UnknownBone(bone_name.clone()))?;
                skeleton.bind(bone, id);
            }
        }

        for name in &desc.expressions {
            skeleton.add_expression(name);
        }

        Ok(skeleton)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, MarionetteError> {
        let desc: SkeletonDescription =
            toml::from_str(s).map_err(|e| RigError::Parse(e.to_string()))?;
        Self::from_description(&desc)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MarionetteError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| RigError::ReadFile(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// A VRM-style humanoid in T-pose (metres, facing +Z, left side on +X,
    /// all rest rotations identity) with every humanoid bone and the VRM
    /// expression presets.
    pub fn t_pose() -> Self {
        use HumanoidBone::*;

        let mut s = Self::new();
        let add = |s: &mut Self, bone: HumanoidBone, parent: Option<NodeId>, t: [f32; 3]| {
            let id = s.add_node(bone.vrm_name(), parent, Vec3::from_array(t), Quat::IDENTITY);
            s.bind(bone, id);
            id
        };

        let hips = add(&mut s, Hips, None, [0.0, 1.0, 0.0]);
        let spine = add(&mut s, Spine, Some(hips), [0.0, 0.1, 0.0]);
        let chest = add(&mut s, Chest, Some(spine), [0.0, 0.12, 0.0]);
        let upper_chest = add(&mut s, UpperChest, Some(chest), [0.0, 0.12, 0.0]);
        let neck = add(&mut s, Neck, Some(upper_chest), [0.0, 0.14, 0.0]);
        add(&mut s, Head, Some(neck), [0.0, 0.1, 0.0]);

        for (sign, bones) in [
            (1.0f32, [LeftShoulder, LeftUpperArm, LeftLowerArm, LeftHand]),
            (-1.0f32, [RightShoulder, RightUpperArm, RightLowerArm, RightHand]),
        ] {
            let shoulder = add(&mut s, bones[0], Some(upper_chest), [0.05 * sign, 0.1, 0.0]);
            let upper = add(&mut s, bones[1], Some(shoulder), [0.1 * sign, 0.0, 0.0]);
            let lower = add(&mut s, bones[2], Some(upper), [0.28 * sign, 0.0, 0.0]);
            let hand = add(&mut s, bones[3], Some(lower), [0.25 * sign, 0.0, 0.0]);

            let side = if sign > 0.0 {
                super::Side::Left
            } else {
                super::Side::Right
            };
            let fingers = HumanoidBone::fingers(side);

            // Thumb angles forward out of the palm
            let thumb = fingers[0];
            let t0 = add(&mut s, thumb[0], Some(hand), [0.02 * sign, -0.01, 0.03]);
            let t1 = add(&mut s, thumb[1], Some(t0), [0.035 * sign, 0.0, 0.02]);
            let t2 = add(&mut s, thumb[2], Some(t1), [0.03 * sign, 0.0, 0.0]);
            s.add_node(
                &format!("{}_end", thumb[2].vrm_name()),
                Some(t2),
                Vec3::new(0.025 * sign, 0.0, 0.0),
                Quat::IDENTITY,
            );

            let spreads = [0.025f32, 0.008, -0.009, -0.025];
            let lengths = [
                [0.04f32, 0.025, 0.02],
                [0.045, 0.028, 0.022],
                [0.042, 0.026, 0.02],
                [0.032, 0.02, 0.018],
            ];
            for ((chain, spread), len) in fingers[1..].iter().zip(spreads).zip(lengths) {
                let p = add(&mut s, chain[0], Some(hand), [0.09 * sign, 0.0, spread]);
                let i = add(&mut s, chain[1], Some(p), [len[0] * sign, 0.0, 0.0]);
                let d = add(&mut s, chain[2], Some(i), [len[1] * sign, 0.0, 0.0]);
                s.add_node(
                    &format!("{}_end", chain[2].vrm_name()),
                    Some(d),
                    Vec3::new(len[2] * sign, 0.0, 0.0),
                    Quat::IDENTITY,
                );
            }
        }

        for name in EXPRESSION_PRESETS {
            s.add_expression(name);
        }

        s
    }
}

impl Rig for Skeleton {
    fn find_bone(&self, bone: HumanoidBone) -> Option<NodeId> {
        self.bone_to_node.get(&bone).copied()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    fn rest_rotation(&self, node: NodeId) -> Quat {
        self.nodes
            .get(node)
            .map(|n| n.rest_rotation)
            .unwrap_or(Quat::IDENTITY)
    }

    fn local_rotation(&self, node: NodeId) -> Quat {
        self.nodes
            .get(node)
            .map(|n| n.rotation)
            .unwrap_or(Quat::IDENTITY)
    }

    fn set_local_rotation(&mut self, node: NodeId, rotation: Quat) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.rotation = rotation;
        }
    }

    /// Offset to the first humanoid child if there is one, else the first child.
    fn child_offset(&self, node: NodeId) -> Vec3 {
        let mut first = None;
        for (idx, n) in self.nodes.iter().enumerate() {
            if n.parent != Some(node) {
                continue;
            }
            if self.node_to_bone.contains_key(&idx) {
                return n.rest_translation;
            }
            first.get_or_insert(n.rest_translation);
        }
        first.unwrap_or(Vec3::ZERO)
    }

    fn has_expression(&self, name: &str) -> bool {
        self.expressions.contains_key(name)
    }

    fn expression_weight(&self, name: &str) -> f32 {
        self.expressions.get(name).copied().unwrap_or(0.0)
    }

    fn set_expression_weight(&mut self, name: &str, weight: f32) {
        if let Some(w) = self.expressions.get_mut(name) {
            *w = weight;
        }
    }
}
