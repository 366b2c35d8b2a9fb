//! Rig access
//!
//! The retargeting core reads rest geometry from, and writes local rotations
//! and expression weights to, a humanoid rig owned by someone else. Bones are
//! looked up by semantic identifier once, when the engine attaches, and the
//! resulting node handles are reused every frame.

pub mod bones;
pub mod skeleton;

pub use bones::{HumanoidBone, Side};
pub use skeleton::{NodeDescription, Skeleton, SkeletonDescription};

use glam::{Quat, Vec3};

/// Opaque node handle within a rig
pub type NodeId = usize;

/// Accessor for an externally owned humanoid rig.
pub trait Rig {
    /// Resolve a semantic bone to a node, if the rig has it.
    fn find_bone(&self, bone: HumanoidBone) -> Option<NodeId>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Bind-pose local rotation
    fn rest_rotation(&self, node: NodeId) -> Quat;

    /// Current local rotation (relative to parent)
    fn local_rotation(&self, node: NodeId) -> Quat;

    fn set_local_rotation(&mut self, node: NodeId, rotation: Quat);

    /// Rest-pose offset from this node to its child, in this node's local
    /// frame. Zero for leaf nodes.
    fn child_offset(&self, node: NodeId) -> Vec3;

    fn has_expression(&self, name: &str) -> bool;

    fn expression_weight(&self, name: &str) -> f32;

    fn set_expression_weight(&mut self, name: &str, weight: f32);

    /// Current world rotation, composed from the parent chain.
    fn world_rotation(&self, node: NodeId) -> Quat {
        let mut rotation = self.local_rotation(node);
        let mut current = self.parent(node);
        while let Some(parent) = current {
            rotation = self.local_rotation(parent) * rotation;
            current = self.parent(parent);
        }
        rotation
    }

    /// World rotation of the parent, identity for roots.
    fn parent_world_rotation(&self, node: NodeId) -> Quat {
        self.parent(node)
            .map(|p| self.world_rotation(p))
            .unwrap_or(Quat::IDENTITY)
    }
}

/// Bone → node table resolved once per attached rig. `None` marks a bone the
/// rig does not have; every driver checks it before touching the rig.
#[derive(Debug, Clone)]
pub struct RigBinding {
    nodes: [Option<NodeId>; HumanoidBone::COUNT],
}

impl RigBinding {
    pub fn resolve<R: Rig + ?Sized>(rig: &R) -> Self {
        let mut nodes = [None; HumanoidBone::COUNT];
        for &bone in HumanoidBone::ALL {
            nodes[bone.index()] = rig.find_bone(bone);
        }
        Self { nodes }
    }

    pub fn get(&self, bone: HumanoidBone) -> Option<NodeId> {
        self.nodes[bone.index()]
    }

    pub fn bound_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn missing(&self) -> impl Iterator<Item = HumanoidBone> + '_ {
        HumanoidBone::ALL
            .iter()
            .copied()
            .filter(move |b| self.nodes[b.index()].is_none())
    }
}
