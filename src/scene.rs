//! The scene graph: every renderable node and light of the scene.
//!
//! Insertion is append-only. Nodes arrive fully formed, so a reader never
//! sees a partially built node.

use crate::core::{LightId, LightSource, NodeId, SceneNode, Spot};

#[derive(Default, Debug)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    lights: Vec<LightSource>,
    /// The first spot light added; the render loop animates this one.
    animated_spot: Option<LightId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: SceneNode) -> NodeId {
        let id = node.id;
        self.nodes.push(node);
        id
    }

    pub fn add_light(&mut self, light: LightSource) -> LightId {
        let id = LightId(self.lights.len());
        if matches!(light, LightSource::Spot(_)) && self.animated_spot.is_none() {
            self.animated_spot = Some(id);
        }
        self.lights.push(light);
        id
    }

    /// Every node, in insertion order. Order carries no meaning for drawing;
    /// all materials are opaque.
    pub fn renderables(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter()
    }

    pub fn lights(&self) -> impl Iterator<Item = (LightId, &LightSource)> {
        self.lights.iter().enumerate().map(|(i, l)| (LightId(i), l))
    }

    pub fn light(&self, id: LightId) -> Option<&LightSource> {
        self.lights.get(id.0)
    }

    pub fn spot_id(&self) -> Option<LightId> {
        self.animated_spot
    }

    pub fn spot(&self) -> Option<&Spot> {
        match self.lights.get(self.animated_spot?.0)? {
            LightSource::Spot(spot) => Some(spot),
            LightSource::Ambient(_) => None,
        }
    }

    pub fn spot_mut(&mut self) -> Option<&mut Spot> {
        match self.lights.get_mut(self.animated_spot?.0)? {
            LightSource::Spot(spot) => Some(spot),
            LightSource::Ambient(_) => None,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_named(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }
}
