//! Scene graph
//!
//! Nodes live in a slot arena addressed by generational [`NodeId`]s, so a
//! stale id held after removal never aliases a newer node.

use std::rc::Rc;

use glam::{Mat2, Vec2};

use super::texture::Texture;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
    /// Pivot as a fraction of the texture size
    pub anchor: Vec2,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            anchor: Vec2::ZERO,
        }
    }
}

impl Transform {
    /// Child transform expressed in this transform's parent space
    pub fn then(&self, child: &Transform) -> Transform {
        let local = Mat2::from_angle(self.rotation) * (child.position * self.scale);
        Transform {
            position: self.position + local,
            rotation: self.rotation + child.rotation,
            scale: self.scale * child.scale,
            anchor: child.anchor,
        }
    }
}

/// Frame-sequence playback state
#[derive(Debug, Clone)]
pub struct Animation {
    pub frames: Vec<Rc<Texture>>,
    /// Frames per 1/60 s
    pub speed: f32,
    pub looping: bool,
    playing: bool,
    cursor: f32,
    play_calls: u32,
    stop_calls: u32,
}

impl Animation {
    pub fn new(frames: Vec<Rc<Texture>>, speed: f32, looping: bool) -> Self {
        Self {
            frames,
            speed,
            looping,
            playing: false,
            cursor: 0.0,
            play_calls: 0,
            stop_calls: 0,
        }
    }

    /// A finished one-shot restarts from its first frame
    pub fn play(&mut self) {
        self.play_calls += 1;
        if !self.looping && self.cursor >= self.last_index() as f32 {
            self.cursor = 0.0;
        }
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.stop_calls += 1;
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current_frame(&self) -> usize {
        (self.cursor.floor() as usize).min(self.last_index())
    }

    pub fn texture(&self) -> Option<&Rc<Texture>> {
        self.frames.get(self.current_frame())
    }

    /// Play/stop call counts, for observing switching behaviour
    pub fn call_counts(&self) -> (u32, u32) {
        (self.play_calls, self.stop_calls)
    }

    fn last_index(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    /// Advance by `delta` seconds
    pub fn tick(&mut self, delta: f32) {
        if !self.playing || self.frames.is_empty() {
            return;
        }
        self.cursor += self.speed * delta * crate::consts::REFERENCE_FPS;
        let len = self.frames.len() as f32;
        if self.looping {
            self.cursor = self.cursor.rem_euclid(len);
        } else if self.cursor >= self.last_index() as f32 {
            self.cursor = self.last_index() as f32;
            self.playing = false;
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Named grouping layer
    Container { name: String },
    Sprite { texture: Rc<Texture> },
    Animated(Animation),
    /// Flat batch for many small sprites
    ParticleContainer { max_size: usize },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub transform: Transform,
    pub z_index: i32,
    pub visible: bool,
    pub alpha: f32,
    /// 0xRRGGBB multiplier
    pub tint: u32,
    pub blend: BlendMode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            transform: Transform::default(),
            z_index: 0,
            visible: true,
            alpha: 1.0,
            tint: 0xffffff,
            blend: BlendMode::Normal,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn container(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Container { name: name.into() })
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Texture to draw this frame, if any
    pub fn texture(&self) -> Option<&Rc<Texture>> {
        match &self.kind {
            NodeKind::Sprite { texture } => Some(texture),
            NodeKind::Animated(anim) => anim.texture(),
            _ => None,
        }
    }

    pub fn animation(&self) -> Option<&Animation> {
        match &self.kind {
            NodeKind::Animated(anim) => Some(anim),
            _ => None,
        }
    }

    pub fn animation_mut(&mut self) -> Option<&mut Animation> {
        match &mut self.kind {
            NodeKind::Animated(anim) => Some(anim),
            _ => None,
        }
    }
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A drawable reached by walking the graph
#[derive(Debug, Clone)]
pub struct Visible<'a> {
    pub id: NodeId,
    pub node: &'a Node,
    pub world: Transform,
    pub alpha: f32,
}

pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        let mut graph = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        graph.root = graph.allocate(Node::container("stage"));
        graph
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Attach `node` under `parent` (the root if `parent` is gone)
    pub fn insert(&mut self, mut node: Node, parent: NodeId) -> NodeId {
        let parent = if self.contains(parent) {
            parent
        } else {
            self.root
        };
        node.parent = Some(parent);
        node.children.clear();
        let id = self.allocate(node);
        if let Some(p) = self.get_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// Detach and free `id` and its whole subtree. Returns the nodes freed.
    /// The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> usize {
        if id == self.root || !self.contains(id) {
            return 0;
        }
        if let Some(parent) = self.get(id).and_then(|n| n.parent) {
            if let Some(p) = self.get_mut(parent) {
                p.children.retain(|c| *c != id);
            }
        }

        let mut freed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let slot = &mut self.slots[next.index as usize];
            if slot.generation != next.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
                slot.generation += 1;
                self.free.push(next.index);
                freed += 1;
            }
        }
        freed
    }

    /// Live nodes, root included
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.slots.iter_mut().filter_map(|s| s.node.as_mut())
    }

    /// Depth-first walk in draw order: children sorted by z-index (stable),
    /// hidden subtrees skipped, transforms and alpha composed downwards.
    pub fn draw_order(&self) -> Vec<Visible<'_>> {
        let mut out = Vec::new();
        if let Some(root) = self.get(self.root) {
            self.walk(self.root, root, Transform::default(), 1.0, &mut out);
        }
        out
    }

    fn walk<'a>(
        &'a self,
        id: NodeId,
        node: &'a Node,
        parent: Transform,
        parent_alpha: f32,
        out: &mut Vec<Visible<'a>>,
    ) {
        if !node.visible {
            return;
        }
        let world = parent.then(&node.transform);
        let alpha = parent_alpha * node.alpha;
        out.push(Visible {
            id,
            node,
            world,
            alpha,
        });

        let mut children: Vec<(NodeId, &Node)> = node
            .children
            .iter()
            .filter_map(|&c| self.get(c).map(|n| (c, n)))
            .collect();
        children.sort_by_key(|(_, n)| n.z_index);
        for (child_id, child) in children {
            self.walk(child_id, child, world, alpha, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tex(name: &str) -> Rc<Texture> {
        Rc::new(Texture::baked(name, 10, 10, |_| {}))
    }

    #[test]
    fn test_stale_id_does_not_alias() {
        let mut g = SceneGraph::new();
        let root = g.root();
        let a = g.insert(Node::new(NodeKind::Sprite { texture: tex("a") }), root);
        assert_eq!(g.remove(a), 1);
        let b = g.insert(Node::new(NodeKind::Sprite { texture: tex("b") }), root);
        assert!(!g.contains(a));
        assert!(g.contains(b));
        assert_eq!(g.remove(a), 0);
    }

    #[test]
    fn test_remove_frees_subtree() {
        let mut g = SceneGraph::new();
        let root = g.root();
        let layer = g.insert(Node::container("layer"), root);
        let child = g.insert(Node::new(NodeKind::Sprite { texture: tex("a") }), layer);
        assert_eq!(g.remove(layer), 2);
        assert!(!g.contains(child));
        assert_eq!(g.len(), 1);
        assert!(g.get(root).unwrap().children().is_empty());
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let mut g = SceneGraph::new();
        assert_eq!(g.remove(g.root()), 0);
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_draw_order_follows_z_index() {
        let mut g = SceneGraph::new();
        let root = g.root();
        let mut top = Node::container("top");
        top.z_index = 50;
        let mut bottom = Node::container("bottom");
        bottom.z_index = 0;
        let top = g.insert(top, root);
        let bottom = g.insert(bottom, root);
        let order: Vec<NodeId> = g.draw_order().iter().map(|v| v.id).collect();
        assert_eq!(order, vec![root, bottom, top]);
    }

    #[test]
    fn test_hidden_subtree_skipped_and_transforms_compose() {
        let mut g = SceneGraph::new();
        let root = g.root();
        let mut layer = Node::container("layer");
        layer.transform.position = Vec2::new(10.0, 0.0);
        layer.alpha = 0.5;
        let layer = g.insert(layer, root);
        let mut sprite = Node::new(NodeKind::Sprite { texture: tex("a") });
        sprite.transform.position = Vec2::new(5.0, 5.0);
        let sprite = g.insert(sprite, layer);

        let visible = g.draw_order();
        let drawn = visible.iter().find(|v| v.id == sprite).unwrap();
        assert_eq!(drawn.world.position, Vec2::new(15.0, 5.0));
        assert_eq!(drawn.alpha, 0.5);

        g.get_mut(layer).unwrap().visible = false;
        assert!(g.draw_order().iter().all(|v| v.id != sprite));
    }

    #[test]
    fn test_one_shot_animation_clamps_and_restarts() {
        let mut anim = Animation::new(vec![tex("0"), tex("1"), tex("2")], 0.5, false);
        anim.play();
        for _ in 0..20 {
            anim.tick(1.0 / 60.0);
        }
        assert_eq!(anim.current_frame(), 2);
        assert!(!anim.is_playing());
        anim.play();
        assert_eq!(anim.current_frame(), 0);
        assert_eq!(anim.call_counts(), (2, 0));
    }

    #[test]
    fn test_looping_animation_wraps() {
        let mut anim = Animation::new(vec![tex("0"), tex("1")], 1.0, true);
        anim.play();
        // 1.2 frames per tick
        anim.tick(0.02);
        assert_eq!(anim.current_frame(), 1);
        anim.tick(0.02);
        assert_eq!(anim.current_frame(), 0);
        assert!(anim.is_playing());
    }
}
