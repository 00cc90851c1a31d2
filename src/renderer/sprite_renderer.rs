//! Layered sprite renderer
//!
//! Owns the scene graph, the texture cache and the id → node maps for
//! sprites, animations and particle containers. Lookups by unknown id are
//! silent no-ops: an entity removed last frame is expected, not an error.

use std::collections::HashMap;
use std::rc::Rc;

use futures::future::join_all;
use glam::Vec2;

use super::scene::{Animation, Node, NodeId, NodeKind, SceneGraph};
use super::surface::{DrawList, Surface};
use super::texture::{Texture, TextureCache, TextureLoader};
use crate::error::AssetError;
use crate::sprites::CommandRecorder;

/// Default layer names
pub mod layers {
    pub const BACKGROUND: &str = "background";
    pub const OBSTACLES: &str = "obstacles";
    pub const PROJECTILES: &str = "projectiles";
    pub const PLAYERS: &str = "players";
    pub const EFFECTS: &str = "effects";
    pub const UI: &str = "ui";

    /// Name and z-index, bottom to top
    pub const DEFAULT: [(&str, i32); 6] = [
        (BACKGROUND, 0),
        (OBSTACLES, 10),
        (PROJECTILES, 20),
        (PLAYERS, 30),
        (EFFECTS, 40),
        (UI, 50),
    ];
}

/// Placement shared by sprites and animations. `None` keeps the texture's
/// native transform.
#[derive(Debug, Clone, Default)]
pub struct Placement {
    pub position: Option<Vec2>,
    pub anchor: Option<Vec2>,
    pub scale: Option<Vec2>,
    pub rotation: Option<f32>,
    /// Layer name; unknown or missing layers fall back to the stage root
    pub container: Option<String>,
    pub z_index: Option<i32>,
}

impl Placement {
    pub fn in_layer(layer: &str) -> Self {
        Self {
            container: Some(layer.to_owned()),
            ..Default::default()
        }
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    pub fn centered(mut self) -> Self {
        self.anchor = Some(Vec2::splat(0.5));
        self
    }

    pub fn scaled(mut self, scale: Vec2) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn rotated(mut self, rotation: f32) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn z(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }
}

#[derive(Debug, Clone)]
pub struct AnimationOptions {
    pub frames: Vec<String>,
    /// Frames per 1/60 s
    pub speed: f32,
    pub looping: bool,
    pub auto_play: bool,
}

impl AnimationOptions {
    pub fn new(frames: Vec<String>) -> Self {
        Self {
            frames,
            speed: 1.0,
            looping: true,
            auto_play: false,
        }
    }
}

pub struct SpriteRenderer {
    scene: SceneGraph,
    containers: HashMap<String, NodeId>,
    textures: TextureCache,
    sprites: HashMap<String, NodeId>,
    animations: HashMap<String, NodeId>,
    particle_systems: HashMap<String, NodeId>,
    surface: Option<Box<dyn Surface>>,
    size: (u32, u32),
    background_color: u32,
}

impl SpriteRenderer {
    pub fn new(width: u32, height: u32, background_color: u32) -> Self {
        let mut renderer = Self {
            scene: SceneGraph::new(),
            containers: HashMap::new(),
            textures: TextureCache::new(),
            sprites: HashMap::new(),
            animations: HashMap::new(),
            particle_systems: HashMap::new(),
            surface: None,
            size: (width, height),
            background_color,
        };
        for (name, z) in layers::DEFAULT {
            renderer.create_container(name, z);
        }
        log::info!("Renderer initialized ({width}x{height})");
        renderer
    }

    /// Attach the presentation surface. Only the first call takes effect.
    pub fn initialize(&mut self, mut surface: Box<dyn Surface>) {
        if self.surface.is_some() {
            log::warn!("Renderer already attached to a surface");
            return;
        }
        let (w, h) = self.size;
        if surface.size() != self.size {
            surface.resize(w, h);
        }
        self.surface = Some(surface);
        log::info!("Renderer attached to surface");
    }

    pub fn is_initialized(&self) -> bool {
        self.surface.is_some()
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    // --- Containers ---

    /// Named layer under the stage; an existing layer just takes the new z
    pub fn create_container(&mut self, name: &str, z_index: i32) -> NodeId {
        if let Some(&id) = self.containers.get(name) {
            if let Some(node) = self.scene.get_mut(id) {
                node.z_index = z_index;
            }
            return id;
        }
        let mut node = Node::container(name);
        node.z_index = z_index;
        let id = self.scene.insert(node, self.scene.root());
        self.containers.insert(name.to_owned(), id);
        id
    }

    pub fn container(&self, name: &str) -> Option<NodeId> {
        self.containers.get(name).copied()
    }

    fn parent_for(&self, container: Option<&str>) -> NodeId {
        container
            .and_then(|name| self.containers.get(name).copied())
            .unwrap_or_else(|| self.scene.root())
    }

    // --- Textures ---

    /// Load one texture; failures are logged and returned
    pub async fn load_texture(
        &mut self,
        loader: &impl TextureLoader,
        name: &str,
        url: &str,
    ) -> Result<Rc<Texture>, AssetError> {
        match loader.load(url).await {
            Ok(data) => {
                log::debug!("Texture loaded: {name}");
                Ok(self.textures.insert(Texture::new(name, data)))
            }
            Err(e) => {
                log::error!("Failed to load texture `{name}`: {e}");
                Err(e)
            }
        }
    }

    /// Load `(name, url)` pairs concurrently. Every success is cached even
    /// when some fail; the error lists the names that did not load.
    pub async fn load_textures(
        &mut self,
        loader: &impl TextureLoader,
        entries: &[(&str, &str)],
    ) -> Result<(), AssetError> {
        let results = join_all(entries.iter().map(|(_, url)| loader.load(url))).await;

        let mut failed = Vec::new();
        for (&(name, _), result) in entries.iter().zip(results) {
            match result {
                Ok(data) => {
                    self.textures.insert(Texture::new(name, data));
                }
                Err(e) => {
                    log::error!("Failed to load texture `{name}`: {e}");
                    failed.push(name.to_owned());
                }
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(AssetError::Batch { failed })
        }
    }

    /// Bake a procedural drawing into the cache under `name`
    pub fn bake_texture(
        &mut self,
        name: &str,
        width: u32,
        height: u32,
        draw: impl FnOnce(&mut CommandRecorder),
    ) -> Rc<Texture> {
        self.textures.insert(Texture::baked(name, width, height, draw))
    }

    pub fn texture(&self, name: &str) -> Option<Rc<Texture>> {
        self.textures.get(name)
    }

    pub fn has_texture(&self, name: &str) -> bool {
        self.textures.contains(name)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    // --- Entities ---

    fn place(&mut self, id: &str, mut node: Node, placement: &Placement) -> NodeId {
        if let Some(p) = placement.position {
            node.transform.position = p;
        }
        if let Some(a) = placement.anchor {
            node.transform.anchor = a;
        }
        if let Some(s) = placement.scale {
            node.transform.scale = s;
        }
        if let Some(r) = placement.rotation {
            node.transform.rotation = r;
        }
        if let Some(z) = placement.z_index {
            node.z_index = z;
        }
        let parent = self.parent_for(placement.container.as_deref());
        let node_id = self.scene.insert(node, parent);
        log::debug!("Created render entity `{id}`");
        node_id
    }

    fn replace(scene: &mut SceneGraph, map: &mut HashMap<String, NodeId>, id: &str, node: NodeId) {
        if let Some(old) = map.insert(id.to_owned(), node) {
            log::warn!("Render entity `{id}` replaced");
            scene.remove(old);
        }
    }

    /// Static sprite from a loaded texture. Unknown textures log an error
    /// and yield `None`.
    pub fn create_sprite(&mut self, id: &str, texture: &str, placement: &Placement) -> Option<NodeId> {
        let Some(texture) = self.textures.get(texture) else {
            log::error!("Texture not found: {texture}");
            return None;
        };
        let node_id = self.place(id, Node::new(NodeKind::Sprite { texture }), placement);
        Self::replace(&mut self.scene, &mut self.sprites, id, node_id);
        Some(node_id)
    }

    /// Frame animation. Unresolvable frame names are skipped; `None` only
    /// when no frame resolves.
    pub fn create_animation(
        &mut self,
        id: &str,
        options: &AnimationOptions,
        placement: &Placement,
    ) -> Option<NodeId> {
        let frames: Vec<Rc<Texture>> = options
            .frames
            .iter()
            .filter_map(|name| {
                let texture = self.textures.get(name);
                if texture.is_none() {
                    log::error!("Texture not found for animation `{id}`: {name}");
                }
                texture
            })
            .collect();
        if frames.is_empty() {
            log::error!("No textures found for animation `{id}`");
            return None;
        }

        let mut animation = Animation::new(frames, options.speed, options.looping);
        if options.auto_play {
            animation.play();
        }
        let node_id = self.place(id, Node::new(NodeKind::Animated(animation)), placement);
        Self::replace(&mut self.scene, &mut self.animations, id, node_id);
        Some(node_id)
    }

    /// Batch container for particle sprites (effects layer by default)
    pub fn create_particle_container(
        &mut self,
        id: &str,
        max_size: usize,
        container: Option<&str>,
        z_index: i32,
    ) -> NodeId {
        let mut node = Node::new(NodeKind::ParticleContainer { max_size });
        node.z_index = z_index;
        let parent = self.parent_for(Some(container.unwrap_or(layers::EFFECTS)));
        let node_id = self.scene.insert(node, parent);
        Self::replace(&mut self.scene, &mut self.particle_systems, id, node_id);
        node_id
    }

    pub fn particle_container(&self, id: &str) -> Option<NodeId> {
        self.particle_systems.get(id).copied()
    }

    /// Anonymous child node (particle sprites)
    pub fn add_node(&mut self, parent: NodeId, node: Node) -> NodeId {
        self.scene.insert(node, parent)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.scene.get_mut(id)
    }

    pub fn remove_node(&mut self, id: NodeId) {
        self.scene.remove(id);
    }

    fn entity(&self, id: &str) -> Option<NodeId> {
        self.sprites
            .get(id)
            .or_else(|| self.animations.get(id))
            .copied()
    }

    fn transform(&mut self, node: Option<NodeId>, position: Option<Vec2>, rotation: Option<f32>) {
        if let Some(node) = node.and_then(|n| self.scene.get_mut(n)) {
            if let Some(p) = position {
                node.transform.position = p;
            }
            if let Some(r) = rotation {
                node.transform.rotation = r;
            }
        }
    }

    pub fn update_sprite(&mut self, id: &str, position: Option<Vec2>, rotation: Option<f32>) {
        let node = self.sprites.get(id).copied();
        self.transform(node, position, rotation);
    }

    pub fn update_animation(&mut self, id: &str, position: Option<Vec2>, rotation: Option<f32>) {
        let node = self.animations.get(id).copied();
        self.transform(node, position, rotation);
    }

    /// Position of a sprite or animation, if it still exists
    pub fn entity_position(&self, id: &str) -> Option<Vec2> {
        let node = self.scene.get(self.entity(id)?)?;
        Some(node.transform.position)
    }

    pub fn set_visible(&mut self, id: &str, visible: bool) {
        if let Some(node) = self.entity(id).and_then(|n| self.scene.get_mut(n)) {
            node.visible = visible;
        }
    }

    pub fn is_visible(&self, id: &str) -> Option<bool> {
        self.scene.get(self.entity(id)?).map(|n| n.visible)
    }

    pub fn set_sprite_scale(&mut self, id: &str, scale: Vec2) {
        if let Some(node) = self.entity(id).and_then(|n| self.scene.get_mut(n)) {
            node.transform.scale = scale;
        }
    }

    fn animation_mut(&mut self, id: &str) -> Option<&mut Animation> {
        let node = *self.animations.get(id)?;
        self.scene.get_mut(node)?.animation_mut()
    }

    fn animation(&self, id: &str) -> Option<&Animation> {
        self.scene.get(*self.animations.get(id)?)?.animation()
    }

    pub fn play_animation(&mut self, id: &str, looping: bool) {
        if let Some(anim) = self.animation_mut(id) {
            anim.looping = looping;
            anim.play();
        }
    }

    pub fn stop_animation(&mut self, id: &str) {
        if let Some(anim) = self.animation_mut(id) {
            anim.stop();
        }
    }

    pub fn is_playing(&self, id: &str) -> bool {
        self.animation(id).is_some_and(Animation::is_playing)
    }

    /// `(play, stop)` call counts for an animation
    pub fn animation_calls(&self, id: &str) -> Option<(u32, u32)> {
        self.animation(id).map(Animation::call_counts)
    }

    pub fn contains_sprite(&self, id: &str) -> bool {
        self.sprites.contains_key(id)
    }

    pub fn contains_animation(&self, id: &str) -> bool {
        self.animations.contains_key(id)
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    pub fn particle_system_count(&self) -> usize {
        self.particle_systems.len()
    }

    /// Live scene nodes, including the stage and layers
    pub fn node_count(&self) -> usize {
        self.scene.len()
    }

    // --- Removal ---

    pub fn remove_sprite(&mut self, id: &str) {
        if let Some(node) = self.sprites.remove(id) {
            self.scene.remove(node);
        }
    }

    pub fn remove_animation(&mut self, id: &str) {
        if let Some(node) = self.animations.remove(id) {
            self.scene.remove(node);
        }
    }

    pub fn remove_particle_system(&mut self, id: &str) {
        if let Some(node) = self.particle_systems.remove(id) {
            self.scene.remove(node);
        }
    }

    /// Drop every sprite, animation and particle system. Layers and
    /// textures stay.
    pub fn clear(&mut self) {
        for (_, node) in self
            .sprites
            .drain()
            .chain(self.animations.drain())
            .chain(self.particle_systems.drain())
        {
            self.scene.remove(node);
        }
    }

    // --- Frame ---

    /// Advance every playing animation by `delta` seconds
    pub fn tick(&mut self, delta: f32) {
        for node in self.scene.iter_mut() {
            if let Some(anim) = node.animation_mut() {
                anim.tick(delta);
            }
        }
    }

    /// Build this frame's draw list and present it. Returns the sprite count.
    pub fn render(&mut self) -> usize {
        let list = DrawList::build(&self.scene, self.background_color);
        if let Some(surface) = self.surface.as_mut() {
            surface.present(&list);
        }
        list.len()
    }

    /// Resize the surface. Sprites keep their positions.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(width, height);
        }
        log::debug!("Renderer resized to {width}x{height}");
    }

    /// Terminal teardown: entities, layers, textures and the surface
    pub fn destroy(&mut self) {
        self.clear();
        for (_, node) in self.containers.drain() {
            self.scene.remove(node);
        }
        self.textures.destroy_all();
        if let Some(mut surface) = self.surface.take() {
            surface.destroy();
        }
        log::info!("Renderer destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetError;
    use crate::renderer::surface::HeadlessSurface;
    use crate::renderer::texture::StaticTextureLoader;

    fn renderer() -> SpriteRenderer {
        let mut r = SpriteRenderer::new(800, 600, 0);
        r.bake_texture("a", 10, 10, |_| {});
        r.bake_texture("b", 10, 10, |_| {});
        r
    }

    #[test]
    fn test_default_layers_exist() {
        let r = SpriteRenderer::new(100, 100, 0);
        for (name, _) in layers::DEFAULT {
            assert!(r.container(name).is_some(), "{name}");
        }
        // stage + six layers
        assert_eq!(r.node_count(), 7);
    }

    #[test]
    fn test_unknown_texture_yields_none() {
        let mut r = renderer();
        assert!(r.create_sprite("s", "missing", &Placement::default()).is_none());
        assert!(!r.contains_sprite("s"));
    }

    #[test]
    fn test_animation_skips_missing_frames() {
        let mut r = renderer();
        let opts = AnimationOptions::new(vec!["a".into(), "nope".into(), "b".into()]);
        assert!(r.create_animation("anim", &opts, &Placement::default()).is_some());
        let none = AnimationOptions::new(vec!["nope".into()]);
        assert!(r.create_animation("empty", &none, &Placement::default()).is_none());
        assert_eq!(r.animation_count(), 1);
    }

    #[test]
    fn test_updates_on_unknown_ids_are_silent() {
        let mut r = renderer();
        r.update_sprite("ghost", Some(Vec2::ONE), Some(1.0));
        r.update_animation("ghost", Some(Vec2::ONE), None);
        r.play_animation("ghost", true);
        r.stop_animation("ghost");
        r.remove_sprite("ghost");
        r.set_visible("ghost", false);
        assert_eq!(r.sprite_count(), 0);
    }

    #[test]
    fn test_recreate_replaces_node() {
        let mut r = renderer();
        let first = r.create_sprite("s", "a", &Placement::default()).unwrap();
        let nodes = r.node_count();
        r.create_sprite("s", "b", &Placement::default()).unwrap();
        assert_eq!(r.node_count(), nodes);
        assert!(r.node_mut(first).is_none());
    }

    #[test]
    fn test_remove_releases_node() {
        let mut r = renderer();
        let base = r.node_count();
        r.create_sprite("s", "a", &Placement::in_layer(layers::PLAYERS))
            .unwrap();
        r.remove_sprite("s");
        r.remove_sprite("s");
        assert_eq!(r.node_count(), base);
    }

    #[test]
    fn test_play_stop_and_counts() {
        let mut r = renderer();
        let opts = AnimationOptions::new(vec!["a".into(), "b".into()]);
        r.create_animation("anim", &opts, &Placement::default());
        assert!(!r.is_playing("anim"));
        r.play_animation("anim", true);
        assert!(r.is_playing("anim"));
        r.stop_animation("anim");
        assert!(!r.is_playing("anim"));
        assert_eq!(r.animation_calls("anim"), Some((1, 1)));
    }

    #[test]
    fn test_render_presents_visible_sprites() {
        let mut r = renderer();
        let surface = HeadlessSurface::new(800, 600);
        let log = surface.log();
        r.initialize(Box::new(surface));
        r.create_sprite("s1", "a", &Placement::in_layer(layers::PLAYERS));
        r.create_sprite("s2", "b", &Placement::in_layer(layers::OBSTACLES));
        assert_eq!(r.render(), 2);
        r.set_visible("s1", false);
        assert_eq!(r.render(), 1);
        assert_eq!(log.borrow().frames, 2);
    }

    #[test]
    fn test_clear_keeps_layers_and_textures() {
        let mut r = renderer();
        r.create_sprite("s", "a", &Placement::default());
        r.create_particle_container("p", 100, None, 0);
        r.clear();
        assert_eq!(r.sprite_count(), 0);
        assert_eq!(r.particle_system_count(), 0);
        assert_eq!(r.node_count(), 7);
        assert_eq!(r.texture_count(), 2);
    }

    #[test]
    fn test_destroy_is_terminal() {
        let mut r = renderer();
        let surface = HeadlessSurface::new(800, 600);
        let log = surface.log();
        r.initialize(Box::new(surface));
        let tex = r.texture("a").unwrap();
        r.destroy();
        assert!(tex.is_destroyed());
        assert_eq!(r.texture_count(), 0);
        assert_eq!(r.node_count(), 1);
        assert!(log.borrow().destroyed);
    }

    #[test]
    fn test_batch_load_keeps_successes() {
        let mut r = SpriteRenderer::new(100, 100, 0);
        let loader = StaticTextureLoader::new().with("/ok.png", 4, 4);
        let result = pollster::block_on(
            r.load_textures(&loader, &[("ok", "/ok.png"), ("bad", "/bad.png")]),
        );
        match result {
            Err(AssetError::Batch { failed }) => assert_eq!(failed, vec!["bad".to_string()]),
            other => panic!("unexpected {other:?}"),
        }
        assert!(r.has_texture("ok"));
        assert!(!r.has_texture("bad"));
    }

    #[test]
    fn test_resize_keeps_positions() {
        let mut r = renderer();
        r.create_sprite("s", "a", &Placement::default().at(Vec2::new(5.0, 6.0)));
        r.resize(400, 300);
        assert_eq!(r.entity_position("s"), Some(Vec2::new(5.0, 6.0)));
        assert_eq!(r.size(), (400, 300));
    }
}
