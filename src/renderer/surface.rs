//! Presentation surface and the per-frame draw list

use std::cell::RefCell;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};

use super::scene::{BlendMode, SceneGraph};
use super::texture::Texture;

/// One textured quad, laid out for direct upload as instance data
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    pub position: [f32; 2],
    /// Texture size times scale
    pub size: [f32; 2],
    pub anchor: [f32; 2],
    pub rotation: f32,
    pub alpha: f32,
    pub tint: [f32; 4],
}

fn tint_rgba(tint: u32) -> [f32; 4] {
    [
        ((tint >> 16) & 0xff) as f32 / 255.0,
        ((tint >> 8) & 0xff) as f32 / 255.0,
        (tint & 0xff) as f32 / 255.0,
        1.0,
    ]
}

/// Everything to draw this frame, back to front
#[derive(Debug, Default)]
pub struct DrawList {
    pub clear_color: u32,
    pub instances: Vec<SpriteInstance>,
    /// Parallel to `instances`
    pub textures: Vec<Rc<Texture>>,
    pub blends: Vec<BlendMode>,
}

impl DrawList {
    pub fn build(scene: &SceneGraph, clear_color: u32) -> Self {
        let mut list = DrawList {
            clear_color,
            ..Default::default()
        };
        for v in scene.draw_order() {
            let Some(texture) = v.node.texture() else {
                continue;
            };
            if texture.is_destroyed() || v.alpha <= 0.0 {
                continue;
            }
            let w = v.world;
            list.instances.push(SpriteInstance {
                position: w.position.to_array(),
                size: [texture.width as f32 * w.scale.x, texture.height as f32 * w.scale.y],
                anchor: w.anchor.to_array(),
                rotation: w.rotation,
                alpha: v.alpha,
                tint: tint_rgba(v.node.tint),
            });
            list.textures.push(Rc::clone(texture));
            list.blends.push(v.node.blend);
        }
        list
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Raw instance buffer
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

/// Where frames end up (a canvas, a GPU swapchain, nothing)
pub trait Surface {
    fn size(&self) -> (u32, u32);
    fn resize(&mut self, width: u32, height: u32);
    fn present(&mut self, frame: &DrawList);
    /// Release the surface; it is not presented to again
    fn destroy(&mut self);
}

/// What a headless surface has seen
#[derive(Debug, Default, Clone)]
pub struct PresentLog {
    pub frames: u64,
    pub last_instances: usize,
    pub last_bytes: usize,
    pub resizes: Vec<(u32, u32)>,
    pub destroyed: bool,
}

/// Surface that draws nothing and records what it was given
#[derive(Debug)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    log: Rc<RefCell<PresentLog>>,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            log: Rc::default(),
        }
    }

    /// Shared view of the presentation log
    pub fn log(&self) -> Rc<RefCell<PresentLog>> {
        Rc::clone(&self.log)
    }
}

impl Surface for HeadlessSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.log.borrow_mut().resizes.push((width, height));
    }

    fn present(&mut self, frame: &DrawList) {
        let mut log = self.log.borrow_mut();
        log.frames += 1;
        log.last_instances = frame.len();
        log.last_bytes = frame.as_bytes().len();
    }

    fn destroy(&mut self) {
        self.log.borrow_mut().destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::scene::{Node, NodeKind};
    use glam::Vec2;

    #[test]
    fn test_instance_layout_has_no_padding() {
        assert_eq!(std::mem::size_of::<SpriteInstance>(), 12 * 4);
    }

    #[test]
    fn test_draw_list_skips_textureless_and_destroyed() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let live = Rc::new(Texture::baked("live", 8, 4, |_| {}));
        let dead = Rc::new(Texture::baked("dead", 8, 4, |_| {}));
        dead.destroy();

        let mut sprite = Node::new(NodeKind::Sprite {
            texture: Rc::clone(&live),
        });
        sprite.transform.scale = Vec2::splat(2.0);
        sprite.tint = 0xff0000;
        scene.insert(sprite, root);
        scene.insert(Node::new(NodeKind::Sprite { texture: dead }), root);
        scene.insert(Node::container("empty"), root);

        let list = DrawList::build(&scene, 0);
        assert_eq!(list.len(), 1);
        assert_eq!(list.instances[0].size, [16.0, 8.0]);
        assert_eq!(list.instances[0].tint, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(list.as_bytes().len(), std::mem::size_of::<SpriteInstance>());
    }

    #[test]
    fn test_headless_surface_logs() {
        let mut surface = HeadlessSurface::new(800, 600);
        let log = surface.log();
        surface.present(&DrawList::default());
        surface.resize(400, 300);
        surface.destroy();
        let log = log.borrow();
        assert_eq!(log.frames, 1);
        assert_eq!(log.resizes, vec![(400, 300)]);
        assert!(log.destroyed);
        assert_eq!(surface.size(), (400, 300));
    }
}
