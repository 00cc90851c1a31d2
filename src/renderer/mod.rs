//! Rendering module
//!
//! A retained scene graph of textured quads grouped into z-ordered layers.
//! Each frame the graph is flattened into a [`DrawList`] and handed to
//! whatever [`Surface`] is attached.

pub mod scene;
pub mod sprite_renderer;
pub mod surface;
pub mod texture;

pub use scene::{Animation, BlendMode, Node, NodeId, NodeKind, SceneGraph, Transform};
pub use sprite_renderer::{AnimationOptions, Placement, SpriteRenderer, layers};
pub use surface::{DrawList, HeadlessSurface, PresentLog, SpriteInstance, Surface};
pub use texture::{StaticTextureLoader, Texture, TextureCache, TextureData, TextureLoader, TextureSource};
#[cfg(not(target_arch = "wasm32"))]
pub use texture::FsTextureLoader;
