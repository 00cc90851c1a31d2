//! Textures, the texture cache and asset loaders

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::AssetError;
use crate::sprites::{CommandRecorder, DrawCommand};

/// Where a texture's pixels come from
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    /// Decoded image, addressed by its url
    Image { url: String },
    /// Procedurally baked drawing
    Vector { commands: Vec<DrawCommand> },
}

/// What a loader hands back for one url
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub source: TextureSource,
}

#[derive(Debug)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub source: TextureSource,
    destroyed: Cell<bool>,
}

impl Texture {
    pub fn new(name: impl Into<String>, data: TextureData) -> Self {
        Self {
            name: name.into(),
            width: data.width,
            height: data.height,
            source: data.source,
            destroyed: Cell::new(false),
        }
    }

    /// Bake a procedural drawing into a `width × height` texture
    pub fn baked(
        name: impl Into<String>,
        width: u32,
        height: u32,
        draw: impl FnOnce(&mut CommandRecorder),
    ) -> Self {
        let mut recorder = CommandRecorder::new();
        draw(&mut recorder);
        Self::new(
            name,
            TextureData {
                width,
                height,
                source: TextureSource::Vector {
                    commands: recorder.into_commands(),
                },
            },
        )
    }

    /// Release native resources. Sprites still holding the texture draw nothing.
    pub fn destroy(&self) {
        self.destroyed.set(true);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}

/// Name → texture map. The last writer for a name wins.
#[derive(Debug, Default)]
pub struct TextureCache {
    textures: HashMap<String, Rc<Texture>>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Rc<Texture>> {
        self.textures.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.textures.contains_key(name)
    }

    pub fn insert(&mut self, texture: Texture) -> Rc<Texture> {
        let texture = Rc::new(texture);
        if let Some(previous) = self
            .textures
            .insert(texture.name.clone(), Rc::clone(&texture))
        {
            log::debug!("Texture `{}` replaced", previous.name);
        }
        texture
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Destroy and forget every texture
    pub fn destroy_all(&mut self) {
        for texture in self.textures.values() {
            texture.destroy();
        }
        self.textures.clear();
    }
}

/// Asynchronous image source
#[allow(async_fn_in_trait)]
pub trait TextureLoader {
    async fn load(&self, url: &str) -> Result<TextureData, AssetError>;
}

/// Fixed table of urls → sizes, for headless runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticTextureLoader {
    entries: HashMap<String, (u32, u32)>,
}

impl StaticTextureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, width: u32, height: u32) -> Self {
        self.entries.insert(url.into(), (width, height));
        self
    }
}

impl TextureLoader for StaticTextureLoader {
    async fn load(&self, url: &str) -> Result<TextureData, AssetError> {
        let &(width, height) = self.entries.get(url).ok_or_else(|| AssetError::NotFound {
            url: url.to_owned(),
        })?;
        Ok(TextureData {
            width,
            height,
            source: TextureSource::Image {
                url: url.to_owned(),
            },
        })
    }
}

/// Reads images from a directory; urls are resolved relative to `root`
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FsTextureLoader {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FsTextureLoader {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl TextureLoader for FsTextureLoader {
    async fn load(&self, url: &str) -> Result<TextureData, AssetError> {
        let path = self.root.join(url.trim_start_matches('/'));
        let (width, height) = image::image_dimensions(&path).map_err(|e| match e {
            image::ImageError::IoError(source) => AssetError::Io {
                url: url.to_owned(),
                source,
            },
            other => AssetError::Decode {
                url: url.to_owned(),
                reason: other.to_string(),
            },
        })?;
        Ok(TextureData {
            width,
            height,
            source: TextureSource::Image {
                url: url.to_owned(),
            },
        })
    }
}
