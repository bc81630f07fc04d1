//! 2D textures and image decoding.
//!
//! Images are decoded with the `image` crate into RGBA8 and flipped
//! vertically, so that the first row of [`ImageData::pixels`] is the bottom of
//! the picture and `uv = (0, 0)` samples the lower left corner.

use std::{cell::Cell, path::Path};

use anyhow::Context;

use crate::gpu::{GraphicsDevice, ImageData, TextureHandle, TextureOptions};

impl ImageData {
    /// Decode an encoded image (png, jpeg, ...) from memory.
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let img = image::load_from_memory(bytes).context("decoding image")?;
        let rgba = img.flipv().to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("reading image {}", path.display()))?;
        Self::from_bytes(&bytes).with_context(|| format!("decoding image {}", path.display()))
    }
}

/// A GPU-resident 2D texture.
#[derive(Debug)]
pub struct Texture2D {
    handle: Cell<Option<TextureHandle>>,
    width: u32,
    height: u32,
}

impl Texture2D {
    pub fn new(device: &mut dyn GraphicsDevice, image: &ImageData, options: TextureOptions) -> Self {
        let handle = device.create_texture(image, options);
        Self {
            handle: Cell::new(Some(handle)),
            width: image.width,
            height: image.height,
        }
    }

    /// Load and upload an image file.
    pub fn from_file(
        device: &mut dyn GraphicsDevice,
        path: impl AsRef<Path>,
        options: TextureOptions,
    ) -> anyhow::Result<Self> {
        let image = ImageData::load(path)?;
        Ok(Self::new(device, &image, options))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `None` once disposed.
    pub fn handle(&self) -> Option<TextureHandle> {
        self.handle.get()
    }

    pub fn bind(&self, device: &mut dyn GraphicsDevice, unit: u32) {
        device.bind_texture(unit, self.handle.get());
    }

    pub fn unbind(&self, device: &mut dyn GraphicsDevice, unit: u32) {
        device.bind_texture(unit, None);
    }

    pub fn dispose(&self, device: &mut dyn GraphicsDevice) {
        if let Some(handle) = self.handle.take() {
            log::debug!("deleting texture {:?}", handle);
            device.delete_texture(handle);
        }
    }
}
