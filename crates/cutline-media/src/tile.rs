//! Sprite sheet tiling.

use async_trait::async_trait;
use cutline_models::SpriteConfig;
use image::{imageops, ImageFormat, RgbImage};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Grid geometry for a sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLayout {
    pub columns: u32,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl TileLayout {
    pub fn new(columns: u32, tile_width: u32, tile_height: u32) -> Self {
        Self {
            columns: columns.max(1),
            tile_width,
            tile_height,
        }
    }

    /// Top-left pixel of the `k`-th tile in row-major order.
    pub fn origin(&self, k: usize) -> (u32, u32) {
        let columns = self.columns.max(1) as usize;
        let row = (k / columns) as u32;
        let col = (k % columns) as u32;
        (col * self.tile_width, row * self.tile_height)
    }

    /// Sheet size in pixels for `count` tiles.
    pub fn sheet_size(&self, count: usize) -> (u32, u32) {
        let columns = self.columns.max(1) as usize;
        let used_columns = count.min(columns) as u32;
        let rows = count.div_ceil(columns) as u32;
        (used_columns * self.tile_width, rows * self.tile_height)
    }
}

impl From<&SpriteConfig> for TileLayout {
    fn from(config: &SpriteConfig) -> Self {
        Self::new(config.columns, config.width, config.height)
    }
}

/// Capability that composes images into a grid.
#[async_trait]
pub trait ImageTiler: Send + Sync {
    /// Tile `images` row-major into `output`, returning its path.
    async fn tile(&self, images: &[PathBuf], layout: TileLayout, output: &Path)
        -> MediaResult<PathBuf>;
}

/// Tiler backed by the `image` crate, writing JPEG.
#[derive(Debug, Clone, Default)]
pub struct GridTiler;

impl GridTiler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImageTiler for GridTiler {
    async fn tile(
        &self,
        images: &[PathBuf],
        layout: TileLayout,
        output: &Path,
    ) -> MediaResult<PathBuf> {
        if images.is_empty() {
            return Err(MediaError::tile_failed("no images to tile"));
        }

        let images = images.to_vec();
        let output = output.to_path_buf();
        tokio::task::spawn_blocking(move || compose_sheet(&images, layout, &output))
            .await
            .map_err(|e| MediaError::internal(format!("tiling task failed: {}", e)))?
    }
}

fn compose_sheet(images: &[PathBuf], layout: TileLayout, output: &Path) -> MediaResult<PathBuf> {
    let (width, height) = layout.sheet_size(images.len());
    let mut sheet = RgbImage::new(width, height);

    for (k, path) in images.iter().enumerate() {
        let mut tile = image::open(path)?.to_rgb8();
        if tile.dimensions() != (layout.tile_width, layout.tile_height) {
            tile = imageops::resize(
                &tile,
                layout.tile_width,
                layout.tile_height,
                imageops::FilterType::Triangle,
            );
        }
        let (x, y) = layout.origin(k);
        imageops::replace(&mut sheet, &tile, x as i64, y as i64);
    }

    sheet.save_with_format(output, ImageFormat::Jpeg)?;
    debug!(
        tiles = images.len(),
        width = width,
        height = height,
        output = %output.display(),
        "Sprite sheet written"
    );
    Ok(output.to_path_buf())
}
