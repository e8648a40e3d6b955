//! Packs the gallery's source images into a single padded grid texture.
//!
//! ```text
//!   images[]  ──dedupe──▶ unique ids ──decode/resize──▶ bitmap
//!      │                                                  ▲
//!      └──────────── index_map[i] = tile of images[i] ────┘
//! ```
//!
//! Tiles are laid out row-major, `cols = ceil(sqrt(n))`, with a fixed gutter
//! of [`TILE_PADDING`] pixels to the right of and below every tile so linear
//! filtering never bleeds a neighbour into view.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec2;
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};

pub const DEFAULT_TILE_SIZE: u32 = 512;
pub const TILE_PADDING: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    #[error("image '{0}' not found")]
    Missing(String),
    #[error("failed to decode image '{id}': {source}")]
    Decode {
        id: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write atlas to {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to spawn atlas build worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Resolves an image identifier to decoded pixels.
pub trait ImageSource: Send + Sync {
    fn load(&self, id: &str) -> Result<RgbaImage, AtlasError>;
}

/// Loads identifiers as file paths, relative ones resolved against `root`.
#[derive(Debug, Clone, Default)]
pub struct FsImageSource {
    root: Option<PathBuf>,
}

impl FsImageSource {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    pub fn resolve(&self, id: &str) -> PathBuf {
        let path = Path::new(id);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ImageSource for FsImageSource {
    fn load(&self, id: &str) -> Result<RgbaImage, AtlasError> {
        let path = self.resolve(id);
        if !path.exists() {
            return Err(AtlasError::Missing(path.display().to_string()));
        }
        let image = image::open(&path).map_err(|source| AtlasError::Decode {
            id: id.to_string(),
            source,
        })?;
        Ok(image.to_rgba8())
    }
}

/// Pre-decoded images keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageSource {
    images: HashMap<String, RgbaImage>,
}

impl MemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, image: RgbaImage) {
        self.images.insert(id.into(), image);
    }
}

impl ImageSource for MemoryImageSource {
    fn load(&self, id: &str) -> Result<RgbaImage, AtlasError> {
        self.images
            .get(id)
            .cloned()
            .ok_or_else(|| AtlasError::Missing(id.to_string()))
    }
}

/// Grid geometry of a packed atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasLayout {
    pub cols: u32,
    pub rows: u32,
    pub unique_count: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub padding: u32,
}

impl AtlasLayout {
    pub fn new(unique_count: u32, tile_width: u32, tile_height: u32) -> Self {
        let (cols, rows) = grid_dimensions(unique_count as usize);
        Self {
            cols,
            rows,
            unique_count,
            tile_width: tile_width.max(1),
            tile_height: tile_height.max(1),
            padding: TILE_PADDING,
        }
    }

    pub fn width(&self) -> u32 {
        self.cols * (self.tile_width + self.padding)
    }

    pub fn height(&self) -> u32 {
        self.rows * (self.tile_height + self.padding)
    }

    /// Top-left pixel of `tile`.
    pub fn tile_origin(&self, tile: u32) -> (u32, u32) {
        let col = tile % self.cols;
        let row = tile / self.cols;
        (
            col * (self.tile_width + self.padding),
            row * (self.tile_height + self.padding),
        )
    }

    /// Maps a plane-local UV (`v` pointing up) inside `tile` to atlas UV
    /// (`v` pointing down). Local coordinates are clamped to the tile so
    /// offset lookups never sample the gutter or a neighbour.
    pub fn tile_uv(&self, tile: u32, local: Vec2) -> Vec2 {
        let last = self.unique_count.max(1) - 1;
        let (x, y) = self.tile_origin(tile.min(last));
        let local = local.clamp(Vec2::ZERO, Vec2::ONE);
        Vec2::new(
            (x as f32 + local.x * self.tile_width as f32) / self.width() as f32,
            (y as f32 + (1.0 - local.y) * self.tile_height as f32) / self.height() as f32,
        )
    }
}

/// `cols = ceil(sqrt(n))`, `rows = ceil(n / cols)`; an empty set still gets
/// a single cell.
pub fn grid_dimensions(count: usize) -> (u32, u32) {
    if count == 0 {
        return (1, 1);
    }
    let mut cols = (count as f64).sqrt().ceil() as usize;
    // guard against sqrt rounding just above an exact square
    while cols > 1 && (cols - 1) * (cols - 1) >= count {
        cols -= 1;
    }
    let rows = count.div_ceil(cols);
    (cols as u32, rows as u32)
}

/// Distinct identifiers in first-seen order plus, for every input, the
/// position of its identifier in that list.
pub fn dedupe<S: AsRef<str>>(images: &[S]) -> (Vec<String>, Vec<u32>) {
    let mut unique: Vec<String> = Vec::new();
    let mut seen: HashMap<&str, u32> = HashMap::new();
    let mut index_map = Vec::with_capacity(images.len());
    for image in images {
        let id = image.as_ref();
        let tile = *seen.entry(id).or_insert_with(|| {
            unique.push(id.to_string());
            (unique.len() - 1) as u32
        });
        index_map.push(tile);
    }
    (unique, index_map)
}

/// A packed atlas bitmap and the remap table that goes with it.
#[derive(Debug, Clone)]
pub struct Atlas {
    pub layout: AtlasLayout,
    pub bitmap: RgbaImage,
    pub index_map: Vec<u32>,
    pub unique_ids: Vec<String>,
    /// Identifiers that failed to decode and were left blank.
    pub failed: Vec<String>,
}

impl Atlas {
    pub fn is_empty(&self) -> bool {
        self.layout.unique_count == 0
    }

    pub fn export_png(&self, path: &Path) -> Result<(), AtlasError> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| AtlasError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        self.bitmap
            .save_with_format(path, ImageFormat::Png)
            .map_err(|source| AtlasError::Export {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!(
            path = %path.display(),
            width = self.bitmap.width(),
            height = self.bitmap.height(),
            tiles = self.layout.unique_count,
            "exported texture atlas"
        );
        Ok(())
    }
}

/// Builds the atlas synchronously. Decode failures leave a transparent tile
/// and are logged; they never fail the build.
pub fn build_atlas<S: AsRef<str>>(images: &[S], source: &dyn ImageSource) -> Atlas {
    match pack_atlas(images, source, || Ok::<(), Infallible>(())) {
        Ok(atlas) => atlas,
        Err(never) => match never {},
    }
}

/// Like [`build_atlas`], but checks `keep_going` before every decode and
/// every tile copy and returns `None` as soon as it reports false.
pub fn build_atlas_until<S: AsRef<str>>(
    images: &[S],
    source: &dyn ImageSource,
    keep_going: &dyn Fn() -> bool,
) -> Option<Atlas> {
    pack_atlas(images, source, || if keep_going() { Ok(()) } else { Err(()) }).ok()
}

fn pack_atlas<S: AsRef<str>, E>(
    images: &[S],
    source: &dyn ImageSource,
    mut check: impl FnMut() -> Result<(), E>,
) -> Result<Atlas, E> {
    let (unique_ids, index_map) = dedupe(images);
    let mut decoded: Vec<Option<RgbaImage>> = Vec::with_capacity(unique_ids.len());
    for id in &unique_ids {
        check()?;
        decoded.push(match source.load(id) {
            Ok(image) if image.width() > 0 && image.height() > 0 => Some(image),
            Ok(_) => {
                tracing::warn!(image = %id, "image has no pixels; leaving its tile blank");
                None
            }
            Err(error) => {
                tracing::warn!(image = %id, error = %error, "failed to load gallery image; leaving its tile blank");
                None
            }
        });
    }

    let (tile_width, tile_height) = decoded
        .iter()
        .flatten()
        .next()
        .map(|image| image.dimensions())
        .unwrap_or((DEFAULT_TILE_SIZE, DEFAULT_TILE_SIZE));

    let layout = AtlasLayout::new(unique_ids.len() as u32, tile_width, tile_height);
    let mut bitmap = RgbaImage::new(layout.width(), layout.height());
    let mut failed = Vec::new();

    for (tile, (id, image)) in unique_ids.iter().zip(decoded).enumerate() {
        check()?;
        let Some(image) = image else {
            failed.push(id.clone());
            continue;
        };
        let scaled = if image.dimensions() == (layout.tile_width, layout.tile_height) {
            image
        } else {
            imageops::resize(
                &image,
                layout.tile_width,
                layout.tile_height,
                FilterType::Triangle,
            )
        };
        let (x, y) = layout.tile_origin(tile as u32);
        imageops::replace(&mut bitmap, &scaled, i64::from(x), i64::from(y));
    }

    tracing::debug!(
        images = images.len(),
        unique = layout.unique_count,
        cols = layout.cols,
        rows = layout.rows,
        tile_width = layout.tile_width,
        tile_height = layout.tile_height,
        failed = failed.len(),
        "built texture atlas"
    );

    Ok(Atlas {
        layout,
        bitmap,
        index_map,
        unique_ids,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(rgba))
    }

    #[test]
    fn grid_dimensions_follow_square_root_rule() {
        assert_eq!(grid_dimensions(1), (1, 1));
        assert_eq!(grid_dimensions(2), (2, 1));
        assert_eq!(grid_dimensions(3), (2, 2));
        assert_eq!(grid_dimensions(4), (2, 2));
        assert_eq!(grid_dimensions(5), (3, 2));
        assert_eq!(grid_dimensions(10), (4, 3));
        assert_eq!(grid_dimensions(17), (5, 4));
        assert_eq!(grid_dimensions(0), (1, 1));
    }

    #[test]
    fn dedupe_preserves_first_seen_order() {
        let (unique, index_map) = dedupe(&["a.png", "b.png", "a.png"]);
        assert_eq!(unique, vec!["a.png".to_string(), "b.png".to_string()]);
        assert_eq!(index_map, vec![0, 1, 0]);
    }

    #[test]
    fn index_map_points_back_at_each_source() {
        let images = ["x", "y", "x", "z", "y", "w"];
        let (unique, index_map) = dedupe(&images);
        for (image, tile) in images.iter().zip(&index_map) {
            assert_eq!(unique[*tile as usize], *image);
        }
    }

    #[test]
    fn builds_two_tile_atlas_with_padding() {
        let mut source = MemoryImageSource::new();
        source.insert("a.png", solid(4, 4, [255, 0, 0, 255]));
        source.insert("b.png", solid(8, 8, [0, 0, 255, 255]));

        let atlas = build_atlas(&["a.png", "b.png", "a.png"], &source);
        assert_eq!(atlas.index_map, vec![0, 1, 0]);
        assert_eq!(atlas.layout.unique_count, 2);
        assert_eq!((atlas.layout.cols, atlas.layout.rows), (2, 1));
        assert_eq!((atlas.layout.tile_width, atlas.layout.tile_height), (4, 4));
        assert_eq!(atlas.bitmap.dimensions(), (12, 6));

        assert_eq!(atlas.bitmap.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(atlas.bitmap.get_pixel(6, 3), &Rgba([0, 0, 255, 255]));
        // gutter between tiles stays transparent
        assert_eq!(atlas.bitmap.get_pixel(4, 0)[3], 0);
        assert_eq!(atlas.bitmap.get_pixel(0, 4)[3], 0);
        assert!(atlas.failed.is_empty());
    }

    #[test]
    fn failed_decode_leaves_blank_tile() {
        let mut source = MemoryImageSource::new();
        source.insert("ok.png", solid(2, 2, [10, 20, 30, 255]));

        let atlas = build_atlas(&["missing.png", "ok.png"], &source);
        assert_eq!(atlas.layout.unique_count, 2);
        // tile size comes from the first image that decoded
        assert_eq!((atlas.layout.tile_width, atlas.layout.tile_height), (2, 2));
        assert_eq!(atlas.failed, vec!["missing.png".to_string()]);
        assert_eq!(atlas.bitmap.get_pixel(0, 0)[3], 0);
        assert_eq!(atlas.bitmap.get_pixel(4, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn all_failures_fall_back_to_default_tile_size() {
        let source = MemoryImageSource::new();
        let atlas = build_atlas(&["gone.png"], &source);
        assert_eq!(atlas.layout.tile_width, DEFAULT_TILE_SIZE);
        assert_eq!(atlas.bitmap.width(), DEFAULT_TILE_SIZE + TILE_PADDING);
    }

    #[test]
    fn empty_manifest_yields_empty_atlas() {
        let atlas = build_atlas::<&str>(&[], &MemoryImageSource::new());
        assert!(atlas.is_empty());
        assert!(atlas.index_map.is_empty());
        assert_eq!((atlas.layout.cols, atlas.layout.rows), (1, 1));
    }

    #[test]
    fn cancelled_build_stops_before_next_decode() {
        use std::cell::Cell;

        let mut source = MemoryImageSource::new();
        source.insert("a", solid(2, 2, [1, 1, 1, 255]));
        source.insert("b", solid(2, 2, [2, 2, 2, 255]));
        source.insert("c", solid(2, 2, [3, 3, 3, 255]));

        let checks = Cell::new(0);
        let stop_after_first = || {
            checks.set(checks.get() + 1);
            checks.get() <= 1
        };
        assert!(build_atlas_until(&["a", "b", "c"], &source, &stop_after_first).is_none());
        assert_eq!(checks.get(), 2);

        let atlas = build_atlas_until(&["a", "b", "a"], &source, &|| true).unwrap();
        assert_eq!(atlas.index_map, vec![0, 1, 0]);
        assert_eq!(atlas.bitmap.get_pixel(4, 0), &Rgba([2, 2, 2, 255]));
    }

    #[test]
    fn tile_uv_maps_inside_tile_bounds() {
        let layout = AtlasLayout::new(3, 10, 10);
        assert_eq!(layout.width(), 24);
        assert_eq!(layout.height(), 24);

        let top_left = layout.tile_uv(1, Vec2::new(0.0, 1.0));
        assert!((top_left.x - 12.0 / 24.0).abs() < 1e-6);
        assert!(top_left.y.abs() < 1e-6);

        let bottom_right = layout.tile_uv(2, Vec2::new(1.0, 0.0));
        assert!((bottom_right.x - 10.0 / 24.0).abs() < 1e-6);
        assert!((bottom_right.y - 22.0 / 24.0).abs() < 1e-6);

        // out-of-tile lookups clamp instead of reaching the neighbour
        let clamped = layout.tile_uv(0, Vec2::new(1.4, 0.5));
        assert!((clamped.x - 10.0 / 24.0).abs() < 1e-6);
    }

    #[test]
    fn export_writes_png() {
        let dir = TempDir::new().unwrap();
        let mut source = MemoryImageSource::new();
        source.insert("a", solid(3, 3, [1, 2, 3, 255]));
        let atlas = build_atlas(&["a"], &source);

        let path = dir.path().join("nested/atlas.png");
        atlas.export_png(&path).unwrap();
        let reloaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(reloaded.dimensions(), atlas.bitmap.dimensions());
        assert_eq!(reloaded.get_pixel(1, 1), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn filesystem_source_resolves_relative_ids() {
        let dir = TempDir::new().unwrap();
        solid(2, 2, [9, 9, 9, 255])
            .save(dir.path().join("one.png"))
            .unwrap();
        let source = FsImageSource::new(Some(dir.path().to_path_buf()));
        let image = source.load("one.png").unwrap();
        assert_eq!(image.dimensions(), (2, 2));
        assert!(matches!(source.load("two.png"), Err(AtlasError::Missing(_))));
    }
}
