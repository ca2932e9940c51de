//! Access to tile containers and the sections they hold.

pub mod error;


#[doc(inline)]
pub use error::TileError;

use std::fmt::{Debug, Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use log::debug;
use rustc_hash::FxHashMap;

/// Name of a tile, unique within a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(String);

impl TileId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TileId {
    fn from(value: &str) -> Self {
        TileId(value.to_string())
    }
}

impl From<String> for TileId {
    fn from(value: String) -> Self {
        TileId(value)
    }
}

pub trait Tile: Debug + Send + Sync {
    fn id(&self) -> &TileId;

    /// Whether the tile is registered and its data can be read.
    fn is_alive(&self) -> bool;

    fn country(&self) -> &str;

    fn section(&self, tag: &str) -> Result<Bytes, TileError>;
}

pub trait TileRepository: Debug + Send + Sync {
    fn tile(&self, id: &TileId) -> Option<Arc<dyn Tile>>;

    fn tiles(&self) -> Vec<Arc<dyn Tile>>;
}

/// A tile held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryTile {
    id: TileId,
    country: String,
    alive: bool,
    sections: FxHashMap<String, Bytes>,
}

impl MemoryTile {
    pub fn new(id: impl Into<TileId>, country: impl Into<String>) -> Self {
        MemoryTile {
            id: id.into(),
            country: country.into(),
            alive: true,
            sections: FxHashMap::default(),
        }
    }

    pub fn with_section(mut self, tag: &str, data: Bytes) -> Self {
        self.sections.insert(tag.to_string(), data);
        self
    }

    /// Marks the tile as deregistered.
    pub fn retired(mut self) -> Self {
        self.alive = false;
        self
    }
}

impl Tile for MemoryTile {
    fn id(&self) -> &TileId {
        &self.id
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn country(&self) -> &str {
        &self.country
    }

    fn section(&self, tag: &str) -> Result<Bytes, TileError> {
        self.sections
            .get(tag)
            .cloned()
            .ok_or_else(|| TileError::SectionMissing {
                tile: self.id.clone(),
                tag: tag.to_string(),
            })
    }
}

/// A tile stored as a directory holding one `<tag>.sec` file per section
/// and an optional `country` file naming its country.
#[derive(Debug, Clone)]
pub struct DirectoryTile {
    id: TileId,
    country: String,
    root: PathBuf,
}

impl DirectoryTile {
    const COUNTRY_FILE: &'static str = "country";
    const SECTION_EXTENSION: &'static str = "sec";

    pub fn open(root: impl AsRef<Path>) -> Result<Self, TileError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(TileError::NotFound(root));
        }

        let id = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| TileError::NotFound(root.clone()))?;

        let country = match fs::read_to_string(root.join(Self::COUNTRY_FILE)) {
            Ok(country) => country.trim().to_string(),
            Err(_) => {
                debug!("No country file in {}, using the tile name", root.display());
                id.clone()
            }
        };

        Ok(DirectoryTile {
            id: TileId(id),
            country,
            root,
        })
    }

    /// Creates (or reuses) the tile directory and records its country.
    pub fn create(root: impl AsRef<Path>, country: &str) -> Result<Self, TileError> {
        fs::create_dir_all(root.as_ref())?;
        fs::write(root.as_ref().join(Self::COUNTRY_FILE), country)?;
        Self::open(root)
    }

    pub fn write_section(&self, tag: &str, data: &[u8]) -> Result<(), TileError> {
        fs::write(self.section_path(tag), data)?;
        Ok(())
    }

    fn section_path(&self, tag: &str) -> PathBuf {
        self.root
            .join(tag)
            .with_extension(Self::SECTION_EXTENSION)
    }
}

impl Tile for DirectoryTile {
    fn id(&self) -> &TileId {
        &self.id
    }

    fn is_alive(&self) -> bool {
        self.root.is_dir()
    }

    fn country(&self) -> &str {
        &self.country
    }

    fn section(&self, tag: &str) -> Result<Bytes, TileError> {
        let path = self.section_path(tag);
        if !path.is_file() {
            return Err(TileError::SectionMissing {
                tile: self.id.clone(),
                tag: tag.to_string(),
            });
        }

        Ok(Bytes::from(fs::read(path)?))
    }
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    tiles: FxHashMap<TileId, Arc<dyn Tile>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tile: impl Tile + 'static) -> Self {
        self.insert(Arc::new(tile));
        self
    }

    pub fn insert(&mut self, tile: Arc<dyn Tile>) {
        self.tiles.insert(tile.id().clone(), tile);
    }
}

impl TileRepository for MemoryRepository {
    fn tile(&self, id: &TileId) -> Option<Arc<dyn Tile>> {
        self.tiles.get(id).cloned()
    }

    fn tiles(&self) -> Vec<Arc<dyn Tile>> {
        let mut tiles = self.tiles.values().cloned().collect::<Vec<_>>();
        tiles.sort_by(|a, b| a.id().cmp(b.id()));
        tiles
    }
}
