use std::path::PathBuf;

use thiserror::Error;

use crate::tile::TileId;

#[derive(Error, Debug)]
pub enum TileError {
    #[error("no tile at {0}")]
    NotFound(PathBuf),

    #[error("tile {tile} has no {tag} section")]
    SectionMissing { tile: TileId, tag: String },

    #[error("could not read tile: {0}")]
    Io(#[from] std::io::Error),
}
