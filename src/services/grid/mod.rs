//! Linear pixel id <-> grid coordinate mapping.
//!
//! `id = y * grid_size + x`, a bijection over `[0, grid_size²)`.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub type PixelId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: u32,
    pub y: u32,
}

impl Coordinates {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

pub fn to_id(x: u32, y: u32, grid_size: u32) -> Result<PixelId> {
    if x >= grid_size || y >= grid_size {
        return Err(AppError::Validation(format!(
            "Coordinates ({x}, {y}) out of bounds for grid size {grid_size}"
        )));
    }
    Ok(y as u64 * grid_size as u64 + x as u64)
}

/// Same as [`to_id`] for untrusted signed input; negatives are rejected, not wrapped.
pub fn to_id_signed(x: i64, y: i64, grid_size: u32) -> Result<PixelId> {
    let x = u32::try_from(x)
        .map_err(|_| AppError::Validation(format!("Coordinate x={x} out of bounds")))?;
    let y = u32::try_from(y)
        .map_err(|_| AppError::Validation(format!("Coordinate y={y} out of bounds")))?;
    to_id(x, y, grid_size)
}

pub fn to_coordinates(id: PixelId, grid_size: u32) -> Result<Coordinates> {
    let grid = grid_size as u64;
    if id >= grid * grid {
        return Err(AppError::Validation(format!(
            "Pixel id {id} out of bounds for grid size {grid_size}"
        )));
    }
    Ok(Coordinates {
        x: (id % grid) as u32,
        y: (id / grid) as u32,
    })
}

pub fn to_coordinates_signed(id: i64, grid_size: u32) -> Result<Coordinates> {
    let id = PixelId::try_from(id)
        .map_err(|_| AppError::Validation(format!("Pixel id {id} out of bounds")))?;
    to_coordinates(id, grid_size)
}

pub fn coordinates_to_id(coords: Coordinates, grid_size: u32) -> Result<PixelId> {
    to_id(coords.x, coords.y, grid_size)
}

/// Block coordinates of a `width` x `height` chunk anchored at `start`, row-major.
pub fn chunk(start: Coordinates, width: u32, height: u32, grid_size: u32) -> Result<Vec<Coordinates>> {
    if width == 0 || height == 0 {
        return Err(AppError::Validation("Chunk dimensions must be positive".into()));
    }

    let end_x = start.x as u64 + width as u64;
    let end_y = start.y as u64 + height as u64;
    if end_x > grid_size as u64 || end_y > grid_size as u64 {
        return Err(AppError::Validation(format!(
            "Chunk at ({}, {}) of {width}x{height} exceeds grid size {grid_size}",
            start.x, start.y
        )));
    }

    Ok((start.y..start.y + height)
        .flat_map(|y| (start.x..start.x + width).map(move |x| Coordinates { x, y }))
        .collect())
}
