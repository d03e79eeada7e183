use std::collections::HashSet;

use crate::{
    error::{AppError, Result},
    services::grid::{self, Coordinates, PixelId},
    types::{Color, Wei},
};

pub fn validate_pixel_id(id: PixelId, grid_size: u32) -> Result<Coordinates> {
    grid::to_coordinates(id, grid_size)
}

pub fn validate_pixel_color(color: &str) -> Result<Color> {
    Color::parse(color)
}

/// Drops repeated coordinates (first occurrence wins) and resolves ids.
pub fn validate_batch(coords: &[Coordinates], grid_size: u32) -> Result<Vec<(PixelId, Coordinates)>> {
    if coords.is_empty() {
        return Err(AppError::PreconditionFailed("No pixels selected".into()));
    }

    let mut seen = HashSet::with_capacity(coords.len());
    coords
        .iter()
        .filter(|coord| seen.insert(**coord))
        .map(|coord| Ok((grid::coordinates_to_id(*coord, grid_size)?, *coord)))
        .collect()
}

pub fn batch_value(price: Wei, count: usize) -> Result<Wei> {
    price
        .checked_mul(count as Wei)
        .ok_or_else(|| AppError::Validation("Batch price overflows".into()))
}
