//! Rasterises store snapshots into the block canvas the user clicks on.

use crate::{
    config::CanvasConfig,
    services::{
        grid::{self, Coordinates},
        pixel::StoreState,
    },
    types::Color,
    utils::format::{format_address, format_eth},
};

pub mod surface;

pub use surface::{Rect, Surface};

pub const GRID_LINE_COLOR: Color = Color::rgb(0xF0, 0xF0, 0xF0);
pub const BORDER_COLOR: Color = Color::rgb(0, 0, 0);
pub const BORDER_ALPHA: f32 = 0.2;
pub const HIGHLIGHT_COLOR: Color = Color::rgb(0x00, 0x52, 0xFF);
pub const HIGHLIGHT_WIDTH: u32 = 2;

#[derive(Debug, Clone)]
pub struct CanvasRenderer {
    block_size: u32,
    viewport_blocks: u32,
    origin: Coordinates,
}

impl CanvasRenderer {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            block_size: config.block_size.max(1),
            viewport_blocks: config.viewport_blocks.max(1),
            origin: Coordinates::new(0, 0),
        }
    }

    pub fn origin(&self) -> Coordinates {
        self.origin
    }

    /// Side length of the rendered canvas in raster pixels.
    pub fn size_px(&self) -> u32 {
        self.viewport_blocks * self.block_size
    }

    /// Moves the viewport, keeping it inside the grid where possible.
    pub fn pan_to(&mut self, origin: Coordinates, grid_size: u32) {
        let max = grid_size.saturating_sub(self.viewport_blocks);
        self.origin = Coordinates::new(origin.x.min(max), origin.y.min(max));
        tracing::debug!(x = self.origin.x, y = self.origin.y, "Viewport moved");
    }

    pub fn contains(&self, coords: Coordinates) -> bool {
        let in_range = |value: u32, start: u32| value >= start && value - start < self.viewport_blocks;
        in_range(coords.x, self.origin.x) && in_range(coords.y, self.origin.y)
    }

    fn block_rect(&self, coords: Coordinates) -> Rect {
        Rect::square(
            (coords.x - self.origin.x) * self.block_size,
            (coords.y - self.origin.y) * self.block_size,
            self.block_size,
        )
    }

    /// Maps a raster position to the block under it.
    pub fn resolve_click(&self, px: u32, py: u32, grid_size: u32) -> Option<Coordinates> {
        if px >= self.size_px() || py >= self.size_px() {
            return None;
        }
        let coords = Coordinates::new(
            self.origin.x + px / self.block_size,
            self.origin.y + py / self.block_size,
        );
        grid::coordinates_to_id(coords, grid_size).ok().map(|_| coords)
    }

    pub fn paint(&self, state: &StoreState) -> Surface {
        let size = self.size_px();
        let mut surface = Surface::new(size, size, Color::WHITE);

        for line in (0..=self.viewport_blocks).map(|block| block * self.block_size) {
            surface.horizontal_line(line, GRID_LINE_COLOR);
            surface.vertical_line(line, GRID_LINE_COLOR);
        }

        let mut drawn = 0usize;
        for record in state.pixels.values() {
            let coords = record.coordinates();
            if !self.contains(coords) {
                continue;
            }
            let rect = self.block_rect(coords);
            surface.fill_rect(rect, record.color);
            surface.stroke_rect(rect, BORDER_COLOR, BORDER_ALPHA, 1);
            drawn += 1;
        }

        let selected = state
            .selection
            .pixel
            .and_then(|id| grid::to_coordinates(id, state.grid_size).ok());
        for coords in state.selection.blocks.iter().copied().chain(selected) {
            if self.contains(coords) {
                surface.stroke_rect(self.block_rect(coords), HIGHLIGHT_COLOR, 1.0, HIGHLIGHT_WIDTH);
            }
        }

        tracing::debug!(drawn, cached = state.pixels.len(), "Canvas painted");
        surface
    }

    /// One-line status text for the canvas toolbar.
    pub fn status_line(&self, state: &StoreState) -> String {
        let status = self.selection_status(state);
        if state.is_degraded() {
            format!("{status} (simulated ledger)")
        } else {
            status
        }
    }

    fn selection_status(&self, state: &StoreState) -> String {
        let selection = &state.selection;
        if selection.multi_select {
            if selection.blocks.is_empty() {
                return "Multi-select mode - Click on multiple pixel blocks to select them".into();
            }
            let total = state
                .pixel_price
                .map(|price| price.saturating_mul(selection.blocks.len() as u128));
            return format!(
                "Selected {} blocks. Total price: {} ETH",
                selection.blocks.len(),
                format_eth(total, 4)
            );
        }

        match state.selected_pixel() {
            Some(record) => match record.owner.account() {
                Some(owner) => format!(
                    "Block at ({}, {}) is owned by {}",
                    record.x,
                    record.y,
                    format_address(Some(owner), 4)
                ),
                None => format!(
                    "Selected block at ({}, {}). Price: {} ETH",
                    record.x,
                    record.y,
                    state
                        .pixel_price
                        .map_or_else(|| "0.01".to_string(), |price| format_eth(Some(price), 4))
                ),
            },
            None => "Ready - Click on a pixel block to select it".into(),
        }
    }
}
