pub mod snapshot {
    use crate::core_modules::grid::Grid;
    use crate::error::Result;
    use image::ImageEncoder;
    use std::path::Path;

    const ALIVE_RGBA: [u8; 4] = [0, 0, 0, 255];
    const DEAD_RGBA: [u8; 4] = [255, 255, 255, 255];

    /// RGBA bytes of the logical cells held by `grid`, frame columns excluded.
    pub fn to_rgba(grid: &Grid) -> Vec<u8> {
        let width = grid.logical_size();
        let mut buffer = Vec::with_capacity(width * grid.height() * 4);
        for row in grid.row_span() {
            for cell in &grid.row(row)[1..=width] {
                buffer.extend_from_slice(if cell.is_alive() { &ALIVE_RGBA } else { &DEAD_RGBA });
            }
        }
        buffer
    }

    /// Writes the logical S x S cells of a padded world as a PNG.
    pub fn save_png(grid: &Grid, path: impl AsRef<Path>) -> Result<()> {
        let size = grid.logical_size();
        let interior = grid.window(1..size + 1)?;
        let buffer = to_rgba(&interior);

        let output = std::fs::File::create(path)
            .map_err(image::ImageError::IoError)?;
        let encoder = image::codecs::png::PngEncoder::new(output);
        encoder.write_image(&buffer, size as u32, size as u32, image::ExtendedColorType::Rgba8)?;

        Ok(())
    }
}
