//! Fixed-grid bitmap fonts.

use std::sync::Arc;

use tessera_core::math::Vec2;

use crate::resources::{ShaderResourceView, Texture};

/// A font whose glyphs sit in a 16x16 grid on one texture, indexed by byte
/// value. Glyph 0 is the top-left cell.
#[derive(Debug)]
pub struct BitmapFont {
    name: String,
    texture: Arc<Texture>,
    view: ShaderResourceView,
}

impl BitmapFont {
    /// Cells per row and per column.
    pub const GRID: u32 = 16;

    pub(crate) fn new(name: impl Into<String>, texture: Arc<Texture>, view: ShaderResourceView) -> Self {
        Self {
            name: name.into(),
            texture,
            view,
        }
    }

    /// Font name (its cache key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Atlas texture.
    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }

    /// View for binding the atlas.
    pub fn view(&self) -> &ShaderResourceView {
        &self.view
    }

    /// Atlas rectangle of `glyph` as `(top-left, bottom-right)` UVs.
    ///
    /// Characters outside `0..=255` use glyph `?`.
    pub fn glyph_uvs(&self, glyph: char) -> (Vec2, Vec2) {
        let index = u8::try_from(u32::from(glyph)).unwrap_or(b'?') as u32;
        let cell = 1.0 / Self::GRID as f32;
        let column = (index % Self::GRID) as f32;
        let row = (index / Self::GRID) as f32;
        let min = Vec2::new(column * cell, row * cell);
        (min, min + Vec2::new(cell, cell))
    }

    /// Width of `text` at `cell_height`, for a glyph aspect of width / height.
    pub fn text_width(&self, text: &str, cell_height: f32, glyph_aspect: f32) -> f32 {
        text.chars().count() as f32 * cell_height * glyph_aspect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GpuBackend;
    use crate::backend::dummy::DummyBackend;
    use tessera_core::color::Rgba8;

    fn font() -> BitmapFont {
        let backend: Arc<dyn GpuBackend> = Arc::new(DummyBackend::new());
        let texture = Arc::new(Texture::solid_color(&backend, Rgba8::WHITE).unwrap());
        let view = texture.create_shader_resource_view().unwrap();
        BitmapFont::new("fonts/Squirrel", texture, view)
    }

    #[test]
    fn test_glyph_cells() {
        let font = font();
        let (min, max) = font.glyph_uvs('A');
        // 'A' = 65 = row 4, column 1
        assert_eq!(min, Vec2::new(1.0 / 16.0, 4.0 / 16.0));
        assert_eq!(max, Vec2::new(2.0 / 16.0, 5.0 / 16.0));

        let (min, _) = font.glyph_uvs('\u{0}');
        assert_eq!(min, Vec2::zeros());
    }

    #[test]
    fn test_out_of_range_glyph() {
        let font = font();
        assert_eq!(font.glyph_uvs('\u{263A}'), font.glyph_uvs('?'));
    }

    #[test]
    fn test_text_width() {
        assert_eq!(font().text_width("abcd", 10.0, 0.5), 20.0);
    }
}
