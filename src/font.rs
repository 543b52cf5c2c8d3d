//! The font measurement interface (§6). Layout only ever needs advance
//! widths and ascent/descent metrics, so the real backend (`font-kit`)
//! sits behind these two traits rather than being named directly in
//! `layout`.

use std::rc::Rc;

/// A single resolved (size, weight, style) font instance.
pub trait Font: std::fmt::Debug {
    /// Total advance width of `text` when set in this font, in pixels.
    fn measure_text(&self, text: &str) -> f32;
    /// `(ascent, descent)`, ascent negative and descent positive, both in
    /// pixels, following the convention in §4.2's baseline formula.
    fn metrics(&self) -> (f32, f32);
    /// `1.25 * (ascent + descent)`, the single-line height used when a box
    /// has no text of its own (e.g. an `<input>`).
    fn linespace(&self) -> f32 {
        let (ascent, descent) = self.metrics();
        1.25 * (-ascent + descent)
    }
}

/// Resolves a font instance for a given size/weight/style triple, caching
/// as it sees fit. Implemented by a `font-kit`-backed loader in the
/// windowed build and by [`test_support::FakeFontProvider`] in tests.
pub trait FontProvider {
    fn get_font(&self, size: f32, weight: &str, style: &str) -> Rc<dyn Font>;
}

/// The real, `font-kit`-backed implementation used by the windowed binary.
pub mod system {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    use font_kit::family_name::FamilyName;
    use font_kit::font::Font as FontKitFont;
    use font_kit::properties::{Properties, Style as FkStyle, Weight as FkWeight};
    use font_kit::source::SystemSource;

    #[derive(Debug)]
    pub struct SystemFont {
        inner: FontKitFont,
        size: f32,
    }

    impl Font for SystemFont {
        fn measure_text(&self, text: &str) -> f32 {
            let units_per_em = self.inner.metrics().units_per_em as f32;
            text.chars()
                .filter_map(|c| self.inner.glyph_for_char(c))
                .filter_map(|glyph| self.inner.advance(glyph).ok())
                .map(|advance| advance.x() * self.size / units_per_em)
                .sum()
        }

        fn metrics(&self) -> (f32, f32) {
            let metrics = self.inner.metrics();
            let units_per_em = metrics.units_per_em as f32;
            let scale = self.size / units_per_em;
            (-metrics.ascent * scale, metrics.descent.abs() * scale)
        }
    }

    /// Resolves and caches a `font-kit` font per `(size, weight, style)`
    /// triple, falling back to the platform's default sans-serif family.
    #[derive(Debug, Default)]
    pub struct SystemFontProvider {
        cache: RefCell<HashMap<(u32, String, String), Rc<dyn Font>>>,
    }

    impl FontProvider for SystemFontProvider {
        fn get_font(&self, size: f32, weight: &str, style: &str) -> Rc<dyn Font> {
            let key = (size.to_bits(), weight.to_owned(), style.to_owned());
            if let Some(font) = self.cache.borrow().get(&key) {
                return font.clone();
            }
            let fk_weight = if weight == "bold" { FkWeight::BOLD } else { FkWeight::NORMAL };
            let fk_style = if style == "italic" { FkStyle::Italic } else { FkStyle::Normal };
            let properties = Properties {
                weight: fk_weight,
                style: fk_style,
                ..Properties::new()
            };
            let inner = SystemSource::new()
                .select_best_match(&[FamilyName::SansSerif], &properties)
                .and_then(|handle| handle.load())
                .expect("no system sans-serif font available");
            let font: Rc<dyn Font> = Rc::new(SystemFont { inner, size });
            self.cache.borrow_mut().insert(key, font.clone());
            font
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// A fixed-width stand-in font: every glyph advances `char_width`
    /// pixels, so tests can assert on exact layout geometry without a real
    /// font backend.
    #[derive(Debug)]
    pub struct FakeFont {
        pub char_width: f32,
        pub ascent: f32,
        pub descent: f32,
    }

    impl Font for FakeFont {
        fn measure_text(&self, text: &str) -> f32 {
            text.chars().count() as f32 * self.char_width
        }

        fn metrics(&self) -> (f32, f32) {
            (self.ascent, self.descent)
        }
    }

    #[derive(Debug, Default)]
    pub struct FakeFontProvider {
        cache: RefCell<HashMap<(u32, String, String), Rc<dyn Font>>>,
    }

    impl FontProvider for FakeFontProvider {
        fn get_font(&self, size: f32, weight: &str, style: &str) -> Rc<dyn Font> {
            let key = (size.to_bits(), weight.to_owned(), style.to_owned());
            if let Some(font) = self.cache.borrow().get(&key) {
                return font.clone();
            }
            let font: Rc<dyn Font> = Rc::new(FakeFont {
                char_width: size * 0.6,
                ascent: -size * 0.8,
                descent: size * 0.2,
            });
            self.cache.borrow_mut().insert(key, font.clone());
            font
        }
    }
}
