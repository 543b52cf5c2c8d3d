//! Parsing for the small handful of CSS value grammars the core actually
//! consumes: colors, `translate(Xpx, Ypx)`, and bare pixel lengths.
//! Anything beyond this is `cssparser`'s job at the stylesheet-ingest
//! boundary (out of scope here, per §1).

use crate::canvas::Color;

pub fn parse_color(value: &str) -> Color {
    match value.trim() {
        "transparent" => Color::TRANSPARENT,
        "white" => Color::WHITE,
        "black" => Color::BLACK,
        "red" => Color { r: 255, g: 0, b: 0, a: 255 },
        "green" => Color { r: 0, g: 128, b: 0, a: 255 },
        "blue" => Color { r: 0, g: 0, b: 255, a: 255 },
        "gray" | "grey" => Color { r: 128, g: 128, b: 128, a: 255 },
        "lightblue" => Color { r: 173, g: 216, b: 230, a: 255 },
        "orange" => Color { r: 255, g: 165, b: 0, a: 255 },
        hex if hex.starts_with('#') => parse_hex(hex).unwrap_or(Color::BLACK),
        _ => Color::BLACK,
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digits = &hex[1..];
    let (r, g, b) = match digits.len() {
        6 => (
            u8::from_str_radix(&digits[0..2], 16).ok()?,
            u8::from_str_radix(&digits[2..4], 16).ok()?,
            u8::from_str_radix(&digits[4..6], 16).ok()?,
        ),
        3 => {
            let double = |c: char| u8::from_str_radix(&format!("{0}{0}", c), 16).ok();
            let mut chars = digits.chars();
            (
                double(chars.next()?)?,
                double(chars.next()?)?,
                double(chars.next()?)?,
            )
        }
        _ => return None,
    };
    Some(Color { r, g, b, a: 255 })
}

/// Parses `translate(Xpx, Ypx)`, returning `None` for `"none"` or anything
/// malformed (§4.5's `translation = parse translate() or null`).
pub fn parse_translate(value: &str) -> Option<(f32, f32)> {
    let inner = value.trim().strip_prefix("translate(")?.strip_suffix(')')?;
    let mut parts = inner.split(',');
    let x = parse_px(parts.next()?.trim())?;
    let y = parse_px(parts.next()?.trim())?;
    Some((x, y))
}

/// Parses a bare `"Npx"` or unitless numeric length, per §4.3's "numeric
/// with or without `px`".
pub fn parse_px(value: &str) -> Option<f32> {
    value
        .strip_suffix("px")
        .unwrap_or(value)
        .trim()
        .parse::<f32>()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_translate_with_px_suffix() {
        assert_eq!(parse_translate("translate(10px, -5px)"), Some((10.0, -5.0)));
    }

    #[test]
    fn rejects_none_translate() {
        assert_eq!(parse_translate("none"), None);
    }

    #[test]
    fn parses_short_hex_color() {
        let c = parse_hex("#f00").unwrap();
        assert_eq!((c.r, c.g, c.b), (255, 0, 0));
    }

    #[test]
    fn parses_unitless_numeric() {
        assert_eq!(parse_px("0.5"), Some(0.5));
        assert_eq!(parse_px("12px"), Some(12.0));
    }
}
