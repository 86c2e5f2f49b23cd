//! Colour names and hex codes used in config files.

use embedded_graphics::pixelcolor::Rgb888;

use crate::error::{LockscreenError, LockscreenResult};

/// CSS colour keywords that show up in calendar configs.
const NAMED_COLORS: &[(&str, u32)] = &[
    ("black", 0x000000),
    ("white", 0xFFFFFF),
    ("red", 0xFF0000),
    ("green", 0x008000),
    ("lime", 0x00FF00),
    ("blue", 0x0000FF),
    ("navy", 0x000080),
    ("skyblue", 0x87CEEB),
    ("cyan", 0x00FFFF),
    ("teal", 0x008080),
    ("turquoise", 0x40E0D0),
    ("yellow", 0xFFFF00),
    ("gold", 0xFFD700),
    ("orange", 0xFFA500),
    ("coral", 0xFF7F50),
    ("tomato", 0xFF6347),
    ("salmon", 0xFA8072),
    ("pink", 0xFFC0CB),
    ("magenta", 0xFF00FF),
    ("violet", 0xEE82EE),
    ("orchid", 0xDA70D6),
    ("purple", 0x800080),
    ("brown", 0xA52A2A),
    ("maroon", 0x800000),
    ("olive", 0x808000),
    ("silver", 0xC0C0C0),
    ("gray", 0x808080),
    ("grey", 0x808080),
    ("lightgray", 0xD3D3D3),
    ("lightgrey", 0xD3D3D3),
    ("darkgray", 0xA9A9A9),
    ("darkgrey", 0xA9A9A9),
];

/// Parse a colour keyword, `#rgb` or `#rrggbb`.
pub fn parse_color(value: &str) -> LockscreenResult<Rgb888> {
    let value = value.trim().to_ascii_lowercase();

    let rgb = match value.strip_prefix('#') {
        Some(hex) => parse_hex(hex),
        None => NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == value)
            .map(|(_, rgb)| *rgb),
    };

    rgb.map(|rgb| Rgb888::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8))
        .ok_or_else(|| LockscreenError::Render(format!("unknown colour '{value}'")))
}

fn parse_hex(hex: &str) -> Option<u32> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => u32::from_str_radix(hex, 16).ok(),
        3 => {
            let short = u32::from_str_radix(hex, 16).ok()?;
            let (r, g, b) = ((short >> 8) & 0xF, (short >> 4) & 0xF, short & 0xF);
            Some((r * 0x11) << 16 | (g * 0x11) << 8 | (b * 0x11))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_colors() {
        assert_eq!(parse_color("green").unwrap(), Rgb888::new(0, 128, 0));
        assert_eq!(parse_color(" Red ").unwrap(), Rgb888::new(255, 0, 0));
        assert_eq!(parse_color("grey").unwrap(), parse_color("gray").unwrap());
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(parse_color("#1e90ff").unwrap(), Rgb888::new(0x1E, 0x90, 0xFF));
        assert_eq!(parse_color("#F0A").unwrap(), Rgb888::new(0xFF, 0x00, 0xAA));
    }

    #[test]
    fn test_unknown_color_is_render_error() {
        for bad in ["blurple", "#12345", "#gggggg", ""] {
            let err = parse_color(bad).unwrap_err();
            assert!(matches!(err, LockscreenError::Render(_)), "{bad}");
        }
    }
}
