use ratatui::style::Color;
use ratatui::style::Style;
use ratatui::style::Stylize;

/// Style of a rejection notice shown under the input.
pub fn notice_style() -> Style {
    Style::default().red()
}

/// Style of a button the user cannot activate.
pub fn inactive_style() -> Style {
    Style::default().dim()
}

/// Parses a CSS color as written by the editor (`#rgb`, `#rrggbb` or
/// `rgb(r, g, b)`).
pub fn parse_css_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        let expand = |digit: &str| u8::from_str_radix(digit, 16).ok().map(|d| d * 17);
        return match hex.len() {
            3 => Some(Color::Rgb(
                expand(&hex[0..1])?,
                expand(&hex[1..2])?,
                expand(&hex[2..3])?,
            )),
            6 => Some(Color::Rgb(
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            )),
            _ => None,
        };
    }
    let inner = value.strip_prefix("rgb(")?.strip_suffix(')')?;
    let mut channels = inner.split(',').map(|c| c.trim().parse::<u8>().ok());
    let color = Color::Rgb(channels.next()??, channels.next()??, channels.next()??);
    channels.next().is_none().then_some(color)
}
