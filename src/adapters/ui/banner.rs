//! ASCII banner with a vertical gradient (CLUBS).

use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};

/// Pitch green (#1db954).
const PITCH_GREEN: (u8, u8, u8) = (0x1d, 0xb9, 0x54);
/// Jersey blue (#1e90ff).
const JERSEY_BLUE: (u8, u8, u8) = (0x1e, 0x90, 0xff);

/// Linear interpolation between two RGB colors. `t` in [0.0, 1.0].
fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let r = (f64::from(a.0) * (1.0 - t) + f64::from(b.0) * t).round() as u8;
    let g = (f64::from(a.1) * (1.0 - t) + f64::from(b.1) * t).round() as u8;
    let bl = (f64::from(a.2) * (1.0 - t) + f64::from(b.2) * t).round() as u8;
    (r, g, bl)
}

fn banner_art() -> String {
    FIGfont::standard()
        .ok()
        .and_then(|font| font.convert("CLUBS").map(|fig| fig.to_string()))
        .unwrap_or_else(|| "CLUBS\n".to_string())
}

/// Prints "CLUBS" in figlet's standard font, fading from pitch green to jersey blue,
/// followed by the crate version.
pub fn print_welcome() {
    let mut out = stdout();
    let art = banner_art();
    let lines: Vec<&str> = art.lines().collect();
    let total = lines.len().max(1);

    for (i, line) in lines.iter().enumerate() {
        let t = if total <= 1 {
            1.0
        } else {
            i as f64 / (total - 1) as f64
        };
        let (r, g, b) = lerp_rgb(PITCH_GREEN, JERSEY_BLUE, t);
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let _ = out.execute(SetForegroundColor(Color::Rgb {
        r: JERSEY_BLUE.0,
        g: JERSEY_BLUE.1,
        b: JERSEY_BLUE.2,
    }));
    let _ = out.execute(Print(format!(
        "club-directory v{}\r\n",
        env!("CARGO_PKG_VERSION")
    )));
    let _ = out.execute(ResetColor);
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(lerp_rgb(PITCH_GREEN, JERSEY_BLUE, 0.0), PITCH_GREEN);
        assert_eq!(lerp_rgb(PITCH_GREEN, JERSEY_BLUE, 1.0), JERSEY_BLUE);
    }

    #[test]
    fn test_banner_art_is_multiline() {
        assert!(banner_art().lines().count() > 1);
    }
}
