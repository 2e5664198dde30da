use palette::{Hsl, IntoColor, Srgb};
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Renderer-independent colour
// ---------------------------------------------------------------------------

/// An sRGB colour. Serializes as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Selected metric, left axis.
pub const METRIC_BLUE: Rgb = Rgb(0, 0, 255);
/// Temperature overlay and the right axis.
pub const TEMPERATURE_ORANGE: Rgb = Rgb(255, 165, 0);
pub const VOLUME_GREEN: Rgb = Rgb(0, 128, 0);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb> {
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Rgb(
                (rgb.red * 255.0).round() as u8,
                (rgb.green * 255.0).round() as u8,
                (rgb.blue * 255.0).round() as u8,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colours_are_distinct() {
        let colours = generate_palette(6);
        assert_eq!(colours.len(), 6);
        for (i, a) in colours.iter().enumerate() {
            for b in &colours[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn hex_and_json_form() {
        assert_eq!(TEMPERATURE_ORANGE.to_hex(), "#ffa500");
        assert_eq!(serde_json::to_string(&VOLUME_GREEN).unwrap(), "\"#008000\"");
    }
}
