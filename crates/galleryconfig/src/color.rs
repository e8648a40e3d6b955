use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// An 8-bit RGB colour written as `#rrggbb` (or the `#rgb` shorthand).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const WHITE: Rgb = Rgb([0xff, 0xff, 0xff]);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    /// Normalised channels in `[0, 1]`, passed to the GPU unmodified.
    pub fn to_unit(self) -> [f32; 3] {
        let [r, g, b] = self.0;
        [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let hex = trimmed
            .strip_prefix('#')
            .ok_or_else(|| format!("colour '{trimmed}' must start with '#'"))?;
        if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(format!("colour '{trimmed}' contains non-hex digits"));
        }

        let channel = |digits: &str| {
            u8::from_str_radix(digits, 16).map_err(|err| format!("invalid colour '{trimmed}': {err}"))
        };

        match hex.len() {
            6 => Ok(Rgb([
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            ])),
            3 => {
                let expand = |index: usize| channel(&hex[index..index + 1]).map(|v| v * 17);
                Ok(Rgb([expand(0)?, expand(1)?, expand(2)?]))
            }
            _ => Err(format!(
                "colour '{trimmed}' must be written as #rrggbb or #rgb"
            )),
        }
    }
}

impl Serialize for Rgb {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;
        impl<'de> de::Visitor<'de> for Visitor {
            type Value = Rgb;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a hex colour string such as \"#6df4ce\"")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_forms() {
        assert_eq!("#6df4ce".parse::<Rgb>().unwrap(), Rgb::new(0x6d, 0xf4, 0xce));
        assert_eq!("#fff".parse::<Rgb>().unwrap(), Rgb::WHITE);
        assert_eq!(" #111111 ".parse::<Rgb>().unwrap(), Rgb::new(0x11, 0x11, 0x11));
    }

    #[test]
    fn rejects_malformed_colours() {
        assert!("6df4ce".parse::<Rgb>().is_err());
        assert!("#6df4c".parse::<Rgb>().is_err());
        assert!("#zzzzzz".parse::<Rgb>().is_err());
    }

    #[test]
    fn displays_lowercase_hex() {
        assert_eq!(Rgb::new(0x6d, 0xf4, 0xce).to_string(), "#6df4ce");
        let unit = Rgb::WHITE.to_unit();
        assert!((unit[0] - 1.0).abs() < 1e-6);
    }
}
