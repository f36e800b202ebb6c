use serde::{Deserialize, Serialize};

/// Straight-alpha RGBA8 color.
///
/// Deserializes from CSS-style hex strings (`#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`),
/// the keyword `transparent`, an `{r,g,b,a}` object or an `[r,g,b(,a)]` array with
/// normalized `0..1` channels. Serializes as `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse a hex color or `transparent`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("transparent") {
            return Ok(Self::TRANSPARENT);
        }
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.is_ascii() {
            return Err(format!("invalid color \"{s}\""));
        }

        fn nibble(c: &str) -> Result<u8, String> {
            u8::from_str_radix(c, 16)
                .map(|v| v * 17)
                .map_err(|_| format!("invalid hex digit \"{c}\""))
        }
        fn byte(pair: &str) -> Result<u8, String> {
            u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
        }

        match hex.len() {
            3 | 4 => {
                let a = if hex.len() == 4 { nibble(&hex[3..4])? } else { 255 };
                Ok(Self {
                    r: nibble(&hex[0..1])?,
                    g: nibble(&hex[1..2])?,
                    b: nibble(&hex[2..3])?,
                    a,
                })
            }
            6 | 8 => {
                let a = if hex.len() == 8 { byte(&hex[6..8])? } else { 255 };
                Ok(Self {
                    r: byte(&hex[0..2])?,
                    g: byte(&hex[2..4])?,
                    b: byte(&hex[4..6])?,
                    a,
                })
            }
            _ => Err(format!(
                "color \"{s}\" must be #rgb, #rgba, #rrggbb, #rrggbbaa or transparent"
            )),
        }
    }

    /// Scale alpha by an opacity percentage in `0..=100`.
    pub fn with_opacity_pct(self, pct: f64) -> Self {
        let k = (pct / 100.0).clamp(0.0, 1.0);
        Self {
            a: (f64::from(self.a) * k).round() as u8,
            ..self
        }
    }

    /// Scale alpha by a `0..1` factor.
    pub fn with_alpha_factor(self, k: f64) -> Self {
        self.with_opacity_pct(k * 100.0)
    }

    pub fn is_transparent(self) -> bool {
        self.a == 0
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }

    /// Premultiplied bytes in `[r, g, b, a]` order.
    pub fn premultiplied(self) -> [u8; 4] {
        let a = u16::from(self.a);
        let premul = |c: u8| -> u8 { ((u16::from(c) * a + 127) / 255) as u8 };
        [premul(self.r), premul(self.g), premul(self.b), self.a]
    }
}

impl Default for Rgba8 {
    fn default() -> Self {
        Self::WHITE
    }
}

impl std::str::FromStr for Rgba8 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Rgba8 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgba8 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            RgbaObj {
                r: f64,
                g: f64,
                b: f64,
                #[serde(default = "one")]
                a: f64,
            },
            Arr(Vec<f64>),
        }

        fn one() -> f64 {
            1.0
        }

        fn unit(x: f64) -> u8 {
            (x.clamp(0.0, 1.0) * 255.0).round() as u8
        }

        match Repr::deserialize(deserializer)? {
            Repr::Hex(s) => Self::parse(&s).map_err(serde::de::Error::custom),
            Repr::RgbaObj { r, g, b, a } => Ok(Self {
                r: unit(r),
                g: unit(g),
                b: unit(b),
                a: unit(a),
            }),
            Repr::Arr(v) => match v.as_slice() {
                [r, g, b] => Ok(Self {
                    r: unit(*r),
                    g: unit(*g),
                    b: unit(*b),
                    a: 255,
                }),
                [r, g, b, a] => Ok(Self {
                    r: unit(*r),
                    g: unit(*g),
                    b: unit(*b),
                    a: unit(*a),
                }),
                _ => Err(serde::de::Error::custom(
                    "rgba array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                )),
            },
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/color.rs"]
mod tests;
