/// Easing functions used to remap normalized animation progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Ease {
    /// `t²`
    EaseIn,
    /// `t(2 - t)`
    EaseOut,
    /// Quadratic in for the first half, quadratic out for the second.
    EaseInOut,
    /// Identity. Unknown names deserialize to this, so it must stay the last variant.
    #[default]
    #[serde(other)]
    Linear,
}

impl Ease {
    pub const ALL: [Ease; 4] = [Ease::Linear, Ease::EaseIn, Ease::EaseOut, Ease::EaseInOut];

    /// Apply this easing function to progress `t`, clamped to `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => t * (2.0 - t),
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }

    /// Look up an easing by name; unknown names fall back to [`Ease::Linear`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "easein" | "in" => Self::EaseIn,
            "easeout" | "out" => Self::EaseOut,
            "easeinout" | "inout" => Self::EaseInOut,
            _ => Self::Linear,
        }
    }
}

impl std::str::FromStr for Ease {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}
