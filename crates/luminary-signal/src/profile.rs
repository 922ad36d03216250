use crate::state::AffectState;

/// Reference frequencies in hertz.
pub struct Frequencies;

impl Frequencies {
    pub const PEMF: f32 = 40.0;
    pub const LOVE: f32 = 528.0;
    pub const CLARITY: f32 = 432.0;
    pub const INTUITION: f32 = 963.0;
    pub const SCHUMANN: f32 = 7.83;
}

/// Immutable per-state parameters shared by every output channel.
#[derive(Debug, Clone, PartialEq)]
pub struct StateProfile {
    pub state: AffectState,
    /// Display colour as `#rrggbb`.
    pub color: &'static str,
    /// Tone frequency in hertz.
    pub tone: f32,
    /// PEMF gain in `[0, 1]`.
    pub pemf_intensity: f32,
    /// Never empty.
    pub affirmations: &'static [&'static str],
}

static STRESSED: StateProfile = StateProfile {
    state: AffectState::Stressed,
    color: "#ff4500",
    tone: Frequencies::CLARITY,
    pemf_intensity: 0.7,
    affirmations: &[
        "I release tension, embracing calm.",
        "Love heals me, restoring balance.",
        "I release my worries into the Earth and find stability.",
    ],
};

static CALM: StateProfile = StateProfile {
    state: AffectState::Calm,
    color: "#1e90ff",
    tone: Frequencies::LOVE,
    pemf_intensity: 0.5,
    affirmations: &[
        "I am at peace, radiating love.",
        "My mind is clear, my heart is open.",
        "I am grounded, calm, and centered.",
    ],
};

static INTUITIVE: StateProfile = StateProfile {
    state: AffectState::Intuitive,
    color: "#00ff7f",
    tone: Frequencies::INTUITION,
    pemf_intensity: 0.5,
    affirmations: &[
        "My inner vision shines brightly.",
        "I am connected to infinite wisdom.",
        "Connected to Earth and Spirit, my path is clear.",
    ],
};

impl StateProfile {
    pub fn for_state(state: AffectState) -> &'static StateProfile {
        match state {
            AffectState::Stressed => &STRESSED,
            AffectState::Calm => &CALM,
            AffectState::Intuitive => &INTUITIVE,
        }
    }

    /// Affirmation at `index`, wrapping around the list.
    pub fn affirmation(&self, index: usize) -> &'static str {
        self.affirmations[index % self.affirmations.len()]
    }

    /// Colour as an `(r, g, b)` triple. Malformed strings decode to white.
    pub fn rgb(&self) -> (u8, u8, u8) {
        parse_hex(self.color).unwrap_or((255, 255, 255))
    }
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
