//! Weather condition codes (WMO, 0-99) to icon categories, and categories to
//! the concrete icon resources drawn on the face

use crate::state::Theme;

/// 12x12 one-bit icon. `#` is ink, anything else is transparent.
pub type Glyph = [&'static [u8; 12]; 12];

/// Icon categories, numbered 1-9
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WeatherCategory {
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    Showers,
    Snow,
    Thunderstorm,
}

impl WeatherCategory {
    #[cfg(test)]
    pub const ALL: [Self; 9] = [
        Self::Clear,
        Self::PartlyCloudy,
        Self::Cloudy,
        Self::Fog,
        Self::Drizzle,
        Self::Rain,
        Self::Showers,
        Self::Snow,
        Self::Thunderstorm,
    ];

    /// Category number, 1-9
    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    fn name(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::PartlyCloudy => "partly_cloudy",
            Self::Cloudy => "cloudy",
            Self::Fog => "fog",
            Self::Drizzle => "drizzle",
            Self::Rain => "rain",
            Self::Showers => "showers",
            Self::Snow => "snow",
            Self::Thunderstorm => "thunderstorm",
        }
    }

    fn glyph(self) -> &'static Glyph {
        match self {
            Self::Clear => &CLEAR,
            Self::PartlyCloudy => &PARTLY_CLOUDY,
            Self::Cloudy => &CLOUDY,
            Self::Fog => &FOG,
            Self::Drizzle => &DRIZZLE,
            Self::Rain => &RAIN,
            Self::Showers => &SHOWERS,
            Self::Snow => &SNOW,
            Self::Thunderstorm => &THUNDERSTORM,
        }
    }
}

/// Classify a condition code. Anything we don't recognize (including the
/// unknown sentinel) shows up as clear rather than leaving a hole.
pub fn category_for(code: u8) -> WeatherCategory {
    match code {
        0 => WeatherCategory::Clear,
        1 | 2 => WeatherCategory::PartlyCloudy,
        3 => WeatherCategory::Cloudy,
        45 | 48 => WeatherCategory::Fog,
        51..=57 => WeatherCategory::Drizzle,
        61..=67 => WeatherCategory::Rain,
        80..=82 => WeatherCategory::Showers,
        71..=77 | 85 | 86 => WeatherCategory::Snow,
        95..=99 => WeatherCategory::Thunderstorm,
        _ => WeatherCategory::Clear,
    }
}

/// Artwork set. Dark icons are drawn for dark backgrounds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IconTone {
    Light,
    Dark,
}

/// A concrete icon asset
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IconResource {
    pub category: WeatherCategory,
    pub tone: IconTone,
}

impl IconResource {
    const fn new(category: WeatherCategory, tone: IconTone) -> Self {
        Self { category, tone }
    }

    /// Asset name, for logging
    pub fn name(&self) -> String {
        let tone = match self.tone {
            IconTone::Light => "light",
            IconTone::Dark => "dark",
        };
        format!("weather_{}_{tone}", self.category.name())
    }

    pub fn glyph(&self) -> &'static Glyph {
        self.category.glyph()
    }
}

const LIGHT_ICONS: [IconResource; 9] = icon_table(IconTone::Light);
const DARK_ICONS: [IconResource; 9] = icon_table(IconTone::Dark);

const fn icon_table(tone: IconTone) -> [IconResource; 9] {
    use WeatherCategory::*;
    [
        IconResource::new(Clear, tone),
        IconResource::new(PartlyCloudy, tone),
        IconResource::new(Cloudy, tone),
        IconResource::new(Fog, tone),
        IconResource::new(Drizzle, tone),
        IconResource::new(Rain, tone),
        IconResource::new(Showers, tone),
        IconResource::new(Snow, tone),
        IconResource::new(Thunderstorm, tone),
    ]
}

/// Pick the icon for a category under a theme. Color uses the light set.
pub fn resource_for(category: WeatherCategory, theme: Theme) -> IconResource {
    let table = match theme {
        Theme::Light | Theme::Color => &LIGHT_ICONS,
        Theme::Dark => &DARK_ICONS,
    };
    table[usize::from(category.number() - 1)]
}

const CLEAR: Glyph = [
    b".....#......",
    b"..#..#..#...",
    b"...#...#....",
    b".....##.....",
    b"....####....",
    b"###.####.###",
    b"....####....",
    b".....##.....",
    b"...#...#....",
    b"..#..#..#...",
    b".....#......",
    b"............",
];

const PARTLY_CLOUDY: Glyph = [
    b"...#........",
    b"#..#..#.....",
    b".#.....#....",
    b"...###......",
    b"..#####.....",
    b"#####..##...",
    b"..#.....##..",
    b".#.......##.",
    b"#.........#.",
    b"#.........#.",
    b".#########..",
    b"............",
];

const CLOUDY: Glyph = [
    b"............",
    b"............",
    b"....####....",
    b"...#....#...",
    b"..#......##.",
    b".##........#",
    b"#..........#",
    b"#..........#",
    b"#..........#",
    b".##########.",
    b"............",
    b"............",
];

const FOG: Glyph = [
    b"............",
    b"....####....",
    b"...#....#...",
    b"..#......##.",
    b".#.........#",
    b".##########.",
    b"............",
    b"##########..",
    b"............",
    b"..##########",
    b"............",
    b"#########...",
];

const DRIZZLE: Glyph = [
    b"....####....",
    b"...#....#...",
    b"..#......##.",
    b".#.........#",
    b"#..........#",
    b".##########.",
    b"............",
    b"..#....#....",
    b"............",
    b".....#....#.",
    b"............",
    b"..#....#....",
];

const RAIN: Glyph = [
    b"....####....",
    b"...#....#...",
    b"..#......##.",
    b".#.........#",
    b"#..........#",
    b".##########.",
    b"..#..#..#...",
    b".#..#..#....",
    b"............",
    b"...#..#..#..",
    b"..#..#..#...",
    b"............",
];

const SHOWERS: Glyph = [
    b"..#.........",
    b"....####....",
    b"#..#....#...",
    b"..#......##.",
    b".#.........#",
    b".##########.",
    b"...#...#....",
    b"..#...#...#.",
    b".#...#...#..",
    b"....#...#...",
    b"...#...#....",
    b"............",
];

const SNOW: Glyph = [
    b"............",
    b".....#......",
    b"..#..#..#...",
    b"...#.#.#....",
    b"....###.....",
    b".#########..",
    b"....###.....",
    b"...#.#.#....",
    b"..#..#..#...",
    b".....#......",
    b"............",
    b"............",
];

const THUNDERSTORM: Glyph = [
    b"....####....",
    b"...#....#...",
    b"..#......##.",
    b".#.........#",
    b"#..........#",
    b".###....###.",
    b".....##.....",
    b"....##......",
    b"...######...",
    b"......##....",
    b".....##.....",
    b"....#.......",
];
