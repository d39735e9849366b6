//! Face geometry. Most of it is fixed for a given display; only the weather
//! slots move, depending on the display shape and which weather items are
//! visible.

use crate::theme::{pixel_pitch, MatrixVariant, SMALL_SCREEN_WIDTH};
use embedded_graphics::{
    geometry::{Point, Size},
    primitives::Rectangle,
};
use serde::Deserialize;

const DATE_HEIGHT: u32 = 20;
const BATTERY_SIZE: Size = Size::new(26, 10);
const CORNER_RULE_SIZE: Size = Size::new(12, 2);
const RULE_HEIGHT: u32 = 2;
const ICON_SIZE: u32 = 12;
const TEMPERATURE_SIZE: Size = Size::new(34, 16);
/// Space between the icon and the temperature
const WEATHER_GAP: u32 = 2;
/// Distance from the bottom edge to the weather row on round displays
const ROUND_WEATHER_OFFSET: i32 = 22;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Round,
    Rectangular,
}

/// What we know about the physical display
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct DisplayInfo {
    pub shape: Shape,
    pub width: u32,
    pub height: u32,
    /// Can the display show more than black and white?
    #[serde(default)]
    pub color: bool,
}

impl Default for DisplayInfo {
    fn default() -> Self {
        Self {
            shape: Shape::Rectangular,
            width: 144,
            height: 168,
            color: true,
        }
    }
}

impl DisplayInfo {
    pub fn is_small(&self) -> bool {
        self.width < SMALL_SCREEN_WIDTH
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    fn width(&self) -> i32 {
        self.width as i32
    }

    fn height(&self) -> i32 {
        self.height as i32
    }

    /// Top of the rule separating the status band from the rest of the face
    fn line_y(&self) -> i32 {
        if self.is_small() {
            20
        } else {
            25
        }
    }
}

/// Placement of the weather icon and temperature text. `None` means the item
/// is hidden.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WeatherLayout {
    pub icon: Option<Rectangle>,
    pub temperature: Option<Rectangle>,
}

/// Place the weather items. Rectangular displays use a fixed slot in the
/// top-left corner of the status band. Round displays don't have corners,
/// so the items are centered on a row near the bottom, as a pair when the
/// temperature is shown.
pub fn weather_layout(
    display: &DisplayInfo,
    enabled: bool,
    show_temp: bool,
) -> WeatherLayout {
    if !enabled {
        return WeatherLayout {
            icon: None,
            temperature: None,
        };
    }

    let icon_size = Size::new_equal(ICON_SIZE);
    match display.shape {
        Shape::Rectangular => {
            let line_y = display.line_y();
            let icon = Rectangle::new(
                Point::new(4, (line_y - ICON_SIZE as i32) / 2),
                icon_size,
            );
            let temperature = Rectangle::new(
                Point::new(
                    4 + (ICON_SIZE + WEATHER_GAP) as i32,
                    (line_y - TEMPERATURE_SIZE.height as i32) / 2,
                ),
                TEMPERATURE_SIZE,
            );
            WeatherLayout {
                icon: Some(icon),
                temperature: show_temp.then_some(temperature),
            }
        }
        Shape::Round => {
            let row_y = display.height() - ROUND_WEATHER_OFFSET;
            let icon_y =
                row_y + (TEMPERATURE_SIZE.height - ICON_SIZE) as i32 / 2;
            if show_temp {
                let pair_width =
                    ICON_SIZE + WEATHER_GAP + TEMPERATURE_SIZE.width;
                let x = (display.width() - pair_width as i32) / 2;
                WeatherLayout {
                    icon: Some(Rectangle::new(Point::new(x, icon_y), icon_size)),
                    temperature: Some(Rectangle::new(
                        Point::new(
                            x + (ICON_SIZE + WEATHER_GAP) as i32,
                            row_y,
                        ),
                        TEMPERATURE_SIZE,
                    )),
                }
            } else {
                let x = (display.width() - ICON_SIZE as i32) / 2;
                WeatherLayout {
                    icon: Some(Rectangle::new(Point::new(x, icon_y), icon_size)),
                    temperature: None,
                }
            }
        }
    }
}

/// Where everything on the face goes
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FaceLayout {
    pub shape: Shape,
    pub bounds: Rectangle,
    pub date: Rectangle,
    pub time: Rectangle,
    /// Large time font?
    pub large_time: bool,
    /// Full-width rule under the status band. Rectangular only
    pub rule: Option<Rectangle>,
    /// Short accent in the top-left corner. Gives way to the weather icon
    pub corner_rule: Option<Rectangle>,
    pub battery: Rectangle,
    pub matrix: Rectangle,
    /// Size of one matrix cell
    pub pitch: u32,
    pub weather: WeatherLayout,
    /// Everything a weather item can cover. Cleared before weather repaints
    pub weather_band: Rectangle,
}

impl FaceLayout {
    pub fn new(
        display: &DisplayInfo,
        matrix: MatrixVariant,
        weather: WeatherLayout,
    ) -> Self {
        let (width, height) = (display.width(), display.height());
        let small = display.is_small();
        let round = display.shape == Shape::Round;
        let line_y = display.line_y();

        let date_y = if round {
            height / 10 - DATE_HEIGHT as i32 / 2
        } else if small {
            height - DATE_HEIGHT as i32 - 2
        } else {
            height * 9 / 10 - DATE_HEIGHT as i32 / 2
        };
        let date = Rectangle::new(
            Point::new(2, date_y),
            Size::new(display.width - 4, DATE_HEIGHT),
        );

        let time_height = if small { 44 } else { 52 };
        let time = Rectangle::new(
            Point::new(0, height * 3 / 4 - time_height / 2),
            Size::new(display.width, time_height as u32),
        );

        // The status band doesn't fit on a round display, so the battery
        // sits under the date instead
        let battery_origin = if round {
            Point::new(
                (width - BATTERY_SIZE.width as i32) / 2,
                date_y + DATE_HEIGHT as i32 + 1,
            )
        } else {
            let margin = (line_y - BATTERY_SIZE.height as i32) / 2;
            Point::new(width - BATTERY_SIZE.width as i32 - margin, margin)
        };
        let battery = Rectangle::new(battery_origin, BATTERY_SIZE);

        let pitch = pixel_pitch(display.width);
        let matrix_size = Size::new(
            matrix.columns() as u32 * pitch,
            matrix.rows() as u32 * pitch,
        );
        let matrix = Rectangle::new(
            Point::new(
                (width - matrix_size.width as i32) / 2,
                height * 2 / 5 - matrix_size.height as i32 / 2,
            ),
            matrix_size,
        );

        let (rule, corner_rule, weather_band) = if round {
            let band = Rectangle::new(
                Point::new(0, height - ROUND_WEATHER_OFFSET),
                Size::new(display.width, TEMPERATURE_SIZE.height),
            );
            (None, None, band)
        } else {
            let rule = Rectangle::new(
                Point::new(0, line_y),
                Size::new(display.width, RULE_HEIGHT),
            );
            let corner_rule = Rectangle::new(
                Point::new(4, line_y / 2),
                CORNER_RULE_SIZE,
            );
            let band = Rectangle::new(
                Point::zero(),
                Size::new(battery.top_left.x as u32, line_y as u32),
            );
            (Some(rule), weather.icon.is_none().then_some(corner_rule), band)
        };

        Self {
            shape: display.shape,
            bounds: Rectangle::new(Point::zero(), display.size()),
            date,
            time,
            large_time: !small,
            rule,
            corner_rule,
            battery,
            matrix,
            pitch,
            weather,
            weather_band,
        }
    }
}
