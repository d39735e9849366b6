//! Draw the face onto any [DrawTarget]. Only the regions flagged dirty are
//! touched; each one is cleared to the background and redrawn.

use crate::{
    layout::{FaceLayout, Shape},
    sync::{BatteryState, Dirty, DisplayDerived},
    util::Color,
};
use anyhow::anyhow;
use chrono::{DateTime, Local};
use embedded_graphics::{
    geometry::{OriginDimensions, Point, Size},
    pixelcolor::Rgb888,
    primitives::Rectangle,
    prelude::*,
    Pixel,
};
use log::trace;
use std::{convert::Infallible, fmt::Debug};
use u8g2_fonts::{
    fonts,
    types::{FontColor, HorizontalAlignment, VerticalPosition},
    FontRenderer,
};

const DATE_FONT: FontRenderer =
    FontRenderer::new::<fonts::u8g2_font_helvB12_tf>()
        .with_ignore_unknown_chars(true);
const TIME_FONT: FontRenderer =
    FontRenderer::new::<fonts::u8g2_font_logisoso38_tn>();
const TIME_FONT_LARGE: FontRenderer =
    FontRenderer::new::<fonts::u8g2_font_logisoso46_tn>();
const TEMPERATURE_FONT: FontRenderer =
    FontRenderer::new::<fonts::u8g2_font_helvB10_tf>()
        .with_ignore_unknown_chars(true);

const BATTERY_NUB_SIZE: Size = Size::new(3, 4);
const BATTERY_SEGMENTS: u32 = 4;
const BATTERY_SEGMENT_GAP: u32 = 1;

/// Everything needed to draw one frame
#[derive(Copy, Clone, Debug)]
pub struct Face<'a> {
    pub derived: &'a DisplayDerived,
    pub clock: DateTime<Local>,
    pub battery: BatteryState,
}

impl<'a> Face<'a> {
    fn layout(&self) -> &'a FaceLayout {
        &self.derived.layout
    }

    fn background(&self) -> Color {
        self.derived.palette.background
    }

    fn foreground(&self) -> Color {
        self.derived.palette.foreground
    }

    fn date_text(&self) -> String {
        // https://docs.rs/chrono/latest/chrono/format/strftime/index.html
        let format = match self.layout().shape {
            Shape::Round => "%b %d",
            Shape::Rectangular => "%b %d %a",
        };
        self.clock.format(format).to_string().to_uppercase()
    }

    fn time_text(&self) -> String {
        self.clock.format("%H:%M").to_string()
    }
}

/// Repaint the dirty regions of the face
pub fn draw<D>(target: &mut D, face: &Face, dirty: Dirty) -> anyhow::Result<()>
where
    D: DrawTarget,
    D::Color: From<Color>,
    D::Error: Debug,
{
    trace!("Drawing {dirty:?}");
    let layout = face.layout();
    let full = dirty == Dirty::ALL;
    if full {
        fill(target, &layout.bounds, face.background())?;
    }

    if dirty.matrix {
        if !full {
            fill(target, &layout.matrix, face.background())?;
        }
        draw_matrix(target, face)?;
    }

    // Clearing the weather band wipes the corner rule and both weather
    // items, so they all come back together
    if dirty.rules {
        if !full {
            fill(target, &layout.weather_band, face.background())?;
        }
        for rule in [layout.rule, layout.corner_rule].into_iter().flatten() {
            fill(target, &rule, face.foreground())?;
        }
    }

    if dirty.clock {
        if !full {
            fill(target, &layout.date, face.background())?;
            fill(target, &layout.time, face.background())?;
        }
        let time_font = if layout.large_time {
            &TIME_FONT_LARGE
        } else {
            &TIME_FONT
        };
        draw_text(target, &DATE_FONT, &face.date_text(), &layout.date, face)?;
        draw_text(target, time_font, &face.time_text(), &layout.time, face)?;
    }

    if dirty.battery {
        if !full {
            fill(target, &layout.battery, face.background())?;
        }
        draw_battery(target, face)?;
    }

    if let Some(icon) = layout.weather.icon {
        if dirty.weather_icon || dirty.rules {
            if !full && !dirty.rules {
                fill(target, &icon, face.background())?;
            }
            draw_icon(target, face, icon.top_left)?;
        }
    }

    if let Some(temperature) = layout.weather.temperature {
        if dirty.weather_text || dirty.rules {
            if !full && !dirty.rules {
                fill(target, &temperature, face.background())?;
            }
            draw_text(
                target,
                &TEMPERATURE_FONT,
                &face.derived.temperature_text,
                &temperature,
                face,
            )?;
        }
    }

    Ok(())
}

fn fill<D>(target: &mut D, area: &Rectangle, color: Color) -> anyhow::Result<()>
where
    D: DrawTarget,
    D::Color: From<Color>,
    D::Error: Debug,
{
    target.fill_solid(area, color.into()).map_err(map_error)
}

/// Draw text centered in a box
fn draw_text<D>(
    target: &mut D,
    font: &FontRenderer,
    text: &str,
    area: &Rectangle,
    face: &Face,
) -> anyhow::Result<()>
where
    D: DrawTarget,
    D::Color: From<Color>,
    D::Error: Debug,
{
    font.render_aligned(
        text,
        area.center(),
        VerticalPosition::Center,
        HorizontalAlignment::Center,
        FontColor::Transparent(face.foreground().into()),
        target,
    )
    .map_err(|err| anyhow!("Error drawing text {text:?}: {err:?}"))?;
    Ok(())
}

fn draw_matrix<D>(target: &mut D, face: &Face) -> anyhow::Result<()>
where
    D: DrawTarget,
    D::Color: From<Color>,
    D::Error: Debug,
{
    let layout = face.layout();
    let pitch = layout.pitch;
    let origin = layout.matrix.top_left;
    for (column, row, color) in face.derived.matrix.cells(face.derived.palette)
    {
        let cell = Rectangle::new(
            origin + Point::new(column as i32, row as i32) * pitch as i32,
            Size::new_equal(pitch),
        );
        fill(target, &cell, color)?;
    }
    Ok(())
}

/// Solid body with a nub on the right. Charge shows as background-colored
/// segments cut out of the body, rounded up.
fn draw_battery<D>(target: &mut D, face: &Face) -> anyhow::Result<()>
where
    D: DrawTarget,
    D::Color: From<Color>,
    D::Error: Debug,
{
    let bounds = face.layout().battery;
    let body = Rectangle::new(
        bounds.top_left,
        Size::new(bounds.size.width - BATTERY_NUB_SIZE.width, bounds.size.height),
    );
    let nub = Rectangle::new(
        bounds.top_left
            + Point::new(
                body.size.width as i32,
                (bounds.size.height - BATTERY_NUB_SIZE.height) as i32 / 2,
            ),
        BATTERY_NUB_SIZE,
    );
    fill(target, &body, face.foreground())?;
    fill(target, &nub, face.foreground())?;

    let inner = Size::new(body.size.width - 4, body.size.height - 4);
    let segment_width = (inner.width
        - BATTERY_SEGMENT_GAP * (BATTERY_SEGMENTS - 1))
        / BATTERY_SEGMENTS;
    for segment in 0..filled_segments(face.battery.charge_percent) {
        let x = 2 + segment * (segment_width + BATTERY_SEGMENT_GAP);
        let area = Rectangle::new(
            body.top_left + Point::new(x as i32, 2),
            Size::new(segment_width, inner.height),
        );
        fill(target, &area, face.background())?;
    }
    Ok(())
}

/// Number of lit battery segments, rounded up
fn filled_segments(charge_percent: u8) -> u32 {
    let charge = u32::from(charge_percent.min(100));
    (charge * BATTERY_SEGMENTS).div_ceil(100)
}

fn draw_icon<D>(
    target: &mut D,
    face: &Face,
    origin: Point,
) -> anyhow::Result<()>
where
    D: DrawTarget,
    D::Color: From<Color>,
    D::Error: Debug,
{
    let color: D::Color = face.foreground().into();
    let glyph = face.derived.icon.glyph();
    let pixels = glyph.iter().enumerate().flat_map(|(y, row)| {
        row.iter()
            .enumerate()
            .filter(|(_, cell)| **cell == b'#')
            .map(move |(x, _)| {
                Pixel(origin + Point::new(x as i32, y as i32), color)
            })
    });
    target.draw_iter(pixels).map_err(map_error)
}

/// Driver errors don't all implement Error so we have to map manually
fn map_error(error: impl Debug) -> anyhow::Error {
    anyhow!("{error:?}")
}

/// In-memory drawing target, one RGB value per pixel. Used by the mock
/// display and in tests.
#[derive(Clone, Debug)]
pub struct Framebuffer {
    size: Size,
    pixels: Vec<Rgb888>,
}

impl Framebuffer {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            pixels: vec![Rgb888::BLACK; (size.width * size.height) as usize],
        }
    }

    fn index(&self, point: Point) -> Option<usize> {
        let (x, y) = (u32::try_from(point.x).ok()?, u32::try_from(point.y).ok()?);
        (x < self.size.width && y < self.size.height)
            .then(|| (y * self.size.width + x) as usize)
    }

    /// Color of a single pixel, `None` if it's off screen
    #[cfg(test)]
    pub fn pixel(&self, point: Point) -> Option<Rgb888> {
        self.index(point).map(|index| self.pixels[index])
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for Framebuffer {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        // Anything off screen is silently dropped
        for Pixel(point, color) in pixels {
            if let Some(index) = self.index(point) {
                self.pixels[index] = color;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        layout::DisplayInfo,
        state::{Settings, Theme, WeatherSample},
    };
    use chrono::TimeZone;
    use embedded_graphics::primitives::PointsIter;

    fn derived(settings: Settings, weather: WeatherSample) -> DisplayDerived {
        DisplayDerived::new(&DisplayInfo::default(), &settings, &weather)
    }

    fn dark() -> Settings {
        Settings {
            weather_enabled: false,
            ..Settings::defaults(Theme::Dark)
        }
    }

    fn face(derived: &DisplayDerived, charge_percent: u8) -> Face<'_> {
        Face {
            derived,
            clock: Local.with_ymd_and_hms(2024, 5, 24, 9, 41, 0).unwrap(),
            battery: BatteryState {
                charge_percent,
                charging: false,
            },
        }
    }

    fn framebuffer() -> Framebuffer {
        Framebuffer::new(DisplayInfo::default().size())
    }

    /// Count pixels of one color inside an area
    fn count(framebuffer: &Framebuffer, area: &Rectangle, color: Color) -> usize {
        area.points()
            .filter(|point| framebuffer.pixel(*point) == Some(color.into()))
            .count()
    }

    #[test]
    fn test_filled_segments() {
        assert_eq!(filled_segments(0), 0);
        assert_eq!(filled_segments(1), 1);
        assert_eq!(filled_segments(25), 1);
        assert_eq!(filled_segments(26), 2);
        assert_eq!(filled_segments(99), 4);
        assert_eq!(filled_segments(100), 4);
    }

    #[test]
    fn test_text() {
        let derived = derived(dark(), WeatherSample::default());
        let face = face(&derived, 50);
        assert_eq!(face.time_text(), "09:41");
        assert_eq!(face.date_text(), "MAY 24 FRI");
    }

    #[test]
    fn test_draw_full() {
        let derived = derived(dark(), WeatherSample::default());
        let mut framebuffer = framebuffer();
        draw(&mut framebuffer, &face(&derived, 100), Dirty::ALL).unwrap();
        let pixel = |x, y| framebuffer.pixel(Point::new(x, y)).unwrap();

        // Background
        assert_eq!(pixel(1, 30), Rgb888::BLACK);
        // Rule and corner accent
        assert_eq!(pixel(70, 20), Rgb888::WHITE);
        assert_eq!(pixel(5, 10), Rgb888::WHITE);
        // First cell of the matrix, at (5, 0)
        assert_eq!(pixel(51, 35), Rgb888::WHITE);
        assert_eq!(pixel(41, 35), Rgb888::BLACK);
        // Battery body, then a charged segment
        assert_eq!(pixel(113, 5), Rgb888::WHITE);
        assert_eq!(pixel(115, 7), Rgb888::BLACK);
        assert_eq!(pixel(130, 7), Rgb888::BLACK);
        // Nub
        assert_eq!(pixel(137, 9), Rgb888::WHITE);

        let layout = &derived.layout;
        assert!(count(&framebuffer, &layout.time, Color::WHITE) > 0);
        assert!(count(&framebuffer, &layout.date, Color::WHITE) > 0);
    }

    #[test]
    fn test_draw_battery_only() {
        let derived = derived(dark(), WeatherSample::default());
        let mut framebuffer = framebuffer();
        framebuffer
            .fill_solid(&derived.layout.bounds, Color::RED.into())
            .unwrap();

        draw(
            &mut framebuffer,
            &face(&derived, 1),
            Dirty {
                battery: true,
                ..Dirty::NONE
            },
        )
        .unwrap();
        let pixel = |x, y| framebuffer.pixel(Point::new(x, y)).unwrap();
        // Untouched
        assert_eq!(pixel(1, 30), Color::RED.into());
        assert_eq!(pixel(70, 20), Color::RED.into());
        // One segment lit, the second one still solid body
        assert_eq!(pixel(115, 7), Rgb888::BLACK);
        assert_eq!(pixel(120, 7), Rgb888::WHITE);
    }

    #[test]
    fn test_draw_weather() {
        let settings = Settings::defaults(Theme::Light);
        let weather = WeatherSample {
            temperature: Some(21),
            condition_code: Some(0),
            fetched_at: None,
        };
        let derived = derived(settings, weather);
        let mut framebuffer = framebuffer();
        draw(&mut framebuffer, &face(&derived, 50), Dirty::ALL).unwrap();

        let layout = &derived.layout;
        assert_eq!(layout.corner_rule, None);
        let icon = layout.weather.icon.unwrap();
        // Top ray of the sun
        assert_eq!(framebuffer.pixel(Point::new(9, 4)), Some(Rgb888::BLACK));
        assert_eq!(count(&framebuffer, &icon, Color::BLACK), 34);
        let temperature = layout.weather.temperature.unwrap();
        assert!(count(&framebuffer, &temperature, Color::BLACK) > 0);

        // Hide the temperature and repaint just the weather
        let hidden = DisplayDerived::new(
            &DisplayInfo::default(),
            &Settings {
                weather_show_temp: false,
                ..settings
            },
            &weather,
        );
        draw(
            &mut framebuffer,
            &face(&hidden, 50),
            Dirty {
                rules: true,
                weather_icon: true,
                weather_text: true,
                ..Dirty::NONE
            },
        )
        .unwrap();
        assert_eq!(count(&framebuffer, &temperature, Color::BLACK), 0);
        assert_eq!(count(&framebuffer, &icon, Color::BLACK), 34);
    }

    #[test]
    fn test_framebuffer_bounds() {
        let mut framebuffer = Framebuffer::new(Size::new(4, 4));
        framebuffer
            .draw_iter([
                Pixel(Point::new(-1, 0), Rgb888::RED),
                Pixel(Point::new(4, 0), Rgb888::RED),
                Pixel(Point::new(3, 3), Rgb888::RED),
            ])
            .unwrap();
        assert_eq!(framebuffer.pixel(Point::new(3, 3)), Some(Rgb888::RED));
        assert_eq!(framebuffer.pixel(Point::new(4, 0)), None);
        assert_eq!(framebuffer.pixel(Point::new(0, 0)), Some(Rgb888::BLACK));
    }
}
