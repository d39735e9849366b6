use crate::message::{OutboundMessage, Outbox};
use anyhow::bail;
use embedded_graphics::pixelcolor::Rgb888;
use log::trace;
use std::fmt::Display;

/// 24-bit Red-Green-Blue color. Displays as HTML format (#rrggbb). Drawing
/// targets convert from this into whatever they support.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0x00, 0x00, 0x00);
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);
    pub const PASTEL_YELLOW: Self = Self::rgb(0xff, 0xff, 0xaa);
    pub const LIGHT_GRAY: Self = Self::rgb(0xaa, 0xaa, 0xaa);
    pub const DARK_GRAY: Self = Self::rgb(0x55, 0x55, 0x55);
    pub const CELESTE: Self = Self::rgb(0xaa, 0xff, 0xff);
    pub const RED: Self = Self::rgb(0xff, 0x00, 0x00);
    pub const CHROME_YELLOW: Self = Self::rgb(0xff, 0xaa, 0x00);
    pub const GREEN: Self = Self::rgb(0x00, 0xaa, 0x00);
    pub const BLUE_MOON: Self = Self::rgb(0x00, 0x55, 0xff);

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Perceived brightness, 0-255. Used to collapse colors onto
    /// black/white panels
    pub fn luma(self) -> u8 {
        let luma = 299 * self.red as u32
            + 587 * self.green as u32
            + 114 * self.blue as u32;
        (luma / 1000) as u8
    }

    pub fn is_dark(self) -> bool {
        self.luma() < 128
    }
}

impl From<Color> for Rgb888 {
    fn from(color: Color) -> Self {
        Rgb888::new(color.red, color.green, color.blue)
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:0>2x}{:0>2x}{:0>2x}", self.red, self.green, self.blue)
    }
}

/// An implementation of [Outbox] that doesn't actually talk to a phone. It
/// just remembers what was sent. Set `busy` to make every send fail.
#[derive(Clone, Debug, Default)]
pub struct MockOutbox {
    pub sent: Vec<OutboundMessage>,
    pub busy: bool,
}

#[cfg(test)]
impl MockOutbox {
    /// Number of weather requests sent so far
    pub fn weather_requests(&self) -> usize {
        self.sent
            .iter()
            .filter(|message| {
                matches!(message, OutboundMessage::WeatherRequest { .. })
            })
            .count()
    }

    /// Number of settings snapshots sent so far
    pub fn settings_pushes(&self) -> usize {
        self.sent.len() - self.weather_requests()
    }
}

impl Outbox for MockOutbox {
    fn send(&mut self, message: &OutboundMessage) -> anyhow::Result<()> {
        if self.busy {
            bail!("Mock outbox is busy");
        }
        trace!("Mock outbox received {message:?}");
        self.sent.push(*message);
        Ok(())
    }
}
