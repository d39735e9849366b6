use crate::{
    config::Config,
    layout::DisplayInfo,
    render::{self, Face, Framebuffer},
    sync::Dirty,
};
use log::debug;

/// Mock display, to allow compiling/running on non-Pi machines. Draws into
/// memory so the whole render path still runs.
pub struct Display {
    info: DisplayInfo,
    framebuffer: Framebuffer,
}

impl Display {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            info: config.display,
            framebuffer: Framebuffer::new(config.display.size()),
        })
    }

    pub fn info(&self) -> DisplayInfo {
        self.info
    }

    pub fn draw(&mut self, face: &Face, dirty: Dirty) -> anyhow::Result<()> {
        render::draw(&mut self.framebuffer, face, dirty)?;
        debug!(
            "Drew {dirty:?} at {} on {}, weather {} {}",
            face.clock.format("%H:%M"),
            face.derived.palette.background,
            face.derived.icon.name(),
            face.derived.temperature_text
        );
        Ok(())
    }
}
