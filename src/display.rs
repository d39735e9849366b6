use crate::{
    config::Config,
    layout::{DisplayInfo, Shape},
    render::{self, Face},
    sync::Dirty,
    util::Color,
};
use anyhow::{anyhow, Context};
use display_interface::DisplayError;
use display_interface_spi::SPIInterface;
use linux_embedded_hal::{
    spidev::{SpiModeFlags, SpidevOptions},
    sysfs_gpio::Direction,
    Delay, SpidevDevice, SysfsPin,
};
use log::{error, info, trace};
use weact_studio_epd::{
    graphics::Display290BlackWhite, WeActStudio290BlackWhiteDriver,
};

const PIN_BUSY: u64 = 17; // GPIO/BCM 17, pin 11
const PIN_DC: u64 = 22; // GPIO/BCM 22, pin 15
const PIN_RESET: u64 = 27; // GPIO/BCM 27, pin 13

/// Native panel geometry, portrait
const WIDTH: u32 = 128;
const HEIGHT: u32 = 296;

type Driver = WeActStudio290BlackWhiteDriver<
    SPIInterface<SpidevDevice, SysfsPin>,
    SysfsPin,
    SysfsPin,
    Delay,
>;

/// WeAct 2.9" black/white e-ink panel over SPI
pub struct Display {
    driver: Driver,
    buffer: Display290BlackWhite,
}

impl Display {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut spi =
            SpidevDevice::open(&config.display_port).context("SPI device")?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(4_000_000)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options).context("SPI configuration")?;

        let reset = init_pin(PIN_RESET, Direction::Out)
            .context("Initializing pin Reset")?;
        let dc =
            init_pin(PIN_DC, Direction::Out).context("Initializing pin D/C")?;
        let busy = init_pin(PIN_BUSY, Direction::In)
            .context("Initializing pin Busy")?;

        let interface = SPIInterface::new(spi, dc);
        let mut driver =
            WeActStudio290BlackWhiteDriver::new(interface, busy, reset, Delay);
        driver.init().map_err(map_error)?;
        info!("Display controller initialized");

        Ok(Self {
            driver,
            buffer: Display290BlackWhite::new(),
        })
    }

    pub fn info(&self) -> DisplayInfo {
        DisplayInfo {
            shape: Shape::Rectangular,
            width: WIDTH,
            height: HEIGHT,
            color: false,
        }
    }

    /// Draw the dirty regions into the frame buffer, then push it to the
    /// panel. A full repaint gets a full refresh to clear ghosting.
    pub fn draw(&mut self, face: &Face, dirty: Dirty) -> anyhow::Result<()> {
        render::draw(&mut self.buffer, face, dirty)?;
        if dirty == Dirty::ALL {
            trace!("Full display refresh");
            self.driver.full_update(&self.buffer).map_err(map_error)?;
        } else {
            trace!("Fast display refresh");
            self.driver.fast_update(&self.buffer).map_err(map_error)?;
        }
        Ok(())
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        info!("Putting display to sleep");
        if let Err(err) = self.driver.sleep().map_err(map_error) {
            error!("Error putting display to sleep: {err:?}");
        }
    }
}

/// The panel only knows black and white
impl From<Color> for weact_studio_epd::Color {
    fn from(color: Color) -> Self {
        if color.is_dark() {
            weact_studio_epd::Color::Black
        } else {
            weact_studio_epd::Color::White
        }
    }
}

/// Initialize a GPIO pin
fn init_pin(pin_num: u64, direction: Direction) -> anyhow::Result<SysfsPin> {
    let pin = SysfsPin::new(pin_num);
    pin.export().context("Error exporting pin")?;
    while !pin.is_exported() {}
    pin.set_direction(direction)
        .context("Error setting pin direction")?;
    if matches!(direction, Direction::Out) {
        pin.set_value(1).context("Error enabling pin")?;
    }
    Ok(pin)
}

/// The error type from the driver doesn't implement Error so we have to map
/// manually
fn map_error(error: DisplayError) -> anyhow::Error {
    anyhow!("{error:?}")
}
