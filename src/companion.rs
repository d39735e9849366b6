//! Stand-in for the phone side of the protocol. Settings pushes are just
//! logged. Weather requests are answered by fetching current conditions
//! over HTTP, and the answer comes back through the event queue like any
//! other inbound message.

use crate::{
    message::{InboundMessage, OutboundMessage, Outbox, TupleValue},
    state::WeatherUnit,
    sync::Event,
};
use anyhow::{anyhow, bail, Context};
use log::{error, info};
use serde::Deserialize;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
        Arc,
    },
    thread,
};

/// Where to get weather for
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CompanionConfig {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug)]
pub struct Companion {
    config: CompanionConfig,
    events: Sender<Event>,
    /// Set while a fetch is running. Only one at a time
    in_flight: Arc<AtomicBool>,
}

impl Companion {
    const API_HOST: &'static str = "https://api.open-meteo.com";

    pub fn new(config: CompanionConfig, events: Sender<Event>) -> Self {
        Self {
            config,
            events,
            in_flight: Default::default(),
        }
    }

    /// https://open-meteo.com/en/docs
    fn url(&self, unit: WeatherUnit) -> String {
        let unit = match unit {
            WeatherUnit::Celsius => "celsius",
            WeatherUnit::Fahrenheit => "fahrenheit",
        };
        format!(
            "{}/v1/forecast?latitude={}&longitude={}\
            &current=temperature_2m,weather_code&temperature_unit={unit}",
            Self::API_HOST,
            self.config.latitude,
            self.config.longitude,
        )
    }

    /// Spawn a thread to fetch current conditions in the background
    fn fetch(&self, unit: WeatherUnit) -> anyhow::Result<()> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            bail!("Weather fetch already in progress");
        }

        let request = ureq::get(&self.url(unit));
        let events = self.events.clone();
        let in_flight = Arc::clone(&self.in_flight);
        thread::spawn(move || {
            // Shitty try block
            let result: anyhow::Result<()> = (|| {
                info!("Fetching current weather");
                let response = request.call().with_context(|| {
                    format!("Error fetching weather from {}", Self::API_HOST)
                })?;
                let weather: CurrentWeather = response
                    .into_json()
                    .context("Error parsing weather as JSON")?;
                info!("Fetched weather {:?}", weather.current);
                // Stringify the error to dump the payload
                events
                    .send(Event::Inbound(weather.current.into()))
                    .map_err(|err| anyhow!("{err}"))?;
                Ok(())
            })();

            if let Err(err) = result {
                error!("Error fetching weather: {err:?}")
            }
            in_flight.store(false, Ordering::SeqCst);
        });
        Ok(())
    }
}

impl Outbox for Companion {
    fn send(&mut self, message: &OutboundMessage) -> anyhow::Result<()> {
        match message {
            OutboundMessage::Settings(snapshot) => {
                info!(
                    "Companion received settings {}",
                    serde_json::to_string(snapshot)?
                );
                Ok(())
            }
            OutboundMessage::WeatherRequest { weather_unit } => {
                self.fetch(WeatherUnit::from_code(*weather_unit))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: f64,
    weather_code: u64,
}

/// Same shape the phone would send: whole degrees and a WMO code
impl From<CurrentConditions> for InboundMessage {
    fn from(conditions: CurrentConditions) -> Self {
        Self {
            temperature: Some(TupleValue::Int(
                conditions.temperature_2m.round() as i64,
            )),
            condition_code: Some(TupleValue::Uint(conditions.weather_code)),
            ..Default::default()
        }
    }
}
