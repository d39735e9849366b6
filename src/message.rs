//! Messages exchanged with the companion phone process. Inbound fields are
//! loosely typed, since the sender may encode any of them as a string or an
//! integer. Each field gets its own decoder; anything a decoder doesn't
//! recognize comes back as `None` and the caller keeps its previous value.

use crate::state::{Settings, Theme, WeatherUnit, UNKNOWN_CONDITION_CODE};
use serde::{Deserialize, Serialize};

/// One field of an inbound message, in whatever encoding the sender chose.
/// Every JSON value decodes into some variant, so one bad field never takes
/// down the rest of its message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TupleValue {
    Str(String),
    Int(i64),
    Uint(u64),
    /// Never meaningful for any field we know about
    Bytes(Vec<u8>),
    /// Booleans, floats, objects, anything else. Never decodes
    Other(serde_json::Value),
}

impl TupleValue {
    /// Integer value, wrapped into 64 bits. Callers narrow further
    fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Uint(value) => Some(*value as i64),
            Self::Str(_) | Self::Bytes(_) | Self::Other(_) => None,
        }
    }

    /// Theme index, which must be in range. Strings are parsed as decimal.
    pub fn decode_theme(&self) -> Option<Theme> {
        let index = match self {
            Self::Str(value) => value.trim().parse::<i64>().ok()?,
            other => other.as_integer()?,
        };
        i32::try_from(index)
            .ok()
            .and_then(|index| Theme::try_from(index).ok())
    }

    /// Boolean flag. Strings must start with `1`/`t`/`T` (true) or
    /// `0`/`f`/`F` (false); integers are true when non-zero.
    pub fn decode_flag(&self) -> Option<bool> {
        match self {
            Self::Str(value) => match value.chars().next()? {
                '1' | 't' | 'T' => Some(true),
                '0' | 'f' | 'F' => Some(false),
                _ => None,
            },
            other => other.as_integer().map(|value| value != 0),
        }
    }

    /// Temperature unit. A string starting with `F` means Fahrenheit and any
    /// other string means Celsius; integers are coerced to 0/1.
    pub fn decode_unit(&self) -> Option<WeatherUnit> {
        match self {
            Self::Str(value) if value.starts_with(['F', 'f']) => {
                Some(WeatherUnit::Fahrenheit)
            }
            Self::Str(_) => Some(WeatherUnit::Celsius),
            other => other
                .as_integer()
                .map(|value| WeatherUnit::from_code(u8::from(value != 0))),
        }
    }

    /// Temperature, narrowed to 16 bits the way the device stores it
    pub fn decode_temperature(&self) -> Option<i16> {
        self.as_integer().map(|value| value as i16)
    }

    /// Condition code, narrowed to 8 bits. Only 0-99 map to real weather.
    /// The unknown sentinel isn't a code at all
    pub fn decode_condition_code(&self) -> Option<u8> {
        self.as_integer()
            .map(|value| value as u8)
            .filter(|&code| code != UNKNOWN_CONDITION_CODE)
    }
}

/// A message from the companion. Any subset of fields may be present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub theme: Option<TupleValue>,
    pub weather_enabled: Option<TupleValue>,
    pub weather_show_temp: Option<TupleValue>,
    pub weather_unit: Option<TupleValue>,
    pub temperature: Option<TupleValue>,
    pub condition_code: Option<TupleValue>,
}

/// Full settings state, echoed to the companion whenever it changes
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    pub theme: i32,
    pub weather_enabled: u8,
    pub weather_show_temp: u8,
    pub weather_unit: u8,
}

impl From<&Settings> for SettingsSnapshot {
    fn from(settings: &Settings) -> Self {
        Self {
            theme: settings.theme.index(),
            weather_enabled: settings.weather_enabled.into(),
            weather_show_temp: settings.weather_show_temp.into(),
            weather_unit: settings.weather_unit.code(),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    Settings(SettingsSnapshot),
    #[serde(rename_all = "camelCase")]
    WeatherRequest { weather_unit: u8 },
}

/// Fire-and-forget channel to the companion. An error means the message
/// was never queued (e.g. the channel is busy), so the caller can try again
/// on its next opportunity. Responses arrive later as their own events.
pub trait Outbox {
    fn send(&mut self, message: &OutboundMessage) -> anyhow::Result<()>;
}
