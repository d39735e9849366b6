//! Persisted user settings and the last known weather sample. Everything
//! goes through a [KeyValueStore], which maps integer keys to small values.

use anyhow::{bail, Context};
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const KEY_THEME: u32 = 1;
const KEY_WEATHER_ENABLED: u32 = 2;
const KEY_WEATHER_SHOW_TEMP: u32 = 3;
const KEY_WEATHER_UNIT: u32 = 4;
const KEY_TEMPERATURE: u32 = 5;
const KEY_CONDITION_CODE: u32 = 6;

/// Stored in place of a condition code when we don't have one
pub const UNKNOWN_CONDITION_CODE: u8 = 255;

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Color,
}

impl Theme {
    /// Wire/storage representation
    pub fn index(self) -> i32 {
        match self {
            Self::Light => 0,
            Self::Dark => 1,
            Self::Color => 2,
        }
    }
}

impl TryFrom<i32> for Theme {
    type Error = anyhow::Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Light),
            1 => Ok(Self::Dark),
            2 => Ok(Self::Color),
            _ => bail!("Invalid theme index {value}"),
        }
    }
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WeatherUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl WeatherUnit {
    pub fn code(self) -> u8 {
        match self {
            Self::Celsius => 0,
            Self::Fahrenheit => 1,
        }
    }

    /// Anything non-zero is Fahrenheit
    pub fn from_code(code: u8) -> Self {
        if code == 0 {
            Self::Celsius
        } else {
            Self::Fahrenheit
        }
    }
}

/// User-facing settings, shared with the companion
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    pub theme: Theme,
    pub weather_enabled: bool,
    pub weather_show_temp: bool,
    pub weather_unit: WeatherUnit,
}

impl Settings {
    /// First-run settings. The theme default is configurable because
    /// different builds of the face ship with different ones.
    pub fn defaults(theme: Theme) -> Self {
        Self {
            theme,
            weather_enabled: true,
            weather_show_temp: true,
            weather_unit: WeatherUnit::Celsius,
        }
    }
}

/// Latest weather data received from the companion. `fetched_at` is never
/// persisted; `None` means the next request bypasses the throttle.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct WeatherSample {
    pub temperature: Option<i16>,
    pub condition_code: Option<u8>,
    pub fetched_at: Option<DateTime<Local>>,
}

/// A single persisted value
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Bool(bool),
    Int(i32),
}

impl StoredValue {
    fn as_int(self) -> i32 {
        match self {
            Self::Bool(value) => value.into(),
            Self::Int(value) => value,
        }
    }

    fn as_bool(self) -> bool {
        match self {
            Self::Bool(value) => value,
            Self::Int(value) => value != 0,
        }
    }
}

/// Integer-keyed persistent storage provided by the host. Writes are
/// assumed to always succeed; implementations log their own failures.
pub trait KeyValueStore {
    fn get(&self, key: u32) -> Option<StoredValue>;

    fn set(&mut self, key: u32, value: StoredValue);
}

/// In-memory store, for tests and for hosts without a filesystem
impl KeyValueStore for IndexMap<u32, StoredValue> {
    fn get(&self, key: u32) -> Option<StoredValue> {
        IndexMap::get(self, &key).copied()
    }

    fn set(&mut self, key: u32, value: StoredValue) {
        self.insert(key, value);
    }
}

/// Store backed by a JSON file. The whole file is rewritten on every set
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: IndexMap<u32, StoredValue>,
}

impl FileStore {
    /// Load the store from disk. A missing or corrupt file yields an empty
    /// store, so every setting falls back to its default
    pub fn open(path: &Path) -> Self {
        if !path.exists() {
            info!("No settings at {}, using defaults", path.display());
            return Self {
                path: path.to_owned(),
                values: IndexMap::new(),
            };
        }

        // Shitty try block
        let helper = || {
            let contents = fs::read(path)?;
            Ok::<IndexMap<u32, StoredValue>, anyhow::Error>(
                serde_json::from_slice(&contents)?,
            )
        };
        let values = match helper() {
            Ok(values) => values,
            Err(err) => {
                error!("Error loading settings from {}: {}", path.display(), err);
                IndexMap::new()
            }
        };
        Self {
            path: path.to_owned(),
            values,
        }
    }

    fn flush(&self) -> anyhow::Result<()> {
        let serialized = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, serialized).with_context(|| {
            format!("Error saving settings to {}", self.path.display())
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: u32) -> Option<StoredValue> {
        self.values.get(&key).copied()
    }

    fn set(&mut self, key: u32, value: StoredValue) {
        self.values.insert(key, value);
        if let Err(err) = self.flush() {
            error!("{err:?}");
        }
    }
}

/// Typed access to the settings and weather keys of a [KeyValueStore]
#[derive(Debug)]
pub struct SettingsStore<S> {
    store: S,
    default_theme: Theme,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(store: S, default_theme: Theme) -> Self {
        Self {
            store,
            default_theme,
        }
    }

    /// Read each setting independently, defaulting whatever is missing
    pub fn load(&self) -> Settings {
        let defaults = Settings::defaults(self.default_theme);
        let theme = match self.store.get(KEY_THEME) {
            None => defaults.theme,
            Some(value) => Theme::try_from(value.as_int()).unwrap_or_else(|err| {
                warn!("Ignoring stored theme: {err}");
                defaults.theme
            }),
        };
        Settings {
            theme,
            weather_enabled: self
                .store
                .get(KEY_WEATHER_ENABLED)
                .map_or(defaults.weather_enabled, StoredValue::as_bool),
            weather_show_temp: self
                .store
                .get(KEY_WEATHER_SHOW_TEMP)
                .map_or(defaults.weather_show_temp, StoredValue::as_bool),
            weather_unit: self
                .store
                .get(KEY_WEATHER_UNIT)
                .map_or(defaults.weather_unit, |value| {
                    WeatherUnit::from_code(u8::from(value.as_int() != 0))
                }),
        }
    }

    /// Read the last known weather. The fetch time is not persisted, so a
    /// fresh process always asks for new data.
    pub fn load_weather(&self) -> WeatherSample {
        WeatherSample {
            temperature: self
                .store
                .get(KEY_TEMPERATURE)
                .map(|value| value.as_int() as i16),
            condition_code: self
                .store
                .get(KEY_CONDITION_CODE)
                .map(|value| value.as_int() as u8)
                .filter(|&code| code != UNKNOWN_CONDITION_CODE),
            fetched_at: None,
        }
    }

    pub fn save_theme(&mut self, theme: Theme) {
        info!("Saving theme {theme:?}");
        self.store.set(KEY_THEME, StoredValue::Int(theme.index()));
    }

    pub fn save_weather_enabled(&mut self, enabled: bool) {
        info!("Saving weather enabled={enabled}");
        self.store
            .set(KEY_WEATHER_ENABLED, StoredValue::Bool(enabled));
    }

    pub fn save_weather_show_temp(&mut self, show_temp: bool) {
        info!("Saving weather show temperature={show_temp}");
        self.store
            .set(KEY_WEATHER_SHOW_TEMP, StoredValue::Bool(show_temp));
    }

    pub fn save_weather_unit(&mut self, unit: WeatherUnit) {
        info!("Saving weather unit {unit:?}");
        self.store
            .set(KEY_WEATHER_UNIT, StoredValue::Int(unit.code().into()));
    }

    pub fn save_temperature(&mut self, temperature: i16) {
        self.store
            .set(KEY_TEMPERATURE, StoredValue::Int(temperature.into()));
    }

    pub fn save_condition_code(&mut self, code: Option<u8>) {
        let code = code.unwrap_or(UNKNOWN_CONDITION_CODE);
        self.store.set(KEY_CONDITION_CODE, StoredValue::Int(code.into()));
    }

    #[cfg(test)]
    pub fn into_inner(self) -> S {
        self.store
    }
}
