//! Settings and weather synchronization with the companion. All host
//! lifecycle events funnel through [SyncController::handle], one at a time.
//! The controller decides what to persist, what to send, and which regions
//! of the face need repainting.

use crate::{
    icon::{category_for, resource_for, IconResource},
    layout::{weather_layout, DisplayInfo, FaceLayout},
    message::{InboundMessage, OutboundMessage, Outbox, SettingsSnapshot},
    state::{KeyValueStore, Settings, SettingsStore, WeatherSample},
    theme::{matrix_variant_for, palette_for, MatrixVariant, Palette},
};
use chrono::{DateTime, Duration, Local};
use log::{debug, info, trace, warn};
use std::ops::{BitOr, BitOrAssign};

/// Minimum time between successful weather fetches
const THROTTLE_WINDOW_SECS: i64 = 30 * 60;
/// Unanswered requests allowed before we stop asking
pub const MAX_RETRIES: u8 = 10;

/// Something that happened on the host
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Face was loaded and is visible. Sent once, first
    Load { connected: bool },
    /// Once a minute
    Tick,
    Battery(BatteryState),
    /// Phone connectivity changed
    Connection(bool),
    Inbound(InboundMessage),
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BatteryState {
    pub charge_percent: u8,
    pub charging: bool,
}

/// Transient request bookkeeping. Never persisted.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SyncState {
    pub connected: bool,
    /// Requests sent since the last answer. Never exceeds [MAX_RETRIES]
    pub retry_count: u8,
}

/// Face regions that need repainting
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Dirty {
    pub clock: bool,
    pub matrix: bool,
    pub battery: bool,
    pub rules: bool,
    pub weather_icon: bool,
    pub weather_text: bool,
}

impl Dirty {
    pub const NONE: Self = Self {
        clock: false,
        matrix: false,
        battery: false,
        rules: false,
        weather_icon: false,
        weather_text: false,
    };
    pub const ALL: Self = Self {
        clock: true,
        matrix: true,
        battery: true,
        rules: true,
        weather_icon: true,
        weather_text: true,
    };
    const CLOCK: Self = Self {
        clock: true,
        ..Self::NONE
    };
    const BATTERY: Self = Self {
        battery: true,
        ..Self::NONE
    };
    const WEATHER_ICON: Self = Self {
        weather_icon: true,
        ..Self::NONE
    };
    const WEATHER_TEXT: Self = Self {
        weather_text: true,
        ..Self::NONE
    };
    /// Visibility changes can move every weather item, and the corner rule
    const WEATHER_LAYOUT: Self = Self {
        rules: true,
        weather_icon: true,
        weather_text: true,
        ..Self::NONE
    };

    pub fn any(&self) -> bool {
        *self != Self::NONE
    }
}

impl BitOr for Dirty {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            clock: self.clock || rhs.clock,
            matrix: self.matrix || rhs.matrix,
            battery: self.battery || rhs.battery,
            rules: self.rules || rhs.rules,
            weather_icon: self.weather_icon || rhs.weather_icon,
            weather_text: self.weather_text || rhs.weather_text,
        }
    }
}

impl BitOrAssign for Dirty {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// Everything the face shows that's derived from settings and weather.
/// Recomputed whenever either changes, never persisted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DisplayDerived {
    pub palette: Palette,
    pub matrix: MatrixVariant,
    pub icon: IconResource,
    pub temperature_text: String,
    pub layout: FaceLayout,
}

impl DisplayDerived {
    pub fn new(
        display: &DisplayInfo,
        settings: &Settings,
        weather: &WeatherSample,
    ) -> Self {
        let matrix = matrix_variant_for(settings.theme, display.color);
        let weather_layout = weather_layout(
            display,
            settings.weather_enabled,
            settings.weather_show_temp,
        );
        // Unknown codes fall into the default category
        let category = category_for(weather.condition_code.unwrap_or(u8::MAX));
        let temperature_text = match weather.temperature {
            Some(temperature) => format!("{temperature}°"),
            None => "--°".to_owned(),
        };
        Self {
            palette: palette_for(settings.theme, display.color),
            matrix,
            icon: resource_for(category, settings.theme),
            temperature_text,
            layout: FaceLayout::new(display, matrix, weather_layout),
        }
    }
}

/// Owns all settings, weather and sync state. Single writer: every event
/// is processed to completion before the next.
#[derive(Debug)]
pub struct SyncController<S> {
    store: SettingsStore<S>,
    display: DisplayInfo,
    settings: Settings,
    weather: WeatherSample,
    sync: SyncState,
    battery: BatteryState,
    clock: DateTime<Local>,
    derived: DisplayDerived,
}

impl<S: KeyValueStore> SyncController<S> {
    pub fn new(
        store: SettingsStore<S>,
        display: DisplayInfo,
        now: DateTime<Local>,
    ) -> Self {
        let settings = store.load();
        let weather = store.load_weather();
        info!("Loaded settings {settings:?}");
        Self {
            derived: DisplayDerived::new(&display, &settings, &weather),
            store,
            display,
            settings,
            weather,
            sync: SyncState::default(),
            battery: BatteryState::default(),
            clock: now,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[cfg(test)]
    pub fn weather(&self) -> &WeatherSample {
        &self.weather
    }

    #[cfg(test)]
    pub fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    pub fn derived(&self) -> &DisplayDerived {
        &self.derived
    }

    pub fn battery(&self) -> BatteryState {
        self.battery
    }

    /// Time shown on the face
    pub fn clock(&self) -> DateTime<Local> {
        self.clock
    }

    #[cfg(test)]
    pub fn into_store(self) -> SettingsStore<S> {
        self.store
    }

    /// Apply one event. Outbound messages go straight to the outbox; the
    /// return value says what to repaint.
    pub fn handle(
        &mut self,
        event: Event,
        now: DateTime<Local>,
        outbox: &mut dyn Outbox,
    ) -> Dirty {
        trace!("Handling event {event:?}");
        match event {
            Event::Load { connected } => {
                self.sync.connected = connected;
                self.clock = now;
                self.send_settings(outbox);
                self.request_weather(now, outbox);
                Dirty::ALL
            }
            Event::Tick => {
                self.clock = now;
                self.request_weather(now, outbox);
                Dirty::CLOCK
            }
            Event::Battery(battery) => {
                debug!(
                    "Battery at {}%, charging: {}",
                    battery.charge_percent, battery.charging
                );
                self.battery = battery;
                Dirty::BATTERY
            }
            Event::Connection(connected) => {
                let regained = connected && !self.sync.connected;
                self.sync.connected = connected;
                if regained {
                    info!("Companion connected, resetting weather throttle");
                    self.reset_throttle();
                    self.request_weather(now, outbox);
                } else if !connected {
                    info!("Companion disconnected");
                }
                Dirty::NONE
            }
            Event::Inbound(message) => self.apply_message(message, now, outbox),
        }
    }

    /// Apply every field of an inbound message, in a fixed order: theme,
    /// enabled, show-temp, unit, temperature, code. Settings are echoed and
    /// the request guard is evaluated at most once, after all fields.
    fn apply_message(
        &mut self,
        message: InboundMessage,
        now: DateTime<Local>,
        outbox: &mut dyn Outbox,
    ) -> Dirty {
        let mut dirty = Dirty::NONE;
        let mut settings_changed = false;
        let mut recheck_weather = false;

        if let Some(value) = &message.theme {
            match value.decode_theme() {
                Some(theme) => {
                    self.settings.theme = theme;
                    self.store.save_theme(theme);
                    settings_changed = true;
                    dirty |= Dirty::ALL;
                }
                None => warn!("Ignoring invalid theme {value:?}"),
            }
        }

        if let Some(value) = &message.weather_enabled {
            match value.decode_flag() {
                Some(enabled) => {
                    self.settings.weather_enabled = enabled;
                    self.store.save_weather_enabled(enabled);
                    settings_changed = true;
                    recheck_weather = true;
                    dirty |= Dirty::WEATHER_LAYOUT;
                }
                None => warn!("Ignoring invalid weather enabled {value:?}"),
            }
        }

        if let Some(value) = &message.weather_show_temp {
            match value.decode_flag() {
                Some(show_temp) => {
                    self.settings.weather_show_temp = show_temp;
                    self.store.save_weather_show_temp(show_temp);
                    settings_changed = true;
                    recheck_weather = true;
                    dirty |= Dirty::WEATHER_LAYOUT;
                }
                None => warn!("Ignoring invalid weather show temp {value:?}"),
            }
        }

        if let Some(value) = &message.weather_unit {
            match value.decode_unit() {
                Some(unit) => {
                    if unit != self.settings.weather_unit {
                        // Current reading is in the wrong unit now
                        info!("Weather unit changed to {unit:?}");
                        self.reset_throttle();
                    }
                    self.settings.weather_unit = unit;
                    self.store.save_weather_unit(unit);
                    settings_changed = true;
                    recheck_weather = true;
                    dirty |= Dirty::WEATHER_TEXT;
                }
                None => warn!("Ignoring invalid weather unit {value:?}"),
            }
        }

        if let Some(value) = &message.temperature {
            match value.decode_temperature() {
                Some(temperature) => {
                    info!("Received temperature {temperature}");
                    self.weather.temperature = Some(temperature);
                    self.store.save_temperature(temperature);
                    self.mark_fetched(now);
                    dirty |= Dirty::WEATHER_TEXT;
                }
                None => warn!("Ignoring invalid temperature {value:?}"),
            }
        }

        if let Some(value) = &message.condition_code {
            match value.decode_condition_code() {
                Some(code) => {
                    info!("Received condition code {code}");
                    self.weather.condition_code = Some(code);
                    self.store.save_condition_code(Some(code));
                    self.mark_fetched(now);
                    dirty |= Dirty::WEATHER_ICON;
                }
                None => warn!("Ignoring invalid condition code {value:?}"),
            }
        }

        if dirty.any() {
            self.derived =
                DisplayDerived::new(&self.display, &self.settings, &self.weather);
        }
        if settings_changed {
            self.send_settings(outbox);
        }
        if recheck_weather {
            self.request_weather(now, outbox);
        }
        dirty
    }

    /// An answer arrived, so the window restarts and the budget refills
    fn mark_fetched(&mut self, now: DateTime<Local>) {
        self.weather.fetched_at = Some(now);
        self.sync.retry_count = 0;
    }

    /// Let the next request bypass the throttle
    fn reset_throttle(&mut self) {
        self.weather.fetched_at = None;
        self.sync.retry_count = 0;
    }

    /// Is a weather request allowed right now?
    fn can_request_weather(&self, now: DateTime<Local>) -> bool {
        if !self.settings.weather_enabled {
            trace!("Weather disabled, not requesting");
            return false;
        }
        if !self.sync.connected {
            trace!("Companion not connected, not requesting weather");
            return false;
        }
        if let Some(fetched_at) = self.weather.fetched_at {
            if now < fetched_at + Duration::seconds(THROTTLE_WINDOW_SECS) {
                trace!("Weather fetched at {fetched_at}, throttled");
                return false;
            }
        }
        if self.sync.retry_count >= MAX_RETRIES {
            debug!(
                "{MAX_RETRIES} weather requests unanswered, suppressing until \
                the companion answers or reconnects"
            );
            return false;
        }
        true
    }

    /// Send a weather request if the guard allows it. A failed send doesn't
    /// use up a retry, so the next trigger tries again.
    fn request_weather(&mut self, now: DateTime<Local>, outbox: &mut dyn Outbox) {
        if !self.can_request_weather(now) {
            return;
        }
        let message = OutboundMessage::WeatherRequest {
            weather_unit: self.settings.weather_unit.code(),
        };
        match outbox.send(&message) {
            Ok(()) => {
                self.sync.retry_count += 1;
                info!(
                    "Requested weather (attempt {}/{MAX_RETRIES})",
                    self.sync.retry_count
                );
            }
            Err(err) => warn!("Error sending weather request: {err:?}"),
        }
    }

    fn send_settings(&mut self, outbox: &mut dyn Outbox) {
        let message =
            OutboundMessage::Settings(SettingsSnapshot::from(&self.settings));
        if let Err(err) = outbox.send(&message) {
            warn!("Error sending settings: {err:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        icon::WeatherCategory,
        layout::Shape,
        message::TupleValue,
        state::{StoredValue, Theme, WeatherUnit},
        util::MockOutbox,
    };
    use chrono::{TimeZone, Utc};
    use indexmap::IndexMap;

    type Controller = SyncController<IndexMap<u32, StoredValue>>;

    /// Minutes past an arbitrary fixed start time
    fn at(minutes: i64) -> DateTime<Local> {
        let start = Utc.with_ymd_and_hms(2024, 5, 24, 12, 0, 0).unwrap();
        (start + Duration::minutes(minutes)).with_timezone(&Local)
    }

    fn controller() -> Controller {
        controller_with(IndexMap::new())
    }

    fn controller_with(map: IndexMap<u32, StoredValue>) -> Controller {
        SyncController::new(
            SettingsStore::new(map, Theme::Color),
            DisplayInfo::default(),
            at(0),
        )
    }

    /// Controller that has loaded while connected, with a clean outbox
    fn loaded() -> (Controller, MockOutbox) {
        let mut controller = controller();
        let mut outbox = MockOutbox::default();
        controller.handle(Event::Load { connected: true }, at(0), &mut outbox);
        (controller, MockOutbox::default())
    }

    fn message() -> InboundMessage {
        InboundMessage::default()
    }

    fn weather_response(temperature: i64, code: u64) -> Event {
        Event::Inbound(InboundMessage {
            temperature: Some(TupleValue::Int(temperature)),
            condition_code: Some(TupleValue::Uint(code)),
            ..message()
        })
    }

    #[test]
    fn test_load() {
        let mut controller = controller();
        let mut outbox = MockOutbox::default();
        let dirty = controller.handle(
            Event::Load { connected: true },
            at(0),
            &mut outbox,
        );
        assert_eq!(dirty, Dirty::ALL);
        assert_eq!(
            outbox.sent,
            vec![
                OutboundMessage::Settings(SettingsSnapshot {
                    theme: 2,
                    weather_enabled: 1,
                    weather_show_temp: 1,
                    weather_unit: 0,
                }),
                OutboundMessage::WeatherRequest { weather_unit: 0 },
            ]
        );
        assert_eq!(controller.sync_state().retry_count, 1);
    }

    #[test]
    fn test_load_disconnected() {
        let mut controller = controller();
        let mut outbox = MockOutbox::default();
        controller.handle(Event::Load { connected: false }, at(0), &mut outbox);
        assert_eq!(outbox.settings_pushes(), 1);
        assert_eq!(outbox.weather_requests(), 0);
    }

    #[test]
    fn test_tick_updates_clock() {
        let (mut controller, mut outbox) = loaded();
        let dirty = controller.handle(Event::Tick, at(1), &mut outbox);
        assert!(dirty.clock);
        assert!(!dirty.matrix);
        assert_eq!(controller.clock(), at(1));
    }

    #[test]
    fn test_throttle() {
        let (mut controller, mut outbox) = loaded();
        controller.handle(weather_response(21, 3), at(0), &mut outbox);
        assert_eq!(controller.weather().fetched_at, Some(at(0)));
        assert_eq!(controller.sync_state().retry_count, 0);

        for minute in 1..30 {
            controller.handle(Event::Tick, at(minute), &mut outbox);
        }
        assert_eq!(outbox.weather_requests(), 0);

        // Window rolls over
        controller.handle(Event::Tick, at(30), &mut outbox);
        assert_eq!(outbox.weather_requests(), 1);
    }

    #[test]
    fn test_retry_budget() {
        let (mut controller, mut outbox) = loaded();
        // The load already used one attempt
        for minute in 1..=100 {
            controller.handle(Event::Tick, at(minute), &mut outbox);
        }
        assert_eq!(outbox.weather_requests(), usize::from(MAX_RETRIES) - 1);
        assert_eq!(controller.sync_state().retry_count, MAX_RETRIES);
    }

    #[test]
    fn test_reconnect_bypasses_throttle() {
        let (mut controller, mut outbox) = loaded();
        for minute in 1..=20 {
            controller.handle(Event::Tick, at(minute), &mut outbox);
        }
        assert_eq!(controller.sync_state().retry_count, MAX_RETRIES);

        controller.handle(Event::Connection(false), at(21), &mut outbox);
        let before = outbox.weather_requests();
        controller.handle(Event::Connection(true), at(22), &mut outbox);
        assert_eq!(outbox.weather_requests(), before + 1);
        assert_eq!(controller.sync_state().retry_count, 1);

        // Connected -> connected isn't a reconnect
        controller.handle(Event::Connection(true), at(23), &mut outbox);
        assert_eq!(outbox.weather_requests(), before + 1);
    }

    #[test]
    fn test_no_request_while_disconnected() {
        let (mut controller, mut outbox) = loaded();
        controller.handle(Event::Connection(false), at(1), &mut outbox);
        for minute in 2..50 {
            controller.handle(Event::Tick, at(minute), &mut outbox);
        }
        assert_eq!(outbox.weather_requests(), 0);
    }

    #[test]
    fn test_busy_outbox_keeps_retry() {
        let (mut controller, _) = loaded();
        let mut outbox = MockOutbox {
            busy: true,
            ..Default::default()
        };
        for minute in 1..=20 {
            controller.handle(Event::Tick, at(minute), &mut outbox);
        }
        assert_eq!(controller.sync_state().retry_count, 1);

        outbox.busy = false;
        controller.handle(Event::Tick, at(21), &mut outbox);
        assert_eq!(outbox.weather_requests(), 1);
        assert_eq!(controller.sync_state().retry_count, 2);
    }

    #[test]
    fn test_unit_change_refetches() {
        let (mut controller, mut outbox) = loaded();
        controller.handle(weather_response(21, 0), at(0), &mut outbox);
        controller.handle(Event::Tick, at(5), &mut outbox);
        assert_eq!(outbox.weather_requests(), 0);

        let dirty = controller.handle(
            Event::Inbound(InboundMessage {
                weather_unit: Some(TupleValue::Str("F".into())),
                ..message()
            }),
            at(6),
            &mut outbox,
        );
        assert!(dirty.weather_text);
        assert_eq!(controller.settings().weather_unit, WeatherUnit::Fahrenheit);
        assert_eq!(
            outbox.sent,
            vec![
                OutboundMessage::Settings(SettingsSnapshot {
                    theme: 2,
                    weather_enabled: 1,
                    weather_show_temp: 1,
                    weather_unit: 1,
                }),
                OutboundMessage::WeatherRequest { weather_unit: 1 },
            ]
        );

        // Same unit again doesn't reset the throttle
        controller.handle(weather_response(70, 0), at(7), &mut outbox);
        controller.handle(
            Event::Inbound(InboundMessage {
                weather_unit: Some(TupleValue::Uint(1)),
                ..message()
            }),
            at(8),
            &mut outbox,
        );
        assert_eq!(outbox.weather_requests(), 1);
    }

    #[test]
    fn test_invalid_theme_ignored() {
        let (mut controller, mut outbox) = loaded();
        for value in [
            TupleValue::Int(3),
            TupleValue::Int(-1),
            TupleValue::Uint(1000),
            TupleValue::Str("purple".into()),
            TupleValue::Bytes(vec![1]),
        ] {
            let dirty = controller.handle(
                Event::Inbound(InboundMessage {
                    theme: Some(value),
                    ..message()
                }),
                at(1),
                &mut outbox,
            );
            assert_eq!(dirty, Dirty::NONE);
        }
        assert_eq!(controller.settings().theme, Theme::Color);
        assert!(outbox.sent.is_empty());
    }

    #[test]
    fn test_flag_encodings() {
        let (mut controller, mut outbox) = loaded();
        let cases = [
            (TupleValue::Str("0".into()), Some(false)),
            (TupleValue::Str("1".into()), Some(true)),
            (TupleValue::Int(0), Some(false)),
            (TupleValue::Str("t".into()), Some(true)),
            (TupleValue::Uint(0), Some(false)),
            (TupleValue::Str("T".into()), Some(true)),
            (TupleValue::Str("0".into()), Some(false)),
            (TupleValue::Int(1), Some(true)),
            (TupleValue::Str("?".into()), None),
            (TupleValue::Bytes(vec![0]), None),
        ];
        for (value, expected) in cases {
            let before = controller.settings().weather_show_temp;
            controller.handle(
                Event::Inbound(InboundMessage {
                    weather_show_temp: Some(value),
                    ..message()
                }),
                at(1),
                &mut outbox,
            );
            assert_eq!(
                controller.settings().weather_show_temp,
                expected.unwrap_or(before)
            );
        }
        // One echo per accepted field
        assert_eq!(outbox.settings_pushes(), 8);
    }

    #[test]
    fn test_compound_message() {
        let (mut controller, mut outbox) = loaded();
        let dirty = controller.handle(
            Event::Inbound(InboundMessage {
                theme: Some(TupleValue::Int(1)),
                weather_enabled: Some(TupleValue::Str("t".into())),
                weather_show_temp: Some(TupleValue::Int(0)),
                weather_unit: Some(TupleValue::Str("F".into())),
                ..message()
            }),
            at(1),
            &mut outbox,
        );
        assert_eq!(dirty, Dirty::ALL);
        // One echo with the final state, then one request
        assert_eq!(
            outbox.sent,
            vec![
                OutboundMessage::Settings(SettingsSnapshot {
                    theme: 1,
                    weather_enabled: 1,
                    weather_show_temp: 0,
                    weather_unit: 1,
                }),
                OutboundMessage::WeatherRequest { weather_unit: 1 },
            ]
        );
    }

    #[test]
    fn test_weather_data() {
        let (mut controller, mut outbox) = loaded();
        let dirty = controller.handle(
            Event::Inbound(InboundMessage {
                temperature: Some(TupleValue::Int(-4)),
                ..message()
            }),
            at(3),
            &mut outbox,
        );
        assert_eq!(dirty, Dirty::WEATHER_TEXT);
        assert_eq!(controller.derived().temperature_text, "-4°");
        assert_eq!(controller.weather().fetched_at, Some(at(3)));
        // Weather data is never echoed
        assert!(outbox.sent.is_empty());

        let dirty = controller.handle(
            Event::Inbound(InboundMessage {
                condition_code: Some(TupleValue::Uint(63)),
                ..message()
            }),
            at(4),
            &mut outbox,
        );
        assert_eq!(dirty, Dirty::WEATHER_ICON);
        assert_eq!(controller.derived().icon.category, WeatherCategory::Rain);
        assert_eq!(controller.sync_state().retry_count, 0);

        // Both persisted
        let reloaded = controller_with(controller.into_store().into_inner());
        assert_eq!(reloaded.weather().temperature, Some(-4));
        assert_eq!(reloaded.weather().condition_code, Some(63));
        assert_eq!(reloaded.weather().fetched_at, None);
    }

    #[test]
    fn test_malformed_fields_ignored() {
        let (mut controller, mut outbox) = loaded();
        let before = (*controller.settings(), *controller.weather());
        let dirty = controller.handle(
            Event::Inbound(InboundMessage {
                weather_enabled: Some(TupleValue::Bytes(vec![1])),
                temperature: Some(TupleValue::Str("hot".into())),
                condition_code: Some(TupleValue::Bytes(vec![])),
                ..message()
            }),
            at(1),
            &mut outbox,
        );
        assert_eq!(dirty, Dirty::NONE);
        assert_eq!((*controller.settings(), *controller.weather()), before);
        assert!(outbox.sent.is_empty());
    }

    #[test]
    fn test_unexpected_json_types() {
        let (mut controller, mut outbox) = loaded();
        for (minute, line) in [
            r#"{"theme": 1, "weatherEnabled": true}"#,
            r#"{"theme": 1, "temperature": 21.5}"#,
            r#"{"theme": 1, "conditionCode": 5000000000}"#,
        ]
        .into_iter()
        .enumerate()
        {
            let message: InboundMessage = serde_json::from_str(line).unwrap();
            controller.handle(
                Event::Inbound(message),
                at(minute as i64 + 1),
                &mut outbox,
            );
            assert_eq!(controller.settings().theme, Theme::Dark, "{line}");
            assert!(controller.settings().weather_enabled, "{line}");
        }
        assert_eq!(controller.weather().temperature, None);
        // 5000000000 narrows to 0
        assert_eq!(controller.weather().condition_code, Some(0));
        // Theme was accepted each time, so each message echoed once
        assert_eq!(
            outbox.sent,
            vec![
                OutboundMessage::Settings(SettingsSnapshot {
                    theme: 1,
                    weather_enabled: 1,
                    weather_show_temp: 1,
                    weather_unit: 0,
                });
                3
            ]
        );
    }

    #[test]
    fn test_unknown_condition_code_ignored() {
        let (mut controller, mut outbox) = loaded();
        controller.handle(weather_response(12, 63), at(1), &mut outbox);
        for code in [255, 511] {
            let dirty = controller.handle(
                Event::Inbound(InboundMessage {
                    condition_code: Some(TupleValue::Uint(code)),
                    ..message()
                }),
                at(2),
                &mut outbox,
            );
            assert_eq!(dirty, Dirty::NONE);
            assert_eq!(controller.weather().condition_code, Some(63));
        }

        // Memory and storage agree
        let reloaded = controller_with(controller.into_store().into_inner());
        assert_eq!(reloaded.weather().condition_code, Some(63));
    }

    #[test]
    fn test_settings_round_trip() {
        let (mut controller, mut outbox) = loaded();
        controller.handle(
            Event::Inbound(InboundMessage {
                theme: Some(TupleValue::Int(1)),
                weather_enabled: Some(TupleValue::Int(0)),
                ..message()
            }),
            at(1),
            &mut outbox,
        );
        let snapshot = *controller.settings();
        assert_eq!(snapshot.theme, Theme::Dark);
        assert!(!snapshot.weather_enabled);

        let mut reloaded =
            controller_with(controller.into_store().into_inner());
        assert_eq!(*reloaded.settings(), snapshot);
        assert_eq!(reloaded.derived().layout.weather.icon, None);

        let mut outbox = MockOutbox::default();
        reloaded.handle(Event::Load { connected: true }, at(2), &mut outbox);
        for minute in 3..100 {
            reloaded.handle(Event::Tick, at(minute), &mut outbox);
        }
        reloaded.handle(Event::Connection(false), at(100), &mut outbox);
        reloaded.handle(Event::Connection(true), at(101), &mut outbox);
        assert_eq!(outbox.weather_requests(), 0);

        // Re-enabling asks right away
        reloaded.handle(
            Event::Inbound(InboundMessage {
                weather_enabled: Some(TupleValue::Int(1)),
                ..message()
            }),
            at(102),
            &mut outbox,
        );
        assert_eq!(outbox.weather_requests(), 1);
    }

    #[test]
    fn test_derived_follows_theme() {
        let mut controller = SyncController::new(
            SettingsStore::new(IndexMap::new(), Theme::Color),
            DisplayInfo {
                shape: Shape::Round,
                width: 180,
                height: 180,
                color: true,
            },
            at(0),
        );
        assert_eq!(controller.derived().matrix, MatrixVariant::Palette25);

        let mut outbox = MockOutbox::default();
        controller.handle(
            Event::Inbound(InboundMessage {
                theme: Some(TupleValue::Str("1".into())),
                ..message()
            }),
            at(1),
            &mut outbox,
        );
        let derived = controller.derived();
        assert_eq!(derived.matrix, MatrixVariant::Monochrome31);
        assert_eq!(derived.palette, palette_for(Theme::Dark, true));
        assert_eq!(derived.icon.tone, crate::icon::IconTone::Dark);
        assert_eq!(derived.temperature_text, "--°");
    }

    #[test]
    fn test_battery() {
        let (mut controller, mut outbox) = loaded();
        let state = BatteryState {
            charge_percent: 40,
            charging: true,
        };
        let dirty = controller.handle(Event::Battery(state), at(1), &mut outbox);
        assert_eq!(dirty, Dirty::BATTERY);
        assert_eq!(controller.battery(), state);
    }

    #[test]
    fn test_dirty_merge() {
        let mut dirty = Dirty::NONE;
        assert!(!dirty.any());
        dirty |= Dirty::CLOCK;
        dirty |= Dirty::WEATHER_ICON;
        assert!(dirty.clock && dirty.weather_icon && !dirty.battery);
        assert_eq!(Dirty::WEATHER_LAYOUT | Dirty::ALL, Dirty::ALL);
    }
}
