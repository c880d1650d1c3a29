//! Settings form controller.
//!
//! Holds the dashboard's preference record in memory. Every control replaces
//! exactly one field through a pure merge; saving only raises a confirmation
//! notification. Nothing here is persisted and nothing here can fail.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub const SAVE_TITLE: &str = "Settings saved";
pub const SAVE_DESCRIPTION: &str = "Your preferences have been updated successfully.";

const DEFAULT_RETENTION_DAYS: &str = "30";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertThreshold {
    /// All alerts.
    Low,
    /// Important alerts.
    #[default]
    Medium,
    /// Critical only.
    High,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Fr,
    De,
}

impl Language {
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Es => "Español",
            Language::Fr => "Français",
            Language::De => "Deutsch",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

macro_rules! lowercase_enum_text {
    ($ty:ty, $what:literal, { $($variant:path => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    other => Err(anyhow!("unknown {} '{}'", $what, other)),
                }
            }
        }
    };
}

lowercase_enum_text!(AlertThreshold, "alert threshold", {
    AlertThreshold::Low => "low",
    AlertThreshold::Medium => "medium",
    AlertThreshold::High => "high",
});
lowercase_enum_text!(Language, "language", {
    Language::En => "en",
    Language::Es => "es",
    Language::Fr => "fr",
    Language::De => "de",
});
lowercase_enum_text!(ThemeMode, "theme", {
    ThemeMode::Dark => "dark",
    ThemeMode::Light => "light",
});

/// The dashboard's preference record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceSet {
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub alert_threshold: AlertThreshold,
    pub auto_analysis: bool,
    /// Kept as typed into the form; see [`PreferenceSet::retention_days`].
    pub data_retention_days: String,
    pub two_factor_enabled: bool,
    pub language: Language,
    pub theme: ThemeMode,
}

impl Default for PreferenceSet {
    fn default() -> Self {
        Self {
            email_notifications: true,
            push_notifications: false,
            alert_threshold: AlertThreshold::Medium,
            auto_analysis: true,
            data_retention_days: DEFAULT_RETENTION_DAYS.to_string(),
            two_factor_enabled: false,
            language: Language::En,
            theme: ThemeMode::Dark,
        }
    }
}

impl PreferenceSet {
    /// Returns a copy with exactly one field replaced.
    #[must_use]
    pub fn with_change(&self, change: PreferenceChange) -> Self {
        let mut next = self.clone();
        match change {
            PreferenceChange::EmailNotifications(v) => next.email_notifications = v,
            PreferenceChange::PushNotifications(v) => next.push_notifications = v,
            PreferenceChange::AlertThreshold(v) => next.alert_threshold = v,
            PreferenceChange::AutoAnalysis(v) => next.auto_analysis = v,
            PreferenceChange::DataRetentionDays(v) => next.data_retention_days = v,
            PreferenceChange::TwoFactorEnabled(v) => next.two_factor_enabled = v,
            PreferenceChange::Language(v) => next.language = v,
            PreferenceChange::Theme(v) => next.theme = v,
        }
        next
    }

    /// Retention period as a number, if the form text parses as one.
    pub fn retention_days(&self) -> Option<u32> {
        self.data_retention_days.trim().parse().ok()
    }

    /// Page layout: each card with its controls and their current values.
    pub fn sections(&self) -> Vec<Section> {
        let toggle = |key, label, description, on: bool| Control {
            key,
            label,
            description,
            value: if on { "on" } else { "off" }.to_string(),
        };
        vec![
            Section {
                title: "Notifications",
                controls: vec![
                    toggle(
                        "emailNotifications",
                        "Email Notifications",
                        "Receive alerts via email",
                        self.email_notifications,
                    ),
                    toggle(
                        "pushNotifications",
                        "Push Notifications",
                        "Browser push notifications",
                        self.push_notifications,
                    ),
                    Control {
                        key: "alertThreshold",
                        label: "Alert Threshold",
                        description: "low = all alerts, medium = important, high = critical only",
                        value: self.alert_threshold.to_string(),
                    },
                ],
            },
            Section {
                title: "AI & Analysis",
                controls: vec![
                    toggle(
                        "autoAnalysis",
                        "Auto-Analysis",
                        "Automatically analyze uploaded videos",
                        self.auto_analysis,
                    ),
                    Control {
                        key: "dataRetentionDays",
                        label: "Data Retention (days)",
                        description: "Video data will be automatically deleted after this period",
                        value: self.data_retention_days.clone(),
                    },
                ],
            },
            Section {
                title: "Security",
                controls: vec![toggle(
                    "twoFactorEnabled",
                    "Two-Factor Authentication",
                    "Add an extra layer of security",
                    self.two_factor_enabled,
                )],
            },
            Section {
                title: "Appearance",
                controls: vec![
                    Control {
                        key: "theme",
                        label: "Dark Mode",
                        description: "Use dark theme",
                        value: self.theme.to_string(),
                    },
                    Control {
                        key: "language",
                        label: "Language",
                        description: self.language.display_name(),
                        value: self.language.to_string(),
                    },
                ],
            },
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub title: &'static str,
    pub controls: Vec<Control>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Control {
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub value: String,
}

/// A single control's change event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreferenceChange {
    EmailNotifications(bool),
    PushNotifications(bool),
    AlertThreshold(AlertThreshold),
    AutoAnalysis(bool),
    DataRetentionDays(String),
    TwoFactorEnabled(bool),
    Language(Language),
    Theme(ThemeMode),
}

impl PreferenceChange {
    /// Build a change from a control key and its textual value.
    pub fn parse(key: &str, value: &str) -> Result<Self> {
        let change = match key {
            "emailNotifications" => Self::EmailNotifications(parse_switch(key, value)?),
            "pushNotifications" => Self::PushNotifications(parse_switch(key, value)?),
            "alertThreshold" => Self::AlertThreshold(value.parse()?),
            "autoAnalysis" => Self::AutoAnalysis(parse_switch(key, value)?),
            "dataRetentionDays" => Self::DataRetentionDays(value.to_string()),
            "twoFactorEnabled" => Self::TwoFactorEnabled(parse_switch(key, value)?),
            "language" => Self::Language(value.parse()?),
            "theme" => Self::Theme(value.parse()?),
            other => return Err(anyhow!("unknown setting '{}'", other)),
        };
        Ok(change)
    }
}

fn parse_switch(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Ok(true),
        "false" | "off" | "0" | "no" => Ok(false),
        other => Err(anyhow!("setting '{}' expects on/off, got '{}'", key, other)),
    }
}

/// Current color scheme, owned outside the form.
pub trait ThemeProvider: Send + Sync {
    fn get(&self) -> ThemeMode;
    fn set(&self, mode: ThemeMode);
}

#[derive(Debug, Default)]
pub struct InMemoryThemeProvider {
    mode: Mutex<ThemeMode>,
}

impl InMemoryThemeProvider {
    pub fn new(mode: ThemeMode) -> Self {
        Self {
            mode: Mutex::new(mode),
        }
    }
}

impl ThemeProvider for InMemoryThemeProvider {
    fn get(&self) -> ThemeMode {
        match self.mode.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set(&self, mode: ThemeMode) {
        match self.mode.lock() {
            Ok(mut guard) => *guard = mode,
            Err(poisoned) => *poisoned.into_inner() = mode,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
}

/// Toast sink for user-facing confirmations.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Emits notifications through the `log` facade.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        log::info!("{}: {}", notification.title, notification.description);
    }
}

/// Keeps every notification it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        match self.seen.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        match self.seen.lock() {
            Ok(mut guard) => guard.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}

pub struct SettingsForm {
    preferences: PreferenceSet,
    theme: Arc<dyn ThemeProvider>,
    notifier: Arc<dyn Notifier>,
}

impl SettingsForm {
    pub fn new(theme: Arc<dyn ThemeProvider>, notifier: Arc<dyn Notifier>) -> Self {
        let preferences = PreferenceSet {
            theme: theme.get(),
            ..PreferenceSet::default()
        };
        Self {
            preferences,
            theme,
            notifier,
        }
    }

    pub fn preferences(&self) -> &PreferenceSet {
        &self.preferences
    }

    pub fn apply(&mut self, change: PreferenceChange) {
        if let PreferenceChange::Theme(mode) = change {
            self.theme.set(mode);
        }
        self.preferences = self.preferences.with_change(change);
    }

    pub fn dark_mode_enabled(&self) -> bool {
        self.theme.get() == ThemeMode::Dark
    }

    pub fn set_dark_mode(&mut self, enabled: bool) {
        let mode = if enabled {
            ThemeMode::Dark
        } else {
            ThemeMode::Light
        };
        self.apply(PreferenceChange::Theme(mode));
    }

    pub fn save(&self) {
        self.notifier.notify(Notification {
            title: SAVE_TITLE.to_string(),
            description: SAVE_DESCRIPTION.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> (SettingsForm, Arc<InMemoryThemeProvider>, Arc<RecordingNotifier>) {
        let theme = Arc::new(InMemoryThemeProvider::new(ThemeMode::Dark));
        let notifier = Arc::new(RecordingNotifier::new());
        let form = SettingsForm::new(theme.clone(), notifier.clone());
        (form, theme, notifier)
    }

    #[test]
    fn defaults_match_page_load_state() {
        let prefs = PreferenceSet::default();
        assert!(prefs.email_notifications);
        assert!(!prefs.push_notifications);
        assert_eq!(prefs.alert_threshold, AlertThreshold::Medium);
        assert!(prefs.auto_analysis);
        assert_eq!(prefs.data_retention_days, "30");
        assert_eq!(prefs.retention_days(), Some(30));
        assert!(!prefs.two_factor_enabled);
        assert_eq!(prefs.language, Language::En);
    }

    #[test]
    fn with_change_replaces_only_one_field() {
        let base = PreferenceSet::default();
        let changes = [
            PreferenceChange::EmailNotifications(false),
            PreferenceChange::PushNotifications(true),
            PreferenceChange::AlertThreshold(AlertThreshold::High),
            PreferenceChange::AutoAnalysis(false),
            PreferenceChange::DataRetentionDays("90".to_string()),
            PreferenceChange::TwoFactorEnabled(true),
            PreferenceChange::Language(Language::Fr),
            PreferenceChange::Theme(ThemeMode::Light),
        ];
        for change in changes {
            let next = base.with_change(change.clone());
            let before = serde_json::to_value(&base).unwrap();
            let after = serde_json::to_value(&next).unwrap();
            let differing: Vec<&String> = before
                .as_object()
                .unwrap()
                .keys()
                .filter(|k| before[k.as_str()] != after[k.as_str()])
                .collect();
            assert_eq!(differing.len(), 1, "change {:?} touched {:?}", change, differing);
        }
        assert_eq!(base, PreferenceSet::default());
    }

    #[test]
    fn retention_text_is_not_validated() {
        let prefs = PreferenceSet::default()
            .with_change(PreferenceChange::DataRetentionDays("abc".to_string()));
        assert_eq!(prefs.data_retention_days, "abc");
        assert_eq!(prefs.retention_days(), None);
    }

    #[test]
    fn save_notifies_once_and_keeps_preferences() {
        let (mut form, _theme, notifier) = form();
        form.apply(PreferenceChange::PushNotifications(true));
        let before = form.preferences().clone();

        form.save();

        assert_eq!(form.preferences(), &before);
        let seen = notifier.notifications();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].title, SAVE_TITLE);
        assert_eq!(seen[0].description, SAVE_DESCRIPTION);
    }

    #[test]
    fn dark_mode_goes_through_theme_provider() {
        let (mut form, theme, _notifier) = form();
        assert!(form.dark_mode_enabled());

        form.set_dark_mode(false);
        assert_eq!(theme.get(), ThemeMode::Light);
        assert!(!form.dark_mode_enabled());
        assert_eq!(form.preferences().theme, ThemeMode::Light);

        form.set_dark_mode(true);
        assert_eq!(theme.get(), ThemeMode::Dark);
    }

    #[test]
    fn parses_control_events() {
        assert_eq!(
            PreferenceChange::parse("alertThreshold", "High").unwrap(),
            PreferenceChange::AlertThreshold(AlertThreshold::High)
        );
        assert_eq!(
            PreferenceChange::parse("twoFactorEnabled", "on").unwrap(),
            PreferenceChange::TwoFactorEnabled(true)
        );
        assert!(PreferenceChange::parse("language", "it").is_err());
        assert!(PreferenceChange::parse("volume", "11").is_err());
        assert!(PreferenceChange::parse("autoAnalysis", "maybe").is_err());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let value = serde_json::to_value(PreferenceSet::default()).unwrap();
        assert_eq!(value["alertThreshold"], "medium");
        assert_eq!(value["dataRetentionDays"], "30");
        assert_eq!(value["twoFactorEnabled"], false);
        assert_eq!(value["theme"], "dark");
    }

    #[test]
    fn sections_cover_every_field() {
        let sections = PreferenceSet::default().sections();
        let titles: Vec<&str> = sections.iter().map(|s| s.title).collect();
        assert_eq!(titles, ["Notifications", "AI & Analysis", "Security", "Appearance"]);
        let keys: usize = sections.iter().map(|s| s.controls.len()).sum();
        assert_eq!(keys, 8);
    }
}
