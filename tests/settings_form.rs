use std::sync::Arc;

use vigil::{
    AlertThreshold, InMemoryThemeProvider, Language, PreferenceChange, PreferenceSet,
    RecordingNotifier, SettingsForm, ThemeMode, ThemeProvider,
};

fn form_with(theme: ThemeMode) -> (SettingsForm, Arc<InMemoryThemeProvider>, Arc<RecordingNotifier>) {
    let provider = Arc::new(InMemoryThemeProvider::new(theme));
    let notifier = Arc::new(RecordingNotifier::new());
    let form = SettingsForm::new(provider.clone(), notifier.clone());
    (form, provider, notifier)
}

#[test]
fn each_switch_changes_only_its_field() {
    let (mut form, _theme, _notifier) = form_with(ThemeMode::Dark);

    let before = form.preferences().clone();
    form.apply(PreferenceChange::EmailNotifications(false));
    let after = form.preferences().clone();
    assert!(!after.email_notifications);
    assert_eq!(
        after,
        PreferenceSet {
            email_notifications: false,
            ..before.clone()
        }
    );

    form.apply(PreferenceChange::TwoFactorEnabled(true));
    assert_eq!(
        form.preferences(),
        &PreferenceSet {
            two_factor_enabled: true,
            ..after
        }
    );
}

#[test]
fn form_session_then_save() {
    let (mut form, theme, notifier) = form_with(ThemeMode::Dark);

    for (key, value) in [
        ("alertThreshold", "low"),
        ("language", "de"),
        ("dataRetentionDays", "14"),
        ("autoAnalysis", "off"),
    ] {
        form.apply(PreferenceChange::parse(key, value).unwrap());
    }
    form.set_dark_mode(false);

    let prefs = form.preferences().clone();
    assert_eq!(prefs.alert_threshold, AlertThreshold::Low);
    assert_eq!(prefs.language, Language::De);
    assert_eq!(prefs.retention_days(), Some(14));
    assert!(!prefs.auto_analysis);
    assert_eq!(theme.get(), ThemeMode::Light);

    form.save();
    form.save();
    assert_eq!(form.preferences(), &prefs);
    assert_eq!(notifier.notifications().len(), 2);
}

#[test]
fn form_starts_from_provider_theme() {
    let (form, _theme, notifier) = form_with(ThemeMode::Light);
    assert!(!form.dark_mode_enabled());
    assert_eq!(form.preferences().theme, ThemeMode::Light);
    assert!(notifier.notifications().is_empty());
}

#[test]
fn preferences_round_trip_through_client_json() {
    let json = r#"{
        "emailNotifications": false,
        "pushNotifications": true,
        "alertThreshold": "high",
        "autoAnalysis": true,
        "dataRetentionDays": "60",
        "twoFactorEnabled": true,
        "language": "es",
        "theme": "light"
    }"#;
    let prefs: PreferenceSet = serde_json::from_str(json).unwrap();
    assert_eq!(prefs.alert_threshold, AlertThreshold::High);
    assert_eq!(prefs.language, Language::Es);
    assert_eq!(prefs.theme, ThemeMode::Light);
}
