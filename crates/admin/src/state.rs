//! Application state shared across handlers.

use std::sync::Arc;

use boletos_core::HolidayCalendar;

use crate::backend::Backend;
use crate::config::AdminConfig;
use crate::config::ConfigError;

/// Runtime settings derived from configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Dates skipped by business-day adjustment, besides weekends
    pub calendar: HolidayCalendar,
    /// Retry a rejected settlement with a status-only payload
    pub settle_status_only_fallback: bool,
}

impl Settings {
    /// Build settings from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the holiday file cannot be loaded.
    pub fn from_config(config: &AdminConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            calendar: config.holidays.build_calendar()?,
            settle_status_only_fallback: config.settle_status_only_fallback,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            calendar: HolidayCalendar::none(),
            settle_status_only_fallback: true,
        }
    }
}

/// Application state shared across all handlers.
///
/// Holds the backend handle created once at startup. Nothing else is
/// shared between requests.
pub struct AppState<B> {
    inner: Arc<AppStateInner<B>>,
}

struct AppStateInner<B> {
    backend: B,
    settings: Settings,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Backend> AppState<B> {
    #[must_use]
    pub fn new(backend: B, settings: Settings) -> Self {
        Self {
            inner: Arc::new(AppStateInner { backend, settings }),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    #[must_use]
    pub fn calendar(&self) -> &HolidayCalendar {
        &self.inner.settings.calendar
    }

    /// Whether any holiday is known; otherwise only weekends are skipped.
    #[must_use]
    pub fn holidays_enabled(&self) -> bool {
        !self.inner.settings.calendar.is_empty()
    }

    #[must_use]
    pub fn settle_status_only_fallback(&self) -> bool {
        self.inner.settings.settle_status_only_fallback
    }
}
