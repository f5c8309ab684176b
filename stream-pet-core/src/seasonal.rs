//! Calendar-driven theme detection.

use chrono::{Datelike, NaiveDate};

use crate::config::{SeasonalSettings, SeasonalTheme};

/// Parse an `MM-DD` date into `(month, day)`.
pub fn parse_month_day(text: &str) -> Option<(u32, u32)> {
    let (month, day) = text.trim().split_once('-')?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    ((1..=12).contains(&month) && (1..=31).contains(&day)).then_some((month, day))
}

impl SeasonalTheme {
    /// Whether `date` falls in this theme's inclusive range. A range whose
    /// end is before its start wraps over new year. Themes with a missing or
    /// malformed range never match.
    pub fn contains(&self, date: NaiveDate) -> bool {
        let (Some(start), Some(end)) = (
            parse_month_day(&self.start_date),
            parse_month_day(&self.end_date),
        ) else {
            return false;
        };
        let today = (date.month(), date.day());
        if start <= end {
            start <= today && today <= end
        } else {
            today >= start || today <= end
        }
    }
}

impl SeasonalSettings {
    /// The first theme, in name order, whose range contains `date`.
    pub fn detect(&self, date: NaiveDate) -> Option<&str> {
        self.themes
            .iter()
            .find(|(_, theme)| theme.contains(date))
            .map(|(name, _)| name.as_str())
    }

    /// Set `current_season` from `date` when seasonal theming and
    /// auto-detection are both on. Returns the season now in effect.
    pub fn apply(&mut self, date: NaiveDate) -> Option<String> {
        if !self.enabled || !self.auto_detect {
            return None;
        }
        let season = self.detect(date)?.to_string();
        self.current_season.clone_from(&season);
        Some(season)
    }
}
