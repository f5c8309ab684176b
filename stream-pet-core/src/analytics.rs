//! Usage counters kept alongside the configuration.

use std::collections::BTreeMap;

use crate::config::AnalyticsSettings;

/// What a counter increment is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally<'a> {
    Event(&'a str),
    Command(&'a str),
    State(&'a str),
    Click,
    Particles(u32),
    Message,
}

impl AnalyticsSettings {
    /// Count one occurrence. Does nothing when analytics is disabled.
    pub fn record(&mut self, tally: Tally<'_>) {
        if !self.enabled {
            return;
        }
        let stats = &mut self.stats;
        match tally {
            Tally::Event(name) => bump(&mut stats.events_triggered, name),
            Tally::Command(name) => bump(&mut stats.commands_used, name),
            Tally::State(name) => bump(&mut stats.states_entered, name),
            Tally::Click => stats.total_clicks += 1,
            Tally::Particles(count) => stats.total_particles += u64::from(count),
            Tally::Message => stats.total_messages += 1,
        }
    }

    /// The most frequent events, highest first, at most `limit`.
    pub fn top_events(&self, limit: usize) -> Vec<(String, u64)> {
        top(&self.stats.events_triggered, limit)
    }

    /// The most used commands, highest first, at most `limit`.
    pub fn top_commands(&self, limit: usize) -> Vec<(String, u64)> {
        top(&self.stats.commands_used, limit)
    }

    /// The most entered states, highest first, at most `limit`.
    pub fn top_states(&self, limit: usize) -> Vec<(String, u64)> {
        top(&self.stats.states_entered, limit)
    }
}

fn bump(counts: &mut BTreeMap<String, u64>, name: &str) {
    *counts.entry(name.to_string()).or_default() += 1;
}

fn top(counts: &BTreeMap<String, u64>, limit: usize) -> Vec<(String, u64)> {
    let mut entries: Vec<_> = counts
        .iter()
        .map(|(name, count)| (name.clone(), *count))
        .collect();
    // Stable sort keeps ties in name order
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(limit);
    entries
}
