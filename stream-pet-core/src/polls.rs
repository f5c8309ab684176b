//! Viewer polls.

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::time::Instant;

/// Polls need at least this many options.
pub const MIN_OPTIONS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOption {
    pub text: String,
    /// Lowercase usernames, in voting order.
    pub voters: Vec<String>,
}

impl PollOption {
    pub fn votes(&self) -> usize {
        self.voters.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<PollOption>,
    pub ends_at: Instant,
}

impl Poll {
    fn has_voted(&self, user: &str) -> bool {
        self.options
            .iter()
            .any(|option| option.voters.iter().any(|voter| voter == user))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    pub question: String,
    /// The first option with the most votes.
    pub winner: String,
    pub total_votes: usize,
    pub results: Vec<OptionResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionResult {
    pub text: String,
    pub votes: usize,
    /// Share of all votes, rounded to one decimal.
    pub percentage: f64,
}

/// The polls currently open.
#[derive(Debug, Default)]
pub struct PollBook {
    active: BTreeMap<String, Poll>,
    next_id: u64,
}

impl PollBook {
    /// Open a poll and return its id, or `None` with too few options.
    pub fn create(&mut self, question: &str, options: &[String], ends_at: Instant) -> Option<String> {
        if options.len() < MIN_OPTIONS {
            return None;
        }
        self.next_id += 1;
        let id = format!("poll_{}", self.next_id);
        let poll = Poll {
            id: id.clone(),
            question: question.to_string(),
            options: options
                .iter()
                .map(|text| PollOption {
                    text: text.clone(),
                    voters: Vec::new(),
                })
                .collect(),
            ends_at,
        };
        self.active.insert(id.clone(), poll);
        Some(id)
    }

    /// Count `user`'s vote for option `index`. One vote per user per poll;
    /// votes after the end time or for missing options are refused.
    pub fn vote(&mut self, id: &str, user: &str, index: usize, now: Instant) -> bool {
        let Some(poll) = self.active.get_mut(id) else {
            return false;
        };
        let user = user.to_lowercase();
        if now > poll.ends_at || poll.has_voted(&user) {
            return false;
        }
        match poll.options.get_mut(index) {
            Some(option) => {
                option.voters.push(user);
                true
            }
            None => false,
        }
    }

    /// Close a poll and tally it.
    pub fn end(&mut self, id: &str) -> Option<PollResults> {
        let poll = self.active.remove(id)?;
        let total_votes: usize = poll.options.iter().map(PollOption::votes).sum();
        let winner = poll
            .options
            .iter()
            .fold(None::<&PollOption>, |best, option| match best {
                Some(best) if best.votes() >= option.votes() => Some(best),
                _ => Some(option),
            })
            .map(|option| option.text.clone())
            .unwrap_or_default();
        let results = poll
            .options
            .iter()
            .map(|option| OptionResult {
                text: option.text.clone(),
                votes: option.votes(),
                percentage: percentage(option.votes(), total_votes),
            })
            .collect();

        Some(PollResults {
            question: poll.question,
            winner,
            total_votes,
            results,
        })
    }

    pub fn get(&self, id: &str) -> Option<&Poll> {
        self.active.get(id)
    }
}

fn percentage(votes: usize, total: usize) -> f64 {
    (votes as f64 * 1000.0 / total.max(1) as f64).round() / 10.0
}
