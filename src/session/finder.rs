use thiserror::Error;

use crate::api::{RecommendQuery, SkillFocus};

use super::goal::Goal;

pub const MAX_REROLLS: u32 = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FinderError {
    #[error("Please enter valid SR and BPM values.")]
    InvalidParameters,
    #[error("Max rerolls reached. Try different settings.")]
    RerollLimit,
}

/// Parameters that identify "the same search" for reroll counting.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchKey {
    pub star_rating: f64,
    pub max_bpm: f64,
    pub mods: u32,
    pub focus: SkillFocus,
}

/// What was shown to the player, kept to validate the next detected play.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub beatmap_hash: String,
    pub mods: u32,
    pub goal: Goal,
}

#[derive(Debug, Clone, Default)]
pub struct MapFinder {
    last_key: Option<SearchKey>,
    reroll_count: u32,
    excluded: Vec<String>,
}

impl MapFinder {
    pub fn reroll_count(&self) -> u32 {
        self.reroll_count
    }

    #[cfg(test)]
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    /// Rerolls left after the current candidate.
    pub fn rerolls_left(&self) -> u32 {
        MAX_REROLLS.saturating_sub(self.reroll_count + 1)
    }

    pub fn is_exhausted(&self) -> bool {
        self.reroll_count + 1 >= MAX_REROLLS
    }

    /// Registers a search attempt and builds the request for it. Refuses
    /// without touching the network once the key hit the reroll cap.
    pub fn prepare(&mut self, key: SearchKey) -> Result<RecommendQuery, FinderError> {
        if !key.star_rating.is_finite()
            || !key.max_bpm.is_finite()
            || key.star_rating <= 0.0
            || key.max_bpm <= 0.0
        {
            return Err(FinderError::InvalidParameters);
        }

        if self.last_key.as_ref() == Some(&key) {
            self.reroll_count = (self.reroll_count + 1).min(MAX_REROLLS);
        } else {
            self.reroll_count = 0;
            self.excluded.clear();
        }

        let query = RecommendQuery {
            star_rating: key.star_rating,
            max_bpm: key.max_bpm,
            mods: key.mods,
            exclude: self.excluded.clone(),
            focus: key.focus,
        };
        self.last_key = Some(key);

        if self.reroll_count >= MAX_REROLLS {
            return Err(FinderError::RerollLimit);
        }
        Ok(query)
    }

    pub fn record_candidate(&mut self, beatmap_hash: &str) {
        self.excluded.push(beatmap_hash.to_string());
    }

    /// An empty result makes the next attempt a fresh search, not a reroll.
    pub fn record_no_candidate(&mut self) {
        self.last_key = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(sr: f64) -> SearchKey {
        SearchKey {
            star_rating: sr,
            max_bpm: 200.0,
            mods: 8,
            focus: SkillFocus::Balanced,
        }
    }

    #[test]
    fn fourth_identical_search_is_refused() {
        let mut finder = MapFinder::default();
        for attempt in 0..3 {
            let query = finder.prepare(key(5.5)).expect("within cap");
            finder.record_candidate(&format!("hash-{attempt}"));
            assert_eq!(query.exclude.len(), attempt);
        }
        assert_eq!(finder.prepare(key(5.5)), Err(FinderError::RerollLimit));
        assert_eq!(finder.prepare(key(5.5)), Err(FinderError::RerollLimit));
        assert_eq!(finder.reroll_count(), MAX_REROLLS);
    }

    #[test]
    fn changing_parameters_resets_rerolls_and_exclusions() {
        let mut finder = MapFinder::default();
        finder.prepare(key(5.5)).unwrap();
        finder.record_candidate("a");
        finder.prepare(key(5.5)).unwrap();
        assert_eq!(finder.reroll_count(), 1);

        let query = finder.prepare(key(5.6)).expect("new key");
        assert_eq!(finder.reroll_count(), 0);
        assert!(query.exclude.is_empty());
        assert!(finder.excluded().is_empty());
    }

    #[test]
    fn empty_result_turns_next_attempt_into_fresh_search() {
        let mut finder = MapFinder::default();
        finder.prepare(key(5.5)).unwrap();
        finder.record_candidate("a");
        finder.prepare(key(5.5)).unwrap();
        finder.record_no_candidate();

        finder.prepare(key(5.5)).expect("fresh search");
        assert_eq!(finder.reroll_count(), 0);
    }

    #[test]
    fn invalid_parameters_leave_state_untouched() {
        let mut finder = MapFinder::default();
        finder.prepare(key(5.5)).unwrap();
        finder.prepare(key(5.5)).unwrap();
        assert_eq!(
            finder.prepare(key(f64::NAN)),
            Err(FinderError::InvalidParameters)
        );
        assert_eq!(finder.prepare(key(0.0)), Err(FinderError::InvalidParameters));
        assert_eq!(finder.reroll_count(), 1);
    }

    #[test]
    fn rerolls_left_counts_down() {
        let mut finder = MapFinder::default();
        finder.prepare(key(4.0)).unwrap();
        assert_eq!(finder.rerolls_left(), 2);
        finder.prepare(key(4.0)).unwrap();
        finder.prepare(key(4.0)).unwrap();
        assert_eq!(finder.rerolls_left(), 0);
        assert!(finder.is_exhausted());
    }
}
