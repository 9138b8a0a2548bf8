//! Leaderboard ranking
//!
//! Rankings are projections recomputed wholesale per request: all-time uses
//! the rolling profile scores, daily/weekly replay only the events inside the
//! window. Ordering is total — score descending, then earliest profile
//! creation, then user id — so re-ranking the same snapshot yields an
//! identical list.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::EngineConfig;
use crate::profile::ProfileStore;
use crate::recorder::EventLog;
use crate::scoring::EngagementScorer;
use crate::types::{LeaderboardEntry, Period};

/// Ranker over a snapshot of profiles and the event log
pub struct LeaderboardRanker;

impl LeaderboardRanker {
    /// Rank the top `limit` users for `period` as of `now`.
    ///
    /// Returns an empty list when no user has activity in the window.
    pub fn rank(
        profiles: &ProfileStore,
        log: &EventLog,
        config: &EngineConfig,
        period: Period,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<LeaderboardEntry> {
        let mut rows: Vec<RankRow> = match period.window_start(now) {
            None => all_time_rows(profiles),
            Some(start) => windowed_rows(profiles, log, config, start),
        };

        rows.sort_by(compare_rows);

        let entries: Vec<LeaderboardEntry> = rows
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(idx, row)| LeaderboardEntry {
                user_id: row.user_id,
                period,
                rank: idx as u32 + 1,
                score: row.score,
            })
            .collect();

        debug!(
            period = period.as_str(),
            entries = entries.len(),
            "Leaderboard computed"
        );
        entries
    }
}

struct RankRow {
    user_id: String,
    score: f64,
    created_at: DateTime<Utc>,
}

fn all_time_rows(profiles: &ProfileStore) -> Vec<RankRow> {
    profiles
        .iter()
        .map(|p| RankRow {
            user_id: p.user_id.clone(),
            score: p.rolling_score,
            created_at: p.created_at,
        })
        .collect()
}

/// Recompute per-user scores from the events inside the window.
///
/// Scoring is the same pure function used on the live path, so a windowed
/// score equals what the rolling score would have accumulated over just
/// those events.
fn windowed_rows(
    profiles: &ProfileStore,
    log: &EventLog,
    config: &EngineConfig,
    start: DateTime<Utc>,
) -> Vec<RankRow> {
    let mut scores: HashMap<&str, f64> = HashMap::new();

    for event in log.events_in_window(Some(start)) {
        let patterns = EngagementScorer::score(event, config);
        *scores.entry(event.user_id.as_str()).or_insert(0.0) += patterns.engagement_score;
    }

    scores
        .into_iter()
        .map(|(user_id, score)| {
            // Profiles exist for every recorded user; fall back to the epoch
            // only if a snapshot was loaded without its profile half.
            let created_at = profiles
                .get(user_id)
                .map(|p| p.created_at)
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            RankRow {
                user_id: user_id.to_string(),
                score,
                created_at,
            }
        })
        .collect()
}

/// Score descending, then earliest profile creation, then user id
fn compare_rows(a: &RankRow, b: &RankRow) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.user_id.cmp(&b.user_id))
}
