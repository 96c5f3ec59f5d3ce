//! Aggregate readers and the event recorders that feed them.
//!
//! Readers are pure projections: fetch counters/sets/hashes, derive a rate or
//! a sorted list, return it. Missing keys read as zero/empty, never as an
//! error, and a zero denominator yields a rate of 0. Every rate is a unit
//! interval (0..=1) float; raw counts ride along so clients can render
//! percentages themselves.

use serde::{Deserialize, Serialize};

use crate::{
    database::{
        ACTION_COUNT, AGGRESSIVE_COUNT, CITY_COUNTS, CLAIM_COUNT, DEVICES_SET, HONEST_COUNT,
        OVER_THRESHOLD_SET, STREAK_COUNT, STREAK_TOTAL, Store, WIN_COUNT,
    },
    error::AppError,
};

fn ratio(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 { 0.0 } else { part / whole }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurvivalRate {
    pub over_threshold: u64,
    pub devices: u64,
    pub rate: f64,
}

pub async fn survival_rate(store: &dyn Store) -> Result<SurvivalRate, AppError> {
    let over_threshold = store.set_len(OVER_THRESHOLD_SET).await?;
    let devices = store.set_len(DEVICES_SET).await?;

    Ok(SurvivalRate {
        over_threshold,
        devices,
        rate: ratio(over_threshold as f64, devices as f64),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakAverage {
    pub total_streaks: i64,
    pub runs: i64,
    pub average: f64,
}

pub async fn streak_average(store: &dyn Store) -> Result<StreakAverage, AppError> {
    let total_streaks = store.get_int(STREAK_TOTAL).await?.unwrap_or(0);
    let runs = store.get_int(STREAK_COUNT).await?.unwrap_or(0);

    Ok(StreakAverage {
        total_streaks,
        runs,
        average: ratio(total_streaks as f64, runs as f64),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HonestySummary {
    pub honest: i64,
    pub claims: i64,
    pub rate: f64,
}

pub async fn honesty_rate(store: &dyn Store) -> Result<HonestySummary, AppError> {
    let honest = store.get_int(HONEST_COUNT).await?.unwrap_or(0);
    let claims = store.get_int(CLAIM_COUNT).await?.unwrap_or(0);

    Ok(HonestySummary {
        honest,
        claims,
        rate: ratio(honest as f64, claims as f64),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggressionSummary {
    pub aggressive: i64,
    pub actions: i64,
    pub index: f64,
}

pub async fn aggression_index(store: &dyn Store) -> Result<AggressionSummary, AppError> {
    let aggressive = store.get_int(AGGRESSIVE_COUNT).await?.unwrap_or(0);
    let actions = store.get_int(ACTION_COUNT).await?.unwrap_or(0);

    Ok(AggressionSummary {
        aggressive,
        actions,
        index: ratio(aggressive as f64, actions as f64),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityEntry {
    pub city: String,
    pub count: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityLeaderboard {
    pub cities: Vec<CityEntry>,
    pub total_cities: usize,
}

pub async fn city_leaderboard(store: &dyn Store) -> Result<CityLeaderboard, AppError> {
    let counts = store.hash_get_all(CITY_COUNTS).await?;

    let mut cities: Vec<CityEntry> = counts
        .into_iter()
        .filter(|(city, count)| !city.is_empty() && *count > 0)
        .map(|(city, count)| CityEntry { city, count })
        .collect();
    cities.sort_by(|a, b| a.city.cmp(&b.city));

    let total_cities = cities.len();
    Ok(CityLeaderboard {
        cities,
        total_cities,
    })
}

#[derive(Deserialize)]
pub struct ClaimEvent {
    pub honest: bool,
}

pub async fn record_claim(store: &dyn Store, event: ClaimEvent) -> Result<HonestySummary, AppError> {
    let claims = store.incr_by(CLAIM_COUNT, 1).await?;
    let honest = if event.honest {
        store.incr_by(HONEST_COUNT, 1).await?
    } else {
        store.get_int(HONEST_COUNT).await?.unwrap_or(0)
    };

    Ok(HonestySummary {
        honest,
        claims,
        rate: ratio(honest as f64, claims as f64),
    })
}

#[derive(Deserialize)]
pub struct ActionEvent {
    pub aggressive: bool,
}

pub async fn record_action(
    store: &dyn Store,
    event: ActionEvent,
) -> Result<AggressionSummary, AppError> {
    let actions = store.incr_by(ACTION_COUNT, 1).await?;
    let aggressive = if event.aggressive {
        store.incr_by(AGGRESSIVE_COUNT, 1).await?
    } else {
        store.get_int(AGGRESSIVE_COUNT).await?.unwrap_or(0)
    };

    Ok(AggressionSummary {
        aggressive,
        actions,
        index: ratio(aggressive as f64, actions as f64),
    })
}

#[derive(Deserialize)]
pub struct WinEvent {
    pub city: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinAck {
    pub wins: i64,
    pub city: Option<String>,
}

/// A win always counts; the city tally only moves for a non-blank name, so
/// the leaderboard hash never grows an empty field.
pub async fn record_win(store: &dyn Store, event: WinEvent) -> Result<WinAck, AppError> {
    let wins = store.incr_by(WIN_COUNT, 1).await?;

    let city = event.city.trim();
    if city.is_empty() {
        return Ok(WinAck { wins, city: None });
    }

    store.hash_incr(CITY_COUNTS, city, 1).await?;
    Ok(WinAck {
        wins,
        city: Some(city.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    #[test]
    fn ratio_yields_zero_for_empty_denominator() {
        assert_eq!(ratio(3.0, 0.0), 0.0);
        assert_eq!(ratio(0.0, 0.0), 0.0);
        assert_eq!(ratio(1.0, 4.0), 0.25);
    }

    #[tokio::test]
    async fn rates_on_fresh_state_are_zero_not_errors() {
        let store = MemoryStore::default();

        assert_eq!(survival_rate(&store).await.unwrap().rate, 0.0);
        assert_eq!(streak_average(&store).await.unwrap().average, 0.0);
        assert_eq!(honesty_rate(&store).await.unwrap().rate, 0.0);
        assert_eq!(aggression_index(&store).await.unwrap().index, 0.0);
        assert!(city_leaderboard(&store).await.unwrap().cities.is_empty());
    }

    #[tokio::test]
    async fn survival_rate_divides_set_sizes() {
        let store = MemoryStore::default();
        for device in ["A", "B", "C", "D"] {
            store.set_add(DEVICES_SET, device).await.unwrap();
        }
        store.set_add(OVER_THRESHOLD_SET, "A").await.unwrap();

        let summary = survival_rate(&store).await.unwrap();

        assert_eq!(summary.devices, 4);
        assert_eq!(summary.over_threshold, 1);
        assert_eq!(summary.rate, 0.25);
    }

    #[tokio::test]
    async fn leaderboard_filters_and_sorts() {
        let store = MemoryStore::default();
        store.hash_incr(CITY_COUNTS, "Austin", 3).await.unwrap();
        store.hash_incr(CITY_COUNTS, "", 2).await.unwrap();
        store.hash_incr(CITY_COUNTS, "Boston", 0).await.unwrap();

        let board = city_leaderboard(&store).await.unwrap();

        assert_eq!(board.total_cities, 1);
        assert_eq!(board.cities.len(), 1);
        assert_eq!(board.cities[0].city, "Austin");
        assert_eq!(board.cities[0].count, 3);
    }

    #[tokio::test]
    async fn leaderboard_sorts_by_city_name() {
        let store = MemoryStore::default();
        store.hash_incr(CITY_COUNTS, "Denver", 1).await.unwrap();
        store.hash_incr(CITY_COUNTS, "Austin", 9).await.unwrap();
        store.hash_incr(CITY_COUNTS, "Boston", 4).await.unwrap();

        let names: Vec<String> = city_leaderboard(&store)
            .await
            .unwrap()
            .cities
            .into_iter()
            .map(|e| e.city)
            .collect();

        assert_eq!(names, ["Austin", "Boston", "Denver"]);
    }

    #[tokio::test]
    async fn claims_tally_honest_and_total() {
        let store = MemoryStore::default();

        record_claim(&store, ClaimEvent { honest: true }).await.unwrap();
        record_claim(&store, ClaimEvent { honest: false }).await.unwrap();
        let summary = record_claim(&store, ClaimEvent { honest: true }).await.unwrap();

        assert_eq!(summary.honest, 2);
        assert_eq!(summary.claims, 3);
        assert_eq!(summary.rate, 2.0 / 3.0);
    }

    #[tokio::test]
    async fn blank_city_win_counts_but_skips_the_hash() {
        let store = MemoryStore::default();

        let ack = record_win(
            &store,
            WinEvent {
                city: "   ".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(ack.wins, 1);
        assert_eq!(ack.city, None);
        assert!(store.hash_get_all(CITY_COUNTS).await.unwrap().is_empty());
    }
}
