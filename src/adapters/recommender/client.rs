//! Recommendation Service Client
//!
//! Calls `GET /recommendation` on the allocation service and converts the
//! named weight map into the engine's fixed venue order. Weights arrive in
//! basis points and always as a single atomic proposal.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecommenderError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("recommendation missing venue '{0}'")]
    MissingVenue(String),

    #[error("weight {0} bps does not fit the fixed-point range")]
    WeightOutOfRange(u64),
}

/// Raw recommendation payload from the service.
#[derive(Debug, Clone, Deserialize)]
pub struct Recommendation {
    /// Venue name -> weight in basis points (10000 = 100%).
    pub allocation: HashMap<String, u64>,
    /// Venue name -> predicted APY as a decimal fraction.
    #[serde(default)]
    pub predicted_yields: HashMap<String, f64>,
    /// Venue name -> risk score in [0, 1], lower is better.
    #[serde(default)]
    pub risk_scores: HashMap<String, f64>,
    /// Model confidence in [0, 1].
    #[serde(default)]
    pub confidence: f64,
}

impl Recommendation {
    /// Order the named weight map by the engine's venue list.
    ///
    /// Matching is case-insensitive on the venue name; a venue the service
    /// did not cover fails the whole recommendation.
    pub fn ordered_weights(&self, venue_order: &[String]) -> Result<Vec<u16>, RecommenderError> {
        let lowered: HashMap<String, u64> = self
            .allocation
            .iter()
            .map(|(k, &v)| (k.to_lowercase(), v))
            .collect();
        venue_order
            .iter()
            .map(|name| {
                let bps = lowered
                    .get(&name.to_lowercase())
                    .copied()
                    .ok_or_else(|| RecommenderError::MissingVenue(name.clone()))?;
                u16::try_from(bps).map_err(|_| RecommenderError::WeightOutOfRange(bps))
            })
            .collect()
    }
}

/// HTTP client for the recommendation service.
#[derive(Debug, Clone)]
pub struct RecommenderClient {
    api_base_url: String,
    client: reqwest::Client,
}

impl RecommenderClient {
    pub fn new(api_base_url: String) -> Self {
        Self {
            api_base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Fetch the current recommendation.
    pub async fn get_recommendation(&self) -> Result<Recommendation, RecommenderError> {
        let url = format!("{}/recommendation", self.api_base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RecommenderError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RecommenderError::ApiError(
                response.text().await.unwrap_or_default(),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| RecommenderError::ApiError(e.to_string()))
    }

    /// Fetch a recommendation and order it by `venue_order`.
    pub async fn fetch_weights(&self, venue_order: &[String]) -> Result<Vec<u16>, RecommenderError> {
        let recommendation = self.get_recommendation().await?;
        tracing::debug!(
            confidence = recommendation.confidence,
            yields = ?recommendation.predicted_yields,
            risks = ?recommendation.risk_scores,
            "recommendation received"
        );
        recommendation.ordered_weights(venue_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recommendation(entries: &[(&str, u64)]) -> Recommendation {
        Recommendation {
            allocation: entries
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            predicted_yields: HashMap::new(),
            risk_scores: HashMap::new(),
            confidence: 0.9,
        }
    }

    fn order(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_weights_follow_venue_order() {
        let rec = recommendation(&[("aave", 4000), ("morpho", 3000), ("spark", 2000), ("uniswap", 1000)]);
        let weights = rec
            .ordered_weights(&order(&["uniswap", "spark", "morpho", "aave"]))
            .unwrap();
        assert_eq!(weights, vec![1000, 2000, 3000, 4000]);
    }

    #[test]
    fn test_name_matching_is_case_insensitive() {
        let rec = recommendation(&[("Aave", 6000), ("Morpho", 4000)]);
        let weights = rec.ordered_weights(&order(&["aave", "morpho"])).unwrap();
        assert_eq!(weights, vec![6000, 4000]);
    }

    #[test]
    fn test_missing_venue_fails_whole_recommendation() {
        let rec = recommendation(&[("aave", 10_000)]);
        let err = rec.ordered_weights(&order(&["aave", "spark"])).unwrap_err();
        assert!(matches!(err, RecommenderError::MissingVenue(v) if v == "spark"));
    }

    #[test]
    fn test_oversized_weight_rejected() {
        let rec = recommendation(&[("aave", 70_000)]);
        let err = rec.ordered_weights(&order(&["aave"])).unwrap_err();
        assert!(matches!(err, RecommenderError::WeightOutOfRange(70_000)));
    }

    #[test]
    fn test_payload_decoding() {
        let raw = r#"{
            "allocation": {"aave": 4000, "morpho": 3000, "spark": 2000, "uniswap": 1000},
            "predicted_yields": {"aave": 0.072},
            "risk_scores": {"aave": 0.2},
            "confidence": 0.87
        }"#;
        let rec: Recommendation = serde_json::from_str(raw).unwrap();
        assert_eq!(rec.allocation["aave"], 4000);
        assert_eq!(rec.confidence, 0.87);
    }
}
