//! Request and response bodies exchanged with the analysis and recommendation servers.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Body of the analysis call: the face crop as a JPEG data URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinAnalysisRequest {
    pub file: String,
}

impl SkinAnalysisRequest {
    pub fn new(data_uri: impl Into<String>) -> Self {
        Self {
            file: data_uri.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinAnalysisResponse {
    pub status: i32,
    #[serde(default)]
    pub message: Option<String>,
    /// Absent or `null` on error responses.
    #[serde(default)]
    pub result: Option<SkinAnalysisResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinAnalysisResult {
    pub success: bool,
    #[serde(default)]
    pub model_version: Option<String>,
    /// Per-region scores, e.g. `forehead -> {moisture, elasticity}`.
    #[serde(default)]
    pub parts: Option<BTreeMap<String, BTreeMap<String, f64>>>,
    pub averages: BTreeMap<String, f64>,
}

/// One metric as shown to the user, in percent where higher is better.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinScore {
    pub category: &'static str,
    pub percentage: f64,
}

impl SkinAnalysisResult {
    /// Wrinkle and pore arrive as "amount of", so they are inverted.
    pub fn skin_scores(&self) -> Vec<SkinScore> {
        let avg = |key: &str| self.averages.get(key).copied().unwrap_or(0.0);
        vec![
            SkinScore {
                category: "moisture",
                percentage: avg("moisture"),
            },
            SkinScore {
                category: "elasticity",
                percentage: avg("elasticity"),
            },
            SkinScore {
                category: "wrinkle",
                percentage: 100.0 - avg("wrinkle"),
            },
            SkinScore {
                category: "pore",
                percentage: 100.0 - avg("pore"),
            },
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub wrinkle: i32,
    pub pore: i32,
    pub elasticity: i32,
    pub moisture: i32,
}

impl RecommendRequest {
    /// Build a recommendation query from analysis averages. Fractions are truncated.
    pub fn from_averages(averages: &BTreeMap<String, f64>) -> Result<Self> {
        let metric = |key: &str| -> Result<i32> {
            averages
                .get(key)
                .map(|v| v.trunc() as i32)
                .with_context(|| format!("analysis result has no `{key}` average"))
        };
        Ok(Self {
            wrinkle: metric("wrinkle")?,
            pore: metric("pore")?,
            elasticity: metric("elasticity")?,
            moisture: metric("moisture")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub status: i32,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<Vec<RecommendedProduct>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedProduct {
    pub id: String,
    pub name: String,
    pub price: String,
    pub description: String,
    pub commerce_url: String,
    pub wrinkle: i32,
    pub pore: i32,
    pub elasticity: i32,
    pub moisture: i32,
    pub image_url: String,
    pub company: Company,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    pub url: String,
}
