use serde::{Deserialize, Serialize};
use crate::models::domain::{ProfileId, RankedResult};

/// One page of ranked results
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub items: Vec<RankedResult>,
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
    pub last_page: u32,
}

/// Compact shape for autocomplete / quick lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickResult {
    pub id: ProfileId,
    pub name: String,
    pub specialty: Option<String>,
    pub city: Option<String>,
    pub rating: Option<f64>,
    pub reviews_count: u32,
    pub min_price: Option<f64>,
    pub avatar: Option<String>,
    pub is_online: bool,
    pub url: String,
}

/// Shape for the "similar providers" widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarResult {
    pub id: ProfileId,
    pub name: String,
    pub specialty: Option<String>,
    pub city: Option<String>,
    pub rating: Option<f64>,
    pub reviews_count: u32,
    pub experience_years: Option<u32>,
    pub min_price: Option<f64>,
    pub similarity_score: u32,
    pub avatar: Option<String>,
    pub url: String,
}

/// Shape for map / nearby lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoResult {
    pub id: ProfileId,
    pub name: String,
    pub specialty: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Kilometres, rounded to 2 decimals
    pub distance: f64,
    pub rating: Option<f64>,
    pub min_price: Option<f64>,
    pub url: String,
}

/// One exported CSV line, already rendered to text cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub city: String,
    pub rating: String,
    pub reviews_count: String,
    pub experience_years: String,
    pub min_price: String,
    pub verified: String,
    pub registered_at: String,
    pub url: String,
}

impl CsvRow {
    pub fn cells(&self) -> [&str; 11] {
        [
            &self.id,
            &self.name,
            &self.specialty,
            &self.city,
            &self.rating,
            &self.reviews_count,
            &self.experience_years,
            &self.min_price,
            &self.verified,
            &self.registered_at,
            &self.url,
        ]
    }
}
