use crate::config::Settings;
use crate::core::builder::QueryBuilder;
use crate::core::distance::{calculate_bounding_box, distance_between, is_within_bounding_box};
use crate::core::facets::{FacetCalculator, FacetDimension, FacetResult};
use crate::core::filters::{CategoryTree, FilterContext, FilterSet};
use crate::core::formatter::ResultFormatter;
use crate::core::query::{contains_ignore_case, OrderTerm, ProfileQuery, SortField};
use crate::core::sorters::{RankingOptions, SorterSet};
use crate::error::{SearchError, SearchResult};
use crate::services::ProfileStore;
use crate::models::{
    CandidateRecords, FilterCriteria, GeoPoint, GeoResult, ProfileId, QuickResult, RankedResult,
    RelevanceWeights, SearchPage, SearchRequest, SimilarResult, SortDirection, SortSpec,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Upper bound on `related_queries` output
const MAX_RELATED_QUERIES: usize = 10;

/// Shorter autocomplete input yields no suggestions
const MIN_AUTOCOMPLETE_CHARS: usize = 2;

const SYNONYMS: &[(&str, &[&str])] = &[
    ("массаж", &["релакс", "спа", "терапия"]),
    ("релакс", &["массаж", "отдых", "расслабление"]),
    ("спа", &["массаж", "релакс", "процедуры"]),
];

/// Tunables for [`SearchEngine`], usually built from [`Settings`]
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub relevance: RelevanceWeights,
    pub ranking: RankingOptions,
    pub online_window: Duration,
    pub city_limit: usize,
    pub specialty_limit: usize,
    pub base_url: String,
    pub default_per_page: u32,
    pub max_per_page: u32,
    pub category_tree: Option<Arc<CategoryTree>>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for EngineOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            relevance: RelevanceWeights::from(&settings.relevance),
            ranking: RankingOptions {
                prior: settings.ranking.prior(),
                popularity_weights: (&settings.ranking.popularity).into(),
            },
            online_window: Duration::minutes(settings.ranking.online_window_minutes),
            city_limit: settings.facets.city_limit,
            specialty_limit: settings.facets.specialty_limit,
            base_url: settings.results.base_url.clone(),
            default_per_page: settings.results.default_per_page,
            max_per_page: settings.results.max_per_page,
            category_tree: None,
        }
    }
}

impl EngineOptions {
    pub fn with_category_tree(mut self, tree: CategoryTree) -> Self {
        self.category_tree = Some(Arc::new(tree));
        self
    }
}

/// Search facade tying filters, sorters, facets and formatting together
///
/// The engine holds no per-request state. Every operation takes the base
/// candidate query by value; callers clone it to run several operations
/// over the same snapshot.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    builder: QueryBuilder,
    ranking: RankingOptions,
    facets: FacetCalculator,
    formatter: ResultFormatter,
    context: FilterContext,
    default_per_page: u32,
    max_per_page: u32,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl SearchEngine {
    pub fn new(options: EngineOptions) -> Self {
        let max_per_page = options.max_per_page.clamp(1, 100);
        Self {
            builder: QueryBuilder::new(options.relevance),
            ranking: options.ranking,
            facets: FacetCalculator::new(options.city_limit, options.specialty_limit),
            formatter: ResultFormatter::new(options.base_url, options.online_window),
            context: FilterContext {
                online_window: options.online_window,
                category_tree: options.category_tree,
            },
            default_per_page: options.default_per_page.clamp(1, max_per_page),
            max_per_page,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(EngineOptions::from(settings))
    }

    pub fn formatter(&self) -> &ResultFormatter {
        &self.formatter
    }

    pub fn query_builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub fn base_query(&self, records: &CandidateRecords, now: DateTime<Utc>) -> ProfileQuery {
        self.builder.base_query(records, now)
    }

    /// Load candidates from `store` and build the base query
    pub async fn load_base<S: ProfileStore>(
        &self,
        store: &S,
        now: DateTime<Utc>,
    ) -> SearchResult<ProfileQuery> {
        let records = store.load_candidates().await?;
        Ok(self.base_query(&records, now))
    }

    /// Standard filters for the criteria
    pub fn filter_set(&self, criteria: &FilterCriteria) -> FilterSet {
        FilterSet::from_criteria(criteria, &self.context)
    }

    /// Sorters for the sort selection, with any ordering the filters require placed first
    ///
    /// A distance sort without its own point falls back to the criteria's point.
    pub fn sorter_set(&self, spec: &SortSpec, filters: &FilterSet, criteria: &FilterCriteria) -> SorterSet {
        let mut spec = spec.clone();
        if spec.point.is_none() {
            spec.point = criteria.point();
        }
        let mut sorters = SorterSet::from_spec(&spec, &self.ranking);
        for companion in filters.companion_sorters().into_iter().rev() {
            sorters.prepend(companion);
        }
        sorters
    }

    /// Text search plus filters, unsorted
    pub fn filtered_query(&self, base: ProfileQuery, request: &SearchRequest) -> ProfileQuery {
        let query = match request.query.as_deref() {
            Some(text) => self.builder.apply_text_search(base, text),
            None => base,
        };
        self.filter_set(&request.filters).apply(query)
    }

    fn page_bounds(&self, page: Option<u32>, per_page: Option<u32>) -> (u32, u32) {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page
            .unwrap_or(self.default_per_page)
            .clamp(1, self.max_per_page);
        (page, per_page)
    }

    /// Full search: text, filters, sort and one page of results
    pub fn search(&self, base: ProfileQuery, request: &SearchRequest) -> SearchPage {
        let candidates = base.len();
        let filters = self.filter_set(&request.filters);
        let query = match request.query.as_deref() {
            Some(text) => self.builder.apply_text_search(base, text),
            None => base,
        };
        let query = filters.apply(query);
        let query = self.sorter_set(&request.sort, &filters, &request.filters).apply(query);

        let (page, per_page) = self.page_bounds(request.page, request.per_page);
        let result = query.paginate(page, per_page);

        tracing::info!(
            "Search completed: {} of {} candidates matched, page {}/{}",
            result.total,
            candidates,
            result.page,
            result.last_page
        );
        result
    }

    /// Search with the advanced filters enabled
    ///
    /// `sort_by` is a sort key name; unknown names fall back to relevance.
    pub fn advanced_search(
        &self,
        base: ProfileQuery,
        criteria: &FilterCriteria,
        sort_by: &str,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> SearchPage {
        let candidates = base.len();
        let spec = SortSpec::new(sort_by.trim().parse().unwrap_or_default());
        let filters = self
            .filter_set(criteria)
            .extend(FilterSet::advanced_from_criteria(criteria));

        let query = filters.apply(base);
        let query = self.sorter_set(&spec, &filters, criteria).apply(query);

        let (page, per_page) = self.page_bounds(page, per_page);
        let result = query.paginate(page, per_page);

        tracing::info!(
            "Advanced search completed: {} of {} candidates matched ({})",
            result.total,
            candidates,
            filters.description()
        );
        result
    }

    /// Relevance-ranked lookup for autocomplete
    pub fn quick_search(&self, base: ProfileQuery, text: &str, limit: usize) -> Vec<QuickResult> {
        let now = base.now();
        let rows = self
            .builder
            .apply_text_search(base, text)
            .order_by(OrderTerm::Field {
                field: SortField::Relevance,
                direction: SortDirection::Desc,
            })
            .take(limit);

        tracing::debug!("Quick search '{}' returned {} results", text, rows.len());
        rows.iter().map(|row| self.formatter.quick(row, now)).collect()
    }

    /// Profiles resembling `profile_id`, never including it
    ///
    /// An unknown id yields an empty list.
    pub fn find_similar(
        &self,
        base: ProfileQuery,
        profile_id: ProfileId,
        limit: usize,
        exclude_ids: &[ProfileId],
    ) -> Vec<SimilarResult> {
        let Some(reference) = base.find(profile_id).map(|row| Arc::clone(&row.profile)) else {
            tracing::warn!("Similar search for unknown profile {}", profile_id);
            return Vec::new();
        };

        let excluded: HashSet<ProfileId> = exclude_ids.iter().copied().collect();
        let rows = self
            .builder
            .apply_similarity(base, &reference)
            .filter(|row| row.id() != profile_id && !excluded.contains(&row.id()))
            .take(limit);

        tracing::info!("Found {} profiles similar to {}", rows.len(), profile_id);
        rows.iter().map(|row| self.formatter.similar(row)).collect()
    }

    /// Profiles within `radius_km` (inclusive) of `point`, nearest first
    pub fn geo_search(
        &self,
        base: ProfileQuery,
        point: GeoPoint,
        radius_km: f64,
        criteria: &FilterCriteria,
        limit: usize,
    ) -> SearchResult<Vec<GeoResult>> {
        if !(radius_km.is_finite() && radius_km > 0.0) {
            return Err(SearchError::InvalidRequest(format!(
                "radius must be positive, got {}",
                radius_km
            )));
        }
        if !(-90.0..=90.0).contains(&point.lat) || !(-180.0..=180.0).contains(&point.lng) {
            return Err(SearchError::InvalidRequest(format!(
                "coordinates out of range: {}, {}",
                point.lat, point.lng
            )));
        }

        let bbox = calculate_bounding_box(point.lat, point.lng, radius_km);
        let rows = self
            .filter_set(criteria)
            .apply(base)
            .filter(|row| {
                row.profile
                    .location
                    .is_some_and(|loc| is_within_bounding_box(loc.lat, loc.lng, &bbox))
            })
            .map_rows(|row| {
                row.distance_km = row.profile.location.map(|loc| distance_between(point, loc));
            })
            .filter(|row| row.distance_km.is_some_and(|d| d <= radius_km))
            .clear_order()
            .order_by(OrderTerm::Distance {
                direction: SortDirection::Asc,
            })
            .take(limit);

        tracing::info!("Geo search found {} profiles within {} km", rows.len(), radius_km);
        Ok(rows.iter().map(|row| self.formatter.geo(row)).collect())
    }

    /// Facet counts for a text query
    pub fn faceted_search(
        &self,
        base: ProfileQuery,
        text: &str,
        dimensions: &[FacetDimension],
    ) -> FacetResult {
        let query = self.builder.apply_text_search(base, text);
        self.facets(&query, dimensions)
    }

    /// Facet counts over an already filtered query
    pub fn facets(&self, query: &ProfileQuery, dimensions: &[FacetDimension]) -> FacetResult {
        let result = self.facets.calculate(query, dimensions);
        tracing::debug!(
            "Computed {} facets over {} candidates",
            result.dimensions().count(),
            query.len()
        );
        result
    }

    /// Render rows as `csv` or `json`
    pub fn export(&self, rows: &[RankedResult], format: &str) -> SearchResult<String> {
        match format.trim().to_lowercase().as_str() {
            "csv" => Ok(self.formatter.to_csv(rows)),
            "json" => Ok(serde_json::to_string_pretty(rows)?),
            other => Err(SearchError::UnsupportedExportFormat(other.to_string())),
        }
    }

    /// Distinct specialties, then names, containing `text` case-insensitively
    ///
    /// Values differing only in case are suggested once, in the spelling seen
    /// first.
    pub fn autocomplete(&self, base: ProfileQuery, text: &str, limit: usize) -> Vec<String> {
        let needle = text.trim().to_lowercase();
        if needle.chars().count() < MIN_AUTOCOMPLETE_CHARS || limit == 0 {
            return Vec::new();
        }

        let rows = base.fetch();
        let specialties = rows.iter().filter_map(|row| row.profile.specialty.as_deref());
        let names = rows.iter().map(|row| row.profile.name.as_str());

        let mut seen = HashSet::new();
        let suggestions: Vec<String> = specialties
            .chain(names)
            .filter(|value| contains_ignore_case(value, &needle))
            .filter(|value| seen.insert(value.to_lowercase()))
            .take(limit)
            .map(str::to_string)
            .collect();

        tracing::debug!("Autocomplete '{}' returned {} suggestions", text, suggestions.len());
        suggestions
    }

    /// Synonym suggestions for the terms of `text`, unique, at most ten
    pub fn related_queries(&self, text: &str) -> Vec<String> {
        let mut related: Vec<String> = Vec::new();
        for term in QueryBuilder::parse_terms(text) {
            let synonyms = SYNONYMS
                .iter()
                .find(|(word, _)| *word == term)
                .map(|(_, synonyms)| *synonyms)
                .unwrap_or_default();
            for synonym in synonyms {
                if !related.iter().any(|r| r == synonym) {
                    related.push(synonym.to_string());
                }
            }
        }
        related.truncate(MAX_RELATED_QUERIES);
        related
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SearchableProfile, SortKey};

    fn base() -> ProfileQuery {
        let profiles = vec![
            SearchableProfile {
                id: 1,
                name: "Анна".into(),
                specialty: Some("массаж".into()),
                city: Some("Москва".into()),
                location: Some(GeoPoint::new(55.7558, 37.6173)),
                min_price: Some(2000.0),
                ..Default::default()
            },
            SearchableProfile {
                id: 2,
                name: "Мария".into(),
                specialty: Some("маникюр".into()),
                city: Some("Москва".into()),
                location: Some(GeoPoint::new(55.80, 37.70)),
                min_price: Some(1200.0),
                ..Default::default()
            },
            SearchableProfile {
                id: 3,
                name: "Олег".into(),
                specialty: Some("массаж".into()),
                city: Some("Санкт-Петербург".into()),
                location: Some(GeoPoint::new(59.9343, 30.3351)),
                min_price: Some(3000.0),
                ..Default::default()
            },
        ];
        ProfileQuery::from_profiles(profiles, Utc::now())
    }

    #[tokio::test]
    async fn test_load_base_from_store() {
        let store = crate::services::InMemoryStore::from_json_str(
            r#"{"profiles": [{"id": 7, "name": "Анна"}, {"id": 8, "is_active": false}]}"#,
        )
        .unwrap();
        let base = SearchEngine::default().load_base(&store, Utc::now()).await.unwrap();
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn test_search_text_and_sort() {
        let request = SearchRequest {
            query: Some("массаж".into()),
            sort: SortSpec::new(SortKey::PriceDesc),
            ..Default::default()
        };
        let page = SearchEngine::default().search(base(), &request);

        let ids: Vec<_> = page.items.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|r| r.relevance_score.is_some()));
    }

    #[test]
    fn test_radius_search_orders_by_distance_first() {
        let request = SearchRequest {
            filters: FilterCriteria {
                lat: Some(55.80),
                lng: Some(37.70),
                radius: Some(50.0),
                ..Default::default()
            },
            sort: SortSpec::new(SortKey::PriceAsc),
            ..Default::default()
        };
        let page = SearchEngine::default().search(base(), &request);

        let ids: Vec<_> = page.items.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_advanced_search_unknown_sort_falls_back() {
        let criteria = FilterCriteria {
            exclude_ids: vec![2],
            ..Default::default()
        };
        let page = SearchEngine::default().advanced_search(base(), &criteria, "bogus", None, None);
        assert_eq!(page.total, 2);
    }

    #[test]
    fn test_geo_search_rejects_bad_radius() {
        let result = SearchEngine::default().geo_search(
            base(),
            GeoPoint::new(55.75, 37.61),
            0.0,
            &FilterCriteria::default(),
            10,
        );
        assert!(matches!(result, Err(SearchError::InvalidRequest(_))));
    }

    #[test]
    fn test_export_formats() {
        let engine = SearchEngine::default();
        let rows = base().fetch();

        assert!(engine.export(&rows, "csv").unwrap().starts_with("ID,"));
        assert!(engine.export(&rows, "json").unwrap().starts_with('['));
        assert!(matches!(
            engine.export(&rows, "xlsx"),
            Err(SearchError::UnsupportedExportFormat(f)) if f == "xlsx"
        ));
    }

    #[test]
    fn test_related_queries() {
        let engine = SearchEngine::default();
        assert_eq!(
            engine.related_queries("Массаж спа"),
            vec!["релакс", "спа", "терапия", "массаж", "процедуры"]
        );
        assert!(engine.related_queries("стрижка").is_empty());
    }

    #[test]
    fn test_autocomplete_specialties_then_names() {
        let engine = SearchEngine::default();

        assert_eq!(engine.autocomplete(base(), "МА", 10), vec!["массаж", "маникюр", "Мария"]);
        assert_eq!(engine.autocomplete(base(), "ма", 2), vec!["массаж", "маникюр"]);
        assert_eq!(engine.autocomplete(base(), " олег ", 10), vec!["Олег"]);
        assert!(engine.autocomplete(base(), "м", 10).is_empty());
        assert!(engine.autocomplete(base(), "йога", 10).is_empty());
    }
}
