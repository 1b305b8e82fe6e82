// Integration tests for Provider Search

use chrono::Utc;
use provider_search::core::{EngineOptions, FacetDimension, ProfileQuery, SearchEngine};
use provider_search::models::{FilterCriteria, GeoPoint, SearchRequest, SortKey, SortSpec};
use provider_search::services::{InMemoryStore, ProfileStore};
use provider_search::SearchError;
use serde_json::json;

const FIXTURE: &str = r#"{
    "profiles": [
        {"id": 1, "name": "Анна", "specialty": "массаж", "city": "Москва",
         "location": {"lat": 55.7558, "lng": 37.6173}, "min_price": 2000.0,
         "experience_years": 5, "is_verified": true, "category_id": 11},
        {"id": 2, "name": "Мария", "specialty": "маникюр", "city": "Москва",
         "location": {"lat": 55.80, "lng": 37.70}, "min_price": 1200.0,
         "experience_years": 2, "category_id": 20},
        {"id": 3, "name": "Олег", "specialty": "массаж", "city": "Санкт-Петербург",
         "location": {"lat": 59.9343, "lng": 30.3351}, "min_price": 7000.0,
         "experience_years": 8},
        {"id": 4, "name": "Елена", "specialty": "Массаж", "city": "Москва",
         "location": {"lat": 55.76, "lng": 37.62}, "min_price": 2100.0,
         "experience_years": 5},
        {"id": 5, "name": "Скрытый", "specialty": "массаж", "is_active": false},
        {"id": 6, "name": "Клиент", "is_provider": false}
    ],
    "listings": [
        {"id": 100, "profile_id": 1, "price": 2500.0, "category_id": 11},
        {"id": 101, "profile_id": 2, "price": 900.0, "is_published": false}
    ],
    "reviews": [
        {"profile_id": 1, "rating": 5.0},
        {"profile_id": 1, "rating": 5.0},
        {"profile_id": 1, "rating": 4.0},
        {"profile_id": 3, "rating": 4.0},
        {"profile_id": 4, "rating": 5.0}
    ],
    "media": [
        {"profile_id": 1, "kind": "avatar", "url": "https://cdn.example.com/1.jpg"}
    ],
    "categories": [
        {"id": 11, "parent_id": 10}
    ]
}"#;

async fn create_engine() -> (SearchEngine, ProfileQuery) {
    let store = InMemoryStore::from_json_str(FIXTURE).unwrap();
    let records = store.load_candidates().await.unwrap();
    let tree = store.load_category_tree().await.unwrap().unwrap();

    let options = EngineOptions {
        base_url: "https://example.com".to_string(),
        ..Default::default()
    };
    let engine = SearchEngine::new(options.with_category_tree(tree));
    let base = engine.base_query(&records, Utc::now());
    (engine, base)
}

fn ids<T>(items: &[T], id: impl Fn(&T) -> u64) -> Vec<u64> {
    items.iter().map(id).collect()
}

#[tokio::test]
async fn test_base_query_aggregates_records() {
    let (_, base) = create_engine().await;

    assert_eq!(base.len(), 4);
    assert!(base.find(5).is_none());
    assert!(base.find(6).is_none());

    let anna = &base.find(1).unwrap().profile;
    assert_eq!(anna.review_count, 3);
    assert_eq!(anna.listing_count, 1);
    assert!((anna.rating.unwrap() - 14.0 / 3.0).abs() < 1e-9);
    assert_eq!(anna.avatar_url(), Some("https://cdn.example.com/1.jpg"));

    let maria = &base.find(2).unwrap().profile;
    assert_eq!(maria.listing_count, 0);
    assert_eq!(maria.rating, None);
}

#[tokio::test]
async fn test_integration_end_to_end_search() {
    let (engine, base) = create_engine().await;
    let request = SearchRequest {
        query: Some("массаж".into()),
        filters: FilterCriteria {
            city: Some("москва".into()),
            ..Default::default()
        },
        sort: SortSpec::new(SortKey::Rating),
        ..Default::default()
    };

    let page = engine.search(base, &request);

    assert_eq!(page.total, 2);
    assert_eq!(ids(&page.items, |r| r.id()), vec![1, 4]);
}

#[tokio::test]
async fn test_search_pagination() {
    let (engine, base) = create_engine().await;
    let request = SearchRequest {
        sort: SortSpec::new(SortKey::PriceAsc),
        page: Some(2),
        per_page: Some(3),
        ..Default::default()
    };

    let page = engine.search(base, &request);

    assert_eq!(page.total, 4);
    assert_eq!(page.last_page, 2);
    assert_eq!(ids(&page.items, |r| r.id()), vec![3]);
}

#[tokio::test]
async fn test_lenient_request_parsing() {
    let (engine, base) = create_engine().await;
    let request: SearchRequest = serde_json::from_value(json!({
        "q": "массаж",
        "price_range": "cheap",
        "rating": "excellent",
        "sort": "price_desc",
        "per_page": "2"
    }))
    .unwrap();

    let page = engine.search(base, &request);

    assert_eq!(page.total, 3);
    assert_eq!(page.per_page, 2);
    assert_eq!(ids(&page.items, |r| r.id()), vec![3, 4]);
}

#[tokio::test]
async fn test_category_filter_expands_subcategories() {
    let (engine, base) = create_engine().await;
    let criteria = FilterCriteria {
        category_ids: vec![10],
        include_subcategories: true,
        ..Default::default()
    };

    let rows = engine.filter_set(&criteria).apply(base.clone()).fetch();
    assert_eq!(ids(&rows, |r| r.id()), vec![1]);

    let exact = FilterCriteria {
        include_subcategories: false,
        ..criteria
    };
    assert!(engine.filter_set(&exact).apply(base).is_empty());
}

#[tokio::test]
async fn test_radius_filter_orders_by_distance() {
    let (engine, base) = create_engine().await;
    let request = SearchRequest {
        filters: FilterCriteria {
            lat: Some(55.7558),
            lng: Some(37.6173),
            radius: Some(10.0),
            ..Default::default()
        },
        sort: SortSpec::new(SortKey::PriceDesc),
        ..Default::default()
    };

    let page = engine.search(base, &request);

    assert_eq!(ids(&page.items, |r| r.id()), vec![1, 4, 2]);
    let distances: Vec<f64> = page.items.iter().filter_map(|r| r.distance_km).collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_geo_search() {
    let (engine, base) = create_engine().await;

    let results = engine
        .geo_search(
            base.clone(),
            GeoPoint::new(55.7558, 37.6173),
            10.0,
            &FilterCriteria::default(),
            2,
        )
        .unwrap();
    assert_eq!(ids(&results, |r| r.id), vec![1, 4]);
    assert_eq!(results[0].distance, 0.0);

    let invalid = engine.geo_search(
        base,
        GeoPoint::new(95.0, 37.6173),
        10.0,
        &FilterCriteria::default(),
        10,
    );
    assert!(matches!(invalid, Err(SearchError::InvalidRequest(_))));
}

#[tokio::test]
async fn test_find_similar() {
    let (engine, base) = create_engine().await;

    let similar = engine.find_similar(base.clone(), 1, 10, &[]);
    assert_eq!(ids(&similar, |r| r.id), vec![4]);
    assert_eq!(similar[0].similarity_score, 9);
    assert_eq!(similar[0].url, "https://example.com/masters/4");

    assert!(engine.find_similar(base.clone(), 1, 10, &[4]).is_empty());
    assert!(engine.find_similar(base, 999, 10, &[]).is_empty());
}

#[tokio::test]
async fn test_faceted_search() {
    let (engine, base) = create_engine().await;

    let facets = engine.faceted_search(
        base.clone(),
        "массаж",
        &[FacetDimension::Cities, FacetDimension::Ratings],
    );
    let cities = facets.counts(FacetDimension::Cities);
    assert_eq!(cities.get("Москва"), Some(&2));
    assert_eq!(cities.get("Санкт-Петербург"), Some(&1));

    let ratings = facets.counts(FacetDimension::Ratings);
    assert_eq!(ratings.get("4.5+"), Some(&2));
    assert_eq!(ratings.get("4.0+"), Some(&3));
    assert!(facets.get(FacetDimension::Genders).is_none());

    let all = engine.faceted_search(base, "", &[]);
    assert_eq!(all.dimensions().count(), FacetDimension::ALL.len());
}

#[tokio::test]
async fn test_facets_after_filters() {
    let (engine, base) = create_engine().await;
    let criteria = FilterCriteria {
        price_min: Some(1500.0),
        price_max: Some(6000.0),
        ..Default::default()
    };

    let filtered = engine.filter_set(&criteria).apply(base);
    let prices = engine
        .facets(&filtered, &[FacetDimension::PriceRanges])
        .counts(FacetDimension::PriceRanges);

    assert_eq!(prices.get("1500-2500"), Some(&2));
    assert_eq!(prices.values().sum::<usize>(), 2);
}

#[tokio::test]
async fn test_quick_search_and_export() {
    let (engine, base) = create_engine().await;

    let quick = engine.quick_search(base.clone(), "анна", 5);
    assert_eq!(quick.len(), 1);
    assert_eq!(quick[0].id, 1);
    assert_eq!(quick[0].avatar.as_deref(), Some("https://cdn.example.com/1.jpg"));

    let rows = base.take(2);
    let csv = engine.export(&rows, "CSV").unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.starts_with("ID,Имя,"));

    let json = engine.export(&rows, "json").unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_autocomplete_dedupes_and_skips_hidden_profiles() {
    let (engine, base) = create_engine().await;

    assert_eq!(engine.autocomplete(base.clone(), "масс", 10), vec!["массаж"]);
    assert_eq!(engine.autocomplete(base.clone(), "ЕЛЕ", 10), vec!["Елена"]);
    assert!(engine.autocomplete(base.clone(), "скрыт", 10).is_empty());
    assert!(engine.autocomplete(base, "а", 10).is_empty());
}

#[tokio::test]
async fn test_advanced_search() {
    let (engine, base) = create_engine().await;
    let criteria: FilterCriteria = serde_json::from_value(json!({
        "exclude_ids": "3, 4",
        "verified": true
    }))
    .unwrap();

    let page = engine.advanced_search(base, &criteria, "rating", None, None);
    assert_eq!(ids(&page.items, |r| r.id()), vec![1]);
}
