use super::store::{ProfileStore, StoreError};
use crate::config::DatabaseSettings;
use crate::core::filters::CategoryTree;
use crate::models::{
    CandidateRecords, GeoPoint, ListingRecord, ListingSummary, MediaItem, MediaKind, MediaRecord,
    ProviderRecord, ReviewRecord, SearchableProfile,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

const PROFILES_QUERY: &str = r#"
    SELECT
        u.id::int8 AS id,
        u.name,
        u.specialty,
        u.description,
        u.services_description,
        u.city,
        u.region,
        u.district,
        u.address,
        u.metro_stations,
        u.latitude::float8 AS latitude,
        u.longitude::float8 AS longitude,
        u.min_price::float8 AS min_price,
        u.experience_years::int8 AS experience_years,
        u.is_verified,
        u.is_premium,
        u.is_available,
        u.gender,
        u.birth_date,
        u.languages,
        u.category_id::int8 AS category_id,
        ARRAY(
            SELECT uc.category_id::int8 FROM user_categories uc WHERE uc.user_id = u.id
        ) AS category_ids,
        u.category_type,
        u.certificate_count::int8 AS certificate_count,
        u.views_count::int8 AS views_count,
        u.bookings_count::int8 AS bookings_count,
        u.last_activity_at,
        u.created_at,
        u.is_active,
        u.is_provider
    FROM users u
    WHERE u.is_active AND u.is_provider
"#;

const LISTINGS_QUERY: &str = r#"
    SELECT
        a.id::int8 AS id,
        a.user_id::int8 AS profile_id,
        a.price::float8 AS price,
        a.category_id::int8 AS category_id,
        a.city,
        a.district,
        a.metro_station,
        a.has_discount,
        a.is_featured,
        a.created_at,
        a.is_active,
        a.is_published
    FROM ads a
    WHERE a.is_active AND a.is_published
"#;

const REVIEWS_QUERY: &str = r#"
    SELECT r.reviewed_user_id::int8 AS profile_id, r.rating::float8 AS rating
    FROM reviews r
"#;

const MEDIA_QUERY: &str = r#"
    SELECT m.model_id::int8 AS profile_id, m.type AS kind, m.url
    FROM media m
    WHERE m.type IN ('avatar', 'portfolio')
"#;

const CATEGORIES_QUERY: &str = r#"
    SELECT c.id::int8 AS id, c.parent_id::int8 AS parent_id
    FROM categories c
    WHERE c.parent_id IS NOT NULL
"#;

fn to_id(value: i64) -> u64 {
    value.max(0) as u64
}

fn to_u32(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

fn to_count(value: Option<i64>) -> u32 {
    to_u32(value.unwrap_or(0))
}

fn map_profile(row: &PgRow) -> Result<ProviderRecord, sqlx::Error> {
    let latitude: Option<f64> = row.try_get("latitude")?;
    let longitude: Option<f64> = row.try_get("longitude")?;
    let experience: Option<i64> = row.try_get("experience_years")?;
    let category_ids: Vec<i64> = row.try_get("category_ids")?;

    let profile = SearchableProfile {
        id: to_id(row.try_get("id")?),
        name: row.try_get::<Option<String>, _>("name")?.unwrap_or_default(),
        specialty: row.try_get("specialty")?,
        description: row.try_get("description")?,
        services_description: row.try_get("services_description")?,
        city: row.try_get("city")?,
        region: row.try_get("region")?,
        district: row.try_get("district")?,
        address: row.try_get("address")?,
        metro_stations: row
            .try_get::<Option<Vec<String>>, _>("metro_stations")?
            .unwrap_or_default(),
        location: latitude.zip(longitude).map(|(lat, lng)| GeoPoint::new(lat, lng)),
        min_price: row.try_get("min_price")?,
        experience_years: experience.map(to_u32),
        is_verified: row.try_get::<Option<bool>, _>("is_verified")?.unwrap_or(false),
        is_premium: row.try_get::<Option<bool>, _>("is_premium")?.unwrap_or(false),
        is_available: row.try_get::<Option<bool>, _>("is_available")?.unwrap_or(false),
        gender: row.try_get("gender")?,
        birth_date: row.try_get("birth_date")?,
        languages: row.try_get("languages")?,
        category_id: row.try_get::<Option<i64>, _>("category_id")?.map(to_id),
        category_ids: category_ids.into_iter().map(to_id).collect(),
        category_type: row.try_get("category_type")?,
        certificate_count: to_count(row.try_get("certificate_count")?),
        views_count: to_id(row.try_get::<Option<i64>, _>("views_count")?.unwrap_or(0)),
        bookings_count: to_id(row.try_get::<Option<i64>, _>("bookings_count")?.unwrap_or(0)),
        last_activity_at: row.try_get("last_activity_at")?,
        registered_at: row.try_get("created_at")?,
        ..Default::default()
    };

    Ok(ProviderRecord {
        profile,
        is_active: row.try_get("is_active")?,
        is_provider: row.try_get("is_provider")?,
    })
}

fn map_listing(row: &PgRow) -> Result<ListingRecord, sqlx::Error> {
    Ok(ListingRecord {
        profile_id: to_id(row.try_get("profile_id")?),
        listing: ListingSummary {
            id: to_id(row.try_get("id")?),
            price: row.try_get("price")?,
            category_id: row.try_get::<Option<i64>, _>("category_id")?.map(to_id),
            city: row.try_get("city")?,
            district: row.try_get("district")?,
            metro_station: row.try_get("metro_station")?,
            has_discount: row.try_get::<Option<bool>, _>("has_discount")?.unwrap_or(false),
            is_featured: row.try_get::<Option<bool>, _>("is_featured")?.unwrap_or(false),
            created_at: row.try_get("created_at")?,
        },
        is_active: row.try_get("is_active")?,
        is_published: row.try_get("is_published")?,
    })
}

fn map_media(row: &PgRow) -> Result<MediaRecord, sqlx::Error> {
    let kind = match row.try_get::<String, _>("kind")?.as_str() {
        "avatar" => MediaKind::Avatar,
        "portfolio" => MediaKind::Portfolio,
        _ => MediaKind::Other,
    };
    Ok(MediaRecord {
        profile_id: to_id(row.try_get("profile_id")?),
        media: MediaItem {
            kind,
            url: row.try_get("url")?,
        },
    })
}

/// PostgreSQL-backed profile store
///
/// Loads the raw rows the query builder aggregates. Schema management lives
/// with the profile-management service, so no migrations are run here.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new store from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a new store from settings
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        let url = settings
            .url
            .as_deref()
            .ok_or_else(|| StoreError::NotFound("database.url".to_string()))?;
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            settings.max_connections.unwrap_or(10),
            settings.min_connections.unwrap_or(1),
            Duration::from_secs(settings.acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(settings.idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

impl ProfileStore for PostgresStore {
    async fn load_candidates(&self) -> Result<CandidateRecords, StoreError> {
        let (profiles, listings, reviews, media) = tokio::try_join!(
            sqlx::query(PROFILES_QUERY).fetch_all(&self.pool),
            sqlx::query(LISTINGS_QUERY).fetch_all(&self.pool),
            sqlx::query(REVIEWS_QUERY).fetch_all(&self.pool),
            sqlx::query(MEDIA_QUERY).fetch_all(&self.pool),
        )?;

        let records = CandidateRecords {
            profiles: profiles.iter().map(map_profile).collect::<Result<_, _>>()?,
            listings: listings.iter().map(map_listing).collect::<Result<_, _>>()?,
            reviews: reviews
                .iter()
                .map(|row| -> Result<ReviewRecord, sqlx::Error> {
                    Ok(ReviewRecord {
                        profile_id: to_id(row.try_get("profile_id")?),
                        rating: row.try_get("rating")?,
                    })
                })
                .collect::<Result<_, _>>()?,
            media: media.iter().map(map_media).collect::<Result<_, _>>()?,
        };

        tracing::debug!(
            "Loaded {} profiles, {} listings, {} reviews, {} media from PostgreSQL",
            records.profiles.len(),
            records.listings.len(),
            records.reviews.len(),
            records.media.len()
        );

        Ok(records)
    }

    async fn load_category_tree(&self) -> Result<Option<CategoryTree>, StoreError> {
        let rows = sqlx::query(CATEGORIES_QUERY).fetch_all(&self.pool).await?;
        let pairs = rows
            .iter()
            .map(|row| -> Result<(u64, u64), sqlx::Error> {
                let id: i64 = row.try_get("id")?;
                let parent: i64 = row.try_get("parent_id")?;
                Ok((to_id(parent), to_id(id)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(CategoryTree::from_pairs(pairs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_and_count_conversion() {
        assert_eq!(to_id(42), 42);
        assert_eq!(to_id(-1), 0);
        assert_eq!(to_count(None), 0);
        assert_eq!(to_count(Some(7)), 7);
    }

    #[test]
    fn test_large_values_saturate() {
        assert_eq!(to_u32(-5), 0);
        assert_eq!(to_u32(u32::MAX as i64 + 1), u32::MAX);
        assert_eq!(to_u32(i64::MAX), u32::MAX);
        assert_eq!(to_count(Some(1 << 40)), u32::MAX);
    }
}
