//! Projection of ranked rows into output shapes.

use crate::core::filters::ONLINE_WINDOW_MINUTES;
use crate::models::{CsvRow, GeoResult, ProfileId, QuickResult, RankedResult, SimilarResult};
use chrono::{DateTime, Duration, Utc};

pub const CSV_HEADERS: [&str; 11] = [
    "ID",
    "Имя",
    "Специализация",
    "Город",
    "Рейтинг",
    "Количество отзывов",
    "Опыт (лет)",
    "Минимальная цена",
    "Проверен",
    "Дата регистрации",
    "URL",
];

/// Pure row formatting; every time-relative field is computed against `now`
#[derive(Debug, Clone)]
pub struct ResultFormatter {
    base_url: String,
    online_window: Duration,
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new("", Duration::minutes(ONLINE_WINDOW_MINUTES))
    }
}

impl ResultFormatter {
    pub fn new(base_url: impl Into<String>, online_window: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            online_window,
        }
    }

    pub fn profile_url(&self, id: ProfileId) -> String {
        format!("{}/masters/{}", self.base_url, id)
    }

    pub fn is_online(&self, row: &RankedResult, now: DateTime<Utc>) -> bool {
        row.profile
            .last_activity_at
            .is_some_and(|t| t >= now - self.online_window)
    }

    pub fn quick(&self, row: &RankedResult, now: DateTime<Utc>) -> QuickResult {
        let p = &row.profile;
        QuickResult {
            id: p.id,
            name: p.name.clone(),
            specialty: p.specialty.clone(),
            city: p.city.clone(),
            rating: p.rating,
            reviews_count: p.review_count,
            min_price: p.min_price,
            avatar: p.avatar_url().map(str::to_string),
            is_online: self.is_online(row, now),
            url: self.profile_url(p.id),
        }
    }

    pub fn similar(&self, row: &RankedResult) -> SimilarResult {
        let p = &row.profile;
        SimilarResult {
            id: p.id,
            name: p.name.clone(),
            specialty: p.specialty.clone(),
            city: p.city.clone(),
            rating: p.rating,
            reviews_count: p.review_count,
            experience_years: p.experience_years,
            min_price: p.min_price,
            similarity_score: row.similarity_score.unwrap_or(0),
            avatar: p.avatar_url().map(str::to_string),
            url: self.profile_url(p.id),
        }
    }

    pub fn geo(&self, row: &RankedResult) -> GeoResult {
        let p = &row.profile;
        GeoResult {
            id: p.id,
            name: p.name.clone(),
            specialty: p.specialty.clone(),
            city: p.city.clone(),
            address: p.address.clone(),
            latitude: p.location.map(|l| l.lat),
            longitude: p.location.map(|l| l.lng),
            distance: round2(row.distance_km.unwrap_or(0.0)),
            rating: p.rating,
            min_price: p.min_price,
            url: self.profile_url(p.id),
        }
    }

    pub fn csv_row(&self, row: &RankedResult) -> CsvRow {
        let p = &row.profile;
        let optional = |v: Option<String>| v.unwrap_or_default();
        CsvRow {
            id: p.id.to_string(),
            name: p.name.clone(),
            specialty: optional(p.specialty.clone()),
            city: optional(p.city.clone()),
            rating: optional(p.rating.map(|r| format_number(round2(r)))),
            reviews_count: p.review_count.to_string(),
            experience_years: optional(p.experience_years.map(|e| e.to_string())),
            min_price: optional(p.min_price.map(format_number)),
            verified: if p.is_verified { "Да" } else { "Нет" }.to_string(),
            registered_at: p.registered_at.format("%d.%m.%Y").to_string(),
            url: self.profile_url(p.id),
        }
    }

    pub fn csv_headers(&self) -> &'static [&'static str] {
        &CSV_HEADERS
    }

    /// Header line plus one line per row, `\n` terminated
    pub fn to_csv(&self, rows: &[RankedResult]) -> String {
        let mut output = csv_line(CSV_HEADERS.iter().copied());
        for row in rows {
            let record = self.csv_row(row);
            output.push_str(&csv_line(record.cells().iter().copied()));
        }
        output
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Integral values print without a fractional part
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Quote a cell when it contains a delimiter, quote or line break (RFC 4180)
fn csv_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn csv_line<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    let mut line = cells.map(csv_cell).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, MediaItem, MediaKind, SearchableProfile};
    use chrono::TimeZone;

    fn row() -> RankedResult {
        let profile = SearchableProfile {
            id: 42,
            name: "Анна, массаж".into(),
            specialty: Some("массаж".into()),
            city: Some("Москва".into()),
            location: Some(GeoPoint::new(55.75, 37.61)),
            rating: Some(4.756),
            review_count: 12,
            min_price: Some(2500.0),
            is_verified: true,
            registered_at: Utc.with_ymd_and_hms(2023, 3, 9, 10, 0, 0).unwrap(),
            last_activity_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 11, 50, 0).unwrap()),
            media: vec![MediaItem { kind: MediaKind::Avatar, url: "/a/42.jpg".into() }],
            ..Default::default()
        };
        let mut row = RankedResult::new(profile);
        row.distance_km = Some(1.23456);
        row
    }

    fn formatter() -> ResultFormatter {
        ResultFormatter::new("https://example.test/", Duration::minutes(15))
    }

    #[test]
    fn test_quick_online_flag() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let quick = formatter().quick(&row(), now);

        assert!(quick.is_online);
        assert_eq!(quick.avatar.as_deref(), Some("/a/42.jpg"));
        assert_eq!(quick.url, "https://example.test/masters/42");

        let later = now + Duration::hours(1);
        assert!(!formatter().quick(&row(), later).is_online);
    }

    #[test]
    fn test_geo_rounds_distance() {
        let geo = formatter().geo(&row());
        assert_eq!(geo.distance, 1.23);
        assert_eq!(geo.latitude, Some(55.75));
    }

    #[test]
    fn test_csv_row_localization() {
        let csv = formatter().csv_row(&row());
        assert_eq!(csv.verified, "Да");
        assert_eq!(csv.registered_at, "09.03.2023");
        assert_eq!(csv.min_price, "2500");
        assert_eq!(csv.rating, "4.76");
    }

    #[test]
    fn test_csv_quotes_cells_with_commas() {
        let output = formatter().to_csv(&[row()]);
        let lines: Vec<_> = output.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID,Имя,Специализация"));
        assert!(lines[1].starts_with("42,\"Анна, массаж\",массаж,Москва"));
    }
}
