use serde::Deserialize;

use crate::traits::ArtworkItem;

/// Base URL for poster images.
pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// Full poster URL for a TMDB `poster_path`.
pub fn poster_url(path: &str) -> String {
    format!("{IMAGE_BASE_URL}{path}")
}

#[derive(Debug, Deserialize)]
pub struct TmdbSearchResponse {
    #[serde(default)]
    pub results: Vec<TmdbRecord>,
}

/// A TV series or movie record. Series carry `name`, movies carry `title`.
#[derive(Debug, Deserialize)]
pub struct TmdbRecord {
    pub id: u64,
    pub name: Option<String>,
    pub title: Option<String>,
    pub poster_path: Option<String>,
}

impl From<TmdbRecord> for ArtworkItem {
    fn from(r: TmdbRecord) -> Self {
        Self {
            id: r.id,
            title: r.name.or(r.title).unwrap_or_default(),
            poster_url: r.poster_path.as_deref().map(poster_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_tv_search() {
        let json = r#"{
            "page": 1,
            "results": [
                { "id": 94605, "name": "Arcane", "poster_path": "/fqldf2t8ztc9aiwn3k6mlX3tvRT.jpg", "first_air_date": "2021-11-06" },
                { "id": 1, "name": "Arcane Odyssey", "poster_path": null }
            ],
            "total_results": 2
        }"#;
        let resp: TmdbSearchResponse = serde_json::from_str(json).unwrap();
        let items: Vec<ArtworkItem> = resp.results.into_iter().map(Into::into).collect();
        assert_eq!(items[0].id, 94605);
        assert_eq!(items[0].title, "Arcane");
        assert_eq!(
            items[0].poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/fqldf2t8ztc9aiwn3k6mlX3tvRT.jpg")
        );
        assert!(items[1].poster_url.is_none());
    }

    #[test]
    fn test_movie_uses_title() {
        let record: TmdbRecord =
            serde_json::from_str(r#"{ "id": 661374, "title": "Glass Onion" }"#).unwrap();
        assert_eq!(ArtworkItem::from(record).title, "Glass Onion");
    }
}
