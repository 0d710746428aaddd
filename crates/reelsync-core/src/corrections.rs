//! User-pinned catalog items, keyed by the exact title they override.

use std::collections::BTreeMap;

use url::Url;

use reelsync_api::{CatalogItem, CatalogService, MediaKind};

use crate::error::CoreError;
use crate::models::catalog_kind;
use crate::store::{get_json, keys, set_json, StateStore};

pub type Corrections = BTreeMap<String, CatalogItem>;

/// A parsed correction input: catalog id or slug, with the kind when the
/// input was a catalog URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionTarget {
    pub kind: Option<MediaKind>,
    pub id_or_slug: String,
}

/// Accepts `169420`, `arcane`, `https://trakt.tv/shows/arcane`,
/// `trakt.tv/movies/glass-onion-2022` and similar.
pub fn parse_correction_input(input: &str) -> Option<CorrectionTarget> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if input.contains('/') {
        let url = Url::parse(input)
            .or_else(|_| Url::parse(&format!("https://{input}")))
            .ok()?;
        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
        return segments.windows(2).find_map(|pair| {
            let kind = match pair[0] {
                "shows" => MediaKind::Show,
                "movies" => MediaKind::Movie,
                _ => return None,
            };
            Some(CorrectionTarget {
                kind: Some(kind),
                id_or_slug: pair[1].to_string(),
            })
        });
    }

    Some(CorrectionTarget {
        kind: None,
        id_or_slug: input.to_string(),
    })
}

pub async fn load<S: StateStore>(store: &S) -> Result<Corrections, CoreError> {
    Ok(get_json(store, keys::CORRECTIONS).await?.unwrap_or_default())
}

/// The pinned item for a parsed title, falling back to the raw page title.
pub async fn lookup<S: StateStore>(
    store: &S,
    parsed_title: &str,
    raw_title: &str,
) -> Result<Option<CatalogItem>, CoreError> {
    let mut all = load(store).await?;
    Ok(all.remove(parsed_title).or_else(|| all.remove(raw_title)))
}

/// Resolve `input` to a catalog item and pin it under `original_title`,
/// replacing any earlier correction for that title.
#[tracing::instrument(skip(store, catalog))]
pub async fn set_correction<S, C>(
    store: &S,
    catalog: &C,
    original_title: &str,
    input: &str,
) -> Result<CatalogItem, CoreError>
where
    S: StateStore,
    C: CatalogService,
{
    let original_title = original_title.trim();
    if original_title.is_empty() {
        return Err(CoreError::Correction("empty title".into()));
    }
    let target = parse_correction_input(input)
        .ok_or_else(|| CoreError::Correction(format!("unrecognized input: {input}")))?;

    // Catalog ids are scoped per kind: a bare id or slug is tried as the kind
    // the title itself parses to first.
    let kinds = match target.kind {
        Some(kind) => vec![kind],
        None => {
            let first = reelsync_parse::parse(original_title)
                .map(|guess| catalog_kind(&guess))
                .unwrap_or(MediaKind::Show);
            vec![first, other_kind(first)]
        }
    };

    let mut found = None;
    for kind in kinds {
        let details = catalog
            .item_details(kind, &target.id_or_slug)
            .await
            .map_err(CoreError::from_service)?;
        if details.is_some() {
            found = details;
            break;
        }
    }
    let item = found.ok_or_else(|| {
        CoreError::Correction(format!("{} not found in catalog", target.id_or_slug))
    })?;

    let mut all = load(store).await?;
    all.insert(original_title.to_string(), item.clone());
    set_json(store, keys::CORRECTIONS, &all).await?;
    tracing::info!(title = original_title, pinned = %item.title, "Correction saved");
    Ok(item)
}

fn other_kind(kind: MediaKind) -> MediaKind {
    match kind {
        MediaKind::Show => MediaKind::Movie,
        MediaKind::Movie => MediaKind::Show,
    }
}

/// Drop the correction for a title. Returns whether one existed.
pub async fn remove_correction<S: StateStore>(store: &S, title: &str) -> Result<bool, CoreError> {
    let mut all = load(store).await?;
    let existed = all.remove(title).is_some();
    if existed {
        set_json(store, keys::CORRECTIONS, &all).await?;
    }
    Ok(existed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{item, FakeCatalog};

    #[test]
    fn test_parse_inputs() {
        assert_eq!(
            parse_correction_input(" 169420 "),
            Some(CorrectionTarget {
                kind: None,
                id_or_slug: "169420".into()
            })
        );
        assert_eq!(
            parse_correction_input("https://trakt.tv/shows/arcane?foo=bar"),
            Some(CorrectionTarget {
                kind: Some(MediaKind::Show),
                id_or_slug: "arcane".into()
            })
        );
        assert_eq!(
            parse_correction_input("trakt.tv/movies/glass-onion-2022/"),
            Some(CorrectionTarget {
                kind: Some(MediaKind::Movie),
                id_or_slug: "glass-onion-2022".into()
            })
        );
        assert!(parse_correction_input("https://trakt.tv/users/me").is_none());
        assert!(parse_correction_input("   ").is_none());
    }

    #[tokio::test]
    async fn test_set_and_lookup() {
        let store = MemoryStore::new();
        let catalog = FakeCatalog::default()
            .with_details("arcane", item(MediaKind::Show, "Arcane", 169420, Some(2021)));

        let pinned = set_correction(&store, &catalog, "Arcane League", "https://trakt.tv/shows/arcane")
            .await
            .unwrap();
        assert_eq!(pinned.ids.trakt, 169420);

        let hit = lookup(&store, "Arcane League", "Arcane League - Episode 1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.title, "Arcane");

        // The raw title is only a fallback key.
        let raw_hit = lookup(&store, "Something Else", "Arcane League")
            .await
            .unwrap();
        assert!(raw_hit.is_some());
        assert!(lookup(&store, "Nope", "Nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_and_remove() {
        let store = MemoryStore::new();
        let catalog = FakeCatalog::default()
            .with_details("1", item(MediaKind::Show, "One", 1, None))
            .with_details("2", item(MediaKind::Show, "Two", 2, None));

        set_correction(&store, &catalog, "Foo", "1").await.unwrap();
        set_correction(&store, &catalog, "Foo", "2").await.unwrap();
        assert_eq!(load(&store).await.unwrap().len(), 1);
        assert_eq!(lookup(&store, "Foo", "").await.unwrap().unwrap().title, "Two");

        assert!(remove_correction(&store, "Foo").await.unwrap());
        assert!(!remove_correction(&store, "Foo").await.unwrap());
    }

    #[tokio::test]
    async fn test_bare_id_prefers_title_kind() {
        let store = MemoryStore::new();
        let catalog = FakeCatalog::default()
            .with_details("481233", item(MediaKind::Show, "Some Unrelated Show", 481233, None))
            .with_details("481233", item(MediaKind::Movie, "Glass Onion", 481233, Some(2022)));

        let movie = set_correction(&store, &catalog, "Glass Onion", "481233")
            .await
            .unwrap();
        assert_eq!(movie.kind, MediaKind::Movie);
        assert_eq!(movie.title, "Glass Onion");
        assert_eq!(catalog.calls(), vec!["details:movie:481233"]);

        let show = set_correction(&store, &catalog, "Unrelated - Episode 2", "481233")
            .await
            .unwrap();
        assert_eq!(show.kind, MediaKind::Show);
    }

    #[tokio::test]
    async fn test_bare_id_falls_back_to_other_kind() {
        let store = MemoryStore::new();
        let catalog = FakeCatalog::default()
            .with_details("arcane", item(MediaKind::Show, "Arcane", 169420, Some(2021)));

        let pinned = set_correction(&store, &catalog, "Arcane", "arcane").await.unwrap();
        assert_eq!(pinned.kind, MediaKind::Show);
        assert_eq!(
            catalog.calls(),
            vec!["details:movie:arcane", "details:show:arcane"]
        );
    }

    #[tokio::test]
    async fn test_unknown_item() {
        let store = MemoryStore::new();
        let catalog = FakeCatalog::default();
        let err = set_correction(&store, &catalog, "Foo", "missing").await.unwrap_err();
        assert!(matches!(err, CoreError::Correction(_)));
        assert!(load(&store).await.unwrap().is_empty());
    }
}
