use regex::Regex;
use serde::{Deserialize, Serialize};

/// Embedded streaming site database.
const EMBEDDED_DB: &str = include_str!("../data/sites.toml");

/// Definition of a streaming site and how to pull a title out of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteDef {
    /// Display name (e.g., "Crunchyroll", "Netflix").
    pub name: String,
    /// Regex patterns matched against the tab URL.
    #[serde(default)]
    pub url_patterns: Vec<String>,
    /// Titles that carry no signal on this site (bare site name, player frame name).
    #[serde(default)]
    pub generic_titles: Vec<String>,
    /// Regex with capture group 1 holding the useful part of the tab title.
    #[serde(default)]
    pub tab_title_pattern: Option<String>,
    /// Regex with capture group 1 holding the site's episode id in the URL.
    #[serde(default)]
    pub episode_id_pattern: Option<String>,
    /// Credentialed metadata endpoint; `{id}` is replaced by the episode id.
    #[serde(default)]
    pub metadata_url: Option<String>,
    /// Whether the player renders its metadata late and should be waited for.
    #[serde(default)]
    pub waits_for_player: bool,
    /// Whether this site is enabled for extraction.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Wrapper for TOML deserialization.
#[derive(Debug, Deserialize)]
struct SiteDbFile {
    #[serde(rename = "site")]
    sites: Vec<SiteDef>,
}

/// Compiled regexes for one site, index-aligned with `SiteDatabase::sites`.
#[derive(Debug, Clone, Default)]
struct CompiledSite {
    url: Vec<Regex>,
    tab_title: Option<Regex>,
    episode_id: Option<Regex>,
}

impl CompiledSite {
    fn compile(site: &SiteDef) -> Self {
        Self {
            url: site
                .url_patterns
                .iter()
                .filter_map(|p| compile_logged(&site.name, p))
                .collect(),
            tab_title: site
                .tab_title_pattern
                .as_deref()
                .and_then(|p| compile_logged(&site.name, p)),
            episode_id: site
                .episode_id_pattern
                .as_deref()
                .and_then(|p| compile_logged(&site.name, p)),
        }
    }
}

fn compile_logged(site: &str, pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|e| tracing::warn!(site, pattern, error = %e, "Invalid site pattern"))
        .ok()
}

/// Database of known streaming sites.
#[derive(Debug, Clone)]
pub struct SiteDatabase {
    sites: Vec<SiteDef>,
    compiled: Vec<CompiledSite>,
}

impl SiteDatabase {
    /// Load the embedded site database.
    pub fn embedded() -> Self {
        Self::from_toml(EMBEDDED_DB).expect("embedded sites.toml should be valid")
    }

    /// Load a site database from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let db: SiteDbFile = toml::from_str(toml_str)?;
        let compiled = db.sites.iter().map(CompiledSite::compile).collect();
        Ok(Self {
            sites: db.sites,
            compiled,
        })
    }

    /// Merge a user database into this one.
    /// Sites with matching names are replaced; new sites are appended.
    pub fn merge_user(&mut self, user_db: &SiteDatabase) {
        for (i, user_site) in user_db.sites.iter().enumerate() {
            if let Some(pos) = self.sites.iter().position(|s| s.name == user_site.name) {
                self.sites[pos] = user_site.clone();
                self.compiled[pos] = user_db.compiled[i].clone();
            } else {
                self.sites.push(user_site.clone());
                self.compiled.push(user_db.compiled[i].clone());
            }
        }
    }

    /// Find the first enabled site whose URL patterns match.
    pub fn match_url(&self, url: &str) -> Option<usize> {
        self.sites.iter().enumerate().find_map(|(i, s)| {
            if s.enabled && self.compiled[i].url.iter().any(|re| re.is_match(url)) {
                Some(i)
            } else {
                None
            }
        })
    }

    /// Get the site definition for a matched index.
    pub fn site(&self, index: usize) -> Option<&SiteDef> {
        self.sites.get(index)
    }

    /// Whether `title` is one of the site's placeholder titles.
    pub fn is_generic(&self, index: usize, title: &str) -> bool {
        self.sites
            .get(index)
            .is_some_and(|s| s.generic_titles.iter().any(|g| g == title.trim()))
    }

    /// Strip site decoration from a tab title using the site's tab title pattern.
    ///
    /// Falls back to the trimmed input when the site has no pattern or it
    /// does not match.
    pub fn clean_tab_title(&self, index: usize, title: &str) -> String {
        let trimmed = title.trim();
        self.compiled
            .get(index)
            .and_then(|c| c.tab_title.as_ref())
            .and_then(|re| re.captures(trimmed))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| trimmed.to_string())
    }

    /// Extract the site's episode id from a URL.
    pub fn episode_id(&self, index: usize, url: &str) -> Option<String> {
        let re = self.compiled.get(index)?.episode_id.as_ref()?;
        let caps = re.captures(url)?;
        Some(caps.get(1)?.as_str().to_string())
    }

    /// Build the metadata endpoint URL for an episode id, if the site has one.
    pub fn metadata_url(&self, index: usize, episode_id: &str) -> Option<String> {
        let template = self.sites.get(index)?.metadata_url.as_deref()?;
        Some(template.replace("{id}", episode_id))
    }

    /// Number of site definitions.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Whether the database is empty.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(db: &SiteDatabase, url: &str) -> usize {
        db.match_url(url).expect("url should match a site")
    }

    #[test]
    fn test_embedded_loads() {
        let db = SiteDatabase::embedded();
        assert_eq!(db.len(), 5, "Expected 5 sites, got {}", db.len());
    }

    #[test]
    fn test_match_url_netflix() {
        let db = SiteDatabase::embedded();
        let idx = index_of(&db, "https://www.netflix.com/watch/81564905");
        assert_eq!(db.site(idx).unwrap().name, "Netflix");
    }

    #[test]
    fn test_match_url_crunchyroll_player_frame() {
        let db = SiteDatabase::embedded();
        let idx = index_of(&db, "https://static.crunchyroll.com/vilos-v2/web/vilos/player.html");
        assert_eq!(db.site(idx).unwrap().name, "Crunchyroll");
    }

    #[test]
    fn test_match_url_unknown() {
        let db = SiteDatabase::embedded();
        assert!(db.match_url("https://www.youtube.com/watch?v=abc").is_none());
    }

    #[test]
    fn test_generic_titles() {
        let db = SiteDatabase::embedded();
        let idx = index_of(&db, "https://www.crunchyroll.com/watch/G1XHJV2W1/episode-5");
        assert!(db.is_generic(idx, "Vilos"));
        assert!(db.is_generic(idx, " Crunchyroll "));
        assert!(!db.is_generic(idx, "Frieren - Episode 5"));
    }

    #[test]
    fn test_clean_tab_title_crunchyroll() {
        let db = SiteDatabase::embedded();
        let idx = index_of(&db, "https://www.crunchyroll.com/watch/G1XHJV2W1/episode-5");
        assert_eq!(
            db.clean_tab_title(
                idx,
                "Frieren: Beyond Journey's End Episode 11, Winter in the Northern Lands - Watch on Crunchyroll"
            ),
            "Frieren: Beyond Journey's End Episode 11, Winter in the Northern Lands"
        );
    }

    #[test]
    fn test_clean_tab_title_without_pattern() {
        let db = SiteDatabase::embedded();
        let idx = index_of(&db, "https://www.netflix.com/watch/81564905");
        assert_eq!(db.clean_tab_title(idx, "  Netflix "), "Netflix");
    }

    #[test]
    fn test_episode_id_and_metadata_url() {
        let db = SiteDatabase::embedded();
        let idx = index_of(&db, "https://www.netflix.com/watch/81564905?trackId=1");
        let id = db
            .episode_id(idx, "https://www.netflix.com/watch/81564905?trackId=1")
            .unwrap();
        assert_eq!(id, "81564905");
        assert_eq!(
            db.metadata_url(idx, &id).unwrap(),
            "https://www.netflix.com/api/shakti/mre/metadata?languages=en-US&movieid=81564905"
        );
    }

    #[test]
    fn test_merge_user() {
        let mut db = SiteDatabase::embedded();

        let user_toml = r#"
            [[site]]
            name = "Crunchyroll"
            url_patterns = ["crunchyroll\\.com/watch/"]
            enabled = false

            [[site]]
            name = "Tubi"
            url_patterns = ["tubitv\\.com/"]
            generic_titles = ["Tubi"]
        "#;
        let user_db = SiteDatabase::from_toml(user_toml).unwrap();
        db.merge_user(&user_db);

        assert!(db
            .match_url("https://www.crunchyroll.com/watch/G1XHJV2W1/episode-5")
            .is_none());
        assert_eq!(db.len(), 6);
        let idx = index_of(&db, "https://tubitv.com/movies/123");
        assert!(db.is_generic(idx, "Tubi"));
    }
}
