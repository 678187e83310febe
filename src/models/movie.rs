use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// External catalog (TMDB) movie id
pub type MovieId = i64;

/// Document fields that may carry the external id, in lookup order
pub const EXTERNAL_ID_FIELDS: [&str; 4] = ["id", "tmdb_id", "movieId", "movie_id"];

/// One row of the offline movie table
///
/// Row position in the table is the join key into the similarity matrix.
/// The id is read from the first present field of [`EXTERNAL_ID_FIELDS`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawMovieRecord")]
pub struct MovieRecord {
    #[serde(rename = "id")]
    pub external_id: MovieId,
    pub title: String,
    pub tags: String,
}

#[derive(Deserialize)]
struct RawMovieRecord {
    title: String,
    #[serde(default)]
    tags: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl TryFrom<RawMovieRecord> for MovieRecord {
    type Error = String;

    fn try_from(raw: RawMovieRecord) -> Result<Self, Self::Error> {
        let external_id = external_id_of(&Value::Object(raw.fields)).ok_or_else(|| {
            format!(
                "movie '{}' has no usable id field ({})",
                raw.title,
                EXTERNAL_ID_FIELDS.join(", ")
            )
        })?;

        Ok(Self {
            external_id,
            title: raw.title,
            tags: raw.tags,
        })
    }
}

/// A movie document held by the persistence collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogMovie {
    pub external_id: MovieId,
    pub title: String,
}

impl CatalogMovie {
    /// Builds a catalog movie from a loosely-shaped JSON document
    ///
    /// Returns `None` when the document has no title or no usable id field.
    pub fn from_document(doc: &Value) -> Option<Self> {
        let title = doc.get("title")?.as_str()?.to_string();
        let external_id = external_id_of(doc)?;
        Some(Self { external_id, title })
    }
}

/// Extracts the external id from a document, accepting numeric or numeric-string values
pub fn external_id_of(doc: &Value) -> Option<MovieId> {
    EXTERNAL_ID_FIELDS.iter().find_map(|field| match doc.get(*field)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Movie metadata as returned by the external catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetails {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

/// Whether an enriched record carries real metadata or a placeholder
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MovieStatus {
    Ok,
    Unavailable,
}

/// Response-facing movie record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedMovie {
    pub id: MovieId,
    pub title: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
    pub status: MovieStatus,
}

impl EnrichedMovie {
    /// Placeholder substituted when metadata could not be fetched
    pub fn unavailable(id: MovieId) -> Self {
        Self {
            id,
            title: "Unavailable".to_string(),
            overview: Some("Movie data could not be fetched from TMDB.".to_string()),
            poster_path: None,
            release_date: None,
            vote_average: None,
            status: MovieStatus::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == MovieStatus::Ok
    }
}

impl From<MovieDetails> for EnrichedMovie {
    fn from(details: MovieDetails) -> Self {
        Self {
            id: details.id,
            title: details.title,
            overview: details.overview,
            poster_path: details.poster_path,
            release_date: details.release_date,
            vote_average: details.vote_average,
            status: MovieStatus::Ok,
        }
    }
}

/// Half-open window `[start, end)` over neighbor ranks, self excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankWindow {
    pub start: usize,
    pub end: usize,
}

impl RankWindow {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The six closest neighbors
    pub const TOP_6: RankWindow = RankWindow::new(0, 6);

    /// Neighbors ranked seven through twelve
    pub const NEXT_6: RankWindow = RankWindow::new(6, 12);

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies the window to an ordered sequence, clamping to its length
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let end = self.end.min(items.len());
        let start = self.start.min(end);
        &items[start..end]
    }
}
