use crate::models::{MovieId, MovieRecord};

/// Maps a free-text title to a row of the movie table
///
/// Resolution order:
/// 1. the row whose external id equals `canonical_id`, when one is given
/// 2. exact case-insensitive title match
/// 3. first title containing the query as a substring
///
/// Ties always go to the earliest row.
pub fn resolve(movies: &[MovieRecord], title: &str, canonical_id: Option<MovieId>) -> Option<usize> {
    if let Some(id) = canonical_id {
        if let Some(index) = movies.iter().position(|m| m.external_id == id) {
            return Some(index);
        }
    }

    let query = normalize(title);
    if query.is_empty() {
        return None;
    }

    let titles: Vec<String> = movies.iter().map(|m| normalize(&m.title)).collect();

    titles
        .iter()
        .position(|t| *t == query)
        .or_else(|| titles.iter().position(|t| t.contains(&query)))
}

fn normalize(title: &str) -> String {
    title.trim().to_lowercase()
}
