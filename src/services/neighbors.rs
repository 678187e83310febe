use crate::artifacts::Artifacts;
use crate::models::{MovieId, RankWindow};

/// Row indices of every other movie, most similar first
///
/// Equal scores keep table order. The query row is removed by identity, so a
/// tie at the top cannot leak it back into the ranking.
pub fn ranked_rows(artifacts: &Artifacts, index: usize) -> Vec<usize> {
    let Some(scores) = artifacts.matrix.scores_for(index) else {
        return Vec::new();
    };

    let mut order: Vec<usize> = (0..scores.len()).filter(|&row| row != index).collect();
    // sort_by is stable, so equal scores stay in row order
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order
}

/// External ids of the neighbors of `index` inside `window`
pub fn neighbors(artifacts: &Artifacts, index: usize, window: RankWindow) -> Vec<MovieId> {
    let ranked = ranked_rows(artifacts, index);
    window
        .slice(&ranked)
        .iter()
        .map(|&row| artifacts.movies[row].external_id)
        .collect()
}
