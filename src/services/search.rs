use serde::Serialize;

use crate::models::{Recipe, RecipeDetail};

/// Every query term must reach this score against the title or an ingredient
pub const MATCH_THRESHOLD: f64 = 70.0;

/// A recipe that matched a search, with its mean term score (0..=100)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchHit {
    pub recipe: Recipe,
    pub score: f64,
}

/// Length of the longest common subsequence of two char slices
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut diag = 0;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb { diag + 1 } else { above.max(row[j]) };
            diag = above;
        }
    }
    row[b.len()]
}

/// Normalized Indel similarity, `2 * lcs / (|a| + |b|)`, in 0..=1
fn indel_similarity(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * lcs_len(a, b)) as f64 / total as f64
}

/// Similarity of the shorter string against the best equal-length window of
/// the longer one, on a 0..=100 scale
///
/// Windows are compared with normalized Indel similarity over chars, so an
/// adjacent swap costs one kept character rather than two edits.
/// Two empty strings are identical; an empty string matches nothing else.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }

    let mut best = 0.0_f64;
    for window in long.windows(short.len()) {
        let score = indel_similarity(&short, window);
        if score > best {
            best = score;
            if best >= 1.0 {
                break;
            }
        }
    }

    best * 100.0
}

/// Best score of one lowercase term against a recipe's title and ingredients
fn term_score(term: &str, title: &str, ingredients: &[String]) -> f64 {
    let title_score = partial_ratio(term, title);
    let ingredient_score = ingredients
        .iter()
        .map(|name| partial_ratio(term, name))
        .fold(0.0, f64::max);
    title_score.max(ingredient_score)
}

/// Ranks recipes against a free-text query
///
/// A recipe is kept only when every whitespace-separated term scores at
/// least [`MATCH_THRESHOLD`]; its score is the mean over terms. Results are
/// sorted by score descending and ties keep the input order. A query without
/// terms matches nothing.
pub fn rank(query: &str, recipes: Vec<RecipeDetail>) -> Vec<SearchHit> {
    let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if terms.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = recipes
        .into_iter()
        .filter_map(|detail| {
            let title = detail.recipe.title.to_lowercase();
            let ingredients: Vec<String> = detail
                .ingredients
                .iter()
                .map(|i| i.name.to_lowercase())
                .collect();

            let scores: Vec<f64> = terms
                .iter()
                .map(|term| term_score(term, &title, &ingredients))
                .collect();

            if scores.iter().all(|&s| s >= MATCH_THRESHOLD) {
                let score = scores.iter().sum::<f64>() / scores.len() as f64;
                Some(SearchHit {
                    recipe: detail.recipe,
                    score,
                })
            } else {
                None
            }
        })
        .collect();

    // sort_by is stable, so equal scores stay newest-first
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits
}
