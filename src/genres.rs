//! Static TMDB genre table used by the genre filter.
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Reserved filter value meaning "no genre restriction".
pub const ALL_GENRES: &str = "all";

const GENRE_TABLE: &[(&str, i32)] = &[
    ("action", 28),
    ("adventure", 12),
    ("animation", 16),
    ("comedy", 35),
    ("crime", 80),
    ("documentary", 99),
    ("drama", 18),
    ("family", 10751),
    ("fantasy", 14),
    ("history", 36),
    ("horror", 27),
    ("music", 10402),
    ("mystery", 9648),
    ("romance", 10749),
    ("science fiction", 878),
    ("tv movie", 10770),
    ("thriller", 53),
    ("war", 10752),
    ("western", 37),
];

/// Options offered by the genre selector, in display order.
pub const GENRE_OPTIONS: &[&str] = &[
    ALL_GENRES,
    "action",
    "adventure",
    "animation",
    "comedy",
    "crime",
    "documentary",
    "drama",
    "family",
    "fantasy",
    "history",
    "horror",
    "music",
    "mystery",
    "romance",
    "science fiction",
    "thriller",
    "war",
    "western",
];

static GENRE_IDS: Lazy<HashMap<&'static str, i32>> =
    Lazy::new(|| GENRE_TABLE.iter().copied().collect());

/// Looks up a lower-cased genre name.
pub fn genre_id(name: &str) -> Option<i32> {
    GENRE_IDS.get(name).copied()
}

pub fn genre_label(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
