use crate::genres::{self, ALL_GENRES};
use crate::models::MovieSummary;

/// Narrows a search result by release-year substring and genre name.
///
/// The year test is a plain substring match on the release date string, not a
/// date comparison. The genre is lower-cased and mapped through the static
/// table; a name the table does not know matches nothing. Input order is kept.
pub fn filter_movies(movies: &[MovieSummary], year: &str, genre: &str) -> Vec<MovieSummary> {
    let genre_id = if genre.is_empty() || genre == ALL_GENRES {
        None
    } else {
        Some(genres::genre_id(&genre.to_lowercase()))
    };

    movies
        .iter()
        .filter(|m| year_matches(m, year))
        .filter(|m| match genre_id {
            None => true,
            Some(id) => id.is_some_and(|id| m.genre_ids.contains(&id)),
        })
        .cloned()
        .collect()
}

fn year_matches(movie: &MovieSummary, year: &str) -> bool {
    if year.is_empty() {
        return true;
    }
    movie
        .release_date
        .as_deref()
        .is_some_and(|date| date.contains(year))
}
