//! Server-rendered HTML for the search grid, movie cards and the detail view.
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::fmt::Write;

use crate::detail::{format_runtime, DetailState};
use crate::genres::{genre_label, GENRE_OPTIONS};
use crate::models::{release_year, MovieDetail, MovieSummary};
use crate::search::SearchSnapshot;
use crate::stars::{tooltip, StarRating};
use crate::tmdb::{image_url, poster_url, profile_url, top_cast, ImageSize};

pub const SKELETON_COUNT: usize = 10;
const CARD_GENRE_CHIPS: usize = 3;

pub struct HomeView<'a> {
    pub query: &'a str,
    pub year: &'a str,
    pub genre: &'a str,
    pub snapshot: &'a SearchSnapshot,
    /// Filtered movies paired with the stored rating of each.
    pub cards: &'a [(MovieSummary, u8)],
    pub return_to: &'a str,
}

pub fn home_page(view: &HomeView<'_>) -> String {
    let refresh = view.snapshot.pending || view.snapshot.is_loading();
    let mut body = String::new();
    body.push_str("<h1>🎬 Movie Review App</h1>\n");
    body.push_str(&filter_form(view.query, view.year, view.genre));

    if view.snapshot.is_loading() {
        body.push_str(
            "<div class=\"loading\"><div class=\"spinner\"></div><p>Loading movies...</p></div>\n",
        );
        body.push_str(&skeleton_grid(SKELETON_COUNT));
    } else if let Some(error) = &view.snapshot.error {
        let _ = writeln!(
            body,
            "<div class=\"error\" role=\"alert\">{}<form method=\"post\" action=\"/dismiss\"><button type=\"submit\">Dismiss</button></form></div>",
            text(error)
        );
    } else if view.cards.is_empty() {
        body.push_str(&empty_state(view.snapshot.movies.is_empty()));
    } else {
        body.push_str("<div class=\"grid\">\n");
        for (movie, rating) in view.cards {
            body.push_str(&movie_card(movie, *rating, view.return_to));
        }
        body.push_str("</div>\n");
    }

    layout("Movie Review App", refresh, &body)
}

pub fn detail_page(movie_id: i32, state: &DetailState, rating: u8, return_to: &str) -> String {
    let mut body = String::new();
    body.push_str("<div class=\"modal\">\n<a class=\"close\" href=\"/\" aria-label=\"Close\">&times;</a>\n");
    let title = match state {
        DetailState::Loading => {
            body.push_str("<div class=\"loading\"><div class=\"spinner\"></div><p>Loading movie details...</p></div>\n");
            "Loading".to_string()
        }
        DetailState::Failed(message) => {
            let _ = writeln!(
                body,
                "<div class=\"error\"><p>{}</p><a class=\"button\" href=\"/\">Close</a></div>",
                text(message)
            );
            "Error".to_string()
        }
        DetailState::Loaded(detail) => {
            body.push_str(&detail_body(movie_id, detail, rating, return_to));
            detail.title.clone()
        }
    };
    body.push_str("</div>\n");
    layout(&title, state.is_loading(), &body)
}

fn detail_body(movie_id: i32, detail: &MovieDetail, rating: u8, return_to: &str) -> String {
    let mut out = String::new();
    out.push_str("<div class=\"hero\">\n");
    if let Some(backdrop) = image_url(ImageSize::Backdrop, detail.backdrop_path.as_deref()) {
        let _ = writeln!(
            out,
            "<img class=\"backdrop\" src=\"{}\" alt=\"{}\">",
            attr(&backdrop),
            attr(&detail.title)
        );
    }
    if let Some(poster) = image_url(ImageSize::Poster, detail.poster_path.as_deref()) {
        let _ = writeln!(
            out,
            "<img class=\"poster\" src=\"{}\" alt=\"{}\">",
            attr(&poster),
            attr(&detail.title)
        );
    }
    out.push_str("</div>\n");

    let _ = writeln!(
        out,
        "<h2>{} <span class=\"year\">({})</span></h2>",
        text(&detail.title),
        text(release_year(detail.release_date.as_deref()).unwrap_or_default())
    );

    out.push_str("<div class=\"facts\">");
    if detail.vote_average > 0.0 {
        let _ = write!(
            out,
            "<span class=\"vote\">★ {:.1}</span>",
            detail.vote_average
        );
    }
    if detail.runtime > 0 {
        let _ = write!(
            out,
            "<span class=\"runtime\">{}</span>",
            format_runtime(detail.runtime)
        );
    }
    for genre in &detail.genres {
        let _ = write!(out, "<span class=\"chip\">{}</span>", text(&genre.name));
    }
    out.push_str("</div>\n");

    out.push_str("<div class=\"your-rating\"><span>Your Rating:</span>");
    out.push_str(&star_widget(movie_id, &StarRating::new(rating), return_to));
    out.push_str("</div>\n");

    let overview = if detail.overview.is_empty() {
        "No overview available."
    } else {
        detail.overview.as_str()
    };
    let _ = writeln!(out, "<h3>Overview</h3>\n<p>{}</p>", text(overview));

    let cast = top_cast(detail);
    if !cast.is_empty() {
        out.push_str("<h3>Top Cast</h3>\n<div class=\"cast\">\n");
        for person in cast {
            let _ = writeln!(
                out,
                "<div class=\"person\"><img src=\"{}\" alt=\"{}\"><p class=\"name\">{}</p><p class=\"character\">{}</p></div>",
                attr(&profile_url(person.profile_path.as_deref())),
                attr(&person.name),
                text(&person.name),
                text(&person.character)
            );
        }
        out.push_str("</div>\n");
    }
    out
}

pub fn movie_card(movie: &MovieSummary, rating: u8, return_to: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<div class=\"card\" id=\"movie-{}\">", movie.id);
    let _ = writeln!(
        out,
        "<a href=\"/movies/{}\"><img src=\"{}\" alt=\"{}\"></a>",
        movie.id,
        attr(&poster_url(movie.poster_path.as_deref())),
        attr(&movie.title)
    );
    if movie.vote_average > 0.0 {
        let _ = writeln!(out, "<div class=\"vote\">⭐ {:.1}</div>", movie.vote_average);
    }
    let _ = writeln!(
        out,
        "<h3><a href=\"/movies/{}\">{}</a></h3><span class=\"year\">{}</span>",
        movie.id,
        text(&movie.title),
        text(release_year(movie.release_date.as_deref()).unwrap_or_default())
    );
    out.push_str(&star_widget(movie.id, &StarRating::new(rating), return_to));
    out.push_str("<div class=\"chips\">");
    for genre_id in movie.genre_ids.iter().take(CARD_GENRE_CHIPS) {
        let _ = write!(out, "<span class=\"chip\">Genre {genre_id}</span>");
    }
    out.push_str("</div>\n");
    let overview = if movie.overview.is_empty() {
        "No description available."
    } else {
        movie.overview.as_str()
    };
    let _ = writeln!(out, "<p class=\"overview\">{}</p>\n</div>", text(overview));
    out
}

/// Each star is a submit button; the clear button only appears once rated.
pub fn star_widget(movie_id: i32, stars: &StarRating, return_to: &str) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<form class=\"stars\" method=\"post\" action=\"/movies/{movie_id}/rating\"><input type=\"hidden\" name=\"return_to\" value=\"{}\">",
        attr(return_to)
    );
    for position in 1..=stars.max() {
        let class = if stars.is_filled(position) {
            "star filled"
        } else {
            "star"
        };
        let _ = write!(
            out,
            "<button type=\"submit\" name=\"rating\" value=\"{position}\" class=\"{class}\" title=\"{}\">★</button>",
            tooltip(position)
        );
    }
    if stars.shows_clear() {
        out.push_str("<button type=\"submit\" name=\"rating\" value=\"0\" class=\"clear\" aria-label=\"Clear rating\">Clear</button>");
    }
    out.push_str("</form>\n");
    out
}

pub fn skeleton_grid(count: usize) -> String {
    let mut out = String::from("<div class=\"grid skeleton\">\n");
    for _ in 0..count {
        out.push_str("<div class=\"card placeholder\"><div class=\"poster\"></div><div class=\"line\"></div><div class=\"line short\"></div></div>\n");
    }
    out.push_str("</div>\n");
    out
}

/// `no_results` distinguishes an empty search from filters hiding everything.
pub fn empty_state(no_results: bool) -> String {
    let hint = if no_results {
        "Try searching for a movie"
    } else {
        "Try adjusting your filters"
    };
    format!("<div class=\"empty\"><div>🎬 No movies found</div><p>{hint}</p></div>\n")
}

fn filter_form(query: &str, year: &str, genre: &str) -> String {
    let mut out = String::from("<form class=\"filters\" method=\"get\" action=\"/\">\n");
    let _ = writeln!(
        out,
        "<label for=\"search\">Search by Title</label><input id=\"search\" name=\"query\" type=\"text\" placeholder=\"e.g. Inception\" value=\"{}\">",
        attr(query)
    );
    let _ = writeln!(
        out,
        "<label for=\"year\">Filter by Year</label><input id=\"year\" name=\"year\" type=\"number\" min=\"1900\" max=\"2030\" placeholder=\"e.g. 2020\" value=\"{}\">",
        attr(year)
    );
    out.push_str("<label for=\"genre\">Filter by Genre</label><select id=\"genre\" name=\"genre\">");
    for option in GENRE_OPTIONS {
        let selected = if *option == genre { " selected" } else { "" };
        let _ = write!(
            out,
            "<option value=\"{}\"{selected}>{}</option>",
            attr(option),
            text(&genre_label(option))
        );
    }
    out.push_str("</select>\n<button type=\"submit\">Search</button>\n</form>\n");
    out
}

fn layout(title: &str, refresh: bool, body: &str) -> String {
    let refresh = if refresh {
        "<meta http-equiv=\"refresh\" content=\"1\">\n"
    } else {
        ""
    };
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n{refresh}<title>{}</title>\n</head>\n<body>\n{body}</body>\n</html>\n",
        text(title)
    )
}
