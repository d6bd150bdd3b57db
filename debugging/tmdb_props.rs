//! Run a TMDB search or detail fetch through the library client and print the
//! result as JSON, together with any locally stored ratings.
//! Usage:
//!   cargo run --bin tmdb_props -- search <query> [year] [genre]
//!   cargo run --bin tmdb_props -- movie <tmdb_id>
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use dotenvy::dotenv;
use reelrate::detail::format_runtime;
use reelrate::filter::filter_movies;
use reelrate::ratings::{FileStore, RatingStore};
use reelrate::tmdb::{poster_url, top_cast, TmdbApi, TmdbClient};
use reelrate::Config;
use serde_json::json;
use std::env;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Search,
    Movie,
}

impl FromStr for Command {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "search" => Ok(Command::Search),
            "movie" => Ok(Command::Movie),
            _ => Err(anyhow::anyhow!("command must be 'search' or 'movie'")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: cargo run --bin tmdb_props -- search <query> [year] [genre]");
        eprintln!("       cargo run --bin tmdb_props -- movie <tmdb_id>");
        std::process::exit(1);
    }

    let command = Command::from_str(&args[1])?;
    let config = Config::from_env()?;
    let client = TmdbClient::from_config(&config)?;
    let ratings = RatingStore::new(Arc::new(FileStore::new(&config.data_dir)?));

    match command {
        Command::Search => {
            let year = args.get(3).map(String::as_str).unwrap_or("");
            let genre = args.get(4).map(String::as_str).unwrap_or("all");
            search(&client, &ratings, &args[2], year, genre).await?
        }
        Command::Movie => {
            let id: i32 = args[2].parse().context("tmdb_id must be an integer")?;
            movie(&client, &ratings, id).await?
        }
    }

    Ok(())
}

async fn search(
    client: &TmdbClient,
    ratings: &RatingStore,
    query: &str,
    year: &str,
    genre: &str,
) -> Result<()> {
    let movies = client.search_movies(query).await?;
    let filtered = filter_movies(&movies, year, genre);
    let rows = filtered
        .iter()
        .map(|m| -> Result<serde_json::Value> {
            Ok(json!({
                "id": m.id,
                "title": m.title,
                "release_date": m.release_date,
                "vote_average": m.vote_average,
                "genre_ids": m.genre_ids,
                "poster": poster_url(m.poster_path.as_deref()),
                "your_rating": ratings.get(m.id)?,
            }))
        })
        .collect::<Result<Vec<_>>>()?;
    let out = json!({
        "query": query,
        "total": movies.len(),
        "shown": rows.len(),
        "movies": rows,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn movie(client: &TmdbClient, ratings: &RatingStore, id: i32) -> Result<()> {
    let detail = client.fetch_movie(id).await?;
    let cast = top_cast(&detail)
        .iter()
        .map(|c| json!({ "name": c.name, "character": c.character }))
        .collect::<Vec<_>>();
    let out = json!({
        "id": detail.id,
        "title": detail.title,
        "runtime": format_runtime(detail.runtime),
        "genres": detail.genres.iter().map(|g| g.name.clone()).collect::<Vec<_>>(),
        "top_cast": cast,
        "your_rating": ratings.get(id)?,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
