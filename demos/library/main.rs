//! # Record Library
//!
//! A small artist/album catalogue run against the database configured by
//! `SQL_DATABASE` (in-memory by default).
//!
//! ## Operations Demonstrated
//!
//! - Declaring entities with primary and foreign keys
//! - Creating tables idempotently
//! - Inserting records and reading back generated keys
//! - Filtered, ordered and grouped queries
//! - Arithmetic updates with RETURNING
//! - Replacing and deleting records
//!
//! Run with `RUST_LOG=debug` to see every rendered statement.

use anyhow::Result;
use keel_orm::{Engine, Entity, entity};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

entity! {
    primary_key = id,
    #[derive(Debug, Clone, PartialEq)]
    pub struct Artist {
        pub id: i64,
        pub name: String,
    }
}

entity! {
    primary_key = id,
    foreign_keys = [(artist_id, Artist, id)],
    #[derive(Debug, Clone, PartialEq)]
    pub struct Album {
        pub id: i64,
        pub title: String,
        pub year: i64,
        pub plays: i64,
        pub artist_id: i64,
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    Registry::default().with(filter).with(fmt::layer()).init();

    let engine = Engine::connect()?;
    engine.push(Artist::schema())?;
    engine.push(Album::schema())?;

    let mut artists = [
        Artist {
            id: 0,
            name: "Nina Simone".to_string(),
        },
        Artist {
            id: 0,
            name: "John Coltrane".to_string(),
        },
    ];
    engine.insert(&mut artists)?;
    tracing::info!(ids = ?artists.iter().map(|a| a.id).collect::<Vec<_>>(), "artists stored");

    let [nina, coltrane] = &artists;
    let mut albums = [
        album("Little Girl Blue", 1959, nina.id),
        album("Pastel Blues", 1965, nina.id),
        album("Giant Steps", 1960, coltrane.id),
        album("A Love Supreme", 1965, coltrane.id),
    ];
    engine.insert(&mut albums)?;

    let sixties = engine
        .query(Album::table())
        .r#where(Album::column("year")?.ge(1960)?.and(Album::column("year")?.lt(1970)?))
        .order_by_desc(Album::column("year")?)
        .all()?;
    for album in &sixties {
        tracing::info!(title = %album.title, year = album.year, "released in the sixties");
    }

    let per_artist = engine
        .query([Album::column("artist_id")?, Album::column("id")?.count()])
        .group_by(Album::column("artist_id")?)
        .all()?;
    tracing::info!(?per_artist, "albums per artist");

    let plays = engine
        .update([Album::column("plays")?.add(1)?])
        .r#where(Album::column("artist_id")?.eq(coltrane.id)?)
        .returning(Album::column("plays")?)
        .all()?;
    tracing::info!(?plays, "coltrane albums played");

    let mut renamed = albums[0].clone();
    renamed.title = "Little Girl Blue (Remastered)".to_string();
    engine.replace(std::slice::from_mut(&mut renamed))?;

    let removed = engine
        .delete(Album::table())
        .r#where(Album::column("year")?.lt(1960)?)
        .returning_all()
        .all()?;
    tracing::info!(count = removed.len(), "removed albums released before 1960");

    let remaining = engine.query(Album::column("title")?).order_by(Album::column("title")?).all()?;
    tracing::info!(?remaining, "catalogue");

    Ok(())
}

fn album(title: &str, year: i64, artist_id: i64) -> Album {
    Album {
        id: 0,
        title: title.to_string(),
        year,
        plays: 0,
        artist_id,
    }
}
