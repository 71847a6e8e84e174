use super::*;

fn detailed_movie() -> Movie {
    serde_json::from_value(serde_json::json!({
        "id": 550,
        "title": "Fight Club",
        "release_date": "1999-10-15",
        "poster_path": "/poster.jpg",
        "backdrop_path": null,
        "overview": "An insomniac office worker...",
        "vote_average": 8.44,
        "runtime": 139,
        "genres": [{ "id": 18, "name": "Drama" }, { "id": 53, "name": "Thriller" }],
        "credits": {
            "cast": [{ "name": "Brad Pitt" }],
            "crew": [
                { "id": 7467, "job": "Director", "name": "David Fincher", "department": "Directing" },
                { "id": 1, "job": "Producer", "name": "Art Linson", "department": "Production" }
            ]
        },
        "release_dates": {
            "results": [
                { "iso_3166_1": "US", "release_dates": [{ "certification": "R", "release_date": "1999-10-15T00:00:00.000Z", "type": 3 }] },
                { "iso_3166_1": "BR", "release_dates": [
                    { "certification": "", "release_date": "1999-09-10T00:00:00.000Z", "type": 1 },
                    { "certification": "18", "release_date": "1999-10-29T00:00:00.000Z", "type": 3 }
                ] }
            ]
        }
    }))
    .unwrap()
}

// =============================================================================
// Deserialization
// =============================================================================

#[test]
fn movie_deserializes_partial_catalog_entry() {
    let movie: Movie = serde_json::from_str(r#"{"id": 1, "title": "Up", "poster_path": null}"#).unwrap();
    assert_eq!(movie.id, 1);
    assert!(movie.release_date.is_empty());
    assert!(movie.genres.is_none());
    assert!(movie.credits.is_none());
}

#[test]
fn favorites_snapshot_uses_gateway_field_names() {
    let snapshot: FavoritesSnapshot = serde_json::from_value(serde_json::json!({
        "movieDetails": [{ "id": 1, "title": "A" }, { "id": 2, "title": "B" }],
        "shareId": "xyz"
    }))
    .unwrap();
    assert_eq!(snapshot.ids(), vec![1, 2]);
    assert_eq!(snapshot.share_id, "xyz");
    assert!(snapshot.contains(2));
    assert!(!snapshot.contains(3));

    let json = serde_json::to_value(&snapshot).unwrap();
    assert!(json.get("movieDetails").is_some());
    assert_eq!(json["shareId"], "xyz");
}

#[test]
fn shared_list_tolerates_missing_details() {
    let list: SharedList = serde_json::from_str("{}").unwrap();
    assert!(list.movies.is_empty());
}

// =============================================================================
// Presentation helpers
// =============================================================================

#[test]
fn card_image_prefers_backdrop_then_poster() {
    let mut movie = Movie::new(1, "A");
    assert_eq!(movie.card_image_url(), None);

    movie.poster_path = Some("/p.jpg".into());
    assert_eq!(movie.card_image_url().as_deref(), Some("https://image.tmdb.org/t/p/w342/p.jpg"));

    movie.backdrop_path = Some("/b.jpg".into());
    assert_eq!(movie.card_image_url().as_deref(), Some("https://image.tmdb.org/t/p/w300/b.jpg"));
    assert_eq!(movie.poster_url().as_deref(), Some("https://image.tmdb.org/t/p/w780/p.jpg"));
}

#[test]
fn release_year_parses_prefix() {
    let movie = detailed_movie();
    assert_eq!(movie.release_year(), Some(1999));
    assert_eq!(Movie::new(1, "undated").release_year(), None);
}

#[test]
fn rating_percent_rounds() {
    assert_eq!(detailed_movie().rating_percent(), 84);
    assert_eq!(Movie::new(1, "unrated").rating_percent(), 0);
}

#[test]
fn runtime_formats_hours_and_minutes() {
    assert_eq!(format_runtime(Some(139)), "2h 19m");
    assert_eq!(format_runtime(Some(45)), "0h 45m");
    assert_eq!(format_runtime(Some(0)), "");
    assert_eq!(format_runtime(None), "");
}

#[test]
fn genre_names_and_directors() {
    let movie = detailed_movie();
    assert_eq!(movie.genre_names(), "Drama, Thriller");
    assert_eq!(movie.directors(), vec!["David Fincher"]);
    assert!(Movie::new(1, "bare").directors().is_empty());
}

#[test]
fn regional_release_prefers_theatrical_entry() {
    let release = detailed_movie().regional_release("BR");
    assert_eq!(release.date.as_deref(), Some("29/10/1999"));
    assert_eq!(release.certification.as_deref(), Some("18"));
}

#[test]
fn regional_release_missing_region_is_empty() {
    assert_eq!(detailed_movie().regional_release("JP"), RegionalRelease::default());
}

#[test]
fn regional_release_falls_back_to_first_entry() {
    let mut movie = detailed_movie();
    if let Some(dates) = movie.release_dates.as_mut() {
        dates.results[1].release_dates.truncate(1);
    }
    let release = movie.regional_release("BR");
    assert_eq!(release.date.as_deref(), Some("10/09/1999"));
    assert_eq!(release.certification, None);
}
