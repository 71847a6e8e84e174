//! Wire DTOs for the Remote Data Gateway plus derived movie presentation data.
//!
//! DESIGN
//! ======
//! Movie fields mirror the upstream catalog's snake_case schema; the gateway's
//! own envelopes (`movieDetails`, `shareId`) are camelCase. Extended fields are
//! only present on detail responses, so they are all optional.

#[cfg(test)]
#[path = "models_test.rs"]
mod models_test;

use serde::{Deserialize, Serialize};

/// Unique catalog key for a movie.
pub type MovieId = i64;

const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";
const THEATRICAL_RELEASE: i32 = 3;

// =============================================================================
// MOVIE
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: i64,
    pub job: String,
    pub name: String,
    #[serde(default)]
    pub department: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<serde_json::Value>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReleaseDateInfo {
    #[serde(default)]
    pub certification: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(rename = "type")]
    pub kind: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionReleases {
    pub iso_3166_1: String,
    #[serde(default)]
    pub release_dates: Vec<ReleaseDateInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseDates {
    #[serde(default)]
    pub results: Vec<RegionReleases>,
}

/// A catalog movie. Immutable once fetched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<Genre>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<Credits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_dates: Option<ReleaseDates>,
}

/// Release date and age rating for one region.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegionalRelease {
    /// Date rendered as `DD/MM/YYYY`.
    pub date: Option<String>,
    pub certification: Option<String>,
}

impl Movie {
    /// Movie with only an id and title; every other field is empty.
    pub fn new(id: MovieId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            release_date: String::new(),
            poster_path: None,
            backdrop_path: None,
            overview: String::new(),
            vote_average: 0.0,
            genres: None,
            runtime: None,
            credits: None,
            release_dates: None,
        }
    }

    /// Card image: backdrop first, then poster, else nothing.
    #[must_use]
    pub fn card_image_url(&self) -> Option<String> {
        if let Some(path) = &self.backdrop_path {
            return Some(format!("{IMAGE_BASE_URL}/w300{path}"));
        }
        self.poster_path.as_ref().map(|path| format!("{IMAGE_BASE_URL}/w342{path}"))
    }

    /// Poster for the detail view.
    #[must_use]
    pub fn poster_url(&self) -> Option<String> {
        self.poster_path.as_ref().map(|path| format!("{IMAGE_BASE_URL}/w780{path}"))
    }

    #[must_use]
    pub fn release_year(&self) -> Option<i32> {
        self.release_date.get(..4)?.parse().ok()
    }

    /// User rating as a whole percentage.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rating_percent(&self) -> u32 {
        (self.vote_average * 10.0).round().clamp(0.0, 100.0) as u32
    }

    /// Genre names joined with `", "`; empty when unknown.
    #[must_use]
    pub fn genre_names(&self) -> String {
        self.genres
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    #[must_use]
    pub fn directors(&self) -> Vec<&str> {
        self.credits
            .iter()
            .flat_map(|c| c.crew.iter())
            .filter(|member| member.job == "Director")
            .map(|member| member.name.as_str())
            .collect()
    }

    /// Release info for `region` (ISO 3166-1 code). Theatrical release wins,
    /// otherwise the first listed release.
    #[must_use]
    pub fn regional_release(&self, region: &str) -> RegionalRelease {
        let Some(region_data) = self
            .release_dates
            .iter()
            .flat_map(|r| r.results.iter())
            .find(|r| r.iso_3166_1 == region)
        else {
            return RegionalRelease::default();
        };
        let info = region_data
            .release_dates
            .iter()
            .find(|d| d.kind == THEATRICAL_RELEASE)
            .or_else(|| region_data.release_dates.first());
        let Some(info) = info else {
            return RegionalRelease::default();
        };
        RegionalRelease {
            date: format_day_month_year(&info.release_date),
            certification: Some(info.certification.clone()).filter(|c| !c.is_empty()),
        }
    }
}

/// `125` -> `"2h 5m"`. Missing or zero runtime renders as empty.
#[must_use]
pub fn format_runtime(minutes: Option<u32>) -> String {
    match minutes {
        Some(m) if m > 0 => format!("{}h {}m", m / 60, m % 60),
        _ => String::new(),
    }
}

/// `"2024-03-01T00:00:00.000Z"` -> `"01/03/2024"`.
fn format_day_month_year(raw: &str) -> Option<String> {
    let date = raw.get(..10)?;
    let mut parts = date.split('-');
    let (year, month, day) = (parts.next()?, parts.next()?, parts.next()?);
    let valid = year.len() == 4
        && month.len() == 2
        && day.len() == 2
        && [year, month, day].iter().all(|p| p.bytes().all(|b| b.is_ascii_digit()));
    valid.then(|| format!("{day}/{month}/{year}"))
}

// =============================================================================
// GATEWAY ENVELOPES
// =============================================================================

/// One page of catalog results (`/movies/trending`, `/movies/search`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginatedMovies {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<Movie>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

/// The signed-in user's favorites plus the public share token.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FavoritesSnapshot {
    /// Insertion order as reported by the server.
    #[serde(rename = "movieDetails", default)]
    pub movies: Vec<Movie>,
    #[serde(rename = "shareId", default)]
    pub share_id: String,
}

impl FavoritesSnapshot {
    #[must_use]
    pub fn contains(&self, movie_id: MovieId) -> bool {
        self.movies.iter().any(|m| m.id == movie_id)
    }

    #[must_use]
    pub fn ids(&self) -> Vec<MovieId> {
        self.movies.iter().map(|m| m.id).collect()
    }
}

/// Public read of another user's favorites (`/share/{shareId}`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedList {
    #[serde(rename = "movieDetails", default)]
    pub movies: Vec<Movie>,
}
