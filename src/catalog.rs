use std::{
    borrow::Cow,
    collections::HashSet,
    fs::File,
    io::{self, BufReader},
    path::Path,
};

use serde::{Deserialize, Serialize};
use serde_json as json;
use thiserror::Error;

use crate::paths::get_paths;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub movies: Vec<String>,
}

/// The fixed movies, showtimes and seat labels bookings are drawn from.
///
/// Read-only once loaded. Seat order is the order recommendations walk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    categories: Vec<Category>,
    showtimes: Vec<String>,
    seats: Vec<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] json::Error),
    #[error("Catalog lists no movies")]
    NoMovies,
    #[error("Catalog lists no showtimes")]
    NoShowtimes,
    #[error("Catalog lists no seats")]
    NoSeats,
    #[error("Seat {0} is listed more than once")]
    DuplicateSeat(String),
}

const FILE_NAME: &str = "catalog.json";
const APP_DIR: &str = "seatd";

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            categories: vec![
                Category {
                    name: "Bollywood".into(),
                    movies: owned(&["Bollywood Movie 1", "Bollywood Movie 2", "Bollywood Movie 3"]),
                },
                Category {
                    name: "Hollywood".into(),
                    movies: owned(&["Hollywood Movie 1", "Hollywood Movie 2", "Hollywood Movie 3"]),
                },
            ],
            showtimes: owned(&["10:00 AM", "1:00 PM", "4:00 PM", "7:00 PM"]),
            seats: owned(&["A1", "A2", "A3", "A4", "A5", "B1", "B2", "B3", "B4", "B5"]),
        }
    }
}

impl Catalog {
    pub fn new(
        categories: Vec<Category>,
        showtimes: Vec<String>,
        seats: Vec<String>,
    ) -> Result<Self, CatalogError> {
        let catalog = Self {
            categories,
            showtimes,
            seats,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Loads `catalog.json` from `predefined_path` or the platform data directories,
    /// falling back to the built-in catalog when no file exists.
    pub fn load(predefined_path: Option<&Path>) -> Result<Self, CatalogError> {
        let paths = match predefined_path {
            Some(predefined) => {
                if predefined.is_dir() {
                    vec![Cow::Owned(predefined.join(FILE_NAME))]
                } else {
                    vec![Cow::Borrowed(predefined)]
                }
            }
            None => get_paths()
                .into_iter()
                .map(|base_dir| Cow::Owned(base_dir.join(APP_DIR).join(FILE_NAME)))
                .collect::<Vec<_>>(),
        };

        let catalog = match paths.iter().find(|p| p.exists()) {
            Some(path) => {
                tracing::info!("Loading catalog from {}", path.display());
                let reader = BufReader::new(File::open(path)?);
                json::from_reader::<_, Self>(reader)?
            }
            None => {
                tracing::warn!("No catalog file found. Using the built-in catalog");
                Self::default()
            }
        };

        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.movies().next().is_none() {
            return Err(CatalogError::NoMovies);
        }
        if self.showtimes.is_empty() {
            return Err(CatalogError::NoShowtimes);
        }
        if self.seats.is_empty() {
            return Err(CatalogError::NoSeats);
        }
        let mut seen = HashSet::new();
        match self.seats.iter().find(|seat| !seen.insert(seat.as_str())) {
            Some(duplicate) => Err(CatalogError::DuplicateSeat(duplicate.clone())),
            None => Ok(()),
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn movies(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .flat_map(|category| category.movies.iter().map(String::as_str))
    }

    pub fn showtimes(&self) -> &[String] {
        &self.showtimes
    }

    pub fn seats(&self) -> &[String] {
        &self.seats
    }

    pub fn has_movie(&self, movie: &str) -> bool {
        self.movies().any(|m| m == movie)
    }

    pub fn has_showtime(&self, showtime: &str) -> bool {
        self.showtimes.iter().any(|s| s == showtime)
    }

    /// Requested seats that are not part of the seat vocabulary.
    pub fn unknown_seats<'a>(&self, seats: &'a [String]) -> Vec<&'a str> {
        seats
            .iter()
            .filter(|seat| !self.seats.contains(seat))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = Catalog::default();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.movies().count(), 6);
        assert_eq!(catalog.seats().first().map(String::as_str), Some("A1"));
        assert!(catalog.has_showtime("7:00 PM"));
        assert!(catalog.has_movie("Hollywood Movie 2"));
    }

    #[test]
    fn duplicate_seats_are_refused() {
        let result = Catalog::new(
            vec![Category {
                name: "Any".into(),
                movies: owned(&["M1"]),
            }],
            owned(&["10:00 AM"]),
            owned(&["A1", "A2", "A1"]),
        );
        assert!(matches!(result, Err(CatalogError::DuplicateSeat(seat)) if seat == "A1"));
    }

    #[test]
    fn unknown_seats_are_reported() {
        let catalog = Catalog::default();
        let requested = owned(&["A1", "Z9", "C3"]);
        assert_eq!(catalog.unknown_seats(&requested), vec!["Z9", "C3"]);
    }

    #[test]
    fn loads_catalog_file_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join(FILE_NAME)).unwrap();
        write!(
            file,
            r#"{{"categories":[{{"name":"Indie","movies":["M1"]}}],"showtimes":["9:00 PM"],"seats":["C1","C2"]}}"#
        )
        .unwrap();

        let catalog = Catalog::load(Some(dir.path())).unwrap();
        assert_eq!(catalog.seats(), owned(&["C1", "C2"]).as_slice());
        assert!(catalog.has_movie("M1"));
    }

    #[test]
    fn missing_file_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::load(Some(dir.path().join("nope.json").as_path())).unwrap();
        assert_eq!(catalog, Catalog::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Catalog::load(Some(path.as_path())),
            Err(CatalogError::Json(_))
        ));
    }
}
