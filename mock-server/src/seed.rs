//! Fixed catalog the server starts with.

use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct Show {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub genre: String,
    #[serde(rename = "type")]
    pub show_type: String,
    pub status: String,
    pub rating: f64,
    pub release_date: String,
    pub poster_url: Option<String>,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Episode {
    pub id: u64,
    #[serde(skip)]
    pub tv_show_id: u64,
    pub season_number: u32,
    pub episode_number: u32,
    pub title: String,
    pub air_date: String,
    pub duration: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct Actor {
    pub id: u64,
    pub name: String,
    pub biography: String,
    pub birth_date: String,
    pub profile_image_url: Option<String>,
}

/// Link between an actor and a show.
#[derive(Clone, Debug)]
pub struct Role {
    pub id: u64,
    pub tv_show_id: u64,
    pub actor_id: u64,
    pub role: String,
    pub is_main_cast: bool,
}

// (title, genre, type, status, rating, release year)
const SHOWS: &[(&str, &str, &str, &str, f64, u32)] = &[
    ("Breaking Bad", "Crime", "Series", "Ended", 9.5, 2008),
    ("The Office", "Comedy", "Series", "Ended", 9.0, 2005),
    ("Chernobyl", "Drama", "Miniseries", "Ended", 9.4, 2019),
    ("Dark", "Sci-Fi", "Series", "Ended", 8.7, 2017),
    ("Severance", "Sci-Fi", "Series", "Ongoing", 8.7, 2022),
    ("The Wire", "Crime", "Series", "Ended", 9.3, 2002),
    ("Fargo", "Crime", "Series", "Ongoing", 8.9, 2014),
    ("Succession", "Drama", "Series", "Ended", 8.9, 2018),
    ("Fleabag", "Comedy", "Series", "Ended", 8.7, 2016),
    ("True Detective", "Crime", "Series", "Ongoing", 8.9, 2014),
    ("Mindhunter", "Crime", "Series", "Ended", 8.6, 2017),
    ("Band of Brothers", "Drama", "Miniseries", "Ended", 9.4, 2001),
    ("Arcane", "Sci-Fi", "Series", "Ended", 9.0, 2021),
    ("Better Call Saul", "Crime", "Series", "Ended", 9.0, 2015),
    ("The Bear", "Comedy", "Series", "Ongoing", 8.5, 2022),
    ("Mr. Robot", "Thriller", "Series", "Ended", 8.5, 2015),
    ("Black Mirror", "Sci-Fi", "Series", "Ongoing", 8.7, 2011),
    ("Sherlock", "Crime", "Series", "Ended", 9.1, 2010),
    ("The Crown", "Drama", "Series", "Ended", 8.6, 2016),
    ("Parks and Recreation", "Comedy", "Series", "Ended", 8.6, 2009),
    ("Mare of Easttown", "Crime", "Miniseries", "Ended", 8.4, 2021),
    ("Andor", "Sci-Fi", "Series", "Ended", 8.6, 2022),
    ("Ozark", "Thriller", "Series", "Ended", 8.5, 2017),
    ("The Leftovers", "Drama", "Series", "Ended", 8.3, 2014),
    ("Barry", "Comedy", "Series", "Ended", 8.4, 2018),
    ("Station Eleven", "Drama", "Miniseries", "Ended", 7.9, 2021),
    ("Slow Horses", "Thriller", "Series", "Ongoing", 8.2, 2022),
    ("Shogun", "Drama", "Series", "Ongoing", 8.6, 2024),
    ("The Expanse", "Sci-Fi", "Series", "Ended", 8.5, 2015),
    ("Atlanta", "Comedy", "Series", "Ended", 8.6, 2016),
    ("Line of Duty", "Crime", "Series", "Ongoing", 8.7, 2012),
    ("Baby Reindeer", "Thriller", "Miniseries", "Ended", 7.7, 2024),
];

const ACTORS: &[(&str, &str)] = &[
    ("Billy Bob Thornton", "1955-08-04"),
    ("Martin Freeman", "1971-09-08"),
    ("Allison Tolman", "1981-08-18"),
    ("Kirsten Dunst", "1982-04-30"),
    ("Patrick Wilson", "1973-07-03"),
    ("Bryan Cranston", "1956-03-07"),
    ("Aaron Paul", "1979-08-27"),
    ("Bob Odenkirk", "1962-10-22"),
];

// (show id, actor index, role, main cast)
const ROLES: &[(u64, usize, &str, bool)] = &[
    (7, 0, "Lorne Malvo", true),
    (7, 1, "Lester Nygaard", true),
    (7, 2, "Molly Solverson", true),
    (7, 3, "Peggy Blumquist", false),
    (7, 4, "Lou Solverson", false),
    (1, 5, "Walter White", true),
    (1, 6, "Jesse Pinkman", true),
    (1, 7, "Saul Goodman", false),
    (14, 7, "Jimmy McGill", true),
    (2, 1, "Tim Canterbury", false),
];

pub fn shows() -> Vec<Show> {
    SHOWS
        .iter()
        .enumerate()
        .map(|(i, &(title, genre, show_type, status, rating, year))| {
            let id = i as u64 + 1;
            Show {
                id,
                title: title.to_string(),
                description: format!(
                    "{title} ({year}), a {} {}.",
                    genre.to_lowercase(),
                    show_type.to_lowercase()
                ),
                genre: genre.to_string(),
                show_type: show_type.to_string(),
                status: status.to_string(),
                rating,
                release_date: format!("{year}-01-20"),
                poster_url: (id % 4 != 0)
                    .then(|| format!("https://img.example.test/posters/{id}.jpg")),
                // Later ids were added later, so the default sort lists them first.
                created_at: format!("2024-01-15T09:{id:02}:00"),
            }
        })
        .collect()
}

pub fn actors() -> Vec<Actor> {
    ACTORS
        .iter()
        .enumerate()
        .map(|(i, &(name, birth_date))| Actor {
            id: i as u64 + 1,
            name: name.to_string(),
            biography: format!("{name} is an actor."),
            birth_date: birth_date.to_string(),
            profile_image_url: None,
        })
        .collect()
}

pub fn roles() -> Vec<Role> {
    ROLES
        .iter()
        .enumerate()
        .map(|(i, &(tv_show_id, actor, role, is_main_cast))| Role {
            id: i as u64 + 1,
            tv_show_id,
            actor_id: actor as u64 + 1,
            role: role.to_string(),
            is_main_cast,
        })
        .collect()
}

/// Two seasons of three episodes for a handful of shows.
pub fn episodes() -> Vec<Episode> {
    let mut episodes = Vec::new();
    for tv_show_id in [1, 2, 7, 14] {
        for season_number in 1..=2 {
            for episode_number in 1..=3 {
                episodes.push(Episode {
                    id: episodes.len() as u64 + 1,
                    tv_show_id,
                    season_number,
                    episode_number,
                    title: format!("S{season_number:02}E{episode_number:02}"),
                    air_date: format!("{}-0{episode_number}-01", 2013 + season_number),
                    duration: 50 + episode_number,
                });
            }
        }
    }
    episodes
}
