//! Profile providers: sources of records for the ingestion pipeline.
//!
//! [`SyntheticProfiles`] generates plausible, fully deterministic profiles from
//! a seed, so two runs with the same seed produce the same ids and tags.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Builder;

use crate::types::UserProfile;

/// Category tags used for both `interests` and `hobbies`.
pub const TAG_VOCABULARY: [&str; 5] = ["music", "sports", "movies", "books", "travel"];

const FIRST_NAMES: [&str; 16] = [
    "Ada", "Bruno", "Chloe", "Dmitri", "Elena", "Farid", "Grace", "Hiro", "Ines", "Jonas",
    "Keira", "Luca", "Maya", "Nils", "Olga", "Priya",
];

const LAST_NAMES: [&str; 16] = [
    "Andersen", "Brooks", "Costa", "Dubois", "Eriksen", "Fischer", "Garcia", "Hughes",
    "Ivanova", "Jensen", "Kowalski", "Lambert", "Moreau", "Novak", "Okafor", "Petrov",
];

const STREETS: [&str; 10] = [
    "Maple Avenue", "Oak Street", "Harbor Road", "Elm Lane", "Station Road", "Mill Street",
    "Park Drive", "Church Lane", "River Way", "Hill Crescent",
];

const CITIES: [&str; 8] = [
    "Springfield", "Riverton", "Lakeside", "Fairview", "Ashford", "Kingsport", "Milton",
    "Bayview",
];

const MAIL_DOMAINS: [&str; 4] = ["example.com", "example.org", "mail.test", "inbox.test"];

/// Source of profiles to ingest. Opaque to the pipeline.
pub trait ProfileProvider: Send + Sync {
    fn profiles(&self, count: usize) -> Vec<UserProfile>;
}

/// Deterministic synthetic profile generator.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticProfiles {
    seed: u64,
}

impl SyntheticProfiles {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn generate(rng: &mut ChaCha8Rng) -> UserProfile {
        let id = Builder::from_random_bytes(rng.gen()).into_uuid().to_string();

        let first = pick(rng, &FIRST_NAMES);
        let last = pick(rng, &LAST_NAMES);
        let email = format!(
            "{}.{}{}@{}",
            first.to_lowercase(),
            last.to_lowercase(),
            rng.gen_range(1..1000),
            pick(rng, &MAIL_DOMAINS)
        );
        let address = format!(
            "{} {}, {}",
            rng.gen_range(1..2000),
            pick(rng, &STREETS),
            pick(rng, &CITIES)
        );

        UserProfile {
            id,
            name: format!("{} {}", first, last),
            email,
            interests: tags(rng),
            hobbies: tags(rng),
            age: rng.gen_range(18..=60),
            address,
            gender: None,
            status: None,
            photo: None,
        }
    }
}

impl ProfileProvider for SyntheticProfiles {
    fn profiles(&self, count: usize) -> Vec<UserProfile> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        (0..count).map(|_| Self::generate(&mut rng)).collect()
    }
}

fn pick<'a>(rng: &mut ChaCha8Rng, values: &[&'a str]) -> &'a str {
    values.choose(rng).copied().unwrap_or_default()
}

/// Two tags drawn independently; duplicates are allowed.
fn tags(rng: &mut ChaCha8Rng) -> Vec<String> {
    (0..2)
        .map(|_| pick(rng, &TAG_VOCABULARY).to_string())
        .collect()
}
