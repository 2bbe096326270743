//! Run-name generator predicate list.
//!
//! When a run is created without an explicit name, one is synthesized as
//! `"<predicate>-<noun>-<suffix>"`. Callers that need to recognize a
//! generated name only need to check the prefix matches one of
//! [`GENERATOR_PREDICATES`].

use rand::seq::SliceRandom;
use rand::Rng;

/// Adjectives used as the first component of a generated run name.
pub const GENERATOR_PREDICATES: &[&str] = &[
    "able", "big", "bold", "calm", "clean", "crisp", "eager", "fair", "fleet",
    "gentle", "glad", "honest", "keen", "lively", "loyal", "merry", "mild",
    "nimble", "proud", "quiet", "rare", "rich", "sincere", "skillful", "smooth",
    "stately", "suave", "swift", "trusting", "unique", "upbeat", "wise", "zealous",
];

const GENERATOR_NOUNS: &[&str] = &[
    "ant", "bear", "bird", "carp", "cat", "crab", "deer", "dog", "dove", "eel",
    "fawn", "finch", "fish", "fox", "frog", "gnat", "goat", "hare", "hawk",
    "horse", "lark", "lion", "lynx", "mole", "moth", "newt", "owl", "perch",
    "pig", "ram", "seal", "shark", "sheep", "shrew", "skink", "slug", "snail",
    "snake", "sow", "sponge", "squid", "squirrel", "stoat", "swan", "tern",
    "toad", "trout", "turtle", "vole", "wasp", "whale", "wolf", "worm", "wren",
];

/// Synthesize a run name of the form `"<predicate>-<noun>-<3-digit-suffix>"`.
///
/// Callers only need to check the prefix is one of
/// [`GENERATOR_PREDICATES`], not that the whole name is unique — duplicate
/// generated names are permitted.
pub fn generate_run_name() -> String {
    let mut rng = rand::thread_rng();
    let predicate = GENERATOR_PREDICATES.choose(&mut rng).unwrap();
    let noun = GENERATOR_NOUNS.choose(&mut rng).unwrap();
    let suffix: u32 = rng.gen_range(0..1000);
    format!("{predicate}-{noun}-{suffix:03}")
}
