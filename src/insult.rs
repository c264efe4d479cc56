//! Insult selection.
//!
//! A uniform pick from a fixed list. Pure apart from the RNG draw; the
//! router is its only consumer.

use rand::Rng;

/// The fixed insult collection.
const INSULTS: &[&str] = &[
    "You're as bright as a black hole.",
    "You have a face only a mother could love.",
    "You're not the sharpest tool in the shed.",
    "If you were any slower, you'd be going backward.",
    "You're a walking disaster.",
    "I've met smarter sandwiches.",
    "You're so lazy, you probably haven't even read this insult yet.",
];

/// Produces one random insult per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct InsultGenerator;

impl InsultGenerator {
    /// Pick one insult, uniformly.
    pub fn next_insult(&self) -> String {
        let index = rand::thread_rng().gen_range(0..INSULTS.len());
        INSULTS[index].to_string()
    }
}
