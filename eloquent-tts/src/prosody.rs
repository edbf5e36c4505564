//! Pause and speed assignment per clause
//!
//! Every value is drawn uniformly from a fixed per-class range. A seeded
//! policy draws in a fixed order (clause pause, clause speed, then the
//! paragraph pause when the clause closes a non-final paragraph), so the
//! same seed over the same text reproduces the same sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;

use crate::text::{ClauseSpan, PunctuationClass};

/// Pause after a comma or semicolon
pub const COMMA_PAUSE: RangeInclusive<f64> = 0.10..=0.20;
/// Pause after `.`, `!`, `?`
pub const SENTENCE_END_PAUSE: RangeInclusive<f64> = 0.40..=0.60;
/// Pause after an ellipsis
pub const ELLIPSIS_PAUSE: RangeInclusive<f64> = 1.00..=1.20;
/// Pause after a dash or hyphen break
pub const DASH_PAUSE: RangeInclusive<f64> = 0.20..=0.40;
/// Extra pause between paragraphs
pub const PARAGRAPH_PAUSE: RangeInclusive<f64> = 0.80..=1.20;

/// Normal speaking speed multiplier
pub const DEFAULT_SPEED: RangeInclusive<f64> = 0.95..=1.05;
/// Slower speed for the sentence that closes a paragraph
pub const LANDING_SPEED: RangeInclusive<f64> = 0.80..=0.85;

/// Pause range for a punctuation class, `None` for unpunctuated text
pub fn pause_range(class: PunctuationClass) -> Option<RangeInclusive<f64>> {
    match class {
        PunctuationClass::Comma => Some(COMMA_PAUSE),
        PunctuationClass::SentenceEnd => Some(SENTENCE_END_PAUSE),
        PunctuationClass::Ellipsis => Some(ELLIPSIS_PAUSE),
        PunctuationClass::Dash => Some(DASH_PAUSE),
        PunctuationClass::None => None,
    }
}

/// Speed range for a clause
pub fn speed_range(class: PunctuationClass, is_paragraph_final: bool) -> RangeInclusive<f64> {
    if class == PunctuationClass::SentenceEnd && is_paragraph_final {
        LANDING_SPEED
    } else {
        DEFAULT_SPEED
    }
}

/// Clause with its prosody assigned
#[derive(Debug, Clone, PartialEq)]
pub struct Clause<'a> {
    pub span: ClauseSpan<'a>,
    pub pause_secs: f64,
    pub speed: f64,
    /// Extra silence after this clause when it closes a non-final paragraph
    pub paragraph_pause_secs: Option<f64>,
}

/// Random prosody source, one per job
pub struct ProsodyPolicy {
    rng: StdRng,
}

impl ProsodyPolicy {
    /// Seeded policies are reproducible; unseeded ones draw from OS entropy
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// (pause seconds, speed multiplier) for one clause
    pub fn assign(&mut self, class: PunctuationClass, is_paragraph_final: bool) -> (f64, f64) {
        let pause = match pause_range(class) {
            Some(range) => self.rng.gen_range(range),
            None => 0.0,
        };
        let speed = self.rng.gen_range(speed_range(class, is_paragraph_final));
        (pause, speed)
    }

    pub fn paragraph_pause(&mut self) -> f64 {
        self.rng.gen_range(PARAGRAPH_PAUSE)
    }

    /// Annotate one clause
    pub fn clause<'a>(&mut self, span: ClauseSpan<'a>) -> Clause<'a> {
        let (pause_secs, speed) = self.assign(span.class, span.is_paragraph_final);
        let paragraph_pause_secs = (span.is_paragraph_final && !span.is_last_paragraph)
            .then(|| self.paragraph_pause());

        Clause {
            span,
            pause_secs,
            speed,
            paragraph_pause_secs,
        }
    }

    /// Lazily annotate a clause sequence
    pub fn annotate<'a, I>(&mut self, spans: I) -> Annotated<'_, I::IntoIter>
    where
        I: IntoIterator<Item = ClauseSpan<'a>>,
    {
        Annotated {
            policy: self,
            spans: spans.into_iter(),
        }
    }
}

/// Iterator returned by [`ProsodyPolicy::annotate`]
pub struct Annotated<'p, I> {
    policy: &'p mut ProsodyPolicy,
    spans: I,
}

impl<'a, I> Iterator for Annotated<'_, I>
where
    I: Iterator<Item = ClauseSpan<'a>>,
{
    type Item = Clause<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let span = self.spans.next()?;
        Some(self.policy.clause(span))
    }
}
