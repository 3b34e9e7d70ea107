use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest selectable option value; scores range over 0..=3 per question.
pub const MAX_OPTION_VALUE: u8 = 3;

pub static CATALOG: Lazy<Catalog> = Lazy::new(|| {
    serde_json::from_str(include_str!("../resources/questions.json"))
        .expect("embedded question catalog is valid JSON")
});

#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerOption {
    pub value: u8,
    pub label: String,
    pub description: String,
}

/// Fixed sentence pair attached to a severity level.
#[derive(Debug, Clone, Deserialize)]
pub struct Tier {
    pub level: Level,
    pub summary: String,
    pub next_step: String,
}

/// Master representation of the quiz: the question sequence, the answer
/// options shared by every question, and the result tiers. Loaded once from
/// the embedded JSON and never mutated; question order is display order, not
/// scoring order.
#[derive(Debug, Deserialize)]
pub struct Catalog {
    questions: Vec<Question>,
    options: Vec<AnswerOption>,
    tiers: Vec<Tier>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Question at a display position.
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Question looked up by its id.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    /// Highest reachable total: every question answered with the top option.
    pub fn max_score(&self) -> u32 {
        self.questions.len() as u32 * u32::from(MAX_OPTION_VALUE)
    }

    fn tier(&self, level: Level) -> &Tier {
        self.tiers
            .iter()
            .find(|tier| tier.level == level)
            .expect("tier catalog covers every level")
    }
}

/// Per-session record of question id -> chosen option value.
///
/// Created empty, filled as the user selects options, wiped by `clear`.
/// Every key is a catalog question id; a key is present iff the question has
/// been answered at least once.
#[derive(Debug, Clone, Default)]
pub struct AnswerStore {
    values: HashMap<String, u8>,
}

impl AnswerStore {
    /// Records or overwrites the answer for a question. Unknown ids and
    /// values above [`MAX_OPTION_VALUE`] are caller bugs and rejected loudly.
    pub fn set(&mut self, catalog: &Catalog, id: &str, value: u8) -> Result<(), Error> {
        if catalog.question(id).is_none() {
            return Err(Error::UnknownQuestion(id.to_string()));
        }
        if value > MAX_OPTION_VALUE {
            return Err(Error::IllegalAnswer(value));
        }
        self.values.insert(id.to_string(), value);
        Ok(())
    }

    /// Drops every recorded answer, restoring the initial empty state.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn answered_count(&self) -> usize {
        self.values.len()
    }

    pub fn is_complete(&self, catalog: &Catalog) -> bool {
        self.answered_count() == catalog.len()
    }

    /// Recorded value for a question. `None` means unanswered, which is a
    /// normal state and not an error.
    pub fn value_for(&self, id: &str) -> Option<u8> {
        self.values.get(id).copied()
    }

    /// Display index of the first question without an answer.
    pub fn first_unanswered(&self, catalog: &Catalog) -> Option<usize> {
        catalog
            .questions()
            .iter()
            .position(|question| !self.values.contains_key(&question.id))
    }

    /// Scores a complete answer set.
    ///
    /// Sums the recorded values, then assigns the severity level by the
    /// score/max ratio with inclusive upper bounds per tier. The bounds are
    /// policy and must not drift: exactly 0.25 is still Low.
    pub fn to_outcome(&self, catalog: &Catalog) -> Result<Outcome, Error> {
        if !self.is_complete(catalog) {
            return Err(Error::NotComplete);
        }
        let score = catalog
            .questions()
            .iter()
            .map(|question| u32::from(self.value_for(&question.id).unwrap_or(0)))
            .sum::<u32>();
        let max = catalog.max_score();
        let level = Level::for_ratio(f64::from(score) / f64::from(max));
        let tier = catalog.tier(level);
        Ok(Outcome {
            score,
            max,
            level,
            summary: tier.summary.clone(),
            next_step: tier.next_step.clone(),
        })
    }
}

/// Severity tiers in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Low,
    Mild,
    High,
    VeryHigh,
}

impl Level {
    fn for_ratio(ratio: f64) -> Self {
        if ratio <= 0.25 {
            Level::Low
        } else if ratio <= 0.5 {
            Level::Mild
        } else if ratio <= 0.75 {
            Level::High
        } else {
            Level::VeryHigh
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Level::Low => "Low",
            Level::Mild => "Mild",
            Level::High => "High",
            Level::VeryHigh => "Very high",
        };
        f.write_str(text)
    }
}

/// Scored result: a derived projection of a complete [`AnswerStore`],
/// recomputed on demand and never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub score: u32,
    pub max: u32,
    pub level: Level,
    pub summary: String,
    pub next_step: String,
}

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Syntactic shape check on a raw user-entered address, trimmed first.
///
/// Deliberately conservative: something before the `@`, something between
/// `@` and a dot, something after the final dot, no whitespace. Not an RFC
/// validator and not a deliverability check; it accepts some invalid
/// addresses and rejects some exotic valid ones.
pub fn email_is_valid(value: &str) -> bool {
    EMAIL_SHAPE.is_match(value.trim())
}

/// One in-memory lifetime of the quiz: the answer store plus the navigation
/// index, owned explicitly instead of living in ambient globals. The
/// rendering layer holds one of these per widget instance and drives it from
/// its event handlers.
pub struct Session<'a> {
    catalog: &'a Catalog,
    store: AnswerStore,
    current: usize,
}

impl<'a> Session<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            store: AnswerStore::default(),
            current: 0,
        }
    }

    pub fn store(&self) -> &AnswerStore {
        &self.store
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_is_answered(&self) -> bool {
        let question = &self.catalog.questions()[self.current];
        self.store.value_for(&question.id).is_some()
    }

    /// Answers the question currently in view.
    pub fn select(&mut self, value: u8) -> Result<(), Error> {
        let id = self.catalog.questions()[self.current].id.clone();
        self.store.set(self.catalog, &id, value)
    }

    /// Answers any question by id, regardless of the navigation index.
    pub fn answer(&mut self, id: &str, value: u8) -> Result<(), Error> {
        self.store.set(self.catalog, id, value)
    }

    /// Advances to the next question. Refuses to move past an unanswered
    /// question; on the last question this is a no-op.
    pub fn next(&mut self) -> Result<(), Error> {
        if self.current + 1 >= self.catalog.len() {
            return Ok(());
        }
        if !self.current_is_answered() {
            return Err(Error::AnswerRequired);
        }
        self.current += 1;
        Ok(())
    }

    pub fn prev(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    /// Clears all answers and rewinds to the first question.
    pub fn reset(&mut self) {
        self.store.clear();
        self.current = 0;
    }

    pub fn progress(&self) -> Progress {
        Progress {
            answered: self.store.answered_count(),
            total: self.catalog.len(),
        }
    }

    /// Render model for the question in view. Pure projection of session
    /// state; the rendering boundary consumes this without touching the
    /// store directly.
    pub fn current_view(&self) -> QuestionView<'a> {
        let questions: &'a [Question] = self.catalog.questions();
        let question = &questions[self.current];
        QuestionView {
            index: self.current,
            total: self.catalog.len(),
            prompt: &question.prompt,
            options: self.catalog.options(),
            selected: self.store.value_for(&question.id),
        }
    }

    /// Validates completion and the email, then scores.
    ///
    /// An incomplete quiz jumps the navigation index to the first unanswered
    /// question so the caller can re-render there. Both failure modes are
    /// recoverable user errors carrying their user-facing message.
    pub fn finalize(&mut self, email: &str) -> Result<Outcome, Error> {
        if let Some(index) = self.store.first_unanswered(self.catalog) {
            self.current = index;
            return Err(Error::Unanswered {
                first_missing: index,
            });
        }
        if !email_is_valid(email) {
            return Err(Error::InvalidEmail);
        }
        let outcome = self.store.to_outcome(self.catalog)?;
        log::debug!(
            "finalized session: {}/{} {}",
            outcome.score,
            outcome.max,
            outcome.level
        );
        Ok(outcome)
    }
}

/// Answered/total counts for the progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
}

impl Progress {
    /// Percent answered, rounded to the nearest whole number.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.answered as f64 / self.total as f64) * 100.0).round() as u8
    }
}

/// Render model for a single question card.
#[derive(Debug)]
pub struct QuestionView<'a> {
    pub index: usize,
    pub total: usize,
    pub prompt: &'a str,
    pub options: &'a [AnswerOption],
    pub selected: Option<u8>,
}

/// Reads respondent rows from headerless CSV: an id field followed by one
/// answer value per catalog question, in catalog order. Malformed rows yield
/// per-row errors without stopping the iteration.
pub fn read_bulk<'a, R: std::io::Read + 'a>(
    reader: R,
    catalog: &'a Catalog,
) -> impl Iterator<Item = Result<(String, AnswerStore), Error>> + 'a {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader)
        .into_records()
        .map(move |record| parse_record(&record?, catalog))
}

fn parse_record(
    record: &csv::StringRecord,
    catalog: &Catalog,
) -> Result<(String, AnswerStore), Error> {
    if record.len() != catalog.len() + 1 {
        return Err(Error::MalformedRow(format!(
            "expected {} fields, got {}",
            catalog.len() + 1,
            record.len()
        )));
    }
    let mut fields = record.iter();
    let id = match fields.next() {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => return Err(Error::MalformedRow("missing respondent id".to_string())),
    };
    let mut store = AnswerStore::default();
    for (question, field) in catalog.questions().iter().zip(fields) {
        let value = field
            .trim()
            .parse::<u8>()
            .map_err(|_| Error::MalformedRow(format!("bad answer value {field:?}")))?;
        store.set(catalog, &question.id, value)?;
    }
    Ok((id, store))
}

#[derive(Debug, Error)]
pub enum Error {
    /// Id not present in the question catalog; a caller bug.
    #[error("unknown question id: {0}")]
    UnknownQuestion(String),
    /// Option value outside 0..=3; a caller bug.
    #[error("answer value out of range: {0}")]
    IllegalAnswer(u8),
    /// Scoring was requested before every question had an answer.
    #[error("the quiz is not complete yet")]
    NotComplete,
    #[error("please choose an answer before going to the next question")]
    AnswerRequired,
    #[error("please answer all questions before getting your result")]
    Unanswered { first_missing: usize },
    #[error("please enter a valid email address")]
    InvalidEmail,
    #[error("malformed row: {0}")]
    MalformedRow(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
