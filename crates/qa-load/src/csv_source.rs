//! Readers for the questions and answers CSV files.
//!
//! Both files are Latin-1; each byte is decoded to the code point with the
//! same value, so reading never fails on encoding.

use std::collections::HashMap;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};
use tracing::{debug, info, warn};

use qa_core::{Answer, QaError, Question, Result};

use crate::html::strip_html;

/// Questions in first-seen order, indexed by id.
#[derive(Debug, Default, Clone)]
pub struct QuestionSet {
    questions: Vec<Question>,
    index: HashMap<String, usize>,
}

impl QuestionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a question. A repeated id replaces the earlier entry in place.
    pub fn insert(&mut self, question: Question) {
        match self.index.get(&question.id) {
            Some(&pos) => self.questions[pos] = question,
            None => {
                self.index.insert(question.id.clone(), self.questions.len());
                self.questions.push(question);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.index.get(id).map(|&pos| &self.questions[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}

/// Answers whose parent question was loaded, in file order.
#[derive(Debug, Default, Clone)]
pub struct AnswerSet {
    pub answers: Vec<Answer>,

    /// Answers skipped because their parent was not loaded.
    pub orphans: usize,
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn csv_err(path: &Path) -> impl Fn(csv::Error) -> QaError + '_ {
    move |e| QaError::csv(path.display().to_string(), e.to_string())
}

/// Position of each requested column in the header row.
fn column_indices<const N: usize>(
    path: &Path,
    headers: &ByteRecord,
    names: [&str; N],
) -> Result<[usize; N]> {
    let mut out = [0usize; N];
    for (slot, name) in out.iter_mut().zip(names) {
        *slot = headers
            .iter()
            .position(|h| decode_latin1(h).trim() == name)
            .ok_or_else(|| {
                QaError::csv(
                    path.display().to_string(),
                    format!("missing column `{}`", name),
                )
            })?;
    }
    Ok(out)
}

fn field(record: &ByteRecord, idx: usize) -> String {
    record.get(idx).map(decode_latin1).unwrap_or_default()
}

fn clean(text: String, strip: bool) -> String {
    if strip {
        strip_html(&text).into_owned()
    } else {
        text
    }
}

/// Read up to `limit` questions from a CSV with `Id`, `Title` and `Body` columns.
pub fn read_questions(path: &Path, limit: Option<usize>, strip: bool) -> Result<QuestionSet> {
    info!("Reading questions from {:?}", path);

    let mut reader = ReaderBuilder::new().from_path(path).map_err(csv_err(path))?;
    let headers = reader.byte_headers().map_err(csv_err(path))?.clone();
    let mut questions = QuestionSet::new();
    if headers.is_empty() {
        warn!("{:?} is empty", path);
        return Ok(questions);
    }
    let [id_col, title_col, body_col] = column_indices(path, &headers, ["Id", "Title", "Body"])?;

    let mut record = ByteRecord::new();

    loop {
        if limit.is_some_and(|l| questions.len() >= l) {
            info!("Reached questions limit of {}, stopping read", questions.len());
            break;
        }
        if !reader.read_byte_record(&mut record).map_err(csv_err(path))? {
            break;
        }
        questions.insert(Question {
            id: field(&record, id_col),
            title: field(&record, title_col),
            body: clean(field(&record, body_col), strip),
        });
    }

    info!("Loaded {} questions", questions.len());
    Ok(questions)
}

/// Read answers from a CSV with `ParentId` and `Body` columns, keeping those
/// that belong to a loaded question.
pub fn read_answers(path: &Path, questions: &QuestionSet, strip: bool) -> Result<AnswerSet> {
    info!("Reading answers from {:?}", path);

    let mut reader = ReaderBuilder::new().from_path(path).map_err(csv_err(path))?;
    let headers = reader.byte_headers().map_err(csv_err(path))?.clone();
    let mut set = AnswerSet::default();
    if headers.is_empty() {
        warn!("{:?} is empty", path);
        return Ok(set);
    }
    let [parent_col, body_col] = column_indices(path, &headers, ["ParentId", "Body"])?;

    let mut record = ByteRecord::new();

    while reader.read_byte_record(&mut record).map_err(csv_err(path))? {
        let parent_id = field(&record, parent_col);
        if !questions.contains(&parent_id) {
            set.orphans += 1;
            continue;
        }
        set.answers.push(Answer {
            parent_id,
            body: clean(field(&record, body_col), strip),
        });
    }

    debug!("Skipped {} answers without a loaded question", set.orphans);
    info!("Loaded {} answers", set.answers.len());
    Ok(set)
}
