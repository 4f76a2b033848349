//! Turning questions and answers into embeddable records.

use std::collections::HashMap;

use qa_core::{LoadMode, QaPair, QaRecord, QaThread, Result};

use crate::csv_source::{AnswerSet, QuestionSet};

/// Build records in the requested layout.
///
/// - [`LoadMode::Pairs`]: one record per answer, in answer-file order,
///   embedded on the question body.
/// - [`LoadMode::Grouped`]: one record per question, in question-file order,
///   embedded on `"{title}. {body}"`, carrying every answer. Questions without
///   answers are kept with an empty list.
pub fn build_records(
    mode: LoadMode,
    questions: &QuestionSet,
    answers: &AnswerSet,
) -> Result<Vec<QaRecord>> {
    match mode {
        LoadMode::Pairs => answers
            .answers
            .iter()
            .filter_map(|answer| questions.get(&answer.parent_id).map(|q| (q, answer)))
            .map(|(question, answer)| {
                QaRecord::new(
                    question.body.as_str(),
                    &QaPair {
                        title: question.title.clone(),
                        question: question.body.clone(),
                        answer: answer.body.clone(),
                    },
                )
            })
            .collect(),
        LoadMode::Grouped => {
            let mut by_question: HashMap<&str, Vec<String>> = HashMap::new();
            for answer in &answers.answers {
                by_question
                    .entry(answer.parent_id.as_str())
                    .or_default()
                    .push(answer.body.clone());
            }

            questions
                .iter()
                .map(|question| {
                    QaRecord::new(
                        format!("{}. {}", question.title, question.body),
                        &QaThread {
                            title: question.title.clone(),
                            question: question.body.clone(),
                            answers: by_question.remove(question.id.as_str()).unwrap_or_default(),
                        },
                    )
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_core::{Answer, Question};
    use serde_json::json;

    fn fixtures() -> (QuestionSet, AnswerSet) {
        let mut questions = QuestionSet::new();
        questions.insert(Question {
            id: "1".to_string(),
            title: "Reverse a list".to_string(),
            body: "How do I reverse a list?".to_string(),
        });
        questions.insert(Question {
            id: "2".to_string(),
            title: "Unanswered".to_string(),
            body: "Anyone?".to_string(),
        });

        let answers = AnswerSet {
            answers: vec![
                Answer {
                    parent_id: "1".to_string(),
                    body: "Use reversed()".to_string(),
                },
                Answer {
                    parent_id: "1".to_string(),
                    body: "Slice with [::-1]".to_string(),
                },
            ],
            orphans: 0,
        };
        (questions, answers)
    }

    #[test]
    fn test_pairs_mode() {
        let (questions, answers) = fixtures();
        let records = build_records(LoadMode::Pairs, &questions, &answers).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "How do I reverse a list?");
        assert_eq!(records[0].payload["title"], "Reverse a list");
        assert_eq!(records[0].payload["question"], "How do I reverse a list?");
        assert_eq!(records[0].payload["answer"], "Use reversed()");
        assert_eq!(records[1].payload["answer"], "Slice with [::-1]");
        assert!(!records[0].payload.contains_key("answers"));
    }

    #[test]
    fn test_grouped_mode() {
        let (questions, answers) = fixtures();
        let records = build_records(LoadMode::Grouped, &questions, &answers).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "Reverse a list. How do I reverse a list?");
        assert_eq!(
            records[0].payload["answers"],
            json!(["Use reversed()", "Slice with [::-1]"])
        );
        assert_eq!(records[1].payload["title"], "Unanswered");
        assert_eq!(records[1].payload["answers"], json!([]));
    }

    #[test]
    fn test_empty_inputs() {
        let records =
            build_records(LoadMode::Grouped, &QuestionSet::new(), &AnswerSet::default()).unwrap();
        assert!(records.is_empty());
    }
}
