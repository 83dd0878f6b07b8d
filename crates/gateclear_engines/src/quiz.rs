#![forbid(unsafe_code)]

use gateclear_contracts::application::RulesQuizAnswers;

use crate::stepcheck::FieldError;

/// The fixed facility-rules quiz. Correctness is a pure function of the
/// question; presentation (wrong-answer callouts) belongs to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizQuestion {
    EscortRequired,
    ContrabandDeclared,
    DressCode,
    ResidentContact,
    RecordingDevices,
}

impl QuizQuestion {
    pub const ALL: [QuizQuestion; 5] = [
        QuizQuestion::EscortRequired,
        QuizQuestion::ContrabandDeclared,
        QuizQuestion::DressCode,
        QuizQuestion::ResidentContact,
        QuizQuestion::RecordingDevices,
    ];

    pub fn field_name(self) -> &'static str {
        match self {
            Self::EscortRequired => "rules.escort_required",
            Self::ContrabandDeclared => "rules.contraband_declared",
            Self::DressCode => "rules.dress_code_acknowledged",
            Self::ResidentContact => "rules.contact_with_residents",
            Self::RecordingDevices => "rules.recording_devices",
        }
    }

    /// Visitors must stay with their escort, declare carried items, and
    /// follow the dress code; resident contact and recording devices are
    /// prohibited.
    pub fn expected_answer(self) -> bool {
        match self {
            Self::EscortRequired => true,
            Self::ContrabandDeclared => true,
            Self::DressCode => true,
            Self::ResidentContact => false,
            Self::RecordingDevices => false,
        }
    }
}

pub fn answer_is_correct(question: QuizQuestion, answer: bool) -> bool {
    answer == question.expected_answer()
}

fn answer_for(answers: &RulesQuizAnswers, question: QuizQuestion) -> Option<bool> {
    match question {
        QuizQuestion::EscortRequired => answers.escort_required,
        QuizQuestion::ContrabandDeclared => answers.contraband_declared,
        QuizQuestion::DressCode => answers.dress_code_acknowledged,
        QuizQuestion::ResidentContact => answers.contact_with_residents,
        QuizQuestion::RecordingDevices => answers.recording_devices,
    }
}

/// Every unanswered or wrong answer, plus a missing acknowledgment, as
/// field errors. Empty means the quiz section is submission-ready.
pub fn quiz_errors(answers: &RulesQuizAnswers) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for question in QuizQuestion::ALL {
        match answer_for(answers, question) {
            None => errors.push(FieldError {
                field: question.field_name(),
                message: "must be answered",
            }),
            Some(given) if !answer_is_correct(question, given) => errors.push(FieldError {
                field: question.field_name(),
                message: "answer does not match facility rules",
            }),
            Some(_) => {}
        }
    }
    if !answers.acknowledged {
        errors.push(FieldError {
            field: "rules.acknowledged",
            message: "rules must be acknowledged",
        });
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_correct() -> RulesQuizAnswers {
        RulesQuizAnswers {
            escort_required: Some(true),
            contraband_declared: Some(true),
            dress_code_acknowledged: Some(true),
            contact_with_residents: Some(false),
            recording_devices: Some(false),
            acknowledged: true,
        }
    }

    #[test]
    fn at_quiz_01_all_correct_answers_produce_no_errors() {
        assert!(quiz_errors(&all_correct()).is_empty());
    }

    #[test]
    fn at_quiz_02_every_wrong_or_missing_answer_is_reported() {
        let mut answers = all_correct();
        answers.escort_required = Some(false);
        answers.recording_devices = None;
        answers.acknowledged = false;
        let errors = quiz_errors(&answers);
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "rules.escort_required",
                "rules.recording_devices",
                "rules.acknowledged"
            ]
        );
    }

    #[test]
    fn at_quiz_03_predicate_is_pure_per_question() {
        assert!(answer_is_correct(QuizQuestion::EscortRequired, true));
        assert!(!answer_is_correct(QuizQuestion::EscortRequired, false));
        assert!(answer_is_correct(QuizQuestion::ResidentContact, false));
        assert!(!answer_is_correct(QuizQuestion::RecordingDevices, true));
    }
}
