//! Point-of-interest data model.
//!
//! A zone document on disk is a JSON array of [`PoiRecord`]s, the wire shape
//! the mobile app writes. The engine works on [`PointOfInterest`], the
//! normalized domain form; conversion between the two happens at the store
//! boundary and enforces the structural invariants (quiz answer index in
//! bounds, fences never visited and never quizzed).

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::logutil::escape_log;

/// POI classification. `Fence` is a geofence boundary marker with inverted
/// semantics: it alerts when the walker is too far away, and it never becomes
/// "visited".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PoiCategory {
    Plant,
    Animal,
    Location,
    Fence,
}

impl PoiCategory {
    pub fn is_fence(&self) -> bool {
        matches!(self, PoiCategory::Fence)
    }
}

/// A multiple-choice quiz attached to a POI. `correct_answer_index` always
/// indexes into `answers`; records violating that load without their quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quiz {
    pub question: String,
    pub answers: Vec<String>,
    pub correct_answer_index: usize,
}

impl Quiz {
    pub fn new(question: impl Into<String>, answers: Vec<String>, correct: usize) -> Self {
        Self {
            question: question.into(),
            answers,
            correct_answer_index: correct,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        !self.answers.is_empty() && self.correct_answer_index < self.answers.len()
    }

    pub fn is_correct(&self, answer_index: usize) -> bool {
        answer_index == self.correct_answer_index
    }
}

/// Per-POI progression. Only non-fence POIs carry one; quiz states are only
/// reachable when a quiz exists. There is no path back to `Unvisited`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    Unvisited,
    Visited,
    QuizCompleted,
}

impl VisitState {
    /// Transition taken when the walker comes within the visit radius.
    pub fn on_proximity(self) -> VisitState {
        match self {
            VisitState::Unvisited => VisitState::Visited,
            other => other,
        }
    }

    /// Transition taken when the walker answers the quiz correctly.
    pub fn on_correct_answer(self) -> VisitState {
        match self {
            VisitState::Visited => VisitState::QuizCompleted,
            other => other,
        }
    }

    pub fn is_visited(self) -> bool {
        !matches!(self, VisitState::Unvisited)
    }
}

/// A named geolocated entity the walker can approach. Domain form used by the
/// tracker; persisted via [`PoiRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct PointOfInterest {
    pub id: String,
    pub name: String,
    pub description: String,
    pub coordinate: Coordinate,
    pub category: PoiCategory,
    pub visited: bool,
    pub visited_at: Option<DateTime<Utc>>,
    pub quiz: Option<Quiz>,
    pub quiz_completed: bool,
    pub zone: String,
}

impl PointOfInterest {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        coordinate: Coordinate,
        category: PoiCategory,
        zone: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            coordinate,
            category,
            visited: false,
            visited_at: None,
            quiz: None,
            quiz_completed: false,
            zone: zone.into(),
        }
    }

    pub fn with_quiz(mut self, quiz: Quiz) -> Self {
        self.quiz = Some(quiz);
        self
    }

    /// Current state machine position derived from the sticky flags.
    pub fn visit_state(&self) -> VisitState {
        if self.quiz_completed {
            VisitState::QuizCompleted
        } else if self.visited {
            VisitState::Visited
        } else {
            VisitState::Unvisited
        }
    }

    /// Apply a state machine position back onto the sticky flags, stamping
    /// `visited_at` on the first visit.
    pub fn apply_state(&mut self, state: VisitState, now: DateTime<Utc>) {
        match state {
            VisitState::Unvisited => {}
            VisitState::Visited => {
                if !self.visited {
                    self.visited = true;
                    self.visited_at = Some(now);
                }
            }
            VisitState::QuizCompleted => {
                if !self.visited {
                    self.visited = true;
                    self.visited_at = Some(now);
                }
                self.quiz_completed = true;
            }
        }
    }
}

/// Persisted wire shape, one record per POI. Field names and types match the
/// documents the mobile app reads and writes: camelCase keys, `visited` as
/// `0|1`, quiz fields nullable. `visitedAt` is emitted only when set so
/// documents stay readable by older app builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoiRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub visited: u8,
    #[serde(default)]
    pub quiz_question: Option<String>,
    #[serde(default)]
    pub quiz_answers: Option<Vec<String>>,
    #[serde(default)]
    pub correct_answer_index: Option<usize>,
    #[serde(default)]
    pub quiz_completed: bool,
    pub category: PoiCategory,
    pub zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visited_at: Option<DateTime<Utc>>,
}

impl PoiRecord {
    /// Convert a wire record into the domain form, normalizing anything that
    /// violates the structural invariants. Normalization is logged but never
    /// fails: a hand-edited document should degrade per record, not reject
    /// the whole zone.
    pub fn into_domain(self) -> PointOfInterest {
        let mut visited = self.visited != 0;
        let mut visited_at = self.visited_at;
        let mut quiz_completed = self.quiz_completed;

        let mut quiz = match (self.quiz_question, self.quiz_answers, self.correct_answer_index) {
            (Some(question), Some(answers), Some(index)) => {
                let candidate = Quiz::new(question, answers, index);
                if candidate.is_well_formed() {
                    Some(candidate)
                } else {
                    warn!(
                        "poi {}: quiz answer index {} out of bounds, dropping quiz",
                        escape_log(&self.id),
                        index
                    );
                    None
                }
            }
            (None, None, None) => None,
            _ => {
                warn!(
                    "poi {}: incomplete quiz fields, dropping quiz",
                    escape_log(&self.id)
                );
                None
            }
        };

        if self.category.is_fence() {
            if quiz.is_some() {
                warn!(
                    "poi {}: fence markers cannot carry a quiz, dropping it",
                    escape_log(&self.id)
                );
                quiz = None;
            }
            if visited {
                warn!(
                    "poi {}: fence markers are never visited, clearing flag",
                    escape_log(&self.id)
                );
                visited = false;
                visited_at = None;
            }
        }

        if quiz_completed && (quiz.is_none() || !visited) {
            warn!(
                "poi {}: quizCompleted without a visited quiz, clearing flag",
                escape_log(&self.id)
            );
            quiz_completed = false;
        }

        PointOfInterest {
            id: self.id,
            name: self.name,
            description: self.description,
            coordinate: Coordinate::new(self.latitude, self.longitude),
            category: self.category,
            visited,
            visited_at,
            quiz,
            quiz_completed,
            zone: self.zone,
        }
    }

    pub fn from_domain(poi: &PointOfInterest) -> PoiRecord {
        PoiRecord {
            id: poi.id.clone(),
            name: poi.name.clone(),
            description: poi.description.clone(),
            latitude: poi.coordinate.latitude,
            longitude: poi.coordinate.longitude,
            visited: u8::from(poi.visited),
            quiz_question: poi.quiz.as_ref().map(|q| q.question.clone()),
            quiz_answers: poi.quiz.as_ref().map(|q| q.answers.clone()),
            correct_answer_index: poi.quiz.as_ref().map(|q| q.correct_answer_index),
            quiz_completed: poi.quiz_completed,
            category: poi.category,
            zone: poi.zone.clone(),
            visited_at: poi.visited_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> PoiRecord {
        PoiRecord {
            id: "oak-1".into(),
            name: "Old Oak".into(),
            description: "A very old oak tree".into(),
            latitude: 57.7,
            longitude: 11.97,
            visited: 0,
            quiz_question: Some("How old can oaks get?".into()),
            quiz_answers: Some(vec!["100 years".into(), "1000 years".into()]),
            correct_answer_index: Some(1),
            quiz_completed: false,
            category: PoiCategory::Plant,
            zone: "forest".into(),
            visited_at: None,
        }
    }

    #[test]
    fn wire_shape_round_trips() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["visited"], 0);
        assert_eq!(json["category"], "plant");
        assert_eq!(json["quizQuestion"], "How old can oaks get?");
        assert_eq!(json["correctAnswerIndex"], 1);
        assert!(json.get("visitedAt").is_none());

        let back: PoiRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, "oak-1");
        assert_eq!(back.visited, 0);
    }

    #[test]
    fn visited_flag_accepts_zero_and_one() {
        let mut rec = sample_record();
        rec.visited = 1;
        let json = serde_json::to_string(&rec).unwrap();
        let poi = serde_json::from_str::<PoiRecord>(&json)
            .unwrap()
            .into_domain();
        assert!(poi.visited);
    }

    #[test]
    fn quiz_with_out_of_bounds_index_is_dropped() {
        let mut rec = sample_record();
        rec.correct_answer_index = Some(7);
        let poi = rec.into_domain();
        assert!(poi.quiz.is_none());
    }

    #[test]
    fn partial_quiz_fields_are_dropped() {
        let mut rec = sample_record();
        rec.quiz_answers = None;
        let poi = rec.into_domain();
        assert!(poi.quiz.is_none());
    }

    #[test]
    fn fence_records_are_normalized() {
        let mut rec = sample_record();
        rec.category = PoiCategory::Fence;
        rec.visited = 1;
        let poi = rec.into_domain();
        assert!(poi.quiz.is_none());
        assert!(!poi.visited);
        assert!(poi.visited_at.is_none());
    }

    #[test]
    fn quiz_completed_requires_visited_quiz() {
        let mut rec = sample_record();
        rec.quiz_completed = true; // but visited == 0
        let poi = rec.into_domain();
        assert!(!poi.quiz_completed);
    }

    #[test]
    fn state_machine_is_monotonic() {
        let s = VisitState::Unvisited;
        let s = s.on_proximity();
        assert_eq!(s, VisitState::Visited);
        // Proximity again is a no-op.
        assert_eq!(s.on_proximity(), VisitState::Visited);

        let s = s.on_correct_answer();
        assert_eq!(s, VisitState::QuizCompleted);
        // Terminal: nothing moves it back.
        assert_eq!(s.on_proximity(), VisitState::QuizCompleted);
        assert_eq!(s.on_correct_answer(), VisitState::QuizCompleted);
    }

    #[test]
    fn correct_answer_requires_visit_first() {
        assert_eq!(
            VisitState::Unvisited.on_correct_answer(),
            VisitState::Unvisited
        );
    }

    #[test]
    fn apply_state_stamps_visited_at_once() {
        let mut poi = sample_record().into_domain();
        let t1 = Utc::now();
        poi.apply_state(VisitState::Visited, t1);
        assert_eq!(poi.visited_at, Some(t1));

        let t2 = t1 + chrono::Duration::seconds(60);
        poi.apply_state(VisitState::QuizCompleted, t2);
        // First visit timestamp is preserved.
        assert_eq!(poi.visited_at, Some(t1));
        assert!(poi.quiz_completed);
    }
}
