//! Diary, lessons and assignments of the `student/diary` endpoints.
use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::netschool::{
    errors::NetSchoolError,
    helpers::{deserialize_date, deserialize_time},
};

/// Assignment type id to its human-readable name, fetched on login.
pub type AssignmentTypes = HashMap<i64, String>;

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Diary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub schedule: Vec<Day>,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Day {
    pub day: NaiveDate,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Lesson {
    pub day: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub room: Option<String>,
    pub number: i32,
    pub subject: String,
    pub assignments: Vec<Assignment>,
}

/// A homework, test or any other graded task of a lesson.
/// `mark` and `is_duty` come from the nested mark object; a task without a
/// mark is never a duty.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Assignment {
    pub id: i64,
    pub comment: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub mark: Option<i32>,
    pub is_duty: bool,
    pub deadline: NaiveDate,
}

impl Diary {
    pub fn from_json(
        body: &[u8],
        assignment_types: &AssignmentTypes,
    ) -> Result<Diary, NetSchoolError> {
        let raw: RawDiary = serde_json::from_slice(body)?;
        raw.resolve(assignment_types)
    }
}

impl Assignment {
    pub fn list_from_json(
        body: &[u8],
        assignment_types: &AssignmentTypes,
    ) -> Result<Vec<Assignment>, NetSchoolError> {
        let raw: Vec<RawAssignment> = serde_json::from_slice(body)?;
        raw.into_iter()
            .map(|assignment| assignment.resolve(assignment_types))
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDiary {
    #[serde(deserialize_with = "deserialize_date")]
    week_start: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    week_end: NaiveDate,
    week_days: Vec<RawDay>,
}

#[derive(Deserialize)]
struct RawDay {
    #[serde(deserialize_with = "deserialize_date")]
    date: NaiveDate,
    lessons: Vec<RawLesson>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLesson {
    #[serde(deserialize_with = "deserialize_date")]
    day: NaiveDate,
    #[serde(deserialize_with = "deserialize_time")]
    start_time: NaiveTime,
    #[serde(deserialize_with = "deserialize_time")]
    end_time: NaiveTime,
    room: Option<String>,
    number: i32,
    subject_name: String,
    assignments: Option<Vec<RawAssignment>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAssignment {
    id: i64,
    type_id: i64,
    assignment_name: String,
    mark: Option<RawMark>,
    mark_comment: Option<RawMarkComment>,
    #[serde(deserialize_with = "deserialize_date")]
    due_date: NaiveDate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMark {
    mark: Option<i32>,
    duty_mark: bool,
}

#[derive(Deserialize)]
struct RawMarkComment {
    name: String,
}

impl RawDiary {
    fn resolve(self, assignment_types: &AssignmentTypes) -> Result<Diary, NetSchoolError> {
        let schedule = self
            .week_days
            .into_iter()
            .map(|day| {
                Ok(Day {
                    day: day.date,
                    lessons: day
                        .lessons
                        .into_iter()
                        .map(|lesson| lesson.resolve(assignment_types))
                        .collect::<Result<Vec<_>, _>>()?,
                })
            })
            .collect::<Result<Vec<_>, NetSchoolError>>()?;

        Ok(Diary {
            start: self.week_start,
            end: self.week_end,
            schedule,
        })
    }
}

impl RawLesson {
    fn resolve(self, assignment_types: &AssignmentTypes) -> Result<Lesson, NetSchoolError> {
        let assignments = self
            .assignments
            .unwrap_or_default()
            .into_iter()
            .map(|assignment| assignment.resolve(assignment_types))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Lesson {
            day: self.day,
            start: self.start_time,
            end: self.end_time,
            room: self.room,
            number: self.number,
            subject: self.subject_name,
            assignments,
        })
    }
}

impl RawAssignment {
    fn resolve(self, assignment_types: &AssignmentTypes) -> Result<Assignment, NetSchoolError> {
        let kind = assignment_types.get(&self.type_id).cloned().ok_or_else(|| {
            NetSchoolError::Deserialization(format!(
                "unknown type {} of assignment {}",
                self.type_id, self.id
            ))
        })?;
        let (mark, is_duty) = match self.mark {
            Some(mark) => (mark.mark, mark.duty_mark),
            None => (None, false),
        };

        Ok(Assignment {
            id: self.id,
            comment: self
                .mark_comment
                .map(|comment| comment.name)
                .unwrap_or_default(),
            kind,
            content: self.assignment_name,
            mark,
            is_duty,
            deadline: self.due_date,
        })
    }
}
