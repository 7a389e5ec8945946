//! Marks record store.
//!
//! `percentage` and `grade` are never accepted from callers. Every write path
//! (create, update, bulk ingestion) builds them with [`grading::derive`].

use crate::dates;
use crate::error::{CoreError, CoreResult};
use crate::grading::{self, Grade};
use crate::students::{self, Student};
use chrono::NaiveDate;
use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamType {
    #[serde(rename = "Unit Test")]
    UnitTest,
    #[serde(rename = "Mid Term")]
    MidTerm,
    Final,
    #[serde(rename = "Monthly Test")]
    MonthlyTest,
    #[serde(rename = "Weekly Test")]
    WeeklyTest,
}

impl ExamType {
    pub const ALL: [ExamType; 5] = [
        ExamType::UnitTest,
        ExamType::MidTerm,
        ExamType::Final,
        ExamType::MonthlyTest,
        ExamType::WeeklyTest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExamType::UnitTest => "Unit Test",
            ExamType::MidTerm => "Mid Term",
            ExamType::Final => "Final",
            ExamType::MonthlyTest => "Monthly Test",
            ExamType::WeeklyTest => "Weekly Test",
        }
    }

    pub fn parse(raw: &str) -> Option<ExamType> {
        let t = raw.trim();
        Self::ALL.into_iter().find(|e| e.as_str() == t)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksEntry {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub class: String,
    pub exam_type: ExamType,
    pub exam_name: String,
    pub exam_date: NaiveDate,
    pub subject: String,
    pub marks_obtained: f64,
    pub total_marks: f64,
    pub percentage: f64,
    pub grade: Grade,
    pub remarks: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Raw create payload; validated by [`create`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMarksEntry {
    pub student_id: Option<String>,
    pub exam_name: Option<String>,
    pub exam_date: Option<String>,
    pub exam_type: Option<String>,
    pub subject: Option<String>,
    pub marks_obtained: Option<f64>,
    pub total_marks: Option<f64>,
    pub remarks: Option<String>,
}

/// Partial update. An empty `remarks` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksPatch {
    pub exam_name: Option<String>,
    pub exam_date: Option<String>,
    pub exam_type: Option<String>,
    pub subject: Option<String>,
    pub marks_obtained: Option<f64>,
    pub total_marks: Option<f64>,
    pub remarks: Option<String>,
}

/// Exam metadata shared by single and bulk writes, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamFields {
    pub exam_name: String,
    pub exam_date: NaiveDate,
    pub exam_type: ExamType,
    pub subject: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksFilter {
    pub student_id: Option<String>,
    pub class: Option<String>,
    pub subject: Option<String>,
    pub exam_type: Option<ExamType>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarksOrder {
    #[default]
    ExamDateDesc,
    ExamDateAsc,
    CreatedDesc,
}

impl MarksOrder {
    pub fn parse(raw: &str) -> Option<MarksOrder> {
        match raw {
            "examDateDesc" => Some(MarksOrder::ExamDateDesc),
            "examDateAsc" => Some(MarksOrder::ExamDateAsc),
            "createdDesc" => Some(MarksOrder::CreatedDesc),
            _ => None,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            MarksOrder::ExamDateDesc => "exam_date DESC, created_at DESC, rowid DESC",
            MarksOrder::ExamDateAsc => "exam_date ASC, created_at DESC, rowid DESC",
            MarksOrder::CreatedDesc => "created_at DESC, rowid DESC",
        }
    }
}

const MARKS_COLUMNS: &str = "id, student_id, student_name, class, exam_type, exam_name,
    exam_date, subject, marks_obtained, total_marks, percentage, grade, remarks,
    created_by, created_at, updated_at";

fn text_opt(obj: &serde_json::Map<String, serde_json::Value>, key: &str) -> CoreResult<Option<String>> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => {
            let Some(s) = v.as_str() else {
                return Err(CoreError::validation(format!(
                    "filters.{} must be string or null",
                    key
                )));
            };
            let t = s.trim();
            if t.is_empty() {
                Ok(None)
            } else {
                Ok(Some(t.to_string()))
            }
        }
    }
}

/// Parses a filter object. Missing, null and empty-string fields mean
/// "unfiltered" on that dimension.
pub fn parse_marks_filter(raw: Option<&serde_json::Value>) -> CoreResult<MarksFilter> {
    let Some(raw) = raw else {
        return Ok(MarksFilter::default());
    };
    if raw.is_null() {
        return Ok(MarksFilter::default());
    }
    let Some(obj) = raw.as_object() else {
        return Err(CoreError::validation("filters must be an object"));
    };

    let exam_type = match text_opt(obj, "examType")? {
        None => None,
        Some(t) => Some(ExamType::parse(&t).ok_or_else(|| {
            CoreError::validation_with(
                "filters.examType is not a known exam type",
                json!({ "examType": t }),
            )
        })?),
    };
    let parse_bound = |key: &str| -> CoreResult<Option<NaiveDate>> {
        match text_opt(obj, key)? {
            None => Ok(None),
            Some(t) => dates::parse_date(&t).map(Some).ok_or_else(|| {
                CoreError::validation_with(
                    format!("filters.{} must be a date (YYYY-MM-DD)", key),
                    json!({ key: t }),
                )
            }),
        }
    };
    let from_date = parse_bound("fromDate")?;
    let to_date = parse_bound("toDate")?;
    if let (Some(from), Some(to)) = (from_date, to_date) {
        if from > to {
            return Err(CoreError::validation(
                "filters.fromDate must be <= filters.toDate",
            ));
        }
    }

    Ok(MarksFilter {
        student_id: text_opt(obj, "studentId")?,
        class: text_opt(obj, "class")?,
        subject: text_opt(obj, "subject")?,
        exam_type,
        from_date,
        to_date,
    })
}

fn entry_from_row(r: &Row<'_>) -> rusqlite::Result<MarksEntry> {
    let exam_type_raw: String = r.get(4)?;
    let exam_date_raw: String = r.get(6)?;
    let grade_raw: String = r.get(11)?;
    let bad_text = |idx: usize, what: &str, raw: &str| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid {} in marks row: {}", what, raw).into(),
        )
    };
    Ok(MarksEntry {
        id: r.get(0)?,
        student_id: r.get(1)?,
        student_name: r.get(2)?,
        class: r.get(3)?,
        exam_type: ExamType::parse(&exam_type_raw)
            .ok_or_else(|| bad_text(4, "exam type", &exam_type_raw))?,
        exam_name: r.get(5)?,
        exam_date: dates::parse_date(&exam_date_raw)
            .ok_or_else(|| bad_text(6, "exam date", &exam_date_raw))?,
        subject: r.get(7)?,
        marks_obtained: r.get(8)?,
        total_marks: r.get(9)?,
        percentage: r.get(10)?,
        grade: Grade::parse(&grade_raw).ok_or_else(|| bad_text(11, "grade", &grade_raw))?,
        remarks: r.get(12)?,
        created_by: r.get(13)?,
        created_at: r.get(14)?,
        updated_at: r.get(15)?,
    })
}

fn required_text(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn parse_exam_type(raw: &str) -> CoreResult<ExamType> {
    ExamType::parse(raw).ok_or_else(|| {
        let allowed: Vec<&str> = ExamType::ALL.iter().map(|e| e.as_str()).collect();
        CoreError::validation_with(
            format!("examType must be one of: {}", allowed.join(", ")),
            json!({ "examType": raw }),
        )
    })
}

fn parse_exam_date(raw: &str) -> CoreResult<NaiveDate> {
    dates::parse_date(raw).ok_or_else(|| {
        CoreError::validation_with(
            "examDate must be a date (YYYY-MM-DD)",
            json!({ "examDate": raw }),
        )
    })
}

/// Validates the exam metadata every entry carries. Reports all missing
/// fields at once.
pub fn validate_exam_fields(
    exam_name: Option<&str>,
    exam_date: Option<&str>,
    exam_type: Option<&str>,
    subject: Option<&str>,
) -> CoreResult<ExamFields> {
    let name = required_text(exam_name);
    let date = required_text(exam_date);
    let kind = required_text(exam_type);
    let subject = required_text(subject);

    let mut missing = Vec::new();
    if name.is_none() {
        missing.push("examName");
    }
    if date.is_none() {
        missing.push("examDate");
    }
    if kind.is_none() {
        missing.push("examType");
    }
    if subject.is_none() {
        missing.push("subject");
    }
    let (Some(exam_name), Some(date), Some(kind), Some(subject)) = (name, date, kind, subject)
    else {
        return Err(CoreError::validation_with(
            format!("missing required fields: {}", missing.join(", ")),
            json!({ "fields": missing }),
        ));
    };

    Ok(ExamFields {
        exam_name,
        exam_date: parse_exam_date(&date)?,
        exam_type: parse_exam_type(&kind)?,
        subject,
    })
}

/// Bounds on the raw numbers, checked before derivation so the caller gets
/// a field-specific message.
pub fn check_score_bounds(obtained: f64, total: f64) -> CoreResult<()> {
    if !(obtained >= 0.0) {
        return Err(CoreError::validation_with(
            "marksObtained must be >= 0",
            json!({ "marksObtained": obtained }),
        ));
    }
    if !(total >= 1.0) {
        return Err(CoreError::validation_with(
            "totalMarks must be >= 1",
            json!({ "totalMarks": total }),
        ));
    }
    Ok(())
}

fn derive_checked(obtained: f64, total: f64) -> CoreResult<grading::Derived> {
    check_score_bounds(obtained, total)?;
    grading::derive(obtained, total).map_err(|e| {
        CoreError::validation_with(
            e.message,
            json!({ "marksObtained": e.obtained, "totalMarks": e.total }),
        )
    })
}

/// Builds a complete entry for `student`, snapshotting name and class.
pub fn build_entry(
    student: &Student,
    exam: &ExamFields,
    marks_obtained: f64,
    total_marks: f64,
    remarks: Option<String>,
    created_by: &str,
) -> CoreResult<MarksEntry> {
    let derived = derive_checked(marks_obtained, total_marks)?;
    let now = dates::now_timestamp();
    Ok(MarksEntry {
        id: Uuid::new_v4().to_string(),
        student_id: student.id.clone(),
        student_name: student.name.clone(),
        class: student.class.clone(),
        exam_type: exam.exam_type,
        exam_name: exam.exam_name.clone(),
        exam_date: exam.exam_date,
        subject: exam.subject.clone(),
        marks_obtained,
        total_marks,
        percentage: derived.percentage,
        grade: derived.grade,
        remarks: remarks.filter(|r| !r.trim().is_empty()),
        created_by: created_by.to_string(),
        created_at: now.clone(),
        updated_at: now,
    })
}

pub fn insert_entry(conn: &Connection, e: &MarksEntry) -> CoreResult<()> {
    conn.execute(
        "INSERT INTO marks(id, student_id, student_name, class, exam_type, exam_name, exam_date,
            subject, marks_obtained, total_marks, percentage, grade, remarks, created_by,
            created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            e.id,
            e.student_id,
            e.student_name,
            e.class,
            e.exam_type.as_str(),
            e.exam_name,
            e.exam_date.format("%Y-%m-%d").to_string(),
            e.subject,
            e.marks_obtained,
            e.total_marks,
            e.percentage,
            e.grade.as_str(),
            e.remarks,
            e.created_by,
            e.created_at,
            e.updated_at,
        ],
    )?;
    Ok(())
}

pub fn create(conn: &Connection, new: &NewMarksEntry, created_by: &str) -> CoreResult<MarksEntry> {
    let Some(student_id) = required_text(new.student_id.as_deref()) else {
        return Err(CoreError::validation_with(
            "missing required fields: studentId",
            json!({ "fields": ["studentId"] }),
        ));
    };
    let exam = validate_exam_fields(
        new.exam_name.as_deref(),
        new.exam_date.as_deref(),
        new.exam_type.as_deref(),
        new.subject.as_deref(),
    )?;
    let (Some(obtained), Some(total)) = (new.marks_obtained, new.total_marks) else {
        return Err(CoreError::validation(
            "marksObtained and totalMarks are required",
        ));
    };

    let student = students::find_by_id(conn, &student_id)?.ok_or(CoreError::NotFound("student"))?;
    let entry = build_entry(&student, &exam, obtained, total, new.remarks.clone(), created_by)?;
    insert_entry(conn, &entry)?;
    tracing::info!(
        marks_id = %entry.id,
        student_id = %entry.student_id,
        percentage = entry.percentage,
        grade = %entry.grade,
        "marks entry created"
    );
    Ok(entry)
}

pub fn get(conn: &Connection, id: &str) -> CoreResult<MarksEntry> {
    let sql = format!("SELECT {} FROM marks WHERE id = ?", MARKS_COLUMNS);
    conn.query_row(&sql, [id], entry_from_row)
        .optional()?
        .ok_or(CoreError::NotFound("marks entry"))
}

pub fn update(conn: &Connection, id: &str, patch: &MarksPatch) -> CoreResult<MarksEntry> {
    let mut e = get(conn, id)?;

    if let Some(raw) = patch.exam_name.as_deref() {
        e.exam_name = required_text(Some(raw))
            .ok_or_else(|| CoreError::validation("examName must not be empty"))?;
    }
    if let Some(raw) = patch.subject.as_deref() {
        e.subject = required_text(Some(raw))
            .ok_or_else(|| CoreError::validation("subject must not be empty"))?;
    }
    if let Some(raw) = patch.exam_type.as_deref() {
        e.exam_type = parse_exam_type(raw)?;
    }
    if let Some(raw) = patch.exam_date.as_deref() {
        e.exam_date = parse_exam_date(raw)?;
    }
    if let Some(raw) = patch.remarks.as_deref() {
        e.remarks = required_text(Some(raw));
    }

    if patch.marks_obtained.is_some() || patch.total_marks.is_some() {
        if let Some(v) = patch.marks_obtained {
            e.marks_obtained = v;
        }
        if let Some(v) = patch.total_marks {
            e.total_marks = v;
        }
        let derived = derive_checked(e.marks_obtained, e.total_marks)?;
        e.percentage = derived.percentage;
        e.grade = derived.grade;
    }

    e.updated_at = dates::now_timestamp();
    conn.execute(
        "UPDATE marks SET
            exam_type = ?, exam_name = ?, exam_date = ?, subject = ?, marks_obtained = ?,
            total_marks = ?, percentage = ?, grade = ?, remarks = ?, updated_at = ?
         WHERE id = ?",
        rusqlite::params![
            e.exam_type.as_str(),
            e.exam_name,
            e.exam_date.format("%Y-%m-%d").to_string(),
            e.subject,
            e.marks_obtained,
            e.total_marks,
            e.percentage,
            e.grade.as_str(),
            e.remarks,
            e.updated_at,
            e.id,
        ],
    )?;
    tracing::info!(marks_id = %e.id, percentage = e.percentage, grade = %e.grade, "marks entry updated");
    Ok(e)
}

pub fn delete(conn: &Connection, id: &str) -> CoreResult<()> {
    let n = conn.execute("DELETE FROM marks WHERE id = ?", [id])?;
    if n == 0 {
        return Err(CoreError::NotFound("marks entry"));
    }
    tracing::info!(marks_id = %id, "marks entry deleted");
    Ok(())
}

pub fn delete_by_student(conn: &Connection, student_id: &str) -> CoreResult<usize> {
    Ok(conn.execute("DELETE FROM marks WHERE student_id = ?", [student_id])?)
}

fn filter_sql(filter: &MarksFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    if let Some(v) = &filter.student_id {
        clauses.push("student_id = ?");
        values.push(Value::Text(v.clone()));
    }
    if let Some(v) = &filter.class {
        clauses.push("class = ?");
        values.push(Value::Text(v.clone()));
    }
    if let Some(v) = &filter.subject {
        clauses.push("subject = ?");
        values.push(Value::Text(v.clone()));
    }
    if let Some(v) = filter.exam_type {
        clauses.push("exam_type = ?");
        values.push(Value::Text(v.as_str().to_string()));
    }
    if let Some(v) = filter.from_date {
        clauses.push("exam_date >= ?");
        values.push(Value::Text(v.format("%Y-%m-%d").to_string()));
    }
    if let Some(v) = filter.to_date {
        clauses.push("exam_date <= ?");
        values.push(Value::Text(v.format("%Y-%m-%d").to_string()));
    }
    let sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    (sql, values)
}

pub fn query(conn: &Connection, filter: &MarksFilter, order: MarksOrder) -> CoreResult<Vec<MarksEntry>> {
    query_limited(conn, filter, order, None)
}

/// The most recently written entries across all students.
pub fn recent(conn: &Connection, limit: usize) -> CoreResult<Vec<MarksEntry>> {
    query_limited(conn, &MarksFilter::default(), MarksOrder::CreatedDesc, Some(limit))
}

fn query_limited(
    conn: &Connection,
    filter: &MarksFilter,
    order: MarksOrder,
    limit: Option<usize>,
) -> CoreResult<Vec<MarksEntry>> {
    let (where_sql, values) = filter_sql(filter);
    let limit_sql = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let sql = format!(
        "SELECT {} FROM marks {} ORDER BY {}{}",
        MARKS_COLUMNS,
        where_sql,
        order.sql(),
        limit_sql
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn distinct_exam_count(conn: &Connection) -> CoreResult<i64> {
    Ok(conn.query_row("SELECT COUNT(DISTINCT exam_name) FROM marks", [], |r| {
        r.get(0)
    })?)
}

#[cfg(test)]
pub(crate) fn sample_entry(student_id: &str, subject: &str, exam: &str, date: &str, obtained: f64, total: f64) -> NewMarksEntry {
    NewMarksEntry {
        student_id: Some(student_id.to_string()),
        exam_name: Some(exam.to_string()),
        exam_date: Some(date.to_string()),
        exam_type: Some("Unit Test".to_string()),
        subject: Some(subject.to_string()),
        marks_obtained: Some(obtained),
        total_marks: Some(total),
        remarks: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::students::{sample, StudentPatch};

    fn setup() -> (Connection, Student) {
        let conn = db::open_in_memory();
        let s = students::create(&conn, &sample("Asha", "asha@school.com", "9th")).expect("student");
        (conn, s)
    }

    #[test]
    fn create_derives_percentage_and_grade() {
        let (conn, s) = setup();
        let e = create(&conn, &sample_entry(&s.id, "Math", "UT1", "2024-03-01", 45.0, 50.0), "admin-1")
            .expect("create");
        assert_eq!(e.percentage, 90.0);
        assert_eq!(e.grade, Grade::APlus);
        assert_eq!(e.student_name, "Asha");
        assert_eq!(e.class, "9th");
        assert_eq!(e.created_by, "admin-1");

        let stored = get(&conn, &e.id).expect("get");
        assert_eq!(stored, e);
    }

    #[test]
    fn create_rejects_invalid_input() {
        let (conn, s) = setup();
        let e = create(&conn, &sample_entry(&s.id, "Math", "UT1", "2024-03-01", 51.0, 50.0), "a")
            .unwrap_err();
        assert_eq!(e.code(), "bad_params");
        assert!(e.to_string().contains("exceed"));

        let mut bad = sample_entry(&s.id, "Math", "UT1", "2024-03-01", 5.0, 0.0);
        assert_eq!(create(&conn, &bad, "a").unwrap_err().code(), "bad_params");
        bad.total_marks = Some(10.0);
        bad.exam_type = Some("Pop Quiz".into());
        assert_eq!(create(&conn, &bad, "a").unwrap_err().code(), "bad_params");

        let mut missing = sample_entry(&s.id, "", "", "2024-03-01", 5.0, 10.0);
        missing.exam_date = None;
        let e = create(&conn, &missing, "a").unwrap_err();
        let msg = e.to_string();
        assert!(msg.contains("examName") && msg.contains("examDate") && msg.contains("subject"));

        let e = create(&conn, &sample_entry("ghost", "Math", "UT1", "2024-03-01", 5.0, 10.0), "a")
            .unwrap_err();
        assert_eq!(e.code(), "not_found");

        assert!(query(&conn, &MarksFilter::default(), MarksOrder::default())
            .expect("query")
            .is_empty());
    }

    #[test]
    fn updating_total_alone_rederives() {
        let (conn, s) = setup();
        let e = create(&conn, &sample_entry(&s.id, "Math", "UT1", "2024-03-01", 45.0, 50.0), "a")
            .expect("create");
        let u = update(
            &conn,
            &e.id,
            &MarksPatch {
                total_marks: Some(100.0),
                ..MarksPatch::default()
            },
        )
        .expect("update");
        assert_eq!(u.marks_obtained, 45.0);
        assert_eq!(u.percentage, 45.0);
        assert_eq!(u.grade, Grade::D);
        assert_eq!(get(&conn, &e.id).expect("get").grade, Grade::D);

        let err = update(
            &conn,
            &e.id,
            &MarksPatch {
                total_marks: Some(40.0),
                ..MarksPatch::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), "bad_params");
        assert_eq!(get(&conn, &e.id).expect("unchanged").total_marks, 100.0);
    }

    #[test]
    fn update_edits_metadata_and_remarks() {
        let (conn, s) = setup();
        let mut new = sample_entry(&s.id, "Math", "UT1", "2024-03-01", 30.0, 50.0);
        new.remarks = Some("needs practice".into());
        let e = create(&conn, &new, "a").expect("create");
        let u = update(
            &conn,
            &e.id,
            &MarksPatch {
                exam_type: Some("Final".into()),
                exam_date: Some("2024-04-02".into()),
                remarks: Some(String::new()),
                ..MarksPatch::default()
            },
        )
        .expect("update");
        assert_eq!(u.exam_type, ExamType::Final);
        assert_eq!(u.exam_date, NaiveDate::from_ymd_opt(2024, 4, 2).expect("date"));
        assert_eq!(u.remarks, None);
        assert_eq!(u.percentage, 60.0);

        assert_eq!(
            update(&conn, "missing", &MarksPatch::default()).unwrap_err().code(),
            "not_found"
        );
    }

    #[test]
    fn delete_and_cascade() {
        let (conn, s) = setup();
        let a = create(&conn, &sample_entry(&s.id, "Math", "UT1", "2024-03-01", 30.0, 50.0), "a")
            .expect("a");
        create(&conn, &sample_entry(&s.id, "Science", "UT1", "2024-03-01", 30.0, 50.0), "a")
            .expect("b");
        delete(&conn, &a.id).expect("delete");
        assert_eq!(delete(&conn, &a.id).unwrap_err().code(), "not_found");

        create(&conn, &sample_entry(&s.id, "English", "UT1", "2024-03-01", 30.0, 50.0), "a")
            .expect("c");
        assert_eq!(students::delete(&conn, &s.id).expect("delete student"), 2);
        assert!(query(&conn, &MarksFilter::default(), MarksOrder::default())
            .expect("query")
            .is_empty());
    }

    #[test]
    fn snapshot_survives_student_edits() {
        let (conn, s) = setup();
        let e = create(&conn, &sample_entry(&s.id, "Math", "UT1", "2024-03-01", 30.0, 50.0), "a")
            .expect("create");
        students::update(
            &conn,
            &s.id,
            &StudentPatch {
                name: Some("Asha Rao".into()),
                class: Some("10th".into()),
                ..StudentPatch::default()
            },
        )
        .expect("edit student");
        let stored = get(&conn, &e.id).expect("get");
        assert_eq!(stored.student_name, "Asha");
        assert_eq!(stored.class, "9th");
    }

    #[test]
    fn query_filters_and_orders() {
        let (conn, s) = setup();
        let other = students::create(&conn, &sample("Bilal", "bilal@school.com", "10th")).expect("b");
        create(&conn, &sample_entry(&s.id, "Math", "UT1", "2024-01-10", 30.0, 50.0), "a").expect("1");
        create(&conn, &sample_entry(&s.id, "Math", "UT2", "2024-03-10", 40.0, 50.0), "a").expect("2");
        create(&conn, &sample_entry(&s.id, "Science", "UT2", "2024-03-10", 20.0, 50.0), "a").expect("3");
        create(&conn, &sample_entry(&other.id, "Math", "UT2", "2024-02-10", 50.0, 50.0), "a").expect("4");

        let all = query(&conn, &MarksFilter::default(), MarksOrder::default()).expect("all");
        let dates: Vec<String> = all.iter().map(|e| e.exam_date.to_string()).collect();
        assert_eq!(dates, ["2024-03-10", "2024-03-10", "2024-02-10", "2024-01-10"]);

        let f = MarksFilter {
            student_id: Some(s.id.clone()),
            subject: Some("Math".into()),
            ..MarksFilter::default()
        };
        assert_eq!(query(&conn, &f, MarksOrder::default()).expect("q").len(), 2);

        let f = MarksFilter {
            class: Some("10th".into()),
            ..MarksFilter::default()
        };
        assert_eq!(query(&conn, &f, MarksOrder::default()).expect("q").len(), 1);

        let f = MarksFilter {
            from_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            to_date: NaiveDate::from_ymd_opt(2024, 3, 10),
            ..MarksFilter::default()
        };
        let ranged = query(&conn, &f, MarksOrder::ExamDateAsc).expect("range");
        assert_eq!(ranged.len(), 3);
        assert_eq!(ranged[0].exam_date.to_string(), "2024-02-10");

        let f = MarksFilter {
            exam_type: Some(ExamType::Final),
            ..MarksFilter::default()
        };
        assert!(query(&conn, &f, MarksOrder::default()).expect("q").is_empty());

        let recent = recent(&conn, 2).expect("recent");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].student_id, other.id);
        assert_eq!(distinct_exam_count(&conn).expect("count"), 2);
    }

    #[test]
    fn parse_filter_treats_blank_as_unfiltered() {
        let raw = json!({
            "studentId": "",
            "class": "9th",
            "subject": null,
            "examType": "Mid Term",
            "fromDate": "2024-01-01",
            "toDate": "2024-06-30T00:00:00Z"
        });
        let f = parse_marks_filter(Some(&raw)).expect("parse");
        assert_eq!(f.student_id, None);
        assert_eq!(f.class.as_deref(), Some("9th"));
        assert_eq!(f.exam_type, Some(ExamType::MidTerm));
        assert_eq!(f.to_date, NaiveDate::from_ymd_opt(2024, 6, 30));

        assert!(parse_marks_filter(Some(&json!({ "examType": "Quiz" }))).is_err());
        assert!(parse_marks_filter(Some(&json!({ "fromDate": "2024-05-01", "toDate": "2024-01-01" }))).is_err());
        assert!(parse_marks_filter(Some(&json!([1, 2]))).is_err());
        assert_eq!(parse_marks_filter(None).expect("none"), MarksFilter::default());
    }
}
