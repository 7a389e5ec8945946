use crate::error::{CoreError, CoreResult};
use crate::marks::{self, MarksEntry};
use crate::students;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const MAX_BULK_ROWS: usize = 5000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkMarksRequest {
    pub exam_name: Option<String>,
    pub exam_date: Option<String>,
    pub exam_type: Option<String>,
    pub subject: Option<String>,
    pub total_marks: Option<f64>,
    #[serde(default)]
    pub students: Option<Vec<BulkRow>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRow {
    /// Internal id or student code.
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub marks_obtained: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSkip {
    pub index: usize,
    pub student_id: String,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    pub count: usize,
    pub marks: Vec<MarksEntry>,
    pub skipped: Vec<BulkSkip>,
}

/// Writes one entry per resolvable row. Shared metadata is checked before
/// anything is written; rows that cannot be resolved or derived are skipped
/// and reported. A database failure stops the batch, leaving earlier rows.
pub fn ingest(conn: &Connection, req: &BulkMarksRequest, created_by: &str) -> CoreResult<BulkOutcome> {
    let rows = match req.students.as_deref() {
        Some(rows) if !rows.is_empty() => rows,
        _ => return Err(CoreError::validation("students list is required")),
    };
    if rows.len() > MAX_BULK_ROWS {
        return Err(CoreError::validation_with(
            format!("too many rows (max {})", MAX_BULK_ROWS),
            json!({ "rows": rows.len(), "max": MAX_BULK_ROWS }),
        ));
    }
    let exam = marks::validate_exam_fields(
        req.exam_name.as_deref(),
        req.exam_date.as_deref(),
        req.exam_type.as_deref(),
        req.subject.as_deref(),
    )?;
    let Some(total_marks) = req.total_marks else {
        return Err(CoreError::validation_with(
            "missing required fields: totalMarks",
            json!({ "fields": ["totalMarks"] }),
        ));
    };
    marks::check_score_bounds(0.0, total_marks)?;

    let mut created = Vec::new();
    let mut skipped = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let reference = row.student_id.trim();
        let mut skip = |code: &'static str, message: String| {
            tracing::debug!(index, student_ref = %reference, code, %message, "bulk row skipped");
            skipped.push(BulkSkip {
                index,
                student_id: reference.to_string(),
                code,
                message,
            });
        };

        if reference.is_empty() {
            skip("bad_params", "studentId is required".to_string());
            continue;
        }
        let Some(student) = students::resolve(conn, reference)? else {
            skip("not_found", "student not found".to_string());
            continue;
        };
        let Some(obtained) = row.marks_obtained else {
            skip("bad_params", "marksObtained is required".to_string());
            continue;
        };
        let entry = match marks::build_entry(&student, &exam, obtained, total_marks, None, created_by) {
            Ok(e) => e,
            Err(CoreError::Validation { message, .. }) => {
                skip("bad_params", message);
                continue;
            }
            Err(e) => return Err(e),
        };
        marks::insert_entry(conn, &entry)?;
        created.push(entry);
    }

    tracing::info!(
        exam = %exam.exam_name,
        subject = %exam.subject,
        created = created.len(),
        skipped = skipped.len(),
        "bulk marks upload"
    );
    Ok(BulkOutcome {
        count: created.len(),
        marks: created,
        skipped,
    })
}
