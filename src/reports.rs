use crate::aggregate::{self, ClassCount, ExamPerformance, MonthlyPoint, SubjectAverage, TopPerformer};
use crate::error::CoreResult;
use crate::grading::{self, Grade};
use crate::marks::{self, MarksEntry, MarksFilter, MarksOrder};
use crate::students::{self, Student};
use rusqlite::Connection;
use serde::Serialize;

pub const RECENT_ACTIVITY_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub student_name: String,
    pub exam_name: String,
    pub subject: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_students: i64,
    pub active_students: i64,
    pub total_exams: i64,
    pub average_performance: f64,
    pub class_wise_count: Vec<ClassCount>,
    pub recent_activities: Vec<RecentActivity>,
}

pub fn dashboard(conn: &Connection) -> CoreResult<DashboardStats> {
    let counts = students::counts(conn)?;
    let classes = students::active_classes(conn)?;
    let all = marks::query(conn, &MarksFilter::default(), MarksOrder::default())?;
    let recent = marks::recent(conn, RECENT_ACTIVITY_LIMIT)?;

    Ok(DashboardStats {
        total_students: counts.total,
        active_students: counts.active,
        total_exams: marks::distinct_exam_count(conn)?,
        average_performance: grading::round_off_1_decimal(aggregate::average_percentage(&all)),
        class_wise_count: aggregate::class_counts(classes.iter().map(String::as_str)),
        recent_activities: recent
            .into_iter()
            .map(|e| RecentActivity {
                student_name: e.student_name,
                exam_name: e.exam_name,
                subject: e.subject,
                created_at: e.created_at,
            })
            .collect(),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceAnalytics {
    pub filters: MarksFilter,
    pub top_performers: Vec<TopPerformer>,
    pub subject_wise_analysis: Vec<SubjectAverage>,
    pub monthly_trend: Vec<MonthlyPoint>,
    /// Present when the filter names a subject; zeroed when it has no entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_summary: Option<SubjectAverage>,
}

pub fn performance_analytics(conn: &Connection, filter: &MarksFilter) -> CoreResult<PerformanceAnalytics> {
    let entries = marks::query(conn, filter, MarksOrder::default())?;
    Ok(PerformanceAnalytics {
        filters: filter.clone(),
        top_performers: aggregate::top_performers(&entries, aggregate::TOP_PERFORMERS_LIMIT),
        subject_wise_analysis: aggregate::subject_averages(&entries),
        monthly_trend: aggregate::monthly_trend(&entries),
        subject_summary: filter
            .subject
            .as_deref()
            .map(|subject| aggregate::subject_average(&entries, subject)),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentHeader {
    pub id: String,
    pub student_code: String,
    pub name: String,
    pub class: String,
    pub section: Option<String>,
}

impl From<&Student> for StudentHeader {
    fn from(s: &Student) -> Self {
        Self {
            id: s.id.clone(),
            student_code: s.student_code.clone(),
            name: s.name.clone(),
            class: s.class.clone(),
            section: s.section.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSummary {
    pub student: StudentHeader,
    pub subject_wise: Vec<SubjectAverage>,
    pub exam_wise: Vec<ExamPerformance>,
    pub overall_grade: Grade,
    pub overall_percentage: f64,
    pub class_rank: String,
    pub total_entries: usize,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

/// Results for one student. Rank is computed over entries whose snapshotted
/// class matches the student's current class.
pub fn student_summary(conn: &Connection, student: &Student) -> CoreResult<ResultsSummary> {
    let own = marks::query(
        conn,
        &MarksFilter {
            student_id: Some(student.id.clone()),
            ..MarksFilter::default()
        },
        MarksOrder::default(),
    )?;
    let class_entries = marks::query(
        conn,
        &MarksFilter {
            class: Some(student.class.clone()),
            ..MarksFilter::default()
        },
        MarksOrder::default(),
    )?;

    let subject_wise = aggregate::subject_averages(&own);
    let (strengths, improvements) = aggregate::strengths_and_improvements(&own);
    Ok(ResultsSummary {
        student: StudentHeader::from(student),
        exam_wise: aggregate::exam_performance(&own),
        overall_grade: aggregate::overall_grade(&own),
        overall_percentage: grading::round_off_1_decimal(aggregate::average_percentage(&own)),
        class_rank: aggregate::class_rank(&class_entries, &student.id).to_string(),
        total_entries: own.len(),
        subject_wise,
        strengths,
        improvements,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMarks {
    pub marks: Vec<MarksEntry>,
    pub overall_percentage: f64,
    pub total_exams: usize,
}

/// The student's own entries. Any class or student filter the caller sent is
/// replaced by the student's id.
pub fn student_marks(conn: &Connection, student_id: &str, filter: &MarksFilter) -> CoreResult<StudentMarks> {
    let scoped = MarksFilter {
        student_id: Some(student_id.to_string()),
        class: None,
        ..filter.clone()
    };
    let entries = marks::query(conn, &scoped, MarksOrder::default())?;
    Ok(StudentMarks {
        overall_percentage: aggregate::aggregate_ratio_percentage(&entries),
        total_exams: entries.len(),
        marks: entries,
    })
}
