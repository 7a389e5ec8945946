use crate::grading::{self, Grade};
use crate::marks::{ExamType, MarksEntry};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub const TOP_PERFORMERS_LIMIT: usize = 10;
pub const STRENGTH_THRESHOLD: f64 = 80.0;
pub const IMPROVEMENT_THRESHOLD: f64 = 60.0;

#[derive(Debug, Clone, Copy, Default)]
struct PercentAcc {
    sum: f64,
    count: usize,
    max: Option<f64>,
    min: Option<f64>,
}

impl PercentAcc {
    fn push(&mut self, pct: f64) {
        self.sum += pct;
        self.count += 1;
        self.max = Some(self.max.map_or(pct, |m| m.max(pct)));
        self.min = Some(self.min.map_or(pct, |m| m.min(pct)));
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverage {
    pub subject: String,
    pub avg_percentage: f64,
    pub count: usize,
    pub max_percentage: f64,
    pub min_percentage: f64,
}

impl SubjectAverage {
    fn from_acc(subject: String, acc: &PercentAcc) -> Self {
        Self {
            subject,
            avg_percentage: grading::round_off_2_decimals(acc.mean()),
            count: acc.count,
            max_percentage: acc.max.unwrap_or(0.0),
            min_percentage: acc.min.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPerformance {
    pub exam_name: String,
    pub avg_percentage: f64,
    pub exam_date: NaiveDate,
    pub exam_type: ExamType,
    pub subjects: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPerformer {
    pub student_id: String,
    pub student_name: String,
    pub class: String,
    pub avg_percentage: f64,
    pub exam_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPoint {
    pub year: i32,
    pub month: u32,
    pub avg_percentage: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassCount {
    pub class: String,
    pub count: usize,
}

/// 1-based position of a student among their class, by average percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassRank {
    pub rank: Option<usize>,
    pub total: usize,
}

impl fmt::Display for ClassRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rank {
            Some(r) => write!(f, "{}/{}", r, self.total),
            None => write!(f, "-/{}", self.total),
        }
    }
}

/// Per-subject statistics, subject ascending.
pub fn subject_averages(entries: &[MarksEntry]) -> Vec<SubjectAverage> {
    let mut by_subject: BTreeMap<&str, PercentAcc> = BTreeMap::new();
    for e in entries {
        by_subject
            .entry(e.subject.as_str())
            .or_default()
            .push(e.percentage);
    }
    by_subject
        .iter()
        .map(|(subject, acc)| SubjectAverage::from_acc(subject.to_string(), acc))
        .collect()
}

/// Statistics for one subject; all zero when it has no entries.
pub fn subject_average(entries: &[MarksEntry], subject: &str) -> SubjectAverage {
    let mut acc = PercentAcc::default();
    for e in entries.iter().filter(|e| e.subject == subject) {
        acc.push(e.percentage);
    }
    SubjectAverage::from_acc(subject.to_string(), &acc)
}

/// Per-exam statistics, latest exam first. Date and type come from the first
/// entry seen for each exam name.
pub fn exam_performance(entries: &[MarksEntry]) -> Vec<ExamPerformance> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, (PercentAcc, NaiveDate, ExamType)> = HashMap::new();
    for e in entries {
        let slot = groups.entry(e.exam_name.as_str()).or_insert_with(|| {
            order.push(e.exam_name.as_str());
            (PercentAcc::default(), e.exam_date, e.exam_type)
        });
        slot.0.push(e.percentage);
    }

    let mut out: Vec<ExamPerformance> = order
        .into_iter()
        .filter_map(|name| {
            groups.get(name).map(|(acc, date, kind)| ExamPerformance {
                exam_name: name.to_string(),
                avg_percentage: grading::round_off_2_decimals(acc.mean()),
                exam_date: *date,
                exam_type: *kind,
                subjects: acc.count,
            })
        })
        .collect();
    out.sort_by(|a, b| b.exam_date.cmp(&a.exam_date));
    out
}

struct StudentAcc<'a> {
    student_id: &'a str,
    student_name: &'a str,
    class: &'a str,
    acc: PercentAcc,
}

/// Students in first-seen order with their unrounded mean, sorted by mean
/// descending. Ties keep first-seen order.
fn ranked_students(entries: &[MarksEntry]) -> Vec<StudentAcc<'_>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<StudentAcc<'_>> = Vec::new();
    for e in entries {
        let i = *index.entry(e.student_id.as_str()).or_insert_with(|| {
            rows.push(StudentAcc {
                student_id: e.student_id.as_str(),
                student_name: e.student_name.as_str(),
                class: e.class.as_str(),
                acc: PercentAcc::default(),
            });
            rows.len() - 1
        });
        rows[i].acc.push(e.percentage);
    }
    rows.sort_by(|a, b| desc(a.acc.mean(), b.acc.mean()));
    rows
}

pub fn top_performers(entries: &[MarksEntry], limit: usize) -> Vec<TopPerformer> {
    ranked_students(entries)
        .into_iter()
        .take(limit)
        .map(|s| TopPerformer {
            student_id: s.student_id.to_string(),
            student_name: s.student_name.to_string(),
            class: s.class.to_string(),
            avg_percentage: grading::round_off_2_decimals(s.acc.mean()),
            exam_count: s.acc.count,
        })
        .collect()
}

/// Rank of `student_id` among everyone with entries in `class_entries`.
pub fn class_rank(class_entries: &[MarksEntry], student_id: &str) -> ClassRank {
    let ranked = ranked_students(class_entries);
    ClassRank {
        rank: ranked
            .iter()
            .position(|s| s.student_id == student_id)
            .map(|i| i + 1),
        total: ranked.len(),
    }
}

/// Chronological (year, month) buckets of exam dates.
pub fn monthly_trend(entries: &[MarksEntry]) -> Vec<MonthlyPoint> {
    let mut buckets: BTreeMap<(i32, u32), PercentAcc> = BTreeMap::new();
    for e in entries {
        buckets
            .entry((e.exam_date.year(), e.exam_date.month()))
            .or_default()
            .push(e.percentage);
    }
    buckets
        .into_iter()
        .map(|((year, month), acc)| MonthlyPoint {
            year,
            month,
            avg_percentage: grading::round_off_2_decimals(acc.mean()),
            count: acc.count,
        })
        .collect()
}

/// Mean of entry percentages, unrounded; 0 for no entries.
pub fn average_percentage(entries: &[MarksEntry]) -> f64 {
    let mut acc = PercentAcc::default();
    for e in entries {
        acc.push(e.percentage);
    }
    acc.mean()
}

/// Letter grade of the average percentage (not an average of letter grades).
pub fn overall_grade(entries: &[MarksEntry]) -> Grade {
    grading::grade_for_percentage(average_percentage(entries))
}

/// Σobtained / Σtotal as a percentage, 2 decimals; 0 for no entries.
pub fn aggregate_ratio_percentage(entries: &[MarksEntry]) -> f64 {
    let obtained: f64 = entries.iter().map(|e| e.marks_obtained).sum();
    let total: f64 = entries.iter().map(|e| e.total_marks).sum();
    if total > 0.0 {
        grading::round_off_2_decimals(obtained / total * 100.0)
    } else {
        0.0
    }
}

/// Subjects whose unrounded mean is at or above 80 are strengths, below 60
/// need improvement. Subject ascending.
pub fn strengths_and_improvements(entries: &[MarksEntry]) -> (Vec<String>, Vec<String>) {
    let mut by_subject: BTreeMap<&str, PercentAcc> = BTreeMap::new();
    for e in entries {
        by_subject
            .entry(e.subject.as_str())
            .or_default()
            .push(e.percentage);
    }
    let mut strengths = Vec::new();
    let mut improvements = Vec::new();
    for (subject, acc) in &by_subject {
        let mean = acc.mean();
        if mean >= STRENGTH_THRESHOLD {
            strengths.push(subject.to_string());
        } else if mean < IMPROVEMENT_THRESHOLD {
            improvements.push(subject.to_string());
        }
    }
    (strengths, improvements)
}

/// Item count per class, class ascending.
pub fn class_counts<'a, I>(classes: I) -> Vec<ClassCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for c in classes {
        *counts.entry(c).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(class, count)| ClassCount {
            class: class.to_string(),
            count,
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn fixture_entry(
    student: &str,
    class: &str,
    subject: &str,
    exam: &str,
    date: &str,
    percentage: f64,
) -> MarksEntry {
    MarksEntry {
        id: format!("{student}-{subject}-{exam}"),
        student_id: student.to_string(),
        student_name: format!("Name {student}"),
        class: class.to_string(),
        exam_type: ExamType::UnitTest,
        exam_name: exam.to_string(),
        exam_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("date"),
        subject: subject.to_string(),
        marks_obtained: percentage,
        total_marks: 100.0,
        percentage,
        grade: grading::grade_for_percentage(percentage),
        remarks: None,
        created_by: "admin".to_string(),
        created_at: "2024-01-01T00:00:00.000000Z".to_string(),
        updated_at: "2024-01-01T00:00:00.000000Z".to_string(),
    }
}
