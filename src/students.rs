//! Student directory: the records marks entries point at.
//!
//! Marks keep a snapshot of the student's name and class taken when the entry
//! was written, so edits here never rewrite existing marks.

use crate::dates;
use crate::error::{CoreError, CoreResult};
use crate::marks;
use chrono::NaiveDate;
use regex::Regex;
use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::OnceLock;
use uuid::Uuid;

pub const CLASSES: [&str; 7] = ["6th", "7th", "8th", "9th", "10th", "11th", "12th"];
pub const SECTIONS: [&str; 4] = ["A", "B", "C", "D"];
pub const GENDERS: [&str; 3] = ["Male", "Female", "Other"];
pub const BLOOD_GROUPS: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];
pub const STUDENT_CODE_PREFIX: &str = "SPC";

pub const LIST_DEFAULT_LIMIT: usize = 10;
pub const LIST_MAX_LIMIT: usize = 100;

const STUDENT_COLUMNS: &str = "id, student_code, name, email, class, section, roll_no,
    contact_number, parent_name, parent_contact, address, is_active, created_at, updated_at,
    date_of_birth, gender, blood_group, admission_date";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub student_code: String,
    pub name: String,
    pub email: String,
    pub class: String,
    pub section: Option<String>,
    pub roll_no: String,
    pub contact_number: String,
    pub parent_name: Option<String>,
    pub parent_contact: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub admission_date: NaiveDate,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: Option<String>,
    pub email: Option<String>,
    pub class: Option<String>,
    pub section: Option<String>,
    pub roll_no: Option<String>,
    pub contact_number: Option<String>,
    pub parent_name: Option<String>,
    pub parent_contact: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub admission_date: Option<String>,
}

/// Partial update. For optional fields an empty string clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub class: Option<String>,
    pub section: Option<String>,
    pub roll_no: Option<String>,
    pub contact_number: Option<String>,
    pub parent_name: Option<String>,
    pub parent_contact: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub admission_date: Option<String>,
    pub is_active: Option<bool>,
}

/// Fields a student may change on their own profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Any,
    Active,
    Inactive,
}

#[derive(Debug, Clone)]
pub struct StudentListQuery {
    pub search: Option<String>,
    pub class: Option<String>,
    pub section: Option<String>,
    pub status: StatusFilter,
    pub page: usize,
    pub limit: usize,
}

impl Default for StudentListQuery {
    fn default() -> Self {
        Self {
            search: None,
            class: None,
            section: None,
            status: StatusFilter::Any,
            page: 1,
            limit: LIST_DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPage {
    pub students: Vec<Student>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCounts {
    pub total: i64,
    pub active: i64,
}

static EMAIL_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
static PHONE_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn compiled(
    cell: &'static OnceLock<Result<Regex, regex::Error>>,
    pattern: &str,
) -> CoreResult<&'static Regex> {
    match cell.get_or_init(|| Regex::new(pattern)) {
        Ok(re) => Ok(re),
        Err(e) => {
            tracing::error!(error = %e, pattern, "failed to compile validation regex");
            Err(CoreError::Pattern(e.clone()))
        }
    }
}

fn email_regex() -> CoreResult<&'static Regex> {
    compiled(&EMAIL_RE, r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$")
}

fn phone_regex() -> CoreResult<&'static Regex> {
    compiled(&PHONE_RE, r"^[0-9]{10}$")
}

fn student_from_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    let bad_date = |idx: usize, raw: &str| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid date in students row: {}", raw).into(),
        )
    };
    let dob_raw: Option<String> = r.get(14)?;
    let date_of_birth = match dob_raw.as_deref() {
        None => None,
        Some(raw) => Some(dates::parse_date(raw).ok_or_else(|| bad_date(14, raw))?),
    };
    let admission_raw: String = r.get(17)?;
    let admission_date = dates::parse_date(&admission_raw).ok_or_else(|| bad_date(17, &admission_raw))?;
    Ok(Student {
        id: r.get(0)?,
        student_code: r.get(1)?,
        name: r.get(2)?,
        email: r.get(3)?,
        class: r.get(4)?,
        section: r.get(5)?,
        roll_no: r.get(6)?,
        contact_number: r.get(7)?,
        parent_name: r.get(8)?,
        parent_contact: r.get(9)?,
        address: r.get(10)?,
        date_of_birth,
        gender: r.get(15)?,
        blood_group: r.get(16)?,
        admission_date,
        is_active: r.get::<_, i64>(11)? != 0,
        created_at: r.get(12)?,
        updated_at: r.get(13)?,
    })
}

fn trimmed(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn normalize_email(raw: &str) -> CoreResult<String> {
    let email = raw.trim().to_ascii_lowercase();
    if !email_regex()?.is_match(&email) {
        return Err(CoreError::validation_with(
            "Please enter a valid email",
            json!({ "email": raw }),
        ));
    }
    Ok(email)
}

fn check_class(class: &str) -> CoreResult<()> {
    if CLASSES.contains(&class) {
        Ok(())
    } else {
        Err(CoreError::validation_with(
            format!("class must be one of: {}", CLASSES.join(", ")),
            json!({ "class": class }),
        ))
    }
}

fn check_section(section: &str) -> CoreResult<()> {
    if SECTIONS.contains(&section) {
        Ok(())
    } else {
        Err(CoreError::validation_with(
            format!("section must be one of: {}", SECTIONS.join(", ")),
            json!({ "section": section }),
        ))
    }
}

fn check_gender(gender: &str) -> CoreResult<()> {
    if GENDERS.contains(&gender) {
        Ok(())
    } else {
        Err(CoreError::validation_with(
            format!("gender must be one of: {}", GENDERS.join(", ")),
            json!({ "gender": gender }),
        ))
    }
}

fn check_blood_group(group: &str) -> CoreResult<()> {
    if BLOOD_GROUPS.contains(&group) {
        Ok(())
    } else {
        Err(CoreError::validation_with(
            format!("bloodGroup must be one of: {}", BLOOD_GROUPS.join(", ")),
            json!({ "bloodGroup": group }),
        ))
    }
}

fn parse_student_date(field: &str, raw: &str) -> CoreResult<NaiveDate> {
    dates::parse_date(raw).ok_or_else(|| {
        CoreError::validation_with(format!("{} is not a valid date", field), json!({ field: raw }))
    })
}

fn check_date_of_birth(raw: &str) -> CoreResult<NaiveDate> {
    let dob = parse_student_date("dateOfBirth", raw)?;
    if dob > dates::today() {
        return Err(CoreError::validation_with(
            "dateOfBirth cannot be in the future",
            json!({ "dateOfBirth": raw }),
        ));
    }
    Ok(dob)
}

/// Validated optional profile fields shared by create and update. `None`
/// means the field was not sent; `Some(None)` clears it.
fn optional_date_of_birth(raw: Option<&str>) -> CoreResult<Option<Option<NaiveDate>>> {
    let Some(raw) = raw else { return Ok(None) };
    match trimmed(Some(raw)) {
        Some(v) => Ok(Some(Some(check_date_of_birth(&v)?))),
        None => Ok(Some(None)),
    }
}

fn optional_choice(
    raw: Option<&str>,
    check: fn(&str) -> CoreResult<()>,
) -> CoreResult<Option<Option<String>>> {
    let Some(raw) = raw else { return Ok(None) };
    match trimmed(Some(raw)) {
        Some(v) => {
            check(&v)?;
            Ok(Some(Some(v)))
        }
        None => Ok(Some(None)),
    }
}

fn check_phone(field: &str, phone: &str) -> CoreResult<()> {
    if phone_regex()?.is_match(phone) {
        Ok(())
    } else {
        Err(CoreError::validation_with(
            "Please enter a valid 10-digit phone number",
            json!({ field: phone }),
        ))
    }
}

fn ensure_email_free(conn: &Connection, email: &str, except_id: Option<&str>) -> CoreResult<()> {
    let existing: Option<String> = conn
        .query_row("SELECT id FROM students WHERE email = ?", [email], |r| {
            r.get(0)
        })
        .optional()?;
    match existing {
        Some(id) if Some(id.as_str()) != except_id => Err(CoreError::Duplicate(
            "Email already registered".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Next free external code. Uses the highest issued number, not the row
/// count, so codes are never reissued after deletes.
fn next_student_code(conn: &Connection) -> CoreResult<String> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(CAST(SUBSTR(student_code, 4) AS INTEGER))
         FROM students
         WHERE student_code LIKE 'SPC%'",
        [],
        |r| r.get(0),
    )?;
    Ok(format!("{}{:06}", STUDENT_CODE_PREFIX, max.unwrap_or(0) + 1))
}

pub fn create(conn: &Connection, new: &NewStudent) -> CoreResult<Student> {
    let name = trimmed(new.name.as_deref());
    let email = trimmed(new.email.as_deref());
    let class = trimmed(new.class.as_deref());
    let roll_no = trimmed(new.roll_no.as_deref());
    let contact_number = trimmed(new.contact_number.as_deref());

    let mut missing = Vec::new();
    for (field, v) in [
        ("name", &name),
        ("email", &email),
        ("class", &class),
        ("rollNo", &roll_no),
        ("contactNumber", &contact_number),
    ] {
        if v.is_none() {
            missing.push(field);
        }
    }
    let (Some(name), Some(email), Some(class), Some(roll_no), Some(contact_number)) =
        (name, email, class, roll_no, contact_number)
    else {
        return Err(CoreError::validation_with(
            format!("missing required fields: {}", missing.join(", ")),
            json!({ "fields": missing }),
        ));
    };

    let email = normalize_email(&email)?;
    check_class(&class)?;
    let section = trimmed(new.section.as_deref());
    if let Some(s) = section.as_deref() {
        check_section(s)?;
    }
    check_phone("contactNumber", &contact_number)?;
    let parent_contact = trimmed(new.parent_contact.as_deref());
    if let Some(p) = parent_contact.as_deref() {
        check_phone("parentContact", p)?;
    }
    let date_of_birth = optional_date_of_birth(new.date_of_birth.as_deref())?.flatten();
    let gender = optional_choice(new.gender.as_deref(), check_gender)?.flatten();
    let blood_group = optional_choice(new.blood_group.as_deref(), check_blood_group)?.flatten();
    let admission_date = match trimmed(new.admission_date.as_deref()) {
        Some(raw) => parse_student_date("admissionDate", &raw)?,
        None => dates::today(),
    };
    ensure_email_free(conn, &email, None)?;

    let now = dates::now_timestamp();
    let student = Student {
        id: Uuid::new_v4().to_string(),
        student_code: next_student_code(conn)?,
        name,
        email,
        class,
        section,
        roll_no,
        contact_number,
        parent_name: trimmed(new.parent_name.as_deref()),
        parent_contact,
        address: trimmed(new.address.as_deref()),
        date_of_birth,
        gender,
        blood_group,
        admission_date,
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    };
    write_new(conn, &student)?;
    tracing::info!(student_id = %student.id, code = %student.student_code, "student created");
    Ok(student)
}

fn write_new(conn: &Connection, s: &Student) -> CoreResult<()> {
    conn.execute(
        "INSERT INTO students(id, student_code, name, email, class, section, roll_no,
            contact_number, parent_name, parent_contact, address, is_active, created_at, updated_at,
            date_of_birth, gender, blood_group, admission_date)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            s.id,
            s.student_code,
            s.name,
            s.email,
            s.class,
            s.section,
            s.roll_no,
            s.contact_number,
            s.parent_name,
            s.parent_contact,
            s.address,
            s.is_active as i64,
            s.created_at,
            s.updated_at,
            s.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
            s.gender,
            s.blood_group,
            s.admission_date.format("%Y-%m-%d").to_string(),
        ],
    )?;
    Ok(())
}

fn write_existing(conn: &Connection, s: &Student) -> CoreResult<()> {
    conn.execute(
        "UPDATE students SET
            name = ?, email = ?, class = ?, section = ?, roll_no = ?, contact_number = ?,
            parent_name = ?, parent_contact = ?, address = ?, date_of_birth = ?, gender = ?,
            blood_group = ?, admission_date = ?, is_active = ?, updated_at = ?
         WHERE id = ?",
        rusqlite::params![
            s.name,
            s.email,
            s.class,
            s.section,
            s.roll_no,
            s.contact_number,
            s.parent_name,
            s.parent_contact,
            s.address,
            s.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
            s.gender,
            s.blood_group,
            s.admission_date.format("%Y-%m-%d").to_string(),
            s.is_active as i64,
            s.updated_at,
            s.id,
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: &str) -> CoreResult<Option<Student>> {
    let sql = format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS);
    Ok(conn.query_row(&sql, [id], student_from_row).optional()?)
}

pub fn find_by_code(conn: &Connection, code: &str) -> CoreResult<Option<Student>> {
    let sql = format!("SELECT {} FROM students WHERE student_code = ?", STUDENT_COLUMNS);
    Ok(conn.query_row(&sql, [code], student_from_row).optional()?)
}

/// Looks a reference up as an internal id first, then as a student code.
pub fn resolve(conn: &Connection, id_or_code: &str) -> CoreResult<Option<Student>> {
    let key = id_or_code.trim();
    if key.is_empty() {
        return Ok(None);
    }
    if let Some(s) = find_by_id(conn, key)? {
        return Ok(Some(s));
    }
    find_by_code(conn, key)
}

pub fn get(conn: &Connection, id: &str) -> CoreResult<Student> {
    find_by_id(conn, id)?.ok_or(CoreError::NotFound("student"))
}

pub fn list(conn: &Connection, q: &StudentListQuery) -> CoreResult<StudentPage> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(search) = q.search.as_deref() {
        clauses.push("(LOWER(name) LIKE ? OR LOWER(student_code) LIKE ? OR LOWER(email) LIKE ?)");
        let pattern = format!("%{}%", search.to_lowercase());
        for _ in 0..3 {
            values.push(Value::Text(pattern.clone()));
        }
    }
    if let Some(class) = q.class.as_deref() {
        clauses.push("class = ?");
        values.push(Value::Text(class.to_string()));
    }
    if let Some(section) = q.section.as_deref() {
        clauses.push("section = ?");
        values.push(Value::Text(section.to_string()));
    }
    match q.status {
        StatusFilter::Any => {}
        StatusFilter::Active => clauses.push("is_active = 1"),
        StatusFilter::Inactive => clauses.push("is_active = 0"),
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM students {}", where_sql),
        params_from_iter(values.iter()),
        |r| r.get(0),
    )?;

    let limit = q.limit.clamp(1, LIST_MAX_LIMIT);
    let page = q.page.max(1);
    let offset = (page - 1)
        .checked_mul(limit)
        .and_then(|o| i64::try_from(o).ok())
        .ok_or_else(|| CoreError::validation_with("page is out of range", json!({ "page": page })))?;
    let sql = format!(
        "SELECT {} FROM students {} ORDER BY created_at DESC, rowid DESC LIMIT {} OFFSET {}",
        STUDENT_COLUMNS, where_sql, limit, offset
    );
    let mut stmt = conn.prepare(&sql)?;
    let students = stmt
        .query_map(params_from_iter(values.iter()), student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let limit_i = limit as i64;
    Ok(StudentPage {
        students,
        total,
        total_pages: (total + limit_i - 1) / limit_i,
        current_page: page,
    })
}

pub fn update(conn: &Connection, id: &str, patch: &StudentPatch) -> CoreResult<Student> {
    let mut s = get(conn, id)?;

    if let Some(name) = trimmed(patch.name.as_deref()) {
        s.name = name;
    }
    if let Some(raw) = trimmed(patch.email.as_deref()) {
        let email = normalize_email(&raw)?;
        if email != s.email {
            ensure_email_free(conn, &email, Some(&s.id))?;
            s.email = email;
        }
    }
    if let Some(class) = trimmed(patch.class.as_deref()) {
        check_class(&class)?;
        s.class = class;
    }
    if let Some(raw) = patch.section.as_deref() {
        let section = trimmed(Some(raw));
        if let Some(v) = section.as_deref() {
            check_section(v)?;
        }
        s.section = section;
    }
    if let Some(roll_no) = trimmed(patch.roll_no.as_deref()) {
        s.roll_no = roll_no;
    }
    if let Some(contact) = trimmed(patch.contact_number.as_deref()) {
        check_phone("contactNumber", &contact)?;
        s.contact_number = contact;
    }
    if let Some(raw) = patch.parent_name.as_deref() {
        s.parent_name = trimmed(Some(raw));
    }
    if let Some(raw) = patch.parent_contact.as_deref() {
        let contact = trimmed(Some(raw));
        if let Some(v) = contact.as_deref() {
            check_phone("parentContact", v)?;
        }
        s.parent_contact = contact;
    }
    if let Some(raw) = patch.address.as_deref() {
        s.address = trimmed(Some(raw));
    }
    if let Some(dob) = optional_date_of_birth(patch.date_of_birth.as_deref())? {
        s.date_of_birth = dob;
    }
    if let Some(gender) = optional_choice(patch.gender.as_deref(), check_gender)? {
        s.gender = gender;
    }
    if let Some(group) = optional_choice(patch.blood_group.as_deref(), check_blood_group)? {
        s.blood_group = group;
    }
    if let Some(raw) = patch.admission_date.as_deref() {
        s.admission_date = parse_student_date("admissionDate", raw)?;
    }
    if let Some(active) = patch.is_active {
        s.is_active = active;
    }

    s.updated_at = dates::now_timestamp();
    write_existing(conn, &s)?;
    tracing::info!(student_id = %s.id, "student updated");
    Ok(s)
}

pub fn update_profile(conn: &Connection, id: &str, patch: &ProfilePatch) -> CoreResult<Student> {
    update(
        conn,
        id,
        &StudentPatch {
            email: patch.email.clone(),
            contact_number: patch.contact_number.clone(),
            address: patch.address.clone(),
            ..StudentPatch::default()
        },
    )
}

/// Removes the student together with all of their marks entries.
/// Returns how many marks entries went with them.
pub fn delete(conn: &Connection, id: &str) -> CoreResult<usize> {
    let tx = conn.unchecked_transaction()?;
    let removed = marks::delete_by_student(&tx, id)?;
    let n = tx.execute("DELETE FROM students WHERE id = ?", [id])?;
    if n == 0 {
        tx.rollback()?;
        return Err(CoreError::NotFound("student"));
    }
    tx.commit()?;
    tracing::info!(student_id = %id, marks_removed = removed, "student deleted");
    Ok(removed)
}

pub fn counts(conn: &Connection) -> CoreResult<StudentCounts> {
    Ok(conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN is_active = 1 THEN 1 ELSE 0 END), 0)
         FROM students",
        [],
        |r| {
            Ok(StudentCounts {
                total: r.get(0)?,
                active: r.get(1)?,
            })
        },
    )?)
}

/// Class of every active student, one item per student.
pub fn active_classes(conn: &Connection) -> CoreResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT class FROM students WHERE is_active = 1")?;
    let rows = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
pub(crate) fn sample(name: &str, email: &str, class: &str) -> NewStudent {
    NewStudent {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        class: Some(class.to_string()),
        section: Some("A".to_string()),
        roll_no: Some("1".to_string()),
        contact_number: Some("9876543210".to_string()),
        ..NewStudent::default()
    }
}
