use crate::dates;
use crate::error::{CoreError, CoreResult};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

pub const TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    pub fn parse(raw: &str) -> Option<Priority> {
        match raw {
            "High" => Some(Priority::High),
            "Medium" => Some(Priority::Medium),
            "Low" => Some(Priority::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub target_class: Option<String>,
    pub target_section: Option<String>,
    pub is_active: bool,
    pub expiry_date: Option<NaiveDate>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnouncement {
    pub title: Option<String>,
    pub content: Option<String>,
    pub priority: Option<String>,
    pub target_class: Option<String>,
    pub target_section: Option<String>,
    pub expiry_date: Option<String>,
}

/// Partial update. An empty string clears `targetClass`, `targetSection`
/// and `expiryDate`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub priority: Option<String>,
    pub target_class: Option<String>,
    pub target_section: Option<String>,
    pub is_active: Option<bool>,
    pub expiry_date: Option<String>,
}

const COLUMNS: &str = "id, title, content, priority, target_class, target_section, is_active,
    expiry_date, created_by, created_at, updated_at";

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn check_title(raw: Option<&str>) -> CoreResult<String> {
    let Some(title) = non_blank(raw) else {
        return Err(CoreError::validation("title is required"));
    };
    let len = title.chars().count();
    if len > TITLE_MAX_CHARS {
        return Err(CoreError::validation_with(
            format!("title cannot exceed {} characters", TITLE_MAX_CHARS),
            json!({ "length": len }),
        ));
    }
    Ok(title)
}

fn check_content(raw: Option<&str>) -> CoreResult<String> {
    non_blank(raw).ok_or_else(|| CoreError::validation("content is required"))
}

fn check_priority(raw: &str) -> CoreResult<Priority> {
    Priority::parse(raw.trim()).ok_or_else(|| {
        CoreError::validation_with(
            "priority must be one of High, Medium, Low",
            json!({ "priority": raw }),
        )
    })
}

fn check_expiry(raw: &str) -> CoreResult<Option<NaiveDate>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    dates::parse_date(raw).map(Some).ok_or_else(|| {
        CoreError::validation_with("expiryDate is not a valid date", json!({ "expiryDate": raw }))
    })
}

fn from_row(r: &Row<'_>) -> rusqlite::Result<Announcement> {
    let priority_raw: String = r.get(3)?;
    let expiry_raw: Option<String> = r.get(7)?;
    let bad_text = |idx: usize, what: &str, raw: &str| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid {} in announcements row: {}", what, raw).into(),
        )
    };
    let expiry_date = match expiry_raw.as_deref() {
        None => None,
        Some(raw) => Some(dates::parse_date(raw).ok_or_else(|| bad_text(7, "expiry date", raw))?),
    };
    Ok(Announcement {
        id: r.get(0)?,
        title: r.get(1)?,
        content: r.get(2)?,
        priority: Priority::parse(&priority_raw)
            .ok_or_else(|| bad_text(3, "priority", &priority_raw))?,
        target_class: r.get(4)?,
        target_section: r.get(5)?,
        is_active: r.get::<_, i64>(6)? != 0,
        expiry_date,
        created_by: r.get(8)?,
        created_at: r.get(9)?,
        updated_at: r.get(10)?,
    })
}

fn write(conn: &Connection, a: &Announcement, insert: bool) -> CoreResult<()> {
    let sql = if insert {
        "INSERT INTO announcements(title, content, priority, target_class, target_section,
            is_active, expiry_date, created_by, created_at, updated_at, id)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    } else {
        "UPDATE announcements SET title = ?, content = ?, priority = ?, target_class = ?,
            target_section = ?, is_active = ?, expiry_date = ?, created_by = ?,
            created_at = ?, updated_at = ?
         WHERE id = ?"
    };
    conn.execute(
        sql,
        rusqlite::params![
            a.title,
            a.content,
            a.priority.as_str(),
            a.target_class,
            a.target_section,
            a.is_active as i64,
            a.expiry_date.map(|d| d.format("%Y-%m-%d").to_string()),
            a.created_by,
            a.created_at,
            a.updated_at,
            a.id,
        ],
    )?;
    Ok(())
}

pub fn create(conn: &Connection, new: &NewAnnouncement, created_by: &str) -> CoreResult<Announcement> {
    let title = check_title(new.title.as_deref())?;
    let content = check_content(new.content.as_deref())?;
    let priority = match non_blank(new.priority.as_deref()) {
        Some(p) => check_priority(&p)?,
        None => Priority::default(),
    };
    let expiry_date = match new.expiry_date.as_deref() {
        Some(raw) => check_expiry(raw)?,
        None => None,
    };
    let now = dates::now_timestamp();
    let a = Announcement {
        id: Uuid::new_v4().to_string(),
        title,
        content,
        priority,
        target_class: non_blank(new.target_class.as_deref()),
        target_section: non_blank(new.target_section.as_deref()),
        is_active: true,
        expiry_date,
        created_by: created_by.to_string(),
        created_at: now.clone(),
        updated_at: now,
    };
    write(conn, &a, true)?;
    tracing::info!(announcement_id = %a.id, "announcement created");
    Ok(a)
}

pub fn get(conn: &Connection, id: &str) -> CoreResult<Announcement> {
    let sql = format!("SELECT {} FROM announcements WHERE id = ?", COLUMNS);
    conn.query_row(&sql, [id], from_row)
        .optional()?
        .ok_or(CoreError::NotFound("announcement"))
}

/// Every announcement, newest first.
pub fn list(conn: &Connection) -> CoreResult<Vec<Announcement>> {
    let sql = format!(
        "SELECT {} FROM announcements ORDER BY created_at DESC, rowid DESC",
        COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update(conn: &Connection, id: &str, patch: &AnnouncementPatch) -> CoreResult<Announcement> {
    let mut a = get(conn, id)?;
    if patch.title.is_some() {
        a.title = check_title(patch.title.as_deref())?;
    }
    if patch.content.is_some() {
        a.content = check_content(patch.content.as_deref())?;
    }
    if let Some(p) = patch.priority.as_deref() {
        a.priority = check_priority(p)?;
    }
    if let Some(raw) = patch.target_class.as_deref() {
        a.target_class = non_blank(Some(raw));
    }
    if let Some(raw) = patch.target_section.as_deref() {
        a.target_section = non_blank(Some(raw));
    }
    if let Some(active) = patch.is_active {
        a.is_active = active;
    }
    if let Some(raw) = patch.expiry_date.as_deref() {
        a.expiry_date = check_expiry(raw)?;
    }
    a.updated_at = dates::now_timestamp();
    write(conn, &a, false)?;
    tracing::info!(announcement_id = %a.id, "announcement updated");
    Ok(a)
}

pub fn delete(conn: &Connection, id: &str) -> CoreResult<()> {
    let n = conn.execute("DELETE FROM announcements WHERE id = ?", [id])?;
    if n == 0 {
        return Err(CoreError::NotFound("announcement"));
    }
    tracing::info!(announcement_id = %id, "announcement deleted");
    Ok(())
}

/// Active announcements addressed to everyone or to `class`, not yet expired
/// on `today`. Newest first.
pub fn visible_to(conn: &Connection, class: &str, today: NaiveDate) -> CoreResult<Vec<Announcement>> {
    let sql = format!(
        "SELECT {} FROM announcements
         WHERE is_active = 1
           AND (target_class IS NULL OR target_class = '' OR target_class = ?)
           AND (expiry_date IS NULL OR expiry_date = '' OR expiry_date >= ?)
         ORDER BY created_at DESC, rowid DESC",
        COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            rusqlite::params![class, today.format("%Y-%m-%d").to_string()],
            from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
