use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "school.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace directory {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    init_schema(&conn)?;
    tracing::info!(path = %db_path.display(), "workspace database ready");
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            student_code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            class TEXT NOT NULL,
            section TEXT,
            roll_no TEXT NOT NULL,
            contact_number TEXT NOT NULL,
            parent_name TEXT,
            parent_contact TEXT,
            address TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    ensure_students_profile_columns(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class_section ON students(class, section)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS marks(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            class TEXT NOT NULL,
            exam_type TEXT NOT NULL,
            exam_name TEXT NOT NULL,
            exam_date TEXT NOT NULL,
            subject TEXT NOT NULL,
            marks_obtained REAL NOT NULL,
            total_marks REAL NOT NULL,
            percentage REAL NOT NULL,
            grade TEXT NOT NULL,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;
    ensure_marks_remarks(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_marks_student_date ON marks(student_id, exam_date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_marks_class_subject ON marks(class, subject)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_marks_exam_name ON marks(exam_name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS announcements(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            priority TEXT NOT NULL DEFAULT 'Medium',
            target_class TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            expiry_date TEXT,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    ensure_announcements_target_section(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_announcements_active_created
         ON announcements(is_active, created_at)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_announcements_target_class ON announcements(target_class)",
        [],
    )?;

    Ok(())
}

fn ensure_students_profile_columns(conn: &Connection) -> anyhow::Result<()> {
    for column in ["date_of_birth", "gender", "blood_group", "admission_date"] {
        if !table_has_column(conn, "students", column)? {
            conn.execute(&format!("ALTER TABLE students ADD COLUMN {} TEXT", column), [])?;
        }
    }
    conn.execute(
        "UPDATE students SET admission_date = SUBSTR(created_at, 1, 10)
         WHERE admission_date IS NULL",
        [],
    )?;
    Ok(())
}

fn ensure_marks_remarks(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "marks", "remarks")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE marks ADD COLUMN remarks TEXT", [])?;
    Ok(())
}

fn ensure_announcements_target_section(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "announcements", "target_section")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE announcements ADD COLUMN target_section TEXT",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
pub fn open_in_memory() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    init_schema(&conn).expect("init schema");
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent_and_has_migrated_columns() {
        let conn = open_in_memory();
        init_schema(&conn).expect("second init");
        assert!(table_has_column(&conn, "marks", "remarks").expect("pragma"));
        assert!(table_has_column(&conn, "announcements", "target_section").expect("pragma"));
        assert!(!table_has_column(&conn, "marks", "nope").expect("pragma"));
        assert!(table_has_column(&conn, "students", "blood_group").expect("pragma"));
    }

    #[test]
    fn older_students_table_gains_profile_columns() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute(
            "CREATE TABLE students(
                id TEXT PRIMARY KEY,
                student_code TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                class TEXT NOT NULL,
                section TEXT,
                roll_no TEXT NOT NULL,
                contact_number TEXT NOT NULL,
                parent_name TEXT,
                parent_contact TEXT,
                address TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .expect("legacy table");
        conn.execute(
            "INSERT INTO students(id, student_code, name, email, class, roll_no, contact_number,
                created_at, updated_at)
             VALUES('s1', 'SPC000001', 'Asha', 'asha@school.com', '9th', '1', '9876543210',
                '2023-06-01T08:00:00.000000Z', '2023-06-01T08:00:00.000000Z')",
            [],
        )
        .expect("legacy row");

        init_schema(&conn).expect("migrate");
        for column in ["date_of_birth", "gender", "blood_group", "admission_date"] {
            assert!(table_has_column(&conn, "students", column).expect("pragma"), "{column}");
        }
        let admitted: String = conn
            .query_row("SELECT admission_date FROM students WHERE id = 's1'", [], |r| r.get(0))
            .expect("admission date");
        assert_eq!(admitted, "2023-06-01");
    }
}
