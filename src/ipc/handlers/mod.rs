pub mod analytics;
pub mod announcements;
pub mod core;
pub mod marks;
pub mod student;
pub mod students;
