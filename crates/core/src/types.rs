/// Server-assigned project identifier.
pub type DbId = i64;
