/// Database row identifier as assigned by the reporting backend.
pub type DbId = i64;
