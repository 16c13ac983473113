pub mod json_file_repo;
pub mod sqlite_repo;
