pub mod csv_export;
pub mod face_matcher;
pub mod login_id_cache;
pub mod login_id_filter;
