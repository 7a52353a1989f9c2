pub mod db_utils;
pub mod fence_code;
pub mod geo;
pub mod matric_cache;
pub mod matric_filter;
