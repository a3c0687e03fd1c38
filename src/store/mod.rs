pub mod json_store;
pub mod score_store;
