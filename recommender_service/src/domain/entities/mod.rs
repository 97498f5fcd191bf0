pub mod index_point;
pub mod item;
pub mod related_result;
