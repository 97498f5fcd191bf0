pub mod item_point_qdrant_repository;
