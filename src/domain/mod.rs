pub mod ai;
pub mod arena;
pub mod entity;
pub mod grid;
pub mod physics;
pub mod rules;
pub mod tile;
