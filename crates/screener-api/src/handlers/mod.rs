pub mod batch;
pub mod compare;
pub mod health;
pub mod learning;
pub mod screen;
pub mod skills;
