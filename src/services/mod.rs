pub mod container_walk;
pub mod export_task;
pub mod inspect;
pub mod save;
