pub mod models;
pub mod pending;
pub mod storage;
pub mod task_edit;
pub mod task_list;
pub mod task_store;
pub mod ui;
pub mod view;
