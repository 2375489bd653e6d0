pub mod config;
pub mod docx;
pub mod fields;
pub mod ipc;
pub mod pdf;
pub mod photos;
pub mod table;
pub mod workbook;
