use anyhow::Context;
use std::path::{Path, PathBuf};

pub const STUDENT_SHEET: &str = "All Students";
pub const DONOR_SHEET: &str = "Donors";

/// Fixed locations of everything the daemon touches, rooted at the selected
/// workspace. Built once per workspace selection and passed into handlers; no
/// module-level path globals.
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub student_data_path: PathBuf,
    pub donor_data_path: PathBuf,
    pub template_path: PathBuf,
    pub photo_dir: PathBuf,
    pub uploads_dir: PathBuf,
}

impl Config {
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        let config = Self {
            root: root.to_path_buf(),
            student_data_path: root.join("data").join("class.xlsx"),
            donor_data_path: root.join("data").join("donor-students.xlsx"),
            template_path: root.join("templates").join("Result Template.docx"),
            photo_dir: root.join("public").join("photos"),
            uploads_dir: root.join("uploads"),
        };

        for dir in [
            root.join("data"),
            root.join("templates"),
            config.photo_dir.clone(),
            config.uploads_dir.clone(),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }
        Ok(config)
    }
}
