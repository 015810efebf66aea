use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub history_db_path: PathBuf,
    pub index_db_path: PathBuf,
    pub articles_path: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let data_dir = discover_data_dir(&project_root);
        Self::with_dirs(project_root, data_dir)
    }

    pub fn with_dirs(project_root: PathBuf, data_dir: PathBuf) -> Self {
        let log_dir = data_dir.join("logs");
        let history_db_path = data_dir.join("history.db");
        let index_db_path = data_dir.join("vector_index.db");
        let articles_path = data_dir.join("articles.json");
        let secrets_path = data_dir.join("secrets.yml");

        for dir in [&data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            data_dir,
            log_dir,
            history_db_path,
            index_db_path,
            articles_path,
            secrets_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("NEWSRAG_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    let cwd = env::current_dir().unwrap_or_else(|_| manifest_dir.clone());
    if cwd.join("config.yml").exists() {
        return cwd;
    }

    manifest_dir
}

fn discover_data_dir(project_root: &Path) -> PathBuf {
    if let Ok(dir) = env::var("NEWSRAG_DATA_DIR") {
        return PathBuf::from(dir);
    }
    project_root.join("data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_dirs_lays_out_files_under_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        let paths = AppPaths::with_dirs(tmp.path().to_path_buf(), data.clone());

        assert!(paths.log_dir.is_dir());
        assert_eq!(paths.history_db_path, data.join("history.db"));
        assert_eq!(paths.articles_path, data.join("articles.json"));
    }
}
