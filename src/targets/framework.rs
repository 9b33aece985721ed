//! Documentation-framework detection.

use std::path::{Path, PathBuf};

/// Documentation-site generator convention detected in a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFramework {
    MkDocs,
    Docusaurus,
    Sphinx,
    Hugo,
    Generic,
}

impl DocFramework {
    /// Detect the framework at the repository root. First match wins:
    /// mkdocs.yml, docusaurus.config.js, a Sphinx conf.py, then a Hugo
    /// config with a content directory; anything else is Generic.
    pub fn detect(repo_root: &Path) -> Self {
        if repo_root.join("mkdocs.yml").is_file() {
            return DocFramework::MkDocs;
        }
        if repo_root.join("docusaurus.config.js").is_file() {
            return DocFramework::Docusaurus;
        }
        if repo_root.join("docs/source/conf.py").is_file() || repo_root.join("conf.py").is_file() {
            return DocFramework::Sphinx;
        }
        let hugo_config =
            repo_root.join("config.toml").is_file() || repo_root.join("config.yaml").is_file();
        if hugo_config && repo_root.join("content").is_dir() {
            return DocFramework::Hugo;
        }
        DocFramework::Generic
    }

    /// Canonical docs root for the framework, relative to the repo root.
    pub fn docs_root(&self, repo_root: &Path) -> PathBuf {
        match self {
            DocFramework::MkDocs | DocFramework::Docusaurus | DocFramework::Generic => {
                PathBuf::from("docs")
            }
            DocFramework::Sphinx => {
                if repo_root.join("docs/source").is_dir() {
                    PathBuf::from("docs/source")
                } else {
                    PathBuf::from("docs")
                }
            }
            DocFramework::Hugo => PathBuf::from("content"),
        }
    }

    /// Navigation/config file that lists pages, when the framework has one.
    pub fn nav_file(&self) -> Option<&'static str> {
        match self {
            DocFramework::MkDocs => Some("mkdocs.yml"),
            DocFramework::Docusaurus => Some("sidebars.js"),
            DocFramework::Sphinx => Some("docs/source/index.rst"),
            DocFramework::Hugo | DocFramework::Generic => None,
        }
    }
}

impl std::fmt::Display for DocFramework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocFramework::MkDocs => "mkdocs",
            DocFramework::Docusaurus => "docusaurus",
            DocFramework::Sphinx => "sphinx",
            DocFramework::Hugo => "hugo",
            DocFramework::Generic => "generic",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_detect_mkdocs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mkdocs.yml"), "site_name: x\n").unwrap();
        assert_eq!(DocFramework::detect(dir.path()), DocFramework::MkDocs);
        assert_eq!(
            DocFramework::MkDocs.docs_root(dir.path()),
            PathBuf::from("docs")
        );
    }

    #[test]
    fn test_detect_order_prefers_mkdocs_over_sphinx() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mkdocs.yml"), "").unwrap();
        fs::write(dir.path().join("conf.py"), "").unwrap();
        assert_eq!(DocFramework::detect(dir.path()), DocFramework::MkDocs);
    }

    #[test]
    fn test_detect_sphinx_source_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs/source")).unwrap();
        fs::write(dir.path().join("docs/source/conf.py"), "").unwrap();
        assert_eq!(DocFramework::detect(dir.path()), DocFramework::Sphinx);
        assert_eq!(
            DocFramework::Sphinx.docs_root(dir.path()),
            PathBuf::from("docs/source")
        );
    }

    #[test]
    fn test_detect_hugo_needs_content_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), "").unwrap();
        assert_eq!(DocFramework::detect(dir.path()), DocFramework::Generic);
        fs::create_dir_all(dir.path().join("content")).unwrap();
        assert_eq!(DocFramework::detect(dir.path()), DocFramework::Hugo);
    }

    #[test]
    fn test_detect_empty_is_generic() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(DocFramework::detect(dir.path()), DocFramework::Generic);
        assert!(DocFramework::Generic.nav_file().is_none());
    }
}
