//! End-to-end search through the application context

use semcode_core::{
    AppContext, ChunkKind, Error, HashEmbedder, SearchOptions, SearchSource, Settings,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
}

fn context(cache: &TempDir) -> AppContext {
    let settings = Settings {
        cache_dir: cache.path().to_path_buf(),
        ..Default::default()
    };
    AppContext::with_embedder(settings, Arc::new(HashEmbedder::default())).unwrap()
}

fn sample_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "app/config.py",
        r#"import json


def parse_config(path):
    """Parse the JSON configuration file at path."""
    with open(path) as fh:
        return json.load(fh)


def load_configuration(name):
    """Load a named configuration from the settings directory."""
    with open(f"settings/{name}.json") as fh:
        return json.load(fh)
"#,
    );
    write(
        dir.path(),
        "app/render.py",
        r#"class Sprite:
    def draw(self, canvas):
        canvas.blit(self.image, self.position)

    def move(self, dx, dy):
        self.position = (self.position[0] + dx, self.position[1] + dy)
"#,
    );
    write(
        dir.path(),
        "src/net.rs",
        r#"pub fn open_socket(addr: &str) -> std::io::Result<std::net::TcpStream> {
    std::net::TcpStream::connect(addr)
}
"#,
    );
    write(
        dir.path(),
        "README.md",
        "# Demo\n\nA tiny demo project.\n\n## Usage\n\nCall the config parser.\n",
    );
    dir
}

#[tokio::test]
async fn test_exact_identifier_ranks_first() {
    let cache = TempDir::new().unwrap();
    let project = sample_project();
    let ctx = context(&cache);

    let outcome = ctx
        .search_code(project.path(), "parse_config", &SearchOptions::default())
        .await
        .unwrap();

    assert!(!outcome.results.is_empty());
    let top = &outcome.results[0];
    assert_eq!(top.chunk.name, "parse_config");
    assert!(top.exact_match);
    assert!(top.score >= 0.6 && top.score <= 1.0);
    assert!(outcome.index_report.is_some());
    for result in &outcome.results {
        assert!(result.score >= 0.3);
    }
}

#[tokio::test]
async fn test_natural_language_query_finds_related_code() {
    let cache = TempDir::new().unwrap();
    let project = sample_project();
    let ctx = context(&cache);

    let options = SearchOptions {
        limit: 5,
        min_score: 0.0,
    };
    let outcome = ctx
        .search_code(project.path(), "load configuration settings", &options)
        .await
        .unwrap();

    assert!(outcome.results.len() <= 5);
    assert!(outcome.results[0].chunk.file_path.ends_with("config.py"));
    assert_ne!(outcome.results[0].chunk.name, "Sprite");
}

#[tokio::test]
async fn test_docstring_module_answers_descriptive_query() {
    let cache = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write(
        project.path(),
        "config.py",
        r#""""Load and validate the application configuration."""

import json


def parse_config(path):
    with open(path) as fh:
        return json.load(fh)
"#,
    );
    write(
        project.path(),
        "render.py",
        "class Sprite:\n    def draw(self, canvas):\n        canvas.blit(self.image, self.position)\n",
    );
    let ctx = context(&cache);

    let outcome = ctx
        .search_code(project.path(), "load configuration", &SearchOptions::default())
        .await
        .unwrap();
    assert!(!outcome.results.is_empty());
    let top = &outcome.results[0];
    assert!(
        top.chunk.kind == ChunkKind::Module || top.chunk.name == "parse_config",
        "unexpected top result {} ({})",
        top.chunk.name,
        top.chunk.kind
    );
    assert!(top.chunk.file_path.ends_with("config.py"));
    assert!(top.score >= 0.3);

    let outcome = ctx
        .search_code(project.path(), "parse_config", &SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.results[0].chunk.name, "parse_config");
}

#[tokio::test]
async fn test_keyword_hits_are_marked() {
    let cache = TempDir::new().unwrap();
    let project = sample_project();
    let ctx = context(&cache);

    let options = SearchOptions {
        limit: 10,
        min_score: 0.0,
    };
    let outcome = ctx
        .search_code(project.path(), "open_socket", &options)
        .await
        .unwrap();
    let hit = outcome
        .results
        .iter()
        .find(|r| r.chunk.name == "open_socket")
        .unwrap();
    assert!(matches!(hit.source, SearchSource::Both | SearchSource::Keyword));
}

#[tokio::test]
async fn test_empty_query_is_invalid_input() {
    let cache = TempDir::new().unwrap();
    let project = sample_project();
    let ctx = context(&cache);

    let err = ctx
        .search_code(project.path(), "   ", &SearchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_project_without_code_is_empty_index() {
    let cache = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write(project.path(), "notes.txt", "nothing to chunk");
    let ctx = context(&cache);

    let err = ctx
        .search_code(project.path(), "anything", &SearchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmptyIndex(_)));
}

#[tokio::test]
async fn test_status_tracks_staleness() {
    let cache = TempDir::new().unwrap();
    let project = sample_project();
    let ctx = context(&cache);

    let status = ctx.index_status(project.path()).await.unwrap();
    assert!(!status.is_indexed);
    assert_eq!(status.chunks_count, 0);
    assert_eq!(status.stale_files.len(), 4);
    assert!(status.last_updated.is_none());

    let report = ctx.index_codebase(project.path(), false, None).await.unwrap();
    assert_eq!(report.files_indexed, 4);

    let status = ctx.index_status(project.path()).await.unwrap();
    assert!(status.is_indexed);
    assert_eq!(status.files_count, 4);
    assert_eq!(status.chunks_count, report.chunks_added);
    assert!(status.stale_files.is_empty());
    assert!(status.last_updated.is_some());

    write(project.path(), "app/extra.py", "def extra():\n    pass\n");
    let status = ctx.index_status(project.path()).await.unwrap();
    assert_eq!(status.stale_files.len(), 1);
    assert!(status.stale_files[0].ends_with("extra.py"));
}

#[tokio::test]
async fn test_search_refresh_drops_deleted_files() {
    let cache = TempDir::new().unwrap();
    let project = sample_project();
    let ctx = context(&cache);

    ctx.index_codebase(project.path(), false, None).await.unwrap();
    std::fs::remove_file(project.path().join("src/net.rs")).unwrap();

    let options = SearchOptions {
        limit: 20,
        min_score: 0.0,
    };
    let outcome = ctx
        .search_code(project.path(), "open_socket", &options)
        .await
        .unwrap();
    assert!(outcome
        .results
        .iter()
        .all(|r| !r.chunk.file_path.ends_with("net.rs")));
    assert_eq!(outcome.index_report.unwrap().files_deleted, 1);
}

#[tokio::test]
async fn test_local_index_lives_in_project() {
    let cache = TempDir::new().unwrap();
    let project = sample_project();
    let settings = Settings {
        cache_dir: cache.path().to_path_buf(),
        local_index: true,
        ..Default::default()
    };
    let ctx = AppContext::with_embedder(settings, Arc::new(HashEmbedder::default())).unwrap();

    ctx.index_codebase(project.path(), false, None).await.unwrap();
    assert!(project.path().join(".semantic-code/chunks.sqlite").exists());
    assert!(project.path().join(".semantic-code/file_mtimes.json").exists());

    // the index directory itself is never indexed
    let report = ctx.index_codebase(project.path(), false, None).await.unwrap();
    assert_eq!(report.files_scanned, 4);
}
