//! CLI 모듈
//!
//! docvec CLI 명령어 정의 및 구현

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::collector::{CollectionStats, CollectorConfig, FileCollector};
use crate::config::{get_config_path, AppConfig};
use crate::embedding::{has_api_key, Embedder, EmbeddingProvider, ProviderKind};
use crate::ingest::IngestionPipeline;
use crate::knowledge::cache::CACHE_SUFFIX;
use crate::knowledge::{page_text, DocumentDescriptor, KnowledgeBaseStore};
use crate::search::MultiDocumentSearchEngine;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "docvec")]
#[command(version, about = "문서별 벡터 지식베이스 + 유사도 검색", long_about = None)]
pub struct Cli {
    /// 임베딩 프로바이더 (설정 파일 값 대신 사용)
    #[arg(long, global = true, value_enum)]
    pub provider: Option<ProviderKind>,

    /// 설정 파일 경로
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 파일 또는 폴더의 문서로 지식베이스 생성
    Ingest {
        /// 문서 파일 또는 폴더 경로
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// PDF 파일 건너뛰기
        #[arg(long)]
        skip_pdfs: bool,

        /// 캐시가 있어도 다시 생성
        #[arg(long)]
        force: bool,
    },

    /// 문서들에서 검색
    Query {
        /// 검색 쿼리
        query: String,

        /// 검색할 문서 파일 또는 폴더 경로
        #[arg(short, long = "doc", required = true, num_args = 1..)]
        docs: Vec<PathBuf>,

        /// 결과 개수 제한 (기본: 설정의 aggregateTopK)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// 문서의 특정 페이지 읽기 (임베딩 호출 없음)
    Page {
        /// 문서 이름 (확장자 제외 파일명, 대소문자 무시)
        name: String,

        /// 페이지 번호 (1부터)
        page: u32,

        /// 문서 파일 또는 폴더 경로
        #[arg(short, long = "doc", required = true, num_args = 1..)]
        docs: Vec<PathBuf>,
    },

    /// 캐시 디렉토리의 지식베이스 목록
    List,

    /// 기본 설정 파일 생성
    Init {
        /// 기존 설정 파일 덮어쓰기
        #[arg(long)]
        force: bool,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(get_config_path);
    let mut config = AppConfig::load_from(&config_path)?;
    if let Some(provider) = cli.provider {
        config.embedding.provider = provider;
    }

    match cli.command {
        Commands::Ingest {
            paths,
            skip_pdfs,
            force,
        } => cmd_ingest(&config, &paths, skip_pdfs, force).await,
        Commands::Query { query, docs, limit } => cmd_query(&config, &query, &docs, limit).await,
        Commands::Page { name, page, docs } => cmd_page(&config, &name, page, &docs),
        Commands::List => cmd_list(&config),
        Commands::Init { force } => cmd_init(&config_path, force),
        Commands::Status => cmd_status(&config, &config_path),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 수집 명령어 (ingest)
///
/// 캐시가 없는 문서만 추출 → 청킹 → 임베딩하여 JSON으로 저장합니다.
async fn cmd_ingest(
    config: &AppConfig,
    paths: &[PathBuf],
    skip_pdfs: bool,
    force: bool,
) -> Result<()> {
    let files = collect_documents(paths, skip_pdfs)?;
    if files.is_empty() {
        println!("[!] 수집할 문서가 없습니다.");
        return Ok(());
    }

    let embedder = connect(config).await?;
    let pipeline = IngestionPipeline::new(&config.ingest);

    println!("[*] 임베딩: {}", embedder.identity());
    let prepared = pipeline
        .ensure_knowledge_bases(&files, &embedder, &config.cache_dir, force)
        .await;

    println!();
    println!(
        "[OK] 완료: 생성 {}, 캐시 사용 {}, 실패 {}",
        prepared.built,
        prepared.cached,
        prepared.failed.len()
    );
    for (path, reason) in &prepared.failed {
        println!("[!] {}: {}", path.display(), reason);
    }

    Ok(())
}

/// 검색 명령어 (query)
///
/// 캐시가 없는 문서는 먼저 생성한 뒤 전체 문서를 검색합니다.
async fn cmd_query(
    config: &AppConfig,
    query: &str,
    paths: &[PathBuf],
    limit: Option<usize>,
) -> Result<()> {
    let files = collect_documents(paths, false)?;
    if files.is_empty() {
        bail!("검색할 문서가 없습니다");
    }

    let provider: Arc<dyn EmbeddingProvider> = Arc::new(connect(config).await?);

    let pipeline = IngestionPipeline::new(&config.ingest);
    let prepared = pipeline
        .ensure_knowledge_bases(&files, provider.as_ref(), &config.cache_dir, false)
        .await;
    for (path, reason) in &prepared.failed {
        println!("[!] 지식베이스 생성 실패 {}: {}", path.display(), reason);
    }

    let mut engine = MultiDocumentSearchEngine::new(config.search.clone());
    let report = engine.load(Arc::clone(&provider), &prepared.descriptors);
    for skipped in &report.skipped {
        println!("[!] 건너뜀 {}: {}", skipped.name, skipped.reason);
    }
    for doc in engine.engines() {
        if let Some(mismatch) = doc.provider_mismatch() {
            println!("[!] {}: {}", doc.name(), mismatch);
        }
    }

    println!("[*] 검색 중: \"{}\" ({} 문서)", query, report.loaded);

    let limit = limit.unwrap_or(config.search.aggregate_top_k);
    let results = engine.search(query, limit).await.context("검색 실패")?;

    if results.is_empty() {
        println!("\n[!] 검색 결과가 없습니다.");
        return Ok(());
    }

    println!("\n[OK] 검색 결과 ({} 건):\n", results.len());

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [점수: {:.4}] {} (Page {})",
            i + 1,
            result.score,
            result.source_document,
            result.page
        );
        println!("   내용: {}", truncate_text(&result.text, 200));
        println!();
    }

    Ok(())
}

/// 페이지 읽기 명령어 (page)
///
/// 저장된 청크만 읽으므로 프로바이더에 연결하지 않습니다.
fn cmd_page(config: &AppConfig, name: &str, page: u32, docs: &[PathBuf]) -> Result<()> {
    let files = collect_documents(docs, false)?;
    let provider_id = config.embedding.provider.as_str();

    match read_document_page(&files, &config.cache_dir, provider_id, name, page)? {
        Some(text) => {
            println!("[OK] {} - Page {}\n", name, page);
            println!("{}", text);
        }
        None => println!("[!] {} 에 {} 페이지 내용이 없습니다.", name, page),
    }

    Ok(())
}

/// 목록 명령어 (list)
///
/// 캐시 디렉토리의 지식베이스 파일과 크기를 보여줍니다.
fn cmd_list(config: &AppConfig) -> Result<()> {
    let files = cached_knowledge_bases(&config.cache_dir)?;
    if files.is_empty() {
        println!("[!] 저장된 지식베이스가 없습니다.");
        println!("    캐시 디렉토리: {}", config.cache_dir.display());
        return Ok(());
    }

    println!("[OK] 지식베이스 ({} 건):\n", files.len());
    for (name, size) in &files {
        println!("  {:<60} {}", name, format_bytes(*size as usize));
    }

    Ok(())
}

/// 설정 초기화 명령어 (init)
fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        println!("[!] 설정 파일이 이미 있습니다: {}", config_path.display());
        println!("    덮어쓰려면 --force");
        return Ok(());
    }

    AppConfig::default().save_to(config_path)?;
    println!("[OK] 설정 파일 생성: {}", config_path.display());
    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status(config: &AppConfig, config_path: &Path) -> Result<()> {
    println!("docvec v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 설정 파일: {}", config_path.display());
    println!("[*] 캐시 디렉토리: {}", config.cache_dir.display());
    println!("[*] 프로바이더: {}", config.embedding.provider);

    match config.embedding.provider {
        ProviderKind::OpenAi => {
            if has_api_key() {
                println!("[OK] API 키: 설정됨");
            } else {
                println!("[!] API 키: 미설정");
                println!("    설정: export OPENAI_API_KEY=your-key");
            }
        }
        ProviderKind::Ollama => {
            println!("[*] Ollama: {}", config.embedding.ollama_url);
        }
    }

    match cached_knowledge_bases(&config.cache_dir) {
        Ok(files) => {
            let bytes: u64 = files.iter().map(|(_, size)| size).sum();
            println!("[OK] 지식베이스: {} 개", files.len());
            println!("     총 크기: {}", format_bytes(bytes as usize));
        }
        Err(e) => {
            tracing::debug!("Failed to read cache dir: {}", e);
            println!("[!] 캐시 디렉토리를 읽을 수 없습니다");
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 설정대로 임베딩 프로바이더 연결
async fn connect(config: &AppConfig) -> Result<Embedder> {
    if config.embedding.provider == ProviderKind::OpenAi && !has_api_key() {
        bail!(
            "API 키가 설정되지 않았습니다.\n\n\
             설정 방법:\n  \
             export OPENAI_API_KEY=your-api-key\n\n\
             또는 로컬 Ollama 사용: --provider ollama"
        );
    }

    Embedder::connect(&config.embedding)
        .await
        .context("임베딩 프로바이더 초기화 실패")
}

/// 파일/폴더 경로들에서 지원 문서 수집 (중복 제거, 순서 유지)
fn collect_documents(paths: &[PathBuf], skip_pdfs: bool) -> Result<Vec<PathBuf>> {
    let collector = FileCollector::new(CollectorConfig {
        skip_pdfs,
        ..Default::default()
    });

    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(collector.collect_directory(path)?);
        } else {
            match collector.collect_file(path)? {
                Some(f) => files.push(f),
                None => println!("[!] 지원하지 않는 파일 형식: {:?}", path),
            }
        }
    }

    let stats = CollectionStats::from_files(&files);
    tracing::debug!(
        "Collected {} files (text: {}, pdf: {}, {})",
        stats.total_files,
        stats.text_files,
        stats.pdf_files,
        format_bytes(stats.total_size as usize)
    );

    let mut seen = std::collections::HashSet::new();
    Ok(files
        .into_iter()
        .map(|f| f.path)
        .filter(|p| seen.insert(p.clone()))
        .collect())
}

/// 이름으로 문서를 찾아 저장된 페이지 텍스트 읽기
fn read_document_page(
    files: &[PathBuf],
    cache_dir: &Path,
    provider_id: &str,
    name: &str,
    page: u32,
) -> Result<Option<String>> {
    let wanted = name.to_lowercase();
    let descriptor = files
        .iter()
        .map(|f| DocumentDescriptor::new(f, cache_dir, provider_id))
        .find(|d| d.display_name().to_lowercase() == wanted)
        .with_context(|| format!("문서를 찾을 수 없습니다: {}", name))?;

    if !descriptor.is_cached() {
        bail!(
            "{} 의 지식베이스가 없습니다. 먼저 `docvec ingest`를 실행하세요",
            descriptor.display_name()
        );
    }

    let chunks = KnowledgeBaseStore::read_chunks(&descriptor.cache_path)?;
    Ok(page_text(&chunks, page))
}

/// 캐시 디렉토리의 지식베이스 파일 (이름순, 크기)
fn cached_knowledge_bases(cache_dir: &Path) -> Result<Vec<(String, u64)>> {
    if !cache_dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(cache_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(CACHE_SUFFIX) {
            files.push((name, entry.metadata()?.len()));
        }
    }
    files.sort();
    Ok(files)
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Chunk;
    use tempfile::TempDir;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hello\nworld", 20), "hello world");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
    }

    #[test]
    fn test_truncate_unicode() {
        let korean = "안녕하세요 세계";
        assert_eq!(truncate_text(korean, 5), "안녕하세요...");
    }

    #[test]
    fn test_collect_documents_dedups_and_filters() {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir(&docs).unwrap();
        std::fs::write(docs.join("a.md"), "# A").unwrap();
        std::fs::write(docs.join("b.txt"), "B").unwrap();
        std::fs::write(docs.join("c.docx"), "C").unwrap();

        let a = docs.join("a.md");
        let files = collect_documents(&[docs.clone(), a.clone()], false).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0], a);
    }

    #[test]
    fn test_cached_knowledge_bases_lists_only_cache_files() {
        let dir = TempDir::new().unwrap();
        assert!(cached_knowledge_bases(&dir.path().join("missing")).unwrap().is_empty());

        std::fs::write(dir.path().join("b_0011223344556677_ollama_knowledge.json"), "[]").unwrap();
        std::fs::write(dir.path().join("a_8899aabbccddeeff_openai_knowledge.json"), "[1]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = cached_knowledge_bases(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![
                ("a_8899aabbccddeeff_openai_knowledge.json".to_string(), 3),
                ("b_0011223344556677_ollama_knowledge.json".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_read_document_page_from_stored_chunks() {
        let dir = TempDir::new().unwrap();
        let cache_dir = dir.path().join("cache");
        let doc = dir.path().join("Handbook.pdf");
        let other = dir.path().join("notes.md");

        let stored = DocumentDescriptor::new(&doc, &cache_dir, "ollama");
        let chunks = vec![
            Chunk {
                id: 1,
                page_number: 4,
                content: "second paragraph".into(),
                vector: vec![0.0, 1.0],
            },
            Chunk {
                id: 0,
                page_number: 4,
                content: "first paragraph".into(),
                vector: vec![1.0, 0.0],
            },
        ];
        std::fs::create_dir_all(&cache_dir).unwrap();
        std::fs::write(&stored.cache_path, serde_json::to_string(&chunks).unwrap()).unwrap();

        let files = vec![other.clone(), doc.clone()];
        let text = read_document_page(&files, &cache_dir, "ollama", "handbook", 4).unwrap();
        assert_eq!(text.as_deref(), Some("first paragraph\nsecond paragraph"));
        assert_eq!(
            read_document_page(&files, &cache_dir, "ollama", "Handbook", 5).unwrap(),
            None
        );

        // 다른 프로바이더의 캐시는 없음
        assert!(read_document_page(&files, &cache_dir, "openai", "Handbook", 4).is_err());
        // 목록에 없는 이름
        assert!(read_document_page(&files, &cache_dir, "ollama", "missing", 4).is_err());
    }

    #[test]
    fn test_cli_surfaces() {
        let cli = Cli::try_parse_from([
            "docvec", "query", "hello", "--doc", "a.pdf", "b.md", "--provider", "ollama",
        ])
        .unwrap();
        assert_eq!(cli.provider, Some(ProviderKind::Ollama));
        match cli.command {
            Commands::Query { query, docs, limit } => {
                assert_eq!(query, "hello");
                assert_eq!(docs, vec![PathBuf::from("a.pdf"), PathBuf::from("b.md")]);
                assert_eq!(limit, None);
            }
            _ => panic!("expected query"),
        }

        let cli = Cli::try_parse_from(["docvec", "page", "Handbook", "3", "--doc", "docs"]).unwrap();
        assert!(matches!(cli.command, Commands::Page { page: 3, .. }));

        let cli = Cli::try_parse_from(["docvec", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::List));

        assert!(Cli::try_parse_from(["docvec", "query", "hello"]).is_err());
    }
}
