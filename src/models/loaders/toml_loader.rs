use crate::error::AppError;
use crate::models::dialect::DialectRegistry;
use crate::models::manifest::SourceManifest;
use crate::models::taxonomy::Taxonomy;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 读取并校验来源清单，`base_dir` 设为清单所在目录
pub async fn load_manifest(manifest_path: &Path) -> Result<SourceManifest> {
    let content = fs::read_to_string(manifest_path)
        .await
        .map_err(|e| AppError::file_read_failed(manifest_path.display().to_string(), e))?;

    let base_dir = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let manifest = SourceManifest::from_toml_str(&content, base_dir)
        .with_context(|| format!("无法解析来源清单: {}", manifest_path.display()))?;
    manifest.validate(&manifest_path.to_string_lossy())?;

    tracing::info!(
        "成功加载来源清单: {} 个来源",
        manifest.sources.len()
    );
    Ok(manifest)
}

/// 加载分类表；未给出路径时使用内置分类表
pub async fn load_taxonomy(taxonomy_path: Option<&Path>) -> Result<Taxonomy> {
    let Some(path) = taxonomy_path else {
        return Ok(Taxonomy::builtin()?);
    };

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
    let taxonomy = Taxonomy::from_toml_str(&content)
        .with_context(|| format!("无法解析分类表: {}", path.display()))?;

    tracing::info!(
        "已加载外部分类表 (版本 {}): {} 个类别",
        taxonomy.version,
        taxonomy.categories.len()
    );
    Ok(taxonomy)
}

/// 把方言文件中的 `[[dialects]]` 合并进注册表，同名方言被覆盖
pub async fn load_dialect_file(registry: &mut DialectRegistry, dialect_path: &Path) -> Result<usize> {
    let content = fs::read_to_string(dialect_path)
        .await
        .map_err(|e| AppError::file_read_failed(dialect_path.display().to_string(), e))?;

    let count = registry
        .extend_from_toml_str(&content)
        .with_context(|| format!("无法解析方言文件: {}", dialect_path.display()))?;

    tracing::info!("从 {} 加载了 {} 个方言", dialect_path.display(), count);
    Ok(count)
}
