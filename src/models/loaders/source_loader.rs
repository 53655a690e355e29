use crate::error::AppError;
use crate::models::bank::BankArtifact;
use crate::services::answer_key::CorrectAnswerMap;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::warn;

/// 读取来源文本；读取失败时告警并返回 None，由调用方按 0 条记录处理
pub async fn load_source_text(text_path: &Path) -> Option<String> {
    match fs::read_to_string(text_path).await {
        Ok(content) => Some(content),
        Err(e) => {
            warn!("⚠️ 无法读取来源文本 {}: {}", text_path.display(), e);
            None
        }
    }
}

/// 读取答案表；缺失或格式错误时告警并忽略
pub async fn load_answer_key(key_path: &Path) -> Option<CorrectAnswerMap> {
    let content = match fs::read_to_string(key_path).await {
        Ok(content) => content,
        Err(e) => {
            warn!("⚠️ 答案表不可用 {}: {}", key_path.display(), e);
            return None;
        }
    };

    match CorrectAnswerMap::from_json_str(&content) {
        Ok(map) => {
            tracing::info!(
                "已加载答案表 {}: {} 条",
                key_path
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy(),
                map.len()
            );
            Some(map)
        }
        Err(e) => {
            warn!("⚠️ 答案表格式错误，已忽略 {}: {}", key_path.display(), e);
            None
        }
    }
}

/// 读取之前生成的输出文件
pub async fn load_artifact(artifact_path: &Path) -> Result<BankArtifact> {
    let path = artifact_path.display().to_string();
    let content = fs::read_to_string(artifact_path)
        .await
        .map_err(|e| AppError::file_read_failed(path.clone(), e))?;
    let artifact: BankArtifact =
        serde_json::from_str(&content).map_err(|e| AppError::json_parse_failed(path, e))?;
    Ok(artifact)
}

/// 以缩进 JSON 写出，必要时创建目录
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FileError;

    #[tokio::test]
    async fn test_missing_inputs_are_soft() {
        assert!(load_source_text(Path::new("/nonexistent/a.txt")).await.is_none());
        assert!(load_answer_key(Path::new("/nonexistent/key.json")).await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_answer_key_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(load_answer_key(&path).await.is_none());

        std::fs::write(&path, r#"{"correctAnswers": {"3": "b"}}"#).unwrap();
        let key = load_answer_key(&path).await.unwrap();
        assert_eq!(key.get(3), Some('B'));
    }

    #[tokio::test]
    async fn test_artifact_errors_carry_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.json");
        std::fs::write(&path, "{\"metadata\": ").unwrap();

        let err = load_artifact(&path).await.unwrap_err();
        let app = err.downcast_ref::<AppError>().unwrap();
        assert!(matches!(app, AppError::File(FileError::JsonParseFailed { .. })));
        assert!(err.to_string().contains("old.json"));

        let err = load_artifact(&dir.path().join("manca.json")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::File(FileError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_write_json_reports_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        // 父路径是普通文件，无法创建目录
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let err = write_json(&blocker.join("x.json"), &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::File(FileError::WriteFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_write_json_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("x.json");
        write_json(&path, &serde_json::json!({"ok": true})).await.unwrap();
        let back: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back["ok"], true);
    }
}
