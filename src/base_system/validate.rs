//! 交互输入校验。
//!
//! 所有校验都在管线开始前完成，失败时不会产生任何副作用。

use std::path::{Path, PathBuf};
use std::time::Duration;

use encoding_rs::Encoding;
use thiserror::Error;

use super::file_utils::{has_html_extension, list_html_files};

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("指定的输入路径不存在: {0}")]
    InputMissing(PathBuf),
    #[error("模式 1 的输入必须是单个 .html 文件")]
    NotHtmlFile,
    #[error("模式 2 的输入必须是包含 .html 文件的目录，而不是单个文件")]
    NotDirectory,
    #[error("模式 2 的输入目录中至少要有一个 .html 文件")]
    NoHtmlFiles,
    #[error("输出路径已存在但不是目录: {0}")]
    OutputNotDir(PathBuf),
    #[error("批大小必须是正整数")]
    BatchSize,
    #[error("重试次数必须是非负整数")]
    Retries,
    #[error("等待时间必须是非负数")]
    SleepTime,
    #[error("不支持的文件编码: {0}")]
    Encoding(String),
    #[error("删除评论需要提供 access_token")]
    MissingToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// 单个 HTML 文件（图片下载）
    HtmlFile,
    /// 含 HTML 文件的目录（评论删除）
    HtmlDir,
}

/// 去掉拖拽路径时常见的首尾引号。
fn unquote(raw: &str) -> &str {
    raw.trim().trim_matches('"')
}

pub fn validate_input_path(raw: &str, kind: InputKind) -> Result<PathBuf, ValidationError> {
    let path = PathBuf::from(unquote(raw));
    if raw.trim().is_empty() || !path.exists() {
        return Err(ValidationError::InputMissing(path));
    }
    match kind {
        InputKind::HtmlFile => {
            if !path.is_file() || !has_html_extension(&path) {
                return Err(ValidationError::NotHtmlFile);
            }
        }
        InputKind::HtmlDir => {
            if !path.is_dir() {
                return Err(ValidationError::NotDirectory);
            }
            let files = list_html_files(&path).map_err(|_| ValidationError::NoHtmlFiles)?;
            if files.is_empty() {
                return Err(ValidationError::NoHtmlFiles);
            }
        }
    }
    Ok(path)
}

pub fn validate_output_dir(path: &Path) -> Result<(), ValidationError> {
    if path.exists() && !path.is_dir() {
        return Err(ValidationError::OutputNotDir(path.to_path_buf()));
    }
    Ok(())
}

pub fn validate_batch_size(raw: &str) -> Result<usize, ValidationError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ValidationError::BatchSize),
    }
}

pub fn validate_retries(raw: &str) -> Result<u32, ValidationError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ValidationError::Retries)
}

/// 秒数必须非负且能表示为 `Duration`（`inf`、`1e20` 之类都拒绝）。
pub fn validate_sleep_time(raw: &str) -> Result<Duration, ValidationError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v >= 0.0 => {
            Duration::try_from_secs_f64(v).map_err(|_| ValidationError::SleepTime)
        }
        _ => Err(ValidationError::SleepTime),
    }
}

pub fn validate_encoding(label: &str) -> Result<&'static Encoding, ValidationError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ValidationError::Encoding(label.trim().to_string()))
}

pub fn validate_token(token: &str) -> Result<String, ValidationError> {
    let t = token.trim();
    if t.is_empty() {
        return Err(ValidationError::MissingToken);
    }
    Ok(t.to_string())
}

/// 逗号分隔的 ID 列表：去空白、丢弃空项。
pub fn parse_exclude_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn numbers() {
        assert_eq!(validate_batch_size("50"), Ok(50));
        assert_eq!(validate_batch_size(" 3 "), Ok(3));
        assert_eq!(validate_batch_size("0"), Err(ValidationError::BatchSize));
        assert_eq!(validate_batch_size("-1"), Err(ValidationError::BatchSize));
        assert_eq!(validate_batch_size("abc"), Err(ValidationError::BatchSize));

        assert_eq!(validate_retries("0"), Ok(0));
        assert_eq!(validate_retries("-2"), Err(ValidationError::Retries));

        assert_eq!(validate_sleep_time("0.25"), Ok(Duration::from_millis(250)));
        assert_eq!(validate_sleep_time("1"), Ok(Duration::from_secs(1)));
        assert_eq!(validate_sleep_time("-0.1"), Err(ValidationError::SleepTime));
        assert_eq!(validate_sleep_time("inf"), Err(ValidationError::SleepTime));
        assert_eq!(validate_sleep_time("NaN"), Err(ValidationError::SleepTime));
    }

    #[test]
    fn huge_sleep_time_is_rejected_not_panicking() {
        assert_eq!(validate_sleep_time("1e20"), Err(ValidationError::SleepTime));
    }

    #[test]
    fn exclude_list_is_trimmed() {
        assert_eq!(
            parse_exclude_ids(" -108958540, ,182582439,"),
            vec!["-108958540".to_string(), "182582439".to_string()]
        );
        assert!(parse_exclude_ids("").is_empty());
    }

    #[test]
    fn encodings() {
        assert_eq!(
            validate_encoding("windows-1251").unwrap(),
            encoding_rs::WINDOWS_1251
        );
        assert_eq!(validate_encoding("UTF-8").unwrap(), encoding_rs::UTF_8);
        assert!(validate_encoding("klingon").is_err());
    }

    #[test]
    fn token_required() {
        assert_eq!(validate_token("  "), Err(ValidationError::MissingToken));
        assert_eq!(validate_token(" abc ").unwrap(), "abc");
    }

    #[test]
    fn input_paths() {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("album.html");
        fs::write(&page, "<html></html>").unwrap();
        let quoted = format!("\"{}\"", page.display());

        assert_eq!(
            validate_input_path(&quoted, InputKind::HtmlFile).unwrap(),
            page
        );
        assert_eq!(
            validate_input_path(&dir.path().display().to_string(), InputKind::HtmlFile),
            Err(ValidationError::NotHtmlFile)
        );
        assert_eq!(
            validate_input_path(&page.display().to_string(), InputKind::HtmlDir),
            Err(ValidationError::NotDirectory)
        );
        assert!(validate_input_path(&dir.path().display().to_string(), InputKind::HtmlDir).is_ok());

        let empty = TempDir::new().unwrap();
        assert_eq!(
            validate_input_path(&empty.path().display().to_string(), InputKind::HtmlDir),
            Err(ValidationError::NoHtmlFiles)
        );
        assert!(matches!(
            validate_input_path("/definitely/not/here.html", InputKind::HtmlFile),
            Err(ValidationError::InputMissing(_))
        ));
    }

    #[test]
    fn output_dir_must_not_be_a_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("x");
        fs::write(&file, "").unwrap();
        assert!(validate_output_dir(dir.path()).is_ok());
        assert!(validate_output_dir(&dir.path().join("new")).is_ok());
        assert_eq!(
            validate_output_dir(&file),
            Err(ValidationError::OutputNotDir(file.clone()))
        );
    }
}
