//! 配置文件读写与带注释生成。
//!
//! 首次运行时按默认值生成带注释的 YAML；之后读取用户文件并与默认值合并，
//! 缺字段时回写补全，保证新增字段能出现在用户的配置文件里。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读写配置文件 {path} 失败: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("配置文件 {path} 不是有效的 YAML: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("配置内容无效: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldMeta {
    pub name: &'static str,
    pub description: &'static str,
}

pub trait ConfigSpec: Serialize + DeserializeOwned + Default {
    const FILE_NAME: &'static str;
    fn fields() -> &'static [FieldMeta];
}

/// 读取（不存在则创建）配置文件。
///
/// `base_dir` 为 `None` 时使用当前目录下的 `FILE_NAME`。
pub fn load_or_create<T: ConfigSpec>(base_dir: Option<&Path>) -> Result<T, ConfigError> {
    let path = config_path::<T>(base_dir);
    ensure_parent(&path)?;

    if !path.exists() {
        let default_config = T::default();
        write_commented(&default_config, &path)?;
        info!("已生成默认配置文件: {}", path.display());
        return Ok(default_config);
    }

    let user_yaml = read_yaml(&path)?;
    let missing = missing_fields::<T>(&user_yaml);

    let mut merged = serde_yaml::to_value(T::default())
        .map_err(|err| ConfigError::Validation(err.to_string()))?;
    merge_values(&mut merged, user_yaml);

    let config: T =
        serde_yaml::from_value(merged).map_err(|err| ConfigError::Validation(err.to_string()))?;

    if !missing.is_empty() {
        debug!("配置缺少字段 {:?}，回写补全", missing);
        write_commented(&config, &path)?;
    }

    Ok(config)
}

fn config_path<T: ConfigSpec>(base_dir: Option<&Path>) -> PathBuf {
    match base_dir {
        Some(base) => base.join(T::FILE_NAME),
        None => PathBuf::from(T::FILE_NAME),
    }
}

fn write_commented<T: ConfigSpec>(config: &T, path: &Path) -> Result<(), ConfigError> {
    ensure_parent(path)?;
    let yaml = render_commented(config)?;
    fs::write(path, yaml).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn render_commented<T: ConfigSpec>(config: &T) -> Result<String, ConfigError> {
    let value =
        serde_yaml::to_value(config).map_err(|err| ConfigError::Validation(err.to_string()))?;
    let Value::Mapping(mapping) = value else {
        return Err(ConfigError::Validation(
            "顶层必须是映射".to_string(),
        ));
    };

    let mut lines = Vec::new();
    for field in T::fields() {
        if !field.description.is_empty() {
            lines.push(format!("# {}", field.description.replace('\n', "\n# ")));
        }
        let key = Value::String(field.name.to_string());
        let val = mapping.get(&key).cloned().unwrap_or(Value::Null);
        let yaml_line = serde_yaml::to_string(&Mapping::from_iter([(key, val)]))
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        lines.push(yaml_line.trim().to_string());
    }
    lines.push(String::new());

    Ok(lines.join("\n"))
}

fn read_yaml(path: &Path) -> Result<Value, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn missing_fields<T: ConfigSpec>(user_yaml: &Value) -> Vec<&'static str> {
    let Value::Mapping(map) = user_yaml else {
        return T::fields().iter().map(|f| f.name).collect();
    };
    T::fields()
        .iter()
        .filter(|f| !map.contains_key(Value::String(f.name.to_string())))
        .map(|f| f.name)
        .collect()
}

fn merge_values(default: &mut Value, user: Value) {
    match (default, user) {
        (Value::Mapping(dest), Value::Mapping(src)) => {
            for (key, user_val) in src {
                if let Some(dest_val) = dest.get_mut(&key) {
                    merge_values(dest_val, user_val);
                } else {
                    dest.insert(key, user_val);
                }
            }
        }
        // 空文件解析为 null，保留默认值
        (_, Value::Null) => {}
        (dest, other) => {
            *dest = other;
        }
    }
}

fn ensure_parent(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_system::context::Config;
    use tempfile::TempDir;

    #[test]
    fn creates_commented_default_file() {
        let dir = TempDir::new().unwrap();
        let cfg: Config = load_or_create(Some(dir.path())).unwrap();
        assert_eq!(cfg.batch_size, 50);

        let raw = fs::read_to_string(dir.path().join("config.yml")).unwrap();
        assert!(raw.contains("# 每批同时下载的图片数"));
        assert!(raw.contains("batch_size: 50"));
    }

    #[test]
    fn user_values_override_defaults_and_missing_fields_are_backfilled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "batch_size: 7\nexclude_ids:\n  - '-108'\n").unwrap();

        let cfg: Config = load_or_create(Some(dir.path())).unwrap();
        assert_eq!(cfg.batch_size, 7);
        assert_eq!(cfg.exclude_ids, vec!["-108".to_string()]);
        assert_eq!(cfg.encoding, "windows-1251");

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("batch_size: 7"));
        assert!(raw.contains("api_version:"));
    }

    #[test]
    fn empty_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.yml"), "").unwrap();
        let cfg: Config = load_or_create(Some(dir.path())).unwrap();
        assert_eq!(cfg.max_retries, 3);
    }

    #[test]
    fn broken_yaml_is_reported_with_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.yml"), "batch_size: [").unwrap();
        let err = load_or_create::<Config>(Some(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn parse_error_keeps_yaml_cause_under_context() {
        use anyhow::Context;

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.yml"), "batch_size: [").unwrap();
        let err = load_or_create::<Config>(Some(dir.path()))
            .context("加载配置失败")
            .unwrap_err();
        let chain: Vec<String> = err.chain().map(|e| e.to_string()).collect();
        assert!(chain.len() >= 3, "{chain:?}");
        assert_eq!(chain[0], "加载配置失败");
        assert!(chain[1].contains("config.yml"));
    }
}
