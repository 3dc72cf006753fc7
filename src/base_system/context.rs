//! 全局配置结构（Config）与默认值。
//!
//! 该模块同时提供生成 `config.yml` 的字段元信息。交互提示中显示的默认值都取自这里。

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::config::{ConfigSpec, FieldMeta};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 图片下载
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: f64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    // 评论删除
    #[serde(default = "default_delete_output_file")]
    pub delete_output_file: String,
    #[serde(default = "default_sleep_time")]
    pub sleep_time: f64,
    #[serde(default)]
    pub exclude_ids: Vec<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_true")]
    pub trailing_delay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            batch_size: default_batch_size(),
            encoding: default_encoding(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            request_timeout: default_request_timeout(),
            delete_output_file: default_delete_output_file(),
            sleep_time: default_sleep_time(),
            exclude_ids: Vec::new(),
            api_url: default_api_url(),
            api_version: default_api_version(),
            trailing_delay: default_true(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 12] = [
            FieldMeta {
                name: "output_dir",
                description: "图片保存目录",
            },
            FieldMeta {
                name: "batch_size",
                description: "每批同时下载的图片数",
            },
            FieldMeta {
                name: "encoding",
                description: "存档 HTML 文件编码",
            },
            FieldMeta {
                name: "max_retries",
                description: "单张图片最大尝试次数（0 表示不下载）",
            },
            FieldMeta {
                name: "retry_delay_secs",
                description: "两次尝试之间的等待时间（秒）",
            },
            FieldMeta {
                name: "request_timeout",
                description: "请求超时时间（秒）",
            },
            FieldMeta {
                name: "delete_output_file",
                description: "待删除评论 ID 列表的输出文件",
            },
            FieldMeta {
                name: "sleep_time",
                description: "两次 API 请求之间的等待时间（秒）",
            },
            FieldMeta {
                name: "exclude_ids",
                description: "跳过的用户/社区 ID（子串匹配，例如 -108958540）",
            },
            FieldMeta {
                name: "api_url",
                description: "VK API execute 接口地址",
            },
            FieldMeta {
                name: "api_version",
                description: "VK API 版本号",
            },
            FieldMeta {
                name: "trailing_delay",
                description: "最后一批请求后是否仍然等待 sleep_time",
            },
        ];
        &FIELDS
    }
}

impl Config {
    pub fn default_output_dir(&self) -> PathBuf {
        if self.output_dir.trim().is_empty() {
            PathBuf::from(default_output_dir())
        } else {
            PathBuf::from(&self.output_dir)
        }
    }

    pub fn retry_delay(&self) -> Duration {
        secs_f64_to_duration(self.retry_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.max(1))
    }
}

/// 负数 / NaN 视为 0；超出 `Duration` 范围时记录警告并视为 0。
fn secs_f64_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or_else(|_| {
        warn!("等待时间 {} 秒超出范围，按 0 处理", secs);
        Duration::ZERO
    })
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> String {
    "downloaded_images".to_string()
}

fn default_batch_size() -> usize {
    50
}

fn default_encoding() -> String {
    "windows-1251".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> f64 {
    2.0
}

fn default_request_timeout() -> u64 {
    30
}

fn default_delete_output_file() -> String {
    "to_delete_comment_ids.txt".to_string()
}

fn default_sleep_time() -> f64 {
    1.0
}

fn default_api_url() -> String {
    "https://api.vk.com/method/execute".to_string()
}

fn default_api_version() -> String {
    "5.131".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_prompts() {
        let cfg = Config::default();
        assert_eq!(cfg.output_dir, "downloaded_images");
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.encoding, "windows-1251");
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.retry_delay(), Duration::from_secs(2));
        assert_eq!(cfg.delete_output_file, "to_delete_comment_ids.txt");
        assert_eq!(cfg.sleep_time, 1.0);
        assert!(cfg.trailing_delay);
    }

    #[test]
    fn negative_seconds_clamp_to_zero() {
        assert_eq!(secs_f64_to_duration(-1.0), Duration::ZERO);
        assert_eq!(secs_f64_to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(secs_f64_to_duration(0.5), Duration::from_millis(500));
    }

    #[test]
    fn out_of_range_retry_delay_does_not_panic() {
        let cfg = Config {
            retry_delay_secs: 1e20,
            ..Config::default()
        };
        assert_eq!(cfg.retry_delay(), Duration::ZERO);
        assert_eq!(secs_f64_to_duration(f64::INFINITY), Duration::ZERO);
    }

    #[test]
    fn field_meta_covers_every_serialized_key() {
        let value = serde_yaml::to_value(Config::default()).unwrap();
        let serde_yaml::Value::Mapping(map) = value else {
            panic!("config must be a mapping");
        };
        assert_eq!(map.len(), Config::fields().len());
        for field in Config::fields() {
            assert!(
                map.contains_key(serde_yaml::Value::String(field.name.to_string())),
                "missing {}",
                field.name
            );
        }
    }
}
