use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// 抓取结果摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeSummary {
    #[serde(default)]
    pub total_results: u64,
    /// 抓取完成时间
    #[serde(default)]
    pub scraped_at: Option<String>,
}

/// 单张图片描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub url: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub title: String,
}

/// 图片搜索结果：关键词 → 图片列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCatalog {
    pub images: BTreeMap<String, Vec<ImageDescriptor>>,
}

/// 可供选择的图片（带唯一标识）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub unique_id: String,
    pub keyword: String,
    pub image: ImageDescriptor,
}

impl ImageCatalog {
    pub fn total(&self) -> usize {
        self.images.values().map(Vec::len).sum()
    }

    /// 展开为候选列表，唯一标识格式为 `{url}_{keyword}_{index}`
    pub fn candidates(&self) -> Vec<ImageCandidate> {
        self.images
            .iter()
            .flat_map(|(keyword, images)| {
                images
                    .iter()
                    .enumerate()
                    .filter(|(_, img)| !img.url.is_empty())
                    .map(move |(idx, img)| ImageCandidate {
                        unique_id: format!("{}_{}_{}", img.url, keyword, idx),
                        keyword: keyword.clone(),
                        image: img.clone(),
                    })
            })
            .collect()
    }
}

/// 图片集成后的预览
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationPreview {
    pub html_preview: String,
    #[serde(default)]
    pub images_used: u32,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// 博客元数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogMetadata {
    pub title: String,
    pub slug: String,
    pub meta_description: String,
    pub meta_keywords: String,
    pub og_title: String,
    pub og_description: String,
}

/// 元数据生成后的最终结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedBlog {
    pub metadata: BlogMetadata,
    pub final_html: String,
    pub blog_id: String,
}

/// 服务端保存的博客
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogArtifact {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub keyword_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub html_content: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub word_count: Option<u64>,
}

/// 批量条目预览
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPreview {
    pub html: String,
    #[serde(default)]
    pub metadata: JsonValue,
    #[serde(default)]
    pub ready_for_download: bool,
}

/// 下载格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Html,
    Txt,
    Json,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Txt => "txt",
            OutputFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(OutputFormat::Html),
            "txt" => Ok(OutputFormat::Txt),
            "json" => Ok(OutputFormat::Json),
            other => Err(ValidationError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_unique_ids() {
        let mut images = BTreeMap::new();
        images.insert(
            "robotic welding".to_string(),
            vec![
                ImageDescriptor {
                    url: "https://img/a.jpg".to_string(),
                    alt_text: "a".to_string(),
                    source: "Bing Images".to_string(),
                    title: String::new(),
                },
                ImageDescriptor {
                    url: String::new(),
                    alt_text: "empty".to_string(),
                    source: String::new(),
                    title: String::new(),
                },
            ],
        );
        let catalog = ImageCatalog { images };

        let candidates = catalog.candidates();
        assert_eq!(catalog.total(), 2);
        // 没有 url 的图片不可选
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].unique_id, "https://img/a.jpg_robotic welding_0");
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("HTML".parse::<OutputFormat>(), Ok(OutputFormat::Html));
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("pdf".parse::<OutputFormat>().is_err());
    }
}
