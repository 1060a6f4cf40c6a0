use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// 辅助关键词数量下限
pub const MIN_SUPPORTING_KEYWORDS: usize = 4;
/// 辅助关键词数量上限
pub const MAX_SUPPORTING_KEYWORDS: usize = 5;

/// 服务端保存的关键词组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSet {
    #[serde(rename = "_id")]
    pub id: String,
    pub main_keyword: String,
    /// 顺序仅用于展示
    #[serde(rename = "keywords", default)]
    pub supporting_keywords: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// 服务端给出的状态标签（created / scraped / images_found ...）
    #[serde(default)]
    pub status: Option<String>,
}

impl std::fmt::Display for KeywordSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] ({})",
            self.main_keyword,
            self.supporting_keywords.join(", "),
            self.status.as_deref().unwrap_or("unknown")
        )
    }
}

/// 用户在表单中输入的关键词（未校验）
#[derive(Debug, Clone, Default)]
pub struct KeywordInput {
    pub main_keyword: String,
    pub supporting_keywords: Vec<String>,
}

impl KeywordInput {
    pub fn new(main_keyword: impl Into<String>, supporting_keywords: Vec<String>) -> Self {
        Self {
            main_keyword: main_keyword.into(),
            supporting_keywords,
        }
    }

    /// 校验输入
    ///
    /// 空白的辅助关键词在计数前被丢弃；主关键词去掉首尾空白后不能为空，
    /// 辅助关键词数量必须在 4-5 之间
    pub fn validate(&self) -> Result<ValidatedKeywords, ValidationError> {
        let main_keyword = self.main_keyword.trim();
        if main_keyword.is_empty() {
            return Err(ValidationError::EmptyMainKeyword);
        }

        let supporting: Vec<String> = self
            .supporting_keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();

        if !(MIN_SUPPORTING_KEYWORDS..=MAX_SUPPORTING_KEYWORDS).contains(&supporting.len()) {
            return Err(ValidationError::KeywordCount {
                count: supporting.len(),
            });
        }

        Ok(ValidatedKeywords {
            main_keyword: main_keyword.to_string(),
            supporting_keywords: supporting,
        })
    }
}

/// 已通过校验的关键词，只能由 [`KeywordInput::validate`] 构造
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedKeywords {
    main_keyword: String,
    supporting_keywords: Vec<String>,
}

impl ValidatedKeywords {
    pub fn main_keyword(&self) -> &str {
        &self.main_keyword
    }

    pub fn supporting_keywords(&self) -> &[String] {
        &self.supporting_keywords
    }
}
