use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 远程服务调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 输入校验错误（不会发出任何远程请求）
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 本地会话存储错误
    #[error("会话存储错误: {0}")]
    Session(#[from] SessionError),
    /// 工作流状态错误
    #[error("流程错误: {0}")]
    Workflow(#[from] WorkflowError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 远程服务调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 请求超时
    #[error("API请求超时 ({endpoint})")]
    Timeout { endpoint: String },
    /// 服务端返回错误响应
    #[error("API返回错误响应 ({endpoint}): status={status}, message={message:?}")]
    BadResponse {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },
    /// 服务端不存在对应实体（关键词组、批量任务已被删除等）
    #[error("远程实体不存在 ({endpoint}): {message:?}")]
    NotFound {
        endpoint: String,
        message: Option<String>,
    },
    /// 响应缺少必要字段
    #[error("API响应缺少字段 ({endpoint}): {field}")]
    MissingField { endpoint: String, field: String },
    /// JSON 解析失败
    #[error("JSON解析失败: {source}")]
    JsonParseFailed {
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// 面向用户的错误信息：优先使用服务端提供的原因，否则返回通用提示
    pub fn user_message(&self) -> String {
        match self {
            ApiError::BadResponse {
                message: Some(m), ..
            }
            | ApiError::NotFound {
                message: Some(m), ..
            } => m.clone(),
            ApiError::Timeout { .. } => "Request timed out, please try again".to_string(),
            _ => "Something went wrong while contacting the service".to_string(),
        }
    }
}

/// 输入校验错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// 主关键词为空
    #[error("Please enter a main keyword")]
    EmptyMainKeyword,
    /// 辅助关键词数量不在 4-5 之间
    #[error("Please provide 4-5 keywords (got {count})")]
    KeywordCount { count: usize },
    /// 文件扩展名不是 .xlsx / .xls
    #[error("Please select a valid Excel file (.xlsx or .xls): {filename}")]
    InvalidFileExtension { filename: String },
    /// 文件不存在
    #[error("File not found: {path}")]
    FileNotFound { path: String },
    /// 选择的图片过多
    #[error("At most {max} images can be integrated (got {count})")]
    TooManyImages { count: usize, max: usize },
    /// 不支持的导出格式
    #[error("Invalid format '{format}'. Use 'html', 'txt', or 'json'")]
    UnsupportedFormat { format: String },
}

/// 本地会话存储错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 写入会话文件失败
    #[error("写入会话失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 删除会话文件失败
    #[error("删除会话失败 ({path}): {source}")]
    DeleteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 序列化会话失败
    #[error("序列化会话失败: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },
}

/// 工作流状态错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// 当前阶段不允许该操作
    #[error("当前处于第 {stage} 步，无法执行 {action}")]
    InvalidTransition { stage: u8, action: String },
    /// 已有进行中的会话，关键词表单被锁定
    #[error("已有进行中的会话 ({primary_id})，请先清除会话")]
    SessionLocked { primary_id: String },
    /// 没有进行中的会话
    #[error("没有进行中的会话")]
    NoActiveSession,
    /// 草稿步骤已全部完成
    #[error("博客草稿已全部生成")]
    DraftComplete,
    /// 批量条目尚未成功，不能预览或下载
    #[error("条目 {keyword} 尚未成功生成，不能预览或下载")]
    ItemNotReady { keyword: String },
    /// 用户取消确认
    #[error("用户取消了操作")]
    ConfirmationDeclined,
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// TOML 配置解析失败
    #[error("TOML配置解析失败: {message}")]
    TomlParseFailed { message: String },
}

// ========== 从常见错误类型转换 ==========

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.path().to_string())
            .unwrap_or_default();
        AppError::api_request_failed(endpoint, err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed { source: err })
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误（超时单独归类）
    pub fn api_request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        let endpoint = endpoint.into();
        if source.is_timeout() {
            AppError::Api(ApiError::Timeout { endpoint })
        } else {
            AppError::Api(ApiError::RequestFailed { endpoint, source })
        }
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 远程实体是否已不存在（用于恢复会话时的软重置判断）
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::Api(ApiError::NotFound { .. }))
    }

    /// 是否是校验错误（校验错误发生在任何远程请求之前）
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }

    /// 面向用户的简短提示
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api(e) => e.user_message(),
            AppError::Validation(e) => e.to_string(),
            AppError::Workflow(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
