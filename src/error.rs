use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 方言规则错误
    #[error("方言错误: {0}")]
    Dialect(#[from] DialectError),
    /// 分类表错误
    #[error("分类表错误: {0}")]
    Taxonomy(#[from] TaxonomyError),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({path}): {source}")]
    JsonParseFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 清单中没有任何来源
    #[error("来源清单为空: {path}")]
    EmptyManifest { path: String },
    /// 来源名称重复
    #[error("来源名称重复: {name}")]
    DuplicateSource { name: String },
    /// 清单引用了未知方言
    #[error("来源 {source_name} 使用了未知方言: {dialect}")]
    UnknownDialect { source_name: String, dialect: String },
    /// 来源既没有 text 也没有 artifact，或两者都有
    #[error("来源 {source_name} 必须且只能指定 text 或 artifact 之一")]
    AmbiguousInput { source_name: String },
}

/// 方言规则错误
#[derive(Debug, Error)]
pub enum DialectError {
    /// 正则表达式无效
    #[error("方言 {dialect} 的规则 {rule} 无法编译: {source}")]
    InvalidPattern {
        dialect: String,
        rule: String,
        #[source]
        source: regex::Error,
    },
    /// 内置方言不存在
    #[error("未知方言: {name}")]
    Unknown { name: String },
    /// 方言字段取值非法
    #[error("方言 {dialect} 配置非法: {message}")]
    Invalid { dialect: String, message: String },
}

/// 分类表错误
#[derive(Debug, Error)]
pub enum TaxonomyError {
    /// 分类表为空
    #[error("分类表没有任何类别")]
    Empty,
    /// 类别名称为空
    #[error("第 {index} 个类别名称为空")]
    EmptyName { index: usize },
    /// 类别重复
    #[error("类别重复: {name}")]
    DuplicateCategory { name: String },
    /// 子类别重复
    #[error("类别 {category} 下子类别重复: {name}")]
    DuplicateSubcategory { category: String, name: String },
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::File(FileError::JsonParseFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        AppError::Dialect(DialectError::InvalidPattern {
            dialect: String::new(),
            rule: String::new(),
            source: err,
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误；文件不存在时单独区分
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return AppError::File(FileError::NotFound { path });
        }
        AppError::File(FileError::ReadFailed {
            path,
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

    /// 创建 JSON 解析错误（带路径）
    pub fn json_parse_failed(path: impl Into<String>, source: serde_json::Error) -> Self {
        AppError::File(FileError::JsonParseFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建正则编译错误
    pub fn invalid_pattern(
        dialect: impl Into<String>,
        rule: impl Into<String>,
        source: regex::Error,
    ) -> Self {
        AppError::Dialect(DialectError::InvalidPattern {
            dialect: dialect.into(),
            rule: rule.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
