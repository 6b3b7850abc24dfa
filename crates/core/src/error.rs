/// 作者书写错误
///
/// 解析失败 / 静态解析失败属于"放弃该调用点"的可恢复情况（返回 None），
/// 这里的错误则是配置本身违反约定，必须立刻中止并指出出错的键。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// CSS 变量名必须以 `--` 开头
    InvalidVariableName { key: String, name: String },
    /// defaults 引用了未声明的变体组
    UnknownVariantGroup { group: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidVariableName { key, name } => write!(
                f,
                "Invalid CSS variable name '{}' for '{}': variable names must start with '--'",
                name, key
            ),
            ConfigError::UnknownVariantGroup { group } => write!(
                f,
                "defaults references unknown variant group '{}'",
                group
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
