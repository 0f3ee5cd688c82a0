//! 错误类型定义

use thiserror::Error;

/// 被调用方（构造器、方法、字段访问器）返回的装箱错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError { source: BoxError },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

impl ConfigError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum InjectionError {
    #[error("没有组件满足注入点: {point}")]
    UnsatisfiedBean { point: String },

    #[error("存在多个匹配的组件: {description}, 候选: {candidates:?}")]
    AmbiguousBean {
        description: String,
        candidates: Vec<String>,
    },

    #[error("存在多个匹配的销毁方法: {variable}, 候选: {methods:?}")]
    AmbiguousDisposer {
        variable: String,
        methods: Vec<String>,
    },

    #[error("组件定义无效: {message}")]
    Definition { message: String },

    #[error("没有为作用域 @{scope} 注册作用域上下文")]
    UnknownScope { scope: String },

    #[error("调用失败: {element}, 原因: {source}")]
    InvocationFailed {
        element: String,
        #[source]
        source: BoxError,
    },

    #[error("检测到循环依赖: {chain}")]
    CircularDependency { chain: String },

    #[error("解析深度超过上限 {max_depth}: {bean}")]
    ResolutionDepthExceeded { bean: String, max_depth: usize },

    #[error("类型转换失败: 期望 {expected}")]
    TypeMismatch { expected: String },

    #[error("组件管理器已关闭")]
    ManagerClosed,

    #[error("组件校验失败, 共 {} 个错误: {}", .errors.len(), join_errors(.errors))]
    ValidationFailed { errors: Vec<InjectionError> },
}

impl InjectionError {
    /// 创建定义错误
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition {
            message: message.into(),
        }
    }

    /// 创建未满足依赖错误
    pub fn unsatisfied(point: impl std::fmt::Display) -> Self {
        Self::UnsatisfiedBean {
            point: point.to_string(),
        }
    }

    /// 创建调用失败错误
    pub fn invocation(element: impl std::fmt::Display, source: BoxError) -> Self {
        Self::InvocationFailed {
            element: element.to_string(),
            source,
        }
    }

    /// 创建类型转换错误
    pub fn type_mismatch(expected: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
        }
    }

    /// 校验聚合错误中的全部子错误；其它错误返回自身
    pub fn validation_errors(&self) -> &[InjectionError] {
        match self {
            Self::ValidationFailed { errors } => errors,
            other => std::slice::from_ref(other),
        }
    }
}

fn join_errors(errors: &[InjectionError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    InjectionError {
        #[from]
        source: InjectionError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type InjectionResult<T> = Result<T, InjectionError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
