//! 日志系统初始化
//!
//! 基于 `tracing` 和 `tracing-subscriber`，引擎的每个组件对应一个 target，
//! 可以分别调整级别。
//!
//! # 使用示例
//! ```ignore
//! use kiln_config::LogConfig;
//! use kiln_core::logger::{init_logger, LogFormat};
//!
//! init_logger(&LogConfig::default(), LogFormat::Compact);
//! ```

use std::io;

use kiln_config::{Component, LogConfig};
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

/// 日志输出格式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// 彩色多行格式（开发使用）
    #[default]
    Pretty,
    /// 紧凑格式，每个事件一行
    Compact,
    /// JSON 格式（工具集成）
    Json,
}

/// 把每个组件 target 映射到其配置级别的过滤器
pub fn targets(config: &LogConfig) -> Targets {
    Component::ALL
        .iter()
        .fold(Targets::new().with_default(config.global), |targets, component| {
            targets.with_target(component.target(), config.level_for(*component))
        })
}

/// 安装全局 subscriber
///
/// 已经安装过时返回 `false`，多个测试各自初始化日志时就是这种情况。
pub fn init_logger(config: &LogConfig, format: LogFormat) -> bool {
    let layer = format_layer(format).with_filter(targets(config));
    tracing_subscriber::registry().with(layer).try_init().is_ok()
}

fn format_layer(format: LogFormat) -> Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync> {
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_names(true)
            .with_writer(io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .without_time()
            .with_writer(io::stderr)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_writer(io::stderr)
            .boxed(),
    }
}

/// 测试用的简单日志，输出交给测试框架捕获
pub fn init_test_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// 某个组件的 debug 事件是否启用
#[inline]
pub fn is_enabled(component: Component) -> bool {
    match component {
        Component::Cell => tracing::enabled!(target: "kiln::cell", tracing::Level::DEBUG),
        Component::Scheduler => tracing::enabled!(target: "kiln::scheduler", tracing::Level::DEBUG),
        Component::Phase => tracing::enabled!(target: "kiln::phase", tracing::Level::DEBUG),
        Component::Pool => tracing::enabled!(target: "kiln::pool", tracing::Level::DEBUG),
        Component::Equations => tracing::enabled!(target: "kiln::equations", tracing::Level::DEBUG),
    }
}

/// 在组件 target 上打开一个 debug span
///
/// ```ignore
/// let _guard = component_span!("kiln::equations", "diagnose", nodes = tree.len()).entered();
/// ```
#[macro_export]
macro_rules! component_span {
    ($target:literal, $name:literal) => {
        tracing::debug_span!(target: $target, $name)
    };
    ($target:literal, $name:literal, $($field:tt)*) => {
        tracing::debug_span!(target: $target, $name, $($field)*)
    };
}
