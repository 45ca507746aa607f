// ==========================================
// 血库记录系统 - 日志
// ==========================================
// tracing-subscriber: EnvFilter 过滤 + 文本/JSON 两种输出
// 控制台菜单占用 stdout,日志统一写 stderr
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=debug 或 RUST_LOG=blood_bank=trace
/// - BLOOD_BANK_LOG_FORMAT=json: 输出 JSON 格式日志
///
/// # 示例
/// ```no_run
/// use blood_bank::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("BLOOD_BANK_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("日志系统初始化失败: {}", e);
    }
}

/// 测试用: debug 级别,输出交给测试框架捕获
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
