//! # ログ初期化

use tracing_subscriber::EnvFilter;

/// tracingのサブスクライバを初期化する。
///
/// フィルタは`RUST_LOG`（未設定時は`info`）。`LOG_FORMAT=json`でJSON形式の1行ログを出力する。
/// CloudWatch Logsに流すためANSIカラーは無効にする。
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_target(false);

    if json {
        builder.json().with_current_span(true).init();
    } else {
        builder.init();
    }
}
