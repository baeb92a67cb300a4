// tests/logging_level.rs

use tracing::Level;

use stageline::cli::LogLevel;
use stageline::logging::resolve_level;

#[test]
fn flag_beats_env_beats_default() {
    assert_eq!(resolve_level(Some(LogLevel::Trace), Some("error")), Level::TRACE);
    assert_eq!(resolve_level(None, Some(" Debug ")), Level::DEBUG);
    assert_eq!(resolve_level(None, Some("warning")), Level::WARN);
    assert_eq!(resolve_level(None, Some("chatty")), Level::INFO);
    assert_eq!(resolve_level(None, None), Level::INFO);
}
