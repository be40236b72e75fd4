//! ログレコードと重要度の判定

use serde::{Deserialize, Serialize};

/// ログの重要度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Ok,
    Warn,
    Err,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Ok => "ok",
            LogLevel::Warn => "warn",
            LogLevel::Err => "err",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const ERR_KEYWORDS: &[&str] = &["error", "fail", "denied"];
const OK_KEYWORDS: &[&str] = &["ok", "success", "done"];

/// ツール出力の1行を重要度に分類する
///
/// エラー系キーワードが優先。どちらも無ければ info。
pub fn classify(line: &str) -> LogLevel {
    let low = line.to_lowercase();
    if ERR_KEYWORDS.iter().any(|k| low.contains(k)) {
        LogLevel::Err
    } else if OK_KEYWORDS.iter().any(|k| low.contains(k)) {
        LogLevel::Ok
    } else {
        LogLevel::Info
    }
}

/// 1行分のログ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub text: String,
    pub level: LogLevel,
}

impl LogRecord {
    pub fn new(text: impl Into<String>, level: LogLevel) -> Self {
        Self {
            text: text.into(),
            level,
        }
    }

    /// ツール出力行（本文から重要度を判定）
    pub fn from_tool(line: impl Into<String>) -> Self {
        let text = line.into();
        let level = classify(&text);
        Self { text, level }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, LogLevel::Info)
    }

    pub fn ok(text: impl Into<String>) -> Self {
        Self::new(text, LogLevel::Ok)
    }

    pub fn warn(text: impl Into<String>) -> Self {
        Self::new(text, LogLevel::Warn)
    }

    pub fn err(text: impl Into<String>) -> Self {
        Self::new(text, LogLevel::Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_ok() {
        assert_eq!(classify("Flash OK"), LogLevel::Ok);
        assert_eq!(classify("Write Success"), LogLevel::Ok);
        assert_eq!(classify("done."), LogLevel::Ok);
    }

    #[test]
    fn test_classify_err() {
        assert_eq!(classify("ERROR: denied"), LogLevel::Err);
        assert_eq!(classify("Handshake failed"), LogLevel::Err);
        assert_eq!(classify("Access Denied"), LogLevel::Err);
    }

    #[test]
    fn test_classify_err_wins_over_ok() {
        assert_eq!(classify("done with errors"), LogLevel::Err);
    }

    #[test]
    fn test_classify_info() {
        assert_eq!(classify("Preloader - Status: Waiting for PreLoader VCOM"), LogLevel::Info);
        assert_eq!(classify(""), LogLevel::Info);
    }

    #[test]
    fn test_from_tool() {
        let record = LogRecord::from_tool("Progress: 100% Done");
        assert_eq!(record.level, LogLevel::Ok);
        assert_eq!(record.text, "Progress: 100% Done");
    }
}
