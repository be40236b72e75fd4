//! デバイス検出のキーワード判定
//!
//! OS のデバイス一覧テキストにチップセット・モード名が含まれるかを見るだけの簡易判定。

/// 検出キーワード（小文字）
///
/// `0e8d` は MediaTek の USB ベンダー ID（lsusb の出力向け）。
pub const DEVICE_KEYWORDS: &[&str] = &[
    "mediatek",
    "mtk",
    "android",
    "preloader",
    "bootrom",
    "fastboot",
    "0e8d",
];

/// デバイス一覧テキストから最初に一致したキーワードを返す
pub fn match_device_text(text: &str) -> Option<&'static str> {
    let low = text.to_lowercase();
    DEVICE_KEYWORDS.iter().copied().find(|k| low.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_pnp_listing() {
        let listing = "Name\r\nUSB Root Hub\r\nMediaTek USB Port (COM5)\r\n";
        assert_eq!(match_device_text(listing), Some("mediatek"));
    }

    #[test]
    fn test_match_lsusb_vendor_id() {
        let listing = "Bus 001 Device 007: ID 0E8D:2000 \n";
        assert_eq!(match_device_text(listing), Some("0e8d"));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(match_device_text("Bus 001 Device 001: ID 1d6b:0002 Linux Foundation 2.0 root hub"), None);
        assert_eq!(match_device_text(""), None);
    }
}
