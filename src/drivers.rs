//! ドライバ関連ユーティリティの起動（デバイスマネージャー / Zadig）

use crate::error::{PhoenixError, Result};
use crate::tool::find_in_path;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const ZADIG_URL: &str = "https://zadig.akeo.ie/";

/// デバイスマネージャーを開く（Windows のみ）
pub fn open_device_manager() -> Result<String> {
    if !cfg!(windows) {
        return Err(PhoenixError::Launch(
            "Device Manager (only available on Windows)".into(),
        ));
    }
    spawn_detached("mmc", &["devmgmt.msc"])?;
    Ok("Opened Device Manager".into())
}

/// Zadig を開く。見つからなければダウンロードページを開く
pub fn open_zadig(app_dir: &Path) -> Result<String> {
    if let Some(exe) = find_zadig(app_dir) {
        let program = exe.display().to_string();
        spawn_detached(&program, &[])?;
        return Ok(format!("Opened {}", program));
    }

    open_url(ZADIG_URL)?;
    Ok("Opened Zadig download page".into())
}

pub fn find_zadig(app_dir: &Path) -> Option<PathBuf> {
    find_in_path("zadig.exe")
        .or_else(|| find_in_path("zadig"))
        .or_else(|| {
            let local = app_dir.join("zadig.exe");
            local.is_file().then_some(local)
        })
}

fn open_url(url: &str) -> Result<()> {
    #[cfg(windows)]
    let (program, args): (&str, Vec<&str>) = ("cmd", vec!["/c", "start", "", url]);
    #[cfg(target_os = "macos")]
    let (program, args): (&str, Vec<&str>) = ("open", vec![url]);
    #[cfg(not(any(windows, target_os = "macos")))]
    let (program, args): (&str, Vec<&str>) = ("xdg-open", vec![url]);

    spawn_detached(program, &args)
}

fn spawn_detached(program: &str, args: &[&str]) -> Result<()> {
    Command::new(program)
        .args(args)
        .spawn()
        .map(|_| ())
        .map_err(|e| PhoenixError::Launch(format!("{}: {}", program, e)))
}
