//! セッション: 設定・ファームウェア解決結果・デバイス状態を持ち、操作を振り分ける
//!
//! ファームウェアのマッピングは解決のたびに丸ごと差し替える。ワーカーには
//! そのスナップショットから作ったジョブだけを渡し、実行中の更新の影響を受けない。

use crate::action::{Action, RestoreOptions};
use crate::config::Config;
use crate::device::{DeviceProbe, DeviceStatus, SystemProbe};
use crate::drivers;
use crate::error::{PhoenixError, Result};
use crate::paths::AppPaths;
use crate::tool::MtkTool;
use crate::worker::{spawn_job, BusyFlag, Job, JobHandle};
use chrono::Local;
use phoenix_common::{
    build_sequence, is_ready, resolve, FirmwareMapping, FlashOperation, LogRecord, NameTable,
    PartitionKey, RestoreError, RestoreMachine, RestoreState, SearchRoots, SequenceOptions,
    ToolVocabulary,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const WIPE_QUESTION: &str = "This will ERASE userdata. Continue?";

/// 破壊的操作の確認
pub trait Prompt {
    fn confirm(&mut self, question: &str) -> bool;
}

/// コマンドラインで与える上書き設定（保存しない）
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub firmware_dir: Option<PathBuf>,
    pub tool: Option<PathBuf>,
    pub name_table: NameTable,
    pub vocabulary: ToolVocabulary,
}

/// 操作の結果
#[derive(Debug)]
pub enum Outcome {
    /// その場で完了した操作のメッセージ
    Message(LogRecord),
    /// ワーカーで実行するジョブ
    Job(Job),
}

pub struct Session {
    paths: AppPaths,
    options: SessionOptions,
    config: Config,
    roots: SearchRoots,
    mapping: Arc<FirmwareMapping>,
    device: DeviceStatus,
    probe: Box<dyn DeviceProbe>,
    busy: BusyFlag,
}

impl Session {
    pub fn open(paths: AppPaths, options: SessionOptions) -> Self {
        Self::with_probe(paths, options, Box::new(SystemProbe))
    }

    pub fn with_probe(paths: AppPaths, options: SessionOptions, probe: Box<dyn DeviceProbe>) -> Self {
        let config = Config::load_or_default(&paths.config_path());
        let mut session = Self {
            paths,
            options,
            config,
            roots: SearchRoots::default(),
            mapping: Arc::new(FirmwareMapping::default()),
            device: DeviceStatus {
                connected: false,
                detail: "Unknown".into(),
            },
            probe,
            busy: BusyFlag::default(),
        };
        session.resolve_firmware();
        session.refresh_device();
        session
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn roots(&self) -> &SearchRoots {
        &self.roots
    }

    /// 現在のマッピングのスナップショット
    pub fn mapping(&self) -> Arc<FirmwareMapping> {
        Arc::clone(&self.mapping)
    }

    pub fn device(&self) -> &DeviceStatus {
        &self.device
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn is_ready(&self, skip_optional: bool) -> bool {
        is_ready(&self.mapping, skip_optional)
    }

    pub fn tool(&self) -> MtkTool {
        let configured = self.options.tool.clone().or_else(|| self.config.mtk_path());
        MtkTool::locate(configured.as_deref(), self.options.vocabulary.clone())
    }

    /// 設定を読み直してからファームウェアを解決し直す
    pub fn refresh_firmware(&mut self) {
        self.config = Config::load_or_default(&self.paths.config_path());
        self.resolve_firmware();
    }

    pub fn refresh_device(&mut self) {
        let tool_available = self.tool().is_available();
        self.device = self.probe.probe(tool_available);
        log::debug!("{}", self.device.summary());
    }

    fn resolve_firmware(&mut self) {
        let user_dir = self
            .options
            .firmware_dir
            .clone()
            .or_else(|| self.config.firmware_dir());
        self.roots = SearchRoots::build(user_dir.as_deref(), self.paths.app_dir());
        for root in self.roots.as_slice() {
            log::debug!("search root: {}", root.display());
        }
        let mapping = resolve(self.roots.as_slice(), &self.options.name_table);
        for (key, image) in mapping.iter() {
            log::debug!("{} -> {} ({:?})", key, image.path.display(), image.strength);
        }
        self.mapping = Arc::new(mapping);
    }

    /// 操作を処理する
    pub fn handle(&mut self, action: Action, prompt: &mut dyn Prompt) -> Result<Outcome> {
        log::debug!("action: {}", action.id());

        match action {
            Action::Refresh => {
                self.refresh_firmware();
                self.refresh_device();
                Ok(Outcome::Message(LogRecord::ok("Refreshed firmware + device status.")))
            }
            Action::ChooseFirmwareDir(dir) => self.choose_firmware_dir(dir.as_deref()).map(Outcome::Message),
            Action::ChooseTool(path) => self.choose_tool(path.as_deref()).map(Outcome::Message),
            Action::Flash(key) => {
                self.ensure_device()?;
                let image = self.mapping.get(key).ok_or(PhoenixError::MissingImage(key))?;
                Ok(Outcome::Job(Job::Flash(FlashOperation::for_key(key, image))))
            }
            Action::Restore(options) => self.prepare_restore(options, prompt).map(Outcome::Job),
            Action::Reset => {
                self.ensure_device()?;
                Ok(Outcome::Job(Job::Reset))
            }
            Action::RebootBootloader => {
                self.ensure_device()?;
                Ok(Outcome::Job(Job::RebootBootloader))
            }
            Action::WipeUserdata => {
                self.ensure_device()?;
                if !prompt.confirm(WIPE_QUESTION) {
                    return Err(PhoenixError::Declined);
                }
                Ok(Outcome::Job(Job::WipeUserdata))
            }
            Action::OpenZadig => Ok(Outcome::Message(launch_record(drivers::open_zadig(
                self.paths.app_dir(),
            )))),
            Action::OpenDeviceManager => Ok(Outcome::Message(launch_record(drivers::open_device_manager()))),
        }
    }

    /// ジョブをワーカーで開始する（同時に1つまで）
    pub fn dispatch(&self, job: Job) -> Result<JobHandle> {
        let guard = self.busy.try_acquire().ok_or(PhoenixError::Busy)?;
        let log_path = self.paths.log_path(Local::now());
        Ok(spawn_job(job, self.tool(), log_path, guard))
    }

    pub fn choose_firmware_dir(&mut self, dir: Option<&Path>) -> Result<LogRecord> {
        let chosen = match dir {
            Some(d) if !d.is_dir() => {
                return Err(PhoenixError::FolderNotFound(d.display().to_string()));
            }
            Some(d) => Some(d.canonicalize().unwrap_or_else(|_| d.to_path_buf())),
            None => None,
        };

        // 明示的な選択はコマンドラインの一時指定より優先
        if let Some(dir) = self.options.firmware_dir.take() {
            log::debug!("dropping --firmware-dir {} in favour of the saved folder", dir.display());
        }
        self.config.set_firmware_dir(chosen.as_deref());
        self.save_config();
        self.resolve_firmware();

        let found = PartitionKey::ALL.len() - self.mapping.missing().len();
        Ok(match chosen {
            Some(d) => LogRecord::info(format!(
                "Firmware folder set to {} ({}/{} images found)",
                d.display(),
                found,
                PartitionKey::ALL.len()
            )),
            None => LogRecord::info(format!(
                "Firmware folder cleared; using {}",
                self.paths.firmware_dir().display()
            )),
        })
    }

    pub fn choose_tool(&mut self, path: Option<&Path>) -> Result<LogRecord> {
        if let Some(p) = path {
            if !p.is_file() {
                return Err(PhoenixError::ToolNotFound(p.display().to_string()));
            }
        }

        if let Some(tool) = self.options.tool.take() {
            log::debug!("dropping --tool {} in favour of the saved path", tool.display());
        }
        self.config.set_mtk_path(path);
        self.save_config();
        self.refresh_device();

        let tool = self.tool();
        Ok(match tool.command() {
            Some(command) => LogRecord::info(format!("Using mtk: {}", command.describe())),
            None => LogRecord::warn("mtk tool not found; flashing will fail until it is installed."),
        })
    }

    /// 保存に失敗しても操作は続行する
    fn save_config(&self) {
        if let Err(e) = self.config.save(&self.paths.config_path()) {
            log::warn!("could not save config: {}", e);
        }
    }

    fn ensure_device(&mut self) -> Result<()> {
        if self.busy.is_busy() {
            return Err(PhoenixError::Busy);
        }
        self.refresh_device();
        if self.device.connected {
            Ok(())
        } else {
            Err(PhoenixError::NoDevice(self.device.detail.clone()))
        }
    }

    fn prepare_restore(&mut self, options: RestoreOptions, prompt: &mut dyn Prompt) -> Result<Job> {
        if self.busy.is_busy() {
            return Err(PhoenixError::Busy);
        }

        let mapping = self.mapping();
        let sequence = build_sequence(
            &mapping,
            SequenceOptions {
                skip_optional: options.skip_optional,
                wipe: options.wipe,
            },
        );
        let ready = is_ready(&mapping, options.skip_optional);
        if ready {
            self.refresh_device();
        }

        let mut machine = RestoreMachine::new(sequence.len());
        match machine.begin(ready, self.device.connected, options.wipe) {
            Err(RestoreError::NotReady) => {
                let missing = mapping
                    .missing()
                    .into_iter()
                    .filter(|key| !(options.skip_optional && *key == PartitionKey::Vendor))
                    .collect();
                return Err(PhoenixError::NotReady(missing));
            }
            Err(RestoreError::NoDevice) => {
                return Err(PhoenixError::NoDevice(self.device.detail.clone()));
            }
            Err(e) => return Err(e.into()),
            Ok(RestoreState::Confirming { .. }) => {
                let accepted = prompt.confirm(WIPE_QUESTION);
                if machine.confirm(accepted)? == RestoreState::Aborted {
                    return Err(PhoenixError::Declined);
                }
            }
            Ok(_) => {}
        }

        Ok(Job::Restore {
            sequence,
            policy: options.policy,
            machine,
        })
    }
}

fn launch_record(result: Result<String>) -> LogRecord {
    match result {
        Ok(message) => LogRecord::info(message),
        Err(e) => LogRecord::err(e.to_string()),
    }
}
