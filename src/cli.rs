use clap::{Args, Parser, Subcommand, ValueEnum};
use phoenix_common::{PartitionKey, ToolVocabulary};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "phoenix")]
#[command(about = "🔥 PhoenixR1 - Rabbit R1 resurrection tool (mtkclient front-end)", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力（-v: debug, -vv: trace）
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// ファームウェアフォルダ（保存済み設定より優先、保存はしない）
    #[arg(long, global = true)]
    pub firmware_dir: Option<PathBuf>,

    /// mtk 実行ファイル（保存済み設定より優先、保存はしない）
    #[arg(long, global = true)]
    pub tool: Option<PathBuf>,

    /// ファイル名テーブルJSON（既定のファイル名を置き換える）
    #[arg(long, global = true)]
    pub name_table: Option<PathBuf>,

    #[command(flatten)]
    pub verbs: VerbArgs,
}

/// mtk の動詞（ツールのバージョン差を吸収）。未指定は既定の語彙のまま
#[derive(Args, Debug, Clone, Default)]
pub struct VerbArgs {
    /// パーティション書き込みの動詞（既定: w）
    #[arg(long, global = true)]
    pub write_verb: Option<String>,

    /// パーティション消去の動詞（既定: e）
    #[arg(long, global = true)]
    pub erase_verb: Option<String>,

    /// リセットの動詞（既定: reset）
    #[arg(long, global = true)]
    pub reset_verb: Option<String>,

    /// ブートローダー再起動の動詞、空白区切りで複数語可（既定: reset）
    #[arg(long, global = true)]
    pub reboot_verb: Option<String>,
}

impl From<VerbArgs> for ToolVocabulary {
    fn from(args: VerbArgs) -> Self {
        let defaults = ToolVocabulary::default();
        ToolVocabulary {
            write: args.write_verb.unwrap_or(defaults.write),
            erase: args.erase_verb.unwrap_or(defaults.erase),
            reset: args.reset_verb.unwrap_or(defaults.reset),
            reboot_bootloader: args.reboot_verb.unwrap_or(defaults.reboot_bootloader),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// ファームウェアとデバイスの状態を表示（再検索）
    Status {
        /// vendor をスキップする前提で判定
        #[arg(long)]
        skip_vendor: bool,
    },

    /// 1パーティションだけ書き込む
    Flash {
        /// boot / vbmeta / super / system / vendor
        #[arg(required = true)]
        partition: PartitionKey,
    },

    /// 一括復旧（vbmeta → boot → super/system → vendor）
    Restore {
        /// 最後に userdata を消去
        #[arg(long)]
        wipe: bool,

        /// vendor を書き込まない
        #[arg(long)]
        skip_vendor: bool,

        /// 失敗したステップで中断する（既定は続行）
        #[arg(long)]
        abort_on_failure: bool,

        /// 確認を省略
        #[arg(short, long)]
        yes: bool,
    },

    /// デバイスをリセット
    Reset,

    /// ブートローダーへ再起動
    RebootBootloader,

    /// userdata を消去（危険）
    Wipe {
        /// 確認を省略
        #[arg(short, long)]
        yes: bool,
    },

    /// 設定を表示/編集
    Config {
        /// mtk 実行ファイルのパスを保存
        #[arg(long)]
        set_tool: Option<PathBuf>,

        /// ファームウェアフォルダを保存
        #[arg(long)]
        set_firmware_dir: Option<PathBuf>,

        /// 保存済みの mtk パスを削除
        #[arg(long)]
        clear_tool: bool,

        /// 保存済みのファームウェアフォルダを削除
        #[arg(long)]
        clear_firmware_dir: bool,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// ドライバ関連ツールを開く
    Drivers {
        #[arg(value_enum)]
        target: DriverTool,
    },

    /// 対話メニュー
    Shell,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DriverTool {
    Zadig,
    DeviceManager,
}
