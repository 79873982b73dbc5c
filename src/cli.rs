use clap::{Parser, Subcommand};
use seglabel_common::PathMapping;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "seglabel")]
#[command(about = "2つのセグメンテーション手法を freeview で並べて比較・ラベリングするツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// ワークリストの被験者を順に表示して回答を記録
    Label {
        /// 1つ目のメソッド名（ワークリストの列名）
        #[arg(long = "method1", visible_alias = "m1")]
        method1: String,

        /// 2つ目のメソッド名（ワークリストの列名）
        #[arg(long = "method2", visible_alias = "m2")]
        method2: String,

        /// 結果CSV（追記。既存の被験者は飛ばす）
        #[arg(short, long)]
        output: PathBuf,

        /// ラベラー名（デフォルト: $USER / $USERNAME）
        #[arg(long)]
        user: Option<String>,

        /// ワークリストCSV
        #[arg(short, long)]
        input: PathBuf,

        /// 差分マップのディレクトリ（<subject_id>.nii.gz）
        #[arg(long)]
        diff_maps_dir: PathBuf,

        /// FreeSurfer のインストールルート
        #[arg(long = "fs", visible_alias = "viewer-home")]
        viewer_home: Option<PathBuf>,

        /// マスクとコピーを置くディレクトリ
        #[arg(long)]
        scratch_dir: Option<PathBuf>,

        /// パスの前方置換 FROM=TO（複数指定可）
        #[arg(long = "path-map")]
        path_map: Vec<PathMapping>,

        /// xdotool によるウィンドウ操作を行わない
        #[arg(long)]
        no_window_automation: bool,

        /// 最初のビューア起動後の待ち時間（秒）
        #[arg(long)]
        warmup_secs: Option<u64>,
    },

    /// 結果CSVを集計して表示
    Status {
        /// 結果CSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// スクラッチディレクトリの一覧・掃除
    Scratch {
        /// 対象ディレクトリ（デフォルト: 設定ファイルの scratch_dir）
        #[arg(long)]
        dir: Option<PathBuf>,

        /// マスクとセグメンテーションのコピーを削除
        #[arg(long)]
        clean: bool,
    },

    /// 設定ファイルの表示・編集
    Config {
        /// 現在の設定を表示
        #[arg(long)]
        show: bool,

        /// FreeSurfer のインストールルートを保存
        #[arg(long)]
        set_viewer_home: Option<PathBuf>,

        /// パスの前方置換を追加 FROM=TO
        #[arg(long)]
        add_path_map: Vec<PathMapping>,

        /// パスの前方置換をすべて削除
        #[arg(long)]
        clear_path_map: bool,
    },
}
