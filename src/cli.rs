use clap::{Parser, Subcommand};
use photo_office_common::ImageSource;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "photo-office")]
#[command(about = "画像からスライド・文書・メールを組み立てるツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像からスライド（pptx）を作成
    Deck {
        /// 画像フォルダ、または画像ファイル（複数可）
        #[arg(required = true)]
        images: Vec<String>,

        /// ファイル名リストの基準フォルダ
        #[arg(short, long, default_value = "")]
        path: String,

        /// タイトル（ファイル名にも使用）
        #[arg(short, long, default_value = "Presentation")]
        title: String,

        /// 画像ごとのサイズコード（例: 1,2,5）
        #[arg(short, long, value_delimiter = ',')]
        sizes: Vec<u8>,

        /// 出力先フォルダ（省略時は設定値 / デスクトップ）
        #[arg(long)]
        save_path: Option<PathBuf>,

        /// テンプレート（省略時は設定値）
        #[arg(long)]
        template: Option<PathBuf>,

        /// 保存せずに配置だけ表示
        #[arg(long)]
        dry_run: bool,
    },

    /// 画像から文書（docx）を作成
    Doc {
        /// 画像フォルダ、または画像ファイル（複数可）
        #[arg(required = true)]
        images: Vec<String>,

        /// ファイル名リストの基準フォルダ
        #[arg(short, long, default_value = "")]
        path: String,

        /// タイトル（ファイル名に使用）
        #[arg(short, long, default_value = "Presentation")]
        title: String,

        /// 画像ごとのサイズコード（例: 1,3）
        #[arg(short, long, value_delimiter = ',')]
        sizes: Vec<u8>,

        /// 出力先フォルダ（省略時は設定値 / デスクトップ）
        #[arg(long)]
        save_path: Option<PathBuf>,

        /// 保存せずに配置だけ表示
        #[arg(long)]
        dry_run: bool,
    },

    /// 画像付きメールを送信（または確認用に開く）
    Mail {
        /// 画像フォルダ、または画像ファイル（省略可）
        images: Vec<String>,

        /// 宛先（複数は「;」区切り）
        #[arg(long, required = true)]
        to: String,

        /// 件名
        #[arg(long, default_value = "")]
        subject: String,

        /// HTML本文
        #[arg(long, default_value = "")]
        body: String,

        /// ファイル名リストの基準フォルダ
        #[arg(short, long, default_value = "")]
        path: String,

        /// 別添ファイル（複数指定可）
        #[arg(short, long = "attach")]
        attachments: Vec<PathBuf>,

        /// 送信せず確認用に開く（閉じるまで待機）
        #[arg(long)]
        no_send: bool,

        /// 画像を本文に表示しない（添付のみ）
        #[arg(long)]
        no_inline: bool,
    },

    /// ジョブファイル（JSON）を実行
    Job {
        /// ジョブファイル
        #[arg(required = true)]
        input: PathBuf,
    },

    /// 設定を表示/編集
    Config {
        /// 既定の出力先を設定
        #[arg(long)]
        set_save_path: Option<PathBuf>,

        /// スライドテンプレートを設定
        #[arg(long)]
        set_template: Option<PathBuf>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

/// 位置引数を画像指定に変換
///
/// 既存フォルダ1つならフォルダ指定、それ以外はファイルリスト。
pub fn image_source(args: &[String]) -> Option<ImageSource> {
    match args {
        [] => None,
        [single] if Path::new(single).is_dir() => {
            Some(ImageSource::Directory(PathBuf::from(single)))
        }
        items => Some(ImageSource::List(items.to_vec())),
    }
}
