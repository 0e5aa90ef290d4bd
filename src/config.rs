use crate::error::{PhotoOfficeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 出力先フォルダ（未設定ならデスクトップ）
    pub save_path: Option<PathBuf>,
    /// スライドのテンプレート
    pub deck_template: PathBuf,
    /// テンプレート内のレイアウト番号（slideLayoutN.xml の N）
    pub title_layout: usize,
    pub content_layout: usize,
    pub closing_layout: usize,
    /// 送信に使う sendmail 互換コマンド
    pub sendmail_command: Vec<String>,
    /// 確認用ビューア（閉じるまで待つコマンド）
    pub review_command: Vec<String>,
    /// 下書き .eml の保存先
    pub drafts_dir: Option<PathBuf>,
    /// From ヘッダ
    pub from: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            save_path: None,
            deck_template: PathBuf::from("template.pptx"),
            // テンプレートのレイアウト順（1: 表紙, 4: 本文, 5: 結び）
            title_layout: 1,
            content_layout: 4,
            closing_layout: 5,
            sendmail_command: vec!["sendmail".into(), "-t".into(), "-oi".into()],
            review_command: default_review_command(),
            drafts_dir: None,
            from: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| PhotoOfficeError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("photo-office").join("config.json"))
    }

    /// 既定の出力先を解決（設定 → デスクトップ → ホーム → カレント）
    pub fn save_path(&self) -> PathBuf {
        self.save_path
            .clone()
            .or_else(dirs::desktop_dir)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// 下書きの保存先（未設定なら一時フォルダ）
    pub fn drafts_dir(&self) -> PathBuf {
        self.drafts_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("photo-office-drafts"))
    }

    pub fn set_save_path(&mut self, path: PathBuf) -> Result<()> {
        self.save_path = Some(path);
        self.save()
    }

    pub fn set_deck_template(&mut self, path: PathBuf) -> Result<()> {
        self.deck_template = path;
        self.save()
    }
}

/// OSごとの「開いて閉じるまで待つ」コマンド
///
/// それ以外の OS には待てる汎用コマンドがない（xdg-open はすぐ戻る）ため空。
/// 空のままだと確認表示はエラーになる。
fn default_review_command() -> Vec<String> {
    if cfg!(target_os = "macos") {
        vec!["open".into(), "-W".into()]
    } else if cfg!(target_os = "windows") {
        vec!["cmd".into(), "/C".into(), "start".into(), "/WAIT".into(), "".into()]
    } else {
        Vec::new()
    }
}
