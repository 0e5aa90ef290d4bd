//! ジョブファイル（JSON）
//!
//! 1ファイルで スライド / 文書 / メール のいずれか1件を指定する。
//! `images` は文字列（フォルダ）か配列（ファイル名リスト）。

use crate::builder;
use crate::collector;
use crate::config::Config;
use crate::error::Result;
use crate::message::{self, Delivery};
use crate::sink::{open_artifact_sink, ArtifactSink, MessageSink};
use photo_office_common::{
    attachments_from_json, ArtifactSpec, Error, ImageSource, MessageSpec, SurfaceKind,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Deck,
    Document,
    Email,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub kind: JobKind,
    #[serde(default)]
    pub images: Value,
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub sizes: Vec<u8>,
    #[serde(default)]
    pub save_path: Option<PathBuf>,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub attachments: Value,
    #[serde(default = "default_true")]
    pub send: bool,
    #[serde(default = "default_true")]
    pub images_on_body: bool,
}

fn default_title() -> String {
    ArtifactSpec::DEFAULT_TITLE.to_string()
}

fn default_true() -> bool {
    true
}

/// ジョブの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Saved(PathBuf),
    Delivered(Delivery),
}

impl Job {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn surface_kind(&self) -> Option<SurfaceKind> {
        match self.kind {
            JobKind::Deck => Some(SurfaceKind::Deck),
            JobKind::Document => Some(SurfaceKind::Document),
            JobKind::Email => None,
        }
    }

    /// スライド・文書の指定
    pub fn artifact_spec(&self, config: &Config) -> Option<ArtifactSpec> {
        let kind = self.surface_kind()?;
        let save_path = self.save_path.clone().unwrap_or_else(|| config.save_path());
        Some(ArtifactSpec::new(self.title.clone(), save_path, kind))
    }

    /// メールの指定（画像が偽値なら画像なし）
    pub fn message_spec(&self) -> Result<MessageSpec> {
        let images = if is_falsy(&self.images) {
            None
        } else {
            Some(ImageSource::from_json(&self.images)?)
        };

        Ok(MessageSpec {
            to: self.to.clone(),
            subject: self.subject.clone(),
            body: self.body.clone(),
            images,
            images_on_body: self.images_on_body,
            attachments: attachments_from_json(&self.attachments)?,
            send: self.send,
        })
    }
}

/// 実ファイル用シンクでジョブを実行
pub fn run(job: &Job, config: &Config, mailer: &mut dyn MessageSink) -> Result<JobOutcome> {
    match job.artifact_spec(config) {
        Some(spec) => {
            let mut sink = open_artifact_sink(spec.kind, config)?;
            run_artifact(job, &spec, sink.as_mut())
        }
        None => run_email(job, mailer),
    }
}

/// スライド・文書ジョブを任意のシンクで実行
pub fn run_artifact(
    job: &Job,
    spec: &ArtifactSpec,
    sink: &mut dyn ArtifactSink,
) -> Result<JobOutcome> {
    if is_falsy(&job.images) && !job.images.is_array() {
        return Err(Error::InvalidArgument(
            "images should be a list of image file names or the images folder path".into(),
        )
        .into());
    }
    let source = ImageSource::from_json(&job.images)?;
    let images = collector::collect(&source, &job.path)?;
    let size_codes = builder::size_codes_from(&job.sizes);
    let path = builder::build(&images, spec, &size_codes, sink)?;
    Ok(JobOutcome::Saved(path))
}

pub fn run_email(job: &Job, mailer: &mut dyn MessageSink) -> Result<JobOutcome> {
    let spec = job.message_spec()?;
    let delivery = message::compose(&spec, &job.path, mailer)?;
    Ok(JobOutcome::Delivered(delivery))
}

/// null / false / "" / [] を「指定なし」とみなす
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
