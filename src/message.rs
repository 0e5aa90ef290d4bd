//! メール組み立てモジュール
//!
//! 画像を添付して `Img{N}` の Content-ID を振り、必要なら本文に
//! インライン表示タグを追加してから、送信または確認表示する。

use crate::collector;
use crate::error::Result;
use crate::sink::MessageSink;
use photo_office_common::{content_id, inline_image_tag, split_recipients, MessageSpec};
use std::path::PathBuf;
use tracing::{debug, info};

/// 添付ファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub path: PathBuf,
    /// 画像に振られた Content-ID（別添ファイルは None）
    pub content_id: Option<String>,
    /// 本文から参照されているか
    pub inline: bool,
}

/// 組み立て済みメール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// `;` 区切りの宛先
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn new(to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html_body: String::new(),
            attachments: Vec::new(),
        }
    }

    pub fn recipients(&self) -> Vec<String> {
        split_recipients(&self.to)
    }

    /// インライン参照されている Content-ID（添付順）
    pub fn inline_content_ids(&self) -> Vec<&str> {
        self.attachments
            .iter()
            .filter(|a| a.inline)
            .filter_map(|a| a.content_id.as_deref())
            .collect()
    }
}

/// メールの最終状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// 送信済み
    Dispatched,
    /// 確認画面で開いた（閉じられるまで待機済み）
    OpenedForReview,
}

/// 指定からメールを組み立てる（送信はしない）
pub fn build_message(spec: &MessageSpec, base_path: &str) -> Result<Message> {
    let mut message = Message::new(spec.to.clone(), spec.subject.clone());
    let mut body = spec.body.clone();

    if let Some(source) = &spec.images {
        let images = collector::collect(source, base_path)?;

        for (index, image) in images.iter().enumerate() {
            let cid = content_id(index);
            if spec.images_on_body {
                body.push_str(&inline_image_tag(&cid));
            }
            message.attachments.push(Attachment {
                path: image.path().to_path_buf(),
                content_id: Some(cid),
                inline: spec.images_on_body,
            });
        }
        debug!(images = images.len(), inline = spec.images_on_body, "attached images");
    }

    message.html_body = body;

    for path in &spec.attachments {
        message.attachments.push(Attachment {
            path: path.clone(),
            content_id: None,
            inline: false,
        });
    }

    Ok(message)
}

/// メールを組み立てて送信、または確認用に開く
pub fn compose<S: MessageSink + ?Sized>(
    spec: &MessageSpec,
    base_path: &str,
    sink: &mut S,
) -> Result<Delivery> {
    let message = build_message(spec, base_path)?;

    if spec.send {
        sink.dispatch(&message)?;
        info!(to = %message.to, attachments = message.attachments.len(), "message dispatched");
        Ok(Delivery::Dispatched)
    } else {
        sink.open_for_review(&message)?;
        info!(to = %message.to, "review window closed");
        Ok(Delivery::OpenedForReview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemoryMailbox;
    use photo_office_common::ImageSource;

    fn list(names: &[&str]) -> Option<ImageSource> {
        Some(ImageSource::List(names.iter().map(|n| n.to_string()).collect()))
    }

    #[test]
    fn test_inline_fragments_in_order() {
        let spec = MessageSpec {
            to: "a@example.com; b@example.com".into(),
            subject: "Photos".into(),
            body: "<p>Hello</p>".into(),
            images: list(&["x.png", "y.jpg", "z.gif"]),
            ..MessageSpec::default()
        };
        let message = build_message(&spec, "/shots").unwrap();

        assert_eq!(
            message.html_body,
            concat!(
                "<p>Hello</p>",
                r#"<img src="cid:Img0" width="900" height="500" /><br>"#,
                r#"<img src="cid:Img1" width="900" height="500" /><br>"#,
                r#"<img src="cid:Img2" width="900" height="500" /><br>"#,
            )
        );
        assert_eq!(message.inline_content_ids(), vec!["Img0", "Img1", "Img2"]);
        assert_eq!(message.attachments[1].path, PathBuf::from("/shots/y.jpg"));
        assert_eq!(message.recipients(), vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn test_images_without_inline_still_get_ids() {
        let spec = MessageSpec {
            body: "plain".into(),
            images: list(&["x.png"]),
            images_on_body: false,
            ..MessageSpec::default()
        };
        let message = build_message(&spec, "").unwrap();

        assert_eq!(message.html_body, "plain");
        assert_eq!(message.attachments[0].content_id.as_deref(), Some("Img0"));
        assert!(!message.attachments[0].inline);
        assert!(message.inline_content_ids().is_empty());
    }

    #[test]
    fn test_separate_attachments_after_images() {
        let spec = MessageSpec {
            images: list(&["x.png"]),
            attachments: vec![PathBuf::from("report.pdf"), PathBuf::from("data.xlsx")],
            ..MessageSpec::default()
        };
        let message = build_message(&spec, "").unwrap();

        let paths: Vec<_> = message.attachments.iter().map(|a| a.path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("x.png"), PathBuf::from("report.pdf"), PathBuf::from("data.xlsx")]
        );
        assert!(message.attachments[1].content_id.is_none());
    }

    #[test]
    fn test_send_dispatches() {
        let spec = MessageSpec {
            to: "a@example.com".into(),
            subject: "s".into(),
            ..MessageSpec::default()
        };
        let mut mailbox = MemoryMailbox::default();
        let delivery = compose(&spec, "", &mut mailbox).unwrap();

        assert_eq!(delivery, Delivery::Dispatched);
        assert_eq!(mailbox.dispatched.len(), 1);
        assert!(mailbox.reviewed.is_empty());
    }

    #[test]
    fn test_no_send_opens_for_review() {
        let spec = MessageSpec {
            images: None,
            attachments: Vec::new(),
            send: false,
            ..MessageSpec::default()
        };
        let mut mailbox = MemoryMailbox::default();
        let delivery = compose(&spec, "", &mut mailbox).unwrap();

        assert_eq!(delivery, Delivery::OpenedForReview);
        assert!(mailbox.dispatched.is_empty());
        assert_eq!(mailbox.reviewed.len(), 1);
        assert!(mailbox.reviewed[0].attachments.is_empty());
    }
}
