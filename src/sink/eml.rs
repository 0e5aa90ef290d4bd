//! .eml（RFC 5322 / MIME）出力
//!
//! 送信は sendmail 互換コマンドの標準入力へ流し込む。
//! 確認表示は下書き .eml を保存し、ビューアが閉じられるまで待つ。

use super::ooxml::media_type;
use super::MessageSink;
use crate::config::Config;
use crate::error::{PhotoOfficeError, Result};
use crate::message::{Attachment, Message};
use photo_office_common::Error;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// base64 本文の折り返し幅
const LINE_WIDTH: usize = 76;

pub struct EmlSink {
    from: Option<String>,
    sendmail_command: Vec<String>,
    review_command: Vec<String>,
    drafts_dir: PathBuf,
}

impl EmlSink {
    pub fn from_config(config: &Config) -> Self {
        Self {
            from: config.from.clone(),
            sendmail_command: config.sendmail_command.clone(),
            review_command: config.review_command.clone(),
            drafts_dir: config.drafts_dir(),
        }
    }

    /// MIME 形式に変換
    pub fn render(&self, message: &Message) -> Result<Vec<u8>> {
        let date = chrono::Local::now().to_rfc2822();
        let token = message_token(&date, message);
        let mixed_boundary = format!("mixed-{}", &token[..24]);
        let related_boundary = format!("related-{}", &token[..24]);

        let recipients = message.recipients();
        for recipient in &recipients {
            check_header("To", recipient)?;
        }
        check_header("Subject", &message.subject)?;

        let mut out = String::new();
        if let Some(from) = &self.from {
            out.push_str(&format!("From: {}\r\n", check_header("From", from)?));
        }
        out.push_str(&format!("To: {}\r\n", recipients.join(", ")));
        out.push_str(&format!("Subject: {}\r\n", encode_header(&message.subject)));
        out.push_str(&format!("Date: {}\r\n", date));
        out.push_str(&format!("Message-ID: <{}@photo-office>\r\n", &token[..32]));
        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str(&format!(
            "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
            mixed_boundary
        ));

        // 本文 + インライン画像
        out.push_str(&format!("--{}\r\n", mixed_boundary));
        out.push_str(&format!(
            "Content-Type: multipart/related; boundary=\"{}\"\r\n\r\n",
            related_boundary
        ));
        out.push_str(&format!("--{}\r\n", related_boundary));
        out.push_str("Content-Type: text/html; charset=utf-8\r\n");
        out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        out.push_str(&wrap_base64(message.html_body.as_bytes()));

        for attachment in message.attachments.iter().filter(|a| a.inline) {
            out.push_str(&format!("--{}\r\n", related_boundary));
            out.push_str(&attachment_part(attachment, "inline")?);
        }
        out.push_str(&format!("--{}--\r\n", related_boundary));

        for attachment in message.attachments.iter().filter(|a| !a.inline) {
            out.push_str(&format!("--{}\r\n", mixed_boundary));
            out.push_str(&attachment_part(attachment, "attachment")?);
        }
        out.push_str(&format!("--{}--\r\n", mixed_boundary));

        Ok(out.into_bytes())
    }

    /// 下書きとして保存
    pub fn write_draft(&self, message: &Message) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.drafts_dir)?;
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let path = self.drafts_dir.join(format!("{}-{}.eml", stamp, draft_slug(&message.subject)));
        std::fs::write(&path, self.render(message)?)?;
        Ok(path)
    }
}

impl MessageSink for EmlSink {
    fn dispatch(&mut self, message: &Message) -> Result<()> {
        let (program, args) = self
            .sendmail_command
            .split_first()
            .ok_or_else(|| PhotoOfficeError::Config("sendmail_command が空です".into()))?;
        let data = self.render(message)?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PhotoOfficeError::MailDispatch(format!("{} 起動エラー: {}", program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // 先に終了したコマンドは終了コードで判定する
            if let Err(e) = stdin.write_all(&data) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PhotoOfficeError::MailDispatch(format!(
                "{} 失敗 ({}): {}",
                program,
                output.status,
                stderr.trim()
            )));
        }

        debug!(bytes = data.len(), "handed message to {}", program);
        Ok(())
    }

    fn open_for_review(&mut self, message: &Message) -> Result<()> {
        let (program, args) = self.review_command.split_first().ok_or_else(|| {
            PhotoOfficeError::Config(
                "review_command が未設定です（閉じるまで待つビューアを指定してください）".into(),
            )
        })?;
        let path = self.write_draft(message)?;

        info!(draft = %path.display(), "waiting for review window to close");
        let status = Command::new(program)
            .args(args)
            .arg(&path)
            .status()
            .map_err(|e| PhotoOfficeError::Review(format!("{} 起動エラー: {}", program, e)))?;

        if !status.success() {
            return Err(PhotoOfficeError::Review(format!("{} 終了コード: {}", program, status)));
        }
        Ok(())
    }
}

fn attachment_part(attachment: &Attachment, disposition: &str) -> Result<String> {
    let data = std::fs::read(&attachment.path)?;
    let file_name = attachment_file_name(&attachment.path);
    let (_, mime) = media_type(&attachment.path);

    let mut part = format!("Content-Type: {}; name=\"{}\"\r\n", mime, file_name);
    part.push_str("Content-Transfer-Encoding: base64\r\n");
    if let Some(cid) = &attachment.content_id {
        part.push_str(&format!("Content-ID: <{}>\r\n", cid));
    }
    part.push_str(&format!(
        "Content-Disposition: {}; filename=\"{}\"\r\n\r\n",
        disposition, file_name
    ));
    part.push_str(&wrap_base64(&data));
    Ok(part)
}

fn attachment_file_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "attachment".to_string());
    encode_header(&name.replace('"', "'").replace(['\r', '\n'], " "))
}

/// ヘッダ値に改行を含めない（sendmail -t が別ヘッダとして解釈するため）
fn check_header<'a>(name: &str, value: &'a str) -> Result<&'a str> {
    if value.contains(['\r', '\n']) {
        return Err(Error::InvalidArgument(format!("{} に改行は使えません: {:?}", name, value)).into());
    }
    Ok(value)
}

/// base64 を 76 文字で折り返し
fn wrap_base64(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / LINE_WIDTH * 2 + 2);
    for chunk in encoded.as_bytes().chunks(LINE_WIDTH) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push_str("\r\n");
    }
    out
}

/// 非ASCIIヘッダは RFC 2047 の B エンコード
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

/// Message-ID・境界文字列用のハッシュ（hex）
fn message_token(date: &str, message: &Message) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.as_bytes());
    hasher.update(message.subject.as_bytes());
    hasher.update(message.to.as_bytes());
    hasher.update(message.html_body.as_bytes());
    hex::encode(hasher.finalize())
}

fn draft_slug(subject: &str) -> String {
    let slug: String = subject
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .take(40)
        .collect();
    if slug.is_empty() {
        "draft".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(drafts_dir: &Path) -> EmlSink {
        EmlSink {
            from: Some("me@example.com".into()),
            sendmail_command: vec!["cat".into()],
            review_command: vec!["true".into()],
            drafts_dir: drafts_dir.to_path_buf(),
        }
    }

    #[test]
    fn test_render_structure() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.png");
        let report = dir.path().join("report.pdf");
        std::fs::write(&image, b"png-bytes").unwrap();
        std::fs::write(&report, b"pdf-bytes").unwrap();

        let mut message = Message::new("a@example.com; b@example.com", "件名");
        message.html_body = r#"<img src="cid:Img0" width="900" height="500" /><br>"#.into();
        message.attachments.push(Attachment {
            path: image,
            content_id: Some("Img0".into()),
            inline: true,
        });
        message.attachments.push(Attachment {
            path: report,
            content_id: None,
            inline: false,
        });

        let text = String::from_utf8(sink(dir.path()).render(&message).unwrap()).unwrap();
        assert!(text.starts_with("From: me@example.com\r\n"));
        assert!(text.contains("To: a@example.com, b@example.com\r\n"));
        assert!(text.contains(&format!("Subject: =?UTF-8?B?{}?=", STANDARD.encode("件名"))));
        assert!(text.contains("Content-ID: <Img0>\r\nContent-Disposition: inline; filename=\"a.png\""));
        assert!(text.contains("Content-Type: image/png; name=\"a.png\""));
        assert!(text.contains("Content-Disposition: attachment; filename=\"report.pdf\""));
        assert!(text.contains(&STANDARD.encode(b"png-bytes")));

        // インライン画像は related 内、別添は related の後
        let related_end = text.rfind("--\r\n--mixed-").unwrap();
        assert!(text.find("Content-ID: <Img0>").unwrap() < related_end);
        assert!(text.find("report.pdf").unwrap() > related_end);
    }

    #[test]
    fn test_non_inline_image_is_regular_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.png");
        std::fs::write(&image, b"png-bytes").unwrap();

        let mut message = Message::new("a@example.com", "s");
        message.html_body = "<p>see attached</p>".into();
        message.attachments.push(Attachment {
            path: image,
            content_id: Some("Img0".into()),
            inline: false,
        });

        let text = String::from_utf8(sink(dir.path()).render(&message).unwrap()).unwrap();
        let related_end = text.rfind("--\r\n--mixed-").unwrap();
        let cid = text.find("Content-ID: <Img0>\r\nContent-Disposition: attachment; filename=\"a.png\"").unwrap();
        assert!(cid > related_end, "本文に参照のない画像は related の外");
        assert_eq!(text.matches("Content-ID: <Img0>").count(), 1);
    }

    #[test]
    fn test_header_line_breaks_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut eml = sink(dir.path());

        let subject = Message::new("a@example.com", "Hi\r\nBcc: other@example.test");
        let err = eml.render(&subject).unwrap_err();
        assert!(matches!(err, PhotoOfficeError::Common(Error::InvalidArgument(_))));

        let to = Message::new("a@example.com\nBcc: other@example.test", "s");
        assert!(matches!(
            eml.render(&to),
            Err(PhotoOfficeError::Common(Error::InvalidArgument(_)))
        ));

        eml.from = Some("me@example.com\r\nBcc: other@example.test".into());
        assert!(matches!(
            eml.dispatch(&Message::new("a@example.com", "s")),
            Err(PhotoOfficeError::Common(Error::InvalidArgument(_)))
        ));
    }

    #[test]
    fn test_attachment_file_name_has_no_line_breaks() {
        assert_eq!(attachment_file_name(Path::new("/tmp/a\r\nb.pdf")), "a  b.pdf");
        assert_eq!(attachment_file_name(Path::new("/tmp/\"q\".pdf")), "'q'.pdf");
    }

    #[test]
    fn test_missing_attachment_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let mut message = Message::new("a@example.com", "s");
        message.attachments.push(Attachment {
            path: dir.path().join("missing.pdf"),
            content_id: None,
            inline: false,
        });
        let err = sink(dir.path()).render(&message).unwrap_err();
        assert!(matches!(err, PhotoOfficeError::Io(_)));
    }

    #[test]
    fn test_wrap_base64() {
        let wrapped = wrap_base64(&[0u8; 120]);
        let lines: Vec<&str> = wrapped.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(lines[0].len(), LINE_WIDTH);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_write_draft() {
        let dir = tempfile::tempdir().unwrap();
        let message = Message::new("a@example.com", "Site photos / day 2");
        let path = sink(dir.path()).write_draft(&message).unwrap();

        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with("-Site_photos___day_2.eml"), "{}", name);
    }

    #[test]
    fn test_empty_commands_are_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut eml = sink(dir.path());
        eml.sendmail_command.clear();
        let err = eml.dispatch(&Message::new("a@example.com", "s")).unwrap_err();
        assert!(matches!(err, PhotoOfficeError::Config(_)));

        let drafts = dir.path().join("drafts");
        eml.drafts_dir = drafts.clone();
        eml.review_command.clear();
        let err = eml.open_for_review(&Message::new("a@example.com", "s")).unwrap_err();
        assert!(matches!(err, PhotoOfficeError::Config(_)));
        assert!(!drafts.exists(), "未設定なら下書きも作らない");
    }

    #[cfg(unix)]
    #[test]
    fn test_dispatch_and_review_with_commands() {
        let dir = tempfile::tempdir().unwrap();
        let mut eml = sink(dir.path());
        let message = Message::new("a@example.com", "s");
        eml.dispatch(&message).unwrap();
        eml.open_for_review(&message).unwrap();

        eml.sendmail_command = vec!["false".into()];
        let err = eml.dispatch(&message).unwrap_err();
        assert!(matches!(err, PhotoOfficeError::MailDispatch(_)));
    }
}
