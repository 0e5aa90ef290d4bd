//! メール組み立ての統合テスト

use photo_office_rust::message::{self, Delivery};
use photo_office_rust::sink::MemoryMailbox;
use photo_office_common::{ImageSource, MessageSpec};
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_folder_images_inline_in_order() {
    let dir = tempdir().expect("Failed to create temp dir");
    for name in ["b.jpg", "a.png", "readme.md", "c.gif"] {
        std::fs::write(dir.path().join(name), "x").unwrap();
    }

    let spec = MessageSpec {
        to: "me@example.com; other@example.org".into(),
        subject: "Photos".into(),
        body: "<p>See below</p>".into(),
        images: Some(ImageSource::Directory(dir.path().to_path_buf())),
        ..MessageSpec::default()
    };
    let mut mailbox = MemoryMailbox::default();
    let delivery = message::compose(&spec, "", &mut mailbox).unwrap();

    assert_eq!(delivery, Delivery::Dispatched);
    let sent = &mailbox.dispatched[0];
    assert_eq!(sent.html_body.matches(r#"width="900" height="500" /><br>"#).count(), 3);
    assert_eq!(sent.inline_content_ids(), vec!["Img0", "Img1", "Img2"]);

    let attached: Vec<PathBuf> = sent.attachments.iter().map(|a| a.path.clone()).collect();
    assert_eq!(
        attached,
        vec![dir.path().join("a.png"), dir.path().join("b.jpg"), dir.path().join("c.gif")]
    );
    assert!(sent.html_body.starts_with("<p>See below</p>"));
}

#[test]
fn test_review_without_images() {
    let spec = MessageSpec {
        images: None,
        attachments: Vec::new(),
        send: false,
        ..MessageSpec::default()
    };
    let mut mailbox = MemoryMailbox::default();
    let delivery = message::compose(&spec, "", &mut mailbox).unwrap();

    assert_eq!(delivery, Delivery::OpenedForReview);
    assert!(mailbox.dispatched.is_empty());
    assert!(mailbox.reviewed[0].attachments.is_empty());
}

#[test]
fn test_missing_folder_fails_before_sending() {
    let spec = MessageSpec {
        images: Some(ImageSource::Directory(PathBuf::from("/nonexistent/photos"))),
        ..MessageSpec::default()
    };
    let mut mailbox = MemoryMailbox::default();
    assert!(message::compose(&spec, "", &mut mailbox).is_err());
    assert!(mailbox.dispatched.is_empty());
}
