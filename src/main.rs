use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use photo_office_rust::{builder, cli, collector, config, job, message, sink};
use cli::{Cli, Commands};
use config::Config;
use photo_office_common::{ArtifactSpec, ImageSet, MessageSpec, SizeCode, SurfaceKind};
use sink::{ArtifactSink, EmlSink, MemorySink};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Deck { images, path, title, sizes, save_path, template, dry_run } => {
            println!("📽 photo-office - スライド作成\n");
            let mut config = config;
            if let Some(template) = template {
                config.deck_template = template;
            }
            let spec = ArtifactSpec::new(title, save_path.unwrap_or_else(|| config.save_path()), SurfaceKind::Deck);
            run_artifact(&images, &path, &spec, &sizes, &config, dry_run)?;
        }

        Commands::Doc { images, path, title, sizes, save_path, dry_run } => {
            println!("📄 photo-office - 文書作成\n");
            let spec = ArtifactSpec::new(title, save_path.unwrap_or_else(|| config.save_path()), SurfaceKind::Document);
            run_artifact(&images, &path, &spec, &sizes, &config, dry_run)?;
        }

        Commands::Mail { images, to, subject, body, path, attachments, no_send, no_inline } => {
            println!("✉ photo-office - メール作成\n");
            let spec = MessageSpec {
                to,
                subject,
                body,
                images: cli::image_source(&images),
                images_on_body: !no_inline,
                attachments,
                send: !no_send,
            };
            if !spec.send {
                println!("- 確認画面を閉じるまで待機します...");
            }
            let mut mailer = EmlSink::from_config(&config);
            match message::compose(&spec, &path, &mut mailer)? {
                message::Delivery::Dispatched => println!("✔ 送信しました"),
                message::Delivery::OpenedForReview => println!("✔ 確認画面を閉じました"),
            }
        }

        Commands::Job { input } => {
            println!("🗂 photo-office - ジョブ実行: {}\n", input.display());
            let job = job::Job::load(&input)?;
            let mut mailer = EmlSink::from_config(&config);
            match job::run(&job, &config, &mut mailer)? {
                job::JobOutcome::Saved(path) => println!("✔ 保存: {}", path.display()),
                job::JobOutcome::Delivered(delivery) => println!("✔ {:?}", delivery),
            }
        }

        Commands::Config { set_save_path, set_template, show } => {
            let mut config = config;

            if let Some(path) = set_save_path {
                config.set_save_path(path)?;
                println!("✔ 出力先を設定しました");
            }

            if let Some(path) = set_template {
                config.set_deck_template(path)?;
                println!("✔ テンプレートを設定しました");
            }

            if show {
                println!("設定:");
                println!("  出力先: {}", config.save_path().display());
                println!("  テンプレート: {}", config.deck_template.display());
                println!(
                    "  レイアウト: 表紙={} 本文={} 結び={}",
                    config.title_layout, config.content_layout, config.closing_layout
                );
                println!("  送信コマンド: {}", config.sendmail_command.join(" "));
                println!("  確認コマンド: {}", config.review_command.join(" "));
                println!("  下書き: {}", config.drafts_dir().display());
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_artifact(
    args: &[String],
    path: &str,
    spec: &ArtifactSpec,
    sizes: &[u8],
    config: &Config,
    dry_run: bool,
) -> anyhow::Result<()> {
    // 1. 画像収集
    println!("[1/2] 画像を収集中...");
    let source = cli::image_source(args)
        .ok_or_else(|| anyhow::anyhow!("画像が指定されていません"))?;
    let images = collector::collect(&source, path)?;
    println!("✔ {}枚の画像\n", images.len());

    let size_codes = builder::size_codes_from(sizes);

    // 2. 組み立て・保存
    if dry_run {
        println!("[2/2] 配置を計算中（保存しません）...");
        let mut sink = MemorySink::new(spec.kind);
        let output = builder::build(&images, spec, &size_codes, &mut sink)?;
        print_plan(&sink, &output);
        return Ok(());
    }

    println!("[2/2] {}を作成中...", spec.kind);
    let mut sink = sink::open_artifact_sink(spec.kind, config)?;
    let output = build_with_bar(&images, spec, &size_codes, sink.as_mut())?;
    println!("✔ 保存: {}", output.display());
    Ok(())
}

fn build_with_bar(
    images: &ImageSet,
    spec: &ArtifactSpec,
    size_codes: &[SizeCode],
    sink: &mut dyn ArtifactSink,
) -> anyhow::Result<PathBuf> {
    let bar = ProgressBar::new(images.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {wide_msg}") {
        bar.set_style(style);
    }
    Ok(builder::build_with_progress(images, spec, size_codes, sink, &bar)?)
}

fn print_plan(sink: &MemorySink, output: &std::path::Path) {
    for (index, surface) in sink.surfaces.iter().enumerate() {
        println!("  面{}: {:?}", index + 1, surface.role);
        for (image, placement) in &surface.pictures {
            println!(
                "    {} @ x={} y={} w={} h={} (EMU)",
                image, placement.x, placement.y, placement.width, placement.height
            );
        }
    }
    println!("✔ 保存先（予定）: {}", output.display());
}
