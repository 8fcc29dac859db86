//! # Upload Gateway CLI
//!
//! Gateway経由で署名付きURLを取得し、ファイルをストレージへ直接アップロードする。
//!
//! ```text
//! upload-cli put ./photo.jpg
//! upload-cli multipart ./video.mp4 --part-size 16777216
//! ```

mod client;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::client::{GatewayClient, DEFAULT_PART_SIZE};

#[derive(Parser)]
#[command(name = "upload-cli", about = "Upload Gateway client")]
struct Cli {
    /// GatewayのベースURL
    #[arg(long, env = "UPLOAD_GATEWAY_URL", default_value = "http://localhost:8080")]
    gateway: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 署名付きURL1本でアップロードする
    Put {
        file: PathBuf,
        /// ストレージ上のファイル名（省略時はローカルのファイル名）
        #[arg(long)]
        name: Option<String>,
    },
    /// マルチパートでアップロードする
    Multipart {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
        /// パートサイズ（バイト、5 MiB以上）
        #[arg(long, default_value_t = DEFAULT_PART_SIZE)]
        part_size: u64,
    },
}

/// アップロード名を決定する。未指定ならローカルのファイル名を使う。
fn upload_name(file: &Path, name: Option<String>) -> anyhow::Result<String> {
    match name {
        Some(name) => Ok(name),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("ファイル名を取得できません: {}", file.display())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let client = GatewayClient::new(&cli.gateway);

    match cli.command {
        Command::Put { file, name } => {
            let name = upload_name(&file, name)?;
            client::upload_single(&client, &file, &name)
                .await
                .with_context(|| format!("アップロードに失敗: {}", file.display()))?;
            println!("uploaded {name}");
        }
        Command::Multipart {
            file,
            name,
            part_size,
        } => {
            let name = upload_name(&file, name)?;
            let key = client::upload_multipart(&client, &file, &name, part_size)
                .await
                .with_context(|| format!("マルチパートアップロードに失敗: {}", file.display()))?;
            println!("uploaded {key}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_multipart() {
        let cli = Cli::try_parse_from([
            "upload-cli",
            "--gateway",
            "http://gw:8080",
            "multipart",
            "video.mp4",
            "--part-size",
            "6291456",
        ])
        .unwrap();

        assert_eq!(cli.gateway, "http://gw:8080");
        match cli.command {
            Command::Multipart {
                file,
                name,
                part_size,
            } => {
                assert_eq!(file, PathBuf::from("video.mp4"));
                assert!(name.is_none());
                assert_eq!(part_size, 6_291_456);
            }
            Command::Put { .. } => panic!("expected multipart"),
        }
    }

    #[test]
    fn test_upload_name_defaults_to_file_name() {
        let name = upload_name(Path::new("/tmp/dir/photo.jpg"), None).unwrap();
        assert_eq!(name, "photo.jpg");

        let name = upload_name(Path::new("/tmp/dir/photo.jpg"), Some("renamed.jpg".into())).unwrap();
        assert_eq!(name, "renamed.jpg");
    }
}
