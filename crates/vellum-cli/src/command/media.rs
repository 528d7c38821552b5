//! Media commands: `put`, `get`, `delete`, `find`.

use anyhow::Context;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use vellum_core::{MediaMeta, MediaRecord};
use vellum_postgres::PgClient;
use vellum_service::MediaStore;

use super::{DeleteArgs, FindArgs, GetArgs, PutArgs};
use crate::TRACING_TARGET_COMMAND;

pub async fn put(store: &MediaStore, args: PutArgs) -> anyhow::Result<()> {
    let record = save_file(store, args).await?;
    print_json(&record)
}

pub async fn get(store: &MediaStore, args: GetArgs) -> anyhow::Result<()> {
    let media = store
        .get_media(args.id)
        .await
        .with_context(|| format!("failed to fetch media {}", args.id))?;

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &media.content)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(
                target: TRACING_TARGET_COMMAND,
                media_id = %args.id,
                size = media.len(),
                path = %path.display(),
                "Media written to file"
            );
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&media.content).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}

pub async fn delete(store: &MediaStore, args: DeleteArgs) -> anyhow::Result<()> {
    match args.ids.as_slice() {
        [id] => {
            store
                .delete_media(*id)
                .await
                .with_context(|| format!("failed to delete media {id}"))?;
            tracing::info!(target: TRACING_TARGET_COMMAND, media_id = %id, "Deleted media");
        }
        ids => {
            let deleted = store
                .delete_medias(ids)
                .await
                .context("failed to delete media batch")?;
            tracing::info!(target: TRACING_TARGET_COMMAND, count = deleted.len(), "Deleted media");
        }
    }

    Ok(())
}

pub async fn find(pg: &PgClient, args: FindArgs) -> anyhow::Result<()> {
    let records = pg
        .find_medias_by_filename(&args.name)
        .await
        .with_context(|| format!("failed to look up `{}`", args.name))?;
    print_json(&records)
}

/// Stores a file through the coordinator.
async fn save_file(store: &MediaStore, args: PutArgs) -> anyhow::Result<MediaRecord> {
    let name = match args.name {
        Some(name) => name,
        None => args
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("cannot derive a name from {}", args.file.display()))?,
    };

    let mut meta = MediaMeta::new(name);
    meta.metadata.extend(args.metadata);
    meta.tags.extend(args.tags);
    meta.base_path = args.base_path;

    let file = tokio::fs::File::open(&args.file)
        .await
        .with_context(|| format!("failed to open {}", args.file.display()))?;

    store
        .save_media(file, meta)
        .await
        .with_context(|| format!("failed to store {}", args.file.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
