//! Media service
//!
//! Stores uploaded files and records them as detached media rows.

use std::sync::Arc;

use crate::data::{Database, Media, queries};
use crate::error::AppError;
use crate::metrics::{MEDIA_BYTES_UPLOADED, MEDIA_UPLOADS_TOTAL};
use crate::storage::MediaStorage;

/// Media service
pub struct MediaService {
    db: Arc<Database>,
    storage: Arc<MediaStorage>,
}

impl MediaService {
    /// Create new media service
    pub fn new(db: Arc<Database>, storage: Arc<MediaStorage>) -> Self {
        Self { db, storage }
    }

    /// Store an uploaded file and create a detached media row for it
    ///
    /// # Errors
    /// `BadRequest` when storage rejects the file
    pub async fn upload(&self, file_name: Option<&str>, data: &[u8]) -> Result<Media, AppError> {
        let media_path = self.storage.save(file_name, data).await?;

        let inserted = async {
            let mut tx = self.db.begin().await?;
            let media = queries::insert_media(&mut tx, &media_path).await?;
            tx.commit().await?;
            Ok::<_, AppError>(media)
        }
        .await;

        let media = match inserted {
            Ok(media) => media,
            Err(error) => {
                // The row never made it; do not leave the file orphaned
                if let Err(cleanup_error) = self.storage.delete(&media_path).await {
                    tracing::warn!(%cleanup_error, path = %media_path, "Failed to remove orphaned media file");
                }
                return Err(error);
            }
        };

        MEDIA_UPLOADS_TOTAL.inc();
        MEDIA_BYTES_UPLOADED.inc_by(data.len() as u64);

        tracing::info!(media_id = media.id, path = %media.media_path, "Media uploaded");

        Ok(media)
    }
}
