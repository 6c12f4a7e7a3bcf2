use std::collections::HashMap;

use actix_multipart::{Field, Multipart};
use common::error::{AppError, Res};
use futures::StreamExt;
use storage::{
    BlobStore, BlobWriter, UploadedFile,
    policy::{UploadRejection, is_accepted_content_type},
};
use uuid::Uuid;

pub const THUMBNAIL_FIELD: &str = "thumb_Resized_image";
pub const GALLERY_FIELD: &str = "galleryImages";
pub const MAX_THUMBNAILS: usize = 1;
pub const MAX_GALLERY_IMAGES: usize = 10;

const DELETED_IDS_FIELDS: [&str; 2] = ["deletedImageIds", "deletedImageIds[]"];
const MAX_FIELD_VALUE_SIZE: usize = 1024 * 1024;

/// A listing create/update form after the multipart body has been read.
#[derive(Debug, Default)]
pub struct ListingForm {
    /// Text fields by name; a repeated name keeps its last value.
    pub fields: HashMap<String, String>,
    pub thumbnail: Option<UploadedFile>,
    pub gallery: Vec<UploadedFile>,
    /// Raw `deletedImageIds` values, see [`parse_deleted_ids`].
    pub deleted_image_ids: Vec<String>,
}

impl ListingForm {
    /// Gallery ids to delete, `None` when the form carries none.
    pub fn deleted_ids(&self) -> Res<Option<Vec<Uuid>>> {
        if self.deleted_image_ids.is_empty() {
            return Ok(None);
        }
        let ids = parse_deleted_ids(&self.deleted_image_ids)?;
        Ok((!ids.is_empty()).then_some(ids))
    }

    /// Paths of every file the form streamed to disk.
    pub fn uploaded_paths(&self) -> Vec<String> {
        self.thumbnail
            .iter()
            .chain(&self.gallery)
            .map(|file| file.path.clone())
            .collect()
    }

    /// Removes the uploaded files of a form that will not be saved.
    pub async fn discard(self, blobs: &BlobStore) {
        blobs.delete_all(&self.uploaded_paths()).await;
    }
}

/// Reads the whole multipart body, streaming accepted files straight into
/// the blob store and enforcing the upload policy as fields arrive. On any
/// error the files written so far are removed again.
pub async fn read_listing_form(
    mut payload: Multipart,
    blobs: &BlobStore,
    max_file_size: usize,
) -> Res<ListingForm> {
    let mut form = ListingForm::default();
    match read_fields(&mut payload, blobs, max_file_size, &mut form).await {
        Ok(()) => Ok(form),
        Err(err) => {
            form.discard(blobs).await;
            Err(err)
        }
    }
}

async fn read_fields(
    payload: &mut Multipart,
    blobs: &BlobStore,
    max_file_size: usize,
    form: &mut ListingForm,
) -> Res<()> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(invalid_body)?;
        let name = field
            .name()
            .map(str::to_string)
            .ok_or(UploadRejection::UnexpectedField)?;
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        match file_name {
            Some(file_name) => {
                let slots = match name.as_str() {
                    THUMBNAIL_FIELD => MAX_THUMBNAILS - usize::from(form.thumbnail.is_some()),
                    GALLERY_FIELD => MAX_GALLERY_IMAGES.saturating_sub(form.gallery.len()),
                    _ => 0,
                };
                if slots == 0 {
                    return Err(UploadRejection::UnexpectedField.into());
                }

                let content_type = field
                    .content_type()
                    .map(|mime| mime.essence_str().to_string())
                    .unwrap_or_default();
                if !is_accepted_content_type(&content_type) {
                    return Err(UploadRejection::UnsupportedType.into());
                }

                let mut writer = blobs.create(&name, Some(&file_name)).await?;
                if let Err(err) = stream_to(&mut field, &mut writer, max_file_size).await {
                    writer.discard().await;
                    return Err(err);
                }
                let size = writer.written();
                let file = UploadedFile {
                    field_name: name.clone(),
                    content_type,
                    path: writer.finish().await?,
                    size,
                };
                if name == THUMBNAIL_FIELD {
                    form.thumbnail = Some(file);
                } else {
                    form.gallery.push(file);
                }
            }
            None => {
                let bytes =
                    read_limited(field, MAX_FIELD_VALUE_SIZE, UploadRejection::FieldValueTooLong)
                        .await?;
                let value = String::from_utf8(bytes).map_err(|_| {
                    AppError::BadRequest(format!("Invalid value for {}", name))
                })?;
                if DELETED_IDS_FIELDS.contains(&name.as_str()) {
                    form.deleted_image_ids.push(value);
                } else {
                    form.fields.insert(name, value);
                }
            }
        }
    }

    Ok(())
}

async fn stream_to(field: &mut Field, writer: &mut BlobWriter, limit: usize) -> Res<()> {
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(invalid_body)?;
        if writer.written() + chunk.len() > limit {
            return Err(UploadRejection::FileTooLarge.into());
        }
        writer.write(&chunk).await?;
    }
    Ok(())
}

async fn read_limited(mut field: Field, limit: usize, rejection: UploadRejection) -> Res<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(invalid_body)?;
        if bytes.len() + chunk.len() > limit {
            return Err(rejection.into());
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

fn invalid_body(err: actix_multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart body: {}", err))
}

/// Accepts repeated fields, comma separated lists and JSON arrays.
pub fn parse_deleted_ids(raw: &[String]) -> Res<Vec<Uuid>> {
    let invalid = || AppError::BadRequest("Invalid value for deletedImageIds".to_string());
    let mut ids = Vec::new();

    for value in raw {
        let value = value.trim();
        let parts: Vec<String> = if value.starts_with('[') {
            serde_json::from_str(value).map_err(|_| invalid())?
        } else {
            value.split(',').map(str::to_string).collect()
        };
        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            ids.push(Uuid::parse_str(part).map_err(|_| invalid())?);
        }
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_ids_in_every_accepted_shape() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let raw = vec![
            format!("{}, {}", a, b),
            format!("[\"{}\"]", c),
            String::new(),
        ];
        assert_eq!(parse_deleted_ids(&raw).unwrap(), vec![a, b, c]);
    }

    #[test]
    fn malformed_deleted_ids_are_rejected() {
        let err = parse_deleted_ids(&["not-a-uuid".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for deletedImageIds");
        assert!(parse_deleted_ids(&["[1, 2]".to_string()]).is_err());
    }

    #[test]
    fn empty_deleted_ids_mean_none() {
        let form = ListingForm {
            deleted_image_ids: vec![" ".to_string()],
            ..Default::default()
        };
        assert_eq!(form.deleted_ids().unwrap(), None);
        assert_eq!(ListingForm::default().deleted_ids().unwrap(), None);
    }
}
