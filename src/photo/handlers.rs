use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, instrument, warn};

use super::{
    service::PhotoService,
    types::{
        MessageResponse, PhotoResponse, PublicPhotoResponse, UpdatePublicRequest,
        UpdatePublicResponse,
    },
};
use crate::session::{optional_identity, Identity};
use crate::shared::{json_body, AppError, AppState};

fn photo_service(state: &AppState) -> PhotoService {
    PhotoService::new(state.photo_repository.clone(), state.photo_storage.clone())
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    warn!(error = %e, "Failed to read multipart body");
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest("Failed to read photo".to_string())
    }
}

/// HTTP handler for uploading a photo
///
/// POST /api/add-photo (basic gate)
/// Multipart form with a `photo` file field and an optional `public` field ("1" = public)
#[instrument(name = "add_photo", skip(state, identity, multipart), fields(login = %identity.login))]
pub async fn add_photo(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut is_public = false;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("photo") => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::BadRequest("Photo needs a file name".to_string()))?;
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload = Some((file_name, bytes.to_vec()));
            }
            Some("public") => {
                let value = field.text().await.map_err(multipart_error)?;
                is_public = value == "1";
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("Failed to read photo".to_string()))?;

    photo_service(&state)
        .upload(&identity, &file_name, &bytes, is_public)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Photo uploaded".to_string(),
        }),
    ))
}

/// HTTP handler for listing a user's photos
///
/// GET /api/photos/:login
/// Anonymous callers see public photos only; the owner sees everything
#[instrument(name = "list_photos", skip(state, jar))]
pub async fn list_photos(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(login): Path<String>,
) -> Result<Json<Vec<PhotoResponse>>, AppError> {
    let requester = optional_identity(&state.session_signer, &jar);

    let photos = photo_service(&state)
        .list_for_owner(requester.as_ref(), &login)
        .await?;

    Ok(Json(photos))
}

/// HTTP handler for fetching one photo's bytes
///
/// GET /api/photos/:login/:filename
#[instrument(name = "get_photo", skip(state, jar))]
pub async fn get_photo(
    State(state): State<AppState>,
    jar: CookieJar,
    Path((login, filename)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let requester = optional_identity(&state.session_signer, &jar);

    let bytes = photo_service(&state)
        .fetch(requester.as_ref(), &login, &filename)
        .await?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&filename))], bytes))
}

/// HTTP handler for deleting a photo
///
/// DELETE /api/delete-photo/:login/:filename (basic gate)
#[instrument(name = "delete_photo", skip(state, identity), fields(requester = %identity.login))]
pub async fn delete_photo(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((login, filename)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, AppError> {
    photo_service(&state)
        .delete(&identity, &login, &filename)
        .await?;

    Ok(Json(MessageResponse {
        message: "Photo deleted".to_string(),
    }))
}

/// HTTP handler for flipping a photo between public and private
///
/// POST /api/toggle-public (basic gate)
#[instrument(name = "toggle_public", skip(state, identity, payload), fields(requester = %identity.login))]
pub async fn toggle_public(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<UpdatePublicRequest>, JsonRejection>,
) -> Result<Json<UpdatePublicResponse>, AppError> {
    let request = json_body(payload)?;
    let is_public = match request.public {
        0 => false,
        1 => true,
        _ => return Err(AppError::BadRequest("public must be 0 or 1".to_string())),
    };

    photo_service(&state)
        .set_visibility(&identity, &request.filename, is_public)
        .await?;

    Ok(Json(UpdatePublicResponse {
        message: "Photo public state updated".to_string(),
        public: request.public,
    }))
}

/// HTTP handler for the public gallery
///
/// GET /api/public-gallery
#[instrument(name = "public_gallery", skip(state))]
pub async fn public_gallery(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicPhotoResponse>>, AppError> {
    let gallery = photo_service(&state).public_gallery().await?;

    info!(photo_count = gallery.len(), "Public gallery listed");
    Ok(Json(gallery))
}
