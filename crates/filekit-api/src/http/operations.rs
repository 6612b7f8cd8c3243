//! Operation endpoints.
//!
//! Handlers only translate: form fields become an [`OperationRequest`], the
//! pipeline's [`Artifact`] becomes a binary response and its
//! `ProcessingError` becomes a JSON error. A body that is not form data at
//! all is treated as a form with no fields, so the pipeline still runs (and
//! audits) the request and reports the missing field itself. A form body
//! that breaks while being read is handed to the pipeline as
//! [`OperationRequest::Unreadable`]; only an over-limit body keeps its 413.

use std::sync::Arc;

use axum::{
    Form,
    extract::{
        FromRequest, Multipart, Request, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::FormRejection,
    },
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use filekit_pipeline::{Artifact, OperationKind, OperationRequest, Upload};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::http::errors::ApiError;
use crate::state::ApiState;

const FILE_FIELD: &str = "file";
const FILES_FIELD: &str = "files";
const TEXT_FIELD: &str = "text";

#[derive(Debug, Deserialize)]
pub(crate) struct QrForm {
    text: Option<String>,
}

pub(crate) async fn convert_image(
    State(state): State<Arc<ApiState>>,
    form: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let request = first_upload(form, FILE_FIELD)
        .await
        .map(|upload| OperationRequest::ConvertImage { upload });
    run(&state, OperationKind::ImageConvert, request).await
}

pub(crate) async fn generate_qr(
    State(state): State<Arc<ApiState>>,
    request: Request,
) -> Result<Response, ApiError> {
    let text = if is_multipart(request.headers()) {
        let form = Multipart::from_request(request, &()).await;
        first_text(form, TEXT_FIELD).await
    } else {
        match Form::<QrForm>::from_request(request, &()).await {
            Ok(Form(form)) => Ok(form.text),
            Err(FormRejection::InvalidFormContentType(_)) => {
                debug!("qr request carried no form body");
                Ok(None)
            }
            Err(rejection) => Err(BodyFailure::new(rejection.status(), rejection.body_text())),
        }
    };
    let request = text.map(|text| OperationRequest::GenerateQr { text });
    run(&state, OperationKind::QrGenerate, request).await
}

pub(crate) async fn merge_pdfs(
    State(state): State<Arc<ApiState>>,
    form: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let request = read_uploads(form, FILES_FIELD)
        .await
        .map(|uploads| OperationRequest::MergePdfs { uploads });
    run(&state, OperationKind::PdfMerge, request).await
}

pub(crate) async fn compress_image(
    State(state): State<Arc<ApiState>>,
    form: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let request = first_upload(form, FILE_FIELD)
        .await
        .map(|upload| OperationRequest::CompressImage { upload });
    run(&state, OperationKind::ImageCompress, request).await
}

/// A form body that could not be read to the end.
#[derive(Debug)]
struct BodyFailure {
    status: StatusCode,
    detail: String,
}

impl BodyFailure {
    fn new(status: StatusCode, detail: String) -> Self {
        // Everything except an over-limit body reports as a processing failure.
        let status = if status == StatusCode::PAYLOAD_TOO_LARGE {
            status
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self { status, detail }
    }
}

impl From<MultipartError> for BodyFailure {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), err.body_text())
    }
}

async fn run(
    state: &ApiState,
    operation: OperationKind,
    request: Result<OperationRequest, BodyFailure>,
) -> Result<Response, ApiError> {
    match request {
        Ok(request) => {
            let artifact = state.pipeline.execute(request).await?;
            Ok(artifact_response(artifact))
        }
        Err(BodyFailure { status, detail }) => {
            warn!(operation = operation.as_str(), error = %detail, "request body unreadable");
            let outcome = state
                .pipeline
                .execute(OperationRequest::Unreadable { operation, detail })
                .await;
            match outcome {
                Ok(artifact) => Ok(artifact_response(artifact)),
                Err(err) => Err(ApiError::rejected(status, err.detail)),
            }
        }
    }
}

fn artifact_response(artifact: Artifact) -> Response {
    let Artifact {
        file_name,
        content_type,
        disposition,
        bytes,
    } = artifact;
    let mut response = (StatusCode::OK, bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    match HeaderValue::from_str(&disposition.header_value(&file_name)) {
        Ok(value) => {
            headers.insert(CONTENT_DISPOSITION, value);
        }
        Err(err) => {
            warn!(error = %err, file_name = %file_name, "content disposition not representable");
        }
    }
    response
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/form-data")
        })
}

/// Every part named `field_name`, in submission order.
async fn read_uploads(
    form: Result<Multipart, MultipartRejection>,
    field_name: &str,
) -> Result<Vec<Upload>, BodyFailure> {
    let mut multipart = match form {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!(error = %rejection, "request body is not multipart form data");
            return Ok(Vec::new());
        }
    };

    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        uploads.push(Upload { file_name, bytes });
    }
    Ok(uploads)
}

async fn first_upload(
    form: Result<Multipart, MultipartRejection>,
    field_name: &str,
) -> Result<Option<Upload>, BodyFailure> {
    Ok(read_uploads(form, field_name).await?.into_iter().next())
}

async fn first_text(
    form: Result<Multipart, MultipartRejection>,
    field_name: &str,
) -> Result<Option<String>, BodyFailure> {
    let mut multipart = match form {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!(error = %rejection, "request body is not multipart form data");
            return Ok(None);
        }
    };

    let mut text = None;
    while let Some(field) = multipart.next_field().await? {
        if text.is_some() || field.name() != Some(field_name) {
            continue;
        }
        text = Some(field.text().await?);
    }
    Ok(text)
}
