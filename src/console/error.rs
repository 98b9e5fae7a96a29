// Copyright 2025 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use snafu::Snafu;
use strum::Display;

use crate::console::{admin, cluster, idp, marketplace, report, session, subnet};

/// Stable error kinds surfaced to the browser. The display string is the
/// user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    #[strum(serialize = "an error occurred, please try again")]
    Default,
    #[strum(serialize = "invalid Login")]
    InvalidLogin,
    #[strum(serialize = "invalid session")]
    InvalidSession,
    #[strum(serialize = "invalid session")]
    InvalidAccessKey,
    #[strum(serialize = "invalid session")]
    NoSuchUser,
    #[strum(serialize = "access denied")]
    AccessDenied,
    #[strum(serialize = "403 Forbidden")]
    Forbidden,
    #[strum(serialize = "error please check your current password")]
    ChangePassword,
    #[strum(serialize = "error please check your current password")]
    SignatureMismatch,
    #[strum(serialize = "you cannot delete yourself")]
    SelfDelete,
    #[strum(serialize = "logged in user cannot be deleted by itself")]
    AvoidSelfDelete,
    #[strum(serialize = "400 Bad Request")]
    BadRequest,
    #[strum(serialize = "error name not in request")]
    NameInRequest,
    #[strum(serialize = "error body not in request")]
    BodyInRequest,
    #[strum(serialize = "invalid Erasure Coding Value")]
    InvalidErasureCoding,
    #[strum(serialize = "error group name already in use")]
    GroupExists,
    #[strum(serialize = "specified remote tier already exists")]
    RemoteTierExists,
    #[strum(serialize = "specified remote tier was not found")]
    RemoteTierNotFound,
    #[strum(serialize = "tier name must be in uppercase")]
    RemoteTierUppercase,
    #[strum(serialize = "remote tier bucket not found")]
    RemoteTierBucketNotFound,
    #[strum(serialize = "invalid remote tier credentials")]
    RemoteTierInvalidCredentials,
    #[strum(serialize = "pool exists")]
    PoolExists,
    #[strum(serialize = "cannot request more nodes than what is available in the cluster")]
    TooManyNodes,
    #[strum(serialize = "there are not enough nodes in the cluster to support this tenant")]
    TooFewNodes,
    #[strum(serialize = "there is not enough available nodes to satisfy this requirement")]
    TooFewAvailableNodes,
    #[strum(serialize = "at least 4 nodes are required for a tenant")]
    FewerThanFourNodes,
    #[strum(serialize = "login not allowed")]
    LoginNotAllowed,
    #[strum(serialize = "not found")]
    NotFound,
    #[strum(serialize = "license not found")]
    LicenseNotFound,
    #[strum(serialize = "invalid license key")]
    InvalidLicense,
    #[strum(serialize = "error server side encryption configuration not found")]
    SseNotConfigured,
    #[strum(serialize = "error bucket life cycle configuration not found")]
    LifecycleNotConfigured,
    #[strum(serialize = "encryption configuration not found")]
    EncryptionConfigNotFound,
    #[strum(serialize = "policy does not exist")]
    PolicyNotFound,
    #[strum(serialize = "413 File too Large")]
    FileTooLarge,
    #[strum(serialize = "Bucket already exists")]
    BucketAlreadyExists,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        use ErrorKind::*;
        match self {
            InvalidLogin | InvalidSession | InvalidAccessKey | NoSuchUser => {
                StatusCode::UNAUTHORIZED
            }
            AccessDenied | Forbidden | ChangePassword | SignatureMismatch | SelfDelete
            | AvoidSelfDelete | RemoteTierInvalidCredentials => StatusCode::FORBIDDEN,
            BadRequest | NameInRequest | BodyInRequest | InvalidErasureCoding | GroupExists
            | RemoteTierExists | RemoteTierNotFound | RemoteTierUppercase
            | RemoteTierBucketNotFound | TooManyNodes | TooFewNodes | TooFewAvailableNodes
            | FewerThanFourNodes | LoginNotAllowed | BucketAlreadyExists => {
                StatusCode::BAD_REQUEST
            }
            PoolExists => StatusCode::NOT_ACCEPTABLE,
            NotFound | LicenseNotFound | InvalidLicense | SseNotConfigured
            | LifecycleNotConfigured | EncryptionConfigNotFound | PolicyNotFound => {
                StatusCode::NOT_FOUND
            }
            FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Default => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Kind for an error code returned by a tenant's admin API.
    pub fn from_remote_code(code: &str) -> Option<Self> {
        match code {
            "AccessDenied" => Some(ErrorKind::AccessDenied),
            "InvalidAccessKeyId" => Some(ErrorKind::InvalidAccessKey),
            "XMinioAdminNoSuchUser" => Some(ErrorKind::NoSuchUser),
            "SignatureDoesNotMatch" => Some(ErrorKind::SignatureMismatch),
            "BucketAlreadyOwnedByYou" => Some(ErrorKind::BucketAlreadyExists),
            _ => None,
        }
    }

    /// Kind for a failed Kubernetes API call.
    pub fn from_kube(error: &kube::Error) -> Self {
        match error {
            kube::Error::Api(response) => match response.code {
                401 => ErrorKind::InvalidSession,
                403 => ErrorKind::AccessDenied,
                404 => ErrorKind::NotFound,
                _ => ErrorKind::Default,
            },
            _ => ErrorKind::Default,
        }
    }
}

/// Error returned by every console handler.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{}", detail.as_deref().unwrap_or(&kind.to_string())))]
    Api {
        kind: ErrorKind,
        detail: Option<String>,
    },

    #[snafu(display("{}", source))]
    Session { source: session::Error },

    #[snafu(display("{}", source))]
    Cluster { source: cluster::Error },

    #[snafu(display("{}", source))]
    Admin { source: admin::Error },

    #[snafu(display("{}", source))]
    Subnet { source: subnet::Error },

    #[snafu(display("{}", source))]
    Idp { source: idp::Error },

    #[snafu(display("{}", source))]
    Report { source: report::Error },

    #[snafu(display("{}", source))]
    Marketplace { source: marketplace::Error },
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Error::Api { kind, detail: None }
    }

    /// Error of `kind` keeping the originating text for diagnosis.
    pub fn with_detail(kind: ErrorKind, detail: impl ToString) -> Self {
        Error::Api {
            kind,
            detail: Some(detail.to_string()),
        }
    }

    /// Total mapping from any console error to its stable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Api { kind, .. } => *kind,
            Error::Session { .. } => ErrorKind::InvalidSession,
            Error::Cluster { source } => source.kind(),
            Error::Admin { source } => source.kind(),
            Error::Subnet { source } => source.kind(),
            Error::Idp { source } => source.kind(),
            Error::Report { source } => source.kind(),
            Error::Marketplace { source } => source.kind(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

/// JSON body of an error response.
#[derive(Debug, Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    pub detailed_message: String,
}

impl From<&Error> for ErrorResponse {
    fn from(error: &Error) -> Self {
        let kind = error.kind();
        ErrorResponse {
            code: kind.status().as_u16(),
            message: kind.to_string(),
            detailed_message: error.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from(&self);
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}: {}", status, self);
        } else {
            tracing::debug!("{}: {}", status, self);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for Console API
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_codes() {
        let cases = [
            ("AccessDenied", StatusCode::FORBIDDEN, "access denied"),
            ("InvalidAccessKeyId", StatusCode::UNAUTHORIZED, "invalid session"),
            ("XMinioAdminNoSuchUser", StatusCode::UNAUTHORIZED, "invalid session"),
            (
                "SignatureDoesNotMatch",
                StatusCode::FORBIDDEN,
                "error please check your current password",
            ),
            ("BucketAlreadyOwnedByYou", StatusCode::BAD_REQUEST, "Bucket already exists"),
        ];

        for (code, status, message) in cases {
            let kind = ErrorKind::from_remote_code(code).unwrap();
            assert_eq!(kind.status(), status, "{}", code);
            assert_eq!(kind.to_string(), message, "{}", code);
        }
        assert_eq!(ErrorKind::from_remote_code("SlowDown"), None);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorKind::PoolExists.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(ErrorKind::FileTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ErrorKind::InvalidErasureCoding.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::PolicyNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::AvoidSelfDelete.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorKind::Default.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unknown_errors_keep_source_text() {
        let error = Error::Cluster {
            source: cluster::Error::AlreadyExists {
                resource: "secrets \"boom\"".to_string(),
            },
        };
        let body = ErrorResponse::from(&error);

        assert_eq!(body.code, 500);
        assert_eq!(body.message, "an error occurred, please try again");
        assert_eq!(body.detailed_message, "secrets \"boom\" already exists");
    }

    #[test]
    fn test_detail_is_propagated() {
        let error = Error::with_detail(ErrorKind::NotFound, "tenants \"x\" not found");
        let body = ErrorResponse::from(&error);

        assert_eq!(body.code, 404);
        assert_eq!(body.message, "not found");
        assert_eq!(body.detailed_message, "tenants \"x\" not found");

        let body = ErrorResponse::from(&Error::new(ErrorKind::InvalidLogin));
        assert_eq!(body.detailed_message, "invalid Login");
    }

    #[tokio::test]
    async fn test_into_response() {
        let response = Error::new(ErrorKind::InvalidSession).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.message, "invalid session");
    }
}
