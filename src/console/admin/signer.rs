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

//! AWS Signature Version 4 for admin API requests.

use aws_sigv4::http_request::{
    PayloadChecksumKind, PercentEncodingMode, SignableBody, SignableRequest, SigningSettings,
    UriPathNormalizationMode, sign as sign_request,
};
use aws_sigv4::sign::v4;
use chrono::{DateTime, Utc};
use snafu::{ResultExt, Snafu};
use std::time::SystemTime;
use url::Url;

use super::Credentials;

pub const REGION: &str = "us-east-1";
pub const SERVICE: &str = "s3";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid signing parameters: {}", source))]
    Params {
        source: v4::signing_params::BuildError,
    },

    #[snafu(display("failed to sign admin request: {}", source))]
    Signing {
        source: aws_sigv4::http_request::SigningError,
    },
}

// S3 signs the path as sent, without normalizing or re-encoding it.
fn settings() -> SigningSettings {
    let mut settings = SigningSettings::default();
    settings.percent_encoding_mode = PercentEncodingMode::Single;
    settings.uri_path_normalization_mode = UriPathNormalizationMode::Disabled;
    settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;
    settings
}

/// Headers to attach to a request so the tenant accepts it.
pub fn sign(
    method: &str,
    url: &Url,
    body: &[u8],
    credentials: &Credentials,
    now: DateTime<Utc>,
) -> Result<Vec<(String, String)>, Error> {
    let identity = aws_credential_types::Credentials::new(
        &credentials.access_key,
        &credentials.secret_key,
        None,
        None,
        "tenant",
    )
    .into();
    let params = v4::SigningParams::builder()
        .identity(&identity)
        .region(REGION)
        .name(SERVICE)
        .time(SystemTime::from(now))
        .settings(settings())
        .build()
        .context(ParamsSnafu)?;

    let request = SignableRequest::new(
        method,
        url.as_str(),
        std::iter::empty(),
        SignableBody::Bytes(body),
    )
    .context(SigningSnafu)?;

    let (instructions, _signature) = sign_request(request, &params.into())
        .context(SigningSnafu)?
        .into_parts();

    Ok(instructions
        .headers()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect())
}
