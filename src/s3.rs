//! Utility functions for creating s3 clients, plus the object operations the
//! downloader relies on
use anyhow::Result;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::operation::get_object::GetObjectOutput;
use aws_sdk_s3::Client;

const DEFAULT_REGION: &str = "us-east-1";

pub async fn client_from_profile(profile_name: &str, endpoint_url: &str) -> Client {
    let base_config = aws_config::from_env()
        .profile_name(profile_name)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&base_config)
        .endpoint_url(endpoint_url)
        .region(Region::new(DEFAULT_REGION))
        .force_path_style(true)
        .build();

    Client::from_conf(s3_config)
}

pub async fn client_from_keys(access_key: &str, secret_key: &str, endpoint_url: &str) -> Client {
    let credentials = Credentials::new(access_key, secret_key, None, None, "eodata-fetch");
    let base_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .credentials_provider(credentials)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&base_config)
        .endpoint_url(endpoint_url)
        .region(Region::new(DEFAULT_REGION))
        .force_path_style(true)
        .build();

    Client::from_conf(s3_config)
}

pub trait S3ObjOps {
    /// Every object key under `prefix`, in listing order.
    async fn list_keys(self: &Self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    async fn get_object(self: &Self, bucket: &str, key: &str) -> Result<GetObjectOutput>;
}

/// Pages through `ListObjectsV2` until the listing is exhausted. Directory
/// placeholders (keys ending in `/`) are skipped.
pub async fn list_all_keys(client: &Client, bucket: &str, prefix: &str) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    let mut continuation_token: Option<String> = None;

    loop {
        let mut request = client.list_objects_v2().bucket(bucket).prefix(prefix);
        if let Some(token) = continuation_token.take() {
            request = request.continuation_token(token);
        }

        let response = request.send().await?;

        for object in response.contents() {
            if let Some(key) = object.key() {
                if !key.ends_with('/') {
                    keys.push(key.to_string());
                }
            }
        }

        if response.is_truncated() == Some(true) {
            continuation_token = response.next_continuation_token().map(|s| s.to_string());
            if continuation_token.is_none() {
                break;
            }
        } else {
            break;
        }
    }

    Ok(keys)
}
