use super::ENDPOINT_URL;
use crate::error::MapError;
use crate::s3::{self, S3ObjOps};
use anyhow::Result;
use aws_sdk_s3::operation::get_object::GetObjectOutput;
use aws_sdk_s3::Client;
use aws_smithy_runtime_api::client::orchestrator::HttpRequest;

pub struct Provider {
    client: Client,
}

impl Provider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn from_profile(profile_name: &str) -> Self {
        let client = s3::client_from_profile(profile_name, ENDPOINT_URL).await;
        Self { client }
    }

    pub async fn from_keys(access_key: &str, secret_key: &str) -> Self {
        let client = s3::client_from_keys(access_key, secret_key, ENDPOINT_URL).await;
        Self { client }
    }
}

impl S3ObjOps for Provider {
    async fn list_keys(self: &Self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        s3::list_all_keys(&self.client, bucket, prefix).await
    }

    async fn get_object(self: &Self, bucket: &str, key: &str) -> Result<GetObjectOutput> {
        let object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .customize()
            .map_request(strip_x_id_get_object_param_from_uri)
            .send()
            .await?;
        Ok(object)
    }
}

/// The copernicus S3 API throws a fit if the param 'x-id=GetObject' is present in the request. This
/// function can be passed to the `GetObjectFluentBuilder::map_request()` method to strip the offending
/// param from the generated uri.
fn strip_x_id_get_object_param_from_uri(req: HttpRequest) -> Result<HttpRequest, MapError> {
    let mut r = req.try_clone().ok_or(MapError::Clone)?;
    let uri = strip_x_id(r.uri());
    r.set_uri(uri.as_str()).map_err(|_| MapError::Uri(uri.clone()))?;
    Ok(r)
}

fn strip_x_id(uri: &str) -> String {
    let uri = uri
        .replace("&x-id=GetObject", "")
        .replace("x-id=GetObject&", "")
        .replace("x-id=GetObject", "");
    uri.trim_end_matches('?').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_smithy_types::body::SdkBody;

    #[test]
    fn test_strip_x_id_only_param() {
        let uri = "https://eodata.dataspace.copernicus.eu/eodata/Sentinel-2/a.jp2?x-id=GetObject";
        assert_eq!(
            strip_x_id(uri),
            "https://eodata.dataspace.copernicus.eu/eodata/Sentinel-2/a.jp2"
        );
    }

    #[test]
    fn test_strip_x_id_among_params() {
        let uri = "https://host/eodata/a.jp2?x-id=GetObject&partNumber=1";
        assert_eq!(strip_x_id(uri), "https://host/eodata/a.jp2?partNumber=1");

        let uri = "https://host/eodata/a.jp2?partNumber=1&x-id=GetObject";
        assert_eq!(strip_x_id(uri), "https://host/eodata/a.jp2?partNumber=1");
    }

    #[test]
    fn test_strip_x_id_absent() {
        let uri = "https://host/eodata/a.jp2";
        assert_eq!(strip_x_id(uri), uri);
    }

    #[test]
    fn test_map_request_strips_x_id() {
        let mut req = HttpRequest::new(SdkBody::empty());
        req.set_uri("https://eodata.dataspace.copernicus.eu/eodata/Sentinel-2/a.jp2?x-id=GetObject")
            .unwrap();

        let req = strip_x_id_get_object_param_from_uri(req).unwrap();

        assert_eq!(
            req.uri(),
            "https://eodata.dataspace.copernicus.eu/eodata/Sentinel-2/a.jp2"
        );
    }
}
