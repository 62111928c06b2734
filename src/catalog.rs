//! OData product search against the Copernicus Data Space catalogue
use crate::table::{MetadataTable, Row};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

pub const CATALOG_API: &str = "https://catalogue.dataspace.copernicus.eu/odata/v1/Products";
pub const DEFAULT_SRID: &str = "4326";

fn default_srid() -> String {
    DEFAULT_SRID.to_string()
}

/// Spatio-temporal product filter.
///
/// `start_date` and `end_date` are passed through verbatim and should look
/// like `2024-04-30T00:00:00.000Z`. `polygon` is a closed ring of
/// comma-separated `lon lat` pairs. Nothing is escaped or validated.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ProductQuery {
    pub start_date: String,
    pub end_date: String,
    pub polygon: String,
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(default = "default_srid")]
    pub srid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct ODataResponse {
    value: Vec<Row>,
}

impl ProductQuery {
    pub fn new(start_date: &str, end_date: &str, polygon: &str, collection: &str) -> Self {
        Self {
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            polygon: polygon.to_string(),
            collection: collection.to_string(),
            cloud_cover: None,
            product_type: None,
            srid: default_srid(),
            top: None,
        }
    }

    pub fn with_cloud_cover(mut self, cloud_cover: u8) -> Self {
        self.cloud_cover = Some(cloud_cover);
        self
    }

    pub fn with_product_type(mut self, product_type: &str) -> Self {
        self.product_type = Some(product_type.to_string());
        self
    }

    pub fn with_top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    pub fn clauses(&self) -> Vec<String> {
        let mut clauses = vec![
            format!(
                "OData.CSC.Intersects(area=geography'SRID={};POLYGON(({}))')",
                self.srid, self.polygon
            ),
            format!("ContentDate/Start gt {}", self.start_date),
            format!("ContentDate/Start lt {}", self.end_date),
            format!("Collection/Name eq '{}'", self.collection),
        ];

        if let Some(cloud_cover) = self.cloud_cover {
            clauses.push(format!(
                "Attributes/OData.CSC.DoubleAttribute/any(att:att/Name eq 'cloudCover' and att/OData.CSC.DoubleAttribute/Value lt {cloud_cover})"
            ));
        }

        if let Some(product_type) = &self.product_type {
            clauses.push(format!(
                "Attributes/OData.CSC.StringAttribute/any(att:att/Name eq 'productType' and att/OData.CSC.StringAttribute/Value eq '{product_type}')"
            ));
        }

        clauses
    }

    pub fn filter(&self) -> String {
        self.clauses().join(" and ")
    }

    /// The filter goes into the query string as-is. `Url` only percent-encodes
    /// characters that cannot appear in a query.
    pub fn url(&self) -> Result<Url> {
        let mut url = format!("{}?$filter={}", CATALOG_API, self.filter());
        if let Some(top) = self.top {
            url.push_str(&format!("&$top={top}"));
        }
        Ok(Url::parse(&url)?)
    }

    pub async fn fetch(&self) -> Result<MetadataTable> {
        let url = self.url()?;
        debug!(%url, "Querying catalog");
        let body = reqwest::get(url).await?.error_for_status()?.text().await?;
        self.read_results(&body)
    }

    /// Parses a catalog response body, warning when it holds no products.
    pub fn read_results(&self, body: &str) -> Result<MetadataTable> {
        let table = parse_response(body)?;
        if table.is_empty() {
            warn!(
                collection = %self.collection,
                "No products found for the given search criteria"
            );
        } else {
            info!(rows = table.len(), "Catalog search complete");
        }
        Ok(table)
    }
}

/// Turns the `value` array of a catalog response into a table.
pub fn parse_response(body: &str) -> Result<MetadataTable> {
    let response: ODataResponse = serde_json::from_str(body)?;
    Ok(MetadataTable::new(response.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    const POLYGON: &str = "-66.971000 21.651000, -66.911000 20.761000,-66.043000 20.822000, -66.043000 21.611000, -86.971000 21.651000";

    fn base_query() -> ProductQuery {
        ProductQuery::new(
            "2024-04-30T00:00:00.000Z",
            "2024-05-01T00:00:00.000Z",
            POLYGON,
            "SENTINEL-2",
        )
    }

    #[test]
    fn test_base_filter() {
        let expected = format!(
            "OData.CSC.Intersects(area=geography'SRID=4326;POLYGON(({POLYGON}))') \
             and ContentDate/Start gt 2024-04-30T00:00:00.000Z \
             and ContentDate/Start lt 2024-05-01T00:00:00.000Z \
             and Collection/Name eq 'SENTINEL-2'"
        );
        assert_eq!(base_query().filter(), expected);
    }

    #[test]
    fn test_filter_is_deterministic() {
        let query = base_query().with_product_type("S2MSI1C");
        assert_eq!(query.filter(), query.clone().filter());
    }

    #[test]
    fn test_cloud_cover_adds_one_clause() {
        let base = base_query().clauses();
        let clauses = base_query().with_cloud_cover(20).clauses();
        assert_eq!(clauses.len(), base.len() + 1);
        assert_eq!(
            clauses.last().unwrap(),
            "Attributes/OData.CSC.DoubleAttribute/any(att:att/Name eq 'cloudCover' and att/OData.CSC.DoubleAttribute/Value lt 20)"
        );
    }

    #[test]
    fn test_product_type_adds_one_clause() {
        let base = base_query().clauses();
        let clauses = base_query().with_product_type("S2MSI1C").clauses();
        assert_eq!(clauses.len(), base.len() + 1);
        assert_eq!(
            clauses.last().unwrap(),
            "Attributes/OData.CSC.StringAttribute/any(att:att/Name eq 'productType' and att/OData.CSC.StringAttribute/Value eq 'S2MSI1C')"
        );
    }

    #[test]
    fn test_optional_clauses_are_independent() {
        let both = base_query()
            .with_cloud_cover(20)
            .with_product_type("S2MSI1C")
            .clauses();
        let cloud = base_query().with_cloud_cover(20).clauses();
        let product = base_query().with_product_type("S2MSI1C").clauses();
        assert_eq!(both.len(), 6);
        assert_eq!(both[4], cloud[4]);
        assert_eq!(both[5], product[4]);
    }

    #[test]
    fn test_inputs_are_not_escaped() {
        let query = ProductQuery::new("a", "b", "0 0", "X' or '1'='1");
        assert!(query
            .filter()
            .ends_with("Collection/Name eq 'X' or '1'='1'"));
    }

    #[test]
    fn test_url() {
        let query = base_query().with_top(100);
        let url = query.url().unwrap();
        assert_eq!(url.host_str(), Some("catalogue.dataspace.copernicus.eu"));
        assert_eq!(url.path(), "/odata/v1/Products");
        assert!(!url.query().unwrap().contains(' '));

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("$filter".to_string(), query.filter()),
                ("$top".to_string(), "100".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "@odata.context": "$metadata#Products",
            "value": [
                {"Id": "1", "Name": "S2A_MSIL1C_20240430T000000_N0500_R001_T16QCD_20240430T012345.SAFE", "S3Path": "/eodata/Sentinel-2/a.SAFE"},
                {"Id": "2", "Name": "S2B_MSIL1C_20240430T153609_N0510_R110_T17QKA_20240430T190909.SAFE", "S3Path": "/eodata/Sentinel-2/b.SAFE"}
            ]
        }"#;
        let table = parse_response(body).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.s3_path(1), Some("/eodata/Sentinel-2/b.SAFE"));
        assert_eq!(table.columns(), vec!["Id", "Name", "S3Path"]);
    }

    #[test]
    fn test_parse_empty_response() {
        let table = parse_response(r#"{"value": []}"#).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_parse_response_keeps_attribute_order() {
        let body = r#"{"value": [{"Name": "n", "S3Path": "p", "Id": "1", "Checksum": []}]}"#;
        let table = parse_response(body).unwrap();
        assert_eq!(table.columns(), vec!["Name", "S3Path", "Id", "Checksum"]);
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn read_results_logged(query: &ProductQuery, body: &str) -> (Result<MetadataTable>, String) {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, || query.read_results(body));
        let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        (result, text)
    }

    #[test]
    fn test_empty_results_warn() {
        let (result, logs) = read_results_logged(&base_query(), r#"{"value": []}"#);
        assert!(result.unwrap().is_empty());
        assert!(logs.contains("WARN"));
        assert!(logs.contains("No products found for the given search criteria"));
        assert!(logs.contains("collection=SENTINEL-2"));
    }

    #[test]
    fn test_non_empty_results_do_not_warn() {
        let body = r#"{"value": [{"Id": "1", "S3Path": "/eodata/Sentinel-2/a.SAFE"}]}"#;
        let (result, logs) = read_results_logged(&base_query(), body);
        assert_eq!(result.unwrap().len(), 1);
        assert!(!logs.contains("No products found"));
        assert!(logs.contains("Catalog search complete"));
    }

    #[test]
    fn test_parse_response_without_value() {
        assert!(parse_response(r#"{"detail": "Invalid filter"}"#).is_err());
        assert!(parse_response("<html></html>").is_err());
    }

    #[test]
    fn test_query_from_toml_defaults() {
        let query: ProductQuery = toml::from_str(
            r#"
            start_date = "2024-04-30T00:00:00.000Z"
            end_date = "2024-05-01T00:00:00.000Z"
            polygon = "0 0, 1 0, 1 1, 0 0"
            collection = "SENTINEL-2"
            "#,
        )
        .unwrap();
        assert_eq!(query.srid, "4326");
        assert_eq!(query.cloud_cover, None);
        assert_eq!(query.product_type, None);
    }
}
