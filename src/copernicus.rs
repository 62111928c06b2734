mod provider;
pub use provider::Provider;

pub const ENDPOINT_URL: &str = "https://eodata.dataspace.copernicus.eu";
pub const BUCKET: &str = "eodata";
