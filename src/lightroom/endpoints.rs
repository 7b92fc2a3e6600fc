//! URL roots for the Lightroom API and the Adobe IMS token service.

pub const DEFAULT_API_BASE: &str = "https://lr.adobe.io/v2";
pub const DEFAULT_TOKEN_URL: &str = "https://ims-na1.adobelogin.com/ims/token";

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api_base: String,
    pub token_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE, DEFAULT_TOKEN_URL)
    }
}

impl Endpoints {
    pub fn new(api_base: &str, token_url: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
        }
    }

    pub fn account(&self) -> String {
        format!("{}/account", self.api_base)
    }

    /// The single catalog owned by the authenticated account.
    pub fn catalog(&self) -> String {
        format!("{}/catalog", self.api_base)
    }

    pub fn albums(&self, catalog_id: &str) -> String {
        format!("{}/catalogs/{}/albums", self.api_base, catalog_id)
    }

    pub fn asset(&self, catalog_id: &str, asset_id: &str) -> String {
        format!("{}/catalogs/{}/assets/{}", self.api_base, catalog_id, asset_id)
    }

    pub fn asset_master(&self, catalog_id: &str, asset_id: &str) -> String {
        format!("{}/master", self.asset(catalog_id, asset_id))
    }

    pub fn album_assets(&self, catalog_id: &str, album_id: &str) -> String {
        format!(
            "{}/catalogs/{}/albums/{}/assets",
            self.api_base, catalog_id, album_id
        )
    }
}
