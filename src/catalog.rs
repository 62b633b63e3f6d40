//! Asset catalog integration.
//!
//! [`AssetCatalog`] is the seam for registering extracted frames with an
//! external asset manager. With the `catalog` feature enabled,
//! [`EagleCatalog`] implements it against the local HTTP API of the Eagle
//! desktop app.

use std::path::Path;

use crate::error::StillshotError;
use crate::extractor::ExtractionResult;

/// An external catalog that organises images into folders.
pub trait AssetCatalog {
    /// Create a folder and return its identifier.
    fn create_folder(&self, name: &str) -> Result<String, StillshotError>;

    /// Add one file to a folder.
    fn add_item(
        &self,
        path: &Path,
        label: &str,
        source_url: &str,
        folder_id: &str,
    ) -> Result<(), StillshotError>;

    /// Add many extraction results to a folder.
    ///
    /// The default adds them one at a time; implementations with a batch
    /// endpoint should override it.
    fn add_items(
        &self,
        results: &[ExtractionResult],
        folder_id: &str,
    ) -> Result<(), StillshotError> {
        results.iter().try_for_each(|result| {
            self.add_item(&result.image_path, &result.label, &result.source_url, folder_id)
        })
    }
}

#[cfg(feature = "catalog")]
pub use eagle::{DEFAULT_EAGLE_URL, EagleCatalog};

#[cfg(feature = "catalog")]
mod eagle {
    use std::path::Path;
    use std::time::Duration;

    use reqwest::blocking::Client;
    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::AssetCatalog;
    use crate::error::StillshotError;
    use crate::extractor::ExtractionResult;

    /// Where Eagle listens by default.
    pub const DEFAULT_EAGLE_URL: &str = "http://localhost:41595";

    #[derive(Debug, Deserialize)]
    struct EagleResponse {
        status: String,
        #[serde(default)]
        data: Option<Value>,
    }

    /// Client for the Eagle app's local API.
    ///
    /// ```no_run
    /// use stillshot::{AssetCatalog, EagleCatalog};
    ///
    /// let eagle = EagleCatalog::new()?;
    /// let folder = eagle.create_folder("Conference talk")?;
    /// # Ok::<(), stillshot::StillshotError>(())
    /// ```
    #[derive(Debug, Clone)]
    pub struct EagleCatalog {
        client: Client,
        base_url: String,
    }

    impl EagleCatalog {
        /// Connect to Eagle on its default port.
        pub fn new() -> Result<Self, StillshotError> {
            Self::with_base_url(DEFAULT_EAGLE_URL)
        }

        /// Connect to Eagle at `base_url`.
        pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, StillshotError> {
            let client = Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .map_err(|error| StillshotError::Catalog(error.to_string()))?;
            Ok(Self {
                client,
                base_url: base_url.into().trim_end_matches('/').to_string(),
            })
        }

        fn post(&self, endpoint: &str, body: Value) -> Result<Option<Value>, StillshotError> {
            let url = format!("{}{endpoint}", self.base_url);
            log::debug!("POST {url}");
            let response: EagleResponse = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .and_then(|response| response.error_for_status())
                .and_then(|response| response.json())
                .map_err(|error| StillshotError::Catalog(format!("{endpoint}: {error}")))?;

            if response.status != "success" {
                return Err(StillshotError::Catalog(format!(
                    "{endpoint} returned status {}",
                    response.status
                )));
            }
            Ok(response.data)
        }

        fn item_payload(result: &ExtractionResult) -> Value {
            json!({
                "path": result.image_path.to_string_lossy(),
                "name": result.label,
                "website": result.source_url,
                "tags": result.tags.clone().unwrap_or_default(),
                "annotation": result.annotation.clone().unwrap_or_default(),
            })
        }
    }

    impl AssetCatalog for EagleCatalog {
        fn create_folder(&self, name: &str) -> Result<String, StillshotError> {
            let data = self.post("/api/folder/create", json!({ "folderName": name }))?;
            data.as_ref()
                .and_then(|data| data.get("id"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    StillshotError::Catalog("folder creation returned no id".to_string())
                })
        }

        fn add_item(
            &self,
            path: &Path,
            label: &str,
            source_url: &str,
            folder_id: &str,
        ) -> Result<(), StillshotError> {
            self.post(
                "/api/item/addFromPath",
                json!({
                    "path": path.to_string_lossy(),
                    "name": label,
                    "website": source_url,
                    "folderId": folder_id,
                }),
            )
            .map(drop)
        }

        fn add_items(
            &self,
            results: &[ExtractionResult],
            folder_id: &str,
        ) -> Result<(), StillshotError> {
            let items: Vec<Value> = results.iter().map(Self::item_payload).collect();
            self.post(
                "/api/item/addFromPaths",
                json!({ "items": items, "folderId": folder_id }),
            )
            .map(drop)
        }
    }
}
