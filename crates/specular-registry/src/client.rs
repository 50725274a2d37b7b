//! Push/pull a Specular bundle as a single-layer OCI artifact.

use crate::error::classify;
use crate::media_types::{ARTIFACT_TYPE, BUNDLE_CONFIG_MEDIA_TYPE, BUNDLE_LAYER_MEDIA_TYPE};
use crate::reference::Reference;
use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::manifest::{OciDescriptor, OciImageManifest};
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, Reference as OciReference};
use specular_core::digest::digest_bytes;
use specular_core::{ErrorKind, Result, SpecularError};

/// Thin wrapper over `oci_distribution::Client` scoped to Specular's
/// single-layer artifact shape.
pub struct RegistryClient {
    client: Client,
    auth: RegistryAuth,
}

impl RegistryClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(ClientConfig {
                protocol: ClientProtocol::Https,
                ..Default::default()
            }),
            auth: RegistryAuth::Anonymous,
        }
    }

    pub fn with_credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client: Client::new(ClientConfig {
                protocol: ClientProtocol::Https,
                ..Default::default()
            }),
            auth: RegistryAuth::Basic(username.into(), password.into()),
        }
    }

    fn oci_reference(reference: &Reference) -> Result<OciReference> {
        let full = reference.to_string();
        full.parse()
            .map_err(|e| SpecularError::new(ErrorKind::InvalidReference, format!("'{full}' is not a valid OCI reference: {e}")))
    }

    /// Push `bundle_bytes` as the single layer of a Specular artifact at `reference`.
    pub async fn push(&self, reference: &Reference, bundle_bytes: Vec<u8>) -> Result<String> {
        let oci_ref = Self::oci_reference(reference)?;

        let layer_digest = format!("sha256:{}", digest_bytes(&bundle_bytes));
        let layer = OciDescriptor {
            media_type: BUNDLE_LAYER_MEDIA_TYPE.to_string(),
            digest: layer_digest.clone(),
            size: bundle_bytes.len() as i64,
            ..Default::default()
        };

        let config_bytes = b"{}".to_vec();
        let config_digest = format!("sha256:{}", digest_bytes(&config_bytes));
        let config = OciDescriptor {
            media_type: BUNDLE_CONFIG_MEDIA_TYPE.to_string(),
            digest: config_digest,
            size: config_bytes.len() as i64,
            ..Default::default()
        };

        let manifest = OciImageManifest {
            schema_version: 2,
            media_type: Some("application/vnd.oci.image.manifest.v1+json".to_string()),
            artifact_type: Some(ARTIFACT_TYPE.to_string()),
            config,
            layers: vec![layer],
            annotations: None,
        };

        self.client
            .push(
                &oci_ref,
                &[oci_distribution::client::ImageLayer {
                    data: bundle_bytes,
                    media_type: BUNDLE_LAYER_MEDIA_TYPE.to_string(),
                    annotations: None,
                }],
                oci_distribution::client::Config {
                    data: b"{}".to_vec(),
                    media_type: BUNDLE_CONFIG_MEDIA_TYPE.to_string(),
                    annotations: None,
                },
                &self.auth,
                Some(manifest),
            )
            .await
            .map_err(|e| classify(&e))?;

        Ok(layer_digest)
    }

    /// Pull the single bundle layer stored at `reference`, verifying its
    /// media type before returning the bytes.
    pub async fn pull(&self, reference: &Reference) -> Result<Vec<u8>> {
        let oci_ref = Self::oci_reference(reference)?;

        let image_data = self
            .client
            .pull(&oci_ref, &self.auth, vec![BUNDLE_LAYER_MEDIA_TYPE])
            .await
            .map_err(|e| classify(&e))?;

        let layer = image_data
            .layers
            .into_iter()
            .find(|l| l.media_type == BUNDLE_LAYER_MEDIA_TYPE)
            .ok_or_else(|| {
                SpecularError::new(
                    ErrorKind::InvalidBundle,
                    format!("'{reference}' has no layer of type '{BUNDLE_LAYER_MEDIA_TYPE}'"),
                )
            })?;

        Ok(layer.data)
    }

    /// Fetch only the manifest, to check artifact type and digests without downloading the bundle.
    pub async fn remote_manifest(&self, reference: &Reference) -> Result<OciImageManifest> {
        let oci_ref = Self::oci_reference(reference)?;
        let (manifest, _digest) = self
            .client
            .pull_manifest(&oci_ref, &self.auth)
            .await
            .map_err(|e| classify(&e))?;
        Ok(manifest)
    }
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}
