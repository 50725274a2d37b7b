//! OCI media type constants for the Specular artifact layout (§5 of the spec).

/// The artifact type recorded in the OCI manifest's `artifactType` field.
pub const ARTIFACT_TYPE: &str = "application/vnd.specular.bundle.v1";

/// Media type of the single compressed-tar layer holding the bundle bytes.
pub const BUNDLE_LAYER_MEDIA_TYPE: &str = "application/vnd.specular.bundle.layer.v1.tar+gzip";

/// Media type of the (near-empty) OCI config blob every artifact requires.
pub const BUNDLE_CONFIG_MEDIA_TYPE: &str = "application/vnd.specular.bundle.config.v1+json";
