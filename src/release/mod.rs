//! Release payload reassembly
//!
//! A release payload image is the cluster-version-operator image plus a
//! `/release-manifests` directory. A dualstream release is produced by copying
//! that directory out of a base release, adding the RHEL 10 OS images to its
//! `image-references`, re-versioning every file, and building the result on
//! top of the same operator image.
//!
//! - **imagestream**: serde model of `image-references`
//! - **labels**: substitute images and tag references built from their labels
//! - **manifest**: marker scan and tag insertion
//! - **version**: version derivation and tree-wide propagation
//! - **staging**: scoped working directory and its layout
//! - **info**: `oc adm release info` record
//! - **assembler**: the end-to-end pipeline

pub mod assembler;
pub mod imagestream;
pub mod info;
pub mod labels;
pub mod manifest;
pub mod staging;
pub mod version;
