//! Integration tests driving the compiled binary against fake oc/podman/skopeo

#![cfg(unix)]

mod helpers;
mod test_build;
