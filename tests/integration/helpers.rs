//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const BASE_RELEASE: &str = "quay.io/openshift-release-dev/ocp-release:4.19.0-x86_64";
pub const OS_IMAGE: &str = "quay.io/org/rhel-coreos-10:latest";
pub const EXT_IMAGE: &str = "quay.io/org/rhel-coreos-10-extensions:latest";
pub const FINAL_RELEASE: &str = "quay.io/org/ocp-release:4.19.0-dualstream";
pub const CVO_IMAGE: &str = "quay.io/ocp@sha256:cvo";

/// `oc adm release info -o=json` output
const FAKE_OC: &str = r#"#!/bin/sh
echo "oc $*" >> "$FAKE_ROOT/calls.log"
if [ "$FAKE_FAIL" = "oc" ]; then
  echo "error: unable to read image" >&2
  exit 1
fi
cat "$FAKE_ROOT/release-info.json"
"#;

/// `skopeo inspect ... docker://IMAGE`; labels depend on the image name
const FAKE_SKOPEO: &str = r#"#!/bin/sh
echo "skopeo $*" >> "$FAKE_ROOT/calls.log"
if [ "$FAKE_FAIL" = "skopeo" ]; then
  echo "manifest unknown" >&2
  exit 1
fi
for last; do :; done
case "$last" in
  *extensions*) echo '{"Name":"ext","Labels":{"io.openshift.build.commit.id":"ext123"}}' ;;
  *) echo '{"Name":"os","Labels":{"io.openshift.build.commit.id":"os123","io.openshift.os.streamclass":"rhel-10"}}' ;;
esac
"#;

/// pull/create/rm are no-ops; cp copies the payload fixture; build snapshots its context
const FAKE_PODMAN: &str = r#"#!/bin/sh
echo "podman $*" >> "$FAKE_ROOT/calls.log"
for last; do :; done
case "$1" in
  container)
    if [ "$2" = "cp" ]; then
      if [ "$FAKE_FAIL" = "cp" ]; then exit 1; fi
      cp -R "$FAKE_ROOT/payload/release-manifests" "$4" || exit 1
    fi
    ;;
  build)
    if [ "$FAKE_FAIL" = "build" ]; then
      echo "STEP 1/2: FROM failed" >&2
      exit 1
    fi
    mkdir -p "$FAKE_ROOT/built"
    cp -R "$last/." "$FAKE_ROOT/built/" || exit 1
    ;;
  push)
    if [ "$FAKE_FAIL" = "push" ]; then exit 1; fi
    ;;
esac
exit 0
"#;

const RELEASE_INFO: &str = r#"{
  "image": "quay.io/openshift-release-dev/ocp-release:4.19.0-x86_64",
  "digest": "sha256:aaaa",
  "config": {"architecture": "amd64"},
  "metadata": {"kind": "cincinnati-metadata-v0", "version": "4.19.0"},
  "references": {
    "kind": "ImageStream",
    "apiVersion": "image.openshift.io/v1",
    "metadata": {"name": "4.19.0"},
    "spec": {"tags": [
      {"name": "cluster-version-operator", "from": {"kind": "DockerImage", "name": "quay.io/ocp@sha256:cvo"}},
      {"name": "rhel-coreos", "from": {"kind": "DockerImage", "name": "quay.io/ocp@sha256:os"}},
      {"name": "rhel-coreos-extensions", "from": {"kind": "DockerImage", "name": "quay.io/ocp@sha256:ext"}}
    ]}
  },
  "displayVersions": {"machine-os": {"Version": "9.6.20250611-0", "DisplayName": "Red Hat Enterprise Linux CoreOS"}}
}"#;

const IMAGE_REFERENCES: &str = r#"{"kind":"ImageStream","apiVersion":"image.openshift.io/v1","metadata":{"name":"4.19.0","creationTimestamp":null},"spec":{"lookupPolicy":{"local":false},"tags":[
{"name":"cluster-version-operator","annotations":{},"from":{"kind":"DockerImage","name":"quay.io/ocp@sha256:cvo"}},
{"name":"rhel-coreos","annotations":{"io.openshift.build.commit.id":"rhel9"},"from":{"kind":"DockerImage","name":"quay.io/ocp@sha256:os"}},
{"name":"rhel-coreos-extensions","annotations":{},"from":{"kind":"DockerImage","name":"quay.io/ocp@sha256:ext"}},
{"name":"zz-other","annotations":{},"from":{"kind":"DockerImage","name":"quay.io/ocp@sha256:other"}}
]}}"#;

/// Scratch environment: fake tools on PATH, a base release payload and a working directory
pub struct TestEnv {
  _root: TempDir,
  pub path: PathBuf,
  pub work: PathBuf,
  pub bin: PathBuf,
  pub tmp: PathBuf,
  fail: Option<String>,
}

impl TestEnv {
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();
    let work = path.join("work");
    let bin = path.join("bin");
    let tmp = path.join("tmp");
    let manifests = path.join("payload/release-manifests");

    for dir in [&work, &bin, &tmp, &manifests] {
      fs::create_dir_all(dir)?;
    }

    write_script(&bin.join("oc"), FAKE_OC)?;
    write_script(&bin.join("skopeo"), FAKE_SKOPEO)?;
    write_script(&bin.join("podman"), FAKE_PODMAN)?;

    fs::write(path.join("release-info.json"), RELEASE_INFO)?;
    fs::write(manifests.join("image-references"), IMAGE_REFERENCES)?;
    fs::write(
      manifests.join("release-metadata"),
      r#"{"kind":"cincinnati-metadata-v0","version":"4.19.0","previous":["4.18.17"]}"#,
    )?;
    fs::write(
      manifests.join("0000_00_cluster-version-operator_30_deployment.yaml"),
      "env:\n- name: RELEASE_VERSION\n  value: \"4.19.0\"\n",
    )?;
    fs::write(manifests.join("0000_50_console_configmap.yaml"), "kind: ConfigMap\n")?;

    Ok(Self {
      _root: root,
      path,
      work,
      bin,
      tmp,
      fail: None,
    })
  }

  /// Make one fake tool step exit non-zero (`oc`, `skopeo`, `cp`, `build`, `push`)
  pub fn fail_on(&mut self, step: &str) {
    self.fail = Some(step.to_string());
  }

  pub fn remove_tool(&self, name: &str) -> Result<()> {
    fs::remove_file(self.bin.join(name)).with_context(|| format!("Failed to remove fake {}", name))
  }

  /// Run the binary; does not check the exit status
  pub fn run(&self, args: &[&str]) -> Result<Output> {
    let bin = env!("CARGO_BIN_EXE_dualstream-release-builder");

    Command::new(bin)
      .current_dir(&self.work)
      .args(args)
      .env("PATH", format!("{}:/usr/bin:/bin", self.bin.display()))
      .env("TMPDIR", &self.tmp)
      .env("FAKE_ROOT", &self.path)
      .env("FAKE_FAIL", self.fail.as_deref().unwrap_or(""))
      .env("RUST_LOG", "info")
      .env("NO_COLOR", "1")
      .output()
      .context("Failed to run dualstream-release-builder")
  }

  /// Run the binary and fail the test on a non-zero exit
  pub fn run_ok(&self, args: &[&str]) -> Result<Output> {
    let output = self.run(args)?;
    if !output.status.success() {
      anyhow::bail!(
        "dualstream-release-builder {} failed\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
      );
    }
    Ok(output)
  }

  /// Fake tool invocations, in order
  pub fn calls(&self) -> Result<Vec<String>> {
    let log = self.path.join("calls.log");
    if !log.exists() {
      return Ok(Vec::new());
    }
    Ok(fs::read_to_string(log)?.lines().map(String::from).collect())
  }

  pub fn called(&self, prefix: &str) -> Result<bool> {
    Ok(self.calls()?.iter().any(|c| c.starts_with(prefix)))
  }

  /// Read a file from the context the fake `podman build` received
  pub fn built_file(&self, rel: &str) -> Result<String> {
    Ok(fs::read_to_string(self.path.join("built").join(rel))?)
  }

  pub fn payload_file(&self, rel: &str) -> Result<String> {
    Ok(fs::read_to_string(self.path.join("payload/release-manifests").join(rel))?)
  }

  /// True when no staging directory was left behind
  pub fn tmp_is_empty(&self) -> Result<bool> {
    Ok(fs::read_dir(&self.tmp)?.next().is_none())
  }
}

/// Full set of build flags pointing at the fixture images
pub fn build_flags() -> Vec<&'static str> {
  vec![
    "--base-release",
    BASE_RELEASE,
    "--rhel10-pullspec",
    OS_IMAGE,
    "--rhel10-ext-pullspec",
    EXT_IMAGE,
    "--final-release-pullspec",
    FINAL_RELEASE,
    "--src-authfile",
    "/run/secrets/src.json",
    "--dst-authfile",
    "/run/secrets/dst.json",
  ]
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_script(path: &Path, contents: &str) -> Result<()> {
  fs::write(path, contents)?;
  fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
  Ok(())
}
