//! Tests for the `build` command

use crate::helpers::*;
use anyhow::Result;

fn build_args(extra: &[&'static str]) -> Vec<&'static str> {
  let mut args = vec!["build"];
  args.extend(build_flags());
  args.extend(extra);
  args
}

#[test]
fn test_build_publishes_dualstream_release() -> Result<()> {
  let env = TestEnv::new()?;

  let output = env.run_ok(&build_args(&[]))?;
  assert!(stdout(&output).contains("Dualstream release published"));

  let image_refs: serde_json::Value = serde_json::from_str(&env.built_file("release-manifests/image-references")?)?;
  let names: Vec<&str> = image_refs["spec"]["tags"]
    .as_array()
    .unwrap()
    .iter()
    .map(|t| t["name"].as_str().unwrap())
    .collect();
  assert_eq!(
    names,
    [
      "cluster-version-operator",
      "rhel-coreos",
      "rhel-coreos-extensions",
      "rhel-coreos-10",
      "rhel-coreos-10-extensions",
      "zz-other"
    ]
  );

  let tags = image_refs["spec"]["tags"].as_array().unwrap();
  assert_eq!(tags[1]["annotations"]["io.openshift.os.streamclass"], "rhel-9");
  assert_eq!(tags[3]["from"]["name"], OS_IMAGE);
  assert_eq!(tags[3]["annotations"]["io.openshift.os.streamclass"], "rhel-10");
  assert_eq!(tags[3]["annotations"]["io.openshift.build.commit.ref"], "");
  assert_eq!(tags[4]["from"]["name"], EXT_IMAGE);
  assert_eq!(tags[4]["annotations"]["io.openshift.build.commit.id"], "ext123");
  // Unmodelled document fields survive
  assert_eq!(image_refs["spec"]["lookupPolicy"]["local"], false);

  let metadata: serde_json::Value = serde_json::from_str(&env.built_file("release-manifests/release-metadata")?)?;
  assert_eq!(metadata["version"], "4.19.0-dualstream");
  assert!(
    env
      .built_file("release-manifests/0000_00_cluster-version-operator_30_deployment.yaml")?
      .contains("\"4.19.0-dualstream\"")
  );
  assert_eq!(
    env.built_file("Containerfile")?,
    format!("FROM {}\nCOPY /release-manifests /release-manifests", CVO_IMAGE)
  );

  assert!(env.tmp_is_empty()?, "staging directory should be removed");
  Ok(())
}

#[test]
fn test_build_passes_credentials_to_each_tool() -> Result<()> {
  let env = TestEnv::new()?;
  env.run_ok(&build_args(&[]))?;

  let calls = env.calls()?;
  let expected = [
    format!("oc adm release info --registry-config /run/secrets/src.json -o=json {}", BASE_RELEASE),
    format!("podman pull --authfile /run/secrets/src.json {}", BASE_RELEASE),
    format!("skopeo inspect --authfile /run/secrets/src.json --no-tags docker://{}", OS_IMAGE),
    format!("skopeo inspect --authfile /run/secrets/src.json --no-tags docker://{}", EXT_IMAGE),
    format!("podman push --authfile /run/secrets/dst.json {}", FINAL_RELEASE),
  ];
  for call in &expected {
    assert!(calls.contains(call), "missing call {:?} in {:#?}", call, calls);
  }

  let build = calls.iter().find(|c| c.starts_with("podman build")).unwrap();
  assert!(build.starts_with(&format!("podman build --authfile /run/secrets/src.json -t {}", FINAL_RELEASE)));

  // Extractor container is created and removed again
  assert!(calls.iter().any(|c| c.starts_with("podman container create --name release-payload-extractor-")));
  assert!(calls.iter().any(|c| c.starts_with("podman container rm release-payload-extractor-")));

  let push_pos = calls.iter().position(|c| c.starts_with("podman push")).unwrap();
  let build_pos = calls.iter().position(|c| c.starts_with("podman build")).unwrap();
  assert!(build_pos < push_pos);
  Ok(())
}

#[test]
fn test_build_json_report() -> Result<()> {
  let env = TestEnv::new()?;
  let output = env.run_ok(&build_args(&["--json"]))?;

  let report: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  assert_eq!(report["published"], true);
  assert_eq!(report["dry_run"], false);
  assert_eq!(report["base_version"], "4.19.0");
  assert_eq!(report["release_version"], "4.19.0-dualstream");
  assert_eq!(report["component_image"], CVO_IMAGE);
  assert_eq!(report["insertion"]["insert_point"], 3);
  assert_eq!(report["insertion"]["defaulted_streamclass"], true);
  assert_eq!(
    report["changed_files"],
    serde_json::json!([
      "/release-manifests/0000_00_cluster-version-operator_30_deployment.yaml",
      "/release-manifests/image-references",
      "/release-manifests/release-metadata"
    ])
  );
  Ok(())
}

#[test]
fn test_build_dry_run_does_not_publish() -> Result<()> {
  let env = TestEnv::new()?;
  let output = env.run_ok(&build_args(&["--dry-run"]))?;

  assert!(stdout(&output).contains("Dry-run mode"));
  assert!(!env.called("podman build")?);
  assert!(!env.called("podman push")?);
  assert!(env.tmp_is_empty()?);
  Ok(())
}

#[test]
fn test_build_failure_skips_push() -> Result<()> {
  let mut env = TestEnv::new()?;
  env.fail_on("build");

  let before = env.payload_file("release-metadata")?;
  let output = env.run(&build_args(&[]))?;

  assert_eq!(output.status.code(), Some(2));
  assert!(stderr(&output).contains("[build-image]"));
  assert!(stderr(&output).contains("Nothing was pushed"));
  assert!(!env.called("podman push")?);
  assert_eq!(env.payload_file("release-metadata")?, before);
  assert!(env.tmp_is_empty()?);
  Ok(())
}

#[test]
fn test_push_failure_reports_unknown_state() -> Result<()> {
  let mut env = TestEnv::new()?;
  env.fail_on("push");

  let output = env.run(&build_args(&[]))?;

  assert_eq!(output.status.code(), Some(2));
  assert!(stderr(&output).contains("[push-image]"));
  assert!(stderr(&output).contains(&format!("The state of {} is unknown", FINAL_RELEASE)));
  Ok(())
}

#[test]
fn test_copy_failure_still_removes_container() -> Result<()> {
  let mut env = TestEnv::new()?;
  env.fail_on("cp");

  let output = env.run(&build_args(&[]))?;

  assert_eq!(output.status.code(), Some(2));
  assert!(stderr(&output).contains("[stage-files]"));
  assert!(env.called("podman container rm release-payload-extractor-")?);
  assert!(!env.called("skopeo")?);
  assert!(env.tmp_is_empty()?);
  Ok(())
}

#[test]
fn test_inspection_failure_names_stage() -> Result<()> {
  let mut env = TestEnv::new()?;
  env.fail_on("skopeo");

  let output = env.run(&build_args(&[]))?;

  assert_eq!(output.status.code(), Some(2));
  assert!(stderr(&output).contains("[build-substitute-refs]"));
  assert!(stderr(&output).contains(OS_IMAGE));
  assert!(!env.called("podman build")?);
  Ok(())
}

#[test]
fn test_release_info_failure_stops_early() -> Result<()> {
  let mut env = TestEnv::new()?;
  env.fail_on("oc");

  let output = env.run(&build_args(&[]))?;

  assert_eq!(output.status.code(), Some(2));
  assert!(stderr(&output).contains("[fetch-base-info]"));
  assert!(stderr(&output).contains("unable to read image"));
  assert!(!env.called("podman")?);
  Ok(())
}

#[test]
fn test_missing_binary_is_validation_error() -> Result<()> {
  let env = TestEnv::new()?;
  env.remove_tool("skopeo")?;

  // Keep system dirs off PATH so a real skopeo cannot be found
  let output = std::process::Command::new(env!("CARGO_BIN_EXE_dualstream-release-builder"))
    .current_dir(&env.work)
    .args(build_args(&[]))
    .env("PATH", &env.bin)
    .env("FAKE_ROOT", &env.path)
    .output()?;

  assert_eq!(output.status.code(), Some(3));
  assert!(stderr(&output).contains("could not find required binary 'skopeo'"));
  assert!(env.calls()?.is_empty());
  Ok(())
}
