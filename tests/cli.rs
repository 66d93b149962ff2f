use assert_cmd::Command;
use predicates::prelude::*;

fn static_site(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("static-site").unwrap();
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .arg("--config").arg(dir.join("missing.toml"))
        .arg("--env-file").arg(dir.join("missing.env"));
    cmd
}

#[test]
fn synth_writes_templates_offline() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    static_site(dir.path())
        .args(["-c", "domain=example.com", "-c", "subdomain=www", "-c", "hosted_zone_id=Z123"])
        .arg("synth").arg("--output").arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("MyStaticSite.template.json"));

    let body = std::fs::read_to_string(out.join("MyStaticSite.template.json")).unwrap();
    let template: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(template["Resources"]["SiteBucket"]["Properties"]["BucketName"], "www.example.com");
    assert!(out.join("manifest.json").is_file());
}

#[test]
fn synth_splits_the_certificate_outside_us_east_1() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    static_site(dir.path())
        .args(["-c", "domain=example.com", "-c", "subdomain=www", "-c", "hosted_zone_id=Z123", "-c", "region=eu-west-1"])
        .arg("synth").arg("--output").arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("MyStaticSite-certificate.template.json"));
    assert!(out.join("MyStaticSite.template.json").is_file());
}

#[test]
fn config_file_supplies_context() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("static-site.toml");
    std::fs::write(&config, "[context]\ndomain = \"example.org\"\nsubdomain = \"docs\"\nhosted_zone_id = \"Z9\"\n").unwrap();
    let out = dir.path().join("out");
    Command::cargo_bin("static-site").unwrap()
        .current_dir(dir.path())
        .arg("--config").arg(&config)
        .arg("--env-file").arg(dir.path().join("missing.env"))
        .arg("synth").arg("--output").arg(&out)
        .assert()
        .success();
    let body = std::fs::read_to_string(out.join("MyStaticSite.template.json")).unwrap();
    assert!(body.contains("docs.example.org"));
}

#[test]
fn missing_domain_fails() {
    let dir = tempfile::tempdir().unwrap();
    static_site(dir.path())
        .args(["-c", "subdomain=www", "-c", "hosted_zone_id=Z123", "synth"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("domain"));
}

#[test]
fn errors_are_printed_with_logging_off() {
    let dir = tempfile::tempdir().unwrap();
    static_site(dir.path())
        .args(["--log-level", "off", "-c", "subdomain=www", "-c", "hosted_zone_id=Z123", "synth"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: Missing context value 'domain'"));
}

#[test]
fn malformed_context_pair_fails() {
    let dir = tempfile::tempdir().unwrap();
    static_site(dir.path())
        .args(["-c", "domain", "synth"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("key=value"));
}
