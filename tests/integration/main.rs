//! Integration tests for gistpipe

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Command with its config isolated under `home`
    fn gistpipe(home: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("gistpipe");
        cmd.env("GISTPIPE_CONFIG", home.join("config.toml"))
            .env_remove("GISTPIPE_TOKEN");
        cmd
    }

    fn write_project(root: &Path) {
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(
            root.join("index.html"),
            "<!DOCTYPE html><html><body><script src=\"/dist/entry-bundle.js\"></script></body></html>",
        )
        .unwrap();
        fs::write(root.join("src/main.js"), "export function main() { return 1; }").unwrap();
        fs::write(root.join("src/app.js"), "export class App {}").unwrap();
        fs::write(root.join("src/app.html"), "<h1>${message}</h1>").unwrap();
        fs::write(root.join("src/app.scss"), "h1 { color: red; }").unwrap();
        fs::write(root.join("package.json"), r#"{"dependencies": {"vue": "^2.6.0"}}"#).unwrap();
    }

    #[test]
    fn help_displays() {
        let home = TempDir::new().unwrap();
        gistpipe(home.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("incremental build pipeline"));
    }

    #[test]
    fn version_displays() {
        let home = TempDir::new().unwrap();
        gistpipe(home.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("gistpipe"));
    }

    #[test]
    fn config_path() {
        let home = TempDir::new().unwrap();
        gistpipe(home.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let home = TempDir::new().unwrap();
        gistpipe(home.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[bundler]"))
            .stdout(predicate::str::contains("entry-bundle"));
    }

    #[test]
    fn config_init_then_set() {
        let home = TempDir::new().unwrap();
        gistpipe(home.path())
            .args(["config", "init"])
            .assert()
            .success();
        assert!(home.path().join("config.toml").exists());

        gistpipe(home.path())
            .args(["config", "set", "cache.timeout_secs", "3"])
            .assert()
            .success();

        gistpipe(home.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("timeout_secs = 3"));
    }

    #[test]
    fn config_set_rejects_bad_value() {
        let home = TempDir::new().unwrap();
        gistpipe(home.path())
            .args(["config", "set", "cache.timeout_secs", "soon"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn invalid_config_shows_hint() {
        let home = TempDir::new().unwrap();
        fs::write(home.path().join("config.toml"), "[cache]\ntimeout_secs = \"soon\"\n").unwrap();

        gistpipe(home.path())
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn cache_path_honours_config() {
        let home = TempDir::new().unwrap();
        let units = home.path().join("units");
        fs::write(
            home.path().join("config.toml"),
            format!("[cache]\ndir = {:?}\n", units.display().to_string()),
        )
        .unwrap();

        gistpipe(home.path())
            .args(["cache", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("units"));
    }

    #[test]
    fn build_offline_writes_preview() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write_project(project.path());
        let out = project.path().join("out");

        gistpipe(home.path())
            .arg("build")
            .arg(project.path())
            .arg("--out")
            .arg(&out)
            .args(["--offline", "--no-cache"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Built dist/entry-bundle.js"));

        let index = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(index.contains("/dist/entry-bundle.js"));

        let bundle = fs::read_to_string(out.join("dist/entry-bundle.js")).unwrap();
        assert!(bundle.contains("define(\"main\""));
        assert!(bundle.contains("define(\"app.html\""));
        assert!(bundle.contains("define(\"text!app.css\""));
        assert!(bundle.contains("requirejs.config("));
        assert!(bundle.contains("vue@^2.6.0/dist/vue"));
    }

    #[test]
    fn build_reports_transpile_errors() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write_project(project.path());
        fs::write(project.path().join("src/theme.sass"), "a\n  b: c").unwrap();

        gistpipe(home.path())
            .arg("build")
            .arg(project.path())
            .args(["--offline", "--no-cache"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("src/theme.sass"));
    }

    #[test]
    fn build_missing_dir() {
        let home = TempDir::new().unwrap();
        gistpipe(home.path())
            .args(["build", "/nonexistent/gistpipe-project", "--offline", "--no-cache"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Path not found"));
    }
}
