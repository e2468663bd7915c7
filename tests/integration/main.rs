//! Integration tests for offcache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::path::PathBuf;
    use std::thread;
    use tempfile::TempDir;

    fn offcache() -> Command {
        let mut cmd = cargo_bin_cmd!("offcache");
        cmd.env_remove("OFFCACHE_CONFIG").env_remove("OFFCACHE_LOG");
        for var in ["HTTP_PROXY", "http_proxy", "HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"] {
            cmd.env_remove(var);
        }
        cmd
    }

    /// A scratch directory holding a config file and a bucket root
    struct Site {
        dir: TempDir,
        origin: String,
        manifest: String,
    }

    impl Site {
        fn new(cache_section: &str) -> Self {
            Self::serving("https://blog.example.com", "", cache_section)
        }

        fn serving(origin: &str, manifest_section: &str, cache_section: &str) -> Self {
            let site = Self {
                dir: TempDir::new().unwrap(),
                origin: origin.to_string(),
                manifest: manifest_section.to_string(),
            };
            site.write_config(cache_section);
            site
        }

        fn config_path(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        fn write_config(&self, cache_section: &str) {
            let buckets = self.dir.path().join("buckets");
            let content = format!(
                "[site]\norigin = \"{}\"\n\n[manifest]\n{}\n\n[cache]\ndir = '{}'\n{}\n",
                self.origin,
                self.manifest,
                buckets.display(),
                cache_section
            );
            std::fs::write(self.config_path(), content).unwrap();
        }

        fn cmd(&self) -> Command {
            let mut cmd = offcache();
            cmd.current_dir(self.dir.path())
                .arg("--no-local")
                .arg("-c")
                .arg(self.config_path());
            cmd
        }
    }

    /// Serve `content of <path>` with 200 for every request on loopback
    fn serve_site() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let origin = format!("http://{}", listener.local_addr().unwrap());

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let Ok(read_half) = stream.try_clone() else { continue };
                let mut reader = BufReader::new(read_half);

                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) | Err(_) => break,
                        Ok(_) if line == "\r\n" => break,
                        Ok(_) => {}
                    }
                }

                let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                let body = format!("content of {}", path);
                let _ = write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
            }
        });

        origin
    }

    fn stdout_of(cmd: &mut Command) -> String {
        let output = cmd.output().unwrap();
        assert!(output.status.success(), "command failed: {:?}", output);
        String::from_utf8(output.stdout).unwrap()
    }

    #[test]
    fn help_displays() {
        offcache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Offline asset cache"));
    }

    #[test]
    fn version_displays() {
        offcache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("offcache"));
    }

    #[test]
    fn name_uses_date_policy_by_default() {
        let site = Site::new("");
        site.cmd()
            .arg("name")
            .assert()
            .success()
            .stdout(predicate::str::is_match(r"^\d{1,2}-\d{1,2}\n$").unwrap());
    }

    #[test]
    fn name_uses_build_stamp() {
        let site = Site::new("policy = \"build\"\nprefix = \"site\"\nbuild_stamp = \"20240601.120000\"");
        site.cmd()
            .arg("name")
            .assert()
            .success()
            .stdout("site-20240601.120000\n");
    }

    #[test]
    fn build_policy_without_stamp_fails_with_hint() {
        let site = Site::new("policy = \"build\"");
        site.cmd()
            .arg("name")
            .assert()
            .failure()
            .stderr(predicate::str::contains("cache.build_stamp"))
            .stderr(predicate::str::contains("offcache stamp --write"));
    }

    #[test]
    fn stamp_prints_timestamp() {
        offcache()
            .args(["--no-local", "stamp"])
            .assert()
            .success()
            .stdout(predicate::str::is_match(r"^\d{8}\.\d{6}\n$").unwrap());
    }

    #[test]
    fn stamp_write_feeds_build_policy() {
        let site = Site::new("policy = \"build\"\nprefix = \"site\"");
        site.cmd().args(["stamp", "--write"]).assert().success();

        site.cmd()
            .arg("name")
            .assert()
            .success()
            .stdout(predicate::str::is_match(r"^site-\d{8}\.\d{6}\n$").unwrap());

        let content = std::fs::read_to_string(site.config_path()).unwrap();
        assert!(content.contains("https://blog.example.com"));
    }

    #[test]
    fn missing_config_file_fails_with_hint() {
        let temp = TempDir::new().unwrap();
        offcache()
            .args(["--no-local", "-c"])
            .arg(temp.path().join("absent.toml"))
            .arg("name")
            .assert()
            .failure()
            .stderr(predicate::str::contains("offcache config init"));
    }

    #[test]
    fn config_init_creates_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        offcache()
            .args(["--no-local", "-c"])
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[cache]"));
    }

    #[test]
    fn config_path_shows_selected_file() {
        let site = Site::new("");
        site.cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let site = Site::new("");
        site.cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("https://blog.example.com"));
    }

    #[test]
    fn local_config_overrides_global() {
        let site = Site::new("policy = \"build\"\nprefix = \"global\"\nbuild_stamp = \"20240601.120000\"");
        let project = site.dir.path().join("blog");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(project.join(".offcache.toml"), "[cache]\nprefix = \"local\"\n").unwrap();

        offcache()
            .current_dir(&project)
            .arg("-c")
            .arg(site.config_path())
            .arg("name")
            .assert()
            .success()
            .stdout("local-20240601.120000\n");
    }

    #[test]
    fn list_empty_json() {
        let site = Site::new("");
        site.cmd()
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout("[]\n");
    }

    #[test]
    fn fetch_relative_url_without_origin_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[general]\nlog_format = \"text\"\n").unwrap();

        offcache()
            .args(["--no-local", "-c"])
            .arg(&path)
            .args(["fetch", "/a.css"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("site.origin"));
    }

    #[test]
    fn fetch_output_requires_single_url() {
        let site = Site::new("");
        site.cmd()
            .args(["fetch", "/a.css", "/b.js", "--output", "out.bin"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("exactly one URL"));
    }

    fn bucket_names(site: &Site) -> Vec<String> {
        stdout_of(site.cmd().args(["list", "--format", "plain"]))
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn build_section(stamp: &str) -> String {
        format!(
            "policy = \"build\"\nprefix = \"site\"\nbuild_stamp = \"{}\"",
            stamp
        )
    }

    #[test]
    fn install_with_empty_manifest_creates_current_bucket() {
        let site = Site::new(&build_section("20240601.120000"));
        site.cmd().arg("install").assert().success();

        assert_eq!(bucket_names(&site), vec!["site-20240601.120000"]);
        site.cmd()
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"current\": true"));
    }

    #[test]
    fn activate_purges_previous_deployment() {
        let site = Site::new(&build_section("20240601.120000"));
        site.cmd().args(["install", "--no-activate"]).assert().success();

        site.write_config(&build_section("20240602.080000"));
        site.cmd().args(["install", "--no-activate"]).assert().success();
        assert_eq!(
            bucket_names(&site),
            vec!["site-20240601.120000", "site-20240602.080000"]
        );

        site.cmd().arg("activate").assert().success();
        assert_eq!(bucket_names(&site), vec!["site-20240602.080000"]);
    }

    #[test]
    fn fetch_after_install_serves_from_cache() {
        let origin = serve_site();
        let site = Site::serving(
            &origin,
            "include = [\"/a.css\"]\nexclude = [\"/data/\"]",
            &build_section("20240601.120000"),
        );
        site.cmd().arg("install").assert().success();

        site.cmd()
            .args(["fetch", "/a.css"])
            .assert()
            .success()
            .stdout(predicate::str::contains("hit in site-20240601.120000"));

        site.cmd()
            .args(["fetch", "/c.js"])
            .assert()
            .success()
            .stdout(predicate::str::contains("miss, stored"));

        let out = site.dir.path().join("c.js");
        site.cmd()
            .args(["fetch", "/c.js", "--output"])
            .arg(&out)
            .assert()
            .success()
            .stdout(predicate::str::contains("hit in site-20240601.120000"));
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "content of /c.js");

        site.cmd()
            .args(["fetch", "/data/feed.json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("miss, not stored"));
    }
}
