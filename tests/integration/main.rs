//! Integration tests for querykit

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    /// Command isolated from the user's real config file
    fn querykit(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("querykit");
        cmd.env("QUERYKIT_CONFIG", temp.path().join("config.toml"));
        cmd
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        querykit(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("energy gate"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        querykit(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("querykit"));
    }

    #[test]
    fn text_truncate() {
        let temp = TempDir::new().unwrap();
        querykit(&temp)
            .args(["text", "truncate", "hello world", "--length", "8"])
            .assert()
            .success()
            .stdout("hello...\n");
    }

    #[test]
    fn text_emoji_json() {
        let temp = TempDir::new().unwrap();
        querykit(&temp)
            .args(["text", "emoji", "🎉 🎉", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"only_emoji\": true"))
            .stdout(predicate::str::contains("\"amount\": 2"));
    }

    #[test]
    fn text_email() {
        let temp = TempDir::new().unwrap();
        querykit(&temp)
            .args(["text", "email", "not-an-email"])
            .assert()
            .success()
            .stdout("false\n");
    }

    #[test]
    fn gate_identity_switch_resolves_both_waits() {
        let temp = TempDir::new().unwrap();
        querykit(&temp)
            .args(["gate", "--address", "alice", "--format", "plain", "addr:bob", "energy:5"])
            .assert()
            .success()
            .stdout("0 alice true\n1 bob true\n");
    }

    #[test]
    fn gate_next_transition_keeps_late_wait_pending() {
        let temp = TempDir::new().unwrap();
        querykit(&temp)
            .args([
                "gate", "-a", "alice", "-f", "plain", "energy:5", "addr:bob", "energy:5",
            ])
            .assert()
            .success()
            .stdout("0 alice true\n1 bob false\n");
    }

    #[test]
    fn gate_resolve_if_ready_policy() {
        let temp = TempDir::new().unwrap();
        querykit(&temp)
            .args([
                "gate",
                "-a",
                "alice",
                "-f",
                "plain",
                "--policy",
                "resolve-if-ready",
                "energy:5",
                "addr:bob",
            ])
            .assert()
            .success()
            .stdout("0 alice true\n1 bob true\n");
    }

    #[test]
    fn gate_invalid_step() {
        let temp = TempDir::new().unwrap();
        querykit(&temp)
            .args(["gate", "sideways"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid gate step"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        querykit(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        querykit(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[query]"));
    }

    #[test]
    fn config_set_then_gate_uses_policy() {
        let temp = TempDir::new().unwrap();
        querykit(&temp)
            .args(["config", "set", "gate.policy", "resolve-if-ready"])
            .assert()
            .success();

        querykit(&temp)
            .args(["gate", "-a", "alice", "-f", "plain", "energy:5", "addr:bob"])
            .assert()
            .success()
            .stdout("0 alice true\n1 bob true\n");
    }

    #[test]
    fn config_set_unknown_key() {
        let temp = TempDir::new().unwrap();
        querykit(&temp)
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }
}
