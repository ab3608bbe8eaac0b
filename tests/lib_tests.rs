use clap::Parser;
use iearth::engine::arg_parser::Cli;
use iearth::engine::{
    apply_cli_to_settings, filter_catalog_paths, is_safe_file_name, is_safe_relative_path,
    normalize_filter, path_matches_filter, resolve_download_root, validate_endpoints,
};
use iearth::pipeline::{
    PipelineTuning, ProgressCounter, ThrottlePolicy, build_remote_key, format_success_rate,
    strip_log_prefix,
};
use iearth::remote::auth::parse_login_response;
use iearth::remote::catalog::CatalogNode;
use iearth::remote::http::rewrite_signed_url;
use iearth::remote::seal::{LOGIN_PUBLIC_KEY_PEM, parse_public_key, seal_json_with};
use iearth::remote::{AuthProvider, flatten_catalog, load_snapshot, save_snapshot};
use iearth::utils::tempfiles::part_path_for;
use iearth::utils::{apply_file_to_settings, expand_id_pattern, parse_settings_toml};
use iearth::{ApiEndpoints, CatalogSnapshot, CoordinatorOpts, RemoteFile, RunStats, Settings};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

// --- prefix filter ---

#[test]
fn test_filter_none_keeps_everything_in_order() {
    let paths = strings(&["B/1", "A/1", "A/2"]);
    assert_eq!(filter_catalog_paths(&paths, None), vec!["B/1", "A/1", "A/2"]);
}

#[test]
fn test_filter_blank_is_no_filter() {
    let paths = strings(&["A/1", "B/1"]);
    assert_eq!(filter_catalog_paths(&paths, Some("   ")).len(), 2);
    assert_eq!(normalize_filter(Some("")), None);
}

#[test]
fn test_filter_is_plain_prefix_not_component_aware() {
    let paths = strings(&["A/B/1", "A/B2/1", "AB/1", "C/A/B"]);
    assert_eq!(
        filter_catalog_paths(&paths, Some("A/B")),
        vec!["A/B/1", "A/B2/1"]
    );
    assert_eq!(
        filter_catalog_paths(&paths, Some("A")),
        vec!["A/B/1", "A/B2/1", "AB/1"]
    );
}

#[test]
fn test_filter_normalizes_backslashes_and_trims() {
    let paths = strings(&["MODISwater2001-2022/2008/001", "MODISwater2001-2022/2009/001"]);
    assert_eq!(
        filter_catalog_paths(&paths, Some("  MODISwater2001-2022\\2008 ")),
        vec!["MODISwater2001-2022/2008/001"]
    );
    assert!(path_matches_filter("A\\B\\c", "A/B"));
}

#[test]
fn test_filter_no_match_is_empty() {
    let paths = strings(&["A/1", "B/1"]);
    assert!(filter_catalog_paths(&paths, Some("Z")).is_empty());
}

// --- remote keys / completion log ---

#[test]
fn test_remote_key_layout() {
    assert_eq!(
        build_remote_key("shared-dataset", "MODIS", "2001/001", "a.tif"),
        "shared-dataset/MODIS/2001/001/a.tif"
    );
}

#[test]
fn test_strip_log_prefix_drops_namespace_and_type() {
    assert_eq!(
        strip_log_prefix("shared-dataset/MODIS/2001/001/a.tif"),
        "2001/001/a.tif"
    );
    assert_eq!(strip_log_prefix("ns/T/file"), "file");
}

#[test]
fn test_strip_log_prefix_short_keys_kept_whole() {
    assert_eq!(strip_log_prefix("ns/file"), "ns/file");
    assert_eq!(strip_log_prefix("file"), "file");
    assert_eq!(strip_log_prefix("a/b/"), "");
}

// --- tuning / throttle / counter / report ---

#[test]
fn test_tuning_queue_capacity_is_twice_workers() {
    assert_eq!(
        PipelineTuning::for_workers(5),
        PipelineTuning {
            num_workers: 5,
            queue_capacity: 10
        }
    );
    assert_eq!(PipelineTuning::for_workers(0).num_workers, 1);
    assert_eq!(PipelineTuning::for_workers(0).queue_capacity, 2);
}

#[test]
fn test_throttle_policy_boundaries() {
    let p = ThrottlePolicy {
        every: 50,
        interval: Duration::from_secs(5),
    };
    assert!(!p.should_pause(0));
    assert!(!p.should_pause(49));
    assert!(p.should_pause(50));
    assert!(!p.should_pause(51));
    assert!(p.should_pause(100));

    let off = ThrottlePolicy {
        every: 0,
        interval: Duration::from_secs(5),
    };
    assert!(!off.should_pause(50));
}

#[test]
fn test_counter_increments_are_unique_snapshots() {
    let counter = Arc::new(ProgressCounter::default());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let c = Arc::clone(&counter);
            thread::spawn(move || (0..250).map(|_| c.increment()).collect::<Vec<_>>())
        })
        .collect();
    let mut seen: Vec<usize> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (1..=2000).collect::<Vec<_>>());
    assert_eq!(counter.get(), 2000);
}

#[test]
fn test_success_rate_formatting() {
    let stats = RunStats {
        tasks_enqueued: 3,
        tasks_succeeded: 2,
        cancelled: false,
    };
    assert_eq!(format_success_rate(&stats), "66.7%");
    let all = RunStats {
        tasks_enqueued: 2,
        tasks_succeeded: 2,
        cancelled: false,
    };
    assert_eq!(all.success_rate(), Some(100.0));
    assert_eq!(format_success_rate(&all), "100.0%");
    assert_eq!(RunStats::default().success_rate(), None);
}

// --- catalog ---

fn node(label: &str, children: Option<Vec<CatalogNode>>) -> CatalogNode {
    CatalogNode {
        label: label.to_string(),
        children,
    }
}

#[test]
fn test_flatten_catalog_depth_first_leaves() {
    let tree = vec![
        node(
            "MODIS",
            Some(vec![
                node("2001", Some(vec![node("001", None), node("002", None)])),
                node("2002", Some(vec![])),
            ]),
        ),
        node("Readme", None),
    ];
    assert_eq!(
        flatten_catalog(&tree),
        vec!["MODIS/2001/001", "MODIS/2001/002", "MODIS/2002", "Readme"]
    );
}

#[test]
fn test_catalog_node_parses_api_json() {
    let nodes: Vec<CatalogNode> = serde_json::from_str(
        r#"[{"label":"A","children":[{"label":"1"},{"label":"2","children":null}]}]"#,
    )
    .unwrap();
    assert_eq!(flatten_catalog(&nodes), vec!["A/1", "A/2"]);
}

#[test]
fn test_snapshot_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog_9.json");
    let snapshot = CatalogSnapshot {
        paths: strings(&["A/1", "B/2"]),
        table: "t_water".to_string(),
        type_tag: "MODIS".to_string(),
    };
    save_snapshot(&path, &snapshot).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["path"][1], "B/2");
    assert_eq!(raw["type"], "MODIS");
    assert_eq!(load_snapshot(&path).unwrap(), snapshot);
}

#[test]
fn test_snapshot_missing_or_malformed_is_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_snapshot(&dir.path().join("absent.json")).is_err());
    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{not json").unwrap();
    assert!(load_snapshot(&bad).is_err());
}

// --- local path safety ---

#[test]
fn test_safe_relative_paths() {
    assert!(is_safe_relative_path("MODISwater2001-2022/2008/001"));
    assert!(is_safe_relative_path("A\\B"));
    assert!(!is_safe_relative_path(""));
    assert!(!is_safe_relative_path("/etc"));
    assert!(!is_safe_relative_path("\\server\\share"));
    assert!(!is_safe_relative_path("../up"));
    assert!(!is_safe_relative_path("A/../../up"));
    assert!(!is_safe_relative_path("A/./B"));
}

#[test]
fn test_safe_file_names() {
    assert!(is_safe_file_name("MOD09A1.A2008001.tif"));
    assert!(is_safe_file_name("..hidden"));
    assert!(!is_safe_file_name(""));
    assert!(!is_safe_file_name(".."));
    assert!(!is_safe_file_name("sub/file.tif"));
    assert!(!is_safe_file_name("..\\file.tif"));
}

// --- listing entries ---

#[test]
fn test_listing_tolerates_null_and_fractional_sizes() {
    let files: Vec<RemoteFile> = serde_json::from_str(
        r#"[
            {"file": "a.tif", "size": 10},
            {"file": "b.tif", "size": null},
            {"file": "c.tif", "size": 10.0},
            {"file": "d.tif"},
            {"file": "e.tif", "size": "42"},
            {"file": null, "size": 5},
            {"size": 7}
        ]"#,
    )
    .unwrap();
    let got: Vec<(&str, u64)> = files.iter().map(|f| (f.name.as_str(), f.size)).collect();
    assert_eq!(
        got,
        vec![
            ("a.tif", 10),
            ("b.tif", 0),
            ("c.tif", 10),
            ("d.tif", 0),
            ("e.tif", 42),
            ("", 5),
            ("", 7),
        ]
    );
}

#[test]
fn test_listing_negative_size_is_zero() {
    let f: RemoteFile = serde_json::from_str(r#"{"file": "x.tif", "size": -3}"#).unwrap();
    assert_eq!(f.size, 0);
}

// --- signed URL ---

#[test]
fn test_rewrite_signed_url_replaces_path_and_drops_port() {
    let url = rewrite_signed_url(
        "http://oss.example.com:8443/bucket/whatever?Expires=1&Signature=a%2Bb",
        "shared-dataset/MODIS/2001/a.tif",
    )
    .unwrap();
    assert_eq!(
        url,
        "https://oss.example.com/shared-dataset/MODIS/2001/a.tif?Expires=1&Signature=a+b"
    );
}

#[test]
fn test_rewrite_signed_url_rejects_malformed() {
    assert!(rewrite_signed_url("oss.example.com/x?y=1", "k").is_err());
    assert!(rewrite_signed_url("https:///x?y=1", "k").is_err());
    assert!(rewrite_signed_url("https://oss.example.com/x", "k").is_err());
}

// --- login ---

#[test]
fn test_login_response_success() {
    let session = parse_login_response(
        r#"{"success":true,"data":{"userName":"alex","email":"alex@example.org","token":"tok-1"}}"#,
    )
    .unwrap();
    assert_eq!(session.token(), Some("tok-1".to_string()));
    assert_eq!(session.account(), Some("alex@example.org".to_string()));
    assert_eq!(session.username.as_deref(), Some("alex"));
}

#[test]
fn test_login_response_failure_carries_reason() {
    let err = parse_login_response(r#"{"success":false,"failReason":"bad password"}"#)
        .unwrap_err();
    assert!(format!("{err:#}").contains("bad password"));
    let err = parse_login_response(r#"{"success":false}"#).unwrap_err();
    assert!(format!("{err:#}").contains("Unknown error"));
}

#[test]
fn test_login_response_without_token_is_error() {
    assert!(parse_login_response(r#"{"success":true,"data":{"userName":"x"}}"#).is_err());
    assert!(parse_login_response("not json").is_err());
}

// --- sealing ---

#[test]
fn test_builtin_login_key_parses() {
    use rsa::traits::PublicKeyParts;
    let key = parse_public_key(LOGIN_PUBLIC_KEY_PEM).unwrap();
    assert_eq!(key.size(), 256);
}

#[test]
fn test_sealed_payload_decrypts_to_compact_json() {
    use base64::Engine;
    use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

    let private = RsaPrivateKey::new(&mut rand::rngs::OsRng, 1024).unwrap();
    let public = RsaPublicKey::from(&private);
    let sealed = seal_json_with(&public, &serde_json::json!({"account": "a@b.c"})).unwrap();

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(sealed)
        .unwrap();
    let plain = private.decrypt(Pkcs1v15Encrypt, &bytes).unwrap();
    assert_eq!(plain, br#"{"account":"a@b.c"}"#);
}

#[test]
fn test_parse_public_key_rejects_garbage() {
    assert!(parse_public_key("-----BEGIN PUBLIC KEY-----\n@@@\n-----END PUBLIC KEY-----").is_err());
}

// --- settings ---

#[test]
fn test_settings_toml_applies_present_fields_only() {
    let file = parse_settings_toml(
        r#"
[settings]
max_threads = 8
resource_id = 26
target_sub_path = "MODISwater2001-2022/2008"

[download]
sleep_interval = 2
sleep_after_files = 10

[api]
catalog = "https://api.example.org/catalog"
login = "https://api.example.org/login"
"#,
    )
    .unwrap();
    let mut settings = Settings::default();
    apply_file_to_settings(&file, &mut settings);

    assert_eq!(settings.max_threads, 8);
    assert_eq!(settings.resource_id, 26);
    assert_eq!(
        settings.target_sub_path.as_deref(),
        Some("MODISwater2001-2022/2008")
    );
    assert_eq!(settings.sleep_interval, Duration::from_secs(2));
    assert_eq!(settings.sleep_after_files, 10);
    assert_eq!(settings.api.catalog, "https://api.example.org/catalog");
    // Untouched fields keep their defaults.
    assert_eq!(settings.namespace, "shared-dataset");
    assert_eq!(settings.chunk_size, 8192);
    assert!(settings.api.record.is_empty());
}

#[test]
fn test_settings_toml_rejects_bad_types() {
    assert!(parse_settings_toml("[settings]\nmax_threads = \"many\"\n").is_err());
}

#[test]
fn test_cli_overrides_file() {
    let mut settings = Settings {
        max_threads: 8,
        resource_id: 26,
        ..Default::default()
    };
    let cli = Cli::parse_from(["iearth", "-m", "3", "-s", "A/B", "-y", "--progress"]);
    apply_cli_to_settings(&cli, &mut settings);
    assert_eq!(settings.max_threads, 3);
    assert_eq!(settings.resource_id, 26);
    assert_eq!(settings.target_sub_path.as_deref(), Some("A/B"));
    assert!(settings.assume_yes);
    assert!(settings.progress);
}

#[test]
fn test_cli_rejects_zero_threads() {
    assert!(Cli::try_parse_from(["iearth", "-m", "0"]).is_err());
}

#[test]
fn test_validate_endpoints_lists_missing() {
    let err = validate_endpoints(&ApiEndpoints {
        catalog: "https://x/catalog".to_string(),
        login: "https://x/login".to_string(),
        ..Default::default()
    })
    .unwrap_err()
    .to_string();
    assert!(err.contains("api.file_list"));
    assert!(err.contains("api.download"));
    assert!(err.contains("api.record"));
    assert!(!err.contains("api.catalog"));

    let all = ApiEndpoints {
        catalog: "a".into(),
        file_list: "b".into(),
        download: "c".into(),
        record: "d".into(),
        login: "e".into(),
    };
    assert!(validate_endpoints(&all).is_ok());
}

#[test]
fn test_resolve_download_root() {
    let abs = std::env::temp_dir();
    assert_eq!(resolve_download_root(&abs).unwrap(), abs);
    let rel = resolve_download_root(Path::new("data")).unwrap();
    assert!(rel.is_absolute());
    assert!(rel.ends_with("data"));
}

#[test]
fn test_artifact_paths_use_resource_id() {
    let settings = Settings {
        download_root: PathBuf::from("/data"),
        resource_id: 26,
        ..Default::default()
    };
    assert_eq!(settings.catalog_file(), PathBuf::from("/data/catalog_26.json"));
    assert_eq!(
        settings.finished_log_file(),
        PathBuf::from("/data/finished_26.log")
    );
    assert_eq!(expand_id_pattern("x_{id}_{id}", 3), "x_3_3");
}

#[test]
fn test_coordinator_opts_from_settings() {
    let settings = Settings {
        max_threads: 0,
        sleep_after_files: 7,
        ..Default::default()
    };
    let opts = CoordinatorOpts::from(&settings);
    assert_eq!(opts.num_workers, 1);
    assert_eq!(opts.sleep_after_files, 7);
}

#[test]
fn test_part_path_sits_next_to_final() {
    assert_eq!(
        part_path_for(Path::new("/data/A/1/a.tif")),
        PathBuf::from("/data/A/1/a.tif.part")
    );
}
