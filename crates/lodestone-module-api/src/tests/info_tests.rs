use crate::info::ModuleInfo;

#[test]
fn minimal_manifest_fills_defaults() {
    let info: ModuleInfo =
        serde_json::from_str(r#"{"name":"core","version":"1.2.0"}"#).unwrap();
    assert_eq!(info.name, "core");
    assert_eq!(info.version, "1.2.0");
    assert!(info.dependencies.is_empty());
    assert!(info.enabled_by_default);
}

#[test]
fn full_manifest_round_trips() {
    let info = ModuleInfo::new("ui", "0.4.1")
        .with_dependencies(["core", "theme"])
        .enabled_by_default(false);
    let json = serde_json::to_string(&info).unwrap();
    let parsed: ModuleInfo = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, info);
    assert_eq!(parsed.dependencies, vec!["core", "theme"]);
    assert!(!parsed.enabled_by_default);
}
