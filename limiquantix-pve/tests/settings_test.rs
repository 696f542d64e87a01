//! Settings loading from YAML.

use limiquantix_pve::{ProvisionSettings, Translator, Variant};
use std::io::Write;

#[test]
fn test_settings_yaml_parsing() {
    let yaml = r#"
vm:
  interface_name_key: name
vmid:
  min: 1000
  max: 1999
log_level: debug
log_format: json
"#;

    let settings: ProvisionSettings = serde_yaml::from_str(yaml).expect("Failed to parse YAML");

    assert_eq!(settings.vm.interface_name_key.as_deref(), Some("name"));
    assert_eq!(settings.container.interface_name_key, None);
    assert_eq!(settings.vmid.min, 1000);
    assert!(settings.vmid.contains("1500"));
    assert_eq!(settings.log_level, "debug");
    assert!(settings.validate().is_ok());

    let translator = Translator::new(&settings);
    assert_eq!(translator.interface_encoding(Variant::Vm).name_key, "name");
    assert_eq!(translator.interface_encoding(Variant::Container).name_key, "name");
}

#[test]
fn test_settings_load_rejects_invalid_file() {
    let path = std::env::temp_dir().join(format!("limiquantix-pve-settings-{}.yaml", std::process::id()));
    {
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "vmid:\n  min: 500\n  max: 100").unwrap();
    }

    let err = ProvisionSettings::load(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("vmid"));

    std::fs::remove_file(&path).unwrap();
}
