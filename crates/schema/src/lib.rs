//! Kform schema: provisioner parameter tables and the forms derived from them.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub mod federation;
pub mod form;
pub mod templates;

pub use form::{
    access_mode_options, provisioner_of, resolve_parameter_form, AccessModeField, ChoiceOption, FieldRow,
    FieldSlot, ParameterForm, PropertiesEditor, SettingsLayout, StorageClassSettings, Widget, WidgetKind,
    WidgetRegistry,
};

/// Declared input type of a parameter. Unknown tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InputKind {
    Text,
    Select,
    Number,
    Custom(String),
}

impl From<String> for InputKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "input" | "text" => InputKind::Text,
            "select" => InputKind::Select,
            "number" => InputKind::Number,
            _ => InputKind::Custom(s),
        }
    }
}

impl From<&str> for InputKind {
    fn from(s: &str) -> Self { InputKind::from(s.to_string()) }
}

impl From<InputKind> for String {
    fn from(k: InputKind) -> Self { k.tag().to_string() }
}

impl InputKind {
    pub fn tag(&self) -> &str {
        match self {
            InputKind::Text => "text",
            InputKind::Select => "select",
            InputKind::Number => "number",
            InputKind::Custom(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// One provisioner parameter as declared by the schema table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub key: String,
    #[serde(rename = "type")]
    pub input: InputKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "defaultValue")]
    pub default: Option<String>,
    #[serde(default)]
    pub options: Vec<SelectOption>,
    /// Locale key of the field description.
    #[serde(default, rename = "desc")]
    pub description: String,
    #[serde(default)]
    pub placeholder: Option<String>,
    /// Regex a non-empty value must match.
    #[serde(default)]
    pub pattern: Option<String>,
}

impl ParameterDescriptor {
    fn new(key: &str, input: InputKind, desc: &str) -> Self {
        Self {
            key: key.to_string(),
            input,
            required: false,
            default: None,
            options: Vec::new(),
            description: desc.to_string(),
            placeholder: None,
            pattern: None,
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn default_value(mut self, v: &str) -> Self {
        self.default = Some(v.to_string());
        self
    }

    fn options(mut self, opts: &[(&str, &str)]) -> Self {
        self.options = opts.iter().map(|(l, v)| SelectOption { label: l.to_string(), value: v.to_string() }).collect();
        self
    }

    fn placeholder(mut self, p: &str) -> Self {
        self.placeholder = Some(p.to_string());
        self
    }

    fn pattern(mut self, p: &str) -> Self {
        self.pattern = Some(p.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    ReadWriteOnce,
    ReadOnlyMany,
    ReadWriteMany,
}

impl AccessMode {
    /// The universal set, in display order.
    pub const ALL: [AccessMode; 3] = [AccessMode::ReadWriteOnce, AccessMode::ReadOnlyMany, AccessMode::ReadWriteMany];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::ReadWriteOnce => "ReadWriteOnce",
            AccessMode::ReadOnlyMany => "ReadOnlyMany",
            AccessMode::ReadWriteMany => "ReadWriteMany",
        }
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            AccessMode::ReadWriteOnce => "ACCESS_MODE_RWO",
            AccessMode::ReadOnlyMany => "ACCESS_MODE_ROX",
            AccessMode::ReadWriteMany => "ACCESS_MODE_RWX",
        }
    }
}

impl std::str::FromStr for AccessMode {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        AccessMode::ALL.into_iter().find(|m| m.as_str() == s).ok_or_else(|| format!("unknown access mode: {}", s))
    }
}

/// A storage backend and the parameters it understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provisioner {
    #[serde(alias = "label")]
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub access_modes: Vec<AccessMode>,
    #[serde(default)]
    pub params: Vec<ParameterDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvisionerTable {
    entries: Vec<Provisioner>,
}

static BUILTIN: Lazy<ProvisionerTable> = Lazy::new(|| {
    use InputKind::*;
    let size = r"^\d+$";
    ProvisionerTable::new(vec![
        Provisioner {
            name: "QingCloud CSI".into(),
            value: "disk.csi.qingcloud.com".into(),
            access_modes: vec![AccessMode::ReadWriteOnce],
            params: vec![
                ParameterDescriptor::new("type", Select, "QINGCLOUD_CSI_TYPE_DESC")
                    .options(&[
                        ("High Performance", "0"),
                        ("High Capacity", "2"),
                        ("Super High Performance", "3"),
                        ("Enterprise Server SAN", "5"),
                        ("Standard", "100"),
                        ("SSD Enterprise", "200"),
                    ])
                    .default_value("0"),
                ParameterDescriptor::new("maxSize", Text, "CREATE_VOLUME_MAX_SIZE").default_value("5000").pattern(size),
                ParameterDescriptor::new("stepSize", Text, "CREATE_VOLUME_STEP_SIZE").default_value("50").pattern(size),
                ParameterDescriptor::new("minSize", Text, "CREATE_VOLUME_MIN_SIZE").default_value("100").pattern(size),
                ParameterDescriptor::new("fsType", Select, "VOLUME_FS_TYPE")
                    .options(&[("ext3", "ext3"), ("ext4", "ext4"), ("xfs", "xfs")])
                    .default_value("ext4"),
                ParameterDescriptor::new("tags", Text, "QINGCLOUD_VOLUME_TAGS_DESC"),
            ],
        },
        Provisioner {
            name: "GlusterFS".into(),
            value: "kubernetes.io/glusterfs".into(),
            access_modes: AccessMode::ALL.to_vec(),
            params: vec![
                ParameterDescriptor::new("resturl", Text, "GLUSTERFS_RESTURL_DESC").required().placeholder("REST_URL_EXAMPLE"),
                ParameterDescriptor::new("clusterid", Text, "GLUSTERFS_ID_DESC"),
                ParameterDescriptor::new("restauthenabled", Select, "GLUSTERFS_RESTAUTHENABLED_DESC")
                    .options(&[("REST_AUTH_TRUE", "true"), ("REST_AUTH_FALSE", "false")])
                    .default_value("true"),
                ParameterDescriptor::new("restuser", Text, "GLUSTERFS_RESTUSER_DESC"),
                ParameterDescriptor::new("secretNamespace", Text, "GLUSTERFS_SECRET_NAMESPACE_DESC"),
                ParameterDescriptor::new("secretName", Text, "GLUSTERFS_SECRET_NAME_DESC"),
                ParameterDescriptor::new("gidMin", Number, "GLUSTERFS_GID_MIN_DESC").default_value("40000").pattern(size),
                ParameterDescriptor::new("gidMax", Number, "GLUSTERFS_GID_MAX_DESC").default_value("50000").pattern(size),
                ParameterDescriptor::new("volumetype", Text, "GLUSTERFS_VOLUME_TYPE_DESC").default_value("replicate:2"),
            ],
        },
        Provisioner {
            name: "Ceph RBD".into(),
            value: "kubernetes.io/rbd".into(),
            access_modes: vec![AccessMode::ReadWriteOnce, AccessMode::ReadOnlyMany],
            params: vec![
                ParameterDescriptor::new("monitors", Text, "CEPHRBD_MONITORS_DESC").required().placeholder("CEPH_MONITOR_IP"),
                ParameterDescriptor::new("adminId", Text, "CEPHRBD_ADMIN_ID_DESC").default_value("admin"),
                ParameterDescriptor::new("adminSecretName", Text, "CEPHRBD_ADMIN_SECRET_NAME_DESC").required(),
                ParameterDescriptor::new("adminSecretNamespace", Text, "CEPHRBD_ADMIN_SECRET_NAMESPACE_DESC").default_value("default"),
                ParameterDescriptor::new("pool", Text, "CEPHRBD_POOL_DESC").default_value("rbd"),
                ParameterDescriptor::new("userId", Text, "CEPHRBD_USERID_DESC"),
                ParameterDescriptor::new("userSecretName", Text, "CEPHRBD_USER_SECRET_NAME_DESC"),
                ParameterDescriptor::new("userSecretNamespace", Text, "CEPHRBD_USER_SECRET_NAMESPACE_DESC"),
                ParameterDescriptor::new("fsType", Text, "CEPHRBD_FS_TYPE_DESC").default_value("ext4"),
                ParameterDescriptor::new("imageFormat", Select, "CEPHRBD_IMAGE_FORMAT_DESC")
                    .options(&[("1", "1"), ("2", "2")])
                    .default_value("2"),
                ParameterDescriptor::new("imageFeatures", Text, "CEPHRBD_IMAGE_FEATURES_DESC").default_value("layering"),
            ],
        },
    ])
});

impl ProvisionerTable {
    pub fn new(entries: Vec<Provisioner>) -> Self { Self { entries } }

    /// Table of storage backends the console knows out of the box.
    pub fn builtin() -> Self { BUILTIN.clone() }

    /// Load an externally maintained table (a YAML list of provisioners).
    pub fn from_yaml(text: &str) -> Result<Self> {
        let entries: Vec<Provisioner> = serde_yaml::from_str(text).context("parsing provisioner table YAML")?;
        Ok(Self { entries })
    }

    pub fn find(&self, value: &str) -> Option<&Provisioner> { self.entries.iter().find(|p| p.value == value) }

    pub fn is_known(&self, value: &str) -> bool { self.find(value).is_some() }

    pub fn iter(&self) -> std::slice::Iter<'_, Provisioner> { self.entries.iter() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_kind_tags_round_trip() {
        assert_eq!(InputKind::from("input"), InputKind::Text);
        assert_eq!(InputKind::from("select"), InputKind::Select);
        assert_eq!(InputKind::from("slider"), InputKind::Custom("slider".into()));
        assert_eq!(String::from(InputKind::Custom("slider".into())), "slider");
    }

    #[test]
    fn builtin_keys_are_unique_per_provisioner() {
        let table = ProvisionerTable::builtin();
        assert_eq!(table.len(), 3);
        for p in table.iter() {
            let mut keys: Vec<_> = p.params.iter().map(|d| d.key.as_str()).collect();
            let n = keys.len();
            keys.sort();
            keys.dedup();
            assert_eq!(keys.len(), n, "duplicate key in {}", p.value);
        }
    }

    #[test]
    fn from_yaml_reads_console_shaped_tables() {
        let yaml = r#"
- label: Local
  value: example.com/local
  access_modes: [ReadWriteOnce]
  params:
    - key: path
      type: input
      desc: LOCAL_PATH_DESC
      required: true
    - key: mode
      type: slider
"#;
        let t = ProvisionerTable::from_yaml(yaml).unwrap();
        let p = t.find("example.com/local").unwrap();
        assert_eq!(p.name, "Local");
        assert_eq!(p.params[0].input, InputKind::Text);
        assert!(p.params[0].required);
        assert_eq!(p.params[1].input, InputKind::Custom("slider".into()));
        assert!(ProvisionerTable::from_yaml("- value: [").is_err());
    }

    #[test]
    fn access_mode_parses_names() {
        assert_eq!("ReadOnlyMany".parse::<AccessMode>(), Ok(AccessMode::ReadOnlyMany));
        assert!("Everything".parse::<AccessMode>().is_err());
    }
}
