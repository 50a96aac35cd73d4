//! Locale bundles and the translation capability handed to components.

use std::collections::HashMap;

use tracing::warn;

/// Translation lookup injected into every component that renders text.
pub trait Translator: Send + Sync {
    fn lookup(&self, key: &str) -> Option<&str>;

    /// Translate `key`, falling back to the key itself.
    fn t(&self, key: &str) -> String { self.lookup(key).unwrap_or(key).to_string() }

    /// Translate and substitute `{name}` style placeholders.
    fn t_with(&self, key: &str, args: &[(&str, &str)]) -> String {
        let mut out = self.t(key);
        for (name, value) in args {
            out = out.replace(&format!("{{{}}}", name), value);
        }
        out
    }
}

pub const LOCALES: &[&str] = &["en", "es", "zh", "tc"];

const EN: &[(&str, &str)] = &[
    ("CREATE_NAME", "Create {name}"),
    ("EDIT_YAML", "Edit YAML"),
    ("SAVE_FORM_TIP", "Please save the current settings first."),
    ("OK", "OK"),
    ("Cancel", "Cancel"),
    ("Create", "Create"),
    ("Yes", "Yes"),
    ("No", "No"),
    ("Parameters", "Parameters"),
    ("ADD_PARAMETER", "Add"),
    ("PARAMETER_REQUIRED", "Please set the parameter."),
    ("FIELD_REQUIRED", "This field is required."),
    ("FIELD_PATTERN_MISMATCH", "Invalid format."),
    ("UNSUPPORTED_FIELD_TYPE", "Unsupported field type: {tag}"),
    ("YAML_DECODE_FAILED", "Invalid YAML: {error}"),
    ("SUBMIT_OK", "{name} submitted."),
    ("SUBMIT_FAILED", "Submission failed: {error}"),
    ("Storage Class", "Storage Class"),
    ("STORAGE_VOLUME_EXTENSION", "Volume Expansion"),
    ("RECLAMATION_POLICY", "Reclaim Policy"),
    ("ACCESS_MODE", "Supported Access Mode"),
    ("ACCESS_MODES_DESC", "Select the access modes supported by the storage class."),
    ("ACCESS_MODE_RWO", "ReadWriteOnce"),
    ("ACCESS_MODE_ROX", "ReadOnlyMany"),
    ("ACCESS_MODE_RWX", "ReadWriteMany"),
    ("STORAGE_SYSTEM", "Storage System"),
    ("PROVISIONER_DESC", "Provides the storage backend."),
    ("Custom Provisioner", "Custom Provisioner"),
    ("TYPE", "Type"),
    ("MAXSIZE", "Maximum Size"),
    ("MINSIZE", "Minimum Size"),
    ("STEPSIZE", "Step Size"),
    ("FSTYPE", "File System Type"),
    ("TAGS", "Tag"),
    ("QINGCLOUD_CSI_TYPE_DESC", "On QingCloud: 0 high performance, 2 high capacity, 3 super high performance, 5 Enterprise Server SAN, 100 standard."),
    ("CREATE_VOLUME_MAX_SIZE", "Maximum size of the volume."),
    ("CREATE_VOLUME_STEP_SIZE", "Increment of the volume size."),
    ("CREATE_VOLUME_MIN_SIZE", "Minimum size of the volume."),
    ("VOLUME_FS_TYPE", "File system type of the volume: ext3, ext4 or xfs. Defaults to ext4."),
    ("QINGCLOUD_VOLUME_TAGS_DESC", "Tags added to the disk on creation. Separate multiple tags with commas."),
    ("RESTURL", "REST URL"),
    ("CLUSTER_ID", "Cluster ID"),
    ("REST_AUTH_ENABLED", "REST Authentication"),
    ("REST_USER", "REST User"),
    ("SECRET_NAMESPACE", "Secret Namespace"),
    ("SECRET_NAME", "Secret Name"),
    ("GID_MIN", "GID Minimum Value"),
    ("GID_MAX", "GID Maximum Value"),
    ("VOLUME_TYPE", "Volume Type"),
    ("CLUSTERID", "Cluster ID"),
    ("RESTAUTHENABLED", "REST Authentication"),
    ("RESTUSER", "REST User"),
    ("SECRETNAMESPACE", "Secret Namespace"),
    ("SECRETNAME", "Secret Name"),
    ("GIDMIN", "GID Minimum Value"),
    ("GIDMAX", "GID Maximum Value"),
    ("VOLUMETYPE", "Volume Type"),
    ("REST_URL_EXAMPLE", "IP address and port number"),
    ("REST_AUTH_TRUE", "True"),
    ("REST_AUTH_FALSE", "False"),
    ("GLUSTERFS_RESTURL_DESC", "Gluster REST service or Heketi service URL that provisions Gluster volumes on demand."),
    ("GLUSTERFS_ID_DESC", "The Gluster cluster ID."),
    ("GLUSTERFS_RESTAUTHENABLED_DESC", "Enable authentication on the REST server."),
    ("GLUSTERFS_RESTUSER_DESC", "Gluster REST service or Heketi user who can create volumes in the Gluster Trusted Pool."),
    ("GLUSTERFS_SECRET_NAMESPACE_DESC", "Namespace of the Heketi user secret."),
    ("GLUSTERFS_SECRET_NAME_DESC", "Name of the Heketi user secret."),
    ("GLUSTERFS_GID_MIN_DESC", "Minimum GID of the storage class."),
    ("GLUSTERFS_GID_MAX_DESC", "Maximum GID of the storage class."),
    ("GLUSTERFS_VOLUME_TYPE_DESC", "Optional type of the volume."),
    ("MONITORS", "Monitors"),
    ("ADMINID", "Admin ID"),
    ("ADMINSECRETNAME", "Admin Secret Name"),
    ("ADMINSECRETNAMESPACE", "Admin Secret Namespace"),
    ("POOL", "Pool"),
    ("USERID", "User ID"),
    ("USERSECRETNAME", "User Secret Name"),
    ("USERSECRETNAMESPACE", "User Secret Namespace"),
    ("IMAGEFORMAT", "Image Format"),
    ("IMAGEFEATURES", "Image Features"),
    ("CEPH_MONITOR_IP", "IP address and port number"),
    ("CEPHRBD_MONITORS_DESC", "IP address of Ceph monitors."),
    ("CEPHRBD_ADMIN_ID_DESC", "Ceph client ID that is capable of creating images in the pool."),
    ("CEPHRBD_ADMIN_SECRET_NAME_DESC", "Secret name of adminId."),
    ("CEPHRBD_ADMIN_SECRET_NAMESPACE_DESC", "Namespace of adminSecretName."),
    ("CEPHRBD_POOL_DESC", "Name of the Ceph RBD pool."),
    ("CEPHRBD_USERID_DESC", "Ceph client ID used to map the RBD image. Defaults to adminId."),
    ("CEPHRBD_USER_SECRET_NAME_DESC", "Name of the Ceph secret for userId."),
    ("CEPHRBD_USER_SECRET_NAMESPACE_DESC", "Namespace of userSecretName."),
    ("CEPHRBD_FS_TYPE_DESC", "File system type of the storage volume."),
    ("CEPHRBD_IMAGE_FORMAT_DESC", "Ceph image format, \"1\" or \"2\". Set imageFeatures when using \"2\"."),
    ("CEPHRBD_IMAGE_FEATURES_DESC", "Additional Ceph image features. Only used with imageFormat \"2\"."),
    ("DEPLOYMENT_LOCATION", "Deployment Location"),
    ("Horizontal Pod Autoscaling", "Horizontal Pod Autoscaling"),
    ("Secret", "Secret"),
    ("Deployment", "Deployment"),
];

const ES: &[(&str, &str)] = &[
    ("CREATE_NAME", "Crear {name}"),
    ("EDIT_YAML", "Editar YAML"),
    ("SAVE_FORM_TIP", "Guarde primero la configuración actual."),
    ("OK", "Aceptar"),
    ("Cancel", "Cancelar"),
    ("Create", "Crear"),
    ("Yes", "Sí"),
    ("No", "No"),
    ("Parameters", "Parámetros"),
    ("ADD_PARAMETER", "Añadir"),
    ("PARAMETER_REQUIRED", "Introduzca el parámetro."),
    ("YAML_DECODE_FAILED", "YAML no válido: {error}"),
    ("Storage Class", "Clase de almacenamiento"),
    ("STORAGE_VOLUME_EXTENSION", "Permitir expansión de volumen"),
    ("RECLAMATION_POLICY", "Política de recuperación"),
    ("ACCESS_MODE", "Modo de acceso admitido"),
    ("ACCESS_MODE_RWO", "Nodo único de lectura y escritura"),
    ("ACCESS_MODE_ROX", "Multi-nodo de solo lectura"),
    ("ACCESS_MODE_RWX", "Múlti-nodos de lectura y escritura"),
    ("STORAGE_SYSTEM", "Sistema de almacenamiento"),
    ("PROVISIONER_DESC", "Proporciona el backend de almacenamiento"),
    ("Custom Provisioner", "Provisioner personalizado"),
    ("CREATE_VOLUME_MAX_SIZE", "Límite superior de tamaño de volumen"),
    ("CREATE_VOLUME_STEP_SIZE", "Incremento de tamaño de volumen"),
    ("CREATE_VOLUME_MIN_SIZE", "Límite inferior de tamaño de volumen"),
    ("QINGCLOUD_VOLUME_TAGS_DESC", "Los tags se asociarán automáticamente cuando se cree un disco duro. Separe varios tags con comas."),
    ("GLUSTERFS_RESTAUTHENABLED_DESC", "Habilite la autenticación en el servidor REST."),
    ("GLUSTERFS_GID_MIN_DESC", "El valor mínimo del rango de GID para la clase de almacenamiento."),
    ("GLUSTERFS_GID_MAX_DESC", "El valor máximo del rango de GID para la clase de almacenamiento."),
    ("CEPHRBD_ADMIN_ID_DESC", "ID de cliente de Ceph que es capaz de crear imágenes en el pool."),
    ("CEPHRBD_ADMIN_SECRET_NAMESPACE_DESC", "El namespace para adminSecretName"),
    ("CEPHRBD_USERID_DESC", "ID de cliente Ceph que se utiliza para asignar la imagen RBD. El valor predeterminado es el mismo que adminId."),
    ("CEPHRBD_USER_SECRET_NAME_DESC", "El nombre de Ceph Secret para userId para mapear la imagen RBD"),
    ("CEPHRBD_USER_SECRET_NAMESPACE_DESC", "El namespace para userSecretName"),
];

const ZH: &[(&str, &str)] = &[
    ("CREATE_NAME", "创建{name}"),
    ("EDIT_YAML", "编辑 YAML"),
    ("SAVE_FORM_TIP", "请先保存当前设置。"),
    ("OK", "确定"),
    ("Cancel", "取消"),
    ("Create", "创建"),
    ("Yes", "是"),
    ("No", "否"),
    ("Parameters", "参数"),
    ("ADD_PARAMETER", "添加"),
    ("PARAMETER_REQUIRED", "请设置参数。"),
    ("FIELD_REQUIRED", "此项为必填项。"),
    ("YAML_DECODE_FAILED", "YAML 格式错误：{error}"),
    ("Storage Class", "存储类型"),
    ("STORAGE_VOLUME_EXTENSION", "存储卷扩容"),
    ("RECLAMATION_POLICY", "回收机制"),
    ("ACCESS_MODE", "支持的访问模式"),
    ("ACCESS_MODE_RWO", "单节点读写"),
    ("ACCESS_MODE_ROX", "多节点只读"),
    ("ACCESS_MODE_RWX", "多节点读写"),
    ("STORAGE_SYSTEM", "存储系统"),
    ("TYPE", "类型"),
    ("MAXSIZE", "容量上限"),
    ("MINSIZE", "容量下限"),
    ("STEPSIZE", "增量值"),
    ("FSTYPE", "文件系统类型"),
    ("TAGS", "标签"),
    ("QINGCLOUD_VOLUME_TAGS_DESC", "为存储卷添加关联标签，多个标签需用逗号分隔。"),
    ("RESTURL", "REST URL"),
    ("CLUSTER_ID", "集群 ID"),
    ("REST_AUTH_ENABLED", "启用 REST 认证"),
    ("REST_USER", "REST 用户"),
    ("VOLUME_TYPE", "存储卷类型"),
    ("REST_URL_EXAMPLE", "IP 地址:端口号"),
    ("SECRET_NAME", "密钥名称"),
    ("REST_AUTH_TRUE", "是"),
    ("CEPH_MONITOR_IP", "IP 地址:端口号"),
    ("SECRET_NAMESPACE", "密钥所属项目"),
    ("GID_MIN", "GID 最小值"),
    ("GID_MAX", "GID 最大值"),
    ("GLUSTERFS_RESTURL_DESC", "按需分配 Gluster 卷的 Gluster REST 服务或 Heketi 服务的 URL。"),
    ("GLUSTERFS_ID_DESC", "Gluster 集群 ID。"),
    ("GLUSTERFS_RESTAUTHENABLED_DESC", " Gluster 启用对 REST 服务器的认证。"),
    ("GLUSTERFS_SECRET_NAMESPACE_DESC", "Heketi 用户密钥的所属项目。"),
    ("GLUSTERFS_SECRET_NAME_DESC", "Heketi 用户密钥的名称。"),
    ("GLUSTERFS_GID_MIN_DESC", "存储类型 GID 范围的最小值。"),
    ("GLUSTERFS_GID_MAX_DESC", "存储类型 GID 范围的最大值。"),
    ("GLUSTERFS_VOLUME_TYPE_DESC", "卷的可选类型。"),
    ("CEPHRBD_MONITORS_DESC", "Ceph 集群 Monitors 的 IP 地址。"),
    ("CEPHRBD_ADMIN_ID_DESC", "Ceph 集群能够创建卷的用户 ID。"),
    ("CEPHRBD_POOL_DESC", "Ceph RBD 的 Pool 名称。"),
    ("CEPHRBD_FS_TYPE_DESC", "存储卷的文件系统类型。"),
];

const TC: &[(&str, &str)] = &[
    ("CREATE_NAME", "創建{name}"),
    ("EDIT_YAML", "編輯 YAML"),
    ("SAVE_FORM_TIP", "請先保存當前設置。"),
    ("OK", "確定"),
    ("Cancel", "取消"),
    ("Yes", "是"),
    ("No", "否"),
    ("Parameters", "參數"),
];

fn bundle(locale: &str) -> Option<&'static [(&'static str, &'static str)]> {
    match locale {
        "en" => Some(EN),
        "es" => Some(ES),
        "zh" => Some(ZH),
        "tc" => Some(TC),
        _ => None,
    }
}

/// Locale catalog: the selected bundle layered over English.
#[derive(Debug, Clone)]
pub struct Catalog {
    locale: String,
    entries: HashMap<String, String>,
}

impl Default for Catalog {
    fn default() -> Self { Self::builtin("en") }
}

impl Catalog {
    /// Built-in bundle for `locale`; unknown locales get English.
    pub fn builtin(locale: &str) -> Self {
        let mut entries: HashMap<String, String> =
            EN.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let locale = match bundle(locale) {
            Some(b) => {
                entries.extend(b.iter().map(|(k, v)| (k.to_string(), v.to_string())));
                locale.to_string()
            }
            None => {
                warn!(locale = %locale, "unknown locale; falling back to en");
                "en".to_string()
            }
        };
        Self { locale, entries }
    }

    /// Layer additional entries (e.g. a site-specific bundle) on top.
    pub fn extend<I, K, V>(&mut self, extra: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.entries.extend(extra.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    pub fn locale(&self) -> &str { &self.locale }
}

impl Translator for Catalog {
    fn lookup(&self, key: &str) -> Option<&str> { self.entries.get(key).map(String::as_str) }
}
